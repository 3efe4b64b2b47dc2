use chrono::Utc;
use steamwatch_common::models::status::PlayerStatus;

/// Returns the current epoch seconds.
pub fn current_epoch() -> i64 {
    Utc::now().timestamp()
}

/// Epoch seconds of the next whole-minute boundary after `now`.
pub fn next_minute_boundary(now: i64) -> i64 {
    (now / 60 + 1) * 60
}

/// Hours elapsed between `ts` and `now`.
pub fn hours_since(ts: i64, now: i64) -> f64 {
    (now - ts) as f64 / 3600.0
}

/// Adaptive poll interval in seconds for the given snapshot.
///
/// In-game and online accounts stay on the tight 60s cadence; offline
/// accounts back off by how long ago they were last seen.
pub fn poll_interval_secs(status: &PlayerStatus, now: i64) -> i64 {
    if status.current_game().is_some() {
        return 60;
    }
    if status.persona_state > 0 {
        return 60;
    }
    match status.last_logoff {
        Some(logoff) => {
            let hours_ago = hours_since(logoff, now);
            if hours_ago <= 0.2 {
                60
            } else if hours_ago <= 3.0 {
                300
            } else if hours_ago <= 24.0 {
                600
            } else if hours_ago <= 48.0 {
                1200
            } else {
                1800
            }
        }
        None => 1800,
    }
}

/// Absolute deadline for the next fetch, aligned to minute boundaries.
///
/// The 5/10/20/30-minute cadences additionally snap forward to the next
/// multiple of their own minute count so a whole cohort of idle accounts
/// wakes on the same rounds.
pub fn align_next_poll(now: i64, interval_secs: i64) -> i64 {
    let interval_min = interval_secs / 60;
    if matches!(interval_min, 5 | 10 | 20 | 30) {
        ((now / 60) / interval_min + 1) * interval_min * 60
    } else {
        (now / 60 + interval_min) * 60
    }
}

/// Human label for the chosen cadence, used in the consolidated round log.
pub fn cadence_label(interval_secs: i64) -> String {
    format!("{}-min poll", interval_secs / 60)
}
