//! Minute-aligned poll loop.
//!
//! Rounds fire on wall-clock minute boundaries so the per-account
//! deadlines produced by `align_next_poll` line up with actual polls.
//! After each round a short settle pause lets the background achievement
//! tasks log before the consolidated round summary goes out.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::services::monitor::Monitor;
use crate::utils::time;

/// Pause between processing and the consolidated round log.
const SETTLE_SECS: u64 = 40;
/// Grace before the very first sweep so startup logging settles.
const STARTUP_DELAY_SECS: u64 = 10;

pub fn spawn_poll_loop(monitor: Arc<Monitor>) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep(Duration::from_secs(STARTUP_DELAY_SECS)).await;
        info!("poll loop started");
        run_round(&monitor).await;
        loop {
            let now = time::current_epoch();
            let boundary = time::next_minute_boundary(now);
            sleep(Duration::from_secs((boundary - now).max(1) as u64)).await;
            run_round(&monitor).await;
        }
    })
}

async fn run_round(monitor: &Arc<Monitor>) {
    let now = time::current_epoch();
    let store = monitor.store();

    let mut active = Vec::new();
    for group_id in store.group_ids().await {
        if !store.settings(&group_id).await.monitor_enabled {
            continue;
        }
        if store.destination(&group_id).await.is_none() {
            continue;
        }
        let due = store.due_accounts(&group_id, now).await;
        if !due.is_empty() {
            active.push((group_id, due));
        }
    }
    if active.is_empty() {
        debug!("poll round: no accounts due");
        return;
    }

    let rounds = active.into_iter().map(|(group_id, due)| {
        let monitor = Arc::clone(monitor);
        async move {
            let lines = monitor
                .engine()
                .run_group_round(&group_id, &due, now)
                .await;
            monitor.persist_group(&group_id).await;
            (group_id, lines)
        }
    });
    let results = join_all(rounds).await;

    sleep(Duration::from_secs(SETTLE_SECS)).await;

    let detailed = monitor.config().lock().await.detailed_poll_log;
    if detailed {
        let mut summary = String::from("poll round:");
        for (group_id, lines) in &results {
            summary.push_str(&format!("\n[{group_id}]"));
            if lines.is_empty() {
                summary.push_str(" (transitions only)");
            }
            for line in lines {
                summary.push_str(&format!("\n  {line}"));
            }
        }
        info!("{}", summary);
    } else {
        info!("poll round completed ({} group(s))", results.len());
    }
}
