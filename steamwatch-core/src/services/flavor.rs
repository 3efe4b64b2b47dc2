//! Flavor-text generation: the deterministic superpower-of-the-day, the
//! duration-bucketed sign-off tips, and the resume one-liners.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

/// Daily "superpower" pool for the start card.
const ABILITIES: &[&str] = &[
    "sees every sniper before the sniper sees them",
    "never misses the daily login bonus",
    "can clutch a 1v5 with 3 HP",
    "finds legendary loot in the first chest",
    "queues instantly, every time",
    "reads the minimap like a bedtime story",
    "tames any boss with sheer patience",
    "never disconnects on the final round",
    "speedruns tutorials out of habit",
    "carries the team without saying a word",
    "dodges every skillshot today",
    "gets the drop they wanted on the first run",
    "wins every coin flip at the shop",
    "parries on reaction, no exceptions",
    "remembers every crafting recipe",
    "finds the secret room on the first try",
    "lands every long-range snipe",
    "never gets camped at spawn",
    "rolls nothing but critical hits",
    "finishes the daily quests before breakfast",
];

/// Lines appended to a "resumed playing" message.
const RESUME_TAILS: &[&str] = &[
    "Dropped connection? Back to the grind!",
    "Game crashed? They came right back!",
    "Network hiccup? We kept the seat warm~",
    "Another crash-to-desktop, classic.",
    "Welcome back, keep it rolling!",
    "Knew they couldn't stay away~",
    "Picking up right where they left off!",
    "Thought they logged off, but the game never ended~",
];

/// Deterministic superpower for (account, date). Same inputs always give
/// the same pick; the seed is a stable hash of `"<steamid>-<date>"`.
pub fn daily_superpower(steam_id: &str, date: NaiveDate) -> &'static str {
    let seed_input = format!("{}-{}", steam_id, date.format("%Y-%m-%d"));
    let mut rng = StdRng::seed_from_u64(fnv1a64(seed_input.as_bytes()));
    ABILITIES
        .choose(&mut rng)
        .copied()
        .unwrap_or(ABILITIES[0])
}

/// Uniform random resume tail.
pub fn resume_tail() -> &'static str {
    RESUME_TAILS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(RESUME_TAILS[0])
}

/// Sign-off tip bucketed by session length in minutes.
pub fn quit_tip(duration_min: f64) -> &'static str {
    if duration_min < 5.0 {
        "The fans barely spun up and it's already over?"
    } else if duration_min < 10.0 {
        "A warm-up lap, nothing more."
    } else if duration_min < 30.0 {
        "Stretched the legs and called it a day?"
    } else if duration_min < 60.0 {
        "Take a breather and come back refreshed!"
    } else if duration_min < 120.0 {
        "Time flies when you're lost in the game~"
    } else if duration_min < 300.0 {
        "That was a proper grind session!"
    } else if duration_min < 600.0 {
        "Did you remember to eat at some point?"
    } else if duration_min < 1200.0 {
        "The power bill is going to feel this one."
    } else if duration_min < 1800.0 {
        "Someone earn this player a no-sleep medal."
    } else if duration_min < 2400.0 {
        "Still alive over there? The PC deserves a rest too."
    } else {
        "Player and chair have officially fused into one."
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superpower_is_stable_for_same_day() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let a = daily_superpower("76561198000000001", date);
        let b = daily_superpower("76561198000000001", date);
        assert_eq!(a, b);
    }

    #[test]
    fn superpower_varies_by_account() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        // With 20 abilities, at least one of a handful of accounts should
        // differ from the first; identical picks across all would mean the
        // seed is being ignored.
        let first = daily_superpower("76561198000000001", date);
        let differs = (2..10).any(|i| {
            daily_superpower(&format!("7656119800000000{i}"), date) != first
        });
        assert!(differs);
    }

    #[test]
    fn quit_tip_buckets() {
        assert_eq!(quit_tip(1.0), quit_tip(4.9));
        assert_ne!(quit_tip(4.0), quit_tip(6.0));
        assert_ne!(quit_tip(100.0), quit_tip(400.0));
        assert_eq!(quit_tip(5000.0), quit_tip(9999.0));
    }
}
