pub mod achievements;
pub mod flavor;
pub mod monitor;
pub mod poller;
pub mod transition;

pub use achievements::{AchievementTimings, AchievementTracker};
pub use monitor::Monitor;
pub use transition::TransitionEngine;
