// File: steamwatch-common/src/traits/mod.rs
pub mod api;
pub mod repository_traits;

pub use api::{AchievementSource, CardRenderer, Notifier, PlayerStatusSource, TitleInfoSource};
pub use repository_traits::{GroupStateRepository, RosterRepository, SessionRepository};
