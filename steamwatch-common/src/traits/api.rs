use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Error;
use crate::models::notification::{
    AchievementCardInput, EndCardInput, Notification, StartCardInput,
};
use crate::models::status::PlayerStatus;

/// Upstream player-summary lookups. `Ok(None)` means "no data this round"
/// (transport failure, bad response, or missing player record after
/// retries) — the caller skips the account and keeps its prior snapshot.
#[async_trait]
pub trait PlayerStatusSource: Send + Sync {
    async fn fetch_player_summary(&self, steam_id: &str) -> Result<Option<PlayerStatus>, Error>;
}

/// Upstream achievement lookups. `None` means the fetch failed; an empty
/// set is a successful answer for a title with nothing unlocked.
#[async_trait]
pub trait AchievementSource: Send + Sync {
    async fn fetch_unlocked(
        &self,
        steam_id: &str,
        app_id: &str,
    ) -> Result<Option<HashSet<String>>, Error>;
}

/// Title metadata lookups (localized display name, live player count).
#[async_trait]
pub trait TitleInfoSource: Send + Sync {
    /// Resolved display name, falling back to the given upstream name.
    /// Positive results are cached indefinitely; misses are retried.
    async fn title_name(&self, app_id: &str, fallback: Option<&str>) -> String;

    /// Current online player count, best effort.
    async fn online_count(&self, app_id: &str) -> Option<u64>;

    /// Local path to a cached cover image for the title, downloading it
    /// if needed. Best effort; cards render without one.
    async fn cover_path(&self, app_id: &str) -> Option<PathBuf>;
}

/// Delivery of a finished notification to a group's stored destination
/// handle. The real chat transport lives outside this system.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, destination: &str, note: &Notification) -> Result<(), Error>;
}

/// Pure image composition. Callers treat every error as "fall back to
/// plain text"; a failed render never blocks the state transition.
#[async_trait]
pub trait CardRenderer: Send + Sync {
    async fn render_game_start(&self, input: &StartCardInput) -> Result<Vec<u8>, Error>;
    async fn render_game_end(&self, input: &EndCardInput) -> Result<Vec<u8>, Error>;
    async fn render_achievements(&self, input: &AchievementCardInput) -> Result<Vec<u8>, Error>;
}
