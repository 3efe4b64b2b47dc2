use std::collections::HashSet;
use std::path::PathBuf;

/// One outbound message for a group's notification destination.
#[derive(Debug, Clone)]
pub struct Notification {
    pub text: String,
    /// Rendered card, when rendering succeeded. Plain text otherwise.
    pub image: Option<Vec<u8>>,
}

impl Notification {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }
}

/// Inputs consumed by the start-of-session card renderer.
#[derive(Debug, Clone)]
pub struct StartCardInput {
    pub steam_id: String,
    pub player_name: String,
    pub avatar_url: Option<String>,
    pub app_id: String,
    pub game_name: String,
    pub cover_path: Option<PathBuf>,
    pub superpower: String,
    pub online_count: Option<u64>,
}

/// Inputs consumed by the end-of-session card renderer.
#[derive(Debug, Clone)]
pub struct EndCardInput {
    pub steam_id: String,
    pub player_name: String,
    pub avatar_url: Option<String>,
    pub app_id: String,
    pub game_name: String,
    pub cover_path: Option<PathBuf>,
    /// "YYYY-MM-DD HH:MM" local end time.
    pub end_time: String,
    pub tip_text: String,
    pub duration_hours: f64,
}

/// Inputs consumed by the achievement card renderer.
#[derive(Debug, Clone)]
pub struct AchievementCardInput {
    pub steam_id: String,
    pub player_name: String,
    pub app_id: String,
    pub game_name: String,
    /// Newly unlocked ids to highlight (already capped by the caller).
    pub highlight: Vec<String>,
    /// Full unlocked set for locked/unlocked shading.
    pub unlocked: HashSet<String>,
}
