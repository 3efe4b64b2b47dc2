use serde::{Deserialize, Serialize};

/// Coarse presence level derived from a player summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceState {
    Offline,
    Online,
    Playing,
}

/// Latest known status for one tracked account, as returned by
/// `ISteamUser/GetPlayerSummaries/v2`. Field names follow the API payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub name: Option<String>,
    pub game_id: Option<String>,
    pub game_extra_info: Option<String>,
    pub last_logoff: Option<i64>,
    #[serde(default)]
    pub persona_state: i64,
    pub avatar_full: Option<String>,
    pub avatar: Option<String>,
}

impl PlayerStatus {
    /// The app id currently being played, with the API's empty/"0"
    /// placeholders normalized away.
    pub fn current_game(&self) -> Option<&str> {
        match self.game_id.as_deref() {
            Some("") | Some("0") | None => None,
            Some(id) => Some(id),
        }
    }

    pub fn presence(&self) -> PresenceState {
        if self.current_game().is_some() {
            PresenceState::Playing
        } else if self.persona_state > 0 {
            PresenceState::Online
        } else {
            PresenceState::Offline
        }
    }

    /// Best avatar reference available (full size preferred).
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_full.as_deref().or(self.avatar.as_deref())
    }

    /// Display name, or the given id when the API omitted one.
    pub fn display_name<'a>(&'a self, steam_id: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(steam_id)
    }
}
