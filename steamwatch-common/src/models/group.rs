use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::session::PendingQuit;
use crate::models::status::PlayerStatus;
use crate::models::{AppId, SteamId};

/// Per-group toggles. Both default on; `monitor_enabled=false` pauses the
/// whole group, `achievements_enabled=false` only mutes unlock pushes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSettings {
    pub monitor_enabled: bool,
    pub achievements_enabled: bool,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            monitor_enabled: true,
            achievements_enabled: true,
        }
    }
}

/// Everything the engine remembers about one tracking group, in the shape
/// it is persisted and restored. This is the single snapshot/restore unit
/// between the in-memory store and the file repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupStateSnapshot {
    /// Last known status per account.
    pub last_states: HashMap<SteamId, PlayerStatus>,
    /// Session start time per account (present only while playing).
    pub start_play_times: HashMap<SteamId, i64>,
    /// Last quit time per account per title; outlives the pending-quit
    /// buffer and drives the resume check.
    pub last_quit_times: HashMap<SteamId, HashMap<AppId, i64>>,
    /// Unused scratch carried for data-layout compatibility.
    #[serde(default)]
    pub pending_logs: HashMap<SteamId, serde_json::Value>,
    /// Quit events buffered for the reconnect grace window.
    pub pending_quit: HashMap<SteamId, HashMap<AppId, PendingQuit>>,
    /// Recently seen titles, newest last.
    #[serde(default)]
    pub recent_games: Vec<AppId>,
}
