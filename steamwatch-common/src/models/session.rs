use serde::{Deserialize, Serialize};

use crate::models::{AppId, GroupId, SteamId};

/// Buffered "stopped playing" record, held for the reconnect grace window
/// before the notification is allowed to fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingQuit {
    pub quit_time: i64,
    pub name: String,
    pub game_name: String,
    pub duration_min: f64,
    pub start_time: i64,
    pub notified: bool,
}

/// Key for per-session achievement bookkeeping (snapshots and background
/// task handles).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub group_id: GroupId,
    pub steam_id: SteamId,
    pub app_id: AppId,
}

impl SessionKey {
    pub fn new(group_id: &str, steam_id: &str, app_id: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            steam_id: steam_id.to_string(),
            app_id: app_id.to_string(),
        }
    }
}
