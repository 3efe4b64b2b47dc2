use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use steamwatch_common::models::group::GroupStateSnapshot;
use steamwatch_common::models::session::PendingQuit;
use steamwatch_common::models::status::PlayerStatus;
use steamwatch_common::models::{AppId, SteamId};
use steamwatch_common::traits::repository_traits::GroupStateRepository;
use steamwatch_common::Error;

use super::{read_json_or_default, write_json};

/// Group state sharded into one JSON file per map, named
/// `group_<id>_<kind>.json` under the data directory.
pub struct FileGroupStateRepository {
    data_dir: PathBuf,
}

impl FileGroupStateRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn shard(&self, group_id: &str, kind: &str) -> PathBuf {
        self.data_dir.join(format!("group_{group_id}_{kind}.json"))
    }
}

#[async_trait]
impl GroupStateRepository for FileGroupStateRepository {
    async fn load_group(&self, group_id: &str) -> Result<GroupStateSnapshot, Error> {
        let last_states: HashMap<SteamId, PlayerStatus> =
            read_json_or_default(&self.shard(group_id, "states")).await?;
        let start_play_times: HashMap<SteamId, i64> =
            read_json_or_default(&self.shard(group_id, "start_play_times")).await?;
        let last_quit_times: HashMap<SteamId, HashMap<AppId, i64>> =
            read_json_or_default(&self.shard(group_id, "last_quit_times")).await?;
        let pending_logs: HashMap<SteamId, serde_json::Value> =
            read_json_or_default(&self.shard(group_id, "pending_logs")).await?;
        let pending_quit: HashMap<SteamId, HashMap<AppId, PendingQuit>> =
            read_json_or_default(&self.shard(group_id, "pending_quit")).await?;
        let recent_games: Vec<AppId> =
            read_json_or_default(&self.shard(group_id, "recent_games")).await?;
        Ok(GroupStateSnapshot {
            last_states,
            start_play_times,
            last_quit_times,
            pending_logs,
            pending_quit,
            recent_games,
        })
    }

    async fn save_group(&self, group_id: &str, snapshot: &GroupStateSnapshot) -> Result<(), Error> {
        write_json(&self.shard(group_id, "states"), &snapshot.last_states).await?;
        write_json(
            &self.shard(group_id, "start_play_times"),
            &snapshot.start_play_times,
        )
        .await?;
        write_json(
            &self.shard(group_id, "last_quit_times"),
            &snapshot.last_quit_times,
        )
        .await?;
        write_json(&self.shard(group_id, "pending_logs"), &snapshot.pending_logs).await?;
        write_json(&self.shard(group_id, "pending_quit"), &snapshot.pending_quit).await?;
        write_json(&self.shard(group_id, "recent_games"), &snapshot.recent_games).await?;
        Ok(())
    }
}
