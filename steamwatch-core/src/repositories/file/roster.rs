use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use steamwatch_common::models::{GroupId, SteamId};
use steamwatch_common::traits::repository_traits::RosterRepository;
use steamwatch_common::Error;

use super::{read_json_or_default, write_json};

const ROSTER_FILE: &str = "steam_groups.json";

/// All group rosters in one `steam_groups.json` map.
pub struct FileRosterRepository {
    path: PathBuf,
}

impl FileRosterRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(ROSTER_FILE),
        }
    }
}

#[async_trait]
impl RosterRepository for FileRosterRepository {
    async fn load_rosters(&self) -> Result<HashMap<GroupId, Vec<SteamId>>, Error> {
        read_json_or_default(&self.path).await
    }

    async fn save_rosters(&self, rosters: &HashMap<GroupId, Vec<SteamId>>) -> Result<(), Error> {
        write_json(&self.path, rosters).await
    }
}
