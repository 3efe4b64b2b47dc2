use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use steamwatch_common::models::GroupId;
use steamwatch_common::traits::repository_traits::SessionRepository;
use steamwatch_common::Error;

use super::{read_json_or_default, write_json};

const SESSIONS_FILE: &str = "notify_sessions.json";

/// Group-to-destination bindings in `notify_sessions.json`; their
/// presence is what lets monitoring resume across restarts.
pub struct FileSessionRepository {
    path: PathBuf,
}

impl FileSessionRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(SESSIONS_FILE),
        }
    }
}

#[async_trait]
impl SessionRepository for FileSessionRepository {
    async fn load_sessions(&self) -> Result<HashMap<GroupId, String>, Error> {
        read_json_or_default(&self.path).await
    }

    async fn save_sessions(&self, sessions: &HashMap<GroupId, String>) -> Result<(), Error> {
        write_json(&self.path, sessions).await
    }
}
