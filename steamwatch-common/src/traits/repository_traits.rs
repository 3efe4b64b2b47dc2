use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Error;
use crate::models::group::GroupStateSnapshot;
use crate::models::{GroupId, SteamId};

/// Snapshot/restore of one group's engine state. A missing group loads as
/// the default (empty) snapshot.
#[async_trait]
pub trait GroupStateRepository: Send + Sync {
    async fn load_group(&self, group_id: &str) -> Result<GroupStateSnapshot, Error>;
    async fn save_group(&self, group_id: &str, snapshot: &GroupStateSnapshot) -> Result<(), Error>;
}

/// The global group → tracked-account-ids map.
#[async_trait]
pub trait RosterRepository: Send + Sync {
    async fn load_rosters(&self) -> Result<HashMap<GroupId, Vec<SteamId>>, Error>;
    async fn save_rosters(&self, rosters: &HashMap<GroupId, Vec<SteamId>>) -> Result<(), Error>;
}

/// The global group → notification-destination-handle map.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn load_sessions(&self) -> Result<HashMap<GroupId, String>, Error>;
    async fn save_sessions(&self, sessions: &HashMap<GroupId, String>) -> Result<(), Error>;
}
