//! src/state.rs
//!
//! In-memory store for all per-group engine state. Every nested map the
//! engine touches lives here behind narrow accessors; the only wide
//! operations are the snapshot/restore pair used by the persistence layer.

use std::collections::HashMap;

use tokio::sync::Mutex;

use steamwatch_common::models::group::{GroupSettings, GroupStateSnapshot};
use steamwatch_common::models::session::PendingQuit;
use steamwatch_common::models::status::PlayerStatus;
use steamwatch_common::models::{AppId, GroupId, SteamId};

const RECENT_GAMES_CAP: usize = 50;

#[derive(Default)]
pub struct GroupStateStore {
    groups: Mutex<HashMap<GroupId, GroupStateSnapshot>>,
    rosters: Mutex<HashMap<GroupId, Vec<SteamId>>>,
    destinations: Mutex<HashMap<GroupId, String>>,
    settings: Mutex<HashMap<GroupId, GroupSettings>>,
    next_polls: Mutex<HashMap<GroupId, HashMap<SteamId, i64>>>,
}

/// Outcome of adding one account id to a group roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyTracked,
    GroupFull,
}

impl GroupStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ----- snapshot / restore boundary -----

    pub async fn restore_group(&self, group_id: &str, mut snapshot: GroupStateSnapshot) {
        // An already-notified pending quit was claimed before a crash; the
        // claim pass never re-selects it, so it would otherwise sit in the
        // persisted state forever.
        for quits in snapshot.pending_quit.values_mut() {
            quits.retain(|_, entry| !entry.notified);
        }
        snapshot.pending_quit.retain(|_, quits| !quits.is_empty());
        self.groups.lock().await.insert(group_id.to_string(), snapshot);
    }

    pub async fn snapshot_group(&self, group_id: &str) -> GroupStateSnapshot {
        self.groups
            .lock()
            .await
            .get(group_id)
            .cloned()
            .unwrap_or_default()
    }

    // ----- roster -----

    pub async fn restore_rosters(&self, rosters: HashMap<GroupId, Vec<SteamId>>) {
        *self.rosters.lock().await = rosters;
    }

    pub async fn rosters(&self) -> HashMap<GroupId, Vec<SteamId>> {
        self.rosters.lock().await.clone()
    }

    pub async fn roster(&self, group_id: &str) -> Vec<SteamId> {
        self.rosters
            .lock()
            .await
            .get(group_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn group_ids(&self) -> Vec<GroupId> {
        self.rosters.lock().await.keys().cloned().collect()
    }

    pub async fn add_account(&self, group_id: &str, steam_id: &str, cap: usize) -> AddOutcome {
        let mut rosters = self.rosters.lock().await;
        let roster = rosters.entry(group_id.to_string()).or_default();
        if roster.iter().any(|s| s == steam_id) {
            AddOutcome::AlreadyTracked
        } else if roster.len() >= cap {
            AddOutcome::GroupFull
        } else {
            roster.push(steam_id.to_string());
            AddOutcome::Added
        }
    }

    pub async fn remove_account(&self, group_id: &str, steam_id: &str) -> bool {
        let mut rosters = self.rosters.lock().await;
        match rosters.get_mut(group_id) {
            Some(roster) => {
                let before = roster.len();
                roster.retain(|s| s != steam_id);
                roster.len() != before
            }
            None => false,
        }
    }

    // ----- notification destinations -----

    pub async fn restore_destinations(&self, destinations: HashMap<GroupId, String>) {
        *self.destinations.lock().await = destinations;
    }

    pub async fn destinations(&self) -> HashMap<GroupId, String> {
        self.destinations.lock().await.clone()
    }

    pub async fn destination(&self, group_id: &str) -> Option<String> {
        self.destinations.lock().await.get(group_id).cloned()
    }

    pub async fn set_destination(&self, group_id: &str, destination: &str) {
        self.destinations
            .lock()
            .await
            .insert(group_id.to_string(), destination.to_string());
    }

    // ----- settings -----

    pub async fn settings(&self, group_id: &str) -> GroupSettings {
        self.settings
            .lock()
            .await
            .get(group_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn set_monitor_enabled(&self, group_id: &str, enabled: bool) {
        self.settings
            .lock()
            .await
            .entry(group_id.to_string())
            .or_default()
            .monitor_enabled = enabled;
    }

    pub async fn set_achievements_enabled(&self, group_id: &str, enabled: bool) {
        self.settings
            .lock()
            .await
            .entry(group_id.to_string())
            .or_default()
            .achievements_enabled = enabled;
    }

    // ----- last known status -----

    pub async fn last_state(&self, group_id: &str, steam_id: &str) -> Option<PlayerStatus> {
        self.groups
            .lock()
            .await
            .get(group_id)
            .and_then(|g| g.last_states.get(steam_id))
            .cloned()
    }

    pub async fn set_last_state(&self, group_id: &str, steam_id: &str, status: PlayerStatus) {
        self.groups
            .lock()
            .await
            .entry(group_id.to_string())
            .or_default()
            .last_states
            .insert(steam_id.to_string(), status);
    }

    // ----- session records -----

    pub async fn session_start(&self, group_id: &str, steam_id: &str) -> Option<i64> {
        self.groups
            .lock()
            .await
            .get(group_id)
            .and_then(|g| g.start_play_times.get(steam_id))
            .copied()
    }

    pub async fn set_session_start(&self, group_id: &str, steam_id: &str, start: i64) {
        self.groups
            .lock()
            .await
            .entry(group_id.to_string())
            .or_default()
            .start_play_times
            .insert(steam_id.to_string(), start);
    }

    /// Removes the session record, returning the start time if one existed.
    pub async fn take_session_start(&self, group_id: &str, steam_id: &str) -> Option<i64> {
        self.groups
            .lock()
            .await
            .get_mut(group_id)
            .and_then(|g| g.start_play_times.remove(steam_id))
    }

    // ----- recent quits (resume window) -----

    pub async fn recent_quit(&self, group_id: &str, steam_id: &str, app_id: &str) -> Option<i64> {
        self.groups
            .lock()
            .await
            .get(group_id)
            .and_then(|g| g.last_quit_times.get(steam_id))
            .and_then(|m| m.get(app_id))
            .copied()
    }

    pub async fn record_recent_quit(&self, group_id: &str, steam_id: &str, app_id: &str, at: i64) {
        self.groups
            .lock()
            .await
            .entry(group_id.to_string())
            .or_default()
            .last_quit_times
            .entry(steam_id.to_string())
            .or_default()
            .insert(app_id.to_string(), at);
    }

    pub async fn clear_recent_quit(&self, group_id: &str, steam_id: &str, app_id: &str) {
        if let Some(group) = self.groups.lock().await.get_mut(group_id) {
            if let Some(quits) = group.last_quit_times.get_mut(steam_id) {
                quits.remove(app_id);
            }
        }
    }

    // ----- pending quits (grace window) -----

    pub async fn pending_quit(
        &self,
        group_id: &str,
        steam_id: &str,
        app_id: &str,
    ) -> Option<PendingQuit> {
        self.groups
            .lock()
            .await
            .get(group_id)
            .and_then(|g| g.pending_quit.get(steam_id))
            .and_then(|m| m.get(app_id))
            .cloned()
    }

    pub async fn insert_pending_quit(
        &self,
        group_id: &str,
        steam_id: &str,
        app_id: &str,
        entry: PendingQuit,
    ) {
        self.groups
            .lock()
            .await
            .entry(group_id.to_string())
            .or_default()
            .pending_quit
            .entry(steam_id.to_string())
            .or_default()
            .insert(app_id.to_string(), entry);
    }

    pub async fn remove_pending_quit(&self, group_id: &str, steam_id: &str, app_id: &str) {
        if let Some(group) = self.groups.lock().await.get_mut(group_id) {
            if let Some(pending) = group.pending_quit.get_mut(steam_id) {
                pending.remove(app_id);
            }
        }
    }

    /// Collects pending quits whose grace window has elapsed, marking each
    /// `notified` inside the lock so a concurrent flush cannot pick up the
    /// same entry twice.
    pub async fn claim_due_pending_quits(
        &self,
        group_id: &str,
        now: i64,
        grace_secs: i64,
    ) -> Vec<(SteamId, AppId, PendingQuit)> {
        let mut due = Vec::new();
        let mut groups = self.groups.lock().await;
        if let Some(group) = groups.get_mut(group_id) {
            for (steam_id, quits) in group.pending_quit.iter_mut() {
                for (app_id, entry) in quits.iter_mut() {
                    if !entry.notified && now - entry.quit_time >= grace_secs {
                        entry.notified = true;
                        due.push((steam_id.clone(), app_id.clone(), entry.clone()));
                    }
                }
            }
        }
        due
    }

    // ----- recent title history -----

    pub async fn note_recent_game(&self, group_id: &str, app_id: &str) {
        let mut groups = self.groups.lock().await;
        let group = groups.entry(group_id.to_string()).or_default();
        group.recent_games.retain(|a| a != app_id);
        group.recent_games.push(app_id.to_string());
        if group.recent_games.len() > RECENT_GAMES_CAP {
            let overflow = group.recent_games.len() - RECENT_GAMES_CAP;
            group.recent_games.drain(..overflow);
        }
    }

    // ----- next poll deadlines -----

    pub async fn next_poll(&self, group_id: &str, steam_id: &str) -> i64 {
        self.next_polls
            .lock()
            .await
            .get(group_id)
            .and_then(|m| m.get(steam_id))
            .copied()
            .unwrap_or(0)
    }

    pub async fn set_next_poll(&self, group_id: &str, steam_id: &str, deadline: i64) {
        self.next_polls
            .lock()
            .await
            .entry(group_id.to_string())
            .or_default()
            .insert(steam_id.to_string(), deadline);
    }

    /// Roster members whose deadline has passed.
    pub async fn due_accounts(&self, group_id: &str, now: i64) -> Vec<SteamId> {
        let roster = self.roster(group_id).await;
        let next_polls = self.next_polls.lock().await;
        let deadlines = next_polls.get(group_id);
        roster
            .into_iter()
            .filter(|sid| {
                deadlines
                    .and_then(|m| m.get(sid))
                    .map(|deadline| now >= *deadline)
                    .unwrap_or(true)
            })
            .collect()
    }

    // ----- resets -----

    /// Clears engine state (snapshots, destinations, toggles, deadlines)
    /// while keeping the rosters; the `reset` admin command.
    pub async fn clear_engine_state(&self) {
        self.groups.lock().await.clear();
        self.destinations.lock().await.clear();
        self.settings.lock().await.clear();
        self.next_polls.lock().await.clear();
    }

    pub async fn clear_all(&self) {
        self.clear_engine_state().await;
        self.rosters.lock().await.clear();
    }
}
