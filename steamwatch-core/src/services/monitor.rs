//! Facade tying the store, engine, tracker, and repositories together.
//! Every administrative operation maps onto one method here; the command
//! surface in the server stays a thin dispatcher.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use chrono::Local;

use steamwatch_common::models::notification::{
    AchievementCardInput, EndCardInput, StartCardInput,
};
use steamwatch_common::models::status::PresenceState;
use steamwatch_common::traits::api::{CardRenderer, PlayerStatusSource, TitleInfoSource};
use steamwatch_common::traits::repository_traits::{
    GroupStateRepository, RosterRepository, SessionRepository,
};
use steamwatch_common::Error;

use crate::config::MonitorConfig;
use crate::platforms::steam::SteamStoreClient;
use crate::services::achievements::AchievementTracker;
use crate::services::flavor;
use crate::services::transition::TransitionEngine;
use crate::state::{AddOutcome, GroupStateStore};
use crate::utils::time;

/// SteamID64 ids are 17-digit decimal strings.
pub fn is_valid_steam_id(id: &str) -> bool {
    id.len() == 17 && id.chars().all(|c| c.is_ascii_digit())
}

pub struct Monitor {
    config: Arc<Mutex<MonitorConfig>>,
    store: Arc<GroupStateStore>,
    engine: Arc<TransitionEngine>,
    achievements: Arc<AchievementTracker>,
    status_source: Arc<dyn PlayerStatusSource>,
    title_info: Arc<dyn TitleInfoSource>,
    renderer: Arc<dyn CardRenderer>,
    media: Option<Arc<SteamStoreClient>>,
    group_repo: Arc<dyn GroupStateRepository>,
    roster_repo: Arc<dyn RosterRepository>,
    session_repo: Arc<dyn SessionRepository>,
}

impl Monitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Mutex<MonitorConfig>>,
        store: Arc<GroupStateStore>,
        engine: Arc<TransitionEngine>,
        achievements: Arc<AchievementTracker>,
        status_source: Arc<dyn PlayerStatusSource>,
        title_info: Arc<dyn TitleInfoSource>,
        renderer: Arc<dyn CardRenderer>,
        media: Option<Arc<SteamStoreClient>>,
        group_repo: Arc<dyn GroupStateRepository>,
        roster_repo: Arc<dyn RosterRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            config,
            store,
            engine,
            achievements,
            status_source,
            title_info,
            renderer,
            media,
            group_repo,
            roster_repo,
            session_repo,
        }
    }

    pub fn store(&self) -> &Arc<GroupStateStore> {
        &self.store
    }

    pub fn engine(&self) -> &Arc<TransitionEngine> {
        &self.engine
    }

    pub fn config(&self) -> &Arc<Mutex<MonitorConfig>> {
        &self.config
    }

    // ----- persistence boundary -----

    /// Restores rosters, destinations, and every group snapshot from the
    /// repositories. Groups that restored with a destination resume
    /// monitoring automatically.
    pub async fn restore_all(&self) {
        match self.roster_repo.load_rosters().await {
            Ok(rosters) => self.store.restore_rosters(rosters).await,
            Err(e) => warn!("failed to load rosters: {}", e),
        }
        match self.session_repo.load_sessions().await {
            Ok(sessions) => {
                if !sessions.is_empty() {
                    info!("restored notify destinations for {} group(s)", sessions.len());
                }
                self.store.restore_destinations(sessions).await;
            }
            Err(e) => warn!("failed to load notify destinations: {}", e),
        }
        for group_id in self.store.group_ids().await {
            match self.group_repo.load_group(&group_id).await {
                Ok(snapshot) => self.store.restore_group(&group_id, snapshot).await,
                Err(e) => warn!("failed to load state for group {}: {}", group_id, e),
            }
        }
    }

    /// Writes one group's snapshot; persistence failures are warnings,
    /// the in-memory state stays authoritative.
    pub async fn persist_group(&self, group_id: &str) {
        let snapshot = self.store.snapshot_group(group_id).await;
        if let Err(e) = self.group_repo.save_group(group_id, &snapshot).await {
            warn!("failed to persist state for group {}: {}", group_id, e);
        }
    }

    pub async fn persist_all(&self) {
        for group_id in self.store.group_ids().await {
            self.persist_group(&group_id).await;
        }
        self.persist_rosters().await;
        self.persist_destinations().await;
    }

    async fn persist_rosters(&self) {
        let rosters = self.store.rosters().await;
        if let Err(e) = self.roster_repo.save_rosters(&rosters).await {
            warn!("failed to persist rosters: {}", e);
        }
    }

    async fn persist_destinations(&self) {
        let destinations = self.store.destinations().await;
        if let Err(e) = self.session_repo.save_sessions(&destinations).await {
            warn!("failed to persist notify destinations: {}", e);
        }
    }

    // ----- admin operations -----

    /// Starts monitoring for a group, binding its notification
    /// destination and priming initial statuses.
    pub async fn start_group(&self, group_id: &str, destination: &str) -> Result<String, Error> {
        if self.config.lock().await.steam_api_key.is_empty() {
            return Err(Error::Validation(
                "Steam API key is not configured; set steam_api_key first".into(),
            ));
        }
        let roster = self.store.roster(group_id).await;
        if roster.is_empty() {
            return Err(Error::Validation(
                "no tracked accounts in this group; add one with addid first".into(),
            ));
        }
        if self.store.settings(group_id).await.monitor_enabled
            && self.store.destination(group_id).await.is_some()
        {
            return Ok("monitoring is already running for this group".into());
        }
        self.store.set_monitor_enabled(group_id, true).await;
        self.store.set_destination(group_id, destination).await;
        self.persist_destinations().await;

        // Prime each account's snapshot so the first poll round does not
        // report stale transitions.
        let now = time::current_epoch();
        for steam_id in &roster {
            if let Ok(Some(status)) = self.status_source.fetch_player_summary(steam_id).await {
                if status.presence() == PresenceState::Playing
                    && self.store.session_start(group_id, steam_id).await.is_none()
                {
                    self.store.set_session_start(group_id, steam_id, now).await;
                }
                self.store.set_last_state(group_id, steam_id, status).await;
            }
        }
        self.persist_group(group_id).await;
        Ok("monitoring started for this group".into())
    }

    pub async fn stop_group(&self, group_id: &str) -> String {
        self.store.set_monitor_enabled(group_id, false).await;
        "monitoring and notifications disabled for this group".into()
    }

    /// Adds one or more comma/space separated 17-digit account ids.
    pub async fn add_accounts(&self, group_id: &str, raw: &str) -> Result<String, Error> {
        let ids: Vec<&str> = raw
            .split([',', ' '])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(Error::Validation("no account ids given".into()));
        }
        let invalid: Vec<&str> = ids
            .iter()
            .copied()
            .filter(|id| !is_valid_steam_id(id))
            .collect();
        if !invalid.is_empty() {
            return Err(Error::Validation(format!(
                "invalid SteamID64 (need 17 decimal digits): {}",
                invalid.join(", ")
            )));
        }

        let cap = self.config.lock().await.max_group_size;
        let mut added = Vec::new();
        let mut already = Vec::new();
        let mut full = false;
        for id in ids {
            match self.store.add_account(group_id, id, cap).await {
                AddOutcome::Added => added.push(id.to_string()),
                AddOutcome::AlreadyTracked => already.push(id.to_string()),
                AddOutcome::GroupFull => {
                    full = true;
                    break;
                }
            }
        }
        self.persist_rosters().await;

        let mut msg = String::new();
        if !added.is_empty() {
            msg.push_str(&format!("added: {}\n", added.join(", ")));
        }
        if !already.is_empty() {
            msg.push_str(&format!("already tracked: {}\n", already.join(", ")));
        }
        if full {
            msg.push_str(&format!("group is at its {cap}-account cap, some ids were skipped\n"));
        }
        if msg.is_empty() {
            msg.push_str("no accounts added");
        }
        Ok(msg.trim_end().to_string())
    }

    pub async fn remove_account(&self, group_id: &str, steam_id: &str) -> Result<String, Error> {
        if !self.store.remove_account(group_id, steam_id).await {
            return Err(Error::NotFound(
                "that SteamID is not tracked in this group".into(),
            ));
        }
        self.persist_rosters().await;
        Ok(format!("removed {steam_id} from this group"))
    }

    pub async fn set_achievements_enabled(&self, group_id: &str, enabled: bool) -> String {
        self.store.set_achievements_enabled(group_id, enabled).await;
        if enabled {
            "achievement notifications enabled for this group".into()
        } else {
            "achievement notifications disabled for this group".into()
        }
    }

    /// The `list` command: every group with per-account state and the
    /// next poll countdown.
    pub async fn status_overview(&self) -> String {
        let now = time::current_epoch();
        let mut lines = Vec::new();
        let mut group_ids = self.store.group_ids().await;
        group_ids.sort();
        for group_id in group_ids {
            lines.push(format!("group: {group_id}"));
            for steam_id in self.store.roster(&group_id).await {
                let status = self.store.last_state(&group_id, &steam_id).await;
                let name = status
                    .as_ref()
                    .map(|s| s.display_name(&steam_id).to_string())
                    .unwrap_or_else(|| steam_id.clone());
                let state_str = match &status {
                    Some(s) => match s.presence() {
                        PresenceState::Playing => {
                            let app = s.current_game().unwrap_or_default();
                            let game = self
                                .title_info
                                .title_name(app, s.game_extra_info.as_deref())
                                .await;
                            format!("🟢 playing {game}")
                        }
                        PresenceState::Online => "🟡 online".to_string(),
                        PresenceState::Offline => match s.last_logoff {
                            Some(logoff) => format!(
                                "⚪️ offline, last seen {:.1}h ago",
                                time::hours_since(logoff, now)
                            ),
                            None => "⚪️ offline".to_string(),
                        },
                    },
                    None => "⚪️ no data yet".to_string(),
                };
                let seconds_left = (self.store.next_poll(&group_id, &steam_id).await - now).max(0);
                let poll_str = if seconds_left < 60 {
                    format!("next poll in {seconds_left}s")
                } else {
                    format!("next poll in {}m", seconds_left / 60)
                };
                lines.push(format!("  {name}({steam_id}) - {state_str} ({poll_str})"));
            }
            lines.push(String::new());
        }
        if lines.is_empty() {
            "no groups configured".to_string()
        } else {
            lines.join("\n").trim_end().to_string()
        }
    }

    /// Full engine-state reset; rosters survive, everything else clears.
    pub async fn reset(&self) -> String {
        self.achievements.shutdown();
        self.store.clear_engine_state().await;
        self.persist_all().await;
        "monitor reset, all state cleared".into()
    }

    /// Drops every tracked account across all groups along with their
    /// engine state.
    pub async fn clear_all_accounts(&self) -> String {
        self.achievements.shutdown();
        self.store.clear_all().await;
        self.persist_all().await;
        "all tracked accounts and their state removed".into()
    }

    pub async fn clear_media_cache(&self) -> Result<String, Error> {
        match &self.media {
            Some(media) => {
                let cleared = media.clear_media_cache().await?;
                if cleared.is_empty() {
                    Ok("no cache directories found".into())
                } else {
                    Ok(format!(
                        "cleared cache directories:\n{}",
                        cleared
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join("\n")
                    ))
                }
            }
            None => Ok("no media cache configured".into()),
        }
    }

    // ----- render diagnostics -----

    async fn lookup_card_subject(
        &self,
        steam_id: &str,
        app_id: &str,
    ) -> (String, Option<String>, String) {
        let status = self
            .status_source
            .fetch_player_summary(steam_id)
            .await
            .ok()
            .flatten();
        let name = status
            .as_ref()
            .map(|s| s.display_name(steam_id).to_string())
            .unwrap_or_else(|| steam_id.to_string());
        let avatar_url = status.as_ref().and_then(|s| s.avatar_url().map(str::to_string));
        let game_name = self.title_info.title_name(app_id, None).await;
        (name, avatar_url, game_name)
    }

    /// The `test_game_start_render` command: renders a start card for a
    /// real (account, title) pair and reports the outcome.
    pub async fn test_render_game_start(&self, steam_id: &str, app_id: &str) -> String {
        let (player_name, avatar_url, game_name) =
            self.lookup_card_subject(steam_id, app_id).await;
        let input = StartCardInput {
            steam_id: steam_id.to_string(),
            player_name,
            avatar_url,
            app_id: app_id.to_string(),
            game_name,
            cover_path: self.title_info.cover_path(app_id).await,
            superpower: flavor::daily_superpower(steam_id, chrono::Utc::now().date_naive())
                .to_string(),
            online_count: self.title_info.online_count(app_id).await,
        };
        match self.renderer.render_game_start(&input).await {
            Ok(bytes) => format!("start card rendered ({} bytes)", bytes.len()),
            Err(e) => format!(
                "start card render failed ({e}); notifications will use plain text"
            ),
        }
    }

    /// The `test_game_end_render` command.
    pub async fn test_render_game_end(
        &self,
        steam_id: &str,
        app_id: &str,
        duration_min: f64,
    ) -> String {
        let (player_name, avatar_url, game_name) =
            self.lookup_card_subject(steam_id, app_id).await;
        let input = EndCardInput {
            steam_id: steam_id.to_string(),
            player_name,
            avatar_url,
            app_id: app_id.to_string(),
            game_name,
            cover_path: self.title_info.cover_path(app_id).await,
            end_time: Local::now().format("%Y-%m-%d %H:%M").to_string(),
            tip_text: flavor::quit_tip(duration_min).to_string(),
            duration_hours: (duration_min / 60.0).max(0.0),
        };
        match self.renderer.render_game_end(&input).await {
            Ok(bytes) => format!("end card rendered ({} bytes)", bytes.len()),
            Err(e) => format!(
                "end card render failed ({e}); notifications will use plain text"
            ),
        }
    }

    /// The `test_achievement_render` command: highlights up to `count` of
    /// the account's real unlocked achievements.
    pub async fn test_render_achievements(
        &self,
        steam_id: &str,
        app_id: &str,
        count: usize,
    ) -> String {
        let Some(unlocked) = self.achievements.fetch_unlocked_now(steam_id, app_id).await
        else {
            return "no achievements retrieved (private profile or a title without stats?)"
                .to_string();
        };
        if unlocked.is_empty() {
            return "this account has no unlocked achievements for that title".to_string();
        }
        let (player_name, _, game_name) = self.lookup_card_subject(steam_id, app_id).await;
        let mut highlight: Vec<String> = unlocked.iter().cloned().collect();
        highlight.sort();
        highlight.truncate(count.max(1));
        let input = AchievementCardInput {
            steam_id: steam_id.to_string(),
            player_name,
            app_id: app_id.to_string(),
            game_name,
            highlight,
            unlocked,
        };
        match self.renderer.render_achievements(&input).await {
            Ok(bytes) => format!("achievement card rendered ({} bytes)", bytes.len()),
            Err(e) => format!(
                "achievement card render failed ({e}); notifications will use plain text"
            ),
        }
    }

    pub async fn describe_config(&self) -> String {
        self.config.lock().await.describe()
    }

    pub async fn set_config(&self, key: &str, value: &str) -> Result<String, Error> {
        self.config.lock().await.set_value(key, value)?;
        Ok(format!("set {key} = {value}"))
    }
}
