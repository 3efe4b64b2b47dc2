//! The transition engine: classifies each fetched status against the last
//! known one, applies the reconnect grace window, keeps the session
//! bookkeeping straight, and emits the notifications.

use std::sync::Arc;

use chrono::{Local, TimeZone, Utc};
use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use steamwatch_common::models::notification::{EndCardInput, Notification, StartCardInput};
use steamwatch_common::models::session::{PendingQuit, SessionKey};
use steamwatch_common::models::status::{PlayerStatus, PresenceState};
use steamwatch_common::traits::api::{CardRenderer, Notifier, PlayerStatusSource, TitleInfoSource};

use crate::services::achievements::AchievementTracker;
use crate::services::flavor;
use crate::state::GroupStateStore;
use crate::utils::time;

/// Reconnect grace window: a quit is buffered this long before the
/// "stopped playing" notification fires.
pub const QUIT_GRACE_SECS: i64 = 180;
/// A start within this window of the title's last quit counts as a
/// resume, not a fresh session.
pub const RESUME_WINDOW_SECS: i64 = 300;

/// Tagged transition classification, evaluated in priority order:
/// Stop beats Start/Switch beats Steady.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionKind {
    Stopped { prev_app: String },
    Started { app: String },
    Steady,
}

pub fn classify(prev_app: Option<&str>, current_app: Option<&str>) -> TransitionKind {
    match (prev_app, current_app) {
        (Some(prev), None) => TransitionKind::Stopped {
            prev_app: prev.to_string(),
        },
        (prev, Some(cur)) if prev != Some(cur) => TransitionKind::Started {
            app: cur.to_string(),
        },
        _ => TransitionKind::Steady,
    }
}

pub struct TransitionEngine {
    store: Arc<GroupStateStore>,
    status_source: Arc<dyn PlayerStatusSource>,
    title_info: Arc<dyn TitleInfoSource>,
    notifier: Arc<dyn Notifier>,
    renderer: Arc<dyn CardRenderer>,
    achievements: Arc<AchievementTracker>,
}

impl TransitionEngine {
    pub fn new(
        store: Arc<GroupStateStore>,
        status_source: Arc<dyn PlayerStatusSource>,
        title_info: Arc<dyn TitleInfoSource>,
        notifier: Arc<dyn Notifier>,
        renderer: Arc<dyn CardRenderer>,
        achievements: Arc<AchievementTracker>,
    ) -> Self {
        Self {
            store,
            status_source,
            title_info,
            notifier,
            renderer,
            achievements,
        }
    }

    pub fn achievements(&self) -> &Arc<AchievementTracker> {
        &self.achievements
    }

    /// Fetches one account and runs it through the engine. A failed fetch
    /// means "no new information this round": the account is skipped and
    /// the prior snapshot kept.
    pub async fn poll_account(
        &self,
        group_id: &str,
        steam_id: &str,
        now: i64,
    ) -> Option<String> {
        match self.status_source.fetch_player_summary(steam_id).await {
            Ok(Some(status)) => self.process_account(group_id, steam_id, status, now).await,
            Ok(None) => None,
            Err(e) => {
                warn!("status fetch errored (steam_id={}): {}", steam_id, e);
                None
            }
        }
    }

    /// One full round for a group: concurrent per-account processing,
    /// then the pending-quit flush. Returns the ambient log lines.
    pub async fn run_group_round(
        &self,
        group_id: &str,
        accounts: &[String],
        now: i64,
    ) -> Vec<String> {
        let results = join_all(
            accounts
                .iter()
                .map(|sid| self.poll_account(group_id, sid, now)),
        )
        .await;
        self.flush_pending_quits(group_id, now).await;
        results.into_iter().flatten().collect()
    }

    /// Applies one fetched status. Returns an ambient status line for the
    /// consolidated log when nothing notable happened (steady state);
    /// transitions report through notifications instead.
    pub async fn process_account(
        &self,
        group_id: &str,
        steam_id: &str,
        status: PlayerStatus,
        now: i64,
    ) -> Option<String> {
        let prev = self.store.last_state(group_id, steam_id).await;
        let prev_app = prev
            .as_ref()
            .and_then(|p| p.current_game())
            .map(str::to_string);
        let name = status.display_name(steam_id).to_string();

        let line = match classify(prev_app.as_deref(), status.current_game()) {
            TransitionKind::Stopped { prev_app } => {
                self.handle_stop(group_id, steam_id, &name, &prev_app, prev.as_ref(), now)
                    .await;
                self.schedule_next(group_id, steam_id, &status, now).await;
                None
            }
            TransitionKind::Started { app } => {
                self.handle_start(group_id, steam_id, &name, &app, prev.as_ref(), &status, now)
                    .await;
                self.schedule_next(group_id, steam_id, &status, now).await;
                None
            }
            TransitionKind::Steady => Some(self.steady_line(group_id, steam_id, &name, &status, now).await),
        };
        self.store
            .set_last_state(group_id, steam_id, status)
            .await;
        line
    }

    // ----- transition branches -----

    async fn handle_stop(
        &self,
        group_id: &str,
        steam_id: &str,
        name: &str,
        prev_app: &str,
        prev: Option<&PlayerStatus>,
        now: i64,
    ) {
        info!("[stop] {} left app {}", name, prev_app);
        let fallback = prev.and_then(|p| p.game_extra_info.as_deref());
        let game_name = self.title_info.title_name(prev_app, fallback).await;

        let start = self.store.take_session_start(group_id, steam_id).await;
        let duration_min = start.map(|s| (now - s) as f64 / 60.0).unwrap_or(0.0);

        let key = SessionKey::new(group_id, steam_id, prev_app);
        self.achievements
            .on_session_end(key, name.to_string(), game_name.clone());

        self.store
            .insert_pending_quit(
                group_id,
                steam_id,
                prev_app,
                PendingQuit {
                    quit_time: now,
                    name: name.to_string(),
                    game_name,
                    duration_min,
                    start_time: start.unwrap_or(now),
                    notified: false,
                },
            )
            .await;
        self.store
            .record_recent_quit(group_id, steam_id, prev_app, now)
            .await;
    }

    async fn handle_start(
        &self,
        group_id: &str,
        steam_id: &str,
        name: &str,
        app: &str,
        prev: Option<&PlayerStatus>,
        status: &PlayerStatus,
        now: i64,
    ) {
        // Flicker guard: a fast quit+relaunch of the same title inside the
        // grace window is noise, not a new session. The buffered quit will
        // still flush on its own schedule.
        if let Some(quit) = self.store.pending_quit(group_id, steam_id, app).await {
            if now - quit.quit_time <= QUIT_GRACE_SECS && !quit.notified {
                debug!(
                    "[flicker] {} relaunched app {} within grace window, suppressed",
                    name, app
                );
                return;
            }
        }

        // A direct title switch supersedes the old title's session; its
        // periodic achievement task must not outlive it.
        if let Some(prev_app) = prev.and_then(|p| p.current_game()) {
            if prev_app != app {
                self.achievements
                    .on_session_superseded(&SessionKey::new(group_id, steam_id, prev_app));
            }
        }

        info!("[start] {} entered app {}", name, app);
        let game_name = self
            .title_info
            .title_name(app, status.game_extra_info.as_deref())
            .await;

        let last_quit = self.store.recent_quit(group_id, steam_id, app).await;
        let is_resume = last_quit
            .map(|t| now - t <= RESUME_WINDOW_SECS)
            .unwrap_or(false);

        let note = if is_resume {
            if self.store.session_start(group_id, steam_id).await.is_none() {
                self.store.set_session_start(group_id, steam_id, now).await;
            }
            Notification::text_only(format!(
                "🔄 {name} resumed playing {game_name}! {}",
                flavor::resume_tail()
            ))
        } else {
            self.store.set_session_start(group_id, steam_id, now).await;
            let text = format!("🟢 {name} started playing {game_name}!");
            let input = StartCardInput {
                steam_id: steam_id.to_string(),
                player_name: name.to_string(),
                avatar_url: self.avatar_for(steam_id, status, prev).await,
                app_id: app.to_string(),
                game_name: game_name.clone(),
                cover_path: self.title_info.cover_path(app).await,
                superpower: flavor::daily_superpower(steam_id, Utc::now().date_naive())
                    .to_string(),
                online_count: self.title_info.online_count(app).await,
            };
            match self.renderer.render_game_start(&input).await {
                Ok(bytes) => Notification {
                    text,
                    image: Some(bytes),
                },
                Err(e) => {
                    warn!("start card render failed, using text: {}", e);
                    Notification::text_only(text)
                }
            }
        };
        self.send_to_group(group_id, &note).await;

        self.store.clear_recent_quit(group_id, steam_id, app).await;
        self.store.remove_pending_quit(group_id, steam_id, app).await;
        self.store.note_recent_game(group_id, app).await;

        let key = SessionKey::new(group_id, steam_id, app);
        self.achievements
            .on_session_start(key, name.to_string(), game_name)
            .await;
    }

    async fn steady_line(
        &self,
        group_id: &str,
        steam_id: &str,
        name: &str,
        status: &PlayerStatus,
        now: i64,
    ) -> String {
        let label = self.schedule_next(group_id, steam_id, status, now).await;
        match status.presence() {
            PresenceState::Playing => {
                let app = status.current_game().unwrap_or_default();
                let game_name = self
                    .title_info
                    .title_name(app, status.game_extra_info.as_deref())
                    .await;
                format!("🟢 [{name}] playing {game_name} ({label})")
            }
            PresenceState::Online => format!("🟡 [{name}] online ({label})"),
            PresenceState::Offline => match status.last_logoff {
                Some(logoff) => format!(
                    "⚪️ [{name}] offline, last seen {:.1}h ago ({label})",
                    time::hours_since(logoff, now)
                ),
                None => format!("⚪️ [{name}] offline ({label})"),
            },
        }
    }

    /// Recomputes the account's next poll deadline; returns the cadence
    /// label for logging.
    async fn schedule_next(
        &self,
        group_id: &str,
        steam_id: &str,
        status: &PlayerStatus,
        now: i64,
    ) -> String {
        let interval = time::poll_interval_secs(status, now);
        let deadline = time::align_next_poll(now, interval);
        self.store.set_next_poll(group_id, steam_id, deadline).await;
        time::cadence_label(interval)
    }

    // ----- pending-quit flush -----

    /// Flushes every pending quit whose grace window has elapsed, exactly
    /// once each: entries are marked notified inside the store lock before
    /// any notification is attempted.
    pub async fn flush_pending_quits(&self, group_id: &str, now: i64) {
        let due = self
            .store
            .claim_due_pending_quits(group_id, now, QUIT_GRACE_SECS)
            .await;
        for (steam_id, app_id, entry) in due {
            let text = format!("👋 {} stopped playing {}", entry.name, entry.game_name);
            let end_time = Local
                .timestamp_opt(entry.quit_time, 0)
                .single()
                .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let avatar_url = match self.store.last_state(group_id, &steam_id).await {
                Some(last) => last.avatar_url().map(str::to_string),
                None => None,
            };
            let input = EndCardInput {
                steam_id: steam_id.clone(),
                player_name: entry.name.clone(),
                avatar_url,
                app_id: app_id.clone(),
                game_name: entry.game_name.clone(),
                cover_path: self.title_info.cover_path(&app_id).await,
                end_time,
                tip_text: flavor::quit_tip(entry.duration_min).to_string(),
                duration_hours: (entry.duration_min / 60.0).max(0.0),
            };
            let note = match self.renderer.render_game_end(&input).await {
                Ok(bytes) => Notification {
                    text,
                    image: Some(bytes),
                },
                Err(e) => {
                    warn!("end card render failed, using text: {}", e);
                    Notification::text_only(text)
                }
            };
            self.send_to_group(group_id, &note).await;
            self.store
                .remove_pending_quit(group_id, &steam_id, &app_id)
                .await;
        }
    }

    // ----- helpers -----

    async fn avatar_for(
        &self,
        steam_id: &str,
        status: &PlayerStatus,
        prev: Option<&PlayerStatus>,
    ) -> Option<String> {
        if let Some(url) = status.avatar_url() {
            return Some(url.to_string());
        }
        if let Some(url) = prev.and_then(|p| p.avatar_url()) {
            return Some(url.to_string());
        }
        match self.status_source.fetch_player_summary(steam_id).await {
            Ok(Some(fresh)) => fresh.avatar_url().map(str::to_string),
            _ => None,
        }
    }

    async fn send_to_group(&self, group_id: &str, note: &Notification) {
        match self.store.destination(group_id).await {
            Some(destination) => {
                if let Err(e) = self.notifier.send(&destination, note).await {
                    error!("failed to push notification to group {}: {}", group_id, e);
                }
            }
            None => error!("no notify destination set for group {}", group_id),
        }
    }
}
