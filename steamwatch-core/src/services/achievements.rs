//! Achievement diffing bound to play sessions.
//!
//! Two background routines per active (group, account, title): a periodic
//! re-check while the session runs, and a one-shot delayed final check
//! after it ends. Titles whose fetches keep failing are blacklisted for
//! the rest of the calendar day.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use steamwatch_common::models::notification::{AchievementCardInput, Notification};
use steamwatch_common::models::session::SessionKey;
use steamwatch_common::models::AppId;
use steamwatch_common::traits::api::{AchievementSource, CardRenderer, Notifier};

use crate::config::MonitorConfig;
use crate::state::GroupStateStore;
use crate::tasks::TaskRegistry;

/// Daily failure count after which a title is blacklisted for the day.
const FAIL_THRESHOLD: u32 = 10;

/// Delays for the two background routines, injectable for tests.
#[derive(Debug, Clone, Copy)]
pub struct AchievementTimings {
    pub periodic: Duration,
    pub final_delay: Duration,
}

impl Default for AchievementTimings {
    fn default() -> Self {
        Self {
            periodic: Duration::from_secs(1200),
            final_delay: Duration::from_secs(300),
        }
    }
}

/// Result of one fetch-and-diff pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Fetch succeeded; `new_count` ids were newly unlocked.
    Checked { new_count: usize },
    /// Fetch failed; `blacklisted` is true when this failure crossed the
    /// daily threshold.
    FetchFailed { blacklisted: bool },
}

pub struct AchievementTracker {
    source: Arc<dyn AchievementSource>,
    notifier: Arc<dyn Notifier>,
    renderer: Arc<dyn CardRenderer>,
    store: Arc<GroupStateStore>,
    config: Arc<Mutex<MonitorConfig>>,
    registry: TaskRegistry,
    snapshots: DashMap<SessionKey, HashSet<String>>,
    fail_counts: DashMap<(AppId, NaiveDate), u32>,
    blacklist: DashMap<(AppId, NaiveDate), ()>,
    timings: AchievementTimings,
}

impl AchievementTracker {
    pub fn new(
        source: Arc<dyn AchievementSource>,
        notifier: Arc<dyn Notifier>,
        renderer: Arc<dyn CardRenderer>,
        store: Arc<GroupStateStore>,
        config: Arc<Mutex<MonitorConfig>>,
        timings: AchievementTimings,
    ) -> Self {
        Self {
            source,
            notifier,
            renderer,
            store,
            config,
            registry: TaskRegistry::new(),
            snapshots: DashMap::new(),
            fail_counts: DashMap::new(),
            blacklist: DashMap::new(),
            timings,
        }
    }

    // ----- blacklist bookkeeping (per title, per calendar day) -----

    pub fn is_blacklisted_on(&self, app_id: &str, date: NaiveDate) -> bool {
        self.blacklist.contains_key(&(app_id.to_string(), date))
    }

    pub fn is_blacklisted(&self, app_id: &str) -> bool {
        self.is_blacklisted_on(app_id, Utc::now().date_naive())
    }

    /// Counts one failed fetch; returns true when the title just crossed
    /// the daily threshold and is now blacklisted.
    pub fn record_failure_on(&self, app_id: &str, date: NaiveDate) -> bool {
        let mut count = self
            .fail_counts
            .entry((app_id.to_string(), date))
            .or_insert(0);
        *count += 1;
        if *count >= FAIL_THRESHOLD {
            drop(count);
            self.blacklist.insert((app_id.to_string(), date), ());
            info!(
                "title {} hit {} achievement fetch failures today, blacklisted",
                app_id, FAIL_THRESHOLD
            );
            true
        } else {
            false
        }
    }

    fn record_failure(&self, app_id: &str) -> bool {
        self.record_failure_on(app_id, Utc::now().date_naive())
    }

    // ----- session lifecycle -----

    /// Takes the baseline snapshot for a fresh session and launches the
    /// periodic re-check task, replacing any prior task under the key.
    pub async fn on_session_start(
        self: &Arc<Self>,
        key: SessionKey,
        player_name: String,
        game_name: String,
    ) {
        self.snapshots.remove(&key);
        if self.is_blacklisted(&key.app_id) {
            info!(
                "title {} is blacklisted today, skipping achievement tracking",
                key.app_id
            );
            return;
        }
        match self
            .source
            .fetch_unlocked(&key.steam_id, &key.app_id)
            .await
        {
            Ok(Some(baseline)) => {
                info!(
                    "achievement baseline for {} in {}: {} unlocked",
                    player_name,
                    game_name,
                    baseline.len()
                );
                self.snapshots.insert(key.clone(), baseline);
                let tracker = Arc::clone(self);
                let task_key = key.clone();
                let handle = tokio::spawn(async move {
                    tracker
                        .periodic_loop(task_key, player_name, game_name)
                        .await;
                });
                self.registry.replace(key, handle);
            }
            Ok(None) => {
                self.record_failure(&key.app_id);
            }
            Err(e) => {
                error!(
                    "achievement baseline fetch errored (app_id={}): {}",
                    key.app_id, e
                );
            }
        }
    }

    /// Drops the periodic task and snapshot for a session superseded by a
    /// direct title switch; no final check runs for it.
    pub fn on_session_superseded(&self, key: &SessionKey) {
        if self.registry.cancel(key) {
            debug!(
                "achievement tracking for app {} superseded by a title switch",
                key.app_id
            );
        }
        self.snapshots.remove(key);
    }

    /// Cancels the periodic task and schedules the delayed final check.
    pub fn on_session_end(self: &Arc<Self>, key: SessionKey, player_name: String, game_name: String) {
        self.registry.cancel(&key);
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            tracker.final_check(key, player_name, game_name).await;
        });
    }

    async fn periodic_loop(self: Arc<Self>, key: SessionKey, player_name: String, game_name: String) {
        loop {
            sleep(self.timings.periodic).await;
            if self.is_blacklisted(&key.app_id) {
                info!(
                    "title {} blacklisted, ending periodic achievement check",
                    key.app_id
                );
                break;
            }
            match self.check_once(&key, &player_name, &game_name).await {
                CheckOutcome::FetchFailed { blacklisted: true } => break,
                CheckOutcome::FetchFailed { blacklisted: false } => continue,
                CheckOutcome::Checked { new_count } => {
                    debug!(
                        "periodic achievement check for {} in {}: {} new",
                        player_name, game_name, new_count
                    );
                }
            }
        }
    }

    async fn final_check(self: Arc<Self>, key: SessionKey, player_name: String, game_name: String) {
        sleep(self.timings.final_delay).await;
        if !self.is_blacklisted(&key.app_id) {
            self.check_once(&key, &player_name, &game_name).await;
        }
        // Cleanup runs regardless of what the check found.
        self.snapshots.remove(&key);
        self.registry.remove(&key);
    }

    /// One fetch-and-diff pass; notifies and advances the snapshot when
    /// new ids appear.
    pub async fn check_once(
        &self,
        key: &SessionKey,
        player_name: &str,
        game_name: &str,
    ) -> CheckOutcome {
        let current = match self.source.fetch_unlocked(&key.steam_id, &key.app_id).await {
            Ok(Some(set)) => set,
            _ => {
                let blacklisted = self.record_failure(&key.app_id);
                return CheckOutcome::FetchFailed { blacklisted };
            }
        };
        let new: HashSet<String> = match self.snapshots.get(key) {
            Some(snapshot) => current.difference(&*snapshot).cloned().collect(),
            None => return CheckOutcome::Checked { new_count: 0 },
        };
        if !new.is_empty() {
            info!(
                "{} unlocked {} new achievement(s) in {}",
                player_name,
                new.len(),
                game_name
            );
            self.notify_new(key, player_name, game_name, &new).await;
            self.snapshots.insert(key.clone(), current);
        }
        CheckOutcome::Checked { new_count: new.len() }
    }

    /// Pushes an unlock notification: capped id list plus overflow count,
    /// with a best-effort rendered card and plain-text fallback.
    pub async fn notify_new(
        &self,
        key: &SessionKey,
        player_name: &str,
        game_name: &str,
        new: &HashSet<String>,
    ) {
        if new.is_empty() {
            return;
        }
        if !self.store.settings(&key.group_id).await.achievements_enabled {
            return;
        }
        let Some(destination) = self.store.destination(&key.group_id).await else {
            warn!(
                "no notify destination for group {}, dropping achievement push",
                key.group_id
            );
            return;
        };

        let cap = self.config.lock().await.max_achievement_notifications;
        let mut highlight: Vec<String> = new.iter().cloned().collect();
        highlight.sort();
        let extra = highlight.len().saturating_sub(cap);
        highlight.truncate(cap);

        let mut text = format!("🎉 {player_name} unlocked new achievements in {game_name}!");
        // Unlocked set for locked/unlocked shading; fall back to the
        // snapshot when the fresh fetch fails.
        let unlocked = match self.source.fetch_unlocked(&key.steam_id, &key.app_id).await {
            Ok(Some(set)) => set,
            _ => self
                .snapshots
                .get(key)
                .map(|s| s.clone())
                .unwrap_or_default(),
        };
        let card = AchievementCardInput {
            steam_id: key.steam_id.clone(),
            player_name: player_name.to_string(),
            app_id: key.app_id.clone(),
            game_name: game_name.to_string(),
            highlight: highlight.clone(),
            unlocked,
        };
        let note = match self.renderer.render_achievements(&card).await {
            Ok(bytes) => Notification {
                text,
                image: Some(bytes),
            },
            Err(e) => {
                warn!("achievement card render failed, using text: {}", e);
                for id in &highlight {
                    text.push_str(&format!("\n• {id}"));
                }
                if extra > 0 {
                    text.push_str(&format!("\n...and {extra} more"));
                }
                Notification::text_only(text)
            }
        };
        if let Err(e) = self.notifier.send(&destination, &note).await {
            error!("failed to push achievement notification: {}", e);
        }
    }

    // ----- introspection / shutdown -----

    /// One-off unlocked fetch, for the render-test diagnostics.
    pub async fn fetch_unlocked_now(
        &self,
        steam_id: &str,
        app_id: &str,
    ) -> Option<HashSet<String>> {
        self.source.fetch_unlocked(steam_id, app_id).await.ok().flatten()
    }

    pub fn snapshot(&self, key: &SessionKey) -> Option<HashSet<String>> {
        self.snapshots.get(key).map(|s| s.clone())
    }

    pub fn has_task(&self, key: &SessionKey) -> bool {
        self.registry.contains(key)
    }

    /// Aborts every background task and clears working state. The daily
    /// blacklist survives a reset on purpose.
    pub fn shutdown(&self) {
        self.registry.abort_all();
        self.snapshots.clear();
    }
}
