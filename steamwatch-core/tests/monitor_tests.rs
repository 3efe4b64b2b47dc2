//! Tests for the admin facade: roster management, monitoring start
//! validation, and the persist/restore cycle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use steamwatch_common::models::notification::{
    AchievementCardInput, EndCardInput, Notification, StartCardInput,
};
use steamwatch_common::models::status::PlayerStatus;
use steamwatch_common::traits::api::{
    AchievementSource, CardRenderer, Notifier, PlayerStatusSource, TitleInfoSource,
};
use steamwatch_common::Error;
use steamwatch_core::config::MonitorConfig;
use steamwatch_core::repositories::{
    FileGroupStateRepository, FileRosterRepository, FileSessionRepository,
};
use steamwatch_core::services::monitor::is_valid_steam_id;
use steamwatch_core::services::{
    AchievementTimings, AchievementTracker, Monitor, TransitionEngine,
};
use steamwatch_core::GroupStateStore;

// ----- mocks -----

struct ScriptedStatusSource {
    statuses: Mutex<HashMap<String, PlayerStatus>>,
}

impl ScriptedStatusSource {
    fn new() -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
        }
    }

    async fn set_status(&self, steam_id: &str, status: PlayerStatus) {
        self.statuses
            .lock()
            .await
            .insert(steam_id.to_string(), status);
    }
}

#[async_trait]
impl PlayerStatusSource for ScriptedStatusSource {
    async fn fetch_player_summary(&self, steam_id: &str) -> Result<Option<PlayerStatus>, Error> {
        Ok(self.statuses.lock().await.get(steam_id).cloned())
    }
}

struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn send(&self, _destination: &str, _note: &Notification) -> Result<(), Error> {
        Ok(())
    }
}

struct NoRenderer;

#[async_trait]
impl CardRenderer for NoRenderer {
    async fn render_game_start(&self, _input: &StartCardInput) -> Result<Vec<u8>, Error> {
        Err(Error::Render("disabled".into()))
    }
    async fn render_game_end(&self, _input: &EndCardInput) -> Result<Vec<u8>, Error> {
        Err(Error::Render("disabled".into()))
    }
    async fn render_achievements(&self, _input: &AchievementCardInput) -> Result<Vec<u8>, Error> {
        Err(Error::Render("disabled".into()))
    }
}

struct EchoTitleInfo;

#[async_trait]
impl TitleInfoSource for EchoTitleInfo {
    async fn title_name(&self, app_id: &str, fallback: Option<&str>) -> String {
        fallback
            .map(str::to_string)
            .unwrap_or_else(|| format!("app {app_id}"))
    }
    async fn online_count(&self, _app_id: &str) -> Option<u64> {
        None
    }
    async fn cover_path(&self, _app_id: &str) -> Option<std::path::PathBuf> {
        None
    }
}

struct UnavailableAchievements;

#[async_trait]
impl AchievementSource for UnavailableAchievements {
    async fn fetch_unlocked(
        &self,
        _steam_id: &str,
        _app_id: &str,
    ) -> Result<Option<HashSet<String>>, Error> {
        Ok(None)
    }
}

// ----- fixture -----

struct Fixture {
    monitor: Arc<Monitor>,
    source: Arc<ScriptedStatusSource>,
}

fn build_monitor(data_dir: &std::path::Path, config: MonitorConfig) -> Fixture {
    let config = Arc::new(Mutex::new(config));
    let store = Arc::new(GroupStateStore::new());
    let source = Arc::new(ScriptedStatusSource::new());
    let notifier: Arc<dyn Notifier> = Arc::new(SilentNotifier);
    let renderer: Arc<dyn CardRenderer> = Arc::new(NoRenderer);
    let title_info: Arc<dyn TitleInfoSource> = Arc::new(EchoTitleInfo);
    let timings = AchievementTimings {
        periodic: Duration::from_secs(3600),
        final_delay: Duration::from_secs(3600),
    };
    let achievements = Arc::new(AchievementTracker::new(
        Arc::new(UnavailableAchievements),
        notifier.clone(),
        renderer.clone(),
        store.clone(),
        config.clone(),
        timings,
    ));
    let engine = Arc::new(TransitionEngine::new(
        store.clone(),
        source.clone(),
        title_info.clone(),
        notifier,
        renderer.clone(),
        achievements.clone(),
    ));
    let monitor = Arc::new(Monitor::new(
        config,
        store,
        engine,
        achievements,
        source.clone(),
        title_info,
        renderer,
        None,
        Arc::new(FileGroupStateRepository::new(data_dir)),
        Arc::new(FileRosterRepository::new(data_dir)),
        Arc::new(FileSessionRepository::new(data_dir)),
    ));
    Fixture { monitor, source }
}

fn keyed_config() -> MonitorConfig {
    MonitorConfig {
        steam_api_key: "test-key".into(),
        ..Default::default()
    }
}

const SID: &str = "76561198000000001";
const SID2: &str = "76561198000000002";

// ----- steam id validation -----

#[test]
fn steam_id_validation() {
    assert!(is_valid_steam_id(SID));
    assert!(!is_valid_steam_id("7656119800000000")); // 16 digits
    assert!(!is_valid_steam_id("765611980000000012")); // 18 digits
    assert!(!is_valid_steam_id("7656119800000000a"));
    assert!(!is_valid_steam_id(""));
}

// ----- roster management -----

#[tokio::test]
async fn add_accounts_parses_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let f = build_monitor(dir.path(), keyed_config());

    let msg = f
        .monitor
        .add_accounts("g1", &format!("{SID}, {SID2}"))
        .await
        .unwrap();
    assert!(msg.contains("added"));
    assert_eq!(f.monitor.store().roster("g1").await.len(), 2);

    // Re-adding reports the duplicate without growing the roster.
    let msg = f.monitor.add_accounts("g1", SID).await.unwrap();
    assert!(msg.contains("already tracked"));
    assert_eq!(f.monitor.store().roster("g1").await.len(), 2);

    assert!(f.monitor.add_accounts("g1", "12345").await.is_err());
    assert!(f.monitor.add_accounts("g1", "").await.is_err());
}

#[tokio::test]
async fn roster_cap_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let config = MonitorConfig {
        max_group_size: 1,
        ..keyed_config()
    };
    let f = build_monitor(dir.path(), config);

    f.monitor.add_accounts("g1", SID).await.unwrap();
    let msg = f.monitor.add_accounts("g1", SID2).await.unwrap();
    assert!(msg.contains("cap"));
    assert_eq!(f.monitor.store().roster("g1").await.len(), 1);
}

// ----- start validation -----

#[tokio::test]
async fn start_requires_api_key_and_roster() {
    let dir = tempfile::tempdir().unwrap();
    let f = build_monitor(dir.path(), MonitorConfig::default());
    assert!(f.monitor.start_group("g1", "console:g1").await.is_err());

    let f = build_monitor(dir.path(), keyed_config());
    assert!(f.monitor.start_group("g1", "console:g1").await.is_err());

    f.monitor.add_accounts("g1", SID).await.unwrap();
    f.monitor.start_group("g1", "console:g1").await.unwrap();
    assert_eq!(
        f.monitor.store().destination("g1").await.as_deref(),
        Some("console:g1")
    );
}

#[tokio::test]
async fn start_primes_playing_accounts_without_notifying() {
    let dir = tempfile::tempdir().unwrap();
    let f = build_monitor(dir.path(), keyed_config());
    f.source
        .set_status(
            SID,
            PlayerStatus {
                name: Some("alice".into()),
                game_id: Some("440".into()),
                game_extra_info: Some("Team Fortress 2".into()),
                persona_state: 1,
                ..Default::default()
            },
        )
        .await;
    f.monitor.add_accounts("g1", SID).await.unwrap();
    f.monitor.start_group("g1", "console:g1").await.unwrap();

    // The already-running session was recorded so its eventual quit has a
    // duration, but no start notification fired.
    assert!(f.monitor.store().session_start("g1", SID).await.is_some());
    assert!(f.monitor.store().last_state("g1", SID).await.is_some());
}

// ----- render diagnostics -----

#[tokio::test]
async fn render_tests_report_the_text_fallback_path() {
    let dir = tempfile::tempdir().unwrap();
    let f = build_monitor(dir.path(), keyed_config());
    f.source
        .set_status(
            SID,
            PlayerStatus {
                name: Some("alice".into()),
                persona_state: 1,
                ..Default::default()
            },
        )
        .await;

    // The fixture renderer always errors, so each diagnostic must report
    // the plain-text fallback rather than failing.
    let msg = f.monitor.test_render_game_start(SID, "440").await;
    assert!(msg.contains("plain text"));
    let msg = f.monitor.test_render_game_end(SID, "440", 45.0).await;
    assert!(msg.contains("plain text"));

    // The fixture achievement source never returns data.
    let msg = f.monitor.test_render_achievements(SID, "440", 3).await;
    assert!(msg.contains("no achievements retrieved"));
}

// ----- persistence cycle -----

#[tokio::test]
async fn state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let f = build_monitor(dir.path(), keyed_config());
    f.monitor.add_accounts("g1", SID).await.unwrap();
    f.monitor.start_group("g1", "console:g1").await.unwrap();
    f.monitor
        .store()
        .set_session_start("g1", SID, 1_700_000_000)
        .await;
    f.monitor.persist_all().await;

    // Fresh store, same files.
    let g = build_monitor(dir.path(), keyed_config());
    g.monitor.restore_all().await;
    assert_eq!(g.monitor.store().roster("g1").await, vec![SID.to_string()]);
    assert_eq!(
        g.monitor.store().destination("g1").await.as_deref(),
        Some("console:g1")
    );
    assert_eq!(
        g.monitor.store().session_start("g1", SID).await,
        Some(1_700_000_000)
    );
}

#[tokio::test]
async fn reset_keeps_rosters_but_drops_engine_state() {
    let dir = tempfile::tempdir().unwrap();
    let f = build_monitor(dir.path(), keyed_config());
    f.monitor.add_accounts("g1", SID).await.unwrap();
    f.monitor.start_group("g1", "console:g1").await.unwrap();
    f.monitor
        .store()
        .set_session_start("g1", SID, 1_700_000_000)
        .await;

    f.monitor.reset().await;
    assert_eq!(f.monitor.store().roster("g1").await, vec![SID.to_string()]);
    assert!(f.monitor.store().destination("g1").await.is_none());
    assert!(f.monitor.store().session_start("g1", SID).await.is_none());

    f.monitor.clear_all_accounts().await;
    assert!(f.monitor.store().roster("g1").await.is_empty());
}
