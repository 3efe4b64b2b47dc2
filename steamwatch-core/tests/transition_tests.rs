//! End-to-end tests for the transition engine: session bookkeeping, the
//! reconnect grace window, resume detection, and flicker suppression.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use steamwatch_common::models::notification::{
    AchievementCardInput, EndCardInput, Notification, StartCardInput,
};
use steamwatch_common::models::session::SessionKey;
use steamwatch_common::models::status::PlayerStatus;
use steamwatch_common::traits::api::{
    AchievementSource, CardRenderer, Notifier, PlayerStatusSource, TitleInfoSource,
};
use steamwatch_common::Error;
use steamwatch_core::config::MonitorConfig;
use steamwatch_core::services::transition::{classify, TransitionKind, QUIT_GRACE_SECS};
use steamwatch_core::services::{AchievementTimings, AchievementTracker, TransitionEngine};
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
}

#[async_trait]
impl PlayerStatusSource for ScriptedStatusSource {
    async fn fetch_player_summary(&self, steam_id: &str) -> Result<Option<PlayerStatus>, Error> {
        Ok(self.statuses.lock().await.get(steam_id).cloned())
    }
}

struct RecordingNotifier {
    sent: Mutex<Vec<(String, Notification)>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    async fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|(_, n)| n.text.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, destination: &str, note: &Notification) -> Result<(), Error> {
        self.sent
            .lock()
            .await
            .push((destination.to_string(), note.clone()));
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

struct EmptySetAchievements;

#[async_trait]
impl AchievementSource for EmptySetAchievements {
    async fn fetch_unlocked(
        &self,
        _steam_id: &str,
        _app_id: &str,
    ) -> Result<Option<HashSet<String>>, Error> {
        Ok(Some(HashSet::new()))
    }
}

// ----- fixture -----

struct Fixture {
    store: Arc<GroupStateStore>,
    engine: TransitionEngine,
    notifier: Arc<RecordingNotifier>,
}

async fn fixture() -> Fixture {
    fixture_with(Arc::new(UnavailableAchievements)).await
}

async fn fixture_with(achievement_source: Arc<dyn AchievementSource>) -> Fixture {
    let store = Arc::new(GroupStateStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let renderer = Arc::new(NoRenderer);
    let config = Arc::new(Mutex::new(MonitorConfig::default()));
    // Long timings keep the background tasks dormant for the test's life.
    let timings = AchievementTimings {
        periodic: Duration::from_secs(3600),
        final_delay: Duration::from_secs(3600),
    };
    let achievements = Arc::new(AchievementTracker::new(
        achievement_source,
        notifier.clone(),
        renderer.clone(),
        store.clone(),
        config,
        timings,
    ));
    let engine = TransitionEngine::new(
        store.clone(),
        Arc::new(ScriptedStatusSource::new()),
        Arc::new(EchoTitleInfo),
        notifier.clone(),
        renderer,
        achievements,
    );
    store.set_destination("g1", "console:g1").await;
    Fixture {
        store,
        engine,
        notifier,
    }
}

fn playing(name: &str, app: &str, title: &str) -> PlayerStatus {
    PlayerStatus {
        name: Some(name.to_string()),
        game_id: Some(app.to_string()),
        game_extra_info: Some(title.to_string()),
        persona_state: 1,
        ..Default::default()
    }
}

fn online(name: &str) -> PlayerStatus {
    PlayerStatus {
        name: Some(name.to_string()),
        persona_state: 1,
        ..Default::default()
    }
}

const SID: &str = "76561198000000001";

// ----- classification -----

#[test]
fn classify_priority() {
    assert_eq!(
        classify(Some("10"), None),
        TransitionKind::Stopped {
            prev_app: "10".into()
        }
    );
    assert_eq!(
        classify(None, Some("10")),
        TransitionKind::Started { app: "10".into() }
    );
    // A direct game switch counts as a start of the new title.
    assert_eq!(
        classify(Some("10"), Some("20")),
        TransitionKind::Started { app: "20".into() }
    );
    assert_eq!(classify(Some("10"), Some("10")), TransitionKind::Steady);
    assert_eq!(classify(None, None), TransitionKind::Steady);
}

// ----- transitions -----

#[tokio::test]
async fn start_records_session_and_notifies() {
    let f = fixture().await;
    let now = 1_700_000_000;

    let line = f
        .engine
        .process_account("g1", SID, playing("alice", "440", "Team Fortress 2"), now)
        .await;
    assert!(line.is_none());

    let texts = f.notifier.texts().await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("started playing Team Fortress 2"));
    assert_eq!(f.store.session_start("g1", SID).await, Some(now));
    assert!(f.store.last_state("g1", SID).await.is_some());
}

#[tokio::test]
async fn stop_buffers_quit_without_immediate_notification() {
    let f = fixture().await;
    let now = 1_700_000_000;
    f.store
        .set_last_state("g1", SID, playing("alice", "440", "Team Fortress 2"))
        .await;
    f.store.set_session_start("g1", SID, now - 600).await;

    f.engine
        .process_account("g1", SID, online("alice"), now)
        .await;

    assert!(f.notifier.texts().await.is_empty());
    let pending = f.store.pending_quit("g1", SID, "440").await.unwrap();
    assert!(!pending.notified);
    assert!((pending.duration_min - 10.0).abs() < 1e-9);
    assert_eq!(f.store.session_start("g1", SID).await, None);
    assert_eq!(f.store.recent_quit("g1", SID, "440").await, Some(now));
}

#[tokio::test]
async fn pending_quit_flushes_exactly_once_after_grace() {
    let f = fixture().await;
    let now = 1_700_000_000;
    f.store
        .set_last_state("g1", SID, playing("alice", "440", "Team Fortress 2"))
        .await;
    f.store.set_session_start("g1", SID, now - 600).await;
    f.engine
        .process_account("g1", SID, online("alice"), now)
        .await;

    // Inside the grace window nothing fires.
    f.engine.flush_pending_quits("g1", now + 60).await;
    assert!(f.notifier.texts().await.is_empty());

    f.engine
        .flush_pending_quits("g1", now + QUIT_GRACE_SECS)
        .await;
    let texts = f.notifier.texts().await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("stopped playing Team Fortress 2"));
    assert!(f.store.pending_quit("g1", SID, "440").await.is_none());

    // A second flush finds nothing.
    f.engine
        .flush_pending_quits("g1", now + QUIT_GRACE_SECS + 60)
        .await;
    assert_eq!(f.notifier.texts().await.len(), 1);
}

#[tokio::test]
async fn restart_within_resume_window_keeps_session_start() {
    let f = fixture().await;
    let now = 1_700_000_000;
    f.store.set_session_start("g1", SID, now - 600).await;
    f.store.record_recent_quit("g1", SID, "440", now - 100).await;

    f.engine
        .process_account("g1", SID, playing("alice", "440", "Team Fortress 2"), now)
        .await;

    let texts = f.notifier.texts().await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("resumed playing Team Fortress 2"));
    // The original start survives so the final duration spans both legs.
    assert_eq!(f.store.session_start("g1", SID).await, Some(now - 600));
    assert_eq!(f.store.recent_quit("g1", SID, "440").await, None);
}

#[tokio::test]
async fn restart_outside_resume_window_is_a_fresh_start() {
    let f = fixture().await;
    let now = 1_700_000_000;
    f.store.record_recent_quit("g1", SID, "440", now - 400).await;

    f.engine
        .process_account("g1", SID, playing("alice", "440", "Team Fortress 2"), now)
        .await;

    let texts = f.notifier.texts().await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("started playing Team Fortress 2"));
    assert_eq!(f.store.session_start("g1", SID).await, Some(now));
}

#[tokio::test]
async fn quick_relaunch_is_suppressed_but_quit_still_flushes() {
    let f = fixture().await;
    let now = 1_700_000_000;
    f.store
        .set_last_state("g1", SID, playing("alice", "440", "Team Fortress 2"))
        .await;
    f.store.set_session_start("g1", SID, now - 600).await;

    // Quit at t, relaunch at t+50: both sides stay silent.
    f.engine
        .process_account("g1", SID, online("alice"), now)
        .await;
    f.engine
        .process_account(
            "g1",
            SID,
            playing("alice", "440", "Team Fortress 2"),
            now + 50,
        )
        .await;
    assert!(f.notifier.texts().await.is_empty());
    // The suppressed start left no fresh session record.
    assert_eq!(f.store.session_start("g1", SID).await, None);

    // The buffered quit flushes on its own schedule.
    f.engine
        .flush_pending_quits("g1", now + QUIT_GRACE_SECS)
        .await;
    let texts = f.notifier.texts().await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("stopped playing"));
}

#[tokio::test]
async fn steady_playing_emits_ambient_line_and_schedules() {
    let f = fixture().await;
    let now = 1_700_000_000;
    f.store
        .set_last_state("g1", SID, playing("alice", "440", "Team Fortress 2"))
        .await;

    let line = f
        .engine
        .process_account("g1", SID, playing("alice", "440", "Team Fortress 2"), now)
        .await
        .unwrap();
    assert!(line.contains("playing Team Fortress 2"));
    assert!(f.notifier.texts().await.is_empty());
    assert!(f.store.next_poll("g1", SID).await > now);
}

#[tokio::test]
async fn game_switch_starts_the_new_title() {
    let f = fixture().await;
    let now = 1_700_000_000;
    f.store
        .set_last_state("g1", SID, playing("alice", "440", "Team Fortress 2"))
        .await;
    f.store.set_session_start("g1", SID, now - 600).await;

    f.engine
        .process_account("g1", SID, playing("alice", "570", "Dota 2"), now)
        .await;

    let texts = f.notifier.texts().await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("started playing Dota 2"));
    assert_eq!(f.store.session_start("g1", SID).await, Some(now));
}

#[tokio::test]
async fn game_switch_cancels_previous_title_achievement_task() {
    let f = fixture_with(Arc::new(EmptySetAchievements)).await;
    let now = 1_700_000_000;

    f.engine
        .process_account("g1", SID, playing("alice", "440", "Team Fortress 2"), now)
        .await;
    let old_key = SessionKey::new("g1", SID, "440");
    assert!(f.engine.achievements().has_task(&old_key));

    f.engine
        .process_account("g1", SID, playing("alice", "570", "Dota 2"), now + 60)
        .await;

    assert!(!f.engine.achievements().has_task(&old_key));
    assert!(f.engine.achievements().snapshot(&old_key).is_none());
    assert!(f
        .engine
        .achievements()
        .has_task(&SessionKey::new("g1", SID, "570")));
}
