//! Round-trip tests for the flat-file JSON repositories.

use std::collections::HashMap;

use steamwatch_common::models::group::GroupStateSnapshot;
use steamwatch_common::models::session::PendingQuit;
use steamwatch_common::models::status::PlayerStatus;
use steamwatch_common::traits::repository_traits::{
    GroupStateRepository, RosterRepository, SessionRepository,
};
use steamwatch_core::repositories::{
    FileGroupStateRepository, FileRosterRepository, FileSessionRepository,
};

const SID: &str = "76561198000000001";

#[tokio::test]
async fn missing_files_load_as_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FileGroupStateRepository::new(dir.path());
    let snapshot = repo.load_group("nope").await.unwrap();
    assert!(snapshot.last_states.is_empty());
    assert!(snapshot.pending_quit.is_empty());

    let rosters = FileRosterRepository::new(dir.path());
    assert!(rosters.load_rosters().await.unwrap().is_empty());

    let sessions = FileSessionRepository::new(dir.path());
    assert!(sessions.load_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn group_state_round_trips_through_sharded_files() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FileGroupStateRepository::new(dir.path());

    let mut snapshot = GroupStateSnapshot::default();
    snapshot.last_states.insert(
        SID.to_string(),
        PlayerStatus {
            name: Some("alice".into()),
            game_id: Some("440".into()),
            game_extra_info: Some("Team Fortress 2".into()),
            persona_state: 1,
            ..Default::default()
        },
    );
    snapshot.start_play_times.insert(SID.to_string(), 1_700_000_000);
    snapshot
        .last_quit_times
        .entry(SID.to_string())
        .or_default()
        .insert("440".to_string(), 1_699_999_000);
    snapshot
        .pending_quit
        .entry(SID.to_string())
        .or_default()
        .insert(
            "440".to_string(),
            PendingQuit {
                quit_time: 1_700_000_100,
                name: "alice".into(),
                game_name: "Team Fortress 2".into(),
                duration_min: 25.5,
                start_time: 1_699_998_570,
                notified: false,
            },
        );
    snapshot.recent_games.push("440".to_string());

    repo.save_group("g1", &snapshot).await.unwrap();

    // Each map landed in its own shard.
    assert!(dir.path().join("group_g1_states.json").exists());
    assert!(dir.path().join("group_g1_pending_quit.json").exists());

    let loaded = repo.load_group("g1").await.unwrap();
    assert_eq!(loaded.last_states[SID].name.as_deref(), Some("alice"));
    assert_eq!(loaded.start_play_times[SID], 1_700_000_000);
    assert_eq!(loaded.last_quit_times[SID]["440"], 1_699_999_000);
    let pq = &loaded.pending_quit[SID]["440"];
    assert_eq!(pq.quit_time, 1_700_000_100);
    assert!((pq.duration_min - 25.5).abs() < 1e-9);
    assert!(!pq.notified);
    assert_eq!(loaded.recent_games, vec!["440".to_string()]);
}

#[tokio::test]
async fn corrupt_shard_loads_as_default() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("group_g1_states.json"), b"not json")
        .await
        .unwrap();
    let repo = FileGroupStateRepository::new(dir.path());
    let snapshot = repo.load_group("g1").await.unwrap();
    assert!(snapshot.last_states.is_empty());
}

#[tokio::test]
async fn rosters_and_sessions_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    let rosters_repo = FileRosterRepository::new(dir.path());
    let mut rosters = HashMap::new();
    rosters.insert("g1".to_string(), vec![SID.to_string()]);
    rosters_repo.save_rosters(&rosters).await.unwrap();
    assert_eq!(rosters_repo.load_rosters().await.unwrap(), rosters);
    assert!(dir.path().join("steam_groups.json").exists());

    let sessions_repo = FileSessionRepository::new(dir.path());
    let mut sessions = HashMap::new();
    sessions.insert("g1".to_string(), "console:g1".to_string());
    sessions_repo.save_sessions(&sessions).await.unwrap();
    assert_eq!(sessions_repo.load_sessions().await.unwrap(), sessions);
    assert!(dir.path().join("notify_sessions.json").exists());
}
