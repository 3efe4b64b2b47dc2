use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use steamwatch_common::traits::api::{
    AchievementSource, CardRenderer, Notifier, PlayerStatusSource, TitleInfoSource,
};
use steamwatch_common::traits::repository_traits::{
    GroupStateRepository, RosterRepository, SessionRepository,
};
use steamwatch_core::config::MonitorConfig;
use steamwatch_core::platforms::steam::{SteamClient, SteamStoreClient, SteamTitleInfo};
use steamwatch_core::repositories::{
    FileGroupStateRepository, FileRosterRepository, FileSessionRepository,
};
use steamwatch_core::services::poller::spawn_poll_loop;
use steamwatch_core::services::{AchievementTimings, AchievementTracker, Monitor, TransitionEngine};
use steamwatch_core::GroupStateStore;

mod commands;
mod notifier;
mod renderer;

use commands::CommandOutcome;
use notifier::ConsoleNotifier;
use renderer::DisabledRenderer;

#[derive(Parser, Debug, Clone)]
#[command(name = "steamwatch")]
#[command(author, version, about = "SteamWatch - Steam presence and achievement monitor")]
struct Args {
    /// Directory for persisted state and media caches
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Configuration file path (defaults to <data_dir>/monitor_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("steamwatch_core=info".parse().unwrap_or_default())
        .add_directive("steamwatch_server=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

async fn load_config(path: &Path) -> MonitorConfig {
    let mut config = match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("unparsable config {}: {}, using defaults", path.display(), e);
                MonitorConfig::default()
            }
        },
        Err(_) => MonitorConfig::default(),
    };
    // Env vars fill keys the file leaves blank.
    if config.steam_api_key.is_empty() {
        if let Ok(key) = std::env::var("STEAM_API_KEY") {
            config.steam_api_key = key;
        }
    }
    if config.sgdb_api_key.is_empty() {
        if let Ok(key) = std::env::var("SGDB_API_KEY") {
            config.sgdb_api_key = key;
        }
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!("SteamWatch starting. data_dir={}", args.data_dir.display());

    tokio::fs::create_dir_all(&args.data_dir).await?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| args.data_dir.join("monitor_config.json"));
    let config = load_config(&config_path).await;
    if config.steam_api_key.is_empty() {
        warn!("no Steam API key configured; set STEAM_API_KEY or `set steam_api_key <key>`");
    }

    let steam = Arc::new(SteamClient::new(&config.steam_api_key, config.retry_times)?);
    let store_client = Arc::new(SteamStoreClient::new(&args.data_dir)?);
    let title_info: Arc<dyn TitleInfoSource> = Arc::new(SteamTitleInfo::new(
        Arc::clone(&store_client),
        Arc::clone(&steam),
    ));
    let status_source: Arc<dyn PlayerStatusSource> = Arc::clone(&steam) as _;
    let achievement_source: Arc<dyn AchievementSource> = Arc::clone(&steam) as _;
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let card_renderer: Arc<dyn CardRenderer> = Arc::new(DisabledRenderer);

    let config = Arc::new(Mutex::new(config));
    let state = Arc::new(GroupStateStore::new());
    let achievements = Arc::new(AchievementTracker::new(
        Arc::clone(&achievement_source),
        Arc::clone(&notifier),
        Arc::clone(&card_renderer),
        Arc::clone(&state),
        Arc::clone(&config),
        AchievementTimings::default(),
    ));
    let engine = Arc::new(TransitionEngine::new(
        Arc::clone(&state),
        Arc::clone(&status_source),
        Arc::clone(&title_info),
        Arc::clone(&notifier),
        Arc::clone(&card_renderer),
        Arc::clone(&achievements),
    ));

    let group_repo: Arc<dyn GroupStateRepository> =
        Arc::new(FileGroupStateRepository::new(&args.data_dir));
    let roster_repo: Arc<dyn RosterRepository> =
        Arc::new(FileRosterRepository::new(&args.data_dir));
    let session_repo: Arc<dyn SessionRepository> =
        Arc::new(FileSessionRepository::new(&args.data_dir));

    let monitor = Arc::new(Monitor::new(
        config,
        Arc::clone(&state),
        engine,
        Arc::clone(&achievements),
        status_source,
        title_info,
        card_renderer,
        Some(store_client),
        group_repo,
        roster_repo,
        session_repo,
    ));
    monitor.restore_all().await;

    let poll_handle = spawn_poll_loop(Arc::clone(&monitor));

    // Interactive console on stdin; ctrl-c triggers the same clean exit.
    let mut current_group = "default".to_string();
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    println!("SteamWatch console ready, type 'help' for commands.");
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        match commands::dispatch(&monitor, &mut current_group, &config_path, line.trim()).await {
                            CommandOutcome::Reply(reply) => {
                                if !reply.is_empty() {
                                    println!("{reply}");
                                }
                            }
                            CommandOutcome::Quit => break,
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, shutting down");
                break;
            }
        }
    }

    poll_handle.abort();
    achievements.shutdown();
    monitor.persist_all().await;
    info!("state persisted, goodbye");
    Ok(())
}
