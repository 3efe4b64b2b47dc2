//! Admin command dispatcher for the interactive console.
//!
//! A "group" is a tracking scope with its own roster and notification
//! destination; the console keeps one current group and routes group
//! commands at it.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use steamwatch_core::services::Monitor;

pub enum CommandOutcome {
    Reply(String),
    Quit,
}

const HELP_TEXT: &str = "\
commands:
  group <id>          switch the current group
  on [destination]    start monitoring (default destination console:<group>)
  off                 stop monitoring for the current group
  addid <id>[,<id>..] track SteamID64 accounts in the current group
  delid <id>          stop tracking one account
  list                show every group, account state, and next poll
  config              show the runtime configuration
  set <key> <value>   change one configuration value
  achievement_on      enable achievement notifications for the group
  achievement_off     disable achievement notifications for the group
  test_game_start_render <steamid> <appid>
                      render a sample start card and report the outcome
  test_game_end_render <steamid> <appid> [minutes]
                      render a sample end card
  test_achievement_render <steamid> <appid> [count]
                      render a sample achievement card
  rs                  reset engine state (rosters survive)
  clear_cache         drop cached title names and media files
  clear_allids        remove every tracked account everywhere
  quit                persist state and exit";

pub async fn dispatch(
    monitor: &Arc<Monitor>,
    current_group: &mut String,
    config_path: &Path,
    line: &str,
) -> CommandOutcome {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return CommandOutcome::Reply(String::new());
    };
    let rest: Vec<&str> = parts.collect();

    let reply = match cmd {
        "help" => HELP_TEXT.to_string(),
        "group" => match rest.first() {
            Some(id) => {
                *current_group = id.to_string();
                format!("current group is now {id}")
            }
            None => format!("current group: {current_group}"),
        },
        "on" => {
            let default_dest = format!("console:{current_group}");
            let dest = rest.first().copied().unwrap_or(&default_dest);
            match monitor.start_group(current_group, dest).await {
                Ok(msg) => msg,
                Err(e) => e.to_string(),
            }
        }
        "off" => monitor.stop_group(current_group).await,
        "addid" => {
            if rest.is_empty() {
                "usage: addid <steamid64>[,<steamid64>...]".to_string()
            } else {
                match monitor.add_accounts(current_group, &rest.join(" ")).await {
                    Ok(msg) => msg,
                    Err(e) => e.to_string(),
                }
            }
        }
        "delid" => match rest.first() {
            Some(id) => match monitor.remove_account(current_group, id).await {
                Ok(msg) => msg,
                Err(e) => e.to_string(),
            },
            None => "usage: delid <steamid64>".to_string(),
        },
        "list" => monitor.status_overview().await,
        "config" => monitor.describe_config().await,
        "set" => match (rest.first(), rest.get(1)) {
            (Some(key), Some(value)) => match monitor.set_config(key, value).await {
                Ok(msg) => {
                    save_config(monitor, config_path).await;
                    msg
                }
                Err(e) => e.to_string(),
            },
            _ => "usage: set <key> <value>".to_string(),
        },
        "achievement_on" => monitor.set_achievements_enabled(current_group, true).await,
        "achievement_off" => monitor.set_achievements_enabled(current_group, false).await,
        "test_game_start_render" => match (rest.first(), rest.get(1)) {
            (Some(steam_id), Some(app_id)) => {
                monitor.test_render_game_start(steam_id, app_id).await
            }
            _ => "usage: test_game_start_render <steamid> <appid>".to_string(),
        },
        "test_game_end_render" => match (rest.first(), rest.get(1)) {
            (Some(steam_id), Some(app_id)) => {
                let minutes = rest
                    .get(2)
                    .and_then(|m| m.parse::<f64>().ok())
                    .unwrap_or(120.0);
                monitor.test_render_game_end(steam_id, app_id, minutes).await
            }
            _ => "usage: test_game_end_render <steamid> <appid> [minutes]".to_string(),
        },
        "test_achievement_render" => match (rest.first(), rest.get(1)) {
            (Some(steam_id), Some(app_id)) => {
                let count = rest
                    .get(2)
                    .and_then(|c| c.parse::<usize>().ok())
                    .unwrap_or(3);
                monitor
                    .test_render_achievements(steam_id, app_id, count)
                    .await
            }
            _ => "usage: test_achievement_render <steamid> <appid> [count]".to_string(),
        },
        "rs" => monitor.reset().await,
        "clear_cache" => match monitor.clear_media_cache().await {
            Ok(msg) => msg,
            Err(e) => e.to_string(),
        },
        "clear_allids" => monitor.clear_all_accounts().await,
        "quit" | "exit" => return CommandOutcome::Quit,
        other => format!("unknown command '{other}', try help"),
    };
    CommandOutcome::Reply(reply)
}

async fn save_config(monitor: &Arc<Monitor>, config_path: &Path) {
    let config = monitor.config().lock().await.clone();
    match serde_json::to_vec_pretty(&config) {
        Ok(bytes) => {
            if let Err(e) = tokio::fs::write(config_path, bytes).await {
                warn!("failed to save config to {}: {}", config_path.display(), e);
            }
        }
        Err(e) => warn!("failed to serialize config: {}", e),
    }
}
