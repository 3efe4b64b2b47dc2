use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{error, warn};

use steamwatch_common::models::status::PlayerStatus;
use steamwatch_common::traits::api::{AchievementSource, PlayerStatusSource};
use steamwatch_common::Error;

const SUMMARIES_URL: &str = "https://api.steampowered.com/ISteamUser/GetPlayerSummaries/v2/";
const ACHIEVEMENTS_URL: &str =
    "https://api.steampowered.com/ISteamUserStats/GetPlayerAchievements/v1/";
const PLAYER_COUNT_URL: &str =
    "https://api.steampowered.com/ISteamUserStats/GetNumberOfCurrentPlayers/v1/";

/// Steam Web API client for player summaries and achievement lookups.
pub struct SteamClient {
    http_client: Client,
    api_key: String,
    retry_times: u32,
}

/// JSON shape for `GetPlayerSummaries` (only the fields we consume).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlayerSummaryJson {
    personaname: Option<String>,
    gameid: Option<String>,
    gameextrainfo: Option<String>,
    lastlogoff: Option<i64>,
    personastate: i64,
    avatarfull: Option<String>,
    avatar: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummariesResponseJson {
    players: Vec<PlayerSummaryJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummariesEnvelopeJson {
    response: SummariesResponseJson,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AchievementJson {
    apiname: String,
    achieved: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlayerStatsJson {
    success: bool,
    achievements: Vec<AchievementJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AchievementsEnvelopeJson {
    playerstats: PlayerStatsJson,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlayerCountResponseJson {
    player_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlayerCountEnvelopeJson {
    response: PlayerCountResponseJson,
}

impl SteamClient {
    pub fn new(api_key: &str, retry_times: u32) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http_client,
            api_key: api_key.to_string(),
            // A zero retry count would skip the fetch loop entirely.
            retry_times: retry_times.max(1),
        })
    }

    async fn try_fetch_summary(&self, steam_id: &str) -> Result<PlayerStatus, Error> {
        let url = format!(
            "{SUMMARIES_URL}?key={}&steamids={}",
            self.api_key, steam_id
        );
        let resp = self.http_client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(Error::Platform(format!("HTTP {}", resp.status())));
        }
        let envelope: SummariesEnvelopeJson = resp.json().await?;
        let player = envelope
            .response
            .players
            .into_iter()
            .next()
            .ok_or_else(|| Error::Platform("no player record in response".to_string()))?;
        Ok(PlayerStatus {
            name: player.personaname,
            game_id: player.gameid,
            game_extra_info: player.gameextrainfo,
            last_logoff: player.lastlogoff,
            persona_state: player.personastate,
            avatar_full: player.avatarfull,
            avatar: player.avatar,
        })
    }

    /// Current online player count for a title, best effort.
    pub async fn online_count(&self, app_id: &str) -> Option<u64> {
        let url = format!("{PLAYER_COUNT_URL}?appid={app_id}");
        match self.http_client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<PlayerCountEnvelopeJson>().await {
                    Ok(envelope) => envelope.response.player_count,
                    Err(e) => {
                        warn!("failed to parse player count (app_id={}): {}", app_id, e);
                        None
                    }
                }
            }
            Ok(resp) => {
                warn!("player count HTTP {} (app_id={})", resp.status(), app_id);
                None
            }
            Err(e) => {
                warn!("failed to fetch player count (app_id={}): {}", app_id, e);
                None
            }
        }
    }
}

#[async_trait]
impl PlayerStatusSource for SteamClient {
    /// Fetches one player's summary with bounded retry and exponential
    /// backoff. Transport errors, non-200 responses, and payloads missing
    /// the player record all collapse to `Ok(None)` after the retries.
    async fn fetch_player_summary(&self, steam_id: &str) -> Result<Option<PlayerStatus>, Error> {
        let mut delay = Duration::from_secs(1);
        for attempt in 1..=self.retry_times {
            match self.try_fetch_summary(steam_id).await {
                Ok(status) => return Ok(Some(status)),
                Err(e) => {
                    warn!(
                        "failed to fetch Steam status: {} (steam_id={}, attempt {})",
                        e, steam_id, attempt
                    );
                    if attempt < self.retry_times {
                        sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }
        error!(
            "giving up on steam_id={} after {} attempts",
            steam_id, self.retry_times
        );
        Ok(None)
    }
}

#[async_trait]
impl AchievementSource for SteamClient {
    /// Unlocked achievement api-names for (account, title). Any failure,
    /// including a private profile or a title without stats, yields
    /// `Ok(None)` so the caller can count it against the blacklist.
    async fn fetch_unlocked(
        &self,
        steam_id: &str,
        app_id: &str,
    ) -> Result<Option<HashSet<String>>, Error> {
        let url = format!(
            "{ACHIEVEMENTS_URL}?key={}&steamid={}&appid={}",
            self.api_key, steam_id, app_id
        );
        let resp = match self.http_client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    "achievement fetch failed: {} (steam_id={}, app_id={})",
                    e, steam_id, app_id
                );
                return Ok(None);
            }
        };
        if !resp.status().is_success() {
            warn!(
                "achievement fetch HTTP {} (steam_id={}, app_id={})",
                resp.status(),
                steam_id,
                app_id
            );
            return Ok(None);
        }
        let envelope: AchievementsEnvelopeJson = match resp.json().await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    "achievement payload parse failed: {} (steam_id={}, app_id={})",
                    e, steam_id, app_id
                );
                return Ok(None);
            }
        };
        if !envelope.playerstats.success {
            return Ok(None);
        }
        let unlocked = envelope
            .playerstats
            .achievements
            .into_iter()
            .filter(|a| a.achieved == 1)
            .map(|a| a.apiname)
            .collect();
        Ok(Some(unlocked))
    }
}
