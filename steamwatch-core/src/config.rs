//! Runtime configuration, loaded from a JSON file by the server and
//! adjustable at runtime through the `set` admin command.

use serde::{Deserialize, Serialize};
use steamwatch_common::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Steam Web API key. Required before monitoring can start.
    pub steam_api_key: String,
    /// Optional SteamGridDB key handed to the card renderer.
    pub sgdb_api_key: String,
    /// Fetch retry count for player summaries.
    pub retry_times: u32,
    /// Maximum tracked accounts per group.
    pub max_group_size: usize,
    /// Cap on achievement ids listed in one unlock notification.
    pub max_achievement_notifications: usize,
    /// Emit per-account lines in the round log instead of a one-liner.
    pub detailed_poll_log: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            steam_api_key: String::new(),
            sgdb_api_key: String::new(),
            retry_times: 3,
            max_group_size: 20,
            max_achievement_notifications: 5,
            detailed_poll_log: true,
        }
    }
}

impl MonitorConfig {
    /// Lines for the `config` admin command. The API keys are redacted.
    pub fn describe(&self) -> String {
        let redact = |s: &str| {
            if s.is_empty() {
                "(unset)".to_string()
            } else {
                format!("(set, {} chars)", s.len())
            }
        };
        [
            format!("steam_api_key: {}", redact(&self.steam_api_key)),
            format!("sgdb_api_key: {}", redact(&self.sgdb_api_key)),
            format!("retry_times: {}", self.retry_times),
            format!("max_group_size: {}", self.max_group_size),
            format!(
                "max_achievement_notifications: {}",
                self.max_achievement_notifications
            ),
            format!("detailed_poll_log: {}", self.detailed_poll_log),
        ]
        .join("\n")
    }

    /// Typed update for one key. Unknown keys and unparsable values are
    /// rejected with a user-facing message; nothing is mutated on error.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), Error> {
        match key {
            "steam_api_key" => self.steam_api_key = value.to_string(),
            "sgdb_api_key" => self.sgdb_api_key = value.to_string(),
            "retry_times" => {
                let parsed: u32 = parse_int(key, value)?;
                if parsed == 0 {
                    return Err(Error::Validation("retry_times must be at least 1".into()));
                }
                self.retry_times = parsed;
            }
            "max_group_size" => self.max_group_size = parse_int(key, value)?,
            "max_achievement_notifications" => {
                self.max_achievement_notifications = parse_int(key, value)?
            }
            "detailed_poll_log" => {
                self.detailed_poll_log = value
                    .parse::<bool>()
                    .map_err(|_| Error::Validation(format!("{key} expects true/false")))?
            }
            _ => return Err(Error::Validation(format!("unknown config key: {key}"))),
        }
        Ok(())
    }
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .parse::<T>()
        .map_err(|_| Error::Validation(format!("{key} expects an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut cfg = MonitorConfig::default();
        assert!(cfg.set_value("poll_flavor", "x").is_err());
    }

    #[test]
    fn set_value_rejects_bad_type_without_mutation() {
        let mut cfg = MonitorConfig::default();
        assert!(cfg.set_value("retry_times", "often").is_err());
        assert_eq!(cfg.retry_times, 3);
        cfg.set_value("retry_times", "5").unwrap();
        assert_eq!(cfg.retry_times, 5);
    }

    #[test]
    fn retry_times_cannot_be_zero() {
        let mut cfg = MonitorConfig::default();
        assert!(cfg.set_value("retry_times", "0").is_err());
        assert_eq!(cfg.retry_times, 3);
    }
}
