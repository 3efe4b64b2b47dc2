use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use steamwatch_common::Error;

const APPDETAILS_URL: &str = "https://store.steampowered.com/api/appdetails";
/// Languages tried in order when resolving names and covers.
const LANGS: &[&str] = &["english", "schinese", "japanese"];
/// Local cover images older than this are re-downloaded.
const COVER_REFRESH_SECS: u64 = 30 * 24 * 3600;

/// Steam storefront client: localized title names (cached indefinitely on
/// success, never on failure) and cover art cached on disk.
pub struct SteamStoreClient {
    http_client: Client,
    data_dir: PathBuf,
    name_cache: DashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AppDetailsDataJson {
    name: Option<String>,
    header_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AppDetailsEntryJson {
    success: bool,
    data: Option<AppDetailsDataJson>,
}

impl SteamStoreClient {
    pub fn new(data_dir: &Path) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http_client,
            data_dir: data_dir.to_path_buf(),
            name_cache: DashMap::new(),
        })
    }

    async fn fetch_app_details(&self, app_id: &str, lang: &str) -> Option<AppDetailsDataJson> {
        let url = format!("{APPDETAILS_URL}?appids={app_id}&l={lang}");
        let resp = match self.http_client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                warn!(
                    "appdetails HTTP {} (app_id={}, lang={})",
                    resp.status(),
                    app_id,
                    lang
                );
                return None;
            }
            Err(e) => {
                warn!("appdetails fetch failed: {} (app_id={})", e, app_id);
                return None;
            }
        };
        let body: HashMap<String, AppDetailsEntryJson> = match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("appdetails parse failed: {} (app_id={})", e, app_id);
                return None;
            }
        };
        body.into_iter()
            .find(|(key, _)| key == app_id)
            .and_then(|(_, entry)| if entry.success { entry.data } else { None })
    }

    pub fn cover_dir(&self) -> PathBuf {
        self.data_dir.join("covers")
    }

    fn cover_is_fresh(path: &Path) -> bool {
        let Ok(metadata) = std::fs::metadata(path) else {
            return false;
        };
        match metadata.modified().and_then(|m| {
            m.elapsed()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        }) {
            Ok(age) => age.as_secs() < COVER_REFRESH_SECS,
            Err(_) => true,
        }
    }

    /// Local path to a cached small cover image, downloading (or
    /// refreshing after 30 days) as needed. Falls back to a stale cached
    /// file when the download fails.
    pub async fn cover_path(&self, app_id: &str, force_update: bool) -> Option<PathBuf> {
        let dir = self.cover_dir();
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!("could not create cover cache dir: {}", e);
            return None;
        }
        let path = dir.join(format!("{app_id}.jpg"));
        if !force_update && Self::cover_is_fresh(&path) {
            return Some(path);
        }

        for lang in LANGS {
            let Some(data) = self.fetch_app_details(app_id, lang).await else {
                continue;
            };
            let Some(header) = data.header_image else {
                continue;
            };
            // The storefront serves a small capsule variant alongside the
            // header image.
            let small = header.replace("_header.jpg", "_capsule_184x69.jpg");
            match self.http_client.get(&small).send().await {
                Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                    Ok(bytes) => {
                        if let Err(e) = tokio::fs::write(&path, &bytes).await {
                            warn!("failed to cache cover (app_id={}): {}", app_id, e);
                        }
                        return Some(path);
                    }
                    Err(e) => warn!("cover body read failed (app_id={}): {}", app_id, e),
                },
                Ok(resp) => warn!(
                    "cover download HTTP {} (app_id={}, lang={})",
                    resp.status(),
                    app_id,
                    lang
                ),
                Err(e) => warn!("cover download failed (app_id={}): {}", app_id, e),
            }
        }
        if path.exists() {
            // Stale but better than nothing.
            return Some(path);
        }
        None
    }

    /// Deletes the on-disk media caches. Returns the directories removed.
    pub async fn clear_media_cache(&self) -> Result<Vec<PathBuf>, Error> {
        let mut cleared = Vec::new();
        for dir in [self.cover_dir(), self.data_dir.join("avatars")] {
            if dir.exists() {
                tokio::fs::remove_dir_all(&dir).await?;
                cleared.push(dir);
            }
        }
        self.name_cache.clear();
        Ok(cleared)
    }
}

impl SteamStoreClient {
    /// Resolved display name for a title. Positive results are cached
    /// indefinitely; misses are deliberately not cached so the next
    /// lookup retries.
    pub async fn title_name(&self, app_id: &str, fallback: Option<&str>) -> String {
        if app_id.is_empty() {
            return fallback.unwrap_or("unknown game").to_string();
        }
        if let Some(name) = self.name_cache.get(app_id) {
            return name.clone();
        }
        for lang in LANGS {
            if let Some(data) = self.fetch_app_details(app_id, lang).await {
                if let Some(name) = data.name {
                    self.name_cache.insert(app_id.to_string(), name.clone());
                    return name;
                }
            }
        }
        info!("no store name for app_id={}, using fallback", app_id);
        fallback.unwrap_or("unknown game").to_string()
    }
}
