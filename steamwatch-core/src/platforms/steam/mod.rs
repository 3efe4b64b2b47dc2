pub mod client;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

pub use client::SteamClient;
pub use store::SteamStoreClient;

use steamwatch_common::traits::api::TitleInfoSource;

/// Title metadata facade over the two upstream surfaces: names come from
/// the storefront, live player counts from the Web API.
pub struct SteamTitleInfo {
    store: Arc<SteamStoreClient>,
    client: Arc<SteamClient>,
}

impl SteamTitleInfo {
    pub fn new(store: Arc<SteamStoreClient>, client: Arc<SteamClient>) -> Self {
        Self { store, client }
    }
}

#[async_trait]
impl TitleInfoSource for SteamTitleInfo {
    async fn title_name(&self, app_id: &str, fallback: Option<&str>) -> String {
        self.store.title_name(app_id, fallback).await
    }

    async fn online_count(&self, app_id: &str) -> Option<u64> {
        self.client.online_count(app_id).await
    }

    async fn cover_path(&self, app_id: &str) -> Option<PathBuf> {
        self.store.cover_path(app_id, false).await
    }
}
