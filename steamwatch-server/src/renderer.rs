use async_trait::async_trait;

use steamwatch_common::models::notification::{
    AchievementCardInput, EndCardInput, StartCardInput,
};
use steamwatch_common::traits::api::CardRenderer;
use steamwatch_common::Error;

/// Placeholder renderer; every call errors so notifications fall back to
/// plain text. An image-composition backend implements the same trait.
pub struct DisabledRenderer;

#[async_trait]
impl CardRenderer for DisabledRenderer {
    async fn render_game_start(&self, _input: &StartCardInput) -> Result<Vec<u8>, Error> {
        Err(Error::Render("card rendering not configured".into()))
    }

    async fn render_game_end(&self, _input: &EndCardInput) -> Result<Vec<u8>, Error> {
        Err(Error::Render("card rendering not configured".into()))
    }

    async fn render_achievements(&self, _input: &AchievementCardInput) -> Result<Vec<u8>, Error> {
        Err(Error::Render("card rendering not configured".into()))
    }
}
