use async_trait::async_trait;
use tracing::info;

use steamwatch_common::models::notification::Notification;
use steamwatch_common::traits::api::Notifier;
use steamwatch_common::Error;

/// Console-backed delivery; destination handles look like
/// `console:<group>`. A chat transport would slot in behind the same
/// trait.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, destination: &str, note: &Notification) -> Result<(), Error> {
        match &note.image {
            Some(bytes) => info!(
                "[notify -> {}] {} (+card, {} bytes)",
                destination,
                note.text,
                bytes.len()
            ),
            None => info!("[notify -> {}] {}", destination, note.text),
        }
        Ok(())
    }
}
