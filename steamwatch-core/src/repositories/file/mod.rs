//! Flat-file JSON repositories.
//!
//! Group state is sharded into one file per map so a corrupt shard only
//! loses that map; rosters and notify destinations each live in a single
//! pretty-printed file meant to be hand-editable.

pub mod group_state;
pub mod roster;
pub mod sessions;

pub use group_state::FileGroupStateRepository;
pub use roster::FileRosterRepository;
pub use sessions::FileSessionRepository;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use steamwatch_common::Error;

/// Reads one JSON file, treating a missing file as the default value.
/// A present-but-unparsable file is also the default, with a warning,
/// so one bad shard cannot wedge startup.
pub(crate) async fn read_json_or_default<T>(path: &Path) -> Result<T, Error>
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("unparsable state file {}: {}", path.display(), e);
                Ok(T::default())
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(Error::Io(e)),
    }
}

pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(Error::Io)?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, bytes).await.map_err(Error::Io)
}
