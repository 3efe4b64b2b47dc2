// File: steamwatch-common/src/models/mod.rs
pub mod status;
pub mod group;
pub mod session;
pub mod notification;

pub use status::{PlayerStatus, PresenceState};
pub use group::{GroupSettings, GroupStateSnapshot};
pub use session::{PendingQuit, SessionKey};
pub use notification::{
    AchievementCardInput, EndCardInput, Notification, StartCardInput,
};

/// Chat group / notification channel identifier (opaque, externally issued).
pub type GroupId = String;
/// 64-bit SteamID rendered as its 17-digit decimal string.
pub type SteamId = String;
/// Steam application (game) id as returned by the Web API.
pub type AppId = String;
