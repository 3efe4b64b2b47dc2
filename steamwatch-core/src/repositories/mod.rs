pub mod file;

pub use file::{FileGroupStateRepository, FileRosterRepository, FileSessionRepository};
