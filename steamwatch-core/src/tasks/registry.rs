//! Registry of detached background tasks keyed by session.
//!
//! Inserting under an occupied key aborts the previous handle, so at most
//! one periodic check runs per (group, account, title) at any time.

use dashmap::DashMap;
use tokio::task::JoinHandle;

use steamwatch_common::models::session::SessionKey;

#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<SessionKey, JoinHandle<()>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle` under `key`, aborting any prior task there.
    pub fn replace(&self, key: SessionKey, handle: JoinHandle<()>) {
        if let Some(old) = self.tasks.insert(key, handle) {
            old.abort();
        }
    }

    /// Aborts and removes the task under `key`, if any.
    pub fn cancel(&self, key: &SessionKey) -> bool {
        match self.tasks.remove(key) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drops the mapping without aborting; used by tasks deregistering
    /// themselves on the way out.
    pub fn remove(&self, key: &SessionKey) {
        self.tasks.remove(key);
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.tasks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Aborts everything; called on shutdown and full reset.
    pub fn abort_all(&self) {
        self.tasks.retain(|_, handle| {
            handle.abort();
            false
        });
    }
}
