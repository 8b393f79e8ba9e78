//! Per-meeting command serialization
//!
//! Every mutating command of one meeting runs under that meeting's lock, so a
//! phase change and a submission can never interleave between the phase read
//! and the write. Commands on different meetings do not wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MeetingLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl MeetingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `meeting_id`
    ///
    /// Entries nobody holds or waits on are dropped first, so the map only
    /// tracks meetings with commands in flight.
    pub async fn lock(&self, meeting_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(meeting_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}
