//! In-memory session storage

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::application::ports::SessionStorage;
use crate::domain::{ClientResult, PersistedSession};

/// In-memory storage for tests and hosts without a profile directory.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    record: Mutex<Option<PersistedSession>>,
    writes: AtomicUsize,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `record` already stored.
    pub fn with_record(record: PersistedSession) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> Option<PersistedSession> {
        self.slot().clone()
    }

    /// Number of saves performed.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<PersistedSession>> {
        self.record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self) -> ClientResult<Option<PersistedSession>> {
        Ok(self.snapshot())
    }

    async fn save(&self, record: &PersistedSession) -> ClientResult<()> {
        *self.slot() = Some(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        *self.slot() = None;
        Ok(())
    }
}
