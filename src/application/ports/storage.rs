//! Session persistence port

use async_trait::async_trait;

use crate::domain::{ClientResult, PersistedSession};

/// One logical record, replaced wholesale on every save.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// `Ok(None)` when nothing is stored. Corrupt records also load as
    /// `None`.
    async fn load(&self) -> ClientResult<Option<PersistedSession>>;

    async fn save(&self, record: &PersistedSession) -> ClientResult<()>;

    async fn clear(&self) -> ClientResult<()>;
}
