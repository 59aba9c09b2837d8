use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinError;

use tipper_db::Database;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry store failure: {0}")]
    Store(String),

    #[error("registry task failed: {0}")]
    Task(#[from] JoinError),
}

/// Identity → settlement address mapping.
///
/// An absent address is a normal outcome, not an error.
#[async_trait]
pub trait AddressRegistry: Send + Sync {
    async fn resolve(&self, identity: &str) -> Result<Option<String>, RegistryError>;

    /// Insert or replace the address for `identity`.
    async fn upsert(&self, identity: &str, address: &str) -> Result<(), RegistryError>;
}

/// Registry backed by the SQLite store. Calls run on the blocking pool.
#[derive(Clone)]
pub struct SqliteRegistry {
    db: Arc<Database>,
}

impl SqliteRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AddressRegistry for SqliteRegistry {
    async fn resolve(&self, identity: &str) -> Result<Option<String>, RegistryError> {
        let db = self.db.clone();
        let identity = identity.to_string();

        tokio::task::spawn_blocking(move || db.get_address(&identity))
            .await?
            .map_err(|e| RegistryError::Store(e.to_string()))
    }

    async fn upsert(&self, identity: &str, address: &str) -> Result<(), RegistryError> {
        let db = self.db.clone();
        let identity = identity.to_string();
        let address = address.to_string();

        tokio::task::spawn_blocking(move || db.upsert_account(&identity, &address))
            .await?
            .map_err(|e| RegistryError::Store(e.to_string()))
    }
}
