//! Ledger store boundary.
//!
//! The storage abstraction the services write through, with an in-memory
//! backend for tests/dev and a PostgreSQL backend for production.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

use std::sync::Arc;

pub use in_memory::{FaultPlan, InMemoryLedgerStore};
pub use postgres::PostgresLedgerStore;
pub use r#trait::{LedgerStore, SharedLedgerStore, StoreError, StoreResult};

use crate::config::Persistence;

/// Open the configured backend. PostgreSQL schemas are migrated before use.
pub async fn open(persistence: &Persistence) -> StoreResult<SharedLedgerStore> {
    match persistence {
        Persistence::InMemory => {
            tracing::warn!("USE_PERSISTENT_STORES is off; ledger data lives in memory only");
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        Persistence::Postgres {
            database_url,
            password,
            max_connections,
        } => {
            let store =
                PostgresLedgerStore::connect(database_url, password.as_deref(), *max_connections)
                    .await?;
            store.migrate().await?;
            tracing::info!(max_connections, "connected to PostgreSQL ledger store");
            Ok(Arc::new(store))
        }
    }
}
