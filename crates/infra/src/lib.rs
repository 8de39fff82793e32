//! Infrastructure layer: ledger storage, services, configuration.

pub mod config;
pub mod ledger_store;
pub mod services;


pub use config::{BootstrapAdmin, ConfigError, LedgerConfig, Persistence};
pub use ledger_store::{LedgerStore, SharedLedgerStore, StoreError};
pub use services::Services;
