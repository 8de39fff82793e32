//! Application services: the public operations of the ledger core.
//!
//! Each service runs the authorization gate for its operations, delegates the
//! decisions to the domain crates and persists through a [`LedgerStore`].
//!
//! [`LedgerStore`]: crate::ledger_store::LedgerStore

pub mod catalog;
pub mod ledger;
pub mod reporting;
pub mod settings;
pub mod users;

pub use catalog::CatalogService;
pub use ledger::{LedgerService, SaleReceipt, StockMovement};
pub use reporting::ReportingService;
pub use settings::{DEFAULT_SCHOOL_NAME, SchoolSettings, SettingsService};
pub use users::UserDirectory;

use crate::ledger_store::SharedLedgerStore;

/// All services, sharing one store.
#[derive(Clone)]
pub struct Services {
    pub ledger: LedgerService,
    pub catalog: CatalogService,
    pub reporting: ReportingService,
    pub settings: SettingsService,
    pub users: UserDirectory,
}

impl Services {
    pub fn new(store: SharedLedgerStore, low_stock_threshold: i64) -> Self {
        Self {
            ledger: LedgerService::new(store.clone()),
            catalog: CatalogService::new(store.clone(), low_stock_threshold),
            reporting: ReportingService::new(store.clone(), low_stock_threshold),
            settings: SettingsService::new(store.clone()),
            users: UserDirectory::new(store),
        }
    }
}
