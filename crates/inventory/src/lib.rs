//! Inventory domain: categories, items, the stock ledger and its reports.
//!
//! Pure business rules only. Every stock change is decided here as an
//! [`EntryDraft`]; storage commits the draft and the stock delta together.

pub mod category;
pub mod entry;
pub mod item;
pub mod reports;
pub mod sku;

pub use category::{Category, CategoryDetail, CategorySummary, CategoryUpdate, NewCategory};
pub use entry::{
    DEFAULT_ENTRY_LIMIT, EntryDraft, EntryFilter, EntryKind, ITEM_HISTORY_LIMIT, LedgerEntry,
    LedgerRow,
};
pub use item::{
    DEFAULT_LOW_STOCK_THRESHOLD, Item, ItemDetail, ItemFilter, ItemListing, ItemRow, ItemUpdate,
    NewItem, RecordSale, StockIn, StockOut,
};
pub use reports::{CategoryStat, ItemStat, ReportSource, Summary};
pub use sku::{generate_sku, normalize_sku};
