use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use shopledger_auth::User;
use shopledger_core::{CategoryId, DomainError, ItemId, UserId};
use shopledger_inventory::{
    Category, CategorySummary, EntryDraft, EntryFilter, EntryKind, Item, LedgerEntry,
};

/// Ledger store operation error.
///
/// These are **infrastructure errors** as opposed to domain errors. Both
/// backends raise the same variants so services never see backend-specific
/// failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Row addressed by id (or natural key) does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Unique or referential constraint would be violated.
    #[error("{0}")]
    Conflict(String),

    /// Guarded decrement refused: the row holds fewer units than requested.
    #[error("Insufficient stock. Available: {available}, requested: {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// A value falls outside what the store can hold (e.g. stock past `i64::MAX`).
    #[error("{0}")]
    Invalid(String),

    /// Storage backend failure (connection, lock poisoning, injected fault).
    #[error("storage failure: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => DomainError::not_found(what),
            StoreError::Conflict(msg) => DomainError::conflict(msg),
            StoreError::InsufficientStock {
                available,
                requested,
            } => DomainError::insufficient_stock(available, requested),
            StoreError::Invalid(msg) => DomainError::validation(msg),
            StoreError::Backend(msg) => DomainError::internal(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Conflict messages shared by both backends.
pub(crate) mod conflict {
    pub const CATEGORY_NAME: &str = "Category name already exists";
    pub const SKU: &str = "SKU already exists";
    pub const EMAIL: &str = "Email already registered";
    pub const CATEGORY_IN_USE: &str = "Category still has items";
    pub const ITEM_HAS_ENTRIES: &str = "Item has ledger entries";
}

/// The single shared mutable resource: categories, items, ledger entries and users.
///
/// ## Unit-of-work guarantees
///
/// - `insert_item` persists the item and its optional opening entry together.
/// - `apply_movement` appends one entry and applies its delta to the item's
///   stock as one indivisible step. Outbound deltas are guarded: the write
///   happens only if the resulting stock is `>= 0`, otherwise
///   [`StoreError::InsufficientStock`] is returned and nothing changes.
///
/// Entries are never updated or deleted through this trait.
///
/// ## Implementation requirements
///
/// Implementations must:
/// - enforce uniqueness of category name, item SKU and user email
/// - refuse to delete categories that own items and items that own entries
/// - never write `stock` or `sku` from `update_item`
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // Categories
    async fn insert_category(&self, category: Category) -> StoreResult<Category>;
    async fn update_category(&self, category: Category) -> StoreResult<Category>;
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()>;
    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>>;
    /// Categories ordered by name, each with its item count.
    async fn list_categories(&self) -> StoreResult<Vec<CategorySummary>>;
    async fn count_items_in_category(&self, id: CategoryId) -> StoreResult<u64>;

    // Items
    /// Insert `item` and, when present, commit `opening` against it in the same unit of work.
    async fn insert_item(
        &self,
        item: Item,
        opening: Option<EntryDraft>,
    ) -> StoreResult<(Item, Option<LedgerEntry>)>;
    /// Overwrite the descriptive fields of an item. Stock and SKU are left untouched.
    async fn update_item(&self, item: Item) -> StoreResult<Item>;
    async fn delete_item(&self, id: ItemId) -> StoreResult<()>;
    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>>;
    async fn get_item_by_sku(&self, sku: &str) -> StoreResult<Option<Item>>;
    /// All items, in no particular order.
    async fn scan_items(&self) -> StoreResult<Vec<Item>>;
    async fn scan_categories(&self) -> StoreResult<Vec<Category>>;

    // Ledger
    /// Append `draft` and apply its delta to the item's stock atomically.
    async fn apply_movement(&self, draft: EntryDraft) -> StoreResult<(Item, LedgerEntry)>;
    /// Entries matching `filter`, newest first, at most `filter.limit`.
    async fn list_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<LedgerEntry>>;
    /// Every entry of `kind` (all kinds when `None`), in no particular order.
    async fn scan_entries(&self, kind: Option<EntryKind>) -> StoreResult<Vec<LedgerEntry>>;
    async fn count_entries_for_item(&self, id: ItemId) -> StoreResult<u64>;

    // Users
    async fn insert_user(&self, user: User) -> StoreResult<User>;
    async fn update_user(&self, user: User) -> StoreResult<User>;
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;
    /// Lookup by normalized (trimmed, lowercase) email.
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Users ordered newest first.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    // School settings (single row)
    async fn get_school_name(&self) -> StoreResult<Option<String>>;
    /// Insert or replace the school name; returns the stored value.
    async fn set_school_name(&self, name: String) -> StoreResult<String>;
}

/// Shared handle used by the services.
pub type SharedLedgerStore = Arc<dyn LedgerStore>;
