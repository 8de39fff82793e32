use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use shopledger_auth::User;
use shopledger_core::{CategoryId, DomainError, Entity, EntryId, ItemId, UserId};
use shopledger_inventory::{
    Category, CategorySummary, EntryDraft, EntryFilter, EntryKind, Item, LedgerEntry,
};

use super::r#trait::{LedgerStore, StoreError, StoreResult, conflict};

/// Failures to inject into the next units of work.
///
/// Used by tests to prove that a unit of work which fails halfway leaves no
/// trace. The plan stays active until replaced.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Fail after the ledger entry is staged, before the stock counter is updated.
    pub fail_stock_update: bool,
}

#[derive(Debug, Default)]
struct Tables {
    categories: HashMap<CategoryId, Category>,
    items: HashMap<ItemId, Item>,
    /// Append-only, in commit order.
    entries: Vec<LedgerEntry>,
    users: HashMap<UserId, User>,
    school_name: Option<String>,
    faults: FaultPlan,
}

/// Writes staged by one unit of work. Nothing reaches the tables until `commit`.
struct UnitOfWork<'a> {
    tables: &'a mut Tables,
    items: Vec<Item>,
    entries: Vec<LedgerEntry>,
}

impl<'a> UnitOfWork<'a> {
    fn begin(tables: &'a mut Tables) -> Self {
        Self {
            tables,
            items: Vec::new(),
            entries: Vec::new(),
        }
    }

    fn stage_entry(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    fn stage_item(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Apply `entry`'s delta to `item`, refusing to go below zero.
    fn update_stock(&self, item: &mut Item, entry: &LedgerEntry) -> StoreResult<()> {
        if self.tables.faults.fail_stock_update {
            return Err(StoreError::Backend("injected fault: stock update".to_string()));
        }
        item.apply_delta(entry.quantity).map_err(|e| match e {
            DomainError::InsufficientStock {
                available,
                requested,
            } => StoreError::InsufficientStock {
                available,
                requested,
            },
            DomainError::Validation(msg) => StoreError::Invalid(msg),
            other => StoreError::Backend(other.to_string()),
        })?;
        item.updated_at = entry.created_at;
        Ok(())
    }

    fn commit(self) {
        for item in self.items {
            self.tables.items.insert(item.id(), item);
        }
        self.tables.entries.extend(self.entries);
    }
}

/// In-memory ledger store.
///
/// Intended for tests/dev. One `RwLock` guards every table, so each unit of
/// work runs under the write lock and concurrent movements serialize.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active fault plan.
    pub fn set_fault_plan(&self, plan: FaultPlan) -> StoreResult<()> {
        self.write()?.faults = plan;
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn category_name_taken(tables: &Tables, name: &str, except: Option<CategoryId>) -> bool {
    tables
        .categories
        .values()
        .any(|c| c.name == name && Some(c.id) != except)
}

fn items_in_category(tables: &Tables, id: CategoryId) -> u64 {
    tables.items.values().filter(|i| i.category_id == id).count() as u64
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_category(&self, category: Category) -> StoreResult<Category> {
        let mut tables = self.write()?;
        if category_name_taken(&tables, &category.name, None) {
            return Err(StoreError::Conflict(conflict::CATEGORY_NAME.to_string()));
        }
        tables.categories.insert(category.id(), category.clone());
        Ok(category)
    }

    async fn update_category(&self, category: Category) -> StoreResult<Category> {
        let mut tables = self.write()?;
        if !tables.categories.contains_key(&category.id) {
            return Err(StoreError::NotFound("Category".to_string()));
        }
        if category_name_taken(&tables, &category.name, Some(category.id)) {
            return Err(StoreError::Conflict(conflict::CATEGORY_NAME.to_string()));
        }
        tables.categories.insert(category.id(), category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.categories.contains_key(&id) {
            return Err(StoreError::NotFound("Category".to_string()));
        }
        if items_in_category(&tables, id) > 0 {
            return Err(StoreError::Conflict(conflict::CATEGORY_IN_USE.to_string()));
        }
        tables.categories.remove(&id);
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategorySummary>> {
        let tables = self.read()?;
        let mut rows: Vec<CategorySummary> = tables
            .categories
            .values()
            .map(|c| CategorySummary {
                category: c.clone(),
                item_count: items_in_category(&tables, c.id),
            })
            .collect();
        rows.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(rows)
    }

    async fn count_items_in_category(&self, id: CategoryId) -> StoreResult<u64> {
        Ok(items_in_category(&*self.read()?, id))
    }

    async fn insert_item(
        &self,
        item: Item,
        opening: Option<EntryDraft>,
    ) -> StoreResult<(Item, Option<LedgerEntry>)> {
        let mut tables = self.write()?;
        if !tables.categories.contains_key(&item.category_id) {
            return Err(StoreError::NotFound("Category".to_string()));
        }
        if tables.items.values().any(|i| i.sku == item.sku) {
            return Err(StoreError::Conflict(conflict::SKU.to_string()));
        }

        let mut item = item;
        let mut uow = UnitOfWork::begin(&mut tables);
        let entry = match opening {
            Some(draft) if draft.item_id == item.id => {
                let entry = draft.commit(EntryId::new(), item.created_at);
                uow.stage_entry(entry.clone());
                uow.update_stock(&mut item, &entry)?;
                Some(entry)
            }
            Some(_) => {
                return Err(StoreError::Backend(
                    "opening entry targets a different item".to_string(),
                ));
            }
            None => None,
        };
        uow.stage_item(item.clone());
        uow.commit();
        Ok((item, entry))
    }

    async fn update_item(&self, item: Item) -> StoreResult<Item> {
        let mut tables = self.write()?;
        if !tables.categories.contains_key(&item.category_id) {
            return Err(StoreError::NotFound("Category".to_string()));
        }
        let stored = tables
            .items
            .get_mut(&item.id)
            .ok_or_else(|| StoreError::NotFound("Item".to_string()))?;
        let updated = Item {
            sku: stored.sku.clone(),
            stock: stored.stock,
            created_at: stored.created_at,
            ..item
        };
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.items.contains_key(&id) {
            return Err(StoreError::NotFound("Item".to_string()));
        }
        if tables.entries.iter().any(|e| e.item_id == id) {
            return Err(StoreError::Conflict(conflict::ITEM_HAS_ENTRIES.to_string()));
        }
        tables.items.remove(&id);
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    async fn get_item_by_sku(&self, sku: &str) -> StoreResult<Option<Item>> {
        Ok(self.read()?.items.values().find(|i| i.sku == sku).cloned())
    }

    async fn scan_items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.read()?.items.values().cloned().collect())
    }

    async fn scan_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.read()?.categories.values().cloned().collect())
    }

    async fn apply_movement(&self, draft: EntryDraft) -> StoreResult<(Item, LedgerEntry)> {
        let mut tables = self.write()?;
        let mut item = tables
            .items
            .get(&draft.item_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Item".to_string()))?;

        let mut uow = UnitOfWork::begin(&mut tables);
        let entry = draft.commit(EntryId::new(), Utc::now());
        uow.stage_entry(entry.clone());
        uow.update_stock(&mut item, &entry)?;
        uow.stage_item(item.clone());
        uow.commit();
        Ok((item, entry))
    }

    async fn list_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<LedgerEntry>> {
        let tables = self.read()?;
        Ok(tables
            .entries
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(filter.limit)
            .cloned()
            .collect())
    }

    async fn scan_entries(&self, kind: Option<EntryKind>) -> StoreResult<Vec<LedgerEntry>> {
        let tables = self.read()?;
        Ok(tables
            .entries
            .iter()
            .filter(|e| kind.is_none_or(|k| k == e.kind))
            .cloned()
            .collect())
    }

    async fn count_entries_for_item(&self, id: ItemId) -> StoreResult<u64> {
        let tables = self.read()?;
        Ok(tables.entries.iter().filter(|e| e.item_id == id).count() as u64)
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(conflict::EMAIL.to_string()));
        }
        tables.users.insert(user.id(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let mut tables = self.write()?;
        if tables
            .users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(StoreError::Conflict(conflict::EMAIL.to_string()));
        }
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::NotFound("User".to_string()))?;
        *stored = user.clone();
        Ok(user)
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        self.write()?
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound("User".to_string()))
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.read()?;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn get_school_name(&self) -> StoreResult<Option<String>> {
        Ok(self.read()?.school_name.clone())
    }

    async fn set_school_name(&self, name: String) -> StoreResult<String> {
        self.write()?.school_name = Some(name.clone());
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use rust_decimal_macros::dec;
    use shopledger_inventory::{EntryKind, NewCategory, NewItem};

    fn category(name: &str) -> Category {
        NewCategory {
            name: name.to_string(),
            description: None,
        }
        .into_category(Utc::now())
        .unwrap()
    }

    fn item_with_stock(category: &Category, name: &str, stock: i64) -> (Item, Option<EntryDraft>) {
        NewItem {
            cost_price: dec!(200),
            sale_price: dec!(300),
            initial_stock: stock,
            ..NewItem::new(name, category.id)
        }
        .into_item(category, Utc::now())
        .unwrap()
    }

    async fn seeded(stock: i64) -> (InMemoryLedgerStore, Item) {
        let store = InMemoryLedgerStore::new();
        let books = store.insert_category(category("Books")).await.unwrap();
        let (item, opening) = item_with_stock(&books, "Mathematics Class 5", stock);
        let (item, _) = store.insert_item(item, opening).await.unwrap();
        (store, item)
    }

    fn draft(item: &Item, kind: EntryKind, units: i64) -> EntryDraft {
        EntryDraft::new(item.id, kind, units, None, None).unwrap()
    }

    #[tokio::test]
    async fn insert_item_commits_opening_balance_with_the_item() {
        let (store, item) = seeded(100).await;
        assert_eq!(item.stock, 100);

        let entries = store.scan_entries(None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::InitialBalance);
        assert_eq!(entries[0].quantity, 100);
    }

    #[tokio::test]
    async fn duplicate_sku_and_category_name_conflict() {
        let (store, item) = seeded(0).await;
        let books = store.get_category(item.category_id).await.unwrap().unwrap();

        let (twin, _) = item_with_stock(&books, "Mathematics Class 5", 0);
        assert_eq!(
            store.insert_item(twin, None).await.unwrap_err(),
            StoreError::Conflict(conflict::SKU.to_string())
        );
        assert_eq!(
            store.insert_category(category("Books")).await.unwrap_err(),
            StoreError::Conflict(conflict::CATEGORY_NAME.to_string())
        );
    }

    #[tokio::test]
    async fn guarded_decrement_refuses_to_go_negative() {
        let (store, item) = seeded(3).await;

        let err = store
            .apply_movement(draft(&item, EntryKind::Sale, 4))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::InsufficientStock {
                available: 3,
                requested: 4
            }
        );
        assert_eq!(store.get_item(item.id).await.unwrap().unwrap().stock, 3);
        assert_eq!(store.count_entries_for_item(item.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stock_overflow_is_rejected_and_the_store_stays_usable() {
        let (store, item) = seeded(5).await;

        let err = store
            .apply_movement(draft(&item, EntryKind::StockIn, i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert_eq!(store.get_item(item.id).await.unwrap().unwrap().stock, 5);
        assert_eq!(store.count_entries_for_item(item.id).await.unwrap(), 1);

        let (after, _) = store
            .apply_movement(draft(&item, EntryKind::StockIn, 1))
            .await
            .unwrap();
        assert_eq!(after.stock, 6);
    }

    #[tokio::test]
    async fn injected_fault_leaves_no_partial_write() {
        let (store, item) = seeded(10).await;
        store
            .set_fault_plan(FaultPlan {
                fail_stock_update: true,
            })
            .unwrap();

        let err = store
            .apply_movement(draft(&item, EntryKind::StockIn, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(store.get_item(item.id).await.unwrap().unwrap().stock, 10);
        assert_eq!(store.count_entries_for_item(item.id).await.unwrap(), 1);

        store.set_fault_plan(FaultPlan::default()).unwrap();
        let (after, _) = store
            .apply_movement(draft(&item, EntryKind::StockIn, 5))
            .await
            .unwrap();
        assert_eq!(after.stock, 15);
    }

    #[tokio::test]
    async fn injected_fault_during_creation_drops_the_item_too() {
        let store = InMemoryLedgerStore::new();
        let books = store.insert_category(category("Books")).await.unwrap();
        store
            .set_fault_plan(FaultPlan {
                fail_stock_update: true,
            })
            .unwrap();

        let (item, opening) = item_with_stock(&books, "English Class 3", 20);
        assert!(store.insert_item(item.clone(), opening).await.is_err());
        assert_eq!(store.get_item(item.id).await.unwrap(), None);
        assert!(store.scan_entries(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_item_never_touches_stock_or_sku() {
        let (store, item) = seeded(7).await;
        let tampered = Item {
            name: "Mathematics Class 5 (Revised)".to_string(),
            stock: 9999,
            sku: "HACKED".to_string(),
            ..item.clone()
        };
        let updated = store.update_item(tampered).await.unwrap();
        assert_eq!(updated.name, "Mathematics Class 5 (Revised)");
        assert_eq!(updated.stock, 7);
        assert_eq!(updated.sku, item.sku);
    }

    #[tokio::test]
    async fn entries_are_listed_newest_first_with_limit() {
        let (store, item) = seeded(0).await;
        for units in 1..=5 {
            store
                .apply_movement(draft(&item, EntryKind::StockIn, units))
                .await
                .unwrap();
        }
        let filter = EntryFilter {
            item_id: Some(item.id),
            kind: Some(EntryKind::StockIn),
            limit: 3,
        };
        let quantities: Vec<i64> = store
            .list_entries(&filter)
            .await
            .unwrap()
            .iter()
            .map(|e| e.quantity)
            .collect();
        assert_eq!(quantities, vec![5, 4, 3]);
    }

    #[tokio::test]
    async fn deletes_are_refused_while_referenced() {
        let (store, item) = seeded(1).await;
        assert_eq!(
            store.delete_category(item.category_id).await.unwrap_err(),
            StoreError::Conflict(conflict::CATEGORY_IN_USE.to_string())
        );
        assert_eq!(
            store.delete_item(item.id).await.unwrap_err(),
            StoreError::Conflict(conflict::ITEM_HAS_ENTRIES.to_string())
        );
    }

    #[tokio::test]
    async fn users_are_unique_by_email_and_listed_newest_first() {
        let store = InMemoryLedgerStore::new();
        let at = |s: &str| DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc);
        let user = |email: &str, created: &str| User {
            id: UserId::new(),
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            name: None,
            role: shopledger_auth::Role::Staff,
            is_active: true,
            created_at: at(created),
        };

        store.insert_user(user("old@school.local", "2025-01-01T00:00:00Z")).await.unwrap();
        store.insert_user(user("new@school.local", "2025-06-01T00:00:00Z")).await.unwrap();
        assert_eq!(
            store
                .insert_user(user("old@school.local", "2025-07-01T00:00:00Z"))
                .await
                .unwrap_err(),
            StoreError::Conflict(conflict::EMAIL.to_string())
        );

        let emails: Vec<String> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, vec!["new@school.local", "old@school.local"]);
    }
}
