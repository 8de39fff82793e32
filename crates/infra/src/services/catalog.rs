//! Category management and item lookups.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, instrument};

use shopledger_auth::{Identity, Role, require_min_role};
use shopledger_core::{CategoryId, DomainError, DomainResult, ItemId};
use shopledger_inventory::category::ensure_deletable;
use shopledger_inventory::{
    Category, CategoryDetail, CategorySummary, CategoryUpdate, EntryFilter, ITEM_HISTORY_LIMIT,
    ItemDetail, ItemFilter, ItemListing, ItemRow, Item, NewCategory, normalize_sku,
};

use crate::ledger_store::SharedLedgerStore;

#[derive(Clone)]
pub struct CatalogService {
    store: SharedLedgerStore,
    low_stock_threshold: i64,
}

impl CatalogService {
    pub fn new(store: SharedLedgerStore, low_stock_threshold: i64) -> Self {
        Self {
            store,
            low_stock_threshold,
        }
    }

    async fn load_category(&self, id: CategoryId) -> DomainResult<Category> {
        self.store
            .get_category(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Categories
    // ─────────────────────────────────────────────────────────────────────────

    /// Categories ordered by name, with their item counts.
    pub async fn list_categories(&self, identity: &Identity) -> DomainResult<Vec<CategorySummary>> {
        require_min_role(identity, Role::Viewer)?;
        Ok(self.store.list_categories().await?)
    }

    pub async fn get_category(
        &self,
        identity: &Identity,
        id: CategoryId,
    ) -> DomainResult<CategoryDetail> {
        require_min_role(identity, Role::Viewer)?;
        let category = self.load_category(id).await?;
        let mut items: Vec<Item> = self
            .store
            .scan_items()
            .await?
            .into_iter()
            .filter(|i| i.category_id == id)
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(CategoryDetail { category, items })
    }

    #[instrument(skip(self, identity, request), fields(user_id = %identity.user_id), err)]
    pub async fn create_category(
        &self,
        identity: &Identity,
        request: NewCategory,
    ) -> DomainResult<Category> {
        require_min_role(identity, Role::Staff)?;
        let category = request.into_category(Utc::now())?;
        let category = self.store.insert_category(category).await?;

        info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    #[instrument(skip(self, identity, update), fields(user_id = %identity.user_id), err)]
    pub async fn update_category(
        &self,
        identity: &Identity,
        id: CategoryId,
        update: CategoryUpdate,
    ) -> DomainResult<Category> {
        require_min_role(identity, Role::Staff)?;
        let mut category = self.load_category(id).await?;
        update.apply_to(&mut category)?;
        let category = self.store.update_category(category).await?;

        info!(category_id = %category.id, name = %category.name, "category updated");
        Ok(category)
    }

    /// Delete a category that owns no items.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id), err)]
    pub async fn delete_category(&self, identity: &Identity, id: CategoryId) -> DomainResult<()> {
        require_min_role(identity, Role::Staff)?;
        self.load_category(id).await?;
        ensure_deletable(self.store.count_items_in_category(id).await?)?;
        self.store.delete_category(id).await?;

        info!(category_id = %id, "category deleted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Items
    // ─────────────────────────────────────────────────────────────────────────

    /// Items matching `filter`, by category name then item name.
    pub async fn list_items(
        &self,
        identity: &Identity,
        filter: &ItemFilter,
    ) -> DomainResult<ItemListing> {
        require_min_role(identity, Role::Viewer)?;
        let names: HashMap<CategoryId, String> = self
            .store
            .scan_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let rows = self
            .store
            .scan_items()
            .await?
            .into_iter()
            .filter(|item| filter.matches(item, self.low_stock_threshold))
            .map(|item| ItemRow {
                category_name: names.get(&item.category_id).cloned().unwrap_or_default(),
                item,
            })
            .collect();
        Ok(ItemListing::from_rows(rows))
    }

    /// Item with its category and latest ledger entries.
    pub async fn get_item(&self, identity: &Identity, id: ItemId) -> DomainResult<ItemDetail> {
        require_min_role(identity, Role::Viewer)?;
        let item = self
            .store
            .get_item(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Item"))?;
        self.detail(item).await
    }

    /// Lookup by SKU, case-insensitively.
    pub async fn get_item_by_sku(&self, identity: &Identity, sku: &str) -> DomainResult<ItemDetail> {
        require_min_role(identity, Role::Viewer)?;
        let sku = normalize_sku(sku);
        let item = self
            .store
            .get_item_by_sku(&sku)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Item with SKU {sku}")))?;
        self.detail(item).await
    }

    async fn detail(&self, item: Item) -> DomainResult<ItemDetail> {
        let category = self.load_category(item.category_id).await?;
        let entries = self
            .store
            .list_entries(&EntryFilter {
                item_id: Some(item.id),
                kind: None,
                limit: ITEM_HISTORY_LIMIT,
            })
            .await?;
        Ok(ItemDetail {
            item,
            category,
            entries,
        })
    }
}
