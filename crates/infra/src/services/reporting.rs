//! Read-only views over the ledger.
//!
//! Every call rescans the store; nothing is cached between calls.

use std::collections::HashMap;

use shopledger_auth::{Identity, Role, require_min_role};
use shopledger_core::{DomainResult, ItemId};
use shopledger_inventory::{
    CategoryStat, EntryFilter, EntryKind, ItemStat, LedgerRow, ReportSource, Summary,
};

use crate::ledger_store::SharedLedgerStore;

#[derive(Clone)]
pub struct ReportingService {
    store: SharedLedgerStore,
    low_stock_threshold: i64,
}

impl ReportingService {
    pub fn new(store: SharedLedgerStore, low_stock_threshold: i64) -> Self {
        Self {
            store,
            low_stock_threshold,
        }
    }

    pub async fn summary(&self, identity: &Identity) -> DomainResult<Summary> {
        require_min_role(identity, Role::Viewer)?;
        let categories = self.store.scan_categories().await?;
        let items = self.store.scan_items().await?;
        let sales = self.store.scan_entries(Some(EntryKind::Sale)).await?;

        let source = ReportSource {
            categories: &categories,
            items: &items,
            entries: &sales,
        };
        Ok(source.summary(self.low_stock_threshold))
    }

    pub async fn item_stats(&self, identity: &Identity) -> DomainResult<Vec<ItemStat>> {
        require_min_role(identity, Role::Viewer)?;
        let items = self.store.scan_items().await?;
        let sales = self.store.scan_entries(Some(EntryKind::Sale)).await?;

        let source = ReportSource {
            categories: &[],
            items: &items,
            entries: &sales,
        };
        Ok(source.item_stats())
    }

    pub async fn category_stats(&self, identity: &Identity) -> DomainResult<Vec<CategoryStat>> {
        require_min_role(identity, Role::Viewer)?;
        let categories = self.store.scan_categories().await?;
        let items = self.store.scan_items().await?;
        let sales = self.store.scan_entries(Some(EntryKind::Sale)).await?;

        let source = ReportSource {
            categories: &categories,
            items: &items,
            entries: &sales,
        };
        Ok(source.category_stats())
    }

    /// Ledger entries matching `filter`, newest first, with item sku and name.
    pub async fn list_entries(
        &self,
        identity: &Identity,
        filter: &EntryFilter,
    ) -> DomainResult<Vec<LedgerRow>> {
        require_min_role(identity, Role::Viewer)?;
        let entries = self.store.list_entries(filter).await?;
        let items: HashMap<ItemId, (String, String)> = self
            .store
            .scan_items()
            .await?
            .into_iter()
            .map(|i| (i.id, (i.sku, i.name)))
            .collect();

        Ok(entries
            .into_iter()
            .map(|entry| {
                let (item_sku, item_name) = items.get(&entry.item_id).cloned().unwrap_or_default();
                LedgerRow {
                    entry,
                    item_sku,
                    item_name,
                }
            })
            .collect())
    }
}
