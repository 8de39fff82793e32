//! Stock mutation engine.
//!
//! The only path by which `stock` changes after creation. Each operation runs
//! the authorization gate, lets the domain decide the ledger entry, then hands
//! the entry to the store, which commits it together with the stock delta.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use shopledger_auth::{Identity, Role, require_min_role};
use shopledger_core::{DomainError, DomainResult, ItemId, money};
use shopledger_inventory::item::{ensure_deletable, ensure_positive_quantity};
use shopledger_inventory::{
    EntryDraft, Item, ItemUpdate, LedgerEntry, NewItem, RecordSale, StockIn, StockOut,
};

use crate::ledger_store::SharedLedgerStore;

/// Result of a stock-in or write-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockMovement {
    pub item: Item,
    pub entry: LedgerEntry,
    pub message: String,
}

/// Result of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleReceipt {
    pub item: Item,
    pub entry: LedgerEntry,
    /// `units × effective unit price`.
    pub revenue: Decimal,
    pub message: String,
}

#[derive(Clone)]
pub struct LedgerService {
    store: SharedLedgerStore,
}

impl LedgerService {
    pub fn new(store: SharedLedgerStore) -> Self {
        Self { store }
    }

    async fn load_item(&self, id: ItemId) -> DomainResult<Item> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Item"))
    }

    async fn commit(&self, draft: EntryDraft) -> DomainResult<(Item, LedgerEntry)> {
        let item_id = draft.item_id;
        let requested = draft.delta().abs();
        self.store.apply_movement(draft).await.map_err(|e| {
            let err = DomainError::from(e);
            if let DomainError::InsufficientStock { available, .. } = err {
                warn!(%item_id, available, requested, "movement rejected by stock guard");
            }
            err
        })
    }

    /// Create an item, with its opening balance when `initial_stock > 0`.
    #[instrument(
        skip(self, identity, request),
        fields(user_id = %identity.user_id, category_id = %request.category_id),
        err
    )]
    pub async fn create_item(&self, identity: &Identity, request: NewItem) -> DomainResult<Item> {
        require_min_role(identity, Role::Staff)?;
        let category = self
            .store
            .get_category(request.category_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category"))?;

        let (item, opening) = request.into_item(&category, Utc::now())?;
        let (item, _) = self.store.insert_item(item, opening).await?;

        info!(item_id = %item.id, sku = %item.sku, stock = item.stock, "item created");
        Ok(item)
    }

    #[instrument(
        skip(self, identity, command),
        fields(user_id = %identity.user_id, quantity = command.quantity),
        err
    )]
    pub async fn stock_in(
        &self,
        identity: &Identity,
        item_id: ItemId,
        command: StockIn,
    ) -> DomainResult<StockMovement> {
        require_min_role(identity, Role::Staff)?;
        ensure_positive_quantity(command.quantity)?;
        let draft = self.load_item(item_id).await?.plan_stock_in(&command)?;
        let (item, entry) = self.commit(draft).await?;

        info!(%item_id, sku = %item.sku, kind = %entry.kind, quantity = entry.quantity, "stock received");
        Ok(StockMovement {
            message: format!("Added {} units. New stock: {}", entry.units(), item.stock),
            item,
            entry,
        })
    }

    /// Record a sale at the given price, else the item's current sale price.
    #[instrument(
        skip(self, identity, command),
        fields(user_id = %identity.user_id, quantity = command.quantity),
        err
    )]
    pub async fn record_sale(
        &self,
        identity: &Identity,
        item_id: ItemId,
        command: RecordSale,
    ) -> DomainResult<SaleReceipt> {
        require_min_role(identity, Role::Staff)?;
        ensure_positive_quantity(command.quantity)?;
        let current = self.load_item(item_id).await?;
        let draft = current.plan_sale(&command).inspect_err(|err| {
            if let DomainError::InsufficientStock { available, requested } = err {
                warn!(%item_id, available, requested, "sale rejected");
            }
        })?;
        let (item, entry) = self.commit(draft).await?;

        let price = entry.price.unwrap_or(Decimal::ZERO);
        let revenue = money::extend(entry.units(), price);
        info!(%item_id, sku = %item.sku, kind = %entry.kind, quantity = entry.quantity, %revenue, "sale recorded");
        Ok(SaleReceipt {
            message: format!(
                "Sold {} unit(s) @ {}. Remaining stock: {}",
                entry.units(),
                price,
                item.stock
            ),
            item,
            entry,
            revenue,
        })
    }

    /// Write stock off (damage, loss). Requires MANAGER.
    #[instrument(
        skip(self, identity, command),
        fields(user_id = %identity.user_id, quantity = command.quantity),
        err
    )]
    pub async fn record_stock_out(
        &self,
        identity: &Identity,
        item_id: ItemId,
        command: StockOut,
    ) -> DomainResult<StockMovement> {
        require_min_role(identity, Role::Manager)?;
        ensure_positive_quantity(command.quantity)?;
        let draft = self.load_item(item_id).await?.plan_stock_out(&command)?;
        let (item, entry) = self.commit(draft).await?;

        info!(%item_id, sku = %item.sku, kind = %entry.kind, quantity = entry.quantity, "stock written off");
        Ok(StockMovement {
            message: format!("Wrote off {} unit(s). Remaining stock: {}", entry.units(), item.stock),
            item,
            entry,
        })
    }

    /// Change descriptive fields and prices. Stock and SKU cannot change here.
    #[instrument(skip(self, identity, update), fields(user_id = %identity.user_id), err)]
    pub async fn update_item_details(
        &self,
        identity: &Identity,
        item_id: ItemId,
        update: ItemUpdate,
    ) -> DomainResult<Item> {
        require_min_role(identity, Role::Staff)?;
        let mut item = self.load_item(item_id).await?;
        update.apply_to(&mut item, Utc::now())?;
        let item = self.store.update_item(item).await?;

        info!(%item_id, sku = %item.sku, "item updated");
        Ok(item)
    }

    /// Delete an item that has never been moved.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id), err)]
    pub async fn delete_item(&self, identity: &Identity, item_id: ItemId) -> DomainResult<()> {
        require_min_role(identity, Role::Staff)?;
        self.load_item(item_id).await?;
        ensure_deletable(self.store.count_entries_for_item(item_id).await?)?;
        self.store.delete_item(item_id).await?;

        info!(%item_id, "item deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rust_decimal_macros::dec;
    use shopledger_core::{ErrorKind, UserId};
    use shopledger_inventory::{EntryKind, NewCategory};

    use crate::ledger_store::{InMemoryLedgerStore, LedgerStore};

    fn identity(role: Role) -> Identity {
        Identity::new(UserId::new(), role)
    }

    async fn setup() -> (LedgerService, Arc<InMemoryLedgerStore>, Item) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let books = store
            .insert_category(
                NewCategory {
                    name: "Books".to_string(),
                    description: None,
                }
                .into_category(Utc::now())
                .unwrap(),
            )
            .await
            .unwrap();
        let service = LedgerService::new(store.clone());
        let item = service
            .create_item(
                &identity(Role::Staff),
                NewItem {
                    cost_price: dec!(200),
                    sale_price: dec!(300),
                    initial_stock: 100,
                    class: Some("Class 5".to_string()),
                    ..NewItem::new("Mathematics Class 5", books.id)
                },
            )
            .await
            .unwrap();
        (service, store, item)
    }

    fn sale(quantity: i64) -> RecordSale {
        RecordSale {
            quantity,
            price: None,
            reference: None,
        }
    }

    #[tokio::test]
    async fn sale_decrements_stock_and_reports_revenue() {
        let (service, _, item) = setup().await;
        let receipt = service
            .record_sale(&identity(Role::Staff), item.id, sale(10))
            .await
            .unwrap();

        assert_eq!(receipt.item.stock, 90);
        assert_eq!(receipt.revenue, dec!(3000));
        assert_eq!(receipt.entry.kind, EntryKind::Sale);
        assert_eq!(receipt.entry.quantity, -10);
        assert_eq!(receipt.entry.price, Some(dec!(300)));
        assert_eq!(receipt.message, "Sold 10 unit(s) @ 300. Remaining stock: 90");
    }

    #[tokio::test]
    async fn oversell_is_rejected_without_side_effects() {
        let (service, store, item) = setup().await;
        let err = service
            .record_sale(&identity(Role::Staff), item.id, sale(101))
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::insufficient_stock(100, 101));
        assert_eq!(store.get_item(item.id).await.unwrap().unwrap().stock, 100);
        assert_eq!(store.count_entries_for_item(item.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stock_in_appends_entry_and_reports_new_stock() {
        let (service, _, item) = setup().await;
        let movement = service
            .stock_in(
                &identity(Role::Staff),
                item.id,
                StockIn {
                    quantity: 25,
                    price: Some(dec!(190)),
                    reference: Some("Delivery #7".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(movement.item.stock, 125);
        assert_eq!(movement.entry.quantity, 25);
        assert_eq!(movement.message, "Added 25 units. New stock: 125");
    }

    #[tokio::test]
    async fn mutations_run_the_authorization_gate() {
        let (service, _, item) = setup().await;
        let viewer = identity(Role::Viewer);

        let err = service.record_sale(&viewer, item.id, sale(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let staff_write_off = service
            .record_stock_out(
                &identity(Role::Staff),
                item.id,
                StockOut {
                    quantity: 1,
                    reference: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(staff_write_off.kind(), ErrorKind::Forbidden);

        let manager_write_off = service
            .record_stock_out(
                &identity(Role::Manager),
                item.id,
                StockOut {
                    quantity: 4,
                    reference: Some("Water damage".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(manager_write_off.item.stock, 96);
        assert_eq!(manager_write_off.entry.price, None);
    }

    #[tokio::test]
    async fn invalid_quantity_and_unknown_item() {
        let (service, _, item) = setup().await;
        let staff = identity(Role::Staff);

        let err = service.record_sale(&staff, item.id, sale(0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = service.record_sale(&staff, ItemId::new(), sale(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn quantity_is_checked_before_the_item_lookup() {
        let (service, _, _) = setup().await;
        let missing = ItemId::new();

        let err = service
            .record_sale(&identity(Role::Staff), missing, sale(0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = service
            .stock_in(
                &identity(Role::Staff),
                missing,
                StockIn {
                    quantity: -3,
                    price: None,
                    reference: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = service
            .record_stock_out(
                &identity(Role::Manager),
                missing,
                StockOut {
                    quantity: 0,
                    reference: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn stock_in_past_the_ceiling_is_invalid_and_harmless() {
        let (service, store, item) = setup().await;
        let staff = identity(Role::Staff);

        let err = service
            .stock_in(
                &staff,
                item.id,
                StockIn {
                    quantity: i64::MAX,
                    price: None,
                    reference: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(store.get_item(item.id).await.unwrap().unwrap().stock, 100);

        let receipt = service.record_sale(&staff, item.id, sale(1)).await.unwrap();
        assert_eq!(receipt.item.stock, 99);
    }

    #[tokio::test]
    async fn details_update_keeps_stock_and_sku() {
        let (service, _, item) = setup().await;
        let update: ItemUpdate =
            serde_json::from_value(serde_json::json!({ "sale_price": "350", "description": null }))
                .unwrap();
        let updated = service
            .update_item_details(&identity(Role::Staff), item.id, update)
            .await
            .unwrap();

        assert_eq!(updated.sale_price, dec!(350));
        assert_eq!(updated.stock, 100);
        assert_eq!(updated.sku, item.sku);

        let receipt = service
            .record_sale(&identity(Role::Staff), item.id, sale(1))
            .await
            .unwrap();
        assert_eq!(receipt.entry.price, Some(dec!(350)));
    }

    #[tokio::test]
    async fn only_untouched_items_can_be_deleted() {
        let (service, store, item) = setup().await;
        let staff = identity(Role::Staff);

        let err = service.delete_item(&staff, item.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(store.get_item(item.id).await.unwrap().is_some());

        let fresh = service
            .create_item(&staff, NewItem::new("English Class 3", item.category_id))
            .await
            .unwrap();
        service.delete_item(&staff, fresh.id).await.unwrap();
        assert!(store.get_item(fresh.id).await.unwrap().is_none());
    }
}
