use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopledger_core::{CategoryId, DomainError, DomainResult, Entity, ItemId, money, patch};

use crate::category::Category;
use crate::entry::{EntryDraft, EntryKind, LedgerEntry};
use crate::sku::{generate_sku, normalize_sku};

/// Stock level at or below which an item counts as low on stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Reference written on the opening-balance entry.
pub const INITIAL_BALANCE_REFERENCE: &str = "Initial stock entry";

/// Stocked item.
///
/// # Invariants
/// - `stock >= 0`
/// - `stock` equals the sum of the quantities of the item's ledger entries.
/// - `sku` is uppercase and never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub size: Option<String>,
    pub class: Option<String>,
    pub subject: Option<String>,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }
}

fn validated_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name and categoryId are required"));
    }
    Ok(name.to_string())
}

fn validated_price(field: &str, price: Decimal) -> DomainResult<Decimal> {
    if price < Decimal::ZERO {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    if price.normalize().scale() > 2 {
        return Err(DomainError::validation(format!(
            "{field} cannot have more than 2 decimal places"
        )));
    }
    Ok(price)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Creation
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create an item.
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub sale_price: Decimal,
    #[serde(default)]
    pub initial_stock: i64,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewItem {
    /// Minimal request; optional fields default to absent, prices and stock to zero.
    pub fn new(name: impl Into<String>, category_id: CategoryId) -> Self {
        Self {
            name: name.into(),
            category_id,
            cost_price: Decimal::ZERO,
            sale_price: Decimal::ZERO,
            initial_stock: 0,
            sku: None,
            size: None,
            class: None,
            subject: None,
            description: None,
        }
    }

    /// Validate against the owning category and build the item.
    ///
    /// Returns the opening-balance draft when `initial_stock > 0`; the store
    /// must commit both in one unit of work. The returned item has `stock == 0`;
    /// committing the draft brings it to `initial_stock`.
    pub fn into_item(
        self,
        category: &Category,
        now: DateTime<Utc>,
    ) -> DomainResult<(Item, Option<EntryDraft>)> {
        if category.id != self.category_id {
            return Err(DomainError::validation("category does not match categoryId"));
        }
        let name = validated_name(&self.name)?;
        let cost_price = validated_price("costPrice", self.cost_price)?;
        let sale_price = validated_price("salePrice", self.sale_price)?;
        if self.initial_stock < 0 {
            return Err(DomainError::validation("initial stock cannot be negative"));
        }

        let size = non_blank(self.size);
        let class = non_blank(self.class);
        let sku = match self.sku.as_deref().map(normalize_sku) {
            Some(sku) if !sku.is_empty() => sku,
            _ => generate_sku(&category.name, &name, size.as_deref(), class.as_deref()),
        };

        let item = Item {
            id: ItemId::new(),
            sku,
            name,
            description: non_blank(self.description),
            category_id: category.id,
            size,
            class,
            subject: non_blank(self.subject),
            cost_price,
            sale_price,
            stock: 0,
            created_at: now,
            updated_at: now,
        };

        let opening = if self.initial_stock > 0 {
            Some(EntryDraft::new(
                item.id,
                EntryKind::InitialBalance,
                self.initial_stock,
                Some(cost_price),
                Some(INITIAL_BALANCE_REFERENCE.to_string()),
            )?)
        } else {
            None
        };

        Ok((item, opening))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Detail updates
// ─────────────────────────────────────────────────────────────────────────────

/// Partial update of item details.
///
/// Stock and SKU are deliberately absent: stock only moves through ledger
/// entries and the SKU is fixed at creation. Clearable text fields use
/// absent = unchanged, explicit `null` = cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "patch::explicit")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch::explicit")]
    pub size: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch::explicit")]
    pub class: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch::explicit")]
    pub subject: Option<Option<String>>,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
}

impl ItemUpdate {
    pub fn apply_to(self, item: &mut Item, now: DateTime<Utc>) -> DomainResult<()> {
        let name = self.name.as_deref().map(validated_name).transpose()?;
        let cost_price = self
            .cost_price
            .map(|p| validated_price("costPrice", p))
            .transpose()?;
        let sale_price = self
            .sale_price
            .map(|p| validated_price("salePrice", p))
            .transpose()?;

        if let Some(name) = name {
            item.name = name;
        }
        patch::apply(&mut item.description, self.description);
        patch::apply(&mut item.size, self.size);
        patch::apply(&mut item.class, self.class);
        patch::apply(&mut item.subject, self.subject);
        if let Some(p) = cost_price {
            item.cost_price = p;
        }
        if let Some(p) = sale_price {
            item.sale_price = p;
        }
        item.updated_at = now;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stock movements
// ─────────────────────────────────────────────────────────────────────────────

/// Command: receive stock.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockIn {
    pub quantity: i64,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Command: record a sale.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordSale {
    pub quantity: i64,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Command: write stock off (damage, loss).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockOut {
    pub quantity: i64,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Reject non-positive quantities before anything is read.
fn stock_overflow() -> DomainError {
    DomainError::validation("quantity exceeds the maximum stock level")
}

pub fn ensure_positive_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be a positive integer"));
    }
    Ok(())
}

impl Item {
    /// Decide the entry for a stock-in. Pure; does not touch `self.stock`.
    pub fn plan_stock_in(&self, cmd: &StockIn) -> DomainResult<EntryDraft> {
        ensure_positive_quantity(cmd.quantity)?;
        self.stock.checked_add(cmd.quantity).ok_or_else(stock_overflow)?;
        let price = cmd
            .price
            .map(|p| validated_price("price", p))
            .transpose()?;
        EntryDraft::new(self.id, EntryKind::StockIn, cmd.quantity, price, cmd.reference.clone())
    }

    /// Decide the entry for a sale.
    ///
    /// The unit price is the given price, else the current sale price; it is
    /// captured on the entry so later price edits do not rewrite history.
    pub fn plan_sale(&self, cmd: &RecordSale) -> DomainResult<EntryDraft> {
        ensure_positive_quantity(cmd.quantity)?;
        self.ensure_available(cmd.quantity)?;
        let price = match cmd.price {
            Some(p) => validated_price("price", p)?,
            None => self.sale_price,
        };
        EntryDraft::new(self.id, EntryKind::Sale, cmd.quantity, Some(price), cmd.reference.clone())
    }

    /// Decide the entry for a write-off.
    pub fn plan_stock_out(&self, cmd: &StockOut) -> DomainResult<EntryDraft> {
        ensure_positive_quantity(cmd.quantity)?;
        self.ensure_available(cmd.quantity)?;
        EntryDraft::new(self.id, EntryKind::StockOut, cmd.quantity, None, cmd.reference.clone())
    }

    pub fn ensure_available(&self, requested: i64) -> DomainResult<()> {
        if self.stock < requested {
            return Err(DomainError::insufficient_stock(self.stock, requested));
        }
        Ok(())
    }

    /// Apply a stock delta, refusing to go below zero.
    ///
    /// Stores call this inside the unit of work that also appends the entry.
    pub fn apply_delta(&mut self, delta: i64) -> DomainResult<()> {
        let next = self.stock.checked_add(delta).ok_or_else(stock_overflow)?;
        if next < 0 {
            return Err(DomainError::insufficient_stock(self.stock, -delta));
        }
        self.stock = next;
        Ok(())
    }

    /// Value of the stock on hand at cost.
    pub fn stock_value(&self) -> Decimal {
        money::extend(self.stock, self.cost_price)
    }

    /// Value of the stock on hand at sale price.
    pub fn retail_value(&self) -> Decimal {
        money::extend(self.stock, self.sale_price)
    }

    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock <= threshold
    }

    /// Whether `stock` equals the sum of the given entries for this item.
    pub fn reconciles_with<'a>(&self, entries: impl IntoIterator<Item = &'a LedgerEntry>) -> bool {
        let total: i64 = entries
            .into_iter()
            .filter(|e| e.item_id == self.id)
            .map(|e| e.quantity)
            .sum();
        total == self.stock
    }
}

/// Guard for item deletion: an item with ledger history stays.
pub fn ensure_deletable(entry_count: u64) -> DomainResult<()> {
    if entry_count > 0 {
        return Err(DomainError::conflict(format!(
            "Cannot delete: item has {entry_count} ledger entry record(s)"
        )));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Queries
// ─────────────────────────────────────────────────────────────────────────────

/// Item listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive substring of name, SKU or description.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Case-insensitive exact size.
    #[serde(default)]
    pub size: Option<String>,
    /// Case-insensitive substring of class.
    #[serde(default)]
    pub class: Option<String>,
    /// Case-insensitive substring of subject.
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

impl ItemFilter {
    pub fn matches(&self, item: &Item, low_stock_threshold: i64) -> bool {
        if self.category_id.is_some_and(|id| id != item.category_id) {
            return false;
        }
        if let Some(size) = self.size.as_deref() {
            if !item.size.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(size)) {
                return false;
            }
        }
        if let Some(class) = self.class.as_deref() {
            if !contains_ci(item.class.as_deref(), class) {
                return false;
            }
        }
        if let Some(subject) = self.subject.as_deref() {
            if !contains_ci(item.subject.as_deref(), subject) {
                return false;
            }
        }
        if self.low_stock && !item.is_low_stock(low_stock_threshold) {
            return false;
        }
        if let Some(search) = self.search.as_deref() {
            return contains_ci(Some(&item.name), search)
                || contains_ci(Some(&item.sku), search)
                || contains_ci(item.description.as_deref(), search);
        }
        true
    }
}

/// Item joined with its category name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRow {
    #[serde(flatten)]
    pub item: Item,
    pub category_name: String,
}

/// Result of an item listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemListing {
    pub count: usize,
    pub total_stock_value: Decimal,
    pub items: Vec<ItemRow>,
}

impl ItemListing {
    /// Order rows by category name then item name and total their stock value.
    pub fn from_rows(mut items: Vec<ItemRow>) -> Self {
        items.sort_by(|a, b| {
            a.category_name
                .cmp(&b.category_name)
                .then_with(|| a.item.name.cmp(&b.item.name))
        });
        let total_stock_value = items.iter().map(|r| r.item.stock_value()).sum();
        Self {
            count: items.len(),
            total_stock_value,
            items,
        }
    }
}

/// Item with its category and most recent ledger entries (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: Item,
    pub category: Category,
    pub entries: Vec<LedgerEntry>,
}
