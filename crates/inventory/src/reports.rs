//! Aggregation engine: read-only views derived from the ledger.
//!
//! Every view is recomputed from ledger entries and the current catalog on
//! each call. Nothing here keeps a running total.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use shopledger_core::{CategoryId, ItemId, money};

use crate::category::Category;
use crate::entry::{EntryKind, LedgerEntry, LedgerRow, newest_first};
use crate::item::{Item, ItemRow};

/// Number of sales listed on the dashboard.
pub const RECENT_SALES_LIMIT: usize = 10;

/// Dashboard totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_items: usize,
    pub total_units_in_stock: i64,
    pub total_categories: usize,
    /// Σ stock × cost price, whole currency units.
    pub total_stock_value: Decimal,
    /// Σ stock × sale price, whole currency units.
    pub total_retail_value: Decimal,
    pub potential_profit: Decimal,
    pub recent_sales: Vec<LedgerRow>,
    pub low_stock_items: Vec<ItemRow>,
    /// Σ unit price over all sale entries (missing prices count as zero).
    pub total_sales_revenue: Decimal,
}

/// Per-item sales rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemStat {
    pub item_id: ItemId,
    pub item_name: String,
    pub sku: String,
    pub revenue: Decimal,
    pub qty_sold: i64,
    pub profit: Decimal,
}

/// Per-category sales rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStat {
    pub category_id: CategoryId,
    pub category_name: String,
    pub revenue: Decimal,
}

/// Inputs for the aggregation engine: the catalog plus a ledger scan.
///
/// `entries` may hold any kinds; views that only concern sales skip the rest.
#[derive(Debug, Clone, Copy)]
pub struct ReportSource<'a> {
    pub categories: &'a [Category],
    pub items: &'a [Item],
    pub entries: &'a [LedgerEntry],
}

/// Revenue of one sale entry.
///
/// A sale without a recorded price is valued at the item's cost so that it
/// contributes zero profit rather than pure profit.
fn sale_revenue(entry: &LedgerEntry, item: &Item) -> Decimal {
    money::extend(entry.units(), entry.price.unwrap_or(item.cost_price))
}

impl<'a> ReportSource<'a> {
    fn item_index(&self) -> HashMap<ItemId, &'a Item> {
        self.items.iter().map(|i| (i.id, i)).collect()
    }

    fn category_index(&self) -> HashMap<CategoryId, &'a Category> {
        self.categories.iter().map(|c| (c.id, c)).collect()
    }

    fn sales(&self) -> impl Iterator<Item = &'a LedgerEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Sale)
    }

    pub fn summary(&self, low_stock_threshold: i64) -> Summary {
        let items = self.item_index();
        let categories = self.category_index();

        let total_stock_value: Decimal = self.items.iter().map(Item::stock_value).sum();
        let total_retail_value: Decimal = self.items.iter().map(Item::retail_value).sum();
        let total_units_in_stock = self.items.iter().map(|i| i.stock).sum();

        let mut sales: Vec<&LedgerEntry> = self.sales().collect();
        let total_sales_revenue = sales.iter().filter_map(|e| e.price).sum();

        sales.sort_by(|a, b| newest_first(a, b));
        let recent_sales = sales
            .into_iter()
            .filter_map(|e| {
                items.get(&e.item_id).map(|item| LedgerRow {
                    entry: e.clone(),
                    item_sku: item.sku.clone(),
                    item_name: item.name.clone(),
                })
            })
            .take(RECENT_SALES_LIMIT)
            .collect();

        let mut low: Vec<&Item> = self
            .items
            .iter()
            .filter(|i| i.is_low_stock(low_stock_threshold))
            .collect();
        low.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
        let low_stock_items = low
            .into_iter()
            .map(|item| ItemRow {
                item: item.clone(),
                category_name: categories
                    .get(&item.category_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
            })
            .collect();

        Summary {
            total_items: self.items.len(),
            total_units_in_stock,
            total_categories: self.categories.len(),
            total_stock_value: money::round_units(total_stock_value),
            total_retail_value: money::round_units(total_retail_value),
            potential_profit: money::round_units(total_retail_value - total_stock_value),
            recent_sales,
            low_stock_items,
            total_sales_revenue,
        }
    }

    /// Sales grouped by item, highest revenue first.
    pub fn item_stats(&self) -> Vec<ItemStat> {
        let items = self.item_index();
        let mut by_item: HashMap<ItemId, ItemStat> = HashMap::new();

        for entry in self.sales() {
            let Some(item) = items.get(&entry.item_id) else {
                continue;
            };
            let units = entry.units();
            let revenue = sale_revenue(entry, item);
            let cost = money::extend(units, item.cost_price);

            let row = by_item.entry(item.id).or_insert_with(|| ItemStat {
                item_id: item.id,
                item_name: item.name.clone(),
                sku: item.sku.clone(),
                revenue: Decimal::ZERO,
                qty_sold: 0,
                profit: Decimal::ZERO,
            });
            row.revenue += revenue;
            row.qty_sold += units;
            row.profit += revenue - cost;
        }

        let mut rows: Vec<ItemStat> = by_item
            .into_values()
            .map(|mut r| {
                r.revenue = money::round_cents(r.revenue);
                r.profit = money::round_cents(r.profit);
                r
            })
            .collect();
        rows.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.sku.cmp(&b.sku)));
        rows
    }

    /// Sales grouped by the item's category, highest revenue first.
    pub fn category_stats(&self) -> Vec<CategoryStat> {
        let items = self.item_index();
        let categories = self.category_index();
        let mut by_category: HashMap<CategoryId, CategoryStat> = HashMap::new();

        for entry in self.sales() {
            let Some(item) = items.get(&entry.item_id) else {
                continue;
            };
            let Some(category) = categories.get(&item.category_id) else {
                continue;
            };
            let row = by_category.entry(category.id).or_insert_with(|| CategoryStat {
                category_id: category.id,
                category_name: category.name.clone(),
                revenue: Decimal::ZERO,
            });
            row.revenue += sale_revenue(entry, item);
        }

        let mut rows: Vec<CategoryStat> = by_category
            .into_values()
            .map(|mut r| {
                r.revenue = money::round_cents(r.revenue);
                r
            })
            .collect();
        rows.sort_by(|a, b| {
            b.revenue
                .cmp(&a.revenue)
                .then_with(|| a.category_name.cmp(&b.category_name))
        });
        rows
    }
}
