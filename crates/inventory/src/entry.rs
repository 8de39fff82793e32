//! Ledger entries: the append-only record every stock change is paired with.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, Entity, EntryId, ItemId};

/// Default row cap for ledger listings.
pub const DEFAULT_ENTRY_LIMIT: usize = 100;

/// Entries shown on an item's detail view.
pub const ITEM_HISTORY_LIMIT: usize = 50;

/// Kind of stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Opening stock recorded when the item is created.
    InitialBalance,
    /// Delivery received.
    StockIn,
    /// Units sold.
    Sale,
    /// Units written off (damage, loss).
    StockOut,
}

impl EntryKind {
    pub const ALL: [EntryKind; 4] = [
        EntryKind::InitialBalance,
        EntryKind::StockIn,
        EntryKind::Sale,
        EntryKind::StockOut,
    ];

    /// Inbound kinds carry positive quantities, outbound kinds negative.
    pub fn is_inbound(self) -> bool {
        matches!(self, EntryKind::InitialBalance | EntryKind::StockIn)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::InitialBalance => "INITIAL_BALANCE",
            EntryKind::StockIn => "STOCK_IN",
            EntryKind::Sale => "SALE",
            EntryKind::StockOut => "STOCK_OUT",
        }
    }
}

impl core::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown entry type '{s}'")))
    }
}

/// Immutable ledger row.
///
/// `quantity` is signed: positive for inbound kinds, negative for outbound.
/// `price` is the unit price captured when the entry was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub item_id: ItemId,
    pub kind: EntryKind,
    pub quantity: i64,
    pub price: Option<Decimal>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for LedgerEntry {
    type Id = EntryId;

    fn id(&self) -> EntryId {
        self.id
    }
}

impl LedgerEntry {
    /// Units moved, regardless of direction.
    pub fn units(&self) -> i64 {
        self.quantity.abs()
    }
}

/// A ledger entry that has been decided but not yet committed.
///
/// The store assigns id and timestamp when it commits the draft together with
/// the matching stock change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub item_id: ItemId,
    pub kind: EntryKind,
    pub quantity: i64,
    pub price: Option<Decimal>,
    pub reference: Option<String>,
}

impl EntryDraft {
    /// Build a draft for `units > 0`, signing the quantity by kind.
    pub fn new(
        item_id: ItemId,
        kind: EntryKind,
        units: i64,
        price: Option<Decimal>,
        reference: Option<String>,
    ) -> Result<Self, DomainError> {
        if units <= 0 {
            return Err(DomainError::validation("quantity must be a positive integer"));
        }
        let quantity = if kind.is_inbound() { units } else { -units };
        Ok(Self {
            item_id,
            kind,
            quantity,
            price,
            reference: reference.filter(|r| !r.trim().is_empty()),
        })
    }

    /// Stock delta this draft applies to its item.
    pub fn delta(&self) -> i64 {
        self.quantity
    }

    pub fn commit(self, id: EntryId, created_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id,
            item_id: self.item_id,
            kind: self.kind,
            quantity: self.quantity,
            price: self.price,
            reference: self.reference,
            created_at,
        }
    }
}

/// Ledger listing filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntryFilter {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub kind: Option<EntryKind>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_ENTRY_LIMIT
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self {
            item_id: None,
            kind: None,
            limit: DEFAULT_ENTRY_LIMIT,
        }
    }
}

impl EntryFilter {
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.item_id.is_none_or(|id| id == entry.item_id)
            && self.kind.is_none_or(|k| k == entry.kind)
    }
}

/// Ledger entry joined with the identifying fields of its item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    #[serde(flatten)]
    pub entry: LedgerEntry,
    pub item_sku: String,
    pub item_name: String,
}

/// Newest first; ids break timestamp ties (UUIDv7 is time-ordered).
pub fn newest_first(a: &LedgerEntry, b: &LedgerEntry) -> core::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_signs_quantity_by_direction() {
        let item = ItemId::new();
        let inbound = EntryDraft::new(item, EntryKind::StockIn, 5, None, None).unwrap();
        let outbound = EntryDraft::new(item, EntryKind::Sale, 5, None, None).unwrap();
        let write_off = EntryDraft::new(item, EntryKind::StockOut, 2, None, None).unwrap();
        assert_eq!(inbound.delta(), 5);
        assert_eq!(outbound.delta(), -5);
        assert_eq!(write_off.delta(), -2);
    }

    #[test]
    fn draft_rejects_non_positive_units() {
        let item = ItemId::new();
        assert!(EntryDraft::new(item, EntryKind::StockIn, 0, None, None).is_err());
        assert!(EntryDraft::new(item, EntryKind::Sale, -3, None, None).is_err());
    }

    #[test]
    fn blank_reference_is_dropped() {
        let d = EntryDraft::new(ItemId::new(), EntryKind::StockIn, 1, None, Some("  ".into())).unwrap();
        assert_eq!(d.reference, None);
    }

    #[test]
    fn kind_round_trips_through_wire_name() {
        for kind in EntryKind::ALL {
            assert_eq!(kind.as_str().parse::<EntryKind>().unwrap(), kind);
        }
        assert_eq!("sale".parse::<EntryKind>().unwrap(), EntryKind::Sale);
        assert_eq!(
            serde_json::to_string(&EntryKind::InitialBalance).unwrap(),
            "\"INITIAL_BALANCE\""
        );
    }
}
