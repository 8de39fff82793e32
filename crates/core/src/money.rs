//! Currency amounts.
//!
//! Amounts are exact decimals in a single implicit currency.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to whole currency units, halves away from zero.
pub fn round_units(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to two decimal places, halves away from zero.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `quantity × unit_price` for a signed unit count.
pub fn extend(quantity: i64, unit_price: Decimal) -> Decimal {
    Decimal::from(quantity) * unit_price
}
