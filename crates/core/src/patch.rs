//! Partial-update helpers.
//!
//! Update requests model clearable fields as `Option<Option<T>>`:
//! `None` leaves the field unchanged, `Some(None)` clears it and
//! `Some(Some(v))` sets it. Plain serde collapses an explicit JSON `null`
//! into `None`, so such fields use [`explicit`] as their deserializer.

use serde::{Deserialize, Deserializer};

/// Deserialize a present field (including `null`) as `Some(..)`.
///
/// Pair with `#[serde(default)]` so that an absent field stays `None`.
pub fn explicit<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Apply a clearable-field patch in place.
pub fn apply<T>(target: &mut Option<T>, patch: Option<Option<T>>) {
    if let Some(value) = patch {
        *target = value;
    }
}
