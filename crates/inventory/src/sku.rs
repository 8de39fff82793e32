//! SKU derivation.
//!
//! Format: `[CategoryPrefix]-[NamePrefix]-[SizeOrClass]`, e.g. `BOY-SH-32`
//! for a boys' uniform shirt in size 32. Collisions are possible and are
//! rejected by the store's SKU uniqueness constraint.

/// Suffix used when an item has neither a size nor a class.
pub const DEFAULT_SUFFIX: &str = "XX";

fn letters_upper(s: &str, take: usize) -> String {
    s.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .take(take)
        .collect()
}

/// Derive a SKU from category name, item name, and size or class.
///
/// Pure and deterministic. Empty size/class strings count as absent.
pub fn generate_sku(
    category_name: &str,
    item_name: &str,
    size: Option<&str>,
    class: Option<&str>,
) -> String {
    let cat_part = letters_upper(category_name, 3);
    let name_part = letters_upper(item_name, 2);
    let raw_suffix = size
        .filter(|s| !s.is_empty())
        .or(class.filter(|c| !c.is_empty()))
        .unwrap_or(DEFAULT_SUFFIX);
    let suffix: String = raw_suffix
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(5)
        .collect();

    format!("{cat_part}-{name_part}-{suffix}")
}

/// Normalize a caller-supplied SKU (trimmed, uppercase).
pub fn normalize_sku(raw: &str) -> String {
    raw.trim().to_uppercase()
}
