use blake2::{Blake2b512, Digest};

use crate::db_types::LineItem;

/// Computes the canonical content signature for a cart.
///
/// Lines are normalized (trimmed names), sorted by `(name, unit_price, quantity)` and serialized, so that two carts
/// with the same logical content always produce the same signature regardless of submission order or stray
/// whitespace. The serialized form is hashed so the signature is a fixed-width, index-friendly column value.
pub fn items_signature(items: &[LineItem]) -> String {
    let mut canon: Vec<LineItem> = items.iter().map(LineItem::normalized).collect();
    canon.sort_by(|a, b| {
        a.name.cmp(&b.name).then(a.unit_price.cmp(&b.unit_price)).then(a.quantity.cmp(&b.quantity))
    });
    let serialized = serde_json::to_string(&canon).unwrap_or_else(|_| "[]".to_string());
    let hash = Blake2b512::digest(serialized.as_bytes());
    hash.iter().fold(String::with_capacity(hash.len() * 2), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
