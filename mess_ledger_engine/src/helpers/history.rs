use crate::db_types::OrderRecord;

/// The wider, presentation-only window used when rendering order history. The engine's own duplicate suppression
/// during settlement uses the narrower creation-time window; this one additionally hides historical duplicates that
/// slipped through before suppression existed.
pub const HISTORY_DEDUP_WINDOW_SECS: i64 = 120;

/// Soft-dedupes an order history for display: keeps the first order for each `(total, signature)` pair occurring
/// within the dedup window and drops the rest. Expects orders sorted newest-first, as returned by the history query.
/// This never deletes records; it is purely a view-level filter.
pub fn dedup_order_history(orders: Vec<OrderRecord>) -> Vec<OrderRecord> {
    let mut seen: Vec<(String, i64)> = Vec::new();
    let mut filtered = Vec::with_capacity(orders.len());
    for order in orders {
        let sig = format!("{}|{}", order.total.value(), order.items_signature);
        let ts = order.created_at.timestamp();
        let duplicate = seen
            .iter()
            .any(|(s, t)| *s == sig && (*t - ts).abs() <= HISTORY_DEDUP_WINDOW_SECS);
        if !duplicate {
            seen.push((sig, ts));
            filtered.push(order);
        }
    }
    filtered
}
