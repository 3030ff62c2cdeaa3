use mls_common::Rupees;

use crate::db_types::{CadetAccount, LineItem, OrderId, OrderRecord, SettlementAlerts};

/// Result of an order insert. The unique-key race between two concurrent submissions is resolved through this tagged
/// union rather than through error-based control flow: losing the first-writer race is not an error, it simply means
/// the winner's record is the authoritative one.
pub enum InsertOrderResult {
    Inserted(i64),
    AlreadyExists(i64),
}

/// Everything the backend needs to settle one cart in a single atomic unit. Built by the settlement API after cart
/// validation and normalization; the backend trusts `total` and `items_signature` to be consistent with `items`.
#[derive(Debug, Clone)]
pub struct SettlementRequest {
    pub account_id: i64,
    pub order_id: OrderId,
    pub items: Vec<LineItem>,
    pub items_signature: String,
    pub total: Rupees,
    /// Free-text client hint selecting the label for a non-zero cash/card remainder. Never changes the arithmetic.
    pub payment_hint: String,
    pub idempotency_key: Option<String>,
    /// Trailing window for the signature-based duplicate scan, in seconds.
    pub duplicate_window_secs: i64,
}

/// Outcome of an atomic settlement.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// A new order was written and the ledger debited. `account` is the post-mutation snapshot.
    Fresh { order: OrderRecord, account: CadetAccount, alerts: SettlementAlerts },
    /// The request matched an existing order (idempotency key or duplicate signature). Nothing was mutated; the
    /// original record and the current account state are returned.
    Replayed { order: OrderRecord, account: CadetAccount },
}
