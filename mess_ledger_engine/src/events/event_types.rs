use mls_common::Rupees;
use serde::Serialize;

use crate::db_types::{CadetAccount, OrderRecord, ResetSummary};

/// Emitted once per freshly settled order. Replays do not produce this event.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseEvent {
    pub order: OrderRecord,
    pub account: CadetAccount,
}

impl PurchaseEvent {
    pub fn new(order: OrderRecord, account: CadetAccount) -> Self {
        Self { order, account }
    }
}

/// Emitted when a fresh settlement could not be covered by the allowance alone, i.e. part of the bill was due in
/// cash or by card.
#[derive(Debug, Clone, Serialize)]
pub struct AllowanceExceededEvent {
    pub order: OrderRecord,
    pub account: CadetAccount,
}

impl AllowanceExceededEvent {
    pub fn new(order: OrderRecord, account: CadetAccount) -> Self {
        Self { order, account }
    }
}

/// Emitted after a bulk allowance reset run completes, successful batches and skipped ones alike.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AllowanceResetEvent {
    pub summary: ResetSummary,
    pub base_credit: Option<Rupees>,
}

impl AllowanceResetEvent {
    pub fn new(summary: ResetSummary, base_credit: Option<Rupees>) -> Self {
        Self { summary, base_credit }
    }
}
