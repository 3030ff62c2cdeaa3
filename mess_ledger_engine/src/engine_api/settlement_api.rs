use std::fmt::Debug;

use log::*;
use mls_common::Rupees;
use serde::Serialize;

use crate::{
    db::traits::{LedgerDatabase, SettlementOutcome, SettlementRequest},
    db_types::{CadetAccount, LineItem, OrderId, OrderRecord, ResetSummary, SettlementAlerts},
    engine_api::errors::SettlementError,
    events::{AllowanceExceededEvent, AllowanceResetEvent, EventProducers, PurchaseEvent},
    helpers::items_signature,
};

/// How far back the engine scans for a matching order when a submission carries no idempotency key. Resubmissions of
/// the same cart inside this window (double taps, client retries) replay the original order instead of settling again.
pub const DUPLICATE_SUPPRESSION_WINDOW_SECS: i64 = 60;

/// The response to a settlement call. `replayed` tells the caller whether this request actually moved the ledger or
/// matched an order that had already been settled.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementResult {
    pub order: OrderRecord,
    pub account: CadetAccount,
    pub alerts: SettlementAlerts,
    pub replayed: bool,
}

/// `SettlementApi` is the primary API for settling carts against the allowance ledger, and for running the bulk
/// monthly allowance reset.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
    duplicate_window_secs: i64,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, duplicate_window_secs: DUPLICATE_SUPPRESSION_WINDOW_SECS }
    }

    /// Overrides the duplicate-suppression window. Mostly useful in tests; production deployments should keep the
    /// default.
    pub fn with_duplicate_window_secs(mut self, secs: i64) -> Self {
        self.duplicate_window_secs = secs;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> SettlementApi<B>
where
    B: LedgerDatabase,
    SettlementError: From<B::Error>,
{
    /// Settles one cart for the given account.
    ///
    /// The cart is validated and normalized, priced, and handed to the backend as a single atomic unit: the
    /// allowance/cash split, the ledger debit, the one-shot half-used flag and the order record all commit or roll
    /// back together. A request carrying an already-seen idempotency key, or repeating an identical cart within the
    /// duplicate-suppression window, replays the original order without touching the ledger.
    ///
    /// Fresh settlements emit a [`PurchaseEvent`], and an [`AllowanceExceededEvent`] when part of the bill was due in
    /// cash or by card. Replays emit nothing.
    pub async fn settle(
        &self,
        account_id: i64,
        items: Vec<LineItem>,
        payment_hint: &str,
        idempotency_key: Option<String>,
    ) -> Result<SettlementResult, SettlementError> {
        let items = validate_cart(items)?;
        let total = cart_total(&items)?;
        let signature = items_signature(&items);
        let order_id = OrderId::generate();
        trace!("🧾️ Settling cart {order_id} for account #{account_id}: {} lines, {total} in total", items.len());
        let request = SettlementRequest {
            account_id,
            order_id,
            items,
            items_signature: signature,
            total,
            payment_hint: payment_hint.to_string(),
            idempotency_key,
            duplicate_window_secs: self.duplicate_window_secs,
        };
        match self.db.settle_order(request).await? {
            SettlementOutcome::Fresh { order, account, alerts } => {
                self.call_purchase_hook(&order, &account).await;
                if !order.cash_or_card_due.is_zero() {
                    self.call_allowance_exceeded_hook(&order, &account).await;
                }
                debug!(
                    "🧾️ Order {} settled for account #{account_id}. {} remaining, {}% of the allowance used.",
                    order.order_id, account.allowance_remaining, alerts.used_percent
                );
                Ok(SettlementResult { order, account, alerts, replayed: false })
            },
            SettlementOutcome::Replayed { order, account } => {
                debug!("🧾️ Order {} replayed for account #{account_id}. The ledger was not touched.", order.order_id);
                let alerts = SettlementAlerts {
                    threshold_crossed: false,
                    used_percent: account.used_percent(),
                    base_limit: account.base_limit(),
                };
                Ok(SettlementResult { order, account, alerts, replayed: true })
            },
        }
    }

    /// Runs the bulk monthly allowance reset and emits an [`AllowanceResetEvent`] with the run's summary.
    ///
    /// With `base_credit` set, every account starts the new cycle with that allowance; otherwise each account's own
    /// limit is reconstructed from its current `remaining + spent`.
    pub async fn reset_allowances(
        &self,
        base_credit: Option<Rupees>,
        batch_size: usize,
    ) -> Result<ResetSummary, SettlementError> {
        let summary = self.db.reset_all_allowances(base_credit, batch_size).await?;
        info!(
            "🕰️ Monthly allowance reset finished: {}/{} accounts confirmed.",
            summary.confirmed, summary.attempted
        );
        self.call_reset_hook(summary, base_credit).await;
        Ok(summary)
    }

    async fn call_purchase_hook(&self, order: &OrderRecord, account: &CadetAccount) {
        for emitter in &self.producers.purchase_producer {
            trace!("🧾️ Notifying purchase hook subscribers");
            let event = PurchaseEvent::new(order.clone(), account.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_allowance_exceeded_hook(&self, order: &OrderRecord, account: &CadetAccount) {
        for emitter in &self.producers.allowance_exceeded_producer {
            trace!("🧾️ Notifying allowance-exceeded hook subscribers");
            let event = AllowanceExceededEvent::new(order.clone(), account.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_reset_hook(&self, summary: ResetSummary, base_credit: Option<Rupees>) {
        for emitter in &self.producers.reset_producer {
            trace!("🕰️ Notifying allowance-reset hook subscribers");
            emitter.publish_event(AllowanceResetEvent::new(summary, base_credit)).await;
        }
    }
}

/// Rejects empty and malformed carts and returns the normalized lines. Settlement totals are computed from the
/// normalized cart, so whitespace differences can never produce distinct signatures.
fn validate_cart(items: Vec<LineItem>) -> Result<Vec<LineItem>, SettlementError> {
    if items.is_empty() {
        return Err(SettlementError::InvalidRequest("the cart is empty".into()));
    }
    let items = items.iter().map(LineItem::normalized).collect::<Vec<_>>();
    for item in &items {
        if item.name.is_empty() {
            return Err(SettlementError::InvalidRequest("a cart line is missing its item name".into()));
        }
        if item.quantity <= 0 {
            return Err(SettlementError::InvalidRequest(format!(
                "invalid quantity {} for {}",
                item.quantity, item.name
            )));
        }
        if item.unit_price.value() < 0 {
            return Err(SettlementError::InvalidRequest(format!(
                "negative unit price {} for {}",
                item.unit_price, item.name
            )));
        }
    }
    Ok(items)
}

/// Prices the normalized cart. Prices and quantities are client-supplied, so every multiply and add is checked; a
/// total that cannot be represented is rejected, never wrapped.
fn cart_total(items: &[LineItem]) -> Result<Rupees, SettlementError> {
    items.iter().try_fold(Rupees::default(), |acc, item| {
        item.line_total().and_then(|line| acc.checked_add(line)).ok_or_else(|| {
            SettlementError::InvalidRequest(format!("the total for {} is too large to settle", item.name))
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_carts_are_rejected() {
        let err = validate_cart(vec![]).err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("cart is empty"), "{err}");
    }

    #[test]
    fn bad_lines_are_rejected() {
        let items = vec![LineItem::new("samosa", Rupees::from(20), 0)];
        assert!(validate_cart(items).is_err());
        let items = vec![LineItem::new("  ", Rupees::from(20), 1)];
        assert!(validate_cart(items).is_err());
        let items = vec![LineItem::new("samosa", Rupees::from(-20), 1)];
        assert!(validate_cart(items).is_err());
    }

    #[test]
    fn overflowing_prices_are_rejected_not_wrapped() {
        let items = vec![LineItem::new("gold thali", Rupees::from(i64::MAX / 2), 3)];
        let err = cart_total(&items).err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("too large"), "{err}");

        // Each line fits on its own, but the running total does not.
        let items = vec![
            LineItem::new("a", Rupees::from(i64::MAX - 1), 1),
            LineItem::new("b", Rupees::from(2), 1),
        ];
        assert!(cart_total(&items).is_err());

        let items = vec![LineItem::new("samosa", Rupees::from(25), 4)];
        let total = cart_total(&items).ok();
        assert_eq!(total, Some(Rupees::from(100)));
    }

    #[test]
    fn valid_carts_are_normalized() {
        let items = vec![LineItem::new("  samosa ", Rupees::from(20), 2)];
        let normalized = validate_cart(items).ok();
        assert!(normalized.is_some());
        let normalized = normalized.into_iter().flatten().collect::<Vec<_>>();
        assert_eq!(normalized[0].name, "samosa");
    }
}
