//! Unified API for querying ledger accounts and their history.

use std::fmt::Debug;

use crate::{
    db::traits::{AccountManagement, LedgerDatabase},
    db_types::{ActivityRecord, CadetAccount, NewAccount, OrderId, OrderRecord},
    engine_api::errors::AccountApiError,
    helpers::dedup_order_history,
};

/// The `AccountApi` provides a unified read API over ledger accounts, orders and the audit trail, plus account
/// registration.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AccountApi<B>
where
    B: AccountManagement,
    AccountApiError: From<<B as AccountManagement>::Error>,
{
    /// Fetches the ledger account with the given id. `None` if no such account exists.
    pub async fn account_by_id(&self, account_id: i64) -> Result<Option<CadetAccount>, AccountApiError> {
        Ok(self.db.fetch_account(account_id).await?)
    }

    /// Fetches the ledger account registered under the given service number.
    pub async fn account_by_service_number(
        &self,
        service_number: &str,
    ) -> Result<Option<CadetAccount>, AccountApiError> {
        Ok(self.db.fetch_account_by_service_number(service_number).await?)
    }

    pub async fn order_by_order_id(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, AccountApiError> {
        Ok(self.db.fetch_order_by_order_id(order_id).await?)
    }

    pub async fn order_by_idempotency_key(&self, key: &str) -> Result<Option<OrderRecord>, AccountApiError> {
        Ok(self.db.fetch_order_by_idempotency_key(key).await?)
    }

    /// The account's order history, newest first. With `deduped` set, near-simultaneous repeats of the same cart are
    /// collapsed to their first occurrence. This is purely a view-level filter; every settled order stays on record.
    pub async fn order_history(&self, account_id: i64, deduped: bool) -> Result<Vec<OrderRecord>, AccountApiError> {
        let orders = self.db.fetch_orders_for_account(account_id).await?;
        if deduped {
            Ok(dedup_order_history(orders))
        } else {
            Ok(orders)
        }
    }

    /// The most recent audit records, newest first.
    pub async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityRecord>, AccountApiError> {
        Ok(self.db.fetch_recent_activity(limit).await?)
    }
}

impl<B> AccountApi<B>
where
    B: LedgerDatabase,
    AccountApiError: From<<B as LedgerDatabase>::Error>,
{
    /// Registers a new ledger account. Fails if the service number is already taken.
    pub async fn register_account(&self, account: NewAccount) -> Result<CadetAccount, AccountApiError> {
        Ok(self.db.register_account(account).await?)
    }
}
