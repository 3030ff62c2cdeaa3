use crate::db_types::{ActivityRecord, CadetAccount, OrderId, OrderRecord};

/// The `AccountManagement` trait defines the read side of the ledger: account snapshots, order history and the
/// activity log. The [`super::LedgerDatabase`] trait handles the actual machinery of mutating balances and writing
/// orders; nothing here can move money.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    type Error: std::error::Error;

    /// Fetches the account with the given id. If no account exists, `None` is returned.
    async fn fetch_account(&self, account_id: i64) -> Result<Option<CadetAccount>, Self::Error>;

    /// Fetches the account registered under the given service number, if any.
    async fn fetch_account_by_service_number(&self, service_number: &str) -> Result<Option<CadetAccount>, Self::Error>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, Self::Error>;

    /// Fetches the order recorded under the given idempotency key, if any. Keys are globally unique, so at most one
    /// record can match.
    async fn fetch_order_by_idempotency_key(&self, key: &str) -> Result<Option<OrderRecord>, Self::Error>;

    /// All orders for the account, newest first.
    async fn fetch_orders_for_account(&self, account_id: i64) -> Result<Vec<OrderRecord>, Self::Error>;

    /// The most recent audit records, newest first.
    async fn fetch_recent_activity(&self, limit: i64) -> Result<Vec<ActivityRecord>, Self::Error>;
}
