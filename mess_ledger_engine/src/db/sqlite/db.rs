use std::{fmt::Debug, time::Duration};

use log::*;
use mls_common::Rupees;
use sqlx::SqlitePool;

use super::{accounts, activity, create_database_if_missing, errors, new_pool, orders, run_migrations, SqliteDatabaseError};
use crate::{
    db::traits::{AccountManagement, InsertOrderResult, LedgerDatabase, SettlementOutcome, SettlementRequest},
    db_types::{
        ActivityRecord,
        CadetAccount,
        NewAccount,
        NewActivity,
        NewOrderRecord,
        OrderId,
        OrderRecord,
        PaymentMethod,
        ResetSummary,
        SettlementAlerts,
    },
    helpers::{check_half_threshold, split_charge},
};

/// How many times a settlement transaction is retried from the top after losing the store's write lock. Each retry
/// takes a fresh snapshot, so a retry that finds the competing order already committed resolves as a replay.
const MAX_SETTLE_ATTEMPTS: u64 = 4;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl LedgerDatabase for SqliteDatabase {
    type Error = SqliteDatabaseError;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn register_account(&self, account: NewAccount) -> Result<CadetAccount, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let id = accounts::insert_account(&account, &mut tx).await?;
        let created = accounts::account_by_id(id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::AccountNotFound(id))?;
        tx.commit().await?;
        Ok(created)
    }

    async fn settle_order(&self, request: SettlementRequest) -> Result<SettlementOutcome, Self::Error> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_settle(&request).await {
                Err(SqliteDatabaseError::DriverError(e)) if errors::is_busy(&e) => {
                    if attempt >= MAX_SETTLE_ATTEMPTS {
                        return Err(SqliteDatabaseError::StoreBusy(e.to_string()));
                    }
                    debug!(
                        "🧾️ Ledger busy while settling order {} (attempt {attempt}). Retrying.",
                        request.order_id
                    );
                    tokio::time::sleep(Duration::from_millis(25 * attempt)).await;
                },
                other => return other,
            }
        }
    }

    async fn apply_allowance_debit(&self, account_id: i64, amount: Rupees) -> Result<Rupees, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        accounts::apply_allowance_debit(account_id, amount, &mut conn).await
    }

    async fn reset_all_allowances(
        &self,
        base_credit: Option<Rupees>,
        batch_size: usize,
    ) -> Result<ResetSummary, Self::Error> {
        let mut summary = ResetSummary::default();
        let mut last_id = 0_i64;
        loop {
            let mut conn = self.pool.acquire().await?;
            let ids = accounts::account_id_batch(last_id, batch_size as i64, &mut conn).await?;
            if ids.is_empty() {
                break;
            }
            if let Some(&max_id) = ids.last() {
                last_id = max_id;
            }
            summary.attempted += ids.len() as u64;
            // One failed batch must not abort the run. The reset is idempotent, so a retry can pick the
            // stragglers up later.
            match accounts::reset_accounts(&ids, base_credit, &mut conn).await {
                Ok(n) => summary.confirmed += n,
                Err(e) => error!("🕰️ Allowance reset failed for the batch ending at account #{last_id}: {e}"),
            }
        }
        debug!(
            "🕰️ Allowance reset complete. {} attempted, {} confirmed.",
            summary.attempted, summary.confirmed
        );
        Ok(summary)
    }

    async fn log_activity(&self, new_activity: NewActivity) -> Result<(), Self::Error> {
        let mut conn = self.pool.acquire().await?;
        activity::insert_activity(&new_activity, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl AccountManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn fetch_account(&self, account_id: i64) -> Result<Option<CadetAccount>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        accounts::account_by_id(account_id, &mut conn).await
    }

    async fn fetch_account_by_service_number(
        &self,
        service_number: &str,
    ) -> Result<Option<CadetAccount>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        accounts::account_by_service_number(service_number, &mut conn).await
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::order_by_order_id(order_id, &mut conn).await
    }

    async fn fetch_order_by_idempotency_key(&self, key: &str) -> Result<Option<OrderRecord>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::order_by_idempotency_key(key, &mut conn).await
    }

    async fn fetch_orders_for_account(&self, account_id: i64) -> Result<Vec<OrderRecord>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::orders_for_account(account_id, &mut conn).await
    }

    async fn fetch_recent_activity(&self, limit: i64) -> Result<Vec<ActivityRecord>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        activity::recent_activity(limit, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object against an existing, migrated database.
    pub async fn new() -> Result<Self, SqliteDatabaseError> {
        let url = super::db_url();
        SqliteDatabase::new_with_url(url.as_str(), 25).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Creates the database file if needed, connects, and applies the embedded migrations. The one-stop constructor
    /// for servers and tests.
    pub async fn create(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        create_database_if_missing(url).await?;
        let db = Self::new_with_url(url, max_connections).await?;
        run_migrations(&db.pool).await?;
        Ok(db)
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// One settlement attempt as a single transaction. See [`LedgerDatabase::settle_order`] for the contract.
    async fn try_settle(&self, request: &SettlementRequest) -> Result<SettlementOutcome, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;

        // Step 1: idempotency replay, scoped to the submitting account. A key recorded against some other account
        // must never leak that account's order back; that case falls through to the insert and fails there.
        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(order) = orders::order_by_idempotency_key_for_account(key, request.account_id, &mut tx).await? {
                let account = accounts::account_by_id(request.account_id, &mut tx)
                    .await?
                    .ok_or(SqliteDatabaseError::AccountNotFound(request.account_id))?;
                tx.commit().await?;
                debug!("🧾️ Order {} replayed for idempotency key {key}", order.order_id);
                return Ok(SettlementOutcome::Replayed { order, account });
            }
        }

        // Step 2: signature-based duplicate suppression. Only a fallback for submissions without a key; a fresh
        // explicit key is a deliberate new order even if the cart repeats.
        if request.idempotency_key.is_none() {
            if let Some(order) = orders::recent_order_with_signature(
                request.account_id,
                request.total,
                &request.items_signature,
                request.duplicate_window_secs,
                &mut tx,
            )
            .await?
            {
                let account = accounts::account_by_id(request.account_id, &mut tx)
                    .await?
                    .ok_or(SqliteDatabaseError::AccountNotFound(request.account_id))?;
                tx.commit().await?;
                debug!("🧾️ Order {} replayed as a duplicate resubmission", order.order_id);
                return Ok(SettlementOutcome::Replayed { order, account });
            }
        }

        // Step 3: split and threshold, computed from the row read inside this transaction.
        let account = accounts::account_by_id(request.account_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::AccountNotFound(request.account_id))?;
        let split = split_charge(request.total, account.allowance_remaining);
        let threshold = check_half_threshold(&account, split.allowance_used);

        // Step 4: the ledger debit and the order insert commit or roll back together.
        accounts::apply_settlement(account.id, split.allowance_used, threshold.crossed, &mut tx).await?;
        let payment_method = if split.cash_or_card_due.is_zero() {
            PaymentMethod::MonthlyAllowance
        } else {
            PaymentMethod::remainder_from_hint(&request.payment_hint)
        };
        let mut new_order = NewOrderRecord {
            order_id: request.order_id.clone(),
            account_id: account.id,
            items: request.items.clone(),
            items_signature: request.items_signature.clone(),
            total: split.total,
            allowance_used: split.allowance_used,
            cash_or_card_due: split.cash_or_card_due,
            payment_method,
            idempotency_key: request.idempotency_key.clone(),
        };
        let inserted = loop {
            match orders::idempotent_insert(&new_order, &mut tx).await {
                Err(SqliteDatabaseError::DriverError(e)) if errors::is_order_id_violation(&e) => {
                    // The receipt number is cosmetic; a same-day suffix collision just gets a new roll.
                    debug!("🧾️ Receipt number {} is already taken. Rolling a new one.", new_order.order_id);
                    new_order.order_id = OrderId::generate();
                },
                other => break other?,
            }
        };
        match inserted {
            InsertOrderResult::Inserted(id) => {
                let order = orders::order_by_pk(id, &mut tx).await?.ok_or_else(|| {
                    SqliteDatabaseError::QueryError(format!("Order row #{id} vanished within its own transaction"))
                })?;
                let updated = accounts::account_by_id(account.id, &mut tx)
                    .await?
                    .ok_or(SqliteDatabaseError::AccountNotFound(account.id))?;
                tx.commit().await?;
                debug!(
                    "🧾️ Order {} settled for account #{}: {} from allowance, {} due in cash/card",
                    order.order_id, account.id, order.allowance_used, order.cash_or_card_due
                );
                let alerts = SettlementAlerts {
                    threshold_crossed: threshold.crossed,
                    used_percent: updated.used_percent(),
                    base_limit: threshold.base_limit,
                };
                Ok(SettlementOutcome::Fresh { order, account: updated, alerts })
            },
            InsertOrderResult::AlreadyExists(_id) => {
                // Lost the first-writer race on the idempotency key. Rolling back undoes this attempt's debit;
                // the winner's record is the authoritative settlement.
                tx.rollback().await?;
                let key = request.idempotency_key.as_deref().unwrap_or_default();
                let mut conn = self.pool.acquire().await?;
                // Only the account's own order may be replayed. A winning row under another account means the
                // caller reused a key that was never theirs.
                let order = orders::order_by_idempotency_key_for_account(key, request.account_id, &mut conn)
                    .await?
                    .ok_or_else(|| {
                        SqliteDatabaseError::KeyConflict(format!(
                            "idempotency key {key} is already recorded against a different account"
                        ))
                    })?;
                let account = accounts::account_by_id(request.account_id, &mut conn)
                    .await?
                    .ok_or(SqliteDatabaseError::AccountNotFound(request.account_id))?;
                debug!("🧾️ Order {} replayed after losing the idempotency race", order.order_id);
                Ok(SettlementOutcome::Replayed { order, account })
            },
        }
    }
}
