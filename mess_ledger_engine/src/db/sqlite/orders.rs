use chrono::{DateTime, Utc};
use log::debug;
use mls_common::Rupees;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::{
        sqlite::errors::{is_idempotency_key_violation, SqliteDatabaseError},
        traits::InsertOrderResult,
    },
    db_types::{NewOrderRecord, OrderId, OrderRecord},
};

const ORDER_COLUMNS: &str = r#"
    id,
    order_id,
    account_id,
    items,
    items_signature,
    total,
    allowance_used,
    cash_or_card_due,
    payment_method,
    idempotency_key,
    pickup_verified,
    collected_at,
    created_at
"#;

/// Raw orders row. Items are stored as a JSON document and the payment method as its display label, so rows are
/// decoded through this intermediate before becoming an [`OrderRecord`].
#[derive(Debug, FromRow)]
struct OrderRow {
    id: i64,
    order_id: String,
    account_id: i64,
    items: String,
    items_signature: String,
    total: i64,
    allowance_used: i64,
    cash_or_card_due: i64,
    payment_method: String,
    idempotency_key: Option<String>,
    pickup_verified: bool,
    collected_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_record(self) -> Result<OrderRecord, SqliteDatabaseError> {
        let items = serde_json::from_str(&self.items).map_err(|e| {
            SqliteDatabaseError::QueryError(format!("Malformed items document on order {}: {e}", self.order_id))
        })?;
        Ok(OrderRecord {
            id: self.id,
            order_id: OrderId::from(self.order_id),
            account_id: self.account_id,
            items,
            items_signature: self.items_signature,
            total: Rupees::from(self.total),
            allowance_used: Rupees::from(self.allowance_used),
            cash_or_card_due: Rupees::from(self.cash_or_card_due),
            payment_method: self.payment_method.into(),
            idempotency_key: self.idempotency_key,
            pickup_verified: self.pickup_verified,
            collected_at: self.collected_at,
            created_at: self.created_at,
        })
    }
}

fn rows_to_records(rows: Vec<OrderRow>) -> Result<Vec<OrderRecord>, SqliteDatabaseError> {
    rows.into_iter().map(OrderRow::into_record).collect()
}

/// Inserts a new settled order. A unique-key collision on the idempotency key means another submission carrying the
/// same key won the first-writer race; the winner's row id is returned as `AlreadyExists` rather than an error, so
/// the caller can roll back its ledger mutation and replay the winner's record.
pub async fn idempotent_insert(
    order: &NewOrderRecord,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, SqliteDatabaseError> {
    let items = serde_json::to_string(&order.items)
        .map_err(|e| SqliteDatabaseError::QueryError(format!("Could not serialize order items: {e}")))?;
    let result = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO orders (
            order_id,
            account_id,
            items,
            items_signature,
            total,
            allowance_used,
            cash_or_card_due,
            payment_method,
            idempotency_key
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(order.account_id)
    .bind(items)
    .bind(&order.items_signature)
    .bind(order.total.value())
    .bind(order.allowance_used.value())
    .bind(order.cash_or_card_due.value())
    .bind(order.payment_method.to_string())
    .bind(&order.idempotency_key)
    .fetch_one(&mut *conn)
    .await;
    match result {
        Ok(id) => Ok(InsertOrderResult::Inserted(id)),
        Err(e) if is_idempotency_key_violation(&e) => {
            let key = order.idempotency_key.as_deref().unwrap_or_default();
            debug!("🧾️ Lost idempotency race for key {key}; resolving the winning record");
            let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM orders WHERE idempotency_key = $1")
                .bind(key)
                .fetch_optional(&mut *conn)
                .await?;
            match existing {
                Some(id) => Ok(InsertOrderResult::AlreadyExists(id)),
                None => Err(e.into()),
            }
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn order_by_pk(id: i64, conn: &mut SqliteConnection) -> Result<Option<OrderRecord>, SqliteDatabaseError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(OrderRow::into_record).transpose()
}

pub async fn order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRecord>, SqliteDatabaseError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"))
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    row.map(OrderRow::into_record).transpose()
}

pub async fn order_by_idempotency_key(
    key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRecord>, SqliteDatabaseError> {
    let row =
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE idempotency_key = $1"))
            .bind(key)
            .fetch_optional(conn)
            .await?;
    row.map(OrderRow::into_record).transpose()
}

/// The order recorded under `key` for this account, if any. Settlement replay must use this form: an idempotency key
/// only ever replays the submitting account's own order, never another account's.
pub async fn order_by_idempotency_key_for_account(
    key: &str,
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRecord>, SqliteDatabaseError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE idempotency_key = $1 AND account_id = $2"
    ))
    .bind(key)
    .bind(account_id)
    .fetch_optional(conn)
    .await?;
    row.map(OrderRow::into_record).transpose()
}

/// The most recent order for the account with the same total and content signature inside the trailing window, if
/// any. This is the duplicate-suppression fallback for submissions without an idempotency key.
pub async fn recent_order_with_signature(
    account_id: i64,
    total: Rupees,
    signature: &str,
    window_secs: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRecord>, SqliteDatabaseError> {
    if window_secs <= 0 {
        return Ok(None);
    }
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r#"
        SELECT {ORDER_COLUMNS} FROM orders
        WHERE account_id = $1 AND total = $2 AND items_signature = $3
          AND created_at >= datetime('now', $4)
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#
    ))
    .bind(account_id)
    .bind(total.value())
    .bind(signature)
    .bind(format!("-{window_secs} seconds"))
    .fetch_optional(conn)
    .await?;
    row.map(OrderRow::into_record).transpose()
}

/// All orders for the account, newest first.
pub async fn orders_for_account(
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderRecord>, SqliteDatabaseError> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE account_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(account_id)
    .fetch_all(conn)
    .await?;
    rows_to_records(rows)
}
