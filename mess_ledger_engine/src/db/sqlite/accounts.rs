use log::debug;
use mls_common::Rupees;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::sqlite::errors::{is_unique_violation, SqliteDatabaseError},
    db_types::{CadetAccount, NewAccount},
};

const ACCOUNT_COLUMNS: &str = r#"
    id,
    service_number,
    name,
    allowance_remaining,
    total_spent,
    half_used_notified,
    created_at,
    updated_at
"#;

pub async fn account_by_id(
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CadetAccount>, SqliteDatabaseError> {
    let account = sqlx::query_as::<_, CadetAccount>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
    ))
    .bind(account_id)
    .fetch_optional(conn)
    .await?;
    Ok(account)
}

pub async fn account_by_service_number(
    service_number: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<CadetAccount>, SqliteDatabaseError> {
    let account = sqlx::query_as::<_, CadetAccount>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE service_number = $1"
    ))
    .bind(service_number)
    .fetch_optional(conn)
    .await?;
    Ok(account)
}

pub async fn insert_account(
    account: &NewAccount,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let result = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO accounts (service_number, name, allowance_remaining)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&account.service_number)
    .bind(&account.name)
    .bind(account.starting_allowance.value())
    .fetch_one(conn)
    .await;
    match result {
        Ok(id) => {
            debug!("🧑️ Created new ledger account #{id} for {}", account.service_number);
            Ok(id)
        },
        Err(e) if is_unique_violation(&e) => Err(SqliteDatabaseError::AccountCreationError(format!(
            "service number {} is already registered",
            account.service_number
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Applies the settlement mutation to the ledger row: debits the allowance (clamped at zero as a defensive floor),
/// mirrors the debit into the cycle spend and latches the half-used flag when the threshold was crossed. The caller
/// computed `allowance_used` from the same row inside the same transaction.
pub async fn apply_settlement(
    account_id: i64,
    allowance_used: Rupees,
    half_used_notified: bool,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let debit = allowance_used.value();
    sqlx::query(
        r#"
        UPDATE accounts SET
            allowance_remaining = MAX(0, allowance_remaining - $1),
            total_spent = total_spent + $1,
            half_used_notified = MAX(half_used_notified, $2),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $3
        "#,
    )
    .bind(debit)
    .bind(half_used_notified)
    .bind(account_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Single-statement atomic debit: takes up to `amount` from the allowance and mirrors the debited portion into the
/// cycle spend. Returns the new remaining balance.
pub async fn apply_allowance_debit(
    account_id: i64,
    amount: Rupees,
    conn: &mut SqliteConnection,
) -> Result<Rupees, SqliteDatabaseError> {
    let value = amount.value();
    let new_balance = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE accounts SET
            allowance_remaining = MAX(0, allowance_remaining - $1),
            total_spent = total_spent + MIN(allowance_remaining, $1),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2
        RETURNING allowance_remaining
        "#,
    )
    .bind(value)
    .bind(account_id)
    .fetch_optional(conn)
    .await?
    .ok_or(SqliteDatabaseError::AccountNotFound(account_id))?;
    Ok(Rupees::from(new_balance))
}

/// The next `limit` account ids after `after_id`, in id order. Used to walk the fleet in bounded batches.
pub async fn account_id_batch(
    after_id: i64,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<i64>, SqliteDatabaseError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM accounts WHERE id > $1 ORDER BY id ASC LIMIT $2",
    )
    .bind(after_id)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(ids)
}

/// Re-bases one batch of accounts for a new cycle. With a fixed base credit every account gets the same allowance;
/// without one, each account's own limit is reconstructed as `allowance_remaining + total_spent`. Re-applying the
/// reset to an already-reset account is a no-op beyond the redundant write.
pub async fn reset_accounts(
    ids: &[i64],
    base_credit: Option<Rupees>,
    conn: &mut SqliteConnection,
) -> Result<u64, SqliteDatabaseError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE accounts SET allowance_remaining = ");
    match base_credit {
        Some(credit) => {
            builder.push_bind(credit.value().max(0));
        },
        None => {
            builder.push("allowance_remaining + total_spent");
        },
    }
    builder.push(", total_spent = 0, half_used_notified = 0, updated_at = CURRENT_TIMESTAMP WHERE id IN (");
    let mut id_list = builder.separated(", ");
    for id in ids {
        id_list.push_bind(*id);
    }
    builder.push(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}
