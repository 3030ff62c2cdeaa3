use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Database migration error: {0}")]
    MigrationError(String),
    #[error("Could not create new ledger account: {0}")]
    AccountCreationError(String),
    #[error("Account not found: {0}")]
    AccountNotFound(i64),
    #[error("The ledger store is busy. Retry the request with the same idempotency key: {0}")]
    StoreBusy(String),
    #[error("Idempotency key conflict: {0}")]
    KeyConflict(String),
}

/// True when the error is a unique-constraint violation on the orders idempotency key. This is the signature of a
/// lost first-writer race between two submissions carrying the same key.
pub(crate) fn is_idempotency_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation() && db.message().contains("orders.idempotency_key"))
        .unwrap_or(false)
}

/// True when the error is a unique-constraint violation on the cosmetic receipt number. A same-day random-suffix
/// collision, safe to resolve by rolling a new number.
pub(crate) fn is_order_id_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation() && db.message().contains("orders.order_id"))
        .unwrap_or(false)
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().map(|db| db.is_unique_violation()).unwrap_or(false)
}

/// True when the store rejected the statement because another writer holds the lock or committed after our snapshot.
/// Such transactions are safe to retry from the top.
pub(crate) fn is_busy(e: &sqlx::Error) -> bool {
    e.as_database_error().map(|db| db.message().contains("database is locked")).unwrap_or(false)
}
