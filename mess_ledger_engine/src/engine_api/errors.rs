use thiserror::Error;

#[cfg(feature = "sqlite")]
use crate::db::sqlite::SqliteDatabaseError;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Account not found: {0}")]
    AccountNotFound(i64),
    #[error("Invalid settlement request: {0}")]
    InvalidRequest(String),
    #[error("The ledger store is busy: {0}")]
    StoreBusy(String),
    #[error("Ledger storage error: {0}")]
    DatabaseError(String),
}

#[cfg(feature = "sqlite")]
impl From<SqliteDatabaseError> for SettlementError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::AccountNotFound(id) => Self::AccountNotFound(id),
            SqliteDatabaseError::StoreBusy(msg) => Self::StoreBusy(msg),
            // Reusing a key that belongs to another account is a client error, not a storage fault.
            SqliteDatabaseError::KeyConflict(msg) => Self::InvalidRequest(msg),
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccountApiError {
    #[error("Could not register the account: {0}")]
    AccountCreation(String),
    #[error("Ledger storage error: {0}")]
    DatabaseError(String),
}

#[cfg(feature = "sqlite")]
impl From<SqliteDatabaseError> for AccountApiError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::AccountCreationError(msg) => Self::AccountCreation(msg),
            other => Self::DatabaseError(other.to_string()),
        }
    }
}
