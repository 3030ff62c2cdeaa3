//! # Mess ledger engine public API
//!
//! The `engine_api` module exposes the programmatic API for the Mess Ledger Engine. The API is modular, so that
//! clients can pick and choose the functionality they need; a kiosk that only reads balances never has to carry the
//! settlement surface.
//!
//! * [`accounts_api`] provides methods for querying ledger accounts, order history and the audit trail, and for
//!   registering new accounts.
//! * [`settlement_api`] is the primary API for settling carts against the allowance ledger and for running the bulk
//!   monthly allowance reset.
//!
//! # API usage
//!
//! The pattern for using the APIs is the same. An API instance is created by supplying a database backend that
//! implements the specific backend traits required by the API.
//!
//! For example, to create an API instance to query accounts:
//!
//! ```rust,ignore
//! use mess_ledger_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements AccountManagement
//! let api = AccountApi::new(db);
//! let account = api.account_by_service_number("SN-1042").await?;
//! ```

pub mod accounts_api;
pub mod errors;
pub mod settlement_api;
