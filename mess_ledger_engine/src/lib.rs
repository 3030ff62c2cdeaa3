//! Mess Ledger Engine
//!
//! The Mess Ledger Engine holds the core logic for the cadet mess ordering platform: the allowance ledger, order
//! settlement, duplicate suppression and the monthly allowance reset. It is provider-agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@db`]). Sqlite is the supported backend. You should never need to access
//!    the database directly. Instead, use the public API provided by the engine. The exception is the data types used
//!    in the database. These are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@engine_api`]). This provides the public-facing functionality of the ledger engine.
//!    It is responsible for settling orders against the allowance ledger, querying accounts and order history, and
//!    running the bulk allowance reset. Specific backends need to implement the traits in [`mod@db`] in order to act
//!    as a backend for the Mess Ledger Server.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when certain actions
//! occur within the engine. For example, when an order settles, a `PurchaseEvent` is emitted. A simple actor framework
//! is used so that you can easily hook into these events and perform custom actions, such as writing audit records.
//! Event delivery is fire-and-forget; a failing subscriber never affects settlement correctness.
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
mod engine_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{AccountManagement, InsertOrderResult, LedgerDatabase, SettlementOutcome, SettlementRequest};
pub use engine_api::{
    accounts_api::AccountApi,
    errors::{AccountApiError, SettlementError},
    settlement_api::{SettlementApi, SettlementResult, DUPLICATE_SUPPRESSION_WINDOW_SECS},
};
