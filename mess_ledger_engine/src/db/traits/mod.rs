//! # Database management and control.
//!
//! This module provides the interfaces that define the contracts of the ledger engine database *backends*.
//!
//! ## Accounts
//! An account is the per-cadet ledger row: the remaining monthly allowance, the cumulative allowance spend for the
//! current cycle, and the one-shot half-used notification flag.
//!
//! The [`LedgerDatabase`] trait provides the mutation surface: registering accounts, settling orders atomically
//! against the ledger, debiting allowances, the bulk monthly reset, and appending audit records.
//!
//! The [`AccountManagement`] trait provides methods for querying information about accounts, orders and the activity
//! log. Read-only; nothing in it can move money.
mod account_management;
mod data_objects;
mod ledger_database;

pub use account_management::AccountManagement;
pub use data_objects::{InsertOrderResult, SettlementOutcome, SettlementRequest};
pub use ledger_database::LedgerDatabase;
