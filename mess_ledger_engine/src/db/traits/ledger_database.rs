use mls_common::Rupees;

use crate::db_types::{CadetAccount, NewAccount, NewActivity, ResetSummary};

use super::{SettlementOutcome, SettlementRequest};

/// This trait defines the mutation surface that backends must expose to support the Mess Ledger Engine.
///
/// This behaviour includes:
/// * Registering new ledger accounts.
/// * Settling orders: the allowance/cash split, the ledger debit and the order insert as one atomic unit.
/// * The bulk monthly allowance reset.
/// * Appending audit activity records.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone {
    type Error: std::error::Error;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Creates a new ledger account with the given starting allowance. Fails if the service number is already
    /// registered.
    async fn register_account(&self, account: NewAccount) -> Result<CadetAccount, Self::Error>;

    /// Settles one cart in a single atomic transaction:
    /// * replays the existing order if the idempotency key is already recorded,
    /// * replays a recent order with the same content signature and total (duplicate suppression),
    /// * otherwise computes the allowance/cash split, debits the ledger (clamped at zero), updates the one-shot
    ///   half-used flag and inserts the order record.
    ///
    /// Two concurrent settlements for the same account serialize around this transaction: the balance can never go
    /// negative and the same allowance can never be spent twice. A lost first-writer race on the idempotency key is
    /// resolved by rolling the transaction back (debit included) and returning the winner's record as a replay.
    async fn settle_order(&self, request: SettlementRequest) -> Result<SettlementOutcome, Self::Error>;

    /// Atomically debits up to `amount` from the account's allowance, clamping at zero, and mirrors the debited
    /// portion into the cycle spend. Returns the new remaining balance.
    async fn apply_allowance_debit(&self, account_id: i64, amount: Rupees) -> Result<Rupees, Self::Error>;

    /// Re-bases every account for a new cycle, in bounded-size batches: sets the allowance to `base_credit`, or to
    /// the account's own reconstructed limit (`remaining + spent`) when no fixed credit is configured, zeroes the
    /// cycle spend and clears the half-used flag.
    ///
    /// Each account update is idempotent, so a crashed run is safe to retry. A failing batch is logged and skipped
    /// rather than aborting the run; the returned summary distinguishes attempted from confirmed updates.
    async fn reset_all_allowances(
        &self,
        base_credit: Option<Rupees>,
        batch_size: usize,
    ) -> Result<ResetSummary, Self::Error>;

    /// Appends one audit record. Callers treat this as best-effort; failures must never roll back a settlement.
    async fn log_activity(&self, activity: NewActivity) -> Result<(), Self::Error>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
