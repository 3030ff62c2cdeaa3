//! Helpers for setting up throwaway ledger databases in tests.

pub mod prepare_env;
