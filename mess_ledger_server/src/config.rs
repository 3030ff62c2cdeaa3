use std::env;

use log::*;
use mls_common::Rupees;

const DEFAULT_MLS_HOST: &str = "127.0.0.1";
const DEFAULT_MLS_PORT: u16 = 8360;
/// The allowance granted to freshly registered accounts when the request does not specify one.
const DEFAULT_STARTING_ALLOWANCE: i64 = 15_000;
const DEFAULT_RESET_DAY_OF_MONTH: u32 = 1;
const DEFAULT_RESET_MINUTES_PAST_MIDNIGHT: i64 = 5;
const DEFAULT_RESET_BATCH_SIZE: usize = 500;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Allowance granted to new accounts registered without an explicit starting allowance.
    pub starting_allowance: Rupees,
    /// When false, the in-process monthly reset job is not started. Useful when an external scheduler drives the
    /// reset instead.
    pub run_reset_worker: bool,
    pub reset: ResetConfig,
}

/// Configuration for the monthly allowance reset job.
#[derive(Clone, Debug)]
pub struct ResetConfig {
    /// When set, every account is re-based to this allowance. When unset, each account's own limit is reconstructed
    /// from its current ledger state.
    pub base_credit: Option<Rupees>,
    /// Day of the month the reset fires on. Clamped to 1..=28 so the job exists in every month.
    pub day_of_month: u32,
    /// Offset past midnight UTC, to keep the job clear of other start-of-day work.
    pub minutes_past_midnight: i64,
    /// Accounts are re-based in batches of this size so a large mess roll never holds one long write lock.
    pub batch_size: usize,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            base_credit: None,
            day_of_month: DEFAULT_RESET_DAY_OF_MONTH,
            minutes_past_midnight: DEFAULT_RESET_MINUTES_PAST_MIDNIGHT,
            batch_size: DEFAULT_RESET_BATCH_SIZE,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MLS_HOST.to_string(),
            port: DEFAULT_MLS_PORT,
            database_url: String::default(),
            starting_allowance: Rupees::from(DEFAULT_STARTING_ALLOWANCE),
            run_reset_worker: true,
            reset: ResetConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MLS_HOST").ok().unwrap_or_else(|| DEFAULT_MLS_HOST.into());
        let port = env::var("MLS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MLS_PORT. {e} Using the default, {DEFAULT_MLS_PORT}, instead."
                    );
                    DEFAULT_MLS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MLS_PORT);
        let database_url = env::var("MLS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MLS_DATABASE_URL is not set. Please set it to the URL for the ledger database.");
            String::default()
        });
        let starting_allowance = rupee_var("MLS_STARTING_ALLOWANCE").unwrap_or_else(|| {
            info!(
                "🪛️ MLS_STARTING_ALLOWANCE is not set. New accounts start with Rs {DEFAULT_STARTING_ALLOWANCE} by \
                 default."
            );
            Rupees::from(DEFAULT_STARTING_ALLOWANCE)
        });
        let run_reset_worker = flag_var("MLS_RUN_RESET_WORKER", true);
        let reset = ResetConfig::from_env_or_default();
        Self { host, port, database_url, starting_allowance, run_reset_worker, reset }
    }
}

impl ResetConfig {
    pub fn from_env_or_default() -> Self {
        let base_credit = rupee_var("MLS_ALLOWANCE_BASE_CREDIT");
        if base_credit.is_none() {
            info!(
                "🪛️ MLS_ALLOWANCE_BASE_CREDIT is not set. The monthly reset will reconstruct each account's own \
                 limit instead of applying a fixed credit."
            );
        }
        let day_of_month = env::var("MLS_RESET_DAY_OF_MONTH")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for MLS_RESET_DAY_OF_MONTH. {e}"))
                    .ok()
            })
            .map(clamp_reset_day)
            .unwrap_or(DEFAULT_RESET_DAY_OF_MONTH);
        let minutes_past_midnight = env::var("MLS_RESET_MINUTES_PAST_MIDNIGHT")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for MLS_RESET_MINUTES_PAST_MIDNIGHT. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_RESET_MINUTES_PAST_MIDNIGHT);
        let batch_size = env::var("MLS_RESET_BATCH_SIZE")
            .ok()
            .and_then(|s| {
                s.parse::<usize>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for MLS_RESET_BATCH_SIZE. {e}"))
                    .ok()
            })
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_RESET_BATCH_SIZE);
        Self { base_credit, day_of_month, minutes_past_midnight, batch_size }
    }
}

/// Reads a boolean switch from the environment. Unrecognised values keep the default, loudly.
fn flag_var(name: &str, default: bool) -> bool {
    let Ok(raw) = env::var(name) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            warn!("🪛️ {other} is not a valid setting for {name}. Using the default ({default}) instead.");
            default
        },
    }
}

fn rupee_var(name: &str) -> Option<Rupees> {
    env::var(name).ok().and_then(|s| {
        s.parse::<i64>()
            .map(Rupees::from)
            .map_err(|e| warn!("🪛️ Invalid configuration value for {name}: {s}. {e}"))
            .ok()
    })
}

/// Clamps the reset day into 1..=28 so the schedule has a firing day in February too.
fn clamp_reset_day(day: u32) -> u32 {
    let clamped = day.clamp(1, 28);
    if clamped != day {
        warn!("🪛️ MLS_RESET_DAY_OF_MONTH {day} is out of range. Using {clamped} instead.");
    }
    clamped
}
