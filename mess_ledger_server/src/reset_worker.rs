use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use log::*;
use mess_ledger_engine::{events::EventProducers, SettlementApi, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::config::ResetConfig;

/// Starts the monthly allowance reset worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The worker sleeps until the configured day-of-month and minutes-past-midnight (UTC), runs the bulk reset, and
/// schedules the next cycle. The reset itself is idempotent, so a restart that re-fires in the same window is
/// harmless.
pub fn start_reset_worker(db: SqliteDatabase, producers: EventProducers, config: ResetConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let api = SettlementApi::new(db, producers);
        info!("🕰️ Monthly allowance reset worker started");
        loop {
            let now = Utc::now();
            let fire_at = next_fire(&config, now);
            info!("🕰️ Next allowance reset scheduled for {fire_at}");
            let wait = (fire_at - now).to_std().unwrap_or(std::time::Duration::from_secs(60));
            tokio::time::sleep(wait).await;
            info!("🕰️ Running monthly allowance reset job");
            match api.reset_allowances(config.base_credit, config.batch_size).await {
                Ok(summary) => {
                    info!("🕰️ Allowance reset complete. {}/{} accounts re-based", summary.confirmed, summary.attempted)
                },
                Err(e) => error!("🕰️ Error running allowance reset job: {e}"),
            }
        }
    })
}

/// The next time the reset fires, strictly after `now`.
pub fn next_fire(config: &ResetConfig, now: DateTime<Utc>) -> DateTime<Utc> {
    let fire_in = |year: i32, month: u32| {
        Utc.with_ymd_and_hms(year, month, config.day_of_month, 0, 0, 0)
            .single()
            .map(|t| t + Duration::minutes(config.minutes_past_midnight))
    };
    match fire_in(now.year(), now.month()) {
        Some(t) if t > now => t,
        _ => {
            let (year, month) = if now.month() == 12 { (now.year() + 1, 1) } else { (now.year(), now.month() + 1) };
            // The config clamps the day to 1..=28, so the next month always has the firing day.
            fire_in(year, month).unwrap_or(now + Duration::days(28))
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn schedule(day: u32, minutes: i64) -> ResetConfig {
        ResetConfig { base_credit: None, day_of_month: day, minutes_past_midnight: minutes, batch_size: 500 }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).single().unwrap()
    }

    #[test]
    fn fires_later_this_month_when_the_day_is_still_ahead() {
        let next = next_fire(&schedule(15, 5), at(2025, 8, 3, 12, 0));
        assert_eq!(next, at(2025, 8, 15, 0, 5));
    }

    #[test]
    fn rolls_to_next_month_once_the_day_has_passed() {
        let next = next_fire(&schedule(1, 5), at(2025, 8, 3, 12, 0));
        assert_eq!(next, at(2025, 9, 1, 0, 5));
    }

    #[test]
    fn a_fire_time_equal_to_now_schedules_the_next_cycle() {
        let next = next_fire(&schedule(1, 5), at(2025, 8, 1, 0, 5));
        assert_eq!(next, at(2025, 9, 1, 0, 5));
    }

    #[test]
    fn december_rolls_into_january() {
        let next = next_fire(&schedule(1, 5), at(2025, 12, 20, 9, 30));
        assert_eq!(next, at(2026, 1, 1, 0, 5));
    }
}
