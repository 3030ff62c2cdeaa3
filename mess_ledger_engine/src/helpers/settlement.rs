use mls_common::Rupees;

use crate::db_types::CadetAccount;

/// How a charge divides between the allowance and the cash/card remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitAmounts {
    pub total: Rupees,
    pub allowance_used: Rupees,
    pub cash_or_card_due: Rupees,
}

/// Splits `total` between the available allowance and the cash/card remainder.
///
/// The allowance is always consumed first, regardless of the client's stated payment intent. The intent only selects
/// the label for the remainder; it never changes the arithmetic. `allowance_used + cash_or_card_due == total` holds
/// exactly for every input.
pub fn split_charge(total: Rupees, available: Rupees) -> SplitAmounts {
    let allowance_used = total.min(available).floor_zero();
    SplitAmounts { total, allowance_used, cash_or_card_due: total - allowance_used }
}

/// Result of the 50% usage-threshold check for a pending debit.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdCheck {
    /// True when this debit takes the cycle usage from below 50% to at or above 50%, and the one-shot flag has not
    /// fired yet this cycle.
    pub crossed: bool,
    pub used_percent: i64,
    pub base_limit: Rupees,
}

/// Evaluates the one-shot half-used notification for a debit of `allowance_used` against `account`.
///
/// The base limit is reconstructed from the pre-mutation ledger state; only allowance-covered spend moves the usage
/// ratio, so a cash-only order can never trigger the threshold.
pub fn check_half_threshold(account: &CadetAccount, allowance_used: Rupees) -> ThresholdCheck {
    let base_limit = account.base_limit();
    let pre_ratio = account.used_ratio();
    let post_spent = account.total_spent + allowance_used;
    let post_ratio = if base_limit.value() <= 0 {
        0.0
    } else {
        post_spent.value() as f64 / base_limit.value() as f64
    };
    let crossed = !account.half_used_notified && pre_ratio < 0.5 && post_ratio >= 0.5;
    ThresholdCheck { crossed, used_percent: (post_ratio * 100.0).round() as i64, base_limit }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use rand::Rng;

    use super::*;

    fn account(remaining: i64, spent: i64, notified: bool) -> CadetAccount {
        CadetAccount {
            id: 1,
            service_number: "SN-100".to_string(),
            name: "Test Cadet".to_string(),
            allowance_remaining: Rupees::from(remaining),
            total_spent: Rupees::from(spent),
            half_used_notified: notified,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn allowance_consumed_first() {
        let split = split_charge(Rupees::from(1500), Rupees::from(1000));
        assert_eq!(split.allowance_used, Rupees::from(1000));
        assert_eq!(split.cash_or_card_due, Rupees::from(500));
    }

    #[test]
    fn exhausted_allowance_goes_to_cash() {
        let split = split_charge(Rupees::from(200), Rupees::from(0));
        assert_eq!(split.allowance_used, Rupees::from(0));
        assert_eq!(split.cash_or_card_due, Rupees::from(200));
    }

    #[test]
    fn fully_covered_order() {
        let split = split_charge(Rupees::from(300), Rupees::from(1000));
        assert_eq!(split.allowance_used, Rupees::from(300));
        assert_eq!(split.cash_or_card_due, Rupees::from(0));
    }

    #[test]
    fn split_invariant_randomized() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let total = Rupees::from(rng.gen_range(0..50_000));
            let available = Rupees::from(rng.gen_range(0..20_000));
            let split = split_charge(total, available);
            assert_eq!(split.allowance_used + split.cash_or_card_due, total);
            assert!(split.allowance_used <= available);
            assert!(split.allowance_used >= Rupees::from(0));
        }
    }

    #[test]
    fn threshold_fires_on_crossing() {
        let acc = account(1000, 0, false);
        let check = check_half_threshold(&acc, Rupees::from(1000));
        assert!(check.crossed);
        assert_eq!(check.used_percent, 100);
        assert_eq!(check.base_limit, Rupees::from(1000));
    }

    #[test]
    fn threshold_respects_one_shot_flag() {
        let acc = account(100, 900, true);
        let check = check_half_threshold(&acc, Rupees::from(50));
        assert!(!check.crossed);
    }

    #[test]
    fn threshold_ignores_sub_half_usage() {
        let acc = account(900, 100, false);
        let check = check_half_threshold(&acc, Rupees::from(100));
        assert!(!check.crossed);
        assert_eq!(check.used_percent, 20);
    }

    #[test]
    fn zero_limit_never_crosses() {
        let acc = account(0, 0, false);
        let check = check_half_threshold(&acc, Rupees::from(0));
        assert!(!check.crossed);
        assert_eq!(check.used_percent, 0);
        assert_eq!(check.base_limit, Rupees::from(0));
    }
}
