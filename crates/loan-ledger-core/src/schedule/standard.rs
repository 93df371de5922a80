use chrono::NaiveDate;

use super::{fits_total, per_period_principal, Installment};
use crate::calendar::add_months;
use crate::money::{percent_of, round_half_up, settle_dust};
use crate::types::{Money, Percent};

/// German-system schedule: the same principal each period, interest charged
/// on the balance outstanding before the period.
///
/// The running balance is tracked with the unrounded per-period principal so
/// rounding error never compounds; only the presented portions and balances
/// are rounded. Amounts too large to represent yield an empty schedule.
pub fn declining_balance(
    principal: Money,
    start_date: NaiveDate,
    installment_count: u32,
    monthly_interest_rate: Percent,
) -> Vec<Installment> {
    rows(principal, start_date, installment_count, monthly_interest_rate).unwrap_or_default()
}

fn rows(
    principal: Money,
    start_date: NaiveDate,
    installment_count: u32,
    monthly_interest_rate: Percent,
) -> Option<Vec<Installment>> {
    let per_period = per_period_principal(principal, installment_count)?;
    let principal_portion = round_half_up(per_period);

    let mut installments = Vec::with_capacity(installment_count as usize);
    let mut balance = principal;

    for number in 1..=installment_count {
        let due_date = add_months(start_date, number)?;
        let interest_portion = round_half_up(percent_of(balance, monthly_interest_rate)?);
        balance = balance.checked_sub(per_period)?;

        installments.push(Installment {
            installment_number: number,
            due_date,
            principal_portion,
            interest_portion,
            total_due: principal_portion.checked_add(interest_portion)?,
            remaining_balance: settle_dust(balance),
        });
    }

    fits_total(&installments).then_some(installments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn jan_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_first_and_last_installment() {
        let sched = declining_balance(dec!(1200), jan_first(), 12, dec!(5));
        assert_eq!(sched.len(), 12);

        let first = &sched[0];
        assert_eq!(first.installment_number, 1);
        assert_eq!(first.due_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(first.principal_portion, dec!(100));
        assert_eq!(first.interest_portion, dec!(60));
        assert_eq!(first.total_due, dec!(160));
        assert_eq!(first.remaining_balance, dec!(1100));

        let last = &sched[11];
        assert_eq!(last.due_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(last.interest_portion, dec!(5));
        assert_eq!(last.remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_interest_declines_each_period() {
        let sched = declining_balance(dec!(1200), jan_first(), 12, dec!(5));
        for pair in sched.windows(2) {
            assert!(pair[1].interest_portion < pair[0].interest_portion);
        }
    }

    #[test]
    fn test_uneven_split_rounds_portions_only() {
        // 1000 / 3 = 333.33..; portions round to 333, balance keeps the cents
        let sched = declining_balance(dec!(1000), jan_first(), 3, dec!(0));
        assert!(sched.iter().all(|i| i.principal_portion == dec!(333)));
        assert_eq!(sched[0].remaining_balance, dec!(667));
        assert_eq!(sched[1].remaining_balance, dec!(333));
        assert_eq!(sched[2].remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_interest_rounds_half_up() {
        // 1000 * 2.5% = 25 ; then 500 * 2.5% = 12.5 -> 13
        let sched = declining_balance(dec!(1000), jan_first(), 2, dec!(2.5));
        assert_eq!(sched[0].interest_portion, dec!(25));
        assert_eq!(sched[1].interest_portion, dec!(13));
        assert_eq!(sched[1].total_due, dec!(513));
    }

    #[test]
    fn test_month_end_start_clamps() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let sched = declining_balance(dec!(300), start, 3, dec!(1));
        assert_eq!(sched[0].due_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(sched[1].due_date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(sched[2].due_date, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
    }

    #[test]
    fn test_overflowing_interest_is_empty() {
        assert!(declining_balance(Decimal::MAX, jan_first(), 1, dec!(5)).is_empty());
        // each row fits but the schedule total does not
        assert!(declining_balance(Decimal::MAX, jan_first(), 2, dec!(1)).is_empty());
    }

    #[test]
    fn test_zero_installments_is_empty() {
        assert!(declining_balance(dec!(1200), jan_first(), 0, dec!(5)).is_empty());
    }
}
