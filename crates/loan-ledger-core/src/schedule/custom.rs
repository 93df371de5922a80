use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{fits_total, per_period_principal, Installment};
use crate::calendar::add_months;
use crate::loan::CustomInterest;
use crate::money::{percent_of, round_half_up, settle_dust};
use crate::types::Money;

/// Fixed-installment custom schedule: constant principal and constant flat
/// interest every period.
pub fn flat_installments(
    principal: Money,
    start_date: NaiveDate,
    installment_count: u32,
    interest: &CustomInterest,
) -> Vec<Installment> {
    rows(principal, start_date, installment_count, interest).unwrap_or_default()
}

fn rows(
    principal: Money,
    start_date: NaiveDate,
    installment_count: u32,
    interest: &CustomInterest,
) -> Option<Vec<Installment>> {
    let per_period = per_period_principal(principal, installment_count)?;
    let principal_portion = round_half_up(per_period);
    let interest_portion = flat_interest(principal, installment_count, interest)?;
    let total_due = principal_portion.checked_add(interest_portion)?;

    let mut installments = Vec::with_capacity(installment_count as usize);
    let mut balance = principal;

    for number in 1..=installment_count {
        let due_date = add_months(start_date, number)?;
        balance = balance.checked_sub(per_period)?;

        installments.push(Installment {
            installment_number: number,
            due_date,
            principal_portion,
            interest_portion,
            total_due,
            remaining_balance: settle_dust(balance),
        });
    }

    fits_total(&installments).then_some(installments)
}

/// Interest charged on every installment, rounded.
fn flat_interest(principal: Money, installment_count: u32, interest: &CustomInterest) -> Option<Money> {
    let n = Decimal::from(installment_count);
    let per_installment = match interest {
        CustomInterest::None => Decimal::ZERO,
        CustomInterest::Percentage(pct) => percent_of(principal, *pct)?.checked_div(n)?,
        CustomInterest::FixedAmount(amount) => amount.checked_div(n)?,
    };
    Some(round_half_up(per_installment))
}
