//! Installment schedule engine.
//!
//! One pure entry point, [`compute_schedule`], serves every consumer (ledger
//! reconciliation, receipts, reports). Loans that cannot produce a schedule
//! (free-form repayment, zero installments, unparseable forms) yield an empty
//! schedule instead of an error so that report rendering keeps working on
//! partially configured loans.

pub mod custom;
pub mod standard;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::loan::{Loan, LoanForm, LoanTerms, PaymentMode};
use crate::types::*;

/// One scheduled repayment unit. Derived on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Installment {
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub principal_portion: Money,
    pub interest_portion: Money,
    /// `principal_portion + interest_portion`, both already rounded.
    pub total_due: Money,
    /// Balance left after this installment, presented in whole units.
    pub remaining_balance: Money,
}

/// Compute the ordered installment schedule for a loan.
pub fn compute_schedule(loan: &Loan) -> Vec<Installment> {
    match &loan.terms {
        LoanTerms::Standard {
            installment_count,
            monthly_interest_rate,
        } => standard::declining_balance(
            loan.principal,
            loan.start_date,
            *installment_count,
            *monthly_interest_rate,
        ),
        LoanTerms::Custom {
            payment_mode: PaymentMode::FixedInstallments { installment_count },
            interest,
        } => custom::flat_installments(loan.principal, loan.start_date, *installment_count, interest),
        LoanTerms::Custom {
            payment_mode: PaymentMode::FreeForm,
            ..
        } => Vec::new(),
    }
}

/// Schedule straight from a form payload; empty when the form does not
/// describe a valid loan.
pub fn compute_schedule_from_form(form: &LoanForm) -> Vec<Installment> {
    form.parse()
        .map(|loan| compute_schedule(&loan))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Envelope for CLI / bindings
// ---------------------------------------------------------------------------

/// Either a stored loan document or a raw form payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleInput {
    Loan(Loan),
    Form(LoanForm),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<LoanId>,
    pub installment_count: u32,
    pub installments: Vec<Installment>,
    pub total_principal: Money,
    pub total_interest: Money,
    pub total_due: Money,
}

/// Compute a schedule wrapped with totals, warnings and metadata.
pub fn build_schedule(input: &ScheduleInput) -> ComputationOutput<ScheduleOutput> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let loan = match input {
        ScheduleInput::Loan(loan) => Some(loan.clone()),
        ScheduleInput::Form(form) => match form.parse() {
            Ok(loan) => Some(loan),
            Err(e) => {
                warnings.push(format!("No schedule applicable: {e}"));
                None
            }
        },
    };

    let installments = loan.as_ref().map(compute_schedule).unwrap_or_default();

    let mut methodology = "Installment schedule";
    if let Some(loan) = &loan {
        match &loan.terms {
            LoanTerms::Standard { .. } => methodology = "Declining balance (German system)",
            LoanTerms::Custom {
                payment_mode: PaymentMode::FixedInstallments { .. },
                ..
            } => methodology = "Flat custom installments",
            LoanTerms::Custom {
                payment_mode: PaymentMode::FreeForm,
                ..
            } => {
                methodology = "Free-form repayment";
                warnings.push("Free-form loans have no installment schedule".into());
            }
        }
        match loan.installment_count() {
            Some(0) => warnings.push("Installment count is zero; no schedule applicable".into()),
            Some(_) if installments.is_empty() => {
                warnings.push("Amounts or dates out of range; no schedule computed".into())
            }
            _ => {}
        }
    }

    let total_principal: Money = installments.iter().map(|i| i.principal_portion).sum();
    let total_interest: Money = installments.iter().map(|i| i.interest_portion).sum();

    let output = ScheduleOutput {
        loan_id: loan.as_ref().map(|l| l.id.clone()).filter(|id| !id.is_empty()),
        installment_count: installments.len() as u32,
        total_principal,
        total_interest,
        total_due: total_principal + total_interest,
        installments,
    };

    let assumptions = match &loan {
        Some(loan) => serde_json::json!({
            "principal": loan.principal.to_string(),
            "start_date": loan.start_date,
            "terms": loan.terms,
            "rounding": "half-up to whole units per portion",
        }),
        None => serde_json::Value::Null,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(methodology, &assumptions, warnings, elapsed, output)
}

/// Unrounded principal repaid per period; `None` when there are no periods.
pub(crate) fn per_period_principal(principal: Money, installment_count: u32) -> Option<Money> {
    if installment_count == 0 {
        return None;
    }
    principal.checked_div(Decimal::from(installment_count))
}

/// Whether the schedule's grand total is representable, so that any sum of
/// its amounts is too.
pub(crate) fn fits_total(installments: &[Installment]) -> bool {
    installments
        .iter()
        .try_fold(Decimal::ZERO, |acc, i| acc.checked_add(i.total_due))
        .is_some()
}
