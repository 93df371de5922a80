//! Ledger reconciliation.
//!
//! Folds recorded payments and month closures over a loan's schedule to
//! classify each installment and total the debt. Everything here is a pure
//! function of its inputs; "today" only enters through `reference_date`.

pub mod aggregate;
pub mod summary;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use crate::closure::ClosureSet;
use crate::loan::{Loan, LoanStatus};
use crate::money::{non_negative, round_half_up};
use crate::payment::Payment;
use crate::schedule::{compute_schedule, Installment};
use crate::types::*;

pub use aggregate::{aggregate_partner_debt, analyze_partner_debt, LoanDebt, PartnerDebt, PartnerDebtInput};
pub use summary::{build_monthly_summary, monthly_summary, MonthlySummary, MonthlySummaryInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Paid,
    Overdue,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledInstallment {
    #[serde(flatten)]
    pub installment: Installment,
    pub status: InstallmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_on: Option<NaiveDate>,
}

/// A loan's schedule annotated with status, plus its debt totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanLedger {
    pub loan_id: LoanId,
    pub loan_number: u64,
    pub partner_id: PartnerId,
    pub loan_status: LoanStatus,
    pub reference_date: NaiveDate,
    pub installments: Vec<ReconciledInstallment>,
    pub paid_count: u32,
    pub overdue_count: u32,
    pub pending_count: u32,
    /// Sum of installment payments and abonos recorded for this loan.
    pub total_collected: Money,
    /// Σ total_due of Overdue installments.
    pub total_overdue: Money,
    /// Σ total_due of Pending installments, or the free-form balance.
    pub total_future: Money,
    pub outstanding_balance: Money,
    /// Unpaid principal of a free-form loan; `None` for scheduled loans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_form_balance: Option<Money>,
}

/// Unrounded principal still owed on a free-form loan: principal less every
/// abono, clamped at zero.
pub fn free_form_outstanding(loan: &Loan, payments: &[Payment]) -> Money {
    let abonos: Money = payments
        .iter()
        .filter(|p| p.is_abono_for(&loan.id))
        .filter_map(Payment::amount)
        .sum();
    non_negative(loan.principal - abonos)
}

/// Presented balance of a free-form loan, rounded to whole units.
pub fn free_form_balance(loan: &Loan, payments: &[Payment]) -> Money {
    round_half_up(free_form_outstanding(loan, payments))
}

/// Status of one unpaid installment.
pub fn classify_unpaid(
    due_date: NaiveDate,
    closures: &ClosureSet,
    reference_date: NaiveDate,
) -> InstallmentStatus {
    if due_date <= reference_date || closures.covers(due_date) {
        InstallmentStatus::Overdue
    } else {
        InstallmentStatus::Pending
    }
}

/// Annotate `schedule` (the loan's computed installments) with status and
/// total the loan's debt. `payments` may contain records of other loans;
/// they are ignored.
pub fn reconcile(
    loan: &Loan,
    schedule: &[Installment],
    payments: &[Payment],
    closures: &ClosureSet,
    reference_date: NaiveDate,
) -> LoanLedger {
    let settled: HashMap<u32, &Payment> = payments
        .iter()
        .filter_map(|p| p.settles(&loan.id).map(|n| (n, p)))
        .collect();

    let installments: Vec<ReconciledInstallment> = schedule
        .iter()
        .map(|inst| match settled.get(&inst.installment_number) {
            Some(p) => ReconciledInstallment {
                installment: inst.clone(),
                status: InstallmentStatus::Paid,
                payment_id: Some(p.id.clone()),
                paid_on: Some(p.payment_date),
            },
            None => ReconciledInstallment {
                installment: inst.clone(),
                status: classify_unpaid(inst.due_date, closures, reference_date),
                payment_id: None,
                paid_on: None,
            },
        })
        .collect();

    let count = |status: InstallmentStatus| {
        installments.iter().filter(|i| i.status == status).count() as u32
    };
    let total = |status: InstallmentStatus| -> Money {
        installments
            .iter()
            .filter(|i| i.status == status)
            .map(|i| i.installment.total_due)
            .sum()
    };

    let free_form = loan.is_free_form().then(|| free_form_balance(loan, payments));
    let total_overdue = total(InstallmentStatus::Overdue);
    let total_future = total(InstallmentStatus::Pending) + free_form.unwrap_or(Decimal::ZERO);

    let total_collected: Money = payments
        .iter()
        .filter(|p| p.loan_id() == Some(loan.id.as_str()))
        .filter_map(Payment::amount)
        .sum();

    LoanLedger {
        loan_id: loan.id.clone(),
        loan_number: loan.loan_number,
        partner_id: loan.partner_id.clone(),
        loan_status: loan.status,
        reference_date,
        paid_count: count(InstallmentStatus::Paid),
        overdue_count: count(InstallmentStatus::Overdue),
        pending_count: count(InstallmentStatus::Pending),
        installments,
        total_collected,
        total_overdue,
        total_future,
        outstanding_balance: total_overdue + total_future,
        free_form_balance: free_form,
    }
}

/// Compute the schedule and reconcile it in one step.
pub fn reconcile_loan(
    loan: &Loan,
    payments: &[Payment],
    closures: &ClosureSet,
    reference_date: NaiveDate,
) -> LoanLedger {
    reconcile(loan, &compute_schedule(loan), payments, closures, reference_date)
}

// ---------------------------------------------------------------------------
// Envelope for CLI / bindings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerInput {
    pub loan: Loan,
    #[serde(default)]
    pub payments: Vec<Payment>,
    /// Closed months in addition to any closure records in `payments`.
    #[serde(default)]
    pub closures: ClosureSet,
    pub reference_date: NaiveDate,
}

pub fn build_ledger(input: &LedgerInput) -> ComputationOutput<LoanLedger> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let closures = ClosureSet::from_months(
        input
            .closures
            .months()
            .copied()
            .chain(input.payments.iter().filter_map(Payment::closure_month)),
    );

    let foreign = input
        .payments
        .iter()
        .filter(|p| p.loan_id().is_some_and(|id| id != input.loan.id))
        .count();
    if foreign > 0 {
        warnings.push(format!(
            "{foreign} payment(s) belong to other loans and were ignored"
        ));
    }
    if input.loan.status == LoanStatus::Paid {
        let settled = input
            .payments
            .iter()
            .filter(|p| p.settles(&input.loan.id).is_some())
            .count();
        if compute_schedule(&input.loan).len() > settled {
            warnings.push("Loan is marked Paid but has unpaid installments".into());
        }
    }

    let ledger = reconcile_loan(&input.loan, &input.payments, &closures, input.reference_date);

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Ledger reconciliation",
        &serde_json::json!({
            "loan_id": input.loan.id,
            "reference_date": input.reference_date,
            "closed_months": closures,
            "overdue_rule": "unpaid and due on/before reference date or within a closed month",
        }),
        warnings,
        elapsed,
        ledger,
    )
}
