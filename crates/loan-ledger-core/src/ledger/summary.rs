//! Month-end report data.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use crate::calendar::YearMonth;
use crate::closure::{ClosureSet, MonthState};
use crate::loan::Loan;
use crate::payment::{Payment, PaymentKind};
use crate::schedule::compute_schedule;
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: YearMonth,
    pub state: MonthState,
    /// Installments of active loans falling due in the month.
    pub due_count: u32,
    pub due_total: Money,
    pub paid_due_count: u32,
    pub unpaid_due_count: u32,
    pub unpaid_due_total: Money,
    /// Installment payments dated in the month, whatever their due month.
    pub collected_installments: Money,
    /// Abonos dated in the month.
    pub collected_abonos: Money,
    pub total_collected: Money,
    pub payment_count: u32,
}

pub fn monthly_summary(
    month: YearMonth,
    loans: &[Loan],
    payments: &[Payment],
    closures: &ClosureSet,
) -> MonthlySummary {
    let settled: HashSet<(&str, u32)> = payments
        .iter()
        .filter_map(|p| match &p.kind {
            PaymentKind::InstallmentPayment {
                loan_id,
                installment_number,
                ..
            } => Some((loan_id.as_str(), *installment_number)),
            _ => None,
        })
        .collect();

    let mut due_count = 0u32;
    let mut due_total = Decimal::ZERO;
    let mut paid_due_count = 0u32;
    let mut unpaid_due_total = Decimal::ZERO;

    for loan in loans.iter().filter(|l| l.is_active()) {
        for inst in compute_schedule(loan)
            .into_iter()
            .filter(|i| month.contains(i.due_date))
        {
            due_count += 1;
            due_total += inst.total_due;
            if settled.contains(&(loan.id.as_str(), inst.installment_number)) {
                paid_due_count += 1;
            } else {
                unpaid_due_total += inst.total_due;
            }
        }
    }

    let mut collected_installments = Decimal::ZERO;
    let mut collected_abonos = Decimal::ZERO;
    let mut payment_count = 0u32;
    for p in payments.iter().filter(|p| month.contains(p.payment_date)) {
        match &p.kind {
            PaymentKind::InstallmentPayment { amount, .. } => {
                collected_installments += *amount;
                payment_count += 1;
            }
            PaymentKind::FreeFormAbono { amount, .. } => {
                collected_abonos += *amount;
                payment_count += 1;
            }
            PaymentKind::MonthClosure { .. } => {}
        }
    }

    MonthlySummary {
        month,
        state: closures.state(month),
        due_count,
        due_total,
        paid_due_count,
        unpaid_due_count: due_count - paid_due_count,
        unpaid_due_total,
        collected_installments,
        collected_abonos,
        total_collected: collected_installments + collected_abonos,
        payment_count,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummaryInput {
    pub month: YearMonth,
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

pub fn build_monthly_summary(input: &MonthlySummaryInput) -> ComputationOutput<MonthlySummary> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let closures = ClosureSet::from_payments(&input.payments);
    let summary = monthly_summary(input.month, &input.loans, &input.payments, &closures);

    if summary.state == MonthState::Closed && summary.unpaid_due_count > 0 {
        warnings.push(format!(
            "{} installment(s) due in closed month {} remain unpaid",
            summary.unpaid_due_count, input.month
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Month-end summary",
        &serde_json::json!({
            "month": input.month,
            "loans": input.loans.len(),
            "payments": input.payments.len(),
        }),
        warnings,
        elapsed,
        summary,
    )
}
