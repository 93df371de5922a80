//! Partner-level debt aggregation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::reconcile_loan;
use crate::closure::ClosureSet;
use crate::loan::Loan;
use crate::payment::Payment;
use crate::types::*;

/// One loan's contribution to a partner's debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDebt {
    pub loan_id: LoanId,
    pub loan_number: u64,
    pub overdue: Money,
    pub future: Money,
    pub overdue_installments: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerDebt {
    pub partner_id: PartnerId,
    pub reference_date: NaiveDate,
    /// Σ total_due over Overdue installments of every loan.
    pub total_overdue: Money,
    /// Σ total_due over Pending installments plus free-form balances.
    pub total_future: Money,
    pub total_debt: Money,
    pub loans: Vec<LoanDebt>,
}

/// Aggregate overdue and future debt over a partner's loans.
///
/// Only Approved and Paid loans contribute; Pending and Rejected loans never
/// disbursed anything. Loans of other partners in `loans` are skipped.
pub fn aggregate_partner_debt(
    partner_id: &str,
    loans: &[Loan],
    payments: &[Payment],
    closures: &ClosureSet,
    reference_date: NaiveDate,
) -> PartnerDebt {
    let mut total_overdue = Decimal::ZERO;
    let mut total_future = Decimal::ZERO;
    let mut per_loan = Vec::new();

    for loan in loans
        .iter()
        .filter(|l| l.partner_id == partner_id && l.is_active())
    {
        let ledger = reconcile_loan(loan, payments, closures, reference_date);
        total_overdue += ledger.total_overdue;
        total_future += ledger.total_future;
        per_loan.push(LoanDebt {
            loan_id: ledger.loan_id,
            loan_number: ledger.loan_number,
            overdue: ledger.total_overdue,
            future: ledger.total_future,
            overdue_installments: ledger.overdue_count,
        });
    }

    PartnerDebt {
        partner_id: partner_id.to_string(),
        reference_date,
        total_overdue,
        total_future,
        total_debt: total_overdue + total_future,
        loans: per_loan,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerDebtInput {
    pub partner_id: PartnerId,
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub closures: ClosureSet,
    pub reference_date: NaiveDate,
}

pub fn analyze_partner_debt(input: &PartnerDebtInput) -> ComputationOutput<PartnerDebt> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let closures = ClosureSet::from_months(
        input
            .closures
            .months()
            .copied()
            .chain(input.payments.iter().filter_map(Payment::closure_month)),
    );

    let skipped = input
        .loans
        .iter()
        .filter(|l| l.partner_id == input.partner_id && !l.is_active())
        .count();
    if skipped > 0 {
        warnings.push(format!(
            "{skipped} pending or rejected loan(s) excluded from debt totals"
        ));
    }

    let debt = aggregate_partner_debt(
        &input.partner_id,
        &input.loans,
        &input.payments,
        &closures,
        input.reference_date,
    );
    if debt.loans.is_empty() {
        warnings.push(format!("Partner {} has no active loans", input.partner_id));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Partner debt aggregation",
        &serde_json::json!({
            "partner_id": input.partner_id,
            "reference_date": input.reference_date,
            "closed_months": closures,
            "free_form_debt": "always future until fully paid",
        }),
        warnings,
        elapsed,
        debt,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::{CustomInterest, LoanStatus, LoanTerms, PaymentMode};
    use crate::payment::{payment_id, PaymentKind};
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn loans() -> Vec<Loan> {
        vec![
            Loan {
                id: "L-1".into(),
                loan_number: 1,
                partner_id: "P-1".into(),
                principal: dec!(1000),
                start_date: d(2024, 1, 1),
                terms: LoanTerms::Custom {
                    payment_mode: PaymentMode::FixedInstallments {
                        installment_count: 4,
                    },
                    interest: CustomInterest::Percentage(dec!(10)),
                },
                status: LoanStatus::Approved,
            },
            Loan {
                id: "L-2".into(),
                loan_number: 2,
                partner_id: "P-1".into(),
                principal: dec!(500),
                start_date: d(2024, 1, 1),
                terms: LoanTerms::Custom {
                    payment_mode: PaymentMode::FreeForm,
                    interest: CustomInterest::None,
                },
                status: LoanStatus::Approved,
            },
            Loan {
                id: "L-3".into(),
                loan_number: 3,
                partner_id: "P-1".into(),
                principal: dec!(9999),
                start_date: d(2024, 1, 1),
                terms: LoanTerms::Standard {
                    installment_count: 3,
                    monthly_interest_rate: dec!(1),
                },
                status: LoanStatus::Rejected,
            },
        ]
    }

    #[test]
    fn test_partner_totals() {
        let payments = vec![
            Payment {
                id: payment_id(1),
                payment_number: 1,
                payment_date: d(2024, 2, 1),
                kind: PaymentKind::InstallmentPayment {
                    loan_id: "L-1".into(),
                    installment_number: 1,
                    amount: dec!(275),
                },
            },
            Payment {
                id: payment_id(2),
                payment_number: 2,
                payment_date: d(2024, 2, 5),
                kind: PaymentKind::FreeFormAbono {
                    loan_id: "L-2".into(),
                    amount: dec!(120),
                },
            },
        ];
        // L-1 installments due Feb 1, Mar 1, Apr 1, May 1; #1 paid
        let debt = aggregate_partner_debt("P-1", &loans(), &payments, &ClosureSet::new(), d(2024, 3, 10));

        assert_eq!(debt.loans.len(), 2);
        assert_eq!(debt.total_overdue, dec!(275));
        // two pending installments (550) + free-form balance 380
        assert_eq!(debt.total_future, dec!(930));
        assert_eq!(debt.total_debt, dec!(1205));
    }

    #[test]
    fn test_free_form_never_overdue() {
        let debt = aggregate_partner_debt("P-1", &loans()[1..2], &[], &ClosureSet::new(), d(2099, 1, 1));
        assert_eq!(debt.total_overdue, Decimal::ZERO);
        assert_eq!(debt.total_future, dec!(500));
    }

    #[test]
    fn test_analyze_warns_on_excluded_loans() {
        let input = PartnerDebtInput {
            partner_id: "P-1".into(),
            loans: loans(),
            payments: vec![],
            closures: ClosureSet::new(),
            reference_date: d(2024, 1, 15),
        };
        let out = analyze_partner_debt(&input);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.result.total_overdue, Decimal::ZERO);
        assert_eq!(out.result.total_future, dec!(1600));
    }
}
