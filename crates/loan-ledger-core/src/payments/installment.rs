use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

use super::{
    ensure_month_open, payable_loan, BulkSelection, ClosedMonthPolicy,
    InstallmentPaymentRequest, PaymentReceipt,
};
use crate::error::LedgerError;
use crate::loan::LoanStatus;
use crate::payment::{payment_id, Payment, PaymentKind};
use crate::schedule::compute_schedule;
use crate::store::{next_sequence, DocumentStore, Transaction, PAYMENT_COUNTER};
use crate::LedgerResult;

/// Record the payment of one installment. Moves the loan to `Paid` when this
/// was its last unpaid installment.
pub fn apply_installment_payment<S: DocumentStore>(
    store: &S,
    request: &InstallmentPaymentRequest,
    policy: ClosedMonthPolicy,
) -> LedgerResult<PaymentReceipt> {
    store.transact(|tx| record_installment_payment(tx, request, policy))
}

/// Pay several installments, possibly across loans, as one unit. If any
/// selection fails, nothing is recorded.
pub fn apply_bulk_payments<S: DocumentStore>(
    store: &S,
    selections: &[BulkSelection],
    payment_date: NaiveDate,
    policy: ClosedMonthPolicy,
) -> LedgerResult<Vec<PaymentReceipt>> {
    if selections.is_empty() {
        return Err(LedgerError::validation(
            "selections",
            "At least one installment must be selected",
        ));
    }

    let receipts = store.transact(|tx| {
        let mut receipts = Vec::with_capacity(selections.len());
        for s in selections {
            let request = InstallmentPaymentRequest {
                loan_id: s.loan_id.clone(),
                installment_number: s.installment_number,
                amount: s.amount,
                payment_date,
            };
            receipts.push(record_installment_payment(tx, &request, policy)?);
        }
        Ok(receipts)
    })?;

    info!(count = receipts.len(), "bulk payment committed");
    Ok(receipts)
}

pub(crate) fn record_installment_payment(
    tx: &mut dyn Transaction,
    request: &InstallmentPaymentRequest,
    policy: ClosedMonthPolicy,
) -> LedgerResult<PaymentReceipt> {
    if let Some(amount) = request.amount {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::validation("amount", "Amount must be positive"));
        }
    }

    let loan = payable_loan(tx, &request.loan_id)?;
    if loan.is_free_form() {
        return Err(LedgerError::validation(
            "installment_number",
            format!("loan {} is free-form; record an abono instead", loan.id),
        ));
    }

    let schedule = compute_schedule(&loan);
    let total_installments = schedule.len();
    let installment = schedule
        .into_iter()
        .find(|i| i.installment_number == request.installment_number)
        .ok_or_else(|| {
            LedgerError::not_found(
                "installment",
                format!("{}#{}", loan.id, request.installment_number),
            )
        })?;

    ensure_month_open(tx, request.payment_date, policy)?;

    let existing = tx.payments_for_loan(&loan.id)?;
    if existing
        .iter()
        .any(|p| p.settles(&loan.id) == Some(request.installment_number))
    {
        return Err(LedgerError::Conflict(format!(
            "installment {} of loan {} is already paid",
            request.installment_number, loan.id
        )));
    }
    let paid_count = existing.iter().filter(|p| p.settles(&loan.id).is_some()).count() + 1;

    let number = next_sequence(tx, PAYMENT_COUNTER)?;
    let payment = Payment {
        id: payment_id(number),
        payment_number: number,
        payment_date: request.payment_date,
        kind: PaymentKind::InstallmentPayment {
            loan_id: loan.id.clone(),
            installment_number: request.installment_number,
            amount: request.amount.unwrap_or(installment.total_due),
        },
    };
    tx.set_payment(payment.clone())?;

    let loan_finalized = paid_count >= total_installments;
    if loan_finalized {
        tx.update_loan_status(&loan.id, LoanStatus::Paid)?;
    }

    info!(
        loan = %loan.id,
        installment = request.installment_number,
        payment = %payment.id,
        loan_finalized,
        "installment payment recorded"
    );

    Ok(PaymentReceipt {
        payment,
        loan_finalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::close_month;
    use crate::loan::{Loan, LoanTerms};
    use crate::store::InMemoryStore;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn store_with_loan(count: u32) -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .transact(|tx| {
                tx.set_loan(Loan {
                    id: "L-1".into(),
                    loan_number: 1,
                    partner_id: "P-1".into(),
                    principal: dec!(1200),
                    start_date: d(2024, 1, 1),
                    terms: LoanTerms::Standard {
                        installment_count: count,
                        monthly_interest_rate: dec!(5),
                    },
                    status: LoanStatus::Approved,
                })
            })
            .unwrap();
        store
    }

    fn request(n: u32) -> InstallmentPaymentRequest {
        InstallmentPaymentRequest {
            loan_id: "L-1".into(),
            installment_number: n,
            amount: None,
            payment_date: d(2024, 2, 1),
        }
    }

    #[test]
    fn test_amount_defaults_to_total_due() {
        let store = store_with_loan(12);
        let receipt = apply_installment_payment(&store, &request(1), ClosedMonthPolicy::Reject).unwrap();
        assert_eq!(receipt.payment.amount(), Some(dec!(160)));
        assert_eq!(receipt.payment.payment_number, 1);
        assert!(!receipt.loan_finalized);
    }

    #[test]
    fn test_double_payment_is_conflict() {
        let store = store_with_loan(12);
        apply_installment_payment(&store, &request(3), ClosedMonthPolicy::Reject).unwrap();
        let err = apply_installment_payment(&store, &request(3), ClosedMonthPolicy::Reject).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert_eq!(store.payments().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_installment_is_not_found() {
        let store = store_with_loan(12);
        for n in [0, 13] {
            let err = apply_installment_payment(&store, &request(n), ClosedMonthPolicy::Reject).unwrap_err();
            assert!(matches!(err, LedgerError::NotFound { .. }));
        }
    }

    #[test]
    fn test_non_positive_amount_rejected_before_write() {
        let store = store_with_loan(12);
        let mut req = request(1);
        req.amount = Some(Decimal::ZERO);
        let err = apply_installment_payment(&store, &req, ClosedMonthPolicy::Reject).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
        assert!(store.snapshot().unwrap().counters.is_empty());
    }

    #[test]
    fn test_closed_month_policy() {
        let store = store_with_loan(12);
        close_month(&store, "2024-02".parse().unwrap(), d(2024, 2, 29)).unwrap();

        let err = apply_installment_payment(&store, &request(1), ClosedMonthPolicy::Reject).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        let receipt = apply_installment_payment(&store, &request(1), ClosedMonthPolicy::Allow).unwrap();
        assert_eq!(receipt.payment.payment_number, 2);
    }

    #[test]
    fn test_bulk_is_all_or_nothing() {
        let store = store_with_loan(12);
        apply_installment_payment(&store, &request(2), ClosedMonthPolicy::Reject).unwrap();

        let selections: Vec<BulkSelection> = [1, 2, 3]
            .into_iter()
            .map(|n| BulkSelection {
                loan_id: "L-1".into(),
                installment_number: n,
                amount: None,
            })
            .collect();
        let err = apply_bulk_payments(&store, &selections, d(2024, 3, 1), ClosedMonthPolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        let snap = store.snapshot().unwrap();
        assert_eq!(snap.payments.len(), 1);
        assert_eq!(snap.counters.get(PAYMENT_COUNTER), Some(&1));
    }

    #[test]
    fn test_bulk_finalizes_loan() {
        let store = store_with_loan(3);
        let selections: Vec<BulkSelection> = (1..=3)
            .map(|n| BulkSelection {
                loan_id: "L-1".into(),
                installment_number: n,
                amount: None,
            })
            .collect();
        let receipts =
            apply_bulk_payments(&store, &selections, d(2024, 4, 1), ClosedMonthPolicy::Reject).unwrap();
        assert_eq!(receipts.len(), 3);
        assert!(!receipts[1].loan_finalized);
        assert!(receipts[2].loan_finalized);
        assert_eq!(store.loan("L-1").unwrap().unwrap().status, LoanStatus::Paid);
    }

    #[test]
    fn test_empty_bulk_is_validation_error() {
        let store = store_with_loan(3);
        let err = apply_bulk_payments(&store, &[], d(2024, 4, 1), ClosedMonthPolicy::Reject).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }
}
