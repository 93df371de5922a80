use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use loan_ledger_core::closure::{close_month, ClosureSet};
use loan_ledger_core::ledger::{reconcile_loan, InstallmentStatus};
use loan_ledger_core::loan::{LoanForm, LoanKind, LoanStatus, PaymentModeKind};
use loan_ledger_core::payments::{
    apply_free_form_abono, apply_installment_payment, register_loan, revert_payment, AbonoRequest,
    ClosedMonthPolicy, InstallmentPaymentRequest,
};
use loan_ledger_core::store::{DocumentStore, InMemoryStore, PAYMENT_COUNTER};
use loan_ledger_core::LedgerError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn standard_form(partner: &str) -> LoanForm {
    LoanForm {
        partner_id: Some(partner.into()),
        principal: Some(json!(1200)),
        start_date: Some(d(2024, 1, 1)),
        kind: Some(LoanKind::Standard),
        installment_count: Some(json!(12)),
        monthly_interest_rate: Some(json!(5)),
        ..Default::default()
    }
}

fn free_form(partner: &str) -> LoanForm {
    LoanForm {
        partner_id: Some(partner.into()),
        principal: Some(json!("500")),
        start_date: Some(d(2024, 1, 1)),
        kind: Some(LoanKind::Custom),
        payment_mode: Some(PaymentModeKind::FreeForm),
        ..Default::default()
    }
}

fn pay(loan_id: &str, n: u32) -> InstallmentPaymentRequest {
    InstallmentPaymentRequest {
        loan_id: loan_id.into(),
        installment_number: n,
        amount: None,
        payment_date: d(2024, 2, 1),
    }
}

// ===========================================================================
// Free-form abonos
// ===========================================================================

#[test]
fn test_abonos_settle_free_form_loan() {
    let store = InMemoryStore::new();
    let loan = register_loan(&store, &free_form("P-1")).unwrap();
    let abono = |amount: Decimal| AbonoRequest {
        loan_id: loan.id.clone(),
        amount,
        payment_date: d(2024, 3, 1),
    };

    let first = apply_free_form_abono(&store, &abono(dec!(200)), ClosedMonthPolicy::Reject).unwrap();
    assert!(!first.loan_finalized);
    assert_eq!(store.loan(&loan.id).unwrap().unwrap().status, LoanStatus::Approved);

    let second = apply_free_form_abono(&store, &abono(dec!(300)), ClosedMonthPolicy::Reject).unwrap();
    assert!(second.loan_finalized);
    assert_eq!(second.payment.payment_number, 2);

    let stored = store.loan(&loan.id).unwrap().unwrap();
    assert_eq!(stored.status, LoanStatus::Paid);
    let ledger = reconcile_loan(&stored, &store.payments().unwrap(), &ClosureSet::new(), d(2024, 3, 1));
    assert_eq!(ledger.free_form_balance, Some(Decimal::ZERO));
    assert_eq!(ledger.total_collected, dec!(500));
}

#[test]
fn test_fractional_abonos_pay_off_loan() {
    let store = InMemoryStore::new();
    let loan = register_loan(&store, &free_form("P-1")).unwrap();
    let abono = |amount: Decimal| AbonoRequest {
        loan_id: loan.id.clone(),
        amount,
        payment_date: d(2024, 3, 1),
    };

    apply_free_form_abono(&store, &abono(dec!(250.5)), ClosedMonthPolicy::Reject).unwrap();
    let last = apply_free_form_abono(&store, &abono(dec!(249.5)), ClosedMonthPolicy::Reject).unwrap();
    assert!(last.loan_finalized);

    let stored = store.loan(&loan.id).unwrap().unwrap();
    assert_eq!(stored.status, LoanStatus::Paid);
    let ledger = reconcile_loan(&stored, &store.payments().unwrap(), &ClosureSet::new(), d(2024, 3, 1));
    assert_eq!(ledger.free_form_balance, Some(Decimal::ZERO));
    assert_eq!(ledger.total_collected, dec!(500));
}

#[test]
fn test_abono_rejected_on_scheduled_loan() {
    let store = InMemoryStore::new();
    let loan = register_loan(&store, &standard_form("P-1")).unwrap();
    let err = apply_free_form_abono(
        &store,
        &AbonoRequest {
            loan_id: loan.id,
            amount: dec!(10),
            payment_date: d(2024, 2, 1),
        },
        ClosedMonthPolicy::Reject,
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation { .. }));
}

// ===========================================================================
// Installment payments
// ===========================================================================

#[test]
fn test_final_installment_marks_loan_paid() {
    let store = InMemoryStore::new();
    let loan = register_loan(&store, &standard_form("P-1")).unwrap();

    for n in 1..=11 {
        let receipt = apply_installment_payment(&store, &pay(&loan.id, n), ClosedMonthPolicy::Reject).unwrap();
        assert!(!receipt.loan_finalized);
    }
    assert_eq!(store.loan(&loan.id).unwrap().unwrap().status, LoanStatus::Approved);

    let last = apply_installment_payment(&store, &pay(&loan.id, 12), ClosedMonthPolicy::Reject).unwrap();
    assert!(last.loan_finalized);

    let snap = store.snapshot().unwrap();
    assert_eq!(snap.payments.len(), 12);
    assert_eq!(snap.loans[&loan.id].status, LoanStatus::Paid);
    assert_eq!(snap.counters.get(PAYMENT_COUNTER), Some(&12));

    let ledger = reconcile_loan(&snap.loans[&loan.id], &store.payments().unwrap(), &ClosureSet::new(), d(2030, 1, 1));
    assert!(ledger
        .installments
        .iter()
        .all(|i| i.status == InstallmentStatus::Paid));
    assert_eq!(ledger.outstanding_balance, Decimal::ZERO);
}

#[test]
fn test_concurrent_payments_get_unique_numbers() {
    let store = Arc::new(InMemoryStore::new());
    let loan = register_loan(store.as_ref(), &standard_form("P-1")).unwrap();

    let handles: Vec<_> = (1..=12)
        .map(|n| {
            let store = Arc::clone(&store);
            let loan_id = loan.id.clone();
            thread::spawn(move || {
                apply_installment_payment(store.as_ref(), &pay(&loan_id, n), ClosedMonthPolicy::Reject)
            })
        })
        .collect();

    let receipts: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    let numbers: BTreeSet<u64> = receipts.iter().map(|r| r.payment.payment_number).collect();
    assert_eq!(numbers, (1..=12).collect::<BTreeSet<u64>>());
    assert_eq!(receipts.iter().filter(|r| r.loan_finalized).count(), 1);
    assert_eq!(store.loan(&loan.id).unwrap().unwrap().status, LoanStatus::Paid);
}

#[test]
fn test_payment_into_closed_month() {
    let store = InMemoryStore::new();
    let loan = register_loan(&store, &standard_form("P-1")).unwrap();
    close_month(&store, "2024-02".parse().unwrap(), d(2024, 2, 29)).unwrap();

    let err = apply_installment_payment(&store, &pay(&loan.id, 1), ClosedMonthPolicy::Reject).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
    assert_eq!(store.payments().unwrap().len(), 1);

    let mut march = pay(&loan.id, 1);
    march.payment_date = d(2024, 3, 4);
    let receipt = apply_installment_payment(&store, &march, ClosedMonthPolicy::Reject).unwrap();
    assert_eq!(receipt.payment.payment_number, 2);
}

#[test]
fn test_revert_then_repay() {
    let store = InMemoryStore::new();
    let loan = register_loan(&store, &standard_form("P-1")).unwrap();
    let receipt = apply_installment_payment(&store, &pay(&loan.id, 5), ClosedMonthPolicy::Reject).unwrap();

    revert_payment(&store, &receipt.payment.id).unwrap();
    let again = apply_installment_payment(&store, &pay(&loan.id, 5), ClosedMonthPolicy::Reject).unwrap();

    // numbers are never reused
    assert_eq!(again.payment.payment_number, 2);
    assert_eq!(store.payments_for_loan(&loan.id).unwrap().len(), 1);
}

#[test]
fn test_pending_loan_cannot_be_paid() {
    let store = InMemoryStore::new();
    let loan = register_loan(&store, &standard_form("P-1")).unwrap();
    store
        .transact(|tx| tx.update_loan_status(&loan.id, LoanStatus::Pending))
        .unwrap();
    let err = apply_installment_payment(&store, &pay(&loan.id, 1), ClosedMonthPolicy::Reject).unwrap_err();
    assert!(matches!(err, LedgerError::Validation { .. }));
}
