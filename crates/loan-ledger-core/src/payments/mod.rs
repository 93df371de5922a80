//! Payment application.
//!
//! Every operation validates first and then writes inside a single
//! `DocumentStore::transact` unit: the payment counter increment, the payment
//! record and any resulting loan status change either all commit or none do.

pub mod abono;
pub mod installment;
pub mod register;
pub mod revert;

pub use abono::apply_free_form_abono;
pub use installment::{apply_bulk_payments, apply_installment_payment};
pub use register::register_loan;
pub use revert::revert_payment;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::YearMonth;
use crate::closure::ClosureSet;
use crate::error::LedgerError;
use crate::loan::{Loan, LoanStatus};
use crate::payment::Payment;
use crate::store::Transaction;
use crate::types::*;
use crate::LedgerResult;

/// What to do with a payment dated inside a closed month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedMonthPolicy {
    /// Refuse with a conflict.
    #[default]
    Reject,
    /// Accept; used for historical corrections.
    Allow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentPaymentRequest {
    pub loan_id: LoanId,
    pub installment_number: u32,
    /// Defaults to the installment's total due.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
    pub payment_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbonoRequest {
    pub loan_id: LoanId,
    pub amount: Money,
    pub payment_date: NaiveDate,
}

/// One installment picked for a bulk payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSelection {
    pub loan_id: LoanId,
    pub installment_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    /// True when this payment moved the loan to `Paid`.
    pub loan_finalized: bool,
}

/// Load a loan that can still receive payments.
pub(crate) fn payable_loan(tx: &mut dyn Transaction, loan_id: &str) -> LedgerResult<Loan> {
    let loan = tx
        .get_loan(loan_id)?
        .ok_or_else(|| LedgerError::not_found("loan", loan_id))?;
    match loan.status {
        LoanStatus::Approved => Ok(loan),
        LoanStatus::Paid => Err(LedgerError::Conflict(format!(
            "loan {loan_id} is already paid"
        ))),
        LoanStatus::Pending | LoanStatus::Rejected => Err(LedgerError::validation(
            "loan_id",
            format!("loan {loan_id} is not approved"),
        )),
    }
}

pub(crate) fn ensure_month_open(
    tx: &mut dyn Transaction,
    payment_date: NaiveDate,
    policy: ClosedMonthPolicy,
) -> LedgerResult<()> {
    let month = YearMonth::of(payment_date);
    let closures = ClosureSet::from_payments(&tx.closure_records()?);
    if !closures.is_closed(month) {
        return Ok(());
    }
    match policy {
        ClosedMonthPolicy::Reject => Err(LedgerError::Conflict(format!(
            "month {month} is closed; payments dated in it are not accepted"
        ))),
        ClosedMonthPolicy::Allow => {
            debug!(%month, "recording payment into closed month");
            Ok(())
        }
    }
}
