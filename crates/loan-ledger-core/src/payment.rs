//! Recorded payments. Month closures are stored alongside payments and share
//! the payment sequence, so they are modelled as a payment kind.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::YearMonth;
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentKind {
    /// Settles one scheduled installment. At most one per
    /// (loan_id, installment_number).
    InstallmentPayment {
        loan_id: LoanId,
        installment_number: u32,
        amount: Money,
    },
    /// Partial payment against a free-form loan.
    FreeFormAbono { loan_id: LoanId, amount: Money },
    MonthClosure { closure_month: YearMonth },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub payment_number: u64,
    pub payment_date: NaiveDate,
    #[serde(flatten)]
    pub kind: PaymentKind,
}

impl Payment {
    pub fn loan_id(&self) -> Option<&str> {
        match &self.kind {
            PaymentKind::InstallmentPayment { loan_id, .. }
            | PaymentKind::FreeFormAbono { loan_id, .. } => Some(loan_id),
            PaymentKind::MonthClosure { .. } => None,
        }
    }

    pub fn amount(&self) -> Option<Money> {
        match &self.kind {
            PaymentKind::InstallmentPayment { amount, .. }
            | PaymentKind::FreeFormAbono { amount, .. } => Some(*amount),
            PaymentKind::MonthClosure { .. } => None,
        }
    }

    pub fn closure_month(&self) -> Option<YearMonth> {
        match &self.kind {
            PaymentKind::MonthClosure { closure_month } => Some(*closure_month),
            _ => None,
        }
    }

    /// `Some(n)` when this payment settles installment `n` of `loan_id`.
    pub fn settles(&self, loan_id: &str) -> Option<u32> {
        match &self.kind {
            PaymentKind::InstallmentPayment {
                loan_id: id,
                installment_number,
                ..
            } if id == loan_id => Some(*installment_number),
            _ => None,
        }
    }

    pub fn is_abono_for(&self, loan_id: &str) -> bool {
        matches!(&self.kind, PaymentKind::FreeFormAbono { loan_id: id, .. } if id == loan_id)
    }
}

/// Stable document id derived from the payment number.
pub fn payment_id(payment_number: u64) -> PaymentId {
    format!("PAY-{payment_number:08}")
}
