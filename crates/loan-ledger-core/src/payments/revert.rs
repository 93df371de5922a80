use tracing::{info, warn};

use crate::error::LedgerError;
use crate::loan::LoanStatus;
use crate::payment::{Payment, PaymentKind};
use crate::store::DocumentStore;
use crate::LedgerResult;

/// Delete a payment record and return it.
///
/// A loan that reached `Paid` keeps that status after one of its payments is
/// reverted; correcting the status is left to an explicit manual action.
/// Closure records are refused here, they go through `reopen_month`.
pub fn revert_payment<S: DocumentStore>(store: &S, payment_id: &str) -> LedgerResult<Payment> {
    store.transact(|tx| {
        let payment = tx
            .get_payment(payment_id)?
            .ok_or_else(|| LedgerError::not_found("payment", payment_id))?;

        if let PaymentKind::MonthClosure { closure_month } = &payment.kind {
            return Err(LedgerError::validation(
                "payment_id",
                format!("{payment_id} closes month {closure_month}; reopen the month instead"),
            ));
        }

        tx.delete_payment(payment_id)?;

        if let Some(loan_id) = payment.loan_id() {
            let still_paid = tx
                .get_loan(loan_id)?
                .is_some_and(|l| l.status == LoanStatus::Paid);
            if still_paid {
                warn!(
                    loan = loan_id,
                    payment = payment_id,
                    "payment reverted on a paid loan; loan status left as paid"
                );
            }
        }

        info!(payment = payment_id, "payment reverted");
        Ok(payment)
    })
}
