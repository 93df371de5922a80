use rust_decimal::Decimal;
use tracing::info;

use super::{ensure_month_open, payable_loan, AbonoRequest, ClosedMonthPolicy, PaymentReceipt};
use crate::error::LedgerError;
use crate::ledger::free_form_outstanding;
use crate::loan::LoanStatus;
use crate::money::settle_dust;
use crate::payment::{payment_id, Payment, PaymentKind};
use crate::store::{next_sequence, DocumentStore, PAYMENT_COUNTER};
use crate::LedgerResult;

/// Record a partial payment against a free-form loan. The amount is checked
/// against the unrounded outstanding principal; once what is left settles to
/// zero in whole units the loan moves to `Paid`.
pub fn apply_free_form_abono<S: DocumentStore>(
    store: &S,
    request: &AbonoRequest,
    policy: ClosedMonthPolicy,
) -> LedgerResult<PaymentReceipt> {
    if request.amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount", "Amount must be positive"));
    }

    store.transact(|tx| {
        let loan = payable_loan(tx, &request.loan_id)?;
        if !loan.is_free_form() {
            return Err(LedgerError::validation(
                "loan_id",
                format!("loan {} has a fixed schedule; pay installments instead", loan.id),
            ));
        }
        ensure_month_open(tx, request.payment_date, policy)?;

        let remaining = free_form_outstanding(&loan, &tx.payments_for_loan(&loan.id)?);
        if request.amount > remaining {
            return Err(LedgerError::validation(
                "amount",
                format!(
                    "Amount {} exceeds the remaining balance {}",
                    request.amount, remaining
                ),
            ));
        }

        let number = next_sequence(tx, PAYMENT_COUNTER)?;
        let payment = Payment {
            id: payment_id(number),
            payment_number: number,
            payment_date: request.payment_date,
            kind: PaymentKind::FreeFormAbono {
                loan_id: loan.id.clone(),
                amount: request.amount,
            },
        };
        tx.set_payment(payment.clone())?;

        let left = remaining - request.amount;
        let loan_finalized = settle_dust(left) == Decimal::ZERO;
        if loan_finalized {
            tx.update_loan_status(&loan.id, LoanStatus::Paid)?;
        }

        info!(
            loan = %loan.id,
            amount = %request.amount,
            remaining = %left,
            payment = %payment.id,
            loan_finalized,
            "abono recorded"
        );

        Ok(PaymentReceipt {
            payment,
            loan_finalized,
        })
    })
}
