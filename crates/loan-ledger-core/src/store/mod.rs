//! Persistence seam.
//!
//! The core never talks to a database. It reads through [`DocumentStore`]
//! and performs every write inside [`DocumentStore::transact`], calling the
//! [`Transaction`] capability it is handed. An implementation must make the
//! closure's writes atomic and serializable with respect to other
//! transactions: either every write lands or none does.

pub mod memory;

pub use memory::{InMemoryStore, LedgerSnapshot};

use crate::loan::{Loan, LoanStatus};
use crate::payment::Payment;
use crate::LedgerResult;

/// Counter backing `Payment::payment_number` (closures included).
pub const PAYMENT_COUNTER: &str = "payments";
/// Counter backing `Loan::loan_number`.
pub const LOAN_COUNTER: &str = "loans";

/// Reads and writes available inside one atomic unit.
pub trait Transaction {
    fn get_loan(&mut self, loan_id: &str) -> LedgerResult<Option<Loan>>;
    fn set_loan(&mut self, loan: Loan) -> LedgerResult<()>;
    fn update_loan_status(&mut self, loan_id: &str, status: LoanStatus) -> LedgerResult<()>;

    fn get_payment(&mut self, payment_id: &str) -> LedgerResult<Option<Payment>>;
    /// Installment payments and abonos of one loan, by payment number.
    fn payments_for_loan(&mut self, loan_id: &str) -> LedgerResult<Vec<Payment>>;
    /// Month-closure records, by payment number.
    fn closure_records(&mut self) -> LedgerResult<Vec<Payment>>;
    fn set_payment(&mut self, payment: Payment) -> LedgerResult<()>;
    fn delete_payment(&mut self, payment_id: &str) -> LedgerResult<()>;

    /// Current value of a named counter; 0 if it was never written.
    fn get_counter(&mut self, name: &str) -> LedgerResult<u64>;
    fn set_counter(&mut self, name: &str, value: u64) -> LedgerResult<()>;
}

/// A transactional document store holding loans, payments and counters.
pub trait DocumentStore {
    /// Run `f` as one atomic unit. If `f` returns an error nothing it wrote
    /// is kept.
    fn transact<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut dyn Transaction) -> LedgerResult<T>;

    fn loan(&self, loan_id: &str) -> LedgerResult<Option<Loan>>;
    fn loans(&self) -> LedgerResult<Vec<Loan>>;
    fn loans_for_partner(&self, partner_id: &str) -> LedgerResult<Vec<Loan>>;
    fn payments_for_loan(&self, loan_id: &str) -> LedgerResult<Vec<Payment>>;
    /// Every payment record, closures included, by payment number.
    fn payments(&self) -> LedgerResult<Vec<Payment>>;
}

/// Read-and-increment a counter inside a transaction.
pub fn next_sequence(tx: &mut dyn Transaction, counter: &str) -> LedgerResult<u64> {
    let next = tx.get_counter(counter)? + 1;
    tx.set_counter(counter, next)?;
    Ok(next)
}
