//! In-memory document store.
//!
//! Transactions are serialized behind the write lock and run against a
//! staged copy of the state, which replaces the live state only when the
//! transaction returns `Ok`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

use super::{DocumentStore, Transaction};
use crate::error::LedgerError;
use crate::loan::{Loan, LoanStatus};
use crate::payment::{Payment, PaymentKind};
use crate::types::*;
use crate::LedgerResult;

/// Full ledger state; also the on-disk format used by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub loans: BTreeMap<LoanId, Loan>,
    #[serde(default)]
    pub payments: BTreeMap<PaymentId, Payment>,
    #[serde(default)]
    pub counters: BTreeMap<String, u64>,
}

impl LedgerSnapshot {
    fn sorted(mut payments: Vec<Payment>) -> Vec<Payment> {
        payments.sort_by_key(|p| p.payment_number);
        payments
    }
}

impl Transaction for LedgerSnapshot {
    fn get_loan(&mut self, loan_id: &str) -> LedgerResult<Option<Loan>> {
        Ok(self.loans.get(loan_id).cloned())
    }

    fn set_loan(&mut self, loan: Loan) -> LedgerResult<()> {
        self.loans.insert(loan.id.clone(), loan);
        Ok(())
    }

    fn update_loan_status(&mut self, loan_id: &str, status: LoanStatus) -> LedgerResult<()> {
        let loan = self
            .loans
            .get_mut(loan_id)
            .ok_or_else(|| LedgerError::not_found("loan", loan_id))?;
        loan.status = status;
        Ok(())
    }

    fn get_payment(&mut self, payment_id: &str) -> LedgerResult<Option<Payment>> {
        Ok(self.payments.get(payment_id).cloned())
    }

    fn payments_for_loan(&mut self, loan_id: &str) -> LedgerResult<Vec<Payment>> {
        Ok(Self::sorted(
            self.payments
                .values()
                .filter(|p| p.loan_id() == Some(loan_id))
                .cloned()
                .collect(),
        ))
    }

    fn closure_records(&mut self) -> LedgerResult<Vec<Payment>> {
        Ok(Self::sorted(
            self.payments
                .values()
                .filter(|p| matches!(p.kind, PaymentKind::MonthClosure { .. }))
                .cloned()
                .collect(),
        ))
    }

    fn set_payment(&mut self, payment: Payment) -> LedgerResult<()> {
        self.payments.insert(payment.id.clone(), payment);
        Ok(())
    }

    fn delete_payment(&mut self, payment_id: &str) -> LedgerResult<()> {
        self.payments
            .remove(payment_id)
            .map(|_| ())
            .ok_or_else(|| LedgerError::not_found("payment", payment_id))
    }

    fn get_counter(&mut self, name: &str) -> LedgerResult<u64> {
        Ok(self.counters.get(name).copied().unwrap_or(0))
    }

    fn set_counter(&mut self, name: &str, value: u64) -> LedgerResult<()> {
        self.counters.insert(name.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<LedgerSnapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Copy of the committed state.
    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, LedgerSnapshot>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Storage("ledger state lock poisoned".into()))
    }
}

impl DocumentStore for InMemoryStore {
    fn transact<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut dyn Transaction) -> LedgerResult<T>,
    {
        let mut live = self
            .state
            .write()
            .map_err(|_| LedgerError::Storage("ledger state lock poisoned".into()))?;
        let mut staged = live.clone();
        let tx: &mut dyn Transaction = &mut staged;
        match f(tx) {
            Ok(out) => {
                *live = staged;
                debug!("transaction committed");
                Ok(out)
            }
            Err(e) => {
                debug!(error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }

    fn loan(&self, loan_id: &str) -> LedgerResult<Option<Loan>> {
        Ok(self.read()?.loans.get(loan_id).cloned())
    }

    fn loans(&self) -> LedgerResult<Vec<Loan>> {
        let mut loans: Vec<Loan> = self.read()?.loans.values().cloned().collect();
        loans.sort_by_key(|l| l.loan_number);
        Ok(loans)
    }

    fn loans_for_partner(&self, partner_id: &str) -> LedgerResult<Vec<Loan>> {
        Ok(self
            .loans()?
            .into_iter()
            .filter(|l| l.partner_id == partner_id)
            .collect())
    }

    fn payments_for_loan(&self, loan_id: &str) -> LedgerResult<Vec<Payment>> {
        let payments = self
            .read()?
            .payments
            .values()
            .filter(|p| p.loan_id() == Some(loan_id))
            .cloned()
            .collect();
        Ok(LedgerSnapshot::sorted(payments))
    }

    fn payments(&self) -> LedgerResult<Vec<Payment>> {
        let payments = self.read()?.payments.values().cloned().collect();
        Ok(LedgerSnapshot::sorted(payments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{next_sequence, PAYMENT_COUNTER};

    #[test]
    fn test_commit_keeps_writes() {
        let store = InMemoryStore::new();
        let n = store
            .transact(|tx| next_sequence(tx, PAYMENT_COUNTER))
            .unwrap();
        assert_eq!(n, 1);
        let n = store
            .transact(|tx| next_sequence(tx, PAYMENT_COUNTER))
            .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_error_rolls_back() {
        let store = InMemoryStore::new();
        let result: LedgerResult<()> = store.transact(|tx| {
            next_sequence(tx, PAYMENT_COUNTER)?;
            Err(LedgerError::Conflict("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.snapshot().unwrap().counters.get(PAYMENT_COUNTER), None);
    }

    #[test]
    fn test_update_missing_loan_is_not_found() {
        let store = InMemoryStore::new();
        let result = store.transact(|tx| tx.update_loan_status("nope", LoanStatus::Paid));
        assert!(matches!(result, Err(LedgerError::NotFound { .. })));
    }
}
