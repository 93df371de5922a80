//! Month-closure state machine.
//!
//! Each calendar month is either Open or Closed. Closing a month appends a
//! `MonthClosure` payment record; reopening removes it. A closed month never
//! changes installments or payments, it only acts as a reclassification
//! filter for the ledger reconciler.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

use crate::calendar::YearMonth;
use crate::error::LedgerError;
use crate::payment::{payment_id, Payment, PaymentKind};
use crate::store::{next_sequence, DocumentStore, PAYMENT_COUNTER};
use crate::LedgerResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthState {
    Open,
    Closed,
}

/// The set of closed months, derived from closure records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClosureSet {
    months: BTreeSet<YearMonth>,
}

impl ClosureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derived view over payment records; non-closure payments are ignored.
    pub fn from_payments<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> Self {
        Self {
            months: payments
                .into_iter()
                .filter_map(Payment::closure_month)
                .collect(),
        }
    }

    pub fn from_months(months: impl IntoIterator<Item = YearMonth>) -> Self {
        Self {
            months: months.into_iter().collect(),
        }
    }

    pub fn state(&self, month: YearMonth) -> MonthState {
        if self.months.contains(&month) {
            MonthState::Closed
        } else {
            MonthState::Open
        }
    }

    pub fn is_closed(&self, month: YearMonth) -> bool {
        self.state(month) == MonthState::Closed
    }

    /// True when some closed month ends on or after `due_date`, i.e. the
    /// date falls in or before a closed month.
    pub fn covers(&self, due_date: NaiveDate) -> bool {
        self.months
            .last()
            .is_some_and(|latest| due_date <= latest.last_day())
    }

    pub fn months(&self) -> impl Iterator<Item = &YearMonth> {
        self.months.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

/// Close `month`. Fails with a conflict when it is already closed.
pub fn close_month<S: DocumentStore>(
    store: &S,
    month: YearMonth,
    closed_on: NaiveDate,
) -> LedgerResult<Payment> {
    store.transact(|tx| {
        let closures = ClosureSet::from_payments(&tx.closure_records()?);
        if closures.is_closed(month) {
            return Err(LedgerError::Conflict(format!("month {month} is already closed")));
        }

        let number = next_sequence(tx, PAYMENT_COUNTER)?;
        let record = Payment {
            id: payment_id(number),
            payment_number: number,
            payment_date: closed_on,
            kind: PaymentKind::MonthClosure {
                closure_month: month,
            },
        };
        tx.set_payment(record.clone())?;
        info!(%month, payment = %record.id, "month closed");
        Ok(record)
    })
}

/// Reopen `month`, removing its closure record. Fails with a conflict when
/// the month is not closed.
pub fn reopen_month<S: DocumentStore>(store: &S, month: YearMonth) -> LedgerResult<Payment> {
    store.transact(|tx| {
        let record = tx
            .closure_records()?
            .into_iter()
            .find(|p| p.closure_month() == Some(month))
            .ok_or_else(|| LedgerError::Conflict(format!("month {month} is not closed")))?;
        tx.delete_payment(&record.id)?;
        info!(%month, payment = %record.id, "month reopened");
        Ok(record)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_covers_up_to_end_of_latest_closed_month() {
        let set = ClosureSet::from_months([ym("2024-03"), ym("2024-06")]);
        assert!(set.covers(d(2024, 1, 15)));
        assert!(set.covers(d(2024, 6, 30)));
        assert!(!set.covers(d(2024, 7, 1)));
        assert!(!ClosureSet::new().covers(d(2000, 1, 1)));
    }

    #[test]
    fn test_close_then_reopen() {
        let store = InMemoryStore::new();
        let june = ym("2024-06");

        let record = close_month(&store, june, d(2024, 6, 30)).unwrap();
        assert_eq!(record.payment_number, 1);

        let closures = ClosureSet::from_payments(&store.payments().unwrap());
        assert_eq!(closures.state(june), MonthState::Closed);

        let removed = reopen_month(&store, june).unwrap();
        assert_eq!(removed.id, record.id);
        let closures = ClosureSet::from_payments(&store.payments().unwrap());
        assert_eq!(closures.state(june), MonthState::Open);
    }

    #[test]
    fn test_duplicate_close_is_conflict() {
        let store = InMemoryStore::new();
        let june = ym("2024-06");
        close_month(&store, june, d(2024, 6, 30)).unwrap();
        let err = close_month(&store, june, d(2024, 7, 1)).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert_eq!(store.payments().unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_open_month_is_conflict() {
        let store = InMemoryStore::new();
        let err = reopen_month(&store, ym("2024-06")).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }
}
