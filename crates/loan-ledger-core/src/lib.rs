//! Amortization, ledger reconciliation and payment application for a small
//! loan-servicing book.
//!
//! Schedules are never stored: they are recomputed from the loan terms
//! whenever needed and overlaid with payment and month-closure records to
//! produce each loan's state.

pub mod calendar;
pub mod closure;
pub mod error;
pub mod ledger;
pub mod loan;
pub mod money;
pub mod payment;
pub mod payments;
pub mod schedule;
pub mod store;
pub mod types;

pub use error::LedgerError;
pub use types::*;

/// Standard result type for all ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
