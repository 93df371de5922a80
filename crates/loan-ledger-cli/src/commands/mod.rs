pub mod closure;
pub mod ledger;
pub mod loans;
pub mod payments;
pub mod schedule;

use chrono::NaiveDate;
use loan_ledger_core::payments::ClosedMonthPolicy;
use serde_json::Value;

use crate::ledger_file::LedgerFile;

pub type CommandResult = Result<Value, Box<dyn std::error::Error>>;

/// Settings shared by every subcommand, after config file and flags are
/// merged.
pub struct Context {
    pub ledger: LedgerFile,
    pub policy: ClosedMonthPolicy,
}

/// Reference date used when `--as-of` / `--date` is omitted.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
