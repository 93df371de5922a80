use chrono::NaiveDate;
use clap::Args;

use loan_ledger_core::calendar::YearMonth;
use loan_ledger_core::closure;

use super::{today, CommandResult, Context};

/// Arguments for closing a month
#[derive(Args)]
pub struct CloseMonthArgs {
    /// Month to close (YYYY-MM)
    pub month: YearMonth,

    /// Date recorded on the closure (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

/// Arguments for reopening a month
#[derive(Args)]
pub struct ReopenMonthArgs {
    /// Month to reopen (YYYY-MM)
    pub month: YearMonth,
}

pub fn run_close_month(args: CloseMonthArgs, ctx: &Context) -> CommandResult {
    let closed_on = args.date.unwrap_or_else(today);
    let record = ctx
        .ledger
        .update(|store| Ok(closure::close_month(store, args.month, closed_on)?))?;
    Ok(serde_json::to_value(record)?)
}

pub fn run_reopen_month(args: ReopenMonthArgs, ctx: &Context) -> CommandResult {
    let record = ctx
        .ledger
        .update(|store| Ok(closure::reopen_month(store, args.month)?))?;
    Ok(serde_json::to_value(record)?)
}
