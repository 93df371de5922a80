use chrono::NaiveDate;
use clap::Args;

use loan_ledger_core::calendar::YearMonth;
use loan_ledger_core::closure::ClosureSet;
use loan_ledger_core::ledger::{self, LedgerInput, MonthlySummaryInput, PartnerDebtInput};
use loan_ledger_core::store::DocumentStore;

use super::{today, CommandResult, Context};
use crate::input;

/// Arguments for single-loan reconciliation
#[derive(Args)]
pub struct LedgerArgs {
    /// Path to JSON ledger input (loan, payments, closures, reference_date)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan to reconcile from the ledger file
    #[arg(long)]
    pub loan_id: Option<String>,

    /// Reference date for overdue classification (defaults to today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

/// Arguments for partner debt aggregation
#[derive(Args)]
pub struct PartnerDebtArgs {
    /// Path to JSON partner debt input
    #[arg(long)]
    pub input: Option<String>,

    /// Partner whose loans are aggregated from the ledger file
    #[arg(long)]
    pub partner: Option<String>,

    /// Reference date for overdue classification (defaults to today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

/// Arguments for the month-end summary
#[derive(Args)]
pub struct MonthSummaryArgs {
    /// Path to JSON summary input (month, loans, payments)
    #[arg(long)]
    pub input: Option<String>,

    /// Month to summarise (YYYY-MM)
    #[arg(long)]
    pub month: Option<YearMonth>,
}

pub fn run_ledger(args: LedgerArgs, ctx: &Context) -> CommandResult {
    let ledger_input: LedgerInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(ref loan_id) = args.loan_id {
        let store = ctx.ledger.load()?;
        let loan = store
            .loan(loan_id)?
            .ok_or_else(|| format!("loan {} not found in {}", loan_id, ctx.ledger.path().display()))?;
        LedgerInput {
            loan,
            payments: store.payments()?,
            closures: ClosureSet::new(),
            reference_date: args.as_of.unwrap_or_else(today),
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--loan-id, --input <file.json> or stdin required for ledger".into());
    };

    let result = ledger::build_ledger(&ledger_input);
    Ok(serde_json::to_value(result)?)
}

pub fn run_partner_debt(args: PartnerDebtArgs, ctx: &Context) -> CommandResult {
    let debt_input: PartnerDebtInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(ref partner) = args.partner {
        let store = ctx.ledger.load()?;
        PartnerDebtInput {
            partner_id: partner.clone(),
            loans: store.loans_for_partner(partner)?,
            payments: store.payments()?,
            closures: ClosureSet::new(),
            reference_date: args.as_of.unwrap_or_else(today),
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--partner, --input <file.json> or stdin required for partner-debt".into());
    };

    let result = ledger::analyze_partner_debt(&debt_input);
    Ok(serde_json::to_value(result)?)
}

pub fn run_month_summary(args: MonthSummaryArgs, ctx: &Context) -> CommandResult {
    let summary_input: MonthlySummaryInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(month) = args.month {
        let store = ctx.ledger.load()?;
        MonthlySummaryInput {
            month,
            loans: store.loans()?,
            payments: store.payments()?,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--month, --input <file.json> or stdin required for month-summary".into());
    };

    let result = ledger::build_monthly_summary(&summary_input);
    Ok(serde_json::to_value(result)?)
}
