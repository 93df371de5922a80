use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::json;

use loan_ledger_core::loan::{LoanForm, LoanKind};
use loan_ledger_core::schedule::{self, ScheduleInput};
use loan_ledger_core::store::DocumentStore;

use super::{CommandResult, Context};
use crate::input;

/// Arguments for schedule computation
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file: a loan document or a loan form (overrides flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Compute the schedule of a loan stored in the ledger
    #[arg(long)]
    pub loan_id: Option<String>,

    /// Principal lent
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Disbursement date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Number of monthly installments
    #[arg(long)]
    pub installments: Option<u32>,

    /// Monthly interest rate in percent, charged on the declining balance
    #[arg(long, default_value = "0")]
    pub rate: Decimal,
}

pub fn run_schedule(args: ScheduleArgs, ctx: &Context) -> CommandResult {
    let schedule_input: ScheduleInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(ref loan_id) = args.loan_id {
        let store = ctx.ledger.load()?;
        let loan = store
            .loan(loan_id)?
            .ok_or_else(|| format!("loan {} not found in {}", loan_id, ctx.ledger.path().display()))?;
        ScheduleInput::Loan(loan)
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        let principal = args
            .principal
            .ok_or("--principal is required (or provide --input / --loan-id)")?;
        let start_date = args
            .start_date
            .ok_or("--start-date is required (or provide --input / --loan-id)")?;
        let installments = args
            .installments
            .ok_or("--installments is required (or provide --input / --loan-id)")?;

        ScheduleInput::Form(LoanForm {
            principal: Some(json!(principal.to_string())),
            start_date: Some(start_date),
            kind: Some(LoanKind::Standard),
            installment_count: Some(json!(installments)),
            monthly_interest_rate: Some(json!(args.rate.to_string())),
            ..Default::default()
        })
    };

    let result = schedule::build_schedule(&schedule_input);
    Ok(serde_json::to_value(result)?)
}
