use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;

use loan_ledger_core::payments::{
    self, AbonoRequest, BulkSelection, ClosedMonthPolicy, InstallmentPaymentRequest,
};

use super::{today, CommandResult, Context};
use crate::input;

/// Arguments for paying one installment
#[derive(Args)]
pub struct PayArgs {
    /// Loan being paid
    #[arg(long)]
    pub loan_id: String,

    /// Installment number (1-based)
    #[arg(long)]
    pub installment: u32,

    /// Amount received; defaults to the installment's total due
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Payment date (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Accept a payment dated inside a closed month
    #[arg(long)]
    pub allow_closed_month: bool,
}

/// Arguments for a free-form abono
#[derive(Args)]
pub struct AbonoArgs {
    /// Free-form loan being paid down
    #[arg(long)]
    pub loan_id: String,

    /// Amount received
    #[arg(long)]
    pub amount: Decimal,

    /// Payment date (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Accept a payment dated inside a closed month
    #[arg(long)]
    pub allow_closed_month: bool,
}

/// Arguments for a bulk payment
#[derive(Args)]
pub struct BulkPayArgs {
    /// Path to JSON array of {loan_id, installment_number, amount?}
    #[arg(long)]
    pub input: Option<String>,

    /// Payment date applied to every selection (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Accept payments dated inside a closed month
    #[arg(long)]
    pub allow_closed_month: bool,
}

/// Arguments for reverting a payment
#[derive(Args)]
pub struct RevertArgs {
    /// Payment document id, e.g. PAY-00000042
    pub payment_id: String,
}

fn policy(ctx: &Context, allow_closed_month: bool) -> ClosedMonthPolicy {
    if allow_closed_month {
        ClosedMonthPolicy::Allow
    } else {
        ctx.policy
    }
}

pub fn run_pay(args: PayArgs, ctx: &Context) -> CommandResult {
    let request = InstallmentPaymentRequest {
        loan_id: args.loan_id,
        installment_number: args.installment,
        amount: args.amount,
        payment_date: args.date.unwrap_or_else(today),
    };

    let policy = policy(ctx, args.allow_closed_month);
    let receipt = ctx
        .ledger
        .update(|store| Ok(payments::apply_installment_payment(store, &request, policy)?))?;
    Ok(serde_json::to_value(receipt)?)
}

pub fn run_abono(args: AbonoArgs, ctx: &Context) -> CommandResult {
    let request = AbonoRequest {
        loan_id: args.loan_id,
        amount: args.amount,
        payment_date: args.date.unwrap_or_else(today),
    };

    let policy = policy(ctx, args.allow_closed_month);
    let receipt = ctx
        .ledger
        .update(|store| Ok(payments::apply_free_form_abono(store, &request, policy)?))?;
    Ok(serde_json::to_value(receipt)?)
}

pub fn run_bulk_pay(args: BulkPayArgs, ctx: &Context) -> CommandResult {
    let selections: Vec<BulkSelection> = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json> or stdin required for bulk-pay".into());
    };

    let date = args.date.unwrap_or_else(today);
    let policy = policy(ctx, args.allow_closed_month);
    let receipts = ctx
        .ledger
        .update(|store| Ok(payments::apply_bulk_payments(store, &selections, date, policy)?))?;
    Ok(serde_json::to_value(receipts)?)
}

pub fn run_revert(args: RevertArgs, ctx: &Context) -> CommandResult {
    let payment = ctx
        .ledger
        .update(|store| Ok(payments::revert_payment(store, &args.payment_id)?))?;
    Ok(serde_json::to_value(payment)?)
}
