use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::json;

use loan_ledger_core::loan::{InterestMode, LoanForm, LoanKind, PaymentModeKind};
use loan_ledger_core::payments;

use super::{CommandResult, Context};
use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Standard,
    Custom,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum InterestArg {
    Percentage,
    FixedAmount,
}

/// Arguments for loan registration
#[derive(Args)]
pub struct RegisterLoanArgs {
    /// Path to JSON loan form (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Explicit loan id; defaults to LOAN-<number>
    #[arg(long)]
    pub id: Option<String>,

    /// Borrowing partner
    #[arg(long)]
    pub partner: Option<String>,

    /// Principal lent
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Disbursement date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Loan kind
    #[arg(long, value_enum, default_value = "standard")]
    pub kind: KindArg,

    /// Number of monthly installments (omit with --free-form)
    #[arg(long)]
    pub installments: Option<u32>,

    /// Monthly interest rate in percent (standard loans)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Custom loan repaid through abonos instead of installments
    #[arg(long)]
    pub free_form: bool,

    /// Flat interest mode for custom loans
    #[arg(long, value_enum)]
    pub interest: Option<InterestArg>,

    /// Flat interest value: percent of principal or a fixed amount
    #[arg(long)]
    pub interest_value: Option<Decimal>,
}

impl RegisterLoanArgs {
    fn to_form(&self) -> LoanForm {
        let kind = match self.kind {
            KindArg::Standard => LoanKind::Standard,
            KindArg::Custom => LoanKind::Custom,
        };
        let payment_mode = match (self.kind, self.free_form) {
            (KindArg::Custom, true) => Some(PaymentModeKind::FreeForm),
            (KindArg::Custom, false) => Some(PaymentModeKind::FixedInstallments),
            (KindArg::Standard, _) => None,
        };
        LoanForm {
            id: self.id.clone(),
            partner_id: self.partner.clone(),
            principal: self.principal.map(|p| json!(p.to_string())),
            start_date: self.start_date,
            kind: Some(kind),
            installment_count: self.installments.map(|n| json!(n)),
            monthly_interest_rate: self.rate.map(|r| json!(r.to_string())),
            payment_mode,
            has_interest: self.interest.is_some(),
            interest_mode: self.interest.map(|i| match i {
                InterestArg::Percentage => InterestMode::Percentage,
                InterestArg::FixedAmount => InterestMode::FixedAmount,
            }),
            interest_value: self.interest_value.map(|v| json!(v.to_string())),
        }
    }
}

pub fn run_register_loan(args: RegisterLoanArgs, ctx: &Context) -> CommandResult {
    let form: LoanForm = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        args.to_form()
    };

    let loan = ctx
        .ledger
        .update(|store| Ok(payments::register_loan(store, &form)?))?;
    Ok(serde_json::to_value(loan)?)
}
