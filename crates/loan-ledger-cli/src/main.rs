mod commands;
mod config;
mod input;
mod ledger_file;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::closure::{CloseMonthArgs, ReopenMonthArgs};
use commands::ledger::{LedgerArgs, MonthSummaryArgs, PartnerDebtArgs};
use commands::loans::RegisterLoanArgs;
use commands::payments::{AbonoArgs, BulkPayArgs, PayArgs, RevertArgs};
use commands::schedule::ScheduleArgs;
use commands::Context;
use config::CliConfig;
use ledger_file::LedgerFile;

/// Loan schedules, ledger reconciliation and payment recording
#[derive(Parser)]
#[command(
    name = "loanctl",
    version,
    about = "Loan schedules, ledger reconciliation and payment recording",
    long_about = "A CLI over a JSON loan ledger. Computes declining-balance and flat \
                  installment schedules, reconciles recorded payments against them, \
                  aggregates partner debt and records payments, abonos and month \
                  closures with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Configuration file (defaults to ./loanctl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file, overriding the configured path
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute an installment schedule
    Schedule(ScheduleArgs),
    /// Validate a loan form and add the loan to the ledger
    RegisterLoan(RegisterLoanArgs),
    /// Reconcile one loan's payments against its schedule
    Ledger(LedgerArgs),
    /// Aggregate overdue and future debt for a partner
    PartnerDebt(PartnerDebtArgs),
    /// Record payment of one installment
    Pay(PayArgs),
    /// Record a partial payment on a free-form loan
    Abono(AbonoArgs),
    /// Pay several installments atomically
    BulkPay(BulkPayArgs),
    /// Delete a recorded payment
    Revert(RevertArgs),
    /// Close a month
    CloseMonth(CloseMonthArgs),
    /// Reopen a closed month
    ReopenMonth(ReopenMonthArgs),
    /// Month-end summary of dues and collections
    MonthSummary(MonthSummaryArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn context(
    config_path: Option<&Path>,
    ledger_path: Option<PathBuf>,
) -> Result<Context, Box<dyn std::error::Error>> {
    let config = CliConfig::resolve(config_path)?.with_env_override();
    Ok(Context {
        ledger: LedgerFile::new(ledger_path.unwrap_or(config.ledger_path)),
        policy: config.closed_month_policy,
    })
}

fn run(
    command: Commands,
    ctx: impl FnOnce() -> Result<Context, Box<dyn std::error::Error>>,
) -> commands::CommandResult {
    match command {
        Commands::Version => Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })),
        Commands::Schedule(args) => commands::schedule::run_schedule(args, &ctx()?),
        Commands::RegisterLoan(args) => commands::loans::run_register_loan(args, &ctx()?),
        Commands::Ledger(args) => commands::ledger::run_ledger(args, &ctx()?),
        Commands::PartnerDebt(args) => commands::ledger::run_partner_debt(args, &ctx()?),
        Commands::Pay(args) => commands::payments::run_pay(args, &ctx()?),
        Commands::Abono(args) => commands::payments::run_abono(args, &ctx()?),
        Commands::BulkPay(args) => commands::payments::run_bulk_pay(args, &ctx()?),
        Commands::Revert(args) => commands::payments::run_revert(args, &ctx()?),
        Commands::CloseMonth(args) => commands::closure::run_close_month(args, &ctx()?),
        Commands::ReopenMonth(args) => commands::closure::run_reopen_month(args, &ctx()?),
        Commands::MonthSummary(args) => commands::ledger::run_month_summary(args, &ctx()?),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // config is only read by commands that need the ledger
    let result = run(cli.command, || context(cli.config.as_deref(), cli.ledger));

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
