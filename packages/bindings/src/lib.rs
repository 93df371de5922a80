use napi::Result as NapiResult;
use napi_derive::napi;

use loan_ledger_core::ledger::{self, LedgerInput, MonthlySummaryInput, PartnerDebtInput};
use loan_ledger_core::schedule::{self, ScheduleInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Installment schedule for a stored loan document or a raw form payload.
/// A form that does not describe a valid loan yields an empty schedule with
/// a warning rather than an error.
#[napi]
pub fn compute_schedule(input_json: String) -> NapiResult<String> {
    let input: ScheduleInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = schedule::build_schedule(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn reconcile_loan(input_json: String) -> NapiResult<String> {
    let input: LedgerInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = ledger::build_ledger(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn partner_debt(input_json: String) -> NapiResult<String> {
    let input: PartnerDebtInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = ledger::analyze_partner_debt(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn monthly_summary(input_json: String) -> NapiResult<String> {
    let input: MonthlySummaryInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = ledger::build_monthly_summary(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}
