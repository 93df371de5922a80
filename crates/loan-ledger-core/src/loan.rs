//! Loan records and the form payload they are created from.
//!
//! A loan's repayment terms are a closed set of shapes: a Standard
//! (declining-balance) loan always has an installment count and a monthly
//! rate; a Custom loan either has a fixed number of installments or is
//! repaid free-form, in which case no installment count exists at all.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::error::LedgerError;
use crate::types::*;
use crate::LedgerResult;

// ---------------------------------------------------------------------------
// Typed model
// ---------------------------------------------------------------------------

/// Lifecycle state. Approved -> Paid happens only through payment
/// application; Pending -> Approved/Rejected belongs to the approval
/// workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Approved,
    Pending,
    Rejected,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoanTerms {
    /// German system: constant principal, interest on the declining balance.
    Standard {
        installment_count: u32,
        monthly_interest_rate: Percent,
    },
    Custom {
        payment_mode: PaymentMode,
        #[serde(default)]
        interest: CustomInterest,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PaymentMode {
    FixedInstallments { installment_count: u32 },
    /// Repaid through arbitrary abonos; reconciled by running balance.
    FreeForm,
}

/// Flat interest on a custom loan. Spread evenly over the installments,
/// it does not decline with the balance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CustomInterest {
    #[default]
    None,
    /// Percentage of the principal, charged once over the life of the loan.
    Percentage(Percent),
    /// Fixed total amount of interest.
    FixedAmount(Money),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    #[serde(default)]
    pub loan_number: u64,
    pub partner_id: PartnerId,
    pub principal: Money,
    pub start_date: NaiveDate,
    pub terms: LoanTerms,
    #[serde(default)]
    pub status: LoanStatus,
}

impl Loan {
    /// Number of scheduled installments; `None` for free-form loans.
    pub fn installment_count(&self) -> Option<u32> {
        match &self.terms {
            LoanTerms::Standard {
                installment_count, ..
            } => Some(*installment_count),
            LoanTerms::Custom {
                payment_mode: PaymentMode::FixedInstallments { installment_count },
                ..
            } => Some(*installment_count),
            LoanTerms::Custom {
                payment_mode: PaymentMode::FreeForm,
                ..
            } => None,
        }
    }

    pub fn is_free_form(&self) -> bool {
        matches!(
            self.terms,
            LoanTerms::Custom {
                payment_mode: PaymentMode::FreeForm,
                ..
            }
        )
    }

    /// Loans that still carry (or carried) debt on the books.
    pub fn is_active(&self) -> bool {
        matches!(self.status, LoanStatus::Approved | LoanStatus::Paid)
    }
}

// ---------------------------------------------------------------------------
// Form payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanKind {
    Standard,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentModeKind {
    FixedInstallments,
    FreeForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestMode {
    Percentage,
    FixedAmount,
}

/// Loan creation/edit payload as collected by UI forms. Numeric fields
/// accept JSON numbers or numeric strings; every field is optional so a
/// half-filled form still deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<LoanKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installment_count: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_interest_rate: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_mode: Option<PaymentModeKind>,
    #[serde(default)]
    pub has_interest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_mode: Option<InterestMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_value: Option<Value>,
}

impl LoanForm {
    /// Turn the form into a typed loan in `Approved` state.
    pub fn parse(&self) -> LedgerResult<Loan> {
        let principal = required_decimal("principal", &self.principal)?;
        if principal <= Decimal::ZERO {
            return Err(LedgerError::validation(
                "principal",
                "Principal must be positive",
            ));
        }
        let start_date = self
            .start_date
            .ok_or_else(|| LedgerError::validation("startDate", "Start date is required"))?;

        let kind = self
            .kind
            .ok_or_else(|| LedgerError::validation("kind", "Loan kind is required"))?;

        let terms = match kind {
            LoanKind::Standard => {
                let installment_count =
                    parse_installment_count(&self.installment_count)?;
                let monthly_interest_rate =
                    required_decimal("monthlyInterestRate", &self.monthly_interest_rate)?;
                if monthly_interest_rate < Decimal::ZERO {
                    return Err(LedgerError::validation(
                        "monthlyInterestRate",
                        "Interest rate cannot be negative",
                    ));
                }
                LoanTerms::Standard {
                    installment_count,
                    monthly_interest_rate,
                }
            }
            LoanKind::Custom => {
                let payment_mode = match self.payment_mode {
                    Some(PaymentModeKind::FixedInstallments) => PaymentMode::FixedInstallments {
                        installment_count: parse_installment_count(&self.installment_count)?,
                    },
                    Some(PaymentModeKind::FreeForm) => PaymentMode::FreeForm,
                    None => {
                        return Err(LedgerError::validation(
                            "paymentMode",
                            "Payment mode is required for custom loans",
                        ))
                    }
                };
                LoanTerms::Custom {
                    payment_mode,
                    interest: self.parse_custom_interest()?,
                }
            }
        };

        Ok(Loan {
            id: self.id.clone().unwrap_or_default(),
            loan_number: 0,
            partner_id: self.partner_id.clone().unwrap_or_default(),
            principal,
            start_date,
            terms,
            status: LoanStatus::Approved,
        })
    }

    fn parse_custom_interest(&self) -> LedgerResult<CustomInterest> {
        if !self.has_interest {
            return Ok(CustomInterest::None);
        }
        let mode = self.interest_mode.ok_or_else(|| {
            LedgerError::validation("interestMode", "Interest mode is required when hasInterest")
        })?;
        let value = required_decimal("interestValue", &self.interest_value)?;
        if value < Decimal::ZERO {
            return Err(LedgerError::validation(
                "interestValue",
                "Interest cannot be negative",
            ));
        }
        Ok(match mode {
            InterestMode::Percentage => CustomInterest::Percentage(value),
            InterestMode::FixedAmount => CustomInterest::FixedAmount(value),
        })
    }
}

/// Parse a loosely-typed numeric form value. `None` when absent, blank or
/// not a number.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .ok()
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Decimal::from_str(s).ok()
            }
        }
        _ => None,
    }
}

fn required_decimal(field: &str, value: &Option<Value>) -> LedgerResult<Decimal> {
    match value {
        None | Some(Value::Null) => Err(LedgerError::validation(field, "Value is required")),
        Some(v) => parse_decimal(v)
            .ok_or_else(|| LedgerError::validation(field, format!("'{v}' is not a number"))),
    }
}

fn parse_installment_count(value: &Option<Value>) -> LedgerResult<u32> {
    let count = required_decimal("installmentCount", value)?;
    if count.fract() != Decimal::ZERO {
        return Err(LedgerError::validation(
            "installmentCount",
            "Installment count must be a whole number",
        ));
    }
    if count <= Decimal::ZERO {
        return Err(LedgerError::validation(
            "installmentCount",
            "Installment count must be positive",
        ));
    }
    count
        .to_u32()
        .ok_or_else(|| LedgerError::validation("installmentCount", "Installment count is too large"))
}
