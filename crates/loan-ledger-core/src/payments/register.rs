use tracing::info;

use crate::error::LedgerError;
use crate::loan::{Loan, LoanForm};
use crate::schedule::compute_schedule;
use crate::store::{next_sequence, DocumentStore, LOAN_COUNTER};
use crate::LedgerResult;

/// Validate a loan form and store the loan as `Approved`, assigning the next
/// loan number. Without an explicit id the loan is named `LOAN-nnnnnn`.
pub fn register_loan<S: DocumentStore>(store: &S, form: &LoanForm) -> LedgerResult<Loan> {
    let mut loan = form.parse()?;
    if loan.partner_id.trim().is_empty() {
        return Err(LedgerError::validation("partnerId", "Partner is required"));
    }
    if loan.installment_count().is_some() && compute_schedule(&loan).is_empty() {
        return Err(LedgerError::validation(
            "principal",
            "Amounts or dates out of range; no schedule can be computed",
        ));
    }

    let loan = store.transact(|tx| {
        let number = next_sequence(tx, LOAN_COUNTER)?;
        loan.loan_number = number;
        if loan.id.trim().is_empty() {
            loan.id = format!("LOAN-{number:06}");
        }
        if tx.get_loan(&loan.id)?.is_some() {
            return Err(LedgerError::Conflict(format!(
                "loan {} already exists",
                loan.id
            )));
        }
        tx.set_loan(loan.clone())?;
        Ok(loan)
    })?;

    info!(
        loan = %loan.id,
        partner = %loan.partner_id,
        principal = %loan.principal,
        "loan registered"
    );
    Ok(loan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::{LoanKind, LoanStatus};
    use crate::store::InMemoryStore;
    use chrono::NaiveDate;
    use serde_json::json;

    fn form() -> LoanForm {
        LoanForm {
            partner_id: Some("P-7".into()),
            principal: Some(json!("1200")),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            kind: Some(LoanKind::Standard),
            installment_count: Some(json!(12)),
            monthly_interest_rate: Some(json!(5)),
            ..Default::default()
        }
    }

    #[test]
    fn test_assigns_sequential_numbers() {
        let store = InMemoryStore::new();
        let first = register_loan(&store, &form()).unwrap();
        let second = register_loan(&store, &form()).unwrap();
        assert_eq!(first.id, "LOAN-000001");
        assert_eq!(second.loan_number, 2);
        assert_eq!(second.status, LoanStatus::Approved);
        assert_eq!(store.loans_for_partner("P-7").unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_id_is_conflict() {
        let store = InMemoryStore::new();
        let mut f = form();
        f.id = Some("L-X".into());
        register_loan(&store, &f).unwrap();
        let err = register_loan(&store, &f).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert_eq!(store.loans().unwrap().len(), 1);
    }

    #[test]
    fn test_unschedulable_principal_rejected() {
        let store = InMemoryStore::new();
        let mut f = form();
        f.principal = Some(json!("79228162514264337593543950335"));
        let err = register_loan(&store, &f).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "principal"));
        assert!(store.loans().unwrap().is_empty());
    }

    #[test]
    fn test_missing_partner_rejected() {
        let store = InMemoryStore::new();
        let mut f = form();
        f.partner_id = None;
        let err = register_loan(&store, &f).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }
}
