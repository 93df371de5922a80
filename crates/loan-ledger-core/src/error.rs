use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// User-correctable input problem. Never retried.
    #[error("Invalid input: {field} — {reason}")]
    Validation { field: String, reason: String },

    /// The ledger is not in the state the operation expects. The caller may
    /// retry the whole operation.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Raised by the persistence collaborator; propagated as-is.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}
