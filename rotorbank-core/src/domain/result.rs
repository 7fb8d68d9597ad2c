//! Result and error types for the core library

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Core library error type
///
/// Every variant is a recoverable, reported condition. `LedgerInconsistent`
/// is the only one that means the on-disk ledgers disagree and need repair.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transfer target not found: {0}")]
    TargetNotFound(String),

    #[error("Corrupt ledger: {0}")]
    Corrupt(String),

    #[error("Authentication failed for {0}")]
    Auth(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    #[error("Account already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transfer {transfer_id} to {target} failed and was rolled back: {cause}")]
    PartialFailure {
        transfer_id: Uuid,
        target: String,
        cause: String,
    },

    #[error(
        "Ledger inconsistent after transfer {transfer_id}: {source_identity} was debited but \
         neither the credit to {target} nor the rollback could be saved ({cause}; rollback: {rollback_cause})"
    )]
    LedgerInconsistent {
        transfer_id: Uuid,
        source_identity: String,
        target: String,
        cause: String,
        rollback_cause: String,
    },
}

impl Error {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a corrupt ledger error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid amount error
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    /// Stable machine-readable code for logs and JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::TargetNotFound(_) => "target_not_found",
            Error::Corrupt(_) => "corrupt",
            Error::Auth(_) => "auth_error",
            Error::InvalidAmount(_) => "invalid_amount",
            Error::InsufficientFunds { .. } => "insufficient_funds",
            Error::AlreadyExists(_) => "already_exists",
            Error::Validation(_) => "validation",
            Error::Config(_) => "config",
            Error::Io(_) => "io_failure",
            Error::Json(_) => "json",
            Error::PartialFailure { .. } => "partial_failure",
            Error::LedgerInconsistent { .. } => "ledger_inconsistent",
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let mut context = HashMap::new();
                context.insert("kind".to_string(), serde_json::Value::from(e.kind()));
                Self::fail_with_context(e.to_string(), context)
            }
        }
    }
}
