//! Transfer state machine
//!
//! A transfer touches two ledger files and is not atomic. Each step moves the
//! state forward explicitly so the outcome of a failed transfer can be
//! inspected and logged:
//!
//! ```text
//! Pending -> Debited -> Credited
//!                    -> CompensationApplied
//!                    -> CompensationFailed
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// Validated, nothing written yet
    Pending,
    /// Source debit saved, target not yet credited
    Debited,
    /// Both sides saved
    Credited,
    /// Target save failed, source debit reversed and saved
    CompensationApplied,
    /// Target save failed and the reversal could not be saved either
    CompensationFailed,
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Pending => "pending",
            TransferState::Debited => "debited",
            TransferState::Credited => "credited",
            TransferState::CompensationApplied => "compensation_applied",
            TransferState::CompensationFailed => "compensation_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Credited | TransferState::CompensationApplied | TransferState::CompensationFailed
        )
    }

    fn can_advance_to(&self, next: TransferState) -> bool {
        matches!(
            (self, next),
            (TransferState::Pending, TransferState::Debited)
                | (TransferState::Debited, TransferState::Credited)
                | (TransferState::Debited, TransferState::CompensationApplied)
                | (TransferState::Debited, TransferState::CompensationFailed)
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one transfer attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub id: Uuid,
    pub source: String,
    pub target: String,
    pub amount: Decimal,
    pub state: TransferState,
    pub started_at: DateTime<Utc>,
    /// Every state the transfer passed through, in order
    pub trail: Vec<TransferState>,
}

impl TransferReceipt {
    pub fn new(source: &str, target: &str, amount: Decimal, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.to_string(),
            target: target.to_string(),
            amount,
            state: TransferState::Pending,
            started_at,
            trail: vec![TransferState::Pending],
        }
    }

    /// Move to the next state; illegal transitions are a programming error
    /// surfaced as a validation failure rather than a panic.
    pub fn advance(&mut self, next: TransferState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::validation(format!(
                "transfer {} cannot move from {} to {}",
                self.id, self.state, next
            )));
        }
        self.state = next;
        self.trail.push(next);
        Ok(())
    }
}
