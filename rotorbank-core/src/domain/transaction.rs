//! Transaction history entries
//!
//! History entries are free text inside the ledger file. The ledger engine
//! only ever appends them, formatted here so every writer agrees on wording.

use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Timestamp format used inside history entries (local wall clock)
pub const ENTRY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What kind of movement a history entry records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    Opened,
    Deposit,
    Withdraw,
    TransferOut { target: String },
    TransferIn { source: String },
    Rollback { target: String },
}

/// A single entry about to be appended to an account's history
#[derive(Debug, Clone)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

impl Transaction {
    pub fn new(kind: TransactionKind, amount: Decimal, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            amount,
            at,
            note: None,
        }
    }

    pub fn with_note(mut self, note: Option<&str>) -> Self {
        self.note = note.map(str::trim).filter(|n| !n.is_empty()).map(String::from);
        self
    }

    /// Render the entry as stored in the ledger history
    pub fn to_entry(&self) -> String {
        let at = self.at.with_timezone(&Local);
        let amount = self.amount.round_dp(2);
        let head = match &self.kind {
            TransactionKind::Opened => return format!("Account created at {}", at.format("%Y-%m-%d")),
            TransactionKind::Deposit => format!("Deposit ${:.2}", amount),
            TransactionKind::Withdraw => format!("Withdraw ${:.2}", amount),
            TransactionKind::TransferOut { target } => format!("Transfer to {} ${:.2}", target, amount),
            TransactionKind::TransferIn { source } => format!("Transfer from {} ${:.2}", source, amount),
            TransactionKind::Rollback { target } => {
                format!("Rollback of transfer to {} ${:.2}", target, amount)
            }
        };
        let mut entry = format!("{} at {}", head, at.format(ENTRY_TIME_FORMAT));
        if let Some(note) = &self.note {
            entry.push_str(&format!(" ({})", note));
        }
        entry
    }
}
