//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod alphabet;
mod key;
pub mod result;
mod transaction;
mod transfer;

pub use account::{
    parse_amount, validate_amount, validate_credential, validate_identity, validate_note,
    Accrual, AccountRecord, MONEY_SCALE,
};
pub use alphabet::{Alphabet, AlphabetKind};
pub use key::{Permutation, Plugboard, RotorKey, CLASSIC_PLUGBOARD, KEY_FORMAT_VERSION};
pub use transaction::{Transaction, TransactionKind};
pub use transfer::{TransferReceipt, TransferState};
