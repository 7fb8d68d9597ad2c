//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The ledger engine
//! depends only on these traits, not on concrete implementations.

mod cipher;
mod clock;
mod storage;

pub use cipher::{Cipher, CipherKey};
pub use clock::{Clock, SystemClock};
pub use storage::Storage;
