//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Rotor cipher for the Cipher port
//! - Local filesystem (atomic temp-file writes) for the Storage port
//! - In-memory storage and a manual clock for embedding and tests

pub mod fs;
pub mod memory;
pub mod rotor;

pub use fs::FsStorage;
pub use memory::{ManualClock, MemoryStorage};
pub use rotor::RotorCipher;
