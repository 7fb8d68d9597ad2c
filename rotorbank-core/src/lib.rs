//! Rotorbank Core - encrypted account ledgers
//!
//! This crate implements the ledger engine following hexagonal architecture:
//!
//! - **domain**: Core entities (alphabets, rotor keys, account records, transfers)
//! - **ports**: Trait definitions for external dependencies (Cipher, Storage, Clock)
//! - **services**: Business logic orchestration (ledger store, bank, transfers, doctor, logging)
//! - **adapters**: Concrete implementations (rotor cipher, filesystem, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};

use anyhow::Result;

use adapters::{FsStorage, RotorCipher};
use config::Config;
use ports::{Clock, SystemClock};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    parse_amount, AccountRecord, AlphabetKind, RotorKey, TransferReceipt, TransferState,
};
pub use services::{AccountHandle, Bank, DoctorResult};

/// Main context for Rotorbank operations
///
/// Holds the configuration and a bank over the ledger files in one data
/// directory. This is the entry point front ends use.
pub struct RotorbankContext {
    pub config: Config,
    pub bank: Bank<RotorCipher, FsStorage, SystemClock>,
    data_dir: PathBuf,
}

impl RotorbankContext {
    /// Open the data directory, creating it if needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let storage = FsStorage::new(data_dir)?;
        let store = LedgerStore::new(config.cipher(), storage, config.layout()?);
        let bank = Bank::new(store, SystemClock, config.daily_interest_rate);

        Ok(Self {
            config,
            bank,
            data_dir: data_dir.to_path_buf(),
        })
    }

    /// Record bank events in the given log
    pub fn with_logger(mut self, logger: LoggingService) -> Self {
        self.bank = self.bank.with_logger(logger);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Run health checks over every ledger in the data directory
    pub fn doctor(&mut self) -> Result<DoctorResult> {
        let now = self.bank.clock().now();
        DoctorService::run_checks(self.bank.store_mut(), now)
    }
}
