//! Bank service - the account operations
//!
//! Every operation that reads or changes a balance first brings the account's
//! interest up to date (persisting it when a day or more was applied), then
//! validates, then changes a copy of the record and saves it. A failed save
//! leaves both disk and the store's cache at the previous state.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::{FsStorage, RotorCipher};
use crate::domain::result::{Error, Result};
use crate::domain::{
    validate_amount, validate_credential, validate_identity, validate_note, AccountRecord,
    Transaction, TransactionKind, TransferReceipt,
};
use crate::ports::{Cipher, Clock, Storage, SystemClock};
use crate::services::ledger::LedgerStore;
use crate::services::logging::{events, LogEvent, LoggingService};
use crate::services::transfer::TransferCoordinator;

/// Proof of a successful login, bound to one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountHandle {
    identity: String,
}

impl AccountHandle {
    fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

/// Account operations over a ledger store
pub struct Bank<C: Cipher = RotorCipher, S: Storage = FsStorage, K: Clock = SystemClock> {
    store: LedgerStore<C, S>,
    clock: K,
    daily_rate: Decimal,
    logger: Option<LoggingService>,
}

impl<C: Cipher, S: Storage, K: Clock> Bank<C, S, K> {
    pub fn new(store: LedgerStore<C, S>, clock: K, daily_rate: Decimal) -> Self {
        Self {
            store,
            clock,
            daily_rate,
            logger: None,
        }
    }

    /// Record events in the given log
    pub fn with_logger(mut self, logger: LoggingService) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn store(&self) -> &LedgerStore<C, S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LedgerStore<C, S> {
        &mut self.store
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn daily_rate(&self) -> Decimal {
        self.daily_rate
    }

    pub fn logger(&self) -> Option<&LoggingService> {
        self.logger.as_ref()
    }

    /// Open a new account with an opening balance
    pub fn register(
        &mut self,
        identity: &str,
        credential: &str,
        initial_balance: Decimal,
    ) -> Result<AccountHandle> {
        validate_identity(identity)?;
        validate_credential(credential)?;
        if self.store.exists(identity)? {
            return Err(Error::AlreadyExists(identity.to_string()));
        }

        let now = self.clock.now();
        let mut record = AccountRecord::new(identity, credential, initial_balance, now)?;
        record.record(Transaction::new(TransactionKind::Opened, initial_balance, now).to_entry());

        if let Err(e) = self.store.create(&record) {
            self.log_failure(events::SAVE_FAILED, "register", &e);
            return Err(e);
        }
        self.log(LogEvent::new(events::ACCOUNT_REGISTERED).with_command("register"));
        Ok(AccountHandle::new(identity))
    }

    /// Check a credential against the ledger on disk
    pub fn login(&mut self, identity: &str, credential: &str) -> Result<AccountHandle> {
        validate_identity(identity)?;
        let record = self.store.load(identity, self.clock.now())?;
        if !record.verify_credential(credential) {
            self.log(LogEvent::new(events::LOGIN_FAILED).with_command("login"));
            return Err(Error::Auth(identity.to_string()));
        }
        Ok(AccountHandle::new(identity))
    }

    /// Add money; returns the new balance
    pub fn deposit(
        &mut self,
        handle: &AccountHandle,
        amount: Decimal,
        note: Option<&str>,
    ) -> Result<Decimal> {
        let mut record = self.accrued(handle, "deposit")?;
        validate_amount(amount)?;
        validate_note(note)?;

        record.credit(amount)?;
        record.record(self.entry(TransactionKind::Deposit, amount, note));
        self.commit(&record, "deposit")?;
        Ok(record.balance())
    }

    /// Take money out; returns the new balance
    pub fn withdraw(
        &mut self,
        handle: &AccountHandle,
        amount: Decimal,
        note: Option<&str>,
    ) -> Result<Decimal> {
        let mut record = self.accrued(handle, "withdraw")?;
        validate_amount(amount)?;
        validate_note(note)?;

        record.debit(amount)?;
        record.record(self.entry(TransactionKind::Withdraw, amount, note));
        self.commit(&record, "withdraw")?;
        Ok(record.balance())
    }

    /// Move money to another account
    pub fn transfer(
        &mut self,
        handle: &AccountHandle,
        target: &str,
        amount: Decimal,
        note: Option<&str>,
    ) -> Result<TransferReceipt> {
        let now = self.clock.now();
        let result = TransferCoordinator::new(&mut self.store, now, self.daily_rate)
            .with_logger(self.logger.as_ref())
            .run(handle.identity(), target, amount, note);

        match &result {
            Ok(receipt) => self.log(
                LogEvent::new(events::TRANSFER_COMPLETED)
                    .with_command("transfer")
                    .with_transfer_state(receipt.state.as_str()),
            ),
            Err(e @ Error::PartialFailure { .. }) => self.log(
                LogEvent::new(events::TRANSFER_COMPENSATED)
                    .with_command("transfer")
                    .with_transfer_state("compensation_applied")
                    .with_error(e.to_string()),
            ),
            Err(e @ Error::LedgerInconsistent { .. }) => self.log(
                LogEvent::new(events::LEDGER_INCONSISTENT)
                    .with_command("transfer")
                    .with_transfer_state("compensation_failed")
                    .with_error(e.to_string()),
            ),
            Err(e @ Error::Io(_)) => self.log_failure(events::SAVE_FAILED, "transfer", e),
            Err(_) => {}
        }
        result
    }

    /// Current balance, with interest brought up to date
    pub fn get_balance(&mut self, handle: &AccountHandle) -> Result<Decimal> {
        Ok(self.accrued(handle, "balance")?.balance())
    }

    /// History entries, oldest first
    pub fn get_history(&mut self, handle: &AccountHandle) -> Result<Vec<String>> {
        let record = self.store.current(handle.identity(), self.clock.now())?;
        Ok(record.history().to_vec())
    }

    pub fn change_credential(&mut self, handle: &AccountHandle, new_credential: &str) -> Result<()> {
        let mut record = self.store.current(handle.identity(), self.clock.now())?;
        record.set_credential(new_credential)?;
        self.commit(&record, "passwd")
    }

    /// The handle's record with interest applied and persisted
    fn accrued(&mut self, handle: &AccountHandle, command: &str) -> Result<AccountRecord> {
        let now = self.clock.now();
        let mut record = self.store.current(handle.identity(), now)?;
        let accrual = match self.store.accrue(&mut record, now, self.daily_rate) {
            Ok(accrual) => accrual,
            Err(e) => {
                let event = match &e {
                    Error::Io(_) => events::SAVE_FAILED,
                    _ => events::ACCRUAL_FAILED,
                };
                self.log_failure(event, command, &e);
                return Err(e);
            }
        };
        if !accrual.is_empty() {
            self.log(LogEvent::new(events::INTEREST_ACCRUED).with_command(command));
        }
        Ok(record)
    }

    fn commit(&mut self, record: &AccountRecord, command: &str) -> Result<()> {
        self.store.save(record).map_err(|e| {
            self.log_failure(events::SAVE_FAILED, command, &e);
            e
        })
    }

    fn entry(&self, kind: TransactionKind, amount: Decimal, note: Option<&str>) -> String {
        Transaction::new(kind, amount, self.clock.now())
            .with_note(note)
            .to_entry()
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event);
        }
    }

    fn log_failure(&self, event: &str, command: &str, error: &Error) {
        self.log(
            LogEvent::new(event)
                .with_command(command)
                .with_error(error.to_string())
                .with_error_details(error.kind()),
        );
    }
}
