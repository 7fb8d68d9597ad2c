//! Transfer coordinator - debit one ledger, credit another
//!
//! The two saves are not atomic. When the credit cannot be saved, the source
//! debit is reversed with a rollback entry; when that reversal cannot be
//! saved either, the ledgers are left inconsistent and reported as such.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{
    validate_amount, validate_note, AccountRecord, Transaction, TransactionKind, TransferReceipt,
    TransferState,
};
use crate::ports::{Cipher, Storage};
use crate::services::ledger::LedgerStore;
use crate::services::logging::{events, LogEvent, LoggingService};

/// Runs one transfer against a ledger store
pub struct TransferCoordinator<'a, C: Cipher, S: Storage> {
    store: &'a mut LedgerStore<C, S>,
    now: DateTime<Utc>,
    daily_rate: Decimal,
    logger: Option<&'a LoggingService>,
}

impl<'a, C: Cipher, S: Storage> TransferCoordinator<'a, C, S> {
    pub fn new(store: &'a mut LedgerStore<C, S>, now: DateTime<Utc>, daily_rate: Decimal) -> Self {
        Self {
            store,
            now,
            daily_rate,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Option<&'a LoggingService>) -> Self {
        self.logger = logger;
        self
    }

    /// Move `amount` from `source` to `target`.
    ///
    /// Nothing is written unless the source can cover the amount and the
    /// target exists. The returned receipt ends in `Credited`; the
    /// compensation outcomes are returned as `PartialFailure` and
    /// `LedgerInconsistent` errors.
    pub fn run(
        &mut self,
        source: &str,
        target: &str,
        amount: Decimal,
        note: Option<&str>,
    ) -> Result<TransferReceipt> {
        if source == target {
            return Err(Error::validation("cannot transfer to the same account"));
        }
        validate_note(note)?;

        let mut source_record = self.store.current(source, self.now)?;
        self.accrue(&mut source_record)?;

        validate_amount(amount)?;
        if amount > source_record.balance() {
            return Err(Error::InsufficientFunds {
                balance: source_record.balance(),
                requested: amount,
            });
        }

        let mut target_record = match self.store.load(target, self.now) {
            Ok(record) => record,
            Err(Error::NotFound(_)) => return Err(Error::TargetNotFound(target.to_string())),
            Err(e) => return Err(e),
        };
        self.accrue(&mut target_record)?;

        let mut receipt = TransferReceipt::new(source, target, amount, self.now);

        source_record.debit(amount)?;
        let out = TransactionKind::TransferOut {
            target: target.to_string(),
        };
        source_record.record(self.entry(out, amount, note));
        self.store.save(&source_record)?;
        receipt.advance(TransferState::Debited)?;

        let incoming = TransactionKind::TransferIn {
            source: source.to_string(),
        };
        let cause = match self.credit(&mut target_record, incoming, amount, note) {
            Ok(()) => {
                receipt.advance(TransferState::Credited)?;
                return Ok(receipt);
            }
            Err(e) => e.to_string(),
        };

        let rollback = TransactionKind::Rollback {
            target: target.to_string(),
        };
        match self.credit(&mut source_record, rollback, amount, note) {
            Ok(()) => {
                receipt.advance(TransferState::CompensationApplied)?;
                Err(Error::PartialFailure {
                    transfer_id: receipt.id,
                    target: target.to_string(),
                    cause,
                })
            }
            Err(rollback_error) => {
                receipt.advance(TransferState::CompensationFailed)?;
                Err(Error::LedgerInconsistent {
                    transfer_id: receipt.id,
                    source_identity: source.to_string(),
                    target: target.to_string(),
                    cause,
                    rollback_cause: rollback_error.to_string(),
                })
            }
        }
    }

    /// Credit, record and save one side
    fn credit(
        &mut self,
        record: &mut AccountRecord,
        kind: TransactionKind,
        amount: Decimal,
        note: Option<&str>,
    ) -> Result<()> {
        record.credit(amount)?;
        record.record(self.entry(kind, amount, note));
        self.store.save(record)
    }

    fn accrue(&mut self, record: &mut AccountRecord) -> Result<()> {
        let accrual = self.store.accrue(record, self.now, self.daily_rate)?;
        if !accrual.is_empty() {
            if let Some(logger) = self.logger {
                let _ = logger.log(LogEvent::new(events::INTEREST_ACCRUED).with_command("transfer"));
            }
        }
        Ok(())
    }

    fn entry(&self, kind: TransactionKind, amount: Decimal, note: Option<&str>) -> String {
        Transaction::new(kind, amount, self.now).with_note(note).to_entry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStorage, RotorCipher};
    use crate::services::ledger::LedgerLayout;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn rate() -> Decimal {
        Decimal::new(225, 4)
    }

    fn setup() -> LedgerStore<RotorCipher, MemoryStorage> {
        let mut store =
            LedgerStore::new(RotorCipher::default(), MemoryStorage::new(), LedgerLayout::default());
        for (identity, balance) in [("alice", 100), ("bob", 10)] {
            let record =
                AccountRecord::new(identity, "Secret1!", Decimal::new(balance, 0), now()).unwrap();
            store.create(&record).unwrap();
        }
        store
    }

    #[test]
    fn test_transfer_moves_money_and_records_both_sides() {
        let mut store = setup();
        let receipt = TransferCoordinator::new(&mut store, now(), rate())
            .run("alice", "bob", Decimal::new(40, 0), Some("lunch"))
            .unwrap();

        assert_eq!(receipt.state, TransferState::Credited);
        assert_eq!(
            receipt.trail,
            vec![TransferState::Pending, TransferState::Debited, TransferState::Credited]
        );
        let alice = store.cached("alice").unwrap();
        let bob = store.cached("bob").unwrap();
        assert_eq!(alice.balance(), Decimal::new(60, 0));
        assert_eq!(bob.balance(), Decimal::new(50, 0));
        assert!(alice.history()[0].starts_with("Transfer to bob $40.00 at "));
        assert!(alice.history()[0].ends_with("(lunch)"));
        assert!(bob.history()[0].starts_with("Transfer from alice $40.00 at "));
    }

    #[test]
    fn test_missing_target_mutates_nothing() {
        let mut store = setup();
        let err = TransferCoordinator::new(&mut store, now(), rate())
            .run("alice", "ghost", Decimal::new(40, 0), None)
            .unwrap_err();
        assert!(matches!(err, Error::TargetNotFound(ref t) if t == "ghost"));
        assert_eq!(err.kind(), "target_not_found");
        assert_eq!(store.cached("alice").unwrap().balance(), Decimal::new(100, 0));
        assert!(store.cached("alice").unwrap().history().is_empty());

        // A missing source stays a plain NotFound
        let err = TransferCoordinator::new(&mut store, now(), rate())
            .run("ghost", "alice", Decimal::new(40, 0), None)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_overdraft_and_bad_amounts_are_rejected() {
        let mut store = setup();
        let mut coordinator = TransferCoordinator::new(&mut store, now(), rate());
        assert!(matches!(
            coordinator.run("alice", "bob", Decimal::new(101, 0), None),
            Err(Error::InsufficientFunds { .. })
        ));
        assert!(matches!(
            coordinator.run("alice", "bob", Decimal::ZERO, None),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            coordinator.run("alice", "alice", Decimal::ONE, None),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_failed_credit_is_compensated() {
        let mut store = setup();
        store.storage().fail_writes_to("encrypted_bob.txt").unwrap();

        let err = TransferCoordinator::new(&mut store, now(), rate())
            .run("alice", "bob", Decimal::new(40, 0), None)
            .unwrap_err();
        assert!(matches!(err, Error::PartialFailure { .. }));

        let alice = store.cached("alice").unwrap();
        assert_eq!(alice.balance(), Decimal::new(100, 0));
        assert_eq!(alice.history().len(), 2);
        assert!(alice.history()[1].starts_with("Rollback of transfer to bob $40.00"));
        assert_eq!(store.cached("bob").unwrap().balance(), Decimal::new(10, 0));
    }

    #[test]
    fn test_failed_compensation_is_inconsistent() {
        let mut store = setup();
        store.storage().fail_writes_to("encrypted_bob.txt").unwrap();
        // The debit save goes through, the rollback save does not
        store.storage().fail_writes_to_after("encrypted_alice.txt", 1).unwrap();

        let err = TransferCoordinator::new(&mut store, now(), rate())
            .run("alice", "bob", Decimal::new(40, 0), None)
            .unwrap_err();
        assert!(matches!(err, Error::LedgerInconsistent { .. }));
        assert_eq!(err.kind(), "ledger_inconsistent");

        // Disk and cache still agree on the debited source
        assert_eq!(store.cached("alice").unwrap().balance(), Decimal::new(60, 0));
        store.forget("alice");
        assert_eq!(store.load("alice", now()).unwrap().balance(), Decimal::new(60, 0));
    }

    #[test]
    fn test_accrues_both_sides_before_moving_money() {
        let mut store = setup();
        let later = now() + chrono::Duration::days(1);
        TransferCoordinator::new(&mut store, later, rate())
            .run("alice", "bob", Decimal::new(40, 0), None)
            .unwrap();
        // 100 * 1.0225 - 40, and 10.225 rounds half-to-even to 10.22 before + 40
        assert_eq!(store.cached("alice").unwrap().balance(), Decimal::new(6225, 2));
        assert_eq!(store.cached("bob").unwrap().balance(), Decimal::new(5022, 2));
    }
}
