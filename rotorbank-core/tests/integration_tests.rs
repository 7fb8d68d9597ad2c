//! Integration tests for rotorbank-core
//!
//! These tests drive the bank through the real filesystem adapter in a
//! temporary directory: ledger files, key files and the event log are all
//! real. Time is controlled with the manual clock where accrual matters.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::fs;
use std::path::Path;

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use rotorbank_core::adapters::{FsStorage, ManualClock, RotorCipher};
use rotorbank_core::domain::{AccountRecord, AlphabetKind, RotorKey};
use rotorbank_core::ports::{Cipher, Clock, Storage};
use rotorbank_core::services::{
    events, Bank, DoctorService, EntryPoint, LedgerLayout, LedgerStore, LoggingService,
};
use rotorbank_core::{Error, RotorbankContext};

// ============================================================================
// Test Helpers
// ============================================================================

type FsBank = Bank<RotorCipher, FsStorage, ManualClock>;

fn rate() -> Decimal {
    Decimal::new(225, 4)
}

fn start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

/// Bank over a temp directory with a clock pinned at `start()`
fn create_bank(dir: &Path) -> FsBank {
    let store = LedgerStore::new(
        RotorCipher::default(),
        FsStorage::new(dir).expect("Failed to open data directory"),
        LedgerLayout::default(),
    );
    Bank::new(store, ManualClock::new(start()), rate())
}

fn dollars(amount: i64) -> Decimal {
    Decimal::new(amount, 0)
}

/// Encrypt `plaintext` with the key stored for `identity` and write it as
/// that identity's ledger file
fn write_raw_ledger(dir: &Path, identity: &str, plaintext: &str) {
    let key_json = fs::read_to_string(dir.join("keys").join(format!("{}.json", identity))).unwrap();
    let mut key: RotorKey = serde_json::from_str(&key_json).unwrap();
    let ciphertext = RotorCipher::default().transform_from_start(plaintext, &mut key);
    fs::write(
        dir.join(format!("encrypted_{}.txt", identity)),
        format!("{}:{}", identity, ciphertext),
    )
    .unwrap();
}

// ============================================================================
// Account Scenarios
// ============================================================================

#[test]
fn test_alice_and_bob_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let mut bank = create_bank(temp_dir.path());

    let alice = bank.register("alice", "Secret1!", Decimal::ZERO).unwrap();
    assert_eq!(bank.deposit(&alice, dollars(100), None).unwrap(), dollars(100));
    assert_eq!(bank.get_balance(&alice).unwrap(), dollars(100));

    let err = bank.withdraw(&alice, dollars(150), None).unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds { .. }));
    assert_eq!(bank.get_balance(&alice).unwrap(), dollars(100));

    bank.register("bob", "hunter2", dollars(10)).unwrap();
    let alice_before = bank.get_history(&alice).unwrap().len();
    let bob = bank.login("bob", "hunter2").unwrap();
    let bob_before = bank.get_history(&bob).unwrap().len();

    let receipt = bank.transfer(&alice, "bob", dollars(40), None).unwrap();
    assert_eq!(receipt.state, rotorbank_core::TransferState::Credited);

    assert_eq!(bank.get_balance(&alice).unwrap(), dollars(60));
    assert_eq!(bank.get_balance(&bob).unwrap(), dollars(50));
    assert_eq!(bank.get_history(&alice).unwrap().len(), alice_before + 1);
    assert_eq!(bank.get_history(&bob).unwrap().len(), bob_before + 1);
}

#[test]
fn test_login_errors() {
    let temp_dir = TempDir::new().unwrap();
    let mut bank = create_bank(temp_dir.path());
    bank.register("alice", "Secret1!", Decimal::ZERO).unwrap();

    assert!(matches!(bank.login("alice", "wrongpw"), Err(Error::Auth(_))));
    assert!(matches!(bank.login("ghost", "x"), Err(Error::NotFound(_))));
    assert!(bank.login("alice", "Secret1!").is_ok());
}

#[test]
fn test_transfer_to_missing_target_changes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let mut bank = create_bank(temp_dir.path());
    let alice = bank.register("alice", "Secret1!", dollars(100)).unwrap();
    let before = fs::read(temp_dir.path().join("encrypted_alice.txt")).unwrap();

    let err = bank.transfer(&alice, "ghost", dollars(10), None).unwrap_err();
    assert!(matches!(err, Error::TargetNotFound(_)));
    assert_eq!(fs::read(temp_dir.path().join("encrypted_alice.txt")).unwrap(), before);
    assert_eq!(bank.get_balance(&alice).unwrap(), dollars(100));
}

// ============================================================================
// Invariants Over Operation Sequences
// ============================================================================

#[test]
fn test_balances_stay_non_negative_and_transfers_conserve_money() {
    let temp_dir = TempDir::new().unwrap();
    let mut bank = create_bank(temp_dir.path());
    let names = ["ann", "ben", "cat"];
    let handles: Vec<_> = names
        .iter()
        .map(|n| bank.register(n, "pw", dollars(50)).unwrap())
        .collect();

    let mut expected_total = dollars(150);
    for step in 0..60usize {
        let from = &handles[step % 3];
        let to = names[(step + 1) % 3];
        let amount = Decimal::new(((step * 37) % 9000 + 1) as i64, 2);
        match step % 4 {
            0 => {
                bank.deposit(from, amount, None).unwrap();
                expected_total += amount;
            }
            1 => {
                if bank.withdraw(from, amount, None).is_ok() {
                    expected_total -= amount;
                }
            }
            _ => match bank.transfer(from, to, amount, None) {
                Ok(_) | Err(Error::InsufficientFunds { .. }) => {}
                Err(e) => panic!("unexpected transfer error: {}", e),
            },
        }

        let mut total = Decimal::ZERO;
        for handle in &handles {
            let balance = bank.get_balance(handle).unwrap();
            assert!(balance >= Decimal::ZERO);
            total += balance;
        }
        assert_eq!(total, expected_total, "money leaked at step {}", step);
    }
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_persistence_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut bank = create_bank(temp_dir.path());
        let alice = bank.register("alice", "Secret1!", dollars(20)).unwrap();
        bank.deposit(&alice, Decimal::new(1234, 2), Some("gift")).unwrap();
    }

    let mut store = LedgerStore::new(
        RotorCipher::default(),
        FsStorage::new(temp_dir.path()).unwrap(),
        LedgerLayout::default(),
    );
    let first = store.load("alice", start()).unwrap();
    store.save(&first).unwrap();
    store.forget("alice");
    let second = store.load("alice", start()).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.balance(), Decimal::new(3234, 2));
    assert!(store.verify("alice").unwrap());
}

#[test]
fn test_ledger_file_layout_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let mut bank = create_bank(temp_dir.path());
    bank.register("alice", "CORRECTHORSEBATTERYSTAPLE", dollars(5)).unwrap();

    let ledger = fs::read_to_string(temp_dir.path().join("encrypted_alice.txt")).unwrap();
    assert!(ledger.starts_with("alice:"));
    assert!(!ledger.contains("CORRECTHORSEBATTERYSTAPLE"));

    let key: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(temp_dir.path().join("keys").join("alice.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(key["version"], 1);
    assert_eq!(key["alphabet"], "standard");
    assert_eq!(key["fingerprint"].as_str().unwrap().len(), 64);

    // Atomic writes leave no temp files behind
    let mut names: Vec<String> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["encrypted_alice.txt".to_string(), "keys".to_string()]);
}

#[test]
fn test_legacy_ledger_without_accrual_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    let mut bank = create_bank(temp_dir.path());
    bank.register("alice", "Secret1!", dollars(5)).unwrap();
    write_raw_ledger(
        temp_dir.path(),
        "alice",
        "Balance: $80.00; Password: Secret1!; Deposit $80.00 at 2020-01-01 10:00:00",
    );

    let mut store = LedgerStore::new(
        RotorCipher::default(),
        FsStorage::new(temp_dir.path()).unwrap(),
        LedgerLayout::default(),
    );
    let loaded_at = start() + Duration::days(400);
    let record = store.load("alice", loaded_at).unwrap();
    assert_eq!(record.balance(), dollars(80));
    assert_eq!(record.last_accrual_time(), loaded_at);
    assert_eq!(record.history().len(), 1);
}

#[test]
fn test_legacy_ledger_verifies_and_passes_doctor() {
    let temp_dir = TempDir::new().unwrap();
    let mut bank = create_bank(temp_dir.path());
    bank.register("alice", "Secret1!", dollars(5)).unwrap();
    write_raw_ledger(
        temp_dir.path(),
        "alice",
        "Balance: $80.0; Password: Secret1!; Deposit $80.00 at 2020-01-01 10:00:00",
    );

    let mut store = LedgerStore::new(
        RotorCipher::default(),
        FsStorage::new(temp_dir.path()).unwrap(),
        LedgerLayout::default(),
    );
    let record = store.load("alice", start()).unwrap();
    assert_eq!(record.balance(), dollars(80));
    assert!(store.verify("alice").unwrap());

    let report = DoctorService::run_checks(&mut store, start()).unwrap();
    assert!(report.is_healthy());
    assert_eq!(report.checks["ciphertext_consistency"].status, "pass");
}

// ============================================================================
// Corrupt Ledgers
// ============================================================================

#[test]
fn test_corrupt_ledgers_are_reported() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let mut bank = create_bank(dir);
    for name in ["alice", "bob", "carol", "dave"] {
        bank.register(name, "pw", dollars(1)).unwrap();
    }

    // Plaintext without a balance
    write_raw_ledger(dir, "alice", "Password: pw; Deposit $1.00 at x");
    // Ledger stored under another identity
    let bob = fs::read_to_string(dir.join("encrypted_bob.txt")).unwrap();
    fs::write(dir.join("encrypted_bob.txt"), bob.replacen("bob:", "eve:", 1)).unwrap();
    // Missing key
    fs::remove_file(dir.join("keys").join("carol.json")).unwrap();
    // Key edited by hand
    let key_path = dir.join("keys").join("dave.json");
    let mut key: serde_json::Value = serde_json::from_str(&fs::read_to_string(&key_path).unwrap()).unwrap();
    let rotor = key["rotor1"].as_str().unwrap().to_string();
    let swapped: String = rotor.chars().rev().collect();
    key["rotor1"] = serde_json::Value::from(swapped);
    fs::write(&key_path, serde_json::to_string(&key).unwrap()).unwrap();

    let mut store = LedgerStore::new(
        RotorCipher::default(),
        FsStorage::new(dir).unwrap(),
        LedgerLayout::default(),
    );
    for name in ["alice", "bob", "carol", "dave"] {
        let result = store.load(name, start());
        assert!(matches!(result, Err(Error::Corrupt(_))), "{} should be corrupt", name);
    }

    let mut context_store = LedgerStore::new(
        RotorCipher::default(),
        FsStorage::new(dir).unwrap(),
        LedgerLayout::default(),
    );
    let report = DoctorService::run_checks(&mut context_store, start()).unwrap();
    assert!(!report.is_healthy());
    assert_eq!(report.checks["ledgers_readable"].details.as_ref().unwrap().len(), 4);
}

// ============================================================================
// Interest Accrual
// ============================================================================

#[test]
fn test_interest_accrues_lazily_and_survives_reload() {
    let temp_dir = TempDir::new().unwrap();
    let mut bank = create_bank(temp_dir.path());
    let alice = bank.register("alice", "Secret1!", dollars(100)).unwrap();

    bank.clock().advance(Duration::days(3) + Duration::hours(6));
    // 100 -> 102.25 -> 104.55 -> 106.90 (rounded each day)
    assert_eq!(bank.get_balance(&alice).unwrap(), Decimal::new(10690, 2));

    let mut reopened = create_bank(temp_dir.path());
    reopened.clock().set(start() + Duration::days(3) + Duration::hours(20));
    let alice = reopened.login("alice", "Secret1!").unwrap();
    // Less than a day since the checkpoint: nothing more
    assert_eq!(reopened.get_balance(&alice).unwrap(), Decimal::new(10690, 2));

    reopened.clock().set(start() + Duration::days(4));
    assert_eq!(reopened.get_balance(&alice).unwrap(), Decimal::new(10931, 2));
}

#[test]
fn test_deposit_accrues_before_applying() {
    let temp_dir = TempDir::new().unwrap();
    let mut bank = create_bank(temp_dir.path());
    let alice = bank.register("alice", "Secret1!", dollars(100)).unwrap();

    bank.clock().advance(Duration::days(1));
    assert_eq!(
        bank.deposit(&alice, dollars(10), None).unwrap(),
        Decimal::new(11225, 2)
    );
    let record = AccountRecord::parse(
        "alice",
        &bank.store().cached("alice").unwrap().compose(),
        bank.clock().now(),
    )
    .unwrap();
    assert_eq!(record.last_accrual_time(), start() + Duration::days(1));
}

// ============================================================================
// Context, Configuration And Logging
// ============================================================================

#[test]
fn test_context_uses_settings_and_logs_events() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    fs::write(
        dir.join("settings.json"),
        r#"{"ledger": {"alphabet": "printable", "filenameTemplate": "{identity}.ledger"}}"#,
    )
    .unwrap();

    let logger = LoggingService::new(dir, EntryPoint::Embedded, "test").unwrap();
    let mut context = RotorbankContext::new(dir).unwrap().with_logger(logger);
    assert_eq!(context.config.alphabet, AlphabetKind::Printable);

    let alice = context.bank.register("alice", "lower case pw", dollars(3)).unwrap();
    assert!(context.bank.login("alice", "nope").is_err());
    assert!(dir.join("alice.ledger").is_file());
    assert_eq!(context.bank.get_history(&alice).unwrap().len(), 1);

    let logger = context.bank.logger().unwrap();
    let events_seen: Vec<String> = logger.get_recent(10).unwrap().into_iter().map(|e| e.event).collect();
    assert!(events_seen.contains(&events::ACCOUNT_REGISTERED.to_string()));
    assert!(events_seen.contains(&events::LOGIN_FAILED.to_string()));

    // Nothing sensitive reaches the log
    for entry in logger.get_recent(10).unwrap() {
        let text = serde_json::to_string(&entry).unwrap();
        assert!(!text.contains("lower case pw"));
    }

    let report = context.doctor().unwrap();
    assert!(report.is_healthy());
    assert_eq!(report.accounts, 1);
    assert!(context.bank.store().storage().exists("keys/alice.json").unwrap());
}
