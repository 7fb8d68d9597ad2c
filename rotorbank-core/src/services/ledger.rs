//! Ledger store - encrypted per-account ledger files
//!
//! Each identity owns two blobs: the ledger file named by the filename
//! template (`<identity>:<ciphertext>`) and its key at `keys/<identity>.json`.
//! The store keeps the last loaded or saved state of every account it has
//! touched; a cached entry always matches what is on disk.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::adapters::{FsStorage, RotorCipher};
use crate::domain::result::{Error, Result};
use crate::domain::{validate_identity, Accrual, AccountRecord};
use crate::ports::{Cipher, CipherKey, Storage};

/// Placeholder substituted with the identity in the filename template
pub const IDENTITY_PLACEHOLDER: &str = "{identity}";

pub const DEFAULT_FILENAME_TEMPLATE: &str = "encrypted_{identity}.txt";

const KEY_DIR: &str = "keys";

/// Where an identity's ledger and key live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLayout {
    template: String,
}

impl LedgerLayout {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(IDENTITY_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "filename template must contain {}: {:?}",
                IDENTITY_PLACEHOLDER, template
            )));
        }
        if template.contains('/') || template.contains('\\') {
            return Err(Error::Config(format!(
                "filename template cannot contain a path separator: {:?}",
                template
            )));
        }
        Ok(Self { template })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn ledger_name(&self, identity: &str) -> String {
        self.template.replace(IDENTITY_PLACEHOLDER, identity)
    }

    pub fn key_name(&self, identity: &str) -> String {
        format!("{}/{}.json", KEY_DIR, identity)
    }

    pub fn key_dir(&self) -> &'static str {
        KEY_DIR
    }

    /// Recover the identity from a ledger file name, if the name fits the template
    pub fn identity_from_ledger_name(&self, name: &str) -> Option<String> {
        let (prefix, suffix) = self.template.split_once(IDENTITY_PLACEHOLDER)?;
        let identity = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
        validate_identity(identity).ok()?;
        Some(identity.to_string())
    }

    /// Recover the identity from a key file name
    pub fn identity_from_key_name(&self, name: &str) -> Option<String> {
        let identity = name.strip_suffix(".json")?;
        validate_identity(identity).ok()?;
        Some(identity.to_string())
    }
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self {
            template: DEFAULT_FILENAME_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoreEntry<K> {
    key: K,
    record: AccountRecord,
    ciphertext: String,
}

/// Loads and saves account records through a cipher
pub struct LedgerStore<C: Cipher = RotorCipher, S: Storage = FsStorage> {
    cipher: C,
    storage: S,
    layout: LedgerLayout,
    entries: HashMap<String, StoreEntry<C::Key>>,
}

impl<C: Cipher, S: Storage> LedgerStore<C, S> {
    pub fn new(cipher: C, storage: S, layout: LedgerLayout) -> Self {
        Self {
            cipher,
            storage,
            layout,
            entries: HashMap::new(),
        }
    }

    pub fn cipher(&self) -> &C {
        &self.cipher
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn layout(&self) -> &LedgerLayout {
        &self.layout
    }

    /// Whether a ledger file exists for `identity`
    pub fn exists(&self, identity: &str) -> Result<bool> {
        validate_identity(identity)?;
        self.storage.exists(&self.layout.ledger_name(identity))
    }

    /// Persist a brand new account: generate its key, write the key, then
    /// the ledger. If the ledger cannot be written the key is removed again.
    pub fn create(&mut self, record: &AccountRecord) -> Result<()> {
        let identity = record.identity();
        if self.exists(identity)? {
            return Err(Error::AlreadyExists(identity.to_string()));
        }

        let key = self.cipher.generate_key();
        let key_name = self.layout.key_name(identity);
        self.storage.write_atomic(&key_name, &serde_json::to_vec_pretty(&key)?)?;

        if let Err(e) = self.write_record(key, record) {
            let _ = self.storage.remove(&key_name);
            return Err(e);
        }
        Ok(())
    }

    /// Read, decrypt and parse the ledger for `identity` from disk,
    /// replacing any cached state
    pub fn load(&mut self, identity: &str, now: DateTime<Utc>) -> Result<AccountRecord> {
        validate_identity(identity)?;
        let bytes = self
            .storage
            .read(&self.layout.ledger_name(identity))?
            .ok_or_else(|| Error::not_found(identity))?;
        let contents = String::from_utf8(bytes)
            .map_err(|_| Error::corrupt(format!("ledger for {} is not valid UTF-8", identity)))?;

        let (stored_identity, ciphertext) = contents
            .split_once(':')
            .ok_or_else(|| Error::corrupt(format!("ledger for {} has no identity prefix", identity)))?;
        if stored_identity != identity {
            return Err(Error::corrupt(format!(
                "ledger for {} belongs to {:?}",
                identity, stored_identity
            )));
        }

        let mut key = self.load_key(identity)?;
        let plaintext = self.cipher.transform_from_start(ciphertext, &mut key);
        let record = AccountRecord::parse(identity, &plaintext, now)?;

        self.entries.insert(
            identity.to_string(),
            StoreEntry {
                key,
                record: record.clone(),
                ciphertext: ciphertext.to_string(),
            },
        );
        Ok(record)
    }

    fn load_key(&self, identity: &str) -> Result<C::Key> {
        let bytes = self
            .storage
            .read(&self.layout.key_name(identity))?
            .ok_or_else(|| Error::corrupt(format!("no key for {}", identity)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::corrupt(format!("invalid key for {}: {}", identity, e)))
    }

    /// The cached record, or a fresh load if the account was not touched yet
    pub fn current(&mut self, identity: &str, now: DateTime<Utc>) -> Result<AccountRecord> {
        match self.entries.get(identity) {
            Some(entry) => Ok(entry.record.clone()),
            None => self.load(identity, now),
        }
    }

    /// Encrypt and atomically write `record`. The cache only changes once
    /// the write succeeded.
    pub fn save(&mut self, record: &AccountRecord) -> Result<()> {
        let key = match self.entries.get(record.identity()) {
            Some(entry) => entry.key.clone(),
            None => self.load_key(record.identity())?,
        };
        self.write_record(key, record)
    }

    fn write_record(&mut self, mut key: C::Key, record: &AccountRecord) -> Result<()> {
        let identity = record.identity();
        let ciphertext = self.cipher.transform_from_start(&record.compose(), &mut key);
        let contents = format!("{}:{}", identity, ciphertext);
        self.storage
            .write_atomic(&self.layout.ledger_name(identity), contents.as_bytes())?;

        key.reset();
        self.entries.insert(
            identity.to_string(),
            StoreEntry {
                key,
                record: record.clone(),
                ciphertext,
            },
        );
        Ok(())
    }

    /// Accrue interest on `record` and persist it when at least one day was applied.
    /// On a failed save `record` is left as it was.
    pub fn accrue(
        &mut self,
        record: &mut AccountRecord,
        now: DateTime<Utc>,
        daily_rate: Decimal,
    ) -> Result<Accrual> {
        let mut accrued = record.clone();
        let accrual = accrued.accrue_interest(now, daily_rate)?;
        if !accrual.is_empty() {
            self.save(&accrued)?;
            *record = accrued;
        }
        Ok(accrual)
    }

    pub fn cached(&self, identity: &str) -> Option<&AccountRecord> {
        self.entries.get(identity).map(|e| &e.record)
    }

    pub fn cached_ciphertext(&self, identity: &str) -> Option<&str> {
        self.entries.get(identity).map(|e| e.ciphertext.as_str())
    }

    /// Fingerprint of the key in use for a cached account
    pub fn key_fingerprint(&self, identity: &str) -> Option<String> {
        self.entries.get(identity).map(|e| e.key.fingerprint())
    }

    /// Check that the cached ciphertext decrypts to the cached record
    ///
    /// Records are compared after parsing, so ledgers in an older layout
    /// (no `Accrued:` segment, unpadded balance) still verify.
    pub fn verify(&self, identity: &str) -> Result<bool> {
        let entry = self
            .entries
            .get(identity)
            .ok_or_else(|| Error::not_found(identity))?;
        let mut key = entry.key.clone();
        let plaintext = self.cipher.transform_from_start(&entry.ciphertext, &mut key);
        match AccountRecord::parse(identity, &plaintext, entry.record.last_accrual_time()) {
            Ok(decrypted) => Ok(decrypted == entry.record),
            Err(_) => Ok(false),
        }
    }

    /// Drop cached state so the next access reads from disk
    pub fn forget(&mut self, identity: &str) {
        self.entries.remove(identity);
    }

    /// Identities with a ledger file, sorted
    pub fn identities(&self) -> Result<Vec<String>> {
        Ok(self
            .storage
            .list("")?
            .iter()
            .filter_map(|name| self.layout.identity_from_ledger_name(name))
            .collect())
    }
}
