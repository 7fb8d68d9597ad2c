//! Configuration management
//!
//! Settings live in settings.json in the data directory:
//! ```json
//! {
//!   "ledger": {
//!     "dailyInterestRate": "0.0225",
//!     "filenameTemplate": "encrypted_{identity}.txt",
//!     "alphabet": "standard",
//!     "plugboardPairs": null
//!   }
//! }
//! ```
//! Sections and fields this crate does not know about are kept on save.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::adapters::RotorCipher;
use crate::domain::AlphabetKind;
use crate::services::ledger::{LedgerLayout, DEFAULT_FILENAME_TEMPLATE};

pub const SETTINGS_FILE: &str = "settings.json";

pub const ENV_DAILY_RATE: &str = "ROTORBANK_DAILY_RATE";
pub const ENV_ALPHABET: &str = "ROTORBANK_ALPHABET";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    ledger: LedgerSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    daily_interest_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filename_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alphabet: Option<AlphabetKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plugboard_pairs: Option<usize>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Ledger engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub daily_interest_rate: Decimal,
    pub filename_template: String,
    pub alphabet: AlphabetKind,
    /// Random plugboard pairs for new keys; `None` uses the classic pairs
    pub plugboard_pairs: Option<usize>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // 2.25% per day
            daily_interest_rate: Decimal::new(225, 4),
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            alphabet: AlphabetKind::default(),
            plugboard_pairs: None,
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory, then apply environment overrides
    ///
    /// A missing settings file means defaults. A settings file that exists
    /// but cannot be parsed or holds invalid values is an error.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings in {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let defaults = Config::default();
        let rate_text = std::env::var(ENV_DAILY_RATE)
            .ok()
            .or_else(|| raw.ledger.daily_interest_rate.clone());
        let daily_interest_rate = match rate_text {
            Some(text) => Decimal::from_str(text.trim())
                .with_context(|| format!("Invalid daily interest rate: {:?}", text))?,
            None => defaults.daily_interest_rate,
        };

        let alphabet = match std::env::var(ENV_ALPHABET).ok() {
            Some(name) => AlphabetKind::from_str(&name)?,
            None => raw.ledger.alphabet.unwrap_or(defaults.alphabet),
        };

        let config = Self {
            daily_interest_rate,
            filename_template: raw
                .ledger
                .filename_template
                .clone()
                .unwrap_or(defaults.filename_template),
            alphabet,
            plugboard_pairs: raw.ledger.plugboard_pairs,
            _raw_settings: raw,
        };
        config.validate()?;
        Ok(config)
    }

    /// Save config to the data directory, preserving settings we don't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        self.validate()?;
        let settings_path = data_dir.join(SETTINGS_FILE);

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_else(|_| self._raw_settings.clone())
        } else {
            self._raw_settings.clone()
        };

        settings.ledger.daily_interest_rate = Some(self.daily_interest_rate.to_string());
        settings.ledger.filename_template = Some(self.filename_template.clone());
        settings.ledger.alphabet = Some(self.alphabet);
        settings.ledger.plugboard_pairs = self.plugboard_pairs;

        std::fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Check ranges and the filename template
    pub fn validate(&self) -> Result<()> {
        if self.daily_interest_rate < Decimal::ZERO || self.daily_interest_rate >= Decimal::ONE {
            bail!(
                "Daily interest rate must be at least 0 and below 1, got {}",
                self.daily_interest_rate
            );
        }
        self.layout()?;
        if let Some(pairs) = self.plugboard_pairs {
            let max = self.alphabet.alphabet().len() / 2;
            if pairs > max {
                bail!(
                    "The {} alphabet allows at most {} plugboard pairs, got {}",
                    self.alphabet,
                    max,
                    pairs
                );
            }
        }
        Ok(())
    }

    /// File layout for ledgers and keys
    pub fn layout(&self) -> Result<LedgerLayout> {
        Ok(LedgerLayout::new(self.filename_template.clone())?)
    }

    /// Cipher used for new keys
    pub fn cipher(&self) -> RotorCipher {
        let cipher = RotorCipher::new(self.alphabet);
        match self.plugboard_pairs {
            Some(pairs) => cipher.with_random_plugboard(pairs),
            None => cipher,
        }
    }
}
