//! Account ledger domain model
//!
//! An [`AccountRecord`] is the plaintext view of one ledger file. Its
//! canonical serialization is a `; `-joined list of segments:
//!
//! ```text
//! Balance: $100.00; Password: Secret1!; Accrued: 2024-03-01T12:00:00Z; Deposit $100.00 at ...
//! ```
//!
//! `balance:`, `password:` and `accrued:` segments (any case) are fields;
//! every other segment is a history entry, kept in order.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Identities name files, so they are restricted to a safe character set
pub const IDENTITY_PATTERN: &str = r"^[A-Za-z0-9_.-]{1,64}$";

/// Money is held to cents
pub const MONEY_SCALE: u32 = 2;

const SEGMENT_SEPARATOR: &str = "; ";

/// One account's ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    identity: String,
    credential: String,
    balance: Decimal,
    history: Vec<String>,
    last_accrual_time: DateTime<Utc>,
}

/// Outcome of a lazy interest accrual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Accrual {
    pub days: i64,
    pub interest: Decimal,
}

impl Accrual {
    pub fn none() -> Self {
        Self {
            days: 0,
            interest: Decimal::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days == 0
    }
}

impl AccountRecord {
    /// Create a fresh account; the accrual clock starts at `now`
    pub fn new(
        identity: impl Into<String>,
        credential: impl Into<String>,
        balance: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let identity = identity.into();
        let credential = credential.into();
        validate_identity(&identity)?;
        validate_credential(&credential)?;
        if balance < Decimal::ZERO {
            return Err(Error::invalid_amount("initial balance cannot be negative"));
        }
        if balance.normalize().scale() > MONEY_SCALE {
            return Err(Error::invalid_amount("initial balance has more than two decimal places"));
        }
        Ok(Self {
            identity,
            credential,
            balance: balance.round_dp(MONEY_SCALE),
            history: Vec::new(),
            last_accrual_time: now.trunc_subsecs(0),
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn last_accrual_time(&self) -> DateTime<Utc> {
        self.last_accrual_time
    }

    /// Check a presented credential against the stored one
    pub fn verify_credential(&self, candidate: &str) -> bool {
        self.credential == candidate
    }

    pub fn set_credential(&mut self, credential: impl Into<String>) -> Result<()> {
        let credential = credential.into();
        validate_credential(&credential)?;
        self.credential = credential;
        Ok(())
    }

    /// Append a history entry
    pub fn record(&mut self, entry: impl Into<String>) {
        self.history.push(entry.into());
    }

    /// Add a validated positive amount
    pub fn credit(&mut self, amount: Decimal) -> Result<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| Error::invalid_amount("amount overflows the balance"))?;
        Ok(())
    }

    /// Remove a validated positive amount, refusing to go below zero
    pub fn debit(&mut self, amount: Decimal) -> Result<()> {
        if amount > self.balance {
            return Err(Error::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Apply one compounding step per whole day elapsed since the last
    /// checkpoint. The checkpoint advances by exactly the days applied so a
    /// partial day carries over to the next accrual.
    ///
    /// A balance that would overflow is an error and leaves the record as it was.
    pub fn accrue_interest(&mut self, now: DateTime<Utc>, daily_rate: Decimal) -> Result<Accrual> {
        let days = (now - self.last_accrual_time).num_days();
        if days < 1 {
            return Ok(Accrual::none());
        }

        let factor = Decimal::ONE + daily_rate;
        let mut balance = self.balance;
        for _ in 0..days {
            balance = balance
                .checked_mul(factor)
                .map(|b| b.round_dp(MONEY_SCALE))
                .ok_or_else(|| {
                    Error::invalid_amount(format!(
                        "balance of {} overflows while accruing {} days of interest",
                        self.identity, days
                    ))
                })?;
        }

        let interest = balance - self.balance;
        self.balance = balance;
        self.last_accrual_time += Duration::days(days);
        Ok(Accrual { days, interest })
    }

    /// Canonical plaintext serialization
    pub fn compose(&self) -> String {
        let mut parts = vec![
            format!("Balance: ${:.2}", self.balance),
            format!("Password: {}", self.credential),
            format!(
                "Accrued: {}",
                self.last_accrual_time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            ),
        ];
        parts.extend(self.history.iter().cloned());
        parts.join(SEGMENT_SEPARATOR)
    }

    /// Parse a canonical serialization for `identity`.
    ///
    /// Ledgers written before the accrual checkpoint was persisted have no
    /// `Accrued:` segment; they start accruing from `loaded_at`.
    pub fn parse(identity: &str, text: &str, loaded_at: DateTime<Utc>) -> Result<Self> {
        let mut balance = None;
        let mut credential = None;
        let mut last_accrual_time = None;
        let mut history = Vec::new();

        for part in text.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let lower = part.to_lowercase();
            if lower.starts_with("balance:") {
                let digits: String = part
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                    .collect();
                let value: Decimal = digits
                    .parse()
                    .map_err(|_| Error::corrupt(format!("unreadable balance for {}", identity)))?;
                if value < Decimal::ZERO {
                    return Err(Error::corrupt(format!("negative balance for {}", identity)));
                }
                balance = Some(value);
            } else if lower.starts_with("password:") {
                let secret = part.split_once(':').map(|(_, s)| s.trim()).unwrap_or_default();
                credential = Some(secret.to_string());
            } else if lower.starts_with("accrued:") {
                let raw = part.split_once(':').map(|(_, s)| s.trim()).unwrap_or_default();
                let at = DateTime::parse_from_rfc3339(raw)
                    .map_err(|_| Error::corrupt(format!("unreadable accrual time for {}", identity)))?;
                last_accrual_time = Some(at.with_timezone(&Utc));
            } else {
                history.push(part.to_string());
            }
        }

        let balance = balance.ok_or_else(|| Error::corrupt(format!("no balance for {}", identity)))?;
        let credential = credential
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::corrupt(format!("no credential for {}", identity)))?;

        Ok(Self {
            identity: identity.to_string(),
            credential,
            balance,
            history,
            last_accrual_time: last_accrual_time.unwrap_or(loaded_at),
        })
    }
}

/// Identities must be usable as a file name component
pub fn validate_identity(identity: &str) -> Result<()> {
    static IDENTITY_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = IDENTITY_RE
        .get_or_init(|| Regex::new(IDENTITY_PATTERN).ok())
        .as_ref()
        .ok_or_else(|| Error::Config(format!("invalid identity pattern {}", IDENTITY_PATTERN)))?;
    if !re.is_match(identity) {
        return Err(Error::validation(format!(
            "identity must be 1-64 letters, digits, '.', '_' or '-': {:?}",
            identity
        )));
    }
    Ok(())
}

/// Credentials are stored as a ledger segment and must survive parsing
pub fn validate_credential(credential: &str) -> Result<()> {
    if credential.is_empty() {
        return Err(Error::validation("credential cannot be empty"));
    }
    if credential.trim() != credential {
        return Err(Error::validation("credential cannot start or end with whitespace"));
    }
    if credential.contains(&[';', '\n', '\r'][..]) {
        return Err(Error::validation("credential cannot contain ';' or line breaks"));
    }
    Ok(())
}

/// Notes become part of a history entry
pub fn validate_note(note: Option<&str>) -> Result<()> {
    if let Some(note) = note {
        if note.contains(&[';', '\n', '\r'][..]) {
            return Err(Error::validation("note cannot contain ';' or line breaks"));
        }
    }
    Ok(())
}

/// Parse user input as a positive amount of money with at most two decimals
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    let cleaned = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    let amount: Decimal = cleaned
        .parse()
        .map_err(|_| Error::invalid_amount(format!("not a number: {:?}", input)))?;
    validate_amount(amount)?;
    Ok(amount)
}

/// Amounts moved by an operation must be positive whole cents
pub fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::invalid_amount("amount must be greater than zero"));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(Error::invalid_amount("amount has more than two decimal places"));
    }
    Ok(())
}
