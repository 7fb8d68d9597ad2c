//! Doctor service - ledger directory health checks

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::ports::{Cipher, Storage};
use crate::services::ledger::LedgerStore;

/// Doctor service for health checks
pub struct DoctorService;

impl DoctorService {
    /// Scan every ledger and key file known to `store`
    pub fn run_checks<C: Cipher, S: Storage>(
        store: &mut LedgerStore<C, S>,
        now: DateTime<Utc>,
    ) -> Result<DoctorResult> {
        let mut checks = BTreeMap::new();
        let identities = store.identities()?;

        // Every ledger must have a key, decrypt, belong to its identity and
        // hold a non-negative balance
        let mut unreadable = Vec::new();
        let mut fingerprints: HashMap<String, Vec<String>> = HashMap::new();
        for identity in &identities {
            match store.load(identity, now) {
                Ok(_) => {
                    if let Some(fp) = store.key_fingerprint(identity) {
                        fingerprints.entry(fp).or_default().push(identity.clone());
                    }
                }
                Err(e) => unreadable.push(json!({
                    "identity": identity,
                    "kind": e.kind(),
                    "message": e.to_string(),
                })),
            }
        }
        checks.insert("ledgers_readable".to_string(), CheckResult {
            status: if unreadable.is_empty() { "pass" } else { "error" }.to_string(),
            message: if unreadable.is_empty() {
                format!("All {} ledger(s) decrypt and parse", identities.len())
            } else {
                format!("{} of {} ledger(s) cannot be read", unreadable.len(), identities.len())
            },
            details: if unreadable.is_empty() { None } else { Some(unreadable) },
        });

        // Cached ciphertext must decrypt back to the cached record
        let mut diverged = Vec::new();
        for identity in &identities {
            if store.cached(identity).is_some() && !store.verify(identity)? {
                diverged.push(json!({ "identity": identity }));
            }
        }
        checks.insert("ciphertext_consistency".to_string(), CheckResult {
            status: if diverged.is_empty() { "pass" } else { "error" }.to_string(),
            message: if diverged.is_empty() {
                "Stored ciphertext matches every loaded ledger".to_string()
            } else {
                format!("{} ledger(s) do not round-trip through their key", diverged.len())
            },
            details: if diverged.is_empty() { None } else { Some(diverged) },
        });

        // Keys are never shared between accounts
        let shared: Vec<serde_json::Value> = fingerprints
            .values()
            .filter(|owners| owners.len() > 1)
            .map(|owners| json!({ "identities": owners }))
            .collect();
        checks.insert("unique_keys".to_string(), CheckResult {
            status: if shared.is_empty() { "pass" } else { "warning" }.to_string(),
            message: if shared.is_empty() {
                "Every account has its own key".to_string()
            } else {
                format!("{} key(s) are shared by several accounts", shared.len())
            },
            details: if shared.is_empty() { None } else { Some(shared) },
        });

        // Key files without a ledger
        let layout = store.layout().clone();
        let orphans: Vec<serde_json::Value> = store
            .storage()
            .list(layout.key_dir())?
            .iter()
            .filter_map(|name| layout.identity_from_key_name(name))
            .filter(|identity| !identities.contains(identity))
            .map(|identity| {
                let key = layout.key_name(&identity);
                json!({ "identity": identity, "key": key })
            })
            .collect();
        checks.insert("orphan_keys".to_string(), CheckResult {
            status: if orphans.is_empty() { "pass" } else { "warning" }.to_string(),
            message: if orphans.is_empty() {
                "No orphaned key files".to_string()
            } else {
                format!("{} key file(s) have no ledger", orphans.len())
            },
            details: if orphans.is_empty() { None } else { Some(orphans) },
        });

        let passed = checks.values().filter(|c| c.status == "pass").count() as i64;
        let warnings = checks.values().filter(|c| c.status == "warning").count() as i64;
        let errors = checks.values().filter(|c| c.status == "error").count() as i64;

        Ok(DoctorResult {
            accounts: identities.len(),
            checks,
            summary: DoctorSummary { passed, warnings, errors },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub accounts: usize,
    pub checks: BTreeMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

impl DoctorResult {
    pub fn is_healthy(&self) -> bool {
        self.summary.errors == 0
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}
