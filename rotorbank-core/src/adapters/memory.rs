//! In-memory adapters
//!
//! A storage backend and a clock that live entirely in memory. Used for
//! embedding a throwaway ledger and for exercising failure paths: writes to
//! chosen names can be made to fail on demand.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::domain::result::{Error, Result};
use crate::ports::{Clock, Storage};

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, Vec<u8>>,
    /// Remaining successful writes per name before writes start failing
    failing: HashMap<String, usize>,
    fail_all: bool,
}

/// Storage held in a map, with write failure injection
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, format!("Lock poisoned: {}", e))))
    }

    /// Make every subsequent write or removal of `name` fail
    pub fn fail_writes_to(&self, name: &str) -> Result<()> {
        self.fail_writes_to_after(name, 0)
    }

    /// Let `successes` more writes of `name` through, then fail the rest
    pub fn fail_writes_to_after(&self, name: &str, successes: usize) -> Result<()> {
        self.lock()?.failing.insert(name.to_string(), successes);
        Ok(())
    }

    /// Make every subsequent write fail, whatever the name
    pub fn fail_all_writes(&self) -> Result<()> {
        self.lock()?.fail_all = true;
        Ok(())
    }

    /// Clear all injected failures
    pub fn heal(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.failing.clear();
        state.fail_all = false;
        Ok(())
    }

    /// Overwrite a blob bypassing failure injection
    pub fn put(&self, name: &str, contents: &[u8]) -> Result<()> {
        self.lock()?.files.insert(name.to_string(), contents.to_vec());
        Ok(())
    }

    fn check_writable(state: &mut MemoryState, name: &str) -> Result<()> {
        let failing = match state.failing.get_mut(name) {
            Some(0) => true,
            Some(remaining) => {
                *remaining -= 1;
                false
            }
            None => false,
        };
        if state.fail_all || failing {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("injected write failure for {}", name),
            )));
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.files.get(name).cloned())
    }

    fn write_atomic(&self, name: &str, contents: &[u8]) -> Result<()> {
        let mut state = self.lock()?;
        Self::check_writable(&mut state, name)?;
        state.files.insert(name.to_string(), contents.to_vec());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let mut state = self.lock()?;
        Self::check_writable(&mut state, name)?;
        state.files.remove(name);
        Ok(())
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir.trim_end_matches('/'))
        };
        let state = self.lock()?;
        Ok(state
            .files
            .keys()
            .filter_map(|name| name.strip_prefix(prefix.as_str()))
            .filter(|rest| !rest.contains('/'))
            .map(String::from)
            .collect())
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
    }
}
