//! Storage port - named blobs under one ledger root
//!
//! Names are `/`-separated paths relative to the root, e.g.
//! `encrypted_alice.txt` or `keys/alice.json`.

use crate::domain::result::Result;

pub trait Storage {
    /// Read a blob, `None` if it does not exist
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Replace a blob so readers see either the old or the new contents,
    /// never a truncated file
    fn write_atomic(&self, name: &str, contents: &[u8]) -> Result<()>;

    /// Delete a blob; deleting a missing blob is not an error
    fn remove(&self, name: &str) -> Result<()>;

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.read(name)?.is_some())
    }

    /// File names directly inside `dir` (`""` for the root), sorted
    fn list(&self, dir: &str) -> Result<Vec<String>>;
}
