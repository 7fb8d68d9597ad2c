//! Cipher port
//!
//! The ledger store only needs to generate keys and run a keyed transform
//! over text. Whichever scheme sits behind this trait, one pass from a reset
//! key must undo another pass from the same reset key.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Per-account key state for a [`Cipher`]
pub trait CipherKey: Clone + Serialize + DeserializeOwned {
    /// Return the mutable stream position to its starting value
    fn reset(&mut self);

    /// Stable identifier of the immutable key material
    fn fingerprint(&self) -> String;
}

/// A stateful, self-inverse text transform
pub trait Cipher {
    type Key: CipherKey;

    /// Scheme name recorded in logs and health checks
    fn name(&self) -> &str;

    /// Produce fresh key material with the stream position at its start
    fn generate_key(&self) -> Self::Key;

    /// Transform one symbol, advancing the key's stream position when the
    /// symbol is part of the cipher's alphabet
    fn transform(&self, symbol: char, key: &mut Self::Key) -> char;

    /// Transform a sequence, continuing from the key's current position
    fn transform_sequence(&self, text: &str, key: &mut Self::Key) -> String {
        text.chars().map(|c| self.transform(c, key)).collect()
    }

    /// Reset the key, then transform. Both encryption and decryption go
    /// through here so every pass starts from the same position.
    fn transform_from_start(&self, text: &str, key: &mut Self::Key) -> String {
        key.reset();
        self.transform_sequence(text, key)
    }
}
