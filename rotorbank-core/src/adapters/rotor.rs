//! Rotor cipher adapter
//!
//! Two stepping rotors, an involutive reflector and a plugboard, over one of
//! the [`AlphabetKind`] symbol sets. Symbols outside the alphabet pass
//! through untouched and do not move the rotors.
//!
//! Because the reflector is an involution, the whole per-symbol mapping is
//! the reflector conjugated by plugboard and rotors, so it is its own inverse
//! at every rotor position.

use rand::Rng;

use crate::domain::{AlphabetKind, Permutation, Plugboard, RotorKey};
use crate::ports::{Cipher, CipherKey};

/// Rotor cipher configured for new keys
#[derive(Debug, Clone, Default)]
pub struct RotorCipher {
    alphabet: AlphabetKind,
    /// Random plugboard pair count; `None` uses the classic fixed pairs
    plugboard_pairs: Option<usize>,
}

impl RotorCipher {
    pub fn new(alphabet: AlphabetKind) -> Self {
        Self {
            alphabet,
            plugboard_pairs: None,
        }
    }

    pub fn with_random_plugboard(mut self, pairs: usize) -> Self {
        self.plugboard_pairs = Some(pairs);
        self
    }

    pub fn alphabet(&self) -> AlphabetKind {
        self.alphabet
    }

    /// Generate a key from the given randomness source
    pub fn generate_key_with<R: Rng + ?Sized>(&self, rng: &mut R) -> RotorKey {
        let alphabet = self.alphabet.alphabet();
        let n = alphabet.len();
        let rotor1 = Permutation::random(n, rng);
        let rotor2 = Permutation::random(n, rng);
        let reflector = Permutation::random_involution(n, rng);
        let plugboard = match self.plugboard_pairs {
            Some(pairs) => Plugboard::random(n, pairs.min(n / 2), rng),
            None => Plugboard::classic(&alphabet),
        };
        RotorKey::assemble(alphabet, rotor1, rotor2, reflector, plugboard)
    }
}

impl CipherKey for RotorKey {
    fn reset(&mut self) {
        RotorKey::reset(self)
    }

    fn fingerprint(&self) -> String {
        RotorKey::fingerprint(self)
    }
}

impl Cipher for RotorCipher {
    type Key = RotorKey;

    fn name(&self) -> &str {
        "rotor"
    }

    fn generate_key(&self) -> RotorKey {
        self.generate_key_with(&mut rand::thread_rng())
    }

    fn transform(&self, symbol: char, key: &mut RotorKey) -> char {
        let alphabet = key.alphabet();
        let Some(position) = alphabet.index_of(symbol) else {
            return symbol;
        };
        let n = alphabet.len();
        let (o1, o2) = (key.rotor1_offset, key.rotor2_offset);

        let mut p = key.plugboard().swap(position);
        p = key.rotor1().forward((p + o1) % n);
        p = key.rotor2().forward((p + o2) % n);
        p = key.reflector().forward(p);
        p = (key.rotor2().inverse(p) + n - o2) % n;
        p = (key.rotor1().inverse(p) + n - o1) % n;
        p = key.plugboard().swap(p);

        let out = alphabet.symbol(p);
        key.step();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded_key(kind: AlphabetKind, seed: u64) -> RotorKey {
        RotorCipher::new(kind).generate_key_with(&mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_round_trip_from_reset_key() {
        let cipher = RotorCipher::default();
        let mut key = cipher.generate_key();
        let text = "BALANCE: $100.00; PASSWORD: SECRET1!; DEPOSIT $100.00 (GUI)";

        let encrypted = cipher.transform_from_start(text, &mut key);
        assert_ne!(encrypted, text);
        let decrypted = cipher.transform_from_start(&encrypted, &mut key);
        assert_eq!(decrypted, text);
    }

    #[test]
    fn test_round_trip_many_keys_and_lengths() {
        for seed in 0..20 {
            let cipher = RotorCipher::new(AlphabetKind::Printable).with_random_plugboard(5);
            let mut key = cipher.generate_key_with(&mut StdRng::seed_from_u64(seed));
            let text: String = (0..(seed as usize * 97 + 13))
                .map(|i| char::from(b' ' + (i * 31 % 95) as u8))
                .collect();
            let encrypted = cipher.transform_from_start(&text, &mut key);
            assert_eq!(cipher.transform_from_start(&encrypted, &mut key), text);
        }
    }

    #[test]
    fn test_symbol_is_self_inverse_at_every_position() {
        let cipher = RotorCipher::default();
        let mut key = seeded_key(AlphabetKind::Standard, 3);
        let symbols: Vec<char> = key.alphabet().symbols().to_vec();
        let n = symbols.len();
        for o1 in 0..n {
            for o2 in [0, 1, n / 2, n - 1] {
                for &symbol in &symbols {
                    key.rotor1_offset = o1;
                    key.rotor2_offset = o2;
                    let once = cipher.transform(symbol, &mut key);
                    key.rotor1_offset = o1;
                    key.rotor2_offset = o2;
                    assert_eq!(cipher.transform(once, &mut key), symbol);
                }
            }
        }
    }

    #[test]
    fn test_non_alphabet_symbols_pass_through_without_stepping() {
        let cipher = RotorCipher::default();
        let mut key = seeded_key(AlphabetKind::Standard, 11);
        key.reset();
        let text = "lowercase 0123 ;:\n é";
        assert_eq!(cipher.transform_sequence(text, &mut key), text);
        assert_eq!((key.rotor1_offset, key.rotor2_offset), (0, 0));
    }

    #[test]
    fn test_full_cycle_steps_second_rotor_once() {
        let cipher = RotorCipher::default();
        let mut key = seeded_key(AlphabetKind::Standard, 5);
        let text: String = key.alphabet().symbols().iter().collect();
        key.reset();
        cipher.transform_sequence(&text, &mut key);
        assert_eq!(key.rotor1_offset, 0);
        assert_eq!(key.rotor2_offset, 1);
    }

    #[test]
    fn test_stream_depends_on_position() {
        let cipher = RotorCipher::default();
        let mut key = seeded_key(AlphabetKind::Standard, 9);
        let encrypted = cipher.transform_from_start(&"A".repeat(43), &mut key);
        let distinct: std::collections::HashSet<char> = encrypted.chars().collect();
        assert!(distinct.len() > 1, "rotor stepping should vary the substitution");
    }

    #[test]
    fn test_decrypt_without_reset_is_garbage() {
        let cipher = RotorCipher::default();
        let mut key = seeded_key(AlphabetKind::Standard, 21);
        let text = "THE QUICK BROWN FOX";
        let encrypted = cipher.transform_from_start(text, &mut key);
        // Key left where the encryption finished
        let wrong = cipher.transform_sequence(&encrypted, &mut key);
        assert_ne!(wrong, text);
    }

    #[test]
    fn test_generated_key_shape() {
        let key = seeded_key(AlphabetKind::Standard, 1);
        assert!(key.reflector().is_involution());
        assert_eq!(key.plugboard().pair_count(), 3);
        assert_eq!((key.rotor1_offset, key.rotor2_offset), (0, 0));

        let random = RotorCipher::new(AlphabetKind::Standard)
            .with_random_plugboard(100)
            .generate_key_with(&mut StdRng::seed_from_u64(1));
        assert_eq!(random.plugboard().pair_count(), 21);
    }
}
