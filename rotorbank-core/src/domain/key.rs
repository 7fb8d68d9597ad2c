//! Rotor key domain model
//!
//! A key is everything needed to reproduce one account's cipher stream: two
//! rotors, a reflector, a plugboard and the two rotation offsets. The
//! permutations never change after generation; the offsets advance with every
//! symbol the cipher processes and must be reset before each pass.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::alphabet::{Alphabet, AlphabetKind};
use super::result::{Error, Result};

/// Current key file format version
pub const KEY_FORMAT_VERSION: u32 = 1;

/// Plugboard pairs used when no random plugboard is configured
pub const CLASSIC_PLUGBOARD: &[(char, char)] = &[('A', '#'), ('B', '$'), ('C', '&')];

/// A bijection over alphabet positions with its inverse precomputed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    forward: Vec<usize>,
    inverse: Vec<usize>,
}

impl Permutation {
    /// Build from a forward table, rejecting anything that is not a bijection
    pub fn from_forward(forward: Vec<usize>) -> Result<Self> {
        let n = forward.len();
        let mut inverse = vec![usize::MAX; n];
        for (position, &target) in forward.iter().enumerate() {
            if target >= n || inverse[target] != usize::MAX {
                return Err(Error::corrupt("permutation is not a bijection"));
            }
            inverse[target] = position;
        }
        Ok(Self { forward, inverse })
    }

    /// Uniformly random permutation of `n` positions
    pub fn random<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let mut forward: Vec<usize> = (0..n).collect();
        forward.shuffle(rng);
        let mut inverse = vec![0; n];
        for (position, &target) in forward.iter().enumerate() {
            inverse[target] = position;
        }
        Self { forward, inverse }
    }

    /// Random involution: positions are paired off and swapped. With an odd
    /// `n` exactly one position maps to itself.
    pub fn random_involution<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        let mut forward: Vec<usize> = (0..n).collect();
        for pair in order.chunks_exact(2) {
            forward[pair[0]] = pair[1];
            forward[pair[1]] = pair[0];
        }
        let inverse = forward.clone();
        Self { forward, inverse }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn forward(&self, position: usize) -> usize {
        self.forward[position]
    }

    pub fn inverse(&self, position: usize) -> usize {
        self.inverse[position]
    }

    pub fn is_involution(&self) -> bool {
        self.forward == self.inverse
    }

    fn encode(&self, alphabet: &Alphabet) -> String {
        self.forward.iter().map(|&i| alphabet.symbol(i)).collect()
    }

    fn decode(text: &str, alphabet: &Alphabet, what: &str) -> Result<Self> {
        let forward = text
            .chars()
            .map(|c| {
                alphabet
                    .index_of(c)
                    .ok_or_else(|| Error::corrupt(format!("{} contains a symbol outside the alphabet", what)))
            })
            .collect::<Result<Vec<_>>>()?;
        if forward.len() != alphabet.len() {
            return Err(Error::corrupt(format!(
                "{} has {} symbols, alphabet has {}",
                what,
                forward.len(),
                alphabet.len()
            )));
        }
        Self::from_forward(forward).map_err(|_| Error::corrupt(format!("{} repeats a symbol", what)))
    }
}

/// Symmetric swap table applied before and after the rotors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugboard {
    pairs: Vec<(usize, usize)>,
    table: Vec<usize>,
}

impl Plugboard {
    /// Build from disjoint position pairs over an alphabet of size `n`
    pub fn from_pairs(n: usize, pairs: Vec<(usize, usize)>) -> Result<Self> {
        let mut table: Vec<usize> = (0..n).collect();
        for &(a, b) in &pairs {
            if a >= n || b >= n || a == b || table[a] != a || table[b] != b {
                return Err(Error::corrupt("plugboard pairs must be disjoint swaps"));
            }
            table[a] = b;
            table[b] = a;
        }
        Ok(Self { pairs, table })
    }

    /// The fixed legacy pairs `A<->#`, `B<->$`, `C<->&`
    pub fn classic(alphabet: &Alphabet) -> Self {
        let pairs = CLASSIC_PLUGBOARD
            .iter()
            .filter_map(|&(a, b)| Some((alphabet.index_of(a)?, alphabet.index_of(b)?)))
            .collect();
        // The classic pairs are disjoint and both alphabets contain them.
        Self::from_pairs(alphabet.len(), pairs).unwrap_or_else(|_| Self::identity(alphabet.len()))
    }

    /// `count` random disjoint pairs
    pub fn random<R: Rng + ?Sized>(n: usize, count: usize, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        let pairs: Vec<(usize, usize)> = order
            .chunks_exact(2)
            .take(count)
            .map(|pair| (pair[0], pair[1]))
            .collect();
        let mut table: Vec<usize> = (0..n).collect();
        for &(a, b) in &pairs {
            table[a] = b;
            table[b] = a;
        }
        Self { pairs, table }
    }

    fn identity(n: usize) -> Self {
        Self {
            pairs: Vec::new(),
            table: (0..n).collect(),
        }
    }

    pub fn swap(&self, position: usize) -> usize {
        self.table[position]
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    fn encode(&self, alphabet: &Alphabet) -> Vec<String> {
        self.pairs
            .iter()
            .map(|&(a, b)| [alphabet.symbol(a), alphabet.symbol(b)].iter().collect())
            .collect()
    }

    fn decode(pairs: &[String], alphabet: &Alphabet) -> Result<Self> {
        let positions = pairs
            .iter()
            .map(|pair| {
                let symbols: Vec<char> = pair.chars().collect();
                match symbols.as_slice() {
                    [a, b] => match (alphabet.index_of(*a), alphabet.index_of(*b)) {
                        (Some(a), Some(b)) => Ok((a, b)),
                        _ => Err(Error::corrupt("plugboard pair outside the alphabet")),
                    },
                    _ => Err(Error::corrupt("plugboard pair must be two symbols")),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_pairs(alphabet.len(), positions)
    }
}

/// Serializable state of one account's rotor cipher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "KeyFile", into = "KeyFile")]
pub struct RotorKey {
    alphabet: Alphabet,
    rotor1: Permutation,
    rotor2: Permutation,
    reflector: Permutation,
    plugboard: Plugboard,
    pub rotor1_offset: usize,
    pub rotor2_offset: usize,
}

impl RotorKey {
    /// Assemble a key from parts, checking that every table fits the alphabet
    /// and that the reflector is its own inverse.
    pub fn new(
        alphabet: Alphabet,
        rotor1: Permutation,
        rotor2: Permutation,
        reflector: Permutation,
        plugboard: Plugboard,
    ) -> Result<Self> {
        let n = alphabet.len();
        if rotor1.len() != n || rotor2.len() != n || reflector.len() != n || plugboard.table.len() != n {
            return Err(Error::corrupt("key tables do not match the alphabet size"));
        }
        if !reflector.is_involution() {
            return Err(Error::corrupt("reflector is not an involution"));
        }
        Ok(Self::assemble(alphabet, rotor1, rotor2, reflector, plugboard))
    }

    /// Assemble freshly generated tables that are valid by construction
    pub(crate) fn assemble(
        alphabet: Alphabet,
        rotor1: Permutation,
        rotor2: Permutation,
        reflector: Permutation,
        plugboard: Plugboard,
    ) -> Self {
        Self {
            alphabet,
            rotor1,
            rotor2,
            reflector,
            plugboard,
            rotor1_offset: 0,
            rotor2_offset: 0,
        }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn rotor1(&self) -> &Permutation {
        &self.rotor1
    }

    pub fn rotor2(&self) -> &Permutation {
        &self.rotor2
    }

    pub fn reflector(&self) -> &Permutation {
        &self.reflector
    }

    pub fn plugboard(&self) -> &Plugboard {
        &self.plugboard
    }

    /// Return both rotors to their starting position
    pub fn reset(&mut self) {
        self.rotor1_offset = 0;
        self.rotor2_offset = 0;
    }

    /// Advance the rotors by one symbol (odometer carry into rotor 2)
    pub fn step(&mut self) {
        let n = self.alphabet.len();
        self.rotor1_offset = (self.rotor1_offset + 1) % n;
        if self.rotor1_offset == 0 {
            self.rotor2_offset = (self.rotor2_offset + 1) % n;
        }
    }

    /// SHA-256 over the immutable tables, hex encoded
    pub fn fingerprint(&self) -> String {
        let file = KeyFile::from(self.clone());
        file.digest()
    }
}

/// On-disk key representation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyFile {
    version: u32,
    alphabet: AlphabetKind,
    rotor1: String,
    rotor2: String,
    reflector: String,
    #[serde(default)]
    plugboard: Vec<String>,
    #[serde(default)]
    rotor1_offset: usize,
    #[serde(default)]
    rotor2_offset: usize,
    fingerprint: String,
}

impl KeyFile {
    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        hasher.update(self.alphabet.as_str().as_bytes());
        for table in [&self.rotor1, &self.rotor2, &self.reflector] {
            hasher.update(b"|");
            hasher.update(table.as_bytes());
        }
        hasher.update(b"|");
        hasher.update(self.plugboard.join(",").as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl From<RotorKey> for KeyFile {
    fn from(key: RotorKey) -> Self {
        let mut file = KeyFile {
            version: KEY_FORMAT_VERSION,
            alphabet: key.alphabet.kind(),
            rotor1: key.rotor1.encode(&key.alphabet),
            rotor2: key.rotor2.encode(&key.alphabet),
            reflector: key.reflector.encode(&key.alphabet),
            plugboard: key.plugboard.encode(&key.alphabet),
            rotor1_offset: key.rotor1_offset,
            rotor2_offset: key.rotor2_offset,
            fingerprint: String::new(),
        };
        file.fingerprint = file.digest();
        file
    }
}

impl TryFrom<KeyFile> for RotorKey {
    type Error = Error;

    fn try_from(file: KeyFile) -> Result<Self> {
        if file.version != KEY_FORMAT_VERSION {
            return Err(Error::corrupt(format!("unsupported key version {}", file.version)));
        }
        if file.digest() != file.fingerprint {
            return Err(Error::corrupt("key fingerprint mismatch"));
        }
        let alphabet = file.alphabet.alphabet();
        let rotor1 = Permutation::decode(&file.rotor1, &alphabet, "rotor1")?;
        let rotor2 = Permutation::decode(&file.rotor2, &alphabet, "rotor2")?;
        let reflector = Permutation::decode(&file.reflector, &alphabet, "reflector")?;
        let plugboard = Plugboard::decode(&file.plugboard, &alphabet)?;
        let n = alphabet.len();

        let mut key = RotorKey::new(alphabet, rotor1, rotor2, reflector, plugboard)?;
        key.rotor1_offset = file.rotor1_offset % n;
        key.rotor2_offset = file.rotor2_offset % n;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_key() -> RotorKey {
        let mut rng = StdRng::seed_from_u64(7);
        let alphabet = AlphabetKind::Standard.alphabet();
        let n = alphabet.len();
        let plugboard = Plugboard::classic(&alphabet);
        RotorKey::new(
            alphabet,
            Permutation::random(n, &mut rng),
            Permutation::random(n, &mut rng),
            Permutation::random_involution(n, &mut rng),
            plugboard,
        )
        .unwrap()
    }

    #[test]
    fn test_permutation_rejects_duplicates() {
        assert!(Permutation::from_forward(vec![0, 1, 1]).is_err());
        assert!(Permutation::from_forward(vec![0, 3, 1]).is_err());
        let p = Permutation::from_forward(vec![2, 0, 1]).unwrap();
        assert_eq!(p.inverse(2), 0);
        assert_eq!(p.inverse(0), 1);
    }

    #[test]
    fn test_random_involution_has_single_fixed_point_for_odd_size() {
        let mut rng = StdRng::seed_from_u64(42);
        let reflector = Permutation::random_involution(43, &mut rng);
        assert!(reflector.is_involution());
        let fixed = (0..43).filter(|&i| reflector.forward(i) == i).count();
        assert_eq!(fixed, 1);
    }

    #[test]
    fn test_classic_plugboard_swaps_both_ways() {
        let alphabet = AlphabetKind::Standard.alphabet();
        let plugboard = Plugboard::classic(&alphabet);
        let a = alphabet.index_of('A').unwrap();
        let hash = alphabet.index_of('#').unwrap();
        let z = alphabet.index_of('Z').unwrap();
        assert_eq!(plugboard.swap(a), hash);
        assert_eq!(plugboard.swap(hash), a);
        assert_eq!(plugboard.swap(z), z);
        assert_eq!(plugboard.pair_count(), 3);
    }

    #[test]
    fn test_plugboard_rejects_overlapping_pairs() {
        assert!(Plugboard::from_pairs(5, vec![(0, 1), (1, 2)]).is_err());
        assert!(Plugboard::from_pairs(5, vec![(3, 3)]).is_err());
    }

    #[test]
    fn test_key_rejects_non_involutive_reflector() {
        let alphabet = AlphabetKind::Standard.alphabet();
        let n = alphabet.len();
        let mut rotated: Vec<usize> = (1..n).collect();
        rotated.push(0);
        let reflector = Permutation::from_forward(rotated).unwrap();
        let plugboard = Plugboard::classic(&alphabet);
        let identity = Permutation::from_forward((0..n).collect()).unwrap();
        let result = RotorKey::new(alphabet, identity.clone(), identity, reflector, plugboard);
        assert!(matches!(result, Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_step_carries_into_second_rotor() {
        let mut key = sample_key();
        key.rotor1_offset = 42;
        key.step();
        assert_eq!(key.rotor1_offset, 0);
        assert_eq!(key.rotor2_offset, 1);
        key.reset();
        assert_eq!((key.rotor1_offset, key.rotor2_offset), (0, 0));
    }

    #[test]
    fn test_key_json_survives_reload() {
        let key = sample_key();
        let json = serde_json::to_string(&key).unwrap();
        let loaded: RotorKey = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.rotor1(), key.rotor1());
        assert_eq!(loaded.rotor2(), key.rotor2());
        assert_eq!(loaded.reflector(), key.reflector());
        assert_eq!(loaded.plugboard(), key.plugboard());
        assert_eq!(loaded.fingerprint(), key.fingerprint());
    }

    #[test]
    fn test_tampered_key_file_is_rejected() {
        let key = sample_key();
        let mut value: serde_json::Value = serde_json::to_value(&key).unwrap();
        let rotor: String = value["rotor1"].as_str().unwrap().chars().rev().collect();
        value["rotor1"] = serde_json::Value::from(rotor);
        let result: std::result::Result<RotorKey, _> = serde_json::from_value(value);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("fingerprint"), "unexpected error: {}", err);
    }
}
