//! Cipher alphabets

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Punctuation appended to `A`..`Z` in the standard alphabet
const STANDARD_PUNCTUATION: &str = ",.!/?#$%^&*()-_=+";

/// Which symbol set a key was generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphabetKind {
    /// Uppercase letters plus a fixed punctuation set (43 symbols)
    #[default]
    Standard,
    /// Every printable ASCII character, space through `~` (95 symbols)
    Printable,
}

impl AlphabetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlphabetKind::Standard => "standard",
            AlphabetKind::Printable => "printable",
        }
    }

    /// Build the alphabet for this variant
    pub fn alphabet(&self) -> Alphabet {
        let symbols: Vec<char> = match self {
            AlphabetKind::Standard => ('A'..='Z').chain(STANDARD_PUNCTUATION.chars()).collect(),
            AlphabetKind::Printable => (' '..='~').collect(),
        };
        Alphabet::from_distinct(*self, symbols)
    }
}

impl fmt::Display for AlphabetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlphabetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(AlphabetKind::Standard),
            "printable" => Ok(AlphabetKind::Printable),
            other => Err(Error::Config(format!("unknown alphabet: {}", other))),
        }
    }
}

/// Ordered set of distinct symbols the cipher operates over
///
/// Membership and position agree both ways: `symbol(index_of(c)) == c` for
/// every member `c`.
#[derive(Debug, Clone)]
pub struct Alphabet {
    kind: AlphabetKind,
    symbols: Vec<char>,
    positions: HashMap<char, usize>,
}

impl Alphabet {
    fn from_distinct(kind: AlphabetKind, symbols: Vec<char>) -> Self {
        let positions = symbols.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self {
            kind,
            symbols,
            positions,
        }
    }

    pub fn kind(&self) -> AlphabetKind {
        self.kind
    }

    /// Number of symbols (N)
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.positions.contains_key(&symbol)
    }

    /// Position of a symbol, `None` for symbols outside the alphabet
    pub fn index_of(&self, symbol: char) -> Option<usize> {
        self.positions.get(&symbol).copied()
    }

    /// Symbol at a position; callers only pass positions below `len()`
    pub fn symbol(&self, index: usize) -> char {
        self.symbols[index]
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_alphabet_matches_legacy_set() {
        let alphabet = AlphabetKind::Standard.alphabet();
        assert_eq!(alphabet.len(), 43);
        assert_eq!(alphabet.symbol(0), 'A');
        assert_eq!(alphabet.symbol(25), 'Z');
        assert_eq!(alphabet.symbol(26), ',');
        assert_eq!(alphabet.symbol(42), '+');
        assert!(!alphabet.contains('a'));
        assert!(!alphabet.contains('1'));
        assert!(!alphabet.contains(';'));
        assert!(!alphabet.contains(':'));
    }

    #[test]
    fn test_printable_alphabet_covers_ascii_range() {
        let alphabet = AlphabetKind::Printable.alphabet();
        assert_eq!(alphabet.len(), 95);
        assert!(alphabet.contains(' '));
        assert!(alphabet.contains('~'));
        assert!(alphabet.contains(';'));
        assert!(!alphabet.contains('\n'));
        assert!(!alphabet.contains('é'));
    }

    #[test]
    fn test_index_and_symbol_agree() {
        for kind in [AlphabetKind::Standard, AlphabetKind::Printable] {
            let alphabet = kind.alphabet();
            for (i, &c) in alphabet.symbols().iter().enumerate() {
                assert_eq!(alphabet.index_of(c), Some(i));
                assert_eq!(alphabet.symbol(i), c);
            }
        }
    }

    #[test]
    fn test_alphabet_kind_parsing() {
        assert_eq!("standard".parse::<AlphabetKind>().unwrap(), AlphabetKind::Standard);
        assert_eq!(" Printable ".parse::<AlphabetKind>().unwrap(), AlphabetKind::Printable);
        assert!("greek".parse::<AlphabetKind>().is_err());
    }
}
