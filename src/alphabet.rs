use std::collections::BTreeSet;

use crate::Show;

/// Represents an alphabet where a symbol is just a single `char`. The symbols are kept
/// in sorted order, so iterating an alphabet is deterministic.
#[derive(Clone, Hash, PartialEq, Eq, Debug, PartialOrd, Ord, Default)]
pub struct Alphabet(BTreeSet<char>);

impl Alphabet {
    /// Creates a new alphabet from the given symbols, duplicates are ignored.
    pub fn new<I: IntoIterator<Item = char>>(symbols: I) -> Self {
        Self(symbols.into_iter().collect())
    }

    /// Returns the number of symbols.
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the alphabet has no symbols.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `symbol` belongs to the alphabet.
    pub fn contains(&self, symbol: char) -> bool {
        self.0.contains(&symbol)
    }

    /// Iterates over all symbols in ascending order.
    pub fn universe(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().copied()
    }

    /// Gives access to the underlying set of symbols.
    pub fn symbols(&self) -> &BTreeSet<char> {
        &self.0
    }
}

impl FromIterator<char> for Alphabet {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl From<&str> for Alphabet {
    fn from(value: &str) -> Self {
        value.chars().collect()
    }
}

impl From<BTreeSet<char>> for Alphabet {
    fn from(value: BTreeSet<char>) -> Self {
        Self(value)
    }
}

impl Show for Alphabet {
    fn show(&self) -> String {
        char::show_collection(self.0.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_from_str() {
        let alphabet = Alphabet::from("baab");
        assert_eq!(alphabet.size(), 2);
        assert_eq!(alphabet.universe().collect::<String>(), "ab");
        assert!(alphabet.contains('b'));
        assert!(!alphabet.contains('c'));
        assert_eq!(alphabet.show(), "\"ab\"");
    }
}
