use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use tracing::debug;

use crate::{alphabet::Alphabet, Show};

/// A natural class is a set of symbols (phonemes) that share some feature.
pub type NaturalClass = BTreeSet<char>;

/// A collection of natural classes over an alphabet that is closed under pairwise
/// intersection, never contains the empty class and contains the singleton class of
/// every alphabet symbol.
///
/// Natural classes serve as arc labels of [`crate::automaton::ClassAutomaton`]s. For the
/// complexity score, a label is given a probability proportional to its size; the
/// normalizing denominator is [`NaturalClassSet::labels_len`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalClassSet {
    alphabet: Alphabet,
    classes: BTreeSet<NaturalClass>,
    labels_len: usize,
}

impl NaturalClassSet {
    /// Builds the set from an alphabet and a seed collection of classes, by closing the seed
    /// under intersection and adding every alphabet singleton.
    pub fn new<A, I, C>(alphabet: A, seed: I) -> Self
    where
        A: Into<Alphabet>,
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = char>,
    {
        let alphabet = alphabet.into();
        let mut classes = closure(seed.into_iter().map(|c| c.into_iter().collect()));
        classes.extend(alphabet.universe().map(|sym| NaturalClass::from([sym])));

        // the fallback label is weighted as if it matched the entire alphabet
        let labels_len = classes.iter().map(|c| c.len()).sum::<usize>() + alphabet.size();
        debug!(
            "closed natural class set has {} classes over {} symbols",
            classes.len(),
            alphabet.size()
        );
        Self {
            alphabet,
            classes,
            labels_len,
        }
    }

    /// Builds the set induced by a map from feature names to the symbols carrying that
    /// feature. The alphabet consists of every symbol that carries some feature.
    pub fn from_features<K, C>(features: &BTreeMap<K, C>) -> Self
    where
        for<'a> &'a C: IntoIterator<Item = &'a char>,
    {
        let alphabet: Alphabet = features
            .values()
            .flat_map(|symbols| symbols.into_iter().copied())
            .collect();
        Self::new(
            alphabet,
            features
                .values()
                .map(|symbols| symbols.into_iter().copied().collect::<Vec<_>>()),
        )
    }

    /// The alphabet the classes are drawn from.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Sum of the sizes of all classes plus the size of the alphabet.
    pub fn labels_len(&self) -> usize {
        self.labels_len
    }

    /// Returns true if `class` is one of the natural classes.
    pub fn contains(&self, class: &NaturalClass) -> bool {
        self.classes.contains(class)
    }

    /// Number of classes, including the singletons.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if there are no classes at all, which only happens for an empty alphabet
    /// and an empty seed.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterates over all classes in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = &NaturalClass> + '_ {
        self.classes.iter()
    }

    /// Gives access to the underlying set of classes.
    pub fn classes(&self) -> &BTreeSet<NaturalClass> {
        &self.classes
    }
}

impl<'a> IntoIterator for &'a NaturalClassSet {
    type Item = &'a NaturalClass;
    type IntoIter = std::collections::btree_set::Iter<'a, NaturalClass>;

    fn into_iter(self) -> Self::IntoIter {
        self.classes.iter()
    }
}

impl Show for NaturalClassSet {
    fn show(&self) -> String {
        format!(
            "{{{}}}",
            self.classes
                .iter()
                .map(|class| class.iter().join(""))
                .join(", ")
        )
    }
}

/// Closes `seed` under pairwise intersection until a fixed point is reached and
/// removes the empty class.
pub fn closure<I: IntoIterator<Item = NaturalClass>>(seed: I) -> BTreeSet<NaturalClass> {
    let mut classes: BTreeSet<NaturalClass> = seed.into_iter().collect();
    loop {
        let current = classes.iter().cloned().collect_vec();
        let before = classes.len();
        for (i, left) in current.iter().enumerate() {
            for right in &current[i + 1..] {
                classes.insert(left.intersection(right).copied().collect());
            }
        }
        if classes.len() == before {
            break;
        }
    }
    classes.remove(&NaturalClass::new());
    classes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Vec<&'static str> {
        vec!["aeu", "ptkbdzsh", "ptkbd", "szh", "bdz", "ptksh", "ptbdsz"]
    }

    fn classes() -> NaturalClassSet {
        NaturalClassSet::new("aeuptkbdszh", seed().into_iter().map(|c| c.chars()))
    }

    fn class(symbols: &str) -> NaturalClass {
        symbols.chars().collect()
    }

    #[test]
    fn contains_seed_and_singletons() {
        let set = classes();
        for c in seed() {
            assert!(set.contains(&class(c)), "missing seed class {c}");
        }
        for sym in "aeuptkbdszh".chars() {
            assert!(set.contains(&NaturalClass::from([sym])));
        }
        assert!(!set.contains(&NaturalClass::new()));
    }

    #[test]
    fn contains_intersections() {
        let set = classes();
        for c in ["bd", "sh", "pts", "pt", "ptdb", "ptk", "sz"] {
            assert!(set.contains(&class(c)), "missing intersection {c}");
        }
        assert_eq!(set.len(), 25);
    }

    #[test]
    fn closed_under_intersection() {
        let set = classes();
        for left in &set {
            for right in &set {
                let meet: NaturalClass = left.intersection(right).copied().collect();
                assert!(meet.is_empty() || set.contains(&meet));
            }
        }
    }

    #[test]
    fn labels_len_counts_other() {
        let set = NaturalClassSet::new(
            "ptkbdgrszlmn",
            ["tpbdrzlnm", "nm", "bd"].map(|c| c.chars()),
        );
        // coronal, nasal, stop and twelve singletons plus the alphabet for the fallback
        assert_eq!(set.len(), 15);
        assert_eq!(set.labels_len(), 9 + 2 + 2 + 12 + 12);
    }

    #[test]
    fn natural_classes_from_features() {
        let features = BTreeMap::from([
            ("voice", class("bdz")),
            ("stop", class("ptbd")),
            ("fricative", class("sz")),
        ]);
        let set = NaturalClassSet::from_features(&features);
        assert_eq!(set.alphabet().size(), 6);
        assert!(set.contains(&class("bd")));
        assert!(set.contains(&class("z")));
        assert!(set.contains(&class("sz")));
        assert!(!set.contains(&class("bdsz")));
    }
}
