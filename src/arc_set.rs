use std::collections::BTreeSet;

use crate::natural_class::{NaturalClass, NaturalClassSet};

/// A collection of arcs with the same source state, target state and weight, which differ only
/// in the symbol they are triggered by. Within one state, the symbol sets of all arc sets
/// are pairwise disjoint, which makes the state deterministic.
///
/// The weight type `W` is usually a [`crate::Semiring`], during construction of tied automata it
/// may also be a parameter index.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcSet<W> {
    /// Name of the source state.
    pub source: String,
    /// Name of the target state.
    pub dest: String,
    /// The symbols on which the arcs are taken.
    pub letters: BTreeSet<char>,
    /// The shared weight.
    pub weight: W,
}

impl<W> ArcSet<W> {
    /// Creates a new arc set.
    pub fn new<I: IntoIterator<Item = char>>(
        source: impl Into<String>,
        dest: impl Into<String>,
        letters: I,
        weight: W,
    ) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            letters: letters.into_iter().collect(),
            weight,
        }
    }

    /// Returns true if an arc of this set is taken on `letter`.
    pub fn contains(&self, letter: char) -> bool {
        self.letters.contains(&letter)
    }

    /// Number of symbols (and thus arcs) in this set.
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    /// Returns true if the set contains no arcs.
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    /// Consumes `self` and replaces the weight.
    pub fn map_weight<V, F: FnOnce(W) -> V>(self, f: F) -> ArcSet<V> {
        ArcSet {
            source: self.source,
            dest: self.dest,
            letters: self.letters,
            weight: f(self.weight),
        }
    }
}

/// An [`ArcSet`] whose symbols are additionally expressed through natural classes. The
/// `labels` are a covering of the arc set's symbols by pairwise disjoint classes, as computed
/// by [`covering_labels`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClassArcSet<W> {
    /// The underlying arcs.
    pub arcs: ArcSet<W>,
    /// Disjoint natural classes whose union is exactly the set of symbols of `arcs`.
    pub labels: BTreeSet<NaturalClass>,
}

impl<W> ClassArcSet<W> {
    /// Wraps `arcs`, computing its covering labels with respect to `classes`.
    pub fn new(arcs: ArcSet<W>, classes: &NaturalClassSet) -> Self {
        let labels = covering_labels(&arcs.letters, classes);
        Self { arcs, labels }
    }

    /// Joint probability of the covering labels, where a label is as probable as its share of
    /// [`NaturalClassSet::labels_len`].
    pub fn label_probability(&self, classes: &NaturalClassSet) -> f64 {
        let norm = classes.labels_len() as f64;
        self.labels
            .iter()
            .map(|label| label.len() as f64 / norm)
            .product()
    }
}

/// Greedily covers `letters` with natural classes from `classes`. In every round the largest
/// class that is contained in the not yet covered letters is picked (the first one in the
/// order of `classes` on ties) and removed from the pool. Once no class of size larger than
/// one fits, every remaining letter is covered by its own singleton.
///
/// The result is not guaranteed to be a cover of minimal cardinality, but its labels are
/// pairwise disjoint and their union is exactly `letters`.
pub fn covering_labels(
    letters: &BTreeSet<char>,
    classes: &NaturalClassSet,
) -> BTreeSet<NaturalClass> {
    let mut covered = BTreeSet::new();
    let mut labels = BTreeSet::new();
    let mut pool: Vec<&NaturalClass> = classes.iter().collect();

    loop {
        let uncovered: BTreeSet<char> = letters.difference(&covered).copied().collect();
        let mut best: Option<usize> = None;
        for (i, class) in pool.iter().enumerate() {
            let larger = best.map_or(!class.is_empty(), |b| class.len() > pool[b].len());
            if larger && class.is_subset(&uncovered) {
                best = Some(i);
            }
        }
        let Some(best) = best else {
            break;
        };
        let class = pool.remove(best);
        covered.extend(class.iter().copied());
        labels.insert(class.clone());
        if class.len() <= 1 {
            break;
        }
    }

    for letter in letters.difference(&covered) {
        labels.insert(NaturalClass::from([*letter]));
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(symbols: &str) -> NaturalClass {
        symbols.chars().collect()
    }

    fn classes() -> NaturalClassSet {
        NaturalClassSet::new("ptkbdgrszlmn", ["tpbdrzlnm", "nm", "bd"].map(|c| c.chars()))
    }

    #[test]
    fn arc_set_basics() {
        let arcs = ArcSet::new("1", "2", "aeiou".chars(), 4.0);
        assert_eq!(arcs.len(), 5);
        assert!(arcs.contains('e'));
        assert!(!arcs.contains('b'));
        let arcs = arcs.map_weight(|w| w * 2.0);
        assert_eq!(arcs.weight, 8.0);
    }

    #[test]
    fn whole_class_is_single_label() {
        let arcs = ClassArcSet::new(ArcSet::new("1", "1", "tpbdrzlnm".chars(), 3.0), &classes());
        assert_eq!(arcs.labels, BTreeSet::from([class("tpbdrzlnm")]));
    }

    #[test]
    fn greedy_cover_with_singletons() {
        let labels = covering_labels(&class("bdrzlmn"), &classes());
        assert_eq!(labels.len(), 5);
        for expected in ["bd", "nm", "z", "l", "r"] {
            assert!(labels.contains(&class(expected)), "missing {expected}");
        }
    }

    #[test]
    fn cover_is_disjoint_and_exact() {
        let set = NaturalClassSet::new(
            "aeuptkbdszh",
            ["aeu", "ptkbdzsh", "ptkbd", "szh", "bdz", "ptksh", "ptbdsz"].map(|c| c.chars()),
        );
        for letters in ["ptkbd", "aeuszh", "pbz", "aeuptkbdszh", "tkbsh", ""] {
            let letters = class(letters);
            let labels = covering_labels(&letters, &set);
            let union: BTreeSet<char> = labels.iter().flatten().copied().collect();
            assert_eq!(union, letters);
            assert_eq!(labels.iter().map(|l| l.len()).sum::<usize>(), letters.len());
        }
    }

    #[test]
    fn label_probability_is_product_of_shares() {
        let set = classes();
        let arcs = ClassArcSet::new(ArcSet::new("1", "2", "bdrzlmn".chars(), 3.0), &set);
        let expected = (2.0f64 / 37.0).powi(2) * (1.0f64 / 37.0).powi(3);
        assert!((arcs.label_probability(&set) - expected).abs() < 1e-15);
    }
}
