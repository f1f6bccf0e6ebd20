use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use crate::{
    alphabet::Alphabet, arc_set::ArcSet, error::WfaError, label::ArcLabel,
    natural_class::NaturalClassSet, semiring::Semiring,
};

mod tied;
pub use tied::{ParameterMap, TiedKey};

mod class;
pub use class::class_arc_table;

/// Separates the component names in the name of a product state.
pub const PRODUCT_SEPARATOR: char = '%';

/// A compact arc table maps labels to target and weight. Unlike the literal transition
/// function, a single entry may stand for many symbols.
pub type ArcTable<S> = BTreeMap<ArcLabel, (String, S)>;

/// The variants of states. They share the transition function and differ in how their weights
/// are governed and in how their compact arc table is built and priced.
#[derive(Debug, Clone, PartialEq)]
pub enum StateKind {
    /// Weights are fixed values.
    Plain,
    /// Weights are tied to the parameters of the owning automaton.
    Tied(ParameterMap),
    /// Weights are tied to parameters and the compact arc table is labelled with natural classes.
    Class {
        /// The natural classes available as labels.
        classes: Rc<NaturalClassSet>,
        /// Which weights are governed by which parameter.
        parameters: ParameterMap,
    },
}

impl StateKind {
    /// The parameter map of tied and class states.
    pub fn parameters(&self) -> Option<&ParameterMap> {
        match self {
            StateKind::Plain => None,
            StateKind::Tied(parameters) | StateKind::Class { parameters, .. } => Some(parameters),
        }
    }

    fn parameters_mut(&mut self) -> Option<&mut ParameterMap> {
        match self {
            StateKind::Plain => None,
            StateKind::Tied(parameters) | StateKind::Class { parameters, .. } => Some(parameters),
        }
    }
}

/// A single state of a weighted automaton, i.e. its name, stop weight and deterministic
/// transition function. Next to the literal transitions (symbol to target and weight), a state
/// built from [`ArcSet`]s keeps a compact arc table that is used for complexity accounting and
/// display. If the arc sets cover the whole alphabet, one of them is folded into a single
/// [`ArcLabel::Other`] entry.
///
/// States refer to other states only by name, the owning automaton resolves these names.
#[derive(Debug, Clone, PartialEq)]
pub struct State<S: Semiring> {
    name: String,
    alphabet: Alphabet,
    stop: S,
    transitions: BTreeMap<char, (String, S)>,
    arcs: Option<ArcTable<S>>,
    kind: StateKind,
}

impl<S: Semiring> State<S> {
    /// Builds a plain state from disjoint arc sets, which must all originate from `name`.
    pub fn new(
        name: impl Into<String>,
        alphabet: Alphabet,
        stop: S,
        arcsets: Vec<ArcSet<S>>,
    ) -> Result<Self, WfaError> {
        Self::literal(name.into(), alphabet, stop, arcsets, StateKind::Plain)
    }

    /// Builds a state whose weights are tied to parameters as described by `parameters`.
    pub fn tied(
        name: impl Into<String>,
        alphabet: Alphabet,
        stop: S,
        parameters: ParameterMap,
        arcsets: Vec<ArcSet<S>>,
    ) -> Result<Self, WfaError> {
        Self::literal(
            name.into(),
            alphabet,
            stop,
            arcsets,
            StateKind::Tied(parameters),
        )
    }

    /// Builds a state whose compact arc table is labelled with classes of `classes`. The alphabet
    /// of the state is the alphabet of the class set.
    pub fn with_classes(
        name: impl Into<String>,
        classes: Rc<NaturalClassSet>,
        stop: S,
        parameters: ParameterMap,
        arcsets: Vec<ArcSet<S>>,
    ) -> Result<Self, WfaError> {
        let name = name.into();
        let transitions = literal_transitions(&name, &arcsets)?;
        let arcs = class_arc_table(&classes, arcsets);
        Ok(Self {
            name,
            alphabet: classes.alphabet().clone(),
            stop,
            transitions,
            arcs: Some(arcs),
            kind: StateKind::Class {
                classes,
                parameters,
            },
        })
    }

    /// Builds a state directly from its transition function, without a precomputed compact arc
    /// table. This is used for the results of combining states.
    pub fn from_transitions(
        name: impl Into<String>,
        alphabet: Alphabet,
        stop: S,
        transitions: BTreeMap<char, (String, S)>,
        kind: StateKind,
    ) -> Self {
        Self {
            name: name.into(),
            alphabet,
            stop,
            transitions,
            arcs: None,
            kind,
        }
    }

    fn literal(
        name: String,
        alphabet: Alphabet,
        stop: S,
        arcsets: Vec<ArcSet<S>>,
        kind: StateKind,
    ) -> Result<Self, WfaError> {
        let transitions = literal_transitions(&name, &arcsets)?;
        let arcs = literal_arc_table(&alphabet, arcsets);
        Ok(Self {
            name,
            alphabet,
            stop,
            transitions,
            arcs: Some(arcs),
            kind,
        })
    }

    /// The name of the state.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The alphabet of the state.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// The stop weight.
    pub fn stop(&self) -> S {
        self.stop
    }

    /// Which variant of state this is.
    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    /// Returns the target and weight of the transition on `symbol`, if there is one.
    pub fn transition(&self, symbol: char) -> Option<(&str, S)> {
        self.transitions
            .get(&symbol)
            .map(|(dest, weight)| (dest.as_str(), *weight))
    }

    /// Iterates over all transitions as triples of symbol, target and weight, ordered by symbol.
    pub fn transitions(&self) -> impl Iterator<Item = (char, &str, S)> + '_ {
        self.transitions
            .iter()
            .map(|(sym, (dest, weight))| (*sym, dest.as_str(), *weight))
    }

    /// Returns the compact arc table, computing it from the transition function if the state
    /// was not built from arc sets.
    pub fn arc_table(&self) -> Cow<'_, ArcTable<S>> {
        match &self.arcs {
            Some(arcs) => Cow::Borrowed(arcs),
            None => {
                let arcsets = group_transitions(&self.name, &self.transitions);
                Cow::Owned(match &self.kind {
                    StateKind::Class { classes, .. } => class_arc_table(classes, arcsets),
                    _ => literal_arc_table(&self.alphabet, arcsets),
                })
            }
        }
    }

    /// Number of entries in the compact arc table.
    pub fn num_arcs(&self) -> usize {
        self.arc_table().len()
    }

    /// Returns true if a weight of this state is tied to parameter `index`.
    pub fn uses_parameter(&self, index: usize) -> bool {
        self.kind
            .parameters()
            .is_some_and(|parameters| parameters.uses(index))
    }

    /// Builds the product of `self` and `other`. The product state is named by joining both
    /// names, stops with the product of both stop weights and has a transition on exactly those
    /// symbols on which both states have one. Its parameter map is the concatenation of both
    /// maps, a plain state contributing none.
    pub fn combine(&self, other: &State<S>) -> State<S> {
        let name = product_name(&self.name, &other.name);
        let transitions: BTreeMap<_, _> = self
            .transitions
            .iter()
            .filter_map(|(sym, (dest, weight))| {
                other.transition(*sym).map(|(other_dest, other_weight)| {
                    (
                        *sym,
                        (product_name(dest, other_dest), *weight * other_weight),
                    )
                })
            })
            .collect();

        let kind = match (self.kind.parameters(), other.kind.parameters()) {
            (None, None) => StateKind::Plain,
            (left, right) => {
                let empty = ParameterMap::default();
                let mut parameters = left.unwrap_or(&empty).concat(right.unwrap_or(&empty));
                parameters.retain(|key| match key {
                    TiedKey::Stop => true,
                    TiedKey::Symbol(sym) => transitions.contains_key(sym),
                });
                StateKind::Tied(parameters)
            }
        };

        State::from_transitions(
            name,
            self.alphabet.clone(),
            self.stop * other.stop,
            transitions,
            kind,
        )
    }

    /// Maps every weight of the state through `change`, which usually converts between semirings.
    pub fn change_semiring<T: Semiring, F: Fn(S) -> T>(&self, change: F) -> State<T> {
        let convert = |(dest, weight): &(String, S)| (dest.clone(), change(*weight));
        State {
            name: self.name.clone(),
            alphabet: self.alphabet.clone(),
            stop: change(self.stop),
            transitions: self
                .transitions
                .iter()
                .map(|(sym, t)| (*sym, convert(t)))
                .collect(),
            arcs: self.arcs.as_ref().map(|arcs| {
                arcs.iter()
                    .map(|(label, t)| (label.clone(), convert(t)))
                    .collect()
            }),
            kind: self.kind.clone(),
        }
    }

    /// Replaces the stop weight by `stop` and every transition weight `w` into `dest` by
    /// `reweight(dest, w)`.
    pub fn reweight<F: Fn(&str, S) -> S>(&mut self, stop: S, reweight: F) {
        self.stop = stop;
        for (dest, weight) in self.transitions.values_mut() {
            *weight = reweight(dest, *weight);
        }
        if let Some(arcs) = &mut self.arcs {
            for (dest, weight) in arcs.values_mut() {
                *weight = reweight(dest, *weight);
            }
        }
    }

    /// Removes every transition into `dead`. If the compact arc table used the fallback label,
    /// it is expanded again: every symbol that is not listed explicitly but still has a
    /// transition gets its own entry.
    pub fn prune_transitions(&mut self, dead: &str) {
        self.transitions.retain(|_, (dest, _)| dest != dead);

        if let Some(arcs) = &mut self.arcs {
            let before = arcs.len();
            arcs.retain(|_, (dest, _)| dest != dead);
            if arcs.len() < before && arcs.remove(&ArcLabel::Other).is_some() {
                let unlisted: Vec<char> = self
                    .transitions
                    .keys()
                    .filter(|sym| !arcs.keys().any(|label| label.names(**sym)))
                    .copied()
                    .collect();
                for sym in unlisted {
                    arcs.insert(ArcLabel::Symbol(sym), self.transitions[&sym].clone());
                }
            }
        }

        let transitions = &self.transitions;
        if let Some(parameters) = self.kind.parameters_mut() {
            parameters.retain(|key| match key {
                TiedKey::Stop => true,
                TiedKey::Symbol(sym) => transitions.contains_key(sym),
            });
        }
    }

    /// Rescales every weight tied to parameter `index`, whose value changes from `old` to
    /// `new`, by `new / old`. Weights not tied to `index` are left untouched.
    pub fn change_parameter(&mut self, index: usize, new: S, old: S) {
        let Some(parameters) = self.kind.parameters() else {
            return;
        };
        let keys: BTreeSet<TiedKey> = parameters.keys(index).copied().collect();
        if keys.is_empty() {
            return;
        }
        let rescale = |weight: S| weight * new / old;

        if let Some(arcs) = &self.arcs {
            let tied_labels: Vec<ArcLabel> = arcs
                .keys()
                .filter(|label| {
                    self.representative(label)
                        .is_some_and(|sym| keys.contains(&TiedKey::Symbol(sym)))
                })
                .cloned()
                .collect();
            if let Some(arcs) = &mut self.arcs {
                for label in tied_labels {
                    if let Some((_, weight)) = arcs.get_mut(&label) {
                        *weight = rescale(*weight);
                    }
                }
            }
        }

        for key in keys {
            match key {
                TiedKey::Stop => self.stop = self.stop / old * new,
                TiedKey::Symbol(sym) => {
                    if let Some((_, weight)) = self.transitions.get_mut(&sym) {
                        *weight = rescale(*weight);
                    }
                }
            }
        }
    }

    /// Returns a symbol whose transition the compact entry `label` stands for.
    fn representative(&self, label: &ArcLabel) -> Option<char> {
        match label {
            ArcLabel::Other => {
                let arcs = self.arcs.as_ref()?;
                self.transitions
                    .keys()
                    .find(|sym| !arcs.keys().any(|l| l.names(**sym)))
                    .copied()
            }
            _ => label.representative(),
        }
    }

    /// Computes the bits needed to encode the outgoing structure of this state, given the
    /// number of states of the automaton and a function pricing a single weight.
    ///
    /// Every entry of the compact arc table costs two state indices, its weight and its label.
    /// Labels get cheaper as they are used up: for literal states the `k`-th label costs
    /// `log2(|alphabet| + 1 - k)` bits, for class states a label costs `-log2(size / remaining)`
    /// where `remaining` is the label mass not yet consumed.
    pub fn complexity<F: Fn(S) -> f64>(&self, num_states: usize, weight_cost: F) -> f64 {
        let state_cost = 2.0 * (num_states as f64).log2();
        let arcs = self.arc_table();
        let mut total = weight_cost(self.stop);
        match &self.kind {
            StateKind::Class { classes, .. } => {
                total += class::label_costs(classes, &arcs)
                    .zip(arcs.values())
                    .map(|(label_cost, (_, weight))| state_cost + weight_cost(*weight) + label_cost)
                    .sum::<f64>();
            }
            _ => {
                let num_labels = (self.alphabet.size() + 1) as f64;
                total += arcs
                    .values()
                    .enumerate()
                    .map(|(encoded, (_, weight))| {
                        state_cost + weight_cost(*weight) + (num_labels - encoded as f64).log2()
                    })
                    .sum::<f64>();
            }
        }
        total
    }
}

/// Joins the names of two states into the name of their product state.
pub fn product_name(left: &str, right: &str) -> String {
    format!("{left}{PRODUCT_SEPARATOR}{right}")
}

/// Builds the literal transition function from arc sets, checking that every arc set originates
/// from `name` and that no symbol occurs in two of them.
fn literal_transitions<S: Semiring>(
    name: &str,
    arcsets: &[ArcSet<S>],
) -> Result<BTreeMap<char, (String, S)>, WfaError> {
    let mut transitions = BTreeMap::new();
    for arcset in arcsets {
        if arcset.source != name {
            return Err(WfaError::ForeignArcSet {
                state: name.to_string(),
                source_state: arcset.source.clone(),
            });
        }
        for letter in &arcset.letters {
            if transitions
                .insert(*letter, (arcset.dest.clone(), arcset.weight))
                .is_some()
            {
                return Err(WfaError::DuplicateSymbol {
                    state: name.to_string(),
                    symbol: *letter,
                });
            }
        }
    }
    Ok(transitions)
}

/// Lists every symbol of every arc set, except that the largest arc set (the first one on ties)
/// becomes the fallback entry if the arc sets together cover the whole alphabet.
fn literal_arc_table<S: Semiring>(alphabet: &Alphabet, arcsets: Vec<ArcSet<S>>) -> ArcTable<S> {
    let covered: BTreeSet<char> = arcsets
        .iter()
        .flat_map(|a| a.letters.iter().copied())
        .collect();
    let mut largest: Option<usize> = None;
    for (i, arcset) in arcsets.iter().enumerate() {
        if largest.map_or(true, |l| arcsets[l].len() < arcset.len()) {
            largest = Some(i);
        }
    }
    let fallback = largest.filter(|_| &covered == alphabet.symbols());

    let mut arcs = ArcTable::new();
    for (i, arcset) in arcsets.into_iter().enumerate() {
        if Some(i) == fallback {
            arcs.insert(ArcLabel::Other, (arcset.dest, arcset.weight));
        } else {
            for letter in arcset.letters {
                arcs.insert(
                    ArcLabel::Symbol(letter),
                    (arcset.dest.clone(), arcset.weight),
                );
            }
        }
    }
    arcs
}

/// Groups transitions with equal target and weight into arc sets.
pub(crate) fn group_transitions<W: PartialEq + Copy>(
    name: &str,
    transitions: &BTreeMap<char, (String, W)>,
) -> Vec<ArcSet<W>> {
    let mut arcsets: Vec<ArcSet<W>> = Vec::new();
    for (sym, (dest, weight)) in transitions {
        match arcsets
            .iter_mut()
            .find(|a| &a.dest == dest && a.weight == *weight)
        {
            Some(arcset) => {
                arcset.letters.insert(*sym);
            }
            None => arcsets.push(ArcSet::new(name, dest.clone(), [*sym], *weight)),
        }
    }
    arcsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{prelude::*, tests::assert_close};

    fn alphabet() -> Alphabet {
        Alphabet::from("abcdefghijou")
    }

    fn example_state() -> State<Tropical> {
        State::new(
            "1",
            alphabet(),
            Tropical::new(2.0),
            vec![
                ArcSet::new("1", "2", "aeiou".chars(), Tropical::new(4.0)),
                ArcSet::new("1", "3", "fghj".chars(), Tropical::new(12.0)),
                ArcSet::new("1", "5", "bcd".chars(), Tropical::new(3.0)),
            ],
        )
        .unwrap()
    }

    fn partial_state() -> State<Tropical> {
        State::new(
            "1",
            alphabet(),
            Tropical::new(3.0),
            vec![
                ArcSet::new("1", "2", "aeiou".chars(), Tropical::new(4.0)),
                ArcSet::new("1", "3", "fghj".chars(), Tropical::new(12.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn transitions_from_arc_sets() {
        let state = example_state();
        assert_eq!(state.transition('a'), Some(("2", Tropical::new(4.0))));
        assert_eq!(state.transition('b'), Some(("5", Tropical::new(3.0))));
        assert_eq!(state.transition('c'), Some(("5", Tropical::new(3.0))));
        assert_eq!(state.transition('f'), Some(("3", Tropical::new(12.0))));
        assert_eq!(state.transition('z'), None);
        assert_eq!(partial_state().transition('b'), None);
    }

    #[test]
    fn full_coverage_collapses_largest_arc_set() {
        let arcs = example_state().arc_table().into_owned();
        assert_eq!(arcs.len(), 8);
        assert_eq!(arcs[&ArcLabel::Other], ("2".to_string(), Tropical::new(4.0)));
        assert!(!arcs.contains_key(&ArcLabel::Symbol('a')));

        let arcs = partial_state().arc_table().into_owned();
        assert_eq!(arcs.len(), 9);
        assert!(!arcs.contains_key(&ArcLabel::Other));
    }

    #[test]
    fn overlapping_arc_sets_are_rejected() {
        let result = State::new(
            "1",
            alphabet(),
            Tropical::one(),
            vec![
                ArcSet::new("1", "2", "abc".chars(), Tropical::one()),
                ArcSet::new("1", "3", "cd".chars(), Tropical::one()),
            ],
        );
        assert_eq!(
            result,
            Err(WfaError::DuplicateSymbol {
                state: "1".to_string(),
                symbol: 'c'
            })
        );
        let result = State::new(
            "1",
            alphabet(),
            Tropical::one(),
            vec![ArcSet::new("7", "2", "abc".chars(), Tropical::one())],
        );
        assert!(matches!(result, Err(WfaError::ForeignArcSet { .. })));
    }

    #[test]
    fn combine_keeps_shared_symbols() {
        let state = example_state();
        let partial = partial_state();
        let product = state.combine(&partial);
        assert_eq!(product.name(), "1%1");
        assert_eq!(product.transition('a'), Some(("2%2", Tropical::new(8.0))));
        assert_eq!(product.transition('b'), None);
        assert_eq!(product.stop(), Tropical::new(5.0));
        assert_eq!(product.kind(), &StateKind::Plain);

        for sym in alphabet().universe() {
            match (state.transition(sym), partial.transition(sym)) {
                (Some((d1, w1)), Some((d2, w2))) => {
                    assert_eq!(
                        product.transition(sym),
                        Some((product_name(d1, d2).as_str(), w1 * w2))
                    )
                }
                _ => assert_eq!(product.transition(sym), None),
            }
        }
    }

    #[test]
    fn change_semiring_maps_all_weights() {
        let tropical = example_state();
        let probability = tropical.change_semiring(|w| w.to_probability(2.0));
        assert_eq!(probability.transition('a'), Some(("2", Probability::new(0.0625))));
        assert_eq!(probability.stop(), Probability::new(0.25));
        let back = probability.change_semiring(|w| w.to_tropical(2.0));
        assert_close(back.transition('a').unwrap().1.value(), 4.0);
    }

    #[test]
    fn pruning_the_fallback_expands_it() {
        let mut state = example_state();
        state.prune_transitions("5");
        assert_eq!(state.transition('b'), None);
        let arcs = state.arc_table().into_owned();
        assert!(!arcs.contains_key(&ArcLabel::Other));
        assert_eq!(arcs[&ArcLabel::Symbol('a')], ("2".to_string(), Tropical::new(4.0)));
        assert_eq!(arcs.len(), 9);

        let mut state = example_state();
        state.prune_transitions("2");
        let arcs = state.arc_table().into_owned();
        assert_eq!(arcs.len(), 7);
        assert!(arcs.keys().all(|label| matches!(label, ArcLabel::Symbol(_))));
    }

    #[test]
    fn tied_weights_change_with_their_parameter() {
        let alphabet = Alphabet::from("abcdef");
        let mut first = ParameterMap::new(3);
        first.tie(0, TiedKey::Symbol('f'));
        for sym in "db".chars() {
            first.tie(1, TiedKey::Symbol(sym));
        }
        for sym in "ace".chars() {
            first.tie(2, TiedKey::Symbol(sym));
        }
        let mut state1 = State::tied(
            "1",
            alphabet.clone(),
            Tropical::one(),
            first,
            vec![
                ArcSet::new("1", "1", "abe".chars(), Tropical::new(3.0)),
                ArcSet::new("1", "2", "cf".chars(), Tropical::new(3.0)),
                ArcSet::new("1", "3", "d".chars(), Tropical::new(2.0)),
            ],
        )
        .unwrap();
        // 'b' is tied to parameter 1, but stored with the weight of parameter 2
        assert_eq!(state1.transition('a'), Some(("1", Tropical::new(3.0))));
        state1.change_parameter(2, Tropical::new(6.0), Tropical::new(3.0));
        assert_eq!(state1.transition('a'), Some(("1", Tropical::new(6.0))));
        assert_eq!(state1.transition('b'), Some(("1", Tropical::new(3.0))));

        let mut second = ParameterMap::new(2);
        second.tie(0, TiedKey::Stop);
        second.tie(0, TiedKey::Symbol('b'));
        for sym in "acdef".chars() {
            second.tie(1, TiedKey::Symbol(sym));
        }
        let mut state2 = State::tied(
            "2",
            alphabet,
            Tropical::new(3.0),
            second,
            vec![
                ArcSet::new("2", "2", "aef".chars(), Tropical::new(4.0)),
                ArcSet::new("2", "1", "cd".chars(), Tropical::new(4.0)),
                ArcSet::new("2", "1", "b".chars(), Tropical::new(3.0)),
            ],
        )
        .unwrap();
        state2.change_parameter(0, Tropical::new(5.0), Tropical::new(3.0));
        assert_eq!(state2.transition('b'), Some(("1", Tropical::new(5.0))));
        assert_eq!(state2.stop(), Tropical::new(5.0));

        let mut product = state1.combine(&state2);
        assert_eq!(product.transition('f'), Some(("2%2", Tropical::new(7.0))));
        // parameter 1 of the second state is parameter 4 of the product
        product.change_parameter(4, Tropical::new(8.0), Tropical::new(4.0));
        assert_eq!(product.transition('f').unwrap().1, Tropical::new(11.0));
        assert_eq!(product.transition('a').unwrap().1, Tropical::new(14.0));
        product.change_parameter(1, Tropical::new(0.0), Tropical::new(2.0));
        assert_eq!(product.transition('d').unwrap().1, Tropical::new(8.0));
        assert_eq!(product.transition('b').unwrap().1, Tropical::new(6.0));
        assert_eq!(product.stop(), Tropical::new(5.0));
        assert!(product.uses_parameter(3));
        assert!(!state1.uses_parameter(3));
    }

    #[test]
    fn literal_complexity() {
        let state = partial_state();
        let cost = |_| 64.0;
        // nine listed symbols over an alphabet of twelve, with two states
        let expected = 64.0
            + (0..9)
                .map(|k| 2.0 + 64.0 + ((13 - k) as f64).log2())
                .sum::<f64>();
        assert_close(state.complexity(2, cost), expected);
        assert_eq!(state.num_arcs(), 9);
    }

    #[test]
    fn complexity_of_combined_state_uses_derived_table() {
        let product = example_state().combine(&example_state());
        // all symbols are covered, so the largest group becomes the fallback again
        assert_eq!(product.num_arcs(), 8);
        assert!(product.arc_table().contains_key(&ArcLabel::Other));
    }
}
