use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    rc::Rc,
};

use tracing::debug;

use crate::{
    alphabet::Alphabet,
    error::WfaError,
    label::{ArcLabel, CategoryLabel},
    natural_class::NaturalClassSet,
    precision::Precision,
    semiring::Semiring,
    state::{group_transitions, State},
};

use super::{CategoryAutomaton, ClassAutomaton, TiedAutomaton, WeightedAutomaton};

/// Collects the declaration of an automaton: stop weights and arcs, each given by source,
/// label, target and weight. Depending on how it is finished, labels are single symbols,
/// symbol sets or natural classes ([`ArcLabel`]) or sets of categories ([`CategoryLabel`]), and
/// weights are either plain values (`f64`) or parameter indices (`Option<usize>`, where `None`
/// stands for the default weight).
///
/// Every name that is mentioned, be it as start, source, target or in a stop weight, becomes a
/// state. States without a declared stop weight have stop weight zero.
///
/// ```
/// use wfsa::prelude::*;
///
/// let wfa: WeightedAutomaton<Tropical> = AutomatonBuilder::new("ab")
///     .with_stops([("1", 0.0)])
///     .with_arcs([
///         ("0", ArcLabel::Symbol('a'), "1", 2.0),
///         ("1", ArcLabel::Other, "0", 1.0),
///     ])
///     .into_automaton("0", Precision::default())
///     .unwrap();
/// assert_eq!(wfa.weight("aba"), Tropical::new(5.0));
/// ```
#[derive(Debug, Clone)]
pub struct AutomatonBuilder<L = ArcLabel, W = f64> {
    alphabet: Alphabet,
    stops: Vec<(String, W)>,
    arcs: Vec<(String, L, String, W)>,
}

/// A declaration whose labels have been resolved to concrete symbols.
#[derive(Debug, Clone)]
pub(crate) struct Declaration<W> {
    pub(crate) alphabet: Alphabet,
    pub(crate) start: String,
    pub(crate) names: BTreeSet<String>,
    pub(crate) stops: BTreeMap<String, W>,
    pub(crate) transitions: BTreeMap<String, BTreeMap<char, (String, W)>>,
    pub(crate) declared_arcs: usize,
}

impl<W> Declaration<W> {
    /// The resolved transitions leaving `name`.
    pub(crate) fn transitions_of(&self, name: &str) -> BTreeMap<char, (String, W)>
    where
        W: Copy,
    {
        self.transitions.get(name).cloned().unwrap_or_default()
    }
}

impl<L, W> AutomatonBuilder<L, W> {
    /// Starts an empty declaration over `alphabet`.
    pub fn new(alphabet: impl Into<Alphabet>) -> Self {
        Self {
            alphabet: alphabet.into(),
            stops: Vec::new(),
            arcs: Vec::new(),
        }
    }

    /// The alphabet of the declaration.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Declares the stop weight of `name`. A later declaration for the same state replaces it.
    pub fn with_stop(mut self, name: impl Into<String>, weight: W) -> Self {
        self.stops.push((name.into(), weight));
        self
    }

    /// Declares several stop weights at once.
    pub fn with_stops<I, N>(self, stops: I) -> Self
    where
        I: IntoIterator<Item = (N, W)>,
        N: Into<String>,
    {
        stops
            .into_iter()
            .fold(self, |builder, (name, weight)| builder.with_stop(name, weight))
    }

    /// Declares an arc from `source` to `dest`.
    pub fn with_arc(
        mut self,
        source: impl Into<String>,
        label: L,
        dest: impl Into<String>,
        weight: W,
    ) -> Self {
        self.arcs.push((source.into(), label, dest.into(), weight));
        self
    }

    /// Declares several arcs at once.
    pub fn with_arcs<I, N, M>(self, arcs: I) -> Self
    where
        I: IntoIterator<Item = (N, L, M, W)>,
        N: Into<String>,
        M: Into<String>,
    {
        arcs.into_iter()
            .fold(self, |builder, (source, label, dest, weight)| {
                builder.with_arc(source, label, dest, weight)
            })
    }

    /// Resolves every label through `resolve`, which returns the symbols a label stands for or
    /// `None` for the fallback label. Explicit labels are expanded first and checked for
    /// conflicts. A fallback then claims every alphabet symbol that no explicit label of the
    /// same source claims.
    pub(crate) fn declare<R>(
        self,
        start: impl Into<String>,
        mut resolve: R,
    ) -> Result<Declaration<W>, WfaError>
    where
        W: Copy + PartialEq + Debug,
        R: FnMut(L) -> Result<Option<BTreeSet<char>>, WfaError>,
    {
        let start = start.into();
        let mut names = BTreeSet::from([start.clone()]);
        let declared_arcs = self.arcs.len();

        let mut transitions: BTreeMap<String, BTreeMap<char, (String, W)>> = BTreeMap::new();
        let mut fallbacks = Vec::new();
        for (source, label, dest, weight) in self.arcs {
            names.insert(source.clone());
            names.insert(dest.clone());
            match resolve(label)? {
                Some(symbols) => {
                    let table = transitions.entry(source.clone()).or_default();
                    for symbol in symbols {
                        claim(table, &source, symbol, &dest, weight)?;
                    }
                }
                None => fallbacks.push((source, dest, weight)),
            }
        }

        let explicit: BTreeMap<String, BTreeSet<char>> = transitions
            .iter()
            .map(|(source, table)| (source.clone(), table.keys().copied().collect()))
            .collect();
        for (source, dest, weight) in fallbacks {
            let claimed = explicit.get(&source);
            let unclaimed: Vec<char> = self
                .alphabet
                .universe()
                .filter(|sym| claimed.map_or(true, |claimed| !claimed.contains(sym)))
                .collect();
            let table = transitions.entry(source.clone()).or_default();
            for symbol in unclaimed {
                claim(table, &source, symbol, &dest, weight)?;
            }
        }

        let mut stops = BTreeMap::new();
        for (name, weight) in self.stops {
            names.insert(name.clone());
            stops.insert(name, weight);
        }

        debug!(
            "declared {} states with {declared_arcs} arcs and {} stops",
            names.len(),
            stops.len()
        );
        Ok(Declaration {
            alphabet: self.alphabet,
            start,
            names,
            stops,
            transitions,
            declared_arcs,
        })
    }
}

impl<L: Into<ArcLabel>> AutomatonBuilder<L, f64> {
    /// Builds a [`WeightedAutomaton`] over the semiring `S`, in which every weight is stored
    /// with the given `precision`. Class labels simply stand for their symbols.
    pub fn into_automaton<S: Semiring>(
        self,
        start: impl Into<String>,
        precision: Precision,
    ) -> Result<WeightedAutomaton<S>, WfaError> {
        let declaration = self.declare(start, |label| Ok(literal_symbols(label.into())))?;
        let mut states = Vec::with_capacity(declaration.names.len());
        for name in &declaration.names {
            let stop = match declaration.stops.get(name) {
                Some(weight) => S::new(precision.apply(*weight)?),
                None => S::zero(),
            };
            let mut transitions = BTreeMap::new();
            for (sym, (dest, weight)) in declaration.transitions_of(name) {
                transitions.insert(sym, (dest, S::new(precision.apply(weight)?)));
            }
            states.push(State::new(
                name.clone(),
                declaration.alphabet.clone(),
                stop,
                group_transitions(name, &transitions),
            )?);
        }
        Ok(WeightedAutomaton::from_states(
            declaration.alphabet,
            declaration.start,
            S::one(),
            states,
            precision,
        ))
    }
}

impl<L: Into<ArcLabel>> AutomatonBuilder<L, Option<usize>> {
    /// Builds a [`TiedAutomaton`] in which a weight `Some(i)` refers to `parameters[i]` and `None`
    /// to the default weight `one`.
    pub fn into_tied(
        self,
        start: impl Into<String>,
        parameters: Vec<f64>,
        precision: Precision,
    ) -> Result<TiedAutomaton, WfaError> {
        let declaration = self.declare(start, |label| Ok(literal_symbols(label.into())))?;
        TiedAutomaton::from_declaration(declaration, parameters, precision)
    }

    /// Builds a [`ClassAutomaton`] whose labels must be classes of `classes` (single symbols
    /// count as singleton classes). The alphabet of the automaton is the alphabet of the class
    /// set, the one the builder was created with is ignored.
    pub fn into_class_automaton(
        mut self,
        start: impl Into<String>,
        classes: Rc<NaturalClassSet>,
        parameters: Vec<f64>,
        precision: Precision,
    ) -> Result<ClassAutomaton, WfaError> {
        self.alphabet = classes.alphabet().clone();
        let declaration = self.declare(start, |label| class_symbols(&classes, label.into()))?;
        ClassAutomaton::from_declaration(declaration, classes, parameters, precision)
    }
}

impl AutomatonBuilder<CategoryLabel, Option<usize>> {
    /// Builds a [`CategoryAutomaton`], in which a label naming several categories stands for
    /// every alphabet symbol belonging to all of them.
    pub fn into_category_automaton(
        self,
        start: impl Into<String>,
        categories: &BTreeMap<String, BTreeSet<char>>,
        parameters: Vec<f64>,
        precision: Precision,
    ) -> Result<CategoryAutomaton, WfaError> {
        CategoryAutomaton::from_builder(self, start, categories, parameters, precision)
    }
}

/// Records `symbol` leading from `source` to `dest` with `weight`, failing if it already leads
/// somewhere else.
fn claim<W: Copy + PartialEq + Debug>(
    table: &mut BTreeMap<char, (String, W)>,
    source: &str,
    symbol: char,
    dest: &str,
    weight: W,
) -> Result<(), WfaError> {
    match table.get(&symbol) {
        Some((first_dest, first_weight)) if first_dest != dest || *first_weight != weight => {
            Err(WfaError::LabelingConflict {
                state: source.to_string(),
                symbol,
                first: describe(first_dest, first_weight),
                second: describe(dest, &weight),
            })
        }
        Some(_) => Ok(()),
        None => {
            table.insert(symbol, (dest.to_string(), weight));
            Ok(())
        }
    }
}

fn describe<W: Debug>(dest: &str, weight: &W) -> String {
    format!("{dest} with weight {weight:?}")
}

fn literal_symbols(label: ArcLabel) -> Option<BTreeSet<char>> {
    match label {
        ArcLabel::Symbol(sym) => Some(BTreeSet::from([sym])),
        ArcLabel::Class(symbols) => Some(symbols),
        ArcLabel::Other => None,
    }
}

fn class_symbols(
    classes: &NaturalClassSet,
    label: ArcLabel,
) -> Result<Option<BTreeSet<char>>, WfaError> {
    let Some(symbols) = literal_symbols(label) else {
        return Ok(None);
    };
    if classes.contains(&symbols) {
        Ok(Some(symbols))
    } else {
        Err(WfaError::UnknownClass {
            class: symbols.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{prelude::*, tests::assert_close};

    #[test]
    fn states_for_all_mentioned_names() {
        let wfa: WeightedAutomaton<Probability> = AutomatonBuilder::new("ab")
            .with_stops([("end", 1.0)])
            .with_arcs([("start", 'a', "end", 0.5)])
            .into_automaton("start", Precision::default())
            .unwrap();
        assert_eq!(wfa.size(), 2);
        assert!(wfa.state("end").is_some());
        assert_close(wfa.weight("a").value(), 0.5);
    }

    #[test]
    fn fallback_matches_unlisted_symbols() {
        let wfa: WeightedAutomaton<Probability> = AutomatonBuilder::new("pernicious ab")
            .with_stops([("0", 0.3), ("1", 0.2)])
            .with_arcs([
                ("$", ArcLabel::Symbol('a'), "0", 0.3),
                ("$", ArcLabel::Symbol('b'), "1", 0.7),
                ("0", ArcLabel::Symbol('a'), "0", 0.5),
                ("0", ArcLabel::Symbol('b'), "1", 0.2),
                ("1", ArcLabel::Symbol('a'), "0", 0.7),
                ("1", ArcLabel::Symbol('b'), "1", 0.1),
                ("$", ArcLabel::Other, "$", 1.0),
                ("0", ArcLabel::Other, "$", 1.0),
                ("1", ArcLabel::Other, "$", 1.0),
            ])
            .into_automaton("$", Precision::default())
            .unwrap();
        assert_close(wfa.weight("ab").value(), 0.012);
        assert_close(wfa.weight("cab").value(), wfa.weight("ab").value());
        assert_close(wfa.weight("bca").value(), 0.063);
        assert_close(wfa.weight("pernicious ab").value(), wfa.weight("ab").value());
        assert!(wfa.weight("abx").is_zero());
        // the fallback of every state is the largest arc set again
        assert!(wfa
            .states()
            .all(|state| state.arc_table().contains_key(&ArcLabel::Other)));
    }

    #[test]
    fn conflicting_labels() {
        let result: Result<WeightedAutomaton<Tropical>, _> = AutomatonBuilder::new("abc")
            .with_arcs([
                ("0", ArcLabel::class("ab"), "1", 1.0),
                ("0", ArcLabel::class("bc"), "1", 2.0),
            ])
            .into_automaton("0", Precision::default());
        assert_eq!(
            result,
            Err(WfaError::LabelingConflict {
                state: "0".to_string(),
                symbol: 'b',
                first: "1 with weight 1.0".to_string(),
                second: "1 with weight 2.0".to_string(),
            })
        );

        // agreeing declarations are fine
        let wfa: WeightedAutomaton<Tropical> = AutomatonBuilder::new("abc")
            .with_stops([("1", 0.0)])
            .with_arcs([
                ("0", ArcLabel::class("ab"), "1", 1.0),
                ("0", ArcLabel::class("bc"), "1", 1.0),
            ])
            .into_automaton("0", Precision::default())
            .unwrap();
        assert_eq!(wfa.weight("c"), Tropical::new(1.0));
    }

    #[test]
    fn weights_are_quantized() {
        let wfa: WeightedAutomaton<Probability> = AutomatonBuilder::<ArcLabel, _>::new("a")
            .with_stops([("0", 0.1)])
            .into_automaton("0", Precision::reduced(3, 5))
            .unwrap();
        // 0.1 = 0.8 * 2^-3, and 0.8 rounds to 6/8 with three mantissa bits
        assert_close(wfa.stop_weight("0").value(), 0.75 / 8.0);

        let result: Result<WeightedAutomaton<Tropical>, _> =
            AutomatonBuilder::<ArcLabel, _>::new("a")
                .with_stops([("0", 1e6)])
                .into_automaton("0", Precision::reduced(10, 3));
        assert!(matches!(result, Err(WfaError::PrecisionOverflow { .. })));
    }
}
