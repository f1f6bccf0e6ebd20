use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace};

use crate::{
    alphabet::Alphabet,
    math::{integer_code_len, Set},
    precision::Precision,
    semiring::{Probability, Semiring, Tropical},
    state::State,
};

mod builder;
pub use builder::AutomatonBuilder;

mod intersection;
pub use intersection::Intersect;

mod shortest_distance;
pub use shortest_distance::Distances;

mod probability;
pub use probability::{NormConfig, NormConstant};

mod tied;
pub use tied::TiedAutomaton;

mod class;
pub use class::ClassAutomaton;

mod category;
pub use category::CategoryAutomaton;

mod display;

/// Marks the boundaries of a word. A word that begins and ends with it is evaluated without them.
pub const BOUNDARY: char = '#';

/// A deterministic weighted automaton over the semiring `S`. It owns its states, which refer to
/// each other by name, and has a designated start state together with a start weight.
///
/// After construction the automaton is trimmed: every state is reachable from the start state
/// and can reach a state with a non-zero stop weight. The MDL complexity is computed once at
/// construction, see [`WeightedAutomaton::complexity`].
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedAutomaton<S: Semiring> {
    alphabet: Alphabet,
    start: String,
    start_weight: S,
    states: BTreeMap<String, State<S>>,
    precision: Precision,
    complexity: f64,
}

impl<S: Semiring> WeightedAutomaton<S> {
    /// Assembles an automaton from fully built states, trims it and computes its complexity.
    /// States with duplicate names replace each other, the last one wins.
    pub fn from_states<I: IntoIterator<Item = State<S>>>(
        alphabet: Alphabet,
        start: impl Into<String>,
        start_weight: S,
        states: I,
        precision: Precision,
    ) -> Self {
        let mut wfa = Self::assemble(alphabet, start, start_weight, states, precision);
        wfa.complexity = wfa.literal_complexity();
        wfa
    }

    /// Collects and trims the states, leaving the complexity at zero for the caller to fill in.
    pub(crate) fn assemble<I: IntoIterator<Item = State<S>>>(
        alphabet: Alphabet,
        start: impl Into<String>,
        start_weight: S,
        states: I,
        precision: Precision,
    ) -> Self {
        let mut wfa = Self {
            alphabet,
            start: start.into(),
            start_weight,
            states: states
                .into_iter()
                .map(|state| (state.name().to_string(), state))
                .collect(),
            precision,
            complexity: 0.0,
        };
        wfa.trim();
        wfa
    }

    /// The alphabet of the automaton.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Name of the start state and the start weight.
    pub fn start(&self) -> (&str, S) {
        (&self.start, self.start_weight)
    }

    /// The precision with which the weights were stored.
    pub fn precision(&self) -> &Precision {
        &self.precision
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.states.len()
    }

    /// Iterates over the names of all states in ascending order.
    pub fn state_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.states.keys().map(|name| name.as_str())
    }

    /// Iterates over all states, ordered by name.
    pub fn states(&self) -> impl Iterator<Item = &State<S>> + '_ {
        self.states.values()
    }

    /// Returns the state with the given name, if it exists.
    pub fn state(&self, name: &str) -> Option<&State<S>> {
        self.states.get(name)
    }

    pub(crate) fn state_mut(&mut self, name: &str) -> Option<&mut State<S>> {
        self.states.get_mut(name)
    }

    /// Returns the target and weight of the transition from `state` on `symbol`. Is `None` if
    /// the state does not exist or has no such transition.
    pub fn transition(&self, state: &str, symbol: char) -> Option<(&str, S)> {
        self.states.get(state)?.transition(symbol)
    }

    /// The weight of the transition from `state` on `symbol`, which is the semiring zero if the
    /// transition does not exist.
    pub fn transition_weight(&self, state: &str, symbol: char) -> S {
        self.transition(state, symbol)
            .map_or_else(S::zero, |(_, weight)| weight)
    }

    /// The stop weight of `state`, zero for unknown states.
    pub fn stop_weight(&self, state: &str) -> S {
        self.states.get(state).map_or_else(S::zero, State::stop)
    }

    /// Iterates over all transitions as `(source, symbol, target, weight)`.
    pub fn all_transitions(&self) -> impl Iterator<Item = (&str, char, &str, S)> + '_ {
        self.states.values().flat_map(|state| {
            state
                .transitions()
                .map(move |(sym, dest, weight)| (state.name(), sym, dest, weight))
        })
    }

    /// Total number of entries in the compact arc tables of all states.
    pub fn num_arcs(&self) -> usize {
        self.states.values().map(State::num_arcs).sum()
    }

    /// The MDL complexity in bits, as computed at construction (or, for products, the sum of
    /// the complexities of the operands).
    pub fn complexity(&self) -> f64 {
        self.complexity
    }

    pub(crate) fn set_complexity(&mut self, complexity: f64) {
        self.complexity = complexity;
    }

    /// Computes the weight of `word`, which is the product of the start weight, the weights of
    /// all transitions along the path of `word` and the stop weight of the state it ends in.
    /// If `word` is enclosed in [`BOUNDARY`] markers, they are removed first. If the path
    /// breaks off, the weight is zero.
    pub fn weight(&self, word: &str) -> S {
        let word = strip_boundaries(word);
        let Some(mut state) = self.states.get(&self.start) else {
            return S::zero();
        };
        let mut weight = self.start_weight;
        for sym in word.chars() {
            let Some((dest, w)) = state.transition(sym) else {
                trace!("no transition from {} on {sym:?} in {word:?}", state.name());
                return S::zero();
            };
            let Some(next) = self.states.get(dest) else {
                return S::zero();
            };
            weight = weight * w;
            state = next;
        }
        weight * state.stop()
    }

    /// Removes every state that is not reachable from the start state or from which no state
    /// with a non-zero stop weight can be reached, only taking transitions with non-zero weight
    /// into account. Transitions into removed states are pruned from the remaining ones.
    pub fn trim(&mut self) {
        let before = self.states.len();
        let live = |weight: &S| !weight.is_zero();

        let mut reachable: Set<String> = Set::default();
        let mut queue = VecDeque::new();
        if self.states.contains_key(&self.start) {
            reachable.insert(self.start.clone());
            queue.push_back(self.start.as_str());
        }
        while let Some(name) = queue.pop_front() {
            let Some(state) = self.states.get(name) else {
                continue;
            };
            for (_, dest, weight) in state.transitions() {
                if live(&weight)
                    && self.states.contains_key(dest)
                    && reachable.insert(dest.to_string())
                {
                    queue.push_back(dest);
                }
            }
        }

        let mut productive: Set<&str> = self
            .states
            .values()
            .filter(|state| live(&state.stop()))
            .map(State::name)
            .collect();
        loop {
            let found: Vec<&str> = self
                .states
                .values()
                .filter(|state| !productive.contains(state.name()))
                .filter(|state| {
                    state
                        .transitions()
                        .any(|(_, dest, weight)| live(&weight) && productive.contains(dest))
                })
                .map(State::name)
                .collect();
            if found.is_empty() {
                break;
            }
            productive.extend(found);
        }

        let keep: Set<String> = reachable
            .into_iter()
            .filter(|name| productive.contains(name.as_str()))
            .collect();
        let mut dead: Vec<String> = self
            .states
            .keys()
            .filter(|name| !keep.contains(*name))
            .cloned()
            .collect();
        self.states.retain(|name, _| keep.contains(name));

        // targets that never were states must be pruned as well
        for state in self.states.values() {
            for (_, dest, _) in state.transitions() {
                if !keep.contains(dest) && !dead.iter().any(|d| d == dest) {
                    dead.push(dest.to_string());
                }
            }
        }
        for state in self.states.values_mut() {
            for name in &dead {
                state.prune_transitions(name);
            }
        }
        debug!(
            "trimming removed {} of {before} states",
            before - self.states.len()
        );
    }

    /// `icl(|Q|) + icl(arcs)` plus the complexity of each state, where a weight costs
    /// [`Precision::weight_cost`] bits.
    fn literal_complexity(&self) -> f64 {
        let num_states = self.states.len();
        let precision = self.precision;
        let weight_cost = |weight: S| precision.weight_cost(weight.value());
        integer_code_len(num_states)
            + integer_code_len(self.num_arcs())
            + self
                .states
                .values()
                .map(|state| state.complexity(num_states, weight_cost))
                .sum::<f64>()
    }

    /// Maps every weight through `change`, keeping the structure and complexity of the automaton.
    pub fn change_semiring<T: Semiring, F: Fn(S) -> T>(&self, change: F) -> WeightedAutomaton<T> {
        WeightedAutomaton {
            alphabet: self.alphabet.clone(),
            start: self.start.clone(),
            start_weight: change(self.start_weight),
            states: self
                .states
                .iter()
                .map(|(name, state)| (name.clone(), state.change_semiring(&change)))
                .collect(),
            precision: self.precision,
            complexity: self.complexity,
        }
    }

    pub(crate) fn states_mut(&mut self) -> impl Iterator<Item = &mut State<S>> + '_ {
        self.states.values_mut()
    }

    pub(crate) fn scale_start_weight(&mut self, factor: S) {
        self.start_weight = self.start_weight * factor;
    }
}

impl WeightedAutomaton<Probability> {
    /// Converts into the tropical semiring, mapping every weight `p` to `-log_base(p)`.
    pub fn to_tropical(&self, base: f64) -> WeightedAutomaton<Tropical> {
        self.change_semiring(|weight| weight.to_tropical(base))
    }
}

impl WeightedAutomaton<Tropical> {
    /// Converts into the probability semiring, mapping every weight `t` to `base^(-t)`.
    pub fn to_probability(&self, base: f64) -> WeightedAutomaton<Probability> {
        self.change_semiring(|weight| weight.to_probability(base))
    }
}

/// Removes a leading and a trailing [`BOUNDARY`], but only if both are present.
fn strip_boundaries(word: &str) -> &str {
    if word == BOUNDARY.to_string() {
        return "";
    }
    word.strip_prefix(BOUNDARY)
        .and_then(|inner| inner.strip_suffix(BOUNDARY))
        .unwrap_or(word)
}
