use std::{collections::BTreeSet, ops::Deref, rc::Rc};

use tracing::trace;

use crate::{
    alphabet::Alphabet,
    error::WfaError,
    math::integer_code_len,
    natural_class::NaturalClassSet,
    precision::Precision,
    semiring::{Semiring, Tropical},
    state::{group_transitions, ParameterMap, State, TiedKey},
};

use super::{builder::Declaration, WeightedAutomaton};

/// A tropical automaton whose weights are tied to a shared vector of parameters. Changing a
/// parameter through [`TiedAutomaton::set_parameter`] updates every weight tied to it, and
/// only those.
///
/// The automaton keeps an index from parameters to the states that use them, so an update
/// only visits the affected states. All read-only operations of [`WeightedAutomaton`] are
/// available through `Deref`.
#[derive(Debug, Clone, PartialEq)]
pub struct TiedAutomaton {
    automaton: WeightedAutomaton<Tropical>,
    parameters: Vec<f64>,
    usage: Vec<BTreeSet<String>>,
}

impl TiedAutomaton {
    /// Assembles a tied automaton from states whose parameter maps refer to `parameters`.
    /// The automaton is trimmed and its complexity computed.
    pub fn from_states<I: IntoIterator<Item = State<Tropical>>>(
        alphabet: Alphabet,
        start: impl Into<String>,
        states: I,
        parameters: Vec<f64>,
        precision: Precision,
    ) -> Self {
        let mut tied = Self::assemble(
            alphabet,
            start,
            Tropical::one(),
            states,
            parameters,
            precision,
        );
        let complexity = tied.tied_complexity();
        tied.automaton.set_complexity(complexity);
        tied
    }

    pub(crate) fn assemble<I: IntoIterator<Item = State<Tropical>>>(
        alphabet: Alphabet,
        start: impl Into<String>,
        start_weight: Tropical,
        states: I,
        parameters: Vec<f64>,
        precision: Precision,
    ) -> Self {
        let automaton =
            WeightedAutomaton::assemble(alphabet, start, start_weight, states, precision);
        let mut tied = Self {
            automaton,
            parameters,
            usage: Vec::new(),
        };
        tied.index_usage();
        tied
    }

    pub(crate) fn from_declaration(
        declaration: Declaration<Option<usize>>,
        parameters: Vec<f64>,
        precision: Precision,
    ) -> Result<Self, WfaError> {
        let parameters = quantized(parameters, &precision)?;
        let states = tied_states(&declaration, &parameters, None)?;
        Ok(Self::from_states(
            declaration.alphabet,
            declaration.start,
            states,
            parameters,
            precision,
        ))
    }

    /// The current values of the parameters.
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    /// Names of the states that have a weight tied to parameter `index`.
    pub fn states_using(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.usage
            .get(index)
            .into_iter()
            .flatten()
            .map(|name| name.as_str())
    }

    /// Sets parameter `index` to `value` (rounded to the precision of the automaton) and
    /// rescales every weight tied to it.
    pub fn set_parameter(&mut self, index: usize, value: f64) -> Result<(), WfaError> {
        let Some(old) = self.parameters.get(index).copied() else {
            return Err(WfaError::UnknownParameter {
                index,
                parameters: self.parameters.len(),
            });
        };
        let value = self.automaton.precision().apply(value)?;
        trace!("setting parameter {index} from {old} to {value}");
        for name in &self.usage[index] {
            if let Some(state) = self.automaton.state_mut(name) {
                state.change_parameter(index, Tropical::new(value), Tropical::new(old));
            }
        }
        self.parameters[index] = value;
        Ok(())
    }

    /// Trims the automaton and rebuilds the index of parameter usage.
    pub fn trim(&mut self) {
        self.automaton.trim();
        self.index_usage();
    }

    /// Gives up the parameters, returning the underlying automaton with its current weights.
    pub fn into_automaton(self) -> WeightedAutomaton<Tropical> {
        self.automaton
    }

    pub(crate) fn set_complexity(&mut self, complexity: f64) {
        self.automaton.set_complexity(complexity);
    }

    fn index_usage(&mut self) {
        self.usage = (0..self.parameters.len())
            .map(|index| {
                self.automaton
                    .states()
                    .filter(|state| state.uses_parameter(index))
                    .map(|state| state.name().to_string())
                    .collect()
            })
            .collect();
    }

    /// `icl(|Q|) + icl(arcs) + icl(|params|) + |params| * weightLen` plus the state
    /// complexities, where a weight is encoded as the index of its parameter.
    pub(crate) fn tied_complexity(&self) -> f64 {
        let num_states = self.automaton.size();
        let num_parameters = self.parameters.len();
        let parameter_cost = ((num_parameters + 1) as f64).log2();
        integer_code_len(num_states)
            + integer_code_len(self.automaton.num_arcs())
            + integer_code_len(num_parameters)
            + num_parameters as f64 * self.automaton.precision().weight_len()
            + self
                .automaton
                .states()
                .map(|state| state.complexity(num_states, |_| parameter_cost))
                .sum::<f64>()
    }
}

impl Deref for TiedAutomaton {
    type Target = WeightedAutomaton<Tropical>;

    fn deref(&self) -> &Self::Target {
        &self.automaton
    }
}

pub(crate) fn quantized(parameters: Vec<f64>, precision: &Precision) -> Result<Vec<f64>, WfaError> {
    parameters
        .into_iter()
        .map(|value| precision.apply(value))
        .collect()
}

/// Builds one tied state per declared name. Each state gets a parameter map with room for all
/// parameters, in which the symbols of an arc (and the stop weight) declared with index `i`
/// are tied to parameter `i`. With `classes`, class-labelled states are built instead.
pub(crate) fn tied_states(
    declaration: &Declaration<Option<usize>>,
    parameters: &[f64],
    classes: Option<&Rc<NaturalClassSet>>,
) -> Result<Vec<State<Tropical>>, WfaError> {
    let value = |index: Option<usize>| match index {
        None => Ok(Tropical::one()),
        Some(index) => parameters
            .get(index)
            .map(|value| Tropical::new(*value))
            .ok_or(WfaError::UnknownParameter {
                index,
                parameters: parameters.len(),
            }),
    };

    let mut states = Vec::with_capacity(declaration.names.len());
    for name in &declaration.names {
        let mut map = ParameterMap::new(parameters.len());
        let stop = match declaration.stops.get(name) {
            None => Tropical::zero(),
            Some(index) => {
                if let Some(index) = index {
                    map.tie(*index, TiedKey::Stop);
                }
                value(*index)?
            }
        };

        let mut arcsets = Vec::new();
        for arcset in group_transitions(name, &declaration.transitions_of(name)) {
            if let Some(index) = arcset.weight {
                for sym in &arcset.letters {
                    map.tie(index, TiedKey::Symbol(*sym));
                }
            }
            let weight = value(arcset.weight)?;
            arcsets.push(arcset.map_weight(|_| weight));
        }

        states.push(match classes {
            Some(classes) => {
                State::with_classes(name.clone(), classes.clone(), stop, map, arcsets)?
            }
            None => State::tied(
                name.clone(),
                declaration.alphabet.clone(),
                stop,
                map,
                arcsets,
            )?,
        });
    }
    Ok(states)
}
