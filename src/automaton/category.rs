use std::{
    collections::{BTreeMap, BTreeSet},
    ops::{Deref, DerefMut},
};

use crate::{
    error::WfaError, label::CategoryLabel, math::integer_code_len, precision::Precision,
};

use super::{
    tied::{quantized, tied_states},
    AutomatonBuilder, TiedAutomaton,
};

/// A tied automaton whose arcs are declared with sets of phoneme categories. A label naming
/// several categories stands for the alphabet symbols that belong to all of them.
///
/// The complexity is computed from the declaration rather than from the compact arc tables:
/// every declared arc costs two state indices, a parameter index and its label, where a label of
/// `k` categories costs `icl(k)` plus `k` category indices and a single symbol or the fallback
/// costs one alphabet index.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAutomaton {
    tied: TiedAutomaton,
    categories: BTreeMap<String, BTreeSet<char>>,
}

impl CategoryAutomaton {
    pub(crate) fn from_builder(
        builder: AutomatonBuilder<CategoryLabel, Option<usize>>,
        start: impl Into<String>,
        categories: &BTreeMap<String, BTreeSet<char>>,
        parameters: Vec<f64>,
        precision: Precision,
    ) -> Result<Self, WfaError> {
        let alphabet = builder.alphabet().clone();
        let symbol_cost = ((alphabet.size() + 1) as f64).log2();
        let category_cost = (categories.len() as f64).log2();

        let mut label_cost = 0.0;
        let declaration = builder.declare(start, |label| match label {
            CategoryLabel::Symbol(sym) => {
                label_cost += symbol_cost;
                Ok(Some(BTreeSet::from([sym])))
            }
            CategoryLabel::Other => {
                label_cost += symbol_cost;
                Ok(None)
            }
            CategoryLabel::Categories(names) => {
                label_cost += integer_code_len(names.len()) + names.len() as f64 * category_cost;
                let mut symbols = alphabet.symbols().clone();
                for name in &names {
                    let members =
                        categories
                            .get(name)
                            .ok_or_else(|| WfaError::UnknownCategory {
                                category: name.clone(),
                            })?;
                    symbols.retain(|sym| members.contains(sym));
                }
                Ok(Some(symbols))
            }
        })?;

        let parameters = quantized(parameters, &precision)?;
        let num_arcs = declaration.declared_arcs;
        let num_stops = declaration.stops.len();
        let num_states = declaration.names.len();
        let state_cost = (num_states as f64).log2();
        let parameter_cost = ((parameters.len() + 1) as f64).log2();
        let complexity = num_arcs as f64 * (2.0 * state_cost + parameter_cost)
            + label_cost
            + num_stops as f64 * (state_cost + parameter_cost)
            + parameters.len() as f64 * precision.weight_len()
            + integer_code_len(num_arcs)
            + integer_code_len(parameters.len())
            + integer_code_len(num_states)
            + integer_code_len(num_stops);

        let states = tied_states(&declaration, &parameters, None)?;
        let mut tied = TiedAutomaton::from_states(
            declaration.alphabet,
            declaration.start,
            states,
            parameters,
            precision,
        );
        tied.set_complexity(complexity);
        Ok(Self {
            tied,
            categories: categories.clone(),
        })
    }

    /// Builds the automaton with the single parameter `parameter`. The number of parameters
    /// need not be encoded, which saves `icl(1)` bits.
    pub fn single_parameter(
        builder: AutomatonBuilder<CategoryLabel, Option<usize>>,
        start: impl Into<String>,
        categories: &BTreeMap<String, BTreeSet<char>>,
        parameter: f64,
        precision: Precision,
    ) -> Result<Self, WfaError> {
        let mut automaton =
            Self::from_builder(builder, start, categories, vec![parameter], precision)?;
        let complexity = automaton.complexity() - integer_code_len(1);
        automaton.tied.set_complexity(complexity);
        Ok(automaton)
    }

    /// The categories and their members.
    pub fn categories(&self) -> &BTreeMap<String, BTreeSet<char>> {
        &self.categories
    }

    /// The underlying tied automaton.
    pub fn tied(&self) -> &TiedAutomaton {
        &self.tied
    }
}

impl Deref for CategoryAutomaton {
    type Target = TiedAutomaton;

    fn deref(&self) -> &Self::Target {
        &self.tied
    }
}

impl DerefMut for CategoryAutomaton {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tied
    }
}
