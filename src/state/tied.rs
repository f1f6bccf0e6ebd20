use std::collections::BTreeSet;

use itertools::Itertools;

use crate::Show;

/// Identifies a weight of a state that can be tied to a parameter: either the stop weight
/// or the transition on a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TiedKey {
    /// The stop weight of the state.
    Stop,
    /// The transition on the given symbol.
    Symbol(char),
}

impl Show for TiedKey {
    fn show(&self) -> String {
        match self {
            TiedKey::Stop => "_stop".to_string(),
            TiedKey::Symbol(sym) => sym.to_string(),
        }
    }
}

/// Index from parameter ids to the weights of one state that are governed by them. Position
/// `i` holds the keys whose weight is a multiplicative function of parameter `i`.
///
/// The map always has one entry per parameter of the owning automaton, even if the state
/// does not use that parameter, so that maps of two states can be concatenated for a
/// product state without renumbering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterMap(Vec<BTreeSet<TiedKey>>);

impl ParameterMap {
    /// Creates a map for `parameters` parameters, none of which governs anything yet.
    pub fn new(parameters: usize) -> Self {
        Self(vec![BTreeSet::new(); parameters])
    }

    /// Number of parameters the map has room for.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the map is for zero parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ties `key` to parameter `index`. Does nothing if `index` is out of range.
    pub fn tie(&mut self, index: usize, key: TiedKey) {
        if let Some(keys) = self.0.get_mut(index) {
            keys.insert(key);
        }
    }

    /// Returns true if some weight is tied to parameter `index`.
    pub fn uses(&self, index: usize) -> bool {
        self.0.get(index).is_some_and(|keys| !keys.is_empty())
    }

    /// Returns the keys tied to parameter `index`.
    pub fn keys(&self, index: usize) -> impl Iterator<Item = &TiedKey> + '_ {
        self.0.get(index).into_iter().flatten()
    }

    /// Concatenates `self` and `other`, so that index `i` of `other` becomes `self.len() + i`.
    pub fn concat(&self, other: &Self) -> Self {
        Self(self.0.iter().chain(other.0.iter()).cloned().collect())
    }

    /// Drops every key for which `keep` returns false.
    pub fn retain<F: Fn(&TiedKey) -> bool>(&mut self, keep: F) {
        for keys in &mut self.0 {
            keys.retain(&keep);
        }
    }
}

impl Show for ParameterMap {
    fn show(&self) -> String {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, keys)| !keys.is_empty())
            .map(|(i, keys)| format!("p{i}: {}", keys.iter().map(|k| k.show()).join("")))
            .join(", ")
    }
}
