use std::collections::BTreeMap;

use tracing::trace;

use crate::{math::Map, semiring::Semiring};

use super::WeightedAutomaton;

/// The result of [`WeightedAutomaton::all_pairs_shortest_distance`]: for every ordered pair of
/// states the semiring sum of the weights of all paths between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Distances<S: Semiring> {
    index: Map<String, usize>,
    matrix: Vec<Vec<S>>,
}

impl<S: Semiring> Distances<S> {
    /// The distance from `from` to `to`, zero if either state is unknown.
    pub fn get(&self, from: &str, to: &str) -> S {
        match (self.index.get(from), self.index.get(to)) {
            (Some(i), Some(j)) => self.matrix[*i][*j],
            _ => S::zero(),
        }
    }

    /// Number of states covered.
    pub fn len(&self) -> usize {
        self.matrix.len()
    }

    /// Returns true if no state is covered.
    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }
}

impl<S: Semiring> WeightedAutomaton<S> {
    /// Computes the distance between every pair of states with the generalized Floyd-Warshall
    /// algorithm of Lehmann. The distance from a state to itself includes the empty path, so it
    /// is at least `one`. Cycles are accounted for through the star of the semiring, which is
    /// only meaningful if the weight of the cycles converges.
    pub fn all_pairs_shortest_distance(&self) -> Distances<S> {
        let names: Vec<&str> = self.state_names().collect();
        let n = names.len();
        let index: Map<String, usize> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();

        let mut d = vec![vec![S::zero(); n]; n];
        for (source, _, dest, weight) in self.all_transitions() {
            if let (Some(i), Some(j)) = (index.get(source), index.get(dest)) {
                d[*i][*j] = d[*i][*j] + weight;
            }
        }

        for k in 0..n {
            let closure = d[k][k].star();
            for i in (0..n).filter(|i| *i != k) {
                for j in (0..n).filter(|j| *j != k) {
                    d[i][j] = d[i][j] + d[i][k] * closure * d[k][j];
                }
            }
            for i in (0..n).filter(|i| *i != k) {
                d[k][i] = closure * d[k][i];
                d[i][k] = d[i][k] * closure;
            }
            d[k][k] = closure;
        }

        Distances { index, matrix: d }
    }

    /// The total weight with which each state reaches termination, i.e. the sum over all
    /// states of the distance to that state times its stop weight.
    pub fn finish_weights(&self, distances: &Distances<S>) -> BTreeMap<String, S> {
        self.state_names()
            .map(|from| {
                let total = self
                    .states()
                    .map(|to| distances.get(from, to.name()) * to.stop())
                    .fold(S::zero(), |acc, w| acc + w);
                (from.to_string(), total)
            })
            .collect()
    }

    /// Pushes the weights towards the start state without changing the weight of any word.
    /// Every state is scaled by its finish weight, so that in the probability semiring the stop
    /// weight and the weights of all outgoing transitions of every state sum up to one, and
    /// the start weight becomes the total weight of all words.
    pub fn push_weight(&mut self) {
        let distances = self.all_pairs_shortest_distance();
        let finish = self.finish_weights(&distances);
        let finish_of = |name: &str| finish.get(name).copied().unwrap_or_else(S::zero);

        for state in self.states_mut() {
            let own = finish_of(state.name());
            let stop = state.stop() / own;
            state.reweight(stop, |dest, weight| S::one() / own * weight * finish_of(dest));
        }
        let (start, _) = self.start();
        let factor = finish_of(start);
        trace!("pushing scales the start weight by {factor}");
        self.scale_start_weight(factor);
    }
}
