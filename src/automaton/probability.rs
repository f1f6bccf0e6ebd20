use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::semiring::{Probability, Semiring};

use super::WeightedAutomaton;

/// Configures the iterative computation of [`WeightedAutomaton::norm_constant_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormConfig {
    /// The computation has converged once a round adds less than this much stopping mass.
    pub delta: f64,
    /// Upper bound on the number of rounds.
    pub max_iterations: usize,
}

impl Default for NormConfig {
    fn default() -> Self {
        Self {
            delta: 1e-12,
            max_iterations: 700,
        }
    }
}

/// The total weight of all words, together with whether the summation converged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormConstant {
    /// The accumulated weight.
    pub value: f64,
    /// False if the iteration bound was hit first, in which case `value` is a lower bound.
    pub converged: bool,
}

impl WeightedAutomaton<Probability> {
    /// Computes the sum of the weights of all words with the default [`NormConfig`].
    pub fn norm_constant(&self) -> NormConstant {
        self.norm_constant_with(NormConfig::default())
    }

    /// Computes the sum of the weights of all words. Round `i` distributes the weight of all
    /// paths of length `i` over the states they end in and adds the part that stops there. The
    /// sum has converged once a round that reached some stopping state added less than
    /// `config.delta`, or once no path can be extended any more.
    pub fn norm_constant_with(&self, config: NormConfig) -> NormConstant {
        let (start, start_weight) = self.start();
        let mut frontier: BTreeMap<&str, Probability> = BTreeMap::new();
        if self.state(start).is_some() {
            frontier.insert(start, start_weight);
        }
        let mut total = Probability::zero();

        for round in 0..config.max_iterations {
            if frontier.is_empty() {
                debug!("all paths ended after {round} rounds");
                return NormConstant {
                    value: total.value(),
                    converged: true,
                };
            }

            let mut stopped = Probability::zero();
            let mut reached_stop = false;
            for (name, mass) in &frontier {
                let stop = self.stop_weight(name);
                if !stop.is_zero() {
                    stopped = stopped + *mass * stop;
                    reached_stop = true;
                }
            }

            let mut next: BTreeMap<&str, Probability> = BTreeMap::new();
            for (name, mass) in &frontier {
                let Some(state) = self.state(name) else {
                    continue;
                };
                for (_, dest, weight) in state.transitions() {
                    let entry = next.entry(dest).or_insert_with(Probability::zero);
                    *entry = *entry + *mass * weight;
                }
            }

            total = total + stopped;
            if reached_stop && stopped.value() < config.delta {
                debug!("normalizing constant converged after {round} rounds");
                return NormConstant {
                    value: total.value(),
                    converged: true,
                };
            }
            frontier = next;
        }

        warn!(
            "normalizing constant did not converge within {} rounds",
            config.max_iterations
        );
        NormConstant {
            value: total.value(),
            converged: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        prelude::*,
        tests::{assert_close, two_state_probability},
    };

    fn with_b_weight(weight: f64) -> WeightedAutomaton<Probability> {
        AutomatonBuilder::new("ab")
            .with_stops([("0", 0.3), ("1", 0.2)])
            .with_arcs([
                ("$", 'a', "0", 0.3),
                ("$", 'b', "1", 0.7),
                ("0", 'a', "0", 0.5),
                ("0", 'b', "1", weight),
                ("1", 'a', "0", 0.7),
                ("1", 'b', "1", 0.1),
            ])
            .into_automaton("$", Precision::default())
            .unwrap()
    }

    #[test]
    fn stochastic_automaton_sums_to_one() {
        let norm = two_state_probability().norm_constant();
        assert!(norm.converged);
        assert_close(norm.value, 1.0);
    }

    #[test]
    fn norm_follows_arc_weights() {
        let heavier = with_b_weight(0.3).norm_constant();
        assert!(heavier.converged);
        assert!(heavier.value > 1.0);

        let lighter = with_b_weight(0.0).norm_constant();
        assert!(lighter.converged);
        assert!(lighter.value < 1.0);
    }

    #[test]
    fn finite_language_converges_when_paths_end() {
        let wfa: WeightedAutomaton<Probability> = AutomatonBuilder::new("ab")
            .with_stops([("1", 0.5), ("2", 1.0)])
            .with_arcs([("0", 'a', "1", 0.5), ("1", 'b', "2", 0.5)])
            .into_automaton("0", Precision::default())
            .unwrap();
        let norm = wfa.norm_constant();
        assert!(norm.converged);
        assert_close(norm.value, 0.25 + 0.25);
    }

    #[test_log::test]
    fn iteration_bound_is_reported() {
        let wfa: WeightedAutomaton<Probability> = AutomatonBuilder::new("a")
            .with_stops([("0", 0.5)])
            .with_arcs([("0", 'a', "0", 0.5)])
            .into_automaton("0", Precision::default())
            .unwrap();
        let norm = wfa.norm_constant_with(NormConfig {
            delta: 1e-12,
            max_iterations: 3,
        });
        assert!(!norm.converged);
        assert_close(norm.value, 0.5 + 0.25 + 0.125);
    }
}
