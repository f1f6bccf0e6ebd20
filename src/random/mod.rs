use std::collections::BTreeMap;

use tracing::debug;

use crate::prelude::*;

/// Generates a random probability automaton with states `"0"` to `"{size - 1}"` and start state
/// `"0"`. Every state gets a transition on each symbol with probability `density`, whose target
/// is drawn uniformly. The stop weight of every state is drawn from `[0.1, 1)` and the
/// outgoing weights are scaled so that together with the stop weight they sum to a value in
/// `(0.5, 1]`. The automaton is therefore sub-stochastic and the total weight of all words
/// is finite.
///
/// The automaton is trimmed like every other, so it may end up with fewer states.
pub fn random_probability_automaton(
    alphabet: impl Into<Alphabet>,
    size: usize,
    density: f64,
) -> WeightedAutomaton<Probability> {
    let alphabet = alphabet.into();
    let states: Vec<State<Probability>> = (0..size)
        .map(|q| {
            let stop = 0.1 + 0.9 * fastrand::f64();
            let drawn: BTreeMap<char, (String, f64)> = alphabet
                .universe()
                .filter(|_| fastrand::f64() < density)
                .map(|sym| (sym, (fastrand::usize(..size).to_string(), 0.05 + fastrand::f64())))
                .collect();
            let total: f64 = drawn.values().map(|(_, weight)| weight).sum();
            let scale = (1.0 - stop) * (1.0 - 0.5 * fastrand::f64()) / total;
            let transitions = drawn
                .into_iter()
                .map(|(sym, (dest, weight))| (sym, (dest, Probability::new(weight * scale))))
                .collect();
            State::from_transitions(
                q.to_string(),
                alphabet.clone(),
                Probability::new(stop),
                transitions,
                StateKind::Plain,
            )
        })
        .collect();

    let wfa = WeightedAutomaton::from_states(
        alphabet,
        "0",
        Probability::one(),
        states,
        Precision::default(),
    );
    debug!(
        "generated random automaton with {} of {size} states and {} transitions",
        wfa.size(),
        wfa.all_transitions().count()
    );
    wfa
}

/// Draws a word over `alphabet` whose length is uniform in `min..=max`.
pub fn random_word(alphabet: impl Into<Alphabet>, min: usize, max: usize) -> String {
    let symbols: Vec<char> = alphabet.into().universe().collect();
    if symbols.is_empty() {
        return String::new();
    }
    let len = fastrand::usize(min..=max.max(min));
    (0..len)
        .map(|_| symbols[fastrand::usize(..symbols.len())])
        .collect()
}
