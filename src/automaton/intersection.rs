use tracing::debug;

use crate::{
    error::WfaError,
    semiring::{Semiring, Tropical},
    state::{product_name, State},
    Show,
};

use super::{CategoryAutomaton, ClassAutomaton, TiedAutomaton, WeightedAutomaton};

/// The product construction. The product of two automata assigns to every word the product of
/// the weights both operands assign to it.
///
/// The type of the product depends on the operands: two plain automata give a plain automaton,
/// as soon as one operand has parameters the product is a [`TiedAutomaton`] whose parameter
/// vector is the concatenation of the operands' parameters (a plain operand contributes none).
/// The complexity of the product is the sum of the operands' complexities.
pub trait Intersect<Rhs: ?Sized = Self> {
    /// The type of the product automaton.
    type Output;

    /// Builds the product of `self` and `other`, which must have the same alphabet.
    fn intersect(&self, other: &Rhs) -> Result<Self::Output, WfaError>;
}

/// Combines every state of `left` with every state of `right`.
fn product_states<S: Semiring>(
    left: &WeightedAutomaton<S>,
    right: &WeightedAutomaton<S>,
) -> Result<Vec<State<S>>, WfaError> {
    if left.alphabet() != right.alphabet() {
        return Err(WfaError::AlphabetMismatch {
            left: left.alphabet().show(),
            right: right.alphabet().show(),
        });
    }
    let states: Vec<State<S>> = left
        .states()
        .flat_map(|l| right.states().map(move |r| l.combine(r)))
        .collect();
    debug!(
        "combined {} and {} states into {} product states",
        left.size(),
        right.size(),
        states.len()
    );
    Ok(states)
}

fn product_start<S: Semiring>(
    left: &WeightedAutomaton<S>,
    right: &WeightedAutomaton<S>,
) -> (String, S) {
    let (left_name, left_weight) = left.start();
    let (right_name, right_weight) = right.start();
    (product_name(left_name, right_name), left_weight * right_weight)
}

/// The tied product of two tropical automata with the given parameter vectors.
fn tied_product(
    left: &WeightedAutomaton<Tropical>,
    left_parameters: &[f64],
    right: &WeightedAutomaton<Tropical>,
    right_parameters: &[f64],
) -> Result<TiedAutomaton, WfaError> {
    let states = product_states(left, right)?;
    let (start, start_weight) = product_start(left, right);
    let parameters = left_parameters
        .iter()
        .chain(right_parameters)
        .copied()
        .collect();
    let mut product = TiedAutomaton::assemble(
        left.alphabet().clone(),
        start,
        start_weight,
        states,
        parameters,
        *left.precision(),
    );
    product.set_complexity(left.complexity() + right.complexity());
    Ok(product)
}

impl<S: Semiring> Intersect for WeightedAutomaton<S> {
    type Output = WeightedAutomaton<S>;

    fn intersect(&self, other: &Self) -> Result<Self::Output, WfaError> {
        let states = product_states(self, other)?;
        let (start, start_weight) = product_start(self, other);
        let mut product = WeightedAutomaton::assemble(
            self.alphabet().clone(),
            start,
            start_weight,
            states,
            *self.precision(),
        );
        product.set_complexity(self.complexity() + other.complexity());
        Ok(product)
    }
}

impl Intersect for TiedAutomaton {
    type Output = TiedAutomaton;

    fn intersect(&self, other: &Self) -> Result<Self::Output, WfaError> {
        tied_product(self, self.parameters(), other, other.parameters())
    }
}

impl Intersect<WeightedAutomaton<Tropical>> for TiedAutomaton {
    type Output = TiedAutomaton;

    fn intersect(&self, other: &WeightedAutomaton<Tropical>) -> Result<Self::Output, WfaError> {
        tied_product(self, self.parameters(), other, &[])
    }
}

impl Intersect<TiedAutomaton> for WeightedAutomaton<Tropical> {
    type Output = TiedAutomaton;

    fn intersect(&self, other: &TiedAutomaton) -> Result<Self::Output, WfaError> {
        tied_product(self, &[], other, other.parameters())
    }
}

impl Intersect for ClassAutomaton {
    type Output = TiedAutomaton;

    fn intersect(&self, other: &Self) -> Result<Self::Output, WfaError> {
        self.tied().intersect(other.tied())
    }
}

impl Intersect for CategoryAutomaton {
    type Output = TiedAutomaton;

    fn intersect(&self, other: &Self) -> Result<Self::Output, WfaError> {
        self.tied().intersect(other.tied())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        prelude::*,
        tests::{assert_close, other_two_state_probability, two_state_probability},
    };

    #[test_log::test]
    fn product_of_probability_automata() {
        let left = two_state_probability();
        let right = other_two_state_probability();
        let product = left.intersect(&right).unwrap();

        assert_eq!(product.start(), ("$%$", Probability::one()));
        for (state, stop) in [("0%0", 0.09), ("0%1", 0.06), ("1%0", 0.06), ("1%1", 0.04)] {
            assert_close(product.stop_weight(state).value(), stop);
        }
        let expected = [
            ("$%$", 'a', "0%0", 0.09),
            ("$%$", 'b', "1%1", 0.49),
            ("0%0", 'a', "0%1", 0.2),
            ("0%0", 'b', "1%0", 0.08),
            ("0%1", 'a', "0%0", 0.25),
            ("0%1", 'b', "1%1", 0.06),
            ("1%0", 'a', "0%1", 0.28),
            ("1%0", 'b', "1%0", 0.04),
            ("1%1", 'a', "0%0", 0.35),
            ("1%1", 'b', "1%1", 0.03),
        ];
        for (source, sym, dest, weight) in expected {
            let (reached, w) = product.transition(source, sym).unwrap();
            assert_eq!(reached, dest);
            assert_close(w.value(), weight);
        }
        // combinations with one start state are unreachable
        assert_eq!(product.size(), 5);
        assert_close(product.complexity(), left.complexity() + right.complexity());

        for word in ["", "a", "ab", "bbab", "abaab"] {
            assert_close(
                product.weight(word).value(),
                left.weight(word).value() * right.weight(word).value(),
            );
        }
    }

    #[test]
    fn different_alphabets_cannot_be_intersected() {
        let left = two_state_probability();
        let right: WeightedAutomaton<Probability> = AutomatonBuilder::<ArcLabel, _>::new("abc")
            .with_stops([("0", 1.0)])
            .into_automaton("0", Precision::default())
            .unwrap();
        assert!(matches!(
            left.intersect(&right),
            Err(WfaError::AlphabetMismatch { .. })
        ));
    }
}
