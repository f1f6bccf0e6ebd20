//! Library for building, combining and measuring deterministic weighted finite-state automata.
//!
//! A weighted automaton consists of an [`Alphabet`], a collection of named states, a start state with a
//! start weight, and weighted transitions. Every state may additionally carry a stop weight. Weights are
//! values of a [`Semiring`], which is either the [`semiring::Tropical`] semiring (costs, combined by `min`
//! and `+`) or the [`semiring::Probability`] semiring (combined by `+` and `*`). The weight of a word is the
//! product of the weights along its (unique) path, including the start and stop weight.
//!
//! All automata in this crate are letter-deterministic: every state has at most one outgoing transition per
//! symbol. Transitions with the same target and weight are declared together as an [`arc_set::ArcSet`]. Apart
//! from the literal transition function, each state keeps a compact arc table in which the largest arc set
//! can be folded into a single fallback label [`ArcLabel::Other`]. This compact table is what the minimum
//! description length (MDL) score in [`WeightedAutomaton::complexity`] is computed from.
//!
//! The most important type is [`WeightedAutomaton`], which provides
//! - the evaluation of words through [`WeightedAutomaton::weight`],
//! - trimming of unreachable and dead states,
//! - the product construction via [`Intersect`],
//! - all-pairs shortest distances and weight pushing.
//!
//! On top of that, [`automaton::TiedAutomaton`] ties arc weights to a shared parameter vector that can be
//! edited in place, while [`automaton::ClassAutomaton`] and [`automaton::CategoryAutomaton`] accept arc labels
//! denoting whole natural classes of phonemes, which are expanded into single symbols on construction.
//!
//! Automata are usually assembled with an [`AutomatonBuilder`]:
//! ```
//! use wfsa::prelude::*;
//!
//! let wfa: WeightedAutomaton<Probability> = AutomatonBuilder::new("ab")
//!     .with_stops([("0", 0.3), ("1", 0.2)])
//!     .with_arcs([
//!         ("$", 'a', "0", 0.3),
//!         ("$", 'b', "1", 0.7),
//!         ("0", 'a', "0", 0.5),
//!         ("0", 'b', "1", 0.2),
//!         ("1", 'a', "0", 0.7),
//!         ("1", 'b', "1", 0.1),
//!     ])
//!     .into_automaton("$", Precision::default())
//!     .unwrap();
//! assert!((wfa.weight("ab").value() - 0.012).abs() < 1e-9);
//! ```
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude is supposed to make using this package easier. Including everything, i.e.
/// `use wfsa::prelude::*;` should be enough to use the package.
pub mod prelude {
    pub use super::{
        alphabet::Alphabet,
        arc_set::{covering_labels, ArcSet, ClassArcSet},
        automaton::{
            AutomatonBuilder, CategoryAutomaton, ClassAutomaton, Distances, Intersect,
            NormConfig, NormConstant, TiedAutomaton, WeightedAutomaton,
        },
        error::WfaError,
        label::{ArcLabel, CategoryLabel},
        math::{self, integer_code_len},
        natural_class::NaturalClassSet,
        precision::Precision,
        semiring::{Probability, Semiring, Tropical},
        state::{ParameterMap, State, StateKind, TiedKey},
        Show,
    };
}

/// Contains definitions of mathematical helpers used throughout the crate, most importantly the
/// universal code length for integers.
pub mod math;

/// Defines the two semirings over which automata can be weighted.
pub mod semiring;

/// Reduced-precision encoding of weights.
pub mod precision;

/// The error type of this crate.
pub mod error;

/// Alphabets of `char` symbols.
pub mod alphabet;
pub use alphabet::Alphabet;

/// Arc labels as they appear in compact arc tables and in construction input.
pub mod label;
pub use label::ArcLabel;

/// Bundles of parallel transitions.
pub mod arc_set;

/// Sets of natural classes that are closed under intersection.
pub mod natural_class;

/// The transition function of a single state.
pub mod state;

/// Defines weighted automata and the algorithms operating on them.
pub mod automaton;
pub use automaton::{AutomatonBuilder, Intersect, WeightedAutomaton};
pub use semiring::Semiring;

/// Generation of random automata and words.
#[cfg(feature = "random")]
pub mod random;

use itertools::Itertools;

/// Helper trait which can be used to display weights, labels, states and automata.
pub trait Show {
    /// Returns a human readable representation of `self`. For a weight this is simply the underlying
    /// value, for a label it is the symbol or the set of symbols it denotes.
    fn show(&self) -> String;

    /// Show a collection of the thing, for a collection of symbols this should be {a, b, c, ...}.
    fn show_collection<'a, I>(iter: I) -> String
    where
        Self: 'a,
        I: IntoIterator<Item = &'a Self>,
    {
        format!("{{{}}}", iter.into_iter().map(|x| x.show()).join(", "))
    }
}

impl Show for char {
    fn show(&self) -> String {
        self.to_string()
    }

    fn show_collection<'a, I: IntoIterator<Item = &'a Self>>(iter: I) -> String
    where
        Self: 'a,
    {
        format!("\"{}\"", iter.into_iter().join(""))
    }
}

impl Show for usize {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl Show for String {
    fn show(&self) -> String {
        self.clone()
    }
}

impl Show for str {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl<S: Show> Show for Option<S> {
    fn show(&self) -> String {
        match self {
            None => "-".to_string(),
            Some(x) => x.show(),
        }
    }
}

impl<S: Show, T: Show> Show for (S, T) {
    fn show(&self) -> String {
        format!("({}, {})", self.0.show(), self.1.show())
    }
}

impl<S: Show + ?Sized> Show for &S {
    fn show(&self) -> String {
        S::show(*self)
    }
}

impl Show for std::collections::BTreeSet<char> {
    fn show(&self) -> String {
        char::show_collection(self.iter())
    }
}
