use thiserror::Error;

/// Errors that can occur when constructing or editing an automaton. None of them is
/// retried internally, they are all reported to the immediate caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WfaError {
    /// Two arc declarations disagree on where a concrete symbol leads from the same state.
    #[error("reading {symbol:?} from state {state} leads to both {first} and {second}")]
    LabelingConflict {
        /// The source state.
        state: String,
        /// The symbol on which the declarations collide.
        symbol: char,
        /// Destination and weight of the first declaration.
        first: String,
        /// Destination and weight of the second declaration.
        second: String,
    },
    /// An arc label is not a member of the governing natural class set.
    #[error("the class {class} is not in the natural class set")]
    UnknownClass {
        /// The offending class, rendered as a string of its symbols.
        class: String,
    },
    /// An arc label refers to a category that was never declared.
    #[error("the category {category:?} is not defined")]
    UnknownCategory {
        /// Name of the undefined category.
        category: String,
    },
    /// A symbol belongs to more than one arc set of the same state.
    #[error("the symbol {symbol:?} appears in more than one arc set of state {state}")]
    DuplicateSymbol {
        /// The state whose arc sets overlap.
        state: String,
        /// A symbol shared by two of its arc sets.
        symbol: char,
    },
    /// An arc set was handed to a state it does not originate from.
    #[error("an arc set with source {source_state} cannot be part of state {state}")]
    ForeignArcSet {
        /// The state under construction.
        state: String,
        /// Source of the arc set.
        source_state: String,
    },
    /// Two automata over different alphabets were combined.
    #[error("cannot intersect automata over different alphabets {left} and {right}")]
    AlphabetMismatch {
        /// Alphabet of the left operand.
        left: String,
        /// Alphabet of the right operand.
        right: String,
    },
    /// A weight is too large for the configured exponent width.
    #[error("a {exponent_bits} bit exponent is too small to represent {value}")]
    PrecisionOverflow {
        /// The weight that could not be quantized.
        value: f64,
        /// Configured number of exponent bits.
        exponent_bits: u32,
    },
    /// A parameter index beyond the parameter vector was used.
    #[error("parameter index {index} is out of range for {parameters} parameters")]
    UnknownParameter {
        /// The offending index.
        index: usize,
        /// Length of the parameter vector.
        parameters: usize,
    },
}
