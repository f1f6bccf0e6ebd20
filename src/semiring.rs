use std::{
    fmt::{Debug, Display},
    iter::{Product, Sum},
    ops::{Add, Div, Mul},
};

use crate::Show;

/// A semiring of weights. Weights are immutable scalars; `+` combines the weights of
/// competing (parallel) paths, `*` concatenates path segments.
///
/// Division is the inverse of `*` and is needed for weight pushing and for rescaling
/// tied weights. Comparisons are derived from the underlying numeric value.
pub trait Semiring:
    Copy
    + Debug
    + Display
    + PartialEq
    + PartialOrd
    + Add<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Show
{
    /// Human readable name of the semiring.
    const NAME: &'static str;

    /// Wraps a raw numeric value.
    fn new(value: f64) -> Self;

    /// Returns the raw numeric value.
    fn value(self) -> f64;

    /// The additive identity, the weight of "no path".
    fn zero() -> Self;

    /// The multiplicative identity, the weight of the empty path.
    fn one() -> Self;

    /// The Kleene closure `one + self + self * self + ...`.
    ///
    /// Only defined for weights of the closed domain the automata use, that is non-negative
    /// costs and non-negative probabilities. Negative weights give meaningless closures.
    fn star(self) -> Self;

    /// Returns true if `self` is the additive identity.
    fn is_zero(self) -> bool {
        self == Self::zero()
    }

    /// Converts `self` into the tropical semiring, using logarithms to the given `base`.
    fn to_tropical(self, base: f64) -> Tropical;

    /// Converts `self` into the probability semiring, using exponentiation with the given `base`.
    fn to_probability(self, base: f64) -> Probability;
}

/// The tropical (min, +) semiring. Weights are costs, typically negative log probabilities.
/// `zero` is positive infinity and `one` is `0`.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Tropical(f64);

/// The probability (+, *) semiring. `zero` is `0` and `one` is `1`.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Probability(f64);

impl Semiring for Tropical {
    const NAME: &'static str = "tropical";

    fn new(value: f64) -> Self {
        Tropical(value)
    }

    fn value(self) -> f64 {
        self.0
    }

    fn zero() -> Self {
        Tropical(f64::INFINITY)
    }

    fn one() -> Self {
        Tropical(0.0)
    }

    /// Always `one`, since a cycle of non-negative cost never beats the empty path.
    fn star(self) -> Self {
        Self::one()
    }

    fn to_tropical(self, _base: f64) -> Tropical {
        self
    }

    fn to_probability(self, base: f64) -> Probability {
        Probability(base.powf(-self.0))
    }
}

impl Semiring for Probability {
    const NAME: &'static str = "probability";

    fn new(value: f64) -> Self {
        Probability(value)
    }

    fn value(self) -> f64 {
        self.0
    }

    fn zero() -> Self {
        Probability(0.0)
    }

    fn one() -> Self {
        Probability(1.0)
    }

    /// Diverges to infinity for probabilities of `1` or more. Negative values are outside the
    /// domain and also give infinity.
    fn star(self) -> Self {
        if (0.0..1.0).contains(&self.0) {
            Probability(1.0 / (1.0 - self.0))
        } else {
            Probability(f64::INFINITY)
        }
    }

    fn to_tropical(self, base: f64) -> Tropical {
        Tropical(-self.0.log(base))
    }

    fn to_probability(self, _base: f64) -> Probability {
        self
    }
}

impl Add for Tropical {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Tropical(self.0.min(rhs.0))
    }
}

impl Mul for Tropical {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Tropical(self.0 + rhs.0)
    }
}

impl Div for Tropical {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        Tropical(self.0 - rhs.0)
    }
}

impl Add for Probability {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Probability(self.0 + rhs.0)
    }
}

impl Mul for Probability {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Probability(self.0 * rhs.0)
    }
}

impl Div for Probability {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        Probability(self.0 / rhs.0)
    }
}

macro_rules! impl_common {
    ($($ty:ident),*) => {
        $(
            impl Sum for $ty {
                fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                    iter.fold(<$ty as Semiring>::zero(), |acc, w| acc + w)
                }
            }

            impl Product for $ty {
                fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
                    iter.fold(<$ty as Semiring>::one(), |acc, w| acc * w)
                }
            }

            impl From<f64> for $ty {
                fn from(value: f64) -> Self {
                    $ty(value)
                }
            }

            impl From<$ty> for f64 {
                fn from(value: $ty) -> f64 {
                    value.0
                }
            }

            impl Debug for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{} in the {} semiring", self.0, <$ty as Semiring>::NAME)
                }
            }

            impl Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl Show for $ty {
                fn show(&self) -> String {
                    format!("{:.4}", self.0)
                }
            }
        )*
    };
}

impl_common!(Tropical, Probability);
