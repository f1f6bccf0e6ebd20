/// Type alias for sets, we use this to hide which type of `HashSet` we are actually using.
pub type Set<S> = fxhash::FxHashSet<S>;
/// Type alias for maps, we use this to hide which type of `HashMap` we are actually using.
pub type Map<K, V> = fxhash::FxHashMap<K, V>;

/// Normalizing constant of Rissanen's universal code for the positive integers.
pub const UNIVERSAL_CODE_CONSTANT: f64 = 2.865064;

/// Estimates the number of bits needed to encode `n` with a self-delimiting code that
/// does not assume an upper bound on `n`. This is Rissanen's universal code for integers: the
/// iterated binary logarithm `log2(n) + log2(log2(n)) + ...` summed over all positive terms,
/// plus `log2(2.865064)`.
///
/// Used wherever a count (of states, arcs or parameters) has to be encoded.
pub fn integer_code_len(n: usize) -> f64 {
    let mut total = UNIVERSAL_CODE_CONSTANT.log2();
    let mut current = (n as f64).log2();
    while current > 0.0 {
        total += current;
        current = current.log2();
    }
    total
}

/// Splits `value` into a mantissa in `[0.5, 1)` (carrying the sign of `value`) and a
/// binary exponent, such that `value == mantissa * 2^exponent`. Zero and non-finite
/// values are returned unchanged with exponent `0`.
pub fn frexp(value: f64) -> (f64, i32) {
    if value == 0.0 || !value.is_finite() {
        return (value, 0);
    }
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // subnormal, scale into the normal range first
        let (mantissa, exponent) = frexp(value * 2f64.powi(54));
        return (mantissa, exponent - 54);
    }
    let mantissa = f64::from_bits((bits & !(0x7ff << 52)) | (1022 << 52));
    (mantissa, biased - 1022)
}

/// Inverse of [`frexp`], computes `mantissa * 2^exponent`.
///
/// The power is applied in two halves, so that results in the subnormal range and close to
/// `f64::MAX` are not lost to an intermediate `2^exponent` that is itself out of range.
pub fn ldexp(mantissa: f64, exponent: i32) -> f64 {
    let half = exponent / 2;
    mantissa * 2f64.powi(half) * 2f64.powi(exponent - half)
}
