use crate::{
    error::WfaError,
    math::{frexp, ldexp},
};

/// Configures how weights are stored and how many bits a weight costs in the
/// complexity score. By default weights are native 64 bit floats.
///
/// With `reduced` set, every weight is rounded to a binary floating point number with
/// `mantissa_bits` bits of mantissa and `exponent_bits` bits of exponent, see [`quantize`].
/// With `explicit_zero` set, an exact zero weight is assumed to have its own one bit
/// encoding, which costs one additional bit for every other weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Precision {
    /// Whether weights are quantized.
    pub reduced: bool,
    /// Number of mantissa bits of a quantized weight.
    pub mantissa_bits: u32,
    /// Number of exponent bits of a quantized weight.
    pub exponent_bits: u32,
    /// Whether zero weights have a dedicated encoding.
    pub explicit_zero: bool,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            reduced: false,
            mantissa_bits: 10,
            exponent_bits: 5,
            explicit_zero: false,
        }
    }
}

impl Precision {
    /// Bit width of a native weight.
    pub const NATIVE_WIDTH: f64 = 64.0;

    /// Creates a configuration that quantizes weights to the given widths.
    pub fn reduced(mantissa_bits: u32, exponent_bits: u32) -> Self {
        Self {
            reduced: true,
            mantissa_bits,
            exponent_bits,
            explicit_zero: false,
        }
    }

    /// Consumes `self` and returns a configuration with an explicit zero encoding.
    pub fn with_explicit_zero(self) -> Self {
        Self {
            explicit_zero: true,
            ..self
        }
    }

    /// Number of bits used to encode a single weight.
    pub fn weight_len(&self) -> f64 {
        let width = if self.reduced {
            (1 + self.mantissa_bits + self.exponent_bits) as f64
        } else {
            Self::NATIVE_WIDTH
        };
        if self.explicit_zero {
            width + 1.0
        } else {
            width
        }
    }

    /// Cost in bits of encoding the weight with raw value `value`.
    pub fn weight_cost(&self, value: f64) -> f64 {
        if self.explicit_zero && value == 0.0 {
            1.0
        } else {
            self.weight_len()
        }
    }

    /// Rounds `value` to the configured precision, or returns it unchanged if weights are
    /// stored natively.
    pub fn apply(&self, value: f64) -> Result<f64, WfaError> {
        if self.reduced {
            quantize(value, self.mantissa_bits, self.exponent_bits)
        } else {
            Ok(value)
        }
    }
}

/// Rounds `value` to a binary float with `mantissa_bits` bits of mantissa and `exponent_bits`
/// bits of exponent.
///
/// Fails with [`WfaError::PrecisionOverflow`] if the binary exponent of the rounded value
/// exceeds `2^(exponent_bits - 1)`, and flushes to `0.0` if it is below `-2^(exponent_bits - 1)`.
/// Non-finite values (such as the infinite tropical zero) are passed through.
pub fn quantize(value: f64, mantissa_bits: u32, exponent_bits: u32) -> Result<f64, WfaError> {
    if !value.is_finite() {
        return Ok(value);
    }
    let (mantissa, exponent) = frexp(value);
    let limit = 2i64.pow(exponent_bits.saturating_sub(1));
    if (exponent as i64) < -limit {
        return Ok(0.0);
    }
    let scale = 2f64.powi(mantissa_bits as i32);
    let rounded = (mantissa * scale).round() / scale;
    // rounding up to a mantissa of one carries into the exponent
    let (rounded, exponent) = if rounded.abs() >= 1.0 {
        (rounded / 2.0, exponent + 1)
    } else {
        (rounded, exponent)
    };
    if exponent as i64 > limit {
        return Err(WfaError::PrecisionOverflow {
            value,
            exponent_bits,
        });
    }
    Ok(ldexp(rounded, exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_widths() {
        assert_eq!(Precision::default().weight_len(), 64.0);
        assert_eq!(Precision::reduced(10, 5).weight_len(), 16.0);
        assert_eq!(Precision::reduced(10, 5).with_explicit_zero().weight_len(), 17.0);
        let p = Precision::default().with_explicit_zero();
        assert_eq!(p.weight_cost(0.0), 1.0);
        assert_eq!(p.weight_cost(0.5), 65.0);
        assert_eq!(Precision::default().weight_cost(0.0), 64.0);
    }

    #[test]
    fn quantization_rounds_mantissa() {
        // 0.3 = 0.6 * 2^-1, 0.6 * 8 = 4.8 rounds to 5
        assert_eq!(quantize(0.3, 3, 5).unwrap(), 5.0 / 8.0 / 2.0);
        assert_eq!(quantize(0.5, 3, 5).unwrap(), 0.5);
        assert_eq!(quantize(-6.0, 4, 5).unwrap(), -6.0);
        assert_eq!(quantize(0.0, 4, 5).unwrap(), 0.0);
        assert!(quantize(f64::INFINITY, 4, 5).unwrap().is_infinite());
    }

    #[test]
    fn quantization_overflow_and_underflow() {
        // 3 exponent bits allow binary exponents in [-4, 4]
        assert_eq!(quantize(15.0, 10, 3).unwrap(), 15.0);
        assert!(matches!(
            quantize(16.0, 10, 3),
            Err(WfaError::PrecisionOverflow { exponent_bits: 3, .. })
        ));
        assert_eq!(quantize(1.0 / 64.0, 10, 3).unwrap(), 0.0);
        assert_eq!(quantize(1.0 / 16.0, 10, 3).unwrap(), 1.0 / 16.0);
    }

    #[test]
    fn mantissa_carry_is_checked_against_the_exponent_limit() {
        // 15.99 = 0.999375 * 2^4 rounds to 1.0 * 2^4 = 0.5 * 2^5 with three mantissa bits
        assert!(matches!(
            quantize(15.99, 3, 3),
            Err(WfaError::PrecisionOverflow { exponent_bits: 3, .. })
        ));
        assert_eq!(quantize(15.99, 3, 4).unwrap(), 16.0);
        assert_eq!(quantize(-15.99, 3, 4).unwrap(), -16.0);
        assert_eq!(quantize(15.99, 10, 3).unwrap(), 1023.0 / 64.0);
    }

    #[test]
    fn extreme_magnitudes_survive_wide_formats() {
        for value in [1e-310, f64::MIN_POSITIVE / 4.0] {
            assert_eq!(quantize(value, 52, 12).unwrap(), value);
        }
        assert_eq!(quantize(f64::MAX, 53, 11).unwrap(), f64::MAX);
        // 52 bits round the mantissa of f64::MAX up to one, which carries past 2^1024
        assert!(matches!(
            quantize(f64::MAX, 52, 11),
            Err(WfaError::PrecisionOverflow { .. })
        ));
    }

    #[test]
    fn apply_respects_configuration() {
        assert_eq!(Precision::default().apply(0.3).unwrap(), 0.3);
        assert_ne!(Precision::reduced(3, 5).apply(0.3).unwrap(), 0.3);
    }
}
