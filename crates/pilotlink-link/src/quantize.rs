/// Quantization steps per unit: four decimal digits.
pub const SCALE: f64 = 10_000.0;

/// Magnitude from which `value * SCALE` is at least 2^53, where every `f64`
/// is already an integer and no fractional step can be represented.
const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0 / SCALE;

/// Normalize a command parameter to what the board firmware parses safely.
///
/// The value is floored to four decimal digits. A result with no fractional
/// part is nudged up by one step (`1.0` becomes `1.0001`), so every
/// quantized value carries a fractional part on the wire. Values too large
/// to carry four decimal digits, and non-finite values, pass through
/// unchanged.
pub fn quantize(value: f64) -> f64 {
    if !value.is_finite() || value.abs() >= EXACT_LIMIT {
        return value;
    }

    let mut steps = (value * SCALE).floor();
    if steps % SCALE == 0.0 {
        steps += 1.0;
    }
    steps / SCALE
}
