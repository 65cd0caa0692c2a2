use crate::error::{TpuError, TpuResult};

/// Smallest value representable in the int4 domain.
pub const INT4_MIN: i8 = -8;
/// Largest value representable in the int4 domain.
pub const INT4_MAX: i8 = 7;
/// Negative slope of the hidden-layer leaky activation.
pub const LEAKY_ALPHA: f32 = 0.25;

/// Round to the nearest integer and clamp into [-8, 7].
///
/// Ties round to even (`0.5 -> 0`, `1.5 -> 2`, `-2.5 -> -2`), matching the
/// float reference used at training time. NaN maps to 0.
pub fn quantize4(x: f32) -> i8 {
    if x.is_nan() {
        return 0;
    }
    libm::rintf(x).clamp(INT4_MIN as f32, INT4_MAX as f32) as i8
}

/// Leaky activation followed by int4 requantization.
pub fn leaky_requantize(x: f32, alpha: f32) -> i8 {
    let y = if x >= 0.0 { x } else { alpha * x };
    quantize4(y)
}

/// Elementwise [`quantize4`].
pub fn quantize_slice(values: &[f32]) -> Vec<i8> {
    values.iter().map(|&v| quantize4(v)).collect()
}

/// True if `v` lies in the int4 domain.
pub fn is_int4(v: i64) -> bool {
    (INT4_MIN as i64..=INT4_MAX as i64).contains(&v)
}

/// Quantize trained float weights by their learned scale: `clamp(round(w / scale), -8, 7)`.
pub fn quantize_weights(weights: &[f32], scale: f32) -> TpuResult<Vec<i8>> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(TpuError::configuration(
            "<scale>",
            format!("scale must be positive and finite, got {}", scale),
        ));
    }
    Ok(weights.iter().map(|&w| quantize4(w / scale)).collect())
}

/// Map a quantized weight back to its float magnitude.
#[inline]
pub fn dequantize(q: i8, scale: f32) -> f32 {
    q as f32 * scale
}
