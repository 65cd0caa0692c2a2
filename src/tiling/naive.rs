use crate::error::{TpuError, TpuResult};
use crate::tensor::MatrixI4;

/// Plain nested-loop matrix-vector product in 32-bit arithmetic (reference implementation).
pub fn matvec_reference(weights: &MatrixI4, input: &[i8]) -> TpuResult<Vec<i32>> {
    if input.len() != weights.cols() {
        return Err(TpuError::shape("matvec input", vec![weights.cols()], vec![input.len()]));
    }
    let out = (0..weights.rows())
        .map(|o| {
            weights
                .row(o)
                .iter()
                .zip(input)
                .map(|(&w, &x)| w as i32 * x as i32)
                .sum()
        })
        .collect();
    Ok(out)
}
