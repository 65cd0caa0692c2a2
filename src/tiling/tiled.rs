//! 2x2 tiled matrix-vector product with a 32-bit accumulator.
//!
//! Models the accelerator: the padded matrix is cut into 2x2 blocks, each block
//! is sent to a tile backend together with its 2-entry input slice, and the
//! partial sums are accumulated per output row pair.

use tracing::trace;

use super::{pad_even, Tile, TileOrder, TILE};
use crate::arc::quantization::is_int4;
use crate::backend::TileBackend;
use crate::error::{TpuError, TpuResult};
use crate::tensor::MatrixI4;

/// Zero-pad a row-major matrix to `out_padded x in_padded`.
fn pad_weights(weights: &MatrixI4, out_padded: usize, in_padded: usize) -> Vec<i8> {
    let mut padded = vec![0i8; out_padded * in_padded];
    for o in 0..weights.rows() {
        let dst = o * in_padded;
        padded[dst..dst + weights.cols()].copy_from_slice(weights.row(o));
    }
    padded
}

/// Tiled product in the default row-major tile order.
pub fn tiled_matvec<B>(backend: &mut B, weights: &MatrixI4, input: &[i8]) -> TpuResult<Vec<i32>>
where
    B: TileBackend + ?Sized,
{
    tiled_matvec_ordered(backend, weights, input, TileOrder::RowMajor)
}

/// Tiled product visiting tiles in the given order.
///
/// The result equals [`super::matvec_reference`] for every order. A backend
/// error aborts the pass and the partial accumulator is dropped.
pub fn tiled_matvec_ordered<B>(
    backend: &mut B,
    weights: &MatrixI4,
    input: &[i8],
    order: TileOrder,
) -> TpuResult<Vec<i32>>
where
    B: TileBackend + ?Sized,
{
    let out_dim = weights.rows();
    let in_dim = weights.cols();
    if input.len() != in_dim {
        return Err(TpuError::shape("tiled matvec input", vec![in_dim], vec![input.len()]));
    }
    if let Some((index, &value)) = input.iter().enumerate().find(|(_, &v)| !is_int4(v as i64)) {
        return Err(TpuError::Range { name: "tiled matvec input".to_string(), index, value: value as i64 });
    }

    let out_padded = pad_even(out_dim);
    let in_padded = pad_even(in_dim);

    let w = pad_weights(weights, out_padded, in_padded);
    let mut x = vec![0i8; in_padded];
    x[..in_dim].copy_from_slice(input);

    let mut accum = vec![0i32; out_padded];

    let mut run_tile = |o: usize, i: usize, accum: &mut [i32]| -> TpuResult<()> {
        let tile = Tile::new(
            [
                [w[o * in_padded + i], w[o * in_padded + i + 1]],
                [w[(o + 1) * in_padded + i], w[(o + 1) * in_padded + i + 1]],
            ],
            [x[i], x[i + 1]],
        );
        let partial = backend.execute(&tile)?;
        // int32 accumulators wrap like the hardware registers
        accum[o] = accum[o].wrapping_add(partial[0]);
        accum[o + 1] = accum[o + 1].wrapping_add(partial[1]);
        Ok(())
    };

    match order {
        TileOrder::RowMajor => {
            for o in (0..out_padded).step_by(TILE) {
                for i in (0..in_padded).step_by(TILE) {
                    run_tile(o, i, &mut accum)?;
                }
            }
        }
        TileOrder::ColumnMajor => {
            for i in (0..in_padded).step_by(TILE) {
                for o in (0..out_padded).step_by(TILE) {
                    run_tile(o, i, &mut accum)?;
                }
            }
        }
    }

    trace!(
        out_dim,
        in_dim,
        tiles = (out_padded / TILE) * (in_padded / TILE),
        "tiled matvec complete"
    );

    accum.truncate(out_dim);
    Ok(accum)
}
