//! Integer matrix-vector products.
//!
//! Provides the 2x2 tiled product that mirrors the accelerator's PE array,
//! and a naive reference product it must always agree with.

mod naive;
mod tiled;

pub use naive::matvec_reference;
pub use tiled::{tiled_matvec, tiled_matvec_ordered};

/// Edge length of one hardware tile.
pub const TILE: usize = 2;

/// One unit of work for a tile backend: a 2x2 weight window and the
/// 2-element input slice it multiplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub weights: [[i8; 2]; 2],
    pub input: [i8; 2],
}

impl Tile {
    pub fn new(weights: [[i8; 2]; 2], input: [i8; 2]) -> Self {
        Tile { weights, input }
    }

    /// The tile product in 32-bit arithmetic:
    /// `[w00*x0 + w01*x1, w10*x0 + w11*x1]`.
    pub fn product(&self) -> [i32; 2] {
        let w = &self.weights;
        let x0 = self.input[0] as i32;
        let x1 = self.input[1] as i32;
        [
            w[0][0] as i32 * x0 + w[0][1] as i32 * x1,
            w[1][0] as i32 * x0 + w[1][1] as i32 * x1,
        ]
    }

    /// Weights flattened row-major, the order the link expects.
    pub fn flat_weights(&self) -> [i8; 4] {
        let w = &self.weights;
        [w[0][0], w[0][1], w[1][0], w[1][1]]
    }
}

/// Selects the order in which tiles are visited.
///
/// Integer accumulation is associative, so the order changes latency on a
/// hardware backend and never the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileOrder {
    /// Output row pairs outer, input column pairs inner.
    #[default]
    RowMajor,
    /// Input column pairs outer, output row pairs inner.
    ColumnMajor,
}

/// Round up to the next even value.
#[inline]
pub(crate) fn pad_even(n: usize) -> usize {
    n + (n % 2)
}
