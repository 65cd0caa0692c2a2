use proptest::prelude::*;

use microtpu::backend::{BackendMode, SoftwareBackend, TileBackend};
use microtpu::error::{TpuError, TpuResult};
use microtpu::tensor::MatrixI4;
use microtpu::tiling::*;

/// Software backend that records every tile it runs.
#[derive(Default)]
struct RecordingBackend {
    tiles: Vec<Tile>,
}

impl TileBackend for RecordingBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Software
    }

    fn execute(&mut self, tile: &Tile) -> TpuResult<[i32; 2]> {
        self.tiles.push(*tile);
        Ok(tile.product())
    }
}

fn matrix(rows: usize, cols: usize, values: &[i8]) -> MatrixI4 {
    MatrixI4::new("test", rows, cols, values.to_vec()).unwrap()
}

#[test]
fn tile_product_formula() {
    let tile = Tile::new([[1, -2], [3, 4]], [5, -6]);
    assert_eq!(tile.product(), [1 * 5 + -2 * -6, 3 * 5 + 4 * -6]);
    assert_eq!(tile.flat_weights(), [1, -2, 3, 4]);
}

#[test]
fn even_shape_matches_reference() {
    let w = matrix(2, 4, &[1, -2, 3, -4, 5, 6, -7, -8]);
    let x = [2, 3, -1, 7];
    let expected = matvec_reference(&w, &x).unwrap();
    assert_eq!(expected, vec![2 - 6 - 3 - 28, 10 + 18 + 7 - 56]);
    assert_eq!(tiled_matvec(&mut SoftwareBackend::new(), &w, &x).unwrap(), expected);
}

#[test]
fn odd_shape_is_padded_and_truncated() {
    let w = matrix(3, 5, &[1, 2, 3, 4, 5, -1, -2, -3, -4, -5, 7, -8, 7, -8, 7]);
    let x = [1, -1, 2, -2, 3];
    let mut backend = RecordingBackend::default();
    let out = tiled_matvec(&mut backend, &w, &x).unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(out, matvec_reference(&w, &x).unwrap());
    // padded to 4 x 6: two row pairs times three column pairs
    assert_eq!(backend.tiles.len(), 6);
    // last column pair holds the padding column
    assert_eq!(backend.tiles[2].input, [3, 0]);
    assert_eq!(backend.tiles[2].weights, [[5, 0], [-5, 0]]);
    // second row pair holds the padding row
    assert_eq!(backend.tiles[3].weights[1], [0, 0]);
}

#[test]
fn accumulator_exceeds_int4_range() {
    let w = matrix(1, 196, &[-8; 196]);
    let x = vec![-8i8; 196];
    let out = tiled_matvec(&mut SoftwareBackend::new(), &w, &x).unwrap();
    assert_eq!(out, vec![196 * 64]);
}

#[test]
fn single_element_matrix() {
    let w = matrix(1, 1, &[-3]);
    let out = tiled_matvec(&mut SoftwareBackend::new(), &w, &[5]).unwrap();
    assert_eq!(out, vec![-15]);
}

#[test]
fn tile_order_changes_visit_sequence_not_result() {
    let values: Vec<i8> = (0..6 * 8).map(|i| ((i * 5) % 16) as i8 - 8).collect();
    let w = matrix(6, 8, &values);
    let x = [7, -8, 1, 0, -3, 2, 6, -5];

    let mut row_major = RecordingBackend::default();
    let mut col_major = RecordingBackend::default();
    let a = tiled_matvec_ordered(&mut row_major, &w, &x, TileOrder::RowMajor).unwrap();
    let b = tiled_matvec_ordered(&mut col_major, &w, &x, TileOrder::ColumnMajor).unwrap();

    assert_eq!(a, b);
    assert_eq!(row_major.tiles.len(), col_major.tiles.len());
    assert_ne!(row_major.tiles, col_major.tiles);
}

#[test]
fn input_length_mismatch_is_shape_error() {
    let w = matrix(2, 2, &[1, 1, 1, 1]);
    let err = tiled_matvec(&mut SoftwareBackend::new(), &w, &[1, 2, 3]).unwrap_err();
    assert!(matches!(err, TpuError::Shape { .. }));
}

#[test]
fn out_of_range_input_is_rejected() {
    let w = matrix(2, 2, &[1, 1, 1, 1]);
    let err = tiled_matvec(&mut SoftwareBackend::new(), &w, &[1, 9]).unwrap_err();
    assert!(matches!(err, TpuError::Range { index: 1, value: 9, .. }));
}

fn int4() -> impl Strategy<Value = i8> {
    -8i8..=7
}

fn matvec_case() -> impl Strategy<Value = (usize, usize, Vec<i8>, Vec<i8>)> {
    (1usize..12, 1usize..24).prop_flat_map(|(rows, cols)| {
        (
            Just(rows),
            Just(cols),
            proptest::collection::vec(int4(), rows * cols),
            proptest::collection::vec(int4(), cols),
        )
    })
}

proptest! {
    #[test]
    fn prop_tiled_equals_reference((rows, cols, w, x) in matvec_case()) {
        let w = MatrixI4::new("prop", rows, cols, w).unwrap();
        let expected = matvec_reference(&w, &x).unwrap();
        let row_major = tiled_matvec_ordered(&mut SoftwareBackend::new(), &w, &x, TileOrder::RowMajor).unwrap();
        let col_major = tiled_matvec_ordered(&mut SoftwareBackend::new(), &w, &x, TileOrder::ColumnMajor).unwrap();
        prop_assert_eq!(&row_major, &expected);
        prop_assert_eq!(&col_major, &expected);
    }

    #[test]
    fn prop_tiles_cover_padded_grid((rows, cols, w, x) in matvec_case()) {
        let w = MatrixI4::new("prop", rows, cols, w).unwrap();
        let mut backend = RecordingBackend::default();
        let out = tiled_matvec(&mut backend, &w, &x).unwrap();

        let col_pairs = (cols + 1) / 2;
        prop_assert_eq!(out.len(), rows);
        prop_assert_eq!(backend.tiles.len(), ((rows + 1) / 2) * col_pairs);
        // row-major: the column pair advances fastest, the odd tail reads a zero
        for (k, tile) in backend.tiles.iter().enumerate() {
            let i = (k % col_pairs) * 2;
            prop_assert_eq!(tile.input[0], x[i]);
            prop_assert_eq!(tile.input[1], if i + 1 < cols { x[i + 1] } else { 0 });
        }
    }
}
