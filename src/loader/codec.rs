//! Nibble packing of int4 weights for flashing the accelerator.
//!
//! Values are flattened row-major and paired: the even-indexed value goes in
//! the low nibble, the odd-indexed value in the high nibble. An odd count gets
//! one trailing zero. The blob carries no header, so unpacking needs the
//! element count (or the matrix shape) from elsewhere.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{TpuError, TpuResult};
use crate::loader::QuantizedWeights;
use crate::tensor::{MatrixI4, PackedI4};

/// Packed hidden layer weights.
pub const FC1_BLOB_FILE: &str = "fc1_weight.bin";
/// Packed output layer weights.
pub const FC2_BLOB_FILE: &str = "fc2_weight.bin";

/// Pack a flat run of int4 values.
pub fn pack_values(values: &[i8]) -> PackedI4 {
    let mut blob = PackedI4::zeroed(values.len());
    for (i, &v) in values.iter().enumerate() {
        blob.set(i, v);
    }
    blob
}

/// Pack a weight matrix in row-major order.
pub fn pack(matrix: &MatrixI4) -> PackedI4 {
    pack_values(matrix.as_slice())
}

/// Recover `count` sign-extended values, dropping the padding nibble.
pub fn unpack(blob: &PackedI4, count: usize) -> TpuResult<Vec<i8>> {
    if count > blob.capacity() || blob.capacity() - count > 1 {
        return Err(TpuError::shape(
            "packed blob",
            vec![(count + 1) / 2],
            vec![blob.len_bytes()],
        ));
    }
    Ok((0..count).map(|i| blob.get(i)).collect())
}

/// Recover a `rows x cols` matrix from its packed blob.
pub fn unpack_matrix(blob: &PackedI4, rows: usize, cols: usize) -> TpuResult<MatrixI4> {
    let values = unpack(blob, rows * cols)?;
    MatrixI4::new("packed blob", rows, cols, values)
}

/// Write one packed blob per layer under `dir`.
pub fn export_packed(weights: &QuantizedWeights, dir: impl AsRef<Path>) -> TpuResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| TpuError::io(dir, e))?;

    let mut written = Vec::with_capacity(2);
    for (file, matrix) in [(FC1_BLOB_FILE, &weights.fc1_weight), (FC2_BLOB_FILE, &weights.fc2_weight)] {
        let path = dir.join(file);
        let blob = pack(matrix);
        fs::write(&path, blob.as_bytes()).map_err(|e| TpuError::io(&path, e))?;
        info!(path = %path.display(), blob = %blob, values = matrix.num_elements(), "wrote packed weights");
        written.push(path);
    }
    Ok(written)
}

/// Read a packed blob written by [`export_packed`].
pub fn read_packed(path: impl AsRef<Path>) -> TpuResult<PackedI4> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| TpuError::io(path, e))?;
    Ok(PackedI4::from_bytes(bytes))
}
