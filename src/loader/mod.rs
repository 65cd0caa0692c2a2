//! Trained artifact loading and weight packing.

mod codec;
mod weights;

pub use codec::{
    export_packed, pack, pack_values, read_packed, unpack, unpack_matrix, FC1_BLOB_FILE, FC2_BLOB_FILE,
};
pub use weights::{
    export_weights, load_bias, load_model, load_scales, load_weight_matrix, load_weights, save_scales, LayerParams,
    LayerScales, QuantizedModel, QuantizedWeights, FC1_WEIGHT_FILE, FC2_WEIGHT_FILE, SCALES_FILE,
};
