use crate::arc::quantization::LEAKY_ALPHA;
use crate::loader::QuantizedModel;
use crate::network::{Activation, QuantizedLinear};

/// Side of the downscaled square input image.
pub const IMAGE_SIDE: usize = 14;
/// Flattened input width.
pub const INPUT_FEATURES: usize = IMAGE_SIDE * IMAGE_SIDE;
/// Hidden layer width.
pub const HIDDEN_FEATURES: usize = 16;
/// One logit per digit.
pub const OUTPUT_CLASSES: usize = 10;

/// Shape of the hidden layer weight matrix (out x in).
pub const HIDDEN_SHAPE: [usize; 2] = [HIDDEN_FEATURES, INPUT_FEATURES];
/// Shape of the output layer weight matrix (out x in).
pub const OUTPUT_SHAPE: [usize; 2] = [OUTPUT_CLASSES, HIDDEN_FEATURES];

/// Build the two layers of the 196 -> 16 -> 10 network.
///
/// The hidden layer requantizes through the leaky activation so its output can
/// feed the next tiled product; the output layer keeps raw float logits.
pub fn mlp(model: QuantizedModel) -> (QuantizedLinear, QuantizedLinear) {
    let QuantizedModel { hidden, output } = model;
    let hidden = QuantizedLinear::new("fc1", hidden, Activation::LeakyRequantize { alpha: LEAKY_ALPHA });
    let output = QuantizedLinear::new("fc2", output, Activation::Identity);
    (hidden, output)
}
