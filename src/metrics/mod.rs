/// Prediction scoring: accuracy and tiled-vs-reference agreement.
mod evaluation;

pub use evaluation::{argmax, Evaluation, Verification};
