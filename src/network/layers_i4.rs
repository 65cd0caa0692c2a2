use tracing::debug;

use crate::arc::quantization::{dequantize, leaky_requantize, quantize4, quantize_slice};
use crate::backend::TileBackend;
use crate::error::{TpuError, TpuResult};
use crate::loader::LayerParams;
use crate::tiling::{tiled_matvec_ordered, TileOrder};

/// What a layer does with its rescaled output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    /// Pass the float output through unquantized.
    Identity,
    /// Leaky ReLU with the given negative slope, then requantize to int4.
    LeakyRequantize { alpha: f32 },
}

impl Activation {
    fn apply(&self, x: f32) -> f32 {
        match *self {
            Activation::Identity => x,
            Activation::LeakyRequantize { alpha } => leaky_requantize(x, alpha) as f32,
        }
    }
}

/// One quantized fully-connected layer.
///
/// The integer part runs as a tiled product on a [`TileBackend`]; rescaling,
/// bias and activation run on the host in f32.
pub struct QuantizedLinear {
    name: &'static str,
    params: LayerParams,
    activation: Activation,
    order: TileOrder,
}

impl QuantizedLinear {
    pub fn new(name: &'static str, params: LayerParams, activation: Activation) -> Self {
        QuantizedLinear { name, params, activation, order: TileOrder::RowMajor }
    }

    pub fn with_tile_order(mut self, order: TileOrder) -> Self {
        self.order = order;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn in_features(&self) -> usize {
        self.params.weight.cols()
    }

    pub fn out_features(&self) -> usize {
        self.params.weight.rows()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn params(&self) -> &LayerParams {
        &self.params
    }

    /// Packed weight bytes plus f32 bias bytes.
    pub fn weight_memory_bytes(&self) -> usize {
        (self.params.weight.num_elements() + 1) / 2 + self.params.bias.len() * 4
    }

    fn check_input(&self, input: &[f32]) -> TpuResult<()> {
        if input.len() != self.in_features() {
            return Err(TpuError::shape(
                format!("{} input", self.name),
                vec![self.in_features()],
                vec![input.len()],
            ));
        }
        Ok(())
    }

    /// Hardware-equivalent forward pass.
    ///
    /// The input is requantized to int4 (a no-op for values already in the
    /// domain), multiplied tile by tile into i32 accumulators, rescaled as
    /// `acc * scale + bias`, then passed through the activation.
    pub fn forward<B>(&self, backend: &mut B, input: &[f32]) -> TpuResult<Vec<f32>>
    where
        B: TileBackend + ?Sized,
    {
        self.check_input(input)?;
        let x = quantize_slice(input);
        let accum = tiled_matvec_ordered(backend, &self.params.weight, &x, self.order)?;

        let out: Vec<f32> = accum
            .iter()
            .zip(&self.params.bias)
            .map(|(&acc, &b)| self.activation.apply(acc as f32 * self.params.scale + b))
            .collect();

        debug!(
            layer = self.name,
            min = out.iter().copied().fold(f32::INFINITY, f32::min),
            max = out.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            "layer output"
        );
        Ok(out)
    }

    /// Float reference forward pass: dequantized weights, no tiling.
    pub fn forward_reference(&self, input: &[f32]) -> TpuResult<Vec<f32>> {
        self.check_input(input)?;
        let scale = self.params.scale;
        let out = (0..self.out_features())
            .map(|o| {
                let sum: f32 = self
                    .params
                    .weight
                    .row(o)
                    .iter()
                    .zip(input)
                    .map(|(&w, &x)| quantize4(x) as f32 * dequantize(w, scale))
                    .sum();
                self.activation.apply(sum + self.params.bias[o])
            })
            .collect();
        Ok(out)
    }
}
