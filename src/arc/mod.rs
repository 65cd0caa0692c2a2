pub mod mlp;
pub mod quantization;
