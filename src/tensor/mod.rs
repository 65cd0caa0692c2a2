mod matrix_i4;
mod tensor_i4;

pub use matrix_i4::MatrixI4;
pub use tensor_i4::PackedI4;
