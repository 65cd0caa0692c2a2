use core::fmt;

use crate::arc::quantization::{INT4_MAX, INT4_MIN};

/// Packed int4 byte stream, the format flashed to the accelerator.
///
/// Two signed 4-bit values (range [-8, 7]) are packed per byte.
/// Even-indexed elements use the lower nibble; odd-indexed elements use the upper nibble.
/// The stream carries no header: the element count travels out-of-band.
#[derive(Clone, PartialEq, Eq)]
pub struct PackedI4 {
    data: Vec<u8>,
}

impl PackedI4 {
    /// Zero-filled blob able to hold `num_elements` values.
    pub fn zeroed(num_elements: usize) -> Self {
        PackedI4 { data: vec![0u8; (num_elements + 1) / 2] }
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        PackedI4 { data }
    }

    /// Number of values the blob can hold (always even).
    pub fn capacity(&self) -> usize {
        self.data.len() * 2
    }

    /// Bit offset of value `idx` inside its byte.
    #[inline]
    fn shift(idx: usize) -> u32 {
        if idx % 2 == 0 { 0 } else { 4 }
    }

    /// Value at `idx`, sign-extended from 4 bits.
    pub fn get(&self, idx: usize) -> i8 {
        let nibble = (self.data[idx / 2] >> Self::shift(idx)) & 0x0F;
        ((nibble << 4) as i8) >> 4
    }

    /// Store `val` at `idx`, saturating into [-8, 7].
    pub fn set(&mut self, idx: usize, val: i8) {
        let nibble = (val.clamp(INT4_MIN, INT4_MAX) as u8) & 0x0F;
        let shift = Self::shift(idx);
        let byte = &mut self.data[idx / 2];
        *byte = (*byte & !(0x0F << shift)) | (nibble << shift);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len_bytes(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for PackedI4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackedI4({} bytes)", self.data.len())
    }
}

impl fmt::Display for PackedI4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes (i4 x{})", self.data.len(), self.capacity())
    }
}
