// cardsession/src/protocol/parser.rs

use crate::types::SerialNumber;
use crate::{Error, Result};

/// Ensure the slice has at least `min` bytes.
pub fn ensure_len(data: &[u8], min: usize) -> Result<()> {
    if data.len() < min {
        return Err(Error::InvalidLength {
            expected: min,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Return a subslice with bounds checking.
pub fn slice_at(data: &[u8], idx: usize, len: usize) -> Result<&[u8]> {
    ensure_len(data, idx + len)?;
    Ok(&data[idx..idx + len])
}

/// Read a single byte at `idx` with bounds checking.
pub fn byte_at(data: &[u8], idx: usize) -> Result<u8> {
    ensure_len(data, idx + 1)?;
    Ok(data[idx])
}

/// Big-endian unsigned integer of `width` (1..=4) bytes at `idx`.
pub fn be_uint_at(data: &[u8], idx: usize, width: usize) -> Result<u32> {
    if width == 0 || width > 4 {
        return Err(Error::InvalidOperand(format!("integer width {}", width)));
    }
    let bytes = slice_at(data, idx, width)?;
    Ok(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
}

/// Encode `value` as `width` big-endian bytes, truncating high bytes.
pub fn be_uint_bytes(value: u32, width: usize) -> Vec<u8> {
    let full = value.to_be_bytes();
    full[4 - width.min(4)..].to_vec()
}

/// Parse a serial number (8 bytes) at `start` with bounds checking.
pub fn serial_at(data: &[u8], start: usize) -> Result<SerialNumber> {
    SerialNumber::try_from(slice_at(data, start, 8)?)
}
