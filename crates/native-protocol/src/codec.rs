//! Wire format primitives.
//!
//! The native protocol carries three kinds of scalar on the wire:
//!
//! - **Varint**: unsigned LEB128, seven payload bits per byte, low group
//!   first, high bit set on every byte except the last.
//! - **String**: a varint byte length followed by that many raw bytes.
//! - **Fixed-width**: little-endian IEEE-754 floats and little-endian
//!   integers, used where a value is not varint-carried.
//!
//! Every decoder here works on an in-memory [`Buf`] and reports
//! [`ProtocolError::Incomplete`] when the buffer runs short. Callers that
//! must not lose partially consumed input should decode from a copy of
//! the buffer cursor (`&mut &[u8]`) and advance the real buffer only on
//! success.

use bytes::{Buf, BufMut, Bytes};

use crate::error::ProtocolError;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Write an unsigned varint.
pub fn put_varint(dst: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        dst.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

/// Number of bytes [`put_varint`] emits for `value`.
#[must_use]
pub const fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decode a varint from the front of `src` without consuming it.
///
/// Returns `Ok(None)` when `src` ends before the terminating byte, and the
/// decoded value together with its encoded length otherwise.
pub fn decode_varint(src: &[u8]) -> Result<Option<(u64, usize)>, ProtocolError> {
    let mut value = 0u64;
    for (i, &byte) in src.iter().take(MAX_VARINT_LEN).enumerate() {
        let group = u64::from(byte & 0x7f);
        // The tenth byte may only contribute the top bit.
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(ProtocolError::VarintOverflow);
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }
    if src.len() >= MAX_VARINT_LEN {
        Err(ProtocolError::VarintOverflow)
    } else {
        Ok(None)
    }
}

/// Read a varint, consuming it from `src`.
pub fn get_varint(src: &mut impl Buf) -> Result<u64, ProtocolError> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        if !src.has_remaining() {
            return Err(ProtocolError::Incomplete { needed: 1 });
        }
        let byte = src.get_u8();
        let group = u64::from(byte & 0x7f);
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(ProtocolError::VarintOverflow);
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ProtocolError::VarintOverflow)
}

/// Read a varint-carried boolean (any non-zero value is `true`).
pub fn get_bool(src: &mut impl Buf) -> Result<bool, ProtocolError> {
    Ok(get_varint(src)? != 0)
}

/// Convert a wire length into `usize`.
pub fn length_to_usize(len: u64) -> Result<usize, ProtocolError> {
    usize::try_from(len).map_err(|_| ProtocolError::LengthOverflow(len))
}

/// Write a length-prefixed string.
pub fn put_string(dst: &mut impl BufMut, s: &str) {
    put_binary(dst, s.as_bytes());
}

/// Write a length-prefixed byte string.
pub fn put_binary(dst: &mut impl BufMut, data: &[u8]) {
    put_varint(dst, data.len() as u64);
    dst.put_slice(data);
}

/// Read a length-prefixed byte string without UTF-8 validation.
pub fn get_binary(src: &mut impl Buf) -> Result<Bytes, ProtocolError> {
    let len = length_to_usize(get_varint(src)?)?;
    if src.remaining() < len {
        return Err(ProtocolError::Incomplete {
            needed: len - src.remaining(),
        });
    }
    Ok(src.copy_to_bytes(len))
}

/// Read a length-prefixed UTF-8 string.
pub fn get_string(src: &mut impl Buf) -> Result<String, ProtocolError> {
    let raw = get_binary(src)?;
    String::from_utf8(raw.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Write a little-endian `f32`.
pub fn put_f32(dst: &mut impl BufMut, value: f32) {
    dst.put_f32_le(value);
}

/// Write a little-endian `f64`.
pub fn put_f64(dst: &mut impl BufMut, value: f64) {
    dst.put_f64_le(value);
}

/// Read a little-endian `f32`.
pub fn get_f32(src: &mut impl Buf) -> Result<f32, ProtocolError> {
    ensure_remaining(src, 4)?;
    Ok(src.get_f32_le())
}

/// Read a little-endian `f64`.
pub fn get_f64(src: &mut impl Buf) -> Result<f64, ProtocolError> {
    ensure_remaining(src, 8)?;
    Ok(src.get_f64_le())
}

fn ensure_remaining(src: &impl Buf, len: usize) -> Result<(), ProtocolError> {
    if src.remaining() < len {
        return Err(ProtocolError::Incomplete {
            needed: len - src.remaining(),
        });
    }
    Ok(())
}
