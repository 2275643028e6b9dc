//! The 1-or-2-byte unsigned integer encoding used for header fields.
//!
//! Values below 128 are a single byte with the high bit clear. Larger
//! values (up to 32767) are two bytes: the first carries the low seven
//! bits with the high bit set as a continuation flag, the second carries
//! the remaining bits and is never zero.

use crate::error::{Error, HeaderError, Result};
use crate::VARINT_MAX;

pub const MAX_VARINT_LEN: usize = 2;

const CONTINUATION: u8 = 0x80;

/// Encode `value` into its wire form.
pub fn encode(value: u16) -> Result<heapless::Vec<u8, MAX_VARINT_LEN>> {
    if value > VARINT_MAX {
        return Err(Error::Range {
            value: value as usize,
        });
    }
    let mut out = heapless::Vec::new();
    if value < 0x80 {
        out.push(value as u8).expect("never panic");
    } else {
        out.push(CONTINUATION | (value & 0x7F) as u8)
            .expect("never panic");
        out.push((value >> 7) as u8).expect("never panic");
    }
    Ok(out)
}

/// Decode a varint from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed, or `None` when
/// more input is needed.
pub fn decode(bytes: &[u8]) -> Result<Option<(u16, usize)>> {
    let Some(&b0) = bytes.first() else {
        return Ok(None);
    };
    if b0 & CONTINUATION == 0 {
        return Ok(Some((b0 as u16, 1)));
    }
    let Some(&b1) = bytes.get(1) else {
        return Ok(None);
    };
    if b1 == 0 {
        return Err(HeaderError::NonCanonicalVarint.into());
    }
    Ok(Some((((b1 as u16) << 7) | (b0 & 0x7F) as u16, 2)))
}

/// Byte-at-a-time decoder for the streaming parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct Accumulator {
    first: Option<u8>,
}

impl Accumulator {
    /// Feed one byte; returns the value once it is complete.
    pub fn push(&mut self, byte: u8) -> Result<Option<u16>> {
        match self.first {
            None if byte & CONTINUATION == 0 => Ok(Some(byte as u16)),
            None => {
                self.first = Some(byte);
                Ok(None)
            }
            Some(b0) => {
                if byte == 0 {
                    return Err(HeaderError::NonCanonicalVarint.into());
                }
                Ok(Some(((byte as u16) << 7) | (b0 & 0x7F) as u16))
            }
        }
    }
}
