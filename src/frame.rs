//! Outbound frame assembly.
//!
//! Wire format:
//! ```text
//! ┌────────────┬─────────────┬─────────────┬───────────────┬───────────────┐
//! │ marker     │ varint      │ varint      │ checksum      │ payload       │
//! │ (N bytes)  │ (length)    │ (type)      │ (0/1/2 bytes) │ (length bytes)│
//! └────────────┴─────────────┴─────────────┴───────────────┴───────────────┘
//! ```
//! The checksum is present only for non-empty payloads and widens to two
//! bytes at 32 bytes of payload.

use crate::error::{Error, Result};
use crate::{checksum, varint, VARINT_MAX};

/// Widest possible header: two varints plus a two-byte checksum.
pub const MAX_HEADER_LEN: usize = 2 * varint::MAX_VARINT_LEN + 2;

/// Assemble a complete frame for `payload` with the given packet type.
pub fn encode(marker: &[u8], packet_type: u16, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > VARINT_MAX as usize {
        return Err(Error::Range {
            value: payload.len(),
        });
    }
    let len = payload.len() as u16;
    let len_bytes = varint::encode(len)?;
    let type_bytes = varint::encode(packet_type)?;

    let mut out = Vec::with_capacity(marker.len() + MAX_HEADER_LEN + payload.len());
    out.extend_from_slice(marker);
    out.extend_from_slice(&len_bytes);
    out.extend_from_slice(&type_bytes);
    out.extend_from_slice(&checksum::encode(checksum::sum(payload), len));
    out.extend_from_slice(payload);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_MARKER;

    #[test]
    fn frames_the_reference_packet() {
        let wire = encode(&DEFAULT_MARKER, 0x1001, &[0x10, 0x20, 0x30, 0x40]).unwrap();
        assert_eq!(
            wire,
            [0xAA, 0x55, 0x04, 0x81, 0x20, 0xA0, 0x10, 0x20, 0x30, 0x40]
        );
    }

    #[test]
    fn empty_payload_has_no_checksum_bytes() {
        let wire = encode(&DEFAULT_MARKER, 7, &[]).unwrap();
        assert_eq!(wire, [0xAA, 0x55, 0x00, 0x07]);
    }

    #[test]
    fn long_payload_carries_a_two_byte_checksum() {
        let payload = [0x01u8; 40];
        let wire = encode(&DEFAULT_MARKER, 2, &payload).unwrap();
        // marker, varint(40), varint(2), checksum 40 = 0x0028 low byte first
        assert_eq!(&wire[..6], &[0xAA, 0x55, 0x28, 0x02, 0x28, 0x00]);
        assert_eq!(&wire[6..], &payload);
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let big = vec![0u8; VARINT_MAX as usize + 1];
        assert!(matches!(
            encode(&DEFAULT_MARKER, 0, &big),
            Err(Error::Range { value }) if value == big.len()
        ));
        assert!(matches!(
            encode(&DEFAULT_MARKER, 0x8000, &[1]),
            Err(Error::Range { value: 0x8000 })
        ));
    }
}
