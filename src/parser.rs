use std::mem;

use crate::error::{Error, HeaderError, Result};
use crate::{checksum, varint, MAX_MARKER_LEN};

/// A decoded packet.
///
/// Delivery borrows the payload for the duration of the sink call; the
/// parser does not retain it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_type: u16,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
enum State {
    Hunting,
    Length(varint::Accumulator),
    Type {
        length: u16,
        acc: varint::Accumulator,
    },
    Checksum {
        length: u16,
        packet_type: u16,
        lo: Option<u8>,
    },
    Payload {
        length: u16,
        packet_type: u16,
        expected: u16,
        buf: Vec<u8>,
    },
}

enum Step {
    Continue(State),
    Complete(Packet),
}

/// Byte-at-a-time frame synchronizer and packet decoder.
///
/// Hunts for the synchronization marker, then accumulates the header
/// fields and payload. Any decode failure drops the frame in progress
/// and returns to hunting; the failing byte is not replayed.
#[derive(Debug)]
pub struct FrameParser {
    marker: heapless::Vec<u8, MAX_MARKER_LEN>,
    max_payload: u16,
    matched: usize,
    state: State,
}

impl FrameParser {
    pub fn new(marker: &[u8], max_payload: u16) -> Result<Self> {
        if marker.is_empty() {
            return Err(Error::BadMarker { len: 0 });
        }
        let mut copy = heapless::Vec::new();
        copy.extend_from_slice(marker)
            .map_err(|_| Error::BadMarker { len: marker.len() })?;
        Ok(Self {
            marker: copy,
            max_payload,
            matched: 0,
            state: State::Hunting,
        })
    }

    pub fn marker(&self) -> &[u8] {
        &self.marker
    }

    /// True while no marker has been matched and no frame is in progress.
    pub fn is_hunting(&self) -> bool {
        matches!(self.state, State::Hunting)
    }

    /// Drop any frame in progress and restart marker hunting.
    pub fn reset(&mut self) {
        self.matched = 0;
        self.state = State::Hunting;
    }

    /// Feed one byte of the stream.
    ///
    /// Returns a packet once one completes, `None` while more input is
    /// needed, or the decode failure that discarded the frame in
    /// progress (the parser is already hunting again when it returns).
    pub fn feed(&mut self, byte: u8) -> Result<Option<Packet>> {
        let state = mem::replace(&mut self.state, State::Hunting);
        match self.step(state, byte)? {
            Step::Continue(next) => {
                self.state = next;
                Ok(None)
            }
            Step::Complete(packet) => Ok(Some(packet)),
        }
    }

    fn step(&mut self, state: State, byte: u8) -> Result<Step> {
        Ok(match state {
            State::Hunting => {
                if self.advance_marker(byte) {
                    Step::Continue(State::Length(varint::Accumulator::default()))
                } else {
                    Step::Continue(State::Hunting)
                }
            }
            State::Length(mut acc) => match acc.push(byte)? {
                None => Step::Continue(State::Length(acc)),
                Some(length) => {
                    if length > self.max_payload {
                        return Err(HeaderError::PayloadTooLarge {
                            size: length,
                            max: self.max_payload,
                        }
                        .into());
                    }
                    Step::Continue(State::Type {
                        length,
                        acc: varint::Accumulator::default(),
                    })
                }
            },
            State::Type { length, mut acc } => match acc.push(byte)? {
                None => Step::Continue(State::Type { length, acc }),
                Some(packet_type) if length == 0 => Step::Complete(Packet {
                    packet_type,
                    payload: Vec::new(),
                }),
                Some(packet_type) => Step::Continue(State::Checksum {
                    length,
                    packet_type,
                    lo: None,
                }),
            },
            State::Checksum {
                length,
                packet_type,
                lo,
            } => match (lo, checksum::width(length)) {
                (None, 2) => Step::Continue(State::Checksum {
                    length,
                    packet_type,
                    lo: Some(byte),
                }),
                (None, _) => start_payload(length, packet_type, byte as u16)?,
                (Some(lo), _) => {
                    start_payload(length, packet_type, u16::from_le_bytes([lo, byte]))?
                }
            },
            State::Payload {
                length,
                packet_type,
                expected,
                mut buf,
            } => {
                buf.push(byte);
                if buf.len() < length as usize {
                    Step::Continue(State::Payload {
                        length,
                        packet_type,
                        expected,
                        buf,
                    })
                } else {
                    let actual = checksum::sum(&buf);
                    if !checksum::verify(expected, actual, length) {
                        let carried = if checksum::width(length) == 1 {
                            actual & 0x00FF
                        } else {
                            actual
                        };
                        return Err(Error::Checksum {
                            expected,
                            actual: carried,
                        });
                    }
                    Step::Complete(Packet {
                        packet_type,
                        payload: buf,
                    })
                }
            }
        })
    }

    /// Marker matching with a one-byte lookback: a byte that breaks a
    /// partial match may itself start a new one.
    fn advance_marker(&mut self, byte: u8) -> bool {
        if byte == self.marker[self.matched] {
            self.matched += 1;
            if self.matched == self.marker.len() {
                self.matched = 0;
                return true;
            }
        } else if self.matched > 0 {
            self.matched = 0;
            if byte == self.marker[0] {
                self.matched = 1;
            }
        }
        false
    }
}

fn start_payload(length: u16, packet_type: u16, expected: u16) -> Result<Step> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(length as usize)
        .map_err(|_| Error::Allocation {
            bytes: length as usize,
        })?;
    Ok(Step::Continue(State::Payload {
        length,
        packet_type,
        expected,
        buf,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame, DEFAULT_MARKER, VARINT_MAX};
    use proptest::prelude::*;

    fn parser() -> FrameParser {
        FrameParser::new(&DEFAULT_MARKER, VARINT_MAX).unwrap()
    }

    fn drive(parser: &mut FrameParser, bytes: &[u8]) -> (Vec<Packet>, Vec<Error>) {
        let mut packets = vec![];
        let mut errors = vec![];
        for &b in bytes {
            match parser.feed(b) {
                Ok(Some(packet)) => packets.push(packet),
                Ok(None) => {}
                Err(err) => errors.push(err),
            }
        }
        (packets, errors)
    }

    #[test]
    fn decodes_an_encoded_frame() {
        let wire = frame::encode(&DEFAULT_MARKER, 0x1001, &[0x10, 0x20, 0x30, 0x40]).unwrap();
        let (packets, errors) = drive(&mut parser(), &wire);
        assert!(errors.is_empty());
        assert_eq!(
            packets,
            vec![Packet {
                packet_type: 0x1001,
                payload: vec![0x10, 0x20, 0x30, 0x40],
            }]
        );
    }

    #[test]
    fn decodes_an_empty_payload_frame() {
        let wire = frame::encode(&DEFAULT_MARKER, 0x7F, &[]).unwrap();
        let (packets, errors) = drive(&mut parser(), &wire);
        assert!(errors.is_empty());
        assert_eq!(packets[0].packet_type, 0x7F);
        assert!(packets[0].payload.is_empty());
    }

    #[test]
    fn decodes_a_wide_checksum_frame() {
        let payload: Vec<u8> = (0u8..40).collect();
        let wire = frame::encode(&DEFAULT_MARKER, 9, &payload).unwrap();
        let (packets, errors) = drive(&mut parser(), &wire);
        assert!(errors.is_empty());
        assert_eq!(packets[0].payload, payload);
    }

    #[test]
    fn finds_a_frame_embedded_in_noise() {
        let mut stream = vec![0x00, 0x13, 0x37, 0x55, 0x42];
        stream.extend(frame::encode(&DEFAULT_MARKER, 3, &[0xDE, 0xAD]).unwrap());
        stream.extend([0x01, 0x02, 0x03]);
        let (packets, errors) = drive(&mut parser(), &stream);
        assert!(errors.is_empty());
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].payload, vec![0xDE, 0xAD]);
    }

    #[test]
    fn overlapping_marker_prefix_still_synchronizes() {
        // marker AA 55, input AA AA 55: the second AA restarts the match
        let mut stream = vec![0xAA];
        stream.extend(frame::encode(&DEFAULT_MARKER, 1, &[0x11]).unwrap());
        let (packets, errors) = drive(&mut parser(), &stream);
        assert!(errors.is_empty());
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].payload, vec![0x11]);
    }

    #[test]
    fn checksum_mismatch_discards_and_resynchronizes() {
        let mut wire = frame::encode(&DEFAULT_MARKER, 1, &[0x10, 0x20]).unwrap();
        let checksum_at = wire.len() - 3;
        wire[checksum_at] ^= 0xFF;
        wire.extend(frame::encode(&DEFAULT_MARKER, 2, &[0x33]).unwrap());

        let mut p = parser();
        let (packets, errors) = drive(&mut p, &wire);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::Checksum { .. }));
        // the corrupted frame is gone, the following one survives
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].packet_type, 2);
        assert!(p.is_hunting());
    }

    #[test]
    fn non_canonical_length_is_a_header_error() {
        let stream = [0xAA, 0x55, 0x84, 0x00];
        let (packets, errors) = drive(&mut parser(), &stream);
        assert!(packets.is_empty());
        assert_eq!(
            errors,
            vec![Error::Header(HeaderError::NonCanonicalVarint)]
        );
    }

    #[test]
    fn oversized_length_is_rejected_up_front() {
        let mut p = FrameParser::new(&DEFAULT_MARKER, 16).unwrap();
        let wire = frame::encode(&DEFAULT_MARKER, 1, &[0u8; 17]).unwrap();
        let (packets, errors) = drive(&mut p, &wire);
        assert!(packets.is_empty());
        assert_eq!(
            errors[0],
            Error::Header(HeaderError::PayloadTooLarge { size: 17, max: 16 })
        );
        assert!(p.is_hunting());
    }

    #[test]
    fn reset_drops_the_frame_in_progress() {
        let mut p = parser();
        let wire = frame::encode(&DEFAULT_MARKER, 1, &[0x10, 0x20]).unwrap();
        let (packets, _) = drive(&mut p, &wire[..wire.len() - 1]);
        assert!(packets.is_empty());
        p.reset();
        assert!(p.is_hunting());
        assert_eq!(p.matched, 0);
        // the tail byte of the old frame is just noise now
        let (packets, errors) = drive(&mut p, &wire[wire.len() - 1..]);
        assert!(packets.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn rejects_bad_markers() {
        assert_eq!(
            FrameParser::new(&[], VARINT_MAX).unwrap_err(),
            Error::BadMarker { len: 0 }
        );
        assert_eq!(
            FrameParser::new(&[0u8; 9], VARINT_MAX).unwrap_err(),
            Error::BadMarker { len: 9 }
        );
    }

    /// Cut a byte sequence into randomly sized ordered segments.
    fn chop(bytes: Vec<u8>) -> impl Strategy<Value = Vec<Vec<u8>>> {
        let mut segs = vec![];
        for len in 1..=bytes.len() {
            for _ in 0..bytes.len() / len {
                segs.push(len);
            }
        }
        Just(segs).prop_shuffle().prop_map(move |segs| {
            let mut rest = bytes.as_slice();
            let mut parts = vec![];
            for seg in segs {
                if rest.is_empty() {
                    break;
                }
                let take = seg.min(rest.len());
                parts.push(rest[..take].to_vec());
                rest = &rest[take..];
            }
            if !rest.is_empty() {
                parts.push(rest.to_vec());
            }
            parts
        })
    }

    fn two_frame_stream() -> Vec<u8> {
        let mut stream = frame::encode(&DEFAULT_MARKER, 0x1001, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        stream.extend([0x13, 0x37, 0x00]);
        stream.extend(frame::encode(&DEFAULT_MARKER, 0x02, b"hello world").unwrap());
        stream
    }

    proptest! {
        #[test]
        fn fragmentation_does_not_change_the_result(segs in chop(two_frame_stream())) {
            let mut p = parser();
            let mut packets = vec![];
            for seg in segs {
                let (mut found, errors) = drive(&mut p, &seg);
                prop_assert!(errors.is_empty());
                packets.append(&mut found);
            }
            prop_assert_eq!(packets.len(), 2);
            prop_assert_eq!(packets[0].payload.as_slice(), &[0xDE, 0xAD, 0xBE, 0xEF]);
            prop_assert_eq!(packets[1].payload.as_slice(), b"hello world" as &[u8]);
        }

        #[test]
        fn roundtrip(packet_type in 0u16..=VARINT_MAX, payload in proptest::collection::vec(any::<u8>(), 0..256)) {
            let wire = frame::encode(&DEFAULT_MARKER, packet_type, &payload).unwrap();
            let (packets, errors) = drive(&mut parser(), &wire);
            prop_assert!(errors.is_empty());
            prop_assert_eq!(packets.len(), 1);
            prop_assert_eq!(packets[0].packet_type, packet_type);
            prop_assert_eq!(&packets[0].payload, &payload);
        }
    }
}
