//! `tokio_util::codec` adapters over the framing wire contract, for
//! driving the protocol over async byte streams.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::Error;
use crate::parser::FrameParser;
use crate::{frame, MAX_MARKER_LEN, VARINT_MAX};

pub struct Encoder {
    marker: heapless::Vec<u8, MAX_MARKER_LEN>,
}

impl Encoder {
    pub fn new(marker: &[u8]) -> Result<Self, Error> {
        if marker.is_empty() {
            return Err(Error::BadMarker { len: 0 });
        }
        let mut copy = heapless::Vec::new();
        copy.extend_from_slice(marker)
            .map_err(|_| Error::BadMarker { len: marker.len() })?;
        Ok(Self { marker: copy })
    }
}

impl<T> tokio_util::codec::Encoder<(u16, T)> for Encoder
where
    T: AsRef<[u8]>,
{
    type Error = std::io::Error;

    fn encode(&mut self, item: (u16, T), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (packet_type, payload) = item;
        let wire = frame::encode(&self.marker, packet_type, payload.as_ref())
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        dst.extend_from_slice(&wire);
        Ok(())
    }
}

pub struct Decoder {
    parser: FrameParser,
}

impl Decoder {
    pub fn new(marker: &[u8]) -> Result<Self, Error> {
        Self::with_max_payload(marker, VARINT_MAX)
    }

    pub fn with_max_payload(marker: &[u8], max_payload: u16) -> Result<Self, Error> {
        Ok(Self {
            parser: FrameParser::new(marker, max_payload)?,
        })
    }
}

impl tokio_util::codec::Decoder for Decoder {
    type Item = Decoded;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.has_remaining() {
            match self.parser.feed(src.get_u8()) {
                Ok(Some(packet)) => {
                    return Ok(Some(Decoded::Packet {
                        packet_type: packet.packet_type,
                        payload: Bytes::from(packet.payload),
                    }))
                }
                Ok(None) => {}
                Err(err) => return Ok(Some(Decoded::Discarded(err))),
            }
        }
        Ok(None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A validated packet.
    Packet { packet_type: u16, payload: Bytes },
    /// A frame in progress was dropped; the decoder is hunting again.
    Discarded(Error),
}
