//! Sync-marker framing for byte streams on serial links.
//!
//! Every frame is a synchronization marker, a variable-length header
//! (payload length, packet type, additive checksum) and the payload.
//! The receive path turns an arbitrarily fragmented byte stream back
//! into validated packets; the send path produces the framed bytes for
//! an external transport.

pub mod channel;
pub mod checksum;
pub mod error;
pub mod frame;
pub mod parser;
pub mod registry;
pub mod ring;
pub mod varint;
#[cfg(feature = "codec")]
pub mod codec;

pub use channel::{Channel, ChannelConfig, PacketSink};
#[cfg(feature = "codec")]
pub use codec::{Decoded, Decoder, Encoder};
pub use error::{Error, HeaderError, Result};
pub use parser::{FrameParser, Packet};
pub use registry::Registry;
pub use ring::RingBuffer;

/// Marker used by channels that do not pick their own.
pub const DEFAULT_MARKER: [u8; 2] = [0xAA, 0x55];
/// Per-channel ring buffer capacity in bytes.
pub const RING_CAPACITY: usize = 2048;
/// Number of channel slots in a registry.
pub const MAX_CHANNELS: usize = 10;
/// Largest value the 1-or-2-byte header integers can carry.
pub const VARINT_MAX: u16 = 0x7FFF;
/// Payload length at which the checksum field widens to two bytes.
pub const WIDE_CHECKSUM_LEN: u16 = 32;
/// Longest accepted synchronization marker.
pub const MAX_MARKER_LEN: usize = 8;
