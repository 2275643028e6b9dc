use crate::{MAX_CHANNELS, MAX_MARKER_LEN, VARINT_MAX};

/// Errors surfaced by the framing layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Buffer memory could not be reserved.
    #[error("failed to allocate {bytes} bytes of buffer space")]
    Allocation { bytes: usize },

    /// A ring buffer write would overtake unread data. Nothing is written.
    #[error("ring buffer overflow ({requested} bytes requested, {free} free)")]
    Overflow { requested: usize, free: usize },

    /// Value too large for the variable-length header encoding.
    #[error("value {value} exceeds the encodable maximum {max}", max = VARINT_MAX)]
    Range { value: usize },

    /// Malformed header field on the receive path.
    #[error("malformed frame header: {0}")]
    Header(#[from] HeaderError),

    /// Payload integrity check failed.
    #[error("checksum mismatch (header {expected:#06x}, computed {actual:#06x})")]
    Checksum { expected: u16, actual: u16 },

    /// Channel id outside the registry table.
    #[error("channel {id} is out of range (limit {limit})", limit = MAX_CHANNELS)]
    ChannelOutOfRange { id: u8 },

    /// The slot already holds a live channel.
    #[error("channel {id} is already initialized")]
    ChannelInUse { id: u8 },

    /// No channel has been initialized under this id.
    #[error("channel {id} is not initialized")]
    UnknownChannel { id: u8 },

    /// Synchronization marker is empty or too long.
    #[error("sync marker of {len} bytes is invalid (1..={max} expected)", max = MAX_MARKER_LEN)]
    BadMarker { len: usize },
}

/// Header field failures that abort the frame in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    /// Two-byte varint whose high byte is zero; the encoder never emits it.
    #[error("non-canonical two-byte varint")]
    NonCanonicalVarint,

    /// Decoded payload length above the channel's configured maximum.
    #[error("payload of {size} bytes exceeds the accepted maximum {max}")]
    PayloadTooLarge { size: u16, max: u16 },
}

pub type Result<T> = std::result::Result<T, Error>;
