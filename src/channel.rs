use tracing::{debug, warn};

use crate::error::Result;
use crate::parser::FrameParser;
use crate::ring::RingBuffer;
use crate::{frame, RING_CAPACITY, VARINT_MAX};

/// Receives decoded packets from a channel.
///
/// Invoked synchronously from `receive`, in frame-completion order. The
/// payload borrow ends with the call. Closures of the matching shape
/// implement this directly.
pub trait PacketSink: Send {
    fn on_packet(&mut self, channel: u8, packet_type: u16, payload: &[u8]);
}

impl<F> PacketSink for F
where
    F: FnMut(u8, u16, &[u8]) + Send,
{
    fn on_packet(&mut self, channel: u8, packet_type: u16, payload: &[u8]) {
        self(channel, packet_type, payload)
    }
}

/// Per-channel tuning knobs.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Ring buffer capacity in bytes. Default: 2048.
    pub buffer_capacity: usize,
    /// Largest payload length the receive path accepts.
    pub max_payload: u16,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: RING_CAPACITY,
            max_payload: VARINT_MAX,
        }
    }
}

/// One logical serial channel: a ring buffer, a frame parser and the
/// registered packet sink.
pub struct Channel {
    id: u8,
    ring: RingBuffer,
    parser: FrameParser,
    sink: Box<dyn PacketSink>,
}

impl Channel {
    pub fn new(
        id: u8,
        marker: &[u8],
        config: &ChannelConfig,
        sink: impl PacketSink + 'static,
    ) -> Result<Self> {
        Ok(Self {
            id,
            ring: RingBuffer::with_capacity(config.buffer_capacity)?,
            parser: FrameParser::new(marker, config.max_payload.min(VARINT_MAX))?,
            sink: Box::new(sink),
        })
    }

    /// Frame `payload` for transmission on this channel.
    pub fn send(&self, packet_type: u16, payload: &[u8]) -> Result<Vec<u8>> {
        frame::encode(self.parser.marker(), packet_type, payload)
    }

    /// Feed received bytes and drive parsing to completion.
    ///
    /// Overflow resets the whole channel state: the frames in flight are
    /// sacrificed so memory stays bounded and parsing can make progress.
    pub fn receive(&mut self, bytes: &[u8]) {
        if let Err(err) = self.ring.write(bytes) {
            warn!(channel = self.id, %err, "input overflow, resetting channel state");
            self.reset();
            return;
        }
        while let Some(byte) = self.ring.read_one() {
            match self.parser.feed(byte) {
                Ok(Some(packet)) => {
                    self.sink
                        .on_packet(self.id, packet.packet_type, &packet.payload);
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(channel = self.id, %err, "frame discarded, hunting for next marker");
                }
            }
        }
    }

    /// Discard buffered bytes and any frame in progress.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.parser.reset();
    }
}
