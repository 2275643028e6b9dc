use crate::channel::{Channel, ChannelConfig, PacketSink};
use crate::error::{Error, Result};
use crate::MAX_CHANNELS;

/// Bounded table of live channels, keyed by a small integer id.
///
/// Owns every per-channel state; at most one channel may exist per id.
pub struct Registry {
    slots: [Option<Channel>; MAX_CHANNELS],
}

impl Registry {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Register a channel with the default configuration.
    pub fn init(&mut self, id: u8, marker: &[u8], sink: impl PacketSink + 'static) -> Result<()> {
        self.init_with_config(id, marker, ChannelConfig::default(), sink)
    }

    /// Register a channel with explicit buffer and payload limits.
    pub fn init_with_config(
        &mut self,
        id: u8,
        marker: &[u8],
        config: ChannelConfig,
        sink: impl PacketSink + 'static,
    ) -> Result<()> {
        let slot = self
            .slots
            .get_mut(id as usize)
            .ok_or(Error::ChannelOutOfRange { id })?;
        if slot.is_some() {
            return Err(Error::ChannelInUse { id });
        }
        *slot = Some(Channel::new(id, marker, &config, sink)?);
        Ok(())
    }

    /// Frame `payload` for transmission on channel `id`.
    pub fn send(&self, id: u8, packet_type: u16, payload: &[u8]) -> Result<Vec<u8>> {
        self.channel(id)?.send(packet_type, payload)
    }

    /// Feed received bytes into channel `id` and drive parsing.
    ///
    /// Completed packets are delivered to the channel's sink before this
    /// returns. An overflow resets the channel without surfacing an error.
    pub fn receive(&mut self, id: u8, bytes: &[u8]) -> Result<()> {
        self.channel_mut(id)?.receive(bytes);
        Ok(())
    }

    /// Explicitly reset channel `id` to hunting with an empty buffer.
    pub fn reset(&mut self, id: u8) -> Result<()> {
        self.channel_mut(id)?.reset();
        Ok(())
    }

    fn channel(&self, id: u8) -> Result<&Channel> {
        self.slots
            .get(id as usize)
            .ok_or(Error::ChannelOutOfRange { id })?
            .as_ref()
            .ok_or(Error::UnknownChannel { id })
    }

    fn channel_mut(&mut self, id: u8) -> Result<&mut Channel> {
        self.slots
            .get_mut(id as usize)
            .ok_or(Error::ChannelOutOfRange { id })?
            .as_mut()
            .ok_or(Error::UnknownChannel { id })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
