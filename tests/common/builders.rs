//! Test data builders for notification scripts

use motionlog::backend::ChannelMap;
use motionlog::types::{Channel, RawChannelEvent};
use uuid::Uuid;

/// Builder for scripted notification sequences
pub struct ScriptBuilder {
    map: ChannelMap,
    script: Vec<(Uuid, Vec<u8>)>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::with_map(ChannelMap::default())
    }

    pub fn with_map(map: ChannelMap) -> Self {
        Self {
            map,
            script: Vec::new(),
        }
    }

    /// Append a well-formed event
    pub fn event(mut self, event: RawChannelEvent) -> Self {
        self.script
            .push((self.map.id_for(event.channel()), event.to_payload()));
        self
    }

    /// Append a clock reading followed by the three axes
    pub fn sample(self, timestamp: u64, x: f32, y: f32, z: f32) -> Self {
        self.event(RawChannelEvent::Timestamp(timestamp))
            .event(RawChannelEvent::AxisX(x))
            .event(RawChannelEvent::AxisY(y))
            .event(RawChannelEvent::AxisZ(z))
    }

    /// Append a payload of arbitrary bytes on a known channel
    pub fn raw(mut self, channel: Channel, payload: &[u8]) -> Self {
        self.script.push((self.map.id_for(channel), payload.to_vec()));
        self
    }

    /// Append a notification on a characteristic no channel is mapped to
    pub fn stray(mut self, channel_id: Uuid, payload: &[u8]) -> Self {
        self.script.push((channel_id, payload.to_vec()));
        self
    }

    pub fn build(self) -> Vec<(Uuid, Vec<u8>)> {
        self.script
    }
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_builder() {
        let map = ChannelMap::default();
        let script = ScriptBuilder::new()
            .sample(1000, 0.1, 0.2, 0.3)
            .raw(Channel::AxisX, &[1, 2, 3])
            .build();

        assert_eq!(script.len(), 5);
        assert_eq!(script[0], (map.timestamp, 1000u64.to_le_bytes().to_vec()));
        assert_eq!(script[4], (map.acc_x, vec![1, 2, 3]));
    }
}
