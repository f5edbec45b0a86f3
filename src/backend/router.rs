//! Channel routing and payload decoding
//!
//! Maps the transport's characteristic identifiers onto the four internal
//! channels and decodes each fixed-width little-endian payload into a
//! [`RawChannelEvent`].
//!
//! Characteristic identifiers are UUIDs. Configuration may use the 16-bit
//! short form assigned by the Bluetooth SIG (`"2A60"`), which is expanded
//! onto the Bluetooth base UUID, or the full 128-bit form.

use crate::error::{MotionLogError, Result};
use crate::types::{Channel, RawChannelEvent, AXIS_WIDTH, TIMESTAMP_WIDTH};
use std::collections::HashMap;
use uuid::Uuid;

/// Bluetooth base UUID `00000000-0000-1000-8000-00805f9b34fb`
const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;

/// Parse a characteristic identifier in short or full form
///
/// Accepts 4 or 8 hex digit SIG-assigned short forms (optionally prefixed
/// with `0x`) and any textual form understood by [`Uuid::parse_str`].
pub fn parse_channel_id(text: &str) -> Result<Uuid> {
    let trimmed = text.trim();
    let short = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if (short.len() == 4 || short.len() == 8) && short.chars().all(|c| c.is_ascii_hexdigit()) {
        let value = u32::from_str_radix(short, 16)
            .map_err(|e| MotionLogError::Config(format!("Invalid channel id '{}': {}", text, e)))?;
        return Ok(short_uuid(value));
    }

    Uuid::parse_str(trimmed)
        .map_err(|e| MotionLogError::Config(format!("Invalid channel id '{}': {}", text, e)))
}

/// Expand a SIG short identifier onto the Bluetooth base UUID
pub fn short_uuid(value: u32) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((value as u128) << 96))
}

/// Characteristic identifiers for each channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    /// Clock characteristic
    pub timestamp: Uuid,
    /// X axis characteristic
    pub acc_x: Uuid,
    /// Y axis characteristic
    pub acc_y: Uuid,
    /// Z axis characteristic
    pub acc_z: Uuid,
}

impl ChannelMap {
    /// Identifier assigned to a channel
    pub fn id_for(&self, channel: Channel) -> Uuid {
        match channel {
            Channel::Timestamp => self.timestamp,
            Channel::AxisX => self.acc_x,
            Channel::AxisY => self.acc_y,
            Channel::AxisZ => self.acc_z,
        }
    }

    /// All (channel, identifier) pairs in subscription order
    pub fn entries(&self) -> [(Channel, Uuid); 4] {
        Channel::ALL.map(|ch| (ch, self.id_for(ch)))
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            timestamp: short_uuid(0x2A60),
            acc_x: short_uuid(0x2A57),
            acc_y: short_uuid(0x2A58),
            acc_z: short_uuid(0x2A59),
        }
    }
}

/// Demultiplexes raw notifications into typed channel events
#[derive(Debug, Clone)]
pub struct ChannelRouter {
    routes: HashMap<Uuid, Channel>,
    decoded: [u64; 4],
}

impl ChannelRouter {
    /// Create a router for the given channel assignment
    pub fn new(map: &ChannelMap) -> Self {
        Self {
            routes: map.entries().into_iter().map(|(ch, id)| (id, ch)).collect(),
            decoded: [0; 4],
        }
    }

    /// Channel assigned to an identifier, if any
    pub fn channel_for(&self, channel_id: &Uuid) -> Option<Channel> {
        self.routes.get(channel_id).copied()
    }

    /// Events decoded so far, indexed by [`Channel::index`]
    pub fn decoded_counts(&self) -> [u64; 4] {
        self.decoded
    }

    /// Map and decode one notification
    ///
    /// Fails with [`MotionLogError::UnknownChannel`] for an unmapped
    /// identifier and [`MotionLogError::Decode`] when the payload width
    /// does not match the channel's layout.
    pub fn route(&mut self, channel_id: Uuid, raw_bytes: &[u8]) -> Result<RawChannelEvent> {
        let channel = self
            .channel_for(&channel_id)
            .ok_or(MotionLogError::UnknownChannel(channel_id))?;

        let event = decode(channel, raw_bytes)?;
        self.decoded[channel.index()] += 1;
        Ok(event)
    }
}

/// Decode a payload according to its channel's fixed layout
pub fn decode(channel: Channel, raw_bytes: &[u8]) -> Result<RawChannelEvent> {
    let width_error = || MotionLogError::Decode {
        channel,
        expected: channel.payload_width(),
        actual: raw_bytes.len(),
    };

    match channel {
        Channel::Timestamp => {
            let bytes: [u8; TIMESTAMP_WIDTH] = raw_bytes.try_into().map_err(|_| width_error())?;
            Ok(RawChannelEvent::Timestamp(u64::from_le_bytes(bytes)))
        }
        Channel::AxisX | Channel::AxisY | Channel::AxisZ => {
            let bytes: [u8; AXIS_WIDTH] = raw_bytes.try_into().map_err(|_| width_error())?;
            let value = f32::from_le_bytes(bytes);
            Ok(match channel {
                Channel::AxisX => RawChannelEvent::AxisX(value),
                Channel::AxisY => RawChannelEvent::AxisY(value),
                _ => RawChannelEvent::AxisZ(value),
            })
        }
    }
}
