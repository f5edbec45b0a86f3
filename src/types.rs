//! Core data types for motionlog
//!
//! This module contains the fundamental data structures shared by the
//! router, the assembler, the sink and the writer.
//!
//! # Main Types
//!
//! - [`Channel`] - The four notification sources (clock and three axes)
//! - [`RawChannelEvent`] - A decoded, typed value for one channel
//! - [`Notification`] - A raw payload as delivered by the transport
//! - [`Record`] - One fully assembled, time-normalized motion sample
//! - [`CollectionStats`] - Per-session counters
//!
//! # Wire Layout
//!
//! Every channel carries a fixed-width little-endian payload:
//! - Clock: 8-byte unsigned integer (milliseconds, device relative)
//! - Axes: 4-byte IEEE-754 single precision float

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

/// Payload width of the clock channel in bytes
pub const TIMESTAMP_WIDTH: usize = 8;

/// Payload width of each axis channel in bytes
pub const AXIS_WIDTH: usize = 4;

/// One of the four independent notification sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Device-relative monotonic clock
    Timestamp,
    /// Acceleration along X
    AxisX,
    /// Acceleration along Y
    AxisY,
    /// Acceleration along Z
    AxisZ,
}

impl Channel {
    /// All channels in subscription order
    pub const ALL: [Channel; 4] = [
        Channel::Timestamp,
        Channel::AxisX,
        Channel::AxisY,
        Channel::AxisZ,
    ];

    /// Expected payload width in bytes
    pub fn payload_width(&self) -> usize {
        match self {
            Channel::Timestamp => TIMESTAMP_WIDTH,
            Channel::AxisX | Channel::AxisY | Channel::AxisZ => AXIS_WIDTH,
        }
    }

    /// Column name used in the output file
    pub fn column_name(&self) -> &'static str {
        match self {
            Channel::Timestamp => "Timestamp",
            Channel::AxisX => "AccX",
            Channel::AxisY => "AccY",
            Channel::AxisZ => "AccZ",
        }
    }

    /// Index into per-channel arrays
    pub fn index(&self) -> usize {
        match self {
            Channel::Timestamp => 0,
            Channel::AxisX => 1,
            Channel::AxisY => 2,
            Channel::AxisZ => 3,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// A decoded channel value, ready for the assembler
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawChannelEvent {
    /// Clock reading in device milliseconds
    Timestamp(u64),
    /// X axis reading
    AxisX(f32),
    /// Y axis reading
    AxisY(f32),
    /// Z axis reading
    AxisZ(f32),
}

impl RawChannelEvent {
    /// The channel this event belongs to
    pub fn channel(&self) -> Channel {
        match self {
            RawChannelEvent::Timestamp(_) => Channel::Timestamp,
            RawChannelEvent::AxisX(_) => Channel::AxisX,
            RawChannelEvent::AxisY(_) => Channel::AxisY,
            RawChannelEvent::AxisZ(_) => Channel::AxisZ,
        }
    }

    /// Encode back into the fixed wire layout
    ///
    /// Used by the simulated device to produce notifications.
    pub fn to_payload(&self) -> Vec<u8> {
        match self {
            RawChannelEvent::Timestamp(ts) => ts.to_le_bytes().to_vec(),
            RawChannelEvent::AxisX(v) | RawChannelEvent::AxisY(v) | RawChannelEvent::AxisZ(v) => {
                v.to_le_bytes().to_vec()
            }
        }
    }
}

/// Raw notification as delivered by a transport
#[derive(Debug, Clone)]
pub struct Notification {
    /// Characteristic the payload arrived on
    pub channel_id: Uuid,
    /// Undecoded payload bytes
    pub payload: Vec<u8>,
    /// When the transport handed the payload over
    pub received_at: Instant,
}

impl Notification {
    /// Create a notification stamped with the current instant
    pub fn new(channel_id: Uuid, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            channel_id,
            payload: payload.into(),
            received_at: Instant::now(),
        }
    }
}

/// One fully assembled, time-normalized motion sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Raw device timestamp in milliseconds
    pub raw_timestamp: u64,
    /// X axis value
    pub x: f32,
    /// Y axis value
    pub y: f32,
    /// Z axis value
    pub z: f32,
    /// Seconds since the session's epoch origin
    pub elapsed_seconds: f64,
}

impl Record {
    /// Create a new record
    pub fn new(raw_timestamp: u64, x: f32, y: f32, z: f32, elapsed_seconds: f64) -> Self {
        Self {
            raw_timestamp,
            x,
            y,
            z,
            elapsed_seconds,
        }
    }
}

/// Counters collected over one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Notifications pulled off the queue
    pub notifications_received: u64,
    /// Successfully decoded events, indexed by [`Channel::index`]
    pub decoded_per_channel: [u64; 4],
    /// Records completed by the assembler
    pub records_completed: u64,
    /// Notifications dropped for a wrong payload width
    pub decode_errors: u64,
    /// Notifications dropped for an unmapped characteristic
    pub unknown_channel_drops: u64,
    /// Notifications dropped because the queue was full
    pub queue_overflows: u64,
    /// Partial latches discarded by the completeness deadline
    pub stale_latches_discarded: u64,
    /// Whether a partial sample was still latched when the session ended
    pub partial_discarded_at_end: bool,
}

impl CollectionStats {
    /// Total number of notifications that never reached the assembler
    pub fn dropped(&self) -> u64 {
        self.decode_errors + self.unknown_channel_drops + self.queue_overflows
    }

    /// Total decoded events across all channels
    pub fn decoded(&self) -> u64 {
        self.decoded_per_channel.iter().sum()
    }
}
