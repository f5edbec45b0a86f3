//! Resolved settings for a single session
//!
//! [`AppConfig`](super::AppConfig) is what the user writes; [`SessionSettings`]
//! is what a session runs with. Resolution parses characteristic ids,
//! converts millisecond fields into durations and rejects values a session
//! cannot run with.

use super::{
    AppConfig, DEFAULT_DEVICE_NAME, DEFAULT_DISCOVERY_TIMEOUT_MS, DEFAULT_DURATION_SECS,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_STOP_POLL_INTERVAL_MS,
};
use crate::assembler::LatchPolicy;
use crate::backend::router::ChannelMap;
use crate::error::{MotionLogError, Result};
use std::time::Duration;

/// Validated settings for one collection session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Advertised name to discover
    pub device_name: String,
    /// How long discovery may take
    pub discovery_timeout: Duration,
    /// How long to collect before stopping
    pub duration: Duration,
    /// Characteristic assignment
    pub channels: ChannelMap,
    /// Capacity of the notification queue
    pub queue_capacity: usize,
    /// How often the worker re-checks its stop flag
    pub stop_poll_interval: Duration,
    /// Latch policy for the assembler
    pub latch_policy: LatchPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            discovery_timeout: Duration::from_millis(DEFAULT_DISCOVERY_TIMEOUT_MS),
            duration: Duration::from_secs(DEFAULT_DURATION_SECS),
            channels: ChannelMap::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            stop_poll_interval: Duration::from_millis(DEFAULT_STOP_POLL_INTERVAL_MS),
            latch_policy: LatchPolicy::Permissive,
        }
    }
}

impl SessionSettings {
    /// Resolve and validate an application config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let collection = &config.collection;

        if config.device.name.trim().is_empty() {
            return Err(MotionLogError::Config("Device name is empty".to_string()));
        }
        if collection.duration_secs == 0 {
            return Err(MotionLogError::Config(
                "Collection duration must be at least one second".to_string(),
            ));
        }
        if collection.queue_capacity == 0 {
            return Err(MotionLogError::Config(
                "Queue capacity must be greater than zero".to_string(),
            ));
        }

        let latch_policy = match collection.completeness_deadline_ms {
            None => LatchPolicy::Permissive,
            Some(0) => {
                return Err(MotionLogError::Config(
                    "Completeness deadline must be greater than zero".to_string(),
                ))
            }
            Some(ms) => LatchPolicy::CompletenessDeadline(Duration::from_millis(ms)),
        };

        Ok(Self {
            device_name: config.device.name.clone(),
            discovery_timeout: Duration::from_millis(config.device.discovery_timeout_ms),
            duration: Duration::from_secs(collection.duration_secs),
            channels: config.channels.resolve()?,
            queue_capacity: collection.queue_capacity,
            stop_poll_interval: Duration::from_millis(collection.stop_poll_interval_ms.max(1)),
            latch_policy,
        })
    }

    /// Override the collection duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}
