//! Error handling for motionlog
//!
//! This module defines the error taxonomy and a Result alias used
//! throughout the crate. Per-event errors (`Decode`, `UnknownChannel`)
//! are dropped and logged by the worker; only `DeviceNotFound` aborts a
//! session, and it does so before any collection state exists.

use crate::types::Channel;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for motionlog operations
#[derive(Error, Debug)]
pub enum MotionLogError {
    /// Payload width did not match the fixed layout of its channel
    #[error("Decode error on {channel} channel: expected {expected} bytes, got {actual}")]
    Decode {
        channel: Channel,
        expected: usize,
        actual: usize,
    },

    /// Notification arrived for a characteristic no channel is mapped to
    #[error("Unknown channel: {0}")]
    UnknownChannel(Uuid),

    /// The advertised device could not be found during discovery
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A session completed without producing a single record
    #[error("No data was collected")]
    EmptySession,

    /// Errors raised by the transport while connecting or subscribing
    #[error("Transport error: {0}")]
    Transport(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MotionLogError>,
    },
}

impl MotionLogError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MotionLogError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error only affects a single notification
    ///
    /// Per-event errors never end a session.
    pub fn is_per_event(&self) -> bool {
        match self {
            MotionLogError::Decode { .. } | MotionLogError::UnknownChannel(_) => true,
            MotionLogError::WithContext { source, .. } => source.is_per_event(),
            _ => false,
        }
    }

    /// Whether this error is the empty-session signal
    pub fn is_empty_session(&self) -> bool {
        match self {
            MotionLogError::EmptySession => true,
            MotionLogError::WithContext { source, .. } => source.is_empty_session(),
            _ => false,
        }
    }
}

/// Result type alias for motionlog operations
pub type Result<T> = std::result::Result<T, MotionLogError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, serde_json::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| MotionLogError::Serialization(e.to_string()).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| MotionLogError::Serialization(e.to_string()).with_context(f()))
    }
}
