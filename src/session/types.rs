//! Session data types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::CollectionStats;

use super::sink::RecordSeries;

/// Lifecycle of a collection session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No active session
    #[default]
    Idle,
    /// Looking for the advertising device
    Discovering,
    /// Connecting to the discovered device
    Connecting,
    /// Subscribed and collecting records
    Collecting,
    /// Unsubscribing and draining the worker
    Stopping,
    /// Records drained and handed over
    Finished,
}

impl SessionState {
    /// Check if notifications are being collected
    pub fn is_collecting(&self) -> bool {
        matches!(self, SessionState::Collecting)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Discovering => "Discovering",
            SessionState::Connecting => "Connecting",
            SessionState::Collecting => "Collecting",
            SessionState::Stopping => "Stopping",
            SessionState::Finished => "Finished",
        }
    }
}

/// Why collection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The configured duration elapsed
    DeadlineExpired,
    /// The session was cancelled externally
    Cancelled,
    /// The transport dropped every subscription on its own
    TransportClosed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::DeadlineExpired => write!(f, "deadline expired"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::TransportClosed => write!(f, "transport closed"),
        }
    }
}

/// Metadata for a finished session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Device the records were collected from
    pub device_name: String,
    /// Device address reported by discovery
    pub device_address: String,
    /// When collection started
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Wall-clock time spent collecting
    pub duration: Duration,
    /// Why collection ended
    pub stop_reason: StopReason,
    /// Number of records handed to persistence
    pub record_count: usize,
    /// Epoch origin of the session in device milliseconds
    pub epoch_origin_ms: Option<u64>,
    /// Session counters
    pub stats: CollectionStats,
}

/// Everything a session hands to the persistence layer
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Completed records in completion order
    pub series: RecordSeries,
    /// Session metadata
    pub metadata: SessionMetadata,
}

impl SessionOutcome {
    /// Check if the session produced no records
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
