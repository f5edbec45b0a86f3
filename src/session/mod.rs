//! Session lifecycle and persistence
//!
//! A session discovers the device, collects records until its deadline or
//! cancellation, and hands a [`RecordSeries`] to the persistence layer.
//!
//! # Features
//!
//! - Run one session at a time through [`SessionController`]
//! - Cancel a running session from any thread with [`CancellationToken`]
//! - Turn SIGINT/SIGTERM into cancellation on unix
//! - Write records as CSV or JSON Lines with [`RecordWriter`]

pub mod controller;
#[cfg(unix)]
pub mod signals;
pub mod sink;
pub mod types;
pub mod writer;

pub use controller::{CancellationToken, SessionController};
pub use sink::{RecordSeries, RecordSink};
pub use types::{SessionMetadata, SessionOutcome, SessionState, StopReason};
pub use writer::{RecordWriter, CSV_HEADER};
