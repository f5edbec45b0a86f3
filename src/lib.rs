//! # motionlog: Motion Sample Logger
//!
//! Collects accelerometer samples from a motion device that publishes a
//! clock and three axes as four independent notification channels. The
//! channels are correlated into complete records, time-normalized against
//! the first observed clock value and written to CSV or JSON Lines.
//!
//! ## Architecture
//!
//! - **Transport**: [`MotionTransport`] delivers raw notifications from its own threads
//! - **Worker**: A single consumer thread routes, decodes and assembles records
//! - **Session**: [`SessionController`] runs discovery, collection and drain
//! - **Persistence**: [`RecordWriter`] writes the drained series to disk
//! - **Communication**: Crossbeam channels for thread-safe data transfer
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform config directory
//! under `dev.motionlog.motionlog-rs`:
//!
//! - **Linux**: `~/.config/dev.motionlog.motionlog-rs/`
//! - **macOS**: `~/Library/Application Support/dev.motionlog.motionlog-rs/`
//! - **Windows**: `%APPDATA%\dev.motionlog.motionlog-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use motionlog::{
//!     backend::{GeneratorConfig, MockTransport},
//!     config::{AppConfig, SessionSettings},
//!     session::{CancellationToken, RecordWriter, SessionController},
//! };
//!
//! let config = AppConfig::default();
//! let settings = SessionSettings::from_config(&config)?;
//! let transport = MockTransport::generated(&settings.device_name, GeneratorConfig::default());
//!
//! let mut controller = SessionController::new(transport, settings);
//! let outcome = controller.run(&CancellationToken::new())?;
//!
//! RecordWriter::new(config.output.format).write(&outcome.series, "motion.csv".as_ref())?;
//! ```

pub mod assembler;
pub mod backend;
pub mod config;
pub mod error;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use assembler::{LatchPolicy, SampleAssembler, TimeNormalizer};
pub use backend::{ChannelMap, ChannelRouter, MockTransport, MotionTransport};
pub use config::{AppConfig, PersistenceFormat, SessionSettings};
pub use error::{MotionLogError, Result};
pub use session::{CancellationToken, RecordSeries, RecordWriter, SessionController};
pub use types::{Channel, CollectionStats, Notification, RawChannelEvent, Record};
