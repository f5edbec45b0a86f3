//! Backend module for notification handling
//!
//! This module sits between the device transport and the session
//! controller. Transports deliver raw notifications on their own threads;
//! a single worker thread consumes them in arrival order.
//!
//! # Architecture
//!
//! - [`MotionTransport`] - Device boundary (discover, connect, subscribe)
//! - [`NotificationSender`] - Handle transports push notifications through
//! - [`ChannelRouter`] - Maps characteristic ids to channels, decodes payloads
//! - [`SessionWorker`] - The single consumer that owns the assembler and sink
//! - [`SessionBackend`] - Creates the queue and spawns the worker thread
//!
//! # Components
//!
//! - [`MockTransport`] - Simulated device for running without hardware
//!
//! # Example
//!
//! ```ignore
//! use motionlog::backend::SessionBackend;
//! use motionlog::config::SessionSettings;
//!
//! let backend = SessionBackend::new(&SessionSettings::default());
//! let sender = backend.notification_sender();
//! let worker = backend.spawn()?;
//!
//! transport.subscribe(channel_id, sender.clone())?;
//! // ... collect ...
//! transport.unsubscribe(channel_id)?;
//!
//! let report = worker.stop()?;
//! ```

pub mod mock_transport;
pub mod router;
pub mod transport_trait;
pub mod worker;

pub use mock_transport::{
    GeneratorConfig, MockDataPattern, MockFeed, MockTransport, MAX_RATE_HZ,
};
pub use router::{parse_channel_id, short_uuid, ChannelMap, ChannelRouter};
pub use transport_trait::{DeviceInfo, MotionTransport, NotificationSender};
pub use worker::{SessionWorker, WorkerReport};

use crate::assembler::SampleAssembler;
use crate::config::SessionSettings;
use crate::error::{MotionLogError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A session's queue and worker, before the worker thread starts
pub struct SessionBackend {
    /// The consumer, moved onto its own thread by [`SessionBackend::spawn`]
    worker: SessionWorker,
    /// Sender handed (cloned) to the transport
    sender: NotificationSender,
    /// Running flag
    running: Arc<AtomicBool>,
}

impl SessionBackend {
    /// Create a fresh queue, router and assembler for one session
    pub fn new(settings: &SessionSettings) -> Self {
        let (tx, rx) = bounded(settings.queue_capacity);
        let overflows = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let worker = SessionWorker::new(
            rx,
            running.clone(),
            overflows.clone(),
            settings.stop_poll_interval,
            ChannelRouter::new(&settings.channels),
            SampleAssembler::with_policy(settings.latch_policy),
        );

        Self {
            worker,
            sender: NotificationSender::new(tx, overflows),
            running,
        }
    }

    /// Sender for transports to deliver notifications through
    pub fn notification_sender(&self) -> NotificationSender {
        self.sender.clone()
    }

    /// Get a handle to stop the worker
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Start the worker thread
    ///
    /// The backend's own sender is released here, so the worker observes a
    /// closed transport once every sender handed out has been dropped.
    pub fn spawn(self) -> Result<WorkerHandle> {
        let (exit_tx, exit_rx) = bounded::<()>(0);
        let worker = self.worker;

        let handle = std::thread::Builder::new()
            .name("session-worker".to_string())
            .spawn(move || {
                let _exit_guard: Sender<()> = exit_tx;
                worker.run()
            })
            .map_err(|e| MotionLogError::Channel(format!("Failed to spawn worker: {}", e)))?;

        Ok(WorkerHandle {
            running: self.running,
            exited: exit_rx,
            handle,
        })
    }
}

/// Handle to a running session worker
pub struct WorkerHandle {
    running: Arc<AtomicBool>,
    exited: Receiver<()>,
    handle: JoinHandle<WorkerReport>,
}

impl WorkerHandle {
    /// Becomes ready (disconnected) once the worker thread has exited
    pub fn exited(&self) -> &Receiver<()> {
        &self.exited
    }

    /// Signal the worker to stop and wait for its report
    pub fn stop(self) -> Result<WorkerReport> {
        self.running.store(false, Ordering::SeqCst);
        self.handle
            .join()
            .map_err(|_| MotionLogError::Channel("Session worker panicked".to_string()))
    }
}
