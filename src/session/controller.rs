//! Session control surface
//!
//! [`SessionController`] drives one collection session end to end:
//!
//! 1. Discover the device; a missing device aborts before any
//!    collection state exists.
//! 2. Connect and spawn a fresh worker, which resets the epoch.
//! 3. Subscribe the clock and the three axes.
//! 4. Wait for the deadline, external cancellation or a closed transport.
//! 5. Unsubscribe, stop the worker and drain the sink exactly once.
//!
//! Waiting happens on the controller's thread; the worker's critical
//! section is never held while the session runs down its clock.

use crate::backend::{MotionTransport, SessionBackend, WorkerHandle};
use crate::config::SessionSettings;
use crate::error::{MotionLogError, Result, ResultExt};
use crossbeam_channel::{after, bounded, select, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::types::{SessionMetadata, SessionOutcome, SessionState, StopReason};

struct TokenInner {
    cancelled: AtomicBool,
    /// Dropped on cancel, which wakes every waiter on `wake`
    trigger: Mutex<Option<Sender<()>>>,
    wake: Receiver<()>,
}

/// Cooperative cancellation for a running session
///
/// Cloning shares the token. Cancelling is idempotent.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    /// Create a token that has not been cancelled
    pub fn new() -> Self {
        let (trigger, wake) = bounded(0);
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                wake,
            }),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.inner.trigger.lock() {
            Ok(mut trigger) => drop(trigger.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Becomes ready (disconnected) once cancelled
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.wake
    }

    /// Block until cancelled or `timeout` elapses
    pub fn wait_timeout(&self, timeout: Duration) -> StopReason {
        if !self.is_cancelled() {
            let _ = self.inner.wake.recv_timeout(timeout);
        }
        if self.is_cancelled() {
            StopReason::Cancelled
        } else {
            StopReason::DeadlineExpired
        }
    }
}

/// Runs collection sessions against a transport
pub struct SessionController<T: MotionTransport> {
    transport: T,
    settings: SessionSettings,
    state: SessionState,
}

impl<T: MotionTransport> SessionController<T> {
    /// Create a controller for the given transport
    pub fn new(transport: T, settings: SessionSettings) -> Self {
        Self {
            transport,
            settings,
            state: SessionState::Idle,
        }
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Take the transport back
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!(
                "Session state: {} -> {}",
                self.state.display_name(),
                state.display_name()
            );
            self.state = state;
        }
    }

    /// Run one session to completion
    ///
    /// Fails with `DeviceNotFound` before any collection state exists if
    /// discovery fails. An empty session is not an error here; callers
    /// check [`SessionOutcome::is_empty`].
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<SessionOutcome> {
        let result = self.run_inner(cancel);
        self.set_state(match result {
            Ok(_) => SessionState::Finished,
            Err(_) => SessionState::Idle,
        });
        result
    }

    fn run_inner(&mut self, cancel: &CancellationToken) -> Result<SessionOutcome> {
        self.set_state(SessionState::Discovering);
        tracing::info!("Scanning for {}", self.settings.device_name);
        let device = self
            .transport
            .discover(&self.settings.device_name, self.settings.discovery_timeout)?;

        self.set_state(SessionState::Connecting);
        self.transport
            .connect(&device)
            .with_context(|| format!("Failed to connect to {}", device))?;
        tracing::info!("Connected to {}", device);

        let backend = SessionBackend::new(&self.settings);
        let sender = backend.notification_sender();
        let worker = match backend.spawn() {
            Ok(worker) => worker,
            Err(e) => {
                self.transport.disconnect();
                return Err(e);
            }
        };

        let mut subscribed: Vec<Uuid> = Vec::with_capacity(4);
        for (channel, channel_id) in self.settings.channels.entries() {
            if let Err(e) = self.transport.subscribe(channel_id, sender.clone()) {
                tracing::error!("Failed to subscribe to {} ({}): {}", channel, channel_id, e);
                drop(sender);
                if let Err(stop_err) = self.teardown(&subscribed, worker) {
                    tracing::warn!("{}", stop_err);
                }
                return Err(e.with_context(format!("Subscribing to {} channel", channel)));
            }
            tracing::debug!("Subscribed to {} ({})", channel, channel_id);
            subscribed.push(channel_id);
        }
        // Only the transport holds senders from here on
        drop(sender);

        self.set_state(SessionState::Collecting);
        let started_at = chrono::Utc::now();
        let started = Instant::now();
        tracing::info!(
            "Collecting for up to {:.1} s",
            self.settings.duration.as_secs_f64()
        );

        let stop_reason = wait_for_stop(cancel, &worker, self.settings.duration);
        let elapsed = started.elapsed();
        tracing::info!(
            "Stopping session after {:.1} s ({})",
            elapsed.as_secs_f64(),
            stop_reason
        );

        self.set_state(SessionState::Stopping);
        let mut report = self.teardown(&subscribed, worker)?;

        let series = report.sink.drain();
        let metadata = SessionMetadata {
            device_name: device.name,
            device_address: device.address,
            started_at,
            duration: elapsed,
            stop_reason,
            record_count: series.len(),
            epoch_origin_ms: report.epoch_origin,
            stats: report.stats,
        };

        tracing::info!(
            "Session finished: {} records, {} notifications ({} decoded, {} dropped)",
            metadata.record_count,
            metadata.stats.notifications_received,
            metadata.stats.decoded(),
            metadata.stats.dropped()
        );

        Ok(SessionOutcome { series, metadata })
    }

    /// Unsubscribe, stop the worker and disconnect
    fn teardown(
        &mut self,
        subscribed: &[Uuid],
        worker: WorkerHandle,
    ) -> Result<crate::backend::WorkerReport> {
        for channel_id in subscribed {
            if let Err(e) = self.transport.unsubscribe(*channel_id) {
                tracing::warn!("Failed to unsubscribe from {}: {}", channel_id, e);
            }
        }
        let report = worker.stop();
        self.transport.disconnect();
        report.map_err(|e: MotionLogError| e.with_context("Stopping session worker"))
    }
}

/// Block until the deadline, cancellation or worker exit
fn wait_for_stop(
    cancel: &CancellationToken,
    worker: &WorkerHandle,
    duration: Duration,
) -> StopReason {
    if cancel.is_cancelled() {
        return StopReason::Cancelled;
    }
    let deadline = after(duration);
    select! {
        recv(cancel.receiver()) -> _ => StopReason::Cancelled,
        recv(worker.exited()) -> _ => StopReason::TransportClosed,
        recv(deadline) -> _ => StopReason::DeadlineExpired,
    }
}
