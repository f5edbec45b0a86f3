//! Session Worker Thread Implementation
//!
//! This module contains the consumer loop that owns all per-session
//! correlation state. Transports push notifications into a bounded queue
//! from their own threads; exactly one [`SessionWorker`] pulls from that
//! queue, so `route -> ingest -> push` for one notification always runs
//! to completion before the next one starts.
//!
//! # Responsibilities
//!
//! - **Routing**: Maps characteristic ids to channels and decodes payloads
//! - **Assembly**: Feeds decoded events to the [`SampleAssembler`]
//! - **Collection**: Pushes completed records into the [`RecordSink`]
//! - **Error handling**: Drops, counts and logs malformed or stray payloads
//!
//! # Shutdown
//!
//! When the stop flag is cleared the worker processes whatever was already
//! queued, then returns its sink. A partially latched sample is discarded.
//! If every sender is dropped first, the worker exits on its own and
//! reports the transport as closed.

use crate::assembler::SampleAssembler;
use crate::backend::router::ChannelRouter;
use crate::error::MotionLogError;
use crate::session::RecordSink;
use crate::types::{CollectionStats, Notification};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the worker hands back when it exits
#[derive(Debug)]
pub struct WorkerReport {
    /// Completed records, in completion order
    pub sink: RecordSink,
    /// Counters for the session
    pub stats: CollectionStats,
    /// Epoch origin captured by the assembler, in device milliseconds
    pub epoch_origin: Option<u64>,
    /// Whether the worker exited because every sender was dropped
    pub transport_closed: bool,
}

/// The single consumer of a session's notification queue
pub struct SessionWorker {
    /// Notification receiver from the transport
    notification_rx: Receiver<Notification>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Queue overflow counter shared with every sender
    overflows: Arc<AtomicU64>,
    /// How long to block on the queue before re-checking the running flag
    poll_interval: Duration,
    router: ChannelRouter,
    assembler: SampleAssembler,
    sink: RecordSink,
    stats: CollectionStats,
}

impl SessionWorker {
    /// Create a new session worker
    pub fn new(
        notification_rx: Receiver<Notification>,
        running: Arc<AtomicBool>,
        overflows: Arc<AtomicU64>,
        poll_interval: Duration,
        router: ChannelRouter,
        assembler: SampleAssembler,
    ) -> Self {
        Self {
            notification_rx,
            running,
            overflows,
            poll_interval,
            router,
            assembler,
            sink: RecordSink::new(),
            stats: CollectionStats::default(),
        }
    }

    /// Run the consumer loop until stopped or disconnected
    pub fn run(mut self) -> WorkerReport {
        tracing::info!("Session worker started (latch policy {:?})", self.assembler.policy());

        let mut transport_closed = false;
        while self.running.load(Ordering::SeqCst) {
            match self.notification_rx.recv_timeout(self.poll_interval) {
                Ok(notification) => self.handle_notification(notification),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("All notification senders dropped, ending session");
                    transport_closed = true;
                    break;
                }
            }
        }

        if !transport_closed {
            self.process_pending();
        }

        let report = self.finish(transport_closed);
        tracing::info!(
            "Session worker stopped ({} records, {} dropped notifications)",
            report.stats.records_completed,
            report.stats.dropped()
        );
        report
    }

    /// Process notifications that were queued before the stop signal
    fn process_pending(&mut self) {
        let pending = self.notification_rx.len();
        if pending > 0 {
            tracing::debug!("Processing {} queued notifications before stopping", pending);
        }
        for _ in 0..pending {
            match self.notification_rx.try_recv() {
                Ok(notification) => self.handle_notification(notification),
                Err(_) => break,
            }
        }
    }

    /// Route, assemble and collect a single notification
    fn handle_notification(&mut self, notification: Notification) {
        self.stats.notifications_received += 1;

        match self
            .router
            .route(notification.channel_id, &notification.payload)
        {
            Ok(event) => {
                if let Some(record) = self.assembler.ingest_at(event, notification.received_at) {
                    tracing::trace!(
                        "Record completed: t={} ms ({:.3} s)",
                        record.raw_timestamp,
                        record.elapsed_seconds
                    );
                    self.sink.push(record);
                }
            }
            Err(e) if e.is_per_event() => {
                match &e {
                    MotionLogError::Decode { .. } => self.stats.decode_errors += 1,
                    MotionLogError::UnknownChannel(_) => self.stats.unknown_channel_drops += 1,
                    _ => {}
                }
                tracing::warn!("Dropping notification: {}", e);
            }
            Err(e) => {
                tracing::error!("Unexpected routing failure: {}", e);
            }
        }
    }

    fn finish(self, transport_closed: bool) -> WorkerReport {
        let mut stats = self.stats;
        stats.decoded_per_channel = self.router.decoded_counts();
        stats.records_completed = self.assembler.completed();
        stats.stale_latches_discarded = self.assembler.stale_discarded();
        stats.queue_overflows = self.overflows.load(Ordering::Relaxed);
        stats.partial_discarded_at_end = self.assembler.is_partial();

        if stats.partial_discarded_at_end {
            tracing::debug!(
                "Discarding partial sample latched at session end: {:?}",
                self.assembler.latched()
            );
        }

        WorkerReport {
            epoch_origin: self.assembler.epoch_origin(),
            sink: self.sink,
            stats,
            transport_closed,
        }
    }
}
