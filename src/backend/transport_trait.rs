//! MotionTransport trait for the device boundary
//!
//! The radio stack (discovery, connection, GATT subscriptions) lives
//! outside this crate. This module defines the interface a transport must
//! implement and the handle it pushes raw notifications through.
//!
//! Notifications are delivered into a bounded queue with `try_send`, so a
//! transport callback never blocks on the consumer. When the queue is full
//! the notification is dropped and counted.

use crate::error::Result;
use crate::types::Notification;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A device found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Advertised local name
    pub name: String,
    /// Transport specific address
    pub address: String,
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Handle a transport uses to hand notifications to the session
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: Sender<Notification>,
    overflows: Arc<AtomicU64>,
}

impl NotificationSender {
    /// Wrap a queue sender with a shared overflow counter
    pub fn new(tx: Sender<Notification>, overflows: Arc<AtomicU64>) -> Self {
        Self { tx, overflows }
    }

    /// Queue a payload received on `channel_id`
    ///
    /// Returns false if the notification was dropped, either because the
    /// queue is full or because the session has stopped consuming.
    pub fn deliver(&self, channel_id: Uuid, payload: &[u8]) -> bool {
        match self.tx.try_send(Notification::new(channel_id, payload)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.overflows.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    "Notification queue full, dropped payload on {} ({} dropped this session)",
                    channel_id,
                    dropped
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Notifications dropped on a full queue so far
    pub fn overflows(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }
}

/// Unified interface for motion device transports
///
/// Implementations must be `Send` so a session can be driven from any
/// thread. Subscriptions deliver on transport-owned threads through the
/// [`NotificationSender`] passed to [`MotionTransport::subscribe`].
///
/// # Example
///
/// ```ignore
/// fn open(transport: &mut dyn MotionTransport) -> Result<DeviceInfo> {
///     let device = transport.discover("Nano33IoT_Motion", Duration::from_secs(10))?;
///     transport.connect(&device)?;
///     Ok(device)
/// }
/// ```
pub trait MotionTransport: Send {
    /// Find an advertising device by name
    ///
    /// Fails with `MotionLogError::DeviceNotFound` if nothing matching
    /// advertises within `timeout`.
    fn discover(&mut self, device_name: &str, timeout: Duration) -> Result<DeviceInfo>;

    /// Connect to a discovered device
    fn connect(&mut self, device: &DeviceInfo) -> Result<()>;

    /// Start notifications on a characteristic
    fn subscribe(&mut self, channel_id: Uuid, sink: NotificationSender) -> Result<()>;

    /// Stop notifications on a characteristic
    ///
    /// After this returns the transport must not deliver on `channel_id`
    /// and must have released its sender for it.
    fn unsubscribe(&mut self, channel_id: Uuid) -> Result<()>;

    /// Disconnect from the device
    fn disconnect(&mut self);

    /// Check if connected to a device
    fn is_connected(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::sync::Mutex;

    #[test]
    fn test_deliver_counts_overflow() {
        let (tx, rx) = bounded(2);
        let sender = NotificationSender::new(tx, Arc::new(AtomicU64::new(0)));
        let id = Uuid::nil();

        assert!(sender.deliver(id, &[1]));
        assert!(sender.deliver(id, &[2]));
        assert!(!sender.deliver(id, &[3]));
        assert_eq!(sender.overflows(), 1);

        assert_eq!(rx.try_recv().unwrap().payload, vec![1]);
        assert_eq!(rx.try_recv().unwrap().payload, vec![2]);
        assert!(rx.try_recv().is_err());
    }

    /// Collects formatted log output in memory
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_every_overflow_is_logged_with_channel() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let (tx, _rx) = bounded(1);
        let sender = NotificationSender::new(tx, Arc::new(AtomicU64::new(0)));
        let acc_z = Uuid::from_u128(0x2101_0000_0000_1000_8000_0080_5f9b_34fb);
        let clock = Uuid::from_u128(0x2100_0000_0000_1000_8000_0080_5f9b_34fb);

        tracing::subscriber::with_default(subscriber, || {
            assert!(sender.deliver(clock, &[0; 4]));
            assert!(!sender.deliver(acc_z, &[1; 4]));
            assert!(!sender.deliver(acc_z, &[2; 4]));
            assert!(!sender.deliver(acc_z, &[3; 4]));
        });

        let output = logs.contents();
        assert_eq!(sender.overflows(), 3);
        assert_eq!(output.matches("Notification queue full").count(), 3);
        assert_eq!(output.matches(&acc_z.to_string()).count(), 3);
        assert!(!output.contains(&clock.to_string()));
        assert!(output.contains("(3 dropped this session)"));
    }

    #[test]
    fn test_deliver_after_consumer_gone() {
        let (tx, rx) = bounded(2);
        let sender = NotificationSender::new(tx, Arc::new(AtomicU64::new(0)));
        drop(rx);
        assert!(!sender.deliver(Uuid::nil(), &[0; 4]));
        assert_eq!(sender.overflows(), 0);
    }
}
