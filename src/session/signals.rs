//! Cancelling a session from process signals
//!
//! Signal delivery is turned into a [`CancellationToken::cancel`] call on
//! a dedicated thread, so an interrupted session still stops, drains and
//! writes its records like any other cancelled session.

use crate::error::{MotionLogError, Result};
use signal_hook::iterator::{Handle, Signals};
use std::thread::JoinHandle;

use super::controller::CancellationToken;

pub use signal_hook::consts::{SIGINT, SIGTERM};

/// Keeps a signal listener alive; dropping it unregisters the listener
pub struct SignalCancel {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalCancel {
    /// Cancel `token` whenever one of `signals` arrives
    pub fn install(signals: &[i32], token: CancellationToken) -> Result<Self> {
        let mut listener = Signals::new(signals)?;
        let handle = listener.handle();

        let thread = std::thread::Builder::new()
            .name("signal-cancel".to_string())
            .spawn(move || {
                for signal in listener.forever() {
                    tracing::info!("Received signal {}, stopping session", signal);
                    token.cancel();
                }
            })
            .map_err(|e| MotionLogError::Channel(format!("Failed to spawn signal listener: {}", e)))?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for SignalCancel {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Signal listener panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StopReason;
    use serial_test::serial;
    use signal_hook::consts::SIGUSR1;
    use std::time::Duration;

    #[test]
    #[serial]
    fn test_signal_cancels_token() {
        let token = CancellationToken::new();
        let guard = SignalCancel::install(&[SIGUSR1], token.clone()).unwrap();
        assert!(!token.is_cancelled());

        signal_hook::low_level::raise(SIGUSR1).unwrap();
        assert_eq!(
            token.wait_timeout(Duration::from_secs(5)),
            StopReason::Cancelled
        );
        drop(guard);
    }

    #[test]
    #[serial]
    fn test_dropping_listener_leaves_token_untouched() {
        let token = CancellationToken::new();
        let guard = SignalCancel::install(&[SIGUSR1], token.clone()).unwrap();
        drop(guard);
        assert!(!token.is_cancelled());
    }
}
