//! Zero-origin normalization of device timestamps
//!
//! The device clock is a monotonic millisecond counter with an arbitrary
//! starting value. The first observed value becomes the session's epoch
//! origin; every later value is reported as seconds since that origin.

/// Device milliseconds per reported second
const MILLIS_PER_SECOND: f64 = 1000.0;

/// Result of normalizing one raw timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    /// Seconds since the epoch origin, never negative
    pub seconds: f64,
    /// Whether this call captured the epoch origin
    pub is_epoch_origin: bool,
}

/// Converts raw device timestamps into elapsed seconds
///
/// Holds a single origin value. Once captured it never changes; a new
/// session gets a new normalizer.
#[derive(Debug, Clone, Default)]
pub struct TimeNormalizer {
    origin: Option<u64>,
}

impl TimeNormalizer {
    /// Create a normalizer with no origin captured
    pub fn new() -> Self {
        Self::default()
    }

    /// The captured epoch origin, if any
    pub fn origin(&self) -> Option<u64> {
        self.origin
    }

    /// Capture `raw_timestamp` as the origin if none is set yet
    ///
    /// Returns true only for the call that set the origin.
    pub fn anchor(&mut self, raw_timestamp: u64) -> bool {
        if self.origin.is_some() {
            return false;
        }
        self.origin = Some(raw_timestamp);
        tracing::debug!("Epoch origin captured at {} ms", raw_timestamp);
        true
    }

    /// Normalize a raw timestamp to seconds since the origin
    ///
    /// The first call of a session (with no prior [`anchor`](Self::anchor))
    /// captures the origin and reports 0.0. Timestamps earlier than the
    /// origin floor at zero.
    pub fn normalize(&mut self, raw_timestamp: u64) -> Normalized {
        let is_epoch_origin = self.anchor(raw_timestamp);
        let origin = self.origin.unwrap_or(raw_timestamp);
        let elapsed_ms = raw_timestamp.saturating_sub(origin);

        Normalized {
            seconds: elapsed_ms as f64 / MILLIS_PER_SECOND,
            is_epoch_origin,
        }
    }
}
