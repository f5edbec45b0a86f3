//! Sample assembly from independently delivered channels
//!
//! The four channels of a motion reading (clock, X, Y, Z) arrive as
//! separate notifications with no pairing or ordering guarantee. The
//! [`SampleAssembler`] latches the most recent value of each channel and
//! emits a [`Record`] as soon as all four are present, then clears the
//! latch for the next sample.
//!
//! # Latch Semantics
//!
//! - A write to a field always replaces an unconsumed earlier value for
//!   the same field (latest wins).
//! - Completeness is checked after every write, including clock writes.
//! - On completion all four fields are cleared together.
//!
//! # Cross-sample Pairing
//!
//! Samples carry no sequence id. If axis values from an incomplete sample
//! are still latched when the next sample's clock arrives, they pair with
//! that clock. Under [`LatchPolicy::Permissive`] (the default) this is
//! tolerated. [`LatchPolicy::CompletenessDeadline`] discards a partial
//! latch that stayed open for longer than the deadline before accepting
//! the next write.
//!
//! The assembler performs no I/O and no locking. It must be owned by a
//! single consumer; see [`crate::backend::worker`].

pub mod normalizer;

pub use normalizer::{Normalized, TimeNormalizer};

use crate::types::{Channel, RawChannelEvent, Record};
use std::time::{Duration, Instant};

/// How long a partially filled latch may stay open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatchPolicy {
    /// Keep partial values indefinitely; stale axes may pair with a later clock
    #[default]
    Permissive,
    /// Discard a partial latch that has been open longer than the given duration
    CompletenessDeadline(Duration),
}

/// The assembler's in-progress sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatchedState {
    /// Latched clock value
    pub timestamp: Option<u64>,
    /// Latched X value
    pub x: Option<f32>,
    /// Latched Y value
    pub y: Option<f32>,
    /// Latched Z value
    pub z: Option<f32>,
    /// When the first field of this latch was written
    pub opened_at: Option<Instant>,
}

impl LatchedState {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none() && self.x.is_none() && self.y.is_none() && self.z.is_none()
    }

    /// True when all four fields are set
    pub fn is_complete(&self) -> bool {
        self.timestamp.is_some() && self.x.is_some() && self.y.is_some() && self.z.is_some()
    }

    /// Whether the given channel currently holds a value
    pub fn has(&self, channel: Channel) -> bool {
        match channel {
            Channel::Timestamp => self.timestamp.is_some(),
            Channel::AxisX => self.x.is_some(),
            Channel::AxisY => self.y.is_some(),
            Channel::AxisZ => self.z.is_some(),
        }
    }

    /// Write an event into its field, returning true if a value was replaced
    fn write(&mut self, event: RawChannelEvent) -> bool {
        match event {
            RawChannelEvent::Timestamp(ts) => self.timestamp.replace(ts).is_some(),
            RawChannelEvent::AxisX(v) => self.x.replace(v).is_some(),
            RawChannelEvent::AxisY(v) => self.y.replace(v).is_some(),
            RawChannelEvent::AxisZ(v) => self.z.replace(v).is_some(),
        }
    }

    /// Take all four fields if complete, leaving the latch cleared
    fn take_complete(&mut self) -> Option<(u64, f32, f32, f32)> {
        if !self.is_complete() {
            return None;
        }
        let taken = std::mem::take(self);
        Some((taken.timestamp?, taken.x?, taken.y?, taken.z?))
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Correlates channel events into complete records
#[derive(Debug, Clone, Default)]
pub struct SampleAssembler {
    latch: LatchedState,
    normalizer: TimeNormalizer,
    policy: LatchPolicy,
    completed: u64,
    stale_discarded: u64,
}

impl SampleAssembler {
    /// Create an assembler with the permissive latch policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an assembler with a specific latch policy
    pub fn with_policy(policy: LatchPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Active latch policy
    pub fn policy(&self) -> LatchPolicy {
        self.policy
    }

    /// Read-only view of the latch
    pub fn latched(&self) -> &LatchedState {
        &self.latch
    }

    /// True if some but not all fields are latched
    pub fn is_partial(&self) -> bool {
        !self.latch.is_empty()
    }

    /// Number of records emitted so far
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Number of partial latches discarded by the completeness deadline
    pub fn stale_discarded(&self) -> u64 {
        self.stale_discarded
    }

    /// The epoch origin captured this session, if any
    pub fn epoch_origin(&self) -> Option<u64> {
        self.normalizer.origin()
    }

    /// Ingest one event, stamping it with the current instant
    pub fn ingest(&mut self, event: RawChannelEvent) -> Option<Record> {
        self.ingest_at(event, Instant::now())
    }

    /// Ingest one event observed at `now`
    ///
    /// Returns a record when this write completed the latch.
    pub fn ingest_at(&mut self, event: RawChannelEvent, now: Instant) -> Option<Record> {
        self.expire_stale(now);

        if self.latch.is_empty() {
            self.latch.opened_at = Some(now);
        }

        if self.latch.write(event) {
            tracing::trace!("{} overwritten before completion", event.channel());
        }

        if let RawChannelEvent::Timestamp(ts) = event {
            self.normalizer.anchor(ts);
        }

        let (raw_timestamp, x, y, z) = self.latch.take_complete()?;
        let normalized = self.normalizer.normalize(raw_timestamp);
        self.completed += 1;

        Some(Record::new(raw_timestamp, x, y, z, normalized.seconds))
    }

    fn expire_stale(&mut self, now: Instant) {
        let LatchPolicy::CompletenessDeadline(limit) = self.policy else {
            return;
        };
        let Some(opened) = self.latch.opened_at else {
            return;
        };
        if now.saturating_duration_since(opened) > limit {
            tracing::debug!(
                "Discarding partial latch open for {:?} (deadline {:?})",
                now.saturating_duration_since(opened),
                limit
            );
            self.latch.clear();
            self.stale_discarded += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RawChannelEvent::*;

    fn feed(assembler: &mut SampleAssembler, events: &[RawChannelEvent]) -> Vec<Record> {
        events.iter().filter_map(|e| assembler.ingest(*e)).collect()
    }

    #[test]
    fn test_two_in_order_samples() {
        let mut asm = SampleAssembler::new();
        let records = feed(
            &mut asm,
            &[
                Timestamp(1000),
                AxisX(0.1),
                AxisY(0.2),
                AxisZ(0.3),
                Timestamp(1500),
                AxisX(0.4),
                AxisY(0.5),
                AxisZ(0.6),
            ],
        );

        assert_eq!(
            records,
            vec![
                Record::new(1000, 0.1, 0.2, 0.3, 0.0),
                Record::new(1500, 0.4, 0.5, 0.6, 0.5),
            ]
        );
        assert_eq!(asm.completed(), 2);
        assert!(!asm.is_partial());
    }

    #[test]
    fn test_clock_arriving_last_completes() {
        let mut asm = SampleAssembler::new();
        assert!(asm.ingest(AxisZ(3.0)).is_none());
        assert!(asm.ingest(AxisX(1.0)).is_none());
        assert!(asm.ingest(AxisY(2.0)).is_none());
        let rec = asm.ingest(Timestamp(77)).unwrap();
        assert_eq!(rec, Record::new(77, 1.0, 2.0, 3.0, 0.0));
    }

    #[test]
    fn test_latest_write_wins() {
        let mut asm = SampleAssembler::new();
        feed(&mut asm, &[Timestamp(10), AxisX(1.0), AxisX(9.0), AxisY(2.0)]);
        assert_eq!(asm.latched().x, Some(9.0));
        let rec = asm.ingest(AxisZ(3.0)).unwrap();
        assert_eq!(rec.x, 9.0);
    }

    #[test]
    fn test_dangling_partial_is_not_emitted() {
        let mut asm = SampleAssembler::new();
        let records = feed(
            &mut asm,
            &[
                Timestamp(1000),
                AxisX(0.1),
                AxisY(0.2),
                AxisZ(0.3),
                Timestamp(2000),
                AxisX(0.7),
            ],
        );
        assert_eq!(records.len(), 1);
        assert!(asm.is_partial());
        assert!(asm.latched().has(Channel::Timestamp));
        assert!(asm.latched().has(Channel::AxisX));
        assert!(!asm.latched().has(Channel::AxisY));
    }

    #[test]
    fn test_stale_axes_pair_with_next_clock() {
        // X and Y of sample A are latched, A's Z is lost, B's clock arrives.
        let mut asm = SampleAssembler::new();
        let records = feed(
            &mut asm,
            &[
                Timestamp(1000),
                AxisX(0.1),
                AxisY(0.2),
                Timestamp(1100),
                AxisZ(0.9),
            ],
        );
        assert_eq!(records, vec![Record::new(1100, 0.1, 0.2, 0.9, 0.1)]);
    }

    #[test]
    fn test_epoch_is_first_observed_clock() {
        let mut asm = SampleAssembler::new();
        // First clock is overwritten before the sample completes
        let records = feed(
            &mut asm,
            &[Timestamp(500), Timestamp(700), AxisX(0.0), AxisY(0.0), AxisZ(0.0)],
        );
        assert_eq!(asm.epoch_origin(), Some(500));
        assert_eq!(records[0].raw_timestamp, 700);
        assert!((records[0].elapsed_seconds - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_deadline_discards_stale_latch() {
        let limit = Duration::from_millis(100);
        let mut asm = SampleAssembler::with_policy(LatchPolicy::CompletenessDeadline(limit));
        let t0 = Instant::now();

        assert!(asm.ingest_at(Timestamp(1000), t0).is_none());
        assert!(asm.ingest_at(AxisX(0.1), t0).is_none());
        assert!(asm.ingest_at(AxisY(0.2), t0).is_none());

        let later = t0 + Duration::from_millis(250);
        assert!(asm.ingest_at(Timestamp(1300), later).is_none());
        assert_eq!(asm.stale_discarded(), 1);
        assert_eq!(asm.latched().x, None);

        assert!(asm.ingest_at(AxisX(0.4), later).is_none());
        assert!(asm.ingest_at(AxisY(0.5), later).is_none());
        let rec = asm.ingest_at(AxisZ(0.6), later).unwrap();
        assert_eq!(rec.raw_timestamp, 1300);
        assert_eq!(rec.x, 0.4);
        // Epoch stays at the first observed clock even though its sample was discarded
        assert!((rec.elapsed_seconds - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_deadline_keeps_fresh_latch() {
        let limit = Duration::from_millis(100);
        let mut asm = SampleAssembler::with_policy(LatchPolicy::CompletenessDeadline(limit));
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(50);

        asm.ingest_at(Timestamp(1), t0);
        asm.ingest_at(AxisX(1.0), t1);
        asm.ingest_at(AxisY(1.0), t1);
        assert!(asm.ingest_at(AxisZ(1.0), t1).is_some());
        assert_eq!(asm.stale_discarded(), 0);
    }

    use proptest::prelude::*;

    fn arb_event() -> impl Strategy<Value = RawChannelEvent> {
        prop_oneof![
            any::<u64>().prop_map(Timestamp),
            (-16.0f32..16.0).prop_map(AxisX),
            (-16.0f32..16.0).prop_map(AxisY),
            (-16.0f32..16.0).prop_map(AxisZ),
        ]
    }

    proptest! {
        #[test]
        fn test_emits_iff_all_fields_written_since_last_emission(
            events in prop::collection::vec(arb_event(), 0..200)
        ) {
            let mut asm = SampleAssembler::new();
            let mut written = [false; 4];
            let mut emitted = 0u64;

            for event in events {
                written[event.channel().index()] = true;
                let expect = written.iter().all(|w| *w);
                let got = asm.ingest(event);

                prop_assert_eq!(got.is_some(), expect);
                if let Some(rec) = got {
                    emitted += 1;
                    prop_assert!(rec.elapsed_seconds >= 0.0);
                    written = [false; 4];
                }
            }

            prop_assert_eq!(asm.completed(), emitted);
        }
    }
}
