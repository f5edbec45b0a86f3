//! Mock Transport Implementation for Testing
//!
//! This module provides a simulated motion device that can be used to run
//! sessions without radio hardware. It advertises under a configurable
//! name and feeds notifications in one of two modes.
//!
//! # Feeds
//!
//! - [`MockFeed::Script`] - A fixed list of notifications delivered in order
//!   from a single thread once every mapped channel is subscribed. Useful
//!   for deterministic tests, including malformed and stray payloads.
//! - [`MockFeed::Generated`] - One thread per subscribed channel producing
//!   samples at a fixed rate. Channels run independently, so their
//!   notifications interleave the way a real device's do.
//!
//! # Example
//!
//! ```ignore
//! use motionlog::backend::mock_transport::{GeneratorConfig, MockTransport};
//!
//! let transport = MockTransport::generated("Nano33IoT_Motion", GeneratorConfig::default());
//! let mut controller = SessionController::new(transport, settings);
//! let outcome = controller.run(&CancellationToken::new())?;
//! ```

use crate::backend::router::ChannelMap;
use crate::error::{MotionLogError, Result};
use crate::session::{CancellationToken, StopReason};
use crate::types::{Channel, RawChannelEvent};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use uuid::Uuid;

use super::transport_trait::{DeviceInfo, MotionTransport, NotificationSender};

/// Address reported for the simulated device
const MOCK_ADDRESS: &str = "00:00:5E:00:53:01";

/// Highest sample rate a millisecond device clock can tell apart
pub const MAX_RATE_HZ: u32 = 1000;

/// Pattern for generating mock axis data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockDataPattern {
    /// Constant value
    Constant(f64),
    /// Sine wave with frequency and amplitude
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Square wave
    Square { period: f64, amplitude: f64 },
}

impl Default for MockDataPattern {
    fn default() -> Self {
        MockDataPattern::Sine {
            frequency: 1.0,
            amplitude: 1.0,
            offset: 0.0,
        }
    }
}

impl MockDataPattern {
    /// Generate a value at `elapsed_secs`, shifted by `phase` radians
    pub fn generate_value(&self, elapsed_secs: f64, phase: f64) -> f64 {
        match *self {
            MockDataPattern::Constant(v) => v,
            MockDataPattern::Sine {
                frequency,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * PI * frequency * elapsed_secs + phase).sin(),
            MockDataPattern::Square { period, amplitude } => {
                let shifted = elapsed_secs + phase / (2.0 * PI) * period;
                if shifted.rem_euclid(period) < period / 2.0 {
                    amplitude
                } else {
                    -amplitude
                }
            }
        }
    }
}

/// Settings for generated feeds
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Samples per second on every channel, clamped to `1..=MAX_RATE_HZ`
    pub rate_hz: u32,
    /// Device clock value of the first sample
    pub start_ms: u64,
    /// Axis waveform; X, Y and Z are a third of a turn apart
    pub pattern: MockDataPattern,
    /// Peak amplitude of uniform noise added to axis values
    pub noise_amplitude: f64,
    /// Probability that a single notification is lost in the air
    pub loss_probability: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rate_hz: 50,
            start_ms: 10_000,
            pattern: MockDataPattern::default(),
            noise_amplitude: 0.0,
            loss_probability: 0.0,
        }
    }
}

impl GeneratorConfig {
    /// Sample rate actually produced
    pub fn effective_rate_hz(&self) -> u32 {
        self.rate_hz.clamp(1, MAX_RATE_HZ)
    }

    /// Interval between samples
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.effective_rate_hz() as f64)
    }

    /// Device clock of sample number `n`
    ///
    /// Computed from `n` directly so rates that do not divide 1000 do not
    /// accumulate rounding drift.
    pub fn clock_ms(&self, n: u64) -> u64 {
        self.start_ms + n * 1000 / self.effective_rate_hz() as u64
    }

    /// Event produced on `channel` for sample number `n`
    pub fn sample(&self, channel: Channel, n: u64) -> RawChannelEvent {
        let t = n as f64 / self.effective_rate_hz() as f64;
        let axis = |phase: f64| {
            let mut v = self.pattern.generate_value(t, phase);
            if self.noise_amplitude > 0.0 {
                v += (rand_simple() - 0.5) * 2.0 * self.noise_amplitude;
            }
            v as f32
        };

        match channel {
            Channel::Timestamp => RawChannelEvent::Timestamp(self.clock_ms(n)),
            Channel::AxisX => RawChannelEvent::AxisX(axis(0.0)),
            Channel::AxisY => RawChannelEvent::AxisY(axis(2.0 * PI / 3.0)),
            Channel::AxisZ => RawChannelEvent::AxisZ(axis(4.0 * PI / 3.0)),
        }
    }
}

/// Where the mock device's notifications come from
#[derive(Debug, Clone)]
pub enum MockFeed {
    /// Deliver these (characteristic, payload) pairs in order
    Script(Vec<(Uuid, Vec<u8>)>),
    /// Produce samples on every subscribed channel
    Generated(GeneratorConfig),
}

/// Build a script from typed events using the given channel assignment
pub fn script_from_events(map: &ChannelMap, events: &[RawChannelEvent]) -> Vec<(Uuid, Vec<u8>)> {
    events
        .iter()
        .map(|e| (map.id_for(e.channel()), e.to_payload()))
        .collect()
}

/// Simple pseudo-random number generator (no external dependency)
fn rand_simple() -> f64 {
    use std::cell::Cell;
    thread_local! {
        static SEED: Cell<u64> = const { Cell::new(12345) };
    }
    SEED.with(|seed| {
        let mut s = seed.get();
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        seed.set(s);
        (s as f64) / (u64::MAX as f64)
    })
}

/// One active subscription
struct Subscription {
    /// Generator thread for generated feeds
    task: Option<FeedTask>,
    /// Held while subscribed, like a radio stack holds its callback
    sink: Option<NotificationSender>,
}

impl Subscription {
    fn cancel(self) {
        if let Some(task) = self.task {
            task.stop();
        }
        drop(self.sink);
    }
}

/// A running feed thread
struct FeedTask {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl FeedTask {
    fn spawn<F>(name: String, body: F) -> Result<Self>
    where
        F: FnOnce(CancellationToken) + Send + 'static,
    {
        let stop = CancellationToken::new();
        let thread_stop = stop.clone();
        let handle = std::thread::Builder::new()
            .name(name)
            .spawn(move || body(thread_stop))
            .map_err(|e| MotionLogError::Transport(format!("Failed to spawn feed: {}", e)))?;
        Ok(Self { stop, handle })
    }

    fn stop(self) {
        self.stop.cancel();
        if self.handle.join().is_err() {
            tracing::warn!("Mock feed thread panicked");
        }
    }
}

/// Simulated motion device
pub struct MockTransport {
    /// Name the device advertises under; `None` means nothing advertises
    advertised_name: Option<String>,
    /// Notification source
    feed: MockFeed,
    /// Characteristic assignment the device exposes
    channel_map: ChannelMap,
    /// Whether the mock device is "connected"
    connected: bool,
    /// Active subscriptions; generated feeds own one task each
    subscriptions: HashMap<Uuid, Subscription>,
    /// Script delivery task, started once all channels are subscribed
    script_task: Option<FeedTask>,
    /// Every characteristic ever subscribed, in order
    subscribe_history: Vec<Uuid>,
    /// Characteristic whose subscription should fail
    fail_subscribe: Option<Uuid>,
    /// Release every sender once the script is delivered
    close_after_script: bool,
    /// Notifications accepted by the session queue
    delivered: Arc<AtomicU64>,
}

impl MockTransport {
    /// A device replaying a fixed script
    pub fn scripted(name: impl Into<String>, script: Vec<(Uuid, Vec<u8>)>) -> Self {
        Self::with_feed(Some(name.into()), MockFeed::Script(script))
    }

    /// A device producing samples continuously
    pub fn generated(name: impl Into<String>, config: GeneratorConfig) -> Self {
        Self::with_feed(Some(name.into()), MockFeed::Generated(config))
    }

    /// No device advertising at all
    pub fn absent() -> Self {
        Self::with_feed(None, MockFeed::Script(Vec::new()))
    }

    fn with_feed(advertised_name: Option<String>, feed: MockFeed) -> Self {
        Self {
            advertised_name,
            feed,
            channel_map: ChannelMap::default(),
            connected: false,
            subscriptions: HashMap::new(),
            script_task: None,
            subscribe_history: Vec::new(),
            fail_subscribe: None,
            close_after_script: false,
            delivered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Expose a different characteristic assignment
    pub fn with_channel_map(mut self, map: ChannelMap) -> Self {
        self.channel_map = map;
        self
    }

    /// Make subscribing to `channel_id` fail
    pub fn failing_subscribe(mut self, channel_id: Uuid) -> Self {
        self.fail_subscribe = Some(channel_id);
        self
    }

    /// Behave like a device that drops the link after its script
    pub fn closing_after_script(mut self) -> Self {
        self.close_after_script = true;
        self
    }

    /// Shared counter of notifications accepted by the session queue
    pub fn delivered_handle(&self) -> Arc<AtomicU64> {
        self.delivered.clone()
    }

    /// Characteristics subscribed over the transport's lifetime
    pub fn subscribe_history(&self) -> &[Uuid] {
        &self.subscribe_history
    }

    /// Characteristics currently subscribed
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    fn channel_for(&self, channel_id: Uuid) -> Option<Channel> {
        self.channel_map
            .entries()
            .into_iter()
            .find(|(_, id)| *id == channel_id)
            .map(|(ch, _)| ch)
    }

    fn all_channels_subscribed(&self) -> bool {
        self.channel_map
            .entries()
            .iter()
            .all(|(_, id)| self.subscriptions.contains_key(id))
    }

    fn spawn_generator(
        &self,
        channel: Channel,
        channel_id: Uuid,
        config: GeneratorConfig,
        sink: NotificationSender,
    ) -> Result<FeedTask> {
        let delivered = self.delivered.clone();
        FeedTask::spawn(format!("mock-{}", channel), move |stop| {
            let period = config.period();
            let mut n = 0u64;
            loop {
                let lost = config.loss_probability > 0.0 && rand_simple() < config.loss_probability;
                if !lost {
                    let payload = config.sample(channel, n).to_payload();
                    if sink.deliver(channel_id, &payload) {
                        delivered.fetch_add(1, Ordering::Relaxed);
                    }
                }
                n += 1;
                if stop.wait_timeout(period) == StopReason::Cancelled {
                    break;
                }
            }
        })
    }

    fn spawn_script(&self, script: Vec<(Uuid, Vec<u8>)>, sink: NotificationSender) -> Result<FeedTask> {
        let delivered = self.delivered.clone();
        FeedTask::spawn("mock-script".to_string(), move |stop| {
            for (channel_id, payload) in script {
                if stop.is_cancelled() {
                    break;
                }
                if sink.deliver(channel_id, &payload) {
                    delivered.fetch_add(1, Ordering::Relaxed);
                }
            }
        })
    }

    fn stop_all(&mut self) {
        if let Some(task) = self.script_task.take() {
            task.stop();
        }
        for (_, subscription) in self.subscriptions.drain() {
            subscription.cancel();
        }
    }
}

impl MotionTransport for MockTransport {
    fn discover(&mut self, device_name: &str, _timeout: Duration) -> Result<DeviceInfo> {
        match &self.advertised_name {
            Some(name) if name == device_name => Ok(DeviceInfo {
                name: name.clone(),
                address: MOCK_ADDRESS.to_string(),
            }),
            _ => Err(MotionLogError::DeviceNotFound(device_name.to_string())),
        }
    }

    fn connect(&mut self, device: &DeviceInfo) -> Result<()> {
        if self.advertised_name.as_deref() != Some(device.name.as_str()) {
            return Err(MotionLogError::Transport(format!(
                "Device {} is not advertising",
                device
            )));
        }
        self.connected = true;
        tracing::debug!("Mock device connected: {}", device);
        Ok(())
    }

    fn subscribe(&mut self, channel_id: Uuid, sink: NotificationSender) -> Result<()> {
        if !self.connected {
            return Err(MotionLogError::Transport("Not connected".to_string()));
        }
        if self.fail_subscribe == Some(channel_id) {
            return Err(MotionLogError::Transport(format!(
                "Characteristic {} does not support notifications",
                channel_id
            )));
        }
        let channel = self.channel_for(channel_id).ok_or_else(|| {
            MotionLogError::Transport(format!("Characteristic {} not found", channel_id))
        })?;

        self.subscribe_history.push(channel_id);

        let task = match &self.feed {
            MockFeed::Generated(config) => {
                Some(self.spawn_generator(channel, channel_id, config.clone(), sink.clone())?)
            }
            MockFeed::Script(_) => None,
        };
        let held = if self.close_after_script {
            None
        } else {
            Some(sink.clone())
        };
        self.subscriptions
            .insert(channel_id, Subscription { task, sink: held });

        if let MockFeed::Script(script) = &self.feed {
            if self.script_task.is_none() && self.all_channels_subscribed() {
                self.script_task = Some(self.spawn_script(script.clone(), sink)?);
            }
        }
        Ok(())
    }

    fn unsubscribe(&mut self, channel_id: Uuid) -> Result<()> {
        match self.subscriptions.remove(&channel_id) {
            Some(subscription) => {
                subscription.cancel();
                if self.subscriptions.is_empty() {
                    if let Some(task) = self.script_task.take() {
                        task.stop();
                    }
                }
                Ok(())
            }
            None => Err(MotionLogError::Transport(format!(
                "Characteristic {} is not subscribed",
                channel_id
            ))),
        }
    }

    fn disconnect(&mut self) {
        self.stop_all();
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.stop_all();
    }
}
