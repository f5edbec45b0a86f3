//! Mock construction helpers

use motionlog::backend::{GeneratorConfig, MockDataPattern, MockTransport};
use motionlog::config::SessionSettings;
use std::time::Duration;
use uuid::Uuid;

/// Name the test device advertises under
pub const TEST_DEVICE: &str = "Nano33IoT_Motion";

/// Session settings with a short duration and a fast stop poll
pub fn fast_settings(duration: Duration) -> SessionSettings {
    SessionSettings {
        stop_poll_interval: Duration::from_millis(5),
        discovery_timeout: Duration::from_millis(50),
        ..SessionSettings::default()
    }
    .with_duration(duration)
}

/// Device replaying `script` once every channel is subscribed
pub fn create_scripted_transport(script: Vec<(Uuid, Vec<u8>)>) -> MockTransport {
    MockTransport::scripted(TEST_DEVICE, script)
}

/// Device producing a sine wave on every axis
pub fn create_generated_transport(rate_hz: u32) -> MockTransport {
    MockTransport::generated(
        TEST_DEVICE,
        GeneratorConfig {
            rate_hz,
            pattern: MockDataPattern::Sine {
                frequency: 1.0,
                amplitude: 1.0,
                offset: 0.0,
            },
            ..GeneratorConfig::default()
        },
    )
}
