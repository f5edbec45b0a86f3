//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use motionlog::session::SessionOutcome;
use motionlog::types::Record;

/// Records of a finished session, in completion order
pub fn records(outcome: &SessionOutcome) -> Vec<Record> {
    outcome.series.iter().copied().collect()
}

/// Assert every record is normalized against the session's epoch origin
///
/// Elapsed seconds must be exactly the millisecond distance from the
/// origin divided by 1000, and never negative.
pub fn assert_normalized_to_origin(outcome: &SessionOutcome) {
    let origin = outcome
        .metadata
        .epoch_origin_ms
        .expect("a session with records has an epoch origin");
    for record in &outcome.series {
        let expected = record.raw_timestamp.saturating_sub(origin) as f64 / 1000.0;
        assert_eq!(
            record.elapsed_seconds, expected,
            "record at {} ms is not normalized to origin {} ms",
            record.raw_timestamp, origin
        );
    }
}
