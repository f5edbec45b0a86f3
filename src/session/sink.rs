//! Record collection for a session
//!
//! [`RecordSink`] accumulates records in completion order with no
//! reordering, deduplication or capacity bound. [`RecordSink::drain`]
//! hands everything collected so far to the persistence layer as a
//! [`RecordSeries`].

use crate::types::Record;

/// Append-only collector of completed records
#[derive(Debug, Default)]
pub struct RecordSink {
    records: Vec<Record>,
}

impl RecordSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Number of records collected and not yet drained
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing is waiting to be drained
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Take every record pushed so far, leaving the sink empty
    ///
    /// Never blocks and never waits for more data.
    pub fn drain(&mut self) -> RecordSeries {
        RecordSeries {
            records: std::mem::take(&mut self.records),
        }
    }
}

/// Ordered, finite sequence of records from one session
///
/// [`RecordSeries::iter`] can be called any number of times, each pass
/// starting from the first record. Consuming the series with `into_iter`
/// is one-shot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSeries {
    records: Vec<Record>,
}

impl RecordSeries {
    /// Iterate from the first record
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the series has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First completed record
    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    /// Last completed record
    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Elapsed seconds covered between the first and last record
    pub fn duration_seconds(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => (last.elapsed_seconds - first.elapsed_seconds).max(0.0),
            _ => 0.0,
        }
    }

    /// Borrow the records as a slice
    pub fn as_slice(&self) -> &[Record] {
        &self.records
    }
}

impl From<Vec<Record>> for RecordSeries {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl IntoIterator for RecordSeries {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSeries {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
