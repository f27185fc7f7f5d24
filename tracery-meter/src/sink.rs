//! Marker sinks: where records go once the facility is enabled.

use crate::record::MarkerRecord;
use std::sync::{Arc, Mutex, OnceLock};

/// Destination for marker records.
///
/// Implementations must not block or panic; they are called inline from
/// instrumented code paths.
pub trait MarkerSink: Send + Sync {
    fn record(&self, record: &MarkerRecord);
}

/// Error installing a marker sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("marker sink already installed")]
    AlreadyInstalled,
}

static SINK: OnceLock<Arc<dyn MarkerSink>> = OnceLock::new();

/// Install the process-global marker sink.
///
/// Enables the facility: until this succeeds, every marker operation is a
/// no-op and [`is_trace_enabled`](crate::meter::is_trace_enabled) reports
/// false. A second install fails rather than silently swapping sinks under
/// concurrent recorders.
pub fn set_sink(sink: Arc<dyn MarkerSink>) -> Result<(), SinkError> {
    SINK.set(sink).map_err(|_| SinkError::AlreadyInstalled)
}

pub(crate) fn installed() -> Option<&'static Arc<dyn MarkerSink>> {
    SINK.get()
}

/// Default sink: forwards each record to the `tracing` ecosystem.
#[derive(Debug, Default)]
pub struct TracingSink;

impl MarkerSink for TracingSink {
    fn record(&self, record: &MarkerRecord) {
        tracing::debug!(
            target: "tracery::meter",
            level = %record.level,
            pid = record.pid,
            marker = %record.format(),
            "marker"
        );
    }
}

/// Capturing sink for tests and in-process inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<MarkerRecord>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn records(&self) -> Vec<MarkerRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl MarkerSink for MemorySink {
    fn record(&self, record: &MarkerRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}
