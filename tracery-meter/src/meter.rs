//! Marker operations: region begin/end pairs and value counters.
//!
//! All operations are synchronous, bounded-time, and infallible. With no
//! sink installed they return immediately without building a record.

use crate::record::{MarkerLevel, MarkerPayload, MarkerRecord};
use crate::sink;

fn dispatch(level: MarkerLevel, payload: impl FnOnce() -> MarkerPayload) {
    if let Some(sink) = sink::installed() {
        sink.record(&MarkerRecord::new(level, payload()));
    }
}

/// Whether marker recording is live. Never panics.
#[must_use]
pub fn is_trace_enabled() -> bool {
    sink::installed().is_some()
}

/// Mark the beginning of the (name, task id) region.
///
/// Runs at [`MarkerLevel::Commercial`], like the other omitted-level forms.
pub fn start_trace(name: &str, task_id: i32) {
    dispatch(MarkerLevel::Commercial, || MarkerPayload::Begin {
        name: name.to_owned(),
        task_id,
    });
}

/// Mark the end of the (name, task id) region.
pub fn finish_trace(name: &str, task_id: i32) {
    dispatch(MarkerLevel::Commercial, || MarkerPayload::End {
        name: name.to_owned(),
        task_id,
    });
}

/// Mark the beginning of a synchronous, stack-like region.
pub fn start_sync_trace(level: MarkerLevel, name: &str, args: Option<&str>) {
    dispatch(level, || MarkerPayload::SyncBegin {
        name: name.to_owned(),
        args: args.filter(|a| !a.is_empty()).map(str::to_owned),
    });
}

/// Mark the end of the innermost synchronous region with `name`.
pub fn finish_sync_trace(level: MarkerLevel, name: &str) {
    dispatch(level, || MarkerPayload::SyncEnd {
        name: name.to_owned(),
    });
}

/// Mark the beginning of an asynchronous region.
///
/// The matching [`finish_async_trace`] may run on any thread or task; pairs
/// are matched downstream by (name, task id), not call order.
pub fn start_async_trace(
    level: MarkerLevel,
    name: &str,
    task_id: i32,
    category: Option<&str>,
    args: Option<&str>,
) {
    dispatch(level, || MarkerPayload::AsyncBegin {
        name: name.to_owned(),
        task_id,
        category: category.filter(|c| !c.is_empty()).map(str::to_owned),
        args: args.filter(|a| !a.is_empty()).map(str::to_owned),
    });
}

/// Mark the end of the asynchronous (name, task id) region.
pub fn finish_async_trace(level: MarkerLevel, name: &str, task_id: i32) {
    dispatch(level, || MarkerPayload::AsyncEnd {
        name: name.to_owned(),
        task_id,
    });
}

/// Emit a point-in-time numeric sample.
///
/// The omitted-level form runs at [`MarkerLevel::Commercial`]; use
/// [`trace_by_value_at`] to pick a level.
pub fn trace_by_value(name: &str, value: i64) {
    trace_by_value_at(MarkerLevel::Commercial, name, value);
}

/// Emit a point-in-time numeric sample at `level`.
pub fn trace_by_value_at(level: MarkerLevel, name: &str, value: i64) {
    dispatch(level, || MarkerPayload::Counter {
        name: name.to_owned(),
        value,
    });
}
