//! Performance trace-marker facility.
//!
//! Markers are named profiling events independent of the chain/span identity
//! model: synchronous region begin/end pairs, asynchronous regions matched by
//! (name, task id) rather than call order, and point-in-time value counters.
//!
//! Records flow to a process-global [`MarkerSink`]; until one is installed
//! every operation is a cheap no-op. No operation here blocks, panics, or
//! returns an error: instrumentation must never crash the host.

pub mod meter;
pub mod record;
pub mod sink;

pub use meter::{
    finish_async_trace, finish_sync_trace, finish_trace, is_trace_enabled, start_async_trace,
    start_sync_trace, start_trace, trace_by_value, trace_by_value_at,
};
pub use record::{MarkerLevel, MarkerPayload, MarkerRecord};
pub use sink::{MarkerSink, MemorySink, SinkError, TracingSink, set_sink};
