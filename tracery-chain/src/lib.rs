//! Trace-chain identifier propagation core.
//!
//! A chain is one logical end-to-end execution path, identified by a
//! process-unique 64-bit [`ChainId`]. Within a chain, work is segmented into
//! spans linked by parent pointers. The crate provides:
//! - collision-resistant identifier generation ([`id`])
//! - immutable-once-issued context values ([`context`])
//! - a thread-local chain lifecycle: begin / create_span / end ([`chain`])
//! - structured tracepoint emission ([`tracepoint`])
//! - helpers for carrying a chain across threads and await points
//!   ([`propagation`])
//!
//! Instrumentation must never crash the instrumented program: no public
//! operation in this crate panics or returns `Err`. Failure is encoded in
//! return values instead. An invalid [`TraceContext`] (zero chain id) is
//! inert, and every operation accepts one safely.

pub mod chain;
pub mod context;
pub mod id;
pub mod propagation;
pub mod tracepoint;

pub use context::{CONTEXT_BYTES, ContextBytesError, TraceContext, TraceFlags};
pub use id::{ChainId, ParseIdError, SpanId};
pub use tracepoint::{CommunicationMode, Tracepoint, TracepointType, tracepoint};
