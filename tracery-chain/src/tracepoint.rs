//! Structured tracepoint emission.
//!
//! A tracepoint is a point-in-time record of a communication role (client
//! send, server receive, ...) within a span. Recording one never mutates the
//! context and never fails; invalid contexts are silently skipped so broken
//! instrumentation cannot take the host down.

use crate::context::{TraceContext, TraceFlags};
use crate::id::{ChainId, SpanId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the two ends of the recorded exchange live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationMode {
    /// Unspecified.
    #[default]
    Default,
    /// Thread-to-thread within one process.
    Thread,
    /// Process-to-process on one device.
    Process,
    /// Device-to-device.
    Device,
}

/// Role of the recorded moment in a client/server exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TracepointType {
    /// Client send.
    Cs,
    /// Client receive.
    Cr,
    /// Server send.
    Ss,
    /// Server receive.
    Sr,
    /// General info not tied to an exchange role.
    General,
}

/// A fully-formed tracepoint record, ready for downstream collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracepoint {
    pub mode: CommunicationMode,
    pub kind: TracepointType,
    pub chain_id: ChainId,
    pub span_id: SpanId,
    pub parent_span_id: SpanId,
    /// Flag bits of the context at record time, for downstream filters.
    pub flags: u32,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Tracepoint {
    /// Build a record from a context. Returns `None` for an invalid context.
    ///
    /// An empty message is kept as `None`; message presence never affects the
    /// context's identifiers or validity.
    #[must_use]
    pub fn from_context(
        mode: CommunicationMode,
        kind: TracepointType,
        ctx: &TraceContext,
        message: Option<&str>,
    ) -> Option<Self> {
        if !ctx.is_valid() {
            return None;
        }
        Some(Self {
            mode,
            kind,
            chain_id: ctx.chain_id,
            span_id: ctx.span_id,
            parent_span_id: ctx.parent_span_id,
            flags: ctx.flags.bits(),
            message: message.filter(|m| !m.is_empty()).map(str::to_owned),
            timestamp: Utc::now(),
        })
    }

    /// Whether the context asked for tracepoint detail: [`TraceFlags::TP_INFO`],
    /// or [`TraceFlags::D2D_TP_INFO`] for device-to-device records. Emission
    /// itself is unconditional; this travels with the record so downstream
    /// filters can honor the request.
    #[must_use]
    pub fn is_detail_requested(&self) -> bool {
        let flags = TraceFlags::from_bits(self.flags);
        flags.contains(TraceFlags::TP_INFO)
            || (flags.contains(TraceFlags::D2D_TP_INFO) && self.mode == CommunicationMode::Device)
    }

    fn emit(&self) {
        tracing::debug!(
            target: "tracery::tracepoint",
            mode = ?self.mode,
            kind = ?self.kind,
            chain.id = %self.chain_id,
            span.id = %self.span_id,
            parent.span.id = %self.parent_span_id,
            flags = self.flags,
            detail = self.is_detail_requested(),
            message = self.message.as_deref().unwrap_or(""),
            "tracepoint"
        );
    }
}

/// Record a tracepoint against `ctx`.
///
/// No-op for an invalid context; never panics. `message` may be absent or
/// empty. The context is read, never mutated.
pub fn tracepoint(
    mode: CommunicationMode,
    kind: TracepointType,
    ctx: &TraceContext,
    message: Option<&str>,
) {
    if let Some(record) = Tracepoint::from_context(mode, kind, ctx, message) {
        record.emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TraceFlags;

    fn ctx() -> TraceContext {
        TraceContext {
            chain_id: ChainId(7),
            parent_span_id: SpanId(1),
            span_id: SpanId(2),
            flags: TraceFlags::empty(),
        }
    }

    #[test]
    fn from_context_captures_identifiers() {
        let record =
            Tracepoint::from_context(CommunicationMode::Thread, TracepointType::Cs, &ctx(), None)
                .unwrap();
        assert_eq!(record.chain_id, ChainId(7));
        assert_eq!(record.span_id, SpanId(2));
        assert_eq!(record.parent_span_id, SpanId(1));
        assert_eq!(record.message, None);
    }

    #[test]
    fn from_context_rejects_invalid_context() {
        let record = Tracepoint::from_context(
            CommunicationMode::Default,
            TracepointType::General,
            &TraceContext::INVALID,
            Some("ignored"),
        );
        assert!(record.is_none());
    }

    #[test]
    fn empty_message_is_normalized_to_none() {
        let with_empty =
            Tracepoint::from_context(CommunicationMode::Default, TracepointType::Sr, &ctx(), Some(""))
                .unwrap();
        assert_eq!(with_empty.message, None);
        let with_text = Tracepoint::from_context(
            CommunicationMode::Default,
            TracepointType::Sr,
            &ctx(),
            Some("reply sent"),
        )
        .unwrap();
        assert_eq!(with_text.message.as_deref(), Some("reply sent"));
    }

    #[test]
    fn message_variants_do_not_affect_validity() {
        let target = ctx();
        for message in [None, Some(""), Some("payload")] {
            tracepoint(CommunicationMode::Process, TracepointType::Ss, &target, message);
            assert!(target.is_valid());
        }
    }

    #[test]
    fn tracepoint_on_invalid_context_does_not_panic() {
        tracepoint(
            CommunicationMode::Device,
            TracepointType::Cr,
            &TraceContext::INVALID,
            Some("no chain"),
        );
    }

    #[test]
    fn detail_request_follows_flags() {
        let mut plain = ctx();
        let record =
            Tracepoint::from_context(CommunicationMode::Thread, TracepointType::Cs, &plain, None)
                .unwrap();
        assert!(!record.is_detail_requested());

        plain.enable_flag(TraceFlags::TP_INFO);
        let record =
            Tracepoint::from_context(CommunicationMode::Thread, TracepointType::Cs, &plain, None)
                .unwrap();
        assert!(record.is_detail_requested());
    }

    #[test]
    fn d2d_detail_applies_to_device_mode_only() {
        let mut d2d = ctx();
        d2d.enable_flag(TraceFlags::D2D_TP_INFO);
        let device =
            Tracepoint::from_context(CommunicationMode::Device, TracepointType::Cs, &d2d, None)
                .unwrap();
        assert!(device.is_detail_requested());
        let thread =
            Tracepoint::from_context(CommunicationMode::Thread, TracepointType::Cs, &d2d, None)
                .unwrap();
        assert!(!thread.is_detail_requested());
    }

    #[test]
    fn record_serializes_for_collection() {
        let record = Tracepoint::from_context(
            CommunicationMode::Process,
            TracepointType::Sr,
            &ctx(),
            Some("request in"),
        )
        .unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["mode"], "process");
        assert_eq!(json["kind"], "sr");
        assert_eq!(json["message"], "request in");
    }
}
