//! Trace context values and the chain flag bitset.

use crate::id::{ChainId, SpanId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Bitset of chain capabilities.
///
/// Flags are additive within one chain's lifetime: once enabled, a flag is
/// never cleared. Unknown bits are masked off on entry, so a malformed flags
/// value degrades to the empty set rather than carrying garbage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceFlags(u32);

impl TraceFlags {
    /// Trace asynchronous sub-operations in this chain as well.
    pub const INCLUDE_ASYNC: Self = Self(1 << 0);
    /// Do not derive child spans; `create_span` returns the current context.
    pub const DONOT_CREATE_SPAN: Self = Self(1 << 1);
    /// Request tracepoint detail downstream.
    pub const TP_INFO: Self = Self(1 << 2);
    /// Suppress begin/end diagnostic emission.
    pub const NO_BE_INFO: Self = Self(1 << 3);
    /// Do not stamp chain identity onto collateral records (e.g. markers).
    pub const DONOT_ENABLE_LOG: Self = Self(1 << 4);
    /// This chain was triggered by a fault.
    pub const FAULT_TRIGGER: Self = Self(1 << 5);
    /// Request device-to-device tracepoint detail downstream.
    pub const D2D_TP_INFO: Self = Self(1 << 6);

    const VALID_MASK: u32 = (1 << 7) - 1;

    /// The empty set: no capabilities enabled.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build from raw bits, discarding any unknown bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::VALID_MASK)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every flag in `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set every flag in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0 & Self::VALID_MASK;
    }
}

impl BitOr for TraceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Number of bytes in the serialized form of a [`TraceContext`].
pub const CONTEXT_BYTES: usize = 28;

/// Error decoding a [`TraceContext`] from bytes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ContextBytesError {
    #[error("invalid length: expected {CONTEXT_BYTES}, got {0}")]
    InvalidLength(usize),
    #[error("chain id is zero")]
    InvalidChainId,
}

/// One chain/span position, issued by the chain manager.
///
/// A context is a plain value: ending the chain clears the installed slot but
/// never mutates values handed out earlier. A context is valid iff its chain
/// id is non-zero; invalid contexts are inert everywhere in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    pub chain_id: ChainId,
    pub parent_span_id: SpanId,
    pub span_id: SpanId,
    pub flags: TraceFlags,
}

impl TraceContext {
    /// The inert all-zero sentinel.
    pub const INVALID: Self = Self {
        chain_id: ChainId::INVALID,
        parent_span_id: SpanId::ROOT,
        span_id: SpanId::ROOT,
        flags: TraceFlags::empty(),
    };

    /// Whether this context belongs to a chain.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.chain_id.is_valid()
    }

    /// Whether `flag` is enabled. Always false for an invalid context.
    #[must_use]
    pub fn is_flag_enabled(&self, flag: TraceFlags) -> bool {
        self.is_valid() && self.flags.contains(flag)
    }

    /// Enable `flag` on this value. No-op for an invalid context.
    ///
    /// This touches only the value; use [`crate::chain::enable_flag`] to also
    /// refresh the installed copy of the same chain.
    pub fn enable_flag(&mut self, flag: TraceFlags) {
        if self.is_valid() {
            self.flags.insert(flag);
        }
    }

    /// Serialize into a fixed-size byte array (big-endian fields).
    ///
    /// An invalid context serializes to all zeroes, which [`Self::from_bytes`]
    /// refuses to decode.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; CONTEXT_BYTES] {
        let mut out = [0u8; CONTEXT_BYTES];
        out[0..8].copy_from_slice(&self.chain_id.0.to_be_bytes());
        out[8..16].copy_from_slice(&self.span_id.0.to_be_bytes());
        out[16..24].copy_from_slice(&self.parent_span_id.0.to_be_bytes());
        out[24..28].copy_from_slice(&self.flags.bits().to_be_bytes());
        out
    }

    /// Rebuild a context from bytes produced by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContextBytesError> {
        if bytes.len() != CONTEXT_BYTES {
            return Err(ContextBytesError::InvalidLength(bytes.len()));
        }
        let word = |range: std::ops::Range<usize>| {
            // Range is always 8 bytes within the checked slice.
            u64::from_be_bytes(bytes[range].try_into().unwrap_or([0; 8]))
        };
        let chain_id = ChainId(word(0..8));
        if !chain_id.is_valid() {
            return Err(ContextBytesError::InvalidChainId);
        }
        let flags = u32::from_be_bytes(bytes[24..28].try_into().unwrap_or([0; 4]));
        Ok(Self {
            chain_id,
            span_id: SpanId(word(8..16)),
            parent_span_id: SpanId(word(16..24)),
            flags: TraceFlags::from_bits(flags),
        })
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{},{}]",
            self.chain_id, self.span_id, self.parent_span_id
        )
    }
}
