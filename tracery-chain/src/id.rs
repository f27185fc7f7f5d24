//! Chain and span identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A 64-bit chain identifier shared by every span in one chain.
///
/// Zero is the sentinel for "invalid/absent"; a generated id is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

/// A 64-bit span identifier scoped within one chain.
///
/// [`SpanId::ROOT`] (zero) marks the root span, which has no parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanId(pub u64);

impl ChainId {
    /// The invalid/absent sentinel.
    pub const INVALID: Self = Self(0);

    /// Generate a new process-unique chain id.
    ///
    /// Draws from the OS entropy source; if that fails, degrades to a
    /// counter-and-clock scheme rather than failing. Safe to call from any
    /// thread without coordination. Never returns [`ChainId::INVALID`].
    #[must_use]
    pub fn generate() -> Self {
        Self(nonzero_u64())
    }

    /// Whether this id identifies a chain (non-zero).
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Convert to a 16-character lowercase hex string.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    /// Parse from a 16-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, ParseIdError> {
        Ok(Self(u64_from_hex(s)?))
    }
}

impl SpanId {
    /// The root-span sentinel, meaning "no parent".
    pub const ROOT: Self = Self(0);

    /// Generate a fresh non-root span id.
    ///
    /// Same entropy/degradation scheme as [`ChainId::generate`]; never
    /// returns [`SpanId::ROOT`].
    #[must_use]
    pub fn generate() -> Self {
        Self(nonzero_u64())
    }

    /// Whether this is the root-span sentinel.
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }

    /// Convert to a 16-character lowercase hex string.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    /// Parse from a 16-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, ParseIdError> {
        Ok(Self(u64_from_hex(s)?))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Error parsing a hex ID string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseIdError {
    #[error("invalid hex digit: {0}")]
    InvalidHexDigit(char),
    #[error("invalid length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

fn u64_from_hex(s: &str) -> Result<u64, ParseIdError> {
    if s.len() != 16 {
        return Err(ParseIdError::InvalidLength {
            expected: 16,
            got: s.len(),
        });
    }
    if let Some(bad) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ParseIdError::InvalidHexDigit(bad));
    }
    // Length and digits are checked above, so this cannot fail.
    Ok(u64::from_str_radix(s, 16).unwrap_or(0))
}

fn nonzero_u64() -> u64 {
    loop {
        let v = entropy_u64().unwrap_or_else(degraded_u64);
        if v != 0 {
            return v;
        }
    }
}

fn entropy_u64() -> Option<u64> {
    let mut bytes = [0u8; 8];
    getrandom::fill(&mut bytes).ok()?;
    Some(u64::from_le_bytes(bytes))
}

/// Counter-and-clock degradation path for when the OS entropy source is
/// unavailable. Weaker than random draw but still process-unique.
fn degraded_u64() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    let tick = NEXT.fetch_add(1, Ordering::Relaxed);
    now_ns().wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ tick
}

fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
