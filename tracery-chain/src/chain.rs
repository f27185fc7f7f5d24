//! Thread-local chain lifecycle: begin, span derivation, end.
//!
//! Each thread owns one installed-context slot. Chains on different threads
//! never observe each other; carrying a chain to another thread or task goes
//! through [`crate::propagation`].

use crate::context::{TraceContext, TraceFlags};
use crate::id::{ChainId, SpanId};
use std::cell::Cell;

thread_local! {
    static INSTALLED: Cell<TraceContext> = const { Cell::new(TraceContext::INVALID) };
}

/// Begin a new chain with no flags enabled.
///
/// Equivalent to [`begin_with_flags`] with [`TraceFlags::empty`].
pub fn begin(name: &str) -> TraceContext {
    begin_with_flags(name, TraceFlags::empty())
}

/// Begin a new chain and install it as this thread's current context,
/// replacing any prior one.
///
/// `name` is diagnostic only and must be non-empty; a malformed (empty) name
/// yields [`TraceContext::INVALID`] instead of a panic, so undisciplined call
/// sites stay safe. Unknown flag bits are discarded.
pub fn begin_with_flags(name: &str, flags: TraceFlags) -> TraceContext {
    if name.is_empty() {
        return TraceContext::INVALID;
    }
    let ctx = TraceContext {
        chain_id: ChainId::generate(),
        parent_span_id: SpanId::ROOT,
        span_id: SpanId::ROOT,
        flags: TraceFlags::from_bits(flags.bits()),
    };
    INSTALLED.set(ctx);
    if !ctx.flags.contains(TraceFlags::NO_BE_INFO) {
        tracing::debug!(
            target: "tracery::chain",
            chain_id = %ctx.chain_id,
            chain_name = name,
            chain_flags = ctx.flags.bits(),
            "chain begin"
        );
    }
    ctx
}

/// Derive and install a child span of the current chain.
///
/// Returns [`TraceContext::INVALID`] when no valid chain is installed. Under
/// [`TraceFlags::DONOT_CREATE_SPAN`] the installed context is returned
/// unchanged. Otherwise the new context keeps the chain id and flags, the old
/// span becomes the parent, and a fresh span id is generated.
pub fn create_span() -> TraceContext {
    let current = INSTALLED.get();
    if !current.is_valid() {
        return TraceContext::INVALID;
    }
    if current.flags.contains(TraceFlags::DONOT_CREATE_SPAN) {
        return current;
    }
    let next = TraceContext {
        chain_id: current.chain_id,
        parent_span_id: current.span_id,
        span_id: SpanId::generate(),
        flags: current.flags,
    };
    INSTALLED.set(next);
    next
}

/// End `ctx`'s chain, clearing this thread's installed slot.
///
/// No-op when `ctx` is invalid or belongs to a different chain than the
/// installed one. Idempotent: ending an already-ended chain is safe. The
/// value `ctx` itself is untouched.
pub fn end(ctx: &TraceContext) {
    if !ctx.is_valid() {
        return;
    }
    let current = INSTALLED.get();
    if current.chain_id != ctx.chain_id {
        return;
    }
    INSTALLED.set(TraceContext::INVALID);
    if !current.flags.contains(TraceFlags::NO_BE_INFO) {
        tracing::debug!(
            target: "tracery::chain",
            chain_id = %current.chain_id,
            "chain end"
        );
    }
}

/// The context currently installed on this thread, or
/// [`TraceContext::INVALID`] if absent.
#[must_use]
pub fn current() -> TraceContext {
    INSTALLED.get()
}

/// Install `ctx` as this thread's current context. Invalid contexts are
/// ignored; use [`clear`] to empty the slot.
pub fn install(ctx: &TraceContext) {
    if ctx.is_valid() {
        INSTALLED.set(*ctx);
    }
}

/// Clear this thread's installed slot.
pub fn clear() {
    INSTALLED.set(TraceContext::INVALID);
}

/// Pure validity predicate: `ctx` has a non-zero chain id.
#[must_use]
pub fn is_valid(ctx: &TraceContext) -> bool {
    ctx.is_valid()
}

/// Enable `flag` on `ctx` and, when `ctx`'s chain is the installed one,
/// refresh the installed copy as well. No-op for invalid contexts.
pub fn enable_flag(ctx: &mut TraceContext, flag: TraceFlags) {
    if !ctx.is_valid() {
        return;
    }
    ctx.enable_flag(flag);
    let current = INSTALLED.get();
    if current.chain_id == ctx.chain_id {
        let mut updated = current;
        updated.flags.insert(flag);
        INSTALLED.set(updated);
    }
}

/// Whether `flag` is enabled on `ctx`. False for an invalid context.
#[must_use]
pub fn is_flag_enabled(ctx: &TraceContext, flag: TraceFlags) -> bool {
    ctx.is_flag_enabled(flag)
}

/// Swap the installed slot, returning the previous occupant. Used by the
/// propagation adapters to save and restore around scoped work.
pub(crate) fn replace(ctx: TraceContext) -> TraceContext {
    INSTALLED.replace(ctx)
}
