//! Carrying a chain across threads and await points.
//!
//! The installed context is thread-scoped, so handing work to another thread
//! or task drops the chain unless it is carried explicitly. [`capture`] takes
//! a snapshot fit for hand-off, [`scoped`] runs a closure under a context,
//! and [`WithChain`] installs a context around every poll of a future so the
//! chain survives executor thread hopping.

use crate::chain;
use crate::context::{TraceContext, TraceFlags};
use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Snapshot the installed context for hand-off to other work.
///
/// Returns `None` unless a valid chain is installed with
/// [`TraceFlags::INCLUDE_ASYNC`] enabled; chains that did not opt in stay
/// confined to their thread.
#[must_use]
pub fn capture() -> Option<TraceContext> {
    let current = chain::current();
    (current.is_valid() && current.flags.contains(TraceFlags::INCLUDE_ASYNC)).then_some(current)
}

/// Run `f` with `ctx` installed, restoring the previous slot afterward.
///
/// An invalid `ctx` runs `f` without touching the slot.
pub fn scoped<T>(ctx: &TraceContext, f: impl FnOnce() -> T) -> T {
    if !ctx.is_valid() {
        return f();
    }
    let _guard = SlotGuard {
        prior: chain::replace(*ctx),
    };
    f()
}

struct SlotGuard {
    prior: TraceContext,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        chain::replace(self.prior);
    }
}

/// A future that carries a chain context across polls.
///
/// Created by [`ChainFutureExt::with_chain`] or
/// [`ChainFutureExt::with_current_chain`]. Before each poll the carried
/// context is installed; afterwards the poll-time slot (including any spans
/// the inner future derived, or an `end`) is captured back into the carrier
/// and the thread's previous context is restored.
#[pin_project]
#[derive(Debug)]
pub struct WithChain<F> {
    #[pin]
    inner: F,
    ctx: TraceContext,
}

impl<F: Future> Future for WithChain<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<F::Output> {
        let this = self.project();
        if !this.ctx.is_valid() {
            return this.inner.poll(cx);
        }
        let prior = chain::replace(*this.ctx);
        let out = this.inner.poll(cx);
        *this.ctx = chain::replace(prior);
        out
    }
}

/// Extension methods for attaching a chain to a future.
pub trait ChainFutureExt: Future + Sized {
    /// Install `ctx` around every poll of this future.
    fn with_chain(self, ctx: TraceContext) -> WithChain<Self> {
        WithChain { inner: self, ctx }
    }

    /// Carry the currently captured chain, if any; see [`capture`].
    fn with_current_chain(self) -> WithChain<Self> {
        self.with_chain(capture().unwrap_or(TraceContext::INVALID))
    }
}

impl<F: Future> ChainFutureExt for F {}
