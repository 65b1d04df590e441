//! Active-span stack
//!
//! One `TraceContext` carries the span stack for one logical execution
//! context. The handle is a cheap clone, so the host can move it across
//! whatever context-propagation carrier it uses (thread-local, task-local,
//! or an explicit argument) without this crate caring which.
//!
//! Stack discipline is strict LIFO: nested spans must stop in reverse
//! creation order. For asynchronous operations, `prepare_async` splits the
//! stack pop (still synchronous, preserving LIFO) from span finalization
//! (deferred to the completion path, from any thread).

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::span::{Span, SpanId};

/// Error type for span stack operations
#[derive(Debug)]
pub enum TraceError {
    /// An operation required an active span and the stack was empty
    NoActiveSpan,
}

impl std::fmt::Display for TraceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceError::NoActiveSpan => write!(f, "no active span in this trace context"),
        }
    }
}

impl std::error::Error for TraceError {}

/// Per-logical-execution-context span stack and completion record
#[derive(Clone, Default)]
pub struct TraceContext {
    inner: Arc<ContextInner>,
}

#[derive(Default)]
struct ContextInner {
    stack: Mutex<Vec<Span>>,
    finished: Mutex<Vec<Span>>,
    next_id: AtomicU64,
}

impl TraceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an exit span and push it as the new active span.
    ///
    /// The span represents an outbound call to an external system; `peer` is
    /// the remote address when known, `None` otherwise.
    pub fn create_exit_span(&self, name: &str, peer: Option<&str>) -> Span {
        let id = SpanId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let span = Span::new(id, name, peer);
        self.inner.stack.lock().push(span.clone());
        span
    }

    /// Pop and finalize the active span.
    ///
    /// A span prepared for async completion is popped here (keeping LIFO
    /// order on the stack) but finalized later by its [`AsyncSpanHandle`].
    pub fn stop_span(&self) -> Result<Span, TraceError> {
        let span = self
            .inner
            .stack
            .lock()
            .pop()
            .ok_or(TraceError::NoActiveSpan)?;
        if !span.is_async_prepared() {
            self.record_finished(&span);
        }
        Ok(span)
    }

    /// The currently active span (top of stack)
    pub fn active_span(&self) -> Result<Span, TraceError> {
        self.inner
            .stack
            .lock()
            .last()
            .cloned()
            .ok_or(TraceError::NoActiveSpan)
    }

    /// Detach finalization of `span` from its synchronous stack pop.
    ///
    /// The returned handle finalizes the span exactly once, from any thread,
    /// when the underlying operation actually completes.
    pub fn prepare_async(&self, span: &Span) -> AsyncSpanHandle {
        span.set_async_prepared();
        AsyncSpanHandle {
            span: span.clone(),
            ctx: self.clone(),
            completed: false,
        }
    }

    /// Current stack depth
    pub fn depth(&self) -> usize {
        self.inner.stack.lock().len()
    }

    /// Spans in finalization order (oldest first)
    pub fn finished_spans(&self) -> Vec<Span> {
        self.inner.finished.lock().clone()
    }

    fn record_finished(&self, span: &Span) {
        // finish() is the exactly-once gate; a second terminal event on the
        // same span is ignored rather than double-recorded.
        if span.finish() {
            self.inner.finished.lock().push(span.clone());
        } else {
            tracing::debug!(span = span.name(), "span already finalized, ignoring");
        }
    }
}

/// Deferred-finalization handle for an asynchronous span
pub struct AsyncSpanHandle {
    span: Span,
    ctx: TraceContext,
    completed: bool,
}

impl AsyncSpanHandle {
    /// The span this handle will finalize
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Finalize the span. Consumes the handle; a span finalizes once.
    pub fn finish(mut self) {
        self.completed = true;
        self.ctx.record_finished(&self.span);
    }
}

impl Drop for AsyncSpanHandle {
    /// A handle dropped without `finish` still finalizes its span. This is
    /// the cancellation path: the completion future was dropped before the
    /// operation resolved, and an unfinalized span would otherwise dangle
    /// in the stopped-but-never-finished state forever.
    fn drop(&mut self) {
        if !self.completed {
            tracing::debug!(
                span = self.span.name(),
                "async span handle dropped before completion, finalizing"
            );
            self.ctx.record_finished(&self.span);
        }
    }
}
