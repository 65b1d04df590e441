//! Span lifecycle driver
//!
//! In-memory implementation of the active-span stack the interceptors drive:
//! create-exit-span pushes, stop-span pops, active-span reads the top. The
//! agent backend that exports finished spans is a separate concern; this
//! module only owns lifecycle and tag state.

pub mod context;
pub mod span;

pub use context::{AsyncSpanHandle, TraceContext, TraceError};
pub use span::{Span, SpanId};
