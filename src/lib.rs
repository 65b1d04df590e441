//! Couchbase client tracing core
//!
//! Interception and span-lifecycle engine for a Couchbase-client
//! observability agent: decides which client operations are traced, drives
//! the before/after/fault span protocol around them, and propagates the
//! remote peer address from the connection environment to handles
//! manufactured deeper in the client's object graph.
//!
//! The bytecode weaving engine and the span exporter are external
//! collaborators; this crate owns everything between them.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod helper;
pub mod intercept;
pub mod logging;
pub mod propagation;
pub mod rules;
pub mod sanitize;
pub mod trace;

pub use client::{CallArg, CallReturn, ClusterEnvironment, InstanceId, Instrumented, OperationFault};
pub use config::AgentConfig;
pub use dispatch::{Dispatcher, Registry};
pub use trace::{Span, TraceContext, TraceError};
