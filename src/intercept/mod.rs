//! Interceptor protocol
//!
//! The weaving engine fires `before_call`, then exactly one of the terminal
//! hooks per matched call: `after_call` on the success path (and, per the
//! engine's exception contract, after `on_fault` on the fault path). Hook
//! implementations must never alter call semantics: `after_call` returns the
//! original value, faults keep propagating unmodified.

pub mod crud;
pub mod delegate;

pub use crud::{AsyncCollectionCrudInterceptor, CollectionCrudInterceptor, HandleKind};
pub use delegate::ClientDelegateInterceptor;

use crate::client::{CallArg, CallReturn, ClusterEnvironment, Instrumented, OperationFault};
use crate::trace::{AsyncSpanHandle, TraceContext};

/// Ephemeral record of one intercepted invocation. Lives only for the
/// duration of one before/after(/fault) triple.
pub struct InterceptedCall<'a> {
    pub target: &'a dyn Instrumented,
    pub operation: &'a str,
    pub args: &'a [CallArg],
}

/// Before/after/fault hooks around a matched instance method
pub trait MethodInterceptor: Send + Sync {
    fn before_call(&self, ctx: &TraceContext, call: &InterceptedCall<'_>);

    /// Terminal hook on the success path. Must pass `ret` through unmodified.
    fn after_call(
        &self,
        ctx: &TraceContext,
        call: &InterceptedCall<'_>,
        ret: CallReturn,
    ) -> CallReturn;

    fn on_fault(&self, ctx: &TraceContext, call: &InterceptedCall<'_>, fault: &OperationFault);

    /// Whether span finalization should wait for the operation's future.
    ///
    /// When true, the dispatch layer detaches the span before `after_call`
    /// pops the stack and hands the detached span to [`on_complete`] once the
    /// underlying operation resolves.
    ///
    /// [`on_complete`]: MethodInterceptor::on_complete
    fn wants_async_completion(&self) -> bool {
        false
    }

    /// Completion hook for asynchronous operations: applies outcome tagging
    /// and finalizes the detached span.
    fn on_complete(
        &self,
        _ctx: &TraceContext,
        handle: AsyncSpanHandle,
        _outcome: Result<&CallReturn, &OperationFault>,
    ) {
        handle.finish();
    }
}

/// Constructor hook for the delegate/factory class
pub trait ConstructorInterceptor: Send + Sync {
    /// Invoked right after a matched constructor ran; `env` is the first
    /// constructor argument interpreted as the connection environment.
    fn on_construct(&self, instance: &dyn Instrumented, env: Option<&ClusterEnvironment>);
}
