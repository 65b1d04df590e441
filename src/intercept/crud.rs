//! CRUD operation interceptors
//!
//! Wrap a single data operation on a collection-like handle in an exit span.
//! The sync variant closes the span when the call returns. The async variant
//! would otherwise measure only initiation time, so it detaches the span and
//! closes it when the operation's future actually completes, with the same
//! tagging contract.

use std::sync::Arc;

use crate::client::{CallReturn, OperationFault};
use crate::config::AgentConfig;
use crate::helper::{
    tag_bucket_name, tag_collection_info, tag_peer_address, tag_result_status, tag_scope_name,
    tag_sdk_version, tags,
};
use crate::intercept::{InterceptedCall, MethodInterceptor};
use crate::propagation::PropagationStore;
use crate::sanitize::truncate;
use crate::trace::{AsyncSpanHandle, Span, TraceContext};

/// Which instrumented handle kind a CRUD interceptor is attached to;
/// the middle segment of the span name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Collection,
    AsyncCollection,
}

impl HandleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleKind::Collection => "Collection",
            HandleKind::AsyncCollection => "AsyncCollection",
        }
    }
}

/// Interceptor for synchronous collection CRUD operations
pub struct CollectionCrudInterceptor {
    component: String,
    sdk_version: String,
    handle_kind: HandleKind,
    store: Arc<PropagationStore>,
}

impl CollectionCrudInterceptor {
    pub fn new(config: &AgentConfig, handle_kind: HandleKind, store: Arc<PropagationStore>) -> Self {
        CollectionCrudInterceptor {
            component: config.component.clone(),
            sdk_version: config.sdk_version.clone(),
            handle_kind,
            store,
        }
    }

    /// Create the exit span and apply the entry tag set
    fn open_span(&self, ctx: &TraceContext, call: &InterceptedCall<'_>) -> Span {
        let name = format!(
            "{}/{}/{}",
            self.component,
            self.handle_kind.as_str(),
            call.operation
        );
        let peer = self
            .store
            .get(call.target.instance_id())
            .filter(|p| !p.is_empty());

        let span = ctx.create_exit_span(&name, peer.as_deref());
        span.tag(tags::COMPONENT, &self.component);
        span.tag(tags::SPAN_LAYER, tags::LAYER_DB);
        span.tag(tags::DB_TYPE, tags::DB_TYPE_COUCHBASE);
        span.tag(tags::DB_OPERATION, call.operation);

        // First argument, when present and non-null, is the document id
        if let Some(doc_id) = call.args.first().and_then(|arg| arg.as_tag_value()) {
            span.tag(tags::DB_DOCUMENT_ID, &truncate(&doc_id));
        }

        tag_collection_info(&span, call.target);
        tag_bucket_name(&span, call.target.bucket_name());
        tag_scope_name(&span, call.target.scope_name());
        tag_sdk_version(&span, Some(&self.sdk_version));
        tag_peer_address(&span, peer.as_deref());
        span
    }

    /// Fault tagging shared by the sync fault hook and async completion:
    /// error flag, logged fault, and the timeout marker when the message
    /// text says so.
    fn apply_fault(span: &Span, fault: &OperationFault) {
        span.mark_errored();
        span.log_fault(fault);
        if fault.looks_like_timeout() {
            span.tag(tags::DB_TIMEOUT, "true");
        }
    }
}

impl MethodInterceptor for CollectionCrudInterceptor {
    fn before_call(&self, ctx: &TraceContext, call: &InterceptedCall<'_>) {
        self.open_span(ctx, call);
    }

    fn after_call(
        &self,
        ctx: &TraceContext,
        _call: &InterceptedCall<'_>,
        ret: CallReturn,
    ) -> CallReturn {
        if let Err(e) = ctx.stop_span() {
            // Tracing is additive: a lifecycle bug must not leak to the caller
            tracing::warn!(error = %e, "stop on empty span stack");
        }
        ret
    }

    fn on_fault(&self, ctx: &TraceContext, _call: &InterceptedCall<'_>, fault: &OperationFault) {
        match ctx.active_span() {
            Ok(span) => Self::apply_fault(&span, fault),
            Err(e) => tracing::warn!(error = %e, "fault with no active span"),
        }
    }
}

/// Interceptor for async collection CRUD operations: identical tagging, but
/// completion-based span closure.
pub struct AsyncCollectionCrudInterceptor {
    inner: CollectionCrudInterceptor,
}

impl AsyncCollectionCrudInterceptor {
    pub fn new(config: &AgentConfig, store: Arc<PropagationStore>) -> Self {
        AsyncCollectionCrudInterceptor {
            inner: CollectionCrudInterceptor::new(config, HandleKind::AsyncCollection, store),
        }
    }
}

impl MethodInterceptor for AsyncCollectionCrudInterceptor {
    fn before_call(&self, ctx: &TraceContext, call: &InterceptedCall<'_>) {
        self.inner.open_span(ctx, call);
    }

    fn after_call(
        &self,
        ctx: &TraceContext,
        call: &InterceptedCall<'_>,
        ret: CallReturn,
    ) -> CallReturn {
        // Pops the stack (LIFO discipline is synchronous); finalization is
        // deferred because the span was detached for async completion.
        self.inner.after_call(ctx, call, ret)
    }

    fn on_fault(&self, ctx: &TraceContext, call: &InterceptedCall<'_>, fault: &OperationFault) {
        // Initiation itself faulted; the future never existed
        self.inner.on_fault(ctx, call, fault);
    }

    fn wants_async_completion(&self) -> bool {
        true
    }

    fn on_complete(
        &self,
        _ctx: &TraceContext,
        handle: AsyncSpanHandle,
        outcome: Result<&CallReturn, &OperationFault>,
    ) {
        match outcome {
            Ok(_) => tag_result_status(handle.span(), Some("success")),
            Err(fault) => CollectionCrudInterceptor::apply_fault(handle.span(), fault),
        }
        handle.finish();
    }
}
