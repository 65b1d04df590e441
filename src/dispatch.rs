//! Hook dispatch
//!
//! Resolves the rule table into interceptor strategies once at startup, then
//! drives the before/after/fault protocol around intercepted calls with the
//! weaving engine's guarantees: before fires first, exactly one terminal
//! after fires per call (also on the fault path), and the call's own result
//! or fault reaches the caller bit-for-bit unmodified.

use std::future::Future;
use std::sync::Arc;

use ahash::AHashMap;

use crate::client::{CallArg, CallReturn, ClusterEnvironment, Instrumented, OperationFault};
use crate::config::AgentConfig;
use crate::intercept::{
    AsyncCollectionCrudInterceptor, ClientDelegateInterceptor, CollectionCrudInterceptor,
    ConstructorInterceptor, HandleKind, InterceptedCall, MethodInterceptor,
};
use crate::propagation::PropagationStore;
use crate::rules::{self, InterceptorKind};
use crate::trace::TraceContext;

/// Interceptor strategies resolved from the rule table, built once
pub struct Registry {
    methods: AHashMap<InterceptorKind, Arc<dyn MethodInterceptor>>,
    constructors: AHashMap<InterceptorKind, Arc<dyn ConstructorInterceptor>>,
    store: Arc<PropagationStore>,
}

impl Registry {
    pub fn new(config: &AgentConfig) -> Self {
        let store = Arc::new(PropagationStore::new());
        let delegate = Arc::new(ClientDelegateInterceptor::new(store.clone()));

        let mut methods: AHashMap<InterceptorKind, Arc<dyn MethodInterceptor>> = AHashMap::new();
        methods.insert(
            InterceptorKind::CollectionCrud,
            Arc::new(CollectionCrudInterceptor::new(
                config,
                HandleKind::Collection,
                store.clone(),
            )),
        );
        methods.insert(
            InterceptorKind::AsyncCollectionCrud,
            Arc::new(AsyncCollectionCrudInterceptor::new(config, store.clone())),
        );
        methods.insert(InterceptorKind::ClientDelegate, delegate.clone());

        let mut constructors: AHashMap<InterceptorKind, Arc<dyn ConstructorInterceptor>> =
            AHashMap::new();
        constructors.insert(InterceptorKind::ClientDelegate, delegate);

        Registry {
            methods,
            constructors,
            store,
        }
    }

    /// Resolve the method interceptor for a call, if any rule matches
    pub fn method_interceptor(
        &self,
        class: &str,
        method: &str,
    ) -> Option<Arc<dyn MethodInterceptor>> {
        let rule = rules::find_method_rule(class, method)?;
        self.methods.get(&rule.interceptor).cloned()
    }

    /// Resolve the constructor interceptor for a class, if any rule matches
    pub fn constructor_interceptor(&self, class: &str) -> Option<Arc<dyn ConstructorInterceptor>> {
        let rule = rules::find_constructor_rule(class)?;
        self.constructors.get(&rule.interceptor).cloned()
    }

    /// The shared propagation side-table
    pub fn propagation_store(&self) -> Arc<PropagationStore> {
        self.store.clone()
    }
}

/// Drives interception hooks around client calls
pub struct Dispatcher {
    registry: Registry,
}

impl Dispatcher {
    pub fn new(config: &AgentConfig) -> Self {
        Dispatcher {
            registry: Registry::new(config),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Fire the constructor hook for a freshly built instance
    pub fn construct(
        &self,
        class: &str,
        instance: &dyn Instrumented,
        env: Option<&ClusterEnvironment>,
    ) {
        if let Some(interceptor) = self.registry.constructor_interceptor(class) {
            interceptor.on_construct(instance, env);
        }
    }

    /// Run a synchronous client call under interception.
    ///
    /// Unmatched calls run untraced. On fault the fault hook fires, then the
    /// after hook still closes the span, and the fault propagates unchanged.
    pub fn invoke(
        &self,
        ctx: &TraceContext,
        class: &str,
        target: &dyn Instrumented,
        operation: &str,
        args: &[CallArg],
        op: impl FnOnce() -> Result<CallReturn, OperationFault>,
    ) -> Result<CallReturn, OperationFault> {
        let Some(interceptor) = self.registry.method_interceptor(class, operation) else {
            return op();
        };
        let call = InterceptedCall {
            target,
            operation,
            args,
        };
        interceptor.before_call(ctx, &call);
        match op() {
            Ok(ret) => Ok(interceptor.after_call(ctx, &call, ret)),
            Err(fault) => {
                interceptor.on_fault(ctx, &call, &fault);
                interceptor.after_call(ctx, &call, CallReturn::None);
                Err(fault)
            }
        }
    }

    /// Run an asynchronous client call under interception.
    ///
    /// An interceptor that asked for async completion gets its synchronous
    /// after hook at initiation (the stack pop stays LIFO on the calling
    /// context) and its detached span finalized via `on_complete` when the
    /// operation's future resolves, so the span measures the full operation
    /// rather than just its initiation. Any other interceptor has its
    /// terminal hooks deferred until the future resolves, so `after_call`
    /// always sees the real return value; return-value-driven work (the
    /// delegate's copy-forward) is not lost on async factory calls.
    pub async fn invoke_async<F>(
        &self,
        ctx: &TraceContext,
        class: &str,
        target: &dyn Instrumented,
        operation: &str,
        args: &[CallArg],
        op: F,
    ) -> Result<CallReturn, OperationFault>
    where
        F: Future<Output = Result<CallReturn, OperationFault>>,
    {
        let Some(interceptor) = self.registry.method_interceptor(class, operation) else {
            return op.await;
        };
        let call = InterceptedCall {
            target,
            operation,
            args,
        };
        interceptor.before_call(ctx, &call);

        if interceptor.wants_async_completion() {
            let handle = ctx.active_span().ok().map(|span| ctx.prepare_async(&span));

            // Initiation complete from the caller's point of view
            interceptor.after_call(ctx, &call, CallReturn::None);

            let result = op.await;
            if let Some(handle) = handle {
                interceptor.on_complete(ctx, handle, result.as_ref());
            }
            result
        } else {
            match op.await {
                Ok(ret) => Ok(interceptor.after_call(ctx, &call, ret)),
                Err(fault) => {
                    interceptor.on_fault(ctx, &call, &fault);
                    interceptor.after_call(ctx, &call, CallReturn::None);
                    Err(fault)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InstanceId;
    use crate::rules::{ASYNC_COLLECTION_CLASS, CLIENT_DELEGATE_CLASS, COLLECTION_CLASS};

    struct Handle(InstanceId);
    impl Instrumented for Handle {
        fn instance_id(&self) -> InstanceId {
            self.0
        }
    }

    #[test]
    fn test_registry_resolves_each_kind_once() {
        let registry = Registry::new(&AgentConfig::default());
        assert!(registry.method_interceptor(COLLECTION_CLASS, "get").is_some());
        assert!(registry
            .method_interceptor(ASYNC_COLLECTION_CLASS, "upsert")
            .is_some());
        assert!(registry
            .method_interceptor(CLIENT_DELEGATE_CLASS, "collection")
            .is_some());
        assert!(registry.method_interceptor(COLLECTION_CLASS, "touch").is_none());
        assert!(registry.constructor_interceptor(CLIENT_DELEGATE_CLASS).is_some());
        assert!(registry.constructor_interceptor(COLLECTION_CLASS).is_none());
    }

    #[test]
    fn test_unmatched_call_runs_untraced() {
        let dispatcher = Dispatcher::new(&AgentConfig::default());
        let ctx = TraceContext::new();
        let target = Handle(InstanceId::next());

        let result = dispatcher.invoke(&ctx, COLLECTION_CLASS, &target, "exists", &[], || {
            Ok(CallReturn::Value(CallArg::Int(1)))
        });
        assert!(matches!(result, Ok(CallReturn::Value(CallArg::Int(1)))));
        assert!(ctx.finished_spans().is_empty());
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_invoke_closes_span_and_passes_result_through() {
        let dispatcher = Dispatcher::new(&AgentConfig::default());
        let ctx = TraceContext::new();
        let target = Handle(InstanceId::next());
        let args = [CallArg::Str("doc-1".into())];

        let result = dispatcher.invoke(&ctx, COLLECTION_CLASS, &target, "get", &args, || {
            Ok(CallReturn::Value(CallArg::Str("{}".into())))
        });
        assert!(matches!(result, Ok(CallReturn::Value(CallArg::Str(s))) if s == "{}"));
        assert_eq!(ctx.depth(), 0);

        let finished = ctx.finished_spans();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].name(), "Couchbase/Collection/get");
    }

    #[test]
    fn test_invoke_fault_path_closes_span_and_propagates_fault() {
        let dispatcher = Dispatcher::new(&AgentConfig::default());
        let ctx = TraceContext::new();
        let target = Handle(InstanceId::next());

        let result = dispatcher.invoke(&ctx, COLLECTION_CLASS, &target, "remove", &[], || {
            Err(OperationFault::new("connection timeout"))
        });
        let fault = result.unwrap_err();
        assert_eq!(fault.message(), "connection timeout");

        let finished = ctx.finished_spans();
        assert_eq!(finished.len(), 1);
        assert!(finished[0].is_errored());
        assert_eq!(ctx.depth(), 0);
    }
}
