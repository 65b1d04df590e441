//! Delegate-construction interceptor
//!
//! The client delegate is constructed with the connection environment (the
//! only object that knows the seed nodes) and later manufactures the handles
//! CRUD interceptors attach to. This interceptor resolves the remote peer at
//! construction and copies it forward to every enhanced instance a delegate
//! method returns, so peer knowledge flows through arbitrary-depth factory
//! chains without any handle knowing the topology.

use std::sync::Arc;

use crate::client::{CallReturn, ClusterEnvironment, Instrumented, OperationFault};
use crate::intercept::{ConstructorInterceptor, InterceptedCall, MethodInterceptor};
use crate::propagation::{resolve_remote_peer, PropagationStore, UNKNOWN_PEER};
use crate::trace::TraceContext;

pub struct ClientDelegateInterceptor {
    store: Arc<PropagationStore>,
}

impl ClientDelegateInterceptor {
    pub fn new(store: Arc<PropagationStore>) -> Self {
        ClientDelegateInterceptor { store }
    }
}

impl ConstructorInterceptor for ClientDelegateInterceptor {
    fn on_construct(&self, instance: &dyn Instrumented, env: Option<&ClusterEnvironment>) {
        let remote_peer = match env {
            Some(env) => resolve_remote_peer(env),
            None => UNKNOWN_PEER.to_string(),
        };
        self.store.attach(instance.instance_id(), &remote_peer);
    }
}

impl MethodInterceptor for ClientDelegateInterceptor {
    fn before_call(&self, _ctx: &TraceContext, _call: &InterceptedCall<'_>) {}

    fn after_call(
        &self,
        _ctx: &TraceContext,
        call: &InterceptedCall<'_>,
        ret: CallReturn,
    ) -> CallReturn {
        if let CallReturn::Instance(downstream) = ret {
            let from = call.target.instance_id();
            tracing::debug!(
                remote_peer = ?self.store.get(from),
                ?downstream,
                "copying remote peer to manufactured instance"
            );
            self.store.copy_forward(from, downstream);
        }
        ret
    }

    fn on_fault(&self, _ctx: &TraceContext, _call: &InterceptedCall<'_>, _fault: &OperationFault) {}
}
