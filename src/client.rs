//! Instrumented-surface model
//!
//! The weaving engine and the Couchbase SDK sit outside this crate; this
//! module is the explicit boundary they meet the tracing core at. Instead of
//! reflective accessor probing, instrumented handles implement [`Instrumented`]
//! and override only the metadata accessors they can actually answer; an
//! accessor left at its default is "unknown", never an error.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of an enhanced instance.
///
/// Stands in for the per-instance field the weaving engine would inject:
/// cross-cutting state is keyed by this id in an explicit side-table instead
/// of being attached to the foreign object itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u64);

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

impl InstanceId {
    /// Allocate a fresh process-unique instance id
    pub fn next() -> Self {
        InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An instance the weaving engine has enhanced.
///
/// Metadata accessors default to `None`; a handle kind that cannot answer one
/// simply leaves it alone and the corresponding tag is omitted.
pub trait Instrumented {
    fn instance_id(&self) -> InstanceId;

    fn bucket_name(&self) -> Option<&str> {
        None
    }

    fn scope_name(&self) -> Option<&str> {
        None
    }

    fn collection_name(&self) -> Option<&str> {
        None
    }
}

/// Connection/environment descriptor: the one object that knows the remote
/// peer, as an ordered list of seed `host:port` entries.
#[derive(Debug, Clone, Default)]
pub struct ClusterEnvironment {
    seed_nodes: Vec<String>,
}

impl ClusterEnvironment {
    pub fn new(seed_nodes: Vec<String>) -> Self {
        ClusterEnvironment { seed_nodes }
    }

    pub fn seed_nodes(&self) -> &[String] {
        &self.seed_nodes
    }
}

/// One intercepted-call argument.
///
/// The document-identifier tag is derived from the first argument's string
/// form, so non-string arguments coerce through `Display`-style rendering and
/// `Null` yields no tag at all.
#[derive(Debug, Clone)]
pub enum CallArg {
    Null,
    Str(String),
    Int(i64),
    Doc(serde_json::Value),
}

impl CallArg {
    /// String form used for tagging, `None` for `Null`
    pub fn as_tag_value(&self) -> Option<String> {
        match self {
            CallArg::Null => None,
            CallArg::Str(s) => Some(s.clone()),
            CallArg::Int(i) => Some(i.to_string()),
            CallArg::Doc(v) => Some(v.to_string()),
        }
    }
}

/// Return value of an intercepted call, as the dispatch layer sees it
#[derive(Debug, Clone)]
pub enum CallReturn {
    /// Operation returned nothing (or the call faulted)
    None,
    /// Plain value result
    Value(CallArg),
    /// The call manufactured another enhanced instance (factory/delegate path)
    Instance(InstanceId),
}

/// Fault raised by an intercepted client operation.
///
/// Carries the message text the timeout heuristic matches against. The
/// tracing core attaches it to the span and lets it continue propagating
/// unmodified.
#[derive(Debug, Clone)]
pub struct OperationFault {
    message: String,
}

impl OperationFault {
    pub fn new(message: impl Into<String>) -> Self {
        OperationFault {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Case-insensitive "timeout" substring check on the message text
    pub fn looks_like_timeout(&self) -> bool {
        self.message.to_lowercase().contains("timeout")
    }
}

impl std::fmt::Display for OperationFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for OperationFault {}
