//! Span handle
//!
//! A span is the unit of traced work: a name, a string tag map, an error
//! flag, and a log of attached faults. Handles are cheap clones of shared
//! state so an async completion path can keep tagging a span after the
//! synchronous call path has already returned.

use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::helper::tags;

/// Creation-ordered span identity within one trace context
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanId(pub u64);

/// Shared handle to one traced operation
#[derive(Clone)]
pub struct Span {
    inner: Arc<SpanInner>,
}

struct SpanInner {
    id: SpanId,
    name: String,
    peer: Option<String>,
    tags: Mutex<AHashMap<String, String>>,
    faults: Mutex<Vec<String>>,
    errored: AtomicBool,
    finished: AtomicBool,
    async_prepared: AtomicBool,
}

impl Span {
    pub(crate) fn new(id: SpanId, name: &str, peer: Option<&str>) -> Self {
        Span {
            inner: Arc::new(SpanInner {
                id,
                name: name.to_string(),
                peer: peer.map(|p| p.to_string()),
                tags: Mutex::new(AHashMap::new()),
                faults: Mutex::new(Vec::new()),
                errored: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                async_prepared: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> SpanId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Remote peer this exit span targets, if known at creation
    pub fn peer(&self) -> Option<&str> {
        self.inner.peer.as_deref()
    }

    /// Attach a tag. Keys are unique; a second write to the same key wins.
    pub fn tag(&self, key: &str, value: &str) {
        self.inner
            .tags
            .lock()
            .insert(key.to_string(), value.to_string());
    }

    /// Read back a tag value (test and export surface)
    pub fn tag_value(&self, key: &str) -> Option<String> {
        self.inner.tags.lock().get(key).cloned()
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.inner.tags.lock().contains_key(key)
    }

    /// Snapshot of all tags in arbitrary order
    pub fn tags(&self) -> Vec<(String, String)> {
        self.inner
            .tags
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Attach a fault for later export. Does not flip the error flag.
    pub fn log_fault(&self, fault: &dyn std::error::Error) {
        self.inner.faults.lock().push(fault.to_string());
    }

    /// Logged fault messages, in attachment order
    pub fn faults(&self) -> Vec<String> {
        self.inner.faults.lock().clone()
    }

    /// Flip the error flag and write the error tag
    pub fn mark_errored(&self) {
        self.inner.errored.store(true, Ordering::SeqCst);
        self.tag(tags::ERROR, "true");
    }

    pub fn is_errored(&self) -> bool {
        self.inner.errored.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::SeqCst)
    }

    /// Mark finished. Returns false if the span was already finished, so the
    /// caller can enforce exactly-one-terminal-event.
    pub(crate) fn finish(&self) -> bool {
        !self.inner.finished.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn set_async_prepared(&self) {
        self.inner.async_prepared.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_async_prepared(&self) -> bool {
        self.inner.async_prepared.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("peer", &self.inner.peer)
            .field("errored", &self.is_errored())
            .field("finished", &self.is_finished())
            .finish()
    }
}
