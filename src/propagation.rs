//! Remote-peer resolution and cross-instance context propagation
//!
//! The remote address is knowable only where the connection environment is
//! constructed, but must be visible at interceptors attached to handles
//! manufactured later, deeper in the client's object graph. The store below is
//! an explicit side-table keyed by instance identity, replacing the hidden
//! per-instance field a weaving engine would inject: one write at
//! construction, then one value copy per factory hop.

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;

use crate::client::{ClusterEnvironment, InstanceId};

/// Marker stored when resolution could not determine an address.
///
/// Resolution failure degrades to this instead of erroring: tracing must
/// never block construction of a client instance.
pub const UNKNOWN_PEER: &str = "";

/// Resolve the canonical remote-peer string from a connection environment.
///
/// Seed entries are kept in first-seen order, deduplicated, and joined with
/// commas. Blank entries are dropped.
pub fn resolve_remote_peer(env: &ClusterEnvironment) -> String {
    let mut seen: AHashSet<&str> = AHashSet::new();
    let mut ordered: Vec<&str> = Vec::new();
    for node in env.seed_nodes() {
        let node = node.trim();
        if node.is_empty() {
            continue;
        }
        if seen.insert(node) {
            ordered.push(node);
        }
    }
    if ordered.is_empty() {
        tracing::debug!("no seed nodes in environment, remote peer unknown");
        return UNKNOWN_PEER.to_string();
    }
    ordered.join(",")
}

/// Side-table carrying the propagated context value per enhanced instance
#[derive(Default)]
pub struct PropagationStore {
    slots: RwLock<AHashMap<InstanceId, String>>,
}

impl PropagationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the context value for a freshly constructed instance.
    ///
    /// Write-once: a slot that already holds a value keeps it. The
    /// authoritative write happens at construction; anything later is a
    /// downstream copy, not a rewrite.
    pub fn attach(&self, id: InstanceId, value: &str) {
        self.slots
            .write()
            .entry(id)
            .or_insert_with(|| value.to_string());
    }

    /// Copy the source instance's value forward to a newly manufactured
    /// instance. Value propagation: the target gets its own duplicate, so a
    /// later overwrite upstream never changes it.
    pub fn copy_forward(&self, from: InstanceId, to: InstanceId) {
        let value = self.slots.read().get(&from).cloned();
        if let Some(value) = value {
            self.attach(to, &value);
        }
    }

    /// Read the context value for an instance
    pub fn get(&self, id: InstanceId) -> Option<String> {
        self.slots.read().get(&id).cloned()
    }

    /// Drop the slot for a torn-down instance, returning its value.
    ///
    /// The slot lives in a side-table rather than on the instance itself, so
    /// hosts must release it at instance teardown or the table grows for the
    /// process lifetime. Downstream copies are independent values and remain
    /// valid after their source is detached.
    pub fn detach(&self, id: InstanceId) -> Option<String> {
        self.slots.write().remove(&id)
    }

    /// Test hook for simulating an upstream mutation
    #[cfg(test)]
    pub(crate) fn overwrite(&self, id: InstanceId, value: &str) {
        self.slots.write().insert(id, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_joins_ordered() {
        let env = ClusterEnvironment::new(vec![
            "10.0.0.1:11210".into(),
            "10.0.0.2:11210".into(),
            "10.0.0.3:11210".into(),
        ]);
        assert_eq!(
            resolve_remote_peer(&env),
            "10.0.0.1:11210,10.0.0.2:11210,10.0.0.3:11210"
        );
    }

    #[test]
    fn test_resolve_dedupes_preserving_first_seen_order() {
        let env = ClusterEnvironment::new(vec![
            "10.0.0.2:11210".into(),
            "10.0.0.1:11210".into(),
            "10.0.0.2:11210".into(),
        ]);
        assert_eq!(resolve_remote_peer(&env), "10.0.0.2:11210,10.0.0.1:11210");
    }

    #[test]
    fn test_resolve_degrades_to_unknown_marker() {
        assert_eq!(resolve_remote_peer(&ClusterEnvironment::default()), UNKNOWN_PEER);
        let blanks = ClusterEnvironment::new(vec!["".into(), "   ".into()]);
        assert_eq!(resolve_remote_peer(&blanks), UNKNOWN_PEER);
    }

    #[test]
    fn test_attach_is_write_once() {
        let store = PropagationStore::new();
        let id = InstanceId::next();
        store.attach(id, "10.0.0.1:11210");
        store.attach(id, "10.9.9.9:11210");
        assert_eq!(store.get(id).as_deref(), Some("10.0.0.1:11210"));
    }

    #[test]
    fn test_copy_forward_duplicates_value() {
        let store = PropagationStore::new();
        let upstream = InstanceId::next();
        let downstream = InstanceId::next();

        store.attach(upstream, "10.0.0.1:11210");
        store.copy_forward(upstream, downstream);
        assert_eq!(store.get(downstream).as_deref(), Some("10.0.0.1:11210"));

        // Upstream mutation must not change the already-copied value
        store.overwrite(upstream, "10.9.9.9:11210");
        assert_eq!(store.get(downstream).as_deref(), Some("10.0.0.1:11210"));
    }

    #[test]
    fn test_detach_releases_slot() {
        let store = PropagationStore::new();
        let id = InstanceId::next();
        store.attach(id, "10.0.0.1:11210");

        assert_eq!(store.detach(id).as_deref(), Some("10.0.0.1:11210"));
        assert!(store.get(id).is_none());
        assert!(store.detach(id).is_none());

        // A detached slot may be attached again (id reuse by the host)
        store.attach(id, "10.0.0.2:11210");
        assert_eq!(store.get(id).as_deref(), Some("10.0.0.2:11210"));
    }

    #[test]
    fn test_detaching_source_keeps_downstream_copy() {
        let store = PropagationStore::new();
        let upstream = InstanceId::next();
        let downstream = InstanceId::next();

        store.attach(upstream, "10.0.0.1:11210");
        store.copy_forward(upstream, downstream);
        store.detach(upstream);

        assert_eq!(store.get(downstream).as_deref(), Some("10.0.0.1:11210"));
    }

    #[test]
    fn test_copy_forward_without_source_is_noop() {
        let store = PropagationStore::new();
        let downstream = InstanceId::next();
        store.copy_forward(InstanceId::next(), downstream);
        assert!(store.get(downstream).is_none());
    }
}
