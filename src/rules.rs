//! Instrumentation rule table
//!
//! The read-only table the weaving engine consults: which target classes and
//! method names get which interceptor. Matching is exact-name-set only; no
//! wildcard surface means no false-positive instrumentation. The table is
//! fixed at plugin load and safe for unsynchronized concurrent reads.

/// Whether a rule enhances constructors or instance methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptScope {
    InstanceMethods,
    Constructor,
}

/// Identity of the interceptor strategy a rule dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptorKind {
    CollectionCrud,
    AsyncCollectionCrud,
    ClientDelegate,
}

/// One immutable instrumentation rule
#[derive(Debug, Clone, Copy)]
pub struct InstrumentationRule {
    /// Fully-qualified name of the enhanced class
    pub target_class: &'static str,
    /// Exact method-name set; empty for constructor rules
    pub methods: &'static [&'static str],
    pub interceptor: InterceptorKind,
    pub scope: InterceptScope,
}

pub const COLLECTION_CLASS: &str = "com.couchbase.client.java.Collection";
pub const ASYNC_COLLECTION_CLASS: &str = "com.couchbase.client.java.AsyncCollection";
pub const CLIENT_DELEGATE_CLASS: &str = "com.couchbase.client.java.CouchbaseClientDelegate";

/// Traced CRUD operations on collection handles
pub const CRUD_METHODS: &[&str] = &["get", "upsert", "insert", "replace", "remove"];

/// Delegate factory methods whose return values receive the propagated peer
pub const DELEGATE_FACTORY_METHODS: &[&str] =
    &["bucket", "scope", "collection", "defaultCollection"];

static RULES: &[InstrumentationRule] = &[
    InstrumentationRule {
        target_class: COLLECTION_CLASS,
        methods: CRUD_METHODS,
        interceptor: InterceptorKind::CollectionCrud,
        scope: InterceptScope::InstanceMethods,
    },
    InstrumentationRule {
        target_class: ASYNC_COLLECTION_CLASS,
        methods: CRUD_METHODS,
        interceptor: InterceptorKind::AsyncCollectionCrud,
        scope: InterceptScope::InstanceMethods,
    },
    // Remote-peer propagation: the delegate is the only class with a
    // constructor point, because only its constructor sees the environment.
    InstrumentationRule {
        target_class: CLIENT_DELEGATE_CLASS,
        methods: &[],
        interceptor: InterceptorKind::ClientDelegate,
        scope: InterceptScope::Constructor,
    },
    InstrumentationRule {
        target_class: CLIENT_DELEGATE_CLASS,
        methods: DELEGATE_FACTORY_METHODS,
        interceptor: InterceptorKind::ClientDelegate,
        scope: InterceptScope::InstanceMethods,
    },
];

/// The full rule table
pub fn rules() -> &'static [InstrumentationRule] {
    RULES
}

/// Pure matching predicate for an instance-method call
pub fn rule_matches(rule: &InstrumentationRule, class: &str, method: &str) -> bool {
    rule.scope == InterceptScope::InstanceMethods
        && rule.target_class == class
        && rule.methods.iter().any(|m| *m == method)
}

/// Find the rule for an instance-method call, if any
pub fn find_method_rule(class: &str, method: &str) -> Option<&'static InstrumentationRule> {
    RULES.iter().find(|rule| rule_matches(rule, class, method))
}

/// Find the constructor rule for a class, if any
pub fn find_constructor_rule(class: &str) -> Option<&'static InstrumentationRule> {
    RULES
        .iter()
        .find(|rule| rule.scope == InterceptScope::Constructor && rule.target_class == class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crud_methods_match_on_both_collection_kinds() {
        for &method in CRUD_METHODS {
            let rule = find_method_rule(COLLECTION_CLASS, method).unwrap();
            assert_eq!(rule.interceptor, InterceptorKind::CollectionCrud);

            let rule = find_method_rule(ASYNC_COLLECTION_CLASS, method).unwrap();
            assert_eq!(rule.interceptor, InterceptorKind::AsyncCollectionCrud);
        }
    }

    #[test]
    fn test_unlisted_method_does_not_match() {
        assert!(find_method_rule(COLLECTION_CLASS, "exists").is_none());
        assert!(find_method_rule(COLLECTION_CLASS, "getAndLock").is_none());
        // Exact-name matching, no prefix or case slack
        assert!(find_method_rule(COLLECTION_CLASS, "getAllReplicas").is_none());
        assert!(find_method_rule(COLLECTION_CLASS, "Get").is_none());
    }

    #[test]
    fn test_unknown_class_does_not_match() {
        assert!(find_method_rule("com.couchbase.client.java.Cluster", "get").is_none());
    }

    #[test]
    fn test_constructor_rule_only_on_delegate() {
        assert!(find_constructor_rule(CLIENT_DELEGATE_CLASS).is_some());
        assert!(find_constructor_rule(COLLECTION_CLASS).is_none());
        assert!(find_constructor_rule(ASYNC_COLLECTION_CLASS).is_none());
    }

    #[test]
    fn test_delegate_factory_methods_match() {
        for &method in DELEGATE_FACTORY_METHODS {
            let rule = find_method_rule(CLIENT_DELEGATE_CLASS, method).unwrap();
            assert_eq!(rule.interceptor, InterceptorKind::ClientDelegate);
        }
    }
}
