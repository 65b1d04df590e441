//! Stateless span tagging helpers
//!
//! Translate domain facts (bucket name, query text, result status) into span
//! tags. Every helper is a no-op on empty/absent input: missing optional
//! metadata means the tag is omitted, not that tagging fails.

use crate::client::Instrumented;
use crate::sanitize::{non_empty, truncate};
use crate::trace::Span;

/// Span tag keys and well-known values
pub mod tags {
    pub const COMPONENT: &str = "component";
    pub const SPAN_LAYER: &str = "span.layer";
    pub const DB_TYPE: &str = "db.type";
    pub const DB_OPERATION: &str = "db.operation";
    pub const DB_STATEMENT: &str = "db.statement";
    pub const DB_DOCUMENT_ID: &str = "db.document.id";
    pub const DB_BUCKET: &str = "db.bucket";
    pub const DB_SCOPE: &str = "db.scope";
    pub const DB_COLLECTION: &str = "db.collection";
    pub const DB_RESULT_STATUS: &str = "db.result.status";
    pub const DB_TIMEOUT: &str = "db.timeout";
    pub const SDK_VERSION: &str = "couchbase.sdk.version";
    pub const PEER_ADDRESS: &str = "peer.address";
    pub const ERROR: &str = "error";

    pub const LAYER_DB: &str = "db";
    pub const DB_TYPE_COUCHBASE: &str = "couchbase";
    pub const DB_TYPE_ANALYTICS: &str = "couchbase-analytics";
    pub const DB_TYPE_SEARCH: &str = "couchbase-search";
}

pub fn tag_bucket_name(span: &Span, bucket_name: Option<&str>) {
    if let Some(name) = non_empty(bucket_name) {
        span.tag(tags::DB_BUCKET, name);
    }
}

pub fn tag_scope_name(span: &Span, scope_name: Option<&str>) {
    if let Some(name) = non_empty(scope_name) {
        span.tag(tags::DB_SCOPE, name);
    }
}

pub fn tag_sdk_version(span: &Span, sdk_version: Option<&str>) {
    if let Some(version) = non_empty(sdk_version) {
        span.tag(tags::SDK_VERSION, version);
    }
}

pub fn tag_result_status(span: &Span, status: Option<&str>) {
    if let Some(status) = non_empty(status) {
        span.tag(tags::DB_RESULT_STATUS, status);
    }
}

/// Analytics query: db-type marker plus the truncated statement
pub fn tag_analytics_query_info(span: &Span, statement: &str) {
    span.tag(tags::DB_TYPE, tags::DB_TYPE_ANALYTICS);
    span.tag(tags::DB_STATEMENT, &truncate(statement));
}

/// Search query: db-type marker plus the truncated statement
pub fn tag_search_query_info(span: &Span, statement: &str) {
    span.tag(tags::DB_TYPE, tags::DB_TYPE_SEARCH);
    span.tag(tags::DB_STATEMENT, &truncate(statement));
}

/// Tag collection identity from a collection-like handle.
///
/// Only the collection name is taken here; the SDK does not let a collection
/// handle answer for its scope, so scope must be tagged from its own source.
pub fn tag_collection_info(span: &Span, handle: &dyn Instrumented) {
    if let Some(name) = non_empty(handle.collection_name()) {
        span.tag(tags::DB_COLLECTION, name);
    }
}

/// Tag the remote peer address when it resolved to something non-empty
pub fn tag_peer_address(span: &Span, peer: Option<&str>) {
    if let Some(peer) = non_empty(peer) {
        span.tag(tags::PEER_ADDRESS, peer);
    }
}
