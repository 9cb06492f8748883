//! Runtime type definitions for request/response bridging and cache records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// GraphQL-over-HTTP request payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLPayload {
    /// Operation document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Variable values keyed by name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    /// Operation to run when the document holds several
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    /// Protocol extensions (e.g. `persistedQuery`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLPayload {
    /// Create a payload holding only a query document
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Returns the query text if present and non-blank
    pub fn query_text(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }

    /// Extract the `persistedQuery` extension, if any
    pub fn persisted_query(&self) -> Result<Option<PersistedQuery>, String> {
        let Some(extension) = self
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("persistedQuery"))
        else {
            return Ok(None);
        };

        serde_json::from_value(extension.clone())
            .map(Some)
            .map_err(|e| format!("Invalid persistedQuery extension: {}", e))
    }
}

/// Automatic persisted query reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedQuery {
    /// Protocol version (only 1 is defined)
    pub version: u32,
    /// Hex-encoded SHA-256 of the query text
    pub sha256_hash: String,
}

/// Transport-level request handed to the engine, one per HTTP call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgedRequest {
    /// Correlation id for logs
    pub id: Uuid,
    /// HTTP method (upper case)
    pub method: String,
    /// URL path
    pub path: String,
    /// Query-string portion of the URL including the leading `?`, or empty
    pub search: String,
    /// Header names (lower case) to values; repeated headers are joined with `, `
    pub headers: BTreeMap<String, String>,
    /// Parsed request body
    pub body: GraphQLPayload,
}

impl BridgedRequest {
    /// Create a request with a fresh correlation id
    pub fn new(method: impl Into<String>, path: impl Into<String>, body: GraphQLPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: method.into().to_uppercase(),
            path: path.into(),
            search: String::new(),
            headers: BTreeMap::new(),
            body,
        }
    }

    /// Set the query-string portion
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Add a header, joining repeated names
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.append_header(name, value);
        self
    }

    /// Append a header value, joining repeated names
    pub fn append_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.headers
            .entry(name.to_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Returns true for GET requests
    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// Engine response body envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// Entire JSON result as one string
    Complete(String),
}

impl ResponseBody {
    /// Borrow the payload
    pub fn as_str(&self) -> &str {
        match self {
            ResponseBody::Complete(body) => body,
        }
    }

    /// Unwrap the payload
    pub fn into_string(self) -> String {
        match self {
            ResponseBody::Complete(body) => body,
        }
    }
}

/// Engine result ready to be written back over HTTP
#[derive(Debug, Clone)]
pub struct BridgedResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers in insertion order
    pub headers: Vec<(String, String)>,
    /// Serialized result
    pub body: ResponseBody,
}

impl BridgedResponse {
    /// Create a JSON response with the given status
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![(
                "content-type".to_string(),
                "application/json; charset=utf-8".to_string(),
            )],
            body: ResponseBody::Complete(body.into()),
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up the first header with the given name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Record shape understood by the cache stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Cache key
    pub id: String,
    /// Cached value
    pub query: String,
}

impl CacheRecord {
    /// Create a record
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
        }
    }
}

/// Per-write context passed to a store alongside a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteContext {
    /// Absolute expiration, epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Store-specific state carried with the write
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WriteContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expiration instant
    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Attach a store-specific value
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns true if the context expires at or before `now_ms`
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_deserialize() {
        let payload: GraphQLPayload = serde_json::from_value(json!({
            "query": "query Q($id: ID!) { book(id: $id) { title } }",
            "variables": {"id": "1"},
            "operationName": "Q"
        }))
        .unwrap();
        assert_eq!(payload.operation_name.as_deref(), Some("Q"));
        assert_eq!(payload.variables, Some(json!({"id": "1"})));
        assert!(payload.persisted_query().unwrap().is_none());
    }

    #[test]
    fn test_payload_blank_query() {
        assert!(GraphQLPayload::query("   ").query_text().is_none());
        assert_eq!(GraphQLPayload::query("{ a }").query_text(), Some("{ a }"));
    }

    #[test]
    fn test_persisted_query_extension() {
        let payload = GraphQLPayload {
            extensions: Some(json!({
                "persistedQuery": {"version": 1, "sha256Hash": "abc"}
            })),
            ..GraphQLPayload::default()
        };
        let pq = payload.persisted_query().unwrap().unwrap();
        assert_eq!(pq.version, 1);
        assert_eq!(pq.sha256_hash, "abc");

        let broken = GraphQLPayload {
            extensions: Some(json!({"persistedQuery": {"version": "one"}})),
            ..GraphQLPayload::default()
        };
        assert!(broken.persisted_query().is_err());
    }

    #[test]
    fn test_bridged_request_headers() {
        let request = BridgedRequest::new("post", "/graphql", GraphQLPayload::query("{ a }"))
            .with_header("Accept", "application/json")
            .with_header("X-Forwarded-For", "10.0.0.1")
            .with_header("x-forwarded-for", "10.0.0.2");
        assert_eq!(request.method, "POST");
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.header("X-FORWARDED-FOR"), Some("10.0.0.1, 10.0.0.2"));
        assert!(request.header("authorization").is_none());
    }

    #[test]
    fn test_response_body_envelope() {
        let response = BridgedResponse::json(200, "{\"data\":null}").with_header("x-a", "b");
        assert_eq!(response.header("Content-Type"), Some("application/json; charset=utf-8"));
        assert_eq!(response.header("x-a"), Some("b"));
        assert_eq!(response.body.into_string(), "{\"data\":null}");
    }

    #[test]
    fn test_write_context_serde() {
        let ctx = WriteContext::new()
            .with("audit", json!(true))
            .with_expires_at(1_700_000_000_000);
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value, json!({"expiresAt": 1_700_000_000_000i64, "audit": true}));

        let parsed: WriteContext = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, ctx);
        assert!(parsed.is_expired_at(1_700_000_000_000));
        assert!(!parsed.is_expired_at(1_699_999_999_999));
        assert!(!WriteContext::new().is_expired_at(i64::MAX));
    }

    #[test]
    fn test_cache_record_shape() {
        let record = CacheRecord::new("apq:abc", "{ a }");
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"id": "apq:abc", "query": "{ a }"})
        );
    }
}
