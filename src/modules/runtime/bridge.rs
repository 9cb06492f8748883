//! HTTP bridge between the host chain and the GraphQL service

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Query, Request};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use loomql_core::LoomError;
use loomql_types::{BridgedRequest, BridgedResponse, GraphQLPayload};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};

use crate::chain::Interceptor;
use crate::service::ServiceInstance;

/// Seconds clients are told to wait while the service is starting
const RETRY_AFTER_SECS: &str = "1";

/// Query-string form of a GraphQL request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetParams {
    query: Option<String>,
    variables: Option<String>,
    operation_name: Option<String>,
    extensions: Option<String>,
}

/// Interceptor serving the GraphQL route
pub struct GraphQLBridge {
    instance: Arc<ServiceInstance>,
    route: String,
    max_body_bytes: usize,
}

impl GraphQLBridge {
    pub fn new(instance: Arc<ServiceInstance>, route: impl Into<String>, max_body_bytes: usize) -> Self {
        Self {
            instance,
            route: route.into(),
            max_body_bytes,
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Adapt an HTTP request, run it, and hand back the engine's response
    pub async fn handle(&self, request: Request) -> Result<BridgedResponse, LoomError> {
        let (parts, body) = request.into_parts();

        let payload = match parts.method {
            Method::POST => {
                let bytes = drain(body, self.max_body_bytes).await?;
                parse_body(&bytes)?
            }
            Method::GET => parse_query_string(&parts.uri)?,
            ref other => {
                return Err(LoomError::MethodNotAllowed(format!(
                    "{} is not supported on {}",
                    other, self.route
                )))
            }
        };

        let search = parts
            .uri
            .query()
            .map(|q| format!("?{}", q))
            .unwrap_or_default();
        let mut bridged =
            BridgedRequest::new(parts.method.as_str(), parts.uri.path(), payload).with_search(search);
        for (name, value) in parts.headers.iter() {
            match value.to_str() {
                Ok(value) => bridged.append_header(name.as_str(), value),
                Err(_) => {
                    debug!("Request header '{}' is not valid UTF-8; decoding lossily", name);
                    bridged.append_header(
                        name.as_str(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    );
                }
            }
        }

        debug!(request_id = %bridged.id, method = %bridged.method, "Bridging GraphQL request");
        self.instance.execute(bridged).await
    }
}

#[async_trait]
impl Interceptor for GraphQLBridge {
    async fn intercept(&self, request: Request, next: Next) -> Response {
        if request.uri().path() != self.route {
            return next.run(request).await;
        }

        match self.handle(request).await {
            Ok(response) => into_http(response),
            Err(e) => error_response(&e),
        }
    }
}

/// Read the whole body, refusing more than `limit` bytes
async fn drain(body: Body, limit: usize) -> Result<Bytes, LoomError> {
    let mut stream = body.into_data_stream();
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| LoomError::BadRequest(format!("Failed to read request body: {}", e)))?;
        if buffer.len() + chunk.len() > limit {
            return Err(LoomError::PayloadTooLarge(limit));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

fn parse_body(bytes: &[u8]) -> Result<GraphQLPayload, LoomError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| LoomError::BadRequest(format!("Request body is not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(LoomError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| LoomError::BadRequest(format!("Invalid GraphQL request: {}", e)))
}

fn parse_query_string(uri: &Uri) -> Result<GraphQLPayload, LoomError> {
    let Query(params) = Query::<GetParams>::try_from_uri(uri)
        .map_err(|e| LoomError::BadRequest(format!("Invalid query string: {}", e)))?;

    Ok(GraphQLPayload {
        query: params.query,
        variables: parse_json_param("variables", params.variables)?,
        operation_name: params.operation_name,
        extensions: parse_json_param("extensions", params.extensions)?,
    })
}

fn parse_json_param(name: &str, raw: Option<String>) -> Result<Option<Value>, LoomError> {
    raw.filter(|s| !s.is_empty())
        .map(|s| {
            serde_json::from_str(&s).map_err(|e| {
                LoomError::BadRequest(format!("Query parameter '{}' is not valid JSON: {}", name, e))
            })
        })
        .transpose()
}

/// Unwrap the engine envelope into a plain HTTP response
fn into_http(response: BridgedResponse) -> Response {
    let BridgedResponse {
        status,
        headers,
        body,
    } = response;

    let mut http = Response::new(Body::from(body.into_string()));
    *http.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                http.headers_mut().append(name, value);
            }
            _ => debug!("Dropping invalid response header '{}'", name),
        }
    }
    http
}

fn error_response(e: &LoomError) -> Response {
    if e.is_error() {
        error!("GraphQL request failed: {}", e);
    } else {
        debug!("GraphQL request rejected: {}", e);
    }

    let body = json!({
        "errors": [{
            "message": e.sanitized_message(),
            "extensions": { "code": e.code() }
        }]
    });
    let mut response = BridgedResponse::json(e.status_code(), body.to_string());
    match e {
        LoomError::MethodNotAllowed(_) => {
            response = response.with_header(header::ALLOW.as_str(), "GET, POST");
        }
        LoomError::ServiceUnavailable(_) => {
            response = response.with_header(header::RETRY_AFTER.as_str(), RETRY_AFTER_SECS);
        }
        _ => {}
    }
    into_http(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheAdapter, MemoryStore};
    use crate::chain::{HttpChain, ListenOptions};
    use crate::service::ExecutionRole;
    use axum::body::to_bytes;
    use axum::http;
    use axum::routing::post;
    use axum::Router;
    use loomql_core::{constant, resolver, GraphQLConfig, ResolverMap, SchemaBuilder, SystemClock};
    use tower::ServiceExt;

    const PORT: u16 = 9926;

    fn instance() -> Arc<ServiceInstance> {
        instance_with(
            "type Query { ping: String }",
            ResolverMap::new().with("Query", "ping", constant(json!("pong"))),
        )
    }

    fn instance_with(sdl: &str, resolvers: ResolverMap) -> Arc<ServiceInstance> {
        let mut builder = SchemaBuilder::new();
        builder.append_schema(sdl, "/schema.graphql").unwrap();
        builder.merge_resolvers(&resolvers, "/resolvers.rs");
        let store = Arc::new(MemoryStore::new(Arc::new(SystemClock)));
        Arc::new(ServiceInstance::new(
            builder.finish(),
            GraphQLConfig::default(),
            CacheAdapter::new(store),
            300,
        ))
    }

    async fn ready_instance() -> Arc<ServiceInstance> {
        let instance = instance();
        ExecutionRole::Worker(1).scope(instance.ready()).await.unwrap();
        instance
    }

    fn router(instance: Arc<ServiceInstance>, max_body_bytes: usize) -> Router {
        let mut chain = HttpChain::new();
        chain.http(
            GraphQLBridge::new(instance, "/graphql", max_body_bytes),
            ListenOptions::new(PORT),
        );
        let base = Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .fallback(|| async { StatusCode::NOT_FOUND });
        chain.router(PORT, base)
    }

    async fn send(router: Router, request: http::Request<Body>) -> (StatusCode, http::HeaderMap, String) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn post_request(path: &str, body: &str) -> http::Request<Body> {
        http::Request::post(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_typename() {
        let router = router(ready_instance().await, 1024);
        let (status, headers, body) =
            send(router, post_request("/graphql", r#"{"query":"{ __typename }"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"data":{"__typename":"Query"}}"#);
        assert_eq!(
            headers.get("content-type").unwrap(),
            "application/json; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_non_utf8_headers_reach_resolvers() {
        let instance = instance_with(
            "type Query { token: String }",
            ResolverMap::new().with(
                "Query",
                "token",
                resolver(|call| async move { Ok(json!(call.header("x-token"))) }),
            ),
        );
        ExecutionRole::Worker(1).scope(instance.ready()).await.unwrap();

        let mut request = post_request("/graphql", r#"{"query":"{ token }"}"#);
        request.headers_mut().insert(
            "x-token",
            HeaderValue::from_bytes(b"caf\xe9").unwrap(),
        );
        let (status, _, body) = send(router(instance, 1024), request).await;

        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["data"]["token"], "caf\u{FFFD}");
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected_before_execution() {
        let instance = instance();
        let router = router(Arc::clone(&instance), 1024);
        let (status, _, body) = send(router, post_request("/graphql", "not-json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["errors"][0]["extensions"]["code"], "BAD_REQUEST");
        assert_eq!(instance.constructions(), 0);
    }

    #[tokio::test]
    async fn test_other_paths_pass_through() {
        let router = router(ready_instance().await, 4);
        let (status, _, body) = send(router, post_request("/echo", "raw body, untouched")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "raw body, untouched");
    }

    #[tokio::test]
    async fn test_not_ready_is_503() {
        let router = router(instance(), 1024);
        let (status, headers, _) =
            send(router, post_request("/graphql", r#"{"query":"{ ping }"}"#)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(headers.get("retry-after").unwrap(), RETRY_AFTER_SECS);
    }

    #[tokio::test]
    async fn test_get_request() {
        let router = router(ready_instance().await, 1024);
        let request = http::Request::get("/graphql?query=%7B%20ping%20%7D")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"data":{"ping":"pong"}}"#);
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let router = router(ready_instance().await, 1024);
        let request = http::Request::put("/graphql").body(Body::empty()).unwrap();
        let (status, headers, _) = send(router, request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers.get("allow").unwrap(), "GET, POST");
    }

    #[tokio::test]
    async fn test_payload_too_large() {
        let router = router(ready_instance().await, 16);
        let (status, _, _) = send(
            router,
            post_request("/graphql", r#"{"query":"{ ping ping ping ping }"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_parse_body_requires_object() {
        assert!(parse_body(br#"{"query":"{ ping }"}"#).is_ok());
        assert!(parse_body(b"[]").is_err());
        assert!(parse_body(br#"{"query": 42}"#).is_err());
    }

    #[test]
    fn test_parse_query_string() {
        let uri: Uri = "/graphql?query=%7Bping%7D&operationName=Op&variables=%7B%22a%22%3A1%7D"
            .parse()
            .unwrap();
        let payload = parse_query_string(&uri).unwrap();
        assert_eq!(payload.query.as_deref(), Some("{ping}"));
        assert_eq!(payload.operation_name.as_deref(), Some("Op"));
        assert_eq!(payload.variables, Some(json!({"a": 1})));

        let bad: Uri = "/graphql?query=x&variables=%7Bnope".parse().unwrap();
        assert!(parse_query_string(&bad).is_err());
    }
}
