//! Readiness endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::service::ServiceInstance;

/// Handler for readiness probes
pub struct HealthHandler;

impl HealthHandler {
    /// Handle GET /health
    pub async fn handle(State(instance): State<Arc<ServiceInstance>>) -> impl IntoResponse {
        let ready = instance.is_ready();
        let status = if ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        let compiled = instance.compiled();
        (
            status,
            Json(json!({
                "status": if ready { "ok" } else { "starting" },
                "ready": ready,
                "schemas": compiled.schema_sources().len(),
                "resolvers": compiled.resolvers().len(),
                "cache": instance.cache().store().store_kind().to_string(),
            })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheAdapter, MemoryStore};
    use crate::service::ExecutionRole;
    use axum::body::{to_bytes, Body};
    use axum::http;
    use axum::routing::get;
    use axum::Router;
    use loomql_core::{GraphQLConfig, SchemaBuilder, SystemClock};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn probe(instance: Arc<ServiceInstance>) -> (StatusCode, Value) {
        let router = Router::new()
            .route("/health", get(HealthHandler::handle))
            .with_state(instance);
        let response = router
            .oneshot(http::Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reflects_readiness() {
        let mut builder = SchemaBuilder::new();
        builder
            .append_schema("type Query { ping: String }", "/schema.graphql")
            .unwrap();
        let store = Arc::new(MemoryStore::new(Arc::new(SystemClock)));
        let instance = Arc::new(ServiceInstance::new(
            builder.finish(),
            GraphQLConfig::default(),
            CacheAdapter::new(store),
            300,
        ));

        let (status, body) = probe(Arc::clone(&instance)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "starting");

        ExecutionRole::Worker(1).scope(instance.ready()).await.unwrap();
        let (status, body) = probe(instance).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
        assert_eq!(body["schemas"], 1);
        assert_eq!(body["cache"], "memory");
    }
}
