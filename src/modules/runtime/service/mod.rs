//! GraphQL service: executes bridged requests against the compiled schema

mod instance;
mod persisted;

pub use instance::{ExecutionRole, ServiceInstance};
pub use persisted::{PersistedQueries, Resolution};

use async_graphql::dynamic::Schema;
use async_graphql::{Request, Response, Variables};
use async_graphql_parser::types::{DocumentOperations, OperationType};
use loomql_core::LoomError;
use loomql_types::{BridgedRequest, BridgedResponse};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::cache::CacheAdapter;
use crate::engine::CachePolicy;

/// Executable schema plus the cache it persists queries in
pub struct GraphQLService {
    schema: Schema,
    cache: CacheAdapter,
    persisted: PersistedQueries,
}

impl GraphQLService {
    /// Create a service; persisted queries live for `persisted_query_ttl` seconds
    pub fn new(schema: Schema, cache: CacheAdapter, persisted_query_ttl: u64) -> Self {
        let persisted = PersistedQueries::new(Arc::new(cache.clone()), persisted_query_ttl);
        Self {
            schema,
            cache,
            persisted,
        }
    }

    /// Executable schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Query cache
    pub fn cache(&self) -> &CacheAdapter {
        &self.cache
    }

    /// Execute one bridged request.
    ///
    /// Request-shape problems come back as `Err`; everything the engine
    /// reports (including field errors) is a response.
    pub async fn execute(&self, request: BridgedRequest) -> Result<BridgedResponse, LoomError> {
        let resolution = self.persisted.resolve(&request.body).await?;
        let Some(query) = resolution.query().map(str::to_string) else {
            return Ok(persisted_query_not_found());
        };

        let operation_name = request.body.operation_name.clone();
        if request.is_get() && is_mutation(&query, operation_name.as_deref()) {
            return Err(LoomError::MethodNotAllowed(
                "Mutations cannot be sent over GET".to_string(),
            ));
        }

        let variables = match request.body.variables.clone() {
            None | Some(Value::Null) => Variables::default(),
            Some(variables @ Value::Object(_)) => Variables::from_json(variables),
            Some(_) => {
                return Err(LoomError::BadRequest(
                    "variables must be a JSON object".to_string(),
                ))
            }
        };

        debug!(
            request_id = %request.id,
            operation = operation_name.as_deref().unwrap_or("<anonymous>"),
            "Executing GraphQL request"
        );

        let mut engine_request = Request::new(query.as_str()).variables(variables);
        if let Some(name) = operation_name {
            engine_request = engine_request.operation_name(name);
        }
        let policy = Arc::new(CachePolicy::new());
        let engine_request = engine_request
            .data(Arc::new(request))
            .data(Arc::clone(&policy));

        let response = self.schema.execute(engine_request).await;

        if let Resolution::Register { hash, .. } = &resolution {
            if response.is_ok() {
                self.persisted.register(hash, &query).await;
            }
        }

        into_bridged(response, &policy)
    }
}

/// Shape an engine response as JSON over HTTP.
///
/// Responses with errors are never cacheable; otherwise `policy` decides.
fn into_bridged(response: Response, policy: &CachePolicy) -> Result<BridgedResponse, LoomError> {
    let request_error = matches!(response.data, async_graphql::Value::Null)
        && !response.errors.is_empty()
        && response.errors.iter().all(|e| e.path.is_empty());
    let status = if request_error { 400 } else { 200 };

    let mut headers: Vec<(String, String)> = response
        .http_headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("cache-control")) {
        let cache_control = if response.errors.is_empty() {
            policy.header_value()
        } else {
            "no-store".to_string()
        };
        headers.push(("cache-control".to_string(), cache_control));
    }

    let mut bridged = BridgedResponse::json(status, serde_json::to_string(&response)?);
    for (name, value) in headers {
        bridged = bridged.with_header(name, value);
    }
    Ok(bridged)
}

fn persisted_query_not_found() -> BridgedResponse {
    let body = json!({
        "errors": [{
            "message": "PersistedQueryNotFound",
            "extensions": { "code": "PERSISTED_QUERY_NOT_FOUND" }
        }]
    });
    BridgedResponse::json(200, body.to_string())
}

/// True if the operation that would run is a mutation.
///
/// Unparseable documents are left for the engine to report.
fn is_mutation(query: &str, operation_name: Option<&str>) -> bool {
    let Ok(document) = async_graphql_parser::parse_query(query) else {
        return false;
    };
    match document.operations {
        DocumentOperations::Single(operation) => operation.node.ty == OperationType::Mutation,
        DocumentOperations::Multiple(operations) => match operation_name {
            Some(name) => operations
                .get(name)
                .map(|op| op.node.ty == OperationType::Mutation)
                .unwrap_or(false),
            None => operations
                .values()
                .any(|op| op.node.ty == OperationType::Mutation),
        },
    }
}
