//! Lazily constructed, process-wide service instance

use async_graphql::Request;
use loomql_core::{CompiledSchema, GraphQLConfig, LoomError};
use loomql_types::{BridgedRequest, BridgedResponse};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::GraphQLService;
use crate::cache::CacheAdapter;
use crate::engine::build_schema;

tokio::task_local! {
    static EXECUTION_ROLE: ExecutionRole;
}

/// Role of the task currently running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionRole {
    /// Process supervisor; never serves requests
    Coordinator,
    /// Request-serving worker
    Worker(usize),
}

impl ExecutionRole {
    /// Role of the current task; tasks outside any scope are coordinators
    pub fn current() -> Self {
        EXECUTION_ROLE
            .try_with(|role| *role)
            .unwrap_or(ExecutionRole::Coordinator)
    }

    pub fn is_worker(self) -> bool {
        matches!(self, ExecutionRole::Worker(_))
    }

    /// Run `future` with this role
    pub async fn scope<F: Future>(self, future: F) -> F::Output {
        EXECUTION_ROLE.scope(self, future).await
    }
}

/// Owns the one [`GraphQLService`] of this process.
///
/// The service is built by the first [`ready`](Self::ready) call made from a
/// worker and is never rebuilt.
pub struct ServiceInstance {
    compiled: CompiledSchema,
    graphql: GraphQLConfig,
    cache: CacheAdapter,
    persisted_query_ttl: u64,
    service: OnceCell<Arc<GraphQLService>>,
    constructions: AtomicUsize,
}

impl ServiceInstance {
    pub fn new(
        compiled: CompiledSchema,
        graphql: GraphQLConfig,
        cache: CacheAdapter,
        persisted_query_ttl: u64,
    ) -> Self {
        Self {
            compiled,
            graphql,
            cache,
            persisted_query_ttl,
            service: OnceCell::new(),
            constructions: AtomicUsize::new(0),
        }
    }

    /// Readiness signal.
    ///
    /// Outside a worker this does nothing. In a worker the first call builds
    /// the service; later and concurrent calls wait for that one build.
    pub async fn ready(&self) -> Result<(), LoomError> {
        let role = ExecutionRole::current();
        if !role.is_worker() {
            debug!(?role, "Skipping service construction outside a worker");
            return Ok(());
        }

        self.service
            .get_or_try_init(|| self.construct())
            .await
            .map(|_| ())
    }

    async fn construct(&self) -> Result<Arc<GraphQLService>, LoomError> {
        self.constructions.fetch_add(1, Ordering::SeqCst);

        let schema = build_schema(&self.compiled, &self.graphql)?;

        if let Err(e) = self.cache.health_check().await {
            warn!("Cache store health check failed: {}", e);
        }

        let probe = schema.execute(Request::new("{ __typename }")).await;
        if !probe.is_ok() {
            let messages: Vec<String> = probe.errors.into_iter().map(|e| e.message).collect();
            return Err(LoomError::SchemaBuild(format!(
                "Startup probe failed: {}",
                messages.join("; ")
            )));
        }

        info!(
            "GraphQL service ready ({} schema fragments, {} resolvers)",
            self.compiled.schema_sources().len(),
            self.compiled.resolvers().len()
        );

        Ok(Arc::new(GraphQLService::new(
            schema,
            self.cache.clone(),
            self.persisted_query_ttl,
        )))
    }

    pub fn is_ready(&self) -> bool {
        self.service.initialized()
    }

    /// Number of times construction has started
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    /// The constructed service, if ready
    pub fn service(&self) -> Option<Arc<GraphQLService>> {
        self.service.get().cloned()
    }

    pub fn compiled(&self) -> &CompiledSchema {
        &self.compiled
    }

    pub fn cache(&self) -> &CacheAdapter {
        &self.cache
    }

    /// Execute a request, or fail with `ServiceUnavailable` before readiness
    pub async fn execute(&self, request: BridgedRequest) -> Result<BridgedResponse, LoomError> {
        match self.service.get() {
            Some(service) => service.execute(request).await,
            None => Err(LoomError::ServiceUnavailable(
                "service instance has not been constructed".to_string(),
            )),
        }
    }
}
