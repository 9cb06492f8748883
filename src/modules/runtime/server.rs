//! HTTP server for LoomQL

use axum::{http::StatusCode, routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use loomql_core::{CompiledSchema, LoomError, Model, ResolverRegistry, ServerConfig, SystemClock};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::bridge::GraphQLBridge;
use crate::cache::{open_store, CacheAdapter, RecordStore};
use crate::chain::{HttpChain, ListenOptions, Listener};
use crate::handlers::HealthHandler;
use crate::service::{ExecutionRole, ServiceInstance};

/// How long in-flight TLS connections get after a shutdown signal
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime server for LoomQL
pub struct Runtime {
    model: Arc<Model>,
    instance: Arc<ServiceInstance>,
    store: Arc<dyn RecordStore>,
    chain: HttpChain,
    bridge_attached: bool,
}

/// Apply port override to a model configuration
///
/// Component ports would otherwise win over the server port, so they are
/// cleared.
fn apply_port_override(mut model: Model, port_override: Option<u16>) -> Model {
    if let Some(port) = port_override {
        if let Some(ref mut server) = model.server {
            server.port = Some(port);
        } else {
            model.server = Some(ServerConfig {
                port: Some(port),
                ..ServerConfig::default()
            });
        }
        for component in &mut model.components {
            component.port = None;
        }
    }
    model
}

impl Runtime {
    /// Create a new runtime from a model and its assembled schema
    pub async fn new(model: Model, compiled: CompiledSchema) -> Result<Self, LoomError> {
        Self::with_port_override(model, compiled, None).await
    }

    /// Create a new runtime with an optional port override
    pub async fn with_port_override(
        model: Model,
        compiled: CompiledSchema,
        port_override: Option<u16>,
    ) -> Result<Self, LoomError> {
        let model = Arc::new(apply_port_override(model, port_override));

        let store = open_store(&model.cache_url(), Arc::new(SystemClock)).await?;
        let cache = CacheAdapter::new(Arc::clone(&store));

        let instance = Arc::new(ServiceInstance::new(
            compiled,
            model.graphql_config(),
            cache,
            model.cache_config().persisted_query_ttl(),
        ));

        Ok(Self {
            model,
            instance,
            store,
            chain: HttpChain::new(),
            bridge_attached: false,
        })
    }

    /// Construct the service and register the GraphQL route.
    ///
    /// Only a worker constructs; elsewhere this does nothing and the route
    /// stays unregistered. Repeated calls register the route once.
    pub async fn attach_service(&mut self) -> Result<(), LoomError> {
        self.instance.ready().await?;
        if !self.instance.is_ready() || self.bridge_attached {
            return Ok(());
        }

        self.chain.http(
            GraphQLBridge::new(
                Arc::clone(&self.instance),
                self.model.route(),
                self.model.max_body_bytes(),
            ),
            ListenOptions::new(self.model.port()).with_secure_port(self.model.secure_port()),
        );
        self.bridge_attached = true;
        debug!("Registered GraphQL route {}", self.model.route());
        Ok(())
    }

    /// Parse, validate, and assemble the configuration at `config_path`
    pub async fn load(
        config_path: &Path,
        registry: &ResolverRegistry,
        port_override: Option<u16>,
    ) -> Result<Self, LoomError> {
        let path = config_path.to_string_lossy();
        let model = loomql_parser::parse_file(&path)?;
        let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        let compiled = loomql_parser::load_components(&model, base_dir, registry)?;
        Self::with_port_override(model, compiled, port_override).await
    }

    /// Build the Axum router for one listener
    pub fn build_router(&self, port: u16) -> Router {
        let base = Router::new()
            .route("/health", get(HealthHandler::handle))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .with_state(Arc::clone(&self.instance));

        self.chain.router(port, base)
    }

    /// Start serving until a shutdown signal arrives
    pub async fn run(&mut self) -> Result<(), LoomError> {
        // The supervising task never builds the service
        self.attach_service().await?;

        ExecutionRole::Worker(1)
            .scope(async {
                self.attach_service().await?;
                self.serve().await
            })
            .await
    }

    async fn serve(&self) -> Result<(), LoomError> {

        info!("Starting LoomQL server '{}'", self.model.name);
        info!(
            "Schemas: {}",
            self.instance.compiled().schema_sources().join(", ")
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut listeners = JoinSet::new();

        for listener in self.chain.listeners() {
            let router = self.build_router(listener.port);
            let addr = SocketAddr::from(([0, 0, 0, 0], listener.port));

            if listener.secure {
                let config = self.tls_config(&listener).await?;
                let handle = Handle::new();
                let shutdown_handle = handle.clone();
                let mut rx = shutdown_rx.clone();
                tokio::spawn(async move {
                    let _ = rx.changed().await;
                    shutdown_handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
                });

                info!("Listening on https://{}{}", addr, self.model.route());
                listeners.spawn(async move {
                    axum_server::bind_rustls(addr, config)
                        .handle(handle)
                        .serve(router.into_make_service())
                        .await
                        .map_err(|e| LoomError::Server(format!("TLS listener {}: {}", addr, e)))
                });
            } else {
                let tcp = TcpListener::bind(&addr)
                    .await
                    .map_err(|e| LoomError::Server(format!("Failed to bind {}: {}", addr, e)))?;
                let mut rx = shutdown_rx.clone();

                info!("Listening on http://{}{}", addr, self.model.route());
                listeners.spawn(async move {
                    axum::serve(tcp, router)
                        .with_graceful_shutdown(async move {
                            let _ = rx.changed().await;
                        })
                        .await
                        .map_err(|e| LoomError::Server(format!("Listener {}: {}", addr, e)))
                });
            }
        }

        let mut failure = None;
        tokio::select! {
            _ = Self::shutdown_signal() => {}
            Some(result) = listeners.join_next() => {
                failure = flatten(result).err();
            }
        }

        let _ = shutdown_tx.send(true);
        while let Some(result) = listeners.join_next().await {
            if let Err(e) = flatten(result) {
                warn!("Listener stopped with error: {}", e);
            }
        }

        info!("Server stopped");
        self.shutdown().await?;

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn tls_config(&self, listener: &Listener) -> Result<RustlsConfig, LoomError> {
        let tls = self
            .model
            .server
            .as_ref()
            .and_then(|s| s.tls.as_ref())
            .ok_or_else(|| {
                LoomError::Config(format!(
                    "Secure port {} requires server.tls",
                    listener.port
                ))
            })?;

        RustlsConfig::from_pem_file(&tls.cert, &tls.key)
            .await
            .map_err(|e| LoomError::Config(format!("Failed to load TLS certificate: {}", e)))
    }

    /// Wait for shutdown signal
    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install CTRL+C signal handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                debug!("Received CTRL+C, shutting down...");
            }
            _ = terminate => {
                debug!("Received SIGTERM, shutting down...");
            }
        }
    }

    /// Gracefully shutdown the runtime
    pub async fn shutdown(&self) -> Result<(), LoomError> {
        info!("Closing cache store...");
        if let Err(e) = self.store.close().await {
            warn!("Error closing cache store: {}", e);
        }
        info!("Shutdown complete");
        Ok(())
    }

    /// Get the model
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Get the service instance
    pub fn instance(&self) -> &Arc<ServiceInstance> {
        &self.instance
    }

    /// Get the HTTP chain
    pub fn chain(&self) -> &HttpChain {
        &self.chain
    }

    /// Register further interceptors before [`run`](Self::run); they run
    /// ahead of the GraphQL route
    pub fn chain_mut(&mut self) -> &mut HttpChain {
        &mut self.chain
    }
}

fn flatten(
    result: Result<Result<(), LoomError>, tokio::task::JoinError>,
) -> Result<(), LoomError> {
    result.map_err(|e| LoomError::Internal(format!("Listener task failed: {}", e)))?
}
