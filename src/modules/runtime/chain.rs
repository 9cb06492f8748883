//! Host HTTP pipeline: interceptors registered per listener

use async_trait::async_trait;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Middleware in the host chain.
///
/// An interceptor either answers a request itself or hands it to `next`
/// unchanged.
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, request: Request, next: Next) -> Response;
}

/// Ports an interceptor is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenOptions {
    pub port: u16,
    pub secure_port: Option<u16>,
}

impl ListenOptions {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            secure_port: None,
        }
    }

    pub fn with_secure_port(mut self, secure_port: Option<u16>) -> Self {
        self.secure_port = secure_port;
        self
    }

    /// True if requests on `port` pass through this registration
    pub fn serves(&self, port: u16) -> bool {
        self.port == port || self.secure_port == Some(port)
    }
}

/// Socket the host must bind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listener {
    pub port: u16,
    pub secure: bool,
}

struct Registration {
    interceptor: Arc<dyn Interceptor>,
    options: ListenOptions,
}

/// Ordered interceptor registrations; the first registered runs first
#[derive(Default)]
pub struct HttpChain {
    registrations: Vec<Registration>,
}

impl HttpChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interceptor on the given listeners
    pub fn http(&mut self, interceptor: impl Interceptor, options: ListenOptions) -> &mut Self {
        self.registrations.push(Registration {
            interceptor: Arc::new(interceptor),
            options,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Distinct listeners across all registrations, in registration order.
    ///
    /// A port claimed both plain and secure keeps its first use.
    pub fn listeners(&self) -> Vec<Listener> {
        let mut listeners: Vec<Listener> = Vec::new();
        let mut push = |listener: Listener| {
            if !listeners.iter().any(|l| l.port == listener.port) {
                listeners.push(listener);
            }
        };
        for registration in &self.registrations {
            push(Listener {
                port: registration.options.port,
                secure: false,
            });
            if let Some(port) = registration.options.secure_port {
                push(Listener { port, secure: true });
            }
        }
        listeners
    }

    /// Wrap `base` with every interceptor serving `port`, plus CORS and tracing
    pub fn router(&self, port: u16, base: Router) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        self.registrations
            .iter()
            .rev()
            .filter(|r| r.options.serves(port))
            .fold(base, |router, registration| {
                let interceptor = Arc::clone(&registration.interceptor);
                router.layer(middleware::from_fn(move |request: Request, next: Next| {
                    let interceptor = Arc::clone(&interceptor);
                    async move { interceptor.intercept(request, next).await }
                }))
            })
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }
}
