//! Runtime server for LoomQL
//!
//! This crate provides the record stores and cache adapter, the executable
//! schema, the lazily constructed GraphQL service, and the HTTP chain and
//! bridge that expose it.

pub mod bridge;
pub mod cache;
pub mod chain;
pub mod engine;
pub mod handlers;
pub mod server;
pub mod service;

pub use bridge::GraphQLBridge;
pub use cache::{CacheAdapter, CacheOptions, KeyValueCache, MemoryStore, RecordStore, RedisStore};
pub use chain::{HttpChain, Interceptor, ListenOptions, Listener};
pub use engine::build_schema;
pub use handlers::HealthHandler;
pub use server::Runtime;
pub use service::{ExecutionRole, GraphQLService, PersistedQueries, ServiceInstance};
