//! Domain models for LoomQL: configuration, schema assembly, and resolvers

mod clock;
mod component;
mod model;
mod resolver;
mod schema;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use component::ComponentConfig;
pub use model::Model;
pub use resolver::{
    constant, resolver, ModuleExports, Resolver, ResolverCall, ResolverFuture, ResolverMap,
    ResolverModule, ResolverRegistry,
};
pub use schema::{CompiledSchema, SchemaBuilder, BASE_SCHEMA};
pub use types::{
    CacheConfig, GraphQLConfig, ServerConfig, TlsConfig, DEFAULT_CACHE_URL, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_PERSISTED_QUERY_TTL, DEFAULT_PORT, DEFAULT_ROUTE,
};
