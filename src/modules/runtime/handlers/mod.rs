//! HTTP handlers served next to the GraphQL route

mod health;

pub use health::HealthHandler;
