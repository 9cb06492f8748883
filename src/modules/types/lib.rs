//! Type definitions for LoomQL
//!
//! This crate contains shared type definitions used across the LoomQL codebase,
//! including discovered file kinds, cache store kinds, and the bridged
//! request/response shapes exchanged between the HTTP layer and the engine.

pub mod file_kind;
pub mod runtime;
pub mod store;

pub use file_kind::FileKind;
pub use runtime::{
    BridgedRequest, BridgedResponse, CacheRecord, GraphQLPayload, PersistedQuery, ResponseBody,
    WriteContext,
};
pub use store::StoreKind;
