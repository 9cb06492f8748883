//! Core domain logic for LoomQL
//!
//! This crate contains the configuration model, the schema/resolver assembly
//! types, and the error taxonomy shared by the LoomQL crates.

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::LoomError;
