//! Cache store type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported record store backends for the query cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-local store with lazy expiration
    Memory,
    /// Redis key-value store
    Redis,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Memory => write!(f, "memory"),
            StoreKind::Redis => write!(f, "redis"),
        }
    }
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreKind::Memory),
            "redis" | "rediss" => Ok(StoreKind::Redis),
            _ => Err(format!("Unknown store type: {}", s)),
        }
    }
}

impl StoreKind {
    /// Returns all supported store kinds
    pub fn all() -> &'static [StoreKind] {
        &[StoreKind::Memory, StoreKind::Redis]
    }

    /// Determine the store kind from a URL such as `memory://` or `redis://host:6379`
    pub fn from_url(url: &str) -> Result<Self, String> {
        let scheme = url
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| format!("Cache URL '{}' has no scheme", url))?;
        scheme.parse()
    }

    /// Returns true if records survive a process restart
    pub fn is_persistent(&self) -> bool {
        matches!(self, StoreKind::Redis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_from_str() {
        assert_eq!(StoreKind::from_str("memory").unwrap(), StoreKind::Memory);
        assert_eq!(StoreKind::from_str("REDIS").unwrap(), StoreKind::Redis);
        assert!(StoreKind::from_str("postgres").is_err());
    }

    #[test]
    fn test_store_kind_from_url() {
        assert_eq!(StoreKind::from_url("memory://").unwrap(), StoreKind::Memory);
        assert_eq!(
            StoreKind::from_url("redis://localhost:6379/0").unwrap(),
            StoreKind::Redis
        );
        assert_eq!(
            StoreKind::from_url("rediss://cache.internal:6380").unwrap(),
            StoreKind::Redis
        );
        assert!(StoreKind::from_url("localhost:6379").is_err());
        assert!(StoreKind::from_url("mongodb://localhost").is_err());
    }

    #[test]
    fn test_store_kind_serde() {
        let json = serde_json::to_string(&StoreKind::Redis).unwrap();
        assert_eq!(json, "\"redis\"");
        let kind: StoreKind = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(kind, StoreKind::Memory);
        assert!(!kind.is_persistent());
    }
}
