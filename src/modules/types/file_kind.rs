//! Classification of files discovered inside a component directory

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Suffix marking a declarative resolver file (`Type -> field -> constant`)
pub const STATIC_RESOLVERS_SUFFIX: &str = ".resolvers.json";

/// What a discovered file contributes to the assembled service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Schema definition language text (`.graphql`, `.gql`, `.graphqls`)
    SchemaFragment,
    /// Compiled resolver module registered with the host (`.rs`)
    ResolverModule,
    /// JSON document of constant resolvers (`*.resolvers.json`)
    StaticResolvers,
    /// Anything else; ignored by the loader
    Other,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::SchemaFragment => write!(f, "schema fragment"),
            FileKind::ResolverModule => write!(f, "resolver module"),
            FileKind::StaticResolvers => write!(f, "static resolvers"),
            FileKind::Other => write!(f, "other"),
        }
    }
}

impl FileKind {
    /// Classify a file by its name
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_lowercase();

        if name.ends_with(STATIC_RESOLVERS_SUFFIX) {
            return FileKind::StaticResolvers;
        }

        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("graphql" | "gql" | "graphqls") => FileKind::SchemaFragment,
            Some("rs") => FileKind::ResolverModule,
            _ => FileKind::Other,
        }
    }

    /// Returns true if the file contributes resolvers
    pub fn is_resolver(&self) -> bool {
        matches!(self, FileKind::ResolverModule | FileKind::StaticResolvers)
    }
}
