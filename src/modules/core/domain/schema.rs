//! Schema document assembly
//!
//! [`SchemaBuilder`] accumulates SDL fragments and resolver maps during the
//! load phase. [`SchemaBuilder::finish`] freezes them into a [`CompiledSchema`]
//! that is shared read-only by the service.

use std::sync::Arc;
use tracing::{debug, warn};

use super::ResolverMap;
use crate::error::LoomError;

/// Directives and scalars every assembled schema starts with
pub const BASE_SCHEMA: &str = r#"
enum CacheControlScope {
  PUBLIC
  PRIVATE
}

directive @cacheControl(
  maxAge: Int
  scope: CacheControlScope
  inheritMaxAge: Boolean
) on FIELD_DEFINITION | OBJECT | INTERFACE | UNION

directive @table(
  database: String
  table: String
  expiration: Int
  audit: Boolean
) on OBJECT

directive @export(
  name: String
) on OBJECT

directive @sealed on OBJECT
directive @primaryKey on FIELD_DEFINITION
directive @indexed on FIELD_DEFINITION
directive @updatedTime on FIELD_DEFINITION
directive @relationship(
  to: String
  from: String
) on FIELD_DEFINITION

scalar Long
scalar BigInt
scalar Date
scalar Any
"#;

#[derive(Debug, Clone)]
struct Fragment {
    source: String,
    text: String,
}

/// Accumulates schema fragments and resolvers in discovery order
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fragments: Vec<Fragment>,
    resolvers: ResolverMap,
    resolver_sources: Vec<String>,
}

impl SchemaBuilder {
    /// Create a builder holding only the base fragment
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an SDL fragment.
    ///
    /// Fragments are checked for syntax on their own; cross-fragment
    /// references are only checked when the schema is compiled. Appending the
    /// same fragment twice duplicates its definitions.
    pub fn append_schema(&mut self, text: &str, source: &str) -> Result<(), LoomError> {
        if has_definitions(text) {
            async_graphql_parser::parse_schema(text).map_err(|e| {
                LoomError::Load(format!("Malformed schema fragment '{}': {}", source, e))
            })?;
        }

        let mut text = text.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }

        debug!(source, bytes = text.len(), "Appended schema fragment");
        self.fragments.push(Fragment {
            source: source.to_string(),
            text,
        });
        Ok(())
    }

    /// Merge a resolver map; fields already bound are overwritten
    pub fn merge_resolvers(&mut self, resolvers: &ResolverMap, source: &str) {
        for field in self.resolvers.merge(resolvers) {
            warn!(field = %field, source, "Resolver overwritten by a later module");
        }
        debug!(source, fields = resolvers.len(), "Merged resolvers");
        self.resolver_sources.push(source.to_string());
    }

    /// Number of appended fragments (the base fragment excluded)
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Resolvers merged so far
    pub fn resolvers(&self) -> &ResolverMap {
        &self.resolvers
    }

    /// Full document: the base fragment followed by every fragment in order
    pub fn sdl(&self) -> String {
        let capacity =
            BASE_SCHEMA.len() + self.fragments.iter().map(|f| f.text.len()).sum::<usize>();
        let mut sdl = String::with_capacity(capacity);
        sdl.push_str(BASE_SCHEMA);
        for fragment in &self.fragments {
            sdl.push_str(&fragment.text);
        }
        sdl
    }

    /// Freeze the assembled document and resolvers
    pub fn finish(self) -> CompiledSchema {
        let sdl = self.sdl();
        CompiledSchema {
            sdl: Arc::from(sdl),
            resolvers: Arc::new(self.resolvers),
            schema_sources: self.fragments.into_iter().map(|f| f.source).collect(),
            resolver_sources: self.resolver_sources.into(),
        }
    }
}

/// True if the text contains anything besides whitespace and comments
fn has_definitions(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Immutable result of the load phase
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    sdl: Arc<str>,
    resolvers: Arc<ResolverMap>,
    schema_sources: Arc<[String]>,
    resolver_sources: Arc<[String]>,
}

impl CompiledSchema {
    /// Assembled SDL
    pub fn sdl(&self) -> &str {
        &self.sdl
    }

    /// Merged resolvers
    pub fn resolvers(&self) -> &ResolverMap {
        &self.resolvers
    }

    /// Sources of the schema fragments, in order
    pub fn schema_sources(&self) -> &[String] {
        &self.schema_sources
    }

    /// Sources of the resolver maps, in order
    pub fn resolver_sources(&self) -> &[String] {
        &self.resolver_sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constant;
    use serde_json::json;

    #[test]
    fn test_base_only() {
        let schema = SchemaBuilder::new().finish();
        assert_eq!(schema.sdl(), BASE_SCHEMA);
        assert!(schema.schema_sources().is_empty());
    }

    #[test]
    fn test_fragments_in_discovery_order() {
        let fragments = [
            "type Query { books: [Book] }\n",
            "type Book { title: String }\n",
            "extend type Query { authors: [String] }\n",
        ];

        let mut builder = SchemaBuilder::new();
        for (i, fragment) in fragments.iter().enumerate() {
            builder
                .append_schema(fragment, &format!("f{}.graphql", i))
                .unwrap();
        }
        assert_eq!(builder.fragment_count(), 3);

        let schema = builder.finish();
        let expected = format!("{}{}", BASE_SCHEMA, fragments.concat());
        assert_eq!(schema.sdl(), expected);
        assert_eq!(schema.sdl().matches("scalar Long").count(), 1);
        assert_eq!(
            schema.schema_sources(),
            &["f0.graphql", "f1.graphql", "f2.graphql"]
        );
    }

    #[test]
    fn test_fragment_newline_terminated() {
        let mut builder = SchemaBuilder::new();
        builder.append_schema("scalar Url", "a.graphql").unwrap();
        builder.append_schema("scalar Email", "b.graphql").unwrap();
        assert!(builder.sdl().ends_with("scalar Url\nscalar Email\n"));
    }

    #[test]
    fn test_malformed_fragment_is_load_error() {
        let mut builder = SchemaBuilder::new();
        let err = builder
            .append_schema("type Query { books: [Book }", "broken.graphql")
            .unwrap_err();
        assert!(matches!(err, LoomError::Load(ref msg) if msg.contains("broken.graphql")));
        assert_eq!(builder.fragment_count(), 0);
    }

    #[test]
    fn test_comment_only_fragment_is_accepted() {
        let mut builder = SchemaBuilder::new();
        builder
            .append_schema("# nothing here yet\n\n", "empty.graphql")
            .unwrap();
        assert_eq!(builder.fragment_count(), 1);
    }

    #[test]
    fn test_resolvers_last_write_wins() {
        let mut builder = SchemaBuilder::new();
        builder.merge_resolvers(
            &ResolverMap::new().with("Query", "hello", constant(json!("a"))),
            "a.resolvers.json",
        );
        builder.merge_resolvers(
            &ResolverMap::new()
                .with("Query", "hello", constant(json!("b")))
                .with("Query", "bye", constant(json!("c"))),
            "b.resolvers.json",
        );

        let schema = builder.finish();
        assert_eq!(schema.resolvers().len(), 2);
        assert_eq!(
            schema.resolver_sources(),
            &["a.resolvers.json", "b.resolvers.json"]
        );
    }
}
