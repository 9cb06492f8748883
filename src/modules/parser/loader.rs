//! Component discovery
//!
//! Walks component directories and feeds every schema fragment and resolver
//! source into a [`SchemaBuilder`]. Two modes exist:
//!
//! * discovery: every file under the component root is handed to
//!   [`ComponentLoader::handle_file`] in sorted path order;
//! * directory: the component names a resolver module and a schema glob,
//!   handled by [`ComponentLoader::handle_directory`].

use glob::MatchOptions;
use loomql_core::{
    CompiledSchema, ComponentConfig, LoomError, ResolverMap, ResolverRegistry, SchemaBuilder,
};
use loomql_types::FileKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: true,
};

/// Feeds discovered files into a [`SchemaBuilder`]
pub struct ComponentLoader<'a> {
    registry: &'a ResolverRegistry,
    builder: SchemaBuilder,
}

impl<'a> ComponentLoader<'a> {
    /// Create a loader resolving `.rs` modules through `registry`
    pub fn new(registry: &'a ResolverRegistry) -> Self {
        Self {
            registry,
            builder: SchemaBuilder::new(),
        }
    }

    /// Handle one discovered file.
    ///
    /// `url_path` is the file's path relative to the configuration root (it
    /// doubles as the registry specifier for resolver modules); `file_path`
    /// is where it lives on disk.
    pub fn handle_file(
        &mut self,
        content: &[u8],
        url_path: &str,
        file_path: &Path,
    ) -> Result<FileKind, LoomError> {
        let kind = FileKind::from_path(file_path);
        match kind {
            FileKind::SchemaFragment => {
                let text = std::str::from_utf8(content).map_err(|e| {
                    LoomError::Load(format!(
                        "Schema fragment '{}' is not valid UTF-8: {}",
                        file_path.display(),
                        e
                    ))
                })?;
                self.builder.append_schema(text, url_path)?;
            }
            FileKind::StaticResolvers => {
                let resolvers = parse_static_resolvers(content, file_path)?;
                self.builder.merge_resolvers(&resolvers, url_path);
            }
            FileKind::ResolverModule => {
                let resolvers = self.module_resolvers(url_path)?;
                self.builder.merge_resolvers(&resolvers, url_path);
            }
            FileKind::Other => {
                debug!(path = %file_path.display(), "Skipping file");
            }
        }
        Ok(kind)
    }

    /// Handle a component that names its resolver module and schema glob.
    ///
    /// Paths in `config` are relative to the component root, which is itself
    /// relative to `root`.
    pub fn handle_directory(
        &mut self,
        root: &Path,
        config: &ComponentConfig,
    ) -> Result<(), LoomError> {
        let component_root = component_root(root, config)?;

        if let Some(resolvers) = &config.resolvers {
            let file_path = component_root.join(resolvers);
            let specifier = url_path(root, &file_path);
            let map = match FileKind::from_path(&file_path) {
                FileKind::StaticResolvers => {
                    let content = std::fs::read(&file_path).map_err(|e| {
                        LoomError::Load(format!(
                            "Failed to read resolvers '{}': {}",
                            file_path.display(),
                            e
                        ))
                    })?;
                    parse_static_resolvers(&content, &file_path)?
                }
                _ => self.module_resolvers(&specifier)?,
            };
            self.builder.merge_resolvers(&map, &specifier);
        }

        if let Some(pattern) = &config.schemas {
            let full_pattern = pattern_under(&component_root, pattern);
            let entries = glob::glob_with(&full_pattern, MATCH_OPTIONS).map_err(|e| {
                LoomError::Load(format!("Invalid schema pattern '{}': {}", pattern, e))
            })?;

            let mut matched = 0usize;
            for entry in entries {
                let file_path = entry.map_err(|e| {
                    LoomError::Load(format!("Failed to read schema path: {}", e))
                })?;
                if !file_path.is_file() {
                    continue;
                }
                let text = std::fs::read_to_string(&file_path).map_err(|e| {
                    LoomError::Load(format!(
                        "Failed to read schema '{}': {}",
                        file_path.display(),
                        e
                    ))
                })?;
                self.builder.append_schema(&text, &url_path(root, &file_path))?;
                matched += 1;
            }

            if matched == 0 {
                warn!(component = %config.path, pattern = %pattern, "Schema pattern matched no files");
            }
        }

        Ok(())
    }

    /// Hand every file under the component root to [`Self::handle_file`],
    /// in sorted path order. Dotfiles and dot-directories are skipped.
    pub fn discover(&mut self, root: &Path, config: &ComponentConfig) -> Result<usize, LoomError> {
        let component_root = component_root(root, config)?;
        let pattern = pattern_under(&component_root, "**/*");

        let mut files: Vec<PathBuf> = glob::glob_with(&pattern, MATCH_OPTIONS)
            .map_err(|e| LoomError::Load(format!("Invalid discovery pattern: {}", e)))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable path");
                    None
                }
            })
            .filter(|path| path.is_file() && !is_hidden(&component_root, path))
            .collect();
        files.sort();

        let mut handled = 0usize;
        for file_path in &files {
            let content = std::fs::read(file_path).map_err(|e| {
                LoomError::Load(format!("Failed to read '{}': {}", file_path.display(), e))
            })?;
            if self.handle_file(&content, &url_path(root, file_path), file_path)? != FileKind::Other {
                handled += 1;
            }
        }

        debug!(component = %config.path, files = files.len(), handled, "Discovered component");
        Ok(handled)
    }

    /// Load a component in whichever mode its configuration selects
    pub fn load_component(&mut self, root: &Path, config: &ComponentConfig) -> Result<(), LoomError> {
        if config.is_directory_mode() {
            self.handle_directory(root, config)
        } else {
            self.discover(root, config).map(|_| ())
        }
    }

    /// Finish loading and freeze the assembled schema
    pub fn finish(self) -> CompiledSchema {
        let schema = self.builder.finish();
        info!(
            fragments = schema.schema_sources().len(),
            resolvers = schema.resolvers().len(),
            "Assembled schema"
        );
        schema
    }

    fn module_resolvers(&self, specifier: &str) -> Result<ResolverMap, LoomError> {
        let module = self.registry.resolve(specifier).ok_or_else(|| {
            LoomError::Load(format!(
                "No resolver module registered for '{}' (registered: {})",
                ResolverRegistry::normalize(specifier),
                self.registry.specifiers().join(", ")
            ))
        })?;
        Ok(module.exports().into_resolvers())
    }
}

fn parse_static_resolvers(content: &[u8], file_path: &Path) -> Result<ResolverMap, LoomError> {
    let document: serde_json::Value = serde_json::from_slice(content).map_err(|e| {
        LoomError::Load(format!(
            "Malformed resolvers file '{}': {}",
            file_path.display(),
            e
        ))
    })?;
    ResolverMap::from_static(&document)
}

fn component_root(root: &Path, config: &ComponentConfig) -> Result<PathBuf, LoomError> {
    let relative: PathBuf = Path::new(&config.path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let component_root = root.join(relative);
    if !component_root.is_dir() {
        return Err(LoomError::Load(format!(
            "Component directory '{}' does not exist",
            component_root.display()
        )));
    }
    Ok(component_root)
}

/// Glob `pattern` below `root`; metacharacters in `root` match literally
fn pattern_under(root: &Path, pattern: &str) -> String {
    let root = glob::Pattern::escape(&root.to_string_lossy());
    Path::new(&root).join(pattern).to_string_lossy().into_owned()
}

fn is_hidden(component_root: &Path, path: &Path) -> bool {
    path.strip_prefix(component_root)
        .unwrap_or(path)
        .components()
        .any(|c| matches!(c, Component::Normal(part) if part.to_string_lossy().starts_with('.')))
}

/// Path of `file_path` relative to `root`, with forward slashes and a
/// leading `/`
fn url_path(root: &Path, file_path: &Path) -> String {
    let relative = file_path.strip_prefix(root).unwrap_or(file_path);
    let joined = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomql_core::{constant, ModuleExports, BASE_SCHEMA};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn books_registry() -> ResolverRegistry {
        ResolverRegistry::new().with_module("books/resolvers.rs", || {
            ModuleExports::default_export(
                ResolverMap::new().with("Query", "books", constant(json!([{"title": "Dune"}]))),
            )
        })
    }

    #[test]
    fn test_handle_file_kinds() {
        let registry = books_registry();
        let mut loader = ComponentLoader::new(&registry);

        let kind = loader
            .handle_file(
                b"type Query { books: [Book] }\n",
                "/books/schema.graphql",
                Path::new("/srv/books/schema.graphql"),
            )
            .unwrap();
        assert_eq!(kind, FileKind::SchemaFragment);

        let kind = loader
            .handle_file(b"", "/books/resolvers.rs", Path::new("/srv/books/resolvers.rs"))
            .unwrap();
        assert_eq!(kind, FileKind::ResolverModule);

        let kind = loader
            .handle_file(
                br#"{"Query": {"version": "1.0"}}"#,
                "/books/meta.resolvers.json",
                Path::new("/srv/books/meta.resolvers.json"),
            )
            .unwrap();
        assert_eq!(kind, FileKind::StaticResolvers);

        let kind = loader
            .handle_file(b"# docs", "/books/README.md", Path::new("/srv/books/README.md"))
            .unwrap();
        assert_eq!(kind, FileKind::Other);

        let schema = loader.finish();
        assert_eq!(
            schema.sdl(),
            format!("{}type Query {{ books: [Book] }}\n", BASE_SCHEMA)
        );
        assert!(schema.resolvers().contains("Query", "books"));
        assert!(schema.resolvers().contains("Query", "version"));
    }

    #[test]
    fn test_unregistered_module_is_load_error() {
        let registry = ResolverRegistry::new();
        let mut loader = ComponentLoader::new(&registry);
        let err = loader
            .handle_file(b"", "/authors/resolvers.rs", Path::new("authors/resolvers.rs"))
            .unwrap_err();
        assert!(matches!(err, LoomError::Load(ref msg) if msg.contains("authors/resolvers.rs")));
    }

    #[test]
    fn test_malformed_static_resolvers() {
        let registry = ResolverRegistry::new();
        let mut loader = ComponentLoader::new(&registry);
        let err = loader
            .handle_file(b"{not json", "/x.resolvers.json", Path::new("x.resolvers.json"))
            .unwrap_err();
        assert!(matches!(err, LoomError::Load(_)));
    }

    #[test]
    fn test_discover_sorted_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "books/b.graphql", "type Book { title: String }\n");
        write(dir.path(), "books/a.graphql", "type Query { books: [Book] }\n");
        write(dir.path(), "books/nested/c.gql", "extend type Query { count: Int }\n");
        write(dir.path(), "books/resolvers.rs", "// compiled in\n");
        write(dir.path(), "books/.hidden/skip.graphql", "type Hidden { x: Int }\n");
        write(dir.path(), "books/notes.txt", "ignored\n");

        let registry = books_registry();
        let mut loader = ComponentLoader::new(&registry);
        let handled = loader
            .discover(dir.path(), &ComponentConfig::new("books"))
            .unwrap();
        assert_eq!(handled, 4);

        let schema = loader.finish();
        assert_eq!(
            schema.schema_sources(),
            &[
                "/books/a.graphql",
                "/books/b.graphql",
                "/books/nested/c.gql"
            ]
        );
        assert!(!schema.sdl().contains("Hidden"));
        assert!(schema.resolvers().contains("Query", "books"));
    }

    #[test]
    fn test_handle_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "books/schema/2-book.graphql", "type Book { title: String }\n");
        write(dir.path(), "books/schema/1-query.graphql", "type Query { books: [Book] }\n");
        write(dir.path(), "books/unrelated.graphql", "type Unrelated { x: Int }\n");

        let registry = books_registry();
        let mut loader = ComponentLoader::new(&registry);
        let config = ComponentConfig::new("books")
            .with_resolvers("resolvers.rs")
            .with_schemas("schema/*.graphql");
        loader.handle_directory(dir.path(), &config).unwrap();

        let schema = loader.finish();
        let expected = format!(
            "{}type Query {{ books: [Book] }}\ntype Book {{ title: String }}\n",
            BASE_SCHEMA
        );
        assert_eq!(schema.sdl(), expected);
        assert_eq!(schema.resolver_sources(), &["/books/resolvers.rs"]);
    }

    #[test]
    fn test_handle_directory_static_resolvers() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "api/schema.graphql", "type Query { version: String }\n");
        write(dir.path(), "api/api.resolvers.json", r#"{"Query": {"version": "2.1"}}"#);

        let registry = ResolverRegistry::new();
        let mut loader = ComponentLoader::new(&registry);
        let config = ComponentConfig::new("api")
            .with_resolvers("api.resolvers.json")
            .with_schemas("*.graphql");
        loader.load_component(dir.path(), &config).unwrap();

        let schema = loader.finish();
        assert!(schema.resolvers().contains("Query", "version"));
        assert_eq!(schema.schema_sources(), &["/api/schema.graphql"]);
    }

    #[test]
    fn test_component_root_with_glob_metacharacters() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app[1]/schema.graphql", "type Query { ping: String }\n");
        write(dir.path(), "app1/decoy.graphql", "type Decoy { x: Int }\n");

        let registry = ResolverRegistry::new();
        let mut loader = ComponentLoader::new(&registry);
        loader
            .load_component(dir.path(), &ComponentConfig::new("app[1]").with_schemas("*.graphql"))
            .unwrap();
        assert_eq!(loader.finish().schema_sources(), &["/app[1]/schema.graphql"]);

        let mut loader = ComponentLoader::new(&registry);
        let handled = loader
            .discover(dir.path(), &ComponentConfig::new("app[1]"))
            .unwrap();
        assert_eq!(handled, 1);
        assert!(!loader.finish().sdl().contains("Decoy"));
    }

    #[test]
    fn test_missing_component_directory() {
        let dir = TempDir::new().unwrap();
        let registry = ResolverRegistry::new();
        let mut loader = ComponentLoader::new(&registry);
        let err = loader
            .load_component(dir.path(), &ComponentConfig::new("nope"))
            .unwrap_err();
        assert!(matches!(err, LoomError::Load(ref msg) if msg.contains("does not exist")));
    }

    #[test]
    fn test_url_path() {
        assert_eq!(
            url_path(Path::new("/srv/app"), Path::new("/srv/app/books/schema.graphql")),
            "/books/schema.graphql"
        );
        assert_eq!(
            url_path(Path::new("/srv/app"), Path::new("/srv/app/./books/r.rs")),
            "/books/r.rs"
        );
    }
}
