//! Resolver functions, resolver maps, and the module registry
//!
//! A [`ResolverMap`] binds `Type.field` pairs to async resolver functions.
//! Maps are contributed by [`ResolverModule`]s, which the host registers in a
//! [`ResolverRegistry`] under the specifier a component refers to them by.

use futures::future::BoxFuture;
use loomql_types::BridgedRequest;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::LoomError;

/// Everything a resolver receives for one field invocation
#[derive(Debug, Clone)]
pub struct ResolverCall {
    /// Parent object type name
    pub type_name: String,
    /// Field being resolved
    pub field_name: String,
    /// Value the parent resolver produced (`null` for root fields)
    pub parent: Value,
    /// Field arguments, coerced by the engine
    pub args: Map<String, Value>,
    /// Transport request the operation arrived on
    pub request: Option<Arc<BridgedRequest>>,
}

impl ResolverCall {
    /// Look up an argument
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Look up a request header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.as_ref().and_then(|r| r.header(name))
    }
}

/// Future returned by a resolver
pub type ResolverFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// Shared resolver function
pub type Resolver = Arc<dyn Fn(ResolverCall) -> ResolverFuture + Send + Sync>;

/// Wrap an async function as a [`Resolver`]
pub fn resolver<F, Fut>(f: F) -> Resolver
where
    F: Fn(ResolverCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move |call| -> ResolverFuture { Box::pin(f(call)) })
}

/// Resolver that always yields `value`
pub fn constant(value: Value) -> Resolver {
    Arc::new(move |_| -> ResolverFuture {
        let value = value.clone();
        Box::pin(async move { Ok(value) })
    })
}

/// Type name -> field name -> resolver
#[derive(Clone, Default)]
pub struct ResolverMap {
    types: BTreeMap<String, BTreeMap<String, Resolver>>,
}

impl ResolverMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a resolver, returning the one it replaced
    pub fn insert(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: Resolver,
    ) -> Option<Resolver> {
        self.types
            .entry(type_name.into())
            .or_default()
            .insert(field_name.into(), resolver)
    }

    /// Builder form of [`ResolverMap::insert`]
    pub fn with(
        mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: Resolver,
    ) -> Self {
        self.insert(type_name, field_name, resolver);
        self
    }

    /// Look up the resolver for `type_name.field_name`
    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&Resolver> {
        self.types.get(type_name).and_then(|f| f.get(field_name))
    }

    /// Returns true if `type_name.field_name` has a resolver
    pub fn contains(&self, type_name: &str, field_name: &str) -> bool {
        self.get(type_name, field_name).is_some()
    }

    /// Type names with at least one resolver
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Qualified `Type.field` names, sorted
    pub fn qualified_names(&self) -> Vec<String> {
        self.types
            .iter()
            .flat_map(|(ty, fields)| fields.keys().map(move |f| format!("{}.{}", ty, f)))
            .collect()
    }

    /// Number of bound fields
    pub fn len(&self) -> usize {
        self.types.values().map(BTreeMap::len).sum()
    }

    /// Returns true if no field is bound
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge `other` into `self`; fields already bound are overwritten.
    ///
    /// Returns the qualified names that were overwritten.
    pub fn merge(&mut self, other: &ResolverMap) -> Vec<String> {
        let mut overwritten = Vec::new();
        for (type_name, fields) in &other.types {
            let target = self.types.entry(type_name.clone()).or_default();
            for (field_name, resolver) in fields {
                if target.insert(field_name.clone(), resolver.clone()).is_some() {
                    overwritten.push(format!("{}.{}", type_name, field_name));
                }
            }
        }
        overwritten
    }

    /// Build constant resolvers from `{"Type": {"field": value}}`
    pub fn from_static(document: &Value) -> Result<Self, LoomError> {
        let types = document.as_object().ok_or_else(|| {
            LoomError::Load("Static resolvers must be a JSON object keyed by type name".to_string())
        })?;

        let mut map = Self::new();
        for (type_name, fields) in types {
            let fields = fields.as_object().ok_or_else(|| {
                LoomError::Load(format!(
                    "Static resolvers for type '{}' must be an object keyed by field name",
                    type_name
                ))
            })?;
            for (field_name, value) in fields {
                map.insert(type_name.clone(), field_name.clone(), constant(value.clone()));
            }
        }
        Ok(map)
    }
}

impl fmt::Debug for ResolverMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverMap")
            .field("fields", &self.qualified_names())
            .finish()
    }
}

/// What a resolver module exports
#[derive(Debug, Clone, Default)]
pub struct ModuleExports {
    /// Default export; preferred when present
    pub default: Option<ResolverMap>,
    /// Named exports, used when there is no default export
    pub named: ResolverMap,
}

impl ModuleExports {
    /// Exports with a default map only
    pub fn default_export(map: ResolverMap) -> Self {
        Self {
            default: Some(map),
            named: ResolverMap::new(),
        }
    }

    /// Exports with named bindings only
    pub fn named(map: ResolverMap) -> Self {
        Self {
            default: None,
            named: map,
        }
    }

    /// Resolvers to merge: the default export, else the named bag
    pub fn into_resolvers(self) -> ResolverMap {
        self.default.unwrap_or(self.named)
    }
}

/// A compiled-in source of resolvers
pub trait ResolverModule: Send + Sync {
    /// Produce this module's exports
    fn exports(&self) -> ModuleExports;
}

impl<F> ResolverModule for F
where
    F: Fn() -> ModuleExports + Send + Sync,
{
    fn exports(&self) -> ModuleExports {
        self()
    }
}

/// Specifier -> resolver module table, filled once at startup
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    modules: HashMap<String, Arc<dyn ResolverModule>>,
}

impl ResolverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under `specifier` (e.g. `books/resolvers.rs`)
    pub fn register(
        &mut self,
        specifier: &str,
        module: impl ResolverModule + 'static,
    ) -> &mut Self {
        self.modules
            .insert(Self::normalize(specifier), Arc::new(module));
        self
    }

    /// Builder form of [`ResolverRegistry::register`]
    pub fn with_module(mut self, specifier: &str, module: impl ResolverModule + 'static) -> Self {
        self.register(specifier, module);
        self
    }

    /// Look up a module by specifier
    pub fn resolve(&self, specifier: &str) -> Option<Arc<dyn ResolverModule>> {
        self.modules.get(&Self::normalize(specifier)).cloned()
    }

    /// Registered specifiers, sorted
    pub fn specifiers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Canonical specifier form: forward slashes, no leading `./` or `/`
    pub fn normalize(specifier: &str) -> String {
        let unified = specifier.replace('\\', "/");
        let mut rest = unified.as_str();
        loop {
            if let Some(stripped) = rest.strip_prefix("./") {
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix('/') {
                rest = stripped;
            } else {
                break;
            }
        }
        rest.to_string()
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("modules", &self.specifiers())
            .finish()
    }
}
