//! `@cacheControl` hints and the per-request cache policy they produce
//!
//! Hints are read from type and field definitions while the schema is built
//! and folded into one [`FieldPolicy`] per object field. Every resolved field
//! then narrows the request's [`CachePolicy`]: the lowest `maxAge` wins and a
//! single `PRIVATE` field makes the whole response private.

use async_graphql::Value as GqlValue;
use async_graphql_parser::types::ConstDirective;
use async_graphql_parser::Positioned;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const UNSET: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheScope {
    Public,
    Private,
}

/// Arguments of one `@cacheControl` directive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CacheHint {
    pub max_age: Option<u64>,
    pub scope: Option<CacheScope>,
    pub inherit_max_age: bool,
}

impl CacheHint {
    /// The `@cacheControl` hint among `directives`, if any
    pub fn from_directives(directives: &[Positioned<ConstDirective>]) -> Option<Self> {
        let directive = directives
            .iter()
            .find(|d| d.node.name.node.as_str() == "cacheControl")?;
        let argument = |name: &str| directive.node.get_argument(name).map(|v| &v.node);

        let max_age = match argument("maxAge") {
            Some(GqlValue::Number(n)) => n.as_u64(),
            _ => None,
        };
        let scope = match argument("scope") {
            Some(GqlValue::Enum(scope)) if scope.as_str() == "PRIVATE" => Some(CacheScope::Private),
            Some(GqlValue::Enum(scope)) if scope.as_str() == "PUBLIC" => Some(CacheScope::Public),
            _ => None,
        };
        let inherit_max_age = matches!(argument("inheritMaxAge"), Some(GqlValue::Boolean(true)));

        Some(Self {
            max_age,
            scope,
            inherit_max_age,
        })
    }
}

/// Contribution of one field to the request policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FieldPolicy {
    /// `None` inherits the parent's age and does not narrow the policy
    pub max_age: Option<u64>,
    pub private: bool,
}

impl FieldPolicy {
    /// Combine the hints that apply to one field.
    ///
    /// Composite return types contribute their type hint; the field hint
    /// overrides it. Root fields and composite fields without a `maxAge`
    /// (and not inheriting one) are uncacheable.
    pub fn resolve(
        type_hint: Option<&CacheHint>,
        field_hint: Option<&CacheHint>,
        composite: bool,
        root: bool,
    ) -> Self {
        let mut max_age = None;
        let mut scope = None;
        let mut inherit = false;

        if composite {
            if let Some(hint) = type_hint {
                max_age = hint.max_age;
                scope = hint.scope;
                inherit = hint.inherit_max_age;
            }
        }

        if let Some(hint) = field_hint {
            if hint.inherit_max_age {
                inherit = inherit || max_age.is_none();
            } else if hint.max_age.is_some() {
                max_age = hint.max_age;
            }
            if hint.scope.is_some() {
                scope = hint.scope;
            }
        }

        if max_age.is_none() && (composite || root) && !inherit {
            max_age = Some(0);
        }

        Self {
            max_age,
            private: scope == Some(CacheScope::Private),
        }
    }
}

/// Cache policy accumulated while one request executes
#[derive(Debug)]
pub struct CachePolicy {
    max_age: AtomicU64,
    private: AtomicBool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_age: AtomicU64::new(UNSET),
            private: AtomicBool::new(false),
        }
    }
}

impl CachePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn restrict(&self, field: &FieldPolicy) {
        if let Some(max_age) = field.max_age {
            self.max_age.fetch_min(max_age, Ordering::Relaxed);
        }
        if field.private {
            self.private.store(true, Ordering::Relaxed);
        }
    }

    /// Seconds the response may be cached, if it is cacheable at all
    pub fn max_age(&self) -> Option<u64> {
        match self.max_age.load(Ordering::Relaxed) {
            UNSET | 0 => None,
            max_age => Some(max_age),
        }
    }

    pub fn is_private(&self) -> bool {
        self.private.load(Ordering::Relaxed)
    }

    /// `Cache-Control` value for a successful response
    pub fn header_value(&self) -> String {
        match self.max_age() {
            Some(max_age) => format!(
                "max-age={}, {}",
                max_age,
                if self.is_private() { "private" } else { "public" }
            ),
            None => "no-store".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(max_age: Option<u64>, scope: Option<CacheScope>, inherit_max_age: bool) -> CacheHint {
        CacheHint {
            max_age,
            scope,
            inherit_max_age,
        }
    }

    #[test]
    fn test_hint_from_directives() {
        let document = async_graphql_parser::parse_schema(
            "type Query { a: String @cacheControl(maxAge: 30, scope: PRIVATE) b: String }",
        )
        .unwrap();
        let async_graphql_parser::types::TypeSystemDefinition::Type(ty) = &document.definitions[0]
        else {
            panic!("expected a type definition");
        };
        let async_graphql_parser::types::TypeKind::Object(object) = &ty.node.kind else {
            panic!("expected an object");
        };

        assert_eq!(
            CacheHint::from_directives(&object.fields[0].node.directives),
            Some(hint(Some(30), Some(CacheScope::Private), false))
        );
        assert_eq!(CacheHint::from_directives(&object.fields[1].node.directives), None);
    }

    #[test]
    fn test_field_policy_defaults() {
        // Root and composite fields without hints are uncacheable
        assert_eq!(FieldPolicy::resolve(None, None, false, true).max_age, Some(0));
        assert_eq!(FieldPolicy::resolve(None, None, true, false).max_age, Some(0));
        // Nested scalars inherit
        assert_eq!(FieldPolicy::resolve(None, None, false, false).max_age, None);
    }

    #[test]
    fn test_field_hint_overrides_type_hint() {
        let type_hint = hint(Some(120), Some(CacheScope::Private), false);
        let field_hint = hint(Some(10), Some(CacheScope::Public), false);
        let policy = FieldPolicy::resolve(Some(&type_hint), Some(&field_hint), true, true);
        assert_eq!(policy, FieldPolicy { max_age: Some(10), private: false });

        // Type hints only apply to composite return types
        let policy = FieldPolicy::resolve(Some(&type_hint), None, false, false);
        assert_eq!(policy, FieldPolicy::default());

        let inherit = hint(None, None, true);
        assert_eq!(
            FieldPolicy::resolve(None, Some(&inherit), true, false).max_age,
            None
        );
    }

    #[test]
    fn test_policy_takes_lowest_age_and_private_scope() {
        let policy = CachePolicy::new();
        assert_eq!(policy.header_value(), "no-store");

        policy.restrict(&FieldPolicy { max_age: Some(60), private: false });
        assert_eq!(policy.header_value(), "max-age=60, public");

        policy.restrict(&FieldPolicy { max_age: None, private: true });
        policy.restrict(&FieldPolicy { max_age: Some(30), private: false });
        assert_eq!(policy.header_value(), "max-age=30, private");

        policy.restrict(&FieldPolicy { max_age: Some(0), private: false });
        assert_eq!(policy.header_value(), "no-store");
    }
}
