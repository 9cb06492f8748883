//! Conversions between resolver JSON and engine values

use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::{Error, Name, Value as GqlValue};
use async_graphql_parser::types::{BaseType, Type};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// What a named type is, as far as output conversion cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NamedKind {
    Object,
    Abstract,
    Enum,
    Scalar,
    Input,
}

/// Type name -> kind, for every type in the schema
pub(crate) type TypeKinds = HashMap<String, NamedKind>;

/// Parent value of the field being resolved, as JSON
pub(crate) fn parent_json(ctx: &ResolverContext<'_>) -> Value {
    ctx.parent_value
        .as_value()
        .and_then(|v| v.clone().into_json().ok())
        .unwrap_or(Value::Null)
}

/// Field arguments as a JSON object
pub(crate) fn args_json(ctx: &ResolverContext<'_>) -> Result<Map<String, Value>, Error> {
    let mut args = Map::new();
    for (name, value) in ctx.args.iter() {
        let json = value
            .as_value()
            .clone()
            .into_json()
            .map_err(|e| Error::new(format!("Argument '{}' is not representable: {}", name, e)))?;
        args.insert(name.to_string(), json);
    }
    Ok(args)
}

/// Same-named property of the parent object
pub(crate) fn parent_property(ctx: &ResolverContext<'_>, field_name: &str) -> GqlValue {
    match ctx.parent_value.as_value() {
        Some(GqlValue::Object(map)) => map
            .get(&Name::new(field_name))
            .cloned()
            .unwrap_or(GqlValue::Null),
        _ => GqlValue::Null,
    }
}

/// Shape a resolved value for the engine according to the field's type.
///
/// Enum strings become enum values; values of interface or union type must
/// name their concrete type in `__typename`.
pub(crate) fn to_field_value<'a>(
    value: GqlValue,
    ty: &Type,
    kinds: &TypeKinds,
) -> Result<Option<FieldValue<'a>>, Error> {
    if matches!(value, GqlValue::Null) {
        return Ok(None);
    }

    match &ty.base {
        BaseType::List(inner) => {
            let GqlValue::List(items) = value else {
                return Err(Error::new(format!("Expected a list for type {}", ty)));
            };
            let items = items
                .into_iter()
                .map(|item| Ok(to_field_value(item, inner, kinds)?.unwrap_or(FieldValue::NULL)))
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(Some(FieldValue::list(items)))
        }
        BaseType::Named(name) => match kinds.get(name.as_str()) {
            Some(NamedKind::Enum) => Ok(Some(FieldValue::value(match value {
                GqlValue::String(s) => GqlValue::Enum(Name::new(s)),
                other => other,
            }))),
            Some(NamedKind::Abstract) => {
                let type_name = typename_of(&value).ok_or_else(|| {
                    Error::new(format!(
                        "Value returned for abstract type '{}' has no __typename",
                        name
                    ))
                })?;
                Ok(Some(FieldValue::value(value).with_type(type_name)))
            }
            _ => Ok(Some(FieldValue::value(value))),
        },
    }
}

fn typename_of(value: &GqlValue) -> Option<String> {
    match value {
        GqlValue::Object(map) => match map.get(&Name::new("__typename")) {
            Some(GqlValue::String(s)) => Some(s.clone()),
            Some(GqlValue::Enum(s)) => Some(s.to_string()),
            _ => None,
        },
        _ => None,
    }
}
