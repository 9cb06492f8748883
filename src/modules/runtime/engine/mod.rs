//! Executable schema construction
//!
//! Turns the assembled SDL and resolver map into an `async-graphql` dynamic
//! schema. Type extensions are folded into their base definitions, every
//! field gets either its registered resolver or the default property
//! resolver, and directive definitions are accepted without enforcement.
//! The one exception is `@cacheControl`, whose hints feed the response's
//! `Cache-Control` header.

mod cache_control;
mod value;

pub use self::cache_control::CachePolicy;

use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, InputObject, InputValue, Interface, InterfaceField,
    Object, Scalar, Schema, TypeRef, Union,
};
use async_graphql::{Error, Value as GqlValue};
use async_graphql_parser::types::{
    BaseType, ConstDirective, EnumValueDefinition, FieldDefinition, InputValueDefinition,
    SchemaDefinition, TypeDefinition, TypeKind, TypeSystemDefinition,
};
use async_graphql_parser::Positioned;
use loomql_core::{CompiledSchema, GraphQLConfig, LoomError, Resolver};
use loomql_types::BridgedRequest;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use self::cache_control::{CacheHint, FieldPolicy};
use self::value::{args_json, parent_json, parent_property, to_field_value, NamedKind, TypeKinds};

/// Scalars the engine provides itself
const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];

/// Root operation type names
#[derive(Debug, Clone, PartialEq, Eq)]
struct Roots {
    query: String,
    mutation: Option<String>,
    subscription: Option<String>,
}

/// Compile the assembled schema into an executable one
pub fn build_schema(compiled: &CompiledSchema, config: &GraphQLConfig) -> Result<Schema, LoomError> {
    let document = async_graphql_parser::parse_schema(compiled.sdl())
        .map_err(|e| LoomError::SchemaBuild(format!("Failed to parse schema: {}", e)))?;

    let mut schema_definition: Option<SchemaDefinition> = None;
    let mut definitions: Vec<TypeDefinition> = Vec::new();
    let mut extensions: Vec<TypeDefinition> = Vec::new();

    for definition in document.definitions {
        match definition {
            TypeSystemDefinition::Schema(schema) => {
                let schema = schema.node;
                match schema_definition.as_mut() {
                    None => schema_definition = Some(schema),
                    Some(existing) if schema.extend => {
                        existing.query = schema.query.or(existing.query.take());
                        existing.mutation = schema.mutation.or(existing.mutation.take());
                        existing.subscription =
                            schema.subscription.or(existing.subscription.take());
                    }
                    Some(_) => {
                        return Err(LoomError::SchemaBuild(
                            "Schema defines more than one schema block".to_string(),
                        ))
                    }
                }
            }
            TypeSystemDefinition::Type(ty) if ty.node.extend => extensions.push(ty.node),
            TypeSystemDefinition::Type(ty) => {
                let name = ty.node.name.node.as_str();
                if definitions.iter().any(|d| d.name.node.as_str() == name) {
                    return Err(LoomError::SchemaBuild(format!(
                        "Type '{}' is defined more than once",
                        name
                    )));
                }
                definitions.push(ty.node);
            }
            TypeSystemDefinition::Directive(_) => {}
        }
    }

    for extension in extensions {
        let name = extension.name.node.to_string();
        let base = definitions
            .iter_mut()
            .find(|d| d.name.node.as_str() == name)
            .ok_or_else(|| {
                LoomError::SchemaBuild(format!("Cannot extend undefined type '{}'", name))
            })?;
        merge_extension(base, extension)?;
    }

    let roots = resolve_roots(schema_definition.as_ref(), &definitions)?;
    if let Some(subscription) = &roots.subscription {
        warn!(
            "Subscription type '{}' is registered but subscriptions are not served",
            subscription
        );
    }

    let kinds: Arc<TypeKinds> = Arc::new(
        definitions
            .iter()
            .map(|d| (d.name.node.to_string(), kind_of(&d.kind)))
            .collect(),
    );

    let type_hints: HashMap<&str, CacheHint> = definitions
        .iter()
        .filter_map(|d| {
            CacheHint::from_directives(&d.directives).map(|hint| (d.name.node.as_str(), hint))
        })
        .collect();
    let is_root = |name: &str| name == roots.query || roots.mutation.as_deref() == Some(name);

    let resolvers = compiled.resolvers();
    let mut builder = Schema::build(&roots.query, roots.mutation.as_deref(), None);
    let mut bound = 0usize;

    for definition in &definitions {
        let type_name = definition.name.node.as_str();
        let description = definition.description.as_ref().map(|d| d.node.clone());

        match &definition.kind {
            TypeKind::Scalar => {
                if BUILTIN_SCALARS.contains(&type_name) {
                    continue;
                }
                let mut scalar = Scalar::new(type_name);
                if let Some(description) = description {
                    scalar = scalar.description(description);
                }
                builder = builder.register(scalar);
            }
            TypeKind::Object(object_type) => {
                let mut object = Object::new(type_name);
                if let Some(description) = description {
                    object = object.description(description);
                }
                for interface in &object_type.implements {
                    object = object.implement(interface.node.as_str());
                }
                for field in &object_type.fields {
                    let field = &field.node;
                    let resolver = resolvers
                        .get(type_name, field.name.node.as_str())
                        .cloned();
                    if resolver.is_some() {
                        bound += 1;
                    }
                    let named = named_type(&field.ty.node);
                    let policy = FieldPolicy::resolve(
                        type_hints.get(named),
                        CacheHint::from_directives(&field.directives).as_ref(),
                        matches!(kinds.get(named), Some(NamedKind::Object | NamedKind::Abstract)),
                        is_root(type_name),
                    );
                    object = object.field(object_field(type_name, field, resolver, policy, &kinds));
                }
                builder = builder.register(object);
            }
            TypeKind::Interface(interface_type) => {
                let mut interface = Interface::new(type_name);
                if let Some(description) = description {
                    interface = interface.description(description);
                }
                for parent in &interface_type.implements {
                    interface = interface.implement(parent.node.as_str());
                }
                for field in &interface_type.fields {
                    interface = interface.field(interface_field(&field.node));
                }
                builder = builder.register(interface);
            }
            TypeKind::Union(union_type) => {
                let mut union = Union::new(type_name);
                if let Some(description) = description {
                    union = union.description(description);
                }
                for member in &union_type.members {
                    union = union.possible_type(member.node.as_str());
                }
                builder = builder.register(union);
            }
            TypeKind::Enum(enum_type) => {
                let mut enumeration = Enum::new(type_name);
                if let Some(description) = description {
                    enumeration = enumeration.description(description);
                }
                for value in &enum_type.values {
                    enumeration = enumeration.item(enum_item(&value.node));
                }
                builder = builder.register(enumeration);
            }
            TypeKind::InputObject(input_type) => {
                let mut input = InputObject::new(type_name);
                if let Some(description) = description {
                    input = input.description(description);
                }
                for field in &input_type.fields {
                    input = input.field(input_value(&field.node));
                }
                builder = builder.register(input);
            }
        }
    }

    warn_unbound_resolvers(compiled, &definitions);

    if let Some(depth) = config.max_depth {
        builder = builder.limit_depth(depth);
    }
    if let Some(complexity) = config.max_complexity {
        builder = builder.limit_complexity(complexity);
    }
    if !config.introspection() {
        builder = builder.disable_introspection();
    }

    let schema = builder
        .finish()
        .map_err(|e| LoomError::SchemaBuild(e.to_string()))?;

    debug!(
        "Built schema: {} types, {} bound resolvers",
        definitions.len(),
        bound
    );
    Ok(schema)
}

/// Fold an `extend` definition into its base definition
fn merge_extension(base: &mut TypeDefinition, extension: TypeDefinition) -> Result<(), LoomError> {
    let name = base.name.node.to_string();
    base.directives.extend(extension.directives);

    match (&mut base.kind, extension.kind) {
        (TypeKind::Scalar, TypeKind::Scalar) => {}
        (TypeKind::Object(base), TypeKind::Object(ext)) => {
            base.implements.extend(ext.implements);
            append_fields(&name, &mut base.fields, ext.fields)?;
        }
        (TypeKind::Interface(base), TypeKind::Interface(ext)) => {
            base.implements.extend(ext.implements);
            append_fields(&name, &mut base.fields, ext.fields)?;
        }
        (TypeKind::Union(base), TypeKind::Union(ext)) => base.members.extend(ext.members),
        (TypeKind::Enum(base), TypeKind::Enum(ext)) => {
            for value in ext.values {
                if base
                    .values
                    .iter()
                    .any(|v| v.node.value.node == value.node.value.node)
                {
                    return Err(LoomError::SchemaBuild(format!(
                        "Enum value '{}.{}' is defined more than once",
                        name, value.node.value.node
                    )));
                }
                base.values.push(value);
            }
        }
        (TypeKind::InputObject(base), TypeKind::InputObject(ext)) => {
            for field in ext.fields {
                if base.fields.iter().any(|f| f.node.name.node == field.node.name.node) {
                    return Err(LoomError::SchemaBuild(format!(
                        "Input field '{}.{}' is defined more than once",
                        name, field.node.name.node
                    )));
                }
                base.fields.push(field);
            }
        }
        _ => {
            return Err(LoomError::SchemaBuild(format!(
                "Extension of '{}' does not match the kind of its definition",
                name
            )))
        }
    }
    Ok(())
}

fn append_fields(
    type_name: &str,
    fields: &mut Vec<Positioned<FieldDefinition>>,
    extra: Vec<Positioned<FieldDefinition>>,
) -> Result<(), LoomError> {
    for field in extra {
        if fields.iter().any(|f| f.node.name.node == field.node.name.node) {
            return Err(LoomError::SchemaBuild(format!(
                "Field '{}.{}' is defined more than once",
                type_name, field.node.name.node
            )));
        }
        fields.push(field);
    }
    Ok(())
}

fn resolve_roots(
    schema: Option<&SchemaDefinition>,
    definitions: &[TypeDefinition],
) -> Result<Roots, LoomError> {
    let is_object = |name: &str| {
        definitions
            .iter()
            .any(|d| d.name.node.as_str() == name && matches!(d.kind, TypeKind::Object(_)))
    };

    let (query, mutation, subscription) = match schema {
        Some(schema) => (
            schema
                .query
                .as_ref()
                .map(|n| n.node.to_string())
                .unwrap_or_else(|| "Query".to_string()),
            schema.mutation.as_ref().map(|n| n.node.to_string()),
            schema.subscription.as_ref().map(|n| n.node.to_string()),
        ),
        None => (
            "Query".to_string(),
            Some("Mutation".to_string()).filter(|n| is_object(n)),
            Some("Subscription".to_string()).filter(|n| is_object(n)),
        ),
    };

    if !is_object(&query) {
        return Err(LoomError::SchemaBuild(format!(
            "Schema has no '{}' query type",
            query
        )));
    }
    if let Some(mutation) = &mutation {
        if !is_object(mutation) {
            return Err(LoomError::SchemaBuild(format!(
                "Mutation type '{}' is not defined",
                mutation
            )));
        }
    }

    Ok(Roots {
        query,
        mutation,
        subscription,
    })
}

fn kind_of(kind: &TypeKind) -> NamedKind {
    match kind {
        TypeKind::Object(_) => NamedKind::Object,
        TypeKind::Interface(_) | TypeKind::Union(_) => NamedKind::Abstract,
        TypeKind::Enum(_) => NamedKind::Enum,
        TypeKind::Scalar => NamedKind::Scalar,
        TypeKind::InputObject(_) => NamedKind::Input,
    }
}

fn named_type(ty: &async_graphql_parser::types::Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => named_type(inner),
    }
}

fn type_ref(ty: &async_graphql_parser::types::Type) -> TypeRef {
    let base = match &ty.base {
        BaseType::Named(name) => TypeRef::Named(name.to_string().into()),
        BaseType::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
    };
    if ty.nullable {
        base
    } else {
        TypeRef::NonNull(Box::new(base))
    }
}

/// Reason given by `@deprecated`, if the directive is present
fn deprecation(directives: &[Positioned<ConstDirective>]) -> Option<Option<String>> {
    directives
        .iter()
        .find(|d| d.node.name.node.as_str() == "deprecated")
        .map(|d| match d.node.get_argument("reason").map(|r| &r.node) {
            Some(GqlValue::String(reason)) => Some(reason.clone()),
            _ => None,
        })
}

fn object_field(
    type_name: &str,
    definition: &FieldDefinition,
    resolver: Option<Resolver>,
    policy: FieldPolicy,
    kinds: &Arc<TypeKinds>,
) -> Field {
    let type_name: Arc<str> = Arc::from(type_name);
    let field_name: Arc<str> = Arc::from(definition.name.node.as_str());
    let ty = definition.ty.node.clone();
    let kinds = Arc::clone(kinds);

    let mut field = Field::new(
        definition.name.node.to_string(),
        type_ref(&definition.ty.node),
        move |ctx| {
            let resolver = resolver.clone();
            let type_name = Arc::clone(&type_name);
            let field_name = Arc::clone(&field_name);
            let ty = ty.clone();
            let kinds = Arc::clone(&kinds);

            FieldFuture::new(async move {
                if let Some(cache) = ctx.data_opt::<Arc<CachePolicy>>() {
                    cache.restrict(&policy);
                }
                let value = match resolver {
                    Some(resolver) => {
                        let call = loomql_core::ResolverCall {
                            type_name: type_name.to_string(),
                            field_name: field_name.to_string(),
                            parent: parent_json(&ctx),
                            args: args_json(&ctx)?,
                            request: ctx.data_opt::<Arc<BridgedRequest>>().cloned(),
                        };
                        let json = resolver(call).await.map_err(|e| Error::new(e.to_string()))?;
                        GqlValue::from_json(json).map_err(|e| {
                            Error::new(format!(
                                "Resolver for '{}.{}' returned an invalid value: {}",
                                type_name, field_name, e
                            ))
                        })?
                    }
                    None => parent_property(&ctx, &field_name),
                };
                to_field_value(value, &ty, &kinds)
            })
        },
    );

    for argument in &definition.arguments {
        field = field.argument(input_value(&argument.node));
    }
    if let Some(description) = &definition.description {
        field = field.description(description.node.clone());
    }
    if let Some(reason) = deprecation(&definition.directives) {
        field = field.deprecation(reason.as_deref());
    }
    field
}

fn interface_field(definition: &FieldDefinition) -> InterfaceField {
    let mut field = InterfaceField::new(
        definition.name.node.to_string(),
        type_ref(&definition.ty.node),
    );
    for argument in &definition.arguments {
        field = field.argument(input_value(&argument.node));
    }
    if let Some(description) = &definition.description {
        field = field.description(description.node.clone());
    }
    if let Some(reason) = deprecation(&definition.directives) {
        field = field.deprecation(reason.as_deref());
    }
    field
}

fn input_value(definition: &InputValueDefinition) -> InputValue {
    let mut input = InputValue::new(
        definition.name.node.to_string(),
        type_ref(&definition.ty.node),
    );
    if let Some(default) = &definition.default_value {
        input = input.default_value(default.node.clone());
    }
    if let Some(description) = &definition.description {
        input = input.description(description.node.clone());
    }
    input
}

fn enum_item(definition: &EnumValueDefinition) -> EnumItem {
    let mut item = EnumItem::new(definition.value.node.to_string());
    if let Some(description) = &definition.description {
        item = item.description(description.node.clone());
    }
    if let Some(reason) = deprecation(&definition.directives) {
        item = item.deprecation(reason.as_deref());
    }
    item
}

/// Resolvers for fields the schema does not declare are never called
fn warn_unbound_resolvers(compiled: &CompiledSchema, definitions: &[TypeDefinition]) {
    let declared: HashMap<&str, Vec<&str>> = definitions
        .iter()
        .filter_map(|d| match &d.kind {
            TypeKind::Object(object) => Some((
                d.name.node.as_str(),
                object.fields.iter().map(|f| f.node.name.node.as_str()).collect(),
            )),
            _ => None,
        })
        .collect();

    for qualified in compiled.resolvers().qualified_names() {
        let Some((type_name, field_name)) = qualified.split_once('.') else {
            continue;
        };
        let known = declared
            .get(type_name)
            .map(|fields| fields.contains(&field_name))
            .unwrap_or(false);
        if !known {
            warn!(
                "Resolver '{}' does not match any field in the schema",
                qualified
            );
        }
    }
}
