//! YAML configuration parser

use loomql_core::{ComponentConfig, LoomError, Model};
use serde_yaml::{Mapping, Value};

use crate::env::EnvSubstitutor;

/// YAML parser for LoomQL configuration files
pub struct YamlParser;

/// Port keys accepted as either numbers or numeric strings
const PORT_KEYS: &[&str] = &["port", "secure_port"];

impl YamlParser {
    /// Parse a YAML string into a Model, substituting `{{ env.VAR }}` first
    pub fn parse(content: &str) -> Result<Model, LoomError> {
        let substituted = EnvSubstitutor::new().substitute(content)?;
        Self::parse_raw(&substituted)
    }

    /// Parse a YAML string without environment variable substitution
    pub fn parse_raw(content: &str) -> Result<Model, LoomError> {
        let mut document: Value = serde_yaml::from_str(content)
            .map_err(|e| LoomError::Config(format!("YAML parse error: {}", e)))?;

        let root = document.as_mapping_mut().ok_or_else(|| {
            LoomError::Config("Configuration must be a YAML mapping".to_string())
        })?;
        normalize(root)?;

        serde_yaml::from_value::<Model>(document)
            .map_err(|e| LoomError::Config(format!("Invalid configuration: {}", e)))
    }
}

/// Rewrite permissive forms into the canonical model shape
fn normalize(root: &mut Mapping) -> Result<(), LoomError> {
    lift_shorthand_component(root);

    if let Some(server) = root.get_mut("server").and_then(Value::as_mapping_mut) {
        coerce_ports(server, "server")?;
    }

    if let Some(components) = root.get_mut("components").and_then(Value::as_sequence_mut) {
        for (index, component) in components.iter_mut().enumerate() {
            match component {
                // `- ./books` is shorthand for `- path: ./books`
                Value::String(path) => {
                    let mut mapping = Mapping::new();
                    mapping.insert(Value::from("path"), Value::from(path.clone()));
                    *component = Value::Mapping(mapping);
                }
                Value::Mapping(mapping) => {
                    coerce_ports(mapping, &format!("components[{}]", index))?;
                }
                _ => {
                    return Err(LoomError::Config(format!(
                        "components[{}] must be a path or a mapping",
                        index
                    )))
                }
            }
        }
    }

    Ok(())
}

/// Top-level `resolvers`/`schemas` without a `components` list describe a
/// single component rooted next to the configuration file
fn lift_shorthand_component(root: &mut Mapping) {
    if root.contains_key("components") {
        return;
    }

    let resolvers = root.remove("resolvers");
    let schemas = root.remove("schemas");
    if resolvers.is_none() && schemas.is_none() {
        return;
    }

    let mut component = Mapping::new();
    component.insert(Value::from("path"), Value::from("."));
    if let Some(resolvers) = resolvers {
        component.insert(Value::from("resolvers"), resolvers);
    }
    if let Some(schemas) = schemas {
        component.insert(Value::from("schemas"), schemas);
    }
    root.insert(
        Value::from("components"),
        Value::Sequence(vec![Value::Mapping(component)]),
    );
}

/// Accept `port: "4000"` (common after env substitution) as `port: 4000`
fn coerce_ports(mapping: &mut Mapping, scope: &str) -> Result<(), LoomError> {
    for key in PORT_KEYS {
        let Some(value) = mapping.get_mut(*key) else {
            continue;
        };
        if let Value::String(text) = value {
            let port: u16 = text.trim().parse().map_err(|_| {
                LoomError::Config(format!("{}.{} is not a valid port: '{}'", scope, key, text))
            })?;
            *value = Value::Number(port.into());
        }
    }
    Ok(())
}

/// Serialize a model back to YAML
pub fn to_yaml(model: &Model) -> Result<String, LoomError> {
    serde_yaml::to_string(model)
        .map_err(|e| LoomError::Config(format!("Failed to serialize configuration: {}", e)))
}

/// Component list for a model, defaulting to whole-tree discovery of `.`
pub fn effective_components(model: &Model) -> Vec<ComponentConfig> {
    if model.components.is_empty() {
        vec![ComponentConfig::new(".")]
    } else {
        model.components.clone()
    }
}
