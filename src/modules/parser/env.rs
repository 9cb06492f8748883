//! Environment variable substitution

use loomql_core::LoomError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Placeholder pattern: {{ env.VAR_NAME }}
static ENV_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid env pattern")
});

/// Replaces `{{ env.NAME }}` placeholders in configuration text
pub struct EnvSubstitutor {
    /// Fail on missing variables instead of leaving the placeholder
    strict: bool,
}

impl EnvSubstitutor {
    /// Strict substitutor (missing variables are an error)
    pub fn new() -> Self {
        Self { strict: true }
    }

    /// Lenient substitutor (missing variables keep their placeholder)
    pub fn lenient() -> Self {
        Self { strict: false }
    }

    /// Substitute from the process environment, after loading `.env` if present
    pub fn substitute(&self, content: &str) -> Result<String, LoomError> {
        let _ = dotenvy::dotenv();
        self.substitute_with(content, |name| std::env::var(name).ok())
    }

    /// Substitute using `lookup` to resolve variable names
    pub fn substitute_with<F>(&self, content: &str, lookup: F) -> Result<String, LoomError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing: Vec<String> = Vec::new();

        let result = ENV_PATTERN.replace_all(content, |cap: &Captures<'_>| {
            let name = &cap[1];
            match lookup(name) {
                Some(value) => value,
                None => {
                    if !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                    cap[0].to_string()
                }
            }
        });

        if self.strict && !missing.is_empty() {
            return Err(LoomError::EnvVarNotFound(missing.join(", ")));
        }

        Ok(result.into_owned())
    }

    /// Check if a string contains placeholders
    pub fn has_placeholders(content: &str) -> bool {
        ENV_PATTERN.is_match(content)
    }

    /// Variable names referenced by a string, in order of appearance
    pub fn extract_var_names(content: &str) -> Vec<String> {
        ENV_PATTERN
            .captures_iter(content)
            .map(|cap| cap[1].to_string())
            .collect()
    }
}

impl Default for EnvSubstitutor {
    fn default() -> Self {
        Self::new()
    }
}
