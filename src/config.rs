//! Deploy configuration.
//!
//! A YAML file naming the target account and region plus the serverless-style
//! `functions` map. Environment variables are expanded before parsing:
//!
//! - `$VAR` or `${VAR}`: the variable's value, an error if it is unset
//! - `${VAR:-default}`: `default` if VAR is unset or empty
//! - `${VAR-default}`: `default` only if VAR is unset
//! - `$$`: a literal `$`
//!
//! ```yaml
//! account_id: ${AWS_ACCOUNT_ID}
//! region: ${AWS_REGION:-us-east-1}
//! functions:
//!   hello:
//!     name: svc-dev-hello
//!     events:
//!       - sns: arn:aws:sns:us-east-1:111111111111:orders
//! ```
use regex::{Captures, Regex};
use serde::Deserialize;
use std::path::Path;
use std::sync::LazyLock;

use crate::declarations::FunctionDeclarations;
use crate::error::ConfigError;
use crate::naming::DeployTarget;
use crate::transform::TransformOptions;

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?:(:?-)([^}]*))?\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("Invalid environment reference pattern")
});

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub region: String,
    #[serde(default = "default_failure_destination")]
    pub failure_destination: bool,
    #[serde(default)]
    pub functions: FunctionDeclarations,
}

fn default_failure_destination() -> bool {
    true
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Expands environment references, parses, and checks the identity.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let expanded = interpolate(contents, |name| std::env::var(name).ok())?;
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.account_id.trim().is_empty() {
            return Err(ConfigError::MissingIdentity { field: "account_id" });
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::MissingIdentity { field: "region" });
        }
        Ok(())
    }

    pub fn target(&self) -> DeployTarget {
        DeployTarget::new(self.account_id.trim(), self.region.trim())
    }

    pub fn options(&self) -> TransformOptions {
        TransformOptions {
            failure_destination: self.failure_destination,
        }
    }
}

/// Expands environment references in `input` using `lookup`.
///
/// Every unresolved reference is reported, not just the first.
pub fn interpolate<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    let expanded = ENV_REFERENCE.replace_all(input, |caps: &Captures| {
        let Some(name) = caps.get(1).or_else(|| caps.get(4)) else {
            return "$".to_string();
        };
        let name = name.as_str();
        let default = caps.get(3).map(|m| m.as_str());
        let empty_counts_as_unset = caps.get(2).is_some_and(|m| m.as_str() == ":-");

        match lookup(name) {
            Some(value) if value.contains('\n') || value.contains('\r') => {
                errors.push(format!("environment variable '{name}' contains a newline"));
                String::new()
            }
            Some(value) if value.is_empty() && empty_counts_as_unset => {
                default.unwrap_or_default().to_string()
            }
            Some(value) => value,
            None => match default {
                Some(default) => default.to_string(),
                None => {
                    errors.push(format!("environment variable '{name}' is not set"));
                    String::new()
                }
            },
        }
    });

    if !errors.is_empty() {
        return Err(ConfigError::EnvInterpolation {
            message: errors.join("\n"),
        });
    }
    Ok(expanded.into_owned())
}
