//! Error types for template wiring and configuration loading.
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a dead-letter wiring pass.
///
/// None of these are transient. A pass that returns one of them must not hand
/// any part of its template back to the deployment.
#[derive(Debug, Error)]
pub enum DlqError {
    #[error("queue name '{name}' is {length} characters long; SQS allows at most {max}")]
    QueueNameTooLong {
        name: String,
        length: usize,
        max: usize,
    },

    #[error("resource '{logical_id}' ({expected}) is missing from the template")]
    MissingResource {
        logical_id: String,
        expected: &'static str,
    },

    #[error("resource '{logical_id}' has type '{found}', expected '{expected}'")]
    UnexpectedResourceKind {
        logical_id: String,
        expected: &'static str,
        found: String,
    },

    #[error("property '{path}' of resource '{logical_id}' is not an object")]
    PropertyShape { logical_id: String, path: String },

    #[error("'{arn}' is not a valid ARN")]
    MalformedArn { arn: String },

    #[error("failed to serialize resource properties")]
    Serialize(#[from] serde_json::Error),
}

impl DlqError {
    /// True when the failure comes from user configuration rather than from
    /// resources the deployment was expected to have generated already.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DlqError::QueueNameTooLong { .. } | DlqError::MalformedArn { .. }
        )
    }
}

/// Errors raised while loading the deploy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in config")]
    Yaml(#[from] serde_yaml::Error),

    #[error("environment interpolation failed:\n{message}")]
    EnvInterpolation { message: String },

    #[error("'{field}' must be set to a non-empty value")]
    MissingIdentity { field: &'static str },
}
