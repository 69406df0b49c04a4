//! Binding collection: which functions and which of their push subscriptions
//! get dead-letter wiring.
use tracing::debug;

use crate::declarations::{FunctionDeclaration, FunctionDeclarations};

/// One push subscription feeding a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSource {
    pub source_arn: String,
    /// Resolved flag: the event's own override, else the function's flag.
    pub dlq_enabled: bool,
}

/// A function and the push subscriptions that feed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBinding {
    /// Deployed function name, used for the queue name and function ARN.
    pub function_name: String,
    /// Declaration key, used to derive logical ids.
    pub display_name: String,
    pub event_sources: Vec<EventSource>,
    pub dlq_enabled: bool,
}

impl FunctionBinding {
    /// Builds the binding for one declaration.
    pub fn from_declaration(key: &str, declaration: &FunctionDeclaration) -> Self {
        let dlq_enabled = declaration.dlq_enabled();
        let mut event_sources: Vec<EventSource> = Vec::new();

        for sns in declaration.events.iter().filter_map(|event| event.sns.as_ref()) {
            let Some(source_arn) = sns.source_arn() else {
                debug!(function = key, "skipping sns event without a literal topic ARN");
                continue;
            };
            let enabled = sns.dlq_override().unwrap_or(dlq_enabled);
            // A topic declared twice is wired if any of its declarations asks for it.
            match event_sources.iter_mut().find(|s| s.source_arn == source_arn) {
                Some(existing) => existing.dlq_enabled |= enabled,
                None => event_sources.push(EventSource {
                    source_arn: source_arn.to_string(),
                    dlq_enabled: enabled,
                }),
            }
        }

        Self {
            function_name: declaration.deployed_name(key).to_string(),
            display_name: key.to_string(),
            event_sources,
            dlq_enabled,
        }
    }

    pub fn eligible_sources(&self) -> impl Iterator<Item = &EventSource> {
        self.event_sources.iter().filter(|source| source.dlq_enabled)
    }

    pub fn has_eligible_sources(&self) -> bool {
        self.eligible_sources().next().is_some()
    }
}

/// Collects the functions that get a dead-letter queue, in declaration order.
///
/// Functions left with no enabled push subscription are dropped here, so
/// nothing downstream ever creates a queue for them.
pub fn collect(declarations: &FunctionDeclarations) -> Vec<FunctionBinding> {
    declarations
        .iter()
        .map(|(key, declaration)| FunctionBinding::from_declaration(key, declaration))
        .filter(|binding| {
            let keep = binding.has_eligible_sources();
            if !keep {
                debug!(function = %binding.display_name, "no eligible event sources");
            }
            keep
        })
        .collect()
}
