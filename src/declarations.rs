//! Serverless-style function declarations.
//!
//! Only the keys that decide dead-letter wiring are typed. Every other event
//! kind and event key is kept as raw JSON so declarations round-trip intact.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Function declarations keyed by their declaration key.
pub type FunctionDeclarations = IndexMap<String, FunctionDeclaration>;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    /// Deployed function name. Falls back to the declaration key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "setDlq", skip_serializing_if = "Option::is_none")]
    pub enable_dlq: Option<bool>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub environment: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventDeclaration>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl FunctionDeclaration {
    pub fn deployed_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(key)
    }

    /// Function-level flag; the feature is on unless explicitly disabled.
    pub fn dlq_enabled(&self) -> bool {
        self.enable_dlq.unwrap_or(true)
    }
}

/// One entry of a function's `events` list.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct EventDeclaration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sns: Option<SnsEvent>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// `sns:` accepts a bare topic name or ARN, or a detailed mapping.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SnsEvent {
    Topic(String),
    Detailed(SnsEventDetails),
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnsEventDetails {
    /// A plain string ARN, or an intrinsic function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,
    #[serde(default, alias = "setDlq", skip_serializing_if = "Option::is_none")]
    pub enable_dlq: Option<bool>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl SnsEvent {
    /// The literal source ARN, when the event names an existing topic by ARN.
    pub fn source_arn(&self) -> Option<&str> {
        match self {
            SnsEvent::Topic(topic) => topic.starts_with("arn:").then_some(topic.as_str()),
            SnsEvent::Detailed(details) => details.arn.as_ref()?.as_str(),
        }
    }

    /// Per-event override of the function-level flag.
    pub fn dlq_override(&self) -> Option<bool> {
        match self {
            SnsEvent::Topic(_) => None,
            SnsEvent::Detailed(details) => details.enable_dlq,
        }
    }
}
