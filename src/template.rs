//! In-memory CloudFormation template.
//!
//! Resources keep their declaration order and every key this crate does not
//! know about is carried through untouched.
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::{Map, Value};

use crate::error::DlqError;
use crate::json_utils::{object_at_path_mut, value_at_path};

const ENVIRONMENT_VARIABLES: [&str; 2] = ["Environment", "Variables"];
const REDRIVE_POLICY: &str = "RedrivePolicy";
const DEAD_LETTER_TARGET_ARN: &str = "deadLetterTargetArn";

/// A single template resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Properties", default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    /// `DependsOn`, `Condition`, `DeletionPolicy` and anything else.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource {
    pub fn new(kind: impl Into<String>, properties: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            properties,
            extra: Map::new(),
        }
    }

    pub fn environment_variable(&self, key: &str) -> Option<&Value> {
        value_at_path(&self.properties, &[ENVIRONMENT_VARIABLES[0], ENVIRONMENT_VARIABLES[1], key])
    }

    /// Adds or overwrites one environment variable, keeping all others.
    pub fn set_environment_variable(
        &mut self,
        logical_id: &str,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), DlqError> {
        let variables = object_at_path_mut(&mut self.properties, &ENVIRONMENT_VARIABLES)
            .map_err(|e| DlqError::PropertyShape {
                logical_id: logical_id.to_string(),
                path: e.path,
            })?;
        variables.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Target ARN of the subscription's redrive policy, if one is set.
    pub fn redrive_target(&self) -> Option<&str> {
        value_at_path(&self.properties, &[REDRIVE_POLICY, DEAD_LETTER_TARGET_ARN])?.as_str()
    }

    /// Points the redrive policy at `queue_arn`, replacing any earlier policy.
    pub fn set_redrive_target(&mut self, queue_arn: &str) {
        let mut policy = Map::new();
        policy.insert(
            DEAD_LETTER_TARGET_ARN.to_string(),
            Value::String(queue_arn.to_string()),
        );
        self.properties
            .insert(REDRIVE_POLICY.to_string(), Value::Object(policy));
    }
}

/// Resources keyed by logical id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template {
    resources: IndexMap<String, Resource>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn contains(&self, logical_id: &str) -> bool {
        self.resources.contains_key(logical_id)
    }

    pub fn get(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn get_mut(&mut self, logical_id: &str) -> Option<&mut Resource> {
        self.resources.get_mut(logical_id)
    }

    /// Inserts or overwrites a resource. An overwritten resource keeps its
    /// position so repeated passes produce the same ordering.
    pub fn insert(&mut self, logical_id: impl Into<String>, resource: Resource) -> Option<Resource> {
        self.resources.insert(logical_id.into(), resource)
    }

    /// Removes a resource, keeping the order of the remaining ones.
    pub fn remove(&mut self, logical_id: &str) -> Option<Resource> {
        self.resources.shift_remove(logical_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Resource)> {
        self.resources.iter()
    }

    /// Looks up a resource that must already exist with the given type.
    pub fn require(&self, logical_id: &str, expected: &'static str) -> Result<&Resource, DlqError> {
        let resource = self
            .resources
            .get(logical_id)
            .ok_or_else(|| missing(logical_id, expected))?;
        if resource.kind != expected {
            return Err(DlqError::UnexpectedResourceKind {
                logical_id: logical_id.to_string(),
                expected,
                found: resource.kind.clone(),
            });
        }
        Ok(resource)
    }

    /// Mutable form of [`Template::require`].
    pub fn require_mut(
        &mut self,
        logical_id: &str,
        expected: &'static str,
    ) -> Result<&mut Resource, DlqError> {
        self.require(logical_id, expected)?;
        self.resources
            .get_mut(logical_id)
            .ok_or_else(|| missing(logical_id, expected))
    }
}

fn missing(logical_id: &str, expected: &'static str) -> DlqError {
    DlqError::MissingResource {
        logical_id: logical_id.to_string(),
        expected,
    }
}

/// A full CloudFormation document. Only `Resources` is interpreted.
///
/// The other top-level sections are kept as-is, and `Resources` is written
/// back at the position it was read from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateDocument {
    pub sections: Map<String, Value>,
    pub resources: Template,
    resources_position: Option<usize>,
}

const RESOURCES_SECTION: &str = "Resources";

impl Serialize for TemplateDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let position = self
            .resources_position
            .unwrap_or(self.sections.len())
            .min(self.sections.len());
        let mut map = serializer.serialize_map(Some(self.sections.len() + 1))?;
        for (i, (key, value)) in self.sections.iter().enumerate() {
            if i == position {
                map.serialize_entry(RESOURCES_SECTION, &self.resources)?;
            }
            map.serialize_entry(key, value)?;
        }
        if position == self.sections.len() {
            map.serialize_entry(RESOURCES_SECTION, &self.resources)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TemplateDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut document = TemplateDocument::default();
        for (key, value) in raw {
            if key == RESOURCES_SECTION {
                document.resources_position = Some(document.sections.len());
                document.resources = serde_json::from_value(value).map_err(de::Error::custom)?;
            } else {
                document.sections.insert(key, value);
            }
        }
        Ok(document)
    }
}

impl TemplateDocument {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
