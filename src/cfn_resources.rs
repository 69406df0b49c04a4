//! CloudFormation Resource Type Definitions
//!
//! This module provides strongly-typed representations of the CloudFormation
//! resources this crate creates: SQS queues, SQS queue policies and Lambda
//! event-invoke configs. It also names the resource types it only reads
//! (functions and SNS subscriptions).
//!
//! All types are serializable via Serde and convert into a template
//! [`Resource`] through [`ToResource`].
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json_utils::to_property_map;
use crate::template::Resource;

pub const LAMBDA_FUNCTION: &str = "AWS::Lambda::Function";
pub const LAMBDA_EVENT_INVOKE_CONFIG: &str = "AWS::Lambda::EventInvokeConfig";
pub const SNS_SUBSCRIPTION: &str = "AWS::SNS::Subscription";
pub const SQS_QUEUE: &str = "AWS::SQS::Queue";
pub const SQS_QUEUE_POLICY: &str = "AWS::SQS::QueuePolicy";

pub const POLICY_VERSION: &str = "2012-10-17";
pub const SEND_MESSAGE_ACTION: &str = "sqs:SendMessage";
pub const LATEST_QUALIFIER: &str = "$LATEST";

/// Typed properties that know their CloudFormation resource type.
pub trait ToResource: Serialize + Sized {
    const KIND: &'static str;

    fn to_resource(&self) -> Result<Resource, serde_json::Error> {
        Ok(Resource::new(Self::KIND, to_property_map(self)?))
    }
}

/// SQS Queue Resource
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct QueueProperties {
    pub queue_name: String,
}

impl ToResource for QueueProperties {
    const KIND: &'static str = SQS_QUEUE;
}

/// SQS Queue Policy Resource
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct QueuePolicyProperties {
    pub queues: Vec<Value>,
    pub policy_document: PolicyDocument,
}

impl ToResource for QueuePolicyProperties {
    const KIND: &'static str = SQS_QUEUE_POLICY;
}

/// IAM policy document
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub sid: String,
    pub effect: String,
    pub principal: ServicePrincipal,
    pub action: String,
    pub resource: String,
    pub condition: SourceArnCondition,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ServicePrincipal {
    pub service: String,
}

/// `{"ArnEquals": {"aws:SourceArn": [...]}}`
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SourceArnCondition {
    #[serde(rename = "ArnEquals")]
    pub arn_equals: SourceArnList,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SourceArnList {
    #[serde(rename = "aws:SourceArn")]
    pub source_arns: Vec<String>,
}

impl PolicyStatement {
    /// Allows `principal` to send to `queue_arn` when the request comes from
    /// one of `source_arns`.
    pub fn allow_send(sid: String, principal: &str, queue_arn: &str, source_arns: Vec<String>) -> Self {
        Self {
            sid,
            effect: "Allow".to_string(),
            principal: ServicePrincipal {
                service: principal.to_string(),
            },
            action: SEND_MESSAGE_ACTION.to_string(),
            resource: queue_arn.to_string(),
            condition: SourceArnCondition {
                arn_equals: SourceArnList { source_arns },
            },
        }
    }
}

/// Lambda Event Invoke Config Resource
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EventInvokeConfigProperties {
    pub function_name: Value,
    pub qualifier: String,
    pub destination_config: DestinationConfig,
}

impl ToResource for EventInvokeConfigProperties {
    const KIND: &'static str = LAMBDA_EVENT_INVOKE_CONFIG;
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DestinationConfig {
    pub on_failure: OnFailure,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct OnFailure {
    pub destination: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_utils::cfn_ref;
    use serde_json::json;

    #[test]
    fn test_queue_resource() {
        let resource = QueueProperties {
            queue_name: "svc-dev-hello-dlq".to_string(),
        }
        .to_resource()
        .unwrap();
        assert_eq!(resource.kind, SQS_QUEUE);
        assert_eq!(
            serde_json::to_value(&resource).unwrap(),
            json!({ "Type": "AWS::SQS::Queue", "Properties": { "QueueName": "svc-dev-hello-dlq" } })
        );
    }

    #[test]
    fn test_queue_policy_resource() {
        let properties = QueuePolicyProperties {
            queues: vec![cfn_ref("HelloDeadLetterQueue")],
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![PolicyStatement::allow_send(
                    "AllowSnsDelivery".to_string(),
                    "sns.amazonaws.com",
                    "arn:aws:sqs:us-east-1:1:q",
                    vec!["arn:aws:sns:us-east-1:1:t".to_string()],
                )],
            },
        };
        let resource = properties.to_resource().unwrap();
        assert_eq!(
            Value::Object(resource.properties),
            json!({
                "Queues": [{ "Ref": "HelloDeadLetterQueue" }],
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Sid": "AllowSnsDelivery",
                        "Effect": "Allow",
                        "Principal": { "Service": "sns.amazonaws.com" },
                        "Action": "sqs:SendMessage",
                        "Resource": "arn:aws:sqs:us-east-1:1:q",
                        "Condition": { "ArnEquals": { "aws:SourceArn": ["arn:aws:sns:us-east-1:1:t"] } }
                    }]
                }
            })
        );
    }

    #[test]
    fn test_event_invoke_config_resource() {
        let resource = EventInvokeConfigProperties {
            function_name: cfn_ref("HelloLambdaFunction"),
            qualifier: LATEST_QUALIFIER.to_string(),
            destination_config: DestinationConfig {
                on_failure: OnFailure {
                    destination: "arn:aws:sqs:us-east-1:1:q".to_string(),
                },
            },
        }
        .to_resource()
        .unwrap();
        assert_eq!(resource.kind, LAMBDA_EVENT_INVOKE_CONFIG);
        assert_eq!(
            resource.properties["DestinationConfig"],
            json!({ "OnFailure": { "Destination": "arn:aws:sqs:us-east-1:1:q" } })
        );
        assert_eq!(resource.properties["Qualifier"], json!("$LATEST"));
    }
}
