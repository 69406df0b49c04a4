//! Queue synthesis and function-side wiring.
use serde_json::Value;
use tracing::{info, warn};

use crate::cfn_resources::{
    DestinationConfig, EventInvokeConfigProperties, LAMBDA_EVENT_INVOKE_CONFIG, LAMBDA_FUNCTION,
    LATEST_QUALIFIER, OnFailure, QueueProperties, ToResource,
};
use crate::collector::FunctionBinding;
use crate::error::DlqError;
use crate::json_utils::{cfn_ref, object_at_path_mut, value_at_path};
use crate::naming::{DeployTarget, ResourceRole, dead_letter_queue_name, derive_id};
use crate::template::Template;
use crate::transform::TransformOptions;
use crate::validation_utils::validate_queue_name;

/// Environment variable carrying the queue URL into the function.
pub const DLQ_QUEUE_URL_ENV: &str = "DLQ_QUEUE_URL";

const ON_FAILURE: [&str; 2] = ["DestinationConfig", "OnFailure"];
const DESTINATION: &str = "Destination";

/// A function's dead-letter queue, with the strings computed ahead of
/// provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetterQueue {
    pub logical_id: String,
    pub name: String,
    pub arn: String,
    pub url: String,
}

impl DeadLetterQueue {
    /// Computes the queue for `binding`, rejecting names SQS would refuse.
    pub fn for_function(binding: &FunctionBinding, target: &DeployTarget) -> Result<Self, DlqError> {
        let name = dead_letter_queue_name(&binding.function_name);
        validate_queue_name(&name)?;

        Ok(Self {
            logical_id: derive_id(ResourceRole::DeadLetterQueue, &binding.display_name, None),
            arn: target.queue_arn(&name),
            url: target.queue_url(&name),
            name,
        })
    }
}

/// Adds the queue resource and points the function at it.
///
/// The function resource must already be in the template. Nothing is written
/// when the queue name is invalid or the function is missing.
pub fn synthesize(
    template: &mut Template,
    binding: &FunctionBinding,
    target: &DeployTarget,
    options: &TransformOptions,
) -> Result<DeadLetterQueue, DlqError> {
    let queue = DeadLetterQueue::for_function(binding, target)?;
    let function_id = derive_id(ResourceRole::Function, &binding.display_name, None);

    template
        .require_mut(&function_id, LAMBDA_FUNCTION)?
        .set_environment_variable(&function_id, DLQ_QUEUE_URL_ENV, queue.url.clone())?;

    let resource = QueueProperties {
        queue_name: queue.name.clone(),
    }
    .to_resource()?;
    template.insert(queue.logical_id.clone(), resource);

    if options.failure_destination {
        attach_failure_destination(template, binding, &function_id, &queue)?;
    }

    info!(
        function = %binding.display_name,
        queue = %queue.name,
        "dead-letter queue synthesized"
    );
    Ok(queue)
}

/// Routes failed asynchronous invocations of `$LATEST` to the queue.
///
/// An event-invoke config generated by the framework is merged into. An
/// on-failure destination that already points elsewhere is left alone.
fn attach_failure_destination(
    template: &mut Template,
    binding: &FunctionBinding,
    function_id: &str,
    queue: &DeadLetterQueue,
) -> Result<(), DlqError> {
    let hook_id = derive_id(ResourceRole::EventInvokeConfig, &binding.display_name, None);

    if !template.contains(&hook_id) {
        let resource = EventInvokeConfigProperties {
            function_name: cfn_ref(function_id),
            qualifier: LATEST_QUALIFIER.to_string(),
            destination_config: DestinationConfig {
                on_failure: OnFailure {
                    destination: queue.arn.clone(),
                },
            },
        }
        .to_resource()?;
        template.insert(hook_id, resource);
        return Ok(());
    }

    let hook = template.require_mut(&hook_id, LAMBDA_EVENT_INVOKE_CONFIG)?;
    let current = value_at_path(&hook.properties, &[ON_FAILURE[0], ON_FAILURE[1], DESTINATION]).cloned();
    match current {
        None => {
            object_at_path_mut(&mut hook.properties, &ON_FAILURE)
                .map_err(|e| DlqError::PropertyShape {
                    logical_id: hook_id.clone(),
                    path: e.path,
                })?
                .insert(DESTINATION.to_string(), Value::String(queue.arn.clone()));
        }
        Some(Value::String(existing)) if existing == queue.arn => {}
        Some(existing) => {
            warn!(
                function = %binding.display_name,
                destination = %existing,
                "keeping existing on-failure destination"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Resource;
    use serde_json::json;

    fn binding(display_name: &str, function_name: &str) -> FunctionBinding {
        FunctionBinding {
            function_name: function_name.to_string(),
            display_name: display_name.to_string(),
            event_sources: Vec::new(),
            dlq_enabled: true,
        }
    }

    fn target() -> DeployTarget {
        DeployTarget::new("123456789012", "us-east-1")
    }

    fn template_with_function(properties: Value) -> Template {
        let mut template = Template::new();
        template.insert(
            "HelloLambdaFunction",
            serde_json::from_value::<Resource>(json!({
                "Type": "AWS::Lambda::Function",
                "Properties": properties,
            }))
            .unwrap(),
        );
        template
    }

    #[test]
    fn test_synthesize_creates_queue_and_env() {
        let mut template = template_with_function(json!({
            "Environment": { "Variables": { "FOO": "bar" } }
        }));
        let queue = synthesize(
            &mut template,
            &binding("hello", "svc-dev-hello"),
            &target(),
            &TransformOptions::default(),
        )
        .unwrap();

        assert_eq!(queue.logical_id, "HelloDeadLetterQueue");
        assert_eq!(queue.name, "svc-dev-hello-dlq");
        assert_eq!(queue.arn, "arn:aws:sqs:us-east-1:123456789012:svc-dev-hello-dlq");

        let queue_resource = template.get("HelloDeadLetterQueue").unwrap();
        assert_eq!(queue_resource.kind, "AWS::SQS::Queue");
        assert_eq!(
            Value::Object(queue_resource.properties.clone()),
            json!({ "QueueName": "svc-dev-hello-dlq" })
        );

        let function = template.get("HelloLambdaFunction").unwrap();
        assert_eq!(function.environment_variable("FOO"), Some(&json!("bar")));
        assert_eq!(
            function.environment_variable(DLQ_QUEUE_URL_ENV),
            Some(&json!("https://sqs.us-east-1.amazonaws.com/123456789012/svc-dev-hello-dlq"))
        );

        let hook = template.get("HelloLambdaEvConf").unwrap();
        assert_eq!(hook.kind, "AWS::Lambda::EventInvokeConfig");
        assert_eq!(
            Value::Object(hook.properties.clone()),
            json!({
                "FunctionName": { "Ref": "HelloLambdaFunction" },
                "Qualifier": "$LATEST",
                "DestinationConfig": { "OnFailure": { "Destination": queue.arn } }
            })
        );
    }

    #[test]
    fn test_synthesize_without_failure_destination() {
        let mut template = template_with_function(json!({}));
        let options = TransformOptions {
            failure_destination: false,
        };
        synthesize(&mut template, &binding("hello", "hello"), &target(), &options).unwrap();
        assert!(!template.contains("HelloLambdaEvConf"));
        assert_eq!(template.len(), 2);
    }

    #[test]
    fn test_synthesize_rejects_long_name_before_writing() {
        let mut template = template_with_function(json!({}));
        let before = template.clone();
        let err = synthesize(
            &mut template,
            &binding("hello", &"x".repeat(77)),
            &target(),
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DlqError::QueueNameTooLong { length: 81, .. }));
        assert_eq!(template, before);
    }

    #[test]
    fn test_synthesize_requires_function() {
        let mut template = Template::new();
        let err = synthesize(
            &mut template,
            &binding("hello", "hello"),
            &target(),
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DlqError::MissingResource { .. }));
        assert!(template.is_empty());
    }

    #[test]
    fn test_synthesize_merges_framework_hook() {
        let mut template = template_with_function(json!({}));
        template.insert(
            "HelloLambdaEvConf",
            serde_json::from_value::<Resource>(json!({
                "Type": "AWS::Lambda::EventInvokeConfig",
                "Properties": {
                    "FunctionName": { "Ref": "HelloLambdaFunction" },
                    "Qualifier": "$LATEST",
                    "MaximumRetryAttempts": 0
                }
            }))
            .unwrap(),
        );
        let queue = synthesize(
            &mut template,
            &binding("hello", "hello"),
            &target(),
            &TransformOptions::default(),
        )
        .unwrap();

        let hook = template.get("HelloLambdaEvConf").unwrap();
        assert_eq!(hook.properties["MaximumRetryAttempts"], json!(0));
        assert_eq!(
            hook.properties["DestinationConfig"],
            json!({ "OnFailure": { "Destination": queue.arn } })
        );
    }

    #[test]
    fn test_synthesize_keeps_foreign_failure_destination() {
        let mut template = template_with_function(json!({}));
        let foreign = json!({ "Fn::GetAtt": ["AlertsTopic", "TopicArn"] });
        template.insert(
            "HelloLambdaEvConf",
            serde_json::from_value::<Resource>(json!({
                "Type": "AWS::Lambda::EventInvokeConfig",
                "Properties": {
                    "DestinationConfig": { "OnFailure": { "Destination": foreign } }
                }
            }))
            .unwrap(),
        );
        synthesize(
            &mut template,
            &binding("hello", "hello"),
            &target(),
            &TransformOptions::default(),
        )
        .unwrap();
        assert_eq!(
            template.get("HelloLambdaEvConf").unwrap().properties["DestinationConfig"]["OnFailure"]
                ["Destination"],
            foreign
        );
    }
}
