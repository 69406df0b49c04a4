//! Entry points for a deployment pass.
use tracing::{debug, info};

use crate::collector::{FunctionBinding, collect};
use crate::declarations::FunctionDeclarations;
use crate::error::DlqError;
use crate::linker::{LinkReport, link};
use crate::naming::DeployTarget;
use crate::synthesizer::{DLQ_QUEUE_URL_ENV, DeadLetterQueue, synthesize};
use crate::template::Template;

/// Switches for optional parts of the wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    /// Also route failed asynchronous invocations of the function itself to
    /// its queue through an event-invoke config.
    pub failure_destination: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            failure_destination: true,
        }
    }
}

/// Outcome for one wired function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionReport {
    pub display_name: String,
    pub queue: DeadLetterQueue,
    pub link: LinkReport,
}

/// Outcome of a batch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub functions: Vec<FunctionReport>,
}

impl TransformReport {
    pub fn queue_count(&self) -> usize {
        self.functions.len()
    }

    pub fn policy_count(&self) -> usize {
        self.functions.iter().map(|f| f.link.policies.len()).sum()
    }
}

/// Wires dead-letter queues for every eligible function into `template`.
///
/// The pass runs on a staged copy. `template` is only replaced once every
/// function succeeded, so on error the caller still holds its original.
pub fn apply_dead_letter_queues(
    template: &mut Template,
    declarations: &FunctionDeclarations,
    target: &DeployTarget,
    options: &TransformOptions,
) -> Result<TransformReport, DlqError> {
    let bindings = collect(declarations);
    if bindings.is_empty() {
        info!("no functions with eligible event sources; template unchanged");
        return Ok(TransformReport::default());
    }

    let mut staged = template.clone();
    let mut report = TransformReport::default();
    for binding in &bindings {
        report
            .functions
            .push(wire_function(&mut staged, binding, target, options)?);
    }

    *template = staged;
    info!(
        queues = report.queue_count(),
        policies = report.policy_count(),
        "dead-letter wiring complete"
    );
    Ok(report)
}

fn wire_function(
    template: &mut Template,
    binding: &FunctionBinding,
    target: &DeployTarget,
    options: &TransformOptions,
) -> Result<FunctionReport, DlqError> {
    let queue = synthesize(template, binding, target, options)?;
    let link = link(template, binding, &queue, target, options)?;
    Ok(FunctionReport {
        display_name: binding.display_name.clone(),
        queue,
        link,
    })
}

/// Pre-package variant for a single function.
///
/// Sets `DLQ_QUEUE_URL` in the function's declared environment, before any
/// template exists. Unknown or ineligible functions are left untouched and
/// yield `Ok(None)`.
pub fn prepare_function_environment(
    declarations: &mut FunctionDeclarations,
    function_key: &str,
    target: &DeployTarget,
) -> Result<Option<DeadLetterQueue>, DlqError> {
    let Some(declaration) = declarations.get_mut(function_key) else {
        debug!(function = function_key, "function not declared; nothing to prepare");
        return Ok(None);
    };

    let binding = FunctionBinding::from_declaration(function_key, declaration);
    if !binding.has_eligible_sources() {
        debug!(function = function_key, "no eligible event sources; nothing to prepare");
        return Ok(None);
    }

    let queue = DeadLetterQueue::for_function(&binding, target)?;
    declaration
        .environment
        .insert(DLQ_QUEUE_URL_ENV.to_string(), queue.url.clone().into());
    info!(function = function_key, queue = %queue.name, "queue URL added to environment");
    Ok(Some(queue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn target() -> DeployTarget {
        DeployTarget::new("123456789012", "eu-west-1")
    }

    fn declarations(yaml: &str) -> FunctionDeclarations {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn template(value: Value) -> Template {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_apply_no_eligible_functions() {
        let mut tpl = template(json!({
            "ApiLambdaFunction": { "Type": "AWS::Lambda::Function" }
        }));
        let before = tpl.clone();
        let report = apply_dead_letter_queues(
            &mut tpl,
            &declarations("api:\n  events:\n    - http: GET /\n"),
            &target(),
            &TransformOptions::default(),
        )
        .unwrap();
        assert_eq!(report.queue_count(), 0);
        assert_eq!(tpl, before);
    }

    #[test]
    fn test_apply_leaves_template_untouched_on_error() {
        let mut tpl = template(json!({
            "FirstLambdaFunction": { "Type": "AWS::Lambda::Function" },
            "FirstSnsSubscriptionA": { "Type": "AWS::SNS::Subscription" },
            "SecondLambdaFunction": { "Type": "AWS::Lambda::Function" }
        }));
        let before = tpl.clone();
        let err = apply_dead_letter_queues(
            &mut tpl,
            &declarations(
                r#"
first:
  events:
    - sns: arn:aws:sns:eu-west-1:111111111111:a
second:
  events:
    - sns: arn:aws:sns:eu-west-1:111111111111:b
"#,
            ),
            &target(),
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DlqError::MissingResource { .. }));
        assert_eq!(tpl, before);
    }

    #[test]
    fn test_prepare_function_environment() {
        let mut functions = declarations(
            r#"
hello:
  name: svc-dev-hello
  environment:
    FOO: bar
  events:
    - sns: arn:aws:sns:eu-west-1:111111111111:a
"#,
        );
        let queue = prepare_function_environment(&mut functions, "hello", &target())
            .unwrap()
            .unwrap();
        assert_eq!(
            queue.url,
            "https://sqs.eu-west-1.amazonaws.com/123456789012/svc-dev-hello-dlq"
        );
        let environment = &functions["hello"].environment;
        assert_eq!(environment["FOO"], json!("bar"));
        assert_eq!(environment[DLQ_QUEUE_URL_ENV], json!(queue.url));
    }

    #[test]
    fn test_prepare_function_environment_noops() {
        let mut functions = declarations(
            r#"
off:
  enableDlq: false
  events:
    - sns: arn:aws:sns:eu-west-1:111111111111:a
"#,
        );
        let before = functions.clone();
        assert_eq!(prepare_function_environment(&mut functions, "missing", &target()).unwrap(), None);
        assert_eq!(prepare_function_environment(&mut functions, "off", &target()).unwrap(), None);
        assert_eq!(functions, before);
    }

    #[test]
    fn test_prepare_function_environment_rejects_long_name() {
        let mut functions = declarations(&format!(
            "long:\n  name: {}\n  events:\n    - sns: arn:aws:sns:eu-west-1:111111111111:a\n",
            "n".repeat(80)
        ));
        let err = prepare_function_environment(&mut functions, "long", &target()).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(functions["long"].environment.is_empty());
    }
}
