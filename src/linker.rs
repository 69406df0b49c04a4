//! Redrive pointers and queue policies.
//!
//! Each enabled subscription gets a redrive policy pointing at the function's
//! queue, and each subscription's topic is allowed to send to that queue. The
//! allow entries are split into chunks of at most
//! [`MAX_SOURCES_PER_STATEMENT`] source ARNs, one `AWS::SQS::QueuePolicy`
//! per chunk, because a statement's condition list is capped.
use tracing::{debug, info};

use crate::cfn_resources::{
    POLICY_VERSION, PolicyDocument, PolicyStatement, QueuePolicyProperties, SNS_SUBSCRIPTION,
    SQS_QUEUE_POLICY, ToResource,
};
use crate::collector::FunctionBinding;
use crate::error::DlqError;
use crate::json_utils::cfn_ref;
use crate::naming::{DeployTarget, ResourceRole, derive_id, upper_first};
use crate::synthesizer::DeadLetterQueue;
use crate::template::Template;
use crate::transform::TransformOptions;
use crate::validation_utils::parse_arn;

/// Most source ARNs a single policy statement may list.
pub const MAX_SOURCES_PER_STATEMENT: usize = 10;

const LAMBDA_PRINCIPAL: &str = "lambda.amazonaws.com";
const FAILURE_DESTINATION_SID: &str = "AllowLambdaFailureDestination";

/// Permission for one source to deliver into the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationEntry {
    pub principal: String,
    pub source_arn: String,
}

/// At most [`MAX_SOURCES_PER_STATEMENT`] entries that share one policy
/// resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyChunk {
    /// 1-based position, also the id discriminator.
    pub index: usize,
    pub entries: Vec<AuthorizationEntry>,
}

impl PolicyChunk {
    pub fn logical_id(&self, display_name: &str) -> String {
        policy_id(display_name, self.index)
    }

    /// One statement per principal, in order of first appearance.
    pub fn statements(&self, queue_arn: &str) -> Vec<PolicyStatement> {
        let mut grouped: Vec<(&str, Vec<String>)> = Vec::new();
        for entry in &self.entries {
            match grouped.iter_mut().find(|(p, _)| *p == entry.principal) {
                Some((_, arns)) => arns.push(entry.source_arn.clone()),
                None => grouped.push((entry.principal.as_str(), vec![entry.source_arn.clone()])),
            }
        }

        grouped
            .into_iter()
            .map(|(principal, arns)| {
                PolicyStatement::allow_send(statement_sid(principal), principal, queue_arn, arns)
            })
            .collect()
    }
}

/// What [`link`] touched for one function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub subscriptions: Vec<String>,
    pub policies: Vec<String>,
    pub removed_policies: Vec<String>,
}

fn policy_id(display_name: &str, index: usize) -> String {
    derive_id(ResourceRole::QueuePolicy, display_name, Some(index.to_string().as_str()))
}

/// `sns.amazonaws.com` becomes `AllowSnsDelivery`.
fn statement_sid(principal: &str) -> String {
    let service = principal.split('.').next().unwrap_or(principal);
    let service: String = service.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    format!("Allow{}Delivery", upper_first(&service))
}

/// Splits entries into consecutive chunks, keeping their order.
pub fn chunk_entries(entries: &[AuthorizationEntry]) -> Vec<PolicyChunk> {
    entries
        .chunks(MAX_SOURCES_PER_STATEMENT)
        .enumerate()
        .map(|(i, chunk)| PolicyChunk {
            index: i + 1,
            entries: chunk.to_vec(),
        })
        .collect()
}

/// Wires the binding's enabled subscriptions to `queue`.
///
/// Every subscription resource must already exist; if one is missing or a
/// source ARN is malformed, `template` is left unchanged. Policies are rewritten
/// from scratch on each call, and chunks beyond the current count that an
/// earlier call left behind are removed.
pub fn link(
    template: &mut Template,
    binding: &FunctionBinding,
    queue: &DeadLetterQueue,
    target: &DeployTarget,
    options: &TransformOptions,
) -> Result<LinkReport, DlqError> {
    let mut report = LinkReport::default();
    let mut entries = Vec::new();

    for source in binding.eligible_sources() {
        let arn = parse_arn(&source.source_arn)?;
        let subscription_id = derive_id(
            ResourceRole::SnsSubscription,
            &binding.display_name,
            Some(arn.resource_name()),
        );
        template.require(&subscription_id, SNS_SUBSCRIPTION)?;

        entries.push(AuthorizationEntry {
            principal: arn.service_principal(),
            source_arn: source.source_arn.clone(),
        });
        report.subscriptions.push(subscription_id);
    }

    let mut statement_sets: Vec<Vec<PolicyStatement>> = chunk_entries(&entries)
        .iter()
        .map(|chunk| chunk.statements(&queue.arn))
        .collect();

    if options.failure_destination {
        let statement = PolicyStatement::allow_send(
            FAILURE_DESTINATION_SID.to_string(),
            LAMBDA_PRINCIPAL,
            &queue.arn,
            vec![target.function_arn(&binding.function_name)],
        );
        match statement_sets.first_mut() {
            Some(first) => first.push(statement),
            None => statement_sets.push(vec![statement]),
        }
    }

    let mut policies = Vec::with_capacity(statement_sets.len());
    for (i, statements) in statement_sets.into_iter().enumerate() {
        let resource = QueuePolicyProperties {
            queues: vec![cfn_ref(&queue.logical_id)],
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: statements,
            },
        }
        .to_resource()?;
        policies.push((policy_id(&binding.display_name, i + 1), resource));
    }

    // Every subscription was checked above.
    for subscription_id in &report.subscriptions {
        template
            .require_mut(subscription_id, SNS_SUBSCRIPTION)?
            .set_redrive_target(&queue.arn);
    }
    for (logical_id, resource) in policies {
        template.insert(logical_id.clone(), resource);
        report.policies.push(logical_id);
    }

    let mut stale = report.policies.len() + 1;
    loop {
        let logical_id = policy_id(&binding.display_name, stale);
        let is_policy = template
            .get(&logical_id)
            .is_some_and(|resource| resource.kind == SQS_QUEUE_POLICY);
        if !is_policy {
            break;
        }
        template.remove(&logical_id);
        debug!(policy = %logical_id, "removed stale queue policy");
        report.removed_policies.push(logical_id);
        stale += 1;
    }

    info!(
        function = %binding.display_name,
        subscriptions = report.subscriptions.len(),
        policies = report.policies.len(),
        "dead-letter queue linked"
    );
    Ok(report)
}
