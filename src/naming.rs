//! Logical ids, physical names and ARNs.
//!
//! Every cross-reference this crate writes is found again by recomputing an id
//! from the function's declaration key, never by following a pointer. The
//! normalization therefore has to agree with the one used by the framework
//! that generated the function and subscription resources.

/// Roles a resource can play for a single function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRole {
    /// The `AWS::Lambda::Function` generated by the deployment framework.
    Function,
    /// An `AWS::SNS::Subscription`, discriminated by topic name.
    SnsSubscription,
    /// The dead-letter `AWS::SQS::Queue`.
    DeadLetterQueue,
    /// One `AWS::SQS::QueuePolicy` chunk, discriminated by 1-based index.
    QueuePolicy,
    /// The `AWS::Lambda::EventInvokeConfig` failure-destination hook.
    EventInvokeConfig,
}

impl ResourceRole {
    pub fn suffix(&self) -> &'static str {
        match self {
            ResourceRole::Function => "LambdaFunction",
            ResourceRole::SnsSubscription => "SnsSubscription",
            ResourceRole::DeadLetterQueue => "DeadLetterQueue",
            ResourceRole::QueuePolicy => "DeadLetterQueuePolicy",
            ResourceRole::EventInvokeConfig => "LambdaEvConf",
        }
    }
}

/// Builds the logical id of a function's resource in the given role.
///
/// `display_name` is the function's declaration key. `discriminator` tells
/// siblings of the same role apart (a topic name or a chunk index).
pub fn derive_id(role: ResourceRole, display_name: &str, discriminator: Option<&str>) -> String {
    let mut id = normalize_function_name(display_name);
    id.push_str(role.suffix());
    if let Some(discriminator) = discriminator {
        id.push_str(&normalize_alphanumeric(discriminator));
    }
    id
}

/// `-` becomes `Dash`, `_` becomes `Underscore`, first letter upper-cased.
pub fn normalize_function_name(name: &str) -> String {
    upper_first(&name.replace('-', "Dash").replace('_', "Underscore"))
}

/// Drops anything not alphanumeric, then upper-cases the first letter.
///
/// Unlike [`normalize_function_name`], `-` and `_` are removed, not spelled out.
pub fn normalize_alphanumeric(name: &str) -> String {
    let kept: String = name.chars().filter(char::is_ascii_alphanumeric).collect();
    upper_first(&kept)
}

/// Upper-cases the first character and leaves the rest alone.
pub fn upper_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Physical name of a function's dead-letter queue.
pub fn dead_letter_queue_name(function_name: &str) -> String {
    format!("{}-dlq", function_name)
}

/// Account and region a template is being deployed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTarget {
    pub account_id: String,
    pub region: String,
}

impl DeployTarget {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
        }
    }

    pub fn partition(&self) -> &'static str {
        if self.region.starts_with("cn-") {
            "aws-cn"
        } else if self.region.starts_with("us-gov-") {
            "aws-us-gov"
        } else {
            "aws"
        }
    }

    pub fn dns_suffix(&self) -> &'static str {
        if self.region.starts_with("cn-") {
            "amazonaws.com.cn"
        } else {
            "amazonaws.com"
        }
    }

    pub fn queue_arn(&self, queue_name: &str) -> String {
        format!(
            "arn:{}:sqs:{}:{}:{}",
            self.partition(),
            self.region,
            self.account_id,
            queue_name
        )
    }

    pub fn queue_url(&self, queue_name: &str) -> String {
        format!(
            "https://sqs.{}.{}/{}/{}",
            self.region,
            self.dns_suffix(),
            self.account_id,
            queue_name
        )
    }

    pub fn function_arn(&self, function_name: &str) -> String {
        format!(
            "arn:{}:lambda:{}:{}:function:{}",
            self.partition(),
            self.region,
            self.account_id,
            function_name
        )
    }
}
