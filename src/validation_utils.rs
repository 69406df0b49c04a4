//! Validation Utilities: Queue Names and ARNs
//!
//! This module provides:
//! - The SQS queue name length check that guards every wiring pass
//! - A strict ARN parser used to find the service principal and the trailing
//!   resource segment of an event source
//!
//! ## Example
//! ```rust
//! use lambda_dlq::validation_utils::parse_arn;
//! let arn = parse_arn("arn:aws:sns:us-east-1:111111111111:orders").unwrap();
//! assert_eq!(arn.service, "sns");
//! assert_eq!(arn.resource_name(), "orders");
//! ```
use regex::Regex;
use std::sync::LazyLock;

use crate::error::DlqError;

/// Hard SQS limit on queue name length.
pub const MAX_QUEUE_NAME_LEN: usize = 80;

static ARN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:([a-z0-9-]+):([a-z0-9-]+):([a-z0-9-]*):([0-9]*):(.+)$")
        .expect("Invalid ARN pattern")
});

/// The colon-separated sections of an ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArnParts<'a> {
    pub partition: &'a str,
    pub service: &'a str,
    pub region: &'a str,
    pub account_id: &'a str,
    pub resource: &'a str,
}

impl<'a> ArnParts<'a> {
    /// Last `:` or `/` delimited segment of the resource section.
    pub fn resource_name(&self) -> &'a str {
        self.resource
            .rsplit([':', '/'])
            .next()
            .unwrap_or(self.resource)
    }

    /// Service principal allowed to deliver on behalf of this resource.
    pub fn service_principal(&self) -> String {
        format!("{}.amazonaws.com", self.service)
    }
}

/// Splits an ARN into its sections.
///
/// # Returns
/// `Ok(ArnParts)` borrowing from `arn`, or `DlqError::MalformedArn`
pub fn parse_arn(arn: &str) -> Result<ArnParts<'_>, DlqError> {
    let caps = ARN_PATTERN
        .captures(arn)
        .ok_or_else(|| DlqError::MalformedArn {
            arn: arn.to_string(),
        })?;

    let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");

    Ok(ArnParts {
        partition: group(1),
        service: group(2),
        region: group(3),
        account_id: group(4),
        resource: group(5),
    })
}

/// Checks a queue name against the SQS length limit.
///
/// Only the length is checked; character set rules are left to the
/// deployment itself.
pub fn validate_queue_name(name: &str) -> Result<(), DlqError> {
    let length = name.chars().count();
    if length > MAX_QUEUE_NAME_LEN {
        return Err(DlqError::QueueNameTooLong {
            name: name.to_string(),
            length,
            max: MAX_QUEUE_NAME_LEN,
        });
    }
    Ok(())
}
