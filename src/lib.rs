//! # lambda-dlq
//!
//! Wires SQS dead-letter queues into a CloudFormation template for Lambda
//! functions fed by SNS subscriptions.
//!
//! ## Modules
//! - [`collector`]: Picks the functions and subscriptions that get a queue
//! - [`naming`]: Logical ids, queue names, ARNs and URLs
//! - [`synthesizer`]: Creates the queue and wires the function to it
//! - [`linker`]: Redrive policies and chunked queue policies
//! - [`transform`]: Batch and single-function entry points
//! - [`template`]: The in-memory template the passes mutate
//! - [`config`]: YAML deploy configuration with environment expansion
//!
//! ## Usage
//! ```rust,no_run
//! use lambda_dlq::{Config, TemplateDocument, apply_dead_letter_queues};
//!
//! let config = Config::from_file("deploy.yaml")?;
//! let mut document = TemplateDocument::from_json(&std::fs::read_to_string("template.json")?)?;
//! apply_dead_letter_queues(
//!     &mut document.resources,
//!     &config.functions,
//!     &config.target(),
//!     &config.options(),
//! )?;
//! println!("{}", document.to_json_pretty()?);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Notes
//! - The library never exits the process. A fatal [`DlqError`] is returned to
//!   the caller with the caller's template left untouched.
pub mod cfn_resources;
pub mod collector;
pub mod config;
pub mod declarations;
pub mod error;
pub mod json_utils;
pub mod linker;
pub mod naming;
pub mod synthesizer;
pub mod template;
pub mod transform;
pub mod validation_utils;

mod tracing_init;

pub use collector::{EventSource, FunctionBinding, collect};

pub use config::Config;

pub use declarations::{EventDeclaration, FunctionDeclaration, FunctionDeclarations, SnsEvent};

pub use error::{ConfigError, DlqError};

pub use linker::{AuthorizationEntry, LinkReport, MAX_SOURCES_PER_STATEMENT, PolicyChunk, link};

pub use naming::{DeployTarget, ResourceRole, derive_id};

pub use synthesizer::{DLQ_QUEUE_URL_ENV, DeadLetterQueue, synthesize};

pub use template::{Resource, Template, TemplateDocument};

pub use tracing_init::init_tracing;

pub use transform::{
    FunctionReport, TransformOptions, TransformReport, apply_dead_letter_queues,
    prepare_function_environment,
};

pub use validation_utils::MAX_QUEUE_NAME_LEN;
