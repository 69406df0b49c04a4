//! lambda-dlq CLI: wires SQS dead-letter queues into a CloudFormation template.
//!
//! Run before deployment with the packaged template, or before packaging a
//! single function with `--function`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{error, info};

use lambda_dlq::{
    Config, TemplateDocument, apply_dead_letter_queues, init_tracing,
    prepare_function_environment,
};

#[derive(Parser, Debug)]
#[command(version, about)]
struct CliArgs {
    /// Path to the deploy configuration (YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// CloudFormation template (JSON) to wire
    #[arg(short, long, required_unless_present = "function")]
    template: Option<PathBuf>,

    /// Where to write the wired template (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only prepare this function's environment (pre-package step)
    #[arg(short, long, conflicts_with = "template")]
    function: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.json_logs);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<()> {
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let target = config.target();
    info!(account = %target.account_id, region = %target.region, "deploy target resolved");

    if let Some(function) = &args.function {
        return match prepare_function_environment(&mut config.functions, function, &target)? {
            Some(_) => write_output(args, &serde_json::to_string_pretty(&config.functions[function])?),
            None => {
                info!(function = %function, "nothing to prepare");
                Ok(())
            }
        };
    }

    let Some(template_path) = &args.template else {
        bail!("--template is required unless --function is given");
    };
    let input = std::fs::read_to_string(template_path)
        .with_context(|| format!("failed to read {}", template_path.display()))?;
    let mut document = TemplateDocument::from_json(&input)
        .with_context(|| format!("{} is not a valid template", template_path.display()))?;

    apply_dead_letter_queues(
        &mut document.resources,
        &config.functions,
        &target,
        &config.options(),
    )
    .context("dead-letter wiring aborted; no template was written")?;

    write_output(args, &document.to_json_pretty()?)
}

fn write_output(args: &CliArgs, rendered: &str) -> Result<()> {
    match &args.output {
        Some(path) => std::fs::write(path, format!("{rendered}\n"))
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
