//! Command execution

use crate::cli::{Cli, Command, ExpressionArgs};
use anyhow::Context;
use serde::Serialize;
use sigma_core::{ExpressionType, PipelineOrchestrator, PipelineResult, SigmaConfig};
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Output line of `sigma classify`
#[derive(Debug, Serialize)]
struct Classification {
    expression: String,
    #[serde(rename = "type")]
    expression_type: Option<ExpressionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Classification {
    fn new(expression: String, outcome: PipelineResult<ExpressionType>) -> Self {
        match outcome {
            Ok(expression_type) => {
                Self { expression, expression_type: Some(expression_type), error: None }
            }
            Err(err) => Self { expression, expression_type: None, error: Some(err.to_string()) },
        }
    }
}

/// Output line of `sigma validate`
#[derive(Debug, Serialize)]
struct Validation {
    expression: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    normalized: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Validation {
    fn new(expression: String, outcome: PipelineResult<String>) -> Self {
        let valid = outcome.is_ok();
        let (normalized, error) = match outcome {
            Ok(normalized) => (Some(normalized), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Self { expression, valid, normalized, error }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<SigmaConfig> {
    let config = match &cli.config {
        Some(path) => {
            let config = SigmaConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?
                .apply_env_overrides();
            config.validate()?;
            config
        }
        None => SigmaConfig::load()?,
    };
    Ok(config)
}

/// Expressions from the arguments, or one per line of `input` when none were given.
fn collect_expressions(
    args: &ExpressionArgs,
    input: &mut impl BufRead,
) -> anyhow::Result<Vec<String>> {
    if !args.expressions.is_empty() {
        return Ok(args.expressions.clone());
    }
    let mut expressions = Vec::new();
    for line in input.lines() {
        expressions.push(line.context("reading expressions from stdin")?);
    }
    debug!(count = expressions.len(), "expressions read from stdin");
    Ok(expressions)
}

fn write_json(out: &mut impl Write, value: &impl Serialize, pretty: bool) -> anyhow::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Run `cli`, reading expressions from `input` when needed and writing JSON to `out`.
pub fn run(cli: Cli, input: &mut impl BufRead, out: &mut impl Write) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let pipeline = PipelineOrchestrator::with_reference_engine(&config)?;

    match &cli.command {
        Command::Eval(args) => {
            let expressions = collect_expressions(&args.input, input)?;
            let params = args.params(config.defaults.params());
            info!(expressions = expressions.len(), "evaluating batch");
            let records = pipeline.evaluate_batch(&expressions, &params)?;
            write_json(out, &records, cli.pretty)
        }
        Command::Classify(args) => {
            let classifications: Vec<_> = collect_expressions(args, input)?
                .into_iter()
                .map(|expression| {
                    let outcome = pipeline.classify(&expression);
                    Classification::new(expression, outcome)
                })
                .collect();
            write_json(out, &classifications, cli.pretty)
        }
        Command::Validate(args) => {
            let validations: Vec<_> = collect_expressions(args, input)?
                .into_iter()
                .map(|expression| {
                    let outcome = pipeline.validator().validate(&expression);
                    Validation::new(expression, outcome)
                })
                .collect();
            write_json(out, &validations, cli.pretty)
        }
    }
}
