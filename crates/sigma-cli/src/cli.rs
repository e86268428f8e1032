//! Command line definition

use clap::{Args, Parser, Subcommand};
use sigma_core::EvaluationParams;
use std::path::PathBuf;

/// Classify and evaluate mathematical expressions
#[derive(Parser, Debug)]
#[command(name = "sigma")]
#[command(about = "Classify, validate and evaluate mathematical expressions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to $SIGMA_CONFIG_PATH or sigma.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate expressions as one batch; assignments apply to later expressions
    Eval(EvalArgs),
    /// Print the type of each expression
    Classify(ExpressionArgs),
    /// Print the normalized form of each expression or why it was rejected
    Validate(ExpressionArgs),
}

/// Expressions given on the command line; read from stdin when empty
#[derive(Args, Debug, Default)]
pub struct ExpressionArgs {
    pub expressions: Vec<String>,
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    #[command(flatten)]
    pub input: ExpressionArgs,

    /// Decimal places for numeric approximation
    #[arg(short, long)]
    pub decimals: Option<u32>,

    /// Lower end of the drawing domain
    #[arg(long, allow_hyphen_values = true)]
    pub origin: Option<String>,

    /// Upper end of the drawing domain
    #[arg(long, allow_hyphen_values = true)]
    pub bound: Option<String>,
}

impl EvalArgs {
    /// Apply the flags given on top of the configured defaults.
    pub fn params(&self, defaults: EvaluationParams) -> EvaluationParams {
        EvaluationParams {
            decimals: self.decimals.unwrap_or(defaults.decimals),
            origin: self.origin.clone().unwrap_or(defaults.origin),
            bound: self.bound.clone().unwrap_or(defaults.bound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_flags_override_defaults() {
        let cli = Cli::try_parse_from(["sigma", "eval", "x^2", "--decimals", "3", "--origin", "-1"])
            .unwrap();
        let Command::Eval(args) = cli.command else { panic!("expected eval") };

        let params = args.params(EvaluationParams::new(10, "-10", "10"));
        assert_eq!(params, EvaluationParams::new(3, "-1", "10"));
        assert_eq!(args.input.expressions, ["x^2"]);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["sigma", "classify", "--pretty", "--log-json"]).unwrap();
        assert!(cli.pretty);
        assert!(cli.log_json);
        assert!(matches!(cli.command, Command::Classify(ref args) if args.expressions.is_empty()));
    }

    #[test]
    fn command_is_required() {
        assert!(Cli::try_parse_from(["sigma"]).is_err());
    }
}
