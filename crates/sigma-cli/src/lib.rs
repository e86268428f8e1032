//! Sigma command-line front end
//!
//! Reads expressions from arguments or stdin, runs them through the pipeline and prints
//! JSON to stdout. Logs go to stderr.

pub mod cli;
pub mod commands;
pub mod tracing_setup;

pub use cli::{Cli, Command, EvalArgs, ExpressionArgs};
pub use commands::run;
