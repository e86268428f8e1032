use clap::Parser;
use serde_json::Value;
use sigma_cli::{Cli, run};
use sigma_core::ExpressionType;
use std::io::Cursor;

fn run_with(args: &[&str], stdin: &str) -> Value {
    let cli = Cli::try_parse_from(args).expect("arguments should parse");
    let mut input = Cursor::new(stdin.to_string());
    let mut output = Vec::new();
    run(cli, &mut input, &mut output).expect("command should succeed");
    serde_json::from_slice(&output).expect("output should be JSON")
}

fn type_name(expression_type: ExpressionType) -> Value {
    serde_json::to_value(expression_type).unwrap()
}

#[test]
fn test_eval_prints_records_in_order() {
    let records = run_with(&["sigma", "eval", "a=3", "a*2"], "");

    assert_eq!(records.as_array().unwrap().len(), 2);
    assert_eq!(records[0]["originalExpression"], "a=3");
    assert_eq!(records[0]["results"].as_array().unwrap().len(), 0);
    assert_eq!(records[1]["originalExpression"], "a*2");
    assert_eq!(records[1]["results"][0]["result"]["expressionText"], "6");
}

#[test]
fn test_eval_reads_stdin_when_no_arguments() {
    let records = run_with(&["sigma", "eval", "--decimals", "2"], "1/3\nSqrt(2)\n");

    assert_eq!(records.as_array().unwrap().len(), 2);
    assert_eq!(records[1]["results"][1]["result"]["expressionText"], "1.41");
}

#[test]
fn test_classify_reports_types_and_rejections() {
    let output = run_with(&["sigma", "classify", "x^2", "{1,2}", "speed+1"], "");

    assert_eq!(output[0]["type"], type_name(ExpressionType::Function));
    assert_eq!(output[1]["type"], type_name(ExpressionType::Vector));
    assert!(output[2]["type"].is_null());
    assert_eq!(output[2]["error"], "Grammatical error: unrecognized symbol 'speed'");
}

#[test]
fn test_validate_prints_normalized_form() {
    let output = run_with(&["sigma", "validate", "--pretty"], "Sqrt[ 2 ]\nminimize(x)\n");

    assert_eq!(output[0]["valid"], true);
    assert_eq!(output[0]["normalized"], "Sqrt(2)");
    assert_eq!(output[1]["valid"], false);
    assert_eq!(output[1]["error"], "Semantic error: function 'minimize' is not allowed");
}
