//! End-to-end behaviour of the pipeline on the reference engine

use sigma_core::*;

fn pipeline() -> PipelineOrchestrator {
    PipelineOrchestrator::with_reference_engine(&SigmaConfig::default())
        .expect("default config should build")
}

fn kinds(record: &ExpressionEvaluationRecord) -> Vec<EvaluationKind> {
    record.results.iter().map(|r| r.kind).collect()
}

#[test]
fn test_batch_records_follow_input_order() {
    let pipeline = pipeline();
    let records = pipeline
        .evaluate_batch(&["a=1", "a+1", "b"], &EvaluationParams::default())
        .unwrap();

    let originals: Vec<_> = records.iter().map(|r| r.original_expression.as_str()).collect();
    assert_eq!(originals, ["a=1", "a+1", "b"]);

    assert_eq!(records[0].expression_type, ExpressionType::Assignment);
    assert!(records[0].results.is_empty());

    assert_eq!(records[1].expression_type, ExpressionType::Numeric);
    assert_eq!(
        kinds(&records[1]),
        [EvaluationKind::Evaluation, EvaluationKind::Calculation, EvaluationKind::Drawing]
    );
    assert_eq!(records[1].result(EvaluationKind::Evaluation).unwrap().expression_text(), "2");

    assert_eq!(records[2].expression_type, ExpressionType::Unknown);
    assert!(records[2].has_problems());
}

#[test]
fn test_each_type_gets_its_strategy() {
    let pipeline = pipeline();
    let params = EvaluationParams::default();
    let records = pipeline
        .evaluate_batch(
            &["x^2", "x^2==4", "{{1,2},{3,4}}", "{1,2,3}", "1<2", "Sqrt(2)"],
            &params,
        )
        .unwrap();

    let types: Vec<_> = records.iter().map(|r| r.expression_type).collect();
    assert_eq!(
        types,
        [
            ExpressionType::Function,
            ExpressionType::Equation,
            ExpressionType::Matrix,
            ExpressionType::Vector,
            ExpressionType::Boolean,
            ExpressionType::Numeric,
        ]
    );

    assert_eq!(kinds(&records[0]), [EvaluationKind::Evaluation, EvaluationKind::Drawing]);
    assert_eq!(kinds(&records[1]), [EvaluationKind::Evaluation]);
    assert_eq!(kinds(&records[2]), [EvaluationKind::Evaluation]);
    assert_eq!(kinds(&records[3]), [EvaluationKind::Evaluation]);
    assert_eq!(kinds(&records[4]), [EvaluationKind::Evaluation]);

    let truth = records[4].result(EvaluationKind::Evaluation).unwrap();
    assert_eq!(truth.expression_text(), "\\text{True}");

    let root = records[5].result(EvaluationKind::Calculation).unwrap();
    assert_eq!(root.expression_text(), "1.4142135624");
}

#[test]
fn test_rejections_carry_their_reason() {
    let pipeline = pipeline();
    let records = pipeline
        .evaluate_batch(&["velocity+3", "minimize(x)", "(1+2"], &EvaluationParams::default())
        .unwrap();

    let problems: Vec<_> = records
        .iter()
        .map(|r| r.result(EvaluationKind::Evaluation).unwrap().problems()[0].clone())
        .collect();

    assert_eq!(problems[0], "Grammatical error: unrecognized symbol 'velocity'");
    assert_eq!(problems[1], "Semantic error: function 'minimize' is not allowed");
    assert!(problems[2].starts_with("Syntax error"));
    assert!(records.iter().all(|r| r.expression_type == ExpressionType::Unknown));
}

#[test]
fn test_assignment_with_equation_value_is_not_captured() {
    let pipeline = pipeline();
    let records = pipeline
        .evaluate_batch(&["x=y==1", "x+1"], &EvaluationParams::default())
        .unwrap();

    assert_ne!(records[0].expression_type, ExpressionType::Assignment);
    assert!(records[0].has_problems());
    assert_eq!(records[1].expression_type, ExpressionType::Function);
    assert_eq!(records[1].result(EvaluationKind::Evaluation).unwrap().expression_text(), "x+1");
}

#[test]
fn test_deeply_nested_input_is_rejected() {
    let pipeline = pipeline();
    let nested = format!("{}1{}", "(".repeat(300), ")".repeat(300));
    let records = pipeline.evaluate_batch(&[nested], &EvaluationParams::default()).unwrap();

    assert_eq!(records[0].expression_type, ExpressionType::Unknown);
    let problems = records[0].result(EvaluationKind::Evaluation).unwrap().problems();
    assert!(problems[0].contains("nested too deeply"));
}

#[test]
fn test_classifier_sees_through_function_notation() {
    let pipeline = pipeline();
    let classifier = pipeline.classifier();

    assert_eq!(classifier.classify("Sqrt(2)").unwrap(), ExpressionType::Numeric);
    assert_eq!(classifier.classify("sin(Pi/2)").unwrap(), ExpressionType::Numeric);
    assert_eq!(classifier.classify("x+2").unwrap(), ExpressionType::Function);
    assert_eq!(classifier.classify("x==2").unwrap(), ExpressionType::Equation);
    assert_eq!(classifier.classify_optional(None).unwrap(), ExpressionType::None);
}

#[test]
fn test_validator_normalizes_brackets() {
    let pipeline = pipeline();
    assert_eq!(pipeline.validator().validate("Sqrt[ 2 ]").unwrap(), "Sqrt(2)");
    assert_eq!(
        pipeline.validator().validate("speed*2"),
        Err(PipelineError::grammatical("speed"))
    );
}

#[test]
fn test_draw_parameters_reach_the_engine() {
    let pipeline = pipeline();
    let params = EvaluationParams::new(3, "0", "1");
    let records = pipeline.evaluate_batch(&["t^2"], &params).unwrap();

    let drawing = records[0].result(EvaluationKind::Drawing).unwrap();
    assert!(drawing.expression_text().starts_with("{{0.0,0.0},"));
    assert!(drawing.expression_text().ends_with("{1.0,1.0}}"));
}

#[test]
fn test_records_serialize_for_outer_layers() {
    let pipeline = pipeline();
    let records = pipeline.evaluate_batch(&["1+1"], &EvaluationParams::default()).unwrap();
    let json = serde_json::to_value(&records).unwrap();
    assert_eq!(json[0]["originalExpression"], "1+1");
    assert_eq!(json[0]["type"], serde_json::to_value(ExpressionType::Numeric).unwrap());
}
