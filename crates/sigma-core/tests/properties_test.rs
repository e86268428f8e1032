//! Property tests for substitution, normalization and classification

use proptest::prelude::*;
use sigma_core::patterns::PatternLibrary;
use sigma_core::registry::SymbolRegistry;
use sigma_core::validator::normalize;
use sigma_core::*;

/// Single lowercase letters that are not seeded as constants
fn free_letter() -> impl Strategy<Value = String> {
    "[a-df-hj-z]"
}

proptest! {
    #[test]
    fn assigned_values_replace_their_symbol(symbol in free_letter(), value in 0u32..100_000) {
        let mut memory = AssignmentMemory::new(SymbolRegistry::new());
        let confirmation = memory.process(&format!("{symbol}={value}"));
        prop_assert_eq!(confirmation, format!("{symbol} = {value}"));
        prop_assert_eq!(memory.process(&format!("{symbol}+1")), format!("{value}+1"));
        prop_assert_eq!(memory.process(&format!("2*{symbol}")), format!("2*{value}"));
    }

    #[test]
    fn substitution_never_touches_unbound_letters(bound in free_letter(), other in free_letter()) {
        prop_assume!(bound != other);
        let mut memory = AssignmentMemory::new(SymbolRegistry::new());
        memory.process(&format!("{bound}=7"));
        let expression = format!("{other}+{other}");
        prop_assert_eq!(memory.process(&expression), expression);
    }

    #[test]
    fn normalization_is_idempotent(text in "[ a-z0-9+*\\[\\](){},.]{0,24}") {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once.clone());
        prop_assert!(!once.contains(['[', ']', ' ']));
    }

    #[test]
    fn integers_are_numeric(value in any::<i32>()) {
        let patterns = PatternLibrary::new(&SymbolRegistry::new()).unwrap();
        prop_assert_eq!(patterns.match_type(&value.to_string()), ExpressionType::Numeric);
    }

    #[test]
    fn boolean_literals_win_over_everything(value in any::<bool>()) {
        let patterns = PatternLibrary::new(&SymbolRegistry::new()).unwrap();
        let literal = if value { "True" } else { "False" };
        prop_assert_eq!(patterns.match_type(literal), ExpressionType::Boolean);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn batches_yield_one_record_per_expression(
        expressions in prop::collection::vec("[a-c0-9+*()]{0,8}", 0..6)
    ) {
        let pipeline = PipelineOrchestrator::with_reference_engine(&SigmaConfig::default()).unwrap();
        let records = pipeline.evaluate_batch(&expressions, &EvaluationParams::default()).unwrap();

        prop_assert_eq!(records.len(), expressions.len());
        for (record, expression) in records.iter().zip(&expressions) {
            prop_assert_eq!(&record.original_expression, expression);
        }
    }
}
