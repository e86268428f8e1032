//! Per-batch assignment memory
//!
//! Holds the single-letter bindings made by `x=...` expressions earlier in a batch and
//! substitutes them into later ones. Substitution works on whole identifier tokens, so a
//! binding for `x` never touches `sinx` or `x1`. Recognized constants are seeded with
//! their engine names (`pi` becomes `Pi`).
//!
//! One memory belongs to one batch; it is never shared between concurrent batches.

use crate::registry::SymbolRegistry;
use crate::tokens::{self, Identifier};
use sigma_types::VariableBinding;
use std::collections::HashMap;
use tracing::debug;

/// What `apply` did with an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOutcome {
    /// The expression was an assignment; the binding is now stored
    Assigned { binding: VariableBinding, confirmation: String },
    /// Known bindings were substituted into the expression
    Substituted(String),
}

impl MemoryOutcome {
    pub fn into_text(self) -> String {
        match self {
            MemoryOutcome::Assigned { confirmation, .. } => confirmation,
            MemoryOutcome::Substituted(text) => text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssignmentMemory {
    registry: SymbolRegistry,
    bindings: HashMap<String, String>,
}

fn strip_whitespace(expression: &str) -> String {
    expression.chars().filter(|c| !c.is_whitespace()).collect()
}

/// `a=rest` with a single ASCII letter on the left and no `=` anywhere in `rest`
fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let (symbol, value) = text.split_once('=')?;
    let is_letter = symbol.len() == 1 && symbol.bytes().all(|b| b.is_ascii_alphabetic());
    (is_letter && !value.is_empty() && !value.contains('=')).then_some((symbol, value))
}

fn is_atomic(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}

impl AssignmentMemory {
    /// A memory seeded with the registry's constant-to-engine-name bindings
    pub fn new(registry: SymbolRegistry) -> Self {
        let mut memory = Self { registry, bindings: HashMap::new() };
        memory.seed();
        memory
    }

    fn seed(&mut self) {
        for (name, native) in self.registry.native_bindings() {
            self.bindings.insert(name.to_string(), native.to_string());
        }
    }

    /// Capture an assignment or substitute known bindings.
    pub fn apply(&mut self, expression: &str) -> MemoryOutcome {
        let text = strip_whitespace(expression);

        if let Some((symbol, value)) = split_assignment(&text) {
            let value = self.substitute(value);
            debug!(symbol, value = %value, "binding stored");
            self.bindings.insert(symbol.to_string(), value.clone());
            let confirmation = format!("{symbol} = {value}");
            return MemoryOutcome::Assigned {
                binding: VariableBinding { symbol: symbol.to_string(), value },
                confirmation,
            };
        }

        MemoryOutcome::Substituted(self.substitute(&text))
    }

    /// Text form of `apply`: the confirmation for an assignment, the substituted expression otherwise.
    pub fn process(&mut self, expression: &str) -> String {
        self.apply(expression).into_text()
    }

    /// Drop every binding made by assignments; constant seeds are restored.
    pub fn clear(&mut self) {
        self.bindings.clear();
        self.seed();
    }

    pub fn binding(&self, symbol: &str) -> Option<&str> {
        self.bindings.get(symbol).map(String::as_str)
    }

    /// Symbols referenced by `expression` that have no binding and are not constants
    pub fn unbound_symbols_in(&self, expression: &str) -> Vec<String> {
        let mut unbound: Vec<String> = Vec::new();
        for id in tokens::identifiers(expression) {
            if id.is_call
                || self.registry.is_keyword(id.text)
                || self.resolve(id.text).is_some()
                || self.registry.is_constant(id.text)
            {
                continue;
            }
            if !unbound.iter().any(|seen| seen == id.text) {
                unbound.push(id.text.to_string());
            }
        }
        unbound
    }

    fn resolve(&self, token: &str) -> Option<&str> {
        if let Some(value) = self.bindings.get(token) {
            return Some(value);
        }
        // Constants are matched case-insensitively, so `PI` also maps to `Pi`
        self.registry
            .constant(token)
            .map(|constant| constant.engine_name())
            .filter(|native| *native != token)
    }

    fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for id in tokens::identifiers(text) {
            let Some(value) = self.replacement(&id) else { continue };
            out.push_str(&text[last..id.start]);
            out.push_str(&value);
            last = id.end;
        }
        out.push_str(&text[last..]);
        out
    }

    fn replacement(&self, id: &Identifier<'_>) -> Option<String> {
        if id.is_call {
            return None;
        }
        let value = self.resolve(id.text)?;
        if is_atomic(value) && !id.follows_number {
            Some(value.to_string())
        } else {
            Some(format!("({value})"))
        }
    }
}

impl Default for AssignmentMemory {
    fn default() -> Self {
        Self::new(SymbolRegistry::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_then_substitution() {
        let mut memory = AssignmentMemory::default();
        assert_eq!(memory.process("a = 1"), "a = 1");
        assert_eq!(memory.process("a + 1"), "1+1");
        assert_eq!(memory.binding("a"), Some("1"));
    }

    #[test]
    fn substitution_is_whole_token() {
        let mut memory = AssignmentMemory::default();
        memory.process("x=3");
        assert_eq!(memory.process("sinx+x1+x"), "sinx+x1+3");
        assert_eq!(memory.process("sin(x)"), "sin(3)");
    }

    #[test]
    fn compound_values_are_parenthesized() {
        let mut memory = AssignmentMemory::default();
        memory.process("a=1+2");
        assert_eq!(memory.process("a*2"), "(1+2)*2");

        memory.process("b=4");
        assert_eq!(memory.process("2b"), "2(4)");

        memory.process("c=a-1");
        assert_eq!(memory.binding("c"), Some("(1+2)-1"));
    }

    #[test]
    fn constants_map_to_engine_names() {
        let mut memory = AssignmentMemory::default();
        assert_eq!(memory.process("2*pi"), "2*Pi");
        assert_eq!(memory.process("PI+phi"), "Pi+GoldenRatio");
        assert_eq!(memory.process("Catalan"), "Catalan");
    }

    #[test]
    fn equations_are_not_assignments() {
        let mut memory = AssignmentMemory::default();
        assert!(matches!(memory.apply("a==1"), MemoryOutcome::Substituted(text) if text == "a==1"));
        assert!(matches!(memory.apply("ab=1"), MemoryOutcome::Substituted(_)));
    }

    #[test]
    fn equation_values_are_not_captured() {
        let mut memory = AssignmentMemory::default();
        assert!(matches!(memory.apply("x=y==1"), MemoryOutcome::Substituted(text) if text == "x=y==1"));
        assert_eq!(memory.binding("x"), None);
    }

    #[test]
    fn unbound_symbols_are_reported_once() {
        let mut memory = AssignmentMemory::default();
        memory.process("a=1");
        assert_eq!(memory.unbound_symbols_in("a+b*b+sin(c)+pi+True"), vec!["b", "c"]);
    }

    #[test]
    fn clear_drops_assignments_but_keeps_constants() {
        let mut memory = AssignmentMemory::default();
        memory.process("e=5");
        assert_eq!(memory.process("e"), "5");

        memory.clear();
        assert_eq!(memory.binding("e"), Some("E"));
        assert_eq!(memory.process("a"), "a");
    }
}
