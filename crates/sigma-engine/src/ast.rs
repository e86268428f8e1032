//! Abstract syntax tree for engine expressions

use crate::number::Rational;
use std::collections::BTreeSet;

/// AST node representing an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Exact number (integers and fractions)
    Exact(Rational),

    /// Approximate number, produced by decimal literals and numeric evaluation
    Real(f64),

    /// Symbol: a free variable or a named constant such as `Pi`
    Symbol(String),

    /// `True` / `False`
    Boolean(bool),

    /// Numeric negation (-a)
    Neg(Box<Expr>),

    /// Arithmetic (a + b, a ^ b, ...)
    Binary { left: Box<Expr>, op: BinaryOp, right: Box<Expr> },

    /// Relation (a == b, a < b, ...)
    Compare { left: Box<Expr>, op: CompareOp, right: Box<Expr> },

    /// Function call (Sin(x), D(x^2, x))
    Call { name: String, args: Vec<Expr> },

    /// Brace list ({1, 2, 3}); nested lists form matrices
    List(Vec<Expr>),
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

/// Relational operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOp {
    /// Get the precedence of this operator (higher = tighter binding)
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Subtract => 1,
            BinaryOp::Multiply | BinaryOp::Divide => 2,
            BinaryOp::Power => 4,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Power => "^",
        }
    }
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
        }
    }

    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Equal => left == right,
            CompareOp::NotEqual => left != right,
            CompareOp::Less => left < right,
            CompareOp::LessEqual => left <= right,
            CompareOp::Greater => left > right,
            CompareOp::GreaterEqual => left >= right,
        }
    }
}

impl Expr {
    pub fn integer(value: i64) -> Self {
        Self::Exact(Rational::integer(value))
    }

    pub fn symbol(name: &str) -> Self {
        Self::Symbol(name.to_string())
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Self::Binary { left: Box::new(left), op, right: Box::new(right) }
    }

    pub fn compare(left: Expr, op: CompareOp, right: Expr) -> Self {
        Self::Compare { left: Box::new(left), op, right: Box::new(right) }
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Self::Call { name: name.to_string(), args }
    }

    pub fn neg(operand: Expr) -> Self {
        Self::Neg(Box::new(operand))
    }

    /// Height of the tree; a leaf has depth 1. Walks with an explicit stack.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1usize)];
        while let Some((expr, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            match expr {
                Expr::Neg(operand) => pending.push((operand, depth + 1)),
                Expr::Binary { left, right, .. } | Expr::Compare { left, right, .. } => {
                    pending.push((left, depth + 1));
                    pending.push((right, depth + 1));
                }
                Expr::Call { args: items, .. } | Expr::List(items) => {
                    pending.extend(items.iter().map(|item| (item, depth + 1)));
                }
                Expr::Exact(_) | Expr::Real(_) | Expr::Symbol(_) | Expr::Boolean(_) => {}
            }
        }
        deepest
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Expr::Exact(_) | Expr::Real(_))
    }

    pub fn as_exact(&self) -> Option<Rational> {
        match self {
            Expr::Exact(r) => Some(*r),
            _ => None,
        }
    }
}

/// Collect every symbol referenced in an expression, sorted
pub fn collect_symbols(expr: &Expr) -> BTreeSet<String> {
    let mut symbols = BTreeSet::new();
    collect_symbols_recursive(expr, &mut symbols);
    symbols
}

fn collect_symbols_recursive(expr: &Expr, symbols: &mut BTreeSet<String>) {
    match expr {
        Expr::Symbol(name) => {
            symbols.insert(name.clone());
        }
        Expr::Neg(operand) => collect_symbols_recursive(operand, symbols),
        Expr::Binary { left, right, .. } | Expr::Compare { left, right, .. } => {
            collect_symbols_recursive(left, symbols);
            collect_symbols_recursive(right, symbols);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect_symbols_recursive(arg, symbols);
            }
        }
        Expr::List(items) => {
            for item in items {
                collect_symbols_recursive(item, symbols);
            }
        }
        Expr::Exact(_) | Expr::Real(_) | Expr::Boolean(_) => {}
    }
}

/// Replace every occurrence of `name` with `value`
pub fn substitute(expr: &Expr, name: &str, value: &Expr) -> Expr {
    match expr {
        Expr::Symbol(symbol) if symbol == name => value.clone(),
        Expr::Neg(operand) => Expr::neg(substitute(operand, name, value)),
        Expr::Binary { left, op, right } => {
            Expr::binary(substitute(left, name, value), *op, substitute(right, name, value))
        }
        Expr::Compare { left, op, right } => {
            Expr::compare(substitute(left, name, value), *op, substitute(right, name, value))
        }
        Expr::Call { name: function, args } => Expr::Call {
            name: function.clone(),
            args: args.iter().map(|arg| substitute(arg, name, value)).collect(),
        },
        Expr::List(items) => Expr::List(items.iter().map(|item| substitute(item, name, value)).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_collected_once() {
        let expr = Expr::binary(
            Expr::call("Sin", vec![Expr::symbol("x")]),
            BinaryOp::Add,
            Expr::binary(Expr::symbol("x"), BinaryOp::Multiply, Expr::symbol("y")),
        );
        let symbols: Vec<String> = collect_symbols(&expr).into_iter().collect();
        assert_eq!(symbols, vec!["x", "y"]);
    }

    #[test]
    fn substitution_replaces_nested_symbols() {
        let expr = Expr::call("Sin", vec![Expr::symbol("x")]);
        let replaced = substitute(&expr, "x", &Expr::integer(0));
        assert_eq!(replaced, Expr::call("Sin", vec![Expr::integer(0)]));
    }
}
