//! Expression evaluator for the reference engine
//!
//! `simplify` folds exact arithmetic and keeps anything it cannot reduce symbolic.
//! `numericize` approximates every reducible subtree with floating point.
//! Both observe the caller's stop handle at every node.

use crate::EngineError;
use crate::StopHandle;
use crate::ast::{BinaryOp, CompareOp, Expr};
use crate::functions::{self, FunctionError};
use crate::number::Rational;

/// Per-call evaluation state: the stop signal to observe and the warnings emitted so far
pub struct Scope<'a> {
    stop: &'a StopHandle,
    warnings: &'a mut Vec<String>,
}

impl<'a> Scope<'a> {
    pub fn new(stop: &'a StopHandle, warnings: &'a mut Vec<String>) -> Self {
        Self { stop, warnings }
    }

    pub fn checkpoint(&self) -> Result<(), EngineError> {
        if self.stop.is_stop_requested() { Err(EngineError::Stopped) } else { Ok(()) }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.warnings.contains(&message) {
            self.warnings.push(message);
        }
    }
}

const INTEGRAL_TOLERANCE: f64 = 1e-12;

fn as_integral(value: f64) -> Option<i64> {
    let rounded = value.round();
    if (value - rounded).abs() < INTEGRAL_TOLERANCE && rounded.abs() < 1e15 {
        Some(rounded as i64)
    } else {
        None
    }
}

/// Evaluate an expression symbolically
pub fn simplify(expr: &Expr, scope: &mut Scope) -> Result<Expr, EngineError> {
    scope.checkpoint()?;

    match expr {
        Expr::Exact(_) | Expr::Real(_) | Expr::Boolean(_) | Expr::Symbol(_) => Ok(expr.clone()),

        Expr::Neg(operand) => {
            let operand = simplify(operand, scope)?;
            Ok(negate(operand))
        }

        Expr::Binary { left, op, right } => {
            let left = simplify(left, scope)?;
            let right = simplify(right, scope)?;
            fold_binary(left, *op, right, scope)
        }

        Expr::Compare { left, op, right } => {
            let left = simplify(left, scope)?;
            let right = simplify(right, scope)?;
            Ok(fold_compare(left, *op, right))
        }

        Expr::Call { name, args } => {
            let mut simplified = Vec::with_capacity(args.len());
            for arg in args {
                simplified.push(simplify(arg, scope)?);
            }
            Ok(fold_call(name, simplified, scope))
        }

        Expr::List(items) => {
            let mut simplified = Vec::with_capacity(items.len());
            for item in items {
                simplified.push(simplify(item, scope)?);
            }
            Ok(Expr::List(simplified))
        }
    }
}

fn negate(operand: Expr) -> Expr {
    match operand {
        Expr::Exact(r) => r.checked_neg().map_or(Expr::Real(-r.to_f64()), Expr::Exact),
        Expr::Real(f) => Expr::Real(-f),
        Expr::Neg(inner) => *inner,
        Expr::List(items) => Expr::List(items.into_iter().map(negate).collect()),
        other => Expr::neg(other),
    }
}

fn fold_binary(left: Expr, op: BinaryOp, right: Expr, scope: &mut Scope) -> Result<Expr, EngineError> {
    // Element-wise list arithmetic
    match (&left, &right) {
        (Expr::List(a), Expr::List(b)) => {
            if a.len() != b.len() {
                return Err(EngineError::Evaluation(format!(
                    "lists of lengths {} and {} are not conformable",
                    a.len(),
                    b.len()
                )));
            }
            let mut items = Vec::with_capacity(a.len());
            for (x, y) in a.iter().zip(b.iter()) {
                items.push(fold_binary(x.clone(), op, y.clone(), scope)?);
            }
            return Ok(Expr::List(items));
        }
        (Expr::List(a), _) => {
            let mut items = Vec::with_capacity(a.len());
            for x in a {
                items.push(fold_binary(x.clone(), op, right.clone(), scope)?);
            }
            return Ok(Expr::List(items));
        }
        (_, Expr::List(b)) => {
            let mut items = Vec::with_capacity(b.len());
            for y in b {
                items.push(fold_binary(left.clone(), op, y.clone(), scope)?);
            }
            return Ok(Expr::List(items));
        }
        _ => {}
    }

    if let (Some(a), Some(b)) = (left.as_exact(), right.as_exact()) {
        return Ok(fold_exact(a, op, b)?.unwrap_or_else(|| Expr::binary(left, op, right)));
    }

    if left.is_number() && right.is_number() {
        if let (Some(a), Some(b)) = (numeric_value(&left, None), numeric_value(&right, None)) {
            if op == BinaryOp::Divide && b == 0.0 {
                return Err(EngineError::Domain("division by zero".into()));
            }
            return Ok(Expr::Real(apply_real(a, op, b)));
        }
    }

    Ok(apply_identities(left, op, right))
}

/// Exact folding; `Ok(None)` means the result is not representable exactly.
fn fold_exact(a: Rational, op: BinaryOp, b: Rational) -> Result<Option<Expr>, EngineError> {
    let folded = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide => {
            if b.is_zero() {
                return Err(EngineError::Domain("division by zero".into()));
            }
            a.checked_div(b)
        }
        BinaryOp::Power => {
            if a.is_zero() && b < Rational::ZERO {
                return Err(EngineError::Domain("division by zero".into()));
            }
            if b.is_integer() {
                a.checked_pow(b.numerator())
            } else {
                exact_root(a, b)
            }
        }
    };

    Ok(folded.map(Expr::Exact).or_else(|| match op {
        // Overflow degrades to an approximation; roots stay symbolic
        BinaryOp::Power if !b.is_integer() => None,
        _ => Some(Expr::Real(apply_real(a.to_f64(), op, b.to_f64()))),
    }))
}

/// `a^(p/q)` when it has an exact integer value, e.g. `4^(1/2)`
fn exact_root(a: Rational, b: Rational) -> Option<Rational> {
    if !a.is_integer() || a < Rational::ZERO {
        return None;
    }
    let candidate = as_integral(a.to_f64().powf(b.to_f64()))?;
    let q = u32::try_from(b.denominator()).ok()?;
    let lhs = candidate.checked_pow(q)?;
    let rhs = a.checked_pow(b.numerator())?;
    (Rational::integer(lhs) == rhs).then_some(Rational::integer(candidate))
}

fn apply_real(a: f64, op: BinaryOp, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        BinaryOp::Power => a.powf(b),
    }
}

fn is_exact(expr: &Expr, value: i64) -> bool {
    expr.as_exact() == Some(Rational::integer(value))
}

fn apply_identities(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    match op {
        BinaryOp::Add if is_exact(&left, 0) => right,
        BinaryOp::Add | BinaryOp::Subtract if is_exact(&right, 0) => left,
        BinaryOp::Subtract if left == right => Expr::integer(0),
        BinaryOp::Subtract if is_exact(&left, 0) => negate(right),
        BinaryOp::Multiply if is_exact(&left, 0) || is_exact(&right, 0) => Expr::integer(0),
        BinaryOp::Multiply if is_exact(&left, 1) => right,
        BinaryOp::Multiply | BinaryOp::Divide if is_exact(&right, 1) => left,
        BinaryOp::Divide if left == right => Expr::integer(1),
        BinaryOp::Power if is_exact(&right, 0) => Expr::integer(1),
        BinaryOp::Power if is_exact(&right, 1) => left,
        _ => Expr::binary(left, op, right),
    }
}

fn fold_compare(left: Expr, op: CompareOp, right: Expr) -> Expr {
    if let (Some(a), Some(b)) = (numeric_value(&left, None), numeric_value(&right, None)) {
        return Expr::Boolean(op.holds(a, b));
    }
    match (&left, &right) {
        (Expr::Boolean(a), Expr::Boolean(b)) if matches!(op, CompareOp::Equal | CompareOp::NotEqual) => {
            Expr::Boolean((a == b) == (op == CompareOp::Equal))
        }
        _ if left == right && matches!(op, CompareOp::Equal | CompareOp::LessEqual | CompareOp::GreaterEqual) => {
            Expr::Boolean(true)
        }
        _ => Expr::compare(left, op, right),
    }
}

fn fold_call(name: &str, args: Vec<Expr>, scope: &mut Scope) -> Expr {
    let values: Option<Vec<f64>> = args.iter().map(|arg| numeric_value(arg, None)).collect();
    let Some(values) = values else {
        return Expr::Call { name: name.to_string(), args };
    };

    match functions::call_numeric(name, &values) {
        Ok(value) if value.is_finite() => {
            if let Some(integral) = as_integral(value) {
                Expr::integer(integral)
            } else if args.iter().any(|arg| matches!(arg, Expr::Real(_))) {
                Expr::Real(value)
            } else {
                // Exact input with an irrational value stays symbolic: Sqrt(2)
                Expr::Call { name: name.to_string(), args }
            }
        }
        Ok(_) => {
            scope.warn(format!("{name} has no finite value for the given arguments"));
            Expr::Call { name: name.to_string(), args }
        }
        Err(FunctionError::Unknown) => Expr::Call { name: name.to_string(), args },
        Err(FunctionError::Arity { expected, actual }) => {
            scope.warn(format!("{name} called with {actual} argument(s); {expected} expected"));
            Expr::Call { name: name.to_string(), args }
        }
        Err(FunctionError::Domain(message)) => {
            scope.warn(message);
            Expr::Call { name: name.to_string(), args }
        }
    }
}

/// Numeric value of an expression with no free symbols.
///
/// `binding` supplies a value for one symbol (the drawing variable).
pub fn numeric_value(expr: &Expr, binding: Option<(&str, f64)>) -> Option<f64> {
    match expr {
        Expr::Exact(r) => Some(r.to_f64()),
        Expr::Real(f) => Some(*f),
        Expr::Symbol(name) => match binding {
            Some((symbol, value)) if symbol == name => Some(value),
            _ => functions::constant_value(name),
        },
        Expr::Neg(operand) => numeric_value(operand, binding).map(|v| -v),
        Expr::Binary { left, op, right } => {
            let a = numeric_value(left, binding)?;
            let b = numeric_value(right, binding)?;
            Some(apply_real(a, *op, b))
        }
        Expr::Call { name, args } => {
            let values: Option<Vec<f64>> = args.iter().map(|arg| numeric_value(arg, binding)).collect();
            functions::call_numeric(name, &values?).ok()
        }
        Expr::Boolean(_) | Expr::Compare { .. } | Expr::List(_) => None,
    }
}

/// Replace every numerically reducible subtree with its approximation
pub fn numericize(expr: &Expr, scope: &mut Scope) -> Result<Expr, EngineError> {
    scope.checkpoint()?;

    if let Some(value) = numeric_value(expr, None) {
        if value.is_nan() {
            scope.warn("result is indeterminate");
        }
        return Ok(Expr::Real(value));
    }

    match expr {
        Expr::Neg(operand) => Ok(negate(numericize(operand, scope)?)),
        Expr::Binary { left, op, right } => {
            let left = numericize(left, scope)?;
            let right = numericize(right, scope)?;
            Ok(Expr::binary(left, *op, right))
        }
        Expr::Compare { left, op, right } => {
            let left = numericize(left, scope)?;
            let right = numericize(right, scope)?;
            Ok(fold_compare(left, *op, right))
        }
        Expr::Call { name, args } => {
            let mut approximated = Vec::with_capacity(args.len());
            for arg in args {
                approximated.push(numericize(arg, scope)?);
            }
            Ok(Expr::Call { name: name.clone(), args: approximated })
        }
        Expr::List(items) => {
            let mut approximated = Vec::with_capacity(items.len());
            for item in items {
                approximated.push(numericize(item, scope)?);
            }
            Ok(Expr::List(approximated))
        }
        other => Ok(other.clone()),
    }
}
