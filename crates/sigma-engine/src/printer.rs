//! Text renderings of engine expressions
//!
//! `print` produces the canonical input form the parser reads back; `typeset`
//! produces a TeX-like display form.

use crate::ast::{BinaryOp, Expr};
use crate::number::format_real;

const PREC_COMPARE: u8 = 0;
const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_NEG: u8 = 3;
const PREC_POW: u8 = 4;
const PREC_ATOM: u8 = 5;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Compare { .. } => PREC_COMPARE,
        Expr::Binary { op: BinaryOp::Power, .. } => PREC_POW,
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Neg(_) => PREC_NEG,
        Expr::Exact(r) if r.numerator() < 0 => PREC_NEG,
        Expr::Exact(r) if !r.is_integer() => PREC_MUL,
        Expr::Real(f) if *f < 0.0 => PREC_NEG,
        _ => PREC_ATOM,
    }
}

fn is_negative(expr: &Expr) -> bool {
    matches!(expr, Expr::Neg(_))
        || matches!(expr, Expr::Exact(r) if r.numerator() < 0)
        || matches!(expr, Expr::Real(f) if *f < 0.0)
}

fn format_shortest(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else if value.is_finite() && value.abs() >= 1e15 {
        format_real(value, 15)
    } else if value.is_finite() {
        value.to_string()
    } else {
        format_real(value, 1)
    }
}

fn format_number(expr: &Expr, decimals: Option<u32>) -> Option<String> {
    match expr {
        Expr::Exact(r) => Some(r.to_string()),
        Expr::Real(f) => Some(match decimals {
            Some(d) => format_real(*f, d),
            None => format_shortest(*f),
        }),
        _ => None,
    }
}

fn absolute(expr: &Expr) -> Expr {
    match expr {
        Expr::Neg(inner) => (**inner).clone(),
        Expr::Exact(r) => r.checked_neg().map_or_else(|| Expr::Real(-r.to_f64()), Expr::Exact),
        Expr::Real(f) => Expr::Real(-f),
        other => other.clone(),
    }
}

/// Canonical text form. `decimals` controls how approximate numbers are printed.
pub fn print(expr: &Expr, decimals: Option<u32>) -> String {
    if let Some(number) = format_number(expr, decimals) {
        return number;
    }

    match expr {
        Expr::Symbol(name) => name.clone(),
        Expr::Boolean(true) => "True".to_string(),
        Expr::Boolean(false) => "False".to_string(),
        Expr::Neg(operand) => format!("-{}", wrap(operand, PREC_NEG, decimals)),
        Expr::Binary { left, op: BinaryOp::Add, right } if is_negative(right) => {
            format!(
                "{}-{}",
                wrap(left, PREC_ADD, decimals),
                wrap_strict(&absolute(right), PREC_ADD, decimals)
            )
        }
        Expr::Binary { left, op, right } => {
            let prec = op.precedence();
            let (left_text, right_text) = match op {
                // x^y^z groups to the right; (x^y)^z needs parentheses
                BinaryOp::Power => (wrap_strict(left, prec, decimals), wrap(right, prec, decimals)),
                BinaryOp::Subtract | BinaryOp::Divide => {
                    (wrap(left, prec, decimals), wrap_strict(right, prec, decimals))
                }
                BinaryOp::Add | BinaryOp::Multiply => {
                    (wrap(left, prec, decimals), wrap_operand(right, prec, decimals))
                }
            };
            format!("{left_text}{}{right_text}", op.symbol())
        }
        Expr::Compare { left, op, right } => format!(
            "{}{}{}",
            wrap(left, PREC_ADD, decimals),
            op.symbol(),
            wrap(right, PREC_ADD, decimals)
        ),
        Expr::Call { name, args } => {
            let args: Vec<String> = args.iter().map(|arg| print(arg, decimals)).collect();
            format!("{name}({})", args.join(","))
        }
        Expr::List(items) => {
            let items: Vec<String> = items.iter().map(|item| print(item, decimals)).collect();
            format!("{{{}}}", items.join(","))
        }
        Expr::Exact(_) | Expr::Real(_) => unreachable!("numbers are formatted above"),
    }
}

fn wrap(expr: &Expr, min_prec: u8, decimals: Option<u32>) -> String {
    let text = print(expr, decimals);
    if precedence(expr) < min_prec { format!("({text})") } else { text }
}

fn wrap_strict(expr: &Expr, min_prec: u8, decimals: Option<u32>) -> String {
    let text = print(expr, decimals);
    if precedence(expr) <= min_prec || is_negative(expr) { format!("({text})") } else { text }
}

fn wrap_operand(expr: &Expr, min_prec: u8, decimals: Option<u32>) -> String {
    let text = print(expr, decimals);
    if precedence(expr) < min_prec || is_negative(expr) { format!("({text})") } else { text }
}

const TYPESET_FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "sinh", "cosh", "tanh", "coth", "arcsin", "arccos",
    "arctan", "exp", "log", "ln", "max", "min", "det",
];

fn typeset_symbol(name: &str) -> String {
    match name {
        "Pi" => "\\pi".to_string(),
        "E" => "e".to_string(),
        "I" => "i".to_string(),
        "Infinity" => "\\infty".to_string(),
        "Degree" => "^{\\circ}".to_string(),
        "GoldenRatio" => "\\phi".to_string(),
        "EulerGamma" => "\\gamma".to_string(),
        _ if name.chars().count() == 1 => name.to_string(),
        _ => format!("\\mathrm{{{name}}}"),
    }
}

/// TeX-like display form
pub fn typeset(expr: &Expr) -> String {
    match expr {
        Expr::Exact(r) if r.is_integer() => r.to_string(),
        Expr::Exact(r) => {
            let sign = if r.numerator() < 0 { "-" } else { "" };
            format!("{sign}\\frac{{{}}}{{{}}}", r.numerator().unsigned_abs(), r.denominator())
        }
        Expr::Real(f) => format_shortest(*f),
        Expr::Symbol(name) => typeset_symbol(name),
        Expr::Boolean(value) => format!("\\text{{{}}}", if *value { "True" } else { "False" }),
        Expr::Neg(operand) => format!("-{}", typeset_group(operand, PREC_NEG)),
        Expr::Binary { left, op, right } => match op {
            BinaryOp::Divide => format!("\\frac{{{}}}{{{}}}", typeset(left), typeset(right)),
            BinaryOp::Power => {
                format!("{{{}}}^{{{}}}", typeset_group(left, PREC_ATOM), typeset(right))
            }
            BinaryOp::Multiply => format!(
                "{} \\cdot {}",
                typeset_group(left, PREC_MUL),
                typeset_group(right, PREC_MUL + 1)
            ),
            BinaryOp::Add => format!("{}+{}", typeset(left), typeset_group(right, PREC_ADD + 1)),
            BinaryOp::Subtract => {
                format!("{}-{}", typeset(left), typeset_group(right, PREC_ADD + 1))
            }
        },
        Expr::Compare { left, op, right } => {
            let symbol = match op.symbol() {
                "==" => "=",
                "!=" => "\\neq ",
                "<=" => "\\leq ",
                ">=" => "\\geq ",
                other => other,
            };
            format!("{}{symbol}{}", typeset(left), typeset(right))
        }
        Expr::Call { name, args } => {
            let args: Vec<String> = args.iter().map(typeset).collect();
            let lower = name.to_ascii_lowercase();
            if lower == "sqrt" && args.len() == 1 {
                format!("\\sqrt{{{}}}", args[0])
            } else if TYPESET_FUNCTIONS.contains(&lower.as_str()) {
                format!("\\{lower}\\left({}\\right)", args.join(","))
            } else {
                format!("\\operatorname{{{name}}}\\left({}\\right)", args.join(","))
            }
        }
        Expr::List(items) => {
            if items.iter().all(|item| matches!(item, Expr::List(_))) && !items.is_empty() {
                let rows: Vec<String> = items
                    .iter()
                    .map(|row| match row {
                        Expr::List(cells) => cells.iter().map(typeset).collect::<Vec<_>>().join(" & "),
                        other => typeset(other),
                    })
                    .collect();
                format!("\\begin{{pmatrix}}{}\\end{{pmatrix}}", rows.join(" \\\\ "))
            } else {
                let items: Vec<String> = items.iter().map(typeset).collect();
                format!("\\{{{}\\}}", items.join(","))
            }
        }
    }
}

fn typeset_group(expr: &Expr, min_prec: u8) -> String {
    let text = typeset(expr);
    if precedence(expr) < min_prec { format!("\\left({text}\\right)") } else { text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn round_trip(input: &str) -> String {
        print(&parse_expression(input).unwrap(), None)
    }

    #[test]
    fn printing_keeps_required_parentheses() {
        assert_eq!(round_trip("(1+2)*3"), "(1+2)*3");
        assert_eq!(round_trip("1-(2-3)"), "1-(2-3)");
        assert_eq!(round_trip("(x^2)^3"), "(x^2)^3");
        assert_eq!(round_trip("x^2^3"), "x^2^3");
        assert_eq!(round_trip("x^2 + y^2 == 1"), "x^2+y^2==1");
    }

    #[test]
    fn printing_folds_added_negatives_into_subtraction() {
        let expr = Expr::binary(Expr::symbol("x"), BinaryOp::Add, Expr::integer(-2));
        assert_eq!(print(&expr, None), "x-2");

        let expr = Expr::binary(Expr::symbol("x"), BinaryOp::Add, Expr::integer(i64::MIN));
        assert!(print(&expr, None).starts_with("x-9"));
    }

    #[test]
    fn approximate_numbers_respect_decimals() {
        assert_eq!(print(&Expr::Real(1.0 / 3.0), Some(3)), "0.333");
        assert_eq!(print(&Expr::Real(4.0), None), "4.0");
    }

    #[test]
    fn typesetting_lists_and_booleans() {
        assert_eq!(typeset(&parse_expression("{1,2,3}").unwrap()), "\\{1,2,3\\}");
        assert_eq!(typeset(&Expr::Boolean(true)), "\\text{True}");
        assert_eq!(
            typeset(&parse_expression("{{1,2},{3,4}}").unwrap()),
            "\\begin{pmatrix}1 & 2 \\\\ 3 & 4\\end{pmatrix}"
        );
    }
}
