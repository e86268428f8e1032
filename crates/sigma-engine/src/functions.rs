//! Numeric function and constant tables for the reference engine
//!
//! Lookups are case-insensitive for functions (`sin`, `Sin`) and exact for
//! constants, which the engine only knows by their native names.

use std::f64::consts;

/// Native constants understood by the engine and their numeric values
pub const CONSTANTS: &[(&str, f64)] = &[
    ("Pi", consts::PI),
    ("E", consts::E),
    ("Degree", consts::PI / 180.0),
    ("GoldenRatio", 1.618_033_988_749_895),
    ("EulerGamma", 0.577_215_664_901_532_9),
    ("Catalan", 0.915_965_594_177_219),
];

/// Value of a native constant, if `name` is one
pub fn constant_value(name: &str) -> Option<f64> {
    CONSTANTS.iter().find(|(constant, _)| *constant == name).map(|(_, value)| *value)
}

/// Why a numeric function could not produce a value
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionError {
    /// The engine has no numeric implementation for this name
    Unknown,
    /// Wrong number of arguments
    Arity { expected: &'static str, actual: usize },
    /// Argument outside the real domain of the function
    Domain(String),
}

/// Whether `name` has a numeric implementation
pub fn is_numeric_function(name: &str) -> bool {
    !matches!(call_numeric(name, &[1.0]), Err(FunctionError::Unknown))
        || !matches!(call_numeric(name, &[1.0, 1.0]), Err(FunctionError::Unknown))
}

fn unary(args: &[f64], f: impl Fn(f64) -> f64) -> Result<f64, FunctionError> {
    match args {
        [x] => Ok(f(*x)),
        _ => Err(FunctionError::Arity { expected: "1", actual: args.len() }),
    }
}

fn guarded(
    args: &[f64],
    valid: impl Fn(f64) -> bool,
    name: &str,
    f: impl Fn(f64) -> f64,
) -> Result<f64, FunctionError> {
    match args {
        [x] if valid(*x) => Ok(f(*x)),
        [x] => Err(FunctionError::Domain(format!("{name} is undefined at {x}"))),
        _ => Err(FunctionError::Arity { expected: "1", actual: args.len() }),
    }
}

/// Evaluate a named function numerically
pub fn call_numeric(name: &str, args: &[f64]) -> Result<f64, FunctionError> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "sin" => unary(args, f64::sin),
        "cos" => unary(args, f64::cos),
        "tan" => unary(args, f64::tan),
        "cot" => unary(args, |x| 1.0 / x.tan()),
        "sec" => unary(args, |x| 1.0 / x.cos()),
        "csc" => unary(args, |x| 1.0 / x.sin()),
        "sinh" => unary(args, f64::sinh),
        "cosh" => unary(args, f64::cosh),
        "tanh" => unary(args, f64::tanh),
        "coth" => unary(args, |x| 1.0 / x.tanh()),
        "sech" => unary(args, |x| 1.0 / x.cosh()),
        "csch" => unary(args, |x| 1.0 / x.sinh()),
        "arcsin" | "asin" => guarded(args, |x| (-1.0..=1.0).contains(&x), name, f64::asin),
        "arccos" | "acos" => guarded(args, |x| (-1.0..=1.0).contains(&x), name, f64::acos),
        "arctan" | "atan" => unary(args, f64::atan),
        "arccot" | "acot" => unary(args, |x| (1.0 / x).atan()),
        "arcsinh" | "asinh" => unary(args, f64::asinh),
        "arccosh" | "acosh" => guarded(args, |x| x >= 1.0, name, f64::acosh),
        "arctanh" | "atanh" => guarded(args, |x| x.abs() < 1.0, name, f64::atanh),
        "sqrt" => guarded(args, |x| x >= 0.0, name, f64::sqrt),
        "exp" => unary(args, f64::exp),
        "ln" => guarded(args, |x| x > 0.0, name, f64::ln),
        "log" => match args {
            [x] if *x > 0.0 => Ok(x.ln()),
            [base, x] if *base > 0.0 && *base != 1.0 && *x > 0.0 => Ok(x.ln() / base.ln()),
            [_] | [_, _] => Err(FunctionError::Domain(format!("{name} is undefined for {args:?}"))),
            _ => Err(FunctionError::Arity { expected: "1 or 2", actual: args.len() }),
        },
        "log10" => guarded(args, |x| x > 0.0, name, f64::log10),
        "abs" => unary(args, f64::abs),
        "sign" => unary(args, |x| if x == 0.0 { 0.0 } else { x.signum() }),
        "floor" => unary(args, f64::floor),
        "ceiling" | "ceil" => unary(args, f64::ceil),
        "round" => unary(args, f64::round),
        "gamma" => guarded(args, |x| !(x <= 0.0 && x.fract() == 0.0), name, gamma),
        "factorial" => guarded(args, |x| x >= 0.0 && x.fract() == 0.0, name, |x| gamma(x + 1.0)),
        "max" if !args.is_empty() => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        "min" if !args.is_empty() => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
        "max" | "min" => Err(FunctionError::Arity { expected: "at least 1", actual: 0 }),
        _ => Err(FunctionError::Unknown),
    }
}

/// Lanczos approximation (g = 7, n = 9)
fn gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        return consts::PI / ((consts::PI * x).sin() * gamma(1.0 - x));
    }

    let x = x - 1.0;
    let t = x + 7.5;
    let series = COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + i as f64));
    (2.0 * consts::PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * series
}
