//! Whitelists of recognized constants and function names
//!
//! Constants carry the name a user types and, where it differs, the name the engine
//! expects. Lookups are case-insensitive.

/// A recognized constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant {
    pub name: &'static str,
    pub native_name: Option<&'static str>,
}

impl Constant {
    const fn aliased(name: &'static str, native_name: &'static str) -> Self {
        Self { name, native_name: Some(native_name) }
    }

    const fn plain(name: &'static str) -> Self {
        Self { name, native_name: None }
    }

    /// The token the engine understands
    pub fn engine_name(&self) -> &'static str {
        self.native_name.unwrap_or(self.name)
    }
}

pub const CONSTANTS: &[Constant] = &[
    Constant::aliased("pi", "Pi"),
    Constant::aliased("e", "E"),
    Constant::aliased("i", "I"),
    Constant::aliased("phi", "GoldenRatio"),
    Constant::aliased("deg", "Degree"),
    Constant::aliased("inf", "Infinity"),
    Constant::plain("Pi"),
    Constant::plain("E"),
    Constant::plain("I"),
    Constant::plain("GoldenRatio"),
    Constant::plain("Degree"),
    Constant::plain("Infinity"),
    Constant::plain("EulerGamma"),
    Constant::plain("Catalan"),
];

#[rustfmt::skip]
pub const FUNCTIONS: &[&str] = &[
    // trigonometric
    "sin", "cos", "tan", "cot", "sec", "csc",
    "arcsin", "arccos", "arctan", "arccot", "arcsec", "arccsc",
    "asin", "acos", "atan",
    // hyperbolic
    "sinh", "cosh", "tanh", "coth", "sech", "csch",
    "arcsinh", "arccosh", "arctanh", "arccoth",
    "asinh", "acosh", "atanh",
    // calculus
    "D", "Integrate", "Limit", "Sum", "Product",
    // linear algebra
    "Det", "Inverse", "Transpose", "Dot", "Cross", "Eigenvalues",
    // special and elementary
    "Sqrt", "Exp", "Log", "Ln", "Log10", "Abs", "Floor", "Ceiling", "Round", "Sign",
    "Gamma", "Factorial", "Max", "Min",
    // algebra
    "Solve", "Simplify", "Expand", "Factor", "N",
];

/// Literal words the engine reads as values
pub const KEYWORDS: &[&str] = &["True", "False"];

/// Static lookup over the constant and function whitelists
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolRegistry;

impl SymbolRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn constants(&self) -> &'static [Constant] {
        CONSTANTS
    }

    pub fn constant(&self, token: &str) -> Option<&'static Constant> {
        CONSTANTS.iter().find(|c| c.name.eq_ignore_ascii_case(token))
    }

    pub fn is_constant(&self, token: &str) -> bool {
        self.constant(token).is_some()
    }

    pub fn is_keyword(&self, token: &str) -> bool {
        KEYWORDS.contains(&token)
    }

    pub fn is_function(&self, name: &str) -> bool {
        FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(name))
    }

    /// User-name to engine-name bindings used to seed assignment memory
    pub fn native_bindings(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        CONSTANTS.iter().filter_map(|c| c.native_name.map(|native| (c.name, native)))
    }
}
