//! Exact rational arithmetic used by symbolic evaluation.
//!
//! Operations return `None` on overflow so callers can fall back to floating point.

use std::cmp::Ordering;
use std::fmt;

/// A normalized fraction with a strictly positive denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i64,
    den: i64,
}

fn gcd(a: i64, b: i64) -> u64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Rational {
    pub const ZERO: Self = Self { num: 0, den: 1 };
    pub const ONE: Self = Self { num: 1, den: 1 };

    pub fn integer(value: i64) -> Self {
        Self { num: value, den: 1 }
    }

    /// Builds `num/den` in lowest terms.
    ///
    /// Returns `None` for a zero denominator, or when either part is `i64::MIN`, whose
    /// negation does not fit.
    pub fn new(num: i64, den: i64) -> Option<Self> {
        if den == 0 || num == i64::MIN || den == i64::MIN {
            return None;
        }
        let g = i64::try_from(gcd(num, den)).ok()?.max(1);
        let (mut num, mut den) = (num / g, den / g);
        if den < 0 {
            num = num.checked_neg()?;
            den = den.checked_neg()?;
        }
        Some(Self { num, den })
    }

    pub fn numerator(self) -> i64 {
        self.num
    }

    pub fn denominator(self) -> i64 {
        self.den
    }

    pub fn is_integer(self) -> bool {
        self.den == 1
    }

    pub fn is_zero(self) -> bool {
        self.num == 0
    }

    pub fn is_one(self) -> bool {
        self.num == 1 && self.den == 1
    }

    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        let num = self.num.checked_mul(other.den)?.checked_add(other.num.checked_mul(self.den)?)?;
        Self::new(num, self.den.checked_mul(other.den)?)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.checked_add(other.checked_neg()?)
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        Self::new(self.num.checked_mul(other.num)?, self.den.checked_mul(other.den)?)
    }

    /// `None` on overflow or division by zero.
    pub fn checked_div(self, other: Self) -> Option<Self> {
        Self::new(self.num.checked_mul(other.den)?, self.den.checked_mul(other.num)?)
    }

    pub fn checked_neg(self) -> Option<Self> {
        Some(Self { num: self.num.checked_neg()?, den: self.den })
    }

    /// Integer powers only; negative exponents invert.
    pub fn checked_pow(self, exponent: i64) -> Option<Self> {
        let magnitude = u32::try_from(exponent.unsigned_abs()).ok()?;
        let num = self.num.checked_pow(magnitude)?;
        let den = self.den.checked_pow(magnitude)?;
        if exponent < 0 { Self::new(den, num) } else { Self::new(num, den) }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = i128::from(self.num) * i128::from(other.den);
        let rhs = i128::from(other.num) * i128::from(self.den);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 { write!(f, "{}", self.num) } else { write!(f, "{}/{}", self.num, self.den) }
    }
}

/// Formats a float with at most `decimals` fractional digits.
///
/// Trailing zeros are trimmed but one fractional digit is always kept so the text still
/// reads as an approximation (`4.0`, not `4`). Magnitudes outside `[1e-5, 1e15)` use
/// `E` notation.
pub fn format_real(value: f64, decimals: u32) -> String {
    if value.is_nan() {
        return "Indeterminate".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    let decimals = decimals.max(1) as usize;
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-5..1e15).contains(&magnitude) {
        let text = format!("{value:.decimals$e}");
        let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
        return format!("{}E{}", trim_fraction(mantissa), exponent);
    }
    let text = format!("{value:.decimals$}");
    let text = trim_fraction(&text);
    if text == "-0.0" { "0.0".to_string() } else { text }
}

fn trim_fraction(text: &str) -> String {
    match text.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            let fraction = if fraction.is_empty() { "0" } else { fraction };
            format!("{whole}.{fraction}")
        }
        None => format!("{text}.0"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rationals_are_normalized() {
        let r = Rational::new(4, -6).unwrap();
        assert_eq!(r.numerator(), -2);
        assert_eq!(r.denominator(), 3);
        assert_eq!(r.to_string(), "-2/3");
        assert!(Rational::new(1, 0).is_none());
    }

    #[test]
    fn arithmetic_stays_exact() {
        let third = Rational::new(1, 3).unwrap();
        let sum = third.checked_add(third).unwrap().checked_add(third).unwrap();
        assert!(sum.is_one());
        assert_eq!(Rational::integer(2).checked_pow(-2).unwrap().to_string(), "1/4");
        assert!(Rational::integer(i64::MAX).checked_add(Rational::ONE).is_none());
    }

    #[test]
    fn min_integer_is_not_exact() {
        assert!(Rational::new(i64::MIN, 1).is_none());
        assert!(Rational::new(1, i64::MIN).is_none());
        assert!(Rational::new(i64::MIN, -1).is_none());
        assert!(Rational::integer(1 << 62).checked_mul(Rational::integer(-2)).is_none());
        assert!(Rational::integer(-2).checked_pow(63).is_none());
        assert_eq!(Rational::new(i64::MAX, -i64::MAX).unwrap().to_string(), "-1");
    }

    #[test]
    fn real_formatting_trims_zeros() {
        assert_eq!(format_real(4.0, 1), "4.0");
        assert_eq!(format_real(1.0 / 3.0, 4), "0.3333");
        assert_eq!(format_real(-0.01, 1), "0.0");
        assert_eq!(format_real(2.5e20, 3), "2.5E20");
    }
}
