use crate::ast::{Operator, Sign};
use crate::error::{Error, Result};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

/// Magnitudes at or below this are treated as zero.
pub const EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 7);

/// Result of evaluating an expression: a number, or the text of an
/// expression that still depends on unbound names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MathValue {
    Number(Decimal),
    Symbolic(String),
}

impl MathValue {
    pub fn number(value: Decimal) -> Self {
        MathValue::Number(value)
    }

    pub fn symbol(text: impl Into<String>) -> Self {
        MathValue::Symbolic(text.into())
    }

    /// Converts a native result, rejecting NaN and infinities.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::arithmetic(format!("non-finite result {}", value)));
        }
        Decimal::from_f64(value)
            .map(MathValue::Number)
            .ok_or_else(|| Error::arithmetic(format!("{} is outside the decimal range", value)))
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            MathValue::Number(value) => Some(*value),
            MathValue::Symbolic(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().and_then(|value| value.to_f64())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, MathValue::Number(_))
    }

    pub fn is_symbolic(&self) -> bool {
        !self.is_numeric()
    }

    pub fn is_zero(&self) -> bool {
        match self {
            MathValue::Number(value) => value.abs() <= EPSILON,
            MathValue::Symbolic(text) => text.is_empty(),
        }
    }

    pub fn is_one(&self) -> bool {
        matches!(self, MathValue::Number(value) if (*value - Decimal::ONE).abs() <= EPSILON)
    }

    /// Applies `operator` with `self` on the left. Any symbolic side makes the
    /// whole result symbolic.
    pub fn combine(&self, operator: Operator, other: &MathValue) -> Result<MathValue> {
        match (self, other) {
            (MathValue::Number(left), MathValue::Number(right)) => {
                operator.apply(*left, *right).map(MathValue::Number)
            }
            _ => Ok(MathValue::Symbolic(format!("({} {} {})", self, operator, other))),
        }
    }

    pub fn add(&self, other: &MathValue) -> Result<MathValue> {
        self.combine(Operator::Add, other)
    }

    pub fn sub(&self, other: &MathValue) -> Result<MathValue> {
        self.combine(Operator::Subtract, other)
    }

    pub fn mul(&self, other: &MathValue) -> Result<MathValue> {
        self.combine(Operator::Multiply, other)
    }

    pub fn div(&self, other: &MathValue) -> Result<MathValue> {
        self.combine(Operator::Divide, other)
    }

    /// Numeric negation, or `-` prefixed to symbolic text. Text that is not a
    /// single atom is wrapped first, so `a - b` becomes `-(a - b)`.
    pub fn negate(&self) -> MathValue {
        match self {
            MathValue::Number(value) => MathValue::Number(-*value),
            MathValue::Symbolic(text) if is_atom(text) => {
                MathValue::Symbolic(format!("-{}", text))
            }
            MathValue::Symbolic(text) => MathValue::Symbolic(format!("-({})", text)),
        }
    }

    pub fn apply_sign(&self, sign: Sign) -> MathValue {
        match sign {
            Sign::Positive => self.clone(),
            Sign::Negative => self.negate(),
        }
    }

    /// Snaps near-zero numbers to zero and rounds to `precision` fractional
    /// digits. Symbolic values pass through.
    pub fn rounded(&self, precision: u32) -> MathValue {
        match self {
            MathValue::Number(_) if self.is_zero() => MathValue::Number(Decimal::ZERO),
            MathValue::Number(value) => MathValue::Number(
                value
                    .round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
                    .normalize(),
            ),
            MathValue::Symbolic(_) => self.clone(),
        }
    }
}

/// A name or literal, optionally followed by one parenthesized group
/// (`x`, `2.5`, `sin(x + 1)`), or text wrapped in a single pair of parentheses.
fn is_atom(text: &str) -> bool {
    let rest = text.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_' || c == '.');
    if rest.len() == text.len() {
        return is_wrapped(text);
    }
    rest.is_empty() || is_wrapped(rest)
}

fn is_wrapped(text: &str) -> bool {
    if !text.starts_with('(') || !text.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (index, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return index == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

impl From<Decimal> for MathValue {
    fn from(value: Decimal) -> Self {
        MathValue::Number(value)
    }
}

impl From<i64> for MathValue {
    fn from(value: i64) -> Self {
        MathValue::Number(Decimal::from(value))
    }
}

impl From<i32> for MathValue {
    fn from(value: i32) -> Self {
        MathValue::Number(Decimal::from(value))
    }
}

impl fmt::Display for MathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // `normalize` also turns -0 into 0
            MathValue::Number(value) => write!(f, "{}", value.normalize()),
            MathValue::Symbolic(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_numeric_combine() {
        let a = MathValue::from(dec!(1.5));
        let b = MathValue::from(dec!(2));
        assert_eq!(a.mul(&b).unwrap(), MathValue::from(dec!(3.0)));
        assert_eq!(
            a.combine(Operator::LessThan, &b).unwrap(),
            MathValue::from(dec!(1))
        );
    }

    #[test]
    fn test_symbolic_combine() {
        let x = MathValue::symbol("x");
        let two = MathValue::from(2);
        assert_eq!(x.add(&two).unwrap(), MathValue::symbol("(x + 2)"));
        assert_eq!(two.combine(Operator::Power, &x).unwrap().to_string(), "(2 ^ x)");
    }

    #[test]
    fn test_symbolic_division_by_zero_stays_symbolic() {
        let x = MathValue::symbol("x");
        assert!(x.div(&MathValue::from(0)).is_ok());
        assert!(MathValue::from(1).div(&MathValue::from(0)).is_err());
    }

    #[test]
    fn test_zero_tests() {
        assert!(MathValue::from(dec!(0.00000009)).is_zero());
        assert!(!MathValue::from(dec!(0.0000002)).is_zero());
        assert!(MathValue::symbol("").is_zero());
        assert!(!MathValue::symbol("x").is_zero());
    }

    #[test]
    fn test_negate() {
        assert_eq!(MathValue::from(3).negate(), MathValue::from(-3));
        assert_eq!(MathValue::symbol("x").negate(), MathValue::symbol("-x"));
        assert_eq!(MathValue::symbol("-x").negate(), MathValue::symbol("-(-x)"));
        assert_eq!(MathValue::symbol("(x + 1)").negate(), MathValue::symbol("-(x + 1)"));
        assert_eq!(MathValue::symbol("sin(x)").negate(), MathValue::symbol("-sin(x)"));
    }

    #[test]
    fn test_negate_wraps_compound_text() {
        assert_eq!(MathValue::symbol("a - b").negate(), MathValue::symbol("-(a - b)"));
        assert_eq!(MathValue::symbol("2x^2").negate(), MathValue::symbol("-(2x^2)"));
        assert_eq!(
            MathValue::symbol("(a) + (b)").negate(),
            MathValue::symbol("-((a) + (b))")
        );
    }

    #[test]
    fn test_rounding() {
        let value = MathValue::from(dec!(0.123456789));
        assert_eq!(value.rounded(4), MathValue::from(dec!(0.1235)));
        assert_eq!(MathValue::from(dec!(-0.00000001)).rounded(10).to_string(), "0");
        assert_eq!(MathValue::from(dec!(2.50)).rounded(10).to_string(), "2.5");
    }

    #[test]
    fn test_non_finite_native_results() {
        assert!(MathValue::from_f64(f64::NAN).is_err());
        assert!(MathValue::from_f64(f64::INFINITY).is_err());
        assert!(MathValue::from_f64(0.5).is_ok());
    }
}
