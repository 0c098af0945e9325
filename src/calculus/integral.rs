use crate::error::{Error, Result};
use rust_decimal::Decimal;

/// Sub-intervals used by the `int` special form.
pub const INTERVALS: usize = 200;

/// Composite Simpson's rule over `[lower, upper]`. An odd interval count is
/// bumped to the next even one.
pub fn simpson<F>(lower: Decimal, upper: Decimal, intervals: usize, mut f: F) -> Result<Decimal>
where
    F: FnMut(Decimal) -> Result<Decimal>,
{
    let n = match intervals {
        0 => 2,
        n if n % 2 == 1 => n + 1,
        n => n,
    };
    let overflow = || Error::arithmetic("integral overflows the decimal range");

    let width = upper.checked_sub(lower).ok_or_else(overflow)?;
    let step = width.checked_div(Decimal::from(n)).ok_or_else(overflow)?;

    let mut sum = f(lower)?.checked_add(f(upper)?).ok_or_else(overflow)?;
    for i in 1..n {
        let offset = step.checked_mul(Decimal::from(i)).ok_or_else(overflow)?;
        let x = lower.checked_add(offset).ok_or_else(overflow)?;
        let weight = if i % 2 == 1 { Decimal::from(4) } else { Decimal::TWO };
        let sample = f(x)?.checked_mul(weight).ok_or_else(overflow)?;
        sum = sum.checked_add(sample).ok_or_else(overflow)?;
    }

    sum.checked_mul(step)
        .and_then(|total| total.checked_div(Decimal::from(3)))
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_simpson_is_exact_for_cubics() {
        let area = simpson(dec!(0), dec!(2), 10, |x| Ok(x * x * x)).unwrap();
        assert_eq!(area, dec!(4));
    }

    #[test]
    fn test_reversed_bounds_flip_sign() {
        let area = simpson(dec!(1), dec!(0), INTERVALS, |x| Ok(x)).unwrap();
        assert_eq!(area, dec!(-0.5));
    }

    #[test]
    fn test_odd_interval_count() {
        let area = simpson(dec!(0), dec!(3), 3, |_| Ok(dec!(2))).unwrap();
        assert_eq!(area, dec!(6));
    }

    #[test]
    fn test_integrand_errors_propagate() {
        let result = simpson(dec!(0), dec!(1), 4, |_| Err(Error::arithmetic("boom")));
        assert_eq!(result, Err(Error::Arithmetic("boom".to_string())));
    }
}
