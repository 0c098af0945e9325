use crate::ast::{AngleUsage, EvalContext};
use crate::error::Result;
use vectrix_macros::vectrix_fn;

pub fn register(context: &mut EvalContext) {
    context.register_native("sqrt", sqrt, AngleUsage::None);
    context.register_native("cbrt", cbrt, AngleUsage::None);
    context.register_native("abs", abs, AngleUsage::None);
    context.register_native("ln", ln, AngleUsage::None);
    context.register_native("log", log, AngleUsage::None);
}

#[vectrix_fn]
fn sqrt(x: f64) -> Result<f64> {
    Ok(x.sqrt())
}

#[vectrix_fn]
fn cbrt(x: f64) -> Result<f64> {
    Ok(x.cbrt())
}

#[vectrix_fn]
fn abs(x: f64) -> Result<f64> {
    Ok(x.abs())
}

/// Natural logarithm.
#[vectrix_fn]
fn ln(x: f64) -> Result<f64> {
    Ok(x.ln())
}

/// Base-10 logarithm.
#[vectrix_fn]
fn log(x: f64) -> Result<f64> {
    Ok(x.log10())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roots_and_logs() {
        assert_eq!(sqrt(&[16.0]).unwrap(), 4.0);
        assert_eq!(cbrt(&[27.0]).unwrap(), 3.0);
        assert_eq!(abs(&[-2.5]).unwrap(), 2.5);
        assert_eq!(log(&[1000.0]).unwrap(), 3.0);
        assert_eq!(ln(&[1.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_domain_errors_surface_as_nan() {
        // non-finite results are rejected by the evaluator, not here
        assert!(sqrt(&[-1.0]).unwrap().is_nan());
        assert!(ln(&[0.0]).unwrap().is_infinite());
    }
}
