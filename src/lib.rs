pub mod ast;
pub mod calculus;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod matrix;

pub use ast::{Evaluator, MathValue, Parser};
pub use error::{Error, Result};
pub use matrix::Matrix;

/// One-shot evaluation with a fresh evaluator and the default configuration.
pub fn evaluate_expression(expression: &str) -> Result<MathValue> {
    let mut evaluator = Evaluator::new(100);
    evaluator.evaluate_expression(expression)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_expression() {
        assert_eq!(evaluate_expression("2 + 3 * 4").unwrap(), MathValue::from(14));
        assert_eq!(
            evaluate_expression("2x + 1").unwrap(),
            MathValue::symbol("((2 * x) + 1)")
        );
        assert!(evaluate_expression("1 / 0").is_err());
    }
}
