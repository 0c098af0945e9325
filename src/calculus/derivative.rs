use crate::ast::{EvalContext, Evaluator, MathValue, Node, Operator, Sign};
use crate::calculus::annotate;
use crate::calculus::polynomial::is_negated_variable;
use crate::error::{Error, Result};
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Symbolic first derivative of `node` with respect to `variable`.
///
/// Covers sums, products, quotients, powers with a constant exponent or a
/// constant base, and negation. A result without free names is returned as a
/// number; anything else as compact symbolic text such as `2x + 2`.
pub fn differentiate(evaluator: &Evaluator, node: &Node, variable: &str) -> Result<MathValue> {
    let differentiator = Differentiator::new(evaluator, node, variable);
    let derivative = differentiator.derive(node, 0)?;

    let value = evaluator.evaluate(&derivative, &differentiator.scope)?;
    let result = match value {
        MathValue::Number(_) => value.rounded(evaluator.config().precision),
        MathValue::Symbolic(_) => MathValue::symbol(annotate(&derivative).to_string()),
    };
    debug!("d/d{} {} = {}", variable, node, result);
    Ok(result)
}

struct Differentiator<'a> {
    evaluator: &'a Evaluator,
    variable: &'a str,
    /// Constants and user functions only; variables stay free.
    scope: EvalContext<'a>,
    parents: HashMap<*const Node, &'a Node>,
}

impl<'a> Differentiator<'a> {
    fn new(evaluator: &'a Evaluator, root: &'a Node, variable: &'a str) -> Self {
        let mut parents = HashMap::new();
        link_parents(root, &mut parents);
        Self {
            evaluator,
            variable,
            scope: evaluator.context().child(),
            parents,
        }
    }

    fn parent(&self, node: &Node) -> Option<&'a Node> {
        self.parents.get(&(node as *const Node)).copied()
    }

    fn depends(&self, node: &Node) -> bool {
        node.contains_variable(self.variable)
    }

    /// Reduces a sub-tree that does not need differentiating to a number
    /// when it has no free names.
    fn fold(&self, node: &Node) -> Result<Node> {
        let value = self.evaluator.evaluate(node, &self.scope)?;
        match value.rounded(self.evaluator.config().precision) {
            MathValue::Number(rounded) => Ok(Node::Number(rounded)),
            MathValue::Symbolic(_) => Ok(node.clone()),
        }
    }

    fn derive(&self, node: &'a Node, depth: usize) -> Result<Node> {
        let limit = self.evaluator.config().max_depth;
        if depth > limit {
            return Err(Error::DepthExceeded { limit });
        }
        let depth = depth + 1;

        match node {
            Node::Number(_) => Ok(zero()),

            Node::Variable { name, term } => {
                if name != self.variable {
                    return Ok(zero());
                }
                match term {
                    None => {
                        let negated = self.parent(node).is_some_and(is_negated_variable);
                        Ok(number(if negated { Decimal::NEGATIVE_ONE } else { Decimal::ONE }))
                    }
                    Some(term) if term.exponent.is_zero() => Ok(zero()),
                    Some(term) => {
                        let coefficient = term
                            .coefficient
                            .checked_mul(term.exponent)
                            .ok_or_else(|| Error::arithmetic("coefficient overflow"))?;
                        let exponent = term.exponent - Decimal::ONE;
                        let power = pow(Node::variable(name.as_str()), number(exponent));
                        Ok(mul(number(coefficient), power))
                    }
                }
            }

            Node::Unary { sign, operand } => {
                let inner = self.derive(operand, depth)?;
                // a bare `-x` already picked up its sign from the parent link
                if *sign == Sign::Positive || is_negated_variable(node) {
                    Ok(inner)
                } else {
                    Ok(neg(inner))
                }
            }

            Node::Binary {
                left,
                operator,
                right,
            } => self.derive_binary(left, *operator, right, depth),

            Node::FunctionCall { name, .. } => {
                if self.depends(node) {
                    Err(Error::Unsupported(format!(
                        "differentiating {}() with respect to {}",
                        name, self.variable
                    )))
                } else {
                    Ok(zero())
                }
            }

            Node::Vector(_) | Node::Matrix(_) | Node::FunctionDef { .. } => {
                Err(Error::Unsupported(format!("differentiating a {}", node.kind())))
            }
        }
    }

    fn derive_binary(
        &self,
        left: &'a Node,
        operator: Operator,
        right: &'a Node,
        depth: usize,
    ) -> Result<Node> {
        match operator {
            Operator::Add => Ok(add(self.derive(left, depth)?, self.derive(right, depth)?)),
            Operator::Subtract => Ok(sub(self.derive(left, depth)?, self.derive(right, depth)?)),

            Operator::Multiply => {
                let (f, g) = (self.fold(left)?, self.fold(right)?);
                let df = self.derive(left, depth)?;
                let dg = self.derive(right, depth)?;
                Ok(add(mul(df, g), mul(f, dg)))
            }

            Operator::Divide => {
                let (f, g) = (self.fold(left)?, self.fold(right)?);
                let df = self.derive(left, depth)?;
                if !self.depends(right) {
                    return Ok(div(df, g));
                }
                let dg = self.derive(right, depth)?;
                let numerator = sub(mul(df, g.clone()), mul(f, dg));
                Ok(div(numerator, pow(g, number(Decimal::TWO))))
            }

            Operator::Power => match (self.depends(left), self.depends(right)) {
                (false, false) => Ok(zero()),
                (true, false) => {
                    let exponent = self.fold(right)?;
                    let lowered = match &exponent {
                        Node::Number(n) => number(*n - Decimal::ONE),
                        other => sub(other.clone(), number(Decimal::ONE)),
                    };
                    let outer = mul(exponent, pow(self.fold(left)?, lowered));
                    Ok(mul(outer, self.derive(left, depth)?))
                }
                (false, true) => {
                    let base = self.fold(left)?;
                    let ln = self.fold(&Node::FunctionCall {
                        name: "ln".to_string(),
                        args: vec![base.clone()],
                    })?;
                    let power = pow(base, self.fold(right)?);
                    Ok(mul(mul(power, ln), self.derive(right, depth)?))
                }
                (true, true) => Err(Error::Unsupported(format!(
                    "differentiating a power with {} in both base and exponent",
                    self.variable
                ))),
            },

            _ => Err(Error::Unsupported(format!(
                "differentiating the '{}' operator",
                operator
            ))),
        }
    }
}

fn link_parents<'a>(node: &'a Node, parents: &mut HashMap<*const Node, &'a Node>) {
    for child in node.children() {
        parents.insert(child as *const Node, node);
        link_parents(child, parents);
    }
}

fn number(value: Decimal) -> Node {
    Node::Number(value.normalize())
}

fn zero() -> Node {
    Node::Number(Decimal::ZERO)
}

fn as_number(node: &Node) -> Option<Decimal> {
    match node {
        Node::Number(value) => Some(*value),
        _ => None,
    }
}

fn is_value(node: &Node, value: Decimal) -> bool {
    as_number(node) == Some(value)
}

fn add(a: Node, b: Node) -> Node {
    match (as_number(&a), as_number(&b)) {
        (Some(x), _) if x.is_zero() => b,
        (_, Some(y)) if y.is_zero() => a,
        (Some(x), Some(y)) => x
            .checked_add(y)
            .map_or_else(|| Node::binary(a, Operator::Add, b), number),
        (_, Some(y)) if y.is_sign_negative() => Node::binary(a, Operator::Subtract, number(-y)),
        _ => Node::binary(a, Operator::Add, b),
    }
}

fn sub(a: Node, b: Node) -> Node {
    match (as_number(&a), as_number(&b)) {
        (_, Some(y)) if y.is_zero() => a,
        (Some(x), _) if x.is_zero() => neg(b),
        (Some(x), Some(y)) => x
            .checked_sub(y)
            .map_or_else(|| Node::binary(a, Operator::Subtract, b), number),
        (_, Some(y)) if y.is_sign_negative() => Node::binary(a, Operator::Add, number(-y)),
        _ => Node::binary(a, Operator::Subtract, b),
    }
}

fn mul(a: Node, b: Node) -> Node {
    if is_value(&a, Decimal::ZERO) || is_value(&b, Decimal::ZERO) {
        return zero();
    }
    if is_value(&a, Decimal::ONE) {
        return b;
    }
    if is_value(&b, Decimal::ONE) {
        return a;
    }
    match (a, b) {
        (Node::Number(x), Node::Number(y)) => match x.checked_mul(y) {
            Some(product) => number(product),
            None => Node::binary(Node::Number(x), Operator::Multiply, Node::Number(y)),
        },
        // keep the numeric factor in front: 3 * (2 * x) => 6 * x
        (
            Node::Number(x),
            Node::Binary {
                left,
                operator: Operator::Multiply,
                right,
            },
        ) if as_number(&left).is_some() => {
            let inner = as_number(&left).and_then(|y| x.checked_mul(y));
            match inner {
                Some(product) => mul(number(product), *right),
                None => Node::binary(
                    Node::Number(x),
                    Operator::Multiply,
                    Node::binary(*left, Operator::Multiply, *right),
                ),
            }
        }
        (other, Node::Number(x)) => mul(Node::Number(x), other),
        (a, b) => Node::binary(a, Operator::Multiply, b),
    }
}

fn div(a: Node, b: Node) -> Node {
    if is_value(&a, Decimal::ZERO) {
        return zero();
    }
    if is_value(&b, Decimal::ONE) {
        return a;
    }
    if let (Some(x), Some(y)) = (as_number(&a), as_number(&b)) {
        if let Some(quotient) = x.checked_div(y) {
            return number(quotient);
        }
    }
    Node::binary(a, Operator::Divide, b)
}

fn pow(base: Node, exponent: Node) -> Node {
    if is_value(&exponent, Decimal::ZERO) {
        return number(Decimal::ONE);
    }
    if is_value(&exponent, Decimal::ONE) {
        return base;
    }
    Node::binary(base, Operator::Power, exponent)
}

fn neg(node: Node) -> Node {
    match node {
        Node::Number(value) => number(-value),
        Node::Unary {
            sign: Sign::Negative,
            operand,
        } => *operand,
        other => Node::negate(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn derive(text: &str) -> MathValue {
        let mut evaluator = Evaluator::new(10);
        evaluator.differentiate(text, "x").unwrap()
    }

    #[test]
    fn test_polynomials() {
        assert_eq!(derive("x^2+2x-8"), MathValue::symbol("2x + 2"));
        assert_eq!(derive("3x^3"), MathValue::symbol("9x^2"));
        assert_eq!(derive("x^3 - x"), MathValue::symbol("3x^2 - 1"));
        assert_eq!(derive("x"), MathValue::from(1));
        assert_eq!(derive("5x"), MathValue::from(5));
        assert_eq!(derive("42"), MathValue::from(0));
    }

    #[test]
    fn test_negation() {
        assert_eq!(derive("-x"), MathValue::from(-1));
        assert_eq!(derive("-(x^2)"), MathValue::symbol("-2x"));
        assert_eq!(derive("--x"), MathValue::from(1));
        assert_eq!(derive("1 - x"), MathValue::from(-1));
    }

    #[test]
    fn test_other_variables_are_constants() {
        assert_eq!(derive("y * x"), MathValue::symbol("y"));
        assert_eq!(derive("y + 3"), MathValue::from(0));
        assert_eq!(derive("a*x^2"), MathValue::symbol("a * 2x"));
    }

    #[test]
    fn test_product_rule() {
        // (x + 1)(x - 1) => (x - 1) + (x + 1)
        assert_eq!(derive("(x + 1) * (x - 1)"), MathValue::symbol("x - 1 + (x + 1)"));
    }

    #[test]
    fn test_quotient_rule() {
        assert_eq!(derive("x^2 / 4"), MathValue::symbol("2x / 4"));
        assert_eq!(derive("1 / x"), MathValue::symbol("-1 / x^2"));
        assert_eq!(derive("x / (x + 1)"), MathValue::symbol("(x + 1 - x) / (x + 1)^2"));
    }

    #[test]
    fn test_chain_rule_for_powers() {
        assert_eq!(derive("(2x + 1)^3"), MathValue::symbol("6 * (2x + 1)^2"));
        assert_eq!(derive("x^(-1)"), MathValue::symbol("-1x^(-2)"));
    }

    #[test]
    fn test_negative_unit_coefficient_keeps_its_one() {
        // unary minus binds tighter than `^`, so `-x^(-2)` would mean (-x)^(-2)
        let text = derive("x^(-1)").to_string();
        let mut evaluator = Evaluator::new(10);
        evaluator.bind_variable("x", dec!(2));
        assert_eq!(evaluator.evaluate_expression(&text).unwrap(), MathValue::from(dec!(-0.25)));
        assert_eq!(evaluator.evaluate_expression("-x^(-2)").unwrap(), MathValue::from(dec!(0.25)));
    }

    #[test]
    fn test_constant_base_power() {
        let value = derive("2^x");
        assert_eq!(value, MathValue::symbol("0.6931471806 * 2^x"));
    }

    #[test]
    fn test_derivative_is_evaluated_when_constant() {
        let mut evaluator = Evaluator::new(10);
        evaluator.bind_variable("x", dec!(5));
        // bound root variables do not leak into the derivative
        assert_eq!(
            evaluator.differentiate("x^2", "x").unwrap(),
            MathValue::symbol("2x")
        );
        assert_eq!(
            evaluator.differentiate("pi * x", "x").unwrap(),
            MathValue::from(dec!(3.1415926536))
        );
    }

    #[test]
    fn test_unsupported_patterns() {
        let mut evaluator = Evaluator::new(10);
        assert!(matches!(
            evaluator.differentiate("x^x", "x"),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            evaluator.differentiate("sin(x)", "x"),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            evaluator.differentiate("x > 1", "x"),
            Err(Error::Unsupported(_))
        ));
        assert_eq!(evaluator.differentiate("sin(2)", "x").unwrap(), MathValue::from(0));
    }

    #[test]
    fn test_parent_links() {
        let root = crate::ast::Parser::parse("-x + y").unwrap();
        let mut parents = HashMap::new();
        link_parents(&root, &mut parents);
        assert_eq!(parents.len(), 3);
        let Node::Binary { left, .. } = &root else {
            panic!("expected a binary node");
        };
        assert_eq!(parents.get(&(left.as_ref() as *const Node)), Some(&&root));
    }
}
