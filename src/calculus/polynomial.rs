use crate::ast::{Node, Operator, PolyTerm, Sign};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Folds `c*x`, `x*c`, `x^n` and `c*x^n` (numeric `c`, `n`) into annotated
/// variables, bottom-up. Everything else is rebuilt unchanged.
pub fn annotate(node: &Node) -> Node {
    match node {
        Node::Binary {
            left,
            operator,
            right,
        } => {
            let left = annotate(left);
            let right = annotate(right);
            fold_term(&left, *operator, &right)
                .unwrap_or_else(|| Node::binary(left, *operator, right))
        }
        Node::Unary { sign, operand } => Node::Unary {
            sign: *sign,
            operand: Box::new(annotate(operand)),
        },
        Node::Vector(items) => Node::Vector(items.iter().map(annotate).collect()),
        Node::Matrix(columns) => Node::Matrix(columns.iter().map(annotate).collect()),
        Node::FunctionDef { name, params, body } => Node::FunctionDef {
            name: name.clone(),
            params: params.clone(),
            body: Box::new(annotate(body)),
        },
        Node::FunctionCall { name, args } => Node::FunctionCall {
            name: name.clone(),
            args: args.iter().map(annotate).collect(),
        },
        Node::Number(_) | Node::Variable { .. } => node.clone(),
    }
}

fn term_of(node: &Node) -> Option<(&str, PolyTerm)> {
    match node {
        Node::Variable { name, term } => Some((
            name.as_str(),
            term.unwrap_or(PolyTerm {
                coefficient: Decimal::ONE,
                exponent: Decimal::ONE,
            }),
        )),
        _ => None,
    }
}

fn annotated(name: &str, coefficient: Decimal, exponent: Decimal) -> Node {
    Node::Variable {
        name: name.to_string(),
        term: Some(PolyTerm {
            coefficient,
            exponent,
        }),
    }
}

fn fold_term(left: &Node, operator: Operator, right: &Node) -> Option<Node> {
    match (left, operator, right) {
        (Node::Number(c), Operator::Multiply, other)
        | (other, Operator::Multiply, Node::Number(c)) => {
            let (name, term) = term_of(other)?;
            let coefficient = c.checked_mul(term.coefficient)?;
            Some(annotated(name, coefficient, term.exponent))
        }
        (Node::Variable { name, term: None }, Operator::Power, Node::Number(n)) => {
            Some(annotated(name, Decimal::ONE, *n))
        }
        _ => None,
    }
}

/// Degree of `node` as a polynomial in `variable`, or `None` when it is not
/// one. Other names count as constant coefficients.
pub fn polynomial_degree(node: &Node, variable: &str) -> Option<u32> {
    match node {
        Node::Number(_) => Some(0),
        Node::Variable { name, term } => {
            if name != variable {
                return Some(0);
            }
            match term {
                None => Some(1),
                Some(term) if term.coefficient.is_zero() => Some(0),
                Some(term) => whole_exponent(term.exponent),
            }
        }
        Node::Unary { operand, .. } => polynomial_degree(operand, variable),
        Node::Binary {
            left,
            operator,
            right,
        } => {
            let left_degree = polynomial_degree(left, variable);
            match operator {
                Operator::Add | Operator::Subtract => {
                    Some(left_degree?.max(polynomial_degree(right, variable)?))
                }
                Operator::Multiply => left_degree?.checked_add(polynomial_degree(right, variable)?),
                Operator::Divide => match polynomial_degree(right, variable)? {
                    0 => left_degree,
                    _ => None,
                },
                Operator::Power => {
                    if !right.contains_variable(variable) && !left.contains_variable(variable) {
                        return Some(0);
                    }
                    let exponent = match right.as_ref() {
                        Node::Number(n) => whole_exponent(*n)?,
                        _ => return None,
                    };
                    left_degree?.checked_mul(exponent)
                }
                _ => None,
            }
        }
        Node::FunctionCall { .. } if !node.contains_variable(variable) => Some(0),
        _ => None,
    }
}

fn whole_exponent(exponent: Decimal) -> Option<u32> {
    if exponent.fract().is_zero() && !exponent.is_sign_negative() {
        exponent.to_u32()
    } else {
        None
    }
}

/// True for a bare `-name` leaf.
pub(crate) fn is_negated_variable(node: &Node) -> bool {
    matches!(
        node,
        Node::Unary { sign: Sign::Negative, operand }
            if matches!(**operand, Node::Variable { term: None, .. })
    )
}
