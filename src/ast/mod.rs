use crate::error::{Error, Result};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};
use std::fmt;

mod config;
mod context;
mod evaluator;
mod parser;
mod value;

pub use config::*;
pub use context::*;
pub use evaluator::*;
pub use parser::ExpressionParser as Parser;
pub use value::*;

/// A parsed expression. Every variant owns its children; the tree is never
/// mutated after the parser hands it out.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(Decimal),
    Variable {
        name: String,
        /// Coefficient/exponent folded in by [`crate::calculus::annotate`].
        term: Option<PolyTerm>,
    },
    Unary {
        sign: Sign,
        operand: Box<Node>,
    },
    Binary {
        left: Box<Node>,
        operator: Operator,
        right: Box<Node>,
    },
    Vector(Vec<Node>),
    /// Consecutive bracketed vectors; each child is a `Node::Vector` that
    /// becomes one column of the matrix.
    Matrix(Vec<Node>),
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Box<Node>,
    },
    FunctionCall {
        name: String,
        args: Vec<Node>,
    },
}

impl Node {
    pub fn variable(name: impl Into<String>) -> Self {
        Node::Variable {
            name: name.into(),
            term: None,
        }
    }

    pub fn binary(left: Node, operator: Operator, right: Node) -> Self {
        Node::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub fn negate(operand: Node) -> Self {
        Node::Unary {
            sign: Sign::Negative,
            operand: Box::new(operand),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::Number(_) => "number",
            Node::Variable { .. } => "variable",
            Node::Unary { .. } => "unary expression",
            Node::Binary { .. } => "binary expression",
            Node::Vector(_) => "vector literal",
            Node::Matrix(_) => "matrix literal",
            Node::FunctionDef { .. } => "function definition",
            Node::FunctionCall { .. } => "function call",
        }
    }

    /// Direct children in left-to-right order.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Number(_) | Node::Variable { .. } => Vec::new(),
            Node::Unary { operand, .. } => vec![operand],
            Node::Binary { left, right, .. } => vec![left, right],
            Node::Vector(items) | Node::Matrix(items) => items.iter().collect(),
            Node::FunctionDef { body, .. } => vec![body],
            Node::FunctionCall { args, .. } => args.iter().collect(),
        }
    }

    /// Number of levels in this tree; a leaf has height 1.
    pub fn height(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Node::height)
            .max()
            .unwrap_or(0)
    }

    /// Whether `name` occurs free anywhere below this node.
    pub fn contains_variable(&self, name: &str) -> bool {
        match self {
            Node::Variable { name: own, .. } => own == name,
            Node::FunctionDef { params, body, .. } => {
                !params.iter().any(|p| p == name) && body.contains_variable(name)
            }
            _ => self
                .children()
                .into_iter()
                .any(|child| child.contains_variable(name)),
        }
    }
}

/// Coefficient and exponent carried by an annotated variable: `c·x^n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolyTerm {
    pub coefficient: Decimal,
    pub exponent: Decimal,
}

impl PolyTerm {
    pub fn render(&self, name: &str) -> String {
        let exponent = self.exponent.normalize();
        if exponent.is_zero() {
            return self.coefficient.normalize().to_string();
        }

        let coefficient = if self.coefficient == Decimal::ONE {
            String::new()
        } else if self.coefficient == Decimal::NEGATIVE_ONE && exponent == Decimal::ONE {
            "-".to_string()
        } else {
            self.coefficient.normalize().to_string()
        };

        let power = if exponent == Decimal::ONE {
            String::new()
        } else if exponent.is_sign_negative() {
            format!("^({})", exponent)
        } else {
            format!("^{}", exponent)
        };

        format!("{coefficient}{name}{power}")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Sign {
    Positive,
    Negative,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Equal,
    NotEqual,
    Assign,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Power => "^",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThanOrEqual => "<=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Assign => "=",
        }
    }

    /// Binding strength, higher binds tighter. All levels are left-associative.
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Power => 4,
            Operator::Multiply | Operator::Divide => 3,
            Operator::Add | Operator::Subtract => 2,
            _ => 1,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 1
    }

    /// Applies the operator to two numbers. Comparisons yield 1 or 0.
    pub fn apply(&self, left: Decimal, right: Decimal) -> Result<Decimal> {
        let truth = |b: bool| if b { Decimal::ONE } else { Decimal::ZERO };
        match self {
            Operator::Add => left
                .checked_add(right)
                .ok_or_else(|| Error::arithmetic("addition overflow")),
            Operator::Subtract => left
                .checked_sub(right)
                .ok_or_else(|| Error::arithmetic("subtraction overflow")),
            Operator::Multiply => left
                .checked_mul(right)
                .ok_or_else(|| Error::arithmetic("multiplication overflow")),
            Operator::Divide => {
                if right.is_zero() {
                    Err(Error::arithmetic("division by zero"))
                } else {
                    left.checked_div(right)
                        .ok_or_else(|| Error::arithmetic("division overflow"))
                }
            }
            Operator::Power => power(left, right),
            Operator::GreaterThan => Ok(truth(left > right)),
            Operator::LessThan => Ok(truth(left < right)),
            Operator::GreaterThanOrEqual => Ok(truth(left >= right)),
            Operator::LessThanOrEqual => Ok(truth(left <= right)),
            Operator::Equal | Operator::Assign => Ok(truth(left == right)),
            Operator::NotEqual => Ok(truth(left != right)),
        }
    }
}

/// Integer exponents are exact; anything else goes through the real power
/// function and must land back in the decimal range.
pub(crate) fn power(base: Decimal, exponent: Decimal) -> Result<Decimal> {
    let overflow = || Error::arithmetic(format!("{} ^ {} overflows", base, exponent));

    if exponent.fract().is_zero() {
        let n = exponent.to_i64().ok_or_else(overflow)?;
        if n >= 0 {
            return base.checked_powi(n).ok_or_else(overflow);
        }
        if base.is_zero() {
            return Err(Error::arithmetic("zero cannot be raised to a negative power"));
        }
        let magnitude = n.checked_neg().ok_or_else(overflow)?;
        let denominator = base.checked_powi(magnitude).ok_or_else(overflow)?;
        return Decimal::ONE.checked_div(denominator).ok_or_else(overflow);
    }

    if base.is_sign_negative() && !base.is_zero() {
        return Err(Error::arithmetic(format!(
            "negative base {} with non-integer exponent {}",
            base, exponent
        )));
    }
    let (b, e) = (
        base.to_f64().ok_or_else(overflow)?,
        exponent.to_f64().ok_or_else(overflow)?,
    );
    Decimal::from_f64(b.powf(e)).ok_or_else(overflow)
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl TryFrom<&str> for Operator {
    type Error = String;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Subtract),
            "*" => Ok(Operator::Multiply),
            "/" => Ok(Operator::Divide),
            "^" => Ok(Operator::Power),
            ">" => Ok(Operator::GreaterThan),
            "<" => Ok(Operator::LessThan),
            ">=" => Ok(Operator::GreaterThanOrEqual),
            "<=" => Ok(Operator::LessThanOrEqual),
            "==" => Ok(Operator::Equal),
            "!=" => Ok(Operator::NotEqual),
            "=" => Ok(Operator::Assign),
            _ => Err(format!("Unknown operator: {}", value)),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[impl fmt::Display]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    node: &Node,
    parent: Operator,
    is_right: bool,
) -> fmt::Result {
    let parent_prec = parent.precedence();
    let needs_parens = match node {
        Node::Binary { operator, .. } => {
            operator.precedence() < parent_prec
                || (is_right && operator.precedence() == parent_prec)
        }
        Node::Unary { .. } => parent == Operator::Power && !is_right,
        Node::Variable { term: Some(term), .. } => {
            parent == Operator::Power
                || (is_right && parent == Operator::Divide && term.coefficient != Decimal::ONE)
        }
        Node::FunctionDef { .. } => true,
        _ => false,
    };

    if needs_parens {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}

/// Renders the tree back to source form with only the parentheses the
/// grammar needs.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Number(value) => write!(f, "{}", value.normalize()),
            Node::Variable { name, term: None } => f.write_str(name),
            Node::Variable {
                name,
                term: Some(term),
            } => f.write_str(&term.render(name)),
            Node::Unary { sign, operand } => {
                if *sign == Sign::Negative {
                    f.write_str("-")?;
                }
                match **operand {
                    Node::Binary { .. } | Node::FunctionDef { .. } => write!(f, "({})", operand),
                    _ => write!(f, "{}", operand),
                }
            }
            Node::Binary {
                left,
                operator,
                right,
            } => {
                write_operand(f, left, *operator, false)?;
                if *operator == Operator::Power {
                    f.write_str("^")?;
                } else {
                    write!(f, " {} ", operator)?;
                }
                write_operand(f, right, *operator, true)
            }
            Node::Vector(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Node::Matrix(columns) => {
                for column in columns {
                    write!(f, "{}", column)?;
                }
                Ok(())
            }
            Node::FunctionDef { name, params, body } => {
                write!(f, "{}(", name)?;
                write_joined(f, params)?;
                write!(f, ") = {}", body)
            }
            Node::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                write_joined(f, args)?;
                f.write_str(")")
            }
        }
    }
}
