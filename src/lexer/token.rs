use crate::ast::Operator;
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(Decimal),
    Identifier(String),
    Operator(Operator),
    LParen,
    RParen,
    Comma,
    VectorBegin,
    VectorEnd,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// Byte offset of the lexeme in the source text.
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
        }
    }

    /// The `*` the parser slips between a number and the identifier after it.
    pub fn implicit_multiply(position: usize) -> Self {
        Self::new(TokenKind::Operator(Operator::Multiply), "*", position)
    }

    pub fn is_operator(&self, operator: Operator) -> bool {
        matches!(self.kind, TokenKind::Operator(op) if op == operator)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of input"),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}
