mod token;

pub use token::*;

use crate::ast::Operator;
use crate::error::{Error, Result};
use log::trace;
use pest::error::InputLocation;
use pest::Parser;
use pest_derive::Parser;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Parser)]
#[grammar = "lexer/token.pest"]
struct TokenGrammar;

/// Scans `input` into tokens. The returned stream always ends with exactly
/// one `Eof` token.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let pairs = TokenGrammar::parse(Rule::tokens, input).map_err(|e| {
        let position = match e.location {
            InputLocation::Pos(p) => p,
            InputLocation::Span((p, _)) => p,
        };
        let found = input[position..]
            .chars()
            .next()
            .map(String::from)
            .unwrap_or_default();
        Error::Lex { found, position }
    })?;

    let mut tokens = Vec::new();
    for pair in pairs.flatten() {
        let lexeme = pair.as_str();
        let position = pair.as_span().start();
        let kind = match pair.as_rule() {
            Rule::number => {
                let value = Decimal::from_str(lexeme.trim_end_matches('.')).map_err(|_| {
                    Error::Lex {
                        found: lexeme.to_string(),
                        position,
                    }
                })?;
                TokenKind::Number(value)
            }
            Rule::identifier => TokenKind::Identifier(lexeme.to_string()),
            Rule::operator => {
                let operator = Operator::try_from(lexeme).map_err(|_| Error::Lex {
                    found: lexeme.to_string(),
                    position,
                })?;
                TokenKind::Operator(operator)
            }
            Rule::lparen => TokenKind::LParen,
            Rule::rparen => TokenKind::RParen,
            Rule::comma => TokenKind::Comma,
            Rule::vector_begin => TokenKind::VectorBegin,
            Rule::vector_end => TokenKind::VectorEnd,
            Rule::EOI => TokenKind::Eof,
            _ => continue,
        };
        tokens.push(Token::new(kind, lexeme, position));
    }

    if !matches!(tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
        tokens.push(Token::new(TokenKind::Eof, "", input.len()));
    }

    trace!("Tokenized {:?} into {} tokens", input, tokens.len());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_arithmetic() {
        assert_eq!(
            kinds("2 + 3.5*x"),
            vec![
                TokenKind::Number(dec!(2)),
                TokenKind::Operator(Operator::Add),
                TokenKind::Number(dec!(3.5)),
                TokenKind::Operator(Operator::Multiply),
                TokenKind::Identifier("x".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_two_character_operators_are_greedy() {
        assert_eq!(
            kinds("a>=b!=c"),
            vec![
                TokenKind::Identifier("a".to_string()),
                TokenKind::Operator(Operator::GreaterThanOrEqual),
                TokenKind::Identifier("b".to_string()),
                TokenKind::Operator(Operator::NotEqual),
                TokenKind::Identifier("c".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_followed_by_identifier() {
        let tokens = tokenize("2x").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number(dec!(2)));
        assert_eq!(tokens[1].kind, TokenKind::Identifier("x".to_string()));
        assert_eq!(tokens[1].position, 1);
    }

    #[test]
    fn test_trailing_dot_and_unicode_identifier() {
        assert_eq!(
            kinds("2. λ"),
            vec![
                TokenKind::Number(dec!(2)),
                TokenKind::Identifier("λ".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_vector_delimiters() {
        assert_eq!(
            kinds("[1, 2]"),
            vec![
                TokenKind::VectorBegin,
                TokenKind::Number(dec!(1)),
                TokenKind::Comma,
                TokenKind::Number(dec!(2)),
                TokenKind::VectorEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_empty_input_is_just_eof() {
        assert_eq!(kinds("   "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_unrecognized_character() {
        let result = tokenize("2 $ 3");
        assert_eq!(
            result,
            Err(Error::Lex {
                found: "$".to_string(),
                position: 2
            })
        );
    }
}
