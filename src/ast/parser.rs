use crate::ast::{Node, Operator, Sign, DEFAULT_MAX_DEPTH};
use crate::error::{Error, Result};
use crate::lexer::{tokenize, Token, TokenKind};
use log::debug;

/// Recursive-descent parser over the lexer's token stream.
///
/// Precedence, loosest first: comparisons and `=`, then `+ -`, `* /`, `^`,
/// unary sign, primaries. Every binary level is left-associative.
pub struct ExpressionParser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    max_depth: usize,
}

impl ExpressionParser {
    /// Parses a complete expression. Trailing tokens are an error.
    pub fn parse(input: &str) -> Result<Node> {
        Self::parse_with_max_depth(input, DEFAULT_MAX_DEPTH)
    }

    pub fn parse_with_max_depth(input: &str, max_depth: usize) -> Result<Node> {
        debug!("Parsing expression: {}", input);
        let tokens = tokenize(input)?;
        let mut parser = Self::new(tokens).with_max_depth(max_depth);
        let node = parser.parse_expression()?;
        parser.expect_end()?;

        debug!("Parse result: {:?}", node);
        Ok(node)
    }

    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
            let end = tokens
                .last()
                .map_or(0, |token| token.position + token.lexeme.len());
            tokens.push(Token::new(TokenKind::Eof, "", end));
        }
        Self {
            tokens,
            current: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Entry point: the comparison level.
    pub fn parse_expression(&mut self) -> Result<Node> {
        self.enter()?;
        let node = self.parse_sign();
        self.depth -= 1;
        node
    }

    /// Fails unless every token has been consumed.
    pub fn expect_end(&self) -> Result<()> {
        match self.peek().kind {
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_sign(&mut self) -> Result<Node> {
        self.parse_chain(|op| op.is_comparison(), Self::parse_term)
    }

    fn parse_term(&mut self) -> Result<Node> {
        self.parse_chain(
            |op| matches!(op, Operator::Add | Operator::Subtract),
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Result<Node> {
        self.parse_chain(
            |op| matches!(op, Operator::Multiply | Operator::Divide),
            Self::parse_exponent,
        )
    }

    fn parse_exponent(&mut self) -> Result<Node> {
        self.parse_chain(|op| op == Operator::Power, Self::parse_unary)
    }

    /// Left-associative chain of `operand (op operand)*`. Every fold adds a
    /// level to the tree, so the chain's height is checked as it grows.
    fn parse_chain(
        &mut self,
        accept: impl Fn(Operator) -> bool,
        operand: fn(&mut Self) -> Result<Node>,
    ) -> Result<Node> {
        let mut node = operand(self)?;
        let mut height = node.height();
        while let Some(operator) = self.match_operator(&accept) {
            let right = operand(self)?;
            height = self.check_height(height.max(right.height()) + 1)?;
            node = Node::binary(node, operator, right);
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Node> {
        let signed = self.match_operator(|op| matches!(op, Operator::Add | Operator::Subtract));
        let sign = match signed {
            Some(Operator::Subtract) => Sign::Negative,
            Some(_) => Sign::Positive,
            None => return self.parse_primary(),
        };

        self.enter()?;
        let operand = self.parse_unary();
        self.depth -= 1;

        self.bounded(Node::Unary {
            sign,
            operand: Box::new(operand?),
        })
    }

    fn parse_primary(&mut self) -> Result<Node> {
        match self.peek().kind.clone() {
            TokenKind::Number(value) => {
                self.advance();
                if matches!(self.peek().kind, TokenKind::Identifier(_)) {
                    let position = self.peek().position;
                    self.tokens
                        .insert(self.current, Token::implicit_multiply(position));
                }
                Ok(Node::Number(value))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                self.parse_identifier_expression(name)
            }
            TokenKind::LParen => {
                self.advance();
                let node = self.parse_expression()?;
                self.expect(TokenKind::RParen, "missing closing parenthesis")?;
                Ok(node)
            }
            TokenKind::VectorBegin => self.parse_matrix(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_identifier_expression(&mut self, name: String) -> Result<Node> {
        if self.peek().kind != TokenKind::LParen {
            return Ok(Node::variable(name));
        }
        if self.is_function_definition() {
            self.parse_definition(name)
        } else {
            self.parse_call(name)
        }
    }

    /// With the cursor on `(`, a definition is recognised by an `=` right
    /// after the matching `)`.
    fn is_function_definition(&self) -> bool {
        self.find_closing_paren(self.current)
            .and_then(|close| self.tokens.get(close + 1))
            .is_some_and(|token| token.is_operator(Operator::Assign))
    }

    fn find_closing_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (index, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(index);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
        }
        None
    }

    fn parse_definition(&mut self, name: String) -> Result<Node> {
        self.expect(TokenKind::LParen, "expected '('")?;

        let mut params = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            loop {
                match self.peek().kind.clone() {
                    TokenKind::Identifier(param) => {
                        self.advance();
                        params.push(param);
                    }
                    _ => {
                        let token = self.peek();
                        return Err(Error::parse(
                            format!("expected parameter name, found {}", token),
                            token.position,
                        ));
                    }
                }
                if self.peek().kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "expected ')' after parameter list")?;

        if !self.peek().is_operator(Operator::Assign) {
            return Err(Error::parse(
                format!("expected '=' after parameter list, found {}", self.peek()),
                self.peek().position,
            ));
        }
        self.advance();

        let body = self.parse_expression()?;
        self.bounded(Node::FunctionDef {
            name,
            params,
            body: Box::new(body),
        })
    }

    fn parse_call(&mut self, name: String) -> Result<Node> {
        self.expect(TokenKind::LParen, "expected '('")?;

        let mut args = Vec::new();
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            return Ok(Node::FunctionCall { name, args });
        }

        loop {
            args.push(self.parse_expression()?);
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                _ => {
                    return Err(Error::parse(
                        format!("expected ',' or ')' in call to {}, found {}", name, self.peek()),
                        self.peek().position,
                    ))
                }
            }
        }

        self.bounded(Node::FunctionCall { name, args })
    }

    fn parse_matrix(&mut self) -> Result<Node> {
        let mut columns = Vec::new();
        while self.peek().kind == TokenKind::VectorBegin {
            columns.push(self.parse_vector()?);
        }
        self.bounded(Node::Matrix(columns))
    }

    fn parse_vector(&mut self) -> Result<Node> {
        self.expect(TokenKind::VectorBegin, "expected '['")?;

        let mut elements = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::VectorEnd => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => {
                    return Err(Error::parse(
                        "unterminated vector literal",
                        self.peek().position,
                    ))
                }
                _ => {
                    elements.push(self.parse_expression()?);
                    if self.peek().kind == TokenKind::Comma {
                        self.advance();
                    }
                }
            }
        }

        self.bounded(Node::Vector(elements))
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            self.depth -= 1;
            return Err(Error::DepthExceeded {
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    /// Trees taller than the nesting limit are rejected here so that nothing
    /// downstream recurses past it.
    fn check_height(&self, height: usize) -> Result<usize> {
        if height > self.max_depth {
            return Err(Error::DepthExceeded {
                limit: self.max_depth,
            });
        }
        Ok(height)
    }

    fn bounded(&self, node: Node) -> Result<Node> {
        self.check_height(node.height())?;
        Ok(node)
    }

    fn peek(&self) -> &Token {
        // `new` guarantees a trailing Eof and `advance` never steps past it
        &self.tokens[self.current]
    }

    fn advance(&mut self) {
        if self.peek().kind != TokenKind::Eof {
            self.current += 1;
        }
    }

    fn match_operator(&mut self, accept: impl Fn(Operator) -> bool) -> Option<Operator> {
        match self.peek().kind {
            TokenKind::Operator(operator) if accept(operator) => {
                self.advance();
                Some(operator)
            }
            _ => None,
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<()> {
        if self.peek().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(Error::parse(
                format!("{}, found {}", message, self.peek()),
                self.peek().position,
            ))
        }
    }

    fn unexpected(&self) -> Error {
        let token = self.peek();
        Error::parse(format!("unexpected {}", token), token.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn num(value: i64) -> Node {
        Node::Number(value.into())
    }

    #[test]
    fn test_precedence() {
        let ast = ExpressionParser::parse("2 + 3 * 4").unwrap();
        assert_eq!(
            ast,
            Node::binary(
                num(2),
                Operator::Add,
                Node::binary(num(3), Operator::Multiply, num(4))
            )
        );
    }

    #[test]
    fn test_power_is_left_associative() {
        let ast = ExpressionParser::parse("2^3^2").unwrap();
        assert_eq!(
            ast,
            Node::binary(
                Node::binary(num(2), Operator::Power, num(3)),
                Operator::Power,
                num(2)
            )
        );
    }

    #[test]
    fn test_comparison_is_loosest() {
        let ast = ExpressionParser::parse("1 + 1 >= 2").unwrap();
        assert_eq!(
            ast,
            Node::binary(
                Node::binary(num(1), Operator::Add, num(1)),
                Operator::GreaterThanOrEqual,
                num(2)
            )
        );
    }

    #[test]
    fn test_unary_minus_is_right_recursive() {
        let ast = ExpressionParser::parse("--x").unwrap();
        assert_eq!(ast, Node::negate(Node::negate(Node::variable("x"))));

        let ast = ExpressionParser::parse("+x").unwrap();
        assert_eq!(
            ast,
            Node::Unary {
                sign: Sign::Positive,
                operand: Box::new(Node::variable("x"))
            }
        );
    }

    #[test]
    fn test_implicit_multiplication() {
        let ast = ExpressionParser::parse("2x^2").unwrap();
        assert_eq!(
            ast,
            Node::binary(
                num(2),
                Operator::Multiply,
                Node::binary(Node::variable("x"), Operator::Power, num(2))
            )
        );
        let ast = ExpressionParser::parse("3.5y + 1").unwrap();
        assert_eq!(
            ast,
            Node::binary(
                Node::binary(Node::Number(dec!(3.5)), Operator::Multiply, Node::variable("y")),
                Operator::Add,
                num(1)
            )
        );
    }

    #[test]
    fn test_call_versus_definition() {
        let call = ExpressionParser::parse("f(x)").unwrap();
        assert_eq!(
            call,
            Node::FunctionCall {
                name: "f".to_string(),
                args: vec![Node::variable("x")]
            }
        );

        let definition = ExpressionParser::parse("g(x) = x + 1").unwrap();
        assert!(matches!(definition, Node::FunctionDef { ref name, .. } if name == "g"));

        let comparison = ExpressionParser::parse("f(x) == 2").unwrap();
        assert!(matches!(
            comparison,
            Node::Binary {
                operator: Operator::Equal,
                ..
            }
        ));
    }

    #[test]
    fn test_lookahead_skips_nested_parentheses() {
        let call = ExpressionParser::parse("f((1 + 2) * (3), g(4))").unwrap();
        match call {
            Node::FunctionCall { name, args } => {
                assert_eq!(name, "f");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_definition_start_is_recognised() {
        // the lookahead commits to a definition, which then lacks a body
        let result = ExpressionParser::parse("g(x)=");
        assert!(matches!(result, Err(Error::Parse { position: 5, .. })));
    }

    #[test]
    fn test_definition_errors() {
        assert!(matches!(
            ExpressionParser::parse("f(1) = 2"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            ExpressionParser::parse("f(x, 2) = x"),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_definition_with_parameters() {
        let ast = ExpressionParser::parse("f(x,y,z)=x^2+2*z^3-8.2*y^4").unwrap();
        match ast {
            Node::FunctionDef { name, params, .. } => {
                assert_eq!(name, "f");
                assert_eq!(params, vec!["x", "y", "z"]);
            }
            other => panic!("expected definition, got {:?}", other),
        }
    }

    #[test]
    fn test_matrix_literal() {
        let ast = ExpressionParser::parse("[1 3 5][8 30 2][]").unwrap();
        match ast {
            Node::Matrix(columns) => {
                assert_eq!(columns.len(), 3);
                assert_eq!(columns[0], Node::Vector(vec![num(1), num(3), num(5)]));
                assert_eq!(columns[2], Node::Vector(vec![]));
            }
            other => panic!("expected matrix, got {:?}", other),
        }
    }

    #[test]
    fn test_vector_commas_and_minus() {
        let ast = ExpressionParser::parse("[1, -3]").unwrap();
        assert_eq!(
            ast,
            Node::Matrix(vec![Node::Vector(vec![num(1), Node::negate(num(3))])])
        );
        let ast = ExpressionParser::parse("[1 -3]").unwrap();
        assert_eq!(
            ast,
            Node::Matrix(vec![Node::Vector(vec![Node::binary(
                num(1),
                Operator::Subtract,
                num(3)
            )])])
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(ExpressionParser::parse("(1 + 2"), Err(Error::Parse { .. })));
        assert!(matches!(ExpressionParser::parse("1 +"), Err(Error::Parse { .. })));
        assert!(matches!(ExpressionParser::parse("1 2"), Err(Error::Parse { position: 2, .. })));
        assert!(matches!(ExpressionParser::parse("[1 2"), Err(Error::Parse { .. })));
        assert!(matches!(ExpressionParser::parse(")"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(300), ")".repeat(300));
        assert_eq!(
            ExpressionParser::parse_with_max_depth(&deep, 256),
            Err(Error::DepthExceeded { limit: 256 })
        );

        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(ExpressionParser::parse(&shallow).unwrap(), num(1));
    }

    #[test]
    fn test_long_flat_chain_is_rejected() {
        let sum = vec!["1"; 100_000].join("+");
        assert_eq!(
            ExpressionParser::parse(&sum),
            Err(Error::DepthExceeded { limit: 1024 })
        );

        let product = vec!["x"; 20].join(" * ");
        assert_eq!(
            ExpressionParser::parse_with_max_depth(&product, 10),
            Err(Error::DepthExceeded { limit: 10 })
        );
    }

    #[test]
    fn test_parsed_trees_stay_within_the_limit() {
        let sum = vec!["1"; 300].join("+");
        assert_eq!(ExpressionParser::parse(&sum).unwrap().height(), 300);

        // parentheses add no levels, but the chains inside them do
        let nested = "((1 + 2) + 3) + 4";
        assert_eq!(ExpressionParser::parse(nested).unwrap().height(), 4);
        assert!(ExpressionParser::parse_with_max_depth(nested, 3).is_err());
        assert!(ExpressionParser::parse_with_max_depth("f(1 + 2 + 3)", 3).is_err());
        assert!(ExpressionParser::parse_with_max_depth("--x", 2).is_err());
        assert!(ExpressionParser::parse_with_max_depth("[1 + 2]", 2).is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for text in [
            "2 + 3 * 4",
            "(2 + 3) * 4",
            "2^3^2",
            "2^(3^2)",
            "-(x + 1) * y",
            "f(x, 2 * y) - g()",
            "h(x) = x^2 - 1",
            "[1, 2][3, -4]",
            "a >= b + 1",
            "8 - (2 - 1)",
        ] {
            let ast = ExpressionParser::parse(text).unwrap();
            let reparsed = ExpressionParser::parse(&ast.to_string()).unwrap();
            assert_eq!(ast, reparsed, "round trip of {}", text);
        }
    }
}
