//! Callback parser
//!
//! Recursive descent parser for single-expression arrow functions and for
//! blocks holding one `return { ... }` statement. Operator precedence
//! follows JavaScript for the supported subset.

use crate::ast::*;
use crate::lexer::{tokenize, Spanned, Token};
use chainql_core::ParseError;

/// Parse callback source text such as `x => x.id > 12`
pub fn parse_lambda(source: &str) -> Result<Lambda, ParseError> {
    let mut parser = CallbackParser::new(tokenize(source)?);
    let lambda = parser.parse_lambda()?;
    parser.expect_end()?;
    Ok(lambda)
}

/// Parse a bare expression with no parameter list
pub fn parse_expression(source: &str) -> Result<Expression, ParseError> {
    let mut parser = CallbackParser::new(tokenize(source)?);
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// A statement inside a block body
enum Statement {
    Return(Option<Expression>),
    Expression,
}

struct CallbackParser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl CallbackParser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.consume(token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.describe()))
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some((token, span)) => Err(ParseError::UnexpectedToken {
                found: token.describe(),
                expected: "end of input".to_string(),
                offset: span.start,
            }),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            None => ParseError::UnexpectedEnd(expected.to_string()),
            Some((token, span)) => ParseError::UnexpectedToken {
                found: token.describe(),
                expected: expected.to_string(),
                offset: span.start,
            },
        }
    }

    fn parse_lambda(&mut self) -> Result<Lambda, ParseError> {
        let params = self.parse_params()?;
        self.expect(&Token::Arrow)?;

        if self.consume(&Token::LBrace) {
            let body = self.parse_block()?;
            return Ok(Lambda {
                params,
                body,
                shape: BodyShape::ReturnObject,
            });
        }

        let body = self.parse_expression()?;
        Ok(Lambda {
            params,
            body,
            shape: BodyShape::Expression,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<String>, ParseError> {
        if let Some(Token::Identifier(name)) = self.peek() {
            let name = name.clone();
            self.pos += 1;
            return Ok(vec![name]);
        }

        if !self.consume(&Token::LParen) {
            return Err(self.unexpected("parameter list"));
        }

        let mut params: Vec<String> = Vec::new();
        while !self.check(&Token::RParen) {
            match self.advance() {
                Some(Token::Identifier(name)) => {
                    if params.contains(&name) {
                        return Err(ParseError::DuplicateParameter(name));
                    }
                    params.push(name);
                }
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.unexpected("parameter name"));
                }
                None => return Err(ParseError::UnexpectedEnd("')'".to_string())),
            }

            if !self.consume(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;

        Ok(params)
    }

    /// Parse the statements of a block up to its closing brace, then
    /// check that the block is exactly `return <object literal>`
    fn parse_block(&mut self) -> Result<Expression, ParseError> {
        let mut statements = Vec::new();

        loop {
            while self.consume(&Token::Semicolon) {}

            match self.peek() {
                None => return Err(ParseError::UnexpectedEnd("'}'".to_string())),
                Some(Token::RBrace) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::Return) => {
                    self.pos += 1;
                    if matches!(self.peek(), None | Some(Token::Semicolon) | Some(Token::RBrace)) {
                        statements.push(Statement::Return(None));
                    } else {
                        statements.push(Statement::Return(Some(self.parse_expression()?)));
                    }
                }
                Some(_) => {
                    self.parse_expression()?;
                    statements.push(Statement::Expression);
                }
            }
        }

        if statements.len() > 1 {
            return Err(ParseError::UnsupportedShape(format!(
                "block body has {} statements, only a single return is allowed",
                statements.len()
            )));
        }

        match statements.pop() {
            None => Err(ParseError::UnsupportedShape(
                "block body has no statements".to_string(),
            )),
            Some(Statement::Return(Some(body @ Expression::Object(_)))) => Ok(body),
            Some(Statement::Return(Some(other))) => Err(ParseError::UnsupportedShape(format!(
                "block must return an object literal, found {}",
                other.describe()
            ))),
            Some(Statement::Return(None)) => Err(ParseError::UnsupportedShape(
                "return statement without a value".to_string(),
            )),
            Some(Statement::Expression) => Err(ParseError::UnsupportedShape(
                "block body must be a return statement".to_string(),
            )),
        }
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_and()?;

        while self.consume(&Token::OrOr) {
            let right = self.parse_and()?;
            left = Expression::Logical {
                left: Box::new(left),
                op: LogicalOp::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_equality()?;

        while self.consume(&Token::AndAnd) {
            let right = self.parse_equality()?;
            left = Expression::Logical {
                left: Box::new(left),
                op: LogicalOp::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_relational()?;

        loop {
            let op = match self.peek() {
                Some(Token::Equals) => BinaryOp::Equals,
                Some(Token::StrictEquals) => BinaryOp::StrictEquals,
                Some(Token::NotEquals) => BinaryOp::NotEquals,
                Some(Token::StrictNotEquals) => BinaryOp::StrictNotEquals,
                _ => break,
            };
            self.pos += 1;

            let right = self.parse_relational()?;
            left = Expression::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.peek() {
                Some(Token::LessThan) => BinaryOp::LessThan,
                Some(Token::LessEquals) => BinaryOp::LessEquals,
                Some(Token::GreaterThan) => BinaryOp::GreaterThan,
                Some(Token::GreaterEquals) => BinaryOp::GreaterEquals,
                _ => break,
            };
            self.pos += 1;

            let right = self.parse_additive()?;
            left = Expression::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            self.pos += 1;

            let right = self.parse_multiplicative()?;
            left = Expression::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Modulo,
                _ => break,
            };
            self.pos += 1;

            let right = self.parse_unary()?;
            left = Expression::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Negate,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;

        let operand = self.parse_unary()?;
        Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.consume(&Token::Dot) {
                let property = match self.advance() {
                    Some(Token::Identifier(name)) => name,
                    Some(_) => {
                        self.pos -= 1;
                        return Err(self.unexpected("property name after '.'"));
                    }
                    None => return Err(ParseError::UnexpectedEnd("property name".to_string())),
                };
                expr = Expression::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.consume(&Token::LParen) {
                let mut args = Vec::new();
                while !self.check(&Token::RParen) {
                    args.push(self.parse_expression()?);
                    if !self.consume(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RParen)?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let Some((token, span)) = self.tokens.get(self.pos).cloned() else {
            return Err(ParseError::UnexpectedEnd("expression".to_string()));
        };
        self.pos += 1;

        match token {
            Token::Identifier(name) => Ok(Expression::Identifier(name)),
            Token::Number(raw) => {
                let value = raw.parse::<f64>().map_err(|_| ParseError::UnexpectedToken {
                    found: format!("number {}", raw),
                    expected: "numeric literal".to_string(),
                    offset: span.start,
                })?;
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::Number(value),
                    raw,
                }))
            }
            Token::DoubleQuoted(raw) | Token::SingleQuoted(raw) => {
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::String(unquote(&raw)),
                    raw,
                }))
            }
            Token::True => Ok(Expression::Literal(Literal::boolean(true))),
            Token::False => Ok(Expression::Literal(Literal::boolean(false))),
            Token::Null => Ok(Expression::Literal(Literal::null())),
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBrace => self.parse_object_literal(),
            _ => {
                self.pos -= 1;
                Err(self.unexpected("expression"))
            }
        }
    }

    fn parse_object_literal(&mut self) -> Result<Expression, ParseError> {
        let mut entries = Vec::new();

        while !self.check(&Token::RBrace) {
            let key = match self.advance() {
                Some(Token::Identifier(name)) => name,
                Some(Token::DoubleQuoted(raw)) | Some(Token::SingleQuoted(raw)) => unquote(&raw),
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.unexpected("property key"));
                }
                None => return Err(ParseError::UnexpectedEnd("'}'".to_string())),
            };

            // `{ title }` is shorthand for `{ title: title }`
            let value = if self.consume(&Token::Colon) {
                self.parse_expression()?
            } else if self.check(&Token::Comma) || self.check(&Token::RBrace) {
                Expression::Identifier(key.clone())
            } else {
                return Err(self.unexpected("':'"));
            };
            entries.push((key, value));

            if !self.consume(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace)?;

        Ok(Expression::Object(entries))
    }
}

/// Strip the quotes of a raw string literal and resolve its escapes
fn unquote(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some(other) => result.push(other),
            None => {}
        }
    }
    result
}
