//! Chain scripts
//!
//! A chain script spells a whole query chain as text:
//!
//! ```text
//! posts.where(x => x.id > 12).orderByDesc(x => x.title).select(["id", "title"])
//! ```
//!
//! The chain starts at a set, named by table or entity, followed by method
//! calls: `where`, `orderBy`, `orderByDesc`, `select`, `join` and `first`.
//! Callback arguments are kept as source text and parsed at translation.
//! A quoted string stands for raw SQL (`where`, `orderBy`) or a column name
//! (`select`), and a bracketed list of names selects several columns.

use chainql_core::{Error, ParseError, Result, TranslationError};
use chainql_expr::lexer::{tokenize, Spanned, Token};
use chainql_expr::{parse_expression, Expression, LiteralValue};
use chainql_query::{
    Callback, JoinSpec, Operation, Predicate, Projection, QueryNode, RootBinding, Selector,
    SetRegistry,
};
use std::sync::Arc;

/// A classified method argument
#[derive(Debug, Clone, PartialEq)]
enum Argument {
    /// Quoted string, unquoted
    Text(String),
    /// Bare identifier
    Name(String),
    /// `[a, "b"]`
    Columns(Vec<String>),
    /// Callback source
    Callback(String),
}

/// Parse a chain script against the sets in `registry`
pub fn parse_chain(script: &str, registry: &SetRegistry) -> Result<Arc<QueryNode>> {
    let tokens = tokenize(script)?;
    ScriptParser {
        source: script,
        tokens,
        pos: 0,
        registry,
    }
    .parse()
}

struct ScriptParser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    registry: &'a SetRegistry,
}

impl ScriptParser<'_> {
    fn parse(&mut self) -> Result<Arc<QueryNode>> {
        let root = self.expect_identifier("set name")?;
        let mut node = QueryNode::root(self.lookup_set(&root)?);

        while self.pos < self.tokens.len() {
            self.expect(&Token::Dot)?;
            let method = self.expect_identifier("method name")?;
            self.expect(&Token::LParen)?;
            let args = self.arguments()?;
            let operation = self.operation(&method, args, &node)?;
            node = node.then(operation);
        }
        Ok(node)
    }

    fn lookup_set(&self, name: &str) -> Result<RootBinding> {
        self.registry
            .resolve_table(name)
            .or_else(|| self.registry.resolve(name))
            .cloned()
            .ok_or_else(|| TranslationError::UnknownSet(name.to_string()).into())
    }

    fn unexpected(&self, expected: &str) -> Error {
        match self.tokens.get(self.pos) {
            None => ParseError::UnexpectedEnd(expected.to_string()).into(),
            Some((token, span)) => ParseError::UnexpectedToken {
                found: token.describe(),
                expected: expected.to_string(),
                offset: span.start,
            }
            .into(),
        }
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        match self.tokens.get(self.pos) {
            Some((found, _)) if found == token => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected(&token.describe())),
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String> {
        match self.tokens.get(self.pos) {
            Some((Token::Identifier(name), _)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Split the arguments of a call on top-level commas, consuming the closing paren
    fn arguments(&mut self) -> Result<Vec<Argument>> {
        let mut args = Vec::new();
        let mut depth = 0usize;
        let mut start = self.pos;

        loop {
            let Some(token) = self.tokens.get(self.pos).map(|(t, _)| t.clone()) else {
                return Err(ParseError::UnexpectedEnd("')'".to_string()).into());
            };

            match token {
                Token::LParen | Token::LBrace | Token::LBracket => depth += 1,
                Token::RParen | Token::RBrace | Token::RBracket if depth > 0 => depth -= 1,
                Token::RParen => {
                    if start < self.pos {
                        args.push(self.argument(start, self.pos)?);
                    } else if !args.is_empty() {
                        return Err(self.unexpected("argument"));
                    }
                    self.pos += 1;
                    return Ok(args);
                }
                Token::Comma if depth == 0 => {
                    if start == self.pos {
                        return Err(self.unexpected("argument"));
                    }
                    args.push(self.argument(start, self.pos)?);
                    start = self.pos + 1;
                }
                Token::RBrace | Token::RBracket => return Err(self.unexpected("')'")),
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// Classify the tokens in `start..end`
    fn argument(&self, start: usize, end: usize) -> Result<Argument> {
        let tokens = &self.tokens[start..end];
        let text = &self.source[tokens[0].1.start..tokens[tokens.len() - 1].1.end];
        let kinds: Vec<&Token> = tokens.iter().map(|(t, _)| t).collect();

        match kinds.as_slice() {
            [Token::DoubleQuoted(raw) | Token::SingleQuoted(raw)] => {
                Ok(Argument::Text(string_value(raw)?))
            }
            [Token::Identifier(name)] => Ok(Argument::Name(name.clone())),
            [Token::LBracket, inner @ .., Token::RBracket] => {
                Ok(Argument::Columns(self.column_list(inner, tokens[0].1.start)?))
            }
            _ => Ok(Argument::Callback(text.to_string())),
        }
    }

    fn column_list(&self, tokens: &[&Token], offset: usize) -> Result<Vec<String>> {
        let mut columns = Vec::new();
        for (index, token) in tokens.iter().enumerate() {
            let expect_name = index % 2 == 0;
            match (expect_name, token) {
                (true, Token::Identifier(name)) => columns.push(name.clone()),
                (true, Token::DoubleQuoted(raw) | Token::SingleQuoted(raw)) => {
                    columns.push(string_value(raw)?)
                }
                (false, Token::Comma) => {}
                (_, other) => {
                    return Err(ParseError::UnexpectedToken {
                        found: other.describe(),
                        expected: if expect_name { "column name" } else { "','" }.to_string(),
                        offset,
                    }
                    .into());
                }
            }
        }
        Ok(columns)
    }

    fn operation(&self, method: &str, args: Vec<Argument>, node: &QueryNode) -> Result<Operation> {
        let source = |text: &str| Callback::Source(text.to_string());

        let operation = match (method, args.as_slice()) {
            ("where", [Argument::Callback(cb)]) => Operation::Where(Predicate::Callback(source(cb))),
            ("where", [Argument::Text(sql)]) => Operation::Where(Predicate::Raw(sql.clone())),
            ("orderBy" | "orderByDesc", [arg]) => {
                let key = match arg {
                    Argument::Callback(cb) => Selector::Callback(source(cb)),
                    Argument::Text(sql) => Selector::Raw(sql.clone()),
                    _ => return Err(wrong_arguments(method)),
                };
                Operation::OrderBy {
                    key,
                    descending: method == "orderByDesc",
                }
            }
            ("select", [Argument::Callback(cb)]) => {
                Operation::Select(Projection::Callback(source(cb)))
            }
            ("select", [Argument::Text(column)]) => {
                Operation::Select(Projection::Column(column.clone()))
            }
            ("select", [Argument::Columns(columns)]) => {
                Operation::Select(Projection::Columns(columns.clone()))
            }
            ("first", []) => Operation::First(None),
            ("first", [Argument::Callback(cb)]) => {
                Operation::First(Some(Predicate::Callback(source(cb))))
            }
            ("first", [Argument::Text(sql)]) => Operation::First(Some(Predicate::Raw(sql.clone()))),
            (
                "join",
                [
                    Argument::Name(set),
                    Argument::Callback(outer_key),
                    Argument::Callback(inner_key),
                    Argument::Callback(result),
                ],
            ) => {
                let inner = self.lookup_set(set)?;
                let outer_entity = node
                    .root_binding()
                    .map(|binding| binding.entity.as_str())
                    .unwrap_or("");
                Operation::Join(JoinSpec {
                    name: format!("{}_{}", outer_entity, inner.entity),
                    inner,
                    outer_key: source(outer_key),
                    inner_key: source(inner_key),
                    result: source(result),
                })
            }
            ("where" | "orderBy" | "orderByDesc" | "select" | "first" | "join", _) => {
                return Err(wrong_arguments(method));
            }
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "unknown chain method '{}'",
                    method
                )));
            }
        };
        Ok(operation)
    }
}

fn wrong_arguments(method: &str) -> Error {
    Error::InvalidArgument(format!("wrong arguments for '{}'", method))
}

fn string_value(raw: &str) -> Result<String> {
    match parse_expression(raw)? {
        Expression::Literal(literal) => match literal.value {
            LiteralValue::String(text) => Ok(text),
            _ => Err(Error::InvalidArgument(format!("expected a string, got {}", raw))),
        },
        other => Err(Error::InvalidArgument(format!(
            "expected a string, got {}",
            other.describe()
        ))),
    }
}
