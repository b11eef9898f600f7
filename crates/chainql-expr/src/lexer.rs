//! Callback lexer using logos
//!
//! Recognizes the arrow-function subset accepted in predicates, key
//! selectors and projections. Anything else is reported with its offset.

use chainql_core::ParseError;
use logos::Logos;
use std::ops::Range;

/// Callback tokens
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Keywords
    #[token("return")]
    Return,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    // Symbols
    #[token("=>")]
    Arrow,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token(".")]
    Dot,

    // Equality
    #[token("==")]
    Equals,

    #[token("===")]
    StrictEquals,

    #[token("!=")]
    NotEquals,

    #[token("!==")]
    StrictNotEquals,

    // Relational
    #[token("<")]
    LessThan,

    #[token("<=")]
    LessEquals,

    #[token(">")]
    GreaterThan,

    #[token(">=")]
    GreaterEquals,

    // Arithmetic
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    // Logical
    #[token("!")]
    Bang,

    #[token("&&")]
    AndAnd,

    #[token("||")]
    OrOr,

    // Literals keep their raw source text
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice().to_string())]
    DoubleQuoted(String),

    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| lex.slice().to_string())]
    SingleQuoted(String),

    // Identifiers
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Comment (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip)]
    BlockComment,
}

/// A token together with its byte range in the source
pub type Spanned = (Token, Range<usize>);

impl Token {
    /// Short human-readable form used in error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Return => "'return'".to_string(),
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Null => "'null'".to_string(),
            Token::Arrow => "'=>'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Semicolon => "';'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Equals => "'=='".to_string(),
            Token::StrictEquals => "'==='".to_string(),
            Token::NotEquals => "'!='".to_string(),
            Token::StrictNotEquals => "'!=='".to_string(),
            Token::LessThan => "'<'".to_string(),
            Token::LessEquals => "'<='".to_string(),
            Token::GreaterThan => "'>'".to_string(),
            Token::GreaterEquals => "'>='".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::Bang => "'!'".to_string(),
            Token::AndAnd => "'&&'".to_string(),
            Token::OrOr => "'||'".to_string(),
            Token::Number(raw) => format!("number {}", raw),
            Token::DoubleQuoted(raw) | Token::SingleQuoted(raw) => format!("string {}", raw),
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::LineComment | Token::BlockComment => "comment".to_string(),
        }
    }

    /// Check if this token is a literal
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Token::Number(_)
                | Token::DoubleQuoted(_)
                | Token::SingleQuoted(_)
                | Token::True
                | Token::False
                | Token::Null
        )
    }
}

/// Tokenize callback source text, failing on the first unrecognized character
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let character = input[span.start..].chars().next().unwrap_or('\0');
                return Err(ParseError::UnexpectedCharacter {
                    character,
                    offset: span.start,
                });
            }
        }
    }
    Ok(tokens)
}
