//! Expression tree for callback bodies

use serde::{Deserialize, Serialize};
use std::fmt;

/// One node of a parsed or built callback body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Prefix operation (`!x`, `-x`)
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    /// Arithmetic or comparison
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
    /// Boolean connective
    Logical {
        left: Box<Expression>,
        op: LogicalOp,
        right: Box<Expression>,
    },
    /// Property access (object.property)
    Member {
        object: Box<Expression>,
        property: String,
    },
    /// Method call; the callee is normally a `Member`
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
    /// Bare name, usually a lambda parameter
    Identifier(String),
    /// Literal value
    Literal(Literal),
    /// Plain object literal `{ key: expr, ... }`
    Object(Vec<(String, Expression)>),
}

/// Literal value together with the text it was written as
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Equality
    Equals,
    StrictEquals,
    NotEquals,
    StrictNotEquals,
    // Relational
    LessThan,
    LessEquals,
    GreaterThan,
    GreaterEquals,
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

/// How the callback body was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyShape {
    /// `x => <expr>`
    Expression,
    /// `x => { return { ... }; }`
    ReturnObject,
}

/// A callback: parameter names plus its body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Expression,
    pub shape: BodyShape,
}

impl Lambda {
    pub fn new(params: Vec<String>, body: Expression) -> Self {
        Self {
            params,
            body,
            shape: BodyShape::Expression,
        }
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Fail unless the callback declares exactly `expected` distinct parameters
    pub fn expect_arity(&self, expected: usize) -> Result<(), chainql_core::ParseError> {
        if self.params.len() != expected {
            return Err(chainql_core::ParseError::ParameterCount {
                expected,
                found: self.params.len(),
            });
        }
        for (i, name) in self.params.iter().enumerate() {
            if self.params[..i].contains(name) {
                return Err(chainql_core::ParseError::DuplicateParameter(name.clone()));
            }
        }
        Ok(())
    }
}

impl Literal {
    pub fn number(value: f64) -> Self {
        Self {
            value: LiteralValue::Number(value),
            raw: format_number(value),
        }
    }

    pub fn string(value: &str) -> Self {
        Self {
            value: LiteralValue::String(value.to_string()),
            raw: format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            value: LiteralValue::Boolean(value),
            raw: value.to_string(),
        }
    }

    pub fn null() -> Self {
        Self {
            value: LiteralValue::Null,
            raw: "null".to_string(),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
        }
    }
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Equals => "==",
            BinaryOp::StrictEquals => "===",
            BinaryOp::NotEquals => "!=",
            BinaryOp::StrictNotEquals => "!==",
            BinaryOp::LessThan => "<",
            BinaryOp::LessEquals => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterEquals => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }
}

impl LogicalOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

impl Expression {
    /// Name of the construct, used in error messages
    pub fn describe(&self) -> String {
        match self {
            Expression::Unary { op, .. } => format!("unary '{}'", op.symbol()),
            Expression::Binary { op, .. } => format!("binary '{}'", op.symbol()),
            Expression::Logical { op, .. } => format!("logical '{}'", op.symbol()),
            Expression::Member { property, .. } => format!("member access '.{}'", property),
            Expression::Call { callee, .. } => match callee.as_ref() {
                Expression::Member { property, .. } => format!("method call '.{}()'", property),
                other => format!("call of {}", other.describe()),
            },
            Expression::Identifier(name) => format!("identifier '{}'", name),
            Expression::Literal(lit) => format!("literal {}", lit.raw),
            Expression::Object(_) => "object literal".to_string(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Unary { op, operand } => write!(f, "{}{}", op.symbol(), operand),
            Expression::Binary { left, op, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Logical { left, op, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Member { object, property } => write!(f, "{}.{}", object, property),
            Expression::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::Literal(lit) => write!(f, "{}", lit.raw),
            Expression::Object(entries) => {
                write!(f, "{{ ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, " }}")
            }
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params.as_slice() {
            [single] => write!(f, "{} => ", single)?,
            params => write!(f, "({}) => ", params.join(", "))?,
        }
        match (&self.shape, &self.body) {
            (BodyShape::Expression, Expression::Object(_)) => write!(f, "({})", self.body),
            (BodyShape::ReturnObject, body) => write!(f, "{{ return {}; }}", body),
            (BodyShape::Expression, body) => write!(f, "{}", body),
        }
    }
}
