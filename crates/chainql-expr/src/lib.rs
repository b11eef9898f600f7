//! Callback expressions for chainql
//!
//! Two front ends produce the same [`Lambda`] tree: the arrow-function
//! parser and the typed builder. The mapper turns a tree into SQL text.

pub mod ast;
pub mod builder;
pub mod lexer;
pub mod mapper;
pub mod parser;

pub use ast::{BinaryOp, BodyShape, Expression, Lambda, Literal, LiteralValue, LogicalOp, UnaryOp};
pub use mapper::{map_expression, map_projection, Scope};
pub use parser::{parse_expression, parse_lambda};
