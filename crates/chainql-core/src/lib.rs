//! chainql Core Library
//!
//! Fundamental types shared by the expression compiler, the query chain
//! and the execution client boundary.
//!
//! # Modules
//!
//! - `error` - Parse, translation and execution errors
//! - `row` - Rows, keys and statement outcomes
//! - `config` - Database connection settings

pub mod config;
pub mod error;
pub mod row;

pub use config::DatabaseConfig;
pub use error::{Error, ParseError, Result, TranslationError};
pub use row::{ExecOutcome, Key, Row};
