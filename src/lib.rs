//! chainql - composable query chains compiled to a single SQL statement
//!
//! This is the main library crate that re-exports all chainql components.
//!
//! ```
//! use chainql::{DbContext, Entity, RecordingExecutor};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Post {
//!     id: i64,
//!     title: String,
//! }
//!
//! impl Entity for Post {
//!     const NAME: &'static str = "Post";
//!     const TABLE: &'static str = "posts";
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> chainql::Result<()> {
//! let context = DbContext::builder()
//!     .register::<Post>()
//!     .build(Arc::new(RecordingExecutor::new()))?;
//!
//! let recent = context
//!     .set::<Post>()?
//!     .filter(r#"x => x.id > 12 && x.title.contains("ll")"#)
//!     .order_by_desc("x => x.id");
//!
//! assert_eq!(
//!     recent.to_sql()?,
//!     r#"SELECT * FROM posts WHERE ((id > 12) AND title LIKE "%ll%") ORDER BY id DESC"#
//! );
//! let posts: Vec<Post> = recent.to_vec().await?;
//! assert!(posts.is_empty());
//! # Ok(())
//! # }
//! ```

pub use chainql_core as core;
pub use chainql_expr as expr;
pub use chainql_query as query;

// Re-export commonly used types
pub use chainql_core::{
    DatabaseConfig, Error, ExecOutcome, Key, ParseError, Result, Row, TranslationError,
};

pub use chainql_expr::{builder, parse_lambda, Expression, Lambda, Scope};
pub use chainql_query::{
    Callback, DbContext, DbContextBuilder, DbSet, Entity, Executor, IntoCallback, NodeKind,
    Operation, Query, QueryNode, RecordingExecutor, RootBinding, SetRegistry, Translator,
};
