//! Query chains for chainql
//!
//! Builds immutable chains of filter, sort, projection, join and
//! take-first operations, lowers them to one SQL statement and runs it
//! through an [`Executor`].
//!
//! # Modules
//!
//! - `node` - Query chain nodes and callbacks
//! - `translator` - Chain to SQL lowering
//! - `registry` - Registered sets
//! - `executor` - Execution client trait and in-memory client
//! - `context` - Context, typed sets and queries
//! - `crud` - Single-row statement builders

pub mod context;
pub mod crud;
pub mod executor;
pub mod node;
pub mod registry;
pub mod translator;

pub use context::{DbContext, DbContextBuilder, DbSet, Entity, Query};
pub use executor::{escape_literal, Executor, RecordedStatement, RecordingExecutor};
pub use node::{
    Callback, IntoCallback, JoinSpec, NodeKind, Operation, Predicate, Projection, QueryNode,
    RootBinding, Selector,
};
pub use registry::SetRegistry;
pub use translator::Translator;
