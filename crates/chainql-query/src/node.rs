//! Immutable query chain
//!
//! Each composition step allocates one node pointing at the node it was
//! called on. Nodes are never modified, so a chain prefix can be shared by
//! any number of continuations.

use chainql_core::{ParseError, Result};
use chainql_expr::{parse_lambda, Lambda};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A named set and the table backing it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RootBinding {
    /// Logical entity name, e.g. `Post`
    pub entity: String,

    /// Backing table name, e.g. `posts`
    pub table: String,
}

impl RootBinding {
    pub fn new(entity: &str, table: &str) -> Self {
        Self {
            entity: entity.to_string(),
            table: table.to_string(),
        }
    }
}

/// A callback as source text or as a built tree
///
/// Source text is parsed when the chain is translated, not when the
/// callback is attached.
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    Source(String),
    Lambda(Lambda),
}

impl Callback {
    /// The callback as a tree, parsing source text on demand
    pub fn lambda(&self) -> std::result::Result<Cow<'_, Lambda>, ParseError> {
        match self {
            Callback::Source(source) => parse_lambda(source).map(Cow::Owned),
            Callback::Lambda(lambda) => Ok(Cow::Borrowed(lambda)),
        }
    }

    /// Resolve the callback and check that it takes `arity` parameters
    pub fn resolve(&self, arity: usize) -> Result<Cow<'_, Lambda>> {
        let lambda = self.lambda()?;
        lambda.expect_arity(arity)?;
        Ok(lambda)
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Source(source) => write!(f, "{}", source),
            Callback::Lambda(lambda) => write!(f, "{}", lambda),
        }
    }
}

/// Anything accepted where a callback is expected
pub trait IntoCallback {
    fn into_callback(self) -> Callback;
}

impl IntoCallback for Callback {
    fn into_callback(self) -> Callback {
        self
    }
}

impl IntoCallback for Lambda {
    fn into_callback(self) -> Callback {
        Callback::Lambda(self)
    }
}

impl IntoCallback for &str {
    fn into_callback(self) -> Callback {
        Callback::Source(self.to_string())
    }
}

impl IntoCallback for String {
    fn into_callback(self) -> Callback {
        Callback::Source(self)
    }
}

/// Filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Callback(Callback),
    /// SQL condition text embedded as written
    Raw(String),
}

/// Sort key
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Callback(Callback),
    /// SQL column or expression text embedded as written
    Raw(String),
}

/// Output columns of a Select
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Callback(Callback),
    Column(String),
    Columns(Vec<String>),
}

/// Inner join against another registered set
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    /// The joined set
    pub inner: RootBinding,

    /// Key of the chain's rows
    pub outer_key: Callback,

    /// Key of the joined set's rows
    pub inner_key: Callback,

    /// Two-parameter projector over (outer row, inner row)
    pub result: Callback,

    /// Diagnostic name, `<OuterEntity>_<InnerEntity>`
    pub name: String,
}

/// One step of a query chain
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Root(RootBinding),
    Where(Predicate),
    OrderBy { key: Selector, descending: bool },
    Select(Projection),
    Join(JoinSpec),
    First(Option<Predicate>),
}

/// Tag of an operation, used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Where,
    OrderBy,
    Select,
    Join,
    First,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Where => "where",
            NodeKind::OrderBy => "orderby",
            NodeKind::Select => "select",
            NodeKind::Join => "join",
            NodeKind::First => "first",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Operation {
    pub fn kind(&self) -> NodeKind {
        match self {
            Operation::Root(_) => NodeKind::Root,
            Operation::Where(_) => NodeKind::Where,
            Operation::OrderBy { .. } => NodeKind::OrderBy,
            Operation::Select(_) => NodeKind::Select,
            Operation::Join(_) => NodeKind::Join,
            Operation::First(_) => NodeKind::First,
        }
    }
}

/// A node of a query chain
#[derive(Debug, PartialEq)]
pub struct QueryNode {
    operation: Operation,
    predecessor: Option<Arc<QueryNode>>,
}

impl QueryNode {
    /// Build a node from its parts
    ///
    /// Well-formed chains come from [`QueryNode::root`] and
    /// [`QueryNode::then`]; the translator rejects any other shape.
    pub fn new(operation: Operation, predecessor: Option<Arc<QueryNode>>) -> Arc<Self> {
        Arc::new(Self {
            operation,
            predecessor,
        })
    }

    /// Start a chain at a registered set
    pub fn root(binding: RootBinding) -> Arc<Self> {
        Self::new(Operation::Root(binding), None)
    }

    /// Append an operation, leaving `self` untouched
    pub fn then(self: &Arc<Self>, operation: Operation) -> Arc<Self> {
        Self::new(operation, Some(Arc::clone(self)))
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn predecessor(&self) -> Option<&Arc<QueryNode>> {
        self.predecessor.as_ref()
    }

    pub fn kind(&self) -> NodeKind {
        self.operation.kind()
    }

    /// True for a Root with nothing after it
    pub fn is_bare_root(&self) -> bool {
        matches!(self.operation, Operation::Root(_)) && self.predecessor.is_none()
    }

    /// Walk from this node back to the start of the chain
    pub fn ancestry(&self) -> impl Iterator<Item = &QueryNode> {
        std::iter::successors(Some(self), |node| node.predecessor.as_deref())
    }

    /// The set the chain starts from, if it ends at a Root
    pub fn root_binding(&self) -> Option<&RootBinding> {
        match self.ancestry().last().map(|node| &node.operation) {
            Some(Operation::Root(binding)) => Some(binding),
            _ => None,
        }
    }

    /// Number of nodes in the chain, the root included
    pub fn depth(&self) -> usize {
        self.ancestry().count()
    }
}

// Unlink the chain iteratively; the derived drop recurses once per node
impl Drop for QueryNode {
    fn drop(&mut self) {
        let mut next = self.predecessor.take();
        while let Some(node) = next {
            match Arc::into_inner(node) {
                Some(mut node) => next = node.predecessor.take(),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainql_expr::builder::{field, lambda};

    fn posts() -> Arc<QueryNode> {
        QueryNode::root(RootBinding::new("Post", "posts"))
    }

    #[test]
    fn test_then_keeps_predecessor() {
        let root = posts();
        let filtered = root.then(Operation::Where(Predicate::Callback(
            "x => x.id > 12".into_callback(),
        )));

        assert_eq!(filtered.kind(), NodeKind::Where);
        assert!(Arc::ptr_eq(filtered.predecessor().unwrap(), &root));
        assert!(root.is_bare_root());
        assert!(!filtered.is_bare_root());
        assert_eq!(filtered.depth(), 2);
    }

    #[test]
    fn test_shared_prefix() {
        let root = posts();
        let a = root.then(Operation::First(None));
        let b = root.then(Operation::Select(Projection::Column("title".to_string())));

        assert!(Arc::ptr_eq(a.predecessor().unwrap(), b.predecessor().unwrap()));
        assert_eq!(Arc::strong_count(&root), 3);
    }

    #[test]
    fn test_root_binding() {
        let chain = posts()
            .then(Operation::First(None))
            .then(Operation::Select(Projection::Column("id".to_string())));
        assert_eq!(chain.root_binding(), Some(&RootBinding::new("Post", "posts")));

        let orphan = QueryNode::new(Operation::First(None), None);
        assert_eq!(orphan.root_binding(), None);
    }

    #[test]
    fn test_callback_resolution() {
        let source = "x => x.id > 12".into_callback();
        let built = lambda(["x"], field("x", "id").gt(12)).into_callback();

        assert_eq!(source.resolve(1).unwrap(), built.resolve(1).unwrap());
        assert!(matches!(
            source.resolve(2),
            Err(chainql_core::Error::Parse(ParseError::ParameterCount {
                expected: 2,
                found: 1
            }))
        ));
        assert!(matches!(
            "x => {".into_callback().resolve(1),
            Err(chainql_core::Error::Parse(_))
        ));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(NodeKind::OrderBy.to_string(), "orderby");
        assert_eq!(
            serde_json::to_string(&NodeKind::First).unwrap(),
            "\"first\""
        );
    }

    #[test]
    fn test_long_chain_drops() {
        let root = posts();
        let mut chain = Arc::clone(&root);
        for _ in 0..100_000 {
            chain = chain.then(Operation::Where(Predicate::Raw("id > 1".to_string())));
        }
        assert_eq!(chain.depth(), 100_001);

        let branch = chain.predecessor().map(Arc::clone).unwrap();
        drop(chain);
        assert_eq!(branch.depth(), 100_000);
        drop(branch);
        assert_eq!(Arc::strong_count(&root), 1);
        assert!(root.is_bare_root());
    }

    #[test]
    fn test_nodes_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryNode>();
        assert_send_sync::<Arc<QueryNode>>();
    }
}
