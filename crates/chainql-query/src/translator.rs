//! Query chain to SQL translation
//!
//! The chain is folded root first into a [`SelectBlock`]. A node whose
//! clause cannot be appended to the current block in SQL clause order
//! wraps the block as a derived table and starts a new one:
//!
//! - Where and OrderBy wrap a block that already projects or has a LIMIT
//! - First wraps a block that has a LIMIT, or a projecting block when it
//!   carries a predicate
//! - Select wraps anything but a bare root
//! - any node consuming a join wraps it, since a join always projects
//!
//! Derived tables are aliased `t`, or `f` when they hold a join.

use crate::node::*;
use crate::registry::SetRegistry;
use chainql_core::{Result, TranslationError};
use chainql_expr::{map_expression, map_projection, Scope};

const SUBQUERY_ALIAS: &str = "t";
const JOIN_ALIAS: &str = "f";

/// One `SELECT` level under construction
#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectBlock {
    projection: Option<String>,
    source: String,
    filters: Vec<String>,
    order: Vec<String>,
    limit: Option<u32>,
    joined: bool,
}

impl SelectBlock {
    fn from_source(source: String) -> Self {
        Self {
            projection: None,
            source,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            joined: false,
        }
    }

    fn projects(&self) -> bool {
        self.projection.is_some()
    }

    /// The `FROM ...` fragment
    fn inner(&self) -> String {
        let mut sql = format!("FROM {}", self.source);
        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filters.join(" AND "));
        }
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql
    }

    /// The complete statement
    fn outer(&self) -> String {
        format!(
            "SELECT {} {}",
            self.projection.as_deref().unwrap_or("*"),
            self.inner()
        )
    }

    /// Turn this block into a derived table of a fresh block
    fn wrap(self) -> Self {
        let alias = if self.joined { JOIN_ALIAS } else { SUBQUERY_ALIAS };
        Self::from_source(format!("({}) AS {}", self.outer(), alias))
    }

    fn wrap_if(self, condition: bool) -> Self {
        if condition { self.wrap() } else { self }
    }
}

/// Lowers query chains to SQL against a set registry
#[derive(Debug, Clone, Copy)]
pub struct Translator<'a> {
    registry: &'a SetRegistry,
}

impl<'a> Translator<'a> {
    pub fn new(registry: &'a SetRegistry) -> Self {
        Self { registry }
    }

    /// The full `SELECT ... FROM ...` statement for the chain ending at `node`
    pub fn translate_outer(&self, node: &QueryNode) -> Result<String> {
        Ok(self.block(node)?.outer())
    }

    /// The `FROM ...` fragment of the same statement
    pub fn translate_inner(&self, node: &QueryNode) -> Result<String> {
        Ok(self.block(node)?.inner())
    }

    fn block(&self, node: &QueryNode) -> Result<SelectBlock> {
        let mut chain: Vec<&QueryNode> = node.ancestry().collect();
        chain.reverse();

        let Some((start, rest)) = chain.split_first() else {
            return Err(TranslationError::UnknownOperation("empty chain".to_string()).into());
        };
        let mut block = match start.operation() {
            Operation::Root(binding) => SelectBlock::from_source(self.table_of(binding)?),
            other => {
                return Err(TranslationError::UnknownOperation(format!(
                    "{} node without a predecessor",
                    other.kind()
                ))
                .into());
            }
        };

        for (index, node) in rest.iter().enumerate() {
            block = self.apply(node.operation(), index == 0, block)?;
        }
        Ok(block)
    }

    fn apply(
        &self,
        operation: &Operation,
        over_root: bool,
        block: SelectBlock,
    ) -> Result<SelectBlock> {
        match operation {
            Operation::Root(binding) => Err(TranslationError::UnknownOperation(format!(
                "root node for '{}' with a predecessor",
                binding.entity
            ))
            .into()),
            Operation::Where(predicate) => {
                let condition = self.predicate(predicate)?;
                let blocked = block.projects() || block.limit.is_some();
                let mut block = block.wrap_if(blocked);
                block.filters.push(condition);
                Ok(block)
            }
            Operation::OrderBy { key, descending } => {
                let mut key = self.selector(key)?;
                if *descending {
                    key.push_str(" DESC");
                }
                let blocked = block.projects() || block.limit.is_some();
                let mut block = block.wrap_if(blocked);
                // the latest sort key takes precedence
                block.order.insert(0, key);
                Ok(block)
            }
            Operation::First(predicate) => {
                let condition = predicate.as_ref().map(|p| self.predicate(p)).transpose()?;
                let blocked =
                    block.limit.is_some() || (condition.is_some() && block.projects());
                let mut block = block.wrap_if(blocked);
                block.filters.extend(condition);
                block.limit = Some(1);
                Ok(block)
            }
            Operation::Select(projection) => {
                let columns = self.projection(projection)?;
                let mut block = block.wrap_if(!over_root);
                block.projection = Some(columns);
                Ok(block)
            }
            Operation::Join(spec) => self.join(spec, over_root, block),
        }
    }

    fn join(&self, spec: &JoinSpec, over_root: bool, block: SelectBlock) -> Result<SelectBlock> {
        let inner_table = self.table_of(&spec.inner)?;
        let result = spec.result.resolve(2)?;
        let outer_key = spec.outer_key.resolve(1)?;
        let inner_key = spec.inner_key.resolve(1)?;

        // The projector's parameter names double as the table aliases
        let outer_alias = result.params[0].as_str();
        let inner_alias = result.params[1].as_str();

        let outer_source = if over_root {
            block.source
        } else {
            format!("({})", block.outer())
        };
        let on_left =
            map_expression(&outer_key.body, &Scope::aliased(&outer_key, &[outer_alias]))?;
        let on_right =
            map_expression(&inner_key.body, &Scope::aliased(&inner_key, &[inner_alias]))?;
        let columns = map_projection(
            &result.body,
            &Scope::aliased(&result, &[outer_alias, inner_alias]),
        )?;

        let mut joined = SelectBlock::from_source(format!(
            "{} AS {} INNER JOIN {} AS {} ON ({} = {})",
            outer_source, outer_alias, inner_table, inner_alias, on_left, on_right
        ));
        joined.projection = Some(columns);
        joined.joined = true;
        Ok(joined)
    }

    fn table_of(&self, binding: &RootBinding) -> Result<String> {
        self.registry
            .resolve(&binding.entity)
            .map(|root| root.table.clone())
            .ok_or_else(|| TranslationError::UnknownSet(binding.entity.clone()).into())
    }

    fn predicate(&self, predicate: &Predicate) -> Result<String> {
        match predicate {
            Predicate::Callback(callback) => {
                let lambda = callback.resolve(1)?;
                Ok(map_expression(&lambda.body, &Scope::unqualified(&lambda))?)
            }
            Predicate::Raw(sql) => Ok(format!("({})", sql)),
        }
    }

    fn selector(&self, selector: &Selector) -> Result<String> {
        match selector {
            Selector::Callback(callback) => {
                let lambda = callback.resolve(1)?;
                Ok(map_expression(&lambda.body, &Scope::unqualified(&lambda))?)
            }
            Selector::Raw(sql) => Ok(sql.clone()),
        }
    }

    fn projection(&self, projection: &Projection) -> Result<String> {
        match projection {
            Projection::Callback(callback) => {
                let lambda = callback.resolve(1)?;
                Ok(map_projection(&lambda.body, &Scope::unqualified(&lambda))?)
            }
            Projection::Column(name) => Ok(name.clone()),
            Projection::Columns(names) if names.is_empty() => Err(
                TranslationError::UnsupportedExpression("empty column list".to_string()).into(),
            ),
            Projection::Columns(names) => Ok(names.join(", ")),
        }
    }
}
