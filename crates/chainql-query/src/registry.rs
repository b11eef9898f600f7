//! Registered sets

use crate::node::RootBinding;
use chainql_core::{Error, Result};

/// The sets a context can query, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetRegistry {
    roots: Vec<RootBinding>,
}

impl SetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a set; entity names must be unique
    pub fn register(&mut self, entity: &str, table: &str) -> Result<&RootBinding> {
        if entity.is_empty() || table.is_empty() {
            return Err(Error::Configuration(format!(
                "set registration needs an entity and a table (got '{}' -> '{}')",
                entity, table
            )));
        }
        if self.resolve(entity).is_some() {
            return Err(Error::Configuration(format!(
                "entity '{}' is registered more than once",
                entity
            )));
        }

        let index = self.roots.len();
        self.roots.push(RootBinding::new(entity, table));
        Ok(&self.roots[index])
    }

    /// Look up a set by entity name
    pub fn resolve(&self, entity: &str) -> Option<&RootBinding> {
        self.roots.iter().find(|root| root.entity == entity)
    }

    /// Look up a set by backing table
    pub fn resolve_table(&self, table: &str) -> Option<&RootBinding> {
        self.roots.iter().find(|root| root.table == table)
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.resolve_table(table).is_some()
    }

    pub fn roots(&self) -> &[RootBinding] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = SetRegistry::new();
        registry.register("Post", "posts").unwrap();
        registry.register("User", "users").unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("Post").unwrap().table, "posts");
        assert_eq!(registry.resolve_table("users").unwrap().entity, "User");
        assert!(registry.contains_table("posts"));
        assert!(!registry.contains_table("comments"));
        assert!(registry.resolve("Comment").is_none());
    }

    #[test]
    fn test_registration_order() {
        let mut registry = SetRegistry::new();
        registry.register("User", "users").unwrap();
        registry.register("Post", "posts").unwrap();

        let entities: Vec<&str> = registry.roots().iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(entities, vec!["User", "Post"]);
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut registry = SetRegistry::new();
        registry.register("Post", "posts").unwrap();

        let err = registry.register("Post", "articles").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("Post").unwrap().table, "posts");
    }

    #[test]
    fn test_empty_names_rejected() {
        let mut registry = SetRegistry::new();
        assert!(registry.register("", "posts").is_err());
        assert!(registry.register("Post", "").is_err());
        assert!(registry.is_empty());
    }
}
