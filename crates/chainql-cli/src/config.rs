//! Command line configuration

use chainql_core::{DatabaseConfig, Error, Result};
use chainql_query::SetRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One registered set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetConfig {
    /// Logical entity name
    pub entity: String,

    /// Backing table
    pub table: String,
}

impl SetConfig {
    pub fn new(entity: &str, table: &str) -> Self {
        Self {
            entity: entity.to_string(),
            table: table.to_string(),
        }
    }
}

/// Configuration of the `chainql` binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Connection settings
    pub database: DatabaseConfig,

    /// Sets chain scripts may start from or join
    pub sets: Vec<SetConfig>,

    /// Log level
    pub log_level: String,
}

impl Default for CliConfig {
    /// A blog schema with posts and their authors
    fn default() -> Self {
        Self {
            database: DatabaseConfig::new("blog"),
            sets: vec![SetConfig::new("Post", "posts"), SetConfig::new("User", "users")],
            log_level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load a configuration from a JSON file; missing fields keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        if self.sets.is_empty() {
            return Err(Error::Configuration("no sets configured".to_string()));
        }
        Ok(())
    }

    /// Builder: add a set
    pub fn with_set(mut self, entity: &str, table: &str) -> Self {
        self.sets.push(SetConfig::new(entity, table));
        self
    }

    /// Register every configured set
    pub fn registry(&self) -> Result<SetRegistry> {
        let mut registry = SetRegistry::new();
        for set in &self.sets {
            registry.register(&set.entity, &set.table)?;
        }
        Ok(registry)
    }
}
