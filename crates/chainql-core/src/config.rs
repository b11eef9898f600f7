//! Database connection configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Connection settings handed to the execution client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database host
    pub host: String,

    /// Database port
    pub port: u16,

    /// Login user
    pub user: String,

    /// Login password
    pub password: String,

    /// Schema to connect to
    pub database: String,

    /// Log every generated statement at debug level
    pub log_statements: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: String::new(),
            log_statements: true,
        }
    }
}

impl DatabaseConfig {
    /// Create a configuration for the given schema
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            ..Default::default()
        }
    }

    /// Create configuration for development
    pub fn for_development(database: &str) -> Self {
        Self {
            database: database.to_string(),
            log_statements: true,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no client could connect with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Configuration("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Configuration("port must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Builder: set host and port
    pub fn host(mut self, host: &str, port: u16) -> Self {
        self.host = host.to_string();
        self.port = port;
        self
    }

    /// Builder: set credentials
    pub fn credentials(mut self, user: &str, password: &str) -> Self {
        self.user = user.to_string();
        self.password = password.to_string();
        self
    }

    /// Builder: silence statement logging
    pub fn quiet(mut self) -> Self {
        self.log_statements = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DatabaseConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 3306);
        assert!(config.log_statements);
    }

    #[test]
    fn test_builder() {
        let config = DatabaseConfig::new("blog")
            .host("db.internal", 3307)
            .credentials("app", "secret")
            .quiet();

        assert_eq!(config.database, "blog");
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 3307);
        assert_eq!(config.user, "app");
        assert!(!config.log_statements);
    }

    #[test]
    fn test_load_fills_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "host": "10.0.0.5", "database": "blog" }}"#).unwrap();

        let config = DatabaseConfig::load(file.path()).unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.database, "blog");
        assert_eq!(config.port, 3306);
    }

    #[test]
    fn test_load_rejects_empty_host() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "host": "" }}"#).unwrap();

        let err = DatabaseConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
