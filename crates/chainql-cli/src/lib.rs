//! chainql command line front end
//!
//! Translates chain scripts to SQL, dumps callback trees and lists the
//! configured sets. Nothing is sent to a database.

pub mod config;
pub mod script;

pub use config::{CliConfig, SetConfig};
pub use script::parse_chain;

use chainql_core::Result;
use chainql_expr::parse_lambda;
use chainql_query::Translator;
use clap::Subcommand;
use tracing::debug;

/// Commands of the `chainql` binary
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the SQL for a chain script
    Translate {
        /// Chain script, e.g. `posts.where(x => x.id > 12)`
        script: String,
    },

    /// Print the expression tree of a callback as JSON
    Parse {
        /// Callback source, e.g. `x => x.id > 12`
        lambda: String,
    },

    /// List the configured sets
    Sets,
}

/// Run a command and return what it prints
pub fn run(command: &Command, config: &CliConfig) -> Result<String> {
    match command {
        Command::Translate { script } => {
            let registry = config.registry()?;
            let node = parse_chain(script, &registry)?;
            debug!("Parsed chain of {} nodes", node.depth());
            Translator::new(&registry).translate_outer(&node)
        }
        Command::Parse { lambda } => {
            let lambda = parse_lambda(lambda)?;
            Ok(serde_json::to_string_pretty(&lambda)?)
        }
        Command::Sets => {
            let registry = config.registry()?;
            let lines: Vec<String> = registry
                .roots()
                .iter()
                .map(|root| format!("{} -> {}", root.entity, root.table))
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainql_core::Error;

    #[test]
    fn test_translate() {
        let output = run(
            &Command::Translate {
                script: "posts.where(x => x.id > 12).first()".to_string(),
            },
            &CliConfig::default(),
        )
        .unwrap();
        assert_eq!(output, "SELECT * FROM posts WHERE (id > 12) LIMIT 1");
    }

    #[test]
    fn test_parse_prints_tree() {
        let output = run(
            &Command::Parse {
                lambda: "x => !x.active".to_string(),
            },
            &CliConfig::default(),
        )
        .unwrap();

        let tree: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(tree["params"][0], "x");
        assert_eq!(tree["body"]["Unary"]["op"], "Not");
    }

    #[test]
    fn test_parse_failure() {
        let err = run(
            &Command::Parse {
                lambda: "x => { a; b; }".to_string(),
            },
            &CliConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_sets() {
        let config = CliConfig::default().with_set("Comment", "comments");
        let output = run(&Command::Sets, &config).unwrap();
        assert_eq!(output, "Post -> posts\nUser -> users\nComment -> comments");
    }
}
