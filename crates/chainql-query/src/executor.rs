//! Execution client boundary
//!
//! The query layer produces SQL text and hands it to an [`Executor`]. A
//! database driver implements the trait; [`RecordingExecutor`] keeps
//! everything in memory for tests and dry runs.

use async_trait::async_trait;
use chainql_core::{Error, ExecOutcome, Result, Row};
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// A database client able to run generated statements
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a statement returning rows
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Run a statement that changes data, binding `params` to its `?` placeholder
    async fn execute(&self, sql: &str, params: Option<&Row>) -> Result<ExecOutcome>;

    /// Quote a value for direct inclusion in SQL text
    fn escape(&self, value: &Value) -> String {
        escape_literal(value)
    }
}

/// MySQL-style literal quoting
pub fn escape_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        other => quote(&other.to_string()),
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for ch in text.chars() {
        match ch {
            '\0' => quoted.push_str("\\0"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\x1a' => quoted.push_str("\\Z"),
            '\'' | '"' | '\\' => {
                quoted.push('\\');
                quoted.push(ch);
            }
            _ => quoted.push(ch),
        }
    }
    quoted.push('\'');
    quoted
}

/// A statement seen by a [`RecordingExecutor`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub params: Option<Row>,
}

/// Canned reply for the next statement
#[derive(Debug, Clone)]
enum Reply {
    Rows(Vec<Row>),
    Outcome(ExecOutcome),
    Failure(String),
}

/// In-memory executor that records statements and answers from a queue
///
/// With an empty queue, queries return no rows and other statements
/// report nothing affected.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    statements: Mutex<Vec<RecordedStatement>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next statement with `rows`
    pub async fn push_rows(&self, rows: Vec<Row>) {
        self.replies.lock().await.push_back(Reply::Rows(rows));
    }

    /// Answer the next statement with `outcome`
    pub async fn push_outcome(&self, outcome: ExecOutcome) {
        self.replies.lock().await.push_back(Reply::Outcome(outcome));
    }

    /// Fail the next statement with a driver error
    pub async fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .await
            .push_back(Reply::Failure(message.to_string()));
    }

    /// Every statement received so far, oldest first
    pub async fn statements(&self) -> Vec<RecordedStatement> {
        self.statements.lock().await.clone()
    }

    /// The SQL text of every statement received so far
    pub async fn sql_log(&self) -> Vec<String> {
        self.statements
            .lock()
            .await
            .iter()
            .map(|s| s.sql.clone())
            .collect()
    }

    async fn record(&self, sql: &str, params: Option<&Row>) -> Option<Reply> {
        self.statements.lock().await.push(RecordedStatement {
            sql: sql.to_string(),
            params: params.cloned(),
        });
        self.replies.lock().await.pop_front()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        match self.record(sql, None).await {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Failure(message)) => Err(Error::Execution(message)),
            Some(Reply::Outcome(_)) | None => Ok(Vec::new()),
        }
    }

    async fn execute(&self, sql: &str, params: Option<&Row>) -> Result<ExecOutcome> {
        match self.record(sql, params).await {
            Some(Reply::Outcome(outcome)) => Ok(outcome),
            Some(Reply::Failure(message)) => Err(Error::Execution(message)),
            Some(Reply::Rows(_)) | None => Ok(ExecOutcome::default()),
        }
    }
}
