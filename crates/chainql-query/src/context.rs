//! Typed sets and the context that owns them
//!
//! A [`DbContext`] holds the set registry, the connection settings and the
//! execution client. [`DbSet`] is the typed entry point for one set and
//! [`Query`] a chain grown from it.

use crate::crud;
use crate::executor::Executor;
use crate::node::*;
use crate::registry::SetRegistry;
use crate::translator::Translator;
use chainql_core::{DatabaseConfig, ExecOutcome, Key, Result, Row, TranslationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A row type stored in a registered set
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Logical name, used for registration and diagnostics
    const NAME: &'static str;

    /// Backing table
    const TABLE: &'static str;

    /// Key column used by the single-row helpers
    const KEY: &'static str = "id";
}

/// Collects set registrations and settings for a [`DbContext`]
#[derive(Debug, Clone, Default)]
pub struct DbContextBuilder {
    registrations: Vec<(String, String)>,
    config: DatabaseConfig,
}

impl DbContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the set backing `T`
    pub fn register<T: Entity>(self) -> Self {
        self.register_named(T::NAME, T::TABLE)
    }

    /// Register a set by name
    pub fn register_named(mut self, entity: &str, table: &str) -> Self {
        self.registrations
            .push((entity.to_string(), table.to_string()));
        self
    }

    /// Builder: set connection settings
    pub fn config(mut self, config: DatabaseConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the registrations and bind them to an execution client
    pub fn build(self, executor: Arc<dyn Executor>) -> Result<DbContext> {
        self.config.validate()?;

        let mut registry = SetRegistry::new();
        for (entity, table) in &self.registrations {
            registry.register(entity, table)?;
        }

        info!("Built context with {} registered sets", registry.len());

        Ok(DbContext {
            inner: Arc::new(ContextInner {
                registry,
                config: self.config,
                executor,
            }),
        })
    }
}

struct ContextInner {
    registry: SetRegistry,
    config: DatabaseConfig,
    executor: Arc<dyn Executor>,
}

/// Registered sets bound to an execution client
#[derive(Clone)]
pub struct DbContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for DbContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbContext")
            .field("registry", &self.inner.registry)
            .field("database", &self.inner.config.database)
            .finish()
    }
}

impl DbContext {
    pub fn builder() -> DbContextBuilder {
        DbContextBuilder::new()
    }

    /// The typed set for `T`, which must have been registered
    pub fn set<T: Entity>(&self) -> Result<DbSet<T>> {
        let binding = self
            .inner
            .registry
            .resolve(T::NAME)
            .cloned()
            .ok_or_else(|| TranslationError::UnknownSet(T::NAME.to_string()))?;

        Ok(DbSet {
            context: self.clone(),
            binding,
            _marker: PhantomData,
        })
    }

    pub fn registry(&self) -> &SetRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    pub fn translator(&self) -> Translator<'_> {
        Translator::new(&self.inner.registry)
    }

    /// Run raw SQL and return its rows untouched
    #[tracing::instrument(name = "context.query", skip(self))]
    pub async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.fetch(sql).await
    }

    /// Translate a chain and run it
    async fn run(&self, node: &QueryNode) -> Result<Vec<Row>> {
        let sql = self.translator().translate_outer(node)?;
        self.fetch(&sql).await
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<Row>> {
        self.log_statement(sql);
        self.inner
            .executor
            .query(sql)
            .await
            .inspect_err(|e| warn!("Statement failed: {}: {}", sql, e))
    }

    async fn execute(&self, sql: &str, params: Option<&Row>) -> Result<ExecOutcome> {
        self.log_statement(sql);
        self.inner
            .executor
            .execute(sql, params)
            .await
            .inspect_err(|e| warn!("Statement failed: {}: {}", sql, e))
    }

    fn escape(&self, value: &Value) -> String {
        self.inner.executor.escape(value)
    }

    fn log_statement(&self, sql: &str) {
        if self.inner.config.log_statements {
            debug!("Executing: {}", sql);
        }
    }
}

fn decode<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Typed entry point for one registered set
pub struct DbSet<T> {
    context: DbContext,
    binding: RootBinding,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for DbSet<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            binding: self.binding.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for DbSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSet").field("binding", &self.binding).finish()
    }
}

impl<T: Entity> DbSet<T> {
    pub fn binding(&self) -> &RootBinding {
        &self.binding
    }

    pub fn table(&self) -> &str {
        &self.binding.table
    }

    /// The whole set, as the start of a chain
    pub fn all(&self) -> Query<T> {
        Query {
            context: self.context.clone(),
            node: QueryNode::root(self.binding.clone()),
            _marker: PhantomData,
        }
    }

    pub fn filter(&self, predicate: impl IntoCallback) -> Query<T> {
        self.all().filter(predicate)
    }

    pub fn filter_raw(&self, condition: &str) -> Query<T> {
        self.all().filter_raw(condition)
    }

    pub fn order_by(&self, key: impl IntoCallback) -> Query<T> {
        self.all().order_by(key)
    }

    pub fn order_by_desc(&self, key: impl IntoCallback) -> Query<T> {
        self.all().order_by_desc(key)
    }

    pub fn select(&self, projection: impl IntoCallback) -> Query<Row> {
        self.all().select(projection)
    }

    pub fn select_columns<I, S>(&self, columns: I) -> Query<Row>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.all().select_columns(columns)
    }

    pub fn join<U: Entity>(
        &self,
        other: &DbSet<U>,
        outer_key: impl IntoCallback,
        inner_key: impl IntoCallback,
        result: impl IntoCallback,
    ) -> Query<Row> {
        self.all().join(other, outer_key, inner_key, result)
    }

    pub async fn to_vec(&self) -> Result<Vec<T>> {
        self.all().to_vec().await
    }

    pub async fn first(&self) -> Result<Option<T>> {
        self.all().first().await
    }

    pub async fn first_where(&self, predicate: impl IntoCallback) -> Result<Option<T>> {
        self.all().first_where(predicate).await
    }

    /// Insert one row; returns the generated key when the driver reports one
    #[tracing::instrument(name = "set.add", skip(self, entity), fields(table = %self.binding.table))]
    pub async fn add(&self, entity: &T) -> Result<Option<u64>> {
        let row = crud::to_row(entity)?;
        let sql = crud::insert_statement(&self.binding.table);
        let outcome = self.context.execute(&sql, Some(&row)).await?;
        Ok(outcome.insert_id)
    }

    /// Overwrite the row with the entity's key; returns the affected row count
    #[tracing::instrument(name = "set.update", skip(self, entity), fields(table = %self.binding.table))]
    pub async fn update(&self, entity: &T) -> Result<u64> {
        let row = crud::to_row(entity)?;
        let key = crud::key_of(&row, T::KEY)?;
        let sql = crud::update_statement(&self.binding.table, T::KEY, &self.key_sql(&key));
        let outcome = self.context.execute(&sql, Some(&row)).await?;
        Ok(outcome.affected_rows)
    }

    /// Delete the row with `key`; returns the affected row count
    #[tracing::instrument(name = "set.remove", skip(self, key), fields(table = %self.binding.table))]
    pub async fn remove(&self, key: impl Into<Key>) -> Result<u64> {
        let sql = crud::delete_statement(&self.binding.table, T::KEY, &self.key_sql(&key.into()));
        let outcome = self.context.execute(&sql, None).await?;
        Ok(outcome.affected_rows)
    }

    /// Fetch the row with `key`
    #[tracing::instrument(name = "set.find", skip(self, key), fields(table = %self.binding.table))]
    pub async fn find(&self, key: impl Into<Key>) -> Result<Option<T>> {
        let sql = crud::find_statement(&self.binding.table, T::KEY, &self.key_sql(&key.into()));
        let rows = self.context.fetch(&sql).await?;
        rows.into_iter().next().map(decode).transpose()
    }

    /// Run raw SQL and decode its rows as `T`
    pub async fn query(&self, sql: &str) -> Result<Vec<T>> {
        let rows = self.context.query(sql).await?;
        rows.into_iter().map(decode).collect()
    }

    fn key_sql(&self, key: &Key) -> String {
        crud::key_literal(key, |value| self.context.escape(value))
    }
}

/// A query chain bound to a context; `T` is the row type it decodes into
pub struct Query<T> {
    context: DbContext,
    node: Arc<QueryNode>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            node: Arc::clone(&self.node),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").field("node", &self.node).finish()
    }
}

impl<T> Query<T> {
    fn then<R>(&self, operation: Operation) -> Query<R> {
        Query {
            context: self.context.clone(),
            node: self.node.then(operation),
            _marker: PhantomData,
        }
    }

    /// The last node of the chain
    pub fn node(&self) -> &Arc<QueryNode> {
        &self.node
    }

    /// Table the chain starts from
    pub fn root_table(&self) -> &str {
        self.node
            .root_binding()
            .map(|binding| binding.table.as_str())
            .unwrap_or("")
    }

    /// The statement this chain runs, without running it
    pub fn to_sql(&self) -> Result<String> {
        self.context.translator().translate_outer(&self.node)
    }

    /// Same chain, decoded as `R`
    pub fn cast<R>(&self) -> Query<R> {
        Query {
            context: self.context.clone(),
            node: Arc::clone(&self.node),
            _marker: PhantomData,
        }
    }

    pub fn filter(&self, predicate: impl IntoCallback) -> Query<T> {
        self.then(Operation::Where(Predicate::Callback(predicate.into_callback())))
    }

    /// Filter on SQL condition text, embedded as written
    pub fn filter_raw(&self, condition: &str) -> Query<T> {
        self.then(Operation::Where(Predicate::Raw(condition.to_string())))
    }

    pub fn order_by(&self, key: impl IntoCallback) -> Query<T> {
        self.then(Operation::OrderBy {
            key: Selector::Callback(key.into_callback()),
            descending: false,
        })
    }

    pub fn order_by_desc(&self, key: impl IntoCallback) -> Query<T> {
        self.then(Operation::OrderBy {
            key: Selector::Callback(key.into_callback()),
            descending: true,
        })
    }

    /// Sort on SQL text, embedded as written
    pub fn order_by_raw(&self, key: &str, descending: bool) -> Query<T> {
        self.then(Operation::OrderBy {
            key: Selector::Raw(key.to_string()),
            descending,
        })
    }

    pub fn select(&self, projection: impl IntoCallback) -> Query<Row> {
        self.then(Operation::Select(Projection::Callback(
            projection.into_callback(),
        )))
    }

    pub fn select_column(&self, column: &str) -> Query<Row> {
        self.then(Operation::Select(Projection::Column(column.to_string())))
    }

    pub fn select_columns<I, S>(&self, columns: I) -> Query<Row>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.then(Operation::Select(Projection::Columns(
            columns.into_iter().map(Into::into).collect(),
        )))
    }

    /// Inner join with another set
    ///
    /// `result` takes the row of this chain and the row of `other`; its
    /// parameter names become the table aliases in the generated SQL.
    pub fn join<U: Entity>(
        &self,
        other: &DbSet<U>,
        outer_key: impl IntoCallback,
        inner_key: impl IntoCallback,
        result: impl IntoCallback,
    ) -> Query<Row> {
        let outer_entity = self
            .node
            .root_binding()
            .map(|binding| binding.entity.as_str())
            .unwrap_or("");
        let name = format!("{}_{}", outer_entity, other.binding.entity);
        debug!("Composed join {}", name);

        self.then(Operation::Join(JoinSpec {
            inner: other.binding.clone(),
            outer_key: outer_key.into_callback(),
            inner_key: inner_key.into_callback(),
            result: result.into_callback(),
            name,
        }))
    }
}

impl<T: DeserializeOwned> Query<T> {
    /// Run the chain and return the rows as the driver produced them
    #[tracing::instrument(name = "query.to_rows", skip(self), fields(table = %self.root_table()))]
    pub async fn to_rows(&self) -> Result<Vec<Row>> {
        self.context.run(&self.node).await
    }

    /// Run the chain and decode every row
    #[tracing::instrument(name = "query.to_vec", skip(self), fields(table = %self.root_table()))]
    pub async fn to_vec(&self) -> Result<Vec<T>> {
        let rows = self.context.run(&self.node).await?;
        rows.into_iter().map(decode).collect()
    }

    /// Run the chain limited to one row
    #[tracing::instrument(name = "query.first", skip(self), fields(table = %self.root_table()))]
    pub async fn first(&self) -> Result<Option<T>> {
        self.run_first(None).await
    }

    /// Run the chain limited to the first row matching `predicate`
    #[tracing::instrument(name = "query.first_where", skip(self, predicate), fields(table = %self.root_table()))]
    pub async fn first_where(&self, predicate: impl IntoCallback) -> Result<Option<T>> {
        self.run_first(Some(Predicate::Callback(predicate.into_callback())))
            .await
    }

    async fn run_first(&self, predicate: Option<Predicate>) -> Result<Option<T>> {
        let node = self.node.then(Operation::First(predicate));
        let rows = self.context.run(&node).await?;
        rows.into_iter().next().map(decode).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordingExecutor;
    use chainql_core::Error;
    use chainql_expr::builder::{field, lambda};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Post {
        id: i64,
        title: String,
        author_id: i64,
    }

    impl Entity for Post {
        const NAME: &'static str = "Post";
        const TABLE: &'static str = "posts";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        login: String,
        name: String,
    }

    impl Entity for User {
        const NAME: &'static str = "User";
        const TABLE: &'static str = "users";
        const KEY: &'static str = "login";
    }

    fn row(value: Value) -> Row {
        value.as_object().unwrap().clone()
    }

    fn setup() -> (DbContext, Arc<RecordingExecutor>) {
        let executor = Arc::new(RecordingExecutor::new());
        let context = DbContext::builder()
            .register::<Post>()
            .register::<User>()
            .build(executor.clone())
            .unwrap();
        (context, executor)
    }

    #[test]
    fn test_build_registers_sets() {
        let (context, _) = setup();
        assert_eq!(context.registry().len(), 2);
        assert_eq!(context.set::<Post>().unwrap().table(), "posts");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = DbContext::builder()
            .register::<Post>()
            .register_named("Post", "articles")
            .build(Arc::new(RecordingExecutor::new()));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_invalid_config_fails() {
        let result = DbContext::builder()
            .config(DatabaseConfig::new("blog").host("", 3306))
            .build(Arc::new(RecordingExecutor::new()));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_unregistered_set() {
        let context = DbContext::builder()
            .register::<Post>()
            .build(Arc::new(RecordingExecutor::new()))
            .unwrap();
        assert!(matches!(
            context.set::<User>(),
            Err(Error::Translation(TranslationError::UnknownSet(name))) if name == "User"
        ));
    }

    #[tokio::test]
    async fn test_to_vec_decodes_rows() {
        let (context, executor) = setup();
        executor
            .push_rows(vec![row(json!({ "id": 13, "title": "Hello", "author_id": 1 }))])
            .await;

        let posts = context
            .set::<Post>()
            .unwrap()
            .filter("x => x.id > 12")
            .to_vec()
            .await
            .unwrap();

        assert_eq!(
            posts,
            vec![Post {
                id: 13,
                title: "Hello".to_string(),
                author_id: 1
            }]
        );
        assert_eq!(
            executor.sql_log().await,
            vec!["SELECT * FROM posts WHERE (id > 12)"]
        );
    }

    #[tokio::test]
    async fn test_builder_callbacks() {
        let (context, _) = setup();
        let posts = context.set::<Post>().unwrap();

        let sql = posts
            .filter(lambda(["x"], field("x", "id").gt(12)))
            .order_by_desc(lambda(["x"], field("x", "title")))
            .to_sql()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM posts WHERE (id > 12) ORDER BY title DESC");
    }

    #[tokio::test]
    async fn test_first() {
        let (context, executor) = setup();
        let posts = context.set::<Post>().unwrap();
        executor
            .push_rows(vec![row(json!({ "id": 2, "title": "B", "author_id": 1 }))])
            .await;

        let first = posts.order_by("x => x.id").first().await.unwrap();
        assert_eq!(first.map(|p| p.id), Some(2));

        let none = posts.first_where("x => x.id == 99").await.unwrap();
        assert_eq!(none, None);

        assert_eq!(
            executor.sql_log().await,
            vec![
                "SELECT * FROM posts ORDER BY id LIMIT 1",
                "SELECT * FROM posts WHERE (id = 99) LIMIT 1",
            ]
        );
    }

    #[tokio::test]
    async fn test_join_through_sets() {
        let (context, executor) = setup();
        let posts = context.set::<Post>().unwrap();
        let users = context.set::<User>().unwrap();

        let joined = posts.filter("p => p.id > 12").join(
            &users,
            "p => p.author_id",
            "u => u.id",
            "(p, u) => ({ title: p.title, author: u.name })",
        );
        match joined.node().operation() {
            Operation::Join(spec) => assert_eq!(spec.name, "Post_User"),
            other => panic!("expected a join, got {:?}", other.kind()),
        }

        executor
            .push_rows(vec![row(json!({ "title": "Hello", "author": "Ann" }))])
            .await;
        let rows = joined
            .filter(r#"x => x.author.startsWith("A")"#)
            .order_by("x => x.title")
            .to_rows()
            .await
            .unwrap();

        assert_eq!(rows[0]["author"], "Ann");
        assert_eq!(
            executor.sql_log().await,
            vec![
                "SELECT * FROM (SELECT p.title AS title, u.name AS author \
                 FROM (SELECT * FROM posts WHERE (id > 12)) AS p \
                 INNER JOIN users AS u ON (p.author_id = u.id)) AS f \
                 WHERE author LIKE \"A%\" ORDER BY title"
            ]
        );
    }

    #[tokio::test]
    async fn test_chains_are_immutable() {
        let (context, _) = setup();
        let posts = context.set::<Post>().unwrap();

        let a = posts.filter("x => x.id > 12");
        let before = a.to_sql().unwrap();
        let b = a.filter("x => x.author_id == 3");

        assert_eq!(a.to_sql().unwrap(), before);
        assert_eq!(
            b.to_sql().unwrap(),
            "SELECT * FROM posts WHERE (id > 12) AND (author_id = 3)"
        );
        assert!(Arc::ptr_eq(b.node().predecessor().unwrap(), a.node()));
    }

    #[tokio::test]
    async fn test_failed_translation_never_executes() {
        let (context, executor) = setup();
        let posts = context.set::<Post>().unwrap();

        let err = posts.filter("x => x.foo()").to_vec().await.unwrap_err();
        assert!(err.is_translation_failure());

        let err = posts.select("x => { return x.id; }").to_rows().await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        assert!(executor.statements().await.is_empty());
    }

    #[tokio::test]
    async fn test_driver_failure_passes_through() {
        let (context, executor) = setup();
        executor.push_failure("table posts is locked").await;

        let err = context.set::<Post>().unwrap().to_vec().await.unwrap_err();
        assert!(matches!(err, Error::Execution(msg) if msg == "table posts is locked"));
    }

    #[tokio::test]
    async fn test_select_projections() {
        let (context, executor) = setup();
        let posts = context.set::<Post>().unwrap();
        executor.push_rows(vec![row(json!({ "title": "Hello" }))]).await;

        let rows = posts.select_columns(["id", "title"]).to_vec().await.unwrap();
        assert_eq!(rows[0]["title"], "Hello");
        assert_eq!(
            posts.all().select_column("title").to_sql().unwrap(),
            "SELECT title FROM posts"
        );
        assert_eq!(
            posts.filter_raw("id < 5").order_by_raw("id", true).to_sql().unwrap(),
            "SELECT * FROM posts WHERE (id < 5) ORDER BY id DESC"
        );
    }

    #[tokio::test]
    async fn test_cast_projection() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Title {
            title: String,
        }

        let (context, executor) = setup();
        executor.push_rows(vec![row(json!({ "title": "Hello" }))]).await;

        let titles: Vec<Title> = context
            .set::<Post>()
            .unwrap()
            .select("x => ({ title: x.title })")
            .cast::<Title>()
            .to_vec()
            .await
            .unwrap();
        assert_eq!(titles[0].title, "Hello");
    }

    #[tokio::test]
    async fn test_add_and_update() {
        let (context, executor) = setup();
        let posts = context.set::<Post>().unwrap();
        executor.push_outcome(ExecOutcome::inserted(7)).await;
        executor.push_outcome(ExecOutcome::affected(1)).await;

        let post = Post {
            id: 7,
            title: "Hello".to_string(),
            author_id: 1,
        };
        assert_eq!(posts.add(&post).await.unwrap(), Some(7));
        assert_eq!(posts.update(&post).await.unwrap(), 1);

        let statements = executor.statements().await;
        assert_eq!(statements[0].sql, "INSERT INTO posts SET ?");
        assert_eq!(statements[0].params.as_ref().unwrap()["title"], "Hello");
        assert_eq!(statements[1].sql, "UPDATE posts SET ? WHERE id=7");
    }

    #[tokio::test]
    async fn test_remove_and_find() {
        let (context, executor) = setup();
        let users = context.set::<User>().unwrap();
        executor.push_outcome(ExecOutcome::affected(1)).await;
        executor
            .push_rows(vec![row(json!({ "login": "ann", "name": "Ann" }))])
            .await;

        assert_eq!(users.remove("o'neil").await.unwrap(), 1);
        let found = users.find("ann").await.unwrap();
        assert_eq!(found.map(|u| u.name), Some("Ann".to_string()));

        assert_eq!(
            executor.sql_log().await,
            vec![
                "DELETE FROM users WHERE login='o\\'neil'",
                "SELECT * FROM users WHERE login='ann' LIMIT 1",
            ]
        );
    }

    #[tokio::test]
    async fn test_raw_query_pass_through() {
        let (context, executor) = setup();
        executor.push_rows(vec![row(json!({ "n": 3 }))]).await;

        let rows = context.query("SELECT COUNT(*) AS n FROM posts").await.unwrap();
        assert_eq!(rows[0]["n"], 3);
        assert_eq!(executor.sql_log().await, vec!["SELECT COUNT(*) AS n FROM posts"]);
    }

    #[test]
    fn test_handles_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DbContext>();
        assert_send_sync::<DbSet<Post>>();
        assert_send_sync::<Query<Post>>();
    }
}
