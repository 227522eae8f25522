//! Database access object: one connection, one unit of work.
//!
//! ```ignore
//! use lightbox_db::{Database, DatabaseConfig, Filter, SelectBuilder, Renderable};
//!
//! let config = DatabaseConfig::from_env()?;
//! let mut db = Database::connect_default(&config).await?;
//!
//! let mut qb = SelectBuilder::new();
//! qb.fields(&["id", "name"]).from("web_lb_folder").and_eq("id", folder_id);
//! let folder = db.query_one(&qb).await?;
//!
//! let committed = db.close().await;
//! ```

use crate::builder::{Renderable, SelectBuilder};
use crate::client::GenericClient;
use crate::config::{DEFAULT_SOURCE, DatabaseConfig};
use crate::error::{ConnectError, DbError, DbResult};
use crate::placeholder::{count_placeholders, to_positional};
use crate::row::{Record, Value};
use crate::value::Scalar;
use std::future::Future;
use std::time::Duration;
use tokio_postgres::NoTls;

const LOG_TARGET: &str = "lightbox_db.sql";
const MAX_LOGGED_SQL: usize = 200;

fn truncate_sql(sql: &str) -> String {
    if sql.len() <= MAX_LOGGED_SQL {
        return sql.to_string();
    }
    let mut end = MAX_LOGGED_SQL;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = DbResult<T>>,
) -> DbResult<T> {
    match timeout {
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .map_err(|_| DbError::Timeout(d))?,
        None => fut.await,
    }
}

/// Render a builder and convert it to the driver's placeholder form.
fn prepare<B: Renderable + ?Sized>(builder: &B) -> DbResult<(String, Vec<Scalar>)> {
    let (sql, params) = builder.render()?.into_parts();
    let placeholders = count_placeholders(&sql);
    if placeholders != params.len() {
        return Err(DbError::invalid_argument(format!(
            "statement has {} placeholders but {} params: {}",
            placeholders,
            params.len(),
            truncate_sql(&sql)
        )));
    }
    Ok((to_positional(&sql), params))
}

/// Executes builders against one connection inside one transaction.
///
/// The transaction begins when the instance is created. Statement failures reported by the
/// driver do not interrupt the caller; they mark the unit of work as failed, and
/// [`Database::close`] then rolls everything back.
pub struct Database<C: GenericClient = tokio_postgres::Client> {
    client: C,
    source: String,
    successful: bool,
    query_timeout: Option<Duration>,
}

impl Database<tokio_postgres::Client> {
    /// Open the named data source and begin the unit of work.
    ///
    /// Errors here are startup failures; there is nothing useful a request can do without
    /// its connection.
    pub async fn connect(config: &DatabaseConfig, source: &str) -> Result<Self, ConnectError> {
        let ds = config.source(source)?;
        let (client, connection) = tokio_postgres::connect(&ds.url, NoTls)
            .await
            .map_err(|error| ConnectError::Connect {
                source_key: source.to_string(),
                error,
            })?;

        let key = source.to_string();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: LOG_TARGET, source = %key, error = %e, "connection error");
            }
        });

        Self::begin(client, source, ds.query_timeout()).await
    }

    /// [`Database::connect`] with the `default` source.
    pub async fn connect_default(config: &DatabaseConfig) -> Result<Self, ConnectError> {
        Self::connect(config, DEFAULT_SOURCE).await
    }
}

impl<C: GenericClient> Database<C> {
    /// Wrap an already-open client and begin the unit of work.
    pub async fn begin(
        client: C,
        source: &str,
        query_timeout: Option<Duration>,
    ) -> Result<Self, ConnectError> {
        client
            .batch_execute("BEGIN")
            .await
            .map_err(|e| ConnectError::Begin {
                source_key: source.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(target: LOG_TARGET, source = %source, "unit of work started");

        Ok(Self {
            client,
            source: source.to_string(),
            successful: true,
            query_timeout,
        })
    }

    /// Data source key this instance is connected to.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// `false` once any statement has failed.
    pub fn is_successful(&self) -> bool {
        self.successful
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn log_statement(&self, sql: &str, param_count: usize) {
        tracing::debug!(
            target: LOG_TARGET,
            source = %self.source,
            param_count,
            sql = %truncate_sql(sql),
        );
    }

    fn record_failure(&mut self, sql: &str, err: &DbError) {
        self.successful = false;
        tracing::warn!(
            target: LOG_TARGET,
            source = %self.source,
            error = %err,
            sql = %truncate_sql(sql),
            "statement failed; unit of work will roll back",
        );
    }

    /// Execute an INSERT/UPDATE (or any statement).
    ///
    /// With `expect_output`, the builder must declare an output clause and the first column
    /// of the first returned row comes back as the identifier. Driver failures are recorded
    /// (see [`Database::is_successful`]) and yield `Ok(None)`. Builder misuse and row decode
    /// failures are returned as `Err` and leave the unit of work untouched.
    pub async fn execute<B: Renderable + ?Sized>(
        &mut self,
        builder: &B,
        expect_output: bool,
    ) -> DbResult<Option<Value>> {
        if expect_output && builder.output_columns().is_empty() {
            return Err(DbError::invalid_argument(
                "expect_output requires an output clause on the statement",
            ));
        }
        let (sql, params) = prepare(builder)?;
        self.log_statement(&sql, params.len());

        if expect_output {
            let result = with_timeout(self.query_timeout, self.client.query(&sql, &params)).await;
            match result {
                Ok(rows) => Ok(rows.first().and_then(|r| r.get_index(0)).cloned()),
                Err(e @ DbError::Decode { .. }) => Err(e),
                Err(e) => {
                    self.record_failure(&sql, &e);
                    Ok(None)
                }
            }
        } else {
            let result = with_timeout(self.query_timeout, self.client.execute(&sql, &params)).await;
            if let Err(e) = result {
                self.record_failure(&sql, &e);
            }
            Ok(None)
        }
    }

    /// Execute a statement and materialize every row.
    ///
    /// With `expected_rows`, a different row count is `DbError::UnexpectedRowCount`. A
    /// driver failure is recorded and reads as zero rows. A row that cannot be decoded is
    /// `DbError::Decode` and does not mark the unit of work as failed.
    pub async fn query<B: Renderable + ?Sized>(
        &mut self,
        builder: &B,
        expected_rows: Option<usize>,
    ) -> DbResult<Vec<Record>> {
        let (sql, params) = prepare(builder)?;
        self.log_statement(&sql, params.len());

        let rows = match with_timeout(self.query_timeout, self.client.query(&sql, &params)).await {
            Ok(rows) => rows,
            // The statement ran; only mapping its rows failed.
            Err(e @ DbError::Decode { .. }) => return Err(e),
            Err(e) => {
                self.record_failure(&sql, &e);
                Vec::new()
            }
        };

        match expected_rows {
            Some(expected) if rows.len() != expected => {
                Err(DbError::unexpected_row_count(expected, rows.len()))
            }
            _ => Ok(rows),
        }
    }

    /// Exactly one row, or `DbError::UnexpectedRowCount`.
    pub async fn query_one<B: Renderable + ?Sized>(&mut self, builder: &B) -> DbResult<Record> {
        let rows = self.query(builder, Some(1)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::unexpected_row_count(1, 0))
    }

    /// Count the rows a SELECT would return, ignoring its window.
    pub async fn count(&mut self, select: &SelectBuilder) -> DbResult<i64> {
        let row = self.query_one(&CountOf(select)).await?;
        row.get_index(0)
            .and_then(Value::as_i64)
            .ok_or_else(|| DbError::decode("count", "COUNT(*) did not return an integer"))
    }

    /// Finish the unit of work: COMMIT if every statement succeeded, ROLLBACK otherwise.
    ///
    /// Returns whether the work was committed.
    pub async fn close(self) -> bool {
        let control = if self.successful { "COMMIT" } else { "ROLLBACK" };
        if !self.successful {
            tracing::warn!(target: LOG_TARGET, source = %self.source, "rolling back unit of work");
        }

        match self.client.batch_execute(control).await {
            Ok(()) => self.successful,
            Err(e) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    source = %self.source,
                    error = %e,
                    "{} failed",
                    control,
                );
                false
            }
        }
    }
}

/// Adapter rendering a SELECT's count statement.
struct CountOf<'a>(&'a SelectBuilder);

impl Renderable for CountOf<'_> {
    fn render(&self) -> DbResult<crate::builder::RenderedStatement> {
        self.0.render_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Assign, Filter, InsertBuilder, UpdateBuilder};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<(String, Vec<Scalar>)>>>;

    /// In-memory client: records every call and replays scripted results.
    #[derive(Default)]
    struct FakeClient {
        calls: CallLog,
        results: Mutex<VecDeque<DbResult<Vec<Record>>>>,
        fail_control: bool,
    }

    impl FakeClient {
        fn script(results: Vec<DbResult<Vec<Record>>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<(String, Vec<Scalar>)> {
            self.calls.lock().unwrap().clone()
        }

        fn next(&self, sql: &str, params: &[Scalar]) -> DbResult<Vec<Record>> {
            self.calls
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    impl GenericClient for FakeClient {
        async fn query(&self, sql: &str, params: &[Scalar]) -> DbResult<Vec<Record>> {
            self.next(sql, params)
        }

        async fn execute(&self, sql: &str, params: &[Scalar]) -> DbResult<u64> {
            self.next(sql, params).map(|rows| rows.len() as u64)
        }

        async fn batch_execute(&self, sql: &str) -> DbResult<()> {
            self.calls.lock().unwrap().push((sql.to_string(), Vec::new()));
            if self.fail_control {
                Err(DbError::Other("connection lost".into()))
            } else {
                Ok(())
            }
        }
    }

    fn row(id: i64) -> Record {
        Record::new()
            .with("id", Value::Int(id))
            .with("name", Value::Text(format!("folder {id}")))
    }

    fn folder_by_id(id: i64) -> SelectBuilder {
        let mut qb = SelectBuilder::new();
        qb.fields(&["id", "name"]).from("web_lb_folder").and_eq("id", id);
        qb
    }

    async fn open(client: FakeClient) -> Database<FakeClient> {
        Database::begin(client, "default", None).await.unwrap()
    }

    #[tokio::test]
    async fn begin_and_commit() {
        let mut db = open(FakeClient::script(vec![Ok(vec![row(1)])])).await;
        let rows = db.query(&folder_by_id(1), Some(1)).await.unwrap();
        assert_eq!(rows, vec![row(1)]);
        assert!(db.is_successful());

        let calls = db.client().calls();
        assert_eq!(calls[0].0, "BEGIN");
        assert_eq!(calls[1].0, "SELECT id, name FROM web_lb_folder WHERE id=$1");
        assert_eq!(calls[1].1, vec![Scalar::Int(1)]);
        assert!(db.close().await);
    }

    #[tokio::test]
    async fn row_count_mismatch() {
        let mut db = open(FakeClient::script(vec![
            Ok(vec![]),
            Ok(vec![row(1), row(2)]),
            Ok(vec![row(1), row(2)]),
        ]))
        .await;

        let err = db.query(&folder_by_id(1), Some(1)).await.unwrap_err();
        assert!(err.is_not_found());

        let err = db.query_one(&folder_by_id(1)).await.unwrap_err();
        assert!(err.is_ambiguous());

        let rows = db.query(&folder_by_id(1), None).await.unwrap();
        assert_eq!(rows.len(), 2);

        // Row-count errors are the caller's business; the unit of work is still fine.
        assert!(db.is_successful());
    }

    #[tokio::test]
    async fn failed_execute_rolls_back_on_close() {
        let mut db = open(FakeClient::script(vec![
            Err(DbError::UniqueViolation("web_lb_folder_name_key: duplicate".into())),
            Ok(vec![]),
        ]))
        .await;

        let mut ib = InsertBuilder::new("web_lb_folder");
        ib.set_str("name", "Holiday");
        assert_eq!(db.execute(&ib, false).await.unwrap(), None);
        assert!(!db.is_successful());

        let mut ub = UpdateBuilder::new("web_lb_folder");
        ub.set_str("name", "Trip").and_eq("id", 1);
        db.execute(&ub, false).await.unwrap();
        assert!(!db.is_successful(), "later success does not clear the failure");

        let client_calls = db.client().calls();
        assert_eq!(client_calls[2].0, "UPDATE web_lb_folder SET name=$1 WHERE id=$2");
        assert!(!db.close().await);
    }

    #[tokio::test]
    async fn close_issues_rollback_after_failure() {
        let client = FakeClient::script(vec![Err(DbError::Other("boom".into()))]);
        let log = client.calls.clone();
        let mut db = open(client).await;
        let rows = db.query(&folder_by_id(1), None).await.unwrap();
        assert!(rows.is_empty());
        assert!(!db.close().await);

        let statements: Vec<String> = log.lock().unwrap().iter().map(|(s, _)| s.clone()).collect();
        assert_eq!(statements.first().map(String::as_str), Some("BEGIN"));
        assert_eq!(statements.last().map(String::as_str), Some("ROLLBACK"));
    }

    #[tokio::test]
    async fn close_commits_after_success() {
        let client = FakeClient::default();
        let log = client.calls.clone();
        let mut db = open(client).await;
        let mut ib = InsertBuilder::new("web_lb_folder");
        ib.set_str("name", "Holiday");
        db.execute(&ib, false).await.unwrap();
        assert!(db.close().await);

        let last = log.lock().unwrap().last().map(|(s, _)| s.clone());
        assert_eq!(last.as_deref(), Some("COMMIT"));
    }

    #[tokio::test]
    async fn failed_query_with_expected_rows_reports_mismatch() {
        let mut db = open(FakeClient::script(vec![Err(DbError::Other("boom".into()))])).await;
        let err = db.query(&folder_by_id(1), Some(1)).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!db.is_successful());
    }

    #[tokio::test]
    async fn execute_with_output_returns_identifier() {
        let mut db = open(FakeClient::script(vec![Ok(vec![
            Record::new().with("id", Value::Int(42)),
        ])]))
        .await;

        let mut ib = InsertBuilder::new("web_lb_folder");
        ib.set_str("name", "Holiday").set_bool("is_shared", true).output(&["id"]);
        let id = db.execute(&ib, true).await.unwrap();
        assert_eq!(id, Some(Value::Int(42)));

        let calls = db.client().calls();
        assert_eq!(
            calls[1].0,
            "INSERT INTO web_lb_folder (name, is_shared) VALUES($1, $2) RETURNING id"
        );
        assert_eq!(calls[1].1, vec![Scalar::from("Holiday"), Scalar::from("Y")]);
    }

    #[tokio::test]
    async fn decode_failure_is_returned_without_rolling_back() {
        let client = FakeClient::script(vec![
            Ok(vec![]),
            Err(DbError::decode("total", "unsupported column type tsvector")),
            Err(DbError::decode("id", "unsupported column type oid")),
        ]);
        let log = client.calls.clone();
        let mut db = open(client).await;

        let mut ib = InsertBuilder::new("web_lb_media");
        ib.set_int("size", 2048);
        db.execute(&ib, false).await.unwrap();

        let mut qb = SelectBuilder::new();
        qb.field("SUM(size) AS total").from("web_lb_media");
        let err = db.query(&qb, Some(1)).await.unwrap_err();
        assert!(matches!(err, DbError::Decode { ref column, .. } if column == "total"));
        assert!(!err.is_not_found());
        assert!(db.is_successful());

        let mut ib = InsertBuilder::new("web_lb_media");
        ib.set_int("size", 4096).output(&["id"]);
        let err = db.execute(&ib, true).await.unwrap_err();
        assert!(matches!(err, DbError::Decode { .. }));
        assert!(db.is_successful());

        assert!(db.close().await);
        let last = log.lock().unwrap().last().map(|(s, _)| s.clone());
        assert_eq!(last.as_deref(), Some("COMMIT"));
    }

    #[tokio::test]
    async fn expect_output_without_clause_is_misuse() {
        let mut db = open(FakeClient::default()).await;
        let mut ib = InsertBuilder::new("web_lb_folder");
        ib.set_str("name", "Holiday");
        assert!(db.execute(&ib, true).await.unwrap_err().is_invalid_argument());
        // Nothing reached the driver and the unit of work is untouched.
        assert_eq!(db.client().calls().len(), 1);
        assert!(db.is_successful());
    }

    #[tokio::test]
    async fn builder_misuse_is_raised_before_execution() {
        let mut db = open(FakeClient::default()).await;

        let mut qb = SelectBuilder::new();
        qb.field("id").from("web_lb_folder").limit(10).offset(20);
        assert!(db.query(&qb, None).await.unwrap_err().is_invalid_argument());

        let ub = UpdateBuilder::new("web_lb_folder");
        assert!(db.execute(&ub, false).await.unwrap_err().is_invalid_argument());

        assert_eq!(db.client().calls().len(), 1);
        assert!(db.is_successful());
    }

    #[tokio::test]
    async fn placeholder_in_raw_fragment_is_rejected() {
        let mut db = open(FakeClient::default()).await;
        let mut qb = SelectBuilder::new();
        qb.field("id").from("web_lb_media").and_eq_fn("meta", "meta ? 'x'");
        assert!(db.query(&qb, None).await.unwrap_err().is_invalid_argument());
    }

    #[tokio::test]
    async fn count_uses_count_statement() {
        let mut db = open(FakeClient::script(vec![Ok(vec![
            Record::new().with("count", Value::Int(12)),
        ])]))
        .await;
        let mut qb = folder_by_id(3);
        qb.order_by("name").paginate(2, 5);
        assert_eq!(db.count(&qb).await.unwrap(), 12);
        assert_eq!(
            db.client().calls()[1].0,
            "SELECT COUNT(*) FROM web_lb_folder WHERE id=$1"
        );
    }

    #[tokio::test]
    async fn failed_begin_is_connect_error() {
        let client = FakeClient {
            fail_control: true,
            ..FakeClient::default()
        };
        let err = Database::begin(client, "default", None).await.err().unwrap();
        assert!(matches!(err, ConnectError::Begin { source_key, .. } if source_key == "default"));
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        struct SlowClient;

        impl GenericClient for SlowClient {
            async fn query(&self, _sql: &str, _params: &[Scalar]) -> DbResult<Vec<Record>> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Vec::new())
            }

            async fn execute(&self, _sql: &str, _params: &[Scalar]) -> DbResult<u64> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(0)
            }

            async fn batch_execute(&self, _sql: &str) -> DbResult<()> {
                Ok(())
            }
        }

        let mut db = Database::begin(SlowClient, "stock", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        assert_eq!(db.source(), "stock");
        let rows = db.query(&folder_by_id(1), None).await.unwrap();
        assert!(rows.is_empty());
        assert!(!db.is_successful());
        assert!(!db.close().await);
    }

    #[test]
    fn long_sql_is_truncated_for_logs() {
        let sql = "x".repeat(500);
        assert_eq!(truncate_sql(&sql).len(), MAX_LOGGED_SQL + 3);
        assert_eq!(truncate_sql("SELECT 1"), "SELECT 1");
    }
}
