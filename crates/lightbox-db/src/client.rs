//! Driver seam for [`Database`](crate::Database).
//!
//! SQL reaching a client is already in the driver's placeholder form (`$1..$n`) and the
//! params are in placeholder order.

use crate::error::{DbError, DbResult};
use crate::row::Record;
use crate::value::Scalar;
use tokio_postgres::types::ToSql;

/// Minimal client interface the database access object executes through.
///
/// Implemented for `tokio_postgres::Client`; tests provide in-memory doubles.
pub trait GenericClient: Send + Sync {
    /// Prepare and execute a statement, returning every row.
    ///
    /// A row that cannot be mapped to a [`Record`] is `DbError::Decode`; every other error
    /// comes from the driver.
    fn query(
        &self,
        sql: &str,
        params: &[Scalar],
    ) -> impl std::future::Future<Output = DbResult<Vec<Record>>> + Send;

    /// Prepare and execute a statement, returning the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Scalar],
    ) -> impl std::future::Future<Output = DbResult<u64>> + Send;

    /// Run parameterless control statements (`BEGIN`, `COMMIT`, `ROLLBACK`).
    fn batch_execute(&self, sql: &str) -> impl std::future::Future<Output = DbResult<()>> + Send;
}

fn bind_refs(params: &[Scalar]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Scalar]) -> DbResult<Vec<Record>> {
        let stmt = tokio_postgres::Client::prepare(self, sql)
            .await
            .map_err(DbError::from_db_error)?;
        let rows = tokio_postgres::Client::query(self, &stmt, &bind_refs(params))
            .await
            .map_err(DbError::from_db_error)?;
        rows.iter().map(Record::from_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[Scalar]) -> DbResult<u64> {
        let stmt = tokio_postgres::Client::prepare(self, sql)
            .await
            .map_err(DbError::from_db_error)?;
        tokio_postgres::Client::execute(self, &stmt, &bind_refs(params))
            .await
            .map_err(DbError::from_db_error)
    }

    async fn batch_execute(&self, sql: &str) -> DbResult<()> {
        tokio_postgres::Client::batch_execute(self, sql)
            .await
            .map_err(DbError::from_db_error)
    }
}
