//! Query execution against the pooled database
//!
//! Every call acquires exactly one pooled connection for its duration. The
//! connection guard returns it to the pool on every exit path, including when
//! the calling future is dropped mid-statement.

use std::time::Duration;

use config::DatabaseConfig;
use futures::TryStreamExt;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, PgPool, Postgres, Row as _, TypeInfo};
use type_mapping::SqlValue;

use crate::errors::StoreError;

/// One result row, columns in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl IntoIterator for Row {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// Rewrite portable `?` markers into `$1..$n`.
///
/// Markers inside single-quoted literals and double-quoted identifiers are
/// left untouched. Returns the rewritten statement and the marker count.
pub fn translate_placeholders(sql: &str) -> (String, usize) {
    rewrite_markers(sql, |n| format!("${n}"))
}

fn rewrite_markers(sql: &str, mut marker: impl FnMut(usize) -> String) -> (String, usize) {
    let mut statement = String::with_capacity(sql.len() + 8);
    let mut count = 0;
    let mut quoted: Option<char> = None;

    for c in sql.chars() {
        match quoted {
            Some(q) => {
                if c == q {
                    quoted = None;
                }
                statement.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quoted = Some(c);
                    statement.push(c);
                }
                '?' => {
                    count += 1;
                    statement.push_str(&marker(count));
                }
                _ => statement.push(c),
            },
        }
    }

    (statement, count)
}

/// Check the argument count and build the statement sent to the server.
///
/// A NULL argument is written as an untyped `NULL` literal instead of a bound
/// parameter, so the server infers its type from the target column. Only the
/// remaining arguments are bound, numbered `$1..$k` in order.
fn prepare(sql: &str, args: &[SqlValue]) -> Result<String, StoreError> {
    let (_, expected) = translate_placeholders(sql);
    if expected != args.len() {
        return Err(StoreError::ParameterCountMismatch {
            expected,
            given: args.len(),
        });
    }

    let mut bound = 0;
    let (statement, _) = rewrite_markers(sql, |n| {
        if args[n - 1].is_null() {
            "NULL".to_string()
        } else {
            bound += 1;
            format!("${bound}")
        }
    });
    Ok(statement)
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            // inlined by prepare
            SqlValue::Null => query,
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.clone()),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> Result<Row, StoreError> {
    let mut columns = Vec::with_capacity(row.len());
    for column in row.columns() {
        let index = column.ordinal();
        let value: SqlValue = match column.type_info().name() {
            "BOOL" => row.try_get::<Option<bool>, _>(index)?.into(),
            "INT2" => row.try_get::<Option<i16>, _>(index)?.map(i64::from).into(),
            "INT4" => row.try_get::<Option<i32>, _>(index)?.map(i64::from).into(),
            "INT8" => row.try_get::<Option<i64>, _>(index)?.into(),
            "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.map(f64::from).into(),
            "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.into(),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                row.try_get::<Option<String>, _>(index)?.into()
            }
            other => {
                return Err(StoreError::UnsupportedColumn {
                    column: column.name().to_string(),
                    type_name: other.to_string(),
                })
            }
        };
        columns.push((column.name().to_string(), value));
    }
    Ok(Row::new(columns))
}

/// Owner of the connection pool; the only way statements reach the database
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    pool: PgPool,
}

impl QueryExecutor {
    /// Create the connection pool described by `config`
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        tracing::info!("creating database connection pool...");
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .options([("client_encoding", config.charset.as_str())]);

        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Physical connections currently open, idle or in use
    pub fn open_connections(&self) -> u32 {
        self.pool.size()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run a query and collect up to `max_rows` rows (all rows when `None`).
    ///
    /// `Some(0)` returns no rows without touching the pool.
    pub async fn select(
        &self,
        sql: &str,
        args: &[SqlValue],
        max_rows: Option<usize>,
    ) -> Result<Vec<Row>, StoreError> {
        tracing::info!("SQL: {}", sql);
        let statement = prepare(sql, args)?;
        if max_rows == Some(0) {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.acquire().await?;
        let mut rows = Vec::new();
        {
            let mut stream = bind_all(sqlx::query(&statement), args).fetch(&mut *conn);
            while let Some(row) = stream.try_next().await? {
                rows.push(decode_row(&row)?);
                if max_rows.is_some_and(|max| rows.len() >= max) {
                    break;
                }
            }
        }

        tracing::info!("rows returned: {}", rows.len());
        Ok(rows)
    }

    /// Run a statement and return the affected row count.
    ///
    /// With `transactional` the statement runs inside BEGIN/COMMIT and a
    /// failure is rolled back before the original error is returned.
    pub async fn execute(
        &self,
        sql: &str,
        args: &[SqlValue],
        transactional: bool,
    ) -> Result<u64, StoreError> {
        tracing::info!("SQL: {}", sql);
        let statement = prepare(sql, args)?;

        let mut conn = self.pool.acquire().await?;
        if !transactional {
            let result = bind_all(sqlx::query(&statement), args)
                .execute(&mut *conn)
                .await?;
            return Ok(result.rows_affected());
        }

        let mut tx = conn.begin().await?;
        match bind_all(sqlx::query(&statement), args)
            .execute(&mut *tx)
            .await
        {
            Ok(result) => {
                tx.commit().await?;
                Ok(result.rows_affected())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!("rollback failed: {}", rollback);
                }
                Err(e.into())
            }
        }
    }
}
