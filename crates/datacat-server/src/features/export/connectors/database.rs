//! Relational database connector
//!
//! One connection per export, no pooling. The stored `sql_query` runs
//! verbatim: it is written by catalog operators, not by downloaders.
//! Whatever happens after the connection opens, it is closed exactly once
//! before `fetch` returns. Columns whose type has no JSON rendering fail
//! the query instead of exporting placeholder text.

use crate::features::export::params::AccessParams;
use crate::features::export::resolver::ConfigurationError;
use async_trait::async_trait;
use datacat_common::rows::{Row, RowSet};
use serde_json::Value;
use sqlx::mysql::{MySqlColumn, MySqlConnection, MySqlRow};
use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgColumn, PgConnection, PgRow};
use sqlx::{Column, Connection, Row as _, TypeInfo, ValueRef};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Upper bound on the graceful close handshake
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

pub const REQUIRED_FIELDS: &[&str] = &["db_type", "connection_string", "sql_query"];

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbEngine {
    MySql,
    Postgres,
}

impl FromStr for DbEngine {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(DbEngine::MySql),
            "postgres" | "postgresql" => Ok(DbEngine::Postgres),
            other => Err(ConfigurationError::new(format!("Unsupported db_type: {}", other))),
        }
    }
}

impl fmt::Display for DbEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbEngine::MySql => write!(f, "mysql"),
            DbEngine::Postgres => write!(f, "postgres"),
        }
    }
}

/// Database source of one dataset
#[derive(Clone)]
pub struct DatabaseConfig {
    pub engine: DbEngine,
    pub connection_string: String,
    pub sql_query: String,
}

impl DatabaseConfig {
    pub fn from_params(params: &AccessParams) -> Result<Self, ConfigurationError> {
        let missing = params.missing(REQUIRED_FIELDS);
        if !missing.is_empty() {
            return Err(ConfigurationError::missing("database", &missing));
        }

        let field = |name: &str| params.get_non_empty(name).unwrap_or_default().trim().to_string();

        Ok(Self {
            engine: field("db_type").parse()?,
            connection_string: field("connection_string"),
            sql_query: field("sql_query"),
        })
    }
}

// The connection string carries credentials
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

/// Database fetch errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to {engine} database: {source}")]
    Connect {
        engine: DbEngine,
        #[source]
        source: sqlx::Error,
    },

    #[error("Query execution failed: {0}")]
    QueryExecution(#[source] sqlx::Error),

    #[error("Database export deadline exceeded")]
    DeadlineExceeded,
}

/// An open connection to a dataset's database
#[async_trait]
pub trait SqlConnection: Send {
    /// Run a statement and collect every row
    async fn fetch_rows(&mut self, sql: &str) -> Result<RowSet, sqlx::Error>;

    /// Close the connection
    async fn close(self: Box<Self>) -> Result<(), sqlx::Error>;
}

/// Opens [`SqlConnection`]s
#[async_trait]
pub trait SqlConnector: Send + Sync {
    async fn connect(
        &self,
        engine: DbEngine,
        connection_string: &str,
    ) -> Result<Box<dyn SqlConnection>, sqlx::Error>;
}

/// Connector backed by single sqlx connections
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxConnector;

#[async_trait]
impl SqlConnector for SqlxConnector {
    async fn connect(
        &self,
        engine: DbEngine,
        connection_string: &str,
    ) -> Result<Box<dyn SqlConnection>, sqlx::Error> {
        match engine {
            DbEngine::Postgres => Ok(Box::new(PgSession(
                PgConnection::connect(connection_string).await?,
            ))),
            DbEngine::MySql => Ok(Box::new(MySqlSession(
                MySqlConnection::connect(connection_string).await?,
            ))),
        }
    }
}

struct PgSession(PgConnection);

#[async_trait]
impl SqlConnection for PgSession {
    async fn fetch_rows(&mut self, sql: &str) -> Result<RowSet, sqlx::Error> {
        let rows = sqlx::query(sql).fetch_all(&mut self.0).await?;
        rows.iter().map(pg_row_to_json).collect()
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        self.0.close().await
    }
}

struct MySqlSession(MySqlConnection);

#[async_trait]
impl SqlConnection for MySqlSession {
    async fn fetch_rows(&mut self, sql: &str) -> Result<RowSet, sqlx::Error> {
        let rows = sqlx::query(sql).fetch_all(&mut self.0).await?;
        rows.iter().map(mysql_row_to_json).collect()
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        self.0.close().await
    }
}

fn pg_row_to_json(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::new();
    for column in row.columns() {
        out.insert(column.name().to_string(), pg_value_to_json(row, column)?);
    }
    Ok(out)
}

fn pg_value_to_json(row: &PgRow, column: &PgColumn) -> Result<Value, sqlx::Error> {
    let idx = column.ordinal();
    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }

    let type_name = column.type_info().name();
    let value = match type_name {
        "BOOL" => Value::Bool(row.try_get(idx)?),
        "INT2" => Value::from(row.try_get::<i16, _>(idx)?),
        "INT4" => Value::from(row.try_get::<i32, _>(idx)?),
        "INT8" => Value::from(row.try_get::<i64, _>(idx)?),
        "OID" => Value::from(row.try_get::<Oid, _>(idx)?.0),
        "FLOAT4" => Value::from(row.try_get::<f32, _>(idx)?),
        "FLOAT8" => Value::from(row.try_get::<f64, _>(idx)?),
        "NUMERIC" => Value::String(row.try_get::<sqlx::types::BigDecimal, _>(idx)?.to_string()),
        "MONEY" => Value::String(row.try_get::<PgMoney, _>(idx)?.to_bigdecimal(2).to_string()),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => Value::String(row.try_get(idx)?),
        "UUID" => Value::String(row.try_get::<uuid::Uuid, _>(idx)?.to_string()),
        "BYTEA" => Value::String(hex_bytes(&row.try_get::<Vec<u8>, _>(idx)?)),
        "TIMESTAMPTZ" => {
            let v: chrono::DateTime<chrono::Utc> = row.try_get(idx)?;
            Value::String(v.to_rfc3339())
        },
        "TIMESTAMP" => Value::String(iso_datetime(row.try_get(idx)?)),
        "DATE" => Value::String(row.try_get::<chrono::NaiveDate, _>(idx)?.to_string()),
        "TIME" => Value::String(row.try_get::<chrono::NaiveTime, _>(idx)?.to_string()),
        "TIMETZ" => {
            let v: PgTimeTz<chrono::NaiveTime, chrono::FixedOffset> = row.try_get(idx)?;
            Value::String(format!("{}{}", v.time, v.offset))
        },
        "INTERVAL" => Value::String(iso_interval(&row.try_get::<PgInterval, _>(idx)?)),
        "JSON" | "JSONB" => row.try_get(idx)?,
        "BOOL[]" => json_array(row.try_get::<Vec<Option<bool>>, _>(idx)?),
        "INT2[]" => json_array(row.try_get::<Vec<Option<i16>>, _>(idx)?),
        "INT4[]" => json_array(row.try_get::<Vec<Option<i32>>, _>(idx)?),
        "INT8[]" => json_array(row.try_get::<Vec<Option<i64>>, _>(idx)?),
        "FLOAT4[]" => json_array(row.try_get::<Vec<Option<f32>>, _>(idx)?),
        "FLOAT8[]" => json_array(row.try_get::<Vec<Option<f64>>, _>(idx)?),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            json_array(row.try_get::<Vec<Option<String>>, _>(idx)?)
        },
        "NUMERIC[]" => json_array(
            row.try_get::<Vec<Option<sqlx::types::BigDecimal>>, _>(idx)?
                .into_iter()
                .map(|v| v.map(|d| d.to_string()))
                .collect(),
        ),
        "UUID[]" => json_array(
            row.try_get::<Vec<Option<uuid::Uuid>>, _>(idx)?
                .into_iter()
                .map(|v| v.map(|u| u.to_string()))
                .collect(),
        ),
        _ => match row.try_get::<String, _>(idx) {
            Ok(text) => Value::String(text),
            Err(_) => return Err(unsupported_column(column.name(), type_name)),
        },
    };

    Ok(value)
}

fn mysql_row_to_json(row: &MySqlRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::new();
    for column in row.columns() {
        out.insert(column.name().to_string(), mysql_value_to_json(row, column)?);
    }
    Ok(out)
}

fn mysql_value_to_json(row: &MySqlRow, column: &MySqlColumn) -> Result<Value, sqlx::Error> {
    let idx = column.ordinal();
    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }

    let type_name = column.type_info().name();
    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get(idx)?),
        name if name.ends_with("UNSIGNED") => Value::from(row.try_get::<u64, _>(idx)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from(row.try_get::<i64, _>(idx)?)
        },
        "YEAR" => Value::from(row.try_get_unchecked::<u16, _>(idx)?),
        "BIT" => Value::from(bit_value(&row.try_get_unchecked::<Vec<u8>, _>(idx)?)),
        "FLOAT" => Value::from(row.try_get::<f32, _>(idx)?),
        "DOUBLE" => Value::from(row.try_get::<f64, _>(idx)?),
        "DECIMAL" => Value::String(row.try_get::<sqlx::types::BigDecimal, _>(idx)?.to_string()),
        "VARCHAR" | "CHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" => {
            Value::String(row.try_get(idx)?)
        },
        "SET" => Value::String(row.try_get_unchecked(idx)?),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            Value::String(hex_bytes(&row.try_get::<Vec<u8>, _>(idx)?))
        },
        "TIMESTAMP" => {
            let v: chrono::DateTime<chrono::Utc> = row.try_get(idx)?;
            Value::String(v.to_rfc3339())
        },
        "DATETIME" => Value::String(iso_datetime(row.try_get(idx)?)),
        "DATE" => Value::String(row.try_get::<chrono::NaiveDate, _>(idx)?.to_string()),
        "TIME" => Value::String(row.try_get::<chrono::NaiveTime, _>(idx)?.to_string()),
        "JSON" => row.try_get(idx)?,
        _ => match row.try_get::<String, _>(idx) {
            Ok(text) => Value::String(text),
            Err(_) => return Err(unsupported_column(column.name(), type_name)),
        },
    };

    Ok(value)
}

fn iso_datetime(value: chrono::NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Postgres interval as an ISO 8601 duration, e.g. `P1Y2M3DT4H5M6.5S`
fn iso_interval(interval: &PgInterval) -> String {
    let mut out = String::from("P");
    let (years, months) = (interval.months / 12, interval.months % 12);
    if years != 0 {
        out.push_str(&format!("{}Y", years));
    }
    if months != 0 {
        out.push_str(&format!("{}M", months));
    }
    if interval.days != 0 {
        out.push_str(&format!("{}D", interval.days));
    }

    if interval.microseconds != 0 {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros = interval.microseconds.unsigned_abs();
        let hours = micros / 3_600_000_000;
        let minutes = micros / 60_000_000 % 60;
        let seconds = micros / 1_000_000 % 60;
        let fraction = micros % 1_000_000;

        out.push('T');
        if hours != 0 {
            out.push_str(&format!("{}{}H", sign, hours));
        }
        if minutes != 0 {
            out.push_str(&format!("{}{}M", sign, minutes));
        }
        if seconds != 0 || fraction != 0 {
            out.push_str(&format!("{}{}", sign, seconds));
            if fraction != 0 {
                let digits = format!("{:06}", fraction);
                out.push('.');
                out.push_str(digits.trim_end_matches('0'));
            }
            out.push('S');
        }
    }

    if out == "P" {
        out.push_str("T0S");
    }
    out
}

/// Binary values in Postgres' hex output format
fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// MySQL `BIT(n)` payload, big-endian
fn bit_value(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, byte| (acc << 8) | u64::from(*byte))
}

fn json_array<T: Into<Value>>(values: Vec<T>) -> Value {
    Value::Array(values.into_iter().map(Into::into).collect())
}

fn unsupported_column(column: &str, type_name: &str) -> sqlx::Error {
    sqlx::Error::Decode(
        format!(
            "column \"{}\" has unsupported type {}; cast it to text in sql_query",
            column, type_name
        )
        .into(),
    )
}

/// Runs a dataset's stored query
#[derive(Clone)]
pub struct DatabaseConnector {
    connector: Arc<dyn SqlConnector>,
}

impl DatabaseConnector {
    pub fn new(connector: Arc<dyn SqlConnector>) -> Self {
        Self { connector }
    }

    /// Connect, run the stored query, close
    pub async fn fetch(
        &self,
        config: &DatabaseConfig,
        deadline: Instant,
    ) -> Result<RowSet, DatabaseError> {
        let engine = config.engine;
        tracing::debug!(%engine, "Opening database connection");

        let mut connection = tokio::time::timeout_at(
            deadline,
            self.connector.connect(engine, &config.connection_string),
        )
        .await
        .map_err(|_| DatabaseError::DeadlineExceeded)?
        .map_err(|source| DatabaseError::Connect { engine, source })?;

        let result =
            match tokio::time::timeout_at(deadline, connection.fetch_rows(&config.sql_query)).await
            {
                Ok(Ok(rows)) => Ok(rows),
                Ok(Err(e)) => Err(DatabaseError::QueryExecution(e)),
                Err(_) => Err(DatabaseError::DeadlineExceeded),
            };

        match tokio::time::timeout(CLOSE_TIMEOUT, connection.close()).await {
            Ok(Ok(())) => tracing::debug!(%engine, "Database connection closed"),
            Ok(Err(e)) => tracing::warn!(%engine, "Failed to close database connection: {}", e),
            Err(_) => tracing::warn!(%engine, "Timed out closing database connection"),
        }

        if let Ok(rows) = &result {
            tracing::info!(%engine, rows = rows.len(), "Database fetch complete");
        }
        result
    }
}

impl Default for DatabaseConnector {
    fn default() -> Self {
        Self::new(Arc::new(SqlxConnector))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// What the fake connection does when queried
    #[derive(Clone)]
    pub enum QueryBehavior {
        Rows(RowSet),
        Fail,
        Hang,
    }

    /// Connector whose connections count how often they are closed
    #[derive(Clone)]
    pub struct FakeSqlConnector {
        pub behavior: QueryBehavior,
        pub fail_connect: bool,
        pub closes: Arc<AtomicUsize>,
        pub queries: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl FakeSqlConnector {
        pub fn new(behavior: QueryBehavior) -> Self {
            Self {
                behavior,
                fail_connect: false,
                closes: Arc::new(AtomicUsize::new(0)),
                queries: Arc::default(),
            }
        }

        pub fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    struct FakeConnection {
        behavior: QueryBehavior,
        closes: Arc<AtomicUsize>,
        queries: Arc<std::sync::Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SqlConnector for FakeSqlConnector {
        async fn connect(
            &self,
            _engine: DbEngine,
            _connection_string: &str,
        ) -> Result<Box<dyn SqlConnection>, sqlx::Error> {
            if self.fail_connect {
                return Err(sqlx::Error::Protocol("connection refused".to_string()));
            }
            Ok(Box::new(FakeConnection {
                behavior: self.behavior.clone(),
                closes: self.closes.clone(),
                queries: self.queries.clone(),
            }))
        }
    }

    #[async_trait]
    impl SqlConnection for FakeConnection {
        async fn fetch_rows(&mut self, sql: &str) -> Result<RowSet, sqlx::Error> {
            self.queries.lock().unwrap().push(sql.to_string());
            match &self.behavior {
                QueryBehavior::Rows(rows) => Ok(rows.clone()),
                QueryBehavior::Fail => {
                    Err(sqlx::Error::Protocol("relation \"missing\" does not exist".to_string()))
                },
                QueryBehavior::Hang => std::future::pending().await,
            }
        }

        async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FakeSqlConnector, QueryBehavior};
    use super::*;
    use serde_json::json;

    fn config(engine: DbEngine) -> DatabaseConfig {
        DatabaseConfig {
            engine,
            connection_string: "postgres://reader:secret@db/fleet".to_string(),
            sql_query: "SELECT id, name FROM vehicles".to_string(),
        }
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[test]
    fn test_engine_parse() {
        assert_eq!("mysql".parse::<DbEngine>().unwrap(), DbEngine::MySql);
        assert_eq!("postgres".parse::<DbEngine>().unwrap(), DbEngine::Postgres);
        assert_eq!("PostgreSQL".parse::<DbEngine>().unwrap(), DbEngine::Postgres);
        let err = "oracle".parse::<DbEngine>().unwrap_err();
        assert_eq!(err.message(), "Unsupported db_type: oracle");
    }

    #[test]
    fn test_from_params_reports_all_missing() {
        let params: AccessParams = [("db_type", "mysql")].into_iter().collect();
        let err = DatabaseConfig::from_params(&params).unwrap_err();
        assert!(err.message().contains("connection_string"));
        assert!(err.message().contains("sql_query"));
    }

    #[test]
    fn test_debug_hides_connection_string() {
        let printed = format!("{:?}", config(DbEngine::Postgres));
        assert!(!printed.contains("secret"));
    }

    #[tokio::test]
    async fn test_rows_returned_and_connection_closed() {
        let rows = RowSet::from_json(json!([{"id": 1, "name": "bus"}])).unwrap();
        let fake = FakeSqlConnector::new(QueryBehavior::Rows(rows));
        let connector = DatabaseConnector::new(Arc::new(fake.clone()));

        let result = connector.fetch(&config(DbEngine::Postgres), deadline()).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(fake.close_count(), 1);
        assert_eq!(
            fake.queries.lock().unwrap().as_slice(),
            ["SELECT id, name FROM vehicles"]
        );
    }

    #[tokio::test]
    async fn test_query_failure_closes_once() {
        let fake = FakeSqlConnector::new(QueryBehavior::Fail);
        let connector = DatabaseConnector::new(Arc::new(fake.clone()));

        let err = connector.fetch(&config(DbEngine::MySql), deadline()).await.unwrap_err();

        assert!(matches!(err, DatabaseError::QueryExecution(_)));
        assert_eq!(fake.close_count(), 1);
    }

    #[tokio::test]
    async fn test_deadline_closes_once() {
        let fake = FakeSqlConnector::new(QueryBehavior::Hang);
        let connector = DatabaseConnector::new(Arc::new(fake.clone()));

        let err = connector
            .fetch(&config(DbEngine::Postgres), Instant::now() + Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, DatabaseError::DeadlineExceeded));
        assert_eq!(fake.close_count(), 1);
    }

    #[test]
    fn test_iso_interval() {
        let interval = |months, days, microseconds| PgInterval {
            months,
            days,
            microseconds,
        };
        assert_eq!(iso_interval(&interval(14, 3, 3_723_500_000)), "P1Y2M3DT1H2M3.5S");
        assert_eq!(iso_interval(&interval(0, -1, 0)), "P-1D");
        assert_eq!(iso_interval(&interval(0, 0, -90_000_000)), "PT-1M-30S");
        assert_eq!(iso_interval(&interval(0, 0, 0)), "PT0S");
    }

    #[test]
    fn test_binary_helpers() {
        assert_eq!(hex_bytes(&[0xde, 0xad, 0x01]), "\\xdead01");
        assert_eq!(hex_bytes(&[]), "\\x");
        assert_eq!(bit_value(&[0x01, 0x02]), 258);
        assert_eq!(bit_value(&[0x05]), 5);
    }

    #[test]
    fn test_unsupported_column_names_column() {
        let err = unsupported_column("addr", "INET");
        assert!(err.to_string().contains("\"addr\""));
        assert!(err.to_string().contains("INET"));
    }

    #[sqlx::test(migrations = false)]
    async fn test_postgres_values_to_json(pool: sqlx::PgPool) {
        let row = sqlx::query(
            r#"
            SELECT
                ARRAY[1, NULL, 3]::int4[] AS ints,
                ARRAY['a', 'b']::text[] AS tags,
                INTERVAL '1 year 2 months 3 days 01:02:03.5' AS span,
                42::oid AS oid,
                12.34::numeric::money AS price,
                '\xdead01'::bytea AS raw,
                '10:30:00+02'::timetz AS at,
                '2025-01-02 03:04:05'::timestamp AS seen,
                NULL::int4 AS nothing
            "#,
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        let out = pg_row_to_json(&row).unwrap();

        assert_eq!(out.get("ints"), Some(&json!([1, null, 3])));
        assert_eq!(out.get("tags"), Some(&json!(["a", "b"])));
        assert_eq!(out.get("span"), Some(&json!("P1Y2M3DT1H2M3.5S")));
        assert_eq!(out.get("oid"), Some(&json!(42)));
        assert_eq!(out.get("price"), Some(&json!("12.34")));
        assert_eq!(out.get("raw"), Some(&json!("\\xdead01")));
        assert_eq!(out.get("at"), Some(&json!("10:30:00+02:00")));
        assert_eq!(out.get("seen"), Some(&json!("2025-01-02T03:04:05")));
        assert_eq!(out.get("nothing"), Some(&Value::Null));
    }

    #[sqlx::test(migrations = false)]
    async fn test_postgres_unsupported_type_fails_query(pool: sqlx::PgPool) {
        let row = sqlx::query("SELECT '127.0.0.1'::inet AS addr")
            .fetch_one(&pool)
            .await
            .unwrap();

        let err = pg_row_to_json(&row).unwrap_err();

        assert!(err.to_string().contains("addr"));
    }

    #[tokio::test]
    async fn test_connect_failure_has_nothing_to_close() {
        let mut fake = FakeSqlConnector::new(QueryBehavior::Fail);
        fake.fail_connect = true;
        let connector = DatabaseConnector::new(Arc::new(fake.clone()));

        let err = connector.fetch(&config(DbEngine::Postgres), deadline()).await.unwrap_err();

        assert!(matches!(err, DatabaseError::Connect { engine: DbEngine::Postgres, .. }));
        assert_eq!(fake.close_count(), 0);
    }
}
