//! sqlx MySQL backend
//!
//! Statements go over the text protocol (`raw_sql`) so SHOW and DESCRIBE
//! work the same as SELECT.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use sqlx::mysql::{MySql, MySqlConnection, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{Column, Connection, Executor, Row, TypeInfo, ValueRef};
use tracing::{debug, warn};

use super::{BackendError, ConnectionSource, RawRow, Session};
use crate::config::{ConfigError, MysqlConfig};
use crate::dsn;
use crate::value::RawValue;

const KILL_TIMEOUT: Duration = Duration::from_secs(2);

/// Pool-backed [`ConnectionSource`]
#[derive(Clone)]
pub struct MySqlSource {
    pool: MySqlPool,
}

impl MySqlSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Build a lazily connecting pool from configuration
    pub fn connect_lazy(config: &MysqlConfig) -> Result<Self, ConfigError> {
        let options = dsn::connect_options(&config.dsn)?;

        if config.max_idle_conns > 0 {
            debug!(
                "max_idle_conns = {} has no pool equivalent and is ignored",
                config.max_idle_conns
            );
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections())
            .max_lifetime(config.max_lifetime())
            .idle_timeout(config.idle_timeout())
            .connect_lazy_with(options);

        Ok(Self::new(pool))
    }

    /// Verify the server is reachable within `timeout`
    pub async fn ping(&self, timeout: Duration) -> Result<(), BackendError> {
        let check = async {
            let mut conn = self.pool.acquire().await?;
            conn.ping().await?;
            Ok::<_, BackendError>(())
        };

        tokio::time::timeout(timeout, check)
            .await
            .map_err(|_| BackendError::Database(format!("ping timed out after {:?}", timeout)))?
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn kill_query(&self, connection_id: u64) -> Result<(), BackendError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("KILL QUERY {}", connection_id);
        let conn: &mut MySqlConnection = &mut conn;
        conn.execute(sqlx::raw_sql(&sql)).await?;
        Ok(())
    }
}

#[async_trait]
impl ConnectionSource for MySqlSource {
    type Session = MySqlSession;

    async fn acquire(&self) -> Result<MySqlSession, BackendError> {
        let mut conn = self.pool.acquire().await?;
        let connection_id: u64 = sqlx::query_scalar("SELECT CONNECTION_ID()")
            .fetch_one(&mut *conn)
            .await?;

        Ok(MySqlSession {
            conn: Some(conn),
            connection_id,
            in_transaction: false,
        })
    }

    async fn abort(&self, mut session: MySqlSession) {
        let id = session.connection_id;
        match tokio::time::timeout(KILL_TIMEOUT, self.kill_query(id)).await {
            Ok(Ok(())) => debug!("Killed query on connection {}", id),
            Ok(Err(e)) => warn!("Failed to kill query on connection {}: {}", id, e),
            Err(_) => warn!("Timed out killing query on connection {}", id),
        }

        // Never return a possibly busy connection to the pool
        if let Some(conn) = session.conn.take() {
            drop(conn.detach());
        }
    }
}

/// Dedicated pooled connection for one request
///
/// Dropped while a transaction is still open, the connection is detached
/// from the pool and closed instead of being reused.
pub struct MySqlSession {
    conn: Option<PoolConnection<MySql>>,
    connection_id: u64,
    in_transaction: bool,
}

impl MySqlSession {
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    fn conn(&mut self) -> Result<&mut PoolConnection<MySql>, BackendError> {
        self.conn
            .as_mut()
            .ok_or_else(|| BackendError::Database("connection already released".to_string()))
    }

    async fn run(&mut self, sql: &str) -> Result<(), BackendError> {
        let conn: &mut MySqlConnection = self.conn()?;
        conn.execute(sqlx::raw_sql(sql)).await?;
        Ok(())
    }
}

impl Drop for MySqlSession {
    fn drop(&mut self) {
        if self.in_transaction {
            if let Some(conn) = self.conn.take() {
                warn!(
                    "Discarding connection {} with an open transaction",
                    self.connection_id
                );
                drop(conn.detach());
            }
        }
    }
}

#[async_trait]
impl Session for MySqlSession {
    async fn begin_read_only(&mut self) -> Result<(), BackendError> {
        // Set first so a failed BEGIN still discards the connection
        self.in_transaction = true;
        self.run("START TRANSACTION READ ONLY").await
    }

    fn query<'a>(&'a mut self, sql: &'a str) -> BoxStream<'a, Result<RawRow, BackendError>> {
        match self.conn.as_mut() {
            Some(conn) => sqlx::raw_sql(sql)
                .fetch(&mut **conn)
                .map(|row| row.map_err(BackendError::from).and_then(|r| decode_row(&r)))
                .boxed(),
            None => futures::stream::once(async {
                Err(BackendError::Database(
                    "connection already released".to_string(),
                ))
            })
            .boxed(),
        }
    }

    async fn columns_of(&mut self, sql: &str) -> Result<Vec<String>, BackendError> {
        let conn = self.conn()?;
        let described = (&mut **conn).describe(sql).await?;
        Ok(described
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect())
    }

    async fn commit(&mut self) -> Result<(), BackendError> {
        self.run("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), BackendError> {
        self.run("ROLLBACK").await?;
        self.in_transaction = false;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    Int,
    UInt,
    Float,
    Timestamp,
    Bytes,
}

fn kind_of(type_name: &str) -> Kind {
    if type_name.ends_with(" UNSIGNED") {
        return Kind::UInt;
    }
    match type_name {
        "BOOLEAN" => Kind::Bool,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => Kind::Int,
        "FLOAT" | "DOUBLE" => Kind::Float,
        "DATETIME" | "TIMESTAMP" => Kind::Timestamp,
        _ => Kind::Bytes,
    }
}

fn decode_row(row: &MySqlRow) -> Result<RawRow, BackendError> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        columns.push(column.name().to_string());
        values.push(decode_value(row, index, column.name(), kind_of(column.type_info().name()))?);
    }

    Ok(RawRow { columns, values })
}

fn decode_value(
    row: &MySqlRow,
    index: usize,
    name: &str,
    kind: Kind,
) -> Result<RawValue, BackendError> {
    let is_null = row
        .try_get_raw(index)
        .map(|raw| raw.is_null())
        .map_err(|e| decode_error(name, e))?;
    if is_null {
        return Ok(RawValue::Null);
    }

    let typed = match kind {
        Kind::Bool => row.try_get_unchecked::<bool, _>(index).ok().map(RawValue::Bool),
        Kind::Int => row.try_get_unchecked::<i64, _>(index).ok().map(RawValue::Int),
        Kind::UInt => row.try_get_unchecked::<u64, _>(index).ok().map(RawValue::UInt),
        Kind::Float => row.try_get_unchecked::<f64, _>(index).ok().map(RawValue::Float),
        Kind::Timestamp => row
            .try_get_unchecked::<chrono::NaiveDateTime, _>(index)
            .ok()
            .map(|ts| RawValue::Timestamp(ts.and_utc())),
        Kind::Bytes => None,
    };

    match typed {
        Some(value) => Ok(value),
        // Zero dates, DECIMAL, JSON, BLOB and the rest
        None => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(RawValue::Bytes)
            .map_err(|e| decode_error(name, e)),
    }
}

fn decode_error(column: &str, err: sqlx::Error) -> BackendError {
    BackendError::Decode {
        column: column.to_string(),
        message: err.to_string(),
    }
}
