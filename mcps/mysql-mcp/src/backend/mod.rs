//! Database backend abstraction
//!
//! The executor only talks to [`ConnectionSource`] and [`Session`]; the sqlx
//! MySQL pool implements them in [`mysql`].

pub mod mysql;

#[cfg(test)]
pub mod scripted;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::value::RawValue;

pub use mysql::{MySqlSession, MySqlSource};

/// Errors reported by a backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("{0}")]
    Database(String),

    #[error("cannot decode column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl BackendError {
    pub fn is_decode(&self) -> bool {
        matches!(self, BackendError::Decode { .. })
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => BackendError::Database(db.to_string()),
            other => BackendError::Database(other.to_string()),
        }
    }
}

/// One decoded result row
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub columns: Vec<String>,
    pub values: Vec<RawValue>,
}

/// Hands out dedicated sessions, one per request
#[async_trait]
pub trait ConnectionSource: Send + Sync + 'static {
    type Session: Session;

    async fn acquire(&self) -> Result<Self::Session, BackendError>;

    /// Cancel whatever `session` is running and discard it
    ///
    /// The session must not go back to the pool afterwards.
    async fn abort(&self, session: Self::Session);
}

/// A single connection with at most one open transaction
#[async_trait]
pub trait Session: Send {
    /// Open a transaction in which writes fail at the engine
    async fn begin_read_only(&mut self) -> Result<(), BackendError>;

    /// Run `sql` and stream its rows
    fn query<'a>(&'a mut self, sql: &'a str) -> BoxStream<'a, Result<RawRow, BackendError>>;

    /// Column names from statement metadata, for results without rows
    async fn columns_of(&mut self, sql: &str) -> Result<Vec<String>, BackendError>;

    async fn commit(&mut self) -> Result<(), BackendError>;

    async fn rollback(&mut self) -> Result<(), BackendError>;
}
