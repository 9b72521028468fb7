//! Bounded query executor
//!
//! Runs one admitted statement on a dedicated session inside a read-only
//! transaction, under a single deadline and a row cap.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::TryStreamExt;
use tokio::time::timeout_at;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, ConnectionSource, Session};
use crate::classifier::StatementClassifier;
use crate::config::{DEFAULT_MAX_ROWS, DEFAULT_QUERY_TIMEOUT};
use crate::types::{ExecError, QueryOutput};
use crate::value::normalize;

/// Per-request limits, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub timeout: Duration,
    pub max_rows: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_QUERY_TIMEOUT,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

pub struct Executor<S: ConnectionSource> {
    source: S,
    classifier: Arc<StatementClassifier>,
    limits: ExecutionLimits,
}

impl<S: ConnectionSource> Executor<S> {
    pub fn new(source: S, classifier: Arc<StatementClassifier>, limits: ExecutionLimits) -> Self {
        Self {
            source,
            classifier,
            limits,
        }
    }

    pub fn classifier(&self) -> &StatementClassifier {
        &self.classifier
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Execute `text` and return at most `max_rows` normalized rows
    ///
    /// The text is always re-checked here, whatever the caller already did.
    pub async fn execute(&self, text: &str) -> Result<QueryOutput, ExecError> {
        if let Err(reason) = self.classifier.classify(text) {
            info!("Rejected query: {}", reason);
            return Err(ExecError::Rejected);
        }

        debug!(query = %text, "Executing query");
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.limits.timeout;

        let mut session = match timeout_at(deadline, self.source.acquire()).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                warn!("Failed to acquire connection: {}", e);
                return Err(ExecError::Acquire(e.to_string()));
            }
            Err(_) => {
                warn!("Timed out acquiring a connection");
                return Err(self.timed_out());
            }
        };

        match timeout_at(deadline, self.run_in_transaction(&mut session, text)).await {
            Ok(Ok(output)) => {
                debug!(
                    rows = output.row_count,
                    truncated = output.truncated,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Query completed"
                );
                Ok(output)
            }
            Ok(Err(e)) => {
                warn!("Query failed: {}", e);
                Err(e)
            }
            Err(_) => {
                warn!(
                    "Query exceeded {}s, cancelling",
                    self.limits.timeout.as_secs()
                );
                self.source.abort(session).await;
                Err(self.timed_out())
            }
        }
    }

    fn timed_out(&self) -> ExecError {
        ExecError::Timeout(self.limits.timeout.as_secs())
    }

    async fn run_in_transaction(
        &self,
        session: &mut S::Session,
        text: &str,
    ) -> Result<QueryOutput, ExecError> {
        session
            .begin_read_only()
            .await
            .map_err(|e| ExecError::Begin(e.to_string()))?;

        match self.read_rows(session, text).await {
            Ok(output) => {
                session
                    .commit()
                    .await
                    .map_err(|e| ExecError::Commit(e.to_string()))?;
                Ok(output)
            }
            Err(err) => {
                if let Err(e) = session.rollback().await {
                    warn!("Rollback failed: {}", e);
                }
                Err(err)
            }
        }
    }

    async fn read_rows(
        &self,
        session: &mut S::Session,
        text: &str,
    ) -> Result<QueryOutput, ExecError> {
        let max_rows = self.limits.max_rows;
        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        let mut truncated = false;

        {
            let mut stream = session.query(text);
            loop {
                match stream.try_next().await {
                    Ok(Some(row)) => {
                        if columns.is_none() {
                            columns = Some(row.columns);
                        }
                        if rows.len() >= max_rows {
                            truncated = true;
                            break;
                        }
                        rows.push(row.values.into_iter().map(normalize).collect());
                    }
                    Ok(None) => break,
                    Err(e) => return Err(stream_error(e, columns.is_some())),
                }
            }
        }

        let columns = match columns {
            Some(columns) => columns,
            None => session.columns_of(text).await.unwrap_or_else(|e| {
                debug!("No column metadata for empty result: {}", e);
                Vec::new()
            }),
        };

        Ok(QueryOutput::new(columns, rows, truncated))
    }
}

/// A failure before any row is a query error, afterwards a scan error
fn stream_error(err: BackendError, started: bool) -> ExecError {
    if started || err.is_decode() {
        ExecError::Scan(err.to_string())
    } else {
        ExecError::Query(err.to_string())
    }
}
