//! In-memory backend for tests
//!
//! Replays a fixed [`Script`] and records every call in a shared journal so
//! tests can assert on transaction handling and connection release.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use super::{BackendError, ConnectionSource, RawRow, Session};
use crate::value::RawValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Acquire,
    Begin,
    Query(String),
    Describe,
    Commit,
    Rollback,
    Abort,
    Release,
}

/// What the scripted database answers
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
    /// Columns reported by metadata; `None` makes `columns_of` fail
    pub described: Option<Vec<String>>,
    pub fail_acquire: Option<String>,
    pub fail_begin: Option<String>,
    pub fail_query: Option<String>,
    /// Fail after this many rows have been streamed
    pub fail_at_row: Option<(usize, BackendError)>,
    pub fail_commit: Option<String>,
    pub fail_rollback: Option<String>,
    /// Stall before the first row
    pub delay: Option<Duration>,
}

impl Script {
    pub fn rows(columns: &[&str], rows: Vec<Vec<RawValue>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            ..Default::default()
        }
    }
}

pub type Journal = Arc<Mutex<Vec<Event>>>;

#[derive(Clone)]
pub struct ScriptedSource {
    script: Script,
    journal: Journal,
}

impl ScriptedSource {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            journal: Arc::default(),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.journal.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, event: Event) {
        record(&self.journal, event);
    }
}

fn record(journal: &Journal, event: Event) {
    if let Ok(mut events) = journal.lock() {
        events.push(event);
    }
}

#[async_trait]
impl ConnectionSource for ScriptedSource {
    type Session = ScriptedSession;

    async fn acquire(&self) -> Result<ScriptedSession, BackendError> {
        self.record(Event::Acquire);
        if let Some(message) = &self.script.fail_acquire {
            return Err(BackendError::Database(message.clone()));
        }
        Ok(ScriptedSession {
            script: self.script.clone(),
            journal: self.journal.clone(),
        })
    }

    async fn abort(&self, session: ScriptedSession) {
        self.record(Event::Abort);
        drop(session);
    }
}

pub struct ScriptedSession {
    script: Script,
    journal: Journal,
}

impl ScriptedSession {
    fn record(&self, event: Event) {
        record(&self.journal, event);
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.record(Event::Release);
    }
}

fn failure(message: &Option<String>) -> Result<(), BackendError> {
    match message {
        Some(m) => Err(BackendError::Database(m.clone())),
        None => Ok(()),
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn begin_read_only(&mut self) -> Result<(), BackendError> {
        self.record(Event::Begin);
        failure(&self.script.fail_begin)
    }

    fn query<'a>(&'a mut self, sql: &'a str) -> BoxStream<'a, Result<RawRow, BackendError>> {
        self.record(Event::Query(sql.to_string()));

        let items: Vec<Result<RawRow, BackendError>> = match &self.script.fail_query {
            Some(message) => vec![Err(BackendError::Database(message.clone()))],
            None => {
                let columns = self.script.columns.clone();
                let mut items: Vec<_> = self
                    .script
                    .rows
                    .iter()
                    .map(|values| {
                        Ok(RawRow {
                            columns: columns.clone(),
                            values: values.clone(),
                        })
                    })
                    .collect();
                if let Some((at, err)) = &self.script.fail_at_row {
                    items.truncate(*at);
                    items.push(Err(err.clone()));
                }
                items
            }
        };

        let delay = self.script.delay;
        let stall = stream::once(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
        })
        .filter_map(|()| async { None::<Result<RawRow, BackendError>> });

        stall.chain(stream::iter(items)).boxed()
    }

    async fn columns_of(&mut self, _sql: &str) -> Result<Vec<String>, BackendError> {
        self.record(Event::Describe);
        self.script
            .described
            .clone()
            .ok_or_else(|| BackendError::Database("cannot describe statement".to_string()))
    }

    async fn commit(&mut self) -> Result<(), BackendError> {
        self.record(Event::Commit);
        failure(&self.script.fail_commit)
    }

    async fn rollback(&mut self) -> Result<(), BackendError> {
        self.record(Event::Rollback);
        failure(&self.script.fail_rollback)
    }
}
