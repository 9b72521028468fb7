//! Statement classifier - admission layer for query text
//!
//! Decides whether caller-supplied SQL may reach the executor. Cheap textual
//! checks run first, then the text is parsed with the MySQL grammar and only
//! read-shaped statements are admitted.

use std::ops::ControlFlow;

use sqlparser::ast::{Query, SetExpr, SetOperator, Statement, Visit, Visitor};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use thiserror::Error;

/// Immutable admission settings built once from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionPolicy {
    allowed_prefixes: Vec<String>,
    deny_substrings: Vec<String>,
}

impl AdmissionPolicy {
    /// Both lists are expected to be normalized already (trimmed, lower-case)
    pub fn new(allowed_prefixes: Vec<String>, deny_substrings: Vec<String>) -> Self {
        Self {
            allowed_prefixes,
            deny_substrings,
        }
    }

    /// Allowed statement kinds as configured; reported, not enforced
    pub fn allowed_prefixes(&self) -> &[String] {
        &self.allowed_prefixes
    }

    pub fn deny_substrings(&self) -> &[String] {
        &self.deny_substrings
    }
}

/// Kind of an admitted statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Show,
    Explain,
    Describe,
}

/// Reason a statement was not admitted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("empty query")]
    Empty,

    #[error("multiple statements are not allowed")]
    MultiStatement,

    #[error("query contains denied fragment '{0}'")]
    DeniedSubstring(String),

    #[error("query could not be parsed: {0}")]
    Parse(String),

    #[error("expected exactly one statement, found {0}")]
    StatementCount(usize),

    #[error("statement is not read-only")]
    NotReadOnly,

    #[error("SELECT ... INTO is not allowed")]
    SelectInto,

    #[error("locking clauses are not allowed")]
    LockingClause,

    #[error("only SELECT and UNION query bodies are allowed")]
    UnsupportedBody,
}

/// Pure classifier over an [`AdmissionPolicy`]
#[derive(Debug, Clone, Default)]
pub struct StatementClassifier {
    policy: AdmissionPolicy,
}

impl StatementClassifier {
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    /// True when `text` may be executed
    pub fn is_admitted(&self, text: &str) -> bool {
        self.classify(text).is_ok()
    }

    /// Classify `text`, reporting why it was rejected
    pub fn classify(&self, text: &str) -> Result<StatementKind, Rejection> {
        let trimmed = text.trim();
        let normalized = trimmed.to_lowercase();
        if normalized.is_empty() {
            return Err(Rejection::Empty);
        }

        // Any semicolon, trailing ones included
        if normalized.contains(';') {
            return Err(Rejection::MultiStatement);
        }

        if let Some(fragment) = self
            .policy
            .deny_substrings
            .iter()
            .filter(|f| !f.is_empty())
            .find(|f| normalized.contains(f.as_str()))
        {
            return Err(Rejection::DeniedSubstring(fragment.clone()));
        }

        let statements = Parser::parse_sql(&MySqlDialect {}, trimmed)
            .map_err(|e| Rejection::Parse(e.to_string()))?;

        match statements.as_slice() {
            [statement] => classify_statement(statement),
            other => Err(Rejection::StatementCount(other.len())),
        }
    }
}

/// Check `text` against the default statement kinds and the given deny list
pub fn is_read_only_query(text: &str, deny_substrings: &[String]) -> bool {
    StatementClassifier::new(AdmissionPolicy::new(Vec::new(), deny_substrings.to_vec()))
        .is_admitted(text)
}

fn classify_statement(statement: &Statement) -> Result<StatementKind, Rejection> {
    match statement {
        Statement::Query(query) => {
            check_query(query)?;
            Ok(StatementKind::Select)
        }
        Statement::Explain {
            analyze, statement, ..
        } => {
            // EXPLAIN ANALYZE runs its operand
            if *analyze {
                classify_statement(statement)?;
            }
            Ok(StatementKind::Explain)
        }
        Statement::ExplainTable { .. } => Ok(StatementKind::Describe),
        Statement::ShowVariable { .. }
        | Statement::ShowVariables { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowDatabases { .. }
        | Statement::ShowSchemas { .. }
        | Statement::ShowViews { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowCollation { .. }
        | Statement::ShowCharset(..)
        | Statement::ShowObjects(..) => Ok(StatementKind::Show),
        _ => Err(Rejection::NotReadOnly),
    }
}

fn check_query(query: &Query) -> Result<(), Rejection> {
    check_shape(query)?;
    match query.visit(&mut NestedQueryCheck) {
        ControlFlow::Break(rejection) => Err(rejection),
        ControlFlow::Continue(()) => Ok(()),
    }
}

/// Body shape of the top-level query and its CTEs
fn check_shape(query: &Query) -> Result<(), Rejection> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            check_shape(&cte.query)?;
        }
    }
    check_body(&query.body)
}

fn check_body(body: &SetExpr) -> Result<(), Rejection> {
    match body {
        SetExpr::Select(_) => Ok(()),
        SetExpr::Query(query) => check_shape(query),
        SetExpr::SetOperation {
            op: SetOperator::Union,
            left,
            right,
            ..
        } => {
            check_body(left)?;
            check_body(right)
        }
        _ => Err(Rejection::UnsupportedBody),
    }
}

/// Visits every query in the tree: CTEs, derived tables and subqueries
struct NestedQueryCheck;

impl Visitor for NestedQueryCheck {
    type Break = Rejection;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Rejection> {
        if !query.locks.is_empty() {
            return ControlFlow::Break(Rejection::LockingClause);
        }
        if selects_into(&query.body) {
            return ControlFlow::Break(Rejection::SelectInto);
        }
        ControlFlow::Continue(())
    }
}

fn selects_into(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.into.is_some(),
        SetExpr::SetOperation { left, right, .. } => selects_into(left) || selects_into(right),
        // Nested queries get their own visit
        _ => false,
    }
}
