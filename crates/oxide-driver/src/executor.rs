//! Query executor shim.
//!
//! [`QueryExecutor`] renders SQL through a [`Grammar`], sends it through a
//! [`Connection`] and reshapes what comes back. Every statement is timed and
//! recorded in an in-memory history, and registered post-execution hooks
//! see each record in registration order.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::connection::{Connection, QueryResult, ResultSet};
use crate::dialect::Feature;
use crate::error::{DriverError, Result};
use crate::escape::bracket_escape;
use crate::grammar::{Grammar, SelectDescriptor, TableFieldDescriptor};
use crate::value::{AssocRow, SqlValue};

/// One executed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// The SQL that was sent.
    pub sql: String,
    /// When execution started.
    pub executed_at: DateTime<Utc>,
    /// Wall-clock execution time.
    pub duration: Duration,
    /// Rows affected, for statements without a result set.
    pub affected: Option<u64>,
    /// Connection error text, if the statement failed.
    pub error: Option<String>,
}

impl QueryRecord {
    /// Returns true if the statement succeeded.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Callback invoked after every executed statement.
pub type PostExecutionHook = Box<dyn FnMut(&QueryRecord)>;

/// Sends grammar output to a connection.
pub struct QueryExecutor<C: Connection> {
    grammar: Grammar,
    connection: C,
    history: Vec<QueryRecord>,
    hooks: Vec<PostExecutionHook>,
}

impl<C: Connection> fmt::Debug for QueryExecutor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("grammar", &self.grammar)
            .field("history", &self.history.len())
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl<C: Connection> QueryExecutor<C> {
    /// Creates an executor.
    ///
    /// The session's server version is filled from the connection when the
    /// grammar does not carry one.
    pub fn new(mut grammar: Grammar, connection: C) -> Self {
        if grammar.session().server_info.is_empty() {
            grammar.session_mut().server_info = connection.server_info();
        }
        Self {
            grammar,
            connection,
            history: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Returns the grammar.
    #[must_use]
    pub const fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Returns the grammar for modification.
    pub fn grammar_mut(&mut self) -> &mut Grammar {
        &mut self.grammar
    }

    /// Returns the connection.
    #[must_use]
    pub const fn connection(&self) -> &C {
        &self.connection
    }

    /// Returns the connection for direct use.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Consumes the executor, returning the connection.
    pub fn into_connection(self) -> C {
        self.connection
    }

    /// Registers a hook run after every statement.
    pub fn on_executed(&mut self, hook: impl FnMut(&QueryRecord) + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Returns the executed statements, oldest first.
    #[must_use]
    pub fn history(&self) -> &[QueryRecord] {
        &self.history
    }

    /// Drains the history.
    pub fn take_history(&mut self) -> Vec<QueryRecord> {
        std::mem::take(&mut self.history)
    }

    /// Builds a WHERE body from `column = value` pairs and NULL columns.
    ///
    /// Keys arrive bracket-escaped (as they travel through form field names)
    /// and may wrap the column in a function. `fields` supplies column types
    /// where known.
    #[must_use]
    pub fn where_clause(
        &self,
        filter: &[(String, String)],
        nulls: &[String],
        fields: &[TableFieldDescriptor],
    ) -> String {
        let dialect = self.grammar.dialect();
        let mut clauses = Vec::with_capacity(filter.len() + nulls.len());

        for (key, value) in filter {
            let key = bracket_escape(key, true);
            let column = self.grammar.escape_key(&key);
            let name = self.grammar.unescape_id(&key);
            let field = fields.iter().find(|field| field.name == name);
            let field_type = field.map_or("", |field| field.field_type.as_str());
            let quoted = self.connection.quote(value);

            let comparison = if dialect.supports(Feature::JsonCast) && field_type == "json" {
                format!(" = CAST({quoted} AS JSON)")
            } else if dialect.supports(Feature::DecimalLike) && is_decimal(value) {
                format!(" LIKE {quoted}")
            } else if dialect.supports(Feature::BracketLike) && !field_type.contains("datetime") {
                format!(" LIKE {}", self.connection.quote(&bracket_wildcards(value)))
            } else {
                format!(" = {}", dialect.unconvert_field(field, quoted.clone()))
            };
            clauses.push(format!("{column}{comparison}"));

            if dialect.supports(Feature::BinaryCollation)
                && (field_type.contains("char") || field_type.contains("text"))
                && value.chars().any(|c| !(' '..='~').contains(&c))
            {
                clauses.push(format!(
                    "{column} = {quoted} COLLATE {}_bin",
                    self.grammar.session().charset()
                ));
            }
        }

        for key in nulls {
            clauses.push(format!(
                "{} IS NULL",
                self.grammar.escape_key(&bracket_escape(key, true))
            ));
        }

        clauses.join(" AND ")
    }

    /// Runs one statement, recording it in the history.
    pub fn query(&mut self, sql: &str) -> QueryResult<C::Rows> {
        debug!(sql = %sql, "Executing SQL");
        let executed_at = Utc::now();
        let started = Instant::now();
        let result = self.connection.query(sql);
        let duration = started.elapsed();

        let (affected, error) = match &result {
            QueryResult::Rows(_) => (None, None),
            QueryResult::Affected(count) => (Some(*count), None),
            QueryResult::Failed => (None, Some(self.connection.error())),
        };
        if let Some(error) = &error {
            warn!(sql = %sql, error = %error, "Statement failed");
        }

        let record = QueryRecord {
            sql: sql.to_string(),
            executed_at,
            duration,
            affected,
            error,
        };
        for hook in &mut self.hooks {
            hook(&record);
        }
        self.history.push(record);
        result
    }

    /// Runs `sql` rewritten to abort after `timeout` where the dialect
    /// supports it.
    pub fn query_with_timeout(&mut self, sql: &str, timeout: Duration) -> QueryResult<C::Rows> {
        let rewritten = self.grammar.slow_query(sql, timeout);
        self.query(rewritten.as_deref().unwrap_or(sql))
    }

    /// Executes `sql`, or uses `failed` as the outcome when `execute` is
    /// false, and turns a failure into [`DriverError::Execution`].
    pub fn execute_query(&mut self, sql: &str, execute: bool, failed: bool) -> Result<()> {
        let failed = if execute {
            !self.query(sql).is_ok()
        } else {
            failed
        };
        if failed {
            return Err(DriverError::execution(self.connection.error(), sql));
        }
        Ok(())
    }

    /// Takes the current result of a multi-result statement.
    pub fn store_result(&mut self) -> Option<QueryResult<C::Rows>> {
        self.connection.store_result()
    }

    /// Advances to the next result of a multi-result statement.
    pub fn next_result(&mut self) -> bool {
        self.connection.next_result()
    }

    /// Returns the values of column `column` (by position).
    pub fn values(&mut self, sql: &str, column: usize) -> Vec<SqlValue> {
        let Some(mut rows) = self.query(sql).into_rows() else {
            return Vec::new();
        };
        let mut values = Vec::with_capacity(rows.row_count());
        while let Some(mut row) = rows.fetch_row() {
            if column < row.len() {
                values.push(row.swap_remove(column));
            }
        }
        values
    }

    /// Returns the values of the column named `column`.
    pub fn col_values(&mut self, sql: &str, column: &str) -> Vec<SqlValue> {
        let Some(mut rows) = self.query(sql).into_rows() else {
            return Vec::new();
        };
        let mut values = Vec::with_capacity(rows.row_count());
        while let Some(row) = rows.fetch_assoc() {
            if let Some((_, value)) = row.into_iter().find(|(name, _)| name == column) {
                values.push(value);
            }
        }
        values
    }

    /// Returns every row keyed by column name.
    pub fn rows(&mut self, sql: &str) -> Vec<AssocRow> {
        let Some(mut rows) = self.query(sql).into_rows() else {
            return Vec::new();
        };
        let mut all = Vec::with_capacity(rows.row_count());
        while let Some(row) = rows.fetch_assoc() {
            all.push(row);
        }
        all
    }

    /// Returns first-column to second-column pairs in row order.
    ///
    /// With `set_keys` a repeated key keeps its first position and takes the
    /// value of its last row. Keys compare by their text, so `1` and `'1'`
    /// collide. Without `set_keys` each first-column value is keyed by its
    /// row position instead.
    pub fn key_values(&mut self, sql: &str, set_keys: bool) -> Vec<(SqlValue, SqlValue)> {
        let Some(mut rows) = self.query(sql).into_rows() else {
            return Vec::new();
        };
        let mut pairs: Vec<(SqlValue, SqlValue)> = Vec::with_capacity(rows.row_count());
        let mut seen: HashMap<Option<String>, usize> = HashMap::new();
        while let Some(row) = rows.fetch_row() {
            let mut cells = row.into_iter();
            let first = cells.next().unwrap_or(SqlValue::Null);
            if !set_keys {
                let position = i64::try_from(pairs.len()).unwrap_or(i64::MAX);
                pairs.push((SqlValue::Int(position), first));
                continue;
            }
            let value = cells.next().unwrap_or(SqlValue::Null);
            match seen.entry(first.as_text()) {
                Entry::Occupied(slot) => pairs[*slot.get()].1 = value,
                Entry::Vacant(slot) => {
                    slot.insert(pairs.len());
                    pairs.push((first, value));
                }
            }
        }
        pairs
    }

    /// Renders and runs a SELECT, returning its rows.
    pub fn select(&mut self, select: &SelectDescriptor) -> Result<Vec<AssocRow>> {
        let sql = self.grammar.select_query(select);
        match self.query(&sql) {
            QueryResult::Rows(mut rows) => {
                let mut all = Vec::with_capacity(rows.row_count());
                while let Some(row) = rows.fetch_assoc() {
                    all.push(row);
                }
                Ok(all)
            }
            QueryResult::Affected(_) => Ok(Vec::new()),
            QueryResult::Failed => Err(DriverError::execution(self.connection.error(), &sql)),
        }
    }

    /// Counts the rows `select` would return, ignoring its limit.
    pub fn count_rows(&mut self, select: &SelectDescriptor) -> Result<u64> {
        let sql = self.grammar.count_rows_for(select);
        match self.query(&sql) {
            QueryResult::Rows(mut rows) => Ok(rows
                .fetch_row()
                .and_then(|row| row.into_iter().next())
                .and_then(|cell| cell.as_text())
                .and_then(|text| text.parse().ok())
                .unwrap_or(0)),
            QueryResult::Affected(_) => Ok(0),
            QueryResult::Failed => Err(DriverError::execution(self.connection.error(), &sql)),
        }
    }

    /// Renders and runs an INSERT of already quoted values.
    pub fn insert(&mut self, table: &str, values: &[(String, String)]) -> Result<u64> {
        let sql = self.grammar.insert_query(table, values);
        self.execute_affected(&sql)
    }

    /// Renders and runs an UPDATE of already quoted values.
    pub fn update(
        &mut self,
        table: &str,
        values: &[(String, String)],
        where_clause: &str,
        limit_one: bool,
    ) -> Result<u64> {
        let sql = self
            .grammar
            .update_query(table, values, where_clause, limit_one);
        self.execute_affected(&sql)
    }

    /// Renders and runs a DELETE.
    pub fn delete(&mut self, table: &str, where_clause: &str, limit_one: bool) -> Result<u64> {
        let sql = self.grammar.delete_query(table, where_clause, limit_one);
        self.execute_affected(&sql)
    }

    fn execute_affected(&mut self, sql: &str) -> Result<u64> {
        match self.query(sql) {
            QueryResult::Affected(count) => Ok(count),
            QueryResult::Rows(rows) => Ok(rows.row_count() as u64),
            QueryResult::Failed => Err(DriverError::execution(self.connection.error(), sql)),
        }
    }
}

/// Returns true for a numeric literal with a decimal point.
fn is_decimal(value: &str) -> bool {
    let value = value.trim();
    value.contains('.')
        && value.bytes().any(|b| b.is_ascii_digit())
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
        && value.parse::<f64>().is_ok()
}

/// Wraps `_`, `%` and `[` in brackets so LIKE matches them literally.
fn bracket_wildcards(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '_' | '%' | '[') {
            out.push('[');
            out.push(c);
            out.push(']');
        } else {
            out.push(c);
        }
    }
    out
}
