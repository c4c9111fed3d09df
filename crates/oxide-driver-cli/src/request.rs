//! JSON render requests.
//!
//! A request file carries an optional session and a list of requests, each
//! tagged with its `kind`:
//!
//! ```json
//! {
//!   "session": { "database": "shop", "server_info": "8.0.36" },
//!   "requests": [
//!     { "kind": "select", "table": "orders", "limit": 50, "page": 2 },
//!     { "kind": "delete", "table": "orders", "filter": "`id` = 7", "limit_one": true }
//!   ]
//! }
//! ```

use std::time::Duration;

use oxide_driver::grammar::{ForeignKeyDescriptor, SelectDescriptor, TableFieldDescriptor};
use oxide_driver::{Grammar, Session};
use serde::Deserialize;

use crate::error::{CliError, Result};

/// Contents of a request file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderFile {
    /// Session the statements are rendered for.
    pub session: Session,
    /// Requests, rendered in order.
    pub requests: Vec<Request>,
}

/// One statement to render.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    /// SELECT with limit and paging.
    Select(SelectDescriptor),
    /// Row count matching a SELECT.
    Count(SelectDescriptor),
    /// Single-row INSERT.
    Insert {
        table: String,
        /// `[column, expression]` pairs.
        #[serde(default)]
        values: Vec<(String, String)>,
    },
    /// UPDATE with a raw condition.
    Update {
        table: String,
        values: Vec<(String, String)>,
        #[serde(default)]
        filter: String,
        #[serde(default)]
        limit_one: bool,
    },
    /// DELETE with a raw condition.
    Delete {
        table: String,
        #[serde(default)]
        filter: String,
        #[serde(default)]
        limit_one: bool,
    },
    CreateTable {
        table: String,
        fields: Vec<TableFieldDescriptor>,
        #[serde(default)]
        foreign_keys: Vec<ForeignKeyDescriptor>,
    },
    AddColumn {
        table: String,
        field: TableFieldDescriptor,
    },
    /// `ALTER TABLE ... ADD FOREIGN KEY`.
    ForeignKey {
        table: String,
        foreign_key: ForeignKeyDescriptor,
    },
    /// Replays a definition without the session user's DEFINER clause.
    RemoveDefiner { sql: String },
    /// Wraps a query with the dialect's execution time limit.
    SlowQuery { sql: String, timeout_ms: u64 },
}

impl Request {
    /// Returns the `kind` tag, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Select(_) => "select",
            Self::Count(_) => "count",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::CreateTable { .. } => "create_table",
            Self::AddColumn { .. } => "add_column",
            Self::ForeignKey { .. } => "foreign_key",
            Self::RemoveDefiner { .. } => "remove_definer",
            Self::SlowQuery { .. } => "slow_query",
        }
    }

    /// Renders the request with `grammar`.
    pub fn render(&self, grammar: &Grammar) -> Result<String> {
        let sql = match self {
            Self::Select(select) => grammar.select_query(select),
            Self::Count(select) => grammar.count_rows_for(select),
            Self::Insert { table, values } => grammar.insert_query(table, values),
            Self::Update {
                table,
                values,
                filter,
                limit_one,
            } => {
                if values.is_empty() {
                    return Err(CliError::NothingToRender(format!(
                        "update of {table} sets no column"
                    )));
                }
                grammar.update_query(table, values, filter, *limit_one)
            }
            Self::Delete {
                table,
                filter,
                limit_one,
            } => grammar.delete_query(table, filter, *limit_one),
            Self::CreateTable {
                table,
                fields,
                foreign_keys,
            } => grammar.create_table_query(table, fields, foreign_keys),
            Self::AddColumn { table, field } => {
                grammar.add_column_query(table, field).ok_or_else(|| {
                    CliError::NothingToRender(format!("column added to {table} has no name"))
                })?
            }
            Self::ForeignKey { table, foreign_key } => format!(
                "ALTER TABLE {} ADD{}",
                grammar.table(table),
                grammar.foreign_key_clause(foreign_key)
            ),
            Self::RemoveDefiner { sql } => grammar.remove_definer(sql),
            Self::SlowQuery { sql, timeout_ms } => grammar
                .slow_query(sql, Duration::from_millis(*timeout_ms))
                .ok_or_else(|| {
                    CliError::NothingToRender(format!(
                        "{} cannot limit the execution time of this query",
                        grammar.dialect().name()
                    ))
                })?,
        };
        Ok(sql)
    }
}

impl RenderFile {
    /// Parses a request file.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
