//! The database connection collaborator.
//!
//! This crate never talks to a database engine itself. Callers plug in a
//! driver by implementing [`Connection`] and [`ResultSet`]; the executor only
//! sends SQL text through them and reshapes what comes back.

use crate::value::{AssocRow, Row};

/// Outcome of sending one statement.
#[derive(Debug)]
pub enum QueryResult<R> {
    /// The statement produced a result set.
    Rows(R),
    /// The statement succeeded without a result set.
    Affected(u64),
    /// The statement failed; see [`Connection::error`].
    Failed,
}

impl<R> QueryResult<R> {
    /// Returns true unless the statement failed.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed)
    }

    /// Returns the result set, if any.
    #[must_use]
    pub fn into_rows(self) -> Option<R> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Affected(_) | Self::Failed => None,
        }
    }
}

/// A result set being read row by row.
pub trait ResultSet {
    /// Number of rows in the result set.
    fn row_count(&self) -> usize;

    /// Fetches the next row by position.
    fn fetch_row(&mut self) -> Option<Row>;

    /// Fetches the next row keyed by column name.
    fn fetch_assoc(&mut self) -> Option<AssocRow>;
}

/// A live database connection.
pub trait Connection {
    /// Result set type produced by this connection.
    type Rows: ResultSet;

    /// Sends one statement.
    fn query(&mut self, sql: &str) -> QueryResult<Self::Rows>;

    /// Quotes a string literal for this connection.
    fn quote(&self, value: &str) -> String;

    /// Text of the last error.
    fn error(&self) -> String;

    /// Server version string.
    fn server_info(&self) -> String;

    /// Takes the current result of a multi-result statement.
    fn store_result(&mut self) -> Option<QueryResult<Self::Rows>> {
        None
    }

    /// Advances to the next result of a multi-result statement.
    fn next_result(&mut self) -> bool {
        false
    }
}
