//! SQL grammar: renders statements and clauses from descriptors.
//!
//! A [`Grammar`] pairs a [`Dialect`] strategy with the [`Session`] it renders
//! for. Rendering is pure string building; nothing here talks to a server
//! and nothing here fails. Malformed descriptors render best-effort.
//!
//! # Example
//!
//! ```rust
//! use oxide_driver::dialect::MySqlDialect;
//! use oxide_driver::grammar::{Grammar, SelectDescriptor};
//!
//! let grammar = Grammar::new(MySqlDialect::new());
//! let select = SelectDescriptor::new("users")
//!     .columns(["`id`", "`name`"])
//!     .filter("`active` = 1")
//!     .limit(50)
//!     .page(2);
//!
//! assert_eq!(
//!     grammar.select_query(&select),
//!     "SELECT `id`, `name` FROM `users` WHERE `active` = 1 LIMIT 50 OFFSET 100"
//! );
//! ```

mod definer;
mod dml;
pub mod field;
pub mod foreign_key;
pub mod select;

pub use field::{process_length, ColumnClause, FieldHints, TableFieldDescriptor};
pub use foreign_key::ForeignKeyDescriptor;
pub use select::SelectDescriptor;

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;

/// Connection context the grammar renders for.
///
/// Holds what would otherwise be process-wide state: the current database
/// and schema, the logged user and whether 4-byte UTF-8 was requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    /// Currently selected database.
    pub database: Option<String>,
    /// Currently selected schema (namespace).
    pub schema: Option<String>,
    /// Logged user as `user@host`.
    pub user: Option<String>,
    /// Server version string as reported by the connection.
    pub server_info: String,
    /// Whether the connection was opened with `utf8mb4`.
    pub utf8mb4: bool,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the current schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets the logged user (`user@host`).
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the server version string.
    #[must_use]
    pub fn server_info(mut self, server_info: impl Into<String>) -> Self {
        self.server_info = server_info.into();
        self
    }

    /// Records whether `utf8mb4` was requested.
    #[must_use]
    pub const fn utf8mb4(mut self, enabled: bool) -> Self {
        self.utf8mb4 = enabled;
        self
    }

    /// Returns the connection character set name.
    #[must_use]
    pub const fn charset(&self) -> &'static str {
        if self.utf8mb4 {
            "utf8mb4"
        } else {
            "utf8"
        }
    }
}

/// Renders SQL for one dialect and session.
#[derive(Debug)]
pub struct Grammar {
    dialect: Box<dyn Dialect>,
    session: Session,
}

impl Grammar {
    /// Creates a grammar for `dialect` with an empty session.
    #[must_use]
    pub fn new(dialect: impl Dialect + 'static) -> Self {
        Self::from_boxed(Box::new(dialect))
    }

    /// Creates a grammar from an already boxed dialect.
    #[must_use]
    pub fn from_boxed(dialect: Box<dyn Dialect>) -> Self {
        Self {
            dialect,
            session: Session::default(),
        }
    }

    /// Replaces the session.
    #[must_use]
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Returns the session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the session for modification (e.g. after `USE db`).
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Quotes an identifier.
    #[must_use]
    pub fn escape_id(&self, name: &str) -> String {
        self.dialect.escape_id(name)
    }

    /// Removes identifier quoting.
    #[must_use]
    pub fn unescape_id(&self, quoted: &str) -> String {
        self.dialect.unescape_id(quoted)
    }

    /// Renders a table reference.
    #[must_use]
    pub fn table(&self, name: &str) -> String {
        self.dialect.escape_id(name)
    }

    /// Quotes a filter key, keeping a function wrapper such as
    /// `lower(`name`)` around the quoted column.
    #[must_use]
    pub fn escape_key(&self, key: &str) -> String {
        let quoted = regex::escape(&self.escape_id("_")).replace('_', ".*");
        let wrapped = Regex::new(&format!(r"^([\w(]+)({quoted})([ \w)]+)$"))
            .ok()
            .and_then(|pattern| {
                pattern.captures(key).map(|caps| {
                    format!(
                        "{}{}{}",
                        &caps[1],
                        self.escape_id(&self.unescape_id(&caps[2])),
                        &caps[3]
                    )
                })
            });
        wrapped.unwrap_or_else(|| self.escape_id(key))
    }

    /// Rewrites `sql` so it is aborted after `timeout`, if the dialect can.
    #[must_use]
    pub fn slow_query(&self, sql: &str, timeout: Duration) -> Option<String> {
        self.dialect
            .slow_query(sql, timeout, &self.session.server_info)
    }
}

/// Replaces `current_timestamp()` (any case) with `CURRENT_TIMESTAMP`.
///
/// MariaDB reports the function form in defaults and ON UPDATE actions.
pub(crate) fn canonical_timestamp(expr: &str) -> String {
    const NEEDLE: &str = "current_timestamp()";
    let lower = expr.to_ascii_lowercase();
    let mut out = String::with_capacity(expr.len());
    let mut last = 0;
    for (start, _) in lower.match_indices(NEEDLE) {
        out.push_str(&expr[last..start]);
        out.push_str("CURRENT_TIMESTAMP");
        last = start + NEEDLE.len();
    }
    out.push_str(&expr[last..]);
    out
}
