//! SQL dialect strategies.
//!
//! Different database engines disagree on identifier quoting, LIMIT syntax,
//! comment support and a handful of rendering details. Shared logic in the
//! grammar, the splitter and the executor asks a [`Dialect`] object instead of
//! branching on engine names. Each hook has a default matching standard SQL,
//! so a dialect only overrides what it does differently.

mod generic;
mod mssql;
mod mysql;
mod postgres;
mod sqlite;

pub use generic::GenericDialect;
pub use mssql::MsSqlDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DriverError, Result};
use crate::escape;
use crate::grammar::field::{ColumnClause, TableFieldDescriptor};

/// Referential actions accepted in `ON DELETE` / `ON UPDATE` clauses.
pub const FOREIGN_KEY_ACTIONS: &[&str] = &["RESTRICT", "NO ACTION", "CASCADE", "SET NULL", "SET DEFAULT"];

// `(?<!o)int(?!er)` without look-around: "point" and "interval" are not numbers.
static NUMBER_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^o])int(?:$|[^e]|e$|e[^r])|numeric|real|float|double|decimal|money")
        .unwrap()
});

/// Optional behaviors a dialect may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Column definitions accept an inline `COMMENT '...'`.
    ColumnComment,
    /// Decimal values are compared with `LIKE` because the server formats
    /// floats inexactly.
    DecimalLike,
    /// Equality filters use `LIKE` with `_`, `%` and `[` escaped in brackets.
    BracketLike,
    /// JSON columns are compared through `CAST(... AS JSON)`.
    JsonCast,
    /// Non-ASCII text filters add a `COLLATE <charset>_bin` comparison.
    BinaryCollation,
    /// `ATTACH` statements must not be executed from scripts.
    RejectAttach,
}

/// Dialect-specific hooks used by the grammar, splitter and executor.
pub trait Dialect: fmt::Debug {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Quotes an identifier. The generic dialect leaves names untouched.
    fn escape_id(&self, name: &str) -> String {
        name.to_string()
    }

    /// Reverses [`Dialect::escape_id`].
    fn unescape_id(&self, quoted: &str) -> String {
        escape::unquote(quoted)
    }

    /// Renders a string literal without a live connection.
    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Returns whether the dialect advertises `feature`.
    fn supports(&self, _feature: Feature) -> bool {
        false
    }

    /// Returns whether `field_type` is numeric (eligible for `UNSIGNED`).
    fn number_type(&self, field_type: &str) -> bool {
        NUMBER_TYPE.is_match(field_type)
    }

    /// Unsigned modifiers the dialect accepts after a numeric type.
    fn unsigned_keywords(&self) -> &'static [&'static str] {
        &[]
    }

    /// Allowed foreign key actions.
    fn on_actions(&self) -> &'static [&'static str] {
        FOREIGN_KEY_ACTIONS
    }

    /// Generated column kinds (e.g. `STORED`, `VIRTUAL`).
    fn generated_kinds(&self) -> &'static [&'static str] {
        &[]
    }

    /// Appends a row limit to `query` followed by `where_clause`.
    ///
    /// `where_clause` carries its own leading space. `None` means unbounded.
    fn limit(&self, query: &str, where_clause: &str, limit: Option<u64>, offset: u64) -> String {
        match limit {
            Some(limit) if offset > 0 => {
                format!("{query}{where_clause} LIMIT {limit} OFFSET {offset}")
            }
            Some(limit) => format!("{query}{where_clause} LIMIT {limit}"),
            None => format!("{query}{where_clause}"),
        }
    }

    /// Renders the part of an UPDATE/DELETE after the verb so it affects a
    /// single row.
    ///
    /// `table` is already escaped, `body` is e.g. `` `t` SET a = 1 `` or
    /// `` FROM `t` `` and `where_clause` starts with ` WHERE`.
    fn limit_to_one(&self, _table: &str, body: &str, where_clause: &str) -> String {
        self.limit(body, where_clause, Some(1), 0)
    }

    /// Renders an INSERT of a row consisting only of defaults.
    fn insert_default_values(&self, table: &str) -> String {
        format!("INSERT INTO {table} DEFAULT VALUES")
    }

    /// Extra splitter alternatives (regex) for dialect quoting characters.
    ///
    /// The result starts with `|` when non-empty.
    fn splitter_fragment(&self) -> &'static str {
        ""
    }

    /// Returns whether `#` starts a line comment, like `-- `.
    fn hash_comments(&self) -> bool {
        false
    }

    /// Returns whether a backslash escapes the next character inside a
    /// string whose opener is preceded by `prefix`.
    fn c_style_escapes(&self, _prefix: Option<char>) -> bool {
        false
    }

    /// Regex matching the end of the quote or comment started by `opener`.
    ///
    /// With `c_style` the pattern also matches a backslash and the character
    /// after it, which the splitter skips over.
    fn closer_for(&self, opener: &str, c_style: bool) -> String {
        match opener {
            "/*" => String::from(r"\*/"),
            "[" => String::from(r"\]"),
            "-- " | "#" => String::from("\n"),
            _ if opener.starts_with('$') => regex::escape(opener),
            _ if c_style => format!(r"(?s){}|\\.", regex::escape(opener)),
            _ => regex::escape(opener),
        }
    }

    /// Renders the collation suffix of a text-like column type.
    fn collation_clause(&self, collation: &str) -> String {
        format!(" COLLATE {}", self.quote_literal(collation))
    }

    /// Fills the auto-increment part of a column clause.
    fn auto_increment(&self, clause: &mut ColumnClause) {
        clause.auto_increment = String::from(" PRIMARY KEY");
    }

    /// Renders an unquoted default expression.
    fn default_expression(&self, expr: &str) -> String {
        expr.to_string()
    }

    /// Renders a quoted default literal for a column of `field_type`.
    fn quote_text_default(&self, _field_type: &str, literal: String) -> String {
        literal
    }

    /// Renders the clause of a generated column.
    fn generated_clause(&self, expr: &str, kind: &str) -> String {
        format!(" GENERATED ALWAYS AS ({expr}) {kind}")
    }

    /// Wraps a quoted value so it compares against the stored representation
    /// of `field`.
    fn unconvert_field(&self, _field: Option<&TableFieldDescriptor>, value: String) -> String {
        value
    }

    /// Rewrites `sql` so the server aborts it after `timeout`.
    ///
    /// Returns `None` when the dialect has no native way to do so.
    fn slow_query(&self, _sql: &str, _timeout: Duration, _server_info: &str) -> Option<String> {
        None
    }
}

/// Returns the dialect registered under `name`.
///
/// Accepts the usual aliases (`mariadb`, `postgres`, `sqlsrv`, ...).
pub fn dialect_for(name: &str) -> Result<Box<dyn Dialect>> {
    match name.to_ascii_lowercase().as_str() {
        "generic" | "ansi" => Ok(Box::new(GenericDialect::new())),
        "mysql" | "mariadb" | "sql" => Ok(Box::new(MySqlDialect::new())),
        "pgsql" | "postgres" | "postgresql" => Ok(Box::new(PostgresDialect::new())),
        "sqlite" | "sqlite3" => Ok(Box::new(SqliteDialect::new())),
        "mssql" | "sqlsrv" | "sqlserver" => Ok(Box::new(MsSqlDialect::new())),
        _ => Err(DriverError::UnknownDialect(name.to_string())),
    }
}

/// Compares a server version string against a minimum.
///
/// MariaDB reports itself as `5.5.5-10.x.y-MariaDB`; when `maria_version` is
/// given such servers are checked against it instead.
#[must_use]
pub fn min_version(server_info: &str, version: &str, maria_version: Option<&str>) -> bool {
    let mut server = server_info;
    let mut wanted = version;
    if let Some(maria) = maria_version {
        if server_info.contains("MariaDB") {
            wanted = maria;
            server = server_info
                .strip_prefix("5.5.5-")
                .unwrap_or(server_info);
        }
    }
    version_parts(server) >= version_parts(wanted)
}

fn version_parts(version: &str) -> Vec<u64> {
    version
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .next()
        .unwrap_or_default()
        .split('.')
        .filter_map(|part| part.parse().ok())
        .collect()
}
