//! PostgreSQL dialect.

use super::Dialect;
use crate::escape;
use crate::grammar::field::ColumnClause;

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "pgsql"
    }

    fn escape_id(&self, name: &str) -> String {
        escape::quote_with(name, '"', '"')
    }

    fn generated_kinds(&self) -> &'static [&'static str] {
        &["STORED"]
    }

    fn limit_to_one(&self, table: &str, body: &str, where_clause: &str) -> String {
        format!("{body} WHERE ctid = (SELECT ctid FROM {table}{where_clause} LIMIT 1)")
    }

    fn splitter_fragment(&self) -> &'static str {
        // `$1` is a parameter, not a tag
        r"|\$(?:[A-Za-z_][A-Za-z0-9_]*)?\$"
    }

    fn c_style_escapes(&self, prefix: Option<char>) -> bool {
        // only E'...' strings treat backslash as an escape
        matches!(prefix, Some('e' | 'E'))
    }

    fn auto_increment(&self, clause: &mut ColumnClause) {
        clause.field_type = match clause.field_type.as_str() {
            " bigint" => String::from(" bigserial"),
            " smallint" => String::from(" smallserial"),
            _ => String::from(" serial"),
        };
        clause.auto_increment = String::new();
    }
}
