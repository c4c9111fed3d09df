//! SQLite dialect.

use super::{Dialect, Feature};
use crate::escape;
use crate::grammar::field::ColumnClause;

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn escape_id(&self, name: &str) -> String {
        escape::quote_with(name, '"', '"')
    }

    fn supports(&self, feature: Feature) -> bool {
        feature == Feature::RejectAttach
    }

    fn generated_kinds(&self) -> &'static [&'static str] {
        &["STORED", "VIRTUAL"]
    }

    fn limit_to_one(&self, table: &str, body: &str, where_clause: &str) -> String {
        format!("{body} WHERE rowid = (SELECT rowid FROM {table}{where_clause} LIMIT 1)")
    }

    fn splitter_fragment(&self) -> &'static str {
        r"|[`\[]"
    }

    fn auto_increment(&self, clause: &mut ColumnClause) {
        clause.auto_increment = String::from(" PRIMARY KEY AUTOINCREMENT");
    }

    fn default_expression(&self, expr: &str) -> String {
        format!("({expr})")
    }
}
