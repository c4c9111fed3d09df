//! Microsoft SQL Server dialect.

use super::{Dialect, Feature};
use crate::escape;
use crate::grammar::field::ColumnClause;

/// SQL Server dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSqlDialect;

impl MsSqlDialect {
    /// Creates a new SQL Server dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MsSqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn escape_id(&self, name: &str) -> String {
        escape::quote_with(name, '[', ']')
    }

    fn supports(&self, feature: Feature) -> bool {
        feature == Feature::BracketLike
    }

    fn on_actions(&self) -> &'static [&'static str] {
        &["NO ACTION", "CASCADE", "SET NULL", "SET DEFAULT"]
    }

    fn generated_kinds(&self) -> &'static [&'static str] {
        &["PERSISTED", "VIRTUAL"]
    }

    fn limit(&self, query: &str, where_clause: &str, limit: Option<u64>, offset: u64) -> String {
        match limit {
            Some(limit) if offset > 0 => {
                let order = if where_clause.contains(" ORDER BY ") {
                    ""
                } else {
                    " ORDER BY (SELECT NULL)"
                };
                format!(
                    "{query}{where_clause}{order} OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY"
                )
            }
            Some(limit) => format!("TOP ({limit}) {query}{where_clause}"),
            None => format!("{query}{where_clause}"),
        }
    }

    fn splitter_fragment(&self) -> &'static str {
        r"|\["
    }

    fn collation_clause(&self, collation: &str) -> String {
        format!(" COLLATE {collation}")
    }

    fn auto_increment(&self, clause: &mut ColumnClause) {
        clause.auto_increment = String::from(" IDENTITY");
    }

    fn generated_clause(&self, expr: &str, kind: &str) -> String {
        if kind == "VIRTUAL" {
            format!(" AS ({expr})")
        } else {
            format!(" AS ({expr}) {kind}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mssql_brackets() {
        let dialect = MsSqlDialect::new();
        assert_eq!(dialect.escape_id("order"), "[order]");
        assert_eq!(dialect.escape_id("a]b"), "[a]]b]");
        assert_eq!(dialect.unescape_id("[a]]b]"), "a]b");
    }

    #[test]
    fn test_mssql_top() {
        let dialect = MsSqlDialect::new();
        assert_eq!(dialect.limit("* FROM [t]", "", Some(10), 0), "TOP (10) * FROM [t]");
        assert_eq!(
            dialect.limit_to_one("[t]", "FROM [t]", " WHERE [id] = 1"),
            "TOP (1) FROM [t] WHERE [id] = 1"
        );
    }

    #[test]
    fn test_mssql_offset_fetch() {
        let dialect = MsSqlDialect::new();
        assert_eq!(
            dialect.limit("* FROM [t]", "", Some(10), 20),
            "* FROM [t] ORDER BY (SELECT NULL) OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(
            dialect.limit("* FROM [t]", " ORDER BY [id]", Some(10), 20),
            "* FROM [t] ORDER BY [id] OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_mssql_collation_is_bare() {
        let dialect = MsSqlDialect::new();
        assert_eq!(dialect.collation_clause("Latin1_General_CI_AS"), " COLLATE Latin1_General_CI_AS");
    }
}
