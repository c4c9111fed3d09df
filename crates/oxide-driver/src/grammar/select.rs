//! SELECT and row-count rendering.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Grammar;

/// Describes a SELECT over one table.
///
/// Columns, filters, grouping and ordering are pre-rendered SQL fragments;
/// only the table name is escaped by the grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectDescriptor {
    /// Table name (unescaped).
    pub table: String,
    /// Projected expressions. Empty means `*`.
    pub columns: Vec<String>,
    /// Filter fragments, AND-joined.
    pub filters: Vec<String>,
    /// Grouping expressions.
    pub group: Vec<String>,
    /// Ordering expressions.
    pub order: Vec<String>,
    /// Row limit; zero or negative means unbounded.
    pub limit: i64,
    /// Zero-based page index, used only when `limit > 0`.
    pub page: u64,
}

impl SelectDescriptor {
    /// Creates an unbounded `SELECT *` over `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Sets the projected expressions.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a filter fragment.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// Sets the grouping expressions.
    #[must_use]
    pub fn group_by<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group = group.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an ordering expression.
    #[must_use]
    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order.push(order.into());
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub const fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the zero-based page.
    #[must_use]
    pub const fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    /// Returns true when grouping leaves columns to aggregate.
    #[must_use]
    pub fn is_grouped(&self) -> bool {
        !self.group.is_empty() && self.group.len() < self.columns.len()
    }

    /// Returns the effective limit, `None` when unbounded.
    #[must_use]
    pub fn row_limit(&self) -> Option<u64> {
        u64::try_from(self.limit).ok().filter(|limit| *limit > 0)
    }

    /// Returns the row offset implied by the page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.row_limit()
            .map_or(0, |limit| limit.saturating_mul(self.page))
    }
}

fn where_fragment(filters: &[String]) -> String {
    if filters.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filters.join(" AND "))
    }
}

impl Grammar {
    /// Renders a SELECT statement.
    ///
    /// Clauses are emitted in the fixed order WHERE, GROUP BY, ORDER BY,
    /// LIMIT, OFFSET.
    #[must_use]
    pub fn select_query(&self, select: &SelectDescriptor) -> String {
        let columns = if select.columns.is_empty() {
            String::from("*")
        } else {
            select.columns.join(", ")
        };
        let query = format!("{columns} FROM {}", self.table(&select.table));

        let mut tail = where_fragment(&select.filters);
        if select.is_grouped() {
            tail.push_str(" GROUP BY ");
            tail.push_str(&select.group.join(", "));
        }
        if !select.order.is_empty() {
            tail.push_str(" ORDER BY ");
            tail.push_str(&select.order.join(", "));
        }

        let sql = format!(
            "SELECT {}",
            self.dialect()
                .limit(&query, &tail, select.row_limit(), select.offset())
        );
        debug!(sql = %sql, "Rendered SELECT");
        sql
    }

    /// Renders a query counting the rows a SELECT would return.
    ///
    /// One group column counts distinct values, several group columns count
    /// the rows of a grouped derived table, no grouping counts all rows.
    #[must_use]
    pub fn count_rows_query(&self, table: &str, filters: &[String], group: &[String]) -> String {
        let from = format!(" FROM {}{}", self.table(table), where_fragment(filters));
        match group {
            [] => format!("SELECT COUNT(*){from}"),
            [column] => format!("SELECT COUNT(DISTINCT {column}){from}"),
            columns => format!(
                "SELECT COUNT(*) FROM (SELECT 1{from} GROUP BY {}) x",
                columns.join(", ")
            ),
        }
    }

    /// Renders the row-count query matching `select`.
    #[must_use]
    pub fn count_rows_for(&self, select: &SelectDescriptor) -> String {
        let group: &[String] = if select.is_grouped() {
            &select.group
        } else {
            &[]
        };
        self.count_rows_query(&select.table, &select.filters, group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{GenericDialect, MsSqlDialect, MySqlDialect, PostgresDialect};

    #[test]
    fn test_select_all() {
        let grammar = Grammar::new(GenericDialect::new());
        assert_eq!(
            grammar.select_query(&SelectDescriptor::new("users")),
            "SELECT * FROM users"
        );
    }

    #[test]
    fn test_select_clause_order() {
        let grammar = Grammar::new(GenericDialect::new());
        let select = SelectDescriptor::new("orders")
            .columns(["customer", "SUM(total)"])
            .filter("status = 'paid'")
            .filter("total > 0")
            .group_by(["customer"])
            .order_by("SUM(total) DESC")
            .limit(10)
            .page(3);
        assert_eq!(
            grammar.select_query(&select),
            "SELECT customer, SUM(total) FROM orders WHERE status = 'paid' AND total > 0 \
             GROUP BY customer ORDER BY SUM(total) DESC LIMIT 10 OFFSET 30"
        );
    }

    #[test]
    fn test_non_positive_limit_is_unbounded() {
        let grammar = Grammar::new(MySqlDialect::new());
        for limit in [0, -1, -50] {
            let select = SelectDescriptor::new("t").limit(limit).page(4);
            let sql = grammar.select_query(&select);
            assert!(!sql.contains("LIMIT"), "{sql}");
            assert!(!sql.contains("OFFSET"), "{sql}");
        }
    }

    #[test]
    fn test_first_page_has_no_offset() {
        let grammar = Grammar::new(MySqlDialect::new());
        let sql = grammar.select_query(&SelectDescriptor::new("t").limit(25));
        assert_eq!(sql, "SELECT * FROM `t` LIMIT 25");
    }

    #[test]
    fn test_offset_is_limit_times_page() {
        let grammar = Grammar::new(PostgresDialect::new());
        for page in 1..5_u64 {
            let sql = grammar.select_query(&SelectDescriptor::new("t").limit(7).page(page));
            assert!(sql.ends_with(&format!("LIMIT 7 OFFSET {}", 7 * page)), "{sql}");
        }
    }

    #[test]
    fn test_group_requires_aggregated_columns() {
        let grammar = Grammar::new(GenericDialect::new());
        let select = SelectDescriptor::new("t").columns(["a"]).group_by(["a"]);
        assert_eq!(grammar.select_query(&select), "SELECT a FROM t");
    }

    #[test]
    fn test_mssql_select_uses_top() {
        let grammar = Grammar::new(MsSqlDialect::new());
        let sql = grammar.select_query(&SelectDescriptor::new("t").limit(5));
        assert_eq!(sql, "SELECT TOP (5) * FROM [t]");
    }

    #[test]
    fn test_count_rows_ungrouped() {
        let grammar = Grammar::new(MySqlDialect::new());
        assert_eq!(
            grammar.count_rows_query("t", &[String::from("`a` = 1")], &[]),
            "SELECT COUNT(*) FROM `t` WHERE `a` = 1"
        );
    }

    #[test]
    fn test_count_rows_single_group() {
        let grammar = Grammar::new(MySqlDialect::new());
        assert_eq!(
            grammar.count_rows_query("t", &[], &[String::from("`a`")]),
            "SELECT COUNT(DISTINCT `a`) FROM `t`"
        );
    }

    #[test]
    fn test_count_rows_multi_group_uses_derived_table() {
        let group = [String::from("a"), String::from("b")];
        for grammar in [
            Grammar::new(MySqlDialect::new()),
            Grammar::new(PostgresDialect::new()),
            Grammar::new(GenericDialect::new()),
        ] {
            let sql = grammar.count_rows_query("t", &[String::from("c > 1")], &group);
            assert!(
                sql.starts_with("SELECT COUNT(*) FROM (SELECT 1 FROM "),
                "{sql}"
            );
            assert!(sql.ends_with(" WHERE c > 1 GROUP BY a, b) x"), "{sql}");
        }
    }

    #[test]
    fn test_count_rows_for_descriptor() {
        let grammar = Grammar::new(GenericDialect::new());
        let select = SelectDescriptor::new("t")
            .columns(["a", "COUNT(*)"])
            .group_by(["a"]);
        assert_eq!(grammar.count_rows_for(&select), "SELECT COUNT(DISTINCT a) FROM t");
    }
}
