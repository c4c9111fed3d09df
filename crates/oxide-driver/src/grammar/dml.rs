//! INSERT, UPDATE and DELETE rendering.

use tracing::debug;

use super::Grammar;

fn where_fragment(where_clause: &str) -> String {
    let where_clause = where_clause.trim();
    if where_clause.is_empty() {
        String::new()
    } else {
        format!(" WHERE {where_clause}")
    }
}

impl Grammar {
    /// Renders an INSERT of one row.
    ///
    /// `values` maps column names (unescaped) to SQL expressions, in order.
    /// An empty list inserts a row of defaults.
    #[must_use]
    pub fn insert_query(&self, table: &str, values: &[(String, String)]) -> String {
        let table = self.table(table);
        if values.is_empty() {
            return self.dialect().insert_default_values(&table);
        }
        let columns: Vec<String> = values
            .iter()
            .map(|(column, _)| self.escape_id(column))
            .collect();
        let exprs: Vec<&str> = values.iter().map(|(_, value)| value.as_str()).collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            exprs.join(", ")
        );
        debug!(sql = %sql, "Rendered INSERT");
        sql
    }

    /// Renders an UPDATE.
    ///
    /// `where_clause` is the condition without the `WHERE` keyword; with
    /// `limit_one` the dialect restricts the statement to a single row.
    #[must_use]
    pub fn update_query(
        &self,
        table: &str,
        values: &[(String, String)],
        where_clause: &str,
        limit_one: bool,
    ) -> String {
        let escaped = self.table(table);
        let assignments: Vec<String> = values
            .iter()
            .map(|(column, value)| format!("{} = {value}", self.escape_id(column)))
            .collect();
        let body = format!("{escaped} SET {}", assignments.join(", "));
        let where_clause = where_fragment(where_clause);
        let sql = if limit_one {
            format!(
                "UPDATE {}",
                self.dialect()
                    .limit_to_one(&escaped, &body, &where_clause)
            )
        } else {
            format!("UPDATE {body}{where_clause}")
        };
        debug!(sql = %sql, "Rendered UPDATE");
        sql
    }

    /// Renders a DELETE.
    #[must_use]
    pub fn delete_query(&self, table: &str, where_clause: &str, limit_one: bool) -> String {
        let escaped = self.table(table);
        let body = format!("FROM {escaped}");
        let where_clause = where_fragment(where_clause);
        let sql = if limit_one {
            format!(
                "DELETE {}",
                self.dialect()
                    .limit_to_one(&escaped, &body, &where_clause)
            )
        } else {
            format!("DELETE {body}{where_clause}")
        };
        debug!(sql = %sql, "Rendered DELETE");
        sql
    }
}
