//! MySQL and MariaDB dialect.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{min_version, Dialect, Feature};
use crate::escape;
use crate::grammar::field::{ColumnClause, TableFieldDescriptor};

static SELECT_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^(SELECT\b)(.+)").unwrap());
static SPATIAL_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"geometry|point|linestring|polygon").unwrap());

/// MySQL / MariaDB dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn escape_id(&self, name: &str) -> String {
        escape::quote_with(name, '`', '`')
    }

    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn supports(&self, feature: Feature) -> bool {
        matches!(
            feature,
            Feature::ColumnComment
                | Feature::DecimalLike
                | Feature::JsonCast
                | Feature::BinaryCollation
        )
    }

    fn unsigned_keywords(&self) -> &'static [&'static str] {
        &["unsigned", "zerofill", "unsigned zerofill"]
    }

    fn generated_kinds(&self) -> &'static [&'static str] {
        &["STORED", "VIRTUAL"]
    }

    fn insert_default_values(&self, table: &str) -> String {
        format!("INSERT INTO {table} () VALUES ()")
    }

    fn splitter_fragment(&self) -> &'static str {
        "|[`#]"
    }

    fn hash_comments(&self) -> bool {
        true
    }

    fn c_style_escapes(&self, _prefix: Option<char>) -> bool {
        true
    }

    fn auto_increment(&self, clause: &mut ColumnClause) {
        clause.auto_increment = String::from(" AUTO_INCREMENT");
    }

    fn quote_text_default(&self, field_type: &str, literal: String) -> String {
        // MySQL 8 only accepts TEXT/JSON defaults as expressions
        if field_type.contains("text") || field_type.contains("json") {
            format!("({literal})")
        } else {
            literal
        }
    }

    fn unconvert_field(&self, field: Option<&TableFieldDescriptor>, value: String) -> String {
        let Some(field) = field else {
            return value;
        };
        let mut value = value;
        if field.field_type.contains("binary") {
            value = format!("UNHEX({value})");
        }
        if field.field_type == "bit" {
            value = format!("CONV({value}, 2, 10) + 0");
        }
        if SPATIAL_TYPE.is_match(&field.field_type) {
            value = format!("ST_GeomFromText({value})");
        }
        value
    }

    fn slow_query(&self, sql: &str, timeout: Duration, server_info: &str) -> Option<String> {
        if !min_version(server_info, "5.7.8", Some("10.1.2")) {
            return None;
        }
        if server_info.contains("MariaDB") {
            return Some(format!(
                "SET STATEMENT max_statement_time={} FOR {sql}",
                timeout.as_secs()
            ));
        }
        let caps = SELECT_PREFIX.captures(sql)?;
        Some(format!(
            "{} /*+ MAX_EXECUTION_TIME({}) */{}",
            &caps[1],
            timeout.as_millis(),
            &caps[2]
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_escape_round_trip() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.escape_id("order"), "`order`");
        assert_eq!(dialect.escape_id("we`ird"), "`we``ird`");
        for name in ["plain", "we`ird", "``", "a b"] {
            assert_eq!(dialect.unescape_id(&dialect.escape_id(name)), name);
        }
    }

    #[test]
    fn test_mysql_quote_literal_escapes_backslash() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.quote_literal(r"a\b'c"), r"'a\\b''c'");
    }

    #[test]
    fn test_mysql_empty_insert() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.insert_default_values("`t`"), "INSERT INTO `t` () VALUES ()");
    }

    #[test]
    fn test_mysql_unconvert_field() {
        let dialect = MySqlDialect::new();
        let binary = TableFieldDescriptor::new("h", "varbinary");
        assert_eq!(dialect.unconvert_field(Some(&binary), "'ab'".into()), "UNHEX('ab')");
        let bit = TableFieldDescriptor::new("b", "bit");
        assert_eq!(
            dialect.unconvert_field(Some(&bit), "'101'".into()),
            "CONV('101', 2, 10) + 0"
        );
        assert_eq!(dialect.unconvert_field(None, "'x'".into()), "'x'");
    }

    #[test]
    fn test_mysql_slow_query_hint() {
        let dialect = MySqlDialect::new();
        assert_eq!(
            dialect.slow_query("SELECT * FROM t", Duration::from_secs(2), "8.0.36"),
            Some(String::from("SELECT /*+ MAX_EXECUTION_TIME(2000) */ * FROM t"))
        );
        assert_eq!(
            dialect.slow_query("UPDATE t SET a = 1", Duration::from_secs(2), "8.0.36"),
            None
        );
        assert_eq!(
            dialect.slow_query("SELECT 1", Duration::from_secs(2), "5.6.51"),
            None
        );
    }

    #[test]
    fn test_mariadb_slow_query() {
        let dialect = MySqlDialect::new();
        assert_eq!(
            dialect.slow_query("SELECT 1", Duration::from_secs(3), "5.5.5-10.6.12-MariaDB"),
            Some(String::from("SET STATEMENT max_statement_time=3 FOR SELECT 1"))
        );
    }
}
