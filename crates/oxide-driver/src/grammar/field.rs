//! Column definitions: type, default and full column clauses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::foreign_key::ForeignKeyDescriptor;
use super::{canonical_timestamp, Grammar};
use crate::dialect::Feature;

const ENUM_VALUE: &str = r"'(?:''|[^'\\]|\\.)*'";

static ENUM_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?s)^\s*\(?\s*{ENUM_VALUE}(?:\s*,\s*{ENUM_VALUE})*\s*\)?\s*$"
    ))
    .unwrap()
});
static ENUM_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(&format!("(?s){ENUM_VALUE}")).unwrap());
static LENGTH_JUNK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^-0-9,+()\[\]]").unwrap());
static TEXT_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"char|text|enum|set").unwrap());
static STRING_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"char|binary|text|json|enum|set").unwrap());
static TIMESTAMP_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"timestamp|datetime").unwrap());
static NUMERIC_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?$").unwrap());

/// Which column modifiers the editing UI requires or hides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldHints {
    /// The type needs a length (e.g. `varchar`).
    pub length_required: bool,
    /// The unsigned modifier does not apply.
    pub unsigned_hidden: bool,
    /// The collation does not apply.
    pub collation_hidden: bool,
}

/// Snapshot of one column, as introspected or as submitted by an edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableFieldDescriptor {
    /// Column name.
    pub name: String,
    /// Declared type without length (e.g. `varchar`).
    #[serde(rename = "type")]
    pub field_type: String,
    /// Full type as reported by the server (e.g. `varchar(255)`).
    pub full_type: String,
    /// Unsigned modifier text (e.g. `unsigned zerofill`), empty if none.
    pub unsigned: String,
    /// Whether the column accepts NULL.
    pub null: bool,
    /// Length, precision or enum value list.
    pub length: String,
    /// Default value; `None` means no default at all.
    pub default: Option<String>,
    /// ON UPDATE action.
    pub on_update: Option<String>,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
    /// Whether the column is part of the primary key.
    pub primary: bool,
    /// Collation.
    pub collation: Option<String>,
    /// Comment.
    pub comment: Option<String>,
    /// Generated column kind (`STORED`, `VIRTUAL`, `PERSISTED`); the default
    /// holds the generating expression.
    pub generated: Option<String>,
    /// Editing hints.
    pub hints: FieldHints,
}

impl TableFieldDescriptor {
    /// Creates a NOT NULL column of `field_type` without a default.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        let field_type = field_type.into();
        Self {
            name: name.into(),
            full_type: field_type.clone(),
            field_type,
            ..Self::default()
        }
    }

    /// Sets the length or precision.
    #[must_use]
    pub fn length(mut self, length: impl Into<String>) -> Self {
        self.length = length.into();
        self
    }

    /// Sets the unsigned modifier.
    #[must_use]
    pub fn unsigned(mut self, modifier: impl Into<String>) -> Self {
        self.unsigned = modifier.into();
        self
    }

    /// Makes the column nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: impl Into<String>) -> Self {
        self.on_update = Some(action.into());
        self
    }

    /// Marks the column as auto-incrementing.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Marks the column as part of the primary key.
    #[must_use]
    pub const fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Makes the column generated from `expr`.
    #[must_use]
    pub fn generated(mut self, kind: impl Into<String>, expr: impl Into<String>) -> Self {
        self.generated = Some(kind.into());
        self.default = Some(expr.into());
        self
    }
}

/// The rendered pieces of a column definition.
///
/// Every piece but the name carries its own leading space, so
/// [`ColumnClause::to_sql`] is plain concatenation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnClause {
    /// Escaped column name.
    pub name: String,
    /// Type, length, unsigned and collation.
    pub field_type: String,
    /// ` NULL` or ` NOT NULL`.
    pub null: String,
    /// Default or generated clause.
    pub default: String,
    /// ` ON UPDATE ...`.
    pub on_update: String,
    /// ` COMMENT '...'`.
    pub comment: String,
    /// Dialect auto-increment clause.
    pub auto_increment: String,
}

impl ColumnClause {
    /// Concatenates the pieces.
    #[must_use]
    pub fn to_sql(&self) -> String {
        [
            self.name.as_str(),
            &self.field_type,
            &self.null,
            &self.default,
            &self.on_update,
            &self.comment,
            &self.auto_increment,
        ]
        .concat()
    }
}

/// Normalizes a length/precision specification.
///
/// A list of single-quoted strings (enum/set values) is re-serialized inside
/// parentheses. Anything else loses characters outside `[-0-9,+()[]]` and is
/// wrapped in parentheses when it starts with a digit.
#[must_use]
pub fn process_length(length: &str) -> String {
    if ENUM_LIST.is_match(length) {
        let items: Vec<&str> = ENUM_ITEM
            .find_iter(length)
            .map(|m| m.as_str())
            .collect();
        return format!("({})", items.join(","));
    }
    let stripped = LENGTH_JUNK.replace_all(length, "");
    if stripped.starts_with(|c: char| c.is_ascii_digit()) {
        format!("({stripped})")
    } else {
        stripped.into_owned()
    }
}

fn looks_like_expression(default: &str) -> bool {
    default.starts_with(|c: char| c.is_ascii_alphabetic()) || NUMERIC_LITERAL.is_match(default)
}

impl Grammar {
    /// Renders ` <type><length>[ <unsigned>][ COLLATE <collation>]`.
    #[must_use]
    pub fn field_type_clause(&self, field: &TableFieldDescriptor) -> String {
        let dialect = self.dialect();
        let mut sql = format!(" {}{}", field.field_type, process_length(&field.length));
        if dialect.number_type(&field.field_type)
            && dialect
                .unsigned_keywords()
                .contains(&field.unsigned.as_str())
        {
            sql.push(' ');
            sql.push_str(&field.unsigned);
        }
        if TEXT_TYPE.is_match(&field.field_type) {
            if let Some(collation) = field.collation.as_deref().filter(|c| !c.is_empty()) {
                sql.push_str(&dialect.collation_clause(collation));
            }
        }
        sql
    }

    /// Renders the DEFAULT (or generated column) clause, empty when unset.
    #[must_use]
    pub fn default_value_clause(&self, field: &TableFieldDescriptor) -> String {
        let dialect = self.dialect();
        let Some(default) = field.default.as_deref() else {
            return String::new();
        };
        if let Some(kind) = field
            .generated
            .as_deref()
            .filter(|kind| dialect.generated_kinds().contains(kind))
        {
            return dialect.generated_clause(default, kind);
        }
        let generated_expr = default
            .get(..10)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("GENERATED "));
        let literal = !generated_expr
            && (STRING_TYPE.is_match(&field.field_type) || !looks_like_expression(default));
        if literal {
            let quoted = dialect.quote_literal(default);
            format!(
                " DEFAULT {}",
                dialect.quote_text_default(&field.field_type, quoted)
            )
        } else {
            format!(
                " DEFAULT {}",
                dialect.default_expression(&canonical_timestamp(default))
            )
        }
    }

    /// Assembles the clause pieces of one column.
    ///
    /// `type_field` supplies the type when it differs from `field` (a column
    /// mirroring a referenced column). Returns `None` for a blank name.
    #[must_use]
    pub fn column_clause(
        &self,
        field: &TableFieldDescriptor,
        type_field: Option<&TableFieldDescriptor>,
    ) -> Option<ColumnClause> {
        let name = field.name.trim();
        if name.is_empty() {
            return None;
        }
        let dialect = self.dialect();
        let on_update = field
            .on_update
            .as_deref()
            .map(canonical_timestamp)
            .filter(|action| !action.is_empty());

        let mut clause = ColumnClause {
            name: self.escape_id(name),
            field_type: self.field_type_clause(type_field.unwrap_or(field)),
            null: String::from(if field.null { " NULL" } else { " NOT NULL" }),
            default: self.default_value_clause(field),
            ..ColumnClause::default()
        };
        if let Some(action) = on_update {
            if TIMESTAMP_TYPE.is_match(&field.field_type) {
                clause.on_update = format!(" ON UPDATE {action}");
            }
        }
        if let Some(comment) = field.comment.as_deref().filter(|c| !c.is_empty()) {
            if dialect.supports(Feature::ColumnComment) {
                clause.comment = format!(" COMMENT {}", dialect.quote_literal(comment));
            }
        }
        if field.auto_increment {
            dialect.auto_increment(&mut clause);
        }
        Some(clause)
    }

    /// Renders a CREATE TABLE statement.
    ///
    /// Fields with a blank name are skipped. Primary key columns are
    /// collected into a table constraint unless their auto-increment clause
    /// already declares the key.
    #[must_use]
    pub fn create_table_query(
        &self,
        table: &str,
        fields: &[TableFieldDescriptor],
        foreign_keys: &[ForeignKeyDescriptor],
    ) -> String {
        let mut definitions = Vec::new();
        let mut primary = Vec::new();
        for field in fields {
            let Some(clause) = self.column_clause(field, None) else {
                continue;
            };
            if field.primary && !clause.auto_increment.contains("PRIMARY KEY") {
                primary.push(clause.name.clone());
            }
            definitions.push(format!("    {}", clause.to_sql()));
        }
        if !primary.is_empty() {
            definitions.push(format!("    PRIMARY KEY ({})", primary.join(", ")));
        }
        for foreign_key in foreign_keys {
            definitions.push(format!(
                "    {}",
                self.foreign_key_clause(foreign_key).trim_start()
            ));
        }
        let sql = format!(
            "CREATE TABLE {} (\n{}\n)",
            self.table(table),
            definitions.join(",\n")
        );
        debug!(sql = %sql, "Rendered CREATE TABLE");
        sql
    }

    /// Renders `ALTER TABLE ... ADD <column>`, `None` for a blank name.
    #[must_use]
    pub fn add_column_query(&self, table: &str, field: &TableFieldDescriptor) -> Option<String> {
        let clause = self.column_clause(field, None)?;
        Some(format!(
            "ALTER TABLE {} ADD {}",
            self.table(table),
            clause.to_sql()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{
        GenericDialect, MsSqlDialect, MySqlDialect, PostgresDialect, SqliteDialect,
    };

    #[test]
    fn test_process_length_numeric() {
        assert_eq!(process_length("10,2"), "(10,2)");
        assert_eq!(process_length("255"), "(255)");
        assert_eq!(process_length(" 10 , 2 "), "(10,2)");
        assert_eq!(process_length("(11)"), "(11)");
    }

    #[test]
    fn test_process_length_empty() {
        assert_eq!(process_length(""), "");
        assert_eq!(process_length("abc"), "");
    }

    #[test]
    fn test_process_length_enum() {
        assert_eq!(process_length("'a','b'"), "('a','b')");
        assert_eq!(process_length("('x', 'y''s')"), "('x','y''s')");
        assert_eq!(process_length(r"'a\'b'"), r"('a\'b')");
    }

    #[test]
    fn test_process_length_strips_injection() {
        assert_eq!(process_length("10); DROP TABLE t; --"), "(10)--)");
    }

    #[test]
    fn test_field_type_unsigned() {
        let grammar = Grammar::new(MySqlDialect::new());
        let field = TableFieldDescriptor::new("id", "int").length("10").unsigned("unsigned");
        assert_eq!(grammar.field_type_clause(&field), " int(10) unsigned");

        let bogus = TableFieldDescriptor::new("id", "int").unsigned("signed-ish");
        assert_eq!(grammar.field_type_clause(&bogus), " int");

        let text = TableFieldDescriptor::new("s", "varchar").unsigned("unsigned");
        assert_eq!(grammar.field_type_clause(&text), " varchar");
    }

    #[test]
    fn test_field_type_unsigned_not_accepted_by_postgres() {
        let grammar = Grammar::new(PostgresDialect::new());
        let field = TableFieldDescriptor::new("id", "int").unsigned("unsigned");
        assert_eq!(grammar.field_type_clause(&field), " int");
    }

    #[test]
    fn test_field_type_collation() {
        let field = TableFieldDescriptor::new("s", "varchar")
            .length("50")
            .collation("utf8mb4_bin");
        assert_eq!(
            Grammar::new(MySqlDialect::new()).field_type_clause(&field),
            " varchar(50) COLLATE 'utf8mb4_bin'"
        );
        assert_eq!(
            Grammar::new(MsSqlDialect::new()).field_type_clause(&field),
            " varchar(50) COLLATE utf8mb4_bin"
        );

        let number = TableFieldDescriptor::new("n", "int").collation("utf8mb4_bin");
        assert_eq!(Grammar::new(MySqlDialect::new()).field_type_clause(&number), " int");
    }

    #[test]
    fn test_default_unset() {
        let grammar = Grammar::new(GenericDialect::new());
        assert_eq!(grammar.default_value_clause(&TableFieldDescriptor::new("a", "int")), "");
    }

    #[test]
    fn test_default_number() {
        let grammar = Grammar::new(GenericDialect::new());
        let field = TableFieldDescriptor::new("a", "int").default_value("5");
        assert_eq!(grammar.default_value_clause(&field), " DEFAULT 5");
        let negative = TableFieldDescriptor::new("a", "decimal").default_value("-1.5");
        assert_eq!(grammar.default_value_clause(&negative), " DEFAULT -1.5");
    }

    #[test]
    fn test_default_string_is_quoted() {
        let grammar = Grammar::new(GenericDialect::new());
        let field = TableFieldDescriptor::new("a", "varchar").default_value("abc");
        assert_eq!(grammar.default_value_clause(&field), " DEFAULT 'abc'");
        let digits = TableFieldDescriptor::new("zip", "char").default_value("01234");
        assert_eq!(grammar.default_value_clause(&digits), " DEFAULT '01234'");
    }

    #[test]
    fn test_default_non_expression_is_quoted() {
        let grammar = Grammar::new(GenericDialect::new());
        let field = TableFieldDescriptor::new("d", "date").default_value("2024-01-01");
        assert_eq!(grammar.default_value_clause(&field), " DEFAULT '2024-01-01'");
    }

    #[test]
    fn test_default_expression_passes_through() {
        let grammar = Grammar::new(MySqlDialect::new());
        let field = TableFieldDescriptor::new("t", "timestamp").default_value("current_timestamp()");
        assert_eq!(grammar.default_value_clause(&field), " DEFAULT CURRENT_TIMESTAMP");
        let null = TableFieldDescriptor::new("t", "int").default_value("NULL");
        assert_eq!(grammar.default_value_clause(&null), " DEFAULT NULL");
    }

    #[test]
    fn test_default_dialect_wrapping() {
        let sqlite = Grammar::new(SqliteDialect::new());
        let field = TableFieldDescriptor::new("t", "datetime").default_value("CURRENT_TIMESTAMP");
        assert_eq!(sqlite.default_value_clause(&field), " DEFAULT (CURRENT_TIMESTAMP)");

        let mysql = Grammar::new(MySqlDialect::new());
        let text = TableFieldDescriptor::new("body", "text").default_value("none");
        assert_eq!(mysql.default_value_clause(&text), " DEFAULT ('none')");
    }

    #[test]
    fn test_generated_column() {
        let field = TableFieldDescriptor::new("total", "int").generated("STORED", "a + b");
        assert_eq!(
            Grammar::new(MySqlDialect::new()).default_value_clause(&field),
            " GENERATED ALWAYS AS (a + b) STORED"
        );
        let persisted = TableFieldDescriptor::new("total", "int").generated("PERSISTED", "a + b");
        assert_eq!(
            Grammar::new(MsSqlDialect::new()).default_value_clause(&persisted),
            " AS (a + b) PERSISTED"
        );
    }

    #[test]
    fn test_column_clause_blank_name() {
        let grammar = Grammar::new(MySqlDialect::new());
        assert!(grammar
            .column_clause(&TableFieldDescriptor::new("  ", "int"), None)
            .is_none());
    }

    #[test]
    fn test_column_clause_full() {
        let grammar = Grammar::new(MySqlDialect::new());
        let field = TableFieldDescriptor::new("updated_at", "timestamp")
            .default_value("CURRENT_TIMESTAMP")
            .on_update("current_timestamp()")
            .comment("last change");
        let clause = grammar.column_clause(&field, None).unwrap();
        assert_eq!(clause.name, "`updated_at`");
        assert_eq!(clause.null, " NOT NULL");
        assert_eq!(clause.on_update, " ON UPDATE CURRENT_TIMESTAMP");
        assert_eq!(
            clause.to_sql(),
            "`updated_at` timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP \
             ON UPDATE CURRENT_TIMESTAMP COMMENT 'last change'"
        );
    }

    #[test]
    fn test_on_update_only_for_timestamps() {
        let grammar = Grammar::new(MySqlDialect::new());
        let field = TableFieldDescriptor::new("n", "int").on_update("CURRENT_TIMESTAMP");
        let clause = grammar.column_clause(&field, None).unwrap();
        assert!(clause.on_update.is_empty());
    }

    #[test]
    fn test_comment_requires_feature() {
        let grammar = Grammar::new(PostgresDialect::new());
        let field = TableFieldDescriptor::new("n", "int").nullable().comment("hi");
        let clause = grammar.column_clause(&field, None).unwrap();
        assert_eq!(clause.to_sql(), "\"n\" int NULL");
    }

    #[test]
    fn test_column_clause_type_field() {
        let grammar = Grammar::new(MySqlDialect::new());
        let target = TableFieldDescriptor::new("id", "bigint").unsigned("unsigned");
        let field = TableFieldDescriptor::new("user_id", "int");
        let clause = grammar.column_clause(&field, Some(&target)).unwrap();
        assert_eq!(clause.to_sql(), "`user_id` bigint unsigned NOT NULL");
    }

    #[test]
    fn test_auto_increment_hooks() {
        let field = TableFieldDescriptor::new("id", "bigint").auto_increment();
        let mysql = Grammar::new(MySqlDialect::new()).column_clause(&field, None).unwrap();
        assert_eq!(mysql.to_sql(), "`id` bigint NOT NULL AUTO_INCREMENT");
        let pg = Grammar::new(PostgresDialect::new()).column_clause(&field, None).unwrap();
        assert_eq!(pg.to_sql(), "\"id\" bigserial NOT NULL");
        let sqlite = Grammar::new(SqliteDialect::new()).column_clause(&field, None).unwrap();
        assert_eq!(sqlite.to_sql(), "\"id\" bigint NOT NULL PRIMARY KEY AUTOINCREMENT");
    }

    #[test]
    fn test_create_table() {
        let grammar = Grammar::new(MySqlDialect::new());
        let fields = [
            TableFieldDescriptor::new("id", "int").unsigned("unsigned").auto_increment().primary(),
            TableFieldDescriptor::new("title", "varchar").length("200"),
            TableFieldDescriptor::new("", "int"),
        ];
        assert_eq!(
            grammar.create_table_query("posts", &fields, &[]),
            "CREATE TABLE `posts` (\n    `id` int unsigned NOT NULL AUTO_INCREMENT,\n    \
             `title` varchar(200) NOT NULL,\n    PRIMARY KEY (`id`)\n)"
        );
    }

    #[test]
    fn test_create_table_sqlite_inline_key() {
        let grammar = Grammar::new(SqliteDialect::new());
        let fields = [TableFieldDescriptor::new("id", "integer").auto_increment().primary()];
        let sql = grammar.create_table_query("t", &fields, &[]);
        assert!(!sql.contains("    PRIMARY KEY ("), "{sql}");
    }

    #[test]
    fn test_add_column() {
        let grammar = Grammar::new(PostgresDialect::new());
        let field = TableFieldDescriptor::new("note", "text").nullable();
        assert_eq!(
            grammar.add_column_query("t", &field).as_deref(),
            Some("ALTER TABLE \"t\" ADD \"note\" text NULL")
        );
    }
}
