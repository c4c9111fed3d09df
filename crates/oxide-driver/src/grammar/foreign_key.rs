//! Foreign key clause rendering.

use serde::{Deserialize, Serialize};

use super::Grammar;

/// A foreign key from `source` columns to `target` columns of another table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKeyDescriptor {
    /// Referencing columns.
    pub source: Vec<String>,
    /// Referenced columns.
    pub target: Vec<String>,
    /// Referenced table.
    pub table: String,
    /// Referenced schema, if not the current one.
    pub schema: Option<String>,
    /// Referenced database, if not the current one.
    pub database: Option<String>,
    /// ON DELETE action.
    pub on_delete: Option<String>,
    /// ON UPDATE action.
    pub on_update: Option<String>,
}

impl ForeignKeyDescriptor {
    /// Creates a foreign key referencing `table`.
    #[must_use]
    pub fn new<S, T>(source: S, table: impl Into<String>, target: T) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            source: source.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
            table: table.into(),
            ..Self::default()
        }
    }

    /// Sets the referenced database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the referenced schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: impl Into<String>) -> Self {
        self.on_delete = Some(action.into());
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: impl Into<String>) -> Self {
        self.on_update = Some(action.into());
        self
    }
}

impl Grammar {
    /// Renders ` FOREIGN KEY (...) REFERENCES ... (...)` with its actions.
    ///
    /// The database and schema prefixes appear only when they differ from
    /// the session's. Actions outside the dialect's allow-list are dropped.
    #[must_use]
    pub fn foreign_key_clause(&self, foreign_key: &ForeignKeyDescriptor) -> String {
        let escape_all = |columns: &[String]| -> String {
            columns
                .iter()
                .map(|column| self.escape_id(column))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!(" FOREIGN KEY ({}) REFERENCES ", escape_all(&foreign_key.source));
        let session = self.session();
        if let Some(database) = foreign_key.database.as_deref().filter(|db| {
            !db.is_empty() && session.database.as_deref() != Some(*db)
        }) {
            sql.push_str(&self.escape_id(database));
            sql.push('.');
        }
        if let Some(schema) = foreign_key.schema.as_deref().filter(|ns| {
            !ns.is_empty() && session.schema.as_deref() != Some(*ns)
        }) {
            sql.push_str(&self.escape_id(schema));
            sql.push('.');
        }
        sql.push_str(&self.table(&foreign_key.table));
        sql.push_str(&format!(" ({})", escape_all(&foreign_key.target)));

        let actions = self.dialect().on_actions();
        if let Some(action) = foreign_key.on_delete.as_deref().filter(|a| actions.contains(a)) {
            sql.push_str(" ON DELETE ");
            sql.push_str(action);
        }
        if let Some(action) = foreign_key.on_update.as_deref().filter(|a| actions.contains(a)) {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action);
        }
        sql
    }
}
