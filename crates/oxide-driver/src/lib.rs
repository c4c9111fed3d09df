//! # oxide-driver
//!
//! The SQL-generation and script-splitting core of a multi-dialect database
//! administration toolkit.
//!
//! This crate provides:
//! - Identifier escaping per dialect (MySQL, PostgreSQL, SQLite, MSSQL)
//! - A grammar that renders SELECT/INSERT/UPDATE/DELETE and DDL fragments
//!   from structured descriptors
//! - An incremental statement splitter with `DELIMITER` support
//! - A query executor shim over a pluggable [`Connection`]
//!
//! Nothing here opens a connection. Callers implement [`Connection`] for
//! their driver and hand it to a [`QueryExecutor`].
//!
//! ## Rendering
//!
//! ```rust
//! use oxide_driver::dialect::PostgresDialect;
//! use oxide_driver::grammar::Grammar;
//!
//! let grammar = Grammar::new(PostgresDialect::new());
//! assert_eq!(
//!     grammar.delete_query("orders", "\"id\" = 7", true),
//!     "DELETE FROM \"orders\" WHERE ctid = (SELECT ctid FROM \"orders\" WHERE \"id\" = 7 LIMIT 1)"
//! );
//! ```
//!
//! ## Splitting
//!
//! ```rust
//! use oxide_driver::dialect::MySqlDialect;
//! use oxide_driver::splitter::{ScriptCursor, StatementSplitter};
//!
//! let dialect = MySqlDialect::new();
//! let splitter = StatementSplitter::new(&dialect);
//! let mut cursor = ScriptCursor::new("DELIMITER //\nSELECT 1//\nDELIMITER ;\n");
//!
//! assert_eq!(splitter.next_statement(&mut cursor).unwrap().sql, "SELECT 1");
//! assert!(splitter.next_statement(&mut cursor).is_none());
//! assert!(cursor.is_done());
//! ```

pub mod connection;
pub mod dialect;
pub mod error;
pub mod escape;
pub mod executor;
pub mod grammar;
pub mod script;
pub mod span;
pub mod splitter;
pub mod value;

pub use connection::{Connection, QueryResult, ResultSet};
pub use dialect::{dialect_for, Dialect, Feature};
pub use error::{DriverError, Result};
pub use executor::{QueryExecutor, QueryRecord};
pub use grammar::{Grammar, Session};
pub use script::{ScriptReport, ScriptRunner};
pub use span::Span;
pub use splitter::{ScriptCursor, SplitPolicy, Statement, StatementSplitter};
pub use value::SqlValue;
