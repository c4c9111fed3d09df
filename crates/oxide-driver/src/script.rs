//! Runs a multi-statement script one statement at a time.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::connection::{Connection, QueryResult, ResultSet};
use crate::dialect::Feature;
use crate::executor::QueryExecutor;
use crate::span::Span;
use crate::splitter::{CursorState, ScriptCursor, StatementSplitter};

/// Result of one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatementOutcome {
    /// The statement succeeded.
    Ok {
        /// Rows affected, for statements without a result set.
        affected: Option<u64>,
        /// Rows returned, for statements with a result set.
        rows: Option<usize>,
    },
    /// The statement failed or was rejected.
    Err {
        /// Error text.
        message: String,
    },
}

impl StatementOutcome {
    /// Returns true for a failure.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Err { .. })
    }
}

/// Report entry for one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementReport {
    /// 1-based position in the script.
    pub number: usize,
    /// Statement text.
    pub sql: String,
    /// Location in the script.
    pub span: Span,
    /// What happened.
    pub outcome: StatementOutcome,
}

/// How a script run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptEnd {
    /// Every statement was extracted.
    Clean,
    /// An unterminated quote or comment left a tail unexecuted.
    Truncated,
    /// Execution stopped at a failing statement.
    Aborted,
    /// The statement limit was reached.
    LimitReached,
}

/// Summary of a script run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptReport {
    /// Reported statements (only failures under `only_errors`).
    pub statements: Vec<StatementReport>,
    /// Number of statements executed or rejected.
    pub executed: usize,
    /// Number of failures.
    pub errors: usize,
    /// How the run ended.
    pub end: ScriptEnd,
}

impl ScriptReport {
    /// Returns true if every statement ran and none failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors == 0 && self.end == ScriptEnd::Clean
    }
}

/// Drives a splitter and an executor together.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptRunner;

impl ScriptRunner {
    /// Creates a runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes every statement of `cursor` under its policy.
    ///
    /// On abort or truncation the unparsed text stays in the cursor.
    pub fn run<C: Connection>(
        &self,
        cursor: &mut ScriptCursor,
        executor: &mut QueryExecutor<C>,
    ) -> ScriptReport {
        let policy = cursor.policy().clone();
        let reject_attach = executor.grammar().dialect().supports(Feature::RejectAttach);
        let mut report = ScriptReport {
            statements: Vec::new(),
            executed: 0,
            errors: 0,
            end: ScriptEnd::Clean,
        };

        loop {
            let (statement, blank) = {
                let splitter = StatementSplitter::new(executor.grammar().dialect());
                let statement = splitter.next_statement(cursor);
                let blank = statement
                    .as_ref()
                    .is_some_and(|statement| splitter.is_blank(statement));
                (statement, blank)
            };
            let Some(statement) = statement else {
                break;
            };
            if blank {
                continue;
            }

            let outcome = if reject_attach && is_attach(&statement.sql) {
                warn!(sql = %statement.sql, "ATTACH is not supported, skipping");
                StatementOutcome::Err {
                    message: String::from("ATTACH queries are not supported."),
                }
            } else {
                match executor.query(&statement.sql) {
                    QueryResult::Rows(rows) => StatementOutcome::Ok {
                        affected: None,
                        rows: Some(rows.row_count()),
                    },
                    QueryResult::Affected(count) => StatementOutcome::Ok {
                        affected: Some(count),
                        rows: None,
                    },
                    QueryResult::Failed => StatementOutcome::Err {
                        message: executor.connection().error(),
                    },
                }
            };

            report.executed += 1;
            let failed = outcome.is_err();
            if failed {
                report.errors += 1;
            }
            if failed || !policy.only_errors {
                report.statements.push(StatementReport {
                    number: statement.number,
                    sql: statement.sql,
                    span: statement.span,
                    outcome,
                });
            }
            if failed && policy.stop_on_error {
                report.end = ScriptEnd::Aborted;
                break;
            }
        }

        if report.end != ScriptEnd::Aborted {
            report.end = match cursor.state() {
                CursorState::Incomplete | CursorState::NeedsInput => ScriptEnd::Truncated,
                CursorState::LimitReached => ScriptEnd::LimitReached,
                CursorState::Done | CursorState::Scanning => ScriptEnd::Clean,
            };
        }

        info!(
            executed = report.executed,
            errors = report.errors,
            end = ?report.end,
            "Script finished"
        );
        report
    }
}

fn is_attach(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|verb| verb.eq_ignore_ascii_case("ATTACH"))
}
