#![allow(dead_code)]

use std::collections::VecDeque;

use oxide_driver::connection::{Connection, QueryResult, ResultSet};
use oxide_driver::value::{AssocRow, Row, SqlValue};

/// A canned reply to a statement.
#[derive(Debug, Clone)]
pub enum Reply {
    Rows(Vec<String>, Vec<Row>),
    Affected(u64),
    Error(String),
}

/// Rows served by [`MockConnection`].
#[derive(Debug, Clone)]
pub struct MockRows {
    columns: Vec<String>,
    rows: VecDeque<Row>,
    count: usize,
}

impl MockRows {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            count: rows.len(),
            rows: rows.into(),
        }
    }
}

impl ResultSet for MockRows {
    fn row_count(&self) -> usize {
        self.count
    }

    fn fetch_row(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    fn fetch_assoc(&mut self) -> Option<AssocRow> {
        let row = self.rows.pop_front()?;
        Some(self.columns.iter().cloned().zip(row).collect())
    }
}

/// In-memory connection replying from a script of `(needle, reply)` pairs.
///
/// The first pair whose needle occurs in the SQL wins; unmatched statements
/// succeed with zero affected rows.
#[derive(Debug, Default)]
pub struct MockConnection {
    replies: Vec<(String, Reply)>,
    results: VecDeque<Reply>,
    pub executed: Vec<String>,
    last_error: String,
    server_info: String,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            server_info: String::from("8.0.36"),
            ..Self::default()
        }
    }

    pub fn with_server_info(mut self, version: &str) -> Self {
        self.server_info = version.to_string();
        self
    }

    pub fn reply(mut self, needle: &str, reply: Reply) -> Self {
        self.replies.push((needle.to_string(), reply));
        self
    }

    pub fn rows(self, needle: &str, columns: &[&str], rows: Vec<Row>) -> Self {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.reply(needle, Reply::Rows(columns, rows))
    }

    pub fn fail(self, needle: &str, message: &str) -> Self {
        self.reply(needle, Reply::Error(message.to_string()))
    }

    /// Queues results for `store_result` / `next_result`.
    pub fn multi(mut self, results: Vec<Reply>) -> Self {
        self.results = results.into();
        self
    }

    fn answer(&mut self, reply: Reply) -> QueryResult<MockRows> {
        match reply {
            Reply::Rows(columns, rows) => QueryResult::Rows(MockRows::new(columns, rows)),
            Reply::Affected(count) => QueryResult::Affected(count),
            Reply::Error(message) => {
                self.last_error = message;
                QueryResult::Failed
            }
        }
    }
}

impl Connection for MockConnection {
    type Rows = MockRows;

    fn query(&mut self, sql: &str) -> QueryResult<MockRows> {
        self.executed.push(sql.to_string());
        let reply = self
            .replies
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map_or(Reply::Affected(0), |(_, reply)| reply.clone());
        self.answer(reply)
    }

    fn quote(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn error(&self) -> String {
        self.last_error.clone()
    }

    fn server_info(&self) -> String {
        self.server_info.clone()
    }

    fn store_result(&mut self) -> Option<QueryResult<MockRows>> {
        let reply = self.results.front()?.clone();
        Some(self.answer(reply))
    }

    fn next_result(&mut self) -> bool {
        self.results.pop_front();
        !self.results.is_empty()
    }
}

pub fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}

pub fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
