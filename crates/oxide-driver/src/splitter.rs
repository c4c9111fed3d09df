//! Incremental SQL script splitter.
//!
//! A [`ScriptCursor`] owns the unparsed text of a script and the splitting
//! state (active delimiter, scan offset, statement count). A
//! [`StatementSplitter`] pulls one statement at a time out of a cursor, so a
//! caller can execute each statement before extracting the next and, on
//! failure, still see the exact unparsed tail.
//!
//! The splitter understands quoted strings and identifiers, `/* */`, `-- `
//! and dialect line comments, backslash escapes where the dialect has them,
//! and the client-side `DELIMITER <token>` directive.
//!
//! # Example
//!
//! ```rust
//! use oxide_driver::dialect::MySqlDialect;
//! use oxide_driver::splitter::{ScriptCursor, StatementSplitter};
//!
//! let dialect = MySqlDialect::new();
//! let splitter = StatementSplitter::new(&dialect);
//! let mut cursor = ScriptCursor::new("SELECT ';'; SELECT 2;");
//!
//! let sql: Vec<String> = splitter.statements(&mut cursor).map(|s| s.sql).collect();
//! assert_eq!(sql, ["SELECT ';'", " SELECT 2"]);
//! assert!(cursor.is_done());
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::dialect::Dialect;
use crate::span::Span;

/// Default statement delimiter.
pub const DEFAULT_DELIMITER: &str = ";";

// Ends at the first `*/`.
const BLOCK_COMMENT: &str = r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/";

/// Comment-aware patterns for one set of line comment openers.
#[derive(Debug)]
struct CommentRules {
    directive: Regex,
    trivia: Regex,
    blank: Regex,
}

impl CommentRules {
    fn new(line: &str) -> Self {
        let comment = format!(r"\s|{BLOCK_COMMENT}|(?:{line})[^\n]*\n|--\r?\n");
        Self {
            directive: Regex::new(&format!(r"(?i)^(?:{comment})*DELIMITER\s+(\S+)\s*")).unwrap(),
            trivia: Regex::new(&format!("^(?:{comment})*")).unwrap(),
            blank: Regex::new(&format!(
                r"^(?:\s|{BLOCK_COMMENT}|(?:{line})[^\n]*(?:\n|$)|--\r?\n)*$"
            ))
            .unwrap(),
        }
    }

    fn of(dialect: &dyn Dialect) -> &'static Self {
        if dialect.hash_comments() {
            &HASH_COMMENTS
        } else {
            &STANDARD_COMMENTS
        }
    }
}

static STANDARD_COMMENTS: Lazy<CommentRules> = Lazy::new(|| CommentRules::new("-- "));
static HASH_COMMENTS: Lazy<CommentRules> = Lazy::new(|| CommentRules::new("#|-- "));

/// How a script should be split and executed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitPolicy {
    /// Stop after this many statements.
    pub limit: Option<usize>,
    /// Abort the script at the first failing statement.
    pub stop_on_error: bool,
    /// Report only failing statements.
    pub only_errors: bool,
}

impl SplitPolicy {
    /// Creates a policy that runs everything and reports everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the number of statements.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Aborts at the first error.
    #[must_use]
    pub const fn stop_on_error(mut self, enabled: bool) -> Self {
        self.stop_on_error = enabled;
        self
    }

    /// Reports only errors.
    #[must_use]
    pub const fn only_errors(mut self, enabled: bool) -> Self {
        self.only_errors = enabled;
        self
    }
}

/// One statement extracted from a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement text, without its delimiter.
    pub sql: String,
    /// 1-based position in the script.
    pub number: usize,
    /// The delimiter that ended the statement; `None` at end of input.
    pub delimiter: Option<String>,
    /// Location of `sql` in the original script.
    pub span: Span,
}

/// Where a cursor stands after the last extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorState {
    /// More statements may follow.
    Scanning,
    /// The script is exhausted.
    Done,
    /// A quote or block comment is never closed; the tail stays buffered.
    Incomplete,
    /// A streaming cursor reached the end of its buffer; push more text.
    NeedsInput,
    /// The policy's statement limit was reached.
    LimitReached,
}

/// Mutable parse state of one script.
#[derive(Debug, Clone)]
pub struct ScriptCursor {
    buffer: String,
    offset: usize,
    delimiter: String,
    last: Option<Statement>,
    policy: SplitPolicy,
    consumed: usize,
    produced: usize,
    finished: bool,
    leading: bool,
    state: CursorState,
    scanner: Option<(String, Regex)>,
    closers: HashMap<String, Regex>,
}

impl ScriptCursor {
    /// Creates a cursor over a complete script.
    ///
    /// Leading and trailing whitespace is trimmed; spans still refer to the
    /// untrimmed text.
    #[must_use]
    pub fn new(script: &str) -> Self {
        let mut cursor = Self::streaming();
        cursor.push(script);
        cursor.finish();
        cursor
    }

    /// Creates an empty cursor to be fed with [`ScriptCursor::push`].
    #[must_use]
    pub fn streaming() -> Self {
        Self {
            buffer: String::new(),
            offset: 0,
            delimiter: String::from(DEFAULT_DELIMITER),
            last: None,
            policy: SplitPolicy::default(),
            consumed: 0,
            produced: 0,
            finished: false,
            leading: true,
            state: CursorState::Scanning,
            scanner: None,
            closers: HashMap::new(),
        }
    }

    /// Sets the splitting policy.
    #[must_use]
    pub fn with_policy(mut self, policy: SplitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Appends a chunk of script text.
    ///
    /// Ignored once [`ScriptCursor::finish`] was called.
    pub fn push(&mut self, chunk: &str) {
        if self.finished {
            warn!("Chunk pushed after end of input, ignoring");
            return;
        }
        self.buffer.push_str(chunk);
        if self.leading {
            let trimmed = self.buffer.len() - self.buffer.trim_start().len();
            self.buffer.drain(..trimmed);
            self.consumed += trimmed;
            self.leading = self.buffer.is_empty();
        }
        if self.state == CursorState::NeedsInput {
            self.state = CursorState::Scanning;
        }
    }

    /// Marks the end of input and trims trailing whitespace.
    pub fn finish(&mut self) {
        self.finished = true;
        let end = self.buffer.trim_end().len();
        self.buffer.truncate(end);
        self.offset = self.offset.min(self.buffer.len());
        if self.state == CursorState::NeedsInput {
            self.state = CursorState::Scanning;
        }
    }

    /// Returns the unparsed text.
    #[must_use]
    pub fn remaining(&self) -> &str {
        &self.buffer
    }

    /// Returns the scan offset within [`ScriptCursor::remaining`].
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the active delimiter.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Replaces the active delimiter. Empty delimiters are rejected.
    pub fn set_delimiter(&mut self, delimiter: &str) -> bool {
        if delimiter.is_empty() {
            return false;
        }
        self.delimiter = delimiter.to_string();
        true
    }

    /// Returns the most recently extracted statement.
    #[must_use]
    pub const fn last_statement(&self) -> Option<&Statement> {
        self.last.as_ref()
    }

    /// Returns the splitting policy.
    #[must_use]
    pub const fn policy(&self) -> &SplitPolicy {
        &self.policy
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> CursorState {
        self.state
    }

    /// Returns the number of statements extracted so far.
    #[must_use]
    pub const fn statements_produced(&self) -> usize {
        self.produced
    }

    /// Returns the number of bytes of the original script already consumed.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    /// Returns true once the script was exhausted cleanly.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == CursorState::Done
    }

    /// Returns true if an unterminated quote or comment left a tail behind.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.state == CursorState::Incomplete
    }

    /// Returns true if a streaming cursor waits for more text.
    #[must_use]
    pub fn needs_input(&self) -> bool {
        self.state == CursorState::NeedsInput
    }

    fn scanner(&mut self, fragment: &str) -> Option<Regex> {
        let pattern = format!(
            "{}|['\"]|/\\*|-- {fragment}|$",
            regex::escape(&self.delimiter)
        );
        let stale = self
            .scanner
            .as_ref()
            .map_or(true, |(cached, _)| *cached != pattern);
        if stale {
            match Regex::new(&pattern) {
                Ok(regex) => self.scanner = Some((pattern, regex)),
                Err(err) => {
                    warn!(error = %err, "Invalid splitter pattern");
                    return None;
                }
            }
        }
        self.scanner.as_ref().map(|(_, regex)| regex.clone())
    }

    fn closer(&mut self, pattern: String) -> Option<Regex> {
        if !self.closers.contains_key(&pattern) {
            let regex = Regex::new(&pattern).ok()?;
            self.closers.insert(pattern.clone(), regex);
        }
        self.closers.get(&pattern).cloned()
    }

    /// Waits for more text. Rescans from the buffer start if the text
    /// before `scanned` may still turn out to be a `DELIMITER` directive.
    fn wait_for_input(&mut self, scanned: usize, rules: &CommentRules) {
        if directive_pending(&self.buffer[..scanned], rules) {
            self.offset = 0;
        }
        self.state = CursorState::NeedsInput;
    }

    fn take_statement(&mut self, end: usize, delimiter_len: usize) -> Statement {
        let sql = self.buffer[..end].to_string();
        let span = Span::new(self.consumed, self.consumed + end);
        let delimiter = (delimiter_len > 0).then(|| self.delimiter.clone());
        let drained = end + delimiter_len;
        self.buffer.drain(..drained);
        self.consumed += drained;
        self.offset = 0;
        self.produced += 1;
        self.state = CursorState::Scanning;
        let statement = Statement {
            sql,
            number: self.produced,
            delimiter,
            span,
        };
        self.last = Some(statement.clone());
        statement
    }
}

fn directive_pending(scanned: &str, rules: &CommentRules) -> bool {
    const KEYWORD: &str = "DELIMITER";
    let lead = rules.trivia.find(scanned).map_or(0, |m| m.end());
    let word = scanned[lead..].trim_end();
    // a comment opener cut by the chunk boundary
    if matches!(word, "-" | "--" | "/") {
        return true;
    }
    word.len() <= KEYWORD.len()
        && KEYWORD
            .get(..word.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(word))
}

/// Extracts statements from a [`ScriptCursor`] using a dialect's quoting
/// rules.
#[derive(Debug, Clone, Copy)]
pub struct StatementSplitter<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> StatementSplitter<'d> {
    /// Creates a splitter for `dialect`.
    #[must_use]
    pub const fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Extracts the next statement.
    ///
    /// Returns `None` when no statement is available; the cursor's state
    /// tells whether the script ended, is truncated, needs more input or hit
    /// the statement limit.
    pub fn next_statement(&self, cursor: &mut ScriptCursor) -> Option<Statement> {
        match cursor.state {
            CursorState::Done | CursorState::Incomplete | CursorState::LimitReached => {
                return None;
            }
            CursorState::Scanning | CursorState::NeedsInput => {}
        }
        if cursor
            .policy
            .limit
            .is_some_and(|limit| cursor.produced >= limit)
        {
            cursor.state = CursorState::LimitReached;
            return None;
        }

        let rules = CommentRules::of(self.dialect);
        loop {
            if cursor.buffer.trim().is_empty() {
                if cursor.finished {
                    cursor.consumed += cursor.buffer.len();
                    cursor.buffer.clear();
                    cursor.offset = 0;
                    cursor.state = CursorState::Done;
                    trace!(statements = cursor.produced, "Script exhausted");
                } else {
                    cursor.state = CursorState::NeedsInput;
                }
                return None;
            }

            if cursor.offset == 0 {
                if let Some(caps) = rules.directive.captures(&cursor.buffer) {
                    let end = caps.get(0).map_or(0, |m| m.end());
                    if !cursor.finished && end == cursor.buffer.len() {
                        cursor.state = CursorState::NeedsInput;
                        return None;
                    }
                    let token = caps.get(1).map_or(DEFAULT_DELIMITER, |m| m.as_str());
                    cursor.delimiter = token.to_string();
                    trace!(delimiter = %cursor.delimiter, "Delimiter changed");
                    cursor.buffer.drain(..end);
                    cursor.consumed += end;
                    continue;
                }
            }

            let offset = cursor.offset;
            let fragment = self.dialect.splitter_fragment();
            let Some(scanner) = cursor.scanner(fragment) else {
                cursor.state = CursorState::Incomplete;
                return None;
            };
            let Some(found) = scanner.find_at(&cursor.buffer, offset) else {
                cursor.state = CursorState::Incomplete;
                return None;
            };
            let (start, text) = (found.start(), found.as_str().to_string());

            if text.is_empty() {
                if !cursor.finished {
                    cursor.wait_for_input(start, rules);
                    return None;
                }
                let statement = cursor.take_statement(start, 0);
                debug!(number = statement.number, sql = %statement.sql, "Extracted final statement");
                return Some(statement);
            }

            if text == cursor.delimiter {
                let statement = cursor.take_statement(start, text.len());
                debug!(number = statement.number, sql = %statement.sql, "Extracted statement");
                return Some(statement);
            }

            let prefix = cursor.buffer[..start].chars().next_back();
            if text.starts_with('$') && prefix.is_some_and(|c| c.is_alphanumeric() || c == '_') {
                // `$` inside an identifier such as `a$b$`
                cursor.offset = start + 1;
                continue;
            }
            let c_style = self.dialect.c_style_escapes(prefix);
            let pattern = self.dialect.closer_for(&text, c_style);
            let line_comment = text == "-- " || text == "#";
            let mut position = start + text.len();
            loop {
                let Some(closer) = cursor.closer(pattern.clone()) else {
                    cursor.state = CursorState::Incomplete;
                    return None;
                };
                match closer.find_at(&cursor.buffer, position) {
                    Some(m) if m.as_str().starts_with('\\') => position = m.end(),
                    Some(m) => {
                        position = m.end();
                        break;
                    }
                    None if !cursor.finished => {
                        cursor.wait_for_input(start, rules);
                        return None;
                    }
                    None if line_comment => {
                        position = cursor.buffer.len();
                        break;
                    }
                    None => {
                        trace!(opener = %text, "Unterminated quote or comment");
                        cursor.state = CursorState::Incomplete;
                        return None;
                    }
                }
            }
            cursor.offset = position;
        }
    }

    /// Returns true if `statement` holds only whitespace and comments.
    #[must_use]
    pub fn is_blank(&self, statement: &Statement) -> bool {
        CommentRules::of(self.dialect).blank.is_match(&statement.sql)
    }

    /// Returns an iterator draining statements from `cursor`.
    pub fn statements<'a>(&'a self, cursor: &'a mut ScriptCursor) -> Statements<'a, 'd> {
        Statements {
            splitter: self,
            cursor,
        }
    }

    /// Splits a complete script.
    #[must_use]
    pub fn split(&self, script: &str) -> Vec<Statement> {
        let mut cursor = ScriptCursor::new(script);
        self.statements(&mut cursor).collect()
    }
}

/// Iterator over the statements of a cursor.
#[derive(Debug)]
pub struct Statements<'a, 'd> {
    splitter: &'a StatementSplitter<'d>,
    cursor: &'a mut ScriptCursor,
}

impl Iterator for Statements<'_, '_> {
    type Item = Statement;

    fn next(&mut self) -> Option<Statement> {
        self.splitter.next_statement(self.cursor)
    }
}
