//! Chunked splitting of scripts read from any source.

use std::io::Read;

use oxide_driver::error::truncate_query;
use oxide_driver::splitter::{
    CursorState, ScriptCursor, SplitPolicy, Statement, StatementSplitter, DEFAULT_DELIMITER,
};
use oxide_driver::Dialect;
use tracing::debug;

use crate::error::{CliError, Result};

/// Bytes read from the input per chunk.
pub const CHUNK_SIZE: usize = 100_000;

const PREVIEW_LEN: usize = 80;

/// Splits everything `reader` yields and hands each statement to `emit`.
///
/// The input is pushed into a streaming cursor `chunk_size` bytes at a time.
/// A multi-byte character cut by a chunk boundary is carried over to the
/// next read. Returns the number of statements emitted.
pub fn split_reader<R, F>(
    dialect: &dyn Dialect,
    mut reader: R,
    policy: SplitPolicy,
    chunk_size: usize,
    mut emit: F,
) -> Result<usize>
where
    R: Read,
    F: FnMut(&Statement) -> Result<()>,
{
    let splitter = StatementSplitter::new(dialect);
    let mut cursor = ScriptCursor::streaming().with_policy(policy);
    let mut chunk = vec![0; chunk_size.max(4)];
    let mut pending = Vec::new();
    let mut read_total = 0;
    let mut emitted = 0;

    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        read_total += read;
        pending.extend_from_slice(&chunk[..read]);
        let base = read_total - pending.len();
        let valid = match std::str::from_utf8(&pending) {
            Ok(text) => text.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(err) => return Err(CliError::InvalidUtf8(base + err.valid_up_to())),
        };
        let tail = pending.split_off(valid);
        let text = String::from_utf8(std::mem::replace(&mut pending, tail))
            .map_err(|err| CliError::InvalidUtf8(base + err.utf8_error().valid_up_to()))?;
        debug!(bytes = text.len(), carried = pending.len(), "Pushing chunk");
        cursor.push(&text);
        emitted += drain(&splitter, &mut cursor, &mut emit)?;
        if cursor.state() == CursorState::LimitReached {
            return Ok(emitted);
        }
    }
    if !pending.is_empty() {
        return Err(CliError::InvalidUtf8(read_total - pending.len()));
    }

    cursor.finish();
    emitted += drain(&splitter, &mut cursor, &mut emit)?;
    if cursor.is_incomplete() {
        return Err(CliError::Unterminated {
            offset: cursor.consumed(),
            preview: truncate_query(cursor.remaining(), PREVIEW_LEN),
        });
    }
    Ok(emitted)
}

fn drain<F>(
    splitter: &StatementSplitter<'_>,
    cursor: &mut ScriptCursor,
    emit: &mut F,
) -> Result<usize>
where
    F: FnMut(&Statement) -> Result<()>,
{
    let mut count = 0;
    while let Some(statement) = splitter.next_statement(cursor) {
        if splitter.is_blank(&statement) {
            continue;
        }
        emit(&statement)?;
        count += 1;
    }
    Ok(count)
}

/// Renders a statement back as script text.
///
/// Statements split on a custom delimiter are wrapped in `DELIMITER`
/// directives so the output can be replayed by a MySQL client.
#[must_use]
pub fn to_script(statement: &Statement) -> String {
    let sql = statement.sql.trim();
    match statement.delimiter.as_deref() {
        Some(delimiter) if delimiter != DEFAULT_DELIMITER => {
            format!("DELIMITER {delimiter}\n{sql}{delimiter}\nDELIMITER ;\n")
        }
        _ => format!("{sql};\n"),
    }
}
