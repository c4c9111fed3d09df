//! Error types for the driver core.

/// Maximum number of bytes of SQL echoed back in an execution failure.
pub const MAX_ECHOED_QUERY: usize = 1_000_000;

/// Errors raised by the driver core.
///
/// Rendering never fails; only statement execution and dialect lookup do.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// A statement did not succeed on the connection.
    #[error("{message}\n{query}")]
    Execution {
        /// Last error text reported by the connection.
        message: String,
        /// The offending statement, truncated to [`MAX_ECHOED_QUERY`] bytes.
        query: String,
    },

    /// No dialect is registered under the given name.
    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),
}

impl DriverError {
    /// Builds an execution failure, truncating the echoed SQL.
    #[must_use]
    pub fn execution(message: impl Into<String>, query: &str) -> Self {
        Self::Execution {
            message: message.into(),
            query: truncate_query(query, MAX_ECHOED_QUERY),
        }
    }
}

/// Shortens `query` to at most `max` bytes on a character boundary,
/// appending an ellipsis when anything was cut.
#[must_use]
pub fn truncate_query(query: &str, max: usize) -> String {
    if query.len() <= max {
        return query.to_string();
    }
    let mut end = max;
    while !query.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &query[..end])
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_query_is_kept() {
        assert_eq!(truncate_query("SELECT 1", 100), "SELECT 1");
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // "é" is two bytes; cutting at 2 would split it
        let truncated = truncate_query("aé", 2);
        assert_eq!(truncated, "a…");
    }

    #[test]
    fn test_execution_error_display() {
        let err = DriverError::execution("Table 'x' doesn't exist", "SELECT * FROM x");
        assert_eq!(err.to_string(), "Table 'x' doesn't exist\nSELECT * FROM x");
    }

    #[test]
    fn test_execution_error_caps_query() {
        let long = "x".repeat(MAX_ECHOED_QUERY + 10);
        match DriverError::execution("boom", &long) {
            DriverError::Execution { query, .. } => {
                assert!(query.ends_with('…'));
                assert_eq!(query.len(), MAX_ECHOED_QUERY + '…'.len_utf8());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
