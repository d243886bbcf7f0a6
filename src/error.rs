//! ledlink error types.
//!
//! Errors fall in two scopes:
//!
//! - **Per line**: [`ParseError`] and [`ValidationError`] describe a single
//!   malformed or unacceptable message. The session keeps running.
//! - **Per session**: [`LedError::Disconnected`] and
//!   [`LedError::ConnectFailed`] end the session. They are reported exactly
//!   once and never retried at this layer.

use thiserror::Error;

use crate::codec::join_natural;

/// Longest residue quoted verbatim in a [`ParseError::Unrecognized`] message.
const QUOTE_LIMIT: usize = 16;

/// A line that does not satisfy the wire grammar.
///
/// Every variant carries the full original line so the report can be logged
/// without further context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The tokenizer stopped before the end of the line.
    #[error("unrecognized input {} in '{line}'", quote(.fragment))]
    Unrecognized {
        /// Unconsumed remainder of the line.
        fragment: String,
        /// Full original line.
        line: String,
    },

    /// The token sequence does not follow the grammar.
    #[error("expected {expected} but got {found} in '{line}'")]
    Unexpected {
        /// Human readable list of acceptable tokens.
        expected: String,
        /// What was found instead.
        found: String,
        /// Full original line.
        line: String,
    },

    /// A decimal literal does not fit its target integer type.
    #[error("number {digits} out of range in '{line}'")]
    NumberOutOfRange {
        /// The offending digits.
        digits: String,
        /// Full original line.
        line: String,
    },

    /// An object range whose start lies past its end.
    #[error("descending object range {range} in '{line}'")]
    DescendingRange {
        /// The offending `a-b` item.
        range: String,
        /// Full original line.
        line: String,
    },

    /// An object range that would expand to too many members.
    #[error("object range {range} spans more than {limit} objects in '{line}'")]
    RangeTooLarge {
        /// The offending `a-b` item.
        range: String,
        /// Maximum number of members per range.
        limit: u32,
        /// Full original line.
        line: String,
    },

    /// Buffered input grew past the line limit without a terminator.
    #[error("line of {len} bytes exceeds the {limit} byte limit")]
    LineTooLong {
        /// Bytes discarded.
        len: usize,
        /// Configured limit.
        limit: usize,
    },
}

/// A syntactically valid message that fails a handler's contract.
///
/// Holds every violation found, never only the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation error in {prefixes} message - {}", join_natural(.violations, "and"))]
pub struct ValidationError {
    /// `:type[:subtype]` of the rejected message.
    pub prefixes: String,
    /// One entry per violated rule.
    pub violations: Vec<String>,
}

/// ledlink errors.
#[derive(Error, Debug)]
pub enum LedError {
    /// Malformed protocol line.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Message rejected by a contract.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Message cannot be constructed as requested.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Bare-name lookup of a value that is not present.
    #[error("Missing key: {0}")]
    MissingKey(String),

    /// The non-blocking connect did not complete.
    #[error("Connect to {addr} failed: {source}")]
    ConnectFailed {
        /// `host:port` that was dialed.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The session is closed; no further I/O will happen on it.
    #[error("Disconnected ({unsent} unsent bytes dropped)")]
    Disconnected {
        /// Outbound bytes still queued when the session ended.
        unsent: usize,
    },

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LedError::ConnectFailed { .. } | LedError::Disconnected { .. } | LedError::Io(_)
        )
    }
}

/// Result type alias for ledlink operations
pub type Result<T> = std::result::Result<T, LedError>;

impl From<toml::de::Error> for LedError {
    fn from(err: toml::de::Error) -> Self {
        LedError::Config(err.to_string())
    }
}

fn quote(fragment: &str) -> String {
    match fragment.char_indices().nth(QUOTE_LIMIT) {
        Some((cut, _)) => format!("'{}'...", &fragment[..cut]),
        None => format!("'{fragment}'"),
    }
}
