use std::os::raw::c_int;

use thiserror::Error;

/// Every failure surfaced by the binding layer.
///
/// All variants carry a numeric code (see [`DbError::code`]) and a message,
/// so callers that only care about "what did the engine say" can treat them
/// uniformly. The library-specific kinds use small negative codes that never
/// collide with `SQLite` result codes.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("nested transactions are not supported")]
    NestedTransactionNotSupported,

    #[error("no such column '{0}'")]
    NoSuchColumn(String),

    #[error("session not open")]
    SessionNotOpen,

    #[error("only one statement is supported")]
    MultiStatementNotSupported,

    /// A non-benign status reported by the engine.
    #[error("{message} (code {code})")]
    Engine { code: c_int, message: String },

    /// A `rusqlite` failure that did not come from the engine itself.
    #[error(transparent)]
    SqliteError(rusqlite::Error),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DbError {
    /// Native engine code, or the library code for errors raised by this crate.
    #[must_use]
    pub fn code(&self) -> c_int {
        match self {
            DbError::NestedTransactionNotSupported => -1,
            DbError::NoSuchColumn(_) => -2,
            DbError::SessionNotOpen => -3,
            DbError::MultiStatementNotSupported => -4,
            DbError::Engine { code, .. } => *code,
            DbError::SqliteError(_) => -5,
            DbError::Conversion(_) => -6,
            DbError::InvalidArgument(_) => -7,
            DbError::ConfigError(_) => -8,
        }
    }

    /// Engine error for an API called in the wrong state (`SQLITE_MISUSE`).
    pub(crate) fn misuse(message: &str) -> Self {
        DbError::Engine {
            code: rusqlite::ffi::SQLITE_MISUSE,
            message: message.to_owned(),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, message) => DbError::Engine {
                code: failure.extended_code,
                message: message.unwrap_or_else(|| crate::raw::errstr(failure.extended_code)),
            },
            other => DbError::SqliteError(other),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::ConfigError(format!("invalid JSON: {err}"))
    }
}
