use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::session::{Encoding, Session};

/// How a database file is opened.
///
/// `WRITE` takes precedence over `READ`: a session asked for both opens
/// read-write. URI file names are always accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpenFlags(u32);

impl OpenFlags {
    pub const READ: OpenFlags = OpenFlags(1);
    pub const WRITE: OpenFlags = OpenFlags(2);
    pub const CREATE: OpenFlags = OpenFlags(4);

    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn contains(self, other: OpenFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub(crate) fn to_rusqlite(self) -> rusqlite::OpenFlags {
        let mut flags = rusqlite::OpenFlags::SQLITE_OPEN_URI | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.contains(OpenFlags::WRITE) {
            flags |= rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE;
        } else if self.contains(OpenFlags::READ) {
            flags |= rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY;
        }
        if self.contains(OpenFlags::CREATE) {
            flags |= rusqlite::OpenFlags::SQLITE_OPEN_CREATE;
        }
        flags
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE
    }
}

impl BitOr for OpenFlags {
    type Output = OpenFlags;

    fn bitor(self, rhs: OpenFlags) -> OpenFlags {
        OpenFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenFlags {
    fn bitor_assign(&mut self, rhs: OpenFlags) {
        self.0 |= rhs.0;
    }
}

/// Options for opening a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// File name or `file:` URI; `:memory:` for a private in-memory database.
    pub path: String,
    #[serde(default)]
    pub flags: OpenFlags,
    /// Encoding for a newly created database. Ignored once the database has content.
    #[serde(default)]
    pub encoding: Encoding,
}

impl SessionOptions {
    #[must_use]
    pub fn new(path: String) -> Self {
        Self {
            path,
            flags: OpenFlags::default(),
            encoding: Encoding::Unknown,
        }
    }

    /// Parse options from JSON, e.g. `{"path": "app.db", "flags": 1}`.
    ///
    /// # Errors
    /// Returns [`DbError::ConfigError`] for malformed JSON or an empty path.
    pub fn from_json(json: &str) -> Result<Self, DbError> {
        let opts: SessionOptions = serde_json::from_str(json)?;
        if opts.path.is_empty() {
            return Err(DbError::ConfigError("path must not be empty".into()));
        }
        Ok(opts)
    }

    #[must_use]
    pub fn with_flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Fluent builder for [`SessionOptions`].
#[derive(Debug, Clone)]
pub struct SessionOptionsBuilder {
    opts: SessionOptions,
}

impl SessionOptionsBuilder {
    #[must_use]
    pub fn new(path: String) -> Self {
        Self {
            opts: SessionOptions::new(path),
        }
    }

    #[must_use]
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.opts.flags = flags;
        self
    }

    /// Open without write access; the file must exist.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.opts.flags = OpenFlags::READ;
        self
    }

    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.opts.encoding = encoding;
        self
    }

    #[must_use]
    pub fn finish(self) -> SessionOptions {
        self.opts
    }

    /// Open a session with the built options.
    ///
    /// # Errors
    /// Returns the engine error if the database cannot be opened or its
    /// encoding cannot be set.
    pub fn open(self) -> Result<Session, DbError> {
        Session::from_options(&self.finish())
    }
}
