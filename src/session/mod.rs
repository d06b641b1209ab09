//! Database sessions.

use std::cell::Cell;
use std::os::raw::c_int;
use std::path::Path;

use rusqlite::{Connection, ffi};

use crate::binders::into;
use crate::error::DbError;
use crate::query::Query;
use crate::raw;
use crate::statement::Statement;
use crate::transaction::{Transaction, TransactionKind};

mod config;
mod encoding;
mod once;

pub use config::{OpenFlags, SessionOptions, SessionOptionsBuilder};
pub use encoding::Encoding;
pub use once::OnceQuery;

/// One connection to a database.
///
/// A session is either closed or open. Statements and transactions borrow
/// it, so it cannot be closed, reopened or dropped while either is alive.
///
/// ```rust
/// use sqlite_binder::prelude::*;
///
/// # fn main() -> Result<(), DbError> {
/// let mut se = Session::new();
/// assert!(!se.is_open());
/// se.reopen(":memory:", OpenFlags::default())?;
/// se.execute_sql("create table t (x integer)")?;
/// se.execute_sql("insert into t values (1)")?;
/// assert_eq!(se.last_insert_rowid(), 1);
/// se.close()?;
/// assert!(matches!(se.execute_sql("select 1"), Err(DbError::SessionNotOpen)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Session {
    conn: Option<Connection>,
    active_txn: Cell<Option<TransactionKind>>,
    last_exec: Cell<bool>,
}

impl Session {
    /// A closed session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` (a file name, `file:` URI or `:memory:`).
    ///
    /// # Errors
    /// Returns the engine error if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>, flags: OpenFlags) -> Result<Self, DbError> {
        let mut session = Self::new();
        session.reopen(path, flags)?;
        Ok(session)
    }

    /// Open `path` and request `encoding` for a new database.
    ///
    /// # Errors
    /// Returns the engine error if the database cannot be opened or the
    /// encoding pragma fails.
    pub fn open_with_encoding(
        path: impl AsRef<Path>,
        encoding: Encoding,
        flags: OpenFlags,
    ) -> Result<Self, DbError> {
        let session = Self::open(path, flags)?;
        session.set_encoding(encoding)?;
        Ok(session)
    }

    /// Private in-memory database.
    ///
    /// # Errors
    /// Returns the engine error if the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::open(":memory:", OpenFlags::default())
    }

    /// # Errors
    /// As [`Session::open_with_encoding`].
    pub fn from_options(opts: &SessionOptions) -> Result<Self, DbError> {
        Self::open_with_encoding(&opts.path, opts.encoding, opts.flags)
    }

    /// Close the current connection, if any, and open `path`.
    ///
    /// # Errors
    /// Returns the close error, or the engine error if the database cannot be
    /// opened (the session is then closed).
    pub fn reopen(&mut self, path: impl AsRef<Path>, flags: OpenFlags) -> Result<(), DbError> {
        self.close()?;
        let path = path.as_ref();
        let conn = Connection::open_with_flags(path, flags.to_rusqlite())?;
        tracing::debug!(path = %path.display(), flags = flags.bits(), "opened session");
        self.conn = Some(conn);
        Ok(())
    }

    /// Close the connection. Closing a closed session does nothing.
    ///
    /// # Errors
    /// Returns the engine error if the connection refuses to close; the
    /// session then stays open.
    pub fn close(&mut self) -> Result<(), DbError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        if let Err((conn, err)) = conn.close() {
            self.conn = Some(conn);
            return Err(err.into());
        }
        self.active_txn.set(None);
        self.last_exec.set(false);
        tracing::debug!("closed session");
        Ok(())
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// The underlying connection, for anything this crate does not wrap.
    #[must_use]
    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    pub(crate) fn conn(&self) -> Result<&Connection, DbError> {
        self.conn.as_ref().ok_or(DbError::SessionNotOpen)
    }

    /// Kind of the transaction currently running through this session.
    #[must_use]
    pub fn active_txn(&self) -> Option<TransactionKind> {
        self.active_txn.get()
    }

    pub(crate) fn set_active_txn(&self, kind: Option<TransactionKind>) {
        self.active_txn.set(kind);
    }

    /// Outcome of the most recent [`Statement::exec`] on this session.
    #[must_use]
    pub fn last_exec(&self) -> bool {
        self.last_exec.get()
    }

    pub(crate) fn set_last_exec(&self, row: bool) {
        self.last_exec.set(row);
    }

    /// Turn an engine status into a result.
    ///
    /// `OK`, `ROW` and `DONE` (including their extended forms) succeed.
    /// `MISUSE` carries the fixed description of the code, since the
    /// connection message may be stale; anything else carries the
    /// connection's current message.
    ///
    /// # Errors
    /// [`DbError::SessionNotOpen`] if the session is closed, otherwise
    /// [`DbError::Engine`] for any non-benign code.
    pub fn check_error(&self, code: c_int) -> Result<(), DbError> {
        let conn = self.conn()?;
        match code & 0xff {
            ffi::SQLITE_OK | ffi::SQLITE_ROW | ffi::SQLITE_DONE => Ok(()),
            ffi::SQLITE_MISUSE => Err(DbError::Engine {
                code,
                message: raw::errstr(code),
            }),
            _ => Err(DbError::Engine {
                code,
                message: raw::errmsg(conn),
            }),
        }
    }

    /// [`Session::check_error`] applied to [`Session::last_error`].
    ///
    /// # Errors
    /// As [`Session::check_error`].
    pub fn check_last_error(&self) -> Result<(), DbError> {
        self.check_error(self.last_error())
    }

    /// Extended code of the most recent engine call; `SQLITE_OK` when closed.
    #[must_use]
    pub fn last_error(&self) -> c_int {
        self.conn.as_ref().map_or(ffi::SQLITE_OK, raw::extended_errcode)
    }

    /// Row id of the most recent successful insert; 0 when closed.
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.as_ref().map_or(0, raw::last_insert_rowid)
    }

    /// Rows changed by the most recent insert, update or delete; 0 when closed.
    #[must_use]
    pub fn last_changes(&self) -> u64 {
        self.conn.as_ref().map_or(0, raw::changes)
    }

    /// Rows changed since the connection was opened; 0 when closed.
    #[must_use]
    pub fn total_changes(&self) -> u64 {
        self.conn.as_ref().map_or(0, raw::total_changes)
    }

    /// Current database encoding.
    ///
    /// # Errors
    /// Returns [`DbError::SessionNotOpen`] or the engine error from the pragma.
    pub fn encoding(&self) -> Result<Encoding, DbError> {
        let mut name = String::new();
        let mut st = Statement::with_sql(self, "pragma encoding");
        st.query_mut().put(into(&mut name))?;
        st.exec()?;
        drop(st);
        Ok(Encoding::parse(&name))
    }

    fn set_encoding(&self, encoding: Encoding) -> Result<(), DbError> {
        if encoding == Encoding::Unknown {
            return Ok(());
        }
        self.execute_sql(&format!("pragma encoding = \"{}\"", encoding.as_str()))?;
        Ok(())
    }

    /// Start a one-shot query.
    ///
    /// ```rust
    /// use sqlite_binder::prelude::*;
    ///
    /// # fn main() -> Result<(), DbError> {
    /// let se = Session::open_in_memory()?;
    /// se.execute_sql("create table kv (k text, v integer)")?;
    /// se.once("insert into kv values (:k, :v)")
    ///     .put(using_value(String::from("a")).named("k"))?
    ///     .put(using_value(1_i32).named("v"))?
    ///     .execute()?;
    /// assert_eq!(se.last_changes(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn once<'a>(&self, sql: &str) -> OnceQuery<'_, 'a> {
        OnceQuery::new(self, sql)
    }

    /// Prepare `query`, step it once and finalize it.
    ///
    /// # Errors
    /// Any prepare, bind, step or conversion error.
    pub fn execute(&self, query: Query<'_>) -> Result<bool, DbError> {
        let mut st = Statement::with_query(self, query);
        st.exec()
    }

    /// [`Session::execute`] for SQL without binders.
    ///
    /// # Errors
    /// As [`Session::execute`].
    pub fn execute_sql(&self, sql: &str) -> Result<bool, DbError> {
        self.execute(Query::new(sql))
    }

    /// Begin a transaction of the given kind.
    ///
    /// # Errors
    /// As [`Transaction::begin`].
    pub fn transaction(&self, kind: TransactionKind) -> Result<Transaction<'_>, DbError> {
        Transaction::begin(self, kind)
    }
}
