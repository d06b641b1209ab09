//! Prepared statement lifecycle: prepare, bind, step, reset, finalize.

use std::os::raw::c_int;

use rusqlite::ffi;

use crate::convert::Convert;
use crate::error::DbError;
use crate::query::Query;
use crate::raw::{self, RawStatement};
use crate::session::Session;
use crate::types::{BaseType, ColumnType};

/// Where a [`Statement`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementState {
    /// No compiled handle.
    Unprepared,
    /// Compiled and bound, not yet stepped (or reset).
    Prepared,
    /// The last step produced a row.
    Row,
    /// The last step ran the statement to completion.
    Done,
}

/// Borrowed view of a compiled statement, handed to binders.
///
/// Column accessors require a current row; parameter accessors work any time
/// the statement is prepared.
pub struct PreparedRef<'r> {
    session: &'r Session,
    raw: &'r RawStatement,
    row: bool,
}

impl<'r> PreparedRef<'r> {
    pub(crate) fn raw(&self) -> &RawStatement {
        self.raw
    }

    #[must_use]
    pub fn session(&self) -> &'r Session {
        self.session
    }

    /// Whether the last step produced a row.
    #[must_use]
    pub fn has_row(&self) -> bool {
        self.row
    }

    #[must_use]
    pub fn column_count(&self) -> c_int {
        self.raw.column_count()
    }

    /// Name of result column `column` as declared by the query.
    ///
    /// # Errors
    /// Returns an engine `SQLITE_RANGE` error when `column` is out of range.
    pub fn column_name(&self, column: c_int) -> Result<String, DbError> {
        self.check_range(column)?;
        self.raw
            .column_name(column)
            .ok_or_else(|| DbError::misuse("column name unavailable"))
    }

    /// Index of the first result column whose name equals `name` exactly.
    ///
    /// # Errors
    /// Returns [`DbError::NoSuchColumn`] when no column matches.
    pub fn column_index(&self, name: &str) -> Result<c_int, DbError> {
        (0..self.raw.column_count())
            .find(|&c| self.raw.column_name(c).as_deref() == Some(name))
            .ok_or_else(|| DbError::NoSuchColumn(name.to_owned()))
    }

    /// Storage class of `column` in the current row.
    ///
    /// # Errors
    /// Returns an engine `SQLITE_RANGE` error without a current row or for an
    /// out-of-range column.
    pub fn column_type(&self, column: c_int) -> Result<ColumnType, DbError> {
        self.check_cell(column)?;
        ColumnType::from_code(self.raw.column_type(column))
            .ok_or_else(|| DbError::misuse("unknown column storage class"))
    }

    /// Raw wire value of `column` in the current row.
    ///
    /// # Errors
    /// Returns an engine `SQLITE_RANGE` error without a current row or for an
    /// out-of-range column.
    pub fn column_value<B: BaseType>(&self, column: c_int) -> Result<B, DbError> {
        self.check_cell(column)?;
        Ok(B::read(self, column))
    }

    /// Value of `column` in the current row, converted to `T`.
    ///
    /// # Errors
    /// As [`PreparedRef::column_value`], plus any conversion failure.
    pub fn get<T: Convert>(&self, column: c_int) -> Result<T, DbError> {
        T::from_base(self.column_value::<T::Base>(column)?)
    }

    /// Number of parameter slots in the statement.
    #[must_use]
    pub fn use_count(&self) -> c_int {
        self.raw.parameter_count()
    }

    /// Engine index of a named parameter.
    ///
    /// `name` may carry its prefix (`:id`, `@id`, `$id`). A bare name is tried
    /// with `:`, then `@`, then `$`.
    ///
    /// # Errors
    /// Returns [`DbError::NoSuchColumn`] when the statement has no such parameter.
    pub fn use_pos(&self, name: &str) -> Result<c_int, DbError> {
        let pos = if name.starts_with([':', '@', '$', '?']) {
            self.raw.parameter_index(name)
        } else {
            [':', '@', '$']
                .iter()
                .map(|prefix| self.raw.parameter_index(&format!("{prefix}{name}")))
                .find(|&pos| pos > 0)
                .unwrap_or(0)
        };
        if pos > 0 {
            Ok(pos)
        } else {
            Err(DbError::NoSuchColumn(name.to_owned()))
        }
    }

    /// Bind a wire value at parameter `pos` (1-based).
    ///
    /// With `copy == false` the statement keeps the value alive itself instead
    /// of having the engine copy it.
    ///
    /// # Errors
    /// Returns the engine error for an invalid position or a bind failure.
    pub fn use_value<B: BaseType>(&self, pos: c_int, value: B, copy: bool) -> Result<(), DbError> {
        tracing::trace!(pos, kind = ?B::KIND, copy, "bind");
        let code = value.bind(self, pos, copy)?;
        self.session.check_error(code)
    }

    /// Bind SQL NULL at parameter `pos`.
    ///
    /// # Errors
    /// Returns the engine error for an invalid position.
    pub fn use_null(&self, pos: c_int) -> Result<(), DbError> {
        self.session.check_error(self.raw.bind_null(pos))
    }

    /// Bind a zero-filled blob of `len` bytes at parameter `pos`.
    ///
    /// # Errors
    /// Returns the engine error for an invalid position or an oversized blob.
    pub fn use_zeroblob(&self, pos: c_int, len: u64) -> Result<(), DbError> {
        self.session.check_error(self.raw.bind_zeroblob(pos, len))
    }

    fn check_range(&self, column: c_int) -> Result<(), DbError> {
        if (0..self.raw.column_count()).contains(&column) {
            Ok(())
        } else {
            Err(DbError::Engine {
                code: ffi::SQLITE_RANGE,
                message: raw::errstr(ffi::SQLITE_RANGE),
            })
        }
    }

    fn check_cell(&self, column: c_int) -> Result<(), DbError> {
        if !self.row {
            return Err(DbError::Engine {
                code: ffi::SQLITE_RANGE,
                message: format!("{} (no current row)", raw::errstr(ffi::SQLITE_RANGE)),
            });
        }
        self.check_range(column)
    }
}

/// A query compiled against a session.
///
/// The statement borrows its [`Session`] and owns its [`Query`]. Binders
/// inside the query may borrow application variables for `'a`, so those
/// variables must be declared before the statement.
///
/// ```rust
/// use sqlite_binder::prelude::*;
///
/// # fn main() -> Result<(), DbError> {
/// let se = Session::open_in_memory()?;
/// se.execute_sql("create table t (id integer, name text)")?;
/// se.execute_sql("insert into t values (1, 'one'), (2, 'two')")?;
///
/// let mut id = 0_i64;
/// let mut name = String::new();
/// {
///     let mut st = Statement::with_sql(&se, "select id, name from t order by id");
///     st.query_mut().put(into(&mut id))?.put(into(&mut name))?;
///     assert!(st.exec()?);
///     assert!(st.exec()?);
///     assert!(!st.exec()?);
/// }
/// assert_eq!((id, name.as_str()), (2, "two"));
/// # Ok(())
/// # }
/// ```
pub struct Statement<'a> {
    session: &'a Session,
    query: Query<'a>,
    raw: Option<RawStatement>,
    state: StatementState,
}

impl<'a> Statement<'a> {
    /// Empty statement bound to `session`.
    #[must_use]
    pub fn new(session: &'a Session) -> Self {
        Self::with_query(session, Query::default())
    }

    /// Statement whose query starts with `sql`.
    #[must_use]
    pub fn with_sql(session: &'a Session, sql: &str) -> Self {
        Self::with_query(session, Query::new(sql))
    }

    #[must_use]
    pub fn with_query(session: &'a Session, query: Query<'a>) -> Self {
        Self {
            session,
            query,
            raw: None,
            state: StatementState::Unprepared,
        }
    }

    #[must_use]
    pub fn session(&self) -> &'a Session {
        self.session
    }

    #[must_use]
    pub fn state(&self) -> StatementState {
        self.state
    }

    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.raw.is_some()
    }

    /// SQL text of the owned query.
    #[must_use]
    pub fn sql(&self) -> &str {
        self.query.sql()
    }

    #[must_use]
    pub fn query(&self) -> &Query<'a> {
        &self.query
    }

    /// Mutable access to the query. A prepared statement is finalized first so
    /// the compiled handle never disagrees with the text or binders.
    pub fn query_mut(&mut self) -> &mut Query<'a> {
        self.release();
        &mut self.query
    }

    /// Replace the query, finalizing any compiled handle.
    pub fn set_query(&mut self, query: Query<'a>) {
        self.release();
        self.query = query;
    }

    /// Take the query out, leaving an empty one and an unprepared statement.
    pub fn take_query(&mut self) -> Query<'a> {
        self.release();
        std::mem::take(&mut self.query)
    }

    /// Compile the query and bind every binder.
    ///
    /// Any previously compiled handle is finalized first. Into binders resolve
    /// from column 0 and use binders from parameter 1; each binder reports the
    /// position it took and the next one starts just after it.
    ///
    /// # Errors
    /// - [`DbError::SessionNotOpen`] if the session is closed
    /// - engine errors from compilation (the statement stays unprepared)
    /// - [`DbError::MultiStatementNotSupported`] if text remains after the
    ///   first statement
    /// - [`DbError::InvalidArgument`] if the text holds no statement
    /// - any binder resolution or bind failure (the statement is finalized)
    pub fn prepare(&mut self) -> Result<(), DbError> {
        self.release();
        let conn = self.session.conn()?;
        let compiled = raw::prepare(conn, self.query.sql())?;
        let has_tail = !compiled.tail.trim().is_empty();
        let stmt = compiled.stmt;
        if compiled.code != ffi::SQLITE_OK {
            drop(stmt);
            self.session.check_error(compiled.code)?;
            return Err(DbError::Engine {
                code: compiled.code,
                message: raw::errstr(compiled.code),
            });
        }
        let Some(stmt) = stmt else {
            return Err(DbError::InvalidArgument(format!(
                "no SQL statement in {:?}",
                self.query.sql()
            )));
        };
        if has_tail {
            drop(stmt);
            return Err(DbError::MultiStatementNotSupported);
        }
        tracing::debug!(sql = %self.query.sql(), "prepared statement");
        self.raw = Some(stmt);
        self.state = StatementState::Prepared;
        if let Err(err) = self.bind_binders(true) {
            self.release();
            return Err(err);
        }
        Ok(())
    }

    /// Step once, preparing first if needed.
    ///
    /// On a row, every into binder receives its column and `Ok(true)` is
    /// returned. When the statement runs to completion `Ok(false)` is returned
    /// and into targets keep their previous values. The session's last-exec
    /// flag records the outcome.
    ///
    /// # Errors
    /// Any prepare error, an engine step error, or an into conversion failure.
    /// Step and conversion failures finalize the statement.
    pub fn exec(&mut self) -> Result<bool, DbError> {
        if self.raw.is_none() {
            self.prepare()?;
        }
        match self.step() {
            Ok(row) => Ok(row),
            Err(err) => {
                self.release();
                Err(err)
            }
        }
    }

    /// Rewind to before the first row. With `rebind`, every use binder binds
    /// again from its current source value; into binders keep their
    /// positions. Does nothing on an unprepared statement.
    ///
    /// # Errors
    /// Returns the engine error reported by the reset or a rebind failure.
    pub fn reset(&mut self, rebind: bool) -> Result<(), DbError> {
        let Some(stmt) = self.raw.as_ref() else {
            return Ok(());
        };
        let code = stmt.reset();
        self.state = StatementState::Prepared;
        self.session.check_error(code)?;
        if rebind {
            self.bind_binders(false)?;
        }
        Ok(())
    }

    /// Release the compiled handle. With `check_error`, a failure status from
    /// the release is returned; the handle is released either way.
    ///
    /// # Errors
    /// Returns the engine error from the release when `check_error` is set.
    pub fn finalize(&mut self, check_error: bool) -> Result<(), DbError> {
        let Some(stmt) = self.raw.take() else {
            return Ok(());
        };
        let code = stmt.finalize();
        self.state = StatementState::Unprepared;
        tracing::debug!(code, "finalized statement");
        if check_error {
            self.session.check_error(code)?;
        }
        Ok(())
    }

    fn release(&mut self) {
        // The error of a failed step is also reported by finalize; it has
        // already surfaced from `exec` by the time we get here.
        let _ = self.finalize(false);
    }

    /// Borrowed view for direct column and parameter access.
    ///
    /// # Errors
    /// Returns an engine `SQLITE_MISUSE` error if the statement is not prepared.
    pub fn prepared(&self) -> Result<PreparedRef<'_>, DbError> {
        let raw = self
            .raw
            .as_ref()
            .ok_or_else(|| DbError::misuse("statement is not prepared"))?;
        Ok(PreparedRef {
            session: self.session,
            raw,
            row: self.state == StatementState::Row,
        })
    }

    /// Number of result columns.
    ///
    /// # Errors
    /// Fails if the statement is not prepared.
    pub fn column_count(&self) -> Result<c_int, DbError> {
        Ok(self.prepared()?.column_count())
    }

    /// # Errors
    /// Fails if the statement is not prepared or `column` is out of range.
    pub fn column_name(&self, column: c_int) -> Result<String, DbError> {
        self.prepared()?.column_name(column)
    }

    /// # Errors
    /// Fails if the statement is not prepared or no column is named `name`.
    pub fn column_index(&self, name: &str) -> Result<c_int, DbError> {
        self.prepared()?.column_index(name)
    }

    /// # Errors
    /// Fails without a current row or for an out-of-range column.
    pub fn column_type(&self, column: c_int) -> Result<ColumnType, DbError> {
        self.prepared()?.column_type(column)
    }

    /// # Errors
    /// Fails without a current row or for an out-of-range column.
    pub fn column_value<B: BaseType>(&self, column: c_int) -> Result<B, DbError> {
        self.prepared()?.column_value(column)
    }

    /// Value of `column` in the current row, converted to `T`.
    ///
    /// # Errors
    /// Fails without a current row, for an out-of-range column, or when the
    /// conversion fails.
    pub fn get<T: Convert>(&self, column: c_int) -> Result<T, DbError> {
        self.prepared()?.get(column)
    }

    /// # Errors
    /// Fails if the statement is not prepared.
    pub fn use_count(&self) -> Result<c_int, DbError> {
        Ok(self.prepared()?.use_count())
    }

    /// # Errors
    /// Fails if the statement is not prepared or has no such parameter.
    pub fn use_pos(&self, name: &str) -> Result<c_int, DbError> {
        self.prepared()?.use_pos(name)
    }

    /// # Errors
    /// Fails if the statement is not prepared or the bind fails.
    pub fn use_value<B: BaseType>(&self, pos: c_int, value: B, copy: bool) -> Result<(), DbError> {
        self.prepared()?.use_value(pos, value, copy)
    }

    /// # Errors
    /// Fails if the statement is not prepared or the bind fails.
    pub fn use_null(&self, pos: c_int) -> Result<(), DbError> {
        self.prepared()?.use_null(pos)
    }

    /// # Errors
    /// Fails if the statement is not prepared or the bind fails.
    pub fn use_zeroblob(&self, pos: c_int, len: u64) -> Result<(), DbError> {
        self.prepared()?.use_zeroblob(pos, len)
    }

    fn bind_binders(&mut self, with_intos: bool) -> Result<(), DbError> {
        let Self {
            session,
            query,
            raw: stmt,
            state,
        } = self;
        let stmt = stmt
            .as_ref()
            .ok_or_else(|| DbError::misuse("statement is not prepared"))?;
        let view = PreparedRef {
            session: *session,
            raw: stmt,
            row: *state == StatementState::Row,
        };
        if with_intos {
            let mut index = 0;
            for binder in &mut query.intos {
                index = 1 + binder.bind(&view, index)?;
            }
        }
        let mut index = 1;
        for binder in &mut query.uses {
            index = 1 + binder.bind(&view, index)?;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<bool, DbError> {
        let Self {
            session,
            query,
            raw: stmt,
            state,
        } = self;
        let session: &Session = session;
        let stmt = stmt
            .as_ref()
            .ok_or_else(|| DbError::misuse("statement is not prepared"))?;
        let code = stmt.step();
        tracing::trace!(code, "step");
        match code {
            ffi::SQLITE_ROW => {
                session.set_last_exec(true);
                *state = StatementState::Row;
                let view = PreparedRef {
                    session,
                    raw: stmt,
                    row: true,
                };
                for binder in &mut query.intos {
                    binder.update(&view)?;
                }
                Ok(true)
            }
            ffi::SQLITE_DONE => {
                session.set_last_exec(false);
                *state = StatementState::Done;
                Ok(false)
            }
            other => {
                session.set_last_exec(false);
                session.check_error(other)?;
                Err(DbError::Engine {
                    code: other,
                    message: raw::errstr(other),
                })
            }
        }
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        if let Some(stmt) = self.raw.take() {
            let code = stmt.finalize();
            if code & 0xff != ffi::SQLITE_OK {
                tracing::warn!(code, sql = %self.query.sql(), "statement finalized with error");
            }
        }
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("query", &self.query)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
