#![allow(unsafe_code)]
//! Direct calls into the `SQLite` C API.
//!
//! `rusqlite` owns the connection, but its statement type cannot be stepped one
//! row at a time across calls, reset without dropping its row cursor, or bound
//! without a copy. Everything that needs a raw `sqlite3_stmt` lives here so the
//! rest of the crate stays free of `unsafe`.
//!
//! A [`RawStatement`] is valid from a successful `sqlite3_prepare_v2` until it
//! is finalized or dropped; every method below relies on that.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::ptr::{self, NonNull};

use rusqlite::Connection;
use rusqlite::ffi;

use crate::error::DbError;

/// Non-null pointer handed to the engine for zero-length text/blob binds, so
/// the engine never sees a null pointer (which it would treat as SQL NULL).
static EMPTY: [u8; 1] = [0];

/// Buffer the engine references without copying (`SQLITE_STATIC`).
///
/// The heap allocation of each variant never moves while it sits in the
/// statement's pin table.
#[derive(Debug)]
enum Pinned {
    Text(String),
    Text16(Vec<u16>),
    Blob(Vec<u8>),
}

/// Owned compiled statement.
#[derive(Debug)]
pub(crate) struct RawStatement {
    ptr: NonNull<ffi::sqlite3_stmt>,
    finalized: bool,
    // Dropped after the handle is finalized in `Drop`.
    pinned: RefCell<HashMap<c_int, Pinned>>,
}

/// Result of compiling the first statement of a SQL text.
pub(crate) struct Compiled<'s> {
    pub(crate) code: c_int,
    pub(crate) stmt: Option<RawStatement>,
    pub(crate) tail: &'s str,
}

/// Compile the first statement of `sql`.
///
/// `stmt` is `None` when compilation failed or the text held no statement
/// (only whitespace or comments).
pub(crate) fn prepare<'s>(conn: &Connection, sql: &'s str) -> Result<Compiled<'s>, DbError> {
    let len = c_int::try_from(sql.len())
        .map_err(|_| DbError::InvalidArgument("SQL text is too long".into()))?;
    let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
    let mut tail: *const c_char = ptr::null();
    // SAFETY: the connection handle is live for the borrow of `conn`; `sql` is
    // valid for `len` bytes and outlives the call.
    let code = unsafe {
        ffi::sqlite3_prepare_v2(
            conn.handle(),
            sql.as_ptr().cast::<c_char>(),
            len,
            &mut stmt,
            &mut tail,
        )
    };
    let tail = if tail.is_null() {
        ""
    } else {
        let offset = (tail as usize).saturating_sub(sql.as_ptr() as usize);
        sql.get(offset.min(sql.len())..).unwrap_or("")
    };
    let stmt = NonNull::new(stmt).map(|ptr| RawStatement {
        ptr,
        finalized: false,
        pinned: RefCell::new(HashMap::new()),
    });
    Ok(Compiled { code, stmt, tail })
}

/// Extended error code of the most recent failed call on `conn`.
pub(crate) fn extended_errcode(conn: &Connection) -> c_int {
    // SAFETY: live connection handle.
    unsafe { ffi::sqlite3_extended_errcode(conn.handle()) }
}

/// English message for the most recent failed call on `conn`.
pub(crate) fn errmsg(conn: &Connection) -> String {
    // SAFETY: live connection handle; the returned string is owned by SQLite
    // and copied before any other call.
    unsafe { cstr_to_string(ffi::sqlite3_errmsg(conn.handle())) }.unwrap_or_default()
}

/// Fixed English description of a result code, independent of connection state.
pub(crate) fn errstr(code: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a pointer to static storage.
    unsafe { cstr_to_string(ffi::sqlite3_errstr(code)) }.unwrap_or_default()
}

pub(crate) fn last_insert_rowid(conn: &Connection) -> i64 {
    // SAFETY: live connection handle.
    unsafe { ffi::sqlite3_last_insert_rowid(conn.handle()) }
}

pub(crate) fn changes(conn: &Connection) -> u64 {
    // SAFETY: live connection handle.
    let n = unsafe { ffi::sqlite3_changes(conn.handle()) };
    u64::try_from(n).unwrap_or(0)
}

pub(crate) fn total_changes(conn: &Connection) -> u64 {
    // SAFETY: live connection handle.
    let n = unsafe { ffi::sqlite3_total_changes(conn.handle()) };
    u64::try_from(n).unwrap_or(0)
}

/// Copy a NUL-terminated C string, `None` for a null pointer.
///
/// # Safety
/// `p` must be null or point to a NUL-terminated string valid for the call.
unsafe fn cstr_to_string(p: *const c_char) -> Option<String> {
    if p.is_null() {
        None
    } else {
        // SAFETY: guaranteed by the caller.
        Some(unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
    }
}

fn destructor(copy: bool) -> ffi::sqlite3_destructor_type {
    if copy {
        ffi::SQLITE_TRANSIENT()
    } else {
        ffi::SQLITE_STATIC()
    }
}

fn byte_len(len: usize) -> Result<c_int, DbError> {
    c_int::try_from(len).map_err(|_| DbError::InvalidArgument("bound value is too large".into()))
}

impl RawStatement {
    fn as_ptr(&self) -> *mut ffi::sqlite3_stmt {
        self.ptr.as_ptr()
    }

    pub(crate) fn step(&self) -> c_int {
        // SAFETY: valid statement handle.
        unsafe { ffi::sqlite3_step(self.as_ptr()) }
    }

    pub(crate) fn reset(&self) -> c_int {
        // SAFETY: valid statement handle.
        unsafe { ffi::sqlite3_reset(self.as_ptr()) }
    }

    /// Release the handle, returning the engine's status for the release.
    pub(crate) fn finalize(mut self) -> c_int {
        self.finalize_in_place()
    }

    fn finalize_in_place(&mut self) -> c_int {
        if self.finalized {
            return ffi::SQLITE_OK;
        }
        self.finalized = true;
        // SAFETY: valid statement handle, finalized exactly once.
        unsafe { ffi::sqlite3_finalize(self.as_ptr()) }
    }

    pub(crate) fn column_count(&self) -> c_int {
        // SAFETY: valid statement handle.
        unsafe { ffi::sqlite3_column_count(self.as_ptr()) }
    }

    pub(crate) fn column_name(&self, column: c_int) -> Option<String> {
        // SAFETY: valid statement handle; the name is copied before the next call.
        unsafe { cstr_to_string(ffi::sqlite3_column_name(self.as_ptr(), column)) }
    }

    pub(crate) fn column_type(&self, column: c_int) -> c_int {
        // SAFETY: valid statement handle.
        unsafe { ffi::sqlite3_column_type(self.as_ptr(), column) }
    }

    pub(crate) fn column_int(&self, column: c_int) -> i32 {
        // SAFETY: valid statement handle.
        unsafe { ffi::sqlite3_column_int(self.as_ptr(), column) }
    }

    pub(crate) fn column_int64(&self, column: c_int) -> i64 {
        // SAFETY: valid statement handle.
        unsafe { ffi::sqlite3_column_int64(self.as_ptr(), column) }
    }

    pub(crate) fn column_double(&self, column: c_int) -> f64 {
        // SAFETY: valid statement handle.
        unsafe { ffi::sqlite3_column_double(self.as_ptr(), column) }
    }

    /// Column as UTF-8 text, empty for NULL.
    pub(crate) fn column_text(&self, column: c_int) -> String {
        // Fetch the pointer first, then its size, per the column_blob contract.
        // SAFETY: valid statement handle; the buffer is copied before any
        // other call on the statement.
        unsafe {
            let p = ffi::sqlite3_column_text(self.as_ptr(), column);
            if p.is_null() {
                return String::new();
            }
            let n = usize::try_from(ffi::sqlite3_column_bytes(self.as_ptr(), column)).unwrap_or(0);
            let bytes = std::slice::from_raw_parts(p, n);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }

    /// Column as UTF-16 code units in native byte order, empty for NULL.
    pub(crate) fn column_text16(&self, column: c_int) -> Vec<u16> {
        // SAFETY: as for `column_text`.
        unsafe {
            let p = ffi::sqlite3_column_text16(self.as_ptr(), column);
            if p.is_null() {
                return Vec::new();
            }
            let n = usize::try_from(ffi::sqlite3_column_bytes16(self.as_ptr(), column)).unwrap_or(0);
            let bytes = std::slice::from_raw_parts(p.cast::<u8>(), n);
            bytes
                .chunks_exact(2)
                .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
                .collect()
        }
    }

    /// Column as raw bytes, empty for NULL.
    pub(crate) fn column_blob(&self, column: c_int) -> Vec<u8> {
        // SAFETY: as for `column_text`.
        unsafe {
            let p = ffi::sqlite3_column_blob(self.as_ptr(), column);
            if p.is_null() {
                return Vec::new();
            }
            let n = usize::try_from(ffi::sqlite3_column_bytes(self.as_ptr(), column)).unwrap_or(0);
            std::slice::from_raw_parts(p.cast::<u8>(), n).to_vec()
        }
    }

    pub(crate) fn parameter_count(&self) -> c_int {
        // SAFETY: valid statement handle.
        unsafe { ffi::sqlite3_bind_parameter_count(self.as_ptr()) }
    }

    /// Engine index of a parameter token such as `:id`, 0 when unknown.
    pub(crate) fn parameter_index(&self, name: &str) -> c_int {
        let Ok(name) = CString::new(name) else {
            return 0;
        };
        // SAFETY: valid statement handle and NUL-terminated name.
        unsafe { ffi::sqlite3_bind_parameter_index(self.as_ptr(), name.as_ptr()) }
    }

    pub(crate) fn bind_null(&self, pos: c_int) -> c_int {
        // SAFETY: valid statement handle.
        let code = unsafe { ffi::sqlite3_bind_null(self.as_ptr(), pos) };
        self.unpin(pos, code);
        code
    }

    pub(crate) fn bind_int(&self, pos: c_int, value: i32) -> c_int {
        // SAFETY: valid statement handle.
        let code = unsafe { ffi::sqlite3_bind_int(self.as_ptr(), pos, value) };
        self.unpin(pos, code);
        code
    }

    pub(crate) fn bind_int64(&self, pos: c_int, value: i64) -> c_int {
        // SAFETY: valid statement handle.
        let code = unsafe { ffi::sqlite3_bind_int64(self.as_ptr(), pos, value) };
        self.unpin(pos, code);
        code
    }

    pub(crate) fn bind_double(&self, pos: c_int, value: f64) -> c_int {
        // SAFETY: valid statement handle.
        let code = unsafe { ffi::sqlite3_bind_double(self.as_ptr(), pos, value) };
        self.unpin(pos, code);
        code
    }

    pub(crate) fn bind_zeroblob(&self, pos: c_int, len: u64) -> c_int {
        // SAFETY: valid statement handle.
        let code = unsafe { ffi::sqlite3_bind_zeroblob64(self.as_ptr(), pos, len) };
        self.unpin(pos, code);
        code
    }

    /// Bind UTF-8 text. With `copy == false` the buffer is pinned in the
    /// statement instead of being copied by the engine.
    pub(crate) fn bind_text(&self, pos: c_int, value: String, copy: bool) -> Result<c_int, DbError> {
        let n = byte_len(value.len())?;
        let data = non_empty_ptr(value.as_ptr(), value.len());
        // SAFETY: `data` is valid for `n` bytes; with SQLITE_STATIC the buffer is
        // pinned below and outlives the binding, with SQLITE_TRANSIENT the engine
        // copies it before returning.
        let code = unsafe {
            ffi::sqlite3_bind_text(self.as_ptr(), pos, data.cast::<c_char>(), n, destructor(copy))
        };
        self.pin(pos, code, copy, Pinned::Text(value));
        Ok(code)
    }

    /// Bind UTF-16 text in native byte order.
    pub(crate) fn bind_text16(&self, pos: c_int, value: Vec<u16>, copy: bool) -> Result<c_int, DbError> {
        let bytes = value.len() * 2;
        let n = byte_len(bytes)?;
        let data = non_empty_ptr(value.as_ptr().cast::<u8>(), bytes);
        // SAFETY: as for `bind_text`.
        let code = unsafe {
            ffi::sqlite3_bind_text16(self.as_ptr(), pos, data.cast::<c_void>(), n, destructor(copy))
        };
        self.pin(pos, code, copy, Pinned::Text16(value));
        Ok(code)
    }

    pub(crate) fn bind_blob(&self, pos: c_int, value: Vec<u8>, copy: bool) -> Result<c_int, DbError> {
        let n = byte_len(value.len())?;
        let data = non_empty_ptr(value.as_ptr(), value.len());
        // SAFETY: as for `bind_text`.
        let code = unsafe {
            ffi::sqlite3_bind_blob(self.as_ptr(), pos, data.cast::<c_void>(), n, destructor(copy))
        };
        self.pin(pos, code, copy, Pinned::Blob(value));
        Ok(code)
    }

    /// A successful scalar bind replaces whatever buffer the slot referenced.
    fn unpin(&self, pos: c_int, code: c_int) {
        if code == ffi::SQLITE_OK {
            self.pinned.borrow_mut().remove(&pos);
        }
    }

    fn pin(&self, pos: c_int, code: c_int, copy: bool, buffer: Pinned) {
        if code != ffi::SQLITE_OK {
            // The slot still holds its previous binding, if any.
            return;
        }
        let mut pinned = self.pinned.borrow_mut();
        if copy {
            // The engine holds its own copy; the previous pin for this slot is no
            // longer referenced.
            pinned.remove(&pos);
        } else {
            pinned.insert(pos, buffer);
        }
    }
}

fn non_empty_ptr(data: *const u8, len: usize) -> *const u8 {
    if len == 0 { EMPTY.as_ptr() } else { data }
}

impl Drop for RawStatement {
    fn drop(&mut self) {
        self.finalize_in_place();
    }
}
