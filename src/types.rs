use std::fmt;
use std::os::raw::c_int;

use rusqlite::ffi;

use crate::error::DbError;
use crate::statement::PreparedRef;

/// Primitive wire types the engine stores and binds natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point
    Float,
    /// UTF-8 text
    Text,
    /// UTF-16 text (native byte order)
    Text16,
    /// Binary data
    Blob,
}

/// Storage class of a value in the current result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer = 1,
    Real = 2,
    Text = 3,
    Blob = 4,
    Null = 5,
}

impl ColumnType {
    /// Map an engine storage-class code, `None` for codes the engine never returns.
    #[must_use]
    pub fn from_code(code: c_int) -> Option<Self> {
        match code {
            ffi::SQLITE_INTEGER => Some(ColumnType::Integer),
            ffi::SQLITE_FLOAT => Some(ColumnType::Real),
            ffi::SQLITE_TEXT => Some(ColumnType::Text),
            ffi::SQLITE_BLOB => Some(ColumnType::Blob),
            ffi::SQLITE_NULL => Some(ColumnType::Null),
            _ => None,
        }
    }
}

/// UTF-16 text, stored as code units in native byte order.
///
/// ```rust
/// use sqlite_binder::types::Text16;
///
/// let t = Text16::from("héllo");
/// assert_eq!(t.to_string_lossy(), "héllo");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Text16(pub Vec<u16>);

impl Text16 {
    /// Decode to a Rust string, replacing unpaired surrogates.
    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }
}

impl From<&str> for Text16 {
    fn from(s: &str) -> Self {
        Text16(s.encode_utf16().collect())
    }
}

impl fmt::Display for Text16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
    impl Sealed for String {}
    impl Sealed for super::Text16 {}
    impl Sealed for Vec<u8> {}
    impl<B: Sealed> Sealed for Option<B> {}
}

/// A wire type: knows how to read itself from a result column and how to bind
/// itself at a parameter position.
///
/// Implemented for `i32`, `i64`, `f64`, `String`, [`Text16`], `Vec<u8>` and
/// `Option<B>` of any of those (SQL NULL). Application types reach the engine
/// through [`crate::convert::Convert`], never directly.
pub trait BaseType: Sized + sealed::Sealed {
    const KIND: BaseKind;

    /// Read column `column` of the current row. The caller has checked that a
    /// row is available and the column is in range.
    #[doc(hidden)]
    fn read(stmt: &PreparedRef<'_>, column: c_int) -> Self;

    /// Bind at parameter `pos`, returning the engine status.
    #[doc(hidden)]
    fn bind(self, stmt: &PreparedRef<'_>, pos: c_int, copy: bool) -> Result<c_int, DbError>;
}

impl BaseType for i32 {
    const KIND: BaseKind = BaseKind::Int;

    fn read(stmt: &PreparedRef<'_>, column: c_int) -> Self {
        stmt.raw().column_int(column)
    }

    fn bind(self, stmt: &PreparedRef<'_>, pos: c_int, _copy: bool) -> Result<c_int, DbError> {
        Ok(stmt.raw().bind_int(pos, self))
    }
}

impl BaseType for i64 {
    const KIND: BaseKind = BaseKind::Int64;

    fn read(stmt: &PreparedRef<'_>, column: c_int) -> Self {
        stmt.raw().column_int64(column)
    }

    fn bind(self, stmt: &PreparedRef<'_>, pos: c_int, _copy: bool) -> Result<c_int, DbError> {
        Ok(stmt.raw().bind_int64(pos, self))
    }
}

impl BaseType for f64 {
    const KIND: BaseKind = BaseKind::Float;

    fn read(stmt: &PreparedRef<'_>, column: c_int) -> Self {
        stmt.raw().column_double(column)
    }

    fn bind(self, stmt: &PreparedRef<'_>, pos: c_int, _copy: bool) -> Result<c_int, DbError> {
        Ok(stmt.raw().bind_double(pos, self))
    }
}

impl BaseType for String {
    const KIND: BaseKind = BaseKind::Text;

    fn read(stmt: &PreparedRef<'_>, column: c_int) -> Self {
        stmt.raw().column_text(column)
    }

    fn bind(self, stmt: &PreparedRef<'_>, pos: c_int, copy: bool) -> Result<c_int, DbError> {
        stmt.raw().bind_text(pos, self, copy)
    }
}

impl BaseType for Text16 {
    const KIND: BaseKind = BaseKind::Text16;

    fn read(stmt: &PreparedRef<'_>, column: c_int) -> Self {
        Text16(stmt.raw().column_text16(column))
    }

    fn bind(self, stmt: &PreparedRef<'_>, pos: c_int, copy: bool) -> Result<c_int, DbError> {
        stmt.raw().bind_text16(pos, self.0, copy)
    }
}

impl BaseType for Vec<u8> {
    const KIND: BaseKind = BaseKind::Blob;

    fn read(stmt: &PreparedRef<'_>, column: c_int) -> Self {
        stmt.raw().column_blob(column)
    }

    fn bind(self, stmt: &PreparedRef<'_>, pos: c_int, copy: bool) -> Result<c_int, DbError> {
        stmt.raw().bind_blob(pos, self, copy)
    }
}

impl<B: BaseType> BaseType for Option<B> {
    const KIND: BaseKind = B::KIND;

    fn read(stmt: &PreparedRef<'_>, column: c_int) -> Self {
        if stmt.raw().column_type(column) == ffi::SQLITE_NULL {
            None
        } else {
            Some(B::read(stmt, column))
        }
    }

    fn bind(self, stmt: &PreparedRef<'_>, pos: c_int, copy: bool) -> Result<c_int, DbError> {
        match self {
            Some(value) => value.bind(stmt, pos, copy),
            None => Ok(stmt.raw().bind_null(pos)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_codes_match_engine() {
        assert_eq!(ColumnType::from_code(1), Some(ColumnType::Integer));
        assert_eq!(ColumnType::from_code(5), Some(ColumnType::Null));
        assert_eq!(ColumnType::from_code(0), None);
        assert_eq!(ColumnType::Blob as i32, 4);
    }

    #[test]
    fn text16_round_trips_through_str() {
        let t = Text16::from("ключ");
        assert_eq!(t.0.len(), 4);
        assert_eq!(t.to_string(), "ключ");
    }

    #[test]
    fn option_kind_follows_inner_kind() {
        assert_eq!(<Option<i64> as BaseType>::KIND, BaseKind::Int64);
        assert_eq!(<Option<String> as BaseType>::KIND, BaseKind::Text);
    }
}
