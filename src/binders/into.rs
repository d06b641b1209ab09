use std::cell::{Cell, RefCell};
use std::os::raw::c_int;

use crate::binders::{Binder, IntoBinder};
use crate::convert::Convert;
use crate::error::DbError;
use crate::statement::PreparedRef;

/// Destination for column values.
///
/// `&mut T` is the common case. `&Cell<T>` and `&RefCell<T>` let the caller
/// read the value between steps while the statement is still alive.
pub trait IntoTarget {
    type Value: Convert;

    fn store(&mut self, value: Self::Value);
}

impl<T: Convert> IntoTarget for &mut T {
    type Value = T;

    fn store(&mut self, value: T) {
        **self = value;
    }
}

impl<T: Convert> IntoTarget for &Cell<T> {
    type Value = T;

    fn store(&mut self, value: T) {
        self.set(value);
    }
}

impl<T: Convert> IntoTarget for &RefCell<T> {
    type Value = T;

    fn store(&mut self, value: T) {
        *self.borrow_mut() = value;
    }
}

/// Into binder for one result column.
///
/// Without a name or explicit position it takes the column suggested by the
/// statement (the one after the previous into binder). The resolved column is
/// kept for the lifetime of the binder.
#[must_use]
pub struct IntoColumn<S> {
    target: S,
    pos: Option<c_int>,
    name: Option<String>,
}

/// Bind the next result column to `target`.
///
/// ```rust
/// use sqlite_binder::prelude::*;
///
/// # fn main() -> Result<(), DbError> {
/// let se = Session::open_in_memory()?;
/// let mut answer = 0_i64;
/// let mut label = String::new();
/// se.once("select 42 as answer, 'x' as label")
///     .put(into(&mut label).named("label"))?
///     .put(into(&mut answer).at(0))?
///     .execute()?;
/// assert_eq!((answer, label.as_str()), (42, "x"));
/// # Ok(())
/// # }
/// ```
pub fn into<S: IntoTarget>(target: S) -> IntoColumn<S> {
    IntoColumn {
        target,
        pos: None,
        name: None,
    }
}

impl<S: IntoTarget> IntoColumn<S> {
    /// Read column `pos` (0-based). A negative position means "next column".
    pub fn at(mut self, pos: c_int) -> Self {
        self.pos = (pos >= 0).then_some(pos);
        self.name = None;
        self
    }

    /// Read the column whose name equals `name` exactly.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self.pos = None;
        self
    }
}

impl<S: IntoTarget> IntoBinder for IntoColumn<S> {
    fn bind(&mut self, stmt: &PreparedRef<'_>, pos: c_int) -> Result<c_int, DbError> {
        if let Some(resolved) = self.pos {
            return Ok(resolved);
        }
        let resolved = match &self.name {
            Some(name) => stmt.column_index(name)?,
            None => pos,
        };
        self.pos = Some(resolved);
        Ok(resolved)
    }

    fn update(&mut self, stmt: &PreparedRef<'_>) -> Result<(), DbError> {
        let pos = self
            .pos
            .ok_or_else(|| DbError::misuse("into binder used before it was bound"))?;
        let value = stmt.get::<S::Value>(pos)?;
        self.target.store(value);
        Ok(())
    }
}

impl<'a, S: IntoTarget + 'a> From<IntoColumn<S>> for Binder<'a> {
    fn from(binder: IntoColumn<S>) -> Self {
        Binder::Into(Box::new(binder))
    }
}
