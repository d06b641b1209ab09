use std::cell::{Cell, RefCell};
use std::os::raw::c_int;

use crate::binders::{Binder, UseBinder};
use crate::convert::Convert;
use crate::error::DbError;
use crate::statement::PreparedRef;

/// Source of a parameter value, read again on every bind.
pub trait UseSource {
    type Value: Convert;

    fn with_value<R>(&self, f: impl FnOnce(&Self::Value) -> R) -> R;
}

impl<T: Convert> UseSource for &T {
    type Value = T;

    fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(self)
    }
}

impl<T: Convert + Copy> UseSource for &Cell<T> {
    type Value = T;

    fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.get())
    }
}

impl<T: Convert> UseSource for &RefCell<T> {
    type Value = T;

    fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.borrow())
    }
}

/// A value owned by its binder.
#[derive(Debug, Clone, PartialEq)]
pub struct Owned<T>(pub T);

impl<T: Convert> UseSource for Owned<T> {
    type Value = T;

    fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0)
    }
}

#[derive(Debug, Clone)]
enum Slot {
    /// Whatever position the statement suggests; not remembered.
    Next,
    At(c_int),
    Named { name: String, resolved: Option<c_int> },
}

/// Use binder for one statement parameter.
#[must_use]
pub struct UseParam<S> {
    source: S,
    slot: Slot,
    copy: bool,
}

/// Bind `source` to the next parameter.
///
/// The source is read each time the statement binds, so a `Cell` or
/// `RefCell` source picks up new values on `reset(true)`.
///
/// ```rust
/// use std::cell::Cell;
/// use sqlite_binder::prelude::*;
///
/// # fn main() -> Result<(), DbError> {
/// let se = Session::open_in_memory()?;
/// se.execute_sql("create table t (n integer)")?;
/// let n = Cell::new(1_i32);
/// let mut st = Statement::with_sql(&se, "insert into t values (?)");
/// st.query_mut().put(using(&n))?;
/// st.exec()?;
/// n.set(2);
/// st.reset(true)?;
/// st.exec()?;
/// drop(st);
///
/// let mut total = 0_i64;
/// se.once("select sum(n) from t").put(into(&mut total))?.execute()?;
/// assert_eq!(total, 3);
/// # Ok(())
/// # }
/// ```
pub fn using<S: UseSource>(source: S) -> UseParam<S> {
    UseParam {
        source,
        slot: Slot::Next,
        copy: false,
    }
}

/// Bind an owned value to the next parameter.
pub fn using_value<T: Convert>(value: T) -> UseParam<Owned<T>> {
    using(Owned(value))
}

impl<S: UseSource> UseParam<S> {
    /// Bind parameter `pos` (1-based).
    pub fn at(mut self, pos: c_int) -> Self {
        self.slot = Slot::At(pos);
        self
    }

    /// Bind the named parameter `name`, with or without its `:`, `@` or `$`
    /// prefix.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.slot = Slot::Named {
            name: name.into(),
            resolved: None,
        };
        self
    }

    /// Have the engine copy text and blob values instead of keeping them
    /// alive in the statement.
    pub fn copy(mut self, copy: bool) -> Self {
        self.copy = copy;
        self
    }
}

impl<S: UseSource> UseBinder for UseParam<S> {
    fn bind(&mut self, stmt: &PreparedRef<'_>, pos: c_int) -> Result<c_int, DbError> {
        let pos = match &mut self.slot {
            Slot::Next => pos,
            Slot::At(at) => *at,
            Slot::Named { resolved: Some(at), .. } => *at,
            Slot::Named { name, resolved } => {
                let at = stmt.use_pos(name)?;
                *resolved = Some(at);
                at
            }
        };
        let base = self.source.with_value(|value| value.to_base());
        stmt.use_value(pos, base, self.copy)?;
        Ok(pos)
    }
}

impl<'a, S: UseSource + 'a> From<UseParam<S>> for Binder<'a> {
    fn from(binder: UseParam<S>) -> Self {
        Binder::Use(Box::new(binder))
    }
}
