//! Into (column to variable) and use (variable to parameter) binders.
//!
//! A binder pairs an application value with a position in a statement. The
//! [`Statement`](crate::statement::Statement) walks its query's binders when
//! it prepares, each binder resolves its position, and from then on into
//! binders receive every row and use binders bind on every rebind.

use std::os::raw::c_int;

use crate::error::DbError;
use crate::statement::PreparedRef;

mod into;
mod using;

pub use into::{IntoColumn, IntoTarget, into};
pub use using::{Owned, UseParam, UseSource, using, using_value};

/// Receives one result column per row.
pub trait IntoBinder {
    /// Resolve the column this binder reads, given the suggested position
    /// `pos` (0-based). Returns the column actually taken.
    ///
    /// # Errors
    /// Returns [`DbError::NoSuchColumn`] for an unknown column name.
    fn bind(&mut self, stmt: &PreparedRef<'_>, pos: c_int) -> Result<c_int, DbError>;

    /// Copy the resolved column of the current row into the target.
    ///
    /// # Errors
    /// Returns the read or conversion failure.
    fn update(&mut self, stmt: &PreparedRef<'_>) -> Result<(), DbError>;
}

/// Supplies one statement parameter.
pub trait UseBinder {
    /// Bind the current source value, given the suggested parameter `pos`
    /// (1-based). Returns the parameter actually bound.
    ///
    /// # Errors
    /// Returns [`DbError::NoSuchColumn`] for an unknown parameter name or the
    /// engine error for a failed bind.
    fn bind(&mut self, stmt: &PreparedRef<'_>, pos: c_int) -> Result<c_int, DbError>;
}

/// Anything a [`Query`](crate::query::Query) accepts through `put`.
#[derive(Default)]
pub enum Binder<'a> {
    /// Carries no binder; a query rejects it.
    #[default]
    Empty,
    Into(Box<dyn IntoBinder + 'a>),
    Use(Box<dyn UseBinder + 'a>),
}

impl<'a> Binder<'a> {
    /// Wrap a custom into binder.
    pub fn into_binder(binder: impl IntoBinder + 'a) -> Self {
        Binder::Into(Box::new(binder))
    }

    /// Wrap a custom use binder.
    pub fn use_binder(binder: impl UseBinder + 'a) -> Self {
        Binder::Use(Box::new(binder))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Binder::Empty)
    }
}

impl std::fmt::Debug for Binder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Binder::Empty => "Binder::Empty",
            Binder::Into(_) => "Binder::Into(..)",
            Binder::Use(_) => "Binder::Use(..)",
        })
    }
}
