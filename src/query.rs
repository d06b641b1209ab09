use std::fmt::{self, Write as _};

use crate::binders::{Binder, IntoBinder, UseBinder};
use crate::error::DbError;

/// SQL text plus the binders that go with it.
///
/// Built incrementally: text with [`Query::append`] (or `write!`), binders
/// with [`Query::put`]. Into binders and use binders each keep the order in
/// which they were added, which is the order positions are suggested in.
///
/// ```rust
/// use std::fmt::Write as _;
/// use sqlite_binder::prelude::*;
///
/// # fn main() -> Result<(), DbError> {
/// let limit = 10_i32;
/// let mut q = Query::new("select id from t");
/// write!(q, " where id < {}", 100).map_err(|e| DbError::InvalidArgument(e.to_string()))?;
/// q.append(" limit ?").put(using(&limit))?;
/// assert_eq!(q.sql(), "select id from t where id < 100 limit ?");
/// assert_eq!(q.use_count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Query<'a> {
    sql: String,
    pub(crate) intos: Vec<Box<dyn IntoBinder + 'a>>,
    pub(crate) uses: Vec<Box<dyn UseBinder + 'a>>,
}

impl<'a> Query<'a> {
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            intos: Vec::new(),
            uses: Vec::new(),
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Append the textual form of `text` to the SQL.
    pub fn append(&mut self, text: impl fmt::Display) -> &mut Self {
        // Writing into a String cannot fail.
        let _ = write!(self.sql, "{text}");
        self
    }

    /// Add a binder.
    ///
    /// # Errors
    /// Returns [`DbError::InvalidArgument`] for [`Binder::Empty`].
    pub fn put(&mut self, binder: impl Into<Binder<'a>>) -> Result<&mut Self, DbError> {
        match binder.into() {
            Binder::Empty => {
                return Err(DbError::InvalidArgument(
                    "an empty binder cannot be added to a query".into(),
                ));
            }
            Binder::Into(b) => self.intos.push(b),
            Binder::Use(b) => self.uses.push(b),
        }
        Ok(self)
    }

    /// Drop the text and every binder.
    pub fn clear(&mut self) {
        self.sql.clear();
        self.intos.clear();
        self.uses.clear();
    }

    #[must_use]
    pub fn into_count(&self) -> usize {
        self.intos.len()
    }

    #[must_use]
    pub fn use_count(&self) -> usize {
        self.uses.len()
    }

    /// True when there is neither text nor any binder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty() && self.intos.is_empty() && self.uses.is_empty()
    }
}

impl fmt::Write for Query<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.sql.push_str(s);
        Ok(())
    }
}

impl fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("intos", &self.intos.len())
            .field("uses", &self.uses.len())
            .finish()
    }
}

impl From<&str> for Query<'_> {
    fn from(sql: &str) -> Self {
        Query::new(sql)
    }
}

impl From<String> for Query<'_> {
    fn from(sql: String) -> Self {
        Query::new(sql)
    }
}
