use std::fmt;

use crate::binders::Binder;
use crate::error::DbError;
use crate::query::Query;
use crate::session::Session;

/// A query that runs once against a session.
///
/// Nothing happens until [`OnceQuery::execute`] is called; dropping it
/// discards the query.
#[must_use = "a one-shot query does nothing until `execute` is called"]
pub struct OnceQuery<'s, 'a> {
    session: &'s Session,
    query: Query<'a>,
}

impl<'s, 'a> OnceQuery<'s, 'a> {
    pub(crate) fn new(session: &'s Session, sql: &str) -> Self {
        Self {
            session,
            query: Query::new(sql),
        }
    }

    pub fn append(mut self, text: impl fmt::Display) -> Self {
        self.query.append(text);
        self
    }

    /// # Errors
    /// Returns [`DbError::InvalidArgument`] for an empty binder.
    pub fn put(mut self, binder: impl Into<Binder<'a>>) -> Result<Self, DbError> {
        self.query.put(binder)?;
        Ok(self)
    }

    pub fn query_mut(&mut self) -> &mut Query<'a> {
        &mut self.query
    }

    /// Prepare, bind and step once. Returns whether a row was produced.
    ///
    /// # Errors
    /// Any prepare, bind, step or conversion error.
    pub fn execute(self) -> Result<bool, DbError> {
        self.session.execute(self.query)
    }
}

impl fmt::Debug for OnceQuery<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceQuery").field("query", &self.query).finish_non_exhaustive()
    }
}
