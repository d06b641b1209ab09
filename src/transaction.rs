use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::session::Session;

/// Locking behavior requested when a transaction begins.
///
/// Derives [`ValueEnum`] so command-line tools built on this crate can take
/// the kind as an argument:
///
/// ```rust
/// use clap::ValueEnum;
/// use sqlite_binder::TransactionKind;
///
/// let kind = TransactionKind::from_str("immediate", true).unwrap();
/// assert_eq!(kind, TransactionKind::Immediate);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Locks are taken on first access.
    #[default]
    Deferred,
    /// A write lock is taken immediately.
    Immediate,
    /// An exclusive lock is taken immediately.
    Exclusive,
}

impl TransactionKind {
    fn begin_sql(self) -> &'static str {
        match self {
            TransactionKind::Deferred => "begin deferred",
            TransactionKind::Immediate => "begin immediate",
            TransactionKind::Exclusive => "begin exclusive",
        }
    }
}

/// Scoped transaction on a [`Session`].
///
/// Only one transaction per session may be active. A transaction that is
/// neither committed nor rolled back rolls back when dropped.
///
/// ```rust
/// use sqlite_binder::prelude::*;
///
/// # fn main() -> Result<(), DbError> {
/// let se = Session::open_in_memory()?;
/// se.execute_sql("create table t (x integer)")?;
/// {
///     let _tx = se.transaction(TransactionKind::Deferred)?;
///     se.execute_sql("insert into t values (1)")?;
///     // dropped without commit
/// }
/// let mut n = 0_i64;
/// se.once("select count(*) from t").put(into(&mut n))?.execute()?;
/// assert_eq!(n, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Transaction<'s> {
    session: Option<&'s Session>,
    kind: TransactionKind,
}

impl<'s> Transaction<'s> {
    /// Issue `begin deferred|immediate|exclusive` and mark the session.
    ///
    /// # Errors
    /// - [`DbError::NestedTransactionNotSupported`] if the session already has
    ///   an active transaction
    /// - the engine error if `begin` fails
    pub fn begin(session: &'s Session, kind: TransactionKind) -> Result<Self, DbError> {
        if session.active_txn().is_some() {
            return Err(DbError::NestedTransactionNotSupported);
        }
        session.execute_sql(kind.begin_sql())?;
        session.set_active_txn(Some(kind));
        tracing::debug!(?kind, "transaction started");
        Ok(Self {
            session: Some(session),
            kind,
        })
    }

    #[must_use]
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Commit.
    ///
    /// # Errors
    /// Returns the engine error if `commit` fails; the transaction then
    /// rolls back as it is dropped.
    pub fn commit(mut self) -> Result<(), DbError> {
        self.finish("commit")
    }

    /// Roll back.
    ///
    /// # Errors
    /// Returns the engine error if `rollback` fails.
    pub fn rollback(mut self) -> Result<(), DbError> {
        self.finish("rollback")
    }

    fn finish(&mut self, sql: &str) -> Result<(), DbError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        if let Err(err) = session.execute_sql(sql) {
            // Still open on the engine side.
            self.session = Some(session);
            return Err(err);
        }
        session.set_active_txn(None);
        tracing::debug!(kind = ?self.kind, outcome = sql, "transaction finished");
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.session.is_none() {
            return;
        }
        if let Err(err) = self.finish("rollback") {
            tracing::warn!(error = %err, "rollback on drop failed");
            if let Some(session) = self.session.take() {
                session.set_active_txn(None);
            }
        }
    }
}
