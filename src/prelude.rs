//! `use sqlite_binder::prelude::*;` brings in sessions, statements, the
//! binder constructors and [`DbError`].

pub use crate::binders::{Binder, IntoBinder, UseBinder, into, using, using_value};
pub use crate::convert::Convert;
pub use crate::error::DbError;
pub use crate::query::Query;
pub use crate::session::{Encoding, OnceQuery, OpenFlags, Session, SessionOptions, SessionOptionsBuilder};
pub use crate::statement::{PreparedRef, Statement, StatementState};
pub use crate::transaction::{Transaction, TransactionKind};
pub use crate::types::{ColumnType, Text16};
