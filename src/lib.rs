//! Thin, typed binding layer over `SQLite`.
//!
//! A [`Session`] owns a connection. A [`Statement`] compiles a [`Query`]
//! against it: SQL text plus *into* binders (result column to application
//! variable) and *use* binders (application variable to parameter). Values
//! cross the boundary through the [`Convert`] trait, which maps each
//! application type onto one of the engine's wire types.
//!
//! ```rust
//! use sqlite_binder::prelude::*;
//!
//! # fn main() -> Result<(), DbError> {
//! let se = Session::open_in_memory()?;
//! se.execute_sql("create table person (id integer primary key, name text)")?;
//!
//! let name = String::from("Ada");
//! se.once("insert into person (name) values (:name)")
//!     .put(using(&name).named("name"))?
//!     .execute()?;
//!
//! let mut id = 0_i64;
//! let mut found = String::new();
//! se.once("select id, name from person")
//!     .put(into(&mut id))?
//!     .put(into(&mut found))?
//!     .execute()?;
//! assert_eq!((id, found.as_str()), (1, "Ada"));
//! # Ok(())
//! # }
//! ```

mod macros;
mod raw;

pub mod binders;
pub mod convert;
pub mod error;
pub mod prelude;
pub mod query;
pub mod session;
pub mod statement;
pub mod transaction;
pub mod types;

pub use binders::{Binder, into, using, using_value};
pub use convert::Convert;
pub use error::DbError;
pub use query::Query;
pub use session::{Encoding, OpenFlags, Session, SessionOptions, SessionOptionsBuilder};
pub use statement::{Statement, StatementState};
pub use transaction::{Transaction, TransactionKind};
