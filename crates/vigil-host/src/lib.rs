//! Vigil Host
//!
//! The capabilities a maintenance step may call into. The scheduler core never
//! talks to a database, a shell or the wall clock directly; it is handed
//! implementations of these traits instead:
//!
//! - [`QueryExecutor`] runs a named query with parameters and returns rows.
//! - [`ProcessRunner`] runs an external command and captures its output.
//! - [`Clock`] supplies the current time and performs (virtual) sleeps, so
//!   retry delays and time windows are testable.
//!
//! In-memory implementations ([`StaticQueryExecutor`], [`ManualClock`]) are
//! provided for tests and dry runs. The PostgreSQL executor is available behind
//! the `postgres` feature.

mod clock;
mod error;
#[cfg(feature = "postgres")]
mod postgres;
mod process;
mod query;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::HostError;
#[cfg(feature = "postgres")]
pub use postgres::PgQueryExecutor;
pub use process::{CommandSpec, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use query::{Query, QueryExecutor, QueryParam, Row, StaticQueryExecutor};
