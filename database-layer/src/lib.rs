//! PostgreSQL plumbing shared by CareLedger repositories
//!
//! - [`DatabasePool`]: a configured sqlx pool
//! - [`TransactionManager`]: opens transactions with a `lock_timeout` guard so
//!   a unit of work blocked on a contended row (a busy doctor, a popular
//!   medicine, a shared account) fails instead of hanging
//! - [`run_migrations`]: embedded schema migrations
//!
//! Repositories own their SQL; this crate owns connections and transactions.

pub mod connection;
pub mod error;
pub mod migrations;
pub mod transaction;

pub use connection::*;
pub use error::*;
pub use migrations::*;
pub use transaction::*;
