//! SQLite backend for soft-deletable records.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The store keeps a small unit of work
//! in memory: staged writes are applied inside an explicit transaction on
//! flush and made durable on commit.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
