//! Core types and trait definitions for soft-deletable records.
//!
//! This crate is deliberately free of database dependencies. Storage
//! backends implement [`store::RecordStore`]; the [`lifecycle::Lifecycle`]
//! manager drives records between the Active and Deleted states on top of
//! any such backend.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod lifecycle;
pub mod record;
pub mod store;

pub use error::{Error, Result};
pub use lifecycle::Lifecycle;
pub use record::{ActorId, Entity, LifecycleState, Record, SoftDeletable, Tombstone};
pub use store::{LifecycleFilter, RecordStore};
