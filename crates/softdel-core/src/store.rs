//! The `RecordStore` trait — the persistence port the lifecycle manager is
//! built on.
//!
//! The trait is implemented by storage backends (e.g. `softdel-store-sqlite`).
//! It models a unit of work: writes are staged with [`RecordStore::add`] and
//! [`RecordStore::delete`], pushed into an open transaction by
//! [`RecordStore::flush`], and made durable by [`RecordStore::commit`].

use std::future::Future;

use uuid::Uuid;

use crate::record::{Entity, Record};

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Predicate over the `deleted_at` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleFilter {
  /// `deleted_at IS NULL`
  Active,
  /// `deleted_at IS NOT NULL`
  Deleted,
  /// No predicate.
  #[default]
  Any,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a transactional record store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Staging ───────────────────────────────────────────────────────────

  /// Stage an insert-or-update of `record`. Nothing reaches the store until
  /// the next flush.
  fn add<'a, T: Entity>(
    &'a self,
    record: &'a Record<T>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Stage the physical removal of a record.
  fn delete<T: Entity>(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Discard any staged, unflushed changes for a record, detaching it from
  /// the unit of work.
  fn expunge<T: Entity>(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Transaction control ───────────────────────────────────────────────

  /// Write staged changes into the current transaction, opening one if
  /// needed. Does not commit.
  fn flush(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Flush, then atomically commit the current transaction.
  fn commit(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Drop staged changes and roll back the current transaction.
  fn rollback(&self)
  -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Return every record of `T::KIND` matching `filter`, in insertion order.
  /// Staged changes are flushed first so reads observe them.
  fn query<T: Entity>(
    &self,
    filter: LifecycleFilter,
  ) -> impl Future<Output = Result<Vec<Record<T>>, Self::Error>> + Send + '_;

  /// Look a record up by identifier. Returns `None` if it does not exist.
  fn get<T: Entity>(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<Option<Record<T>>, Self::Error>> + Send + '_;
}
