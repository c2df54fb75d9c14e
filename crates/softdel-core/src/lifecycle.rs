//! The soft-delete lifecycle manager.
//!
//! ```text
//!            soft_delete                 force_delete
//!   Active ──────────────▶ Deleted ───────────────────▶ (purged)
//!      ▲                      │
//!      └──────── restore ─────┘
//!   Active ───────────────────────────────────────────▶ (purged)
//!                          force_delete
//! ```
//!
//! Every mutating operation runs inside the store's current transaction.
//! When the store fails, the manager rolls the transaction back, logs the
//! failure, reverts any in-memory change to the record, and returns the
//! failure to the caller.

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  record::{ActorId, Entity, Record, SoftDeletable},
  store::{LifecycleFilter, RecordStore},
};

/// Whether a staged write is only flushed or also committed.
#[derive(Debug, Clone, Copy)]
enum Finish {
  Flush,
  Commit,
}

/// Drives records of any [`Entity`] type between the Active and Deleted
/// states on top of an injected [`RecordStore`].
#[derive(Debug, Clone)]
pub struct Lifecycle<S> {
  store: S,
}

impl<S: RecordStore> Lifecycle<S> {
  pub fn new(store: S) -> Self { Self { store } }

  /// The underlying store, e.g. to commit after [`Lifecycle::soft_delete`].
  pub fn store(&self) -> &S { &self.store }

  pub fn into_inner(self) -> S { self.store }

  // ── Single-record operations ──────────────────────────────────────────

  /// Mark `record` as deleted now (UTC), optionally recording who did it.
  ///
  /// The change is flushed into the open transaction but not committed;
  /// the caller owns the commit. On failure the transaction is rolled back
  /// and `record` is left exactly as it was.
  pub async fn soft_delete<T: Entity>(
    &self,
    record: &mut Record<T>,
    actor: Option<ActorId>,
  ) -> Result<()> {
    let snapshot = record.tombstone().clone();
    let deleted_at = Utc::now();
    record.tombstone_mut().mark_deleted(deleted_at, actor);

    if let Err(err) = self.stage(record, Finish::Flush).await {
      *record.tombstone_mut() = snapshot;
      return Err(self.abort("soft_delete", err).await);
    }

    info!(
      record_id = %record.record_id,
      kind = T::KIND,
      actor = ?actor,
      %deleted_at,
      "record soft-deleted"
    );
    Ok(())
  }

  /// Return `record` to the Active state and commit.
  ///
  /// Clears `deleted_at` and `deleted_by`; sets `restored_by` when an actor
  /// is given. Restoring an Active record only updates `restored_by`.
  pub async fn restore<T: Entity>(
    &self,
    record: &mut Record<T>,
    actor: Option<ActorId>,
  ) -> Result<()> {
    let snapshot = record.tombstone().clone();
    record.tombstone_mut().mark_restored(actor);

    if let Err(err) = self.stage(record, Finish::Commit).await {
      *record.tombstone_mut() = snapshot;
      return Err(self.abort("restore", err).await);
    }

    info!(
      record_id = %record.record_id,
      kind = T::KIND,
      actor = ?actor,
      "record restored"
    );
    Ok(())
  }

  /// Permanently remove `record` from the store and commit.
  ///
  /// Works from either live state. The record is consumed; on failure the
  /// row is untouched and can be re-read with [`RecordStore::get`].
  pub async fn force_delete<T: Entity>(&self, record: Record<T>) -> Result<()> {
    let record_id = record.record_id;
    if let Err(err) = self.purge::<T>(record_id).await {
      return Err(self.abort("force_delete", err).await);
    }

    info!(record_id = %record_id, kind = T::KIND, "record permanently deleted");
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All records of `T` whose `deleted_at` is absent.
  ///
  /// A store failure is returned as [`Error::Store`], never as an empty
  /// list. Callers that want failures to read as "no records" can use
  /// `.unwrap_or_default()`.
  pub async fn get_active<T: Entity>(&self) -> Result<Vec<Record<T>>> {
    self.read(LifecycleFilter::Active).await
  }

  /// All records of `T` whose `deleted_at` is present.
  pub async fn get_deleted<T: Entity>(&self) -> Result<Vec<Record<T>>> {
    self.read(LifecycleFilter::Deleted).await
  }

  // ── Bulk operations ───────────────────────────────────────────────────

  /// Purge every Deleted record of `T`, committing once per record.
  ///
  /// Not atomic as a whole: if record `k` fails, the `k` records before it
  /// stay purged and [`Error::PartialBulkFailure`] reports how far it got.
  pub async fn force_delete_all_deleted<T: Entity>(&self) -> Result<usize> {
    let deleted: Vec<Record<T>> = self.read(LifecycleFilter::Deleted).await?;
    let total = deleted.len();

    for (purged, record) in deleted.into_iter().enumerate() {
      if let Err(err) = self.purge::<T>(record.record_id).await {
        let source = self.abort("force_delete_all_deleted", err).await;
        return Err(match source {
          Error::Store(source) => Error::PartialBulkFailure { purged, total, source },
          other => other,
        });
      }
      debug!(record_id = %record.record_id, kind = T::KIND, "record purged");
    }

    info!(kind = T::KIND, count = total, "permanently deleted soft-deleted records");
    Ok(total)
  }

  /// Restore every Deleted record of `T` in a single commit.
  ///
  /// All-or-nothing at the commit boundary: on failure the whole batch is
  /// rolled back. `restored_by` is left untouched.
  pub async fn restore_all<T: Entity>(&self) -> Result<usize> {
    let mut deleted: Vec<Record<T>> =
      self.read(LifecycleFilter::Deleted).await?;

    let staged = async {
      for record in &mut deleted {
        record.tombstone_mut().clear_deletion();
        self.store.add(record).await?;
      }
      self.store.commit().await
    };

    if let Err(err) = staged.await {
      return Err(self.abort("restore_all", err).await);
    }

    let count = deleted.len();
    info!(kind = T::KIND, count, "restored soft-deleted records");
    Ok(count)
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn stage<T: Entity>(
    &self,
    record: &Record<T>,
    finish: Finish,
  ) -> Result<(), S::Error> {
    self.store.add(record).await?;
    match finish {
      Finish::Flush => self.store.flush().await,
      Finish::Commit => self.store.commit().await,
    }
  }

  async fn purge<T: Entity>(&self, record_id: Uuid) -> Result<(), S::Error> {
    self.store.expunge::<T>(record_id).await?;
    self.store.delete::<T>(record_id).await?;
    self.store.commit().await
  }

  async fn read<T: Entity>(
    &self,
    filter: LifecycleFilter,
  ) -> Result<Vec<Record<T>>> {
    match self.store.query::<T>(filter).await {
      Ok(records) => {
        info!(kind = T::KIND, %filter, count = records.len(), "retrieved records");
        Ok(records)
      }
      Err(err) => {
        error!(kind = T::KIND, %filter, error = %err, "failed to retrieve records");
        Err(Error::store(err))
      }
    }
  }

  /// Roll back after a failed operation and convert the failure.
  async fn abort(&self, operation: &'static str, err: S::Error) -> Error {
    error!(operation, error = %err, "lifecycle operation failed, rolling back");
    if let Err(rollback_err) = self.store.rollback().await {
      error!(operation, error = %rollback_err, "rollback failed");
    }
    Error::store(err)
  }
}
