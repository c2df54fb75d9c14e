//! Soft-deletable records and their deletion columns.
//!
//! A record's lifecycle state is never stored as its own field. The presence
//! of `deleted_at` is the sole source of truth: absent means Active, present
//! means Deleted. Purging is not a state at all; a purged record is consumed
//! by [`Lifecycle::force_delete`](crate::Lifecycle::force_delete) and no
//! longer exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// Identifier of the user (or other actor) performing a lifecycle operation.
pub type ActorId = i64;

// ─── State ───────────────────────────────────────────────────────────────────

/// The live lifecycle state of a record, derived from its [`Tombstone`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
  Active,
  Deleted,
}

// ─── Tombstone ───────────────────────────────────────────────────────────────

/// The three nullable deletion columns carried by every soft-deletable
/// record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
  /// When the record was soft-deleted, always UTC. `None` while Active.
  pub deleted_at:  Option<DateTime<Utc>>,
  /// Who soft-deleted the record. Only meaningful while `deleted_at` is set.
  pub deleted_by:  Option<ActorId>,
  /// Who most recently restored the record. Historical marker; a later
  /// soft-delete leaves it in place.
  pub restored_by: Option<ActorId>,
}

impl Tombstone {
  pub fn state(&self) -> LifecycleState {
    match self.deleted_at {
      Some(_) => LifecycleState::Deleted,
      None => LifecycleState::Active,
    }
  }

  /// Move to the Deleted state at `at`. `deleted_by` is only overwritten
  /// when an actor is given.
  pub fn mark_deleted(&mut self, at: DateTime<Utc>, actor: Option<ActorId>) {
    self.deleted_at = Some(at);
    if let Some(actor) = actor {
      self.deleted_by = Some(actor);
    }
  }

  /// Move to the Active state, clearing both deletion columns together.
  pub fn mark_restored(&mut self, actor: Option<ActorId>) {
    self.clear_deletion();
    if let Some(actor) = actor {
      self.restored_by = Some(actor);
    }
  }

  /// Clear `deleted_at` and `deleted_by` without recording a restorer.
  pub fn clear_deletion(&mut self) {
    self.deleted_at = None;
    self.deleted_by = None;
  }
}

// ─── Capability ──────────────────────────────────────────────────────────────

/// The soft-delete capability. Any record type that carries a [`Tombstone`]
/// gets the state accessors for free.
pub trait SoftDeletable {
  fn tombstone(&self) -> &Tombstone;
  fn tombstone_mut(&mut self) -> &mut Tombstone;

  fn state(&self) -> LifecycleState { self.tombstone().state() }

  fn is_active(&self) -> bool { self.state() == LifecycleState::Active }

  fn is_deleted(&self) -> bool { self.state() == LifecycleState::Deleted }

  fn deleted_at(&self) -> Option<DateTime<Utc>> { self.tombstone().deleted_at }

  fn deleted_by(&self) -> Option<ActorId> { self.tombstone().deleted_by }

  fn restored_by(&self) -> Option<ActorId> { self.tombstone().restored_by }
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// An application payload that can be persisted as a soft-deletable record.
///
/// `KIND` is the discriminant stored alongside each row; it partitions the
/// store so that queries for one entity type never see another's records.
pub trait Entity:
  Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
  const KIND: &'static str;
}

/// A persisted entity together with its identity and deletion columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
  pub record_id:  Uuid,
  pub created_at: DateTime<Utc>,
  #[serde(flatten)]
  pub tombstone:  Tombstone,
  pub data:       T,
}

impl<T: Entity> Record<T> {
  /// A fresh Active record with a new UUID. Nothing is persisted until the
  /// record is handed to a store.
  pub fn new(data: T) -> Self {
    Self {
      record_id: Uuid::new_v4(),
      created_at: Utc::now(),
      tombstone: Tombstone::default(),
      data,
    }
  }

  pub fn kind(&self) -> &'static str { T::KIND }
}

impl<T> SoftDeletable for Record<T> {
  fn tombstone(&self) -> &Tombstone { &self.tombstone }

  fn tombstone_mut(&mut self) -> &mut Tombstone { &mut self.tombstone }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Sample {
    label: String,
  }

  impl Entity for Sample {
    const KIND: &'static str = "sample";
  }

  fn sample() -> Record<Sample> {
    Record::new(Sample { label: "a".into() })
  }

  #[test]
  fn new_record_is_active() {
    let r = sample();
    assert!(r.is_active());
    assert_eq!(r.tombstone, Tombstone::default());
    assert_eq!(r.kind(), "sample");
  }

  #[test]
  fn mark_deleted_sets_columns() {
    let mut r = sample();
    let now = Utc::now();
    r.tombstone.mark_deleted(now, Some(7));

    assert!(r.is_deleted());
    assert_eq!(r.deleted_at(), Some(now));
    assert_eq!(r.deleted_by(), Some(7));
    assert_eq!(r.restored_by(), None);
  }

  #[test]
  fn mark_deleted_without_actor_keeps_deleted_by() {
    let mut t = Tombstone::default();
    t.mark_deleted(Utc::now(), Some(3));
    t.mark_deleted(Utc::now(), None);
    assert_eq!(t.deleted_by, Some(3));
  }

  #[test]
  fn restore_clears_deleted_by_together_with_deleted_at() {
    let mut t = Tombstone::default();
    t.mark_deleted(Utc::now(), Some(1));
    t.mark_restored(Some(2));

    assert_eq!(t.state(), LifecycleState::Active);
    assert_eq!(t.deleted_at, None);
    assert_eq!(t.deleted_by, None);
    assert_eq!(t.restored_by, Some(2));
  }

  #[test]
  fn restore_on_active_still_records_restorer() {
    let mut t = Tombstone::default();
    t.mark_restored(Some(5));
    assert_eq!(t.state(), LifecycleState::Active);
    assert_eq!(t.restored_by, Some(5));
  }

  #[test]
  fn soft_delete_after_restore_keeps_stale_restored_by() {
    let mut t = Tombstone::default();
    t.mark_deleted(Utc::now(), Some(1));
    t.mark_restored(Some(2));
    t.mark_deleted(Utc::now(), Some(3));

    assert_eq!(t.deleted_by, Some(3));
    assert_eq!(t.restored_by, Some(2));
  }

  #[test]
  fn state_displays_snake_case() {
    assert_eq!(LifecycleState::Active.to_string(), "active");
    assert_eq!(LifecycleState::Deleted.as_ref(), "deleted");
  }
}
