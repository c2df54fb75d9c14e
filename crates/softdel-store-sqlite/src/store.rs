//! [`SqliteStore`] — the SQLite implementation of [`RecordStore`].

use std::{
  path::Path,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use softdel_core::{
  record::{Entity, Record},
  store::{LifecycleFilter, RecordStore},
};

use crate::{
  Error, Result,
  encode::{RawRecord, encode_uuid},
  schema::SCHEMA,
};

const SELECT_COLUMNS: &str = "SELECT record_id, kind, data_json, created_at, \
                              deleted_at, deleted_by, restored_by FROM records";

// ─── Unit of work ────────────────────────────────────────────────────────────

/// A write waiting for the next flush.
#[derive(Debug)]
enum Pending {
  Upsert(RawRecord),
  Delete { kind: &'static str, record_id: Uuid },
}

impl Pending {
  fn record_id(&self) -> String {
    match self {
      Self::Upsert(raw) => raw.record_id.clone(),
      Self::Delete { record_id, .. } => encode_uuid(*record_id),
    }
  }

  /// Apply the write. Returns the id of a record a delete failed to match.
  fn apply(&self, conn: &rusqlite::Connection) -> rusqlite::Result<Option<Uuid>> {
    match self {
      Self::Upsert(raw) => {
        conn.execute(
          "INSERT INTO records (
             record_id, kind, data_json, created_at,
             deleted_at, deleted_by, restored_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(record_id) DO UPDATE SET
             data_json   = excluded.data_json,
             deleted_at  = excluded.deleted_at,
             deleted_by  = excluded.deleted_by,
             restored_by = excluded.restored_by",
          rusqlite::params![
            raw.record_id,
            raw.kind,
            raw.data_json,
            raw.created_at,
            raw.deleted_at,
            raw.deleted_by,
            raw.restored_by,
          ],
        )?;
        Ok(None)
      }
      Self::Delete { kind, record_id } => {
        let affected = conn.execute(
          "DELETE FROM records WHERE record_id = ?1 AND kind = ?2",
          rusqlite::params![encode_uuid(*record_id), kind],
        )?;
        Ok((affected == 0).then_some(*record_id))
      }
    }
  }
}

/// Why a flush stopped. The writes it carried are handed back for restaging.
enum FlushFailure {
  Missing(Uuid),
  Sql(rusqlite::Error),
}

/// Apply every write in order, stopping at the first failure.
fn apply_all(
  conn: &rusqlite::Connection,
  ops: &[Pending],
) -> std::result::Result<(), FlushFailure> {
  for op in ops {
    match op.apply(conn) {
      Ok(None) => {}
      Ok(Some(id)) => return Err(FlushFailure::Missing(id)),
      Err(e) => return Err(FlushFailure::Sql(e)),
    }
  }
  Ok(())
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A soft-deletable record store backed by a single SQLite file.
///
/// Cloning is cheap. Clones share the connection and the staged writes, so
/// they behave as one session.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  pending: Arc<Mutex<Vec<Pending>>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_connection(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_connection(conn).await
  }

  async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self { conn, pending: Arc::default() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of writes staged but not yet flushed.
  pub fn pending_len(&self) -> usize { self.staged().len() }

  /// Whether a transaction is currently open on the connection.
  pub async fn in_transaction(&self) -> Result<bool> {
    Ok(self.conn.call(|conn| Ok(!conn.is_autocommit())).await?)
  }

  fn staged(&self) -> MutexGuard<'_, Vec<Pending>> {
    self.pending.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Put writes from a failed flush back ahead of anything staged since.
  fn restage(&self, ops: Vec<Pending>) {
    let mut staged = self.staged();
    let newer = std::mem::replace(&mut *staged, ops);
    staged.extend(newer);
  }

  fn stage(&self, op: Pending) {
    debug!(record_id = %op.record_id(), "staged write");
    self.staged().push(op);
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Staging ───────────────────────────────────────────────────────────────

  async fn add<T: Entity>(&self, record: &Record<T>) -> Result<()> {
    self.stage(Pending::Upsert(RawRecord::from_record(record)?));
    Ok(())
  }

  async fn delete<T: Entity>(&self, record_id: Uuid) -> Result<()> {
    self.stage(Pending::Delete { kind: T::KIND, record_id });
    Ok(())
  }

  async fn expunge<T: Entity>(&self, record_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(record_id);
    let mut staged = self.staged();
    let before = staged.len();
    staged.retain(|op| op.record_id() != id_str);
    debug!(%record_id, dropped = before - staged.len(), "expunged record");
    Ok(())
  }

  // ── Transaction control ───────────────────────────────────────────────────

  async fn flush(&self) -> Result<()> {
    let ops = std::mem::take(&mut *self.staged());
    if ops.is_empty() {
      return Ok(());
    }
    let count = ops.len();

    let outcome = self
      .conn
      .call(move |conn| {
        if conn.is_autocommit() {
          conn.execute_batch("BEGIN")?;
        }
        conn.execute_batch("SAVEPOINT flush")?;
        match apply_all(conn, &ops) {
          Ok(()) => {
            conn.execute_batch("RELEASE flush")?;
            Ok(Ok(()))
          }
          Err(failure) => {
            conn.execute_batch("ROLLBACK TO flush; RELEASE flush")?;
            Ok(Err((ops, failure)))
          }
        }
      })
      .await?;

    if let Err((ops, failure)) = outcome {
      debug!(count, "flush failed, writes restaged");
      self.restage(ops);
      return Err(match failure {
        FlushFailure::Missing(id) => Error::RecordNotFound(id),
        FlushFailure::Sql(e) => Error::Database(e.into()),
      });
    }

    debug!(count, "flushed staged writes");
    Ok(())
  }

  async fn commit(&self) -> Result<()> {
    self.flush().await?;
    self
      .conn
      .call(|conn| {
        if !conn.is_autocommit() {
          conn.execute_batch("COMMIT")?;
        }
        Ok(())
      })
      .await?;
    debug!("committed transaction");
    Ok(())
  }

  async fn rollback(&self) -> Result<()> {
    let dropped = std::mem::take(&mut *self.staged()).len();
    self
      .conn
      .call(|conn| {
        if !conn.is_autocommit() {
          conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
      })
      .await?;
    debug!(dropped, "rolled back transaction");
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn query<T: Entity>(&self, filter: LifecycleFilter) -> Result<Vec<Record<T>>> {
    self.flush().await?;

    let predicate = match filter {
      LifecycleFilter::Active => "AND deleted_at IS NULL",
      LifecycleFilter::Deleted => "AND deleted_at IS NOT NULL",
      LifecycleFilter::Any => "",
    };
    let sql = format!("{SELECT_COLUMNS} WHERE kind = ?1 {predicate} ORDER BY rowid");
    let kind = T::KIND;

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![kind], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn get<T: Entity>(&self, record_id: Uuid) -> Result<Option<Record<T>>> {
    self.flush().await?;

    let id_str = encode_uuid(record_id);
    let kind = T::KIND;

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{SELECT_COLUMNS} WHERE record_id = ?1 AND kind = ?2"),
              rusqlite::params![id_str, kind],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }
}
