//! Error types for `softdel-core`.

use thiserror::Error;

/// A boxed error raised by a [`RecordStore`](crate::store::RecordStore)
/// backend.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// The persistence port failed on flush, commit, or query.
  #[error("store failure: {0}")]
  Store(#[source] StoreError),

  /// A non-atomic bulk purge stopped partway through. Records purged before
  /// the failure stay purged.
  #[error("bulk purge stopped after {purged} of {total} records: {source}")]
  PartialBulkFailure {
    purged: usize,
    total:  usize,
    #[source]
    source: StoreError,
  },
}

impl Error {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  /// Whether this error came from the persistence port.
  pub fn is_store_failure(&self) -> bool {
    matches!(self, Self::Store(_) | Self::PartialBulkFailure { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
