//! Error type for `strata-store-sqlite`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] strata_core::Error),

  #[error("value error: {0}")]
  Value(#[from] strata_core::ValueError),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("codec error: {0}")]
  Codec(#[from] strata_core::CodecError),

  #[error("{op} timed out after {after:?}")]
  Timeout { op: &'static str, after: Duration },

  /// The record type is marked as excluded from storage.
  #[error("record type {0:?} is excluded from storage")]
  ExcludedType(String),

  /// A just-written version could not be read back.
  #[error("version {0} not found")]
  VersionNotFound(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
