//! Connection handle.
//!
//! All access goes through one [`tokio_rusqlite::Connection`], whose
//! background thread owns the SQLite handle. Each call is bounded by the
//! configured statement timeout, enforced on that thread: a call that misses
//! its deadline is interrupted and rolled back, so [`Error::Timeout`] always
//! means nothing was written.

use std::{
  path::Path,
  time::{Duration, Instant},
};

use rusqlite::{ErrorCode, TransactionBehavior};
use tracing::warn;

use crate::{Error, Result};

pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Virtual machine steps between deadline checks.
const PROGRESS_STEPS: i32 = 1000;

#[derive(Clone)]
pub struct Database {
  conn:    tokio_rusqlite::Connection,
  timeout: Duration,
}

impl Database {
  pub async fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Ok(Self { conn, timeout })
  }

  pub async fn open_in_memory(timeout: Duration) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Ok(Self { conn, timeout })
  }

  pub fn timeout(&self) -> Duration { self.timeout }

  /// The same connection with a different statement timeout.
  pub fn with_timeout(&self, timeout: Duration) -> Self {
    Self {
      conn: self.conn.clone(),
      timeout,
    }
  }

  /// Run `f` on the connection thread.
  ///
  /// The deadline starts now. A call still queued at the deadline never runs;
  /// one still executing is interrupted.
  pub async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    let after = self.timeout;
    let deadline = Instant::now() + after;
    let outcome = self
      .conn
      .call(move |conn| Ok(run_until(conn, deadline, f)))
      .await?;

    match outcome {
      Err(e) if is_interrupt(&e) && Instant::now() >= deadline => {
        warn!(op, ?after, "statement timed out");
        Err(Error::Timeout { op, after })
      }
      Err(Error::Timeout { .. }) => {
        warn!(op, ?after, "statement timed out before it started");
        Err(Error::Timeout { op, after })
      }
      outcome => outcome.inspect_err(|e| warn!(op, error = %e, "statement failed")),
    }
  }

  /// Run `f` inside an immediate transaction; any error rolls it back.
  pub async fn transaction<T, F>(&self, op: &'static str, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .run(op, move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
      })
      .await
  }
}

fn run_until<T, F>(conn: &mut rusqlite::Connection, deadline: Instant, f: F) -> Result<T>
where
  F: FnOnce(&mut rusqlite::Connection) -> Result<T>,
{
  let remaining = deadline.checked_duration_since(Instant::now());
  let Some(remaining) = remaining.filter(|d| !d.is_zero()) else {
    return Err(Error::Timeout {
      op:    "queued",
      after: Duration::ZERO,
    });
  };
  conn.busy_timeout(remaining)?;
  conn.progress_handler(PROGRESS_STEPS, Some(move || Instant::now() >= deadline));
  let out = f(conn);
  conn.progress_handler(PROGRESS_STEPS, None::<fn() -> bool>);
  out
}

/// Whether `e` is SQLite giving up on an interrupted or locked statement.
fn is_interrupt(e: &Error) -> bool {
  let Error::Sqlite(e) = e else { return false };
  matches!(
    e.sqlite_error_code(),
    Some(ErrorCode::OperationInterrupted | ErrorCode::DatabaseBusy)
  )
}
