//! Additive schema synchronisation.
//!
//! For every registered record type the table is created if absent, then
//! every mapped column missing from it is added. Nothing is ever dropped or
//! altered. Each type and each column is handled on its own; a failure is
//! logged and counted, and the sweep carries on.

use rusqlite::{Connection, OptionalExtension as _};
use serde::Serialize;
use strata_core::{catalog::Catalog, schema::RecordSchema};
use tracing::{debug, info, warn};

use crate::{
  Result,
  mapper::{add_column_sql, columns, create_table_sql},
};

/// Connection settings applied once at startup.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  pub tables_created: usize,
  pub columns_added:  usize,
  pub failures:       usize,
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
  let found = conn
    .query_row(
      "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
      [table],
      |_| Ok(()),
    )
    .optional()?;
  Ok(found.is_some())
}

fn existing_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
  let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
  let names = stmt
    .query_map([table], |row| row.get::<_, String>(0))?
    .collect::<Result<Vec<_>, _>>()?;
  Ok(names.into_iter().map(|n| n.to_lowercase()).collect())
}

fn sync_schema(conn: &Connection, schema: &RecordSchema, report: &mut SyncReport) -> Result<()> {
  let table = schema.table();

  if !table_exists(conn, table)? {
    let sql = create_table_sql(schema);
    debug!(%sql, "create table");
    conn.execute_batch(&sql)?;
    info!(table, "created table");
    report.tables_created += 1;
    return Ok(());
  }

  let existing = existing_columns(conn, table)?;
  for column in columns(schema) {
    if existing.contains(&column.column) {
      continue;
    }
    let sql = add_column_sql(table, &column);
    debug!(%sql, "add column");
    match conn.execute_batch(&sql) {
      Ok(()) => {
        info!(table, column = %column.column, "added column");
        report.columns_added += 1;
      }
      Err(e) => {
        warn!(table, column = %column.column, error = %e, "could not add column");
        report.failures += 1;
      }
    }
  }
  Ok(())
}

/// Bring storage in line with every non-excluded type in `catalog`.
pub fn sync_catalog(conn: &Connection, catalog: &Catalog) -> SyncReport {
  let mut report = SyncReport::default();
  for schema in catalog.schemas() {
    if schema.excluded {
      debug!(table = schema.table(), "skipping excluded type");
      continue;
    }
    if let Err(e) = sync_schema(conn, schema, &mut report) {
      warn!(table = schema.table(), error = %e, "could not synchronise table");
      report.failures += 1;
    }
  }
  report
}
