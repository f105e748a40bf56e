//! Generated INSERT, UPDATE and SELECT statements for any record type.
//!
//! Functions take a plain `&Connection` so they run unchanged inside a
//! transaction (`Transaction` derefs to `Connection`).

use rusqlite::{Connection, Row, params_from_iter, types::Value as SqlValue};
use strata_core::{
  predicate::{Predicate, render_where},
  record::{RID, Record, column_value, set_column},
  schema::RecordSchema,
  value::Value,
};
use tracing::{debug, warn};

use crate::{
  Error, Result,
  encode::{bind, unbind},
  mapper::{ColumnDescriptor, columns, quote_ident},
};

fn persisted<R: Record>() -> Result<(RecordSchema, Vec<ColumnDescriptor>)> {
  let schema = R::schema();
  if schema.excluded {
    return Err(Error::ExcludedType(schema.name));
  }
  let columns = columns(&schema);
  Ok((schema, columns))
}

fn bind_columns<R: Record>(record: &R, columns: &[ColumnDescriptor]) -> Result<Vec<SqlValue>> {
  columns
    .iter()
    .map(|c| bind(&column_value(record, &c.field).unwrap_or(Value::Null)))
    .collect()
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Insert every persisted column except `rid`; returns the assigned `rid`.
pub fn insert<R: Record>(conn: &Connection, record: &R) -> Result<i64> {
  let (schema, columns) = persisted::<R>()?;
  let columns: Vec<_> = columns.into_iter().filter(|c| !c.primary_key).collect();

  let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.column)).collect();
  let placeholders = vec!["?"; columns.len()].join(", ");
  let sql = format!(
    "INSERT INTO {} ({}) VALUES ({placeholders}) RETURNING {RID}",
    quote_ident(schema.table()),
    names.join(", "),
  );
  debug!(%sql, "insert");

  let params = bind_columns(record, &columns)?;
  let rid = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
  Ok(rid)
}

/// Rewrite every persisted column of the row with the record's `rid`.
pub fn update<R: Record>(conn: &Connection, record: &R) -> Result<()> {
  let (schema, columns) = persisted::<R>()?;
  let columns: Vec<_> = columns.into_iter().filter(|c| !c.primary_key).collect();

  let assignments: Vec<String> = columns
    .iter()
    .map(|c| format!("{} = ?", quote_ident(&c.column)))
    .collect();
  let sql = format!(
    "UPDATE {} SET {} WHERE {RID} = ?",
    quote_ident(schema.table()),
    assignments.join(", "),
  );
  debug!(%sql, "update");

  let rid = record.meta().rid;
  let mut params = bind_columns(record, &columns)?;
  params.push(SqlValue::Integer(rid));
  if conn.execute(&sql, params_from_iter(params.iter()))? == 0 {
    return Err(Error::VersionNotFound(rid));
  }
  Ok(())
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// Select rows of `R`. `projection` defaults to `*`; columns it leaves out
/// keep their default values.
pub fn select<R: Record>(
  conn: &Connection,
  projection: Option<&[&str]>,
  predicates: &[Predicate],
) -> Result<Vec<R>> {
  let (schema, columns) = persisted::<R>()?;
  let projection = projection.map_or_else(|| "*".to_owned(), |p| p.join(", "));
  let sql = format!(
    "SELECT {projection} FROM {}{}",
    quote_ident(schema.table()),
    render_where(predicates)?,
  );
  debug!(%sql, "select");

  let mut stmt = conn.prepare(&sql)?;
  let mut rows = stmt.query([])?;
  let mut records = Vec::new();
  while let Some(row) = rows.next()? {
    records.push(populate::<R>(row, &columns));
  }
  Ok(records)
}

/// Build one record from a row. Per-column failures leave the attribute at
/// its default.
fn populate<R: Record>(row: &Row<'_>, columns: &[ColumnDescriptor]) -> R {
  let mut record = R::default();
  for column in columns {
    let raw = match row.get_ref(column.column.as_str()) {
      Ok(raw) => raw,
      Err(rusqlite::Error::InvalidColumnName(name)) => {
        debug!(column = %name, "column not in result set");
        continue;
      }
      Err(e) => {
        warn!(column = %column.column, error = %e, "could not read column");
        continue;
      }
    };

    let value = match unbind(raw, column.ty) {
      Ok(Value::Null) => continue,
      Ok(value) => value,
      Err(e) => {
        warn!(column = %column.column, error = %e, "could not decode column");
        continue;
      }
    };

    if let Err(e) = set_column(&mut record, &column.field, value) {
      warn!(column = %column.column, error = %e, "could not set attribute");
    }
  }
  record
}
