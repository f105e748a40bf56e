//! Mapping from record schemas to SQLite columns and DDL.

use strata_core::{
  record::{ARSD, META_COLUMNS, RID},
  schema::{RecordSchema, SemanticType},
};

/// One persisted column of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
  pub field:       String,
  pub ty:          SemanticType,
  pub column:      String,
  pub sql_type:    &'static str,
  pub primary_key: bool,
}

pub fn sql_type(column: &str, ty: SemanticType) -> &'static str {
  match (column, ty) {
    (RID, _) => "INTEGER PRIMARY KEY AUTOINCREMENT",
    (ARSD, SemanticType::Timestamp) => "TIMESTAMP DEFAULT CURRENT_TIMESTAMP",
    (_, SemanticType::Text) => "TEXT",
    (_, SemanticType::Int) => "INT",
    (_, SemanticType::BigInt) => "BIGINT",
    (_, SemanticType::Double) => "DOUBLE PRECISION",
    (_, SemanticType::Float) => "REAL",
    (_, SemanticType::Decimal) => "NUMERIC(10,4)",
    (_, SemanticType::Bool) => "BOOLEAN",
    (_, SemanticType::Char) => "CHAR(1)",
    (_, SemanticType::Timestamp) => "TIMESTAMP NULL",
    (_, SemanticType::Uuid) => "VARCHAR(132)",
    (_, SemanticType::Enum | SemanticType::TypeRef) => "VARCHAR(200)",
    (_, SemanticType::List(_)) => "TEXT",
    (_, SemanticType::Opaque) => "BLOB",
  }
}

fn descriptor(field: &str, ty: SemanticType) -> ColumnDescriptor {
  let column = field.to_lowercase();
  ColumnDescriptor {
    sql_type: sql_type(&column, ty),
    primary_key: column == RID,
    field: field.to_owned(),
    ty,
    column,
  }
}

/// Metadata columns first, then persisted domain attributes in declaration
/// order.
pub fn columns(schema: &RecordSchema) -> Vec<ColumnDescriptor> {
  META_COLUMNS
    .iter()
    .map(|(name, ty)| descriptor(name, *ty))
    .chain(schema.persisted_fields().map(|f| descriptor(&f.name, f.ty)))
    .collect()
}

pub fn quote_ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

pub fn create_table_sql(schema: &RecordSchema) -> String {
  let defs: Vec<String> = columns(schema)
    .iter()
    .map(|c| format!("{} {}", quote_ident(&c.column), c.sql_type))
    .collect();
  format!(
    "CREATE TABLE IF NOT EXISTS {} ({})",
    quote_ident(schema.table()),
    defs.join(", ")
  )
}

pub fn add_column_sql(table: &str, column: &ColumnDescriptor) -> String {
  // SQLite refuses ADD COLUMN with a non-constant default.
  let sql_type = column
    .sql_type
    .strip_suffix(" DEFAULT CURRENT_TIMESTAMP")
    .unwrap_or(column.sql_type);
  format!(
    "ALTER TABLE {} ADD COLUMN {} {sql_type}",
    quote_ident(table),
    quote_ident(&column.column),
  )
}

#[cfg(test)]
mod tests {
  use strata_core::schema::ScalarKind;

  use super::*;

  #[test]
  fn metadata_columns_come_first() {
    let schema = RecordSchema::new("Person")
      .field("Name", SemanticType::Text)
      .skip("scratch", SemanticType::Text);
    let cols = columns(&schema);
    let names: Vec<_> = cols.iter().map(|c| c.column.as_str()).collect();
    assert_eq!(
      names,
      ["rid", "id", "arsd", "ared", "cf", "df", "euid", "esid", "tid", "name"]
    );
    assert!(cols[0].primary_key);
    assert_eq!(cols[0].sql_type, "INTEGER PRIMARY KEY AUTOINCREMENT");
    assert_eq!(cols[2].sql_type, "TIMESTAMP DEFAULT CURRENT_TIMESTAMP");
    assert_eq!(cols[3].sql_type, "TIMESTAMP NULL");
    assert_eq!(cols[9].field, "Name");
  }

  #[test]
  fn type_table() {
    assert_eq!(sql_type("price", SemanticType::Decimal), "NUMERIC(10,4)");
    assert_eq!(sql_type("tags", SemanticType::List(ScalarKind::Text)), "TEXT");
    assert_eq!(sql_type("kind", SemanticType::Enum), "VARCHAR(200)");
    assert_eq!(sql_type("blob", SemanticType::Opaque), "BLOB");
    assert_eq!(sql_type("uid", SemanticType::Uuid), "VARCHAR(132)");
  }

  #[test]
  fn ddl() {
    let schema = RecordSchema::new("Tag").field("label", SemanticType::Text);
    let sql = create_table_sql(&schema);
    assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"tag\" (\"rid\" INTEGER PRIMARY KEY"));
    assert!(sql.ends_with("\"label\" TEXT)"));

    let cols = columns(&schema);
    assert_eq!(
      add_column_sql("tag", &cols[9]),
      "ALTER TABLE \"tag\" ADD COLUMN \"label\" TEXT"
    );
    assert_eq!(
      add_column_sql("tag", &cols[2]),
      "ALTER TABLE \"tag\" ADD COLUMN \"arsd\" TIMESTAMP"
    );
  }
}
