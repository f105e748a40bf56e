//! The set of record types a store manages.

use crate::{
  record::Record,
  schema::RecordSchema,
  system::{System, Tenant},
};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
  schemas: Vec<RecordSchema>,
}

impl Catalog {
  pub fn new() -> Self { Self::default() }

  /// A catalog with the built-in [`System`] and [`Tenant`] records.
  pub fn with_builtins() -> Self { Self::new().register::<System>().register::<Tenant>() }

  /// Register a record type. Registering the same table twice keeps the
  /// first schema.
  pub fn register<R: Record>(mut self) -> Self {
    let schema = R::schema();
    if self.schemas.iter().all(|s| s.name != schema.name) {
      self.schemas.push(schema);
    }
    self
  }

  pub fn schemas(&self) -> &[RecordSchema] { &self.schemas }

  pub fn get(&self, table: &str) -> Option<&RecordSchema> {
    self.schemas.iter().find(|s| s.name == table)
  }
}
