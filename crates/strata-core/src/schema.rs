//! Record schema descriptors.
//!
//! Every record type describes its persisted attributes once, as a
//! [`RecordSchema`]. Backends derive tables, columns and bindings from this
//! description instead of inspecting the type at runtime.

use serde::{Deserialize, Serialize};

// ─── Semantic types ──────────────────────────────────────────────────────────

/// Element type of a [`SemanticType::List`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
  Text,
  Int,
  BigInt,
  Double,
  Float,
  Bool,
}

impl ScalarKind {
  pub fn name(self) -> &'static str {
    match self {
      Self::Text => "text",
      Self::Int => "int",
      Self::BigInt => "bigint",
      Self::Double => "double",
      Self::Float => "float",
      Self::Bool => "bool",
    }
  }
}

/// The storage-independent type of a persisted attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum SemanticType {
  Text,
  /// 32-bit signed integer.
  Int,
  /// 64-bit signed integer.
  BigInt,
  Double,
  Float,
  /// Fixed-point decimal.
  Decimal,
  Bool,
  Char,
  Timestamp,
  Uuid,
  /// An enumeration stored by its symbolic name.
  Enum,
  /// The name of another record type.
  TypeRef,
  /// A homogeneous sequence of primitive scalars.
  List(ScalarKind),
  /// Anything else; stored with the portable opaque encoding.
  Opaque,
}

impl SemanticType {
  pub fn name(self) -> &'static str {
    match self {
      Self::Text => "text",
      Self::Int => "int",
      Self::BigInt => "bigint",
      Self::Double => "double",
      Self::Float => "float",
      Self::Decimal => "decimal",
      Self::Bool => "bool",
      Self::Char => "char",
      Self::Timestamp => "timestamp",
      Self::Uuid => "uuid",
      Self::Enum => "enum",
      Self::TypeRef => "type_ref",
      Self::List(_) => "list",
      Self::Opaque => "opaque",
    }
  }

  /// Numeric types render as unquoted literals.
  pub fn is_numeric(self) -> bool {
    matches!(
      self,
      Self::Int | Self::BigInt | Self::Double | Self::Float | Self::Decimal
    )
  }
}

// ─── Descriptors ─────────────────────────────────────────────────────────────

/// One domain attribute of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
  pub name:     String,
  pub ty:       SemanticType,
  /// Excluded fields live on the type but are never persisted.
  pub excluded: bool,
}

/// The persisted shape of a record type.
///
/// Only domain attributes are listed; the versioning metadata shared by all
/// records ([`StateMeta`](crate::record::StateMeta)) is implied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
  /// Lower-cased type name; doubles as the table name.
  pub name:     String,
  pub fields:   Vec<FieldDef>,
  /// Excluded types are skipped by schema sync and refused by statements.
  pub excluded: bool,
}

impl RecordSchema {
  pub fn new(type_name: &str) -> Self {
    Self {
      name:     type_name.to_lowercase(),
      fields:   Vec::new(),
      excluded: false,
    }
  }

  /// Add a persisted attribute.
  pub fn field(mut self, name: &str, ty: SemanticType) -> Self {
    self.fields.push(FieldDef {
      name: name.to_owned(),
      ty,
      excluded: false,
    });
    self
  }

  /// Declare an attribute that is never persisted.
  pub fn skip(mut self, name: &str, ty: SemanticType) -> Self {
    self.fields.push(FieldDef {
      name: name.to_owned(),
      ty,
      excluded: true,
    });
    self
  }

  pub fn excluded(mut self, excluded: bool) -> Self {
    self.excluded = excluded;
    self
  }

  pub fn persisted_fields(&self) -> impl Iterator<Item = &FieldDef> {
    self.fields.iter().filter(|f| !f.excluded)
  }

  pub fn table(&self) -> &str { &self.name }
}
