//! The [`Record`] trait and the versioning metadata every record carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  ValueError,
  schema::{RecordSchema, SemanticType},
  value::{FromValue, ToValue, Value},
};

// ─── Metadata columns ────────────────────────────────────────────────────────

/// Version identifier column; primary key assigned by storage.
pub const RID: &str = "rid";
/// Entity identifier column.
pub const ID: &str = "id";
/// Active range start.
pub const ARSD: &str = "arsd";
/// Active range end; NULL while the state is open.
pub const ARED: &str = "ared";
/// Current flag.
pub const CF: &str = "cf";
/// Delete flag.
pub const DF: &str = "df";
/// Editing user.
pub const EUID: &str = "euid";
/// Editing system.
pub const ESID: &str = "esid";
/// Tenant.
pub const TID: &str = "tid";

/// Metadata columns in table order, with their semantic types.
pub const META_COLUMNS: [(&str, SemanticType); 9] = [
  (RID, SemanticType::BigInt),
  (ID, SemanticType::BigInt),
  (ARSD, SemanticType::Timestamp),
  (ARED, SemanticType::Timestamp),
  (CF, SemanticType::Bool),
  (DF, SemanticType::Bool),
  (EUID, SemanticType::BigInt),
  (ESID, SemanticType::BigInt),
  (TID, SemanticType::BigInt),
];

/// Tenant used when a caller does not name one.
pub const DEFAULT_TENANT_ID: i64 = 1;

/// Versioning metadata shared by every state of every record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMeta {
  /// Version identifier; `0` until the row is inserted.
  pub rid:  i64,
  /// Entity identifier; `<= 0` asks `save` to assign a fresh one.
  pub id:   i64,
  pub arsd: DateTime<Utc>,
  pub ared: Option<DateTime<Utc>>,
  pub cf:   bool,
  pub df:   bool,
  pub euid: i64,
  pub esid: i64,
  pub tid:  i64,
}

impl Default for StateMeta {
  fn default() -> Self {
    Self {
      rid:  0,
      id:   0,
      arsd: Utc::now(),
      ared: None,
      cf:   false,
      df:   false,
      euid: 0,
      esid: 0,
      tid:  DEFAULT_TENANT_ID,
    }
  }
}

impl StateMeta {
  pub fn get(&self, column: &str) -> Option<Value> {
    let value = match column {
      RID => self.rid.to_value(),
      ID => self.id.to_value(),
      ARSD => self.arsd.to_value(),
      ARED => self.ared.to_value(),
      CF => self.cf.to_value(),
      DF => self.df.to_value(),
      EUID => self.euid.to_value(),
      ESID => self.esid.to_value(),
      TID => self.tid.to_value(),
      _ => return None,
    };
    Some(value)
  }

  pub fn set(&mut self, column: &str, value: Value) -> Result<(), ValueError> {
    match column {
      RID => self.rid = FromValue::from_value(value)?,
      ID => self.id = FromValue::from_value(value)?,
      ARSD => self.arsd = FromValue::from_value(value)?,
      ARED => self.ared = FromValue::from_value(value)?,
      CF => self.cf = FromValue::from_value(value)?,
      DF => self.df = FromValue::from_value(value)?,
      EUID => self.euid = FromValue::from_value(value)?,
      ESID => self.esid = FromValue::from_value(value)?,
      TID => self.tid = FromValue::from_value(value)?,
      other => return Err(ValueError::UnknownField(other.to_owned())),
    }
    Ok(())
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A plain data type persisted as a sequence of versioned states.
///
/// Implement it with [`impl_record!`](crate::impl_record) unless a field
/// needs custom conversion.
pub trait Record: Clone + Default + Send + Sync + 'static {
  /// The persisted shape of the type.
  fn schema() -> RecordSchema;

  fn meta(&self) -> &StateMeta;

  fn meta_mut(&mut self) -> &mut StateMeta;

  /// Read a domain attribute; `None` if the record has no such field.
  fn get(&self, field: &str) -> Option<Value>;

  /// Write a domain attribute from a non-null value.
  fn set(&mut self, field: &str, value: Value) -> Result<(), ValueError>;
}

pub fn is_meta_column(column: &str) -> bool {
  META_COLUMNS.iter().any(|(name, _)| *name == column)
}

/// Read any persisted column, metadata or domain attribute.
pub fn column_value<R: Record>(record: &R, column: &str) -> Option<Value> {
  record.meta().get(column).or_else(|| record.get(column))
}

/// Write any persisted column, metadata or domain attribute.
pub fn set_column<R: Record>(
  record: &mut R,
  column: &str,
  value: Value,
) -> Result<(), ValueError> {
  if is_meta_column(column) {
    record.meta_mut().set(column, value)
  } else {
    record.set(column, value)
  }
}

/// Implement [`Record`] for a struct with a `StateMeta` field.
///
/// ```ignore
/// #[derive(Debug, Clone, Default)]
/// pub struct Person {
///   pub meta:    StateMeta,
///   pub name:    String,
///   pub age:     i32,
///   pub scratch: String,
/// }
///
/// impl_record! {
///   Person {
///     name: Text,
///     age:  Int,
///   }
///   skip { scratch: Text }
/// }
/// ```
///
/// Field types are [`SemanticType`] variants; `as "table"` overrides the
/// table name and `excluded = true` keeps the type out of storage.
#[macro_export]
macro_rules! impl_record {
  (
    $ty:ident $(as $table:literal)? {
      $($field:ident : $sem:expr),* $(,)?
    }
    $(skip { $($skipped:ident : $skip_sem:expr),* $(,)? })?
    $(excluded = $excluded:expr)?
  ) => {
    impl $crate::record::Record for $ty {
      #[allow(unused_imports, unused_variables)]
      fn schema() -> $crate::schema::RecordSchema {
        use $crate::schema::{ScalarKind, SemanticType::*};

        let table = stringify!($ty);
        $(let table = $table;)?
        let schema = $crate::schema::RecordSchema::new(table)
          $(.field(stringify!($field), $sem))*
          $($(.skip(stringify!($skipped), $skip_sem))*)?;
        $(let schema = schema.excluded($excluded);)?
        schema
      }

      fn meta(&self) -> &$crate::record::StateMeta { &self.meta }

      fn meta_mut(&mut self) -> &mut $crate::record::StateMeta { &mut self.meta }

      fn get(&self, field: &str) -> ::std::option::Option<$crate::value::Value> {
        match field {
          $(stringify!($field) => ::std::option::Option::Some(
            $crate::value::ToValue::to_value(&self.$field),
          ),)*
          _ => ::std::option::Option::None,
        }
      }

      fn set(
        &mut self,
        field: &str,
        value: $crate::value::Value,
      ) -> ::std::result::Result<(), $crate::ValueError> {
        match field {
          $(stringify!($field) => {
            self.$field = $crate::value::FromValue::from_value(value)?;
            ::std::result::Result::Ok(())
          })*
          other => ::std::result::Result::Err(
            $crate::ValueError::UnknownField(other.to_owned()),
          ),
        }
      }
    }
  };
}
