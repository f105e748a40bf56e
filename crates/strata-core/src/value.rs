//! In-memory attribute values and the conversions between record fields and
//! [`Value`].
//!
//! Backends bind and read [`Value`]s; record types convert their fields with
//! [`ToValue`] and [`FromValue`].

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{ValueError, record::Record};

/// Textual timestamp format used in storage and in predicate literals.
///
/// Fixed-width microseconds keep lexicographic order equal to time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub fn format_timestamp(dt: DateTime<Utc>) -> String {
  dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts the storage format, the
/// `CURRENT_TIMESTAMP` form without fraction, and RFC 3339.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
    .map(|naive| naive.and_utc())
    .ok()
    .or_else(|| {
      DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
    })
}

// ─── Value ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Text(String),
  Int(i32),
  BigInt(i64),
  Double(f64),
  Float(f32),
  Decimal(BigDecimal),
  Bool(bool),
  Char(char),
  Timestamp(DateTime<Utc>),
  Uuid(Uuid),
  /// Enumeration member or type name.
  Symbol(String),
  List(Vec<Value>),
  Opaque(serde_json::Value),
}

impl Value {
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Null => "null",
      Self::Text(_) => "text",
      Self::Int(_) => "int",
      Self::BigInt(_) => "bigint",
      Self::Double(_) => "double",
      Self::Float(_) => "float",
      Self::Decimal(_) => "decimal",
      Self::Bool(_) => "bool",
      Self::Char(_) => "char",
      Self::Timestamp(_) => "timestamp",
      Self::Uuid(_) => "uuid",
      Self::Symbol(_) => "symbol",
      Self::List(_) => "list",
      Self::Opaque(_) => "opaque",
    }
  }

  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  fn mismatch(&self, expected: &'static str) -> ValueError {
    ValueError::TypeMismatch {
      expected,
      found: self.kind(),
    }
  }
}

// ─── Conversion traits ───────────────────────────────────────────────────────

/// Convert a record field into a [`Value`].
pub trait ToValue {
  fn to_value(&self) -> Value;
}

/// Rebuild a record field from a non-null [`Value`].
pub trait FromValue: Sized {
  fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl ToValue for String {
  fn to_value(&self) -> Value { Value::Text(self.clone()) }
}

impl FromValue for String {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Text(s) | Value::Symbol(s) => Ok(s),
      Value::Char(c) => Ok(c.to_string()),
      other => Err(other.mismatch("text")),
    }
  }
}

impl ToValue for i32 {
  fn to_value(&self) -> Value { Value::Int(*self) }
}

impl FromValue for i32 {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Int(i) => Ok(i),
      Value::BigInt(i) => {
        i32::try_from(i).map_err(|_| ValueError::OutOfRange(i.to_string()))
      }
      other => Err(other.mismatch("int")),
    }
  }
}

impl ToValue for i64 {
  fn to_value(&self) -> Value { Value::BigInt(*self) }
}

impl FromValue for i64 {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::BigInt(i) => Ok(i),
      Value::Int(i) => Ok(i64::from(i)),
      other => Err(other.mismatch("bigint")),
    }
  }
}

impl ToValue for f64 {
  fn to_value(&self) -> Value { Value::Double(*self) }
}

impl FromValue for f64 {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Double(f) => Ok(f),
      Value::Float(f) => Ok(f64::from(f)),
      Value::Int(i) => Ok(f64::from(i)),
      other => Err(other.mismatch("double")),
    }
  }
}

impl ToValue for f32 {
  fn to_value(&self) -> Value { Value::Float(*self) }
}

impl FromValue for f32 {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Float(f) => Ok(f),
      Value::Double(f) => Ok(f as f32),
      other => Err(other.mismatch("float")),
    }
  }
}

impl ToValue for BigDecimal {
  fn to_value(&self) -> Value { Value::Decimal(self.clone()) }
}

impl FromValue for BigDecimal {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Decimal(d) => Ok(d),
      Value::Text(s) => BigDecimal::from_str(&s)
        .map_err(|_| ValueError::OutOfRange(s)),
      other => Err(other.mismatch("decimal")),
    }
  }
}

impl ToValue for bool {
  fn to_value(&self) -> Value { Value::Bool(*self) }
}

impl FromValue for bool {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Bool(b) => Ok(b),
      other => Err(other.mismatch("bool")),
    }
  }
}

impl ToValue for char {
  fn to_value(&self) -> Value { Value::Char(*self) }
}

impl FromValue for char {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Char(c) => Ok(c),
      Value::Text(s) => {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
          (Some(c), None) => Ok(c),
          _ => Err(ValueError::OutOfRange(s)),
        }
      }
      other => Err(other.mismatch("char")),
    }
  }
}

impl ToValue for DateTime<Utc> {
  fn to_value(&self) -> Value { Value::Timestamp(*self) }
}

impl FromValue for DateTime<Utc> {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Timestamp(dt) => Ok(dt),
      Value::Text(s) => parse_timestamp(&s).ok_or(ValueError::OutOfRange(s)),
      other => Err(other.mismatch("timestamp")),
    }
  }
}

impl ToValue for Uuid {
  fn to_value(&self) -> Value { Value::Uuid(*self) }
}

impl FromValue for Uuid {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Uuid(u) => Ok(u),
      Value::Text(s) => Uuid::parse_str(&s).map_err(|_| ValueError::OutOfRange(s)),
      other => Err(other.mismatch("uuid")),
    }
  }
}

impl<T: ToValue> ToValue for Option<T> {
  fn to_value(&self) -> Value {
    match self {
      Some(v) => v.to_value(),
      None => Value::Null,
    }
  }
}

impl<T: FromValue> FromValue for Option<T> {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Null => Ok(None),
      other => T::from_value(other).map(Some),
    }
  }
}

impl<T: ToValue> ToValue for Vec<T> {
  fn to_value(&self) -> Value {
    Value::List(self.iter().map(ToValue::to_value).collect())
  }
}

impl<T: FromValue> FromValue for Vec<T> {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::List(items) => items.into_iter().map(T::from_value).collect(),
      other => Err(other.mismatch("list")),
    }
  }
}

// ─── Opaque ──────────────────────────────────────────────────────────────────

/// A field of any serde-serialisable type, persisted with the portable
/// opaque encoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Opaque<T>(pub T);

impl<T: Serialize> ToValue for Opaque<T> {
  fn to_value(&self) -> Value {
    match serde_json::to_value(&self.0) {
      Ok(tree) => Value::Opaque(tree),
      Err(e) => {
        tracing::warn!(error = %e, "could not serialise opaque attribute; binding NULL");
        Value::Null
      }
    }
  }
}

impl<T: DeserializeOwned> FromValue for Opaque<T> {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Opaque(tree) => serde_json::from_value(tree)
        .map(Opaque)
        .map_err(ValueError::Opaque),
      other => Err(other.mismatch("opaque")),
    }
  }
}

// ─── Type references ─────────────────────────────────────────────────────────

/// The name of a record type, stored by its table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub struct TypeName(pub String);

impl TypeName {
  pub fn of<R: Record>() -> Self { Self(R::schema().name) }
}

impl ToValue for TypeName {
  fn to_value(&self) -> Value { Value::Symbol(self.0.clone()) }
}

impl FromValue for TypeName {
  fn from_value(value: Value) -> Result<Self, ValueError> {
    match value {
      Value::Symbol(s) | Value::Text(s) => Ok(Self(s)),
      other => Err(other.mismatch("type_ref")),
    }
  }
}

/// Implement [`ToValue`] and [`FromValue`] for an enumeration stored by its
/// symbolic name. The type must implement `AsRef<str>` and `FromStr`, e.g.
/// via `strum::AsRefStr` and `strum::EnumString`.
#[macro_export]
macro_rules! symbol_value {
  ($ty:ty) => {
    impl $crate::value::ToValue for $ty {
      fn to_value(&self) -> $crate::value::Value {
        $crate::value::Value::Symbol(::std::convert::AsRef::<str>::as_ref(self).to_owned())
      }
    }

    impl $crate::value::FromValue for $ty {
      fn from_value(
        value: $crate::value::Value,
      ) -> ::std::result::Result<Self, $crate::ValueError> {
        match value {
          $crate::value::Value::Symbol(s) | $crate::value::Value::Text(s) => s
            .parse::<$ty>()
            .map_err(|_| $crate::ValueError::UnknownSymbol(s)),
          other => Err($crate::ValueError::TypeMismatch {
            expected: "enum",
            found:    other.kind(),
          }),
        }
      }
    }
  };
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width() {
    let dt = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap();
    assert_eq!(format_timestamp(dt), "2024-03-01 09:05:00.000000");
  }

  #[test]
  fn parses_current_timestamp_form() {
    let dt = parse_timestamp("2024-03-01 09:05:00").unwrap();
    assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap());
  }

  #[test]
  fn parses_stored_form_with_micros() {
    let dt = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
    assert_eq!(parse_timestamp(&format_timestamp(dt)), Some(dt));
  }

  #[test]
  fn int_accepts_bigint_in_range() {
    assert_eq!(i32::from_value(Value::BigInt(42)).unwrap(), 42);
    assert!(matches!(
      i32::from_value(Value::BigInt(i64::MAX)),
      Err(ValueError::OutOfRange(_))
    ));
  }

  #[test]
  fn mismatch_reports_both_kinds() {
    let err = bool::from_value(Value::Text("yes".into())).unwrap_err();
    assert!(matches!(
      err,
      ValueError::TypeMismatch { expected: "bool", found: "text" }
    ));
  }

  #[test]
  fn opaque_round_trips_through_json_tree() {
    #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
    struct Point {
      x: i32,
      y: i32,
    }

    let v = Opaque(Point { x: 1, y: -2 }).to_value();
    let back: Opaque<Point> = FromValue::from_value(v).unwrap();
    assert_eq!(back.0, Point { x: 1, y: -2 });
  }
}
