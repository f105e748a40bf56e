//! Encoding and decoding between [`Value`]s and SQLite storage values.
//!
//! Timestamps are stored in the fixed-width text format of
//! [`format_timestamp`]. Booleans are `0`/`1`. UUIDs, decimals, chars and
//! symbols are text. Lists are JSON arrays. Opaque values are blobs in the
//! portable codec.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::Value as Json;
use strata_core::{
  ValueError, codec,
  schema::{ScalarKind, SemanticType},
  value::{Value, format_timestamp, parse_timestamp},
};
use tracing::warn;
use uuid::Uuid;

use crate::Result;

// ─── Bind ────────────────────────────────────────────────────────────────────

pub fn bind(value: &Value) -> Result<SqlValue> {
  let sql = match value {
    Value::Null => SqlValue::Null,
    Value::Text(s) | Value::Symbol(s) => SqlValue::Text(s.clone()),
    Value::Int(i) => SqlValue::Integer(i64::from(*i)),
    Value::BigInt(i) => SqlValue::Integer(*i),
    Value::Double(f) => SqlValue::Real(*f),
    Value::Float(f) => SqlValue::Real(f64::from(*f)),
    Value::Decimal(d) => SqlValue::Text(d.to_string()),
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Char(c) => SqlValue::Text(c.to_string()),
    Value::Timestamp(dt) => SqlValue::Text(format_timestamp(*dt)),
    Value::Uuid(u) => SqlValue::Text(u.hyphenated().to_string()),
    Value::List(items) => {
      let items = items.iter().map(list_item).collect::<Result<Vec<_>>>()?;
      SqlValue::Text(serde_json::to_string(&items)?)
    }
    Value::Opaque(tree) => match codec::encode(tree) {
      Ok(bytes) => SqlValue::Blob(bytes.to_vec()),
      Err(e) => {
        warn!(error = %e, "could not encode opaque attribute; binding NULL");
        SqlValue::Null
      }
    },
  };
  Ok(sql)
}

fn list_item(value: &Value) -> Result<Json> {
  let json = match value {
    Value::Null => Json::Null,
    Value::Text(s) => Json::from(s.as_str()),
    Value::Int(i) => Json::from(*i),
    Value::BigInt(i) => Json::from(*i),
    Value::Double(f) => Json::from(*f),
    Value::Float(f) => Json::from(f64::from(*f)),
    Value::Bool(b) => Json::from(*b),
    other => {
      return Err(
        ValueError::TypeMismatch {
          expected: "list scalar",
          found:    other.kind(),
        }
        .into(),
      );
    }
  };
  Ok(json)
}

// ─── Unbind ──────────────────────────────────────────────────────────────────

fn storage_kind(raw: ValueRef<'_>) -> &'static str {
  match raw {
    ValueRef::Null => "null",
    ValueRef::Integer(_) => "integer",
    ValueRef::Real(_) => "real",
    ValueRef::Text(_) => "text",
    ValueRef::Blob(_) => "blob",
  }
}

fn mismatch(ty: SemanticType, raw: ValueRef<'_>) -> ValueError {
  ValueError::TypeMismatch {
    expected: ty.name(),
    found:    storage_kind(raw),
  }
}

fn text(ty: SemanticType, raw: ValueRef<'_>) -> Result<&str> {
  match raw {
    ValueRef::Text(bytes) => {
      Ok(std::str::from_utf8(bytes).map_err(|_| mismatch(ty, raw))?)
    }
    _ => Err(mismatch(ty, raw).into()),
  }
}

fn out_of_range(s: impl Into<String>) -> crate::Error { ValueError::OutOfRange(s.into()).into() }

/// Read a stored value back as `ty`. SQL NULL is [`Value::Null`].
pub fn unbind(raw: ValueRef<'_>, ty: SemanticType) -> Result<Value> {
  if let ValueRef::Null = raw {
    return Ok(Value::Null);
  }

  let value = match ty {
    SemanticType::Text => Value::Text(text(ty, raw)?.to_owned()),
    SemanticType::Enum | SemanticType::TypeRef => {
      Value::Symbol(text(ty, raw)?.to_owned())
    }
    SemanticType::Int => match raw {
      ValueRef::Integer(i) => {
        Value::Int(i32::try_from(i).map_err(|_| out_of_range(i.to_string()))?)
      }
      _ => return Err(mismatch(ty, raw).into()),
    },
    SemanticType::BigInt => match raw {
      ValueRef::Integer(i) => Value::BigInt(i),
      _ => return Err(mismatch(ty, raw).into()),
    },
    SemanticType::Double => match raw {
      ValueRef::Real(f) => Value::Double(f),
      ValueRef::Integer(i) => Value::Double(i as f64),
      _ => return Err(mismatch(ty, raw).into()),
    },
    SemanticType::Float => match raw {
      ValueRef::Real(f) => Value::Float(f as f32),
      ValueRef::Integer(i) => Value::Float(i as f32),
      _ => return Err(mismatch(ty, raw).into()),
    },
    // NUMERIC affinity may have converted the text to a number.
    SemanticType::Decimal => {
      let s = match raw {
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        _ => text(ty, raw)?.to_owned(),
      };
      Value::Decimal(BigDecimal::from_str(&s).map_err(|_| out_of_range(s))?)
    }
    SemanticType::Bool => match raw {
      ValueRef::Integer(i) => Value::Bool(i != 0),
      _ => match text(ty, raw)? {
        t if t.eq_ignore_ascii_case("true") => Value::Bool(true),
        t if t.eq_ignore_ascii_case("false") => Value::Bool(false),
        t => return Err(out_of_range(t)),
      },
    },
    SemanticType::Char => {
      let s = text(ty, raw)?;
      let mut chars = s.chars();
      match (chars.next(), chars.next()) {
        (Some(c), None) => Value::Char(c),
        _ => return Err(out_of_range(s)),
      }
    }
    SemanticType::Timestamp => {
      let s = text(ty, raw)?;
      Value::Timestamp(parse_timestamp(s).ok_or_else(|| out_of_range(s))?)
    }
    SemanticType::Uuid => {
      let s = text(ty, raw)?;
      Value::Uuid(Uuid::parse_str(s).map_err(|_| out_of_range(s))?)
    }
    SemanticType::List(kind) => {
      let items: Vec<Json> = serde_json::from_str(text(ty, raw)?)?;
      Value::List(
        items
          .into_iter()
          .map(|item| scalar(kind, item))
          .collect::<Result<_>>()?,
      )
    }
    SemanticType::Opaque => match raw {
      ValueRef::Blob(bytes) => Value::Opaque(codec::decode(bytes)?),
      _ => return Err(mismatch(ty, raw).into()),
    },
  };
  Ok(value)
}

fn scalar(kind: ScalarKind, item: Json) -> Result<Value> {
  let value = match (kind, &item) {
    (_, Json::Null) => Value::Null,
    (ScalarKind::Text, Json::String(s)) => Value::Text(s.clone()),
    (ScalarKind::Int, Json::Number(n)) => n
      .as_i64()
      .and_then(|i| i32::try_from(i).ok())
      .map(Value::Int)
      .ok_or_else(|| out_of_range(n.to_string()))?,
    (ScalarKind::BigInt, Json::Number(n)) => n
      .as_i64()
      .map(Value::BigInt)
      .ok_or_else(|| out_of_range(n.to_string()))?,
    (ScalarKind::Double, Json::Number(n)) => n
      .as_f64()
      .map(Value::Double)
      .ok_or_else(|| out_of_range(n.to_string()))?,
    (ScalarKind::Float, Json::Number(n)) => n
      .as_f64()
      .map(|f| Value::Float(f as f32))
      .ok_or_else(|| out_of_range(n.to_string()))?,
    (ScalarKind::Bool, Json::Bool(b)) => Value::Bool(*b),
    _ => {
      return Err(
        ValueError::TypeMismatch {
          expected: kind.name(),
          found:    "json",
        }
        .into(),
      );
    }
  };
  Ok(value)
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use serde_json::json;

  use super::*;

  fn through(value: Value, ty: SemanticType) -> Value {
    let sql = bind(&value).unwrap();
    unbind(ValueRef::from(&sql), ty).unwrap()
  }

  #[test]
  fn booleans_are_integers() {
    assert_eq!(bind(&Value::Bool(true)).unwrap(), SqlValue::Integer(1));
    assert_eq!(through(Value::Bool(false), SemanticType::Bool), Value::Bool(false));
  }

  #[test]
  fn timestamps_are_fixed_width_text() {
    let dt = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 1).unwrap();
    assert_eq!(
      bind(&Value::Timestamp(dt)).unwrap(),
      SqlValue::Text("2024-02-29 23:59:01.000000".into())
    );
    assert_eq!(through(Value::Timestamp(dt), SemanticType::Timestamp), Value::Timestamp(dt));
  }

  #[test]
  fn decimal_reads_numeric_affinity() {
    let d = BigDecimal::from_str("12.5").unwrap();
    assert_eq!(
      unbind(ValueRef::Real(12.5), SemanticType::Decimal).unwrap(),
      Value::Decimal(d.clone())
    );
    assert_eq!(
      unbind(ValueRef::Integer(3), SemanticType::Decimal).unwrap(),
      Value::Decimal(BigDecimal::from(3))
    );
    assert_eq!(through(Value::Decimal(d.clone()), SemanticType::Decimal), Value::Decimal(d));
  }

  #[test]
  fn lists_are_json_arrays() {
    let list = Value::List(vec![Value::Text("a".into()), Value::Text("b".into())]);
    assert_eq!(bind(&list).unwrap(), SqlValue::Text(r#"["a","b"]"#.into()));
    assert_eq!(through(list.clone(), SemanticType::List(ScalarKind::Text)), list);
  }

  #[test]
  fn nested_list_is_rejected() {
    let nested = Value::List(vec![Value::List(Vec::new())]);
    assert!(bind(&nested).is_err());
  }

  #[test]
  fn opaque_uses_codec() {
    let tree = json!({ "k": [1, 2] });
    let SqlValue::Blob(bytes) = bind(&Value::Opaque(tree.clone())).unwrap() else {
      panic!("expected blob");
    };
    assert_eq!(&bytes[..2], b"SV");
    assert_eq!(
      unbind(ValueRef::Blob(&bytes), SemanticType::Opaque).unwrap(),
      Value::Opaque(tree)
    );
  }

  #[test]
  fn corrupt_blob_is_an_error() {
    assert!(unbind(ValueRef::Blob(b"nope"), SemanticType::Opaque).is_err());
  }

  #[test]
  fn null_is_null_for_every_type() {
    assert_eq!(unbind(ValueRef::Null, SemanticType::Uuid).unwrap(), Value::Null);
    assert_eq!(bind(&Value::Null).unwrap(), SqlValue::Null);
  }

  #[test]
  fn int_range_is_checked() {
    assert!(unbind(ValueRef::Integer(i64::MAX), SemanticType::Int).is_err());
  }
}
