//! Error types for `strata-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid field name in predicate: {0:?}")]
  InvalidFieldName(String),

  /// The raw literal text cannot be rendered as its declared type.
  #[error("invalid {expected} literal for {field}: {value:?}")]
  InvalidLiteral {
    field:    String,
    value:    String,
    expected: &'static str,
  },

  #[error("NULL cannot be compared with {operator} (field {field})")]
  NullComparison { field: String, operator: String },

  #[error("value error: {0}")]
  Value(#[from] ValueError),

  #[error("codec error: {0}")]
  Codec(#[from] CodecError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Failure converting between a record attribute and a [`Value`].
///
/// [`Value`]: crate::value::Value
#[derive(Debug, Error)]
pub enum ValueError {
  #[error("expected a {expected} value, found {found}")]
  TypeMismatch {
    expected: &'static str,
    found:    &'static str,
  },

  #[error("record has no persisted field {0:?}")]
  UnknownField(String),

  #[error("unknown symbol {0:?}")]
  UnknownSymbol(String),

  #[error("{0} does not fit the target type")]
  OutOfRange(String),

  #[error("opaque value does not match the attribute type: {0}")]
  Opaque(#[source] serde_json::Error),
}

/// Failure decoding the portable opaque encoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
  #[error("missing or unknown header")]
  BadHeader,

  #[error("unsupported encoding version {0}")]
  UnsupportedVersion(u8),

  #[error("input ended before the value was complete")]
  Truncated,

  #[error("unknown tag {0:#04x}")]
  UnknownTag(u8),

  #[error("string payload is not valid UTF-8")]
  InvalidUtf8,

  #[error("non-finite float cannot be represented")]
  NonFinite,

  #[error("nesting deeper than {0} levels")]
  TooDeep(usize),

  #[error("{0} trailing bytes after value")]
  TrailingBytes(usize),

  #[error("length {0} does not fit the encoding")]
  TooLong(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
