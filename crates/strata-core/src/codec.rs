//! Portable, self-describing binary encoding for opaque attribute values.
//!
//! Layout: the two magic bytes `SV`, a version byte, then one tagged value.
//! Numbers are big-endian and fixed-width; strings, arrays and objects carry a
//! `u32` length prefix. Any implementation that knows the tag table below can
//! read a stored blob back.
//!
//! | tag | payload                                   |
//! |-----|-------------------------------------------|
//! | 0   | null                                      |
//! | 1   | false                                     |
//! | 2   | true                                      |
//! | 3   | i64                                       |
//! | 4   | u64                                       |
//! | 5   | f64 (IEEE 754 bits)                       |
//! | 6   | u32 length, UTF-8 bytes                   |
//! | 7   | u32 count, values                         |
//! | 8   | u32 count, (u32 length, key bytes, value)* |

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde_json::{Map, Number, Value as Json};

use crate::CodecError;

const MAGIC: &[u8; 2] = b"SV";
const VERSION: u8 = 1;
const MAX_DEPTH: usize = 64;

const TAG_NULL: u8 = 0;
const TAG_FALSE: u8 = 1;
const TAG_TRUE: u8 = 2;
const TAG_I64: u8 = 3;
const TAG_U64: u8 = 4;
const TAG_F64: u8 = 5;
const TAG_STRING: u8 = 6;
const TAG_ARRAY: u8 = 7;
const TAG_OBJECT: u8 = 8;

// ─── Encode ──────────────────────────────────────────────────────────────────

pub fn encode(value: &Json) -> Result<Bytes, CodecError> {
  let mut buf = BytesMut::with_capacity(64);
  buf.put_slice(MAGIC);
  buf.put_u8(VERSION);
  encode_value(&mut buf, value, 0)?;
  Ok(buf.freeze())
}

fn put_len(buf: &mut BytesMut, len: usize) -> Result<(), CodecError> {
  let len = u32::try_from(len).map_err(|_| CodecError::TooLong(len))?;
  buf.put_u32(len);
  Ok(())
}

fn encode_value(
  buf: &mut BytesMut,
  value: &Json,
  depth: usize,
) -> Result<(), CodecError> {
  if depth > MAX_DEPTH {
    return Err(CodecError::TooDeep(MAX_DEPTH));
  }

  match value {
    Json::Null => buf.put_u8(TAG_NULL),
    Json::Bool(false) => buf.put_u8(TAG_FALSE),
    Json::Bool(true) => buf.put_u8(TAG_TRUE),
    Json::Number(n) => {
      if let Some(i) = n.as_i64() {
        buf.put_u8(TAG_I64);
        buf.put_i64(i);
      } else if let Some(u) = n.as_u64() {
        buf.put_u8(TAG_U64);
        buf.put_u64(u);
      } else {
        let f = n.as_f64().ok_or(CodecError::NonFinite)?;
        buf.put_u8(TAG_F64);
        buf.put_f64(f);
      }
    }
    Json::String(s) => {
      buf.put_u8(TAG_STRING);
      put_len(buf, s.len())?;
      buf.put_slice(s.as_bytes());
    }
    Json::Array(items) => {
      buf.put_u8(TAG_ARRAY);
      put_len(buf, items.len())?;
      for item in items {
        encode_value(buf, item, depth + 1)?;
      }
    }
    Json::Object(map) => {
      buf.put_u8(TAG_OBJECT);
      put_len(buf, map.len())?;
      for (key, item) in map {
        put_len(buf, key.len())?;
        buf.put_slice(key.as_bytes());
        encode_value(buf, item, depth + 1)?;
      }
    }
  }
  Ok(())
}

// ─── Decode ──────────────────────────────────────────────────────────────────

pub fn decode(mut input: &[u8]) -> Result<Json, CodecError> {
  if input.len() < 3 || &input[..2] != MAGIC {
    return Err(CodecError::BadHeader);
  }
  input.advance(2);
  let version = input.get_u8();
  if version != VERSION {
    return Err(CodecError::UnsupportedVersion(version));
  }

  let value = decode_value(&mut input, 0)?;
  if input.has_remaining() {
    return Err(CodecError::TrailingBytes(input.remaining()));
  }
  Ok(value)
}

fn need(input: &[u8], n: usize) -> Result<(), CodecError> {
  if input.remaining() < n {
    Err(CodecError::Truncated)
  } else {
    Ok(())
  }
}

fn get_len(input: &mut &[u8]) -> Result<usize, CodecError> {
  need(input, 4)?;
  Ok(input.get_u32() as usize)
}

fn get_string(input: &mut &[u8]) -> Result<String, CodecError> {
  let len = get_len(input)?;
  need(input, len)?;
  let s = std::str::from_utf8(&input[..len])
    .map_err(|_| CodecError::InvalidUtf8)?
    .to_owned();
  input.advance(len);
  Ok(s)
}

fn decode_value(input: &mut &[u8], depth: usize) -> Result<Json, CodecError> {
  if depth > MAX_DEPTH {
    return Err(CodecError::TooDeep(MAX_DEPTH));
  }

  need(input, 1)?;
  let value = match input.get_u8() {
    TAG_NULL => Json::Null,
    TAG_FALSE => Json::Bool(false),
    TAG_TRUE => Json::Bool(true),
    TAG_I64 => {
      need(input, 8)?;
      Json::from(input.get_i64())
    }
    TAG_U64 => {
      need(input, 8)?;
      Json::from(input.get_u64())
    }
    TAG_F64 => {
      need(input, 8)?;
      let f = input.get_f64();
      Json::Number(Number::from_f64(f).ok_or(CodecError::NonFinite)?)
    }
    TAG_STRING => Json::String(get_string(input)?),
    TAG_ARRAY => {
      let count = get_len(input)?;
      // Every element takes at least one byte.
      need(input, count)?;
      let mut items = Vec::with_capacity(count);
      for _ in 0..count {
        items.push(decode_value(input, depth + 1)?);
      }
      Json::Array(items)
    }
    TAG_OBJECT => {
      let count = get_len(input)?;
      need(input, count)?;
      let mut map = Map::new();
      for _ in 0..count {
        let key = get_string(input)?;
        let item = decode_value(input, depth + 1)?;
        map.insert(key, item);
      }
      Json::Object(map)
    }
    other => return Err(CodecError::UnknownTag(other)),
  };
  Ok(value)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn nested_document_survives() {
    let doc = json!({
      "name": "gadget",
      "dims": [1, -2, 3.5],
      "big": u64::MAX,
      "meta": { "ok": true, "note": null },
    });
    let bytes = encode(&doc).unwrap();
    assert_eq!(&bytes[..3], b"SV\x01");
    assert_eq!(decode(&bytes).unwrap(), doc);
  }

  #[test]
  fn scalar_layout_is_stable() {
    let bytes = encode(&json!("hi")).unwrap();
    assert_eq!(&bytes[..], b"SV\x01\x06\x00\x00\x00\x02hi");

    let bytes = encode(&json!(-1)).unwrap();
    assert_eq!(&bytes[3..], &[3, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
  }

  #[test]
  fn rejects_bad_header() {
    assert_eq!(decode(b"XX\x01\x00"), Err(CodecError::BadHeader));
    assert_eq!(decode(b"SV"), Err(CodecError::BadHeader));
    assert_eq!(decode(b"SV\x09\x00"), Err(CodecError::UnsupportedVersion(9)));
  }

  #[test]
  fn rejects_truncated_input() {
    let bytes = encode(&json!(["a", "b"])).unwrap();
    assert_eq!(decode(&bytes[..bytes.len() - 1]), Err(CodecError::Truncated));
  }

  #[test]
  fn rejects_unknown_tag_and_trailing_bytes() {
    assert_eq!(decode(b"SV\x01\x2a"), Err(CodecError::UnknownTag(0x2a)));
    assert_eq!(decode(b"SV\x01\x00\x00"), Err(CodecError::TrailingBytes(1)));
  }

  #[test]
  fn huge_count_does_not_allocate() {
    assert_eq!(
      decode(b"SV\x01\x07\xff\xff\xff\xff"),
      Err(CodecError::Truncated)
    );
  }

  #[test]
  fn depth_is_bounded() {
    let mut doc = json!(0);
    for _ in 0..(MAX_DEPTH + 2) {
      doc = json!([doc]);
    }
    assert_eq!(encode(&doc), Err(CodecError::TooDeep(MAX_DEPTH)));
  }
}
