//! Built-in records present in every store.

use serde::Serialize;

use crate::record::StateMeta;

/// A client system that edits records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct System {
  pub meta:                    StateMeta,
  pub name:                    String,
  pub description:             String,
  /// Lower-case hex SHA-256 of the system's password.
  pub sha256_encoded_password: String,
}

crate::impl_record! {
  System {
    name:                    Text,
    description:             Text,
    sha256_encoded_password: Text,
  }
}

/// An isolation boundary for records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tenant {
  pub meta:        StateMeta,
  pub name:        String,
  pub description: String,
  pub is_primary:  bool,
  pub web_url:     String,
}

crate::impl_record! {
  Tenant {
    name:        Text,
    description: Text,
    is_primary:  Bool,
    web_url:     Text,
  }
}
