//! Store configuration.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Deserializer};

/// Settings for opening a store and seeding its default entries. Every field
/// has a default, so an empty source is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  /// Path to the SQLite database file.
  pub store_path:             PathBuf,
  /// Upper bound on each database call, in seconds.
  pub statement_timeout_secs: u64,
  pub default_system:         SystemSeed,
  #[serde(deserialize_with = "deserialize_test_system")]
  pub test_system:            SystemSeed,
  pub default_tenant:         TenantSeed,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      store_path:             PathBuf::from("strata.db"),
      statement_timeout_secs: 30,
      default_system:         SystemSeed::default(),
      test_system:            SystemSeed::test(),
      default_tenant:         TenantSeed::default(),
    }
  }
}

impl StoreConfig {
  pub fn statement_timeout(&self) -> Duration { Duration::from_secs(self.statement_timeout_secs) }
}

/// A system created by bootstrap when no current system has its name.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SystemSeed {
  pub name:        String,
  pub description: String,
  /// Plain-text password; stored hashed.
  pub password:    String,
}

impl Default for SystemSeed {
  fn default() -> Self {
    Self {
      name:        "default".to_owned(),
      description: "Default system".to_owned(),
      password:    "changeme".to_owned(),
    }
  }
}

impl SystemSeed {
  fn test() -> Self {
    Self {
      name:        "test".to_owned(),
      description: "Test system".to_owned(),
      password:    "test".to_owned(),
    }
  }
}

/// Fields set in a seed section; the rest come from a base seed.
#[derive(Deserialize)]
struct SeedOverride {
  name:        Option<String>,
  description: Option<String>,
  password:    Option<String>,
}

impl SeedOverride {
  fn apply(self, base: SystemSeed) -> SystemSeed {
    SystemSeed {
      name:        self.name.unwrap_or(base.name),
      description: self.description.unwrap_or(base.description),
      password:    self.password.unwrap_or(base.password),
    }
  }
}

fn deserialize_test_system<'de, D: Deserializer<'de>>(d: D) -> Result<SystemSeed, D::Error> {
  Ok(SeedOverride::deserialize(d)?.apply(SystemSeed::test()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TenantSeed {
  pub name:        String,
  pub description: String,
  pub web_url:     String,
}

impl Default for TenantSeed {
  fn default() -> Self {
    Self {
      name:        "default".to_owned(),
      description: "Default tenant".to_owned(),
      web_url:     String::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_source_uses_defaults() {
    let config: StoreConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.store_path, PathBuf::from("strata.db"));
    assert_eq!(config.statement_timeout(), Duration::from_secs(30));
    assert_eq!(config.default_system.name, "default");
    assert_eq!(config.test_system.password, "test");
    assert_eq!(config.default_tenant.description, "Default tenant");
  }

  #[test]
  fn partial_override() {
    let config: StoreConfig =
      serde_json::from_str(r#"{ "statement_timeout_secs": 5, "default_tenant": { "name": "acme" } }"#)
        .unwrap();
    assert_eq!(config.statement_timeout_secs, 5);
    assert_eq!(config.default_tenant.name, "acme");
    assert_eq!(config.default_tenant.description, "Default tenant");
  }

  #[test]
  fn partial_system_sections_keep_their_own_defaults() {
    let config: StoreConfig = serde_json::from_str(
      r#"{ "default_system": { "name": "ops" }, "test_system": { "password": "pw" } }"#,
    )
    .unwrap();
    assert_eq!(config.default_system.name, "ops");
    assert_eq!(config.default_system.description, "Default system");
    assert_eq!(config.default_system.password, "changeme");
    assert_eq!(config.test_system.name, "test");
    assert_eq!(config.test_system.description, "Test system");
    assert_eq!(config.test_system.password, "pw");
  }
}
