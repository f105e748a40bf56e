//! Seeding of the default systems and tenant.
//!
//! Runs after schema sync. Entries are looked up by name among current
//! states and only created when missing, so running it twice is a no-op.

use serde::Serialize;
use sha2::{Digest, Sha256};
use strata_core::{
  entity::Entity,
  predicate::{Operator, Predicate},
  query::{Scope, TemporalQuery},
  record::Record,
  store::TemporalStore,
  system::{System, Tenant},
};
use tracing::info;

use crate::{
  Error, Result, SqliteStore,
  config::{StoreConfig, SystemSeed, TenantSeed},
};

/// Lower-case hex SHA-256 of a password.
pub fn hash_password(password: &str) -> String {
  hex::encode(Sha256::digest(password.as_bytes()))
}

/// The entries guaranteed to exist after [`ensure_defaults`].
#[derive(Debug, Clone, Serialize)]
pub struct Defaults {
  pub default_system: System,
  pub test_system:    System,
  pub default_tenant: Tenant,
}

async fn find_current<R: Record>(store: &SqliteStore, name: &str) -> Result<Option<R>> {
  let entities = store
    .query_entities::<R>(
      TemporalQuery::Current,
      Scope::Tenant(None),
      vec![Predicate::text("name", Operator::Equal, name)],
    )
    .await?;
  Ok(entities.into_iter().find_map(|e| e.current))
}

fn into_current<R: Record>(entity: Entity<R>) -> Result<R> {
  entity
    .current
    .ok_or(Error::VersionNotFound(entity.entity_id))
}

async fn ensure_system(store: &SqliteStore, seed: &SystemSeed) -> Result<System> {
  if let Some(system) = find_current::<System>(store, &seed.name).await? {
    return Ok(system);
  }

  let system = System {
    name: seed.name.clone(),
    description: seed.description.clone(),
    sha256_encoded_password: hash_password(&seed.password),
    ..System::default()
  };
  let system = into_current(store.save(system, 0, 0).await?)?;
  info!(name = %system.name, id = system.meta.id, "created system");
  Ok(system)
}

async fn ensure_tenant(
  store: &SqliteStore,
  seed: &TenantSeed,
  system_id: i64,
) -> Result<Tenant> {
  if let Some(tenant) = find_current::<Tenant>(store, &seed.name).await? {
    return Ok(tenant);
  }

  let tenant = Tenant {
    name: seed.name.clone(),
    description: seed.description.clone(),
    is_primary: true,
    web_url: seed.web_url.clone(),
    ..Tenant::default()
  };
  let tenant = into_current(store.save(tenant, 1, system_id).await?)?;
  info!(name = %tenant.name, id = tenant.meta.id, "created tenant");
  Ok(tenant)
}

/// Make sure the configured default system, test system and default tenant
/// exist. The tenant is attributed to user `1` on the default system.
pub async fn ensure_defaults(store: &SqliteStore, config: &StoreConfig) -> Result<Defaults> {
  let default_system = ensure_system(store, &config.default_system).await?;
  let test_system = ensure_system(store, &config.test_system).await?;
  let default_tenant =
    ensure_tenant(store, &config.default_tenant, default_system.meta.id).await?;

  Ok(Defaults {
    default_system,
    test_system,
    default_tenant,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn password_hash_is_lower_hex_sha256() {
    assert_eq!(
      hash_password("test"),
      "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
    );
  }
}
