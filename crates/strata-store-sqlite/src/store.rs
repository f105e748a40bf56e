//! [`SqliteStore`], the SQLite implementation of [`TemporalStore`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::Connection;
use strata_core::{
  catalog::Catalog,
  entity::{Entity, assemble},
  lifecycle::{close, plan_delete, plan_restore, stamp},
  predicate::Predicate,
  query::{Scope, TemporalQuery},
  record::Record,
  store::TemporalStore,
};
use tracing::{debug, info};

use crate::{
  Error, Result,
  db::{DEFAULT_STATEMENT_TIMEOUT, Database},
  schema::{PRAGMAS, SyncReport, sync_catalog},
  statement,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A temporal store backed by a single SQLite database.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  db: Database,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and synchronise `catalog`.
  pub async fn open(
    path: impl AsRef<Path>,
    catalog: &Catalog,
    timeout: Duration,
  ) -> Result<Self> {
    let db = Database::open(path, timeout).await?;
    Self::init(db, catalog).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory(catalog: &Catalog) -> Result<Self> {
    let db = Database::open_in_memory(DEFAULT_STATEMENT_TIMEOUT).await?;
    Self::init(db, catalog).await
  }

  async fn init(db: Database, catalog: &Catalog) -> Result<Self> {
    db.run("pragmas", |conn| Ok(conn.execute_batch(PRAGMAS)?)).await?;
    let store = Self { db };
    store.sync(catalog).await?;
    Ok(store)
  }

  /// Create missing tables and columns for every type in `catalog`.
  pub async fn sync(&self, catalog: &Catalog) -> Result<SyncReport> {
    let catalog = catalog.clone();
    let report = self
      .db
      .run("sync", move |conn| Ok(sync_catalog(conn, &catalog)))
      .await?;
    info!(
      tables_created = report.tables_created,
      columns_added = report.columns_added,
      failures = report.failures,
      "schema synchronised"
    );
    Ok(report)
  }

  pub fn database(&self) -> &Database { &self.db }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// One past the largest entity id ever used, deleted states included.
fn next_entity_id<R: Record>(conn: &Connection) -> Result<i64> {
  let rows = statement::select::<R>(conn, Some(&["max(id) as id"][..]), &[])?;
  Ok(rows.first().map_or(0, |r| r.meta().id) + 1)
}

fn load_entity<R: Record>(conn: &Connection, entity_id: i64) -> Result<Option<Entity<R>>> {
  let predicates = TemporalQuery::All.predicates(Scope::Entity(entity_id));
  Ok(assemble(statement::select::<R>(conn, None, &predicates)?))
}

// ─── TemporalStore impl ──────────────────────────────────────────────────────

impl TemporalStore for SqliteStore {
  type Error = Error;

  async fn save_for_tenant<R: Record>(
    &self,
    mut state: R,
    user_id: i64,
    system_id: i64,
    tenant_id: i64,
  ) -> Result<Entity<R>> {
    let rid = self
      .db
      .transaction("save", move |tx| {
        let now = Utc::now();
        if state.meta().id <= 0 {
          state.meta_mut().id = next_entity_id::<R>(tx)?;
        }
        stamp(&mut state, now, user_id, system_id, tenant_id);

        if let Some(mut current) = load_entity::<R>(tx, state.meta().id)?.and_then(|e| e.current) {
          close(&mut current, now);
          statement::update(tx, &current)?;
        }
        let rid = statement::insert(tx, &state)?;
        debug!(table = %R::schema().name, id = state.meta().id, rid, "saved state");
        Ok(rid)
      })
      .await?;

    self
      .get_entity_by_rid(rid)
      .await?
      .ok_or(Error::VersionNotFound(rid))
  }

  async fn set_delete_flag<R: Record>(&self, state: R) -> Result<()> {
    self
      .db
      .transaction("delete", move |tx| {
        let entity = load_entity::<R>(tx, state.meta().id)?;
        for update in plan_delete(entity, state, Utc::now()) {
          statement::update(tx, &update)?;
        }
        Ok(())
      })
      .await
  }

  async fn remove_delete_flag<R: Record>(&self, state: R) -> Result<()> {
    self
      .db
      .transaction("restore", move |tx| {
        let entity = load_entity::<R>(tx, state.meta().id)?;
        for update in plan_restore(entity, state) {
          statement::update(tx, &update)?;
        }
        Ok(())
      })
      .await
  }

  async fn select_columns<R: Record>(
    &self,
    projection: Option<Vec<String>>,
    predicates: Vec<Predicate>,
  ) -> Result<Vec<R>> {
    self
      .db
      .run("select", move |conn| {
        let projection: Option<Vec<&str>> =
          projection.as_ref().map(|p| p.iter().map(String::as_str).collect());
        statement::select::<R>(conn, projection.as_deref(), &predicates)
      })
      .await
  }
}
