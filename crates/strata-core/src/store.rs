//! The `TemporalStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `strata-store-sqlite`).
//! Backends provide the three writes and a raw predicate select; every
//! temporal read is derived from those here.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  entity::{Entity, assemble, group},
  predicate::Predicate,
  query::{Scope, TemporalQuery},
  record::{DEFAULT_TENANT_ID, ID, Record},
};

/// Abstraction over a bitemporal record store.
///
/// States are never physically removed. Writes stamp, close, flag and promote
/// states; reads filter out deleted states and group the rest into
/// [`Entity`] values.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
///
/// Failures are returned as `Err`, never as an empty result: an empty `Vec`
/// or `None` always means nothing matched.
pub trait TemporalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist `state` as the new current version of its entity.
  ///
  /// A state with `id <= 0` starts a new entity. The previous current state,
  /// if any, is closed at the same instant the new one opens. Returns the
  /// entity reloaded through the new version id.
  fn save_for_tenant<R: Record>(
    &self,
    state: R,
    user_id: i64,
    system_id: i64,
    tenant_id: i64,
  ) -> impl Future<Output = Result<Entity<R>, Self::Error>> + Send + '_;

  /// [`save_for_tenant`](Self::save_for_tenant) in the default tenant.
  fn save<R: Record>(
    &self,
    state: R,
    user_id: i64,
    system_id: i64,
  ) -> impl Future<Output = Result<Entity<R>, Self::Error>> + Send + '_ {
    self.save_for_tenant(state, user_id, system_id, DEFAULT_TENANT_ID)
  }

  /// Soft-delete a state. Deleting the current state promotes the most
  /// recently closed historical state.
  fn set_delete_flag<R: Record>(
    &self,
    state: R,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Undo a soft delete, making the state current when it is the newest.
  fn remove_delete_flag<R: Record>(
    &self,
    state: R,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Raw select ────────────────────────────────────────────────────────

  /// Select the states of `R` matching `predicates`.
  ///
  /// `projection` lists the column expressions to read, `*` when `None`.
  /// Attributes whose column is not projected keep their default values.
  fn select_columns<R: Record>(
    &self,
    projection: Option<Vec<String>>,
    predicates: Vec<Predicate>,
  ) -> impl Future<Output = Result<Vec<R>, Self::Error>> + Send + '_;

  /// Select every column of the states of `R` matching `predicates`.
  fn select<R: Record>(
    &self,
    predicates: Vec<Predicate>,
  ) -> impl Future<Output = Result<Vec<R>, Self::Error>> + Send + '_ {
    self.select_columns(None, predicates)
  }

  /// Run one read of the catalogue, with `extra` predicates appended.
  fn query_entities<R: Record>(
    &self,
    query: TemporalQuery,
    scope: Scope,
    extra: Vec<Predicate>,
  ) -> impl Future<Output = Result<Vec<Entity<R>>, Self::Error>> + Send + '_ {
    let mut predicates = query.predicates(scope);
    predicates.extend(extra);
    async move { Ok(group(self.select::<R>(predicates).await?)) }
  }

  /// Run one read of the catalogue keyed on a single entity.
  fn query_entity<R: Record>(
    &self,
    query: TemporalQuery,
    entity_id: i64,
  ) -> impl Future<Output = Result<Option<Entity<R>>, Self::Error>> + Send + '_ {
    let predicates = query.predicates(Scope::Entity(entity_id));
    async move { Ok(assemble(self.select::<R>(predicates).await?)) }
  }

  // ── Lists ─────────────────────────────────────────────────────────────

  fn get_all<R: Record>(
    &self,
    tenant_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entities(TemporalQuery::All, Scope::Tenant(tenant_id), Vec::new())
  }

  fn get_all_current<R: Record>(
    &self,
    tenant_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entities(TemporalQuery::Current, Scope::Tenant(tenant_id), Vec::new())
  }

  fn get_all_history<R: Record>(
    &self,
    tenant_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entities(TemporalQuery::History, Scope::Tenant(tenant_id), Vec::new())
  }

  /// States active at `at`. The current/history split reflects each state's
  /// flag now, not at `at`.
  fn get_all_at_date<R: Record>(
    &self,
    at: DateTime<Utc>,
    tenant_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entities(
      TemporalQuery::AtDate { at },
      Scope::Tenant(tenant_id),
      Vec::new(),
    )
  }

  fn get_all_from_date<R: Record>(
    &self,
    from: DateTime<Utc>,
    tenant_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entities(
      TemporalQuery::FromDate { from },
      Scope::Tenant(tenant_id),
      Vec::new(),
    )
  }

  fn get_all_before_date<R: Record>(
    &self,
    before: DateTime<Utc>,
    tenant_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entities(
      TemporalQuery::BeforeDate { before },
      Scope::Tenant(tenant_id),
      Vec::new(),
    )
  }

  fn get_all_between_dates<R: Record>(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tenant_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entities(
      TemporalQuery::BetweenDates { start, end },
      Scope::Tenant(tenant_id),
      Vec::new(),
    )
  }

  // ── Single entity ─────────────────────────────────────────────────────

  /// Every non-deleted state of the entity. `None` if none exists.
  fn get_entity_by_id<R: Record>(
    &self,
    entity_id: i64,
  ) -> impl Future<Output = Result<Option<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entity(TemporalQuery::All, entity_id)
  }

  /// The entity owning the version `rid`.
  fn get_entity_by_rid<R: Record>(
    &self,
    rid: i64,
  ) -> impl Future<Output = Result<Option<Entity<R>>, Self::Error>> + Send + '_ {
    let predicates = TemporalQuery::All.predicates(Scope::Version(rid));
    async move {
      let rows = self
        .select_columns::<R>(Some(vec![ID.to_owned()]), predicates)
        .await?;
      match rows.first() {
        Some(row) => self.get_entity_by_id(row.meta().id).await,
        None => Ok(None),
      }
    }
  }

  fn get_entity_current_by_id<R: Record>(
    &self,
    entity_id: i64,
  ) -> impl Future<Output = Result<Option<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entity(TemporalQuery::Current, entity_id)
  }

  fn get_entity_history_by_id<R: Record>(
    &self,
    entity_id: i64,
  ) -> impl Future<Output = Result<Option<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entity(TemporalQuery::History, entity_id)
  }

  fn get_entity_at_date_by_id<R: Record>(
    &self,
    entity_id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entity(TemporalQuery::AtDate { at }, entity_id)
  }

  fn get_entity_from_date_by_id<R: Record>(
    &self,
    entity_id: i64,
    from: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entity(TemporalQuery::FromDate { from }, entity_id)
  }

  fn get_entity_before_date_by_id<R: Record>(
    &self,
    entity_id: i64,
    before: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entity(TemporalQuery::BeforeDate { before }, entity_id)
  }

  fn get_entity_between_dates_by_id<R: Record>(
    &self,
    entity_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Entity<R>>, Self::Error>> + Send + '_ {
    self.query_entity(TemporalQuery::BetweenDates { start, end }, entity_id)
  }
}
