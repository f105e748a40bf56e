//! The versioning state machine.
//!
//! These functions only decide what each state must look like; backends
//! persist the returned states in order, inside one transaction.

use chrono::{DateTime, Utc};

use crate::{entity::Entity, record::Record};

/// Prepare a state for insertion as the new current version.
pub fn stamp<R: Record>(
  state: &mut R,
  now: DateTime<Utc>,
  user_id: i64,
  system_id: i64,
  tenant_id: i64,
) {
  let meta = state.meta_mut();
  meta.arsd = now;
  meta.ared = None;
  meta.df = false;
  meta.cf = true;
  meta.euid = user_id;
  meta.esid = system_id;
  meta.tid = tenant_id;
}

/// Close a state's active range and clear its current flag.
pub fn close<R: Record>(state: &mut R, at: DateTime<Utc>) {
  let meta = state.meta_mut();
  meta.ared = Some(at);
  meta.cf = false;
}

/// Open a state's active range and make it current.
fn promote<R: Record>(state: &mut R) {
  let meta = state.meta_mut();
  meta.ared = None;
  meta.cf = true;
}

/// Updates that soft-delete `state`.
///
/// `entity` is the state's entity as read before the delete. Deleting the
/// current state closes it and promotes the historical state with the latest
/// range end; the promotion comes first in the returned list.
pub fn plan_delete<R: Record>(
  entity: Option<Entity<R>>,
  mut state: R,
  now: DateTime<Utc>,
) -> Vec<R> {
  state.meta_mut().df = true;

  let Some(entity) = entity else {
    return vec![state];
  };
  let is_current = entity
    .current
    .as_ref()
    .is_some_and(|c| c.meta().rid == state.meta().rid);
  if !is_current {
    return vec![state];
  }

  close(&mut state, now);
  let mut updates = Vec::with_capacity(2);
  if let Some(latest) = entity
    .latest_history()
    .filter(|h| h.meta().rid != state.meta().rid)
  {
    let mut latest = latest.clone();
    promote(&mut latest);
    updates.push(latest);
  }
  updates.push(state);
  updates
}

/// Updates that restore a soft-deleted `state`.
///
/// `entity` is read without deleted states. The restored state becomes
/// current when the entity has no current state, or when it started later
/// than the current one, which is then closed at the restored state's start.
/// Restoring the live current state only clears its delete flag.
pub fn plan_restore<R: Record>(entity: Option<Entity<R>>, mut state: R) -> Vec<R> {
  state.meta_mut().df = false;

  let current = entity.and_then(|e| e.current);
  match current {
    None => {
      promote(&mut state);
      vec![state]
    }
    Some(current) if current.meta().rid == state.meta().rid => {
      promote(&mut state);
      vec![state]
    }
    Some(mut current) if state.meta().arsd > current.meta().arsd => {
      close(&mut current, state.meta().arsd);
      promote(&mut state);
      vec![current, state]
    }
    Some(current) => {
      // A stale current flag must not leave a second open state.
      if state.meta().cf || state.meta().ared.is_none() {
        let end = state.meta().ared.unwrap_or(current.meta().arsd);
        close(&mut state, end);
      }
      vec![state]
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::{entity::assemble, record::StateMeta};

  #[derive(Debug, Clone, Default, PartialEq)]
  struct Item {
    meta: StateMeta,
    name: String,
  }

  crate::impl_record! { Item { name: Text } }

  fn state(rid: i64, cf: bool, arsd: DateTime<Utc>, ared: Option<DateTime<Utc>>) -> Item {
    Item {
      meta: StateMeta {
        rid,
        id: 1,
        arsd,
        ared,
        cf,
        ..StateMeta::default()
      },
      name: format!("v{rid}"),
    }
  }

  #[test]
  fn stamp_opens_a_current_state() {
    let now = Utc::now();
    let mut item = Item::default();
    item.meta.df = true;
    item.meta.ared = Some(now);
    stamp(&mut item, now, 7, 8, 9);

    assert_eq!(item.meta.arsd, now);
    assert!(item.meta.cf && !item.meta.df && item.meta.ared.is_none());
    assert_eq!((item.meta.euid, item.meta.esid, item.meta.tid), (7, 8, 9));
  }

  #[test]
  fn deleting_current_promotes_latest_history() {
    let t0 = Utc::now() - Duration::hours(3);
    let t1 = t0 + Duration::hours(1);
    let t2 = t1 + Duration::hours(1);
    let now = t2 + Duration::minutes(5);

    let v1 = state(1, false, t0, Some(t1));
    let v2 = state(2, false, t1, Some(t2));
    let v3 = state(3, true, t2, None);
    let entity = assemble(vec![v1, v2, v3.clone()]);

    let updates = plan_delete(entity, v3, now);
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].meta.rid, 2);
    assert!(updates[0].meta.cf && updates[0].meta.ared.is_none());
    assert_eq!(updates[1].meta.rid, 3);
    assert!(updates[1].meta.df && !updates[1].meta.cf);
    assert_eq!(updates[1].meta.ared, Some(now));
  }

  #[test]
  fn deleting_history_only_flags_it() {
    let t0 = Utc::now() - Duration::hours(2);
    let t1 = t0 + Duration::hours(1);
    let v1 = state(1, false, t0, Some(t1));
    let v2 = state(2, true, t1, None);
    let entity = assemble(vec![v1.clone(), v2]);

    let updates = plan_delete(entity, v1, Utc::now());
    assert_eq!(updates.len(), 1);
    assert!(updates[0].meta.df);
    assert_eq!(updates[0].meta.ared, Some(t1));
  }

  #[test]
  fn deleting_sole_state_leaves_no_current() {
    let v1 = state(1, true, Utc::now(), None);
    let updates = plan_delete(assemble(vec![v1.clone()]), v1, Utc::now());
    assert_eq!(updates.len(), 1);
    assert!(!updates[0].meta.cf);
  }

  #[test]
  fn restore_without_current_promotes() {
    let mut v1 = state(1, false, Utc::now(), Some(Utc::now()));
    v1.meta.df = true;
    let updates = plan_restore(None, v1);
    assert_eq!(updates.len(), 1);
    assert!(updates[0].meta.cf && !updates[0].meta.df);
    assert!(updates[0].meta.ared.is_none());
  }

  #[test]
  fn restore_newer_state_demotes_current() {
    let t0 = Utc::now() - Duration::hours(2);
    let t1 = t0 + Duration::hours(1);
    let current = state(1, true, t0, None);
    let mut restored = state(2, false, t1, Some(t1));
    restored.meta.df = true;

    let updates = plan_restore(assemble(vec![current]), restored);
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].meta.rid, 1);
    assert!(!updates[0].meta.cf);
    assert_eq!(updates[0].meta.ared, Some(t1));
    assert!(updates[1].meta.cf && updates[1].meta.ared.is_none());
  }

  #[test]
  fn restore_older_state_stays_historical() {
    let t0 = Utc::now() - Duration::hours(2);
    let t1 = t0 + Duration::hours(1);
    let current = state(2, true, t1, None);
    let mut restored = state(1, false, t0, Some(t1));
    restored.meta.df = true;

    let updates = plan_restore(assemble(vec![current]), restored);
    assert_eq!(updates.len(), 1);
    assert!(!updates[0].meta.cf && !updates[0].meta.df);
    assert_eq!(updates[0].meta.ared, Some(t1));
  }

  #[test]
  fn restoring_the_live_current_state_keeps_it_current() {
    let t0 = Utc::now() - Duration::hours(1);
    let current = state(1, true, t0, None);

    let updates = plan_restore(assemble(vec![current.clone()]), current);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].meta.rid, 1);
    assert!(updates[0].meta.cf && !updates[0].meta.df);
    assert!(updates[0].meta.ared.is_none());
  }

  #[test]
  fn restoring_a_stale_current_copy_closes_it() {
    let t0 = Utc::now() - Duration::hours(2);
    let t1 = t0 + Duration::hours(1);
    let current = state(2, true, t1, None);
    let mut stale = state(1, true, t0, None);
    stale.meta.df = true;

    let updates = plan_restore(assemble(vec![current]), stale);
    assert_eq!(updates.len(), 1);
    assert!(!updates[0].meta.cf && !updates[0].meta.df);
    assert_eq!(updates[0].meta.ared, Some(t1));
  }
}
