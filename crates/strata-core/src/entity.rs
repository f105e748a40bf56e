//! Grouping of states into entities.

use serde::Serialize;

use crate::record::Record;

/// All selected states of one logical record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity<R> {
  pub entity_id: i64,
  /// The state flagged current, if any was selected.
  pub current:   Option<R>,
  /// Every other selected state, in row order, without duplicate version ids.
  pub history:   Vec<R>,
}

impl<R: Record> Entity<R> {
  pub fn new(entity_id: i64) -> Self {
    Self {
      entity_id,
      current: None,
      history: Vec::new(),
    }
  }

  fn push(&mut self, state: R) {
    if state.meta().cf {
      self.current = Some(state);
    } else if !self
      .history
      .iter()
      .any(|h| h.meta().rid == state.meta().rid)
    {
      self.history.push(state);
    }
  }

  /// Every state, current first.
  pub fn states(&self) -> impl Iterator<Item = &R> {
    self.current.iter().chain(self.history.iter())
  }

  /// The historical state with the latest active range end.
  pub fn latest_history(&self) -> Option<&R> {
    self.history.iter().max_by_key(|h| h.meta().ared)
  }
}

/// Group rows into entities by id, in the order ids are first seen.
pub fn group<R: Record>(rows: Vec<R>) -> Vec<Entity<R>> {
  let mut entities: Vec<Entity<R>> = Vec::new();
  for row in rows {
    let id = row.meta().id;
    match entities.iter_mut().find(|e| e.entity_id == id) {
      Some(entity) => entity.push(row),
      None => {
        let mut entity = Entity::new(id);
        entity.push(row);
        entities.push(entity);
      }
    }
  }
  entities
}

/// Assemble rows of a by-id read into one entity. Rows whose id differs from
/// the first row's are ignored.
pub fn assemble<R: Record>(rows: Vec<R>) -> Option<Entity<R>> {
  let mut rows = rows.into_iter();
  let first = rows.next()?;
  let mut entity = Entity::new(first.meta().id);
  entity.push(first);
  for row in rows {
    if row.meta().id == entity.entity_id {
      entity.push(row);
    }
  }
  Some(entity)
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};

  use super::*;
  use crate::record::StateMeta;

  #[derive(Debug, Clone, Default, PartialEq)]
  struct Note {
    meta: StateMeta,
    body: String,
  }

  crate::impl_record! { Note { body: Text } }

  fn note(rid: i64, id: i64, cf: bool) -> Note {
    Note {
      meta: StateMeta {
        rid,
        id,
        cf,
        ..StateMeta::default()
      },
      body: format!("{id}/{rid}"),
    }
  }

  #[test]
  fn groups_in_first_seen_order() {
    let rows = vec![note(3, 2, true), note(1, 1, false), note(2, 1, true)];
    let entities = group(rows);
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].entity_id, 2);
    assert_eq!(entities[1].entity_id, 1);
    assert_eq!(entities[1].current.as_ref().unwrap().meta.rid, 2);
    assert_eq!(entities[1].history.len(), 1);
  }

  #[test]
  fn history_is_deduplicated_by_rid() {
    let rows = vec![note(1, 1, false), note(1, 1, false), note(2, 1, false)];
    let entity = assemble(rows).unwrap();
    assert!(entity.current.is_none());
    let rids: Vec<_> = entity.history.iter().map(|n| n.meta.rid).collect();
    assert_eq!(rids, [1, 2]);
  }

  #[test]
  fn assemble_ignores_foreign_rows() {
    let entity = assemble(vec![note(5, 4, true), note(6, 7, false)]).unwrap();
    assert_eq!(entity.entity_id, 4);
    assert!(entity.history.is_empty());
    assert!(assemble::<Note>(Vec::new()).is_none());
  }

  #[test]
  fn latest_history_uses_range_end() {
    let now = Utc::now();
    let mut older = note(1, 1, false);
    older.meta.ared = Some(now - Duration::hours(2));
    let mut newer = note(2, 1, false);
    newer.meta.ared = Some(now - Duration::hours(1));

    let entity = assemble(vec![newer.clone(), older]).unwrap();
    assert_eq!(entity.latest_history(), Some(&newer));
    assert_eq!(entity.states().count(), 2);
  }
}
