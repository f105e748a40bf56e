//! The temporal read catalogue.
//!
//! Every read is the base filter (`df != 1`), an optional key on the entity or
//! version, the filter of one [`TemporalQuery`] variant, and an optional
//! tenant match, in that order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  predicate::{Operator, Predicate},
  record::{ARED, ARSD, CF, DF, ID, RID, TID},
  schema::SemanticType,
};

/// Which states of an entity a read selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemporalQuery {
  All,
  Current,
  History,
  /// States active at the instant.
  AtDate { at: DateTime<Utc> },
  /// States still active at or after the instant.
  FromDate { from: DateTime<Utc> },
  /// States that started at or before the instant.
  BeforeDate { before: DateTime<Utc> },
  /// States overlapping the interval.
  BetweenDates {
    start: DateTime<Utc>,
    end:   DateTime<Utc>,
  },
}

/// What a read is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scope {
  /// Every entity, optionally restricted to one tenant.
  Tenant(Option<i64>),
  /// One entity by id.
  Entity(i64),
  /// The single state with this version id.
  Version(i64),
}

impl Default for Scope {
  fn default() -> Self { Self::Tenant(None) }
}

// ─── Predicate construction ──────────────────────────────────────────────────

/// `df != 1`.
pub fn not_deleted() -> Predicate {
  Predicate::new(DF, Operator::NotEqual, "1", SemanticType::Int)
}

/// `(ared >= t OR ared IS NULL)`.
fn still_open_at(t: DateTime<Utc>) -> [Predicate; 2] {
  [
    Predicate::timestamp(ARED, Operator::GreaterThanOrEqual, t).open(),
    Predicate::is_null(ARED).or().close(),
  ]
}

impl TemporalQuery {
  /// The variant's own filter, without the base or scope predicates.
  pub fn filter(&self) -> Vec<Predicate> {
    match *self {
      Self::All => Vec::new(),
      Self::Current => vec![Predicate::boolean(CF, true)],
      Self::History => vec![Predicate::boolean(CF, false)],
      Self::AtDate { at } => {
        let mut p = vec![Predicate::timestamp(ARSD, Operator::LessThanOrEqual, at)];
        p.extend(still_open_at(at));
        p
      }
      Self::FromDate { from } => still_open_at(from).into(),
      Self::BeforeDate { before } => {
        vec![Predicate::timestamp(ARSD, Operator::LessThanOrEqual, before)]
      }
      Self::BetweenDates { start, end } => {
        let mut p = vec![Predicate::timestamp(ARSD, Operator::LessThanOrEqual, end)];
        p.extend(still_open_at(start));
        p
      }
    }
  }

  /// The complete predicate list for this variant under `scope`.
  pub fn predicates(&self, scope: Scope) -> Vec<Predicate> {
    let mut predicates = vec![not_deleted()];
    match scope {
      Scope::Entity(id) => predicates.push(Predicate::bigint(ID, Operator::Equal, id)),
      Scope::Version(rid) => {
        predicates.push(Predicate::bigint(RID, Operator::Equal, rid))
      }
      Scope::Tenant(_) => {}
    }
    predicates.extend(self.filter());
    if let Scope::Tenant(Some(tid)) = scope {
      predicates.push(Predicate::bigint(TID, Operator::Equal, tid));
    }
    predicates
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::predicate::render_where;

  fn render(query: TemporalQuery, scope: Scope) -> String {
    render_where(&query.predicates(scope)).unwrap()
  }

  fn noon() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() }

  #[test]
  fn all_with_tenant() {
    assert_eq!(
      render(TemporalQuery::All, Scope::Tenant(Some(1))),
      " where df != 1 AND tid = 1"
    );
    assert_eq!(render(TemporalQuery::All, Scope::Tenant(None)), " where df != 1");
  }

  #[test]
  fn current_and_history_flags() {
    assert_eq!(
      render(TemporalQuery::Current, Scope::Entity(3)),
      " where df != 1 AND id = 3 AND cf = true"
    );
    assert_eq!(
      render(TemporalQuery::History, Scope::Tenant(Some(2))),
      " where df != 1 AND cf = false AND tid = 2"
    );
  }

  #[test]
  fn at_date_brackets_the_instant() {
    assert_eq!(
      render(TemporalQuery::AtDate { at: noon() }, Scope::Tenant(None)),
      " where df != 1 AND arsd <= '2024-06-01 12:00:00.000000' \
       AND (ared >= '2024-06-01 12:00:00.000000' OR ared IS NULL)"
    );
  }

  #[test]
  fn from_date_groups_its_disjunction() {
    assert_eq!(
      render(TemporalQuery::FromDate { from: noon() }, Scope::Tenant(Some(1))),
      " where df != 1 AND (ared >= '2024-06-01 12:00:00.000000' OR ared IS NULL) \
       AND tid = 1"
    );
  }

  #[test]
  fn before_and_between() {
    assert_eq!(
      render(TemporalQuery::BeforeDate { before: noon() }, Scope::Version(9)),
      " where df != 1 AND rid = 9 AND arsd <= '2024-06-01 12:00:00.000000'"
    );

    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(
      render(TemporalQuery::BetweenDates { start, end: noon() }, Scope::Entity(1)),
      " where df != 1 AND id = 1 AND arsd <= '2024-06-01 12:00:00.000000' \
       AND (ared >= '2024-01-01 00:00:00.000000' OR ared IS NULL)"
    );
  }
}
