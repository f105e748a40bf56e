//! Composable WHERE-clause predicates.
//!
//! A filter is an ordered list of [`Predicate`]s. Each one names a column, an
//! operator, a literal and the literal's [`SemanticType`], plus how it joins
//! the previous predicate and any parentheses it opens or closes.
//! [`render_where`] turns the list into SQL text.

use std::{fmt::Write as _, str::FromStr};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{Error, Result, schema::SemanticType, value::format_timestamp};

// ─── Parts ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
pub enum Operator {
  #[default]
  #[strum(serialize = "=")]
  Equal,
  #[strum(serialize = "!=")]
  NotEqual,
  #[strum(serialize = "<")]
  LessThan,
  #[strum(serialize = "<=")]
  LessThanOrEqual,
  #[strum(serialize = ">")]
  GreaterThan,
  #[strum(serialize = ">=")]
  GreaterThanOrEqual,
  #[strum(serialize = "LIKE")]
  Like,
  #[strum(serialize = "IS")]
  Is,
  #[strum(serialize = "IS NOT")]
  IsNot,
}

/// How a predicate joins the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Conjunction {
  #[default]
  And,
  Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grouping {
  Open,
  Close,
}

// ─── Predicate ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
  pub name:        String,
  pub operator:    Operator,
  /// Raw literal text; `None` is the NULL sentinel.
  pub value:       Option<String>,
  pub value_type:  SemanticType,
  pub conjunction: Conjunction,
  pub groupings:   Vec<Grouping>,
}

impl Predicate {
  pub fn new(
    name: impl Into<String>,
    operator: Operator,
    value: impl Into<String>,
    value_type: SemanticType,
  ) -> Self {
    Self {
      name: name.into(),
      operator,
      value: Some(value.into()),
      value_type,
      conjunction: Conjunction::And,
      groupings: Vec::new(),
    }
  }

  pub fn text(name: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
    Self::new(name, operator, value, SemanticType::Text)
  }

  pub fn bigint(name: impl Into<String>, operator: Operator, value: i64) -> Self {
    Self::new(name, operator, value.to_string(), SemanticType::BigInt)
  }

  pub fn boolean(name: impl Into<String>, value: bool) -> Self {
    Self::new(name, Operator::Equal, value.to_string(), SemanticType::Bool)
  }

  pub fn timestamp(
    name: impl Into<String>,
    operator: Operator,
    at: DateTime<Utc>,
  ) -> Self {
    Self::new(name, operator, format_timestamp(at), SemanticType::Timestamp)
  }

  /// `name IS NULL`.
  pub fn is_null(name: impl Into<String>) -> Self {
    Self {
      name:        name.into(),
      operator:    Operator::Is,
      value:       None,
      value_type:  SemanticType::Text,
      conjunction: Conjunction::And,
      groupings:   Vec::new(),
    }
  }

  /// `name IS NOT NULL`.
  pub fn is_not_null(name: impl Into<String>) -> Self {
    Self {
      operator: Operator::IsNot,
      ..Self::is_null(name)
    }
  }

  /// Join with OR instead of AND.
  pub fn or(mut self) -> Self {
    self.conjunction = Conjunction::Or;
    self
  }

  /// Open a parenthesis before this predicate.
  pub fn open(mut self) -> Self {
    self.groupings.push(Grouping::Open);
    self
  }

  /// Close a parenthesis after this predicate.
  pub fn close(mut self) -> Self {
    self.groupings.push(Grouping::Close);
    self
  }

  fn count(&self, grouping: Grouping) -> usize {
    self.groupings.iter().filter(|g| **g == grouping).count()
  }

  /// Render `name op literal` without conjunction or parentheses.
  fn render_condition(&self, sql: &mut String) -> Result<()> {
    if !is_identifier(&self.name) {
      return Err(Error::InvalidFieldName(self.name.clone()));
    }

    let Some(raw) = self.value.as_deref() else {
      let test = match self.operator {
        Operator::Equal | Operator::Is => "IS NULL",
        Operator::NotEqual | Operator::IsNot => "IS NOT NULL",
        other => {
          return Err(Error::NullComparison {
            field:    self.name.clone(),
            operator: other.to_string(),
          });
        }
      };
      let _ = write!(sql, "{} {test}", self.name);
      return Ok(());
    };

    let literal = match self.value_type {
      ty if ty.is_numeric() => {
        if BigDecimal::from_str(raw.trim()).is_err() {
          return Err(self.invalid(raw, ty.name()));
        }
        raw.trim().to_owned()
      }
      SemanticType::Bool => {
        if raw.eq_ignore_ascii_case("true") {
          "true".to_owned()
        } else if raw.eq_ignore_ascii_case("false") {
          "false".to_owned()
        } else {
          return Err(self.invalid(raw, "bool"));
        }
      }
      _ => quote(raw),
    };

    let _ = write!(sql, "{} {} {literal}", self.name, self.operator);
    Ok(())
  }

  fn invalid(&self, raw: &str, expected: &'static str) -> Error {
    Error::InvalidLiteral {
      field: self.name.clone(),
      value: raw.to_owned(),
      expected,
    }
  }
}

fn quote(raw: &str) -> String { format!("'{}'", raw.replace('\'', "''")) }

/// Column names or `table.column` paths; also admits the projection alias
/// form produced by aggregate selects.
fn is_identifier(name: &str) -> bool {
  !name.is_empty()
    && name.split('.').all(|part| {
      let mut chars = part.chars();
      matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

// ─── Rendering ───────────────────────────────────────────────────────────────

/// Render a predicate list as ` where ...`, or an empty string for an empty
/// list.
pub fn render_where(predicates: &[Predicate]) -> Result<String> {
  if predicates.is_empty() {
    return Ok(String::new());
  }

  let mut sql = String::from(" where");
  for (index, predicate) in predicates.iter().enumerate() {
    if index > 0 {
      let _ = write!(sql, " {}", predicate.conjunction);
    }
    sql.push(' ');
    for _ in 0..predicate.count(Grouping::Open) {
      sql.push('(');
    }
    predicate.render_condition(&mut sql)?;
    for _ in 0..predicate.count(Grouping::Close) {
      sql.push(')');
    }
  }
  Ok(sql)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn empty_list_renders_nothing() {
    assert_eq!(render_where(&[]).unwrap(), "");
  }

  #[test]
  fn base_filter_with_tenant() {
    let predicates = [
      Predicate::new("df", Operator::NotEqual, "1", SemanticType::Int),
      Predicate::bigint("tid", Operator::Equal, 1),
    ];
    assert_eq!(render_where(&predicates).unwrap(), " where df != 1 AND tid = 1");
  }

  #[test]
  fn first_conjunction_is_ignored() {
    let predicates = [Predicate::bigint("id", Operator::Equal, 4).or()];
    assert_eq!(render_where(&predicates).unwrap(), " where id = 4");
  }

  #[test]
  fn grouped_or_null_is_balanced() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let predicates = [
      Predicate::timestamp("arsd", Operator::LessThanOrEqual, at),
      Predicate::timestamp("ared", Operator::GreaterThanOrEqual, at).open(),
      Predicate::is_null("ared").or().close(),
    ];
    assert_eq!(
      render_where(&predicates).unwrap(),
      " where arsd <= '2024-05-01 12:00:00.000000' \
       AND (ared >= '2024-05-01 12:00:00.000000' OR ared IS NULL)"
    );
  }

  #[test]
  fn null_sentinel_follows_operator() {
    let eq = Predicate {
      operator: Operator::Equal,
      ..Predicate::is_null("ared")
    };
    let ne = Predicate {
      operator: Operator::NotEqual,
      ..Predicate::is_null("ared")
    };
    assert_eq!(render_where(&[eq]).unwrap(), " where ared IS NULL");
    assert_eq!(render_where(&[ne]).unwrap(), " where ared IS NOT NULL");
    assert_eq!(
      render_where(&[Predicate::is_not_null("ared")]).unwrap(),
      " where ared IS NOT NULL"
    );
  }

  #[test]
  fn null_with_ordering_operator_is_rejected() {
    let p = Predicate {
      operator: Operator::LessThan,
      ..Predicate::is_null("ared")
    };
    assert!(matches!(render_where(&[p]), Err(Error::NullComparison { .. })));
  }

  #[test]
  fn booleans_render_bare_and_case_insensitively() {
    let p = Predicate::new("cf", Operator::Equal, "TRUE", SemanticType::Bool);
    assert_eq!(render_where(&[p]).unwrap(), " where cf = true");
    assert_eq!(
      render_where(&[Predicate::boolean("cf", false)]).unwrap(),
      " where cf = false"
    );
  }

  #[test]
  fn unrecognised_boolean_text_is_rejected() {
    let p = Predicate::new("cf", Operator::Equal, "yes", SemanticType::Bool);
    let err = render_where(&[Predicate::bigint("id", Operator::Equal, 1), p])
      .unwrap_err();
    assert!(matches!(err, Error::InvalidLiteral { expected: "bool", .. }));
  }

  #[test]
  fn numeric_literals_are_validated() {
    let ok = Predicate::new("price", Operator::GreaterThan, "12.50", SemanticType::Decimal);
    assert_eq!(render_where(&[ok]).unwrap(), " where price > 12.50");

    let bad = Predicate::new("id", Operator::Equal, "1 OR 1=1", SemanticType::BigInt);
    assert!(matches!(
      render_where(&[bad]),
      Err(Error::InvalidLiteral { expected: "bigint", .. })
    ));
  }

  #[test]
  fn quoted_types_escape_quotes() {
    let p = Predicate::text("name", Operator::Equal, "O'Brien");
    assert_eq!(render_where(&[p]).unwrap(), " where name = 'O''Brien'");

    let p = Predicate::new("kind", Operator::Equal, "Gold", SemanticType::Enum);
    assert_eq!(render_where(&[p]).unwrap(), " where kind = 'Gold'");
  }

  #[test]
  fn field_names_must_be_identifiers() {
    let p = Predicate::text("name; DROP TABLE x", Operator::Equal, "a");
    assert!(matches!(render_where(&[p]), Err(Error::InvalidFieldName(_))));

    let p = Predicate::bigint("person.id", Operator::Equal, 2);
    assert_eq!(render_where(&[p]).unwrap(), " where person.id = 2");
  }

  #[test]
  fn nested_groups() {
    let predicates = [
      Predicate::bigint("a", Operator::Equal, 1).open().open(),
      Predicate::bigint("b", Operator::Equal, 2).or().close(),
      Predicate::bigint("c", Operator::Equal, 3).close(),
    ];
    assert_eq!(
      render_where(&predicates).unwrap(),
      " where ((a = 1 OR b = 2) AND c = 3)"
    );
  }
}
