//! Declarative filter evaluation.
//!
//! A [`FilterSpec`] maps field names to [`Constraint`]s. Every constraint must
//! hold for an entity to match (logical AND); an empty spec matches everything.
//! The reserved `search` field runs a case-insensitive substring query across
//! the entity's searchable fields, matching if any one of them contains it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Error, Result};

/// Field name reserved for free-text search.
pub const SEARCH_FIELD: &str = "search";

/// A single match condition on one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// The field (or any element of a list field) equals one of `values`.
    /// An empty value set places no restriction.
    AnyOf { values: Vec<String> },

    /// Inclusive numeric bounds; either side may be open.
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },

    /// Case-insensitive substring match on a text field.
    Contains { text: String },

    /// Case-insensitive substring match across the searchable fields.
    Search { text: String },

    /// Inclusive date bounds; either side may be open.
    DateRange {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<DateTime<Utc>>,
    },
}

impl Constraint {
    pub fn any_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Constraint::AnyOf {
            values: values.into_iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Constraint::Range {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f64) -> Self {
        Constraint::Range {
            min: None,
            max: Some(max),
        }
    }

    pub fn contains(text: impl Into<String>) -> Self {
        Constraint::Contains { text: text.into() }
    }

    pub fn search(text: impl Into<String>) -> Self {
        Constraint::Search { text: text.into() }
    }

    fn validate(&self, field: &str) -> Result<()> {
        match self {
            Constraint::Range {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(Error::Validation(format!(
                "range for '{}' has min {} above max {}",
                field, min, max
            ))),
            Constraint::DateRange {
                from: Some(from),
                to: Some(to),
            } if from > to => Err(Error::Validation(format!(
                "date range for '{}' starts after it ends",
                field
            ))),
            Constraint::Search { .. } if field != SEARCH_FIELD => Err(Error::Validation(format!(
                "search constraints belong under '{}', not '{}'",
                SEARCH_FIELD, field
            ))),
            _ => Ok(()),
        }
    }

    /// Evaluate against one field value.
    fn accepts(&self, value: &FieldValue) -> bool {
        match self {
            Constraint::AnyOf { values } => {
                if values.is_empty() {
                    return true;
                }
                let wanted = |candidate: &str| values.iter().any(|v| v.eq_ignore_ascii_case(candidate));
                match value {
                    FieldValue::Text(text) => wanted(text.as_str()),
                    FieldValue::Labels(labels) => labels.iter().any(|l| wanted(l.as_str())),
                    _ => false,
                }
            }
            Constraint::Range { min, max } => {
                if min.is_none() && max.is_none() {
                    return true;
                }
                match value {
                    FieldValue::Number(n) => {
                        min.is_none_or(|min| *n >= min) && max.is_none_or(|max| *n <= max)
                    }
                    _ => false,
                }
            }
            Constraint::Contains { text } | Constraint::Search { text } => {
                let needle = text.trim().to_lowercase();
                if needle.is_empty() {
                    return true;
                }
                match value {
                    FieldValue::Text(haystack) => haystack.to_lowercase().contains(&needle),
                    FieldValue::Labels(labels) => {
                        labels.iter().any(|l| l.to_lowercase().contains(&needle))
                    }
                    _ => false,
                }
            }
            Constraint::DateRange { from, to } => {
                if from.is_none() && to.is_none() {
                    return true;
                }
                match value {
                    FieldValue::Date(d) => {
                        from.is_none_or(|from| *d >= from) && to.is_none_or(|to| *d <= to)
                    }
                    _ => false,
                }
            }
        }
    }
}

/// The value an entity exposes for a named field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Labels(Vec<String>),
    Number(f64),
    Date(DateTime<Utc>),
    /// The field is optional and absent on this entity.
    Missing,
}

/// Field-keyed set of constraints, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    constraints: BTreeMap<String, Constraint>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterSpec::insert`].
    pub fn with(mut self, field: impl Into<String>, constraint: Constraint) -> Self {
        self.insert(field, constraint);
        self
    }

    /// Set the constraint for `field`, replacing any previous one.
    pub fn insert(&mut self, field: impl Into<String>, constraint: Constraint) {
        self.constraints.insert(field.into(), constraint);
    }

    pub fn remove(&mut self, field: &str) -> Option<Constraint> {
        self.constraints.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&Constraint> {
        self.constraints.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.constraints.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Combine two specs. Constraints on distinct fields are ANDed; where both
    /// constrain the same field, `other` wins.
    pub fn merge(mut self, other: &FilterSpec) -> Self {
        for (field, constraint) in &other.constraints {
            self.constraints.insert(field.clone(), constraint.clone());
        }
        self
    }
}

/// An entity the predicate engine can inspect.
pub trait Filterable {
    /// Field names accepted in a filter spec (besides [`SEARCH_FIELD`]).
    const FIELDS: &'static [&'static str];

    /// Fields consulted by free-text search.
    const SEARCH_FIELDS: &'static [&'static str];

    fn field(&self, name: &str) -> FieldValue;
}

/// Reject specs naming unknown fields or carrying inverted bounds.
pub fn validate_spec<E: Filterable>(spec: &FilterSpec) -> Result<()> {
    for (field, constraint) in spec.iter() {
        if field != SEARCH_FIELD && !E::FIELDS.contains(&field) {
            return Err(Error::Validation(format!(
                "unknown filter field '{}' (expected one of: {})",
                field,
                E::FIELDS.join(", ")
            )));
        }
        constraint.validate(field)?;
    }
    Ok(())
}

/// Whether `entity` satisfies every constraint in `spec`.
pub fn matches<E: Filterable>(entity: &E, spec: &FilterSpec) -> bool {
    spec.iter().all(|(field, constraint)| {
        if field == SEARCH_FIELD {
            E::SEARCH_FIELDS
                .iter()
                .any(|name| constraint.accepts(&entity.field(name)))
                || matches!(constraint, Constraint::Search { text } if text.trim().is_empty())
        } else {
            constraint.accepts(&entity.field(field))
        }
    })
}

/// Keep the entities that satisfy `spec`, preserving input order.
pub fn filter<'a, E, I>(items: I, spec: &FilterSpec) -> Vec<&'a E>
where
    E: Filterable + 'a,
    I: IntoIterator<Item = &'a E>,
{
    items.into_iter().filter(|e| matches(*e, spec)).collect()
}
