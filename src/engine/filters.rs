//! Field exposure for the predicate engine, plus typed filter builders.
//!
//! The typed filters are the shapes list screens and the CLI produce; each
//! lowers into a [`FilterSpec`] so every query runs through the same engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::predicate::{Constraint, FieldValue, FilterSpec, Filterable, SEARCH_FIELD};
use crate::models::{
    Client, ClientSource, ClientStatus, ClientType, Property, PropertyStatus, PropertyType,
    Transaction, TransactionStatus, TransactionType,
};

fn text(value: &str) -> FieldValue {
    FieldValue::Text(value.to_string())
}

fn optional_number(value: Option<f64>) -> FieldValue {
    value.map(FieldValue::Number).unwrap_or(FieldValue::Missing)
}

fn optional_date(value: Option<DateTime<Utc>>) -> FieldValue {
    value.map(FieldValue::Date).unwrap_or(FieldValue::Missing)
}

impl Filterable for Property {
    const FIELDS: &'static [&'static str] = &[
        "status",
        "type",
        "price",
        "city",
        "state",
        "location",
        "bedrooms",
        "bathrooms",
        "square_feet",
        "price_per_sqft",
        "features",
        "agent_id",
        "listed_at",
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["title", "description", "location", "features"];

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => text(&self.id),
            "title" => text(&self.title),
            "description" => self
                .description
                .as_deref()
                .map(text)
                .unwrap_or(FieldValue::Missing),
            "status" => text(self.status.as_str()),
            "type" => text(self.property_type.as_str()),
            "price" => FieldValue::Number(self.price),
            "city" => text(&self.address.city),
            "state" => text(&self.address.state),
            "location" => FieldValue::Text(self.address.search_text()),
            "bedrooms" => optional_number(self.details.bedrooms.map(f64::from)),
            "bathrooms" => optional_number(self.details.bathrooms),
            "square_feet" => optional_number(self.details.square_feet),
            "price_per_sqft" => optional_number(self.price_per_sqft()),
            "features" => FieldValue::Labels(self.features.clone()),
            "agent_id" => text(&self.agent_id),
            "listed_at" => FieldValue::Date(self.listed_at),
            _ => FieldValue::Missing,
        }
    }
}

impl Filterable for Client {
    const FIELDS: &'static [&'static str] = &[
        "status",
        "type",
        "source",
        "timeline",
        "budget_min",
        "budget_max",
        "tags",
        "agent_id",
        "next_follow_up",
        "created_at",
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["first_name", "last_name", "email", "phone", "tags"];

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => text(&self.id),
            "first_name" => text(&self.first_name),
            "last_name" => text(&self.last_name),
            "email" => text(&self.email),
            "phone" => text(&self.phone),
            "status" => text(self.status.as_str()),
            "type" => text(self.client_type.as_str()),
            "source" => text(self.source.as_str()),
            "timeline" => self
                .timeline
                .map(|t| text(t.as_str()))
                .unwrap_or(FieldValue::Missing),
            "budget_min" => optional_number(self.budget.as_ref().and_then(|b| b.min)),
            "budget_max" => optional_number(self.budget.as_ref().and_then(|b| b.max)),
            "tags" => FieldValue::Labels(self.tags.clone()),
            "agent_id" => self
                .agent_id
                .as_deref()
                .map(text)
                .unwrap_or(FieldValue::Missing),
            "next_follow_up" => optional_date(self.next_follow_up),
            "created_at" => FieldValue::Date(self.created_at),
            _ => FieldValue::Missing,
        }
    }
}

impl Filterable for Transaction {
    const FIELDS: &'static [&'static str] = &[
        "status",
        "type",
        "agent_id",
        "client_id",
        "property_id",
        "sale_price",
        "commission_amount",
        "contract_date",
        "closing_date",
        "created_at",
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["id", "property_id", "client_id", "agent_id"];

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => text(&self.id),
            "status" => text(self.status.as_str()),
            "type" => text(self.transaction_type.as_str()),
            "agent_id" => text(&self.agent_id),
            "client_id" => text(&self.client_id),
            "property_id" => text(&self.property_id),
            "sale_price" => FieldValue::Number(self.financials.sale_price),
            "commission_amount" => FieldValue::Number(self.financials.commission.amount),
            "contract_date" => optional_date(self.dates.contract),
            "closing_date" => optional_date(self.dates.closing),
            "created_at" => FieldValue::Date(self.created_at),
            _ => FieldValue::Missing,
        }
    }
}

fn range(min: Option<f64>, max: Option<f64>) -> Option<Constraint> {
    (min.is_some() || max.is_some()).then_some(Constraint::Range { min, max })
}

fn date_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<Constraint> {
    (from.is_some() || to.is_some()).then_some(Constraint::DateRange { from, to })
}

fn non_empty(spec: &mut FilterSpec, field: &str, constraint: Option<Constraint>) {
    if let Some(c) = constraint {
        spec.insert(field, c);
    }
}

fn labels<T: ToString>(values: &[T]) -> Option<Constraint> {
    (!values.is_empty()).then(|| Constraint::any_of(values.iter().map(|v| v.to_string())))
}

fn exact(value: &Option<String>) -> Option<Constraint> {
    value.as_ref().map(|v| Constraint::any_of([v.as_str()]))
}

fn substring(value: &Option<String>) -> Option<Constraint> {
    value.as_ref().map(|v| Constraint::contains(v.as_str()))
}

/// Listing screen filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<PropertyStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<PropertyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_bedrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_bathrooms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl PropertyFilter {
    pub fn to_spec(&self) -> FilterSpec {
        let mut spec = FilterSpec::new();
        non_empty(&mut spec, "status", labels(&self.statuses));
        non_empty(&mut spec, "type", labels(&self.types));
        non_empty(&mut spec, "price", range(self.min_price, self.max_price));
        non_empty(&mut spec, "city", substring(&self.city));
        non_empty(&mut spec, "state", substring(&self.state));
        non_empty(
            &mut spec,
            "bedrooms",
            self.min_bedrooms.map(|b| Constraint::at_least(f64::from(b))),
        );
        non_empty(&mut spec, "bathrooms", self.min_bathrooms.map(Constraint::at_least));
        non_empty(&mut spec, "agent_id", exact(&self.agent_id));
        non_empty(&mut spec, SEARCH_FIELD, self.search.as_ref().map(|s| Constraint::search(s.as_str())));
        spec
    }
}

/// Client screen filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<ClientStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<ClientType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<ClientSource>,
    /// Lower budget bound must be at least this much
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_budget: Option<f64>,
    /// Upper budget bound must be at most this much
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl ClientFilter {
    pub fn to_spec(&self) -> FilterSpec {
        let mut spec = FilterSpec::new();
        non_empty(&mut spec, "status", labels(&self.statuses));
        non_empty(&mut spec, "type", labels(&self.types));
        non_empty(&mut spec, "source", labels(&self.sources));
        non_empty(&mut spec, "budget_min", self.min_budget.map(Constraint::at_least));
        non_empty(&mut spec, "budget_max", self.max_budget.map(Constraint::at_most));
        non_empty(&mut spec, "tags", labels(&self.tags));
        non_empty(&mut spec, "agent_id", exact(&self.agent_id));
        non_empty(&mut spec, "next_follow_up", date_range(None, self.follow_up_before));
        non_empty(&mut spec, SEARCH_FIELD, self.search.as_ref().map(|s| Constraint::search(s.as_str())));
        spec
    }
}

/// Transaction screen filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<TransactionStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TransactionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_to: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl TransactionFilter {
    pub fn to_spec(&self) -> FilterSpec {
        let mut spec = FilterSpec::new();
        non_empty(&mut spec, "status", labels(&self.statuses));
        non_empty(&mut spec, "type", labels(&self.types));
        non_empty(&mut spec, "agent_id", exact(&self.agent_id));
        non_empty(&mut spec, "client_id", exact(&self.client_id));
        non_empty(&mut spec, "property_id", exact(&self.property_id));
        non_empty(&mut spec, "sale_price", range(self.min_price, self.max_price));
        non_empty(&mut spec, "contract_date", date_range(self.contract_from, self.contract_to));
        non_empty(&mut spec, SEARCH_FIELD, self.search.as_ref().map(|s| Constraint::search(s.as_str())));
        spec
    }
}
