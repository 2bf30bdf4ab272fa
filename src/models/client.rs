//! Client relationships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, Note, require_text};
use crate::{Error, Result};

labeled_enum! {
    /// Role the client plays in a deal.
    #[derive(Default)]
    pub enum ClientType {
        #[default]
        Buyer => "buyer",
        Seller => "seller",
        Renter => "renter",
        Landlord => "landlord",
    }
}

labeled_enum! {
    #[derive(Default)]
    pub enum ClientStatus {
        #[default]
        Active => "active",
        Inactive => "inactive",
        Closed => "closed",
    }
}

labeled_enum! {
    /// Acquisition channel.
    #[derive(Default)]
    pub enum ClientSource {
        Referral => "referral",
        Website => "website",
        SocialMedia => "social-media",
        Advertising => "advertising",
        WalkIn => "walk-in",
        ColdCall => "cold-call",
        #[default]
        Other => "other",
    }
}

labeled_enum! {
    /// How soon the client intends to act.
    pub enum Timeline {
        Immediate => "immediate",
        OneToThreeMonths => "1-3-months",
        ThreeToSixMonths => "3-6-months",
        SixToTwelveMonths => "6-12-months",
        Flexible => "flexible",
    }
}

/// Price band the client can afford.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default)]
    pub pre_approved: bool,
}

impl Budget {
    pub fn validate(&self) -> Result<()> {
        for (label, bound) in [("minimum", self.min), ("maximum", self.max)] {
            if let Some(value) = bound {
                if !value.is_finite() || value < 0.0 {
                    return Err(Error::Validation(format!(
                        "budget {} must be a non-negative number, got {}",
                        label, value
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(Error::Validation(format!(
                    "budget minimum {} exceeds maximum {}",
                    min, max
                )));
            }
        }
        Ok(())
    }
}

/// A person the brokerage works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier (e.g., "cli-1a2b3c4d")
    pub id: String,

    pub first_name: String,

    pub last_name: String,

    pub email: String,

    #[serde(default)]
    pub phone: String,

    #[serde(rename = "type", default)]
    pub client_type: ClientType,

    #[serde(default)]
    pub status: ClientStatus,

    #[serde(default)]
    pub source: ClientSource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,

    /// When the agent should next reach out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_follow_up: Option<DateTime<Utc>>,

    /// Append-only, oldest first
    #[serde(default)]
    pub notes: Vec<Note>,

    /// Property IDs the client is interested in (no duplicates)
    #[serde(default)]
    pub property_interests: Vec<String>,

    /// Transaction IDs involving the client (no duplicates)
    #[serde(default)]
    pub transactions: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Upper bound of the budget, used as the client's aggregate measure.
    pub fn budget_ceiling(&self) -> Option<f64> {
        self.budget.as_ref().and_then(|b| b.max)
    }
}

impl Entity for Client {
    const KIND: EntityKind = EntityKind::Client;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<()> {
        require_text("client first name", &self.first_name)?;
        require_text("client email", &self.email)?;
        if !self.email.contains('@') {
            return Err(Error::Validation(format!(
                "client email is not an address: {}",
                self.email
            )));
        }
        if let Some(ref budget) = self.budget {
            budget.validate()?;
        }
        for note in &self.notes {
            note.validate()?;
        }
        Ok(())
    }
}

/// Input for creating a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientDraft {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "type", default)]
    pub client_type: ClientType,
    #[serde(default)]
    pub source: ClientSource,
    #[serde(default)]
    pub budget: Option<Budget>,
    #[serde(default)]
    pub timeline: Option<Timeline>,
    #[serde(default)]
    pub next_follow_up: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl ClientDraft {
    pub fn into_client(self, id: String, now: DateTime<Utc>) -> Client {
        Client {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            client_type: self.client_type,
            status: ClientStatus::default(),
            source: self.source,
            budget: self.budget,
            timeline: self.timeline,
            next_follow_up: self.next_follow_up,
            notes: Vec::new(),
            property_interests: Vec::new(),
            transactions: Vec::new(),
            tags: self.tags,
            agent_id: self.agent_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a client. Notes are appended through their own operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "type", default)]
    pub client_type: Option<ClientType>,
    #[serde(default)]
    pub source: Option<ClientSource>,
    #[serde(default)]
    pub budget: Option<Budget>,
    #[serde(default)]
    pub timeline: Option<Timeline>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl ClientPatch {
    pub fn apply(&self, client: &mut Client) {
        if let Some(ref first_name) = self.first_name {
            client.first_name = first_name.clone();
        }
        if let Some(ref last_name) = self.last_name {
            client.last_name = last_name.clone();
        }
        if let Some(ref email) = self.email {
            client.email = email.clone();
        }
        if let Some(ref phone) = self.phone {
            client.phone = phone.clone();
        }
        if let Some(client_type) = self.client_type {
            client.client_type = client_type;
        }
        if let Some(source) = self.source {
            client.source = source;
        }
        if let Some(ref budget) = self.budget {
            client.budget = Some(budget.clone());
        }
        if let Some(timeline) = self.timeline {
            client.timeline = Some(timeline);
        }
        if let Some(ref tags) = self.tags {
            client.tags = tags.clone();
        }
        if let Some(ref agent_id) = self.agent_id {
            client.agent_id = Some(agent_id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ClientDraft {
        ClientDraft {
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            email: "ana@example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_budget_min_must_not_exceed_max() {
        let budget = Budget {
            min: Some(3_000_000.0),
            max: Some(2_000_000.0),
            pre_approved: false,
        };
        assert!(matches!(budget.validate(), Err(Error::Validation(_))));

        let open_ended = Budget {
            min: Some(3_000_000.0),
            max: None,
            pre_approved: true,
        };
        assert!(open_ended.validate().is_ok());
    }

    #[test]
    fn test_client_validation_checks_email() {
        let mut client = draft().into_client("cli-0001".to_string(), Utc::now());
        assert!(client.validate().is_ok());

        client.email = "not-an-address".to_string();
        assert!(client.validate().is_err());
    }

    #[test]
    fn test_new_client_starts_active_without_notes() {
        let client = draft().into_client("cli-0001".to_string(), Utc::now());
        assert_eq!(client.status, ClientStatus::Active);
        assert!(client.notes.is_empty());
        assert_eq!(client.full_name(), "Ana Ruiz");
    }

    #[test]
    fn test_timeline_labels() {
        assert_eq!(Timeline::OneToThreeMonths.to_string(), "1-3-months");
        assert_eq!(
            "6_12_months".parse::<Timeline>().unwrap(),
            Timeline::SixToTwelveMonths
        );
    }
}
