//! Data models for brokerage entities.
//!
//! This module defines the core data structures:
//! - `Property` - Listings with price, type, status, address and details
//! - `Client` - Buyers, sellers, renters and landlords with notes and interests
//! - `Transaction` - Sale/rental deals with financials, milestones and notes
//! - `Milestone` - Dated sub-tasks of a transaction
//! - `Note` - Append-only remarks shared by clients and transactions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;

use crate::{Error, Result};

/// Declares a closed string-labelled enum with `as_str`, `Display`, `FromStr`
/// and an `ALL` table. Parsing is case-insensitive and accepts `_` for `-`.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire label of this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> crate::Result<Self> {
                let normalized = s.trim().to_lowercase().replace('_', "-");
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == normalized)
                    .ok_or_else(|| {
                        crate::Error::Validation(format!(
                            "Unknown {} value: {}",
                            stringify!($name),
                            s
                        ))
                    })
            }
        }
    };
}

pub mod client;
pub mod property;
pub mod transaction;

pub use client::{Budget, Client, ClientDraft, ClientPatch, ClientSource, ClientStatus, ClientType, Timeline};
pub use property::{
    Address, Property, PropertyDetails, PropertyDraft, PropertyPatch, PropertyStatus, PropertyType,
};
pub use transaction::{
    Commission, Financials, FinancialsPatch, Milestone, MilestoneStatus, Transaction,
    TransactionDates, TransactionDraft, TransactionStatus, TransactionType, derive_commission,
};

labeled_enum! {
    /// The three kinds of record the engine manages.
    pub enum EntityKind {
        Property => "property",
        Client => "client",
        Transaction => "transaction",
    }
}

impl EntityKind {
    /// Identity prefix used when generating IDs for this kind.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Property => "prop",
            EntityKind::Client => "cli",
            EntityKind::Transaction => "txn",
        }
    }
}

/// Behaviour shared by every stored record.
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    /// Refresh the last-updated timestamp.
    fn touch(&mut self, now: DateTime<Utc>);

    /// Check the record's own invariants.
    fn validate(&self) -> Result<()>;
}

labeled_enum! {
    /// Category of a note.
    #[derive(Default)]
    pub enum NoteType {
        #[default]
        General => "general",
        Call => "call",
        Email => "email",
        Meeting => "meeting",
        Showing => "showing",
        FollowUp => "follow-up",
    }
}

/// An append-only remark attached to a client or transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier (UUID v4)
    pub id: String,

    pub content: String,

    #[serde(rename = "type", default)]
    pub note_type: NoteType,

    /// Who wrote the note
    pub author: String,

    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Create a note stamped with `now`.
    pub fn new(
        content: impl Into<String>,
        note_type: NoteType,
        author: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            note_type,
            author: author.into(),
            created_at: now,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_text("note content", &self.content)?;
        require_text("note author", &self.author)
    }
}

/// Reject empty or whitespace-only text.
pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Reject non-finite or non-positive amounts.
pub(crate) fn require_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::Validation(format!(
            "{} must be a positive number, got {}",
            field, value
        )));
    }
    Ok(())
}

/// Insert `value` unless already present, preserving order.
pub(crate) fn insert_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|existing| existing == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_enum_parse_accepts_underscores() {
        assert_eq!(
            "under_contract".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::UnderContract
        );
        assert_eq!(
            "Off-Market".parse::<PropertyStatus>().unwrap(),
            PropertyStatus::OffMarket
        );
        assert!("sideways".parse::<PropertyStatus>().is_err());
    }

    #[test]
    fn test_labeled_enum_serialization() {
        let json = serde_json::to_string(&TransactionStatus::FinalWalkthrough).unwrap();
        assert_eq!(json, r#""final-walkthrough""#);

        let status: ClientStatus = serde_json::from_str(r#""inactive""#).unwrap();
        assert_eq!(status, ClientStatus::Inactive);
    }

    #[test]
    fn test_note_validation() {
        let now = Utc::now();
        assert!(Note::new("Called back", NoteType::Call, "agent-1", now).validate().is_ok());
        assert!(Note::new("   ", NoteType::Call, "agent-1", now).validate().is_err());
    }

    #[test]
    fn test_note_type_defaults_to_general() {
        let json = r#"{"id":"n1","content":"hi","author":"a","created_at":"2026-01-01T00:00:00Z"}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.note_type, NoteType::General);
    }

    #[test]
    fn test_insert_unique_keeps_set_semantics() {
        let mut list = vec!["prop-1".to_string()];
        assert!(!insert_unique(&mut list, "prop-1"));
        assert!(insert_unique(&mut list, "prop-2"));
        assert_eq!(list, vec!["prop-1", "prop-2"]);
    }
}
