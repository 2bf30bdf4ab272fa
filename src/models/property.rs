//! Property listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, require_positive, require_text};
use crate::{Error, Result};

labeled_enum! {
    /// Kind of real estate being listed.
    #[derive(Default)]
    pub enum PropertyType {
        #[default]
        House => "house",
        Apartment => "apartment",
        Condo => "condo",
        Townhouse => "townhouse",
        Commercial => "commercial",
        Land => "land",
    }
}

labeled_enum! {
    /// Market status of a listing.
    #[derive(Default)]
    pub enum PropertyStatus {
        #[default]
        Active => "active",
        Pending => "pending",
        Sold => "sold",
        Rented => "rented",
        OffMarket => "off-market",
    }
}

/// Postal location of a property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Address {
    /// Lowercased concatenation used for location text matching.
    pub fn search_text(&self) -> String {
        [
            self.street.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.zip_code.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }
}

/// Optional physical characteristics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_feet: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub garage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stories: Option<u32>,
}

/// A listing tracked by the brokerage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Unique identifier (e.g., "prop-1a2b3c4d")
    pub id: String,

    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Asking price, always positive
    pub price: f64,

    #[serde(rename = "type", default)]
    pub property_type: PropertyType,

    #[serde(default)]
    pub status: PropertyStatus,

    #[serde(default)]
    pub address: Address,

    #[serde(default)]
    pub details: PropertyDetails,

    #[serde(default)]
    pub features: Vec<String>,

    /// Opaque photo references; bytes live elsewhere
    #[serde(default)]
    pub photos: Vec<String>,

    /// Listing agent
    pub agent_id: String,

    pub listed_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Price divided by square footage, only when the footage is known and positive.
    pub fn price_per_sqft(&self) -> Option<f64> {
        match self.details.square_feet {
            Some(sqft) if sqft > 0.0 => Some(self.price / sqft),
            _ => None,
        }
    }
}

impl Entity for Property {
    const KIND: EntityKind = EntityKind::Property;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.listed_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<()> {
        require_text("property title", &self.title)?;
        require_text("property agent", &self.agent_id)?;
        require_positive("property price", self.price)?;
        if let Some(sqft) = self.details.square_feet {
            if !sqft.is_finite() || sqft < 0.0 {
                return Err(Error::Validation(format!(
                    "square footage must not be negative, got {}",
                    sqft
                )));
            }
        }
        Ok(())
    }
}

/// Input for creating a property.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(rename = "type", default)]
    pub property_type: PropertyType,
    #[serde(default)]
    pub status: Option<PropertyStatus>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub details: PropertyDetails,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub agent_id: String,
}

impl PropertyDraft {
    /// Build the property record, assigning identity and timestamps.
    pub fn into_property(self, id: String, now: DateTime<Utc>) -> Property {
        Property {
            id,
            title: self.title,
            description: self.description,
            price: self.price,
            property_type: self.property_type,
            status: self.status.unwrap_or_default(),
            address: self.address,
            details: self.details,
            features: self.features,
            photos: self.photos,
            agent_id: self.agent_id,
            listed_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a property. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(rename = "type", default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub details: Option<PropertyDetails>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub photos: Option<Vec<String>>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl PropertyPatch {
    pub fn apply(&self, property: &mut Property) {
        if let Some(ref title) = self.title {
            property.title = title.clone();
        }
        if let Some(ref description) = self.description {
            property.description = Some(description.clone());
        }
        if let Some(price) = self.price {
            property.price = price;
        }
        if let Some(property_type) = self.property_type {
            property.property_type = property_type;
        }
        if let Some(ref address) = self.address {
            property.address = address.clone();
        }
        if let Some(ref details) = self.details {
            property.details = details.clone();
        }
        if let Some(ref features) = self.features {
            property.features = features.clone();
        }
        if let Some(ref photos) = self.photos {
            property.photos = photos.clone();
        }
        if let Some(ref agent_id) = self.agent_id {
            property.agent_id = agent_id.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Property {
        PropertyDraft {
            title: "Harbor loft".to_string(),
            price: 900_000.0,
            agent_id: "agent-1".to_string(),
            ..Default::default()
        }
        .into_property("prop-0001".to_string(), Utc::now())
    }

    #[test]
    fn test_price_per_sqft_requires_positive_footage() {
        let mut property = sample();
        assert_eq!(property.price_per_sqft(), None);

        property.details.square_feet = Some(0.0);
        assert_eq!(property.price_per_sqft(), None);

        property.details.square_feet = Some(1500.0);
        assert_eq!(property.price_per_sqft(), Some(600.0));
    }

    #[test]
    fn test_validate_rejects_non_positive_price() {
        let mut property = sample();
        assert!(property.validate().is_ok());

        property.price = 0.0;
        assert!(matches!(property.validate(), Err(Error::Validation(_))));

        property.price = f64::NAN;
        assert!(property.validate().is_err());
    }

    #[test]
    fn test_draft_defaults_to_active_status() {
        let property = sample();
        assert_eq!(property.status, PropertyStatus::Active);
        assert_eq!(property.listed_at, property.updated_at);
    }

    #[test]
    fn test_patch_only_touches_supplied_fields() {
        let mut property = sample();
        let patch = PropertyPatch {
            price: Some(850_000.0),
            features: Some(vec!["pool".to_string()]),
            ..Default::default()
        };
        patch.apply(&mut property);
        assert_eq!(property.price, 850_000.0);
        assert_eq!(property.features, vec!["pool"]);
        assert_eq!(property.title, "Harbor loft");
    }

    #[test]
    fn test_address_search_text_is_lowercase() {
        let address = Address {
            street: "1 Main St".to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            ..Default::default()
        };
        assert_eq!(address.search_text(), "1 main st austin tx");
    }
}
