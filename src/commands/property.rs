use super::{Deleted, Output, StatsResult, money, parse_labels, parse_optional, to_json};
use crate::cli::{PageArgs, PropertyFields, PropertyFilterArgs};
use crate::engine::{FilterSpec, PropertyFilter};
use crate::models::{
    Address, EntityKind, Property, PropertyDetails, PropertyDraft, PropertyPatch, PropertyStatus,
};
use crate::remote::RemoteBackend;
use crate::service::{Brokerage, Page};
use crate::Result;

impl Output for Property {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("{}: {} [{}]", self.id, self.title, self.status)];
        lines.push(format!(
            "  Type: {}  Price: {}",
            self.property_type,
            money(self.price)
        ));
        let address = [
            self.address.street.as_str(),
            self.address.city.as_str(),
            self.address.state.as_str(),
            self.address.zip_code.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
        if !address.is_empty() {
            lines.push(format!("  Address: {}", address));
        }
        lines.push(format!("  Agent: {}", self.agent_id));

        let details = &self.details;
        let mut facts = Vec::new();
        if let Some(bedrooms) = details.bedrooms {
            facts.push(format!("{} bd", bedrooms));
        }
        if let Some(bathrooms) = details.bathrooms {
            facts.push(format!("{} ba", bathrooms));
        }
        if let Some(square_feet) = details.square_feet {
            facts.push(format!("{} sqft", square_feet));
        }
        if let Some(per_sqft) = self.price_per_sqft() {
            facts.push(format!("{}/sqft", money(per_sqft)));
        }
        if let Some(year) = details.year_built {
            facts.push(format!("built {}", year));
        }
        if !facts.is_empty() {
            lines.push(format!("  Details: {}", facts.join(", ")));
        }
        if !self.features.is_empty() {
            lines.push(format!("  Features: {}", self.features.join(", ")));
        }
        if let Some(ref description) = self.description {
            lines.push(format!("  {}", description));
        }
        lines.join("\n")
    }
}

impl Output for Page<Property> {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return format!("No properties found (page {} of {}).", self.page, self.total_pages);
        }
        let mut lines = vec![format!(
            "{} properties (page {} of {}):",
            self.total, self.page, self.total_pages
        )];
        for property in &self.items {
            lines.push(format!(
                "  {}  [{}] {}  {}  {}",
                property.id,
                property.status,
                property.title,
                money(property.price),
                property.address.city
            ));
        }
        lines.join("\n")
    }
}

/// Translate listing filter flags into a filter spec.
pub fn property_filter(args: &PropertyFilterArgs) -> Result<FilterSpec> {
    let filter = PropertyFilter {
        statuses: parse_labels(&args.status)?,
        types: parse_labels(&args.property_type)?,
        min_price: args.min_price,
        max_price: args.max_price,
        city: args.city.clone(),
        state: args.state.clone(),
        min_bedrooms: args.min_bedrooms,
        min_bathrooms: args.min_bathrooms,
        agent_id: args.agent.clone(),
        search: args.search.clone(),
    };
    Ok(filter.to_spec())
}

fn merged_address(base: &Address, fields: &PropertyFields) -> Address {
    let mut address = base.clone();
    if let Some(ref street) = fields.street {
        address.street = street.clone();
    }
    if let Some(ref city) = fields.city {
        address.city = city.clone();
    }
    if let Some(ref state) = fields.state {
        address.state = state.clone();
    }
    if let Some(ref zip) = fields.zip {
        address.zip_code = zip.clone();
    }
    address
}

fn merged_details(base: &PropertyDetails, fields: &PropertyFields) -> PropertyDetails {
    let mut details = base.clone();
    if fields.bedrooms.is_some() {
        details.bedrooms = fields.bedrooms;
    }
    if fields.bathrooms.is_some() {
        details.bathrooms = fields.bathrooms;
    }
    if fields.square_feet.is_some() {
        details.square_feet = fields.square_feet;
    }
    if fields.year_built.is_some() {
        details.year_built = fields.year_built;
    }
    details
}

fn touches_address(fields: &PropertyFields) -> bool {
    fields.street.is_some() || fields.city.is_some() || fields.state.is_some() || fields.zip.is_some()
}

fn touches_details(fields: &PropertyFields) -> bool {
    fields.bedrooms.is_some()
        || fields.bathrooms.is_some()
        || fields.square_feet.is_some()
        || fields.year_built.is_some()
}

/// Create a listing.
pub fn property_create<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    title: &str,
    price: f64,
    agent: &str,
    status: Option<&str>,
    fields: &PropertyFields,
) -> Result<Property> {
    let draft = PropertyDraft {
        title: title.to_string(),
        description: fields.description.clone(),
        price,
        property_type: parse_optional(fields.property_type.as_deref())?.unwrap_or_default(),
        status: parse_optional(status)?,
        address: merged_address(&Address::default(), fields),
        details: merged_details(&PropertyDetails::default(), fields),
        features: fields.features.clone(),
        photos: fields.photos.clone(),
        agent_id: agent.to_string(),
    };
    brokerage.create_property(draft)
}

pub fn property_list<B: RemoteBackend>(
    brokerage: &Brokerage<B>,
    filter: &PropertyFilterArgs,
    page: &PageArgs,
) -> Result<Page<Property>> {
    brokerage.list_properties(&property_filter(filter)?, page.page, page.limit)
}

pub fn property_show<B: RemoteBackend>(brokerage: &Brokerage<B>, id: &str) -> Result<Property> {
    brokerage.get_property(id)
}

/// Apply the given flags as a patch. Address and detail flags merge into
/// the existing values.
pub fn property_update<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    title: Option<&str>,
    price: Option<f64>,
    agent: Option<&str>,
    fields: &PropertyFields,
) -> Result<Property> {
    let current = brokerage.get_property(id)?;
    let patch = PropertyPatch {
        title: title.map(str::to_string),
        description: fields.description.clone(),
        price,
        property_type: parse_optional(fields.property_type.as_deref())?,
        address: touches_address(fields).then(|| merged_address(&current.address, fields)),
        details: touches_details(fields).then(|| merged_details(&current.details, fields)),
        features: (!fields.features.is_empty()).then(|| fields.features.clone()),
        photos: (!fields.photos.is_empty()).then(|| fields.photos.clone()),
        agent_id: agent.map(str::to_string),
    };
    brokerage.update_property(id, &patch)
}

pub fn property_status<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    status: &str,
) -> Result<Property> {
    let status: PropertyStatus = status.parse()?;
    brokerage.set_property_status(id, status)
}

pub fn property_delete<B: RemoteBackend>(brokerage: &mut Brokerage<B>, id: &str) -> Result<Deleted> {
    let property = brokerage.delete_property(id)?;
    Ok(Deleted {
        entity: EntityKind::Property,
        id: property.id,
        deleted: true,
    })
}

pub fn property_stats<B: RemoteBackend>(
    brokerage: &Brokerage<B>,
    filter: &PropertyFilterArgs,
) -> Result<StatsResult> {
    Ok(StatsResult {
        entity: EntityKind::Property,
        stats: brokerage.property_stats(&property_filter(filter)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::remote::MemoryBackend;
    use crate::service::ServiceSettings;
    use crate::test_utils::test_clock;

    fn brokerage() -> Brokerage<MemoryBackend> {
        Brokerage::new(MemoryBackend::new(), test_clock(), ServiceSettings::default())
    }

    fn fields_in(city: &str) -> PropertyFields {
        PropertyFields {
            city: Some(city.to_string()),
            bedrooms: Some(3),
            square_feet: Some(1500.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_parses_labels() {
        let mut brokerage = brokerage();
        let fields = PropertyFields {
            property_type: Some("Condo".to_string()),
            ..fields_in("Austin")
        };
        let property =
            property_create(&mut brokerage, "Loft", 450_000.0, "agent-1", Some("pending"), &fields)
                .unwrap();
        assert_eq!(property.property_type.as_str(), "condo");
        assert_eq!(property.status, PropertyStatus::Pending);
        assert_eq!(property.address.city, "Austin");
        assert_eq!(property.price_per_sqft(), Some(300.0));
    }

    #[test]
    fn test_create_rejects_unknown_type() {
        let mut brokerage = brokerage();
        let fields = PropertyFields {
            property_type: Some("castle".to_string()),
            ..Default::default()
        };
        let err = property_create(&mut brokerage, "Keep", 1.0, "agent-1", None, &fields)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(brokerage.properties().is_empty());
    }

    #[test]
    fn test_update_merges_address() {
        let mut brokerage = brokerage();
        let created = property_create(
            &mut brokerage,
            "Loft",
            450_000.0,
            "agent-1",
            None,
            &fields_in("Austin"),
        )
        .unwrap();

        let fields = PropertyFields {
            zip: Some("78701".to_string()),
            ..Default::default()
        };
        let updated =
            property_update(&mut brokerage, &created.id, None, Some(475_000.0), None, &fields)
                .unwrap();
        assert_eq!(updated.address.city, "Austin");
        assert_eq!(updated.address.zip_code, "78701");
        assert_eq!(updated.price, 475_000.0);
        assert_eq!(updated.details.bedrooms, Some(3));
        assert_eq!(updated.title, "Loft");
    }

    #[test]
    fn test_list_filters_by_city_and_pages() {
        let mut brokerage = brokerage();
        for (title, city) in [("A", "Austin"), ("B", "Dallas"), ("C", "Austin")] {
            property_create(&mut brokerage, title, 100_000.0, "agent-1", None, &fields_in(city))
                .unwrap();
        }
        let filter = PropertyFilterArgs {
            city: Some("austin".to_string()),
            ..Default::default()
        };
        let page = property_list(&brokerage, &filter, &PageArgs { page: 1, limit: Some(1) })
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert!(page.to_human().contains("2 properties (page 1 of 2)"));
    }

    #[test]
    fn test_status_then_stats() {
        let mut brokerage = brokerage();
        let property = property_create(
            &mut brokerage,
            "Loft",
            200_000.0,
            "agent-1",
            None,
            &PropertyFields::default(),
        )
        .unwrap();
        property_status(&mut brokerage, &property.id, "sold").unwrap();

        let stats = property_stats(&brokerage, &PropertyFilterArgs::default()).unwrap();
        assert_eq!(stats.stats.total, 1);
        assert_eq!(stats.stats.status_count("sold"), 1);
        assert!(property_status(&mut brokerage, &property.id, "demolished").is_err());
    }

    #[test]
    fn test_delete_reports_id() {
        let mut brokerage = brokerage();
        let property = property_create(
            &mut brokerage,
            "Loft",
            200_000.0,
            "agent-1",
            None,
            &PropertyFields::default(),
        )
        .unwrap();
        let deleted = property_delete(&mut brokerage, &property.id).unwrap();
        assert_eq!(deleted.id, property.id);
        assert!(matches!(
            property_show(&brokerage, &property.id),
            Err(Error::NotFound(_))
        ));
    }
}
