//! Core domain types for Flux Sales.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// PlaybookId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for archived playbook identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaybookId(pub Uuid);

impl PlaybookId {
    /// Generate a new time-sortable playbook identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for PlaybookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlaybookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PlaybookId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Organization
// ---------------------------------------------------------------------------

/// An organization record as returned by Apollo.io.
///
/// Apollo returns many more fields than this; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub id: Option<String>,
    pub name: Option<String>,
    pub website_url: Option<String>,
    pub primary_domain: Option<String>,
    pub industry: Option<String>,
    pub estimated_num_employees: Option<u64>,
    pub founded_year: Option<u32>,
    pub annual_revenue_printed: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub short_description: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub technology_names: Vec<String>,
    pub linkedin_url: Option<String>,
}

impl Organization {
    /// "City, State" from whichever parts are present.
    pub fn location(&self) -> Option<String> {
        join_present(&[self.city.as_deref(), self.state.as_deref()])
    }

    /// Full postal address, comma-joined.
    pub fn address(&self) -> Option<String> {
        join_present(&[
            self.street_address.as_deref(),
            self.city.as_deref(),
            self.state.as_deref(),
            self.postal_code.as_deref(),
            self.country.as_deref(),
        ])
    }
}

/// Read a list field, treating `null` as empty. Apollo sends `null` for
/// lists it has no data for.
pub fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn join_present(parts: &[Option<&str>]) -> Option<String> {
    let present: Vec<&str> = parts
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// A person at a target organization (from Apollo or a CSV import).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub seniority: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub departments: Vec<String>,
    pub linkedin_url: Option<String>,
    pub organization_name: Option<String>,
    /// Only set by CSV imports; Apollo reports industry on the organization.
    pub industry: Option<String>,
}

impl Contact {
    /// Best available name: `name`, else first + last, else "Unknown".
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }
        let full: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if full.is_empty() {
            "Unknown".into()
        } else {
            full.join(" ")
        }
    }
}

// ---------------------------------------------------------------------------
// FacilityDetails
// ---------------------------------------------------------------------------

/// What is known about the prospect facility, entered by a rep or inferred.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityDetails {
    pub name: String,
    pub website_url: Option<String>,
    pub location: Option<String>,
    pub facility_type: Option<String>,
    pub size: Option<String>,
    pub current_infrastructure: Option<String>,
    pub key_challenge: Option<String>,
    pub recent_events: Option<String>,
    pub budget_cycle: Option<String>,
    pub pain_points: Vec<String>,
}

impl FacilityDetails {
    /// Facility with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Fill every blank field from `other`; fields already set are kept.
    pub fn merge_from(&mut self, other: &FacilityDetails) {
        if self.name.trim().is_empty() {
            self.name = other.name.clone();
        }
        fill(&mut self.website_url, &other.website_url);
        fill(&mut self.location, &other.location);
        fill(&mut self.facility_type, &other.facility_type);
        fill(&mut self.size, &other.size);
        fill(&mut self.current_infrastructure, &other.current_infrastructure);
        fill(&mut self.key_challenge, &other.key_challenge);
        fill(&mut self.recent_events, &other.recent_events);
        fill(&mut self.budget_cycle, &other.budget_cycle);
        if self.pain_points.is_empty() {
            self.pain_points = other.pain_points.clone();
        }
    }
}

fn fill(slot: &mut Option<String>, from: &Option<String>) {
    let blank = slot.as_deref().is_none_or(|s| s.trim().is_empty());
    if blank {
        if let Some(v) = from.as_deref().filter(|v| !v.trim().is_empty()) {
            *slot = Some(v.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// The Flux Inc. product line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Product {
    #[serde(rename = "DICOM Printer 2")]
    DicomPrinter2,
    #[serde(rename = "Capacitor")]
    Capacitor,
    #[serde(rename = "TuPACS")]
    TuPacs,
    #[serde(rename = "Gobbler")]
    Gobbler,
}

impl Product {
    pub const ALL: [Product; 4] = [
        Product::DicomPrinter2,
        Product::Capacitor,
        Product::TuPacs,
        Product::Gobbler,
    ];

    /// Display name as used in sales material.
    pub fn name(self) -> &'static str {
        match self {
            Self::DicomPrinter2 => "DICOM Printer 2",
            Self::Capacitor => "Capacitor",
            Self::TuPacs => "TuPACS",
            Self::Gobbler => "Gobbler",
        }
    }

    /// The default pitch when none is chosen.
    pub fn defaults() -> Vec<Product> {
        vec![Self::DicomPrinter2, Self::Capacitor]
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Product {
    type Err = crate::error::FluxSalesError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dicom printer 2" | "dicom printer" | "printer" | "dicomprinter2" => {
                Ok(Self::DicomPrinter2)
            }
            "capacitor" | "dicom capacitor" => Ok(Self::Capacitor),
            "tupacs" => Ok(Self::TuPacs),
            "gobbler" | "dicom gobbler" => Ok(Self::Gobbler),
            other => Err(crate::error::FluxSalesError::validation(format!(
                "unknown product '{other}' (expected DICOM Printer 2, Capacitor, TuPACS or Gobbler)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playbook_id_roundtrip() {
        let id = PlaybookId::new();
        let parsed: PlaybookId = id.to_string().parse().expect("parse PlaybookId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn organization_ignores_unknown_fields() {
        let json = r#"{
            "id": "5f1",
            "name": "Valley Imaging",
            "city": "Fresno",
            "state": "California",
            "technology_names": ["Salesforce", "Epic"],
            "some_new_apollo_field": {"nested": true}
        }"#;
        let org: Organization = serde_json::from_str(json).expect("deserialize");
        assert_eq!(org.name.as_deref(), Some("Valley Imaging"));
        assert_eq!(org.location().as_deref(), Some("Fresno, California"));
        assert_eq!(org.technology_names.len(), 2);
    }

    #[test]
    fn null_lists_read_as_empty() {
        let org: Organization =
            serde_json::from_str(r#"{"id":"1","name":"X","technology_names":null}"#).unwrap();
        assert_eq!(org.name.as_deref(), Some("X"));
        assert!(org.technology_names.is_empty());

        let contact: Contact =
            serde_json::from_str(r#"{"id":"p1","first_name":"Ana","departments":null}"#).unwrap();
        assert_eq!(contact.first_name.as_deref(), Some("Ana"));
        assert!(contact.departments.is_empty());

        let contact: Contact =
            serde_json::from_str(r#"{"departments":["radiology"]}"#).unwrap();
        assert_eq!(contact.departments, vec!["radiology".to_string()]);
    }

    #[test]
    fn organization_address_skips_missing_parts() {
        let org = Organization {
            street_address: Some("12 Main St".into()),
            city: Some("Austin".into()),
            country: Some("United States".into()),
            ..Organization::default()
        };
        assert_eq!(
            org.address().as_deref(),
            Some("12 Main St, Austin, United States")
        );
        assert!(Organization::default().address().is_none());
    }

    #[test]
    fn contact_display_name_fallbacks() {
        let mut c = Contact {
            first_name: Some("Dana".into()),
            last_name: Some("Reyes".into()),
            ..Contact::default()
        };
        assert_eq!(c.display_name(), "Dana Reyes");
        c.name = Some("Dr. Dana Reyes".into());
        assert_eq!(c.display_name(), "Dr. Dana Reyes");
        assert_eq!(Contact::default().display_name(), "Unknown");
    }

    #[test]
    fn merge_fills_only_blank_fields() {
        let mut entered = FacilityDetails {
            name: "Lakeside Radiology".into(),
            location: Some("Tampa, FL".into()),
            size: Some("  ".into()),
            ..FacilityDetails::default()
        };
        let inferred = FacilityDetails {
            name: "Lakeside".into(),
            location: Some("Orlando, FL".into()),
            size: Some("3 locations, 40000 studies annually".into()),
            facility_type: Some("Imaging Center".into()),
            pain_points: vec!["legacy PACS".into()],
            ..FacilityDetails::default()
        };
        entered.merge_from(&inferred);
        assert_eq!(entered.name, "Lakeside Radiology");
        assert_eq!(entered.location.as_deref(), Some("Tampa, FL"));
        assert_eq!(
            entered.size.as_deref(),
            Some("3 locations, 40000 studies annually")
        );
        assert_eq!(entered.facility_type.as_deref(), Some("Imaging Center"));
        assert_eq!(entered.pain_points, vec!["legacy PACS"]);
    }

    #[test]
    fn product_parsing_accepts_aliases() {
        assert_eq!("printer".parse::<Product>().unwrap(), Product::DicomPrinter2);
        assert_eq!(
            "DICOM Capacitor".parse::<Product>().unwrap(),
            Product::Capacitor
        );
        assert_eq!("tuPACS".parse::<Product>().unwrap(), Product::TuPacs);
        assert_eq!("dicom gobbler".parse::<Product>().unwrap(), Product::Gobbler);
        assert!("fax machine".parse::<Product>().is_err());
    }

    #[test]
    fn product_serializes_as_display_name() {
        let json = serde_json::to_string(&Product::DicomPrinter2).expect("serialize");
        assert_eq!(json, "\"DICOM Printer 2\"");
        assert_eq!(Product::defaults().len(), 2);
    }
}
