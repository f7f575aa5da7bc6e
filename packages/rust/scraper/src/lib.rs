//! Facility website intelligence.
//!
//! This crate provides:
//! - [`engine`]: concurrent fetcher for a site's well-known pages
//! - [`extract`]: per-page text, links, job titles, emails and term hits
//! - [`analysis`]: site-level heuristics (equipment, personnel, vendors, volume)
//! - [`terms`]: the healthcare IT vocabularies behind the heuristics

pub mod analysis;
pub mod engine;
pub mod extract;
pub mod terms;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub use analysis::{
    Accreditation, BudgetCycle, Equipment, ImplementationDate, Indicator, ItEnvironment,
    KeyPerson, RefreshIndicator, TechnologyStack,
};
pub use engine::{WebsiteScraper, analyze, base_url, candidate_urls, clean_url, is_ssrf_target};
pub use extract::{PageData, PageLink, TermHit, extract_links, extract_page};

/// Everything learned from one facility website scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebsiteIntel {
    pub url: String,
    pub base_url: String,
    pub domain: String,
    pub pages_scanned: usize,
    pub scanned_at: Option<DateTime<Utc>>,
    pub page_title: String,
    pub meta_description: String,
    pub pages: Vec<PageData>,

    pub key_personnel: Vec<KeyPerson>,
    pub technology_stack: TechnologyStack,
    pub growth_indicators: Vec<Indicator>,
    pub pain_points: Vec<Indicator>,
    pub term_counts: BTreeMap<String, BTreeMap<String, usize>>,
    pub emails_found: Vec<String>,
    pub job_openings: Vec<String>,
    pub location_count: usize,
    pub equipment: Vec<Equipment>,
    pub annual_study_volume: u64,
    pub implementation_dates: Vec<ImplementationDate>,
    pub refresh_cycle: Vec<RefreshIndicator>,
    pub budget_cycle: BudgetCycle,
    pub accreditations: Vec<Accreditation>,

    pub radiology_mentions: usize,
    pub pacs_mentions: usize,
    pub dicom_mentions: usize,
    pub workflow_mentions: usize,
    pub modernization_mentions: usize,

    pub has_integration_pain_points: bool,
    pub has_workflow_pain_points: bool,
    pub has_legacy_system_pain_points: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebsiteIntel {
    /// A result with only the addressing fields filled in.
    pub fn empty(url: &str, base: &Url) -> Self {
        Self {
            url: url.to_string(),
            base_url: base.as_str().trim_end_matches('/').to_string(),
            domain: base.host_str().unwrap_or_default().to_string(),
            ..Self::default()
        }
    }

    /// Whether the scan produced anything to analyze.
    pub fn is_usable(&self) -> bool {
        self.error.is_none() && self.pages_scanned > 0
    }

    /// Distinct URLs of the pages that loaded.
    pub fn page_urls(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.url.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_intel_carries_addressing() {
        let base = Url::parse("https://valleyimaging.com/").unwrap();
        let intel = WebsiteIntel::empty("https://valleyimaging.com/about", &base);
        assert_eq!(intel.base_url, "https://valleyimaging.com");
        assert_eq!(intel.domain, "valleyimaging.com");
        assert!(!intel.is_usable());
    }

    #[test]
    fn analyze_fills_metrics_and_drops_html() {
        let url = Url::parse("https://valleyimaging.com/").unwrap();
        let page = extract_page(
            "<html><body><p>Our radiology group reads every MRI and CT scan on a legacy PACS.</p>\
             <p>The outdated workflow slows down referring physician access.</p></body></html>",
            &url,
        );
        let mut intel = WebsiteIntel::empty(url.as_str(), &url);
        analyze(&mut intel, vec![page]);

        assert_eq!(intel.pages_scanned, 1);
        assert!(intel.is_usable());
        assert_eq!(intel.pacs_mentions, 1);
        assert!(intel.radiology_mentions >= 3);
        assert!(intel.workflow_mentions >= 2);
        assert!(intel.has_legacy_system_pain_points);
        assert!(intel.has_workflow_pain_points);
        assert!(!intel.has_integration_pain_points);
        assert_eq!(intel.location_count, 1);
        assert!(intel.pages[0].html.is_empty());
        assert_eq!(intel.page_urls(), vec!["https://valleyimaging.com/"]);
    }

    #[test]
    fn serialized_intel_omits_missing_error() {
        let base = Url::parse("https://x.org/").unwrap();
        let json = serde_json::to_value(WebsiteIntel::empty("https://x.org", &base)).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["pages_scanned"], 0);
    }
}
