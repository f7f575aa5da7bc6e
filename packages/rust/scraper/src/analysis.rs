//! Site-level heuristics over the extracted pages.
//!
//! Every function here is pure: pages in, findings out. Content is matched
//! lowercased with [`crate::terms::count_term`].

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};

use crate::extract::{PageData, class_mentions, element_text};
use crate::terms::{
    ACCREDITATION_ORGS, EMR_SYSTEMS, EQUIPMENT_TYPES, EQUIPMENT_VENDORS, FACILITY_TYPES,
    GROWTH_TERMS, IMPLEMENTATION_TECH, IMPLEMENTATION_VERBS, INFRASTRUCTURE, LEADERSHIP_TITLES,
    MODALITIES, PACS_VENDORS, PAIN_TERMS, REFRESH_TECH, REFRESH_TERMS, REFRESH_TIME, RIS_VENDORS,
    TERM_CATEGORIES, contains_any, contains_term, count_term, split_sentences,
};

/// Upper bound on a location count read from page text.
const MAX_LOCATIONS: usize = 1_000;

static SECTIONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div, section, article").expect("valid selector"));
static LOCATION_HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4, h5, address").expect("valid selector"));
static LIST_ITEMS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").expect("valid selector"));
static NAME_ELEMENTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4, h5, strong").expect("valid selector"));

static LOCATION_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s+(?:locations|centers|facilities|offices|clinics)")
        .expect("valid regex")
});
static TESLA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)\s*tesla").expect("valid regex"));
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(20\d\d)\b").expect("valid regex"));
static CYCLE_YEARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)[\s-]*year").expect("valid regex"));

static VOLUME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+(?:,\d+)?)\s+(?:studies|exams|scans|images|imaging procedures|procedures|patients)\s+(?:per|a|each)\s+(?:year|annually)",
        r"(?i)annual\s+volume\s+of\s+(\d+(?:,\d+)?)",
        r"(?i)performs?\s+(?:over|about|approximately)?\s*(\d+(?:,\d+)?)\s+(?:studies|exams|procedures)",
        r"(?i)serving\s+(?:over|about|approximately)?\s*(\d+(?:,\d+)?)\s+patients",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static AGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d+)[\s-]*year[\s-]*old",
        r"installed (\d+) years ago",
        r"purchased (\d+) years ago",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static FISCAL_YEAR: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)fiscal\s+year\s+(?:begins|starts|commences)\s+(?:on|in)\s+(\w+)",
        r"(?i)(?:fy|fiscal year|budget year)\s+(?:begins|starts|runs)\s+(?:from\s+)?(\w+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});
static PLANNING_MONTHS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)budget\s+(?:requests|planning|process)\s+(?:begins|starts)\s+(\d+)\s+months")
        .expect("valid regex")
});
static CAPITAL_DEADLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)capital\s+(?:requests|expenditures|planning)\s+(?:due|submitted|completed)\s+by\s+(\w+)",
    )
    .expect("valid regex")
});

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

/// A named person with a leadership-sounding title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPerson {
    pub name: String,
    pub title: String,
    pub url: String,
}

/// An imaging modality mentioned on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(rename = "type")]
    pub kind: String,
    pub vendor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<String>,
    pub source: String,
}

/// IT environment traits; fields stay `None` when nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staffing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_focus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_focus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_constraints: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnologyStack {
    pub pacs_vendor: String,
    pub ris_vendor: String,
    pub emr_system: String,
    pub infrastructure: Vec<String>,
    pub modalities: Vec<String>,
    pub it_environment: ItEnvironment,
}

/// A sentence that matched a growth or pain term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub indicator: String,
    pub context: String,
    pub page: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationDate {
    pub technology: String,
    pub year: u16,
    pub context: String,
    pub page: String,
}

/// Evidence about how often the facility replaces its systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefreshIndicator {
    Stated {
        cycle_years: Option<u32>,
        context: String,
        page: String,
    },
    Inferred {
        inferred_cycle: String,
        source: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetCycle {
    pub fiscal_year_start: String,
    pub planning_timeframe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accreditation {
    pub organization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    pub context: String,
    pub page: String,
}

// ---------------------------------------------------------------------------
// Content helpers
// ---------------------------------------------------------------------------

/// Lowercased content of every page, space-joined.
pub fn combined_content(pages: &[PageData]) -> String {
    pages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Per category, term → count over `content`. Zero counts are omitted.
pub fn term_counts(content: &str) -> BTreeMap<String, BTreeMap<String, usize>> {
    TERM_CATEGORIES
        .iter()
        .map(|(category, terms)| {
            let counts = terms
                .iter()
                .filter_map(|term| {
                    let n = count_term(content, term);
                    (n > 0).then(|| ((*term).to_string(), n))
                })
                .collect();
            ((*category).to_string(), counts)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// Number of facility locations.
///
/// Location pages are parsed for address blocks first; otherwise the text
/// is searched for phrases like "12 locations". Defaults to 1, and
/// never exceeds `MAX_LOCATIONS`.
pub fn location_count(pages: &[PageData]) -> usize {
    let mut names = HashSet::new();

    for page in pages.iter().filter(|p| {
        let url = p.url.to_lowercase();
        ["location", "centers", "find-us"]
            .iter()
            .any(|t| url.contains(t))
    }) {
        let doc = Html::parse_document(&page.html);

        for section in doc.select(&SECTIONS) {
            if !class_mentions(&section, &["location", "center", "address"]) {
                continue;
            }
            for heading in section.select(&LOCATION_HEADINGS) {
                let text = element_text(&heading);
                if text.chars().count() > 10 {
                    names.insert(text);
                }
            }
        }

        for item in doc.select(&LIST_ITEMS) {
            let text = element_text(&item);
            let lowered = text.to_lowercase();
            let has_street = ["suite", "street", "drive", "lane", "road", "ave", "blvd"]
                .iter()
                .any(|m| lowered.contains(m));
            if has_street && text.chars().count() > 10 {
                names.insert(text);
            }
        }
    }

    if !names.is_empty() {
        return names.len().min(MAX_LOCATIONS);
    }

    let content = combined_content(pages);
    LOCATION_COUNT
        .captures_iter(&content)
        .filter_map(|c| c.get(1)?.as_str().parse::<usize>().ok())
        .max()
        .unwrap_or(1)
        .clamp(1, MAX_LOCATIONS)
}

// ---------------------------------------------------------------------------
// Equipment
// ---------------------------------------------------------------------------

/// One entry per page and equipment type, from the first sentence naming it.
pub fn equipment(pages: &[PageData]) -> Vec<Equipment> {
    let mut found = Vec::new();

    for page in pages {
        let content = page.content.to_lowercase();
        let sentences = split_sentences(&content);

        for (kind, terms) in EQUIPMENT_TYPES {
            let hit = terms.iter().find_map(|term| {
                sentences
                    .iter()
                    .find(|s| contains_term(s, term))
                    .copied()
            });
            let Some(sentence) = hit else {
                continue;
            };

            let vendor = EQUIPMENT_VENDORS
                .iter()
                .find(|(term, _)| contains_term(sentence, term))
                .map(|(_, name)| (*name).to_string())
                .unwrap_or_else(|| "Unknown".into());

            let model_info = if sentence.contains("tesla") && contains_term(sentence, "mri") {
                TESLA
                    .captures(sentence)
                    .and_then(|c| c.get(1))
                    .map(|m| format!("{}T", m.as_str()))
            } else {
                None
            };

            found.push(Equipment {
                kind: (*kind).to_string(),
                vendor,
                model_info,
                source: page.url.clone(),
            });
        }
    }

    found
}

// ---------------------------------------------------------------------------
// Personnel
// ---------------------------------------------------------------------------

/// Names followed closely by a leadership title on about/team/staff pages.
pub fn key_personnel(pages: &[PageData]) -> Vec<KeyPerson> {
    let mut people = Vec::new();
    let mut seen = HashSet::new();

    for page in pages.iter().filter(|p| {
        let url = p.url.to_lowercase();
        ["/about", "/team", "/staff", "/leadership", "/physician"]
            .iter()
            .any(|t| url.contains(t))
    }) {
        let doc = Html::parse_document(&page.html);

        for section in doc.select(&SECTIONS) {
            if !class_mentions(
                &section,
                &["team", "staff", "leadership", "management", "about", "physician"],
            ) {
                continue;
            }

            for name_el in section.select(&NAME_ELEMENTS) {
                let name = element_text(&name_el);
                if name.is_empty() {
                    continue;
                }
                let Some(title) = title_after(&name_el) else {
                    continue;
                };
                if seen.insert((name.clone(), title.clone())) {
                    people.push(KeyPerson {
                        name,
                        title,
                        url: page.url.clone(),
                    });
                }
            }
        }
    }

    people
}

/// The first of the next three siblings whose text reads like a title.
fn title_after(el: &ElementRef<'_>) -> Option<String> {
    el.next_siblings()
        .take(3)
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some(text.split_whitespace().collect::<Vec<_>>().join(" ")),
            Node::Element(_) => ElementRef::wrap(node).map(|e| element_text(&e)),
            _ => None,
        })
        .find(|text| {
            let lowered = text.to_lowercase();
            !text.is_empty() && LEADERSHIP_TITLES.iter().any(|t| lowered.contains(t))
        })
}

// ---------------------------------------------------------------------------
// Technology stack
// ---------------------------------------------------------------------------

pub fn technology_stack(content: &str) -> TechnologyStack {
    TechnologyStack {
        pacs_vendor: top_vendor(content, PACS_VENDORS),
        ris_vendor: top_vendor(content, RIS_VENDORS),
        emr_system: top_vendor(content, EMR_SYSTEMS),
        infrastructure: labels_present(content, INFRASTRUCTURE),
        modalities: modalities(content),
        it_environment: it_environment(content),
    }
}

/// Vendor with the most term hits; ties go to the earlier entry.
fn top_vendor(content: &str, vendors: &[(&str, &[&str])]) -> String {
    let mut best: Option<(&str, usize)> = None;
    for (vendor, terms) in vendors {
        let count: usize = terms.iter().map(|t| count_term(content, t)).sum();
        if count > 0 && best.is_none_or(|(_, n)| count > n) {
            best = Some((vendor, count));
        }
    }
    best.map_or_else(|| "Unknown".to_string(), |(v, _)| v.to_string())
}

fn labels_present(content: &str, table: &[(&str, &[&str])]) -> Vec<String> {
    table
        .iter()
        .filter(|(_, terms)| contains_any(content, terms))
        .map(|(label, _)| (*label).to_string())
        .collect()
}

pub fn modalities(content: &str) -> Vec<String> {
    labels_present(content, MODALITIES)
}

fn it_environment(content: &str) -> ItEnvironment {
    let high = |terms: &[&str]| contains_any(content, terms).then(|| "High".to_string());

    let staffing = if contains_any(
        content,
        &["it staff shortage", "limited it resources", "outsourced it"],
    ) {
        Some("Limited IT resources".to_string())
    } else if contains_any(content, &["in-house it", "it department", "technology team"]) {
        Some("In-house IT department".to_string())
    } else {
        None
    };

    ItEnvironment {
        staffing,
        security_focus: high(&["hipaa compliance", "data security", "cybersecurity"]),
        integration_focus: high(&["interoperability", "integration", "connected systems"]),
        budget_constraints: high(&["budget constraints", "cost-effective", "affordable"]),
    }
}

// ---------------------------------------------------------------------------
// Sentence indicators
// ---------------------------------------------------------------------------

fn sentence_hits(pages: &[PageData], terms: &[&str]) -> Vec<Indicator> {
    let mut hits = Vec::new();
    for page in pages {
        let content = page.content.to_lowercase();
        let sentences = split_sentences(&content);
        for term in terms {
            for sentence in sentences.iter().filter(|s| contains_term(s, term)) {
                hits.push(Indicator {
                    indicator: (*term).to_string(),
                    context: (*sentence).to_string(),
                    page: page.url.clone(),
                });
            }
        }
    }
    hits
}

pub fn growth_indicators(pages: &[PageData]) -> Vec<Indicator> {
    sentence_hits(pages, GROWTH_TERMS)
}

pub fn pain_points(pages: &[PageData]) -> Vec<Indicator> {
    sentence_hits(pages, PAIN_TERMS)
}

// ---------------------------------------------------------------------------
// Study volume
// ---------------------------------------------------------------------------

/// Facility type label used by the volume estimate.
pub fn facility_type(content: &str) -> Option<&'static str> {
    FACILITY_TYPES
        .iter()
        .find(|(_, indicators)| contains_any(content, indicators))
        .map(|(name, _)| *name)
}

/// Stated annual study volume, or an estimate from type, locations and modalities.
pub fn annual_study_volume(pages: &[PageData], locations: usize) -> u64 {
    let content = combined_content(pages);

    for pattern in VOLUME_PATTERNS.iter() {
        let stated = pattern
            .captures_iter(&content)
            .filter_map(|c| c.get(1)?.as_str().replace(',', "").parse::<u64>().ok())
            .max();
        if let Some(volume) = stated {
            return volume;
        }
    }

    let base: u64 = match facility_type(&content) {
        Some("hospital") => 50_000,
        Some("imaging_center") => 20_000,
        Some("physician_practice") => 5_000,
        Some("outpatient") => 15_000,
        _ => 10_000,
    };
    let mut estimate = base.saturating_mul(locations.max(1) as u64);
    if modalities(&content).len() > 4 {
        estimate = estimate.saturating_mul(3) / 2;
    }
    estimate
}

// ---------------------------------------------------------------------------
// Dates, budget, refresh, accreditation
// ---------------------------------------------------------------------------

pub fn implementation_dates(pages: &[PageData]) -> Vec<ImplementationDate> {
    let mut dates = Vec::new();
    for page in pages {
        let content = page.content.to_lowercase();
        for sentence in split_sentences(&content) {
            if !contains_any(sentence, IMPLEMENTATION_VERBS) {
                continue;
            }
            let Some(tech) = IMPLEMENTATION_TECH
                .iter()
                .find(|t| contains_term(sentence, t))
            else {
                continue;
            };
            let Some(year) = YEAR
                .captures(sentence)
                .and_then(|c| c.get(1)?.as_str().parse::<u16>().ok())
            else {
                continue;
            };
            dates.push(ImplementationDate {
                technology: tech.to_uppercase(),
                year,
                context: sentence.to_string(),
                page: page.url.clone(),
            });
        }
    }
    dates
}

/// Fiscal-year start and planning lead time, stated or inferred from facility type.
pub fn budget_cycle(pages: &[PageData]) -> BudgetCycle {
    let content = combined_content(pages);

    let stated_start = FISCAL_YEAR
        .iter()
        .find_map(|re| re.captures(&content)?.get(1).map(|m| capitalize(m.as_str())));

    let stated_planning = PLANNING_MONTHS
        .captures(&content)
        .and_then(|c| c.get(1))
        .map(|m| format!("{} months before fiscal year start", m.as_str()))
        .or_else(|| {
            CAPITAL_DEADLINE
                .captures(&content)
                .and_then(|c| c.get(1))
                .map(|m| format!("capital requests due by {}", capitalize(m.as_str())))
        });

    let kind = ["hospital", "imaging center", "academic", "govt"]
        .into_iter()
        .find(|t| content.contains(t));

    let (default_start, default_planning) = match kind {
        Some("hospital" | "academic") => ("July", "3-4 months before fiscal year start"),
        Some("govt") => ("October", "6-9 months before fiscal year start"),
        _ => ("January", "2-3 months before fiscal year start"),
    };

    BudgetCycle {
        fiscal_year_start: stated_start.unwrap_or_else(|| default_start.to_string()),
        planning_timeframe: stated_planning.unwrap_or_else(|| default_planning.to_string()),
    }
}

pub fn refresh_cycle(pages: &[PageData]) -> Vec<RefreshIndicator> {
    let mut indicators = Vec::new();

    for page in pages {
        let content = page.content.to_lowercase();
        for sentence in split_sentences(&content) {
            if contains_any(sentence, REFRESH_TERMS)
                && contains_any(sentence, REFRESH_TECH)
                && REFRESH_TIME.iter().any(|t| sentence.contains(t))
            {
                indicators.push(RefreshIndicator::Stated {
                    cycle_years: CYCLE_YEARS
                        .captures(sentence)
                        .and_then(|c| c.get(1)?.as_str().parse().ok()),
                    context: sentence.to_string(),
                    page: page.url.clone(),
                });
            }
        }
    }
    if !indicators.is_empty() {
        return indicators;
    }

    for page in pages {
        let content = page.content.to_lowercase();
        for pattern in AGE_PATTERNS.iter() {
            let ages: Vec<u32> = pattern
                .captures_iter(&content)
                .filter_map(|c| c.get(1)?.as_str().parse().ok())
                .collect();
            if !ages.is_empty() {
                let avg = ages.iter().map(|&a| f64::from(a)).sum::<f64>() / ages.len() as f64;
                return vec![RefreshIndicator::Inferred {
                    inferred_cycle: format!(
                        "Approximately {avg:.1} years based on current equipment age mentions"
                    ),
                    source: "Age mentions in content".into(),
                }];
            }
        }
    }

    vec![RefreshIndicator::Inferred {
        inferred_cycle: "Typical 5-7 year cycle for healthcare imaging technology".into(),
        source: "Industry standard".into(),
    }]
}

pub fn accreditations(pages: &[PageData]) -> Vec<Accreditation> {
    let mut found = Vec::new();
    for page in pages {
        let content = page.content.to_lowercase();
        let sentences = split_sentences(&content);
        for org in ACCREDITATION_ORGS {
            let needle = org.to_lowercase();
            for sentence in sentences.iter().filter(|s| contains_term(s, &needle)) {
                found.push(Accreditation {
                    organization: (*org).to_string(),
                    year: YEAR
                        .captures(sentence)
                        .and_then(|c| c.get(1)?.as_str().parse().ok()),
                    context: (*sentence).to_string(),
                    page: page.url.clone(),
                });
            }
        }
    }
    found
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, content: &str) -> PageData {
        PageData {
            url: url.into(),
            content: content.into(),
            ..PageData::default()
        }
    }

    fn page_with_html(url: &str, html: &str) -> PageData {
        PageData {
            url: url.into(),
            html: html.into(),
            ..PageData::default()
        }
    }

    #[test]
    fn location_count_from_address_blocks() {
        let html = r#"<html><body>
            <div class="location-list">
                <h3>Downtown Imaging Center</h3>
                <h3>Northside Imaging Center</h3>
                <h3>Short</h3>
            </div>
            <ul><li>1200 Main Street, Suite 4</li></ul>
        </body></html>"#;
        let pages = vec![page_with_html("https://x.org/locations", html)];
        assert_eq!(location_count(&pages), 3);
    }

    #[test]
    fn location_count_from_text_then_default() {
        let pages = vec![page(
            "https://x.org/",
            "We operate 4 centers and serve patients at 12 clinics statewide.",
        )];
        assert_eq!(location_count(&pages), 12);
        assert_eq!(location_count(&[page("https://x.org/", "One site.")]), 1);
    }

    #[test]
    fn absurd_location_counts_are_capped() {
        let pages = vec![page(
            "https://x.org/",
            "Our network spans 999999999999999 locations nationwide.",
        )];
        let locations = location_count(&pages);
        assert_eq!(locations, MAX_LOCATIONS);
        assert_eq!(annual_study_volume(&pages, locations), 10_000 * MAX_LOCATIONS as u64);
        assert_eq!(annual_study_volume(&pages, usize::MAX), u64::MAX);
    }

    #[test]
    fn equipment_with_vendor_and_tesla() {
        let pages = vec![page(
            "https://x.org/equipment",
            "Our new Siemens 3 tesla MRI opened this spring. We also offer ultrasound and doppler studies.",
        )];
        let eq = equipment(&pages);
        let mri = eq.iter().find(|e| e.kind == "MRI").expect("mri entry");
        assert_eq!(mri.vendor, "Siemens");
        assert_eq!(mri.model_info.as_deref(), Some("3T"));
        let us: Vec<_> = eq.iter().filter(|e| e.kind == "Ultrasound").collect();
        assert_eq!(us.len(), 1);
        assert_eq!(us[0].vendor, "Unknown");
    }

    #[test]
    fn personnel_from_team_section() {
        let html = r#"<html><body>
            <section class="leadership-team">
                <h3>Dr. Maria Chen</h3><p>Medical Director of Radiology</p>
                <h3>James Park</h3><p>Loves hiking</p>
                <strong>Alex Kim</strong> <span>Chief Information Officer</span>
            </section>
        </body></html>"#;
        let pages = vec![page_with_html("https://x.org/leadership", html)];
        let people = key_personnel(&pages);
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].name, "Dr. Maria Chen");
        assert_eq!(people[0].title, "Medical Director of Radiology");
        assert_eq!(people[1].name, "Alex Kim");
        assert_eq!(people[1].title, "Chief Information Officer");
    }

    #[test]
    fn personnel_ignores_non_team_urls() {
        let html = r#"<div class="team"><h3>Sam</h3><p>CEO</p></div>"#;
        assert!(key_personnel(&[page_with_html("https://x.org/services", html)]).is_empty());
    }

    #[test]
    fn technology_stack_picks_top_vendor() {
        let content = "we run sectra pacs. sectra support and sectra workstations are great. agfa impax was retired. \
                       epic is our ehr and we use vmware with azure cloud backup. \
                       ct scan, mri, ultrasound, mammography, pet/ct and fluoroscopy available. \
                       hipaa compliance matters.";
        let stack = technology_stack(content);
        assert_eq!(stack.pacs_vendor, "Sectra");
        assert_eq!(stack.emr_system, "Epic");
        assert_eq!(stack.ris_vendor, "Epic Radiant");
        assert!(stack.infrastructure.contains(&"Cloud-based".to_string()));
        assert!(stack.infrastructure.contains(&"Virtualized Environment".to_string()));
        assert!(stack.modalities.len() > 4);
        assert_eq!(stack.it_environment.security_focus.as_deref(), Some("High"));
        assert!(stack.it_environment.staffing.is_none());
    }

    #[test]
    fn unknown_vendors_default() {
        let stack = technology_stack("a friendly clinic");
        assert_eq!(stack.pacs_vendor, "Unknown");
        assert_eq!(stack.ris_vendor, "Unknown");
        assert_eq!(stack.emr_system, "Unknown");
    }

    #[test]
    fn pain_and_growth_sentences() {
        let pages = vec![page(
            "https://x.org/news",
            "Our legacy PACS causes downtime. Integration with the EHR is a challenge. \
             We announce an expansion to a new location.",
        )];
        let pains = pain_points(&pages);
        assert!(pains.iter().any(|p| p.indicator == "legacy"));
        assert!(pains.iter().any(|p| p.indicator == "challenge" && p.context.contains("integration")));
        let growth = growth_indicators(&pages);
        assert_eq!(growth.len(), 2);
    }

    #[test]
    fn stated_volume_wins() {
        let pages = vec![page(
            "https://x.org/",
            "We perform 45,000 exams per year and about 20,000 scans annually.",
        )];
        assert_eq!(annual_study_volume(&pages, 1), 45_000);
    }

    #[test]
    fn estimated_volume_uses_type_and_locations() {
        let pages = vec![page("https://x.org/", "A community imaging center.")];
        assert_eq!(annual_study_volume(&pages, 3), 60_000);

        let pages = vec![page(
            "https://x.org/",
            "Hospital services: ct scan, mri, ultrasound, mammography and fluoroscopy.",
        )];
        assert_eq!(annual_study_volume(&pages, 1), 75_000);
    }

    #[test]
    fn implementation_dates_need_verb_tech_and_year() {
        let pages = vec![page(
            "https://x.org/news",
            "In 2021 we migrated to a new vendor neutral archive. We love our PACS. Installed in 2019 without fuss.",
        )];
        let dates = implementation_dates(&pages);
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].technology, "VENDOR NEUTRAL ARCHIVE");
        assert_eq!(dates[0].year, 2021);
    }

    #[test]
    fn budget_cycle_stated_and_defaulted() {
        let stated = budget_cycle(&[page(
            "https://x.org/",
            "Our fiscal year begins in october. Budget planning starts 5 months ahead.",
        )]);
        assert_eq!(stated.fiscal_year_start, "October");
        assert_eq!(stated.planning_timeframe, "5 months before fiscal year start");

        let hospital = budget_cycle(&[page("https://x.org/", "A regional hospital.")]);
        assert_eq!(hospital.fiscal_year_start, "July");
        assert_eq!(hospital.planning_timeframe, "3-4 months before fiscal year start");

        let other = budget_cycle(&[page("https://x.org/", "A dental office.")]);
        assert_eq!(other.fiscal_year_start, "January");
    }

    #[test]
    fn refresh_cycle_fallbacks() {
        let stated = refresh_cycle(&[page(
            "https://x.org/",
            "We upgrade every pacs workstation on a 5-year cycle.",
        )]);
        assert!(matches!(
            stated[0],
            RefreshIndicator::Stated { cycle_years: Some(5), .. }
        ));

        let aged = refresh_cycle(&[page(
            "https://x.org/",
            "Our 8-year-old scanner and a 4 year old workstation.",
        )]);
        match &aged[0] {
            RefreshIndicator::Inferred { inferred_cycle, .. } => {
                assert!(inferred_cycle.starts_with("Approximately 6.0 years"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let default = refresh_cycle(&[page("https://x.org/", "Nothing relevant.")]);
        assert_eq!(
            default[0],
            RefreshIndicator::Inferred {
                inferred_cycle: "Typical 5-7 year cycle for healthcare imaging technology".into(),
                source: "Industry standard".into(),
            }
        );
    }

    #[test]
    fn accreditations_with_year() {
        let pages = vec![page(
            "https://x.org/about",
            "Accredited by the American College of Radiology since 2015. We are capable and caring.",
        )];
        let acc = accreditations(&pages);
        assert_eq!(acc.len(), 1);
        assert_eq!(acc[0].organization, "American College of Radiology");
        assert_eq!(acc[0].year, Some(2015));
    }
}
