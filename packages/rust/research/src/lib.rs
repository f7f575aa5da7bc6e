//! Web research on a facility through Google Custom Search.
//!
//! - [`SearchClient`] runs single queries
//! - [`research_facility`] runs the full seven-query sweep and buckets snippets
//! - [`targeted_summary`] runs two focused queries and renders a short brief

pub mod client;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

pub use client::{DEFAULT_BASE_URL, MAX_RESULTS_PER_QUERY, SearchClient, SearchResult};

const RESULTS_PER_QUERY: u32 = 3;
const TARGETED_RESULTS: usize = 2;
const SNIPPET_CHARS: usize = 150;
const SUMMARY_CHARS: usize = 1000;

static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+)\s+locations?",
        r"(?i)(\d+)\s+centers?",
        r"(?i)(\d+)\s+facilities?",
        r"(?i)locations?\s+in\s+(\d+)",
        r"(?i)centers?\s+in\s+(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static RADIOLOGIST_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+)\s+radiologists?",
        r"(?i)team\s+of\s+(\d+)",
        r"(?i)staff\s+of\s+(\d+)",
        r"(?i)(\d+)\s+physicians?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// A distinct page that surfaced during research.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub link: String,
}

/// Snippets grouped by what the query was looking for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFindings {
    pub locations: Vec<String>,
    pub technology: Vec<String>,
    pub staff: Vec<String>,
    pub recent_news: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityResearch {
    pub facility_name: String,
    pub location: Option<String>,
    pub sources: Vec<Source>,
    pub key_findings: KeyFindings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_location_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_radiologist_count: Option<u32>,
}

/// The seven research queries for a facility.
pub fn research_queries(name: &str, location: Option<&str>) -> Vec<String> {
    let locations = match location.filter(|l| !l.trim().is_empty()) {
        Some(loc) => format!("{name} locations in {loc}"),
        None => format!("{name} locations"),
    };
    vec![
        format!("{name} radiology services"),
        locations,
        format!("{name} healthcare technology"),
        format!("{name} imaging equipment"),
        format!("{name} PACS system"),
        format!("{name} expansion news"),
        format!("{name} number of radiologists"),
    ]
}

/// Search the facility from seven angles and compile the findings.
///
/// A failing query is logged and contributes nothing.
#[instrument(skip_all, fields(facility = %name))]
pub async fn research_facility(
    client: &SearchClient,
    name: &str,
    location: Option<&str>,
) -> FacilityResearch {
    let mut research = FacilityResearch {
        facility_name: name.to_string(),
        location: location.map(str::to_string),
        ..FacilityResearch::default()
    };

    for query in research_queries(name, location) {
        let results = match client.search(&query, RESULTS_PER_QUERY).await {
            Ok(results) => results,
            Err(e) => {
                warn!(query = %query, error = %e, "research query failed");
                continue;
            }
        };
        collect_results(&mut research, &query, results);
    }

    research.estimated_location_count =
        estimate_count(&research.key_findings.locations, &LOCATION_PATTERNS);
    research.estimated_radiologist_count =
        estimate_count(&research.key_findings.staff, &RADIOLOGIST_PATTERNS);

    info!(
        sources = research.sources.len(),
        locations = ?research.estimated_location_count,
        radiologists = ?research.estimated_radiologist_count,
        "facility research compiled"
    );
    research
}

fn collect_results(research: &mut FacilityResearch, query: &str, results: Vec<SearchResult>) {
    for result in results {
        if !research.sources.iter().any(|s| s.link == result.link) {
            research.sources.push(Source {
                title: result.title.clone(),
                link: result.link.clone(),
            });
        }

        let findings = &mut research.key_findings;
        if query.contains("locations") || query.contains("centers") {
            findings.locations.push(result.snippet.clone());
        }
        if query.contains("technology") || query.contains("PACS") || query.contains("equipment") {
            findings.technology.push(result.snippet.clone());
        }
        if query.contains("radiologists") || query.contains("staff") {
            findings.staff.push(result.snippet.clone());
        }
        if query.contains("news") || query.contains("expansion") {
            findings.recent_news.push(result.snippet.clone());
        }
    }
}

/// Largest number captured by the first pattern that matches anywhere.
fn estimate_count(snippets: &[String], patterns: &[Regex]) -> Option<u32> {
    let text = snippets.join(" ");
    patterns.iter().find_map(|re| {
        re.captures_iter(&text)
            .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
            .max()
    })
}

/// Two focused queries rendered as a short "KEY SEARCH FINDINGS" brief.
///
/// Returns an empty string when neither query produced results.
#[instrument(skip_all, fields(facility = %name))]
pub async fn targeted_summary(client: &SearchClient, name: &str, location: &str) -> String {
    let tech_query = format!("{name} {location} radiology PACS imaging technology");
    let news_query = format!("{name} {location} healthcare news recent");

    let tech = search_or_empty(client, &tech_query).await;
    let news = search_or_empty(client, &news_query).await;
    if tech.is_empty() && news.is_empty() {
        return String::new();
    }

    let mut summary = String::from("\nKEY SEARCH FINDINGS:\n");
    render_section(&mut summary, "TECHNOLOGY INFORMATION", &tech);
    render_section(&mut summary, "RECENT NEWS", &news);

    if summary.chars().count() > SUMMARY_CHARS {
        summary = summary.chars().take(SUMMARY_CHARS).collect::<String>() + "...(truncated)";
    }
    info!(chars = summary.chars().count(), "search summary built");
    summary
}

async fn search_or_empty(client: &SearchClient, query: &str) -> Vec<SearchResult> {
    match client.search(query, TARGETED_RESULTS as u32).await {
        Ok(results) => results,
        Err(e) => {
            warn!(query = %query, error = %e, "targeted search failed");
            Vec::new()
        }
    }
}

fn render_section(out: &mut String, heading: &str, results: &[SearchResult]) {
    if results.is_empty() {
        return;
    }
    out.push_str(&format!("\n{heading}:\n"));
    for result in results.iter().take(TARGETED_RESULTS) {
        let title = if result.title.is_empty() { "Unknown" } else { result.title.as_str() };
        let snippet = if result.snippet.is_empty() {
            "No description available".to_string()
        } else if result.snippet.chars().count() > SNIPPET_CHARS {
            result.snippet.chars().take(SNIPPET_CHARS).collect::<String>() + "..."
        } else {
            result.snippet.clone()
        };
        out.push_str(&format!("- {title}: {snippet}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SearchClient {
        SearchClient::new("k", "cx", server.uri()).expect("client")
    }

    fn items(entries: &[(&str, &str, &str)]) -> serde_json::Value {
        json!({
            "items": entries
                .iter()
                .map(|(title, snippet, link)| json!({"title": title, "snippet": snippet, "link": link}))
                .collect::<Vec<_>>()
        })
    }

    #[test]
    fn queries_include_location_when_given() {
        let queries = research_queries("Valley Imaging", Some("Fresno, CA"));
        assert_eq!(queries.len(), 7);
        assert_eq!(queries[1], "Valley Imaging locations in Fresno, CA");
        assert_eq!(research_queries("Valley Imaging", None)[1], "Valley Imaging locations");
    }

    #[test]
    fn estimate_uses_first_matching_pattern() {
        let snippets = vec![
            "Valley Imaging operates 12 locations and 3 centers.".to_string(),
            "Now with 14 locations statewide.".to_string(),
        ];
        assert_eq!(estimate_count(&snippets, &LOCATION_PATTERNS), Some(14));
        assert_eq!(estimate_count(&["none".to_string()], &LOCATION_PATTERNS), None);
    }

    #[tokio::test]
    async fn research_buckets_snippets_and_dedupes_sources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Valley Imaging locations in Fresno"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items(&[(
                "Locations",
                "Visit any of our 6 locations across the valley.",
                "https://valleyimaging.com/locations",
            )])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "Valley Imaging number of radiologists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items(&[(
                "Our team",
                "A team of 9 board-certified radiologists.",
                "https://valleyimaging.com/team",
            )])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "Valley Imaging PACS system"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items(&[(
                "Locations",
                "PACS upgrade announced.",
                "https://valleyimaging.com/locations",
            )])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let research = research_facility(&client_for(&server), "Valley Imaging", Some("Fresno")).await;

        assert_eq!(research.sources.len(), 2);
        assert_eq!(research.key_findings.locations.len(), 1);
        assert_eq!(research.key_findings.technology, vec!["PACS upgrade announced."]);
        assert_eq!(research.key_findings.staff.len(), 1);
        assert!(research.key_findings.recent_news.is_empty());
        assert_eq!(research.estimated_location_count, Some(6));
        assert_eq!(research.estimated_radiologist_count, Some(9));
    }

    #[tokio::test]
    async fn targeted_summary_renders_and_truncates_snippets() {
        let server = MockServer::start().await;
        let long = "x".repeat(200);
        Mock::given(method("GET"))
            .and(query_param("q", "Valley Imaging Fresno radiology PACS imaging technology"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items(&[
                ("Tech page", long.as_str(), "https://a"),
                ("", "Sectra PACS live", "https://b"),
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "Valley Imaging Fresno healthcare news recent"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let summary = targeted_summary(&client_for(&server), "Valley Imaging", "Fresno").await;

        assert!(summary.starts_with("\nKEY SEARCH FINDINGS:\n"));
        assert!(summary.contains("TECHNOLOGY INFORMATION:"));
        assert!(summary.contains(&format!("- Tech page: {}...\n", "x".repeat(150))));
        assert!(summary.contains("- Unknown: Sectra PACS live\n"));
        assert!(!summary.contains("RECENT NEWS"));
    }

    #[tokio::test]
    async fn targeted_summary_empty_when_nothing_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let summary = targeted_summary(&client_for(&server), "Valley Imaging", "Fresno").await;
        assert!(summary.is_empty());
    }
}
