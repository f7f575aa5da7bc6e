//! Per-page extraction: text content, links, job titles, term hits, emails.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::terms::{JOB_ROLE_TERMS, TERM_CATEGORIES, count_term};

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static META_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="description"]"#).expect("valid selector"));
static CONTENT_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, h1, h2, h3, h4, h5, li").expect("valid selector"));
static LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static SECTIONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div, section, article").expect("valid selector"));
static JOB_TITLES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, a").expect("valid selector"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});

/// Minimum length for a text block to count as page content.
const MIN_BLOCK_CHARS: usize = 15;

/// A same-site link found on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLink {
    pub url: String,
    pub text: String,
}

/// A term and how often it occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermHit {
    pub term: String,
    pub count: usize,
}

/// Everything pulled from one fetched page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageData {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub content: String,
    pub content_length: usize,
    pub links: Vec<PageLink>,
    pub job_listings: Vec<String>,
    /// Per dictionary category, the terms found in `content`.
    pub term_hits: BTreeMap<String, Vec<TermHit>>,
    pub emails: Vec<String>,
    /// Raw HTML, kept only while the site is being analyzed.
    #[serde(skip)]
    pub html: String,
}

/// Extract structured data from one page's HTML.
pub fn extract_page(html: &str, url: &Url) -> PageData {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&TITLE)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();
    let meta_description = doc
        .select(&META_DESCRIPTION)
        .next()
        .and_then(|el| el.value().attr("content"))
        .unwrap_or_default()
        .to_string();

    let content = doc
        .select(&CONTENT_BLOCKS)
        .map(|el| element_text(&el))
        .filter(|text| text.chars().count() > MIN_BLOCK_CHARS)
        .collect::<Vec<_>>()
        .join(" ");

    let job_listings = if is_careers_page(url) {
        extract_job_listings(&doc)
    } else {
        Vec::new()
    };

    let lowered = content.to_lowercase();
    let term_hits = TERM_CATEGORIES
        .iter()
        .map(|(category, terms)| {
            let hits = terms
                .iter()
                .filter_map(|term| {
                    let count = count_term(&lowered, term);
                    (count > 0).then(|| TermHit {
                        term: (*term).to_string(),
                        count,
                    })
                })
                .collect();
            ((*category).to_string(), hits)
        })
        .collect();

    let emails = dedup(EMAIL.find_iter(&content).map(|m| m.as_str().to_string()));

    PageData {
        url: url.to_string(),
        title,
        meta_description,
        content_length: content.chars().count(),
        links: extract_links(&doc, url),
        job_listings,
        term_hits,
        emails,
        html: html.to_string(),
        content,
    }
}

/// Same-host links, resolved against `base_url`.
pub fn extract_links(doc: &Html, base_url: &Url) -> Vec<PageLink> {
    let mut links = Vec::new();

    for el in doc.select(&LINKS) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        let Ok(mut resolved) = base_url.join(href) else {
            continue;
        };
        if resolved.host_str() != base_url.host_str() {
            continue;
        }
        resolved.set_fragment(None);
        links.push(PageLink {
            url: resolved.to_string(),
            text: element_text(&el),
        });
    }

    links
}

fn is_careers_page(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    path.contains("/career") || path.contains("/job")
}

fn extract_job_listings(doc: &Html) -> Vec<String> {
    let mut jobs = Vec::new();
    for section in doc.select(&SECTIONS) {
        if !class_mentions(&section, &["job", "career", "position", "opening"]) {
            continue;
        }
        for heading in section.select(&JOB_TITLES) {
            let text = element_text(&heading);
            let lowered = text.to_lowercase();
            if text.chars().count() > 5 && JOB_ROLE_TERMS.iter().any(|t| lowered.contains(t)) {
                jobs.push(text);
            }
        }
    }
    dedup(jobs.into_iter())
}

/// Whether the element's `class` attribute mentions any of `needles`.
pub(crate) fn class_mentions(el: &ElementRef<'_>, needles: &[&str]) -> bool {
    el.value()
        .attr("class")
        .map(|c| c.to_lowercase())
        .is_some_and(|c| needles.iter().any(|n| c.contains(n)))
}

/// Whitespace-normalized text of an element.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Order-preserving dedup.
pub(crate) fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABOUT_PAGE: &str = r##"<html><head>
        <title> Valley Imaging | About </title>
        <meta name="description" content="Outpatient radiology in Fresno">
        </head><body>
        <h1>About Valley Imaging</h1>
        <p>Short text</p>
        <p>Our PACS was upgraded and the PACS team supports referring physician access.</p>
        <li>Contact us at info@valleyimaging.com or info@valleyimaging.com today</li>
        <a href="/services">Services</a>
        <a href="https://other.example.org/x">External</a>
        <a href="#top">Top</a>
        <a href="tel:5551234">Call</a>
        <a href="mailto:info@valleyimaging.com">Mail</a>
        </body></html>"##;

    #[test]
    fn extracts_basic_fields() {
        let url = Url::parse("https://valleyimaging.com/about").unwrap();
        let page = extract_page(ABOUT_PAGE, &url);

        assert_eq!(page.title, "Valley Imaging | About");
        assert_eq!(page.meta_description, "Outpatient radiology in Fresno");
        assert!(page.content.contains("About Valley Imaging"));
        assert!(!page.content.contains("Short text"));
        assert_eq!(page.emails, vec!["info@valleyimaging.com"]);
        assert!(page.job_listings.is_empty());
    }

    #[test]
    fn links_are_same_host_and_absolute() {
        let url = Url::parse("https://valleyimaging.com/about").unwrap();
        let page = extract_page(ABOUT_PAGE, &url);
        assert_eq!(page.links.len(), 1);
        assert_eq!(page.links[0].url, "https://valleyimaging.com/services");
        assert_eq!(page.links[0].text, "Services");
    }

    #[test]
    fn term_hits_count_per_category() {
        let url = Url::parse("https://valleyimaging.com/about").unwrap();
        let page = extract_page(ABOUT_PAGE, &url);
        let pacs = &page.term_hits["pacs"];
        assert!(pacs.iter().any(|h| h.term == "pacs" && h.count == 2));
        let workflow = &page.term_hits["workflow"];
        assert!(workflow.iter().any(|h| h.term == "referring physician"));
        assert!(page.term_hits["vendor"].is_empty());
    }

    #[test]
    fn job_listings_only_on_career_pages() {
        let html = r#"<html><body>
            <div class="job-board">
                <h3>PACS Administrator</h3>
                <h3>Front Desk</h3>
                <a href="/jobs/1">Senior CT Technologist</a>
            </div>
            <div class="news"><h3>New Imaging Director named</h3></div>
        </body></html>"#;

        let careers = Url::parse("https://valleyimaging.com/careers").unwrap();
        let page = extract_page(html, &careers);
        assert_eq!(
            page.job_listings,
            vec!["PACS Administrator", "Senior CT Technologist"]
        );

        let home = Url::parse("https://valleyimaging.com/").unwrap();
        assert!(extract_page(html, &home).job_listings.is_empty());
    }

    #[test]
    fn html_is_not_serialized() {
        let url = Url::parse("https://valleyimaging.com/").unwrap();
        let page = extract_page(ABOUT_PAGE, &url);
        assert!(!page.html.is_empty());
        let json = serde_json::to_string(&page).unwrap();
        assert!(!json.contains("\"html\""));
    }
}
