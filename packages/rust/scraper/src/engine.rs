//! Concurrent fetcher for a facility's well-known pages.
//!
//! The scraper requests a fixed list of candidate paths under the site root,
//! bounded by a semaphore, then hands every page that loaded to the
//! extraction and analysis passes.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use fluxsales_shared::{FluxSalesError, Result, ScrapeConfig};

use crate::analysis;
use crate::extract::{PageData, dedup, extract_page};
use crate::terms::{CANDIDATE_PATHS, count_term};
use crate::WebsiteIntel;

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

/// Trim and add `https://` when no scheme is given.
pub fn clean_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// `scheme://host[:port]` of `url`.
pub fn base_url(url: &Url) -> Result<Url> {
    let host = url
        .host_str()
        .ok_or_else(|| FluxSalesError::validation(format!("URL has no host: {url}")))?;
    let origin = match url.port() {
        Some(port) => format!("{}://{host}:{port}/", url.scheme()),
        None => format!("{}://{host}/", url.scheme()),
    };
    Url::parse(&origin).map_err(|e| FluxSalesError::validation(format!("invalid URL {origin}: {e}")))
}

/// Candidate page URLs under `base`, truncated to `max_pages`.
pub fn candidate_urls(base: &Url, max_pages: usize) -> Vec<Url> {
    CANDIDATE_PATHS
        .iter()
        .take(max_pages)
        .filter_map(|path| base.join(path).ok())
        .collect()
}

// ---------------------------------------------------------------------------
// WebsiteScraper
// ---------------------------------------------------------------------------

/// Facility website scraper.
pub struct WebsiteScraper {
    config: ScrapeConfig,
    client: Client,
    /// Allow localhost/private IPs (for tests against mock servers).
    allow_localhost: bool,
}

impl WebsiteScraper {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FluxSalesError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            allow_localhost: false,
        })
    }

    #[cfg(test)]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// Scrape `url` and analyze everything that loaded.
    ///
    /// Unreachable pages are skipped. When nothing loads the result carries
    /// `pages_scanned = 0` and an `error` message rather than failing.
    #[instrument(skip_all, fields(url = %raw_url))]
    pub async fn scrape(&self, raw_url: &str) -> Result<WebsiteIntel> {
        let start = Instant::now();
        let cleaned = clean_url(raw_url);
        let url = Url::parse(&cleaned)
            .map_err(|e| FluxSalesError::validation(format!("invalid website URL {cleaned}: {e}")))?;
        let base = base_url(&url)?;

        if !self.allow_localhost && is_ssrf_target(&base) {
            warn!(%base, "SSRF protection: blocked");
            return Err(FluxSalesError::validation(format!(
                "refusing to scrape local or private address {base}"
            )));
        }

        let targets = candidate_urls(&base, self.config.max_pages);
        info!(
            pages = targets.len(),
            concurrency = self.config.concurrency,
            base = %base,
            "scanning site"
        );

        let mut intel = WebsiteIntel::empty(&cleaned, &base);
        let pages = self.fetch_all(&targets).await;

        if pages.is_empty() {
            intel.error = Some(format!("no pages could be fetched from {base}"));
            warn!(%base, "no pages fetched");
            return Ok(intel);
        }

        if pages[0].url == targets[0].as_str() {
            intel.page_title = pages[0].title.clone();
            intel.meta_description = pages[0].meta_description.clone();
        }

        analyze(&mut intel, pages);
        intel.scanned_at = Some(Utc::now());

        info!(
            pages_scanned = intel.pages_scanned,
            personnel = intel.key_personnel.len(),
            pain_points = intel.pain_points.len(),
            duration_ms = start.elapsed().as_millis(),
            "site scan completed"
        );
        Ok(intel)
    }

    /// Fetch `targets` concurrently; results keep candidate order.
    async fn fetch_all(&self, targets: &[Url]) -> Vec<PageData> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut handles = Vec::with_capacity(targets.len());

        for url in targets {
            let client = self.client.clone();
            let sem = semaphore.clone();
            let url = url.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| FluxSalesError::Network(format!("semaphore closed: {e}")))?;
                fetch_page(&client, &url).await.map(|html| (url, html))
            }));
        }

        let mut pages = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Ok((url, html))) => pages.push(extract_page(&html, &url)),
                Ok(Err(e)) => debug!(error = %e, "page skipped"),
                Err(e) => warn!(error = %e, "fetch task failed"),
            }
        }
        pages
    }
}

async fn fetch_page(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching page");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| FluxSalesError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FluxSalesError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| FluxSalesError::Network(format!("{url}: body read failed: {e}")))
}

/// Run every analysis pass over `pages` and fill `intel`. Raw HTML is dropped.
pub fn analyze(intel: &mut WebsiteIntel, mut pages: Vec<PageData>) {
    let content = analysis::combined_content(&pages);
    let term_counts = analysis::term_counts(&content);
    let sum = |category: &str| -> usize {
        term_counts
            .get(category)
            .map(|c| c.values().sum())
            .unwrap_or(0)
    };

    intel.radiology_mentions = sum("imaging");
    intel.pacs_mentions = sum("pacs");
    intel.workflow_mentions = sum("workflow");
    intel.modernization_mentions = sum("modernization");
    intel.dicom_mentions = count_term(&content, "dicom");

    intel.location_count = analysis::location_count(&pages);
    intel.key_personnel = analysis::key_personnel(&pages);
    intel.equipment = analysis::equipment(&pages);
    intel.technology_stack = analysis::technology_stack(&content);
    intel.growth_indicators = analysis::growth_indicators(&pages);
    intel.pain_points = analysis::pain_points(&pages);
    intel.annual_study_volume = analysis::annual_study_volume(&pages, intel.location_count);
    intel.implementation_dates = analysis::implementation_dates(&pages);
    intel.budget_cycle = analysis::budget_cycle(&pages);
    intel.refresh_cycle = analysis::refresh_cycle(&pages);
    intel.accreditations = analysis::accreditations(&pages);
    intel.term_counts = term_counts;

    intel.emails_found = dedup(pages.iter().flat_map(|p| p.emails.iter().cloned()));
    intel.job_openings = dedup(pages.iter().flat_map(|p| p.job_listings.iter().cloned()));

    let context_has = |needles: &[&str]| {
        intel
            .pain_points
            .iter()
            .any(|p| needles.iter().any(|n| p.context.contains(n)))
    };
    let integration = context_has(&["integration"]);
    let workflow = context_has(&["workflow"]);
    let legacy = context_has(&["legacy", "outdated", "obsolete"]);
    intel.has_integration_pain_points = integration;
    intel.has_workflow_pain_points = workflow;
    intel.has_legacy_system_pain_points = legacy;

    for page in &mut pages {
        page.html = String::new();
    }
    intel.pages_scanned = pages.len();
    intel.pages = pages;
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
pub fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
