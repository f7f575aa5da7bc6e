//! Google Custom Search JSON API client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use fluxsales_shared::{FluxSalesError, Result};

const SERVICE: &str = "google";

/// Default Custom Search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// The API returns at most this many results per request.
pub const MAX_RESULTS_PER_QUERY: u32 = 10;

/// One search hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    items: Option<Vec<SearchResult>>,
}

/// Custom Search client bound to one API key and engine id.
pub struct SearchClient {
    client: Client,
    api_key: String,
    engine_id: String,
    base_url: String,
}

impl SearchClient {
    /// Create a client against `base_url` (normally [`DEFAULT_BASE_URL`]).
    pub fn new(
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FluxSalesError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            base_url: base_url.into(),
        })
    }

    /// Run one query, returning up to `num` results (capped at 10).
    ///
    /// A response without `items` yields an empty list.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn search(&self, query: &str, num: u32) -> Result<Vec<SearchResult>> {
        let num = num.clamp(1, MAX_RESULTS_PER_QUERY).to_string();
        debug!(url = %self.base_url, "search GET");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FluxSalesError::Network(format!("{}: {e}", self.base_url)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FluxSalesError::api(SERVICE, status.as_u16(), message));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| FluxSalesError::parse(format!("invalid search response: {e}")))?;

        match body.items {
            Some(items) => {
                info!(results = items.len(), "search completed");
                Ok(items)
            }
            None => {
                warn!("no search results");
                Ok(Vec::new())
            }
        }
    }
}
