//! Check that a website actually belongs to the named company before it is
//! scraped for a sales package.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;

use fluxsales_scraper::{clean_url, extract_page, is_ssrf_target};
use fluxsales_shared::{FluxSalesError, Result};

use crate::agents::WEBSITE_VALIDATOR;
use crate::llm::{ChatMessage, ChatModel, ChatRequest};

const FETCH_TIMEOUT_SECS: u64 = 5;
const VALIDATION_TEMPERATURE: f32 = 0.5;
const EXCERPT_CHARS: usize = 1500;

/// Verdict on whether a site belongs to a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebsiteValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_mentions: Option<String>,
}

impl WebsiteValidation {
    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            confidence: None,
            reason: reason.into(),
            company_mentions: None,
        }
    }
}

/// Fetches the homepage and asks the model for a verdict.
pub struct SiteValidator {
    client: Client,
    allow_localhost: bool,
}

impl SiteValidator {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| FluxSalesError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            allow_localhost: false,
        })
    }

    #[cfg(test)]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// Validate `url` against `company`.
    ///
    /// Problems reaching the site produce an invalid verdict, not an error.
    /// Only a failing model call is an error.
    #[instrument(skip_all, fields(company = %company, url = %url))]
    pub async fn validate(
        &self,
        chat: &dyn ChatModel,
        model: &str,
        company: &str,
        url: &str,
    ) -> Result<WebsiteValidation> {
        if company.trim().is_empty() || url.trim().is_empty() {
            return Ok(WebsiteValidation::invalid("Missing company name or website URL"));
        }

        let cleaned = clean_url(url);
        let parsed = match Url::parse(&cleaned) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(WebsiteValidation::invalid(format!("Invalid URL: {e}"))),
        };
        if !self.allow_localhost && is_ssrf_target(&parsed) {
            return Ok(WebsiteValidation::invalid("Refusing to check a local or private address"));
        }

        let html = match self.client.get(parsed.as_str()).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    return Ok(WebsiteValidation::invalid(format!("Could not read website: {e}")));
                }
            },
            Ok(response) => {
                return Ok(WebsiteValidation::invalid(format!(
                    "Website returned status code {}",
                    response.status().as_u16()
                )));
            }
            Err(e) => {
                warn!(error = %e, "website unreachable");
                return Ok(WebsiteValidation::invalid(format!("Could not access website: {e}")));
            }
        };

        let page = extract_page(&html, &parsed);
        let excerpt: String = page.content.chars().take(EXCERPT_CHARS).collect();
        let prompt = validation_prompt(company, parsed.as_str(), &page.title, &page.meta_description, &excerpt);

        let request = ChatRequest {
            model: model.to_string(),
            temperature: VALIDATION_TEMPERATURE,
            messages: vec![
                ChatMessage::system(WEBSITE_VALIDATOR.identity()),
                ChatMessage::user(prompt),
            ],
        };
        let reply = chat.complete(&request).await?;
        let verdict = parse_verdict(&reply.text);
        info!(valid = verdict.valid, confidence = ?verdict.confidence, "website validated");
        Ok(verdict)
    }
}

fn validation_prompt(company: &str, url: &str, title: &str, description: &str, excerpt: &str) -> String {
    format!(
        "Verify whether the website {url} belongs to the company \"{company}\".\n\n\
         PAGE TITLE: {title}\n\
         META DESCRIPTION: {description}\n\
         PAGE TEXT:\n{excerpt}\n\n\
         1. Decide whether this website belongs to {company}\n\
         2. Look for mentions of the company name or variations of it\n\
         3. Check that the site fits the company's industry\n\
         4. Note any red flags suggesting this is the wrong website\n\n\
         Return a JSON object:\n\
         {{\n\
             \"valid\": true or false,\n\
             \"confidence\": 0-100,\n\
             \"reason\": \"Explanation of your conclusion\",\n\
             \"company_mentions\": \"Where and how the company is mentioned, if found\"\n\
         }}"
    )
}

/// Read the model's JSON verdict; anything unreadable counts as valid.
pub fn parse_verdict(text: &str) -> WebsiteValidation {
    let block = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    };

    #[derive(Deserialize)]
    struct RawVerdict {
        valid: bool,
        #[serde(default)]
        confidence: Option<f64>,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        company_mentions: Option<serde_json::Value>,
    }

    match serde_json::from_str::<RawVerdict>(block) {
        Ok(raw) => WebsiteValidation {
            valid: raw.valid,
            confidence: raw.confidence.map(|c| c.clamp(0.0, 100.0).round() as u8),
            reason: raw.reason.unwrap_or_default(),
            company_mentions: raw.company_mentions.and_then(|v| match v {
                serde_json::Value::String(s) => (!s.is_empty()).then_some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            }),
        },
        Err(_) => WebsiteValidation {
            valid: true,
            confidence: None,
            reason: "could not parse validation result".to_string(),
            company_mentions: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedChat;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn verdict_parses_embedded_json() {
        let v = parse_verdict(
            "Sure.\n{\"valid\": false, \"confidence\": 87.4, \"reason\": \"Different company\", \
             \"company_mentions\": null}",
        );
        assert!(!v.valid);
        assert_eq!(v.confidence, Some(87));
        assert_eq!(v.reason, "Different company");
        assert!(v.company_mentions.is_none());
    }

    #[test]
    fn unreadable_verdict_counts_as_valid() {
        let v = parse_verdict("Looks right to me.");
        assert!(v.valid);
        assert_eq!(v.reason, "could not parse validation result");
    }

    #[tokio::test]
    async fn missing_inputs_are_invalid() {
        let chat = ScriptedChat::new(vec![]);
        let v = SiteValidator::new()
            .unwrap()
            .validate(&chat, "gpt-4", "", "metro.example")
            .await
            .unwrap();
        assert!(!v.valid);
        assert_eq!(v.reason, "Missing company name or website URL");
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn private_address_is_refused() {
        let chat = ScriptedChat::new(vec![]);
        let v = SiteValidator::new()
            .unwrap()
            .validate(&chat, "gpt-4", "Metro", "http://127.0.0.1:9/")
            .await
            .unwrap();
        assert!(!v.valid);
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn non_200_is_invalid_without_model_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let chat = ScriptedChat::new(vec![]);
        let v = SiteValidator::new()
            .unwrap()
            .allow_localhost()
            .validate(&chat, "gpt-4", "Metro", &server.uri())
            .await
            .unwrap();
        assert!(!v.valid);
        assert_eq!(v.reason, "Website returned status code 404");
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn reachable_site_goes_to_the_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><title>Metro Imaging Center</title></head>\
                 <body><p>Metro Imaging Center offers MRI and CT in Chicago.</p></body></html>",
            ))
            .mount(&server)
            .await;

        let chat = ScriptedChat::new(vec![Ok(
            r#"{"valid": true, "confidence": 95, "reason": "Name in title", "company_mentions": "Title and body"}"#
                .to_string(),
        )]);
        let v = SiteValidator::new()
            .unwrap()
            .allow_localhost()
            .validate(&chat, "gpt-4", "Metro Imaging Center", &format!("{}/", server.uri()))
            .await
            .unwrap();

        assert!(v.valid);
        assert_eq!(v.confidence, Some(95));
        assert_eq!(v.company_mentions.as_deref(), Some("Title and body"));
        let prompt = chat.prompt(0);
        assert!(prompt.contains("PAGE TITLE: Metro Imaging Center"));
        assert!(prompt.contains("Website Validation Specialist"));
    }
}
