//! HTTP client for the Apollo.io REST API.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use fluxsales_shared::{Contact, FluxSalesError, Organization, Result, null_as_empty};

use crate::clean_website_url;

const SERVICE: &str = "apollo";

/// Default Apollo REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.apollo.io/v1";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Organization search filters.
#[derive(Debug, Clone)]
pub struct OrgQuery {
    /// Website or bare domain; cleaned before sending.
    pub domain: Option<String>,
    pub name: Option<String>,
    pub limit: u32,
}

impl Default for OrgQuery {
    fn default() -> Self {
        Self {
            domain: None,
            name: None,
            limit: 10,
        }
    }
}

/// People search filters.
#[derive(Debug, Clone)]
pub struct PeopleQuery {
    pub organization_id: Option<String>,
    pub titles: Vec<String>,
    pub departments: Vec<String>,
    pub seniorities: Vec<String>,
    pub limit: u32,
}

impl Default for PeopleQuery {
    fn default() -> Self {
        Self {
            organization_id: None,
            titles: Vec::new(),
            departments: Vec::new(),
            seniorities: Vec::new(),
            limit: 25,
        }
    }
}

/// Person match input. Name fields are only sent when all three are present.
#[derive(Debug, Clone, Default)]
pub struct PersonMatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OrgSearchResponse {
    #[serde(deserialize_with = "null_as_empty")]
    organizations: Vec<Organization>,
    #[serde(deserialize_with = "null_as_empty")]
    accounts: Vec<Organization>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PeopleSearchResponse {
    #[serde(deserialize_with = "null_as_empty")]
    people: Vec<Contact>,
    #[serde(deserialize_with = "null_as_empty")]
    contacts: Vec<Contact>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OrgEnvelope {
    organization: Option<Organization>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PersonEnvelope {
    person: Option<Contact>,
}

// ---------------------------------------------------------------------------
// ApolloClient
// ---------------------------------------------------------------------------

/// Apollo.io client. The API key travels in the JSON body (POST) or the
/// `api_key` query parameter (GET).
pub struct ApolloClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ApolloClient {
    /// Create a client against `base_url` (normally [`DEFAULT_BASE_URL`]).
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FluxSalesError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Search organizations by domain and/or name.
    #[instrument(skip_all, fields(domain = ?query.domain, name = ?query.name))]
    pub async fn search_organizations(&self, query: &OrgQuery) -> Result<Vec<Organization>> {
        let mut body = Map::new();
        body.insert("page".into(), json!(1));
        body.insert("per_page".into(), json!(query.limit));
        if let Some(domain) = query.domain.as_deref().filter(|d| !d.trim().is_empty()) {
            body.insert(
                "q_organization_domains".into(),
                json!([clean_website_url(domain)]),
            );
        }
        if let Some(name) = query.name.as_deref().filter(|n| !n.trim().is_empty()) {
            body.insert("q_organization_name".into(), json!(name));
        }

        let resp: OrgSearchResponse = self.post("/organizations/search", body).await?;
        let mut orgs = resp.organizations;
        orgs.extend(resp.accounts);
        debug!(count = orgs.len(), "organizations found");
        Ok(orgs)
    }

    /// Search people, typically within one organization.
    #[instrument(skip_all, fields(org = ?query.organization_id))]
    pub async fn search_people(&self, query: &PeopleQuery) -> Result<Vec<Contact>> {
        let mut body = Map::new();
        body.insert("page".into(), json!(1));
        body.insert("per_page".into(), json!(query.limit));
        if let Some(id) = &query.organization_id {
            body.insert("q_organization_id".into(), json!(id));
        }
        if !query.titles.is_empty() {
            body.insert("q_titles".into(), json!(query.titles));
        }
        if !query.departments.is_empty() {
            body.insert("q_departments".into(), json!(query.departments));
        }
        if !query.seniorities.is_empty() {
            body.insert("q_seniorities".into(), json!(query.seniorities));
        }

        let resp: PeopleSearchResponse = self.post("/people/search", body).await?;
        let mut people = resp.people;
        people.extend(resp.contacts);
        debug!(count = people.len(), "people found");
        Ok(people)
    }

    /// Fetch one organization by Apollo id.
    pub async fn get_organization(&self, id: &str) -> Result<Organization> {
        let resp: OrgEnvelope = self.get(&format!("/organizations/{id}")).await?;
        resp.organization
            .ok_or_else(|| FluxSalesError::NotFound(format!("apollo organization {id}")))
    }

    /// Fetch one person by Apollo id.
    pub async fn get_person(&self, id: &str) -> Result<Contact> {
        let resp: PersonEnvelope = self.get(&format!("/people/{id}")).await?;
        resp.person
            .ok_or_else(|| FluxSalesError::NotFound(format!("apollo person {id}")))
    }

    /// Firmographic enrichment for a domain. `None` when Apollo knows nothing.
    #[instrument(skip(self))]
    pub async fn enrich_domain(&self, domain: &str) -> Result<Option<Organization>> {
        let mut body = Map::new();
        body.insert("domain".into(), json!(clean_website_url(domain)));
        let resp: OrgEnvelope = self.post("/organizations/enrich", body).await?;
        Ok(resp.organization)
    }

    /// Match a person by email or by name + organization.
    pub async fn match_person(&self, input: &PersonMatch) -> Result<Option<Contact>> {
        let mut body = Map::new();
        if let Some(email) = &input.email {
            body.insert("email".into(), json!(email));
        }
        if let (Some(first), Some(last), Some(org)) = (
            &input.first_name,
            &input.last_name,
            &input.organization_name,
        ) {
            body.insert("first_name".into(), json!(first));
            body.insert("last_name".into(), json!(last));
            body.insert("organization_name".into(), json!(org));
        }
        let resp: PersonEnvelope = self.post("/people/match", body).await?;
        Ok(resp.person)
    }

    /// Reveal a contact's details. Consumes Apollo credits.
    pub async fn reveal_contact(&self, person_id: &str) -> Result<Option<Contact>> {
        let resp: PersonEnvelope = self
            .post(&format!("/people/{person_id}/reveal"), Map::new())
            .await?;
        Ok(resp.person)
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    async fn post<T: DeserializeOwned>(&self, path: &str, mut body: Map<String, Value>) -> Result<T> {
        body.insert("api_key".into(), json!(self.api_key));
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "apollo POST");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Cache-Control", "no-cache")
            .json(&Value::Object(body))
            .send()
            .await
            .map_err(|e| FluxSalesError::Network(format!("{url}: {e}")))?;

        decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "apollo GET");

        let response = self
            .client
            .get(&url)
            .header("Cache-Control", "no-cache")
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| FluxSalesError::Network(format!("{url}: {e}")))?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(FluxSalesError::api(SERVICE, status.as_u16(), message));
    }

    response
        .json()
        .await
        .map_err(|e| FluxSalesError::parse(format!("invalid Apollo response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ApolloClient {
        ApolloClient::new("test-key", server.uri()).expect("client")
    }

    #[tokio::test]
    async fn search_organizations_sends_cleaned_domain() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organizations/search"))
            .and(body_partial_json(json!({
                "api_key": "test-key",
                "page": 1,
                "per_page": 10,
                "q_organization_domains": ["valleyimaging.com"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organizations": [{"id": "o1", "name": "Valley Imaging"}],
                "accounts": [{"id": "a1", "name": "Valley Imaging (account)"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let orgs = client
            .search_organizations(&OrgQuery {
                domain: Some("https://www.valleyimaging.com/about".into()),
                ..OrgQuery::default()
            })
            .await
            .expect("search");

        assert_eq!(orgs.len(), 2);
        assert_eq!(orgs[0].id.as_deref(), Some("o1"));
        assert_eq!(orgs[1].id.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn search_people_merges_contacts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/people/search"))
            .and(body_partial_json(json!({
                "per_page": 25,
                "q_organization_id": "o1",
                "q_titles": ["CIO"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "people": [{"id": "p1", "first_name": "Dana", "last_name": "Reyes", "title": "CIO"}],
                "contacts": [{"id": "c1", "name": "Sam Ortiz", "title": "PACS Administrator"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let people = client
            .search_people(&PeopleQuery {
                organization_id: Some("o1".into()),
                titles: vec!["CIO".into()],
                ..PeopleQuery::default()
            })
            .await
            .expect("search");

        assert_eq!(people.len(), 2);
        assert_eq!(people[0].display_name(), "Dana Reyes");
        assert_eq!(people[1].display_name(), "Sam Ortiz");
    }

    #[tokio::test]
    async fn get_organization_uses_query_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/organizations/o1"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organization": {"id": "o1", "name": "Valley Imaging", "founded_year": 1998}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let org = client.get_organization("o1").await.expect("get");
        assert_eq!(org.founded_year, Some(1998));
    }

    #[tokio::test]
    async fn enrich_domain_missing_org_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organizations/enrich"))
            .and(body_partial_json(json!({"domain": "unknown-clinic.org"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let org = client
            .enrich_domain("www.unknown-clinic.org")
            .await
            .expect("enrich");
        assert!(org.is_none());
    }

    #[tokio::test]
    async fn non_success_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/people/match"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid request"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .match_person(&PersonMatch {
                email: Some("dana@example.org".into()),
                ..PersonMatch::default()
            })
            .await
            .expect_err("should fail");

        assert_eq!(err.status(), Some(422));
        assert!(err.to_string().contains("apollo API error"));
        assert!(err.to_string().contains("invalid request"));
    }

    #[tokio::test]
    async fn match_person_sends_names_only_with_organization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/people/match"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "person": {"id": "p1", "first_name": "Dana", "departments": null}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let partial = client
            .match_person(&PersonMatch {
                email: Some("dana@valleyimaging.com".into()),
                first_name: Some("Dana".into()),
                last_name: Some("Reyes".into()),
                organization_name: None,
            })
            .await
            .expect("match");
        assert!(partial.is_some_and(|p| p.departments.is_empty()));

        client
            .match_person(&PersonMatch {
                email: None,
                first_name: Some("Dana".into()),
                last_name: Some("Reyes".into()),
                organization_name: Some("Valley Imaging".into()),
            })
            .await
            .expect("match");

        let requests = server.received_requests().await.expect("recording enabled");
        let first: Value = requests[0].body_json().expect("json body");
        assert_eq!(first["email"], "dana@valleyimaging.com");
        assert!(first.get("first_name").is_none());
        assert!(first.get("last_name").is_none());

        let second: Value = requests[1].body_json().expect("json body");
        assert!(second.get("email").is_none());
        assert_eq!(second["first_name"], "Dana");
        assert_eq!(second["last_name"], "Reyes");
        assert_eq!(second["organization_name"], "Valley Imaging");
    }

    #[tokio::test]
    async fn null_lists_in_search_results_are_tolerated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organizations/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organizations": [{"id": "o1", "name": "Valley Imaging", "technology_names": null}],
                "accounts": null
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let orgs = client
            .search_organizations(&OrgQuery {
                name: Some("Valley Imaging".into()),
                ..OrgQuery::default()
            })
            .await
            .expect("search");

        assert_eq!(orgs.len(), 1);
        assert!(orgs[0].technology_names.is_empty());
    }

    #[tokio::test]
    async fn reveal_contact_returns_person() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/people/p1/reveal"))
            .and(body_partial_json(json!({"api_key": "test-key"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "person": {"id": "p1", "email": "dana@valleyimaging.com"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let person = client.reveal_contact("p1").await.expect("reveal");
        assert_eq!(
            person.and_then(|p| p.email).as_deref(),
            Some("dana@valleyimaging.com")
        );
    }
}
