//! Apollo.io company and contact lookups.
//!
//! - [`ApolloClient`] wraps the REST endpoints used for prospecting
//! - [`clean_website_url`] normalizes a user-typed website to a bare domain
//! - [`ApolloSnapshot`] is what a sales package keeps from Apollo

pub mod client;

use serde::{Deserialize, Serialize};
use url::Url;

use fluxsales_shared::{Contact, Organization};

pub use client::{ApolloClient, DEFAULT_BASE_URL, OrgQuery, PeopleQuery, PersonMatch};

/// Organization and contacts attached to a generated sales package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApolloSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl ApolloSnapshot {
    pub fn is_empty(&self) -> bool {
        self.organization.is_none() && self.contacts.is_empty()
    }
}

/// Reduce a website to the bare domain Apollo searches on.
///
/// Input that does not look like a URL (no `/` and no `.`) is returned
/// trimmed. `www.` is dropped.
pub fn clean_website_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if !(trimmed.contains('/') || trimmed.contains('.')) {
        return trimmed.to_string();
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    match Url::parse(&with_scheme) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
            None => trimmed.to_string(),
        },
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_scheme_path_and_www() {
        assert_eq!(
            clean_website_url("https://www.valleyimaging.com/about-us"),
            "valleyimaging.com"
        );
        assert_eq!(clean_website_url("  lakesideradiology.org "), "lakesideradiology.org");
        assert_eq!(clean_website_url("http://imaging.example.net"), "imaging.example.net");
    }

    #[test]
    fn clean_leaves_plain_names_alone() {
        assert_eq!(clean_website_url("Valley Imaging"), "Valley Imaging");
        assert_eq!(clean_website_url(""), "");
    }

    #[test]
    fn snapshot_emptiness() {
        assert!(ApolloSnapshot::default().is_empty());
        let snap = ApolloSnapshot {
            organization: Some(Organization::default()),
            contacts: vec![],
        };
        assert!(!snap.is_empty());
    }
}
