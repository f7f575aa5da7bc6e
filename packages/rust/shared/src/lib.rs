//! Shared types, error model, and configuration for Flux Sales.
//!
//! This crate is the foundation depended on by all other Flux Sales crates.
//! It provides:
//! - [`FluxSalesError`], the unified error type
//! - Domain types ([`Organization`], [`Contact`], [`FacilityDetails`], [`Product`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ApolloConfig, DefaultsConfig, OpenAiConfig, ScrapeConfig, SearchConfig,
    config_dir, config_file_path, expand_home, init_config, load_config, load_config_from,
    resolve_key, search_credentials, validate_api_key,
};
pub use error::{FluxSalesError, Result};
pub use types::{Contact, FacilityDetails, Organization, PlaybookId, Product, null_as_empty};
