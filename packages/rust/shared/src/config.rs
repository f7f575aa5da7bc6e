//! Application configuration for Flux Sales.
//!
//! User config lives at `~/.fluxsales/fluxsales.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored here; each section names the env var to read.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FluxSalesError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "fluxsales.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".fluxsales";

// ---------------------------------------------------------------------------
// Config structs (matching fluxsales.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenAI chat completion settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Apollo.io settings.
    #[serde(default)]
    pub apollo: ApolloConfig,

    /// Google Custom Search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Website scrape policy.
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Chat model used for every generation stage.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for generation stages.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Products pitched when the caller names none.
    #[serde(default = "default_target_products")]
    pub target_products: Vec<String>,

    /// Playbook archive database path (`~` is expanded).
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            target_products: default_target_products(),
            db_path: default_db_path(),
        }
    }
}

fn default_model() -> String {
    "gpt-4".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_target_products() -> Vec<String> {
    vec!["DICOM Printer 2".into(), "Capacitor".into()]
}
fn default_db_path() -> String {
    "~/.fluxsales/db/flux_playbooks.db".into()
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    /// Base URL of the chat completions API.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_key_env(),
            base_url: default_openai_base_url(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_openai_timeout() -> u64 {
    120
}

/// `[apollo]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApolloConfig {
    /// Name of the env var holding the Apollo.io key. The key is optional.
    #[serde(default = "default_apollo_key_env")]
    pub api_key_env: String,

    /// Apollo REST base URL.
    #[serde(default = "default_apollo_base_url")]
    pub base_url: String,
}

impl Default for ApolloConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_apollo_key_env(),
            base_url: default_apollo_base_url(),
        }
    }
}

fn default_apollo_key_env() -> String {
    "APOLLO_API_KEY".into()
}
fn default_apollo_base_url() -> String {
    "https://api.apollo.io/v1".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Env var holding the Google API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Env var holding the Custom Search engine id (`cx`).
    #[serde(default = "default_search_engine_env")]
    pub engine_id_env: String,

    /// Custom Search endpoint.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            engine_id_env: default_search_engine_env(),
            base_url: default_search_base_url(),
        }
    }
}

fn default_search_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_search_engine_env() -> String {
    "GOOGLE_CSE_ID".into()
}
fn default_search_base_url() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}

/// `[scrape]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// How many candidate pages to request per site.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Concurrent page requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-page request timeout.
    #[serde(default = "default_scrape_timeout")]
    pub timeout_secs: u64,

    /// User-Agent sent with scrape requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            concurrency: default_concurrency(),
            timeout_secs: default_scrape_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_pages() -> usize {
    15
}
fn default_concurrency() -> usize {
    5
}
fn default_scrape_timeout() -> u64 {
    10
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36"
        .into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.fluxsales/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FluxSalesError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.fluxsales/fluxsales.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FluxSalesError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| FluxSalesError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FluxSalesError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| FluxSalesError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FluxSalesError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a non-empty value from the env var `var_name`.
pub fn resolve_key(var_name: &str) -> Option<String> {
    std::env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Return the OpenAI API key, or a config error naming the env var to set.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openai.api_key_env;
    resolve_key(var_name).ok_or_else(|| {
        FluxSalesError::config(format!(
            "OpenAI API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://platform.openai.com/api-keys"
        ))
    })
}

/// Google search credentials as `(api_key, engine_id)`, when both are set.
pub fn search_credentials(config: &AppConfig) -> Option<(String, String)> {
    let key = resolve_key(&config.search.api_key_env)?;
    let cx = resolve_key(&config.search.engine_id_env)?;
    Some((key, cx))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("APOLLO_API_KEY"));
        assert!(toml_str.contains("max_pages"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.model, "gpt-4");
        assert_eq!(parsed.scrape.max_pages, 15);
        assert_eq!(parsed.scrape.concurrency, 5);
        assert_eq!(
            parsed.defaults.target_products,
            vec!["DICOM Printer 2", "Capacitor"]
        );
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
model = "gpt-4o"

[scrape]
max_pages = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.model, "gpt-4o");
        assert!((config.defaults.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.scrape.max_pages, 5);
        assert_eq!(config.scrape.timeout_secs, 10);
        assert_eq!(config.apollo.base_url, "https://api.apollo.io/v1");
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Unique env var name so parallel tests never collide
        config.openai.api_key_env = "FS_TEST_NONEXISTENT_KEY_31337".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }

    #[test]
    fn missing_search_credentials() {
        let mut config = AppConfig::default();
        config.search.api_key_env = "FS_TEST_NO_GOOGLE_KEY_31337".into();
        assert!(search_credentials(&config).is_none());
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/tmp/db.sqlite"), PathBuf::from("/tmp/db.sqlite"));
        let expanded = expand_home("~/x.db");
        assert!(expanded.ends_with("x.db"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
