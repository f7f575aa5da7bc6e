//! End-to-end sales package generation: scrape → research → infer → stages → archive.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use fluxsales_apollo::ApolloSnapshot;
use fluxsales_knowledge::ProductKnowledge;
use fluxsales_research::{SearchClient, targeted_summary};
use fluxsales_scraper::{WebsiteIntel, WebsiteScraper};
use fluxsales_shared::{Contact, FacilityDetails, FluxSalesError, PlaybookId, Product, Result};
use fluxsales_storage::{NewPlaybook, Storage};

use crate::agents::JSON_VALIDATOR;
use crate::llm::{ChatMessage, ChatModel, ChatRequest};
use crate::parse::parse_agent_output;
use crate::prompts::{PromptInputs, Stage, clean_stage_output, json_validation_prompt, stage_prompt};

/// Cache key for the JSON clean-up pass that follows inference.
const INFERENCE_JSON_PASS: &str = "facility_inference_json";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Model settings shared by every LLM call in a run.
pub struct Generator<'a> {
    pub chat: &'a dyn ChatModel,
    pub knowledge: &'a ProductKnowledge,
    /// Playbook archive; also holds the generation cache.
    pub storage: &'a Storage,
    pub model: String,
    pub temperature: f32,
}

/// Optional data sources consulted before generation.
#[derive(Default, Clone, Copy)]
pub struct Sources<'a> {
    pub scraper: Option<&'a WebsiteScraper>,
    pub search: Option<&'a SearchClient>,
}

/// What the rep asked for.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub facility: FacilityDetails,
    /// Empty means the default pitch.
    pub products: Vec<Product>,
    pub apollo: Option<ApolloSnapshot>,
    /// Contacts imported from CSV, added to Apollo's for stakeholder mapping.
    pub contacts: Vec<Contact>,
    pub skip_inference: bool,
}

/// Token and cache accounting for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

/// The generated package, as archived and exported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesPackage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PlaybookId>,
    pub timestamp: DateTime<Utc>,
    /// Facility details after inference filled the gaps.
    pub facility_details: FacilityDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_facility_details: Option<FacilityDetails>,
    pub target_products: Vec<Product>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apollo_data: Option<ApolloSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_data: Option<WebsiteIntel>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub search_summary: String,
    /// Stage output, or "Error generating ..." for a stage that failed.
    #[serde(default)]
    pub stages: BTreeMap<Stage, String>,
    #[serde(default)]
    pub usage: RunStats,
    pub model: String,
}

impl SalesPackage {
    pub fn stage(&self, stage: Stage) -> Option<&str> {
        self.stages.get(&stage).map(String::as_str)
    }

    /// Stages whose output is an error message.
    pub fn failed_stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|(_, text)| text.starts_with("Error generating "))
            .map(|(stage, _)| *stage)
            .collect()
    }
}

/// Inferred profile plus the text it was parsed from.
#[derive(Debug, Clone)]
pub struct Inference {
    pub details: FacilityDetails,
    pub raw: String,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each LLM stage runs.
    fn stage_started(&self, stage: Stage, current: usize, total: usize);
    /// Called when the package is assembled and saved.
    fn done(&self, package: &SalesPackage);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn stage_started(&self, _stage: Stage, _current: usize, _total: usize) {}
    fn done(&self, _package: &SalesPackage) {}
}

// ---------------------------------------------------------------------------
// Cached completion
// ---------------------------------------------------------------------------

/// Compute a prompt hash for cache keying.
fn prompt_hash(system: &str, prompt: &str, stage: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(system.as_bytes());
    hasher.update(prompt.as_bytes());
    hasher.update(stage.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Generator<'_> {
    async fn complete_cached(
        &self,
        cache_stage: &str,
        system: String,
        prompt: String,
        stats: &mut RunStats,
    ) -> Result<String> {
        let hash = prompt_hash(&system, &prompt, cache_stage);

        if let Some(cached) = self
            .storage
            .get_cached_generation(cache_stage, &hash, &self.model)
            .await?
        {
            debug!(stage = cache_stage, "generation cache hit");
            stats.cache_hits += 1;
            return Ok(cached);
        }

        let request = ChatRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages: vec![ChatMessage::system(system), ChatMessage::user(prompt)],
        };
        let reply = self.chat.complete(&request).await?;
        stats.tokens_in += reply.tokens_in;
        stats.tokens_out += reply.tokens_out;
        stats.cache_misses += 1;

        if let Err(e) = self
            .storage
            .set_cached_generation(cache_stage, &hash, &self.model, &reply.text)
            .await
        {
            warn!(stage = cache_stage, error = %e, "failed to cache generation");
        }
        Ok(reply.text)
    }

    /// Run one stage and clean its reply.
    pub async fn run_stage(
        &self,
        stage: Stage,
        inputs: &PromptInputs<'_>,
        previous: &BTreeMap<Stage, String>,
        stats: &mut RunStats,
    ) -> Result<String> {
        let system = stage.persona().system_prompt(self.knowledge, inputs.products);
        let prompt = stage_prompt(stage, inputs, previous);
        let text = self.complete_cached(stage.as_str(), system, prompt, stats).await?;
        let cleaned = clean_stage_output(&text);
        if cleaned.is_empty() {
            return Err(FluxSalesError::Generation(format!("{} returned no text", stage.label())));
        }
        Ok(cleaned)
    }

    /// Infer a facility profile from whatever `inputs` carries.
    ///
    /// The inference reply goes through a JSON clean-up pass before it is
    /// parsed. If the cleaned text cannot be read the original reply is
    /// tried.
    #[instrument(skip_all, fields(facility = %inputs.facility.name))]
    pub async fn infer_facility_details(
        &self,
        inputs: &PromptInputs<'_>,
        stats: &mut RunStats,
    ) -> Result<Inference> {
        let system = Stage::FacilityInference
            .persona()
            .system_prompt(self.knowledge, inputs.products);
        let prompt = stage_prompt(Stage::FacilityInference, inputs, &BTreeMap::new());
        let raw = self
            .complete_cached(Stage::FacilityInference.as_str(), system, prompt, stats)
            .await?;

        let validated = self
            .complete_cached(
                INFERENCE_JSON_PASS,
                JSON_VALIDATOR.identity(),
                json_validation_prompt(&raw),
                stats,
            )
            .await?;

        let details = match parse_agent_output(&validated) {
            Ok(details) => details,
            Err(e) => {
                debug!(error = %e, "validated output unreadable, parsing raw reply");
                parse_agent_output(&raw)?
            }
        };
        info!(
            location = details.location.as_deref().unwrap_or(""),
            pain_points = details.pain_points.len(),
            "facility details inferred"
        );
        Ok(Inference { details, raw: validated })
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Generate, archive and return a complete sales package.
///
/// 1. Scrape the website (failure is recorded, not fatal)
/// 2. Targeted search summary
/// 3. Facility inference, merged into the given details
/// 4. Remaining stages in order, each building on earlier output
/// 5. Save to the playbook archive
#[instrument(skip_all, fields(facility = %request.facility.name))]
pub async fn generate_sales_package(
    generator: &Generator<'_>,
    sources: Sources<'_>,
    request: GenerateRequest,
    progress: &dyn ProgressReporter,
) -> Result<SalesPackage> {
    let start = Instant::now();
    let GenerateRequest {
        mut facility,
        products,
        apollo,
        contacts,
        skip_inference,
    } = request;

    facility.name = facility.name.trim().to_string();
    if facility.name.is_empty() {
        return Err(FluxSalesError::validation("facility name is required"));
    }
    let products = if products.is_empty() {
        Product::defaults()
    } else {
        products
    };
    let website_url = facility
        .website_url
        .clone()
        .filter(|u| !u.trim().is_empty());
    let apollo = apollo.filter(|a| !a.is_empty());
    let mut stats = RunStats::default();
    let mut stages = BTreeMap::new();

    info!(products = products.len(), website = website_url.is_some(), "starting package generation");

    // --- Phase 1: Website ---
    let website_data = match (&website_url, sources.scraper) {
        (Some(url), Some(scraper)) => {
            progress.phase("Scanning website");
            Some(match scraper.scrape(url).await {
                Ok(intel) => intel,
                Err(e) => {
                    warn!(url = %url, error = %e, "website scan failed");
                    WebsiteIntel {
                        url: url.clone(),
                        error: Some(e.to_string()),
                        ..WebsiteIntel::default()
                    }
                }
            })
        }
        _ => None,
    };

    // --- Phase 2: Search ---
    let search_summary = match sources.search {
        Some(client) => {
            progress.phase("Searching for recent news");
            let location = facility.location.as_deref().unwrap_or("");
            targeted_summary(client, &facility.name, location).await
        }
        None => String::new(),
    };

    let total = if skip_inference { Stage::ALL.len() - 1 } else { Stage::ALL.len() };
    let mut current = 0;

    // --- Phase 3: Inference ---
    let mut inferred_facility_details = None;
    if !skip_inference {
        progress.phase("Inferring facility details");
        current += 1;
        progress.stage_started(Stage::FacilityInference, current, total);
        let inputs = PromptInputs {
            facility: &facility,
            website: website_data.as_ref(),
            apollo: apollo.as_ref(),
            search_summary: &search_summary,
            products: &products,
            contacts: &contacts,
        };
        match generator.infer_facility_details(&inputs, &mut stats).await {
            Ok(inference) => {
                stages.insert(Stage::FacilityInference, inference.raw);
                facility.merge_from(&inference.details);
                inferred_facility_details = Some(inference.details);
            }
            Err(e) => {
                warn!(error = %e, "facility inference failed");
                stages.insert(Stage::FacilityInference, stage_error(Stage::FacilityInference, &e));
            }
        }
    }

    // --- Phase 4: Stages ---
    progress.phase("Generating sales package");
    let inputs = PromptInputs {
        facility: &facility,
        website: website_data.as_ref(),
        apollo: apollo.as_ref(),
        search_summary: &search_summary,
        products: &products,
        contacts: &contacts,
    };
    let mut previous = BTreeMap::new();
    for stage in Stage::ALL.into_iter().skip(1) {
        current += 1;
        progress.stage_started(stage, current, total);

        match generator.run_stage(stage, &inputs, &previous, &mut stats).await {
            Ok(text) => {
                previous.insert(stage, text.clone());
                stages.insert(stage, text);
            }
            Err(e) => {
                warn!(stage = %stage, error = %e, "stage failed");
                stages.insert(stage, stage_error(stage, &e));
            }
        }
    }

    let mut package = SalesPackage {
        id: None,
        timestamp: Utc::now(),
        facility_details: facility,
        inferred_facility_details,
        target_products: products,
        website_url,
        apollo_data: apollo,
        website_data,
        search_summary,
        stages,
        usage: stats,
        model: generator.model.clone(),
    };

    // --- Phase 5: Archive ---
    progress.phase("Saving playbook");
    let package_json = serde_json::to_string(&package)
        .map_err(|e| FluxSalesError::Storage(format!("failed to serialize package: {e}")))?;
    let product_names: Vec<String> = package.target_products.iter().map(|p| p.name().to_string()).collect();
    let id = generator
        .storage
        .save_playbook(&NewPlaybook {
            facility_name: &package.facility_details.name,
            facility_location: package.facility_details.location.as_deref(),
            target_products: &product_names,
            complete_playbook: package.stage(Stage::CompletePlaybook).unwrap_or_default(),
            package_json: &package_json,
        })
        .await?;
    package.id = Some(id);

    info!(
        id = ?package.id,
        failed = package.failed_stages().len(),
        tokens_in = stats.tokens_in,
        tokens_out = stats.tokens_out,
        cache_hits = stats.cache_hits,
        cache_misses = stats.cache_misses,
        duration_ms = start.elapsed().as_millis(),
        "sales package generated"
    );
    progress.done(&package);
    Ok(package)
}

fn stage_error(stage: Stage, error: &FluxSalesError) -> String {
    format!("Error generating {}: {error}", stage.label())
}

/// Read an archived package back from its JSON.
pub fn package_from_json(json: &str) -> Result<SalesPackage> {
    serde_json::from_str(json).map_err(|e| FluxSalesError::parse(format!("invalid archived package: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedChat;
    use fluxsales_shared::ScrapeConfig;
    use uuid::Uuid;

    const PROFILE: &str = r#"{"name": "Metro Imaging", "location": "Chicago, IL",
        "type": "Outpatient imaging", "pain_points": ["Slow prior retrieval"]}"#;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("fs_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn generator<'a>(chat: &'a ScriptedChat, knowledge: &'a ProductKnowledge, storage: &'a Storage) -> Generator<'a> {
        Generator {
            chat,
            knowledge,
            storage,
            model: "gpt-4".into(),
            temperature: 0.7,
        }
    }

    fn request(skip_inference: bool) -> GenerateRequest {
        GenerateRequest {
            facility: FacilityDetails::named("Metro Imaging"),
            skip_inference,
            ..GenerateRequest::default()
        }
    }

    #[tokio::test]
    async fn full_run_merges_inference_and_archives() {
        let storage = test_storage().await;
        let knowledge = ProductKnowledge::load().unwrap();
        let chat = ScriptedChat::always(PROFILE);
        let generator = generator(&chat, &knowledge, &storage);

        let package = generate_sales_package(&generator, Sources::default(), request(false), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(chat.calls(), Stage::ALL.len() + 1);
        assert_eq!(package.facility_details.location.as_deref(), Some("Chicago, IL"));
        assert_eq!(
            package.inferred_facility_details.as_ref().and_then(|d| d.facility_type.as_deref()),
            Some("Outpatient imaging")
        );
        assert_eq!(package.target_products, Product::defaults());
        assert_eq!(package.stages.len(), Stage::ALL.len());
        assert!(package.failed_stages().is_empty());
        assert_eq!(package.usage.cache_misses, Stage::ALL.len() + 1);
        assert_eq!(package.usage.tokens_in, 10 * (Stage::ALL.len() as u64 + 1));

        let id = package.id.clone().unwrap();
        let stored = storage.get_playbook(&id).await.unwrap().unwrap();
        assert_eq!(stored.meta.facility_name, "Metro Imaging");
        let restored = package_from_json(&stored.package_json).unwrap();
        assert_eq!(restored.stage(Stage::CompletePlaybook), package.stage(Stage::CompletePlaybook));
    }

    #[tokio::test]
    async fn rerun_is_served_from_cache() {
        let storage = test_storage().await;
        let knowledge = ProductKnowledge::load().unwrap();
        let chat = ScriptedChat::always("Lead with Capacitor.");
        let generator = generator(&chat, &knowledge, &storage);

        generate_sales_package(&generator, Sources::default(), request(true), &SilentProgress)
            .await
            .unwrap();
        let calls = chat.calls();
        let second = generate_sales_package(&generator, Sources::default(), request(true), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(calls, Stage::ALL.len() - 1);
        assert_eq!(chat.calls(), calls);
        assert_eq!(second.usage.cache_hits, Stage::ALL.len() - 1);
        assert_eq!(second.usage.cache_misses, 0);
        assert_eq!(storage.list_playbooks().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failing_stage_is_recorded_and_run_continues() {
        let storage = test_storage().await;
        let knowledge = ProductKnowledge::load().unwrap();
        let mut script = vec![Err(FluxSalesError::Generation("upstream timeout".into()))];
        script.extend((1..Stage::ALL.len() - 1).map(|_| Ok("Analysis.".to_string())));
        let chat = ScriptedChat::new(script);
        let generator = generator(&chat, &knowledge, &storage);

        let package = generate_sales_package(&generator, Sources::default(), request(true), &SilentProgress)
            .await
            .unwrap();

        let failed = package.stage(Stage::StakeholderEcosystem).unwrap();
        assert!(failed.starts_with("Error generating "));
        assert!(failed.contains("upstream timeout"));
        assert_eq!(package.failed_stages(), vec![Stage::StakeholderEcosystem]);
        assert_eq!(package.stage(Stage::CompletePlaybook), Some("Analysis."));
        assert!(package.stage(Stage::FacilityInference).is_none());
    }

    #[tokio::test]
    async fn refused_website_is_recorded_not_fatal() {
        let storage = test_storage().await;
        let knowledge = ProductKnowledge::load().unwrap();
        let chat = ScriptedChat::always("Analysis.");
        let generator = generator(&chat, &knowledge, &storage);
        let scraper = WebsiteScraper::new(ScrapeConfig::default()).unwrap();

        let mut req = request(true);
        req.facility.website_url = Some("http://127.0.0.1:9/".into());
        let sources = Sources {
            scraper: Some(&scraper),
            search: None,
        };
        let package = generate_sales_package(&generator, sources, req, &SilentProgress)
            .await
            .unwrap();

        let intel = package.website_data.as_ref().unwrap();
        assert!(intel.error.as_deref().unwrap().contains("refusing"));
        assert_eq!(package.website_url.as_deref(), Some("http://127.0.0.1:9/"));
        assert!(chat.prompt(0).contains("No website data available."));
    }

    #[tokio::test]
    async fn unreadable_validation_falls_back_to_raw_reply() {
        let knowledge = ProductKnowledge::load().unwrap();
        let facility = FacilityDetails::named("Metro Imaging");
        let products = Product::defaults();
        let inputs = PromptInputs {
            facility: &facility,
            website: None,
            apollo: None,
            search_summary: "",
            products: &products,
            contacts: &[],
        };

        for validated in ["I'm sorry, I can't reformat that.", "{}"] {
            let storage = test_storage().await;
            let chat = ScriptedChat::new(vec![Ok(PROFILE.to_string()), Ok(validated.to_string())]);
            let generator = generator(&chat, &knowledge, &storage);
            let mut stats = RunStats::default();

            let inference = generator.infer_facility_details(&inputs, &mut stats).await.unwrap();

            assert_eq!(chat.calls(), 2);
            assert_eq!(inference.details.location.as_deref(), Some("Chicago, IL"));
            assert_eq!(inference.details.pain_points, vec!["Slow prior retrieval".to_string()]);
            assert_eq!(stats.cache_misses, 2);
        }
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let storage = test_storage().await;
        let knowledge = ProductKnowledge::load().unwrap();
        let chat = ScriptedChat::new(vec![]);
        let generator = generator(&chat, &knowledge, &storage);

        let err = generate_sales_package(
            &generator,
            Sources::default(),
            GenerateRequest {
                facility: FacilityDetails::named("  "),
                ..GenerateRequest::default()
            },
            &SilentProgress,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FluxSalesError::Validation { .. }));
        assert_eq!(chat.calls(), 0);
    }

    #[test]
    fn stage_keys_serialize_by_name() {
        let mut stages = BTreeMap::new();
        stages.insert(Stage::RoiAnalysis, "ROI".to_string());
        let json = serde_json::to_string(&stages).unwrap();
        assert_eq!(json, r#"{"roi_analysis":"ROI"}"#);
    }
}
