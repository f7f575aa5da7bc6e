//! CLI command definitions, routing, and tracing setup.

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use fluxsales_apollo::{ApolloClient, ApolloSnapshot, OrgQuery, PeopleQuery};
use fluxsales_core::prompts::website_intel_summary;
use fluxsales_core::{
    ContactColumns, GenerateRequest, Generator, OpenAiChat, ProgressReporter, PromptInputs,
    RunStats, SalesPackage, SiteValidator, Sources, Stage, export_file_stem,
    generate_sales_package, import_contacts_csv, package_from_json, render_json, render_markdown,
};
use fluxsales_knowledge::ProductKnowledge;
use fluxsales_research::{SearchClient, research_facility, targeted_summary};
use fluxsales_scraper::{WebsiteIntel, WebsiteScraper};
use fluxsales_shared::{
    AppConfig, FacilityDetails, PlaybookId, Product, ScrapeConfig, expand_home, init_config,
    load_config, resolve_key, search_credentials, validate_api_key,
};
use fluxsales_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Flux Sales: prospect research and sales packages for healthcare imaging.
#[derive(Parser)]
#[command(
    name = "fluxsales",
    version,
    about = "Research healthcare imaging prospects and generate Flux sales packages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Export format for archived playbooks.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ExportFormat {
    Md,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Look up organizations and people in Apollo.io.
    Apollo {
        #[command(subcommand)]
        action: ApolloAction,
    },

    /// Scan a facility website for sales intelligence.
    Scrape {
        /// Website URL or bare domain.
        url: String,

        /// Candidate pages to request (overrides config).
        #[arg(long)]
        max_pages: Option<usize>,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Research a facility with Google Custom Search.
    Research {
        /// Facility name.
        name: String,

        #[arg(long)]
        location: Option<String>,
    },

    /// Infer a facility profile from its name, website and search results.
    Infer {
        #[arg(long)]
        name: String,

        #[arg(long)]
        website: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// Check that a website belongs to a company.
    ValidateSite {
        #[arg(long)]
        company: String,

        #[arg(long)]
        url: String,
    },

    /// Generate and archive a complete sales package.
    Generate(GenerateArgs),

    /// Browse archived playbooks.
    Playbooks {
        #[command(subcommand)]
        action: PlaybookAction,
    },

    /// Show the product catalog, or one product in detail.
    Products {
        /// Product name, e.g. "capacitor".
        name: Option<Product>,
    },

    /// Manage the generation cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Apollo.io subcommands.
#[derive(Subcommand)]
pub(crate) enum ApolloAction {
    /// Search organizations by domain or name.
    Orgs {
        #[arg(long)]
        domain: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Search people at an organization.
    People {
        #[arg(long)]
        org_id: String,

        /// Job title filter (repeatable).
        #[arg(long = "title")]
        titles: Vec<String>,

        /// Seniority filter, e.g. director (repeatable).
        #[arg(long = "seniority")]
        seniorities: Vec<String>,

        /// Department filter (repeatable).
        #[arg(long = "department")]
        departments: Vec<String>,

        #[arg(long, default_value = "25")]
        limit: u32,
    },
    /// Enrich an organization from its domain.
    Enrich {
        domain: String,
    },
}

#[derive(clap::Args)]
pub(crate) struct GenerateArgs {
    /// Facility name.
    #[arg(long)]
    name: String,

    #[arg(long)]
    website: Option<String>,

    #[arg(long)]
    location: Option<String>,

    /// Facility type, e.g. "Outpatient imaging center".
    #[arg(long = "type")]
    facility_type: Option<String>,

    #[arg(long)]
    size: Option<String>,

    /// Current PACS/RIS and imaging infrastructure.
    #[arg(long)]
    infrastructure: Option<String>,

    #[arg(long)]
    challenge: Option<String>,

    #[arg(long)]
    events: Option<String>,

    #[arg(long)]
    budget: Option<String>,

    /// Known pain point (repeatable).
    #[arg(long = "pain")]
    pain_points: Vec<String>,

    /// Product to pitch (repeatable). Defaults to the configured products.
    #[arg(long = "product")]
    products: Vec<Product>,

    /// Attach Apollo.io organization and contacts for this domain.
    #[arg(long)]
    apollo_domain: Option<String>,

    /// CSV file of known contacts.
    #[arg(long)]
    contacts: Option<PathBuf>,

    /// Contacts CSV column holding the full name.
    #[arg(long, default_value = "Name")]
    name_col: String,

    #[arg(long, requires = "contacts")]
    title_col: Option<String>,

    #[arg(long, requires = "contacts")]
    company_col: Option<String>,

    #[arg(long, requires = "contacts")]
    email_col: Option<String>,

    #[arg(long, requires = "contacts")]
    phone_col: Option<String>,

    #[arg(long, requires = "contacts")]
    industry_col: Option<String>,

    /// Use the facility details as given.
    #[arg(long)]
    skip_inference: bool,

    /// Chat model (overrides config).
    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    temperature: Option<f32>,

    /// Directory, or file path whose stem names both the Markdown and JSON exports.
    #[arg(long)]
    out: Option<PathBuf>,
}

/// Playbook archive subcommands.
#[derive(Subcommand)]
pub(crate) enum PlaybookAction {
    /// List archived playbooks, newest first.
    List,
    /// Find playbooks by facility name or location.
    Search {
        term: String,
    },
    /// Print a playbook as Markdown.
    Show {
        id: String,
    },
    /// Write a playbook to a file.
    Export {
        id: String,

        #[arg(long, value_enum, default_value = "md")]
        format: ExportFormat,

        /// Output file or directory (defaults to the current directory).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Remove a playbook from the archive.
    Delete {
        id: String,
    },
}

/// Generation cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Drop every cached stage output.
    Clear,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "fluxsales=info",
        1 => "fluxsales=debug",
        _ => "fluxsales=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Apollo { action } => cmd_apollo(action).await,
        Command::Scrape {
            url,
            max_pages,
            json,
        } => cmd_scrape(&url, max_pages, json).await,
        Command::Research { name, location } => cmd_research(&name, location.as_deref()).await,
        Command::Infer {
            name,
            website,
            location,
        } => cmd_infer(name, website, location).await,
        Command::ValidateSite { company, url } => cmd_validate_site(&company, &url).await,
        Command::Generate(args) => cmd_generate(args).await,
        Command::Playbooks { action } => match action {
            PlaybookAction::List => cmd_playbooks_list(None).await,
            PlaybookAction::Search { term } => cmd_playbooks_list(Some(&term)).await,
            PlaybookAction::Show { id } => cmd_playbooks_show(&id).await,
            PlaybookAction::Export { id, format, out } => {
                cmd_playbooks_export(&id, format, out.as_deref()).await
            }
            PlaybookAction::Delete { id } => cmd_playbooks_delete(&id).await,
        },
        Command::Products { name } => cmd_products(name),
        Command::Cache { action } => match action {
            CacheAction::Clear => cmd_cache_clear().await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Client setup
// ---------------------------------------------------------------------------

fn apollo_client(config: &AppConfig) -> Result<ApolloClient> {
    let var = &config.apollo.api_key_env;
    let key = resolve_key(var)
        .ok_or_else(|| eyre!("Apollo API key not found. Set the {var} environment variable."))?;
    Ok(ApolloClient::new(key, config.apollo.base_url.as_str())?)
}

/// Search is optional; without credentials the pipeline skips it.
fn search_client(config: &AppConfig) -> Result<Option<SearchClient>> {
    match search_credentials(config) {
        Some((key, cx)) => Ok(Some(SearchClient::new(key, cx, config.search.base_url.as_str())?)),
        None => {
            info!(
                key_env = %config.search.api_key_env,
                engine_env = %config.search.engine_id_env,
                "search credentials not set, skipping web search"
            );
            Ok(None)
        }
    }
}

fn chat_client(config: &AppConfig) -> Result<OpenAiChat> {
    let key = validate_api_key(config)?;
    Ok(OpenAiChat::new(
        key,
        config.openai.base_url.as_str(),
        config.openai.timeout_secs,
    )?)
}

async fn open_storage(config: &AppConfig) -> Result<Storage> {
    Ok(Storage::open(&expand_home(&config.defaults.db_path)).await?)
}

async fn open_storage_readonly(config: &AppConfig) -> Result<Storage> {
    Ok(Storage::open_readonly(&expand_home(&config.defaults.db_path)).await?)
}

fn parse_id(id: &str) -> Result<PlaybookId> {
    id.parse().map_err(|e| eyre!("invalid playbook id '{id}': {e}"))
}

fn configured_products(config: &AppConfig) -> Vec<Product> {
    config
        .defaults
        .target_products
        .iter()
        .filter_map(|name| match name.parse() {
            Ok(product) => Some(product),
            Err(e) => {
                warn!(product = %name, error = %e, "ignoring unknown product in config");
                None
            }
        })
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Apollo
// ---------------------------------------------------------------------------

async fn cmd_apollo(action: ApolloAction) -> Result<()> {
    let config = load_config()?;
    let client = apollo_client(&config)?;

    match action {
        ApolloAction::Orgs {
            domain,
            name,
            limit,
        } => {
            if domain.is_none() && name.is_none() {
                return Err(eyre!("pass --domain or --name"));
            }
            let orgs = client
                .search_organizations(&OrgQuery {
                    domain,
                    name,
                    limit,
                })
                .await?;
            if orgs.is_empty() {
                println!("No organizations found.");
            }
            for org in &orgs {
                println!(
                    "{}  {}",
                    org.id.as_deref().unwrap_or("-"),
                    org.name.as_deref().unwrap_or("Unknown")
                );
                if let Some(domain) = org.primary_domain.as_deref().or(org.website_url.as_deref()) {
                    println!("    {domain}");
                }
                if let Some(location) = org.location() {
                    println!("    {location}");
                }
                if let Some(employees) = org.estimated_num_employees {
                    println!("    ~{employees} employees");
                }
            }
        }
        ApolloAction::People {
            org_id,
            titles,
            seniorities,
            departments,
            limit,
        } => {
            let people = client
                .search_people(&PeopleQuery {
                    organization_id: Some(org_id),
                    titles,
                    departments,
                    seniorities,
                    limit,
                })
                .await?;
            if people.is_empty() {
                println!("No people found.");
            }
            for person in &people {
                println!(
                    "{}  {}  {}",
                    person.display_name(),
                    person.title.as_deref().unwrap_or("-"),
                    person.email.as_deref().unwrap_or("")
                );
            }
        }
        ApolloAction::Enrich { domain } => match client.enrich_domain(&domain).await? {
            Some(org) => print_json(&org)?,
            None => println!("No organization found for {domain}."),
        },
    }
    Ok(())
}

/// Organization plus its people, for attaching to a package.
async fn apollo_snapshot(client: &ApolloClient, domain: &str) -> Result<ApolloSnapshot> {
    let Some(organization) = client.enrich_domain(domain).await? else {
        warn!(domain, "Apollo has no organization for domain");
        return Ok(ApolloSnapshot::default());
    };
    let contacts = match organization.id.clone() {
        Some(id) => {
            client
                .search_people(&PeopleQuery {
                    organization_id: Some(id),
                    ..PeopleQuery::default()
                })
                .await?
        }
        None => Vec::new(),
    };
    Ok(ApolloSnapshot {
        organization: Some(organization),
        contacts,
    })
}

// ---------------------------------------------------------------------------
// Scrape / research / infer / validate
// ---------------------------------------------------------------------------

async fn cmd_scrape(url: &str, max_pages: Option<usize>, json: bool) -> Result<()> {
    let config = load_config()?;
    let scrape = ScrapeConfig {
        max_pages: max_pages.unwrap_or(config.scrape.max_pages),
        ..config.scrape.clone()
    };

    let reporter = CliProgress::new();
    reporter.phase(&format!("Scanning {url}"));
    let result = WebsiteScraper::new(scrape)?.scrape(url).await;
    reporter.finish();
    let intel = result?;

    if json {
        print_json(&intel)?;
    } else {
        println!("{}", website_intel_summary(Some(&intel)));
        if let Some(error) = &intel.error {
            println!("\nScan error: {error}");
        }
    }
    Ok(())
}

async fn cmd_research(name: &str, location: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let client = search_client(&config)?.ok_or_else(|| {
        eyre!(
            "search credentials not found. Set {} and {}.",
            config.search.api_key_env,
            config.search.engine_id_env
        )
    })?;

    let research = research_facility(&client, name, location).await;
    print_json(&research)
}

async fn cmd_infer(name: String, website: Option<String>, location: Option<String>) -> Result<()> {
    let config = load_config()?;
    let chat = chat_client(&config)?;
    let knowledge = ProductKnowledge::load()?;
    let storage = open_storage(&config).await?;
    let search = search_client(&config)?;
    let products = configured_products(&config);

    let facility = FacilityDetails {
        website_url: website.clone(),
        location,
        ..FacilityDetails::named(name)
    };

    let reporter = CliProgress::new();
    let website_data = match &website {
        Some(url) => {
            reporter.phase("Scanning website");
            Some(scan_or_record(&WebsiteScraper::new(config.scrape.clone())?, url).await)
        }
        None => None,
    };
    let search_summary = match &search {
        Some(client) => {
            reporter.phase("Searching");
            targeted_summary(client, &facility.name, facility.location.as_deref().unwrap_or("")).await
        }
        None => String::new(),
    };

    reporter.phase("Inferring facility details");
    let generator = Generator {
        chat: &chat,
        knowledge: &knowledge,
        storage: &storage,
        model: config.defaults.model.clone(),
        temperature: config.defaults.temperature,
    };
    let inputs = PromptInputs {
        facility: &facility,
        website: website_data.as_ref(),
        apollo: None,
        search_summary: &search_summary,
        products: &products,
        contacts: &[],
    };
    let mut stats = RunStats::default();
    let result = generator.infer_facility_details(&inputs, &mut stats).await;
    reporter.finish();

    let mut merged = facility;
    merged.merge_from(&result?.details);
    print_json(&merged)
}

async fn scan_or_record(scraper: &WebsiteScraper, url: &str) -> WebsiteIntel {
    match scraper.scrape(url).await {
        Ok(intel) => intel,
        Err(e) => {
            warn!(url, error = %e, "website scan failed");
            WebsiteIntel {
                url: url.to_string(),
                error: Some(e.to_string()),
                ..WebsiteIntel::default()
            }
        }
    }
}

async fn cmd_validate_site(company: &str, url: &str) -> Result<()> {
    let config = load_config()?;
    let chat = chat_client(&config)?;

    let verdict = SiteValidator::new()?
        .validate(&chat, &config.defaults.model, company, url)
        .await?;
    print_json(&verdict)
}

// ---------------------------------------------------------------------------
// Generate
// ---------------------------------------------------------------------------

async fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let config = load_config()?;
    let chat = chat_client(&config)?;
    let knowledge = ProductKnowledge::load()?;
    let storage = open_storage(&config).await?;
    let scraper = WebsiteScraper::new(config.scrape.clone())?;
    let search = search_client(&config)?;

    let apollo = match &args.apollo_domain {
        Some(domain) => Some(apollo_snapshot(&apollo_client(&config)?, domain).await?),
        None => None,
    };

    let contacts = match &args.contacts {
        Some(path) => {
            let file = File::open(path).map_err(|e| eyre!("cannot open {}: {e}", path.display()))?;
            let columns = ContactColumns {
                name: args.name_col.clone(),
                title: args.title_col.clone(),
                company: args.company_col.clone(),
                email: args.email_col.clone(),
                phone: args.phone_col.clone(),
                industry: args.industry_col.clone(),
            };
            import_contacts_csv(file, &columns)?
        }
        None => Vec::new(),
    };

    let products = if args.products.is_empty() {
        configured_products(&config)
    } else {
        args.products.clone()
    };

    let facility = FacilityDetails {
        name: args.name.clone(),
        website_url: args.website.clone(),
        location: args.location.clone(),
        facility_type: args.facility_type.clone(),
        size: args.size.clone(),
        current_infrastructure: args.infrastructure.clone(),
        key_challenge: args.challenge.clone(),
        recent_events: args.events.clone(),
        budget_cycle: args.budget.clone(),
        pain_points: args.pain_points.clone(),
    };

    let generator = Generator {
        chat: &chat,
        knowledge: &knowledge,
        storage: &storage,
        model: args.model.clone().unwrap_or_else(|| config.defaults.model.clone()),
        temperature: args.temperature.unwrap_or(config.defaults.temperature),
    };
    let sources = Sources {
        scraper: Some(&scraper),
        search: search.as_ref(),
    };
    let request = GenerateRequest {
        facility,
        products,
        apollo,
        contacts,
        skip_inference: args.skip_inference,
    };

    info!(facility = %args.name, model = %generator.model, "generating sales package");

    let reporter = CliProgress::new();
    let result = generate_sales_package(&generator, sources, request, &reporter).await;
    reporter.finish();
    let package = result?;

    println!();
    println!("  Sales package generated!");
    if let Some(id) = &package.id {
        println!("  ID:       {id}");
    }
    println!("  Facility: {}", package.facility_details.name);
    println!(
        "  Tokens:   {} in / {} out",
        package.usage.tokens_in, package.usage.tokens_out
    );
    println!(
        "  Cache:    {} hits / {} misses",
        package.usage.cache_hits, package.usage.cache_misses
    );
    let failed = package.failed_stages();
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|s| s.title()).collect();
        println!("  Failed:   {}", names.join(", "));
    }

    match &args.out {
        Some(dir) => {
            for format in [ExportFormat::Md, ExportFormat::Json] {
                let path = write_export(&package, format, dir, true)?;
                println!("  Wrote:    {}", path.display());
            }
        }
        None => {
            println!();
            println!("{}", package.stage(Stage::CompletePlaybook).unwrap_or("No playbook generated."));
        }
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Playbooks
// ---------------------------------------------------------------------------

async fn cmd_playbooks_list(term: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(&config).await?;

    let playbooks = match term {
        Some(term) => storage.search_playbooks(term).await?,
        None => storage.list_playbooks().await?,
    };
    if playbooks.is_empty() {
        println!("No playbooks found.");
        return Ok(());
    }

    for p in &playbooks {
        println!(
            "{}  {}  {}{}",
            p.id,
            p.created_at.format("%Y-%m-%d %H:%M"),
            p.facility_name,
            p.facility_location
                .as_deref()
                .map(|l| format!(" ({l})"))
                .unwrap_or_default()
        );
        if !p.target_products.is_empty() {
            println!("    Products: {}", p.target_products.join(", "));
        }
        if !p.summary.is_empty() {
            println!("    {}", p.summary.replace('\n', " "));
        }
    }
    Ok(())
}

async fn load_package(id: &str) -> Result<SalesPackage> {
    let config = load_config()?;
    let storage = open_storage_readonly(&config).await?;
    let stored = storage
        .get_playbook(&parse_id(id)?)
        .await?
        .ok_or_else(|| eyre!("no playbook with id {id}"))?;
    Ok(package_from_json(&stored.package_json)?)
}

async fn cmd_playbooks_show(id: &str) -> Result<()> {
    let package = load_package(id).await?;
    println!("{}", render_markdown(&package));
    Ok(())
}

async fn cmd_playbooks_export(id: &str, format: ExportFormat, out: Option<&Path>) -> Result<()> {
    let package = load_package(id).await?;
    let target = match out {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let path = write_export(&package, format, &target, false)?;
    println!("Exported to {}", path.display());
    Ok(())
}

/// Write `package` under `target`: a directory gets a derived file name.
///
/// With `paired` set, a file target keeps its stem and takes the format's
/// extension, so Markdown and JSON exports land side by side.
fn write_export(
    package: &SalesPackage,
    format: ExportFormat,
    target: &Path,
    paired: bool,
) -> Result<PathBuf> {
    let body = match format {
        ExportFormat::Md => render_markdown(package),
        ExportFormat::Json => render_json(package)?,
    };
    let path = export_path(&package.facility_details.name, format, target, paired);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, body).map_err(|e| eyre!("cannot write {}: {e}", path.display()))?;
    Ok(path)
}

fn export_path(facility: &str, format: ExportFormat, target: &Path, paired: bool) -> PathBuf {
    let extension = match format {
        ExportFormat::Md => "md",
        ExportFormat::Json => "json",
    };
    if target.is_dir() || target.extension().is_none() {
        target.join(format!("{}.{extension}", export_file_stem(facility)))
    } else if paired {
        target.with_extension(extension)
    } else {
        target.to_path_buf()
    }
}

async fn cmd_playbooks_delete(id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;
    if storage.delete_playbook(&parse_id(id)?).await? {
        println!("Deleted playbook {id}");
        Ok(())
    } else {
        Err(eyre!("no playbook with id {id}"))
    }
}

// ---------------------------------------------------------------------------
// Products / cache / config
// ---------------------------------------------------------------------------

fn cmd_products(name: Option<Product>) -> Result<()> {
    let knowledge = ProductKnowledge::load()?;
    match name {
        Some(product) => {
            println!("{}", knowledge.render_product_brief(&[product]));
            let use_cases = knowledge.render_use_cases(&[product]);
            if !use_cases.trim().is_empty() {
                println!("{use_cases}");
            }
        }
        None => {
            for info in knowledge.products() {
                println!("{}: {}", info.name, info.tagline);
            }
        }
    }
    Ok(())
}

async fn cmd_cache_clear() -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;
    let removed = storage.clear_generation_cache().await?;
    println!("Cleared {removed} cached generations");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn stage_started(&self, stage: Stage, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {}", stage.title()));
    }

    fn done(&self, _package: &SalesPackage) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paired_exports_to_a_file_do_not_collide() {
        let target = Path::new("exports/metro.md");
        let md = export_path("Metro Imaging", ExportFormat::Md, target, true);
        let json = export_path("Metro Imaging", ExportFormat::Json, target, true);
        assert_eq!(md, PathBuf::from("exports/metro.md"));
        assert_eq!(json, PathBuf::from("exports/metro.json"));
    }

    #[test]
    fn single_export_keeps_the_given_file_name() {
        let target = Path::new("exports/metro.txt");
        let path = export_path("Metro Imaging", ExportFormat::Json, target, false);
        assert_eq!(path, PathBuf::from("exports/metro.txt"));
    }

    #[test]
    fn directory_target_gets_derived_names() {
        let target = Path::new("exports/packages");
        let md = export_path("Metro Imaging", ExportFormat::Md, target, true);
        assert_eq!(md, PathBuf::from("exports/packages/Metro_Imaging_Sales_Package.md"));
    }
}
