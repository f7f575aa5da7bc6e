//! Render a sales package for sharing: Markdown for reps, JSON for tooling.

use std::fmt::Write as _;

use fluxsales_shared::{FacilityDetails, FluxSalesError, Result};

use crate::pipeline::SalesPackage;
use crate::prompts::Stage;

const NO_DATA: &str = "No data available";

/// Stage sections in export order. Draft communications are superseded by
/// the reviewed emails and are left out.
const EXPORTED_STAGES: [Stage; 9] = [
    Stage::StakeholderEcosystem,
    Stage::IndustryResearch,
    Stage::WebsiteIntelligence,
    Stage::DealQualification,
    Stage::ValuePropositions,
    Stage::RoiAnalysis,
    Stage::PersonalizedEmails,
    Stage::ObjectionHandling,
    Stage::CompletePlaybook,
];

pub fn render_markdown(package: &SalesPackage) -> String {
    let facility = &package.facility_details;
    let mut out = format!("# Flux Sales Package: {}\n\n", facility.name);

    let _ = writeln!(out, "- **Generated:** {}", package.timestamp.format("%Y-%m-%d %H:%M UTC"));
    let products: Vec<&str> = package.target_products.iter().map(|p| p.name()).collect();
    let _ = writeln!(out, "- **Target Products:** {}", products.join(", "));
    if let Some(url) = &package.website_url {
        let _ = writeln!(out, "- **Website:** {url}");
    }
    if let Some(location) = &facility.location {
        let _ = writeln!(out, "- **Location:** {location}");
    }

    out.push_str("\n## Inferred Facility Details\n\n");
    match &package.inferred_facility_details {
        Some(details) => out.push_str(&facility_list(details)),
        None => out.push_str(
            package
                .stage(Stage::FacilityInference)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(NO_DATA),
        ),
    }
    out.push('\n');

    for stage in EXPORTED_STAGES {
        let body = package
            .stage(stage)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_DATA);
        let _ = write!(out, "\n## {}\n\n{body}\n", stage.title());
    }
    out
}

fn facility_list(details: &FacilityDetails) -> String {
    let fields = [
        ("Name", Some(details.name.as_str())),
        ("Location", details.location.as_deref()),
        ("Type", details.facility_type.as_deref()),
        ("Size", details.size.as_deref()),
        ("Current Infrastructure", details.current_infrastructure.as_deref()),
        ("Key Challenge", details.key_challenge.as_deref()),
        ("Recent Events", details.recent_events.as_deref()),
        ("Budget Cycle", details.budget_cycle.as_deref()),
    ];

    let mut out = String::new();
    for (label, value) in fields {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            let _ = writeln!(out, "- **{label}:** {value}");
        }
    }
    if !details.pain_points.is_empty() {
        out.push_str("- **Pain Points:**\n");
        for point in &details.pain_points {
            let _ = writeln!(out, "  - {point}");
        }
    }
    if out.is_empty() {
        out.push_str(NO_DATA);
        out.push('\n');
    }
    out
}

pub fn render_json(package: &SalesPackage) -> Result<String> {
    serde_json::to_string_pretty(package)
        .map_err(|e| FluxSalesError::parse(format!("failed to serialize package: {e}")))
}

/// "Metro Imaging" → "Metro_Imaging_Sales_Package".
pub fn export_file_stem(facility: &str) -> String {
    let name: String = facility
        .trim()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect();
    format!("{name}_Sales_Package")
}
