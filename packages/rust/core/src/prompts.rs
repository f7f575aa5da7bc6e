//! Stage definitions and prompt assembly.
//!
//! Every stage prompt is the stage's instructions followed by the same
//! context blocks (facility, website intel, Apollo, products) and, for later
//! stages, the outputs of the stages they build on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fluxsales_apollo::ApolloSnapshot;
use fluxsales_shared::{Contact, FacilityDetails, Organization, Product};
use fluxsales_scraper::WebsiteIntel;

use crate::agents::{self, Persona};

const TRUNCATION_MARKER: &str = "...(truncated)";
const SEARCH_SUMMARY_CHARS: usize = 1000;
const INFERENCE_WEBSITE_CHARS: usize = 1200;
const PREVIOUS_OUTPUT_CHARS: usize = 2000;
const DESCRIPTION_CHARS: usize = 500;
const LIST_LIMIT: usize = 5;

/// Flat JSON shape requested from the inference and validation passes.
pub const FACILITY_JSON_FORMAT: &str = r#"{
    "name": "Facility Name",
    "location": "City, State",
    "type": "Facility Type",
    "size": "X locations, Y studies annually",
    "current_infrastructure": "Description of systems",
    "pain_points": ["Point 1", "Point 2", "Point 3"],
    "key_challenge": "Primary challenge",
    "recent_events": "Recent event",
    "budget_cycle": "Budget cycle info"
}"#;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One LLM call in the sales package pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FacilityInference,
    StakeholderEcosystem,
    IndustryResearch,
    WebsiteIntelligence,
    DealQualification,
    ValuePropositions,
    RoiAnalysis,
    DraftCommunications,
    PersonalizedEmails,
    ObjectionHandling,
    CompletePlaybook,
}

impl Stage {
    pub const ALL: [Stage; 11] = [
        Stage::FacilityInference,
        Stage::StakeholderEcosystem,
        Stage::IndustryResearch,
        Stage::WebsiteIntelligence,
        Stage::DealQualification,
        Stage::ValuePropositions,
        Stage::RoiAnalysis,
        Stage::DraftCommunications,
        Stage::PersonalizedEmails,
        Stage::ObjectionHandling,
        Stage::CompletePlaybook,
    ];

    /// Key used in the package JSON and the generation cache.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FacilityInference => "facility_inference",
            Self::StakeholderEcosystem => "stakeholder_ecosystem",
            Self::IndustryResearch => "industry_research",
            Self::WebsiteIntelligence => "website_intelligence",
            Self::DealQualification => "deal_qualification",
            Self::ValuePropositions => "value_propositions",
            Self::RoiAnalysis => "roi_analysis",
            Self::DraftCommunications => "draft_communications",
            Self::PersonalizedEmails => "personalized_emails",
            Self::ObjectionHandling => "objection_handling",
            Self::CompletePlaybook => "complete_playbook",
        }
    }

    /// Section heading in exported packages.
    pub fn title(&self) -> &'static str {
        match self {
            Self::FacilityInference => "Inferred Facility Details",
            Self::StakeholderEcosystem => "Stakeholder Ecosystem Map",
            Self::IndustryResearch => "Industry Research",
            Self::WebsiteIntelligence => "Website Intelligence Analysis",
            Self::DealQualification => "Opportunity Qualification",
            Self::ValuePropositions => "Value Propositions",
            Self::RoiAnalysis => "ROI Analysis",
            Self::DraftCommunications => "Draft Communications",
            Self::PersonalizedEmails => "Personalized Email Templates",
            Self::ObjectionHandling => "Objection Handling Guide",
            Self::CompletePlaybook => "Complete Sales Playbook",
        }
    }

    /// Lowercase noun phrase for error text ("Error generating ROI analysis").
    pub fn label(&self) -> &'static str {
        match self {
            Self::FacilityInference => "facility inference",
            Self::StakeholderEcosystem => "stakeholder ecosystem map",
            Self::IndustryResearch => "industry research",
            Self::WebsiteIntelligence => "website intelligence",
            Self::DealQualification => "deal qualification",
            Self::ValuePropositions => "value propositions",
            Self::RoiAnalysis => "ROI analysis",
            Self::DraftCommunications => "communications",
            Self::PersonalizedEmails => "personalized emails",
            Self::ObjectionHandling => "objection handling",
            Self::CompletePlaybook => "sales playbook",
        }
    }

    pub fn persona(&self) -> Persona {
        match self {
            Self::FacilityInference => agents::FACILITY_ANALYST,
            Self::StakeholderEcosystem => agents::STAKEHOLDER_MAPPER,
            Self::IndustryResearch => agents::INDUSTRY_SPECIALIST,
            Self::WebsiteIntelligence => agents::WEBSITE_ANALYST,
            Self::DealQualification | Self::CompletePlaybook => agents::DEAL_QUALIFIER,
            Self::ValuePropositions => agents::VALUE_STRATEGIST,
            Self::RoiAnalysis => agents::ROI_EXPERT,
            Self::DraftCommunications => agents::RELATIONSHIP_ADVISOR,
            Self::PersonalizedEmails => agents::STRATEGIC_REVIEWER,
            Self::ObjectionHandling => agents::OBJECTION_SPECIALIST,
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            Self::FacilityInference => include_str!("../prompts/facility_inference.md"),
            Self::StakeholderEcosystem => include_str!("../prompts/stakeholder_ecosystem.md"),
            Self::IndustryResearch => include_str!("../prompts/industry_research.md"),
            Self::WebsiteIntelligence => include_str!("../prompts/website_intelligence.md"),
            Self::DealQualification => include_str!("../prompts/deal_qualification.md"),
            Self::ValuePropositions => include_str!("../prompts/value_propositions.md"),
            Self::RoiAnalysis => include_str!("../prompts/roi_analysis.md"),
            Self::DraftCommunications => include_str!("../prompts/draft_communications.md"),
            Self::PersonalizedEmails => include_str!("../prompts/personalized_emails.md"),
            Self::ObjectionHandling => include_str!("../prompts/objection_handling.md"),
            Self::CompletePlaybook => include_str!("../prompts/complete_playbook.md"),
        }
    }

    /// Earlier stages whose outputs are passed in as context.
    pub fn builds_on(&self) -> &'static [Stage] {
        use Stage::*;
        match self {
            FacilityInference | StakeholderEcosystem | IndustryResearch => &[],
            WebsiteIntelligence => &[IndustryResearch],
            DealQualification => &[StakeholderEcosystem, IndustryResearch, WebsiteIntelligence],
            ValuePropositions => &[WebsiteIntelligence, DealQualification],
            RoiAnalysis => &[DealQualification, ValuePropositions],
            DraftCommunications => &[StakeholderEcosystem, WebsiteIntelligence],
            PersonalizedEmails => &[
                IndustryResearch,
                WebsiteIntelligence,
                StakeholderEcosystem,
                DealQualification,
                ValuePropositions,
                RoiAnalysis,
                DraftCommunications,
            ],
            ObjectionHandling => &[DealQualification, ValuePropositions, RoiAnalysis],
            CompletePlaybook => &[
                StakeholderEcosystem,
                IndustryResearch,
                WebsiteIntelligence,
                DealQualification,
                ValuePropositions,
                RoiAnalysis,
                PersonalizedEmails,
                ObjectionHandling,
            ],
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = fluxsales_shared::FluxSalesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| fluxsales_shared::FluxSalesError::validation(format!("unknown stage '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Context blocks
// ---------------------------------------------------------------------------

/// Everything a stage prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub facility: &'a FacilityDetails,
    pub website: Option<&'a WebsiteIntel>,
    pub apollo: Option<&'a ApolloSnapshot>,
    pub search_summary: &'a str,
    pub products: &'a [Product],
    pub contacts: &'a [Contact],
}

/// Cut `text` to `max_chars` characters, marking the cut.
pub fn truncate_for_tokens(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..idx]),
        None => text.to_string(),
    }
}

fn or_unknown(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or("Unknown")
}

pub fn facility_context(facility: &FacilityDetails) -> String {
    let name = if facility.name.trim().is_empty() {
        "Unknown"
    } else {
        facility.name.trim()
    };
    format!(
        "Facility Name: {name}\n\
         Location: {location}\n\
         Type: {kind}\n\
         Size: {size}\n\
         Current Infrastructure: {infra}\n\
         Key Challenge: {challenge}\n\
         Recent Events: {events}\n\
         Budget Cycle: {budget}\n\
         Pain Points: {pains}\n",
        location = or_unknown(facility.location.as_deref()),
        kind = or_unknown(facility.facility_type.as_deref()),
        size = or_unknown(facility.size.as_deref()),
        infra = or_unknown(facility.current_infrastructure.as_deref()),
        challenge = or_unknown(facility.key_challenge.as_deref()),
        events = or_unknown(facility.recent_events.as_deref()),
        budget = or_unknown(facility.budget_cycle.as_deref()),
        pains = facility.pain_points.join(", "),
    )
}

/// Condensed website scan for prompts; a failed or missing scan says so.
pub fn website_intel_summary(intel: Option<&WebsiteIntel>) -> String {
    let Some(intel) = intel.filter(|i| i.error.is_none()) else {
        return "No website data available.".to_string();
    };

    let stack = &intel.technology_stack;
    let mut out = format!(
        "Website URL: {url}\n\
         Website Title: {title}\n\
         Pages Scanned: {pages}\n\
         \n## Content Analysis\n\
         Radiology/Imaging Mentions: {radiology}\n\
         PACS Mentions: {pacs}\n\
         DICOM Mentions: {dicom}\n\
         Workflow Mentions: {workflow}\n\
         Modernization Mentions: {modern}\n\
         \n## Identified Technology Stack\n\
         PACS Vendor: {pacs_vendor}\n\
         RIS Vendor: {ris_vendor}\n\
         Infrastructure: {infra}\n\
         Modalities: {modalities}\n",
        url = intel.url,
        title = or_unknown(Some(intel.page_title.as_str())),
        pages = intel.pages_scanned,
        radiology = intel.radiology_mentions,
        pacs = intel.pacs_mentions,
        dicom = intel.dicom_mentions,
        workflow = intel.workflow_mentions,
        modern = intel.modernization_mentions,
        pacs_vendor = or_unknown(Some(stack.pacs_vendor.as_str())),
        ris_vendor = or_unknown(Some(stack.ris_vendor.as_str())),
        infra = join_or_unknown(&stack.infrastructure),
        modalities = join_or_unknown(&stack.modalities),
    );

    let people: Vec<String> = intel
        .key_personnel
        .iter()
        .map(|p| format!("{}, {}", p.name, p.title))
        .collect();
    push_block(&mut out, "Key Personnel", &people);
    let pains: Vec<String> = intel.pain_points.iter().map(|i| i.context.clone()).collect();
    push_block(&mut out, "Identified Pain Points", &pains);
    let growth: Vec<String> = intel.growth_indicators.iter().map(|i| i.context.clone()).collect();
    push_block(&mut out, "Growth Indicators", &growth);
    push_block(&mut out, "Job Openings", &intel.job_openings);
    out
}

fn join_or_unknown(items: &[String]) -> String {
    if items.is_empty() {
        "Unknown".to_string()
    } else {
        items.join(", ")
    }
}

fn push_block(out: &mut String, heading: &str, items: &[String]) {
    out.push_str(&format!("\n## {heading}\n"));
    if items.is_empty() {
        out.push_str("None identified\n");
        return;
    }
    for item in items.iter().take(LIST_LIMIT) {
        out.push_str(&format!("- {item}\n"));
    }
}

/// "APOLLO DATA SUMMARY" block; empty when there is no organization.
pub fn apollo_summary(org: Option<&Organization>) -> String {
    let Some(org) = org else {
        return String::new();
    };

    let mut out = String::from("APOLLO DATA SUMMARY:\n");
    if let Some(name) = org.name.as_deref() {
        out.push_str(&format!("- Organization Name: {name}\n"));
    }
    if let Some(year) = org.founded_year {
        out.push_str(&format!("- Founded Year: {year}\n"));
    }
    if let Some(employees) = org.estimated_num_employees {
        out.push_str(&format!("- Employee Count: {employees}\n"));
    }
    if let Some(revenue) = org.annual_revenue_printed.as_deref() {
        out.push_str(&format!("- Annual Revenue: {revenue}\n"));
    }
    if let Some(address) = org.address() {
        out.push_str(&format!("- Address: {address}\n"));
    }
    if !org.technology_names.is_empty() {
        let techs: Vec<&str> = org
            .technology_names
            .iter()
            .take(LIST_LIMIT)
            .map(String::as_str)
            .collect();
        out.push_str(&format!("- Technologies: {}\n", techs.join(", ")));
    }
    if let Some(desc) = org.short_description.as_deref().filter(|d| !d.is_empty()) {
        let desc = match desc.char_indices().nth(DESCRIPTION_CHARS) {
            Some((idx, _)) => format!("{}...", &desc[..idx]),
            None => desc.to_string(),
        };
        out.push_str(&format!("- Description: {desc}\n"));
    }
    out
}

/// One line per known contact for the stakeholder stage.
pub fn contacts_summary(contacts: &[Contact]) -> String {
    contacts
        .iter()
        .map(|c| {
            let mut line = format!("- {}", c.display_name());
            for part in [c.title.as_deref(), c.seniority.as_deref()].into_iter().flatten() {
                line.push_str(&format!(", {part}"));
            }
            if !c.departments.is_empty() {
                line.push_str(&format!(" [{}]", c.departments.join(", ")));
            }
            if let Some(email) = c.email.as_deref() {
                line.push_str(&format!(" <{email}>"));
            }
            line.push('\n');
            line
        })
        .collect()
}

pub fn products_line(products: &[Product]) -> String {
    products
        .iter()
        .copied()
        .map(Product::name)
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Prompt builders
// ---------------------------------------------------------------------------

/// User prompt for `stage`. `previous` holds the outputs produced so far.
pub fn stage_prompt(stage: Stage, inputs: &PromptInputs<'_>, previous: &BTreeMap<Stage, String>) -> String {
    if stage == Stage::FacilityInference {
        return inference_prompt(inputs);
    }

    let mut prompt = String::from(stage.instructions().trim_end());
    prompt.push_str("\n\nFACILITY CONTEXT:\n");
    prompt.push_str(&facility_context(inputs.facility));

    // The review stage works from the drafts and analyses, not raw intel.
    if stage != Stage::PersonalizedEmails {
        prompt.push_str("\nWEBSITE INTELLIGENCE SUMMARY:\n");
        prompt.push_str(&website_intel_summary(inputs.website));
        prompt.push('\n');
    }

    let apollo = apollo_summary(inputs.apollo.and_then(|a| a.organization.as_ref()));
    if !apollo.is_empty() {
        prompt.push('\n');
        prompt.push_str(&apollo);
    }

    if stage == Stage::StakeholderEcosystem {
        let mut contacts: Vec<Contact> = inputs.apollo.map(|a| a.contacts.clone()).unwrap_or_default();
        contacts.extend(inputs.contacts.iter().cloned());
        if !contacts.is_empty() {
            prompt.push_str("\nKNOWN CONTACTS:\n");
            prompt.push_str(&contacts_summary(&contacts));
        }
    }

    prompt.push_str("\nTARGET PRODUCT FOCUS:\n");
    prompt.push_str(&products_line(inputs.products));
    prompt.push('\n');

    let earlier: Vec<(Stage, &String)> = stage
        .builds_on()
        .iter()
        .filter_map(|s| previous.get(s).map(|text| (*s, text)))
        .collect();
    if !earlier.is_empty() {
        prompt.push_str("\nPREVIOUS ANALYSES:\n");
        for (s, text) in earlier {
            prompt.push_str(&format!(
                "\n### {}\n{}\n",
                s.title(),
                truncate_for_tokens(text, PREVIOUS_OUTPUT_CHARS)
            ));
        }
    }
    prompt
}

fn inference_prompt(inputs: &PromptInputs<'_>) -> String {
    let facility = inputs.facility;
    let search = if inputs.search_summary.trim().is_empty() {
        "No specific information found.".to_string()
    } else {
        truncate_for_tokens(inputs.search_summary, SEARCH_SUMMARY_CHARS)
    };
    let website = truncate_for_tokens(&website_intel_summary(inputs.website), INFERENCE_WEBSITE_CHARS);

    let mut prompt = format!(
        "{instructions}\n\n\
         GOOGLE SEARCH RESULTS:\n{search}\n\n\
         WEBSITE DATA ANALYSIS:\n{website}\n\n\
         COMPANY INFORMATION:\n\
         Company: {name}\n\
         Website: {site}\n\
         Location: {location}\n",
        instructions = Stage::FacilityInference.instructions().trim_end(),
        name = or_unknown(Some(facility.name.as_str())),
        site = or_unknown(facility.website_url.as_deref()),
        location = or_unknown(facility.location.as_deref()),
    );

    let apollo = apollo_summary(inputs.apollo.and_then(|a| a.organization.as_ref()));
    if !apollo.is_empty() {
        prompt.push('\n');
        prompt.push_str(&apollo);
    }

    prompt.push_str(&format!(
        "\nYour response MUST be a valid JSON object with exactly this structure:\n\
         {FACILITY_JSON_FORMAT}\n\n\
         Do not include nested objects, 'Final Answer:' or any other text. \
         Do not use markdown formatting. Return only the JSON object.\n"
    ));
    prompt
}

/// Second pass that coerces the inference reply into the flat format.
pub fn json_validation_prompt(raw: &str) -> String {
    format!(
        "Validate and correct the format of the following output:\n\n{raw}\n\n\
         The output should be a valid JSON object with exactly this structure:\n\
         {FACILITY_JSON_FORMAT}\n\n\
         If the output is already in this format, return it unchanged. Otherwise extract the \
         information and reformat it to match exactly. Use an empty string or empty array for \
         missing fields.\n\n\
         Return ONLY the JSON object without any additional text."
    )
}

/// Drop agent scaffolding ("Thought: ...", "Final Answer:") around a reply.
pub fn clean_stage_output(text: &str) -> String {
    match text.rfind("Final Answer:") {
        Some(idx) => text[idx + "Final Answer:".len()..]
            .trim()
            .trim_end_matches("```")
            .trim()
            .to_string(),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxsales_scraper::{Indicator, KeyPerson};

    fn facility() -> FacilityDetails {
        FacilityDetails {
            location: Some("Chicago, IL".into()),
            size: Some("3 locations, 45,000 studies annually".into()),
            pain_points: vec!["Slow retrieval".into(), "Manual CD import".into()],
            ..FacilityDetails::named("Metropolitan Imaging Center")
        }
    }

    fn inputs<'a>(facility: &'a FacilityDetails, products: &'a [Product]) -> PromptInputs<'a> {
        PromptInputs {
            facility,
            website: None,
            apollo: None,
            search_summary: "",
            products,
            contacts: &[],
        }
    }

    #[test]
    fn stage_order_and_keys() {
        assert_eq!(Stage::ALL.first(), Some(&Stage::FacilityInference));
        assert_eq!(Stage::ALL.last(), Some(&Stage::CompletePlaybook));
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
            assert!(!stage.instructions().trim().is_empty());
            for dep in stage.builds_on() {
                assert!(dep < &stage, "{stage} depends on later stage {dep}");
            }
        }
        assert_eq!(Stage::CompletePlaybook.persona().key, "deal_qualifier");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_for_tokens("short", 10), "short");
        assert_eq!(truncate_for_tokens("ééééé", 3), "ééé...(truncated)");
    }

    #[test]
    fn facility_context_defaults_to_unknown() {
        let ctx = facility_context(&facility());
        assert!(ctx.starts_with("Facility Name: Metropolitan Imaging Center\nLocation: Chicago, IL\n"));
        assert!(ctx.contains("Type: Unknown\n"));
        assert!(ctx.contains("Pain Points: Slow retrieval, Manual CD import\n"));
    }

    #[test]
    fn website_summary_handles_missing_and_failed_scans() {
        assert_eq!(website_intel_summary(None), "No website data available.");
        let failed = WebsiteIntel {
            error: Some("no pages".into()),
            ..WebsiteIntel::default()
        };
        assert_eq!(website_intel_summary(Some(&failed)), "No website data available.");
    }

    #[test]
    fn website_summary_lists_findings() {
        let mut intel = WebsiteIntel {
            url: "https://metroimaging.com".into(),
            page_title: "Metro Imaging".into(),
            pages_scanned: 4,
            pacs_mentions: 3,
            ..WebsiteIntel::default()
        };
        intel.technology_stack.pacs_vendor = "Sectra".into();
        intel.technology_stack.modalities = vec!["MRI".into(), "CT".into()];
        intel.key_personnel.push(KeyPerson {
            name: "Dana Reyes".into(),
            title: "Director of Radiology".into(),
            url: "https://metroimaging.com/team".into(),
        });
        intel.pain_points.push(Indicator {
            indicator: "legacy".into(),
            context: "Our legacy PACS slows reads".into(),
            page: "https://metroimaging.com".into(),
        });

        let summary = website_intel_summary(Some(&intel));
        assert!(summary.contains("Website Title: Metro Imaging\nPages Scanned: 4\n"));
        assert!(summary.contains("PACS Mentions: 3\n"));
        assert!(summary.contains("PACS Vendor: Sectra\nRIS Vendor: Unknown\nInfrastructure: Unknown\nModalities: MRI, CT\n"));
        assert!(summary.contains("## Key Personnel\n- Dana Reyes, Director of Radiology\n"));
        assert!(summary.contains("## Identified Pain Points\n- Our legacy PACS slows reads\n"));
        assert!(summary.contains("## Job Openings\nNone identified\n"));
    }

    #[test]
    fn apollo_summary_formats_known_fields() {
        assert!(apollo_summary(None).is_empty());
        let org = Organization {
            name: Some("Metro Imaging".into()),
            founded_year: Some(1998),
            city: Some("Chicago".into()),
            state: Some("IL".into()),
            technology_names: (1..=7).map(|i| format!("Tech{i}")).collect(),
            short_description: Some("x".repeat(600)),
            ..Organization::default()
        };
        let summary = apollo_summary(Some(&org));
        assert!(summary.starts_with("APOLLO DATA SUMMARY:\n- Organization Name: Metro Imaging\n- Founded Year: 1998\n"));
        assert!(summary.contains("- Address: Chicago, IL\n"));
        assert!(summary.contains("- Technologies: Tech1, Tech2, Tech3, Tech4, Tech5\n"));
        assert!(summary.contains(&format!("- Description: {}...\n", "x".repeat(500))));
        assert!(!summary.contains("Employee Count"));
    }

    #[test]
    fn inference_prompt_requests_flat_json() {
        let f = facility();
        let products = Product::defaults();
        let prompt = stage_prompt(Stage::FacilityInference, &inputs(&f, &products), &BTreeMap::new());
        assert!(prompt.contains("GOOGLE SEARCH RESULTS:\nNo specific information found.\n"));
        assert!(prompt.contains("WEBSITE DATA ANALYSIS:\nNo website data available.\n"));
        assert!(prompt.contains("Company: Metropolitan Imaging Center\nWebsite: Unknown\n"));
        assert!(prompt.contains(FACILITY_JSON_FORMAT));
    }

    #[test]
    fn later_stages_get_earlier_outputs() {
        let f = facility();
        let products = vec![Product::Capacitor];
        let mut previous = BTreeMap::new();
        previous.insert(Stage::DealQualification, "Score 8/10".to_string());
        previous.insert(Stage::ObjectionHandling, "not yet relevant".to_string());

        let prompt = stage_prompt(Stage::RoiAnalysis, &inputs(&f, &products), &previous);
        assert!(prompt.contains("FACILITY CONTEXT:\nFacility Name: Metropolitan Imaging Center"));
        assert!(prompt.contains("TARGET PRODUCT FOCUS:\nCapacitor\n"));
        assert!(prompt.contains("PREVIOUS ANALYSES:\n\n### Opportunity Qualification\nScore 8/10\n"));
        assert!(!prompt.contains("not yet relevant"));
    }

    #[test]
    fn stakeholder_prompt_lists_contacts() {
        let f = facility();
        let products = Product::defaults();
        let contacts = vec![Contact {
            name: Some("Dana Reyes".into()),
            title: Some("CIO".into()),
            email: Some("dana@metro.example".into()),
            ..Contact::default()
        }];
        let mut input = inputs(&f, &products);
        input.contacts = &contacts;
        let prompt = stage_prompt(Stage::StakeholderEcosystem, &input, &BTreeMap::new());
        assert!(prompt.contains("KNOWN CONTACTS:\n- Dana Reyes, CIO <dana@metro.example>\n"));

        let other = stage_prompt(Stage::IndustryResearch, &input, &BTreeMap::new());
        assert!(!other.contains("KNOWN CONTACTS"));
    }

    #[test]
    fn clean_output_strips_final_answer() {
        assert_eq!(clean_stage_output("Thought: hmm\nFinal Answer: The plan."), "The plan.");
        assert_eq!(clean_stage_output("  plain text \n"), "plain text");
    }
}
