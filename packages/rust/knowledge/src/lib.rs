//! Flux Inc. product knowledge.
//!
//! The catalog is TOML compiled into the binary. [`ProductKnowledge`] parses
//! it once and renders the Markdown briefs that go into generation prompts.

use serde::Deserialize;

use fluxsales_shared::{FluxSalesError, Product, Result};

const CATALOG: &str = include_str!("../data/catalog.toml");

// ---------------------------------------------------------------------------
// Catalog types
// ---------------------------------------------------------------------------

/// A labelled list, e.g. "System requirements".
#[derive(Debug, Clone, Deserialize)]
pub struct TechnicalNote {
    pub label: String,
    pub items: Vec<String>,
}

/// A label with a single line of detail.
#[derive(Debug, Clone, Deserialize)]
pub struct LabeledDetail {
    pub label: String,
    pub detail: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInfo {
    pub product: Product,
    pub name: String,
    pub tagline: String,
    pub summary: String,
    pub key_features: Vec<String>,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub unique_selling_points: Vec<String>,
    #[serde(default)]
    pub pain_points_addressed: Vec<String>,
    #[serde(default)]
    pub technical: Vec<TechnicalNote>,
    #[serde(default)]
    pub pricing: Vec<LabeledDetail>,
}

/// A worked problem/solution scenario for one product.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailedUseCase {
    pub product: Product,
    pub key: String,
    pub problem: String,
    pub solution: String,
    pub benefits: Vec<LabeledDetail>,
    pub proven_examples: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub customers: String,
    pub resellers: String,
    pub value_proposition: String,
    pub support: String,
    pub phone: String,
    pub email: String,
    pub web: String,
    pub regions: Vec<LabeledDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompetitiveSegment {
    pub segment: String,
    pub main_competitor: Option<String>,
    pub market_position: Option<String>,
    pub competitors: Option<String>,
    #[serde(default)]
    pub competitor_weaknesses: Vec<String>,
    pub flux_advantages: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuccessStory {
    pub customer: String,
    /// Free text; some stories cover custom work outside the product line.
    pub product: String,
    pub challenge: String,
    pub solution: String,
    pub results: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndustryChallenge {
    pub category: String,
    pub items: Vec<String>,
}

// ---------------------------------------------------------------------------
// ProductKnowledge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ProductKnowledge {
    products: Vec<ProductInfo>,
    use_cases: Vec<DetailedUseCase>,
    company: CompanyProfile,
    competitive: Vec<CompetitiveSegment>,
    success_stories: Vec<SuccessStory>,
    industry_challenges: Vec<IndustryChallenge>,
}

impl ProductKnowledge {
    /// Parse the embedded catalog.
    pub fn load() -> Result<Self> {
        toml::from_str(CATALOG)
            .map_err(|e| FluxSalesError::parse(format!("invalid product catalog: {e}")))
    }

    pub fn product(&self, product: Product) -> Option<&ProductInfo> {
        self.products.iter().find(|p| p.product == product)
    }

    pub fn products(&self) -> &[ProductInfo] {
        &self.products
    }

    pub fn detailed_use_cases(&self, product: Product) -> Vec<&DetailedUseCase> {
        self.use_cases.iter().filter(|u| u.product == product).collect()
    }

    /// Short use-case lines per product, skipping products that have none.
    pub fn use_cases_for(&self, products: &[Product]) -> Vec<(Product, &[String])> {
        products
            .iter()
            .filter_map(|&p| {
                let info = self.product(p)?;
                (!info.use_cases.is_empty()).then_some((p, info.use_cases.as_slice()))
            })
            .collect()
    }

    pub fn company(&self) -> &CompanyProfile {
        &self.company
    }

    pub fn competitive_analysis(&self) -> &[CompetitiveSegment] {
        &self.competitive
    }

    pub fn success_stories(&self) -> &[SuccessStory] {
        &self.success_stories
    }

    pub fn industry_challenges(&self) -> &[IndustryChallenge] {
        &self.industry_challenges
    }

    // -----------------------------------------------------------------------
    // Prompt rendering
    // -----------------------------------------------------------------------

    /// Features, selling points and pain points of each listed product.
    pub fn render_product_brief(&self, products: &[Product]) -> String {
        let mut out = String::new();
        for info in products.iter().filter_map(|&p| self.product(p)) {
            out.push_str(&format!("\n## {}\n", info.name));
            out.push_str(&format!("Tagline: {}\n", info.tagline));
            out.push_str(&format!("Summary: {}\n", info.summary));
            push_list(&mut out, "Key Features", &info.key_features);
            push_list(&mut out, "Benefits", &info.benefits);
            push_list(&mut out, "Unique Selling Points", &info.unique_selling_points);
            push_list(&mut out, "Pain Points Addressed", &info.pain_points_addressed);
            if !info.pricing.is_empty() {
                out.push_str("\nPricing:\n");
                for price in &info.pricing {
                    out.push_str(&format!("- {}: {}\n", price.label, price.detail));
                }
            }
        }
        out
    }

    /// Problem, solution and proof points of every detailed use case for `products`.
    pub fn render_use_cases(&self, products: &[Product]) -> String {
        let mut out = String::new();
        for &product in products {
            let cases = self.detailed_use_cases(product);
            if cases.is_empty() {
                continue;
            }
            out.push_str(&format!("\n## {product} Use Cases\n"));
            for case in cases {
                out.push_str(&format!("\n### {}\n", title_case(&case.key)));
                out.push_str(&format!("Problem: {}\n", case.problem));
                out.push_str(&format!("Solution: {}\n", case.solution));
                for benefit in &case.benefits {
                    out.push_str(&format!("- {}: {}\n", benefit.label, benefit.detail));
                }
                push_list(&mut out, "Proven Examples", &case.proven_examples);
            }
        }
        out
    }

    pub fn render_competitive_intel(&self) -> String {
        let mut out = String::new();
        for segment in &self.competitive {
            out.push_str(&format!("\n## {} Competitive Analysis\n", segment.segment));
            if let Some(competitor) = &segment.main_competitor {
                out.push_str(&format!("Main competitor: {competitor}\n"));
            }
            if let Some(position) = &segment.market_position {
                out.push_str(&format!("Market position: {position}\n"));
            }
            if let Some(competitors) = &segment.competitors {
                out.push_str(&format!("Competitors: {competitors}\n"));
            }
            push_list(&mut out, "Competitor Weaknesses", &segment.competitor_weaknesses);
            push_list(&mut out, "Flux Advantages", &segment.flux_advantages);
        }
        out
    }

    pub fn render_success_stories(&self) -> String {
        let mut out = String::from("\n## Customer Success Stories\n");
        for story in &self.success_stories {
            out.push_str(&format!("\n### {} ({})\n", story.customer, story.region));
            out.push_str(&format!("Product: {}\n", story.product));
            out.push_str(&format!("Challenge: {}\n", story.challenge));
            out.push_str(&format!("Solution: {}\n", story.solution));
            out.push_str(&format!("Results: {}\n", story.results));
        }
        out
    }

    pub fn render_company_profile(&self) -> String {
        let c = &self.company;
        let regions = c
            .regions
            .iter()
            .map(|r| r.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "\n## {name} Company Profile\n\
             - {customers} and {resellers}\n\
             - Presence in {regions}\n\
             - Value proposition: {value}\n\
             - {support}\n\
             - Contact: {phone}, {email}, {web}\n",
            name = c.name,
            customers = c.customers,
            resellers = c.resellers.to_lowercase(),
            value = c.value_proposition,
            support = c.support,
            phone = c.phone,
            email = c.email,
            web = c.web,
        )
    }

    pub fn render_industry_challenges(&self) -> String {
        let mut out = String::new();
        for challenge in &self.industry_challenges {
            push_list(&mut out, &challenge.category, &challenge.items);
        }
        out
    }
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n{heading}:\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}

/// `mobile_imaging` → `Mobile Imaging`.
fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
