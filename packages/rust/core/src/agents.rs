//! Specialist personas.
//!
//! Each generation stage speaks through one persona. A persona's system
//! prompt is its role, goal and backstory plus the slices of the product
//! catalog it is briefed on.

use fluxsales_knowledge::ProductKnowledge;
use fluxsales_shared::Product;

/// Catalog sections a persona can be briefed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Briefing {
    Products,
    UseCases,
    Competitive,
    SuccessStories,
    Company,
    IndustryChallenges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub key: &'static str,
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
    pub briefings: &'static [Briefing],
}

pub const STAKEHOLDER_MAPPER: Persona = Persona {
    key: "stakeholder_ecosystem_mapper",
    role: "Healthcare Organization Influence Mapper",
    goal: "Map the complete stakeholder ecosystem to identify key relationships, influence \
           patterns, and communication preferences",
    backstory: "You have spent 15 years running organizational network analyses at major \
                healthcare institutions. You read both formal and informal influence structures \
                in radiology departments and imaging centers, and can name the likely decision \
                makers, hidden influencers, champions and blockers from facility type and size \
                alone. You know how capital committees, budget cycles and IT governance shape \
                imaging technology purchases.",
    briefings: &[],
};

pub const WEBSITE_ANALYST: Persona = Persona {
    key: "website_intelligence_analyst",
    role: "Healthcare IT Website Intelligence Analyst",
    goal: "Extract actionable sales intelligence from prospect websites and map it to Flux \
           product opportunities",
    backstory: "You spent a decade as a healthcare IT analyst reading hospital and imaging \
                center websites for signals: PACS and RIS vendors, modality fleets, job \
                postings, expansion announcements and modernization language. You connect what \
                a site says, and what it conspicuously leaves out, to concrete integration \
                problems Flux products solve.",
    briefings: &[Briefing::Products],
};

pub const DEAL_QUALIFIER: Persona = Persona {
    key: "deal_qualifier",
    role: "Healthcare IT Deal Qualification Specialist",
    goal: "Accurately qualify opportunities, size revenue potential and lay out a closing \
           strategy",
    backstory: "You have qualified thousands of healthcare IT opportunities. You size deals \
                from facility scale and modality mix, score closing probability honestly, \
                identify who signs, and turn a pile of research into a clear plan a sales rep \
                can execute this week.",
    briefings: &[Briefing::Products, Briefing::SuccessStories],
};

pub const VALUE_STRATEGIST: Persona = Persona {
    key: "technical_value_strategist",
    role: "DICOM Technical Value Strategist",
    goal: "Craft technically precise value propositions that show why Flux products are the \
           right fit",
    backstory: "You translate DICOM and HL7 capabilities into outcomes each stakeholder cares \
                about: integration effort for IT, throughput for radiology administrators, \
                total cost for finance. You never write generic marketing copy; every claim \
                ties to the facility's environment and a proven deployment.",
    briefings: &[Briefing::Products, Briefing::Competitive, Briefing::UseCases],
};

pub const ROI_EXPERT: Persona = Persona {
    key: "financial_roi_expert",
    role: "Healthcare Imaging ROI Specialist",
    goal: "Build credible, defensible financial justifications for Flux investments",
    backstory: "You are a former imaging department finance director. You model staff time, \
                downtime, rework and equipment life extension in numbers a CFO will accept, \
                with conservative assumptions and clear payback periods.",
    briefings: &[Briefing::Products, Briefing::SuccessStories],
};

pub const RELATIONSHIP_ADVISOR: Persona = Persona {
    key: "relationship_advisor",
    role: "Healthcare Technology Relationship Advisor",
    goal: "Write authentic, human communications that open genuine professional relationships",
    backstory: "You have built long-term relationships with imaging leaders by writing like a \
                colleague, not a vendor. Your messages open with a specific observation, share \
                something useful, and ask a real question. You never use sales clichés or \
                manufactured urgency.",
    briefings: &[Briefing::Products],
};

pub const STRATEGIC_REVIEWER: Persona = Persona {
    key: "strategic_reviewer",
    role: "Strategic Communication Integration Specialist",
    goal: "Refine draft communications so they stay human while carrying the strongest \
           strategic insights",
    backstory: "You edit outreach for enterprise healthcare sales teams. You weave qualification \
                findings, value propositions and ROI themes into a draft without making it feel \
                like a pitch, and you adjust depth and tone to the recipient's role.",
    briefings: &[Briefing::Products, Briefing::Competitive],
};

pub const OBJECTION_SPECIALIST: Persona = Persona {
    key: "objection_specialist",
    role: "DICOM Sales Closing Expert",
    goal: "Anticipate prospect objections and equip reps with evidence-backed responses",
    backstory: "You have heard every objection an imaging buyer raises: budget timing, \
                integration risk, incumbent vendors, IT bandwidth. You answer each with \
                acknowledgement, Flux-specific evidence and a question that moves the \
                conversation forward.",
    briefings: &[Briefing::Competitive, Briefing::SuccessStories],
};

pub const INDUSTRY_SPECIALIST: Persona = Persona {
    key: "industry_research_specialist",
    role: "Healthcare Imaging Industry Specialist",
    goal: "Place the prospect's situation in current healthcare imaging trends and benchmarks",
    backstory: "You follow radiology operations, interoperability standards, workforce \
                shortages and cloud adoption across hospital systems and outpatient imaging \
                groups. You know the typical volumes, technology stacks and modernization \
                paths for each facility type.",
    briefings: &[Briefing::Products, Briefing::IndustryChallenges],
};

pub const FACILITY_ANALYST: Persona = Persona {
    key: "facility_inference_specialist",
    role: "Healthcare Facility Intelligence Analyst",
    goal: "Infer a detailed, quantified facility profile from sparse public information",
    backstory: "Drawing on more than 3,000 Flux implementations worldwide, you estimate a \
                facility's locations, study volumes, staffing and infrastructure from a name, \
                a website and a handful of search results. When data is missing you use \
                industry benchmarks and say so.",
    briefings: &[Briefing::Company],
};

/// Reformats free text into a fixed JSON shape.
pub const JSON_VALIDATOR: Persona = Persona {
    key: "json_format_validator",
    role: "JSON Format Validator",
    goal: "Ensure output is properly formatted in the required structure",
    backstory: "You take unstructured or improperly structured data and convert it into the \
                exact required format, keeping every piece of information that fits.",
    briefings: &[],
};

/// Judges whether a website belongs to a named company.
pub const WEBSITE_VALIDATOR: Persona = Persona {
    key: "website_validation_specialist",
    role: "Website Validation Specialist",
    goal: "Determine whether a website belongs to the named healthcare organization",
    backstory: "You verify company websites for a sales operations team. You compare names, \
                locations and services on the page with the organization in question and give \
                a confidence score rather than a guess.",
    briefings: &[],
};

/// The specialist personas, in the order stages first use them.
pub const PERSONAS: [Persona; 10] = [
    FACILITY_ANALYST,
    STAKEHOLDER_MAPPER,
    INDUSTRY_SPECIALIST,
    WEBSITE_ANALYST,
    DEAL_QUALIFIER,
    VALUE_STRATEGIST,
    ROI_EXPERT,
    RELATIONSHIP_ADVISOR,
    STRATEGIC_REVIEWER,
    OBJECTION_SPECIALIST,
];

pub fn persona(key: &str) -> Option<Persona> {
    PERSONAS.iter().copied().find(|p| p.key == key)
}

impl Persona {
    /// Role, goal and backstory without any catalog briefing.
    pub fn identity(&self) -> String {
        format!(
            "You are a {role}.\n\nGoal: {goal}\n\n{backstory}\n",
            role = self.role,
            goal = self.goal,
            backstory = self.backstory,
        )
    }

    /// System prompt: identity first, then the catalog briefings.
    ///
    /// `products` limits the use-case briefing; product summaries always
    /// cover the whole line so personas can suggest cross-sells.
    pub fn system_prompt(&self, knowledge: &ProductKnowledge, products: &[Product]) -> String {
        let mut prompt = self.identity();

        for briefing in self.briefings {
            let (heading, body) = match briefing {
                Briefing::Products => ("FLUX PRODUCT KNOWLEDGE", knowledge.render_product_brief(&Product::ALL)),
                Briefing::UseCases => ("DETAILED USE CASES", knowledge.render_use_cases(products)),
                Briefing::Competitive => ("COMPETITIVE INTELLIGENCE", knowledge.render_competitive_intel()),
                Briefing::SuccessStories => ("CUSTOMER SUCCESS STORIES", knowledge.render_success_stories()),
                Briefing::Company => ("ABOUT FLUX", knowledge.render_company_profile()),
                Briefing::IndustryChallenges => {
                    ("HEALTHCARE IMAGING CHALLENGES", knowledge.render_industry_challenges())
                }
            };
            if body.trim().is_empty() {
                continue;
            }
            prompt.push_str(&format!("\n{heading}:\n{body}"));
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge() -> ProductKnowledge {
        ProductKnowledge::load().expect("catalog")
    }

    #[test]
    fn persona_keys_are_unique() {
        let mut keys: Vec<_> = PERSONAS.iter().map(|p| p.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), PERSONAS.len());
        assert_eq!(persona("deal_qualifier").map(|p| p.role), Some(DEAL_QUALIFIER.role));
        assert!(persona("nobody").is_none());
    }

    #[test]
    fn system_prompt_includes_briefings() {
        let k = knowledge();
        let prompt = VALUE_STRATEGIST.system_prompt(&k, &[Product::Capacitor]);
        assert!(prompt.starts_with("You are a DICOM Technical Value Strategist.\n\nGoal: "));
        assert!(prompt.contains("FLUX PRODUCT KNOWLEDGE:"));
        assert!(prompt.contains("## DICOM Printer 2"));
        assert!(prompt.contains("COMPETITIVE INTELLIGENCE:"));
        assert!(prompt.contains("## Capacitor Use Cases"));
        assert!(!prompt.contains("## DICOM Printer 2 Use Cases"));
    }

    #[test]
    fn helper_personas_have_no_briefings() {
        let prompt = JSON_VALIDATOR.system_prompt(&knowledge(), &Product::defaults());
        assert!(!prompt.contains("FLUX PRODUCT KNOWLEDGE"));
        assert!(prompt.contains("JSON Format Validator"));
    }

    #[test]
    fn empty_use_case_briefing_is_skipped() {
        let prompt = VALUE_STRATEGIST.system_prompt(&knowledge(), &[Product::Gobbler]);
        assert!(!prompt.contains("DETAILED USE CASES:"));
    }

    #[test]
    fn industry_specialist_knows_the_challenges() {
        let prompt = INDUSTRY_SPECIALIST.system_prompt(&knowledge(), &Product::defaults());
        assert!(prompt.contains("HEALTHCARE IMAGING CHALLENGES:"));
        assert!(!prompt.contains("COMPETITIVE INTELLIGENCE:"));
    }
}
