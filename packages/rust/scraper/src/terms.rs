//! Healthcare IT vocabularies and the term matcher used by page analysis.
//!
//! All terms are lowercase and matched against lowercased text.

/// Paths requested on every facility site, homepage first.
pub const CANDIDATE_PATHS: &[&str] = &[
    "/",
    "/about",
    "/about-us",
    "/technology",
    "/services",
    "/solutions",
    "/radiology",
    "/imaging",
    "/our-team",
    "/staff",
    "/careers",
    "/jobs",
    "/it",
    "/information-technology",
    "/medical-imaging",
    "/pacs",
    "/locations",
    "/our-locations",
    "/centers",
    "/find-us",
    "/equipment",
    "/technologies",
    "/modalities",
    "/patient-info",
    "/patient-portal",
    "/for-patients",
    "/appointments",
    "/contact",
    "/contact-us",
    "/leadership",
    "/physicians",
    "/news",
    "/press",
    "/blog",
    "/events",
];

/// Term dictionary categories counted on every page.
pub const TERM_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "pacs",
        &[
            "pacs",
            "picture archiving",
            "image archiving",
            "archiving system",
            "imaging system",
            "radiological information",
            "ris",
        ],
    ),
    (
        "vendor",
        &[
            "ge healthcare",
            "siemens",
            "philips",
            "agfa",
            "fujifilm",
            "carestream",
            "mckesson",
            "merge",
            "intelerad",
            "sectra",
            "cerner",
            "epic",
            "allscripts",
            "meditech",
            "nuance",
            "hyland",
            "change healthcare",
            "ibm watson",
        ],
    ),
    (
        "imaging",
        &[
            "ct scan",
            "mri",
            "ultrasound",
            "x-ray",
            "radiograph",
            "fluoroscopy",
            "mammography",
            "nuclear medicine",
            "pet scan",
            "radiology",
            "imaging",
            "radiologist",
            "sonographer",
            "modality",
            "dicom",
            "3t",
            "1.5t",
            "tesla",
        ],
    ),
    (
        "workflow",
        &[
            "workflow",
            "efficiency",
            "productivity",
            "throughput",
            "turnaround time",
            "report",
            "dictation",
            "voice recognition",
            "integration",
            "interface",
            "downtime",
            "reliability",
            "upgrade",
            "migration",
            "replacement",
            "interoperability",
            "referring physician",
            "portal",
        ],
    ),
    (
        "pain_point",
        &[
            "challenge",
            "issue",
            "problem",
            "difficult",
            "slow",
            "outdated",
            "legacy",
            "obsolete",
            "maintenance",
            "support",
            "cost",
            "expensive",
            "budget",
            "compliance",
            "hipaa",
            "security",
            "patient safety",
            "burnout",
            "shortage",
            "manual",
            "error",
            "inefficient",
        ],
    ),
    (
        "technology_stack",
        &[
            "cloud",
            "server",
            "storage",
            "virtualization",
            "vmware",
            "microsoft",
            "linux",
            "database",
            "sql",
            "oracle",
            "redundancy",
            "backup",
            "disaster recovery",
            "high availability",
            "san",
            "nas",
            "vendor neutral archive",
            "vna",
        ],
    ),
    (
        "modernization",
        &[
            "upgrade",
            "implementation",
            "project",
            "initiative",
            "strategic",
            "roadmap",
            "plan",
            "future",
            "investment",
            "transform",
            "improvement",
            "modernize",
            "enhance",
            "optimize",
            "expansion",
            "growth",
        ],
    ),
];

// ---------------------------------------------------------------------------
// Equipment and vendors
// ---------------------------------------------------------------------------

pub const EQUIPMENT_TYPES: &[(&str, &[&str])] = &[
    ("CT Scanner", &["ct scanner", "computed tomography", "ct scan"]),
    ("MRI", &["mri", "magnetic resonance", "tesla"]),
    ("X-Ray", &["x-ray", "radiography", "digital radiography"]),
    ("Ultrasound", &["ultrasound", "sonogram", "doppler"]),
    ("Mammography", &["mammogram", "mammography", "breast imaging"]),
    ("PET", &["pet scan", "pet/ct", "positron emission"]),
    ("Nuclear Medicine", &["nuclear medicine", "spect", "gamma camera"]),
];

/// Modality vendors as `(term, display name)`.
pub const EQUIPMENT_VENDORS: &[(&str, &str)] = &[
    ("ge", "GE"),
    ("siemens", "Siemens"),
    ("philips", "Philips"),
    ("toshiba", "Toshiba"),
    ("canon", "Canon"),
    ("hitachi", "Hitachi"),
    ("samsung", "Samsung"),
    ("fujifilm", "Fujifilm"),
];

pub const PACS_VENDORS: &[(&str, &[&str])] = &[
    ("GE Healthcare", &["ge healthcare", "ge pacs", "centricity"]),
    ("Philips", &["philips", "intellispace"]),
    ("Siemens", &["siemens", "syngo"]),
    ("Fujifilm", &["fujifilm", "synapse"]),
    ("Agfa", &["agfa", "impax", "enterprise imaging"]),
    ("Carestream", &["carestream", "vue pacs"]),
    ("Merge (IBM)", &["merge", "merge pacs"]),
    ("Sectra", &["sectra"]),
    ("Intelerad", &["intelerad"]),
    ("Change Healthcare", &["change healthcare", "mckesson"]),
    ("Hyland", &["hyland", "acuo", "nilread"]),
];

pub const RIS_VENDORS: &[(&str, &[&str])] = &[
    ("Epic Radiant", &["epic", "radiant"]),
    ("Cerner", &["cerner", "radnet"]),
    ("Meditech", &["meditech"]),
    ("Allscripts", &["allscripts"]),
    ("GE Healthcare", &["ge", "centricity ris"]),
    ("Merge (IBM)", &["merge ris"]),
    ("Fujifilm", &["fujifilm ris", "synapse ris"]),
];

pub const EMR_SYSTEMS: &[(&str, &[&str])] = &[
    ("Epic", &["epic", "epic systems", "epic emr", "epic ehr"]),
    ("Cerner", &["cerner", "cerner millennium", "cerner ehr"]),
    ("Meditech", &["meditech", "meditech ehr"]),
    ("Allscripts", &["allscripts", "allscripts professional"]),
    ("athenahealth", &["athenahealth", "athenaclinicals"]),
    ("eClinicalWorks", &["eclinicalworks", "ecw"]),
    ("NextGen", &["nextgen", "nextgen healthcare"]),
    ("Greenway", &["greenway", "greenway health", "prime suite"]),
];

pub const INFRASTRUCTURE: &[(&str, &[&str])] = &[
    ("Cloud-based", &["cloud", "aws", "azure", "google cloud"]),
    ("On-premise", &["on-premise", "on-prem", "local server", "data center"]),
    (
        "Virtualized Environment",
        &["vmware", "virtualization", "virtual server"],
    ),
    (
        "Enterprise Storage",
        &["san", "nas", "storage area network", "network attached storage"],
    ),
    ("VNA", &["vendor neutral archive", "vna"]),
    (
        "Enterprise Imaging Strategy",
        &["enterprise imaging", "integrated imaging"],
    ),
];

pub const MODALITIES: &[(&str, &[&str])] = &[
    ("CT", &["ct scan", "computed tomography", "ct scanner"]),
    ("MRI", &["mri", "magnetic resonance", "mri scanner"]),
    ("Ultrasound", &["ultrasound", "sonography", "doppler"]),
    (
        "X-ray",
        &["x-ray", "radiography", "digital radiography", "dr"],
    ),
    ("Mammography", &["mammography", "mammogram", "breast imaging"]),
    ("Nuclear Medicine", &["nuclear medicine", "pet", "pet/ct", "spect"]),
    ("Interventional", &["interventional", "angiography", "fluoroscopy"]),
    ("Dental", &["dental", "cone beam", "cbct", "panoramic"]),
];

// ---------------------------------------------------------------------------
// Sentence-level indicators
// ---------------------------------------------------------------------------

pub const GROWTH_TERMS: &[&str] = &[
    "expansion",
    "growing",
    "new facility",
    "new location",
    "construction",
    "renovation",
    "upgrade",
    "investment",
    "strategic plan",
    "future",
    "initiative",
    "advancing",
    "state-of-the-art",
    "cutting edge",
    "innovation",
];

pub const PAIN_TERMS: &[&str] = &[
    "challenge",
    "difficult",
    "problem",
    "issue",
    "obstacle",
    "inefficient",
    "slow",
    "legacy",
    "outdated",
    "obsolete",
    "burden",
    "costly",
    "expensive",
    "time-consuming",
    "manual",
    "error",
    "mistake",
    "downtime",
    "failure",
    "compliance",
    "backlog",
    "delay",
    "wait time",
    "turnaround",
];

pub const IMPLEMENTATION_VERBS: &[&str] = &[
    "implemented",
    "deployed",
    "installed",
    "upgraded to",
    "migrated to",
    "adopted",
    "switched to",
    "partnered with",
];

pub const IMPLEMENTATION_TECH: &[&str] = &[
    "pacs",
    "ris",
    "emr",
    "ehr",
    "vna",
    "radiology information system",
    "electronic health record",
    "vendor neutral archive",
    "cloud",
];

pub const REFRESH_TERMS: &[&str] = &[
    "refresh",
    "upgrade",
    "replace",
    "update",
    "modernize",
    "new system",
    "implementation",
    "migration",
];

pub const REFRESH_TECH: &[&str] = &[
    "system",
    "pacs",
    "ris",
    "equipment",
    "workstation",
    "server",
    "infrastructure",
    "software",
    "hardware",
];

pub const REFRESH_TIME: &[&str] = &["years", "annually", "cycle", "schedule", "phase"];

/// Accrediting bodies as displayed; matched case-insensitively.
pub const ACCREDITATION_ORGS: &[&str] = &[
    "ACR",
    "American College of Radiology",
    "Joint Commission",
    "JCAHO",
    "IAC",
    "Intersocietal Accreditation Commission",
    "FDA",
    "Food and Drug",
    "CAP",
    "College of American Pathologists",
    "AIUM",
    "American Institute of Ultrasound in Medicine",
];

pub const LEADERSHIP_TITLES: &[&str] = &[
    "ceo",
    "cio",
    "cto",
    "chief",
    "director",
    "president",
    "vp",
    "vice president",
    "head",
    "manager",
    "lead",
    "principal",
    "radiologist",
    "chairman",
    "founder",
    "administrator",
    "medical director",
];

pub const JOB_ROLE_TERMS: &[&str] = &[
    "specialist",
    "technologist",
    "engineer",
    "analyst",
    "administrator",
    "director",
    "manager",
];

/// Facility types used by the volume estimate, first match wins.
pub const FACILITY_TYPES: &[(&str, &[&str])] = &[
    ("hospital", &["hospital", "medical center", "health system"]),
    (
        "imaging_center",
        &["imaging center", "diagnostic center", "radiology center"],
    ),
    (
        "physician_practice",
        &["physician practice", "medical practice", "clinic"],
    ),
    ("outpatient", &["outpatient", "ambulatory"]),
];

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Count occurrences of `term` in lowercased `text`.
///
/// A match must start at a word boundary. Terms of three characters or
/// fewer must also end at one (an `s` plural is allowed), so `ge` does not
/// match inside `image` and `ris` does not match inside `paris`.
pub fn count_term(text: &str, term: &str) -> usize {
    if term.is_empty() {
        return 0;
    }
    let short = term.chars().count() <= 3;
    text.match_indices(term)
        .filter(|(start, _)| {
            let end = start + term.len();
            starts_word(text, *start) && (!short || ends_word(text, end))
        })
        .count()
}

/// Whether `term` occurs in lowercased `text`.
pub fn contains_term(text: &str, term: &str) -> bool {
    count_term(text, term) > 0
}

/// Whether any of `terms` occurs in lowercased `text`.
pub fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| contains_term(text, t))
}

fn starts_word(text: &str, idx: usize) -> bool {
    text[..idx]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_alphanumeric())
}

fn ends_word(text: &str, idx: usize) -> bool {
    let mut rest = text[idx..].chars();
    match rest.next() {
        None => true,
        Some('s') => rest.next().is_none_or(|c| !c.is_alphanumeric()),
        Some(c) => !c.is_alphanumeric(),
    }
}

/// Split text into sentences after `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?')
            && chars.peek().is_some_and(|(_, next)| next.is_whitespace())
        {
            let end = idx + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            while chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
                chars.next();
            }
            start = chars.peek().map_or(text.len(), |(i, _)| *i);
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
