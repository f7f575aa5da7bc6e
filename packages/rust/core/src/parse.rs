//! Recover a facility profile from free-form model output.
//!
//! Models asked for JSON still wrap it in prose, nest objects, or emit
//! "Final Answer:" scaffolding. Parsing tries progressively looser readings:
//! direct JSON, the outermost `{...}` block, the text after "Final Answer:",
//! and finally per-field regex salvage.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use fluxsales_shared::{FacilityDetails, FluxSalesError, Result};

const STRING_FIELDS: [&str; 8] = [
    "name",
    "location",
    "type",
    "size",
    "current_infrastructure",
    "key_challenge",
    "recent_events",
    "budget_cycle",
];

static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"));
static PAIN_POINTS_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"pain_points":\s*\[(.*?)\]"#).expect("valid regex"));
static FIELD_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    STRING_FIELDS
        .iter()
        .map(|field| {
            let re = Regex::new(&format!(r#""{field}":\s*"([^"]+)""#)).expect("valid regex");
            (*field, re)
        })
        .collect()
});

/// Parse a model reply into facility details.
///
/// Errors when no reading yields a single non-empty facility field.
pub fn parse_agent_output(text: &str) -> Result<FacilityDetails> {
    let details = json_object(text)
        .or_else(|| salvage_fields(text))
        .map(|object| facility_from_json(&object))
        .filter(|details| *details != FacilityDetails::default())
        .ok_or_else(|| FluxSalesError::parse("no facility details found in model output"))?;
    Ok(details)
}

fn json_object(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text.trim();
    if let Some(obj) = as_object(trimmed) {
        return Some(obj);
    }
    if let Some(obj) = JSON_BLOCK.find(trimmed).and_then(|m| as_object(m.as_str())) {
        debug!("parsed JSON block embedded in output");
        return Some(obj);
    }
    let (_, answer) = trimmed.split_once("Final Answer:")?;
    as_object(answer.trim())
}

fn as_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn salvage_fields(text: &str) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    for (field, re) in FIELD_PATTERNS.iter() {
        if let Some(caps) = re.captures(text) {
            map.insert((*field).to_string(), Value::String(caps[1].to_string()));
        }
    }
    if let Some(caps) = PAIN_POINTS_ARRAY.captures(text) {
        let points: Vec<Value> = caps[1]
            .split(',')
            .map(|p| p.trim().trim_matches('"').trim())
            .filter(|p| !p.is_empty())
            .map(|p| Value::String(p.to_string()))
            .collect();
        map.insert("pain_points".into(), Value::Array(points));
    }

    if map.is_empty() {
        None
    } else {
        debug!(fields = map.len(), "salvaged facility fields by pattern");
        Some(map)
    }
}

/// Flatten a possibly nested facility object into [`FacilityDetails`].
pub fn facility_from_json(obj: &Map<String, Value>) -> FacilityDetails {
    FacilityDetails {
        name: obj.get("name").and_then(flatten_text).unwrap_or_default(),
        website_url: obj.get("website_url").and_then(flatten_text),
        location: obj.get("location").and_then(flatten_text),
        facility_type: obj.get("type").and_then(flatten_type),
        size: obj.get("size").and_then(flatten_size),
        current_infrastructure: obj.get("current_infrastructure").and_then(flatten_text),
        key_challenge: obj.get("key_challenge").and_then(flatten_text),
        recent_events: obj.get("recent_events").and_then(flatten_text),
        budget_cycle: obj.get("budget_cycle").and_then(flatten_text),
        pain_points: obj.get("pain_points").map(pain_points).unwrap_or_default(),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Strings pass through; objects yield `value`/`description`/`text` or
/// their first entry; arrays are comma-joined.
fn flatten_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            for key in ["value", "description", "text"] {
                if let Some(v) = map.get(key).and_then(flatten_text) {
                    return Some(v);
                }
            }
            map.values().next().and_then(flatten_text)
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(flatten_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => scalar_text(other),
    }
}

fn flatten_type(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get("facility_type")
            .and_then(flatten_text)
            .or_else(|| map.values().next().and_then(flatten_text)),
        other => flatten_text(other),
    }
}

/// `{"locations": 3, "annual_studies": "45,000"}` → "3 locations, 45,000 studies annually".
fn flatten_size(value: &Value) -> Option<String> {
    let Value::Object(map) = value else {
        return flatten_text(value);
    };

    let mut parts = Vec::new();
    if let Some(locations) = map
        .get("number_of_locations")
        .or_else(|| map.get("locations"))
        .and_then(flatten_text)
    {
        parts.push(format!("{locations} locations"));
    }
    if let Some(studies) = map.get("annual_studies").and_then(flatten_text) {
        parts.push(format!("{studies} studies annually"));
    }

    if parts.is_empty() {
        flatten_text(value)
    } else {
        Some(parts.join(", "))
    }
}

/// A list, or a newline/comma separated string.
fn pain_points(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(map) => map
                    .get("issue")
                    .and_then(flatten_text)
                    .or_else(|| flatten_text(item)),
                other => flatten_text(other),
            })
            .collect(),
        Value::String(s) => {
            let sep = if s.contains('\n') { '\n' } else { ',' };
            s.split(sep).filter_map(non_empty).collect()
        }
        other => flatten_text(other).into_iter().collect(),
    }
}
