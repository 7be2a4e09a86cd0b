use ai_client::truncate_to_char_boundary;
use dealsignal_common::{CandidateEntity, Thesis};
use schemars::JsonSchema;
use serde::{de, Deserialize, Serialize};
use serde_json::json;

use super::RankingConfig;

// --- LLM structured output types ---

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SynthesisResponse {
    #[serde(default, deserialize_with = "deserialize_companies")]
    pub companies: Vec<SynthesizedCompany>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SynthesizedCompany {
    /// Company name exactly as it appears in the candidates or evidence
    #[serde(default)]
    pub name: String,
    /// One or two sentences on what the company does
    #[serde(default)]
    pub description: String,
    /// Which signals point at it, e.g. "talent+ip"
    #[serde(default)]
    pub signal_type: String,
    /// "high", "medium" or "low"
    #[serde(default)]
    pub potential: String,
    /// 0-100 fit with the thesis
    #[serde(default, deserialize_with = "deserialize_score")]
    pub potential_score: f64,
}

/// Models sometimes wrap the array in a string.
fn deserialize_companies<'de, D>(deserializer: D) -> Result<Vec<SynthesizedCompany>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value).map_err(de::Error::custom),
        serde_json::Value::String(ref s) => serde_json::from_str(s).map_err(de::Error::custom),
        serde_json::Value::Null => Ok(Vec::new()),
        _ => Err(de::Error::custom("companies must be an array or JSON string")),
    }
}

/// Accept `85`, `85.5` or `"85"`; anything else scores 0.
fn deserialize_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or_default(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().unwrap_or_default(),
        _ => 0.0,
    })
}

// --- Prompts ---

const SYSTEM_PROMPT: &str = "\
You are an analyst at an early-stage venture fund. \
You receive an investment thesis, a list of candidate companies discovered from web search, \
and the search snippets that mention them. \
Rank the candidates that best fit the thesis. \
Only use companies that appear in the candidates list or the evidence snippets. Never invent companies. \
Describe each company from the evidence only; if the evidence says little, say so briefly. \
potential is \"high\", \"medium\" or \"low\"; potential_score is 0-100. \
signal_type names the signals behind the company (talent, ip, spin_off, look_alike), joined with '+'.";

pub fn system_prompt() -> String {
    let schema = schemars::schema_for!(SynthesisResponse);
    let schema_json = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!(
        "{SYSTEM_PROMPT}\n\nRespond with a single JSON object matching this schema and nothing else:\n{schema_json}"
    )
}

/// The user message: thesis, top candidates and supporting snippets.
pub fn user_prompt(
    thesis: &Thesis,
    candidates: &[CandidateEntity],
    desired_count: usize,
    config: &RankingConfig,
) -> String {
    let top = &candidates[..candidates.len().min(config.max_candidates_in_prompt)];

    let listed: Vec<_> = top
        .iter()
        .map(|c| {
            json!({
                "name": c.canonical_name(),
                "aliases": c.aliases(),
                "signals": c.signal_label(),
                "mentions": c.mention_count(),
            })
        })
        .collect();

    let snippets: Vec<_> = top
        .iter()
        .flat_map(|c| {
            c.evidence()
                .iter()
                .take(config.snippets_per_candidate)
                .map(move |hit| {
                    json!({
                        "candidate": c.canonical_name(),
                        "title": hit.title,
                        "url": hit.url,
                        "snippet": truncate_to_char_boundary(&hit.snippet, config.max_snippet_bytes),
                    })
                })
        })
        .take(config.max_evidence_snippets)
        .collect();

    let payload = json!({
        "thesis": {
            "sectors": thesis.normalized_sectors(),
            "stage": thesis.stage(),
            "geography": thesis.geography(),
            "ticketSize": thesis.ticket_size(),
            "criteria": thesis.free_text_criteria(),
            "referenceCompany": thesis.reference_company(),
        },
        "desiredCount": desired_count.min(top.len()),
        "candidates": listed,
        "evidence": snippets,
    });

    format!(
        "Rank up to {} companies for this thesis.\n\n{}",
        desired_count.min(top.len()),
        serde_json::to_string_pretty(&payload).unwrap_or_default()
    )
}
