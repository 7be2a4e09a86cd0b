use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DealSignalError;

// --- Strategy kinds ---

/// The sourcing heuristic that produced a query or hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Talent,
    Ip,
    SpinOff,
    LookAlike,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Talent,
        StrategyKind::Ip,
        StrategyKind::SpinOff,
        StrategyKind::LookAlike,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Talent => "talent",
            StrategyKind::Ip => "ip",
            StrategyKind::SpinOff => "spin_off",
            StrategyKind::LookAlike => "look_alike",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// --- Inbound request ---

pub const DEFAULT_DESIRED_COUNT: usize = 5;
pub const MAX_DESIRED_COUNT: usize = 50;
pub const MAX_FIELD_CHARS: usize = 500;
pub const MAX_SECTORS: usize = 20;

/// Investment criteria driving one sourcing run. Read-only inside the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thesis {
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub geography: Option<String>,
    #[serde(default, alias = "ticket_size")]
    pub ticket_size: Option<String>,
    #[serde(default, alias = "free_text_criteria")]
    pub free_text_criteria: Option<String>,
    /// Seed company for the look-alike strategy.
    #[serde(default, alias = "reference_company")]
    pub reference_company: Option<String>,
}

impl Thesis {
    /// Sectors with set semantics: trimmed, blanks dropped, case-insensitive
    /// duplicates removed keeping the first spelling and order.
    pub fn normalized_sectors(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sectors
            .iter()
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.to_lowercase()))
            .collect()
    }

    pub fn stage(&self) -> Option<&str> {
        non_blank(&self.stage)
    }

    pub fn geography(&self) -> Option<&str> {
        non_blank(&self.geography)
    }

    pub fn ticket_size(&self) -> Option<&str> {
        non_blank(&self.ticket_size)
    }

    pub fn free_text_criteria(&self) -> Option<&str> {
        non_blank(&self.free_text_criteria)
    }

    pub fn reference_company(&self) -> Option<&str> {
        non_blank(&self.reference_company)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn default_desired_count() -> usize {
    DEFAULT_DESIRED_COUNT
}

/// Thesis fields plus how many ranked candidates the caller wants back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcingRequest {
    #[serde(flatten)]
    pub thesis: Thesis,
    #[serde(default = "default_desired_count", alias = "desired_count")]
    pub desired_count: usize,
}

impl SourcingRequest {
    pub fn new(thesis: Thesis, desired_count: usize) -> Self {
        Self {
            thesis,
            desired_count,
        }
    }

    /// Parse and validate a JSON request body. Shape errors (e.g. `sectors`
    /// not being a list of strings) are validation errors.
    pub fn from_json(body: &str) -> Result<Self, DealSignalError> {
        let request: Self = serde_json::from_str(body)
            .map_err(|e| DealSignalError::validation(format!("malformed request: {e}")))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), DealSignalError> {
        if self.desired_count == 0 || self.desired_count > MAX_DESIRED_COUNT {
            return Err(DealSignalError::validation(format!(
                "desiredCount must be between 1 and {MAX_DESIRED_COUNT}, got {}",
                self.desired_count
            )));
        }
        if self.thesis.sectors.len() > MAX_SECTORS {
            return Err(DealSignalError::validation(format!(
                "at most {MAX_SECTORS} sectors are supported, got {}",
                self.thesis.sectors.len()
            )));
        }

        let t = &self.thesis;
        let fields = [
            ("stage", t.stage.as_deref()),
            ("geography", t.geography.as_deref()),
            ("ticketSize", t.ticket_size.as_deref()),
            ("freeTextCriteria", t.free_text_criteria.as_deref()),
            ("referenceCompany", t.reference_company.as_deref()),
        ];
        let sectors = t.sectors.iter().map(|s| ("sectors", Some(s.as_str())));
        for (name, value) in fields.into_iter().chain(sectors) {
            if let Some(v) = value {
                if v.chars().count() > MAX_FIELD_CHARS {
                    return Err(DealSignalError::validation(format!(
                        "{name} exceeds {MAX_FIELD_CHARS} characters"
                    )));
                }
            }
        }
        Ok(())
    }
}

// --- Queries and hits ---

/// One search query planned for a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub text: String,
    pub strategy: StrategyKind,
    pub priority: u32,
}

impl Query {
    /// Collapse whitespace and cap the text at `max_chars` characters.
    /// Returns `None` when nothing is left.
    pub fn new(
        text: &str,
        strategy: StrategyKind,
        priority: u32,
        max_chars: usize,
    ) -> Option<Self> {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let capped: String = collapsed.chars().take(max_chars).collect();
        let text = capped.trim().to_string();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text,
            strategy,
            priority,
        })
    }
}

/// A normalized search result. Missing upstream fields are empty, never absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub extra_snippets: Vec<String>,
    pub source_strategy: StrategyKind,
}

impl SearchHit {
    /// Text mined for company names.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.snippet)
    }

    /// Identity used to recognise the same page surfacing more than once.
    pub fn identity(&self) -> String {
        let url = self.url.trim().trim_end_matches('/').to_lowercase();
        if url.is_empty() {
            format!("{}|{}", self.title.trim(), self.snippet.trim())
        } else {
            url
        }
    }
}

/// A hit together with the planned query that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub query_index: usize,
    pub query: String,
    /// Rank of the hit within its query's result list.
    pub position: usize,
    pub hit: SearchHit,
}

/// All evidence collected during one run, in planned-query order.
/// Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvidencePool {
    items: Vec<Evidence>,
}

impl EvidencePool {
    pub fn new(items: Vec<Evidence>) -> Self {
        Self { items }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Evidence> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Hit counts per strategy. Every kind in `kinds` is present, zero if it
    /// produced nothing.
    pub fn strategy_counts(&self, kinds: &[StrategyKind]) -> BTreeMap<StrategyKind, usize> {
        let mut counts: BTreeMap<StrategyKind, usize> = kinds.iter().map(|k| (*k, 0)).collect();
        for item in &self.items {
            *counts.entry(item.hit.source_strategy).or_default() += 1;
        }
        counts
    }

    /// First `max` evidence items, for the response payload.
    pub fn truncated(&self, max: usize) -> Vec<Evidence> {
        self.items.iter().take(max).cloned().collect()
    }
}

// --- Candidates ---

/// A deduplicated company inferred from one or more hits.
///
/// Only grows within a run. `mention_count()` is the number of distinct
/// supporting hits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEntity {
    canonical_name: String,
    aliases: Vec<String>,
    evidence: Vec<SearchHit>,
    strategy_signals: BTreeSet<StrategyKind>,
    #[serde(skip)]
    seen_hits: HashSet<String>,
}

impl CandidateEntity {
    pub fn new(canonical_name: impl Into<String>, raw_name: &str, hit: &SearchHit) -> Self {
        let mut entity = Self {
            canonical_name: canonical_name.into(),
            aliases: Vec::new(),
            evidence: Vec::new(),
            strategy_signals: BTreeSet::new(),
            seen_hits: HashSet::new(),
        };
        entity.record(raw_name, hit);
        entity
    }

    /// Attach another mention. The hit is appended only if this entity has
    /// not seen the same page before; strategy and alias are merged either
    /// way. Returns whether evidence grew.
    pub fn record(&mut self, raw_name: &str, hit: &SearchHit) -> bool {
        let alias = raw_name.trim();
        if !alias.is_empty() && !self.aliases.iter().any(|a| a == alias) {
            self.aliases.push(alias.to_string());
        }
        self.strategy_signals.insert(hit.source_strategy);
        if self.seen_hits.insert(hit.identity()) {
            self.evidence.push(hit.clone());
            true
        } else {
            false
        }
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn evidence(&self) -> &[SearchHit] {
        &self.evidence
    }

    pub fn strategy_signals(&self) -> &BTreeSet<StrategyKind> {
        &self.strategy_signals
    }

    pub fn mention_count(&self) -> usize {
        self.evidence.len()
    }

    /// Strategy names joined with `+`, e.g. `talent+ip`.
    pub fn signal_label(&self) -> String {
        self.strategy_signals
            .iter()
            .map(StrategyKind::as_str)
            .collect::<Vec<_>>()
            .join("+")
    }
}

// --- Output ---

/// A scored, explained candidate returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub name: String,
    pub description: String,
    pub signal_type: String,
    /// Qualitative assessment: `high`, `medium`, `low` or `unknown`.
    pub potential: String,
    /// 0-100.
    pub potential_score: f64,
    /// 1-based.
    pub rank: usize,
    pub mention_count: usize,
}

/// Why a completed run is marked degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// No search credential configured.
    SearchUnavailable,
    /// Search configured but every query came back empty or failed.
    NoEvidence,
    /// No synthesis provider configured. Needs setup, not a retry.
    SynthesisUnconfigured,
    SynthesisFailed,
    SynthesisMalformed,
}

impl Degradation {
    pub fn requires_setup(&self) -> bool {
        matches!(
            self,
            Degradation::SearchUnavailable | Degradation::SynthesisUnconfigured
        )
    }
}

/// Why a single search query contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Http,
    RateLimited,
    QuotaExceeded,
    Malformed,
    Unconfigured,
}

impl FailureKind {
    pub const ALL: [FailureKind; 6] = [
        FailureKind::Timeout,
        FailureKind::Http,
        FailureKind::RateLimited,
        FailureKind::QuotaExceeded,
        FailureKind::Malformed,
        FailureKind::Unconfigured,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Http => "http",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::QuotaExceeded => "quota_exceeded",
            FailureKind::Malformed => "malformed",
            FailureKind::Unconfigured => "unconfigured",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Counters from a sourcing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub queries_planned: usize,
    pub queries_completed: usize,
    pub queries_abandoned: usize,
    pub failures: BTreeMap<FailureKind, u64>,
    pub hits_collected: usize,
    pub candidates_extracted: usize,
    pub synthesis_provider: Option<String>,
    pub elapsed_ms: u64,
}

impl RunStats {
    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Sourcing Run Complete ===")?;
        writeln!(f, "Queries planned:    {}", self.queries_planned)?;
        writeln!(f, "Queries completed:  {}", self.queries_completed)?;
        writeln!(f, "Queries abandoned:  {}", self.queries_abandoned)?;
        writeln!(f, "Query failures:     {}", self.total_failures())?;
        for (kind, count) in self.failures.iter().filter(|(_, c)| **c > 0) {
            writeln!(f, "  {kind:<16}{count}")?;
        }
        writeln!(f, "Hits collected:     {}", self.hits_collected)?;
        writeln!(f, "Candidates:         {}", self.candidates_extracted)?;
        writeln!(
            f,
            "Synthesis provider: {}",
            self.synthesis_provider.as_deref().unwrap_or("none")
        )?;
        write!(f, "Elapsed:            {} ms", self.elapsed_ms)
    }
}

/// Final output of one sourcing run. Handed to the caller, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub candidates: Vec<RankedCandidate>,
    pub evidence: Vec<Evidence>,
    pub strategy_counts: BTreeMap<StrategyKind, usize>,
    pub degraded: bool,
    pub degradations: Vec<Degradation>,
    pub setup_required: bool,
    pub timed_out: bool,
    pub stats: RunStats,
}
