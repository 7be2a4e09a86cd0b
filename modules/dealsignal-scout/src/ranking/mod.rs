//! Ranking/structuring: one synthesis call over the top candidates, with a
//! deterministic fallback whenever synthesis is missing or unusable.

pub mod prompt;
pub mod response;
pub mod synthesis;

pub use synthesis::SynthesisChain;

use std::sync::Arc;
use std::time::Duration;

use dealsignal_common::{CandidateEntity, EvidencePool, RankedCandidate, Thesis};
use tracing::{info, warn};

use crate::extraction::{EntityMatcher, ExactMatcher};

#[derive(Debug, Clone)]
pub struct RankingConfig {
    pub max_candidates_in_prompt: usize,
    pub max_evidence_snippets: usize,
    pub snippets_per_candidate: usize,
    pub max_snippet_bytes: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            max_candidates_in_prompt: 25,
            max_evidence_snippets: 30,
            snippets_per_candidate: 3,
            max_snippet_bytes: 300,
        }
    }
}

/// How the ranked list was produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisStatus {
    Synthesized { provider: String },
    /// No candidates, so nothing was sent.
    Skipped,
    Unconfigured,
    Failed(String),
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct RankingOutcome {
    pub candidates: Vec<RankedCandidate>,
    pub status: SynthesisStatus,
}

pub struct Ranker {
    chain: SynthesisChain,
    matcher: Arc<dyn EntityMatcher>,
    config: RankingConfig,
}

impl Ranker {
    pub fn new(chain: SynthesisChain, matcher: Arc<dyn EntityMatcher>, config: RankingConfig) -> Self {
        Self {
            chain,
            matcher,
            config,
        }
    }

    pub fn with_chain(chain: SynthesisChain) -> Self {
        Self::new(chain, Arc::new(ExactMatcher), RankingConfig::default())
    }

    /// Produce at most `min(desired_count, candidates.len())` ranked
    /// candidates. `budget` bounds the synthesis call; running out of it
    /// counts as a provider failure.
    pub async fn rank(
        &self,
        candidates: &[CandidateEntity],
        thesis: &Thesis,
        pool: &EvidencePool,
        desired_count: usize,
        budget: Duration,
    ) -> RankingOutcome {
        if candidates.is_empty() {
            return RankingOutcome {
                candidates: Vec::new(),
                status: SynthesisStatus::Skipped,
            };
        }

        let Some(provider) = self.chain.select() else {
            info!("No synthesis provider configured, returning raw candidates");
            return self.fallback(candidates, desired_count, SynthesisStatus::Unconfigured);
        };

        let system = prompt::system_prompt();
        let user = prompt::user_prompt(thesis, candidates, desired_count, &self.config);
        info!(
            provider = provider.provider(),
            model = provider.model(),
            candidates = candidates.len().min(self.config.max_candidates_in_prompt),
            "Synthesizing ranked candidates"
        );

        let text = match tokio::time::timeout(budget, provider.generate(&system, &user)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(provider = provider.provider(), error = %e, "Synthesis call failed");
                return self.fallback(candidates, desired_count, SynthesisStatus::Failed(e.to_string()));
            }
            Err(_) => {
                warn!(
                    provider = provider.provider(),
                    budget_ms = budget.as_millis() as u64,
                    "Synthesis call ran out of time"
                );
                let reason = "synthesis timed out".to_string();
                return self.fallback(candidates, desired_count, SynthesisStatus::Failed(reason));
            }
        };

        let companies = match response::parse(&text) {
            Ok(companies) => companies,
            Err(reason) => {
                warn!(provider = provider.provider(), reason = reason.as_str(), "Malformed synthesis output");
                return self.fallback(candidates, desired_count, SynthesisStatus::Malformed(reason));
            }
        };

        let ranked = response::validate(
            companies,
            candidates,
            pool,
            self.matcher.as_ref(),
            desired_count,
        );
        if ranked.is_empty() {
            let reason = "no grounded companies in synthesis output".to_string();
            warn!(provider = provider.provider(), "Synthesis named no known company");
            return self.fallback(candidates, desired_count, SynthesisStatus::Malformed(reason));
        }

        info!(ranked = ranked.len(), "Synthesis complete");
        RankingOutcome {
            candidates: ranked,
            status: SynthesisStatus::Synthesized {
                provider: provider.provider().to_string(),
            },
        }
    }

    fn fallback(
        &self,
        candidates: &[CandidateEntity],
        desired_count: usize,
        status: SynthesisStatus,
    ) -> RankingOutcome {
        RankingOutcome {
            candidates: response::fallback(candidates, desired_count),
            status,
        }
    }
}
