//! Sourcing run orchestration.
//!
//! plan -> fan-out search (bounded, budgeted) -> aggregate -> extract ->
//! rank. Every worker returns its own `QueryResult`; nothing mutable is
//! shared across workers except the gateway's semaphore and counters.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dealsignal_common::{
    Config, DealSignalError, Degradation, PipelineResult, RunStats, SourcingRequest,
};
use tokio::task::JoinSet;
use tracing::{info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::aggregator::{aggregate, QueryResult};
use crate::extraction::{
    Deduplicator, EntityMatcher, ExactMatcher, ExtractionLimits, HeuristicExtractor,
    NameExtractor,
};
use crate::planner::{PlannerConfig, QueryPlanner};
use crate::ranking::{Ranker, RankingConfig, SynthesisChain, SynthesisStatus};
use crate::search::{BraveSearcher, GatewayConfig, NoopSearcher, SearchGateway, WebSearcher};
use crate::strategies::{default_strategies, SignalStrategy};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub planner: PlannerConfig,
    pub gateway: GatewayConfig,
    pub ranking: RankingConfig,
    pub limits: ExtractionLimits,
    /// Wall-clock budget for the whole run.
    pub run_budget: Duration,
    /// Synthesis always gets at least this long, even late in the run.
    pub min_synthesis_budget: Duration,
    pub max_evidence_in_result: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            planner: PlannerConfig::default(),
            gateway: GatewayConfig::default(),
            ranking: RankingConfig::default(),
            limits: ExtractionLimits::default(),
            run_budget: Duration::from_secs(45),
            min_synthesis_budget: Duration::from_secs(10),
            max_evidence_in_result: 50,
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            planner: PlannerConfig {
                max_queries_per_strategy: config.max_queries_per_strategy,
                ..defaults.planner
            },
            gateway: GatewayConfig {
                max_concurrent: config.max_concurrent_searches,
                results_per_query: config.results_per_query,
                call_timeout: Duration::from_secs(config.search_timeout_secs),
                query_budget: Duration::from_secs(config.search_timeout_secs) * 3 / 2,
                quota: config.search_quota,
                ..defaults.gateway
            },
            run_budget: Duration::from_secs(config.run_budget_secs),
            ..defaults
        }
    }
}

#[derive(TypedBuilder)]
pub struct SourcingPipeline {
    searcher: Arc<dyn WebSearcher>,
    #[builder(default)]
    synthesis: SynthesisChain,
    #[builder(default = default_strategies())]
    strategies: Vec<Arc<dyn SignalStrategy>>,
    #[builder(default = Arc::new(HeuristicExtractor::default()) as Arc<dyn NameExtractor>)]
    extractor: Arc<dyn NameExtractor>,
    #[builder(default = Arc::new(ExactMatcher) as Arc<dyn EntityMatcher>)]
    matcher: Arc<dyn EntityMatcher>,
    #[builder(default)]
    config: PipelineConfig,
}

impl SourcingPipeline {
    /// Production wiring: Brave search when a key is present, synthesis
    /// providers in their fixed order.
    pub fn from_config(config: &Config) -> Self {
        let searcher: Arc<dyn WebSearcher> = match &config.brave_search_api_key {
            Some(key) => {
                let mut brave = BraveSearcher::new(key);
                if let Some(url) = &config.brave_search_url {
                    brave = brave.with_base_url(url);
                }
                Arc::new(brave)
            }
            None => Arc::new(NoopSearcher),
        };
        let pipeline_config = PipelineConfig::from_config(config);
        let synthesis = SynthesisChain::from_config(config, pipeline_config.run_budget);

        Self::builder()
            .searcher(searcher)
            .synthesis(synthesis)
            .config(pipeline_config)
            .build()
    }

    pub fn search_available(&self) -> bool {
        self.searcher.is_configured()
    }

    /// One sourcing run. Only a malformed request is an error; every
    /// upstream problem degrades the result instead.
    pub async fn run(&self, request: &SourcingRequest) -> Result<PipelineResult, DealSignalError> {
        request.validate()?;

        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.run_budget;
        let thesis = &request.thesis;
        info!(%run_id, desired = request.desired_count, "Sourcing run starting");

        // --- Plan ---
        let planner = QueryPlanner::new(self.strategies.clone(), self.config.planner.clone());
        let kinds = planner.kinds();
        let queries = planner.plan(thesis);

        // --- Search fan-out ---
        let gateway = Arc::new(SearchGateway::new(
            self.searcher.clone(),
            self.config.gateway.clone(),
        ));
        if !gateway.is_available() {
            warn!(%run_id, "Search is not configured; run will carry no evidence");
        }

        let mut tasks = JoinSet::new();
        for (query_index, query) in queries.iter().cloned().enumerate() {
            let gateway = gateway.clone();
            tasks.spawn(async move {
                let hits = gateway.execute(&query).await;
                QueryResult {
                    query_index,
                    query,
                    hits,
                }
            });
        }

        let mut results = Vec::with_capacity(queries.len());
        let mut abandoned = 0;
        let mut timed_out = false;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(result))) => results.push(result),
                Ok(Some(Err(e))) => {
                    abandoned += 1;
                    warn!(error = %e, "Query task failed");
                }
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    abandoned += tasks.len();
                    tasks.abort_all();
                    warn!(
                        %run_id,
                        abandoned,
                        completed = results.len(),
                        "Run budget exhausted, continuing with partial evidence"
                    );
                    break;
                }
            }
        }
        gateway.log_status();

        // --- Aggregate and extract ---
        let completed = results.len();
        let pool = aggregate(results);
        let strategy_counts = pool.strategy_counts(&kinds);
        let dedup = Deduplicator::new(
            self.extractor.clone(),
            self.matcher.clone(),
            self.config.limits.clone(),
        )
        .excluding_thesis(thesis);
        let candidates = dedup.extract(&pool);
        info!(
            hits = pool.len(),
            candidates = candidates.len(),
            "Evidence aggregated"
        );

        // --- Rank ---
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let synthesis_budget = remaining.max(self.config.min_synthesis_budget);
        let ranker = Ranker::new(
            self.synthesis.clone(),
            self.matcher.clone(),
            self.config.ranking.clone(),
        );
        let outcome = ranker
            .rank(
                &candidates,
                thesis,
                &pool,
                request.desired_count,
                synthesis_budget,
            )
            .await;

        // --- Assemble ---
        let mut degradations = Vec::new();
        if !gateway.is_available() {
            degradations.push(Degradation::SearchUnavailable);
        } else if pool.is_empty() {
            degradations.push(Degradation::NoEvidence);
        }
        let mut synthesis_provider = None;
        match &outcome.status {
            SynthesisStatus::Synthesized { provider } => synthesis_provider = Some(provider.clone()),
            SynthesisStatus::Unconfigured => degradations.push(Degradation::SynthesisUnconfigured),
            SynthesisStatus::Failed(_) => degradations.push(Degradation::SynthesisFailed),
            SynthesisStatus::Malformed(_) => degradations.push(Degradation::SynthesisMalformed),
            SynthesisStatus::Skipped if !self.synthesis.is_configured() => {
                degradations.push(Degradation::SynthesisUnconfigured)
            }
            SynthesisStatus::Skipped => {}
        }

        let stats = RunStats {
            queries_planned: queries.len(),
            queries_completed: completed,
            queries_abandoned: abandoned,
            failures: gateway.failure_counts(),
            hits_collected: pool.len(),
            candidates_extracted: candidates.len(),
            synthesis_provider,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!("{stats}");

        Ok(PipelineResult {
            run_id,
            generated_at: Utc::now(),
            candidates: outcome.candidates,
            evidence: pool.truncated(self.config.max_evidence_in_result),
            strategy_counts,
            degraded: !degradations.is_empty(),
            setup_required: degradations.iter().any(Degradation::requires_setup),
            degradations,
            timed_out,
            stats,
        })
    }
}
