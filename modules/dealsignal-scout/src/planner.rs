use std::collections::HashSet;
use std::sync::Arc;

use dealsignal_common::{Query, StrategyKind, Thesis};
use tracing::{debug, info};

use crate::strategies::{default_strategies, SignalStrategy};

/// Used when the thesis names no sectors.
pub const DEFAULT_SECTORS: &[&str] = &["AI", "Climate Tech", "Fintech"];

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub max_queries_per_strategy: usize,
    pub max_query_chars: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_queries_per_strategy: 8,
            max_query_chars: 200,
        }
    }
}

/// Turns a thesis into the run's query list. Pure and deterministic: the
/// same thesis always yields the same queries in the same order.
pub struct QueryPlanner {
    strategies: Vec<Arc<dyn SignalStrategy>>,
    config: PlannerConfig,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new(default_strategies(), PlannerConfig::default())
    }
}

impl QueryPlanner {
    pub fn new(strategies: Vec<Arc<dyn SignalStrategy>>, config: PlannerConfig) -> Self {
        Self { strategies, config }
    }

    /// Configured strategy kinds, in plan order.
    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub fn plan(&self, thesis: &Thesis) -> Vec<Query> {
        let mut sectors = thesis.normalized_sectors();
        if sectors.is_empty() {
            sectors = DEFAULT_SECTORS.iter().map(|s| s.to_string()).collect();
            debug!("No sectors in thesis, using defaults");
        }

        let mut queries = Vec::new();
        for strategy in &self.strategies {
            let kind = strategy.kind();
            let mut seen = HashSet::new();
            let planned: Vec<Query> = strategy
                .generate_queries(thesis, &sectors)
                .iter()
                .filter_map(|raw| Query::new(raw, kind, 0, self.config.max_query_chars))
                .filter(|q| seen.insert(q.text.to_lowercase()))
                .take(self.config.max_queries_per_strategy)
                .enumerate()
                .map(|(i, q)| Query {
                    priority: i as u32,
                    ..q
                })
                .collect();

            debug!(strategy = %kind, count = planned.len(), "Planned strategy queries");
            queries.extend(planned);
        }

        info!(
            queries = queries.len(),
            strategies = self.strategies.len(),
            sectors = sectors.len(),
            "Query plan ready"
        );
        queries
    }
}
