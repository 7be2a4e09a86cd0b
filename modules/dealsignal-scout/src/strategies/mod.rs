//! Sourcing heuristics. Each strategy turns a thesis into raw search texts;
//! the planner owns normalization, de-duplication and capping.

pub mod ip;
pub mod look_alike;
pub mod spin_off;
pub mod talent;

pub use ip::IpStrategy;
pub use look_alike::LookAlikeStrategy;
pub use spin_off::SpinOffStrategy;
pub use talent::TalentStrategy;

use std::sync::Arc;

use dealsignal_common::{StrategyKind, Thesis};

pub trait SignalStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Raw query texts in priority order. `sectors` is already normalized
    /// and never empty. May return nothing when the thesis gives this
    /// strategy nothing to work with.
    fn generate_queries(&self, thesis: &Thesis, sectors: &[String]) -> Vec<String>;
}

/// All four built-in strategies in their standard order.
pub fn default_strategies() -> Vec<Arc<dyn SignalStrategy>> {
    vec![
        Arc::new(TalentStrategy),
        Arc::new(IpStrategy),
        Arc::new(SpinOffStrategy),
        Arc::new(LookAlikeStrategy::default()),
    ]
}

/// Join the non-empty parts with single spaces.
pub(crate) fn compose(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strategies_cover_every_kind_once() {
        let kinds: Vec<_> = default_strategies().iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, StrategyKind::ALL.to_vec());
    }

    #[test]
    fn compose_skips_missing_and_blank_parts() {
        assert_eq!(
            compose(&[Some("hiring"), None, Some("  "), Some("CTO ")]),
            "hiring CTO"
        );
    }
}
