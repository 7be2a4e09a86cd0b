use dealsignal_common::{StrategyKind, Thesis};

use super::{compose, SignalStrategy};

const TEMPLATES: &[&str] = &[
    "companies like {x}",
    "alternative to {x}",
    "{x} competitors",
    "startups similar to {x}",
];

pub const DEFAULT_MAX_HEADCOUNT: u32 = 200;

/// Competitors of a seed company, kept small with a headcount ceiling.
/// Produces nothing unless the thesis names a reference company.
pub struct LookAlikeStrategy {
    pub max_headcount: u32,
}

impl Default for LookAlikeStrategy {
    fn default() -> Self {
        Self {
            max_headcount: DEFAULT_MAX_HEADCOUNT,
        }
    }
}

impl SignalStrategy for LookAlikeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LookAlike
    }

    fn generate_queries(&self, thesis: &Thesis, sectors: &[String]) -> Vec<String> {
        let Some(reference) = thesis.reference_company() else {
            return Vec::new();
        };
        let ceiling = format!("under {} employees", self.max_headcount);
        let sector = sectors.first().map(String::as_str);

        TEMPLATES
            .iter()
            .map(|template| {
                let base = template.replace("{x}", reference);
                compose(&[
                    Some(base.as_str()),
                    sector,
                    thesis.geography(),
                    Some(ceiling.as_str()),
                ])
            })
            .collect()
    }
}
