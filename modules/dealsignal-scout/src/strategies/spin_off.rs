use dealsignal_common::{StrategyKind, Thesis};

use super::{compose, SignalStrategy};

pub const EUROPEAN_INSTITUTIONS: &[&str] = &[
    "ETH Zurich",
    "University of Cambridge",
    "University of Oxford",
    "TU Munich",
    "EPFL",
    "Imperial College London",
];

pub const DEFAULT_INSTITUTIONS: &[&str] = &[
    "MIT",
    "Stanford University",
    "UC Berkeley",
    "Carnegie Mellon University",
    "Harvard University",
];

/// Lowercase tokens that put a geography in Europe.
pub(crate) const EUROPEAN_TERMS: &[&str] = &[
    "europe", "european", "eu", "uk", "britain", "england", "scotland", "ireland", "germany",
    "france", "switzerland", "netherlands", "belgium", "sweden", "norway", "denmark", "finland",
    "spain", "portugal", "italy", "austria", "poland", "estonia", "dach", "nordics", "london",
    "berlin", "paris", "munich", "zurich", "amsterdam", "stockholm", "lisbon", "madrid",
    "barcelona", "milan", "copenhagen", "helsinki", "dublin", "cambridge", "oxford",
];

/// University research commercialized into new companies.
pub struct SpinOffStrategy;

impl SpinOffStrategy {
    pub fn institutions_for(geography: Option<&str>) -> &'static [&'static str] {
        match geography {
            Some(geo) if is_european(geo) => EUROPEAN_INSTITUTIONS,
            _ => DEFAULT_INSTITUTIONS,
        }
    }
}

fn is_european(geography: &str) -> bool {
    let lower = geography.to_lowercase();
    if lower.contains("united kingdom") {
        return true;
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| EUROPEAN_TERMS.contains(&token))
}

impl SignalStrategy for SpinOffStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SpinOff
    }

    fn generate_queries(&self, thesis: &Thesis, sectors: &[String]) -> Vec<String> {
        let institutions = Self::institutions_for(thesis.geography());
        sectors
            .iter()
            .flat_map(|sector| {
                institutions
                    .iter()
                    .map(move |inst| {
                        compose(&[
                            Some(*inst),
                            Some("spin-off"),
                            Some(sector.as_str()),
                            Some("startup"),
                        ])
                    })
            })
            .collect()
    }
}
