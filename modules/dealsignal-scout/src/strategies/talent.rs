use dealsignal_common::{StrategyKind, Thesis};

use super::{compose, SignalStrategy};

/// Senior or founding roles a young company posts when it is about to scale.
pub const ROLES: &[&str] = &[
    "Chief Technology Officer",
    "VP Engineering",
    "Head of AI",
    "Founding Engineer",
    "Head of Product",
];

/// Job postings for key hires reveal companies before they announce a round.
pub struct TalentStrategy;

impl SignalStrategy for TalentStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Talent
    }

    fn generate_queries(&self, thesis: &Thesis, sectors: &[String]) -> Vec<String> {
        sectors
            .iter()
            .flat_map(|sector| {
                ROLES.iter().map(move |role| {
                    compose(&[
                        Some(sector.as_str()),
                        Some("startup hiring"),
                        Some(*role),
                        thesis.geography(),
                        thesis.stage(),
                    ])
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crosses_sectors_with_roles_sector_major() {
        let thesis = Thesis {
            geography: Some("Europe".into()),
            stage: Some("seed".into()),
            ..Default::default()
        };
        let sectors = vec!["Fintech".to_string(), "AI".to_string()];
        let queries = TalentStrategy.generate_queries(&thesis, &sectors);

        assert_eq!(queries.len(), ROLES.len() * 2);
        assert_eq!(
            queries[0],
            "Fintech startup hiring Chief Technology Officer Europe seed"
        );
        assert!(queries[ROLES.len()].starts_with("AI "));
        assert!(queries.iter().all(|q| q.contains("hiring")));
    }

    #[test]
    fn omits_missing_scope() {
        let queries = TalentStrategy.generate_queries(&Thesis::default(), &["AI".to_string()]);
        assert_eq!(queries[1], "AI startup hiring VP Engineering");
    }
}
