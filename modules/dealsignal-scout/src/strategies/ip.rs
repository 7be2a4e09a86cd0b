use dealsignal_common::{StrategyKind, Thesis};

use super::{compose, SignalStrategy};

const TEMPLATES: &[&str] = &[
    "{sector} startup patent filed",
    "{sector} company granted patent",
    "{sector} novel technology patent application",
];

/// Keywords borrowed from free-text criteria.
const MAX_CRITERIA_WORDS: usize = 6;

/// Patent filings and grants surface defensible technology early.
pub struct IpStrategy;

impl SignalStrategy for IpStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Ip
    }

    fn generate_queries(&self, thesis: &Thesis, sectors: &[String]) -> Vec<String> {
        let keywords = thesis.free_text_criteria().map(criteria_keywords);

        let mut queries = Vec::with_capacity(sectors.len() * TEMPLATES.len());
        for sector in sectors {
            for (i, template) in TEMPLATES.iter().enumerate() {
                let base = template.replace("{sector}", sector);
                let extra = if i == 0 { keywords.as_deref() } else { None };
                queries.push(compose(&[Some(base.as_str()), thesis.geography(), extra]));
            }
        }
        queries
    }
}

/// First few alphanumeric words of the criteria, punctuation dropped.
fn criteria_keywords(criteria: &str) -> String {
    criteria
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| w.chars().count() > 2)
        .take(MAX_CRITERIA_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_query_mentions_patent() {
        let thesis = Thesis {
            geography: Some("Germany".into()),
            ..Default::default()
        };
        let queries = IpStrategy.generate_queries(&thesis, &["Climate Tech".to_string()]);
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[1], "Climate Tech company granted patent Germany");
        assert!(queries.iter().all(|q| q.contains("patent")));
    }

    #[test]
    fn criteria_keywords_go_on_first_template_only() {
        let thesis = Thesis {
            free_text_criteria: Some("B2B, solid-state batteries; EU grants".into()),
            ..Default::default()
        };
        let queries = IpStrategy.generate_queries(&thesis, &["Energy".to_string()]);
        assert_eq!(
            queries[0],
            "Energy startup patent filed B2B solid-state batteries grants"
        );
        assert_eq!(queries[2], "Energy novel technology patent application");
    }
}
