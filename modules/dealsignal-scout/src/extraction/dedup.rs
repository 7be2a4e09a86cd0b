use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dealsignal_common::{CandidateEntity, EvidencePool, SearchHit, Thesis};
use tracing::debug;

use super::{EntityMatcher, ExactMatcher, HeuristicExtractor, NameExtractor};

/// Bounds on what counts as a plausible company name.
#[derive(Debug, Clone)]
pub struct ExtractionLimits {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            min_chars: 2,
            max_chars: 60,
        }
    }
}

impl ExtractionLimits {
    fn accepts(&self, name: &str) -> bool {
        let n = name.chars().count();
        n >= self.min_chars && n <= self.max_chars
    }
}

/// Turns the evidence pool into a ranked list of distinct companies.
pub struct Deduplicator {
    extractor: Arc<dyn NameExtractor>,
    matcher: Arc<dyn EntityMatcher>,
    limits: ExtractionLimits,
    /// Normalized keys that are never a company, e.g. the thesis sectors.
    excluded: HashSet<String>,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(
            Arc::new(HeuristicExtractor::default()),
            Arc::new(ExactMatcher),
            ExtractionLimits::default(),
        )
    }
}

impl Deduplicator {
    pub fn new(
        extractor: Arc<dyn NameExtractor>,
        matcher: Arc<dyn EntityMatcher>,
        limits: ExtractionLimits,
    ) -> Self {
        Self {
            extractor,
            matcher,
            limits,
            excluded: HashSet::new(),
        }
    }

    /// Never treat the run's own sectors or geography as a company. A
    /// geography like "Berlin, Germany" excludes each listed place too.
    pub fn excluding_thesis(mut self, thesis: &Thesis) -> Self {
        let geography = thesis.geography().into_iter().flat_map(|geo| {
            std::iter::once(geo).chain(geo.split(|c: char| matches!(c, ',' | ';' | '/' | '|')))
        });
        let terms: Vec<String> = thesis
            .normalized_sectors()
            .into_iter()
            .chain(geography.map(str::to_string))
            .collect();
        self.excluded.extend(
            terms
                .iter()
                .map(|t| self.matcher.normalize(t))
                .filter(|k| !k.is_empty()),
        );
        self
    }

    /// Each hit goes to at most one entity: the first valid name in its
    /// title, else in its snippet. A page already attributed to an entity
    /// stays with it even if another copy extracts differently, and copies
    /// with no name of their own still add their strategy to the owner.
    ///
    /// Result is sorted by mention count, ties in first-seen order.
    pub fn extract(&self, pool: &EvidencePool) -> Vec<CandidateEntity> {
        let mut entities: Vec<CandidateEntity> = Vec::new();
        let mut owner_by_page: HashMap<String, usize> = HashMap::new();
        let mut waiting: HashMap<String, Vec<&SearchHit>> = HashMap::new();

        for evidence in pool.iter() {
            let hit = &evidence.hit;
            let picked = [hit.title.as_str(), hit.snippet.as_str()]
                .into_iter()
                .flat_map(|field| self.extractor.extract(field))
                .find_map(|raw| {
                    let key = self.matcher.normalize(&raw);
                    let valid = !key.is_empty()
                        && self.limits.accepts(&raw)
                        && !self.excluded.contains(&key);
                    valid.then_some((raw, key))
                });

            if let Some(&idx) = owner_by_page.get(&hit.identity()) {
                let alias = match &picked {
                    Some((raw, key)) if self.matcher.is_match(key, &entities[idx]) => raw.as_str(),
                    _ => "",
                };
                entities[idx].record(alias, hit);
                continue;
            }

            let Some((raw, key)) = picked else {
                waiting.entry(hit.identity()).or_default().push(hit);
                continue;
            };

            let idx = match entities
                .iter()
                .position(|e| self.matcher.is_match(&key, e))
            {
                Some(idx) => {
                    entities[idx].record(&raw, hit);
                    idx
                }
                None => {
                    entities.push(CandidateEntity::new(
                        self.matcher.display_name(&raw),
                        &raw,
                        hit,
                    ));
                    entities.len() - 1
                }
            };
            for earlier in waiting.remove(&hit.identity()).unwrap_or_default() {
                entities[idx].record("", earlier);
            }
            owner_by_page.insert(hit.identity(), idx);
        }
        let unattributed: usize = waiting.values().map(Vec::len).sum();

        // Stable: equal counts keep first-seen order.
        entities.sort_by(|a, b| b.mention_count().cmp(&a.mention_count()));

        debug!(
            hits = pool.len(),
            unattributed,
            candidates = entities.len(),
            "Entity extraction complete"
        );
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{hit, pool};
    use dealsignal_common::StrategyKind::{Ip, Talent};

    #[test]
    fn same_company_across_pages_merges() {
        let pool = pool(vec![
            hit("Fintory startup hiring CTO", "https://jobs.com/1", "", Talent),
            hit("Fintory startup hiring CTO", "https://jobs.com/1", "", Talent),
            hit("Fintory GmbH startup hiring VP", "https://jobs.com/2", "", Talent),
        ]);
        let entities = Deduplicator::default().extract(&pool);

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].canonical_name(), "Fintory");
        assert_eq!(entities[0].mention_count(), 2);
    }

    #[test]
    fn strategies_merge_on_one_entity() {
        let pool = pool(vec![
            hit("Fintory startup", "https://a.com", "Payments", Talent),
            hit("Fintory startup", "https://a.com", "Payments", Ip),
        ]);
        let entities = Deduplicator::default().extract(&pool);

        assert_eq!(entities.len(), 1);
        assert!(entities[0].strategy_signals().contains(&Talent));
        assert!(entities[0].strategy_signals().contains(&Ip));
    }

    #[test]
    fn hit_attributed_to_first_name_only() {
        let pool = pool(vec![hit(
            "Paylane startup beats Fintory startup",
            "https://a.com",
            "",
            Talent,
        )]);
        let entities = Deduplicator::default().extract(&pool);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].canonical_name(), "Paylane");
    }

    #[test]
    fn no_page_lands_in_two_entities() {
        let pool = pool(vec![
            hit("Paylane startup", "https://a.com", "", Talent),
            // Same page, different headline.
            hit("Fintory startup", "https://a.com/", "", Ip),
            hit("Fintory startup", "https://b.com", "", Ip),
        ]);
        let entities = Deduplicator::default().extract(&pool);

        let mut seen = std::collections::HashSet::new();
        for entity in &entities {
            for h in entity.evidence() {
                assert!(seen.insert(h.identity()), "{} attributed twice", h.url);
            }
        }
        let paylane = entities.iter().find(|e| e.canonical_name() == "Paylane").unwrap();
        assert!(paylane.strategy_signals().contains(&Ip));
    }

    #[test]
    fn sorted_by_mentions_ties_first_seen() {
        let pool = pool(vec![
            hit("Alpha startup", "https://1.com", "", Talent),
            hit("Beta startup", "https://2.com", "", Talent),
            hit("Gamma startup", "https://3.com", "", Talent),
            hit("Gamma startup", "https://4.com", "", Talent),
        ]);
        let names: Vec<_> = Deduplicator::default()
            .extract(&pool)
            .iter()
            .map(|e| e.canonical_name().to_string())
            .collect();
        assert_eq!(names, ["Gamma", "Alpha", "Beta"]);
    }

    #[test]
    fn names_outside_limits_are_noise() {
        let dedup = Deduplicator::new(
            Arc::new(HeuristicExtractor::default()),
            Arc::new(ExactMatcher),
            ExtractionLimits {
                min_chars: 4,
                max_chars: 60,
            },
        );
        let pool = pool(vec![hit("Qz startup", "https://a.com", "", Talent)]);
        assert!(dedup.extract(&pool).is_empty());
    }

    #[test]
    fn city_before_org_term_does_not_merge_companies() {
        let pool = pool(vec![
            hit("Berlin startup Fintory raises seed round", "https://a.com", "", Talent),
            hit("Berlin startup Paylane hiring CTO", "https://b.com", "", Talent),
        ]);
        let names: Vec<_> = Deduplicator::default()
            .extract(&pool)
            .iter()
            .map(|e| (e.canonical_name().to_string(), e.mention_count()))
            .collect();
        assert_eq!(
            names,
            [("Fintory".to_string(), 1), ("Paylane".to_string(), 1)]
        );
    }

    #[test]
    fn thesis_terms_are_never_candidates() {
        let thesis = Thesis {
            sectors: vec!["Proptech".into()],
            geography: Some("Tallinn, Estonia".into()),
            ..Default::default()
        };
        let pool = pool(vec![
            hit("Proptech startup hiring", "https://a.com", "", Talent),
            hit("Tallinn company hiring", "https://b.com", "", Talent),
            hit("Fintory startup", "https://c.com", "", Talent),
        ]);

        let plain = Deduplicator::default().extract(&pool);
        assert_eq!(plain.len(), 3);

        let entities = Deduplicator::default().excluding_thesis(&thesis).extract(&pool);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].canonical_name(), "Fintory");
    }

    #[test]
    fn title_name_wins_over_snippet_name() {
        let pool = pool(vec![hit(
            "Fintory startup",
            "https://a.com",
            "Paylane startup is a competitor",
            Talent,
        )]);
        let entities = Deduplicator::default().extract(&pool);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].canonical_name(), "Fintory");
    }

    #[test]
    fn nameless_copy_seen_first_still_merges_strategy() {
        let pool = pool(vec![
            hit("Series A funding news", "https://a.com", "", Ip),
            hit("Fintory startup", "https://a.com", "", Talent),
            hit("Series A funding news", "https://b.com", "", Ip),
        ]);
        let entities = Deduplicator::default().extract(&pool);

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].mention_count(), 1);
        assert_eq!(entities[0].signal_label(), "talent+ip");
    }

    #[test]
    fn extraction_is_idempotent() {
        let pool = pool(vec![
            hit("Fintory startup", "https://a.com", "", Talent),
            hit("Volta Labs", "https://b.com", "spin-off Volta Motion", Ip),
        ]);
        let dedup = Deduplicator::default();
        assert_eq!(dedup.extract(&pool), dedup.extract(&pool));
    }
}
