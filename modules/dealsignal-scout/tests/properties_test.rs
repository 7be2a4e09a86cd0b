//! Generated-input checks for planning, deduplication and fallback ranking.

use std::collections::HashSet;

use dealsignal_common::{CandidateEntity, EvidencePool, StrategyKind, Thesis};
use dealsignal_scout::extraction::{Deduplicator, HeuristicExtractor, NameExtractor};
use dealsignal_scout::planner::{PlannerConfig, QueryPlanner};
use dealsignal_scout::ranking::response::fallback;
use dealsignal_scout::strategies::default_strategies;
use dealsignal_scout::testing::{hit, pool};
use proptest::prelude::*;

fn thesis() -> impl Strategy<Value = Thesis> {
    (
        prop::collection::vec("[A-Za-z ]{0,20}", 0..6),
        prop::option::of("[A-Za-z ,]{0,30}"),
        prop::option::of("[a-z]{0,8}"),
        prop::option::of("[A-Za-z]{0,15}"),
    )
        .prop_map(|(sectors, geography, stage, reference)| Thesis {
            sectors,
            geography,
            stage,
            reference_company: reference,
            ..Default::default()
        })
}

const TITLES: &[&str] = &[
    "Fintory startup hiring CTO",
    "Paylane startup raises seed round",
    "Berlin startup Ledgerly",
    "Oxford spin-off Quantum Motion",
    "Top European Fintech startups",
    "Fintory's company culture",
    "Series A funding news",
    "",
];

fn hits() -> impl Strategy<Value = EvidencePool> {
    prop::collection::vec(
        (
            prop::sample::select(TITLES),
            0..5usize,
            prop::sample::select(TITLES),
            prop::sample::select(StrategyKind::ALL.to_vec()),
        ),
        0..24,
    )
    .prop_map(|rows| {
        pool(
            rows.into_iter()
                .map(|(title, page, snippet, strategy)| {
                    hit(title, &format!("https://p{page}.example.com"), snippet, strategy)
                })
                .collect(),
        )
    })
}

fn entities() -> impl Strategy<Value = Vec<CandidateEntity>> {
    prop::collection::hash_set("[A-Z][a-z]{1,10}", 0..12).prop_map(|names| {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let page = hit(&name, &format!("https://c{i}.example.com"), "", StrategyKind::Talent);
                CandidateEntity::new(name.clone(), &name, &page)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn plan_is_capped_and_deterministic(thesis in thesis(), cap in 1..10usize) {
        let planner = QueryPlanner::new(
            default_strategies(),
            PlannerConfig {
                max_queries_per_strategy: cap,
                ..Default::default()
            },
        );
        let plan = planner.plan(&thesis);

        prop_assert!(!plan.is_empty());
        prop_assert_eq!(&plan, &planner.plan(&thesis));
        for kind in StrategyKind::ALL {
            let texts: Vec<String> = plan
                .iter()
                .filter(|q| q.strategy == kind)
                .map(|q| q.text.to_lowercase())
                .collect();
            prop_assert!(texts.len() <= cap, "{} has {} queries", kind, texts.len());
            prop_assert_eq!(texts.iter().collect::<HashSet<_>>().len(), texts.len());
        }
        for q in &plan {
            prop_assert!(!q.text.trim().is_empty());
            prop_assert!(q.text.chars().count() <= 200);
        }
    }

    #[test]
    fn each_page_belongs_to_at_most_one_entity(pool in hits()) {
        let entities = Deduplicator::default().extract(&pool);

        let pages: Vec<String> = entities
            .iter()
            .flat_map(|e| e.evidence().iter().map(|h| h.identity()))
            .collect();
        let distinct: HashSet<&String> = pages.iter().collect();
        prop_assert_eq!(distinct.len(), pages.len());

        let known: HashSet<String> = pool.iter().map(|e| e.hit.identity()).collect();
        prop_assert!(pages.iter().all(|p| known.contains(p)));
        prop_assert!(entities.windows(2).all(|w| w[0].mention_count() >= w[1].mention_count()));
    }

    #[test]
    fn repeated_evidence_does_not_change_entities(pool in hits()) {
        let dedup = Deduplicator::default();
        let once = dedup.extract(&pool);

        let twice = EvidencePool::new(pool.iter().chain(pool.iter()).cloned().collect());
        prop_assert_eq!(&once, &dedup.extract(&twice));
        prop_assert_eq!(&once, &dedup.extract(&pool));
    }

    #[test]
    fn extracted_names_come_from_the_text(text in ".{0,200}") {
        let extractor = HeuristicExtractor::default();
        let names = extractor.extract(&text);
        let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");

        prop_assert_eq!(&names, &extractor.extract(&text));
        let lowered: HashSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
        prop_assert_eq!(lowered.len(), names.len());
        for name in &names {
            prop_assert!(name.chars().any(char::is_alphabetic));
            prop_assert!(flat.contains(name.as_str()), "{:?} not in {:?}", name, flat);
        }
    }

    #[test]
    fn fallback_returns_min_of_desired_and_available(
        candidates in entities(),
        desired in 0..30usize,
    ) {
        let ranked = fallback(&candidates, desired);

        prop_assert_eq!(ranked.len(), desired.min(candidates.len()));
        for (i, c) in ranked.iter().enumerate() {
            prop_assert_eq!(c.rank, i + 1);
            prop_assert!(!c.name.is_empty());
            prop_assert!((0.0..=100.0).contains(&c.potential_score));
        }
    }
}
