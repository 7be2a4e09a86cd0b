use std::collections::HashSet;

use ai_client::strip_code_blocks;
use dealsignal_common::{CandidateEntity, EvidencePool, RankedCandidate};

use super::prompt::{SynthesisResponse, SynthesizedCompany};
use crate::extraction::EntityMatcher;

const POTENTIAL_LEVELS: &[&str] = &["high", "medium", "low"];

/// Parse the provider's text into companies. Tolerates code fences and
/// prose around the JSON object.
pub fn parse(text: &str) -> Result<Vec<SynthesizedCompany>, String> {
    let stripped = strip_code_blocks(text);
    let json = match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if start < end => &stripped[start..=end],
        _ => return Err("no JSON object in synthesis output".to_string()),
    };
    serde_json::from_str::<SynthesisResponse>(json)
        .map(|r| r.companies)
        .map_err(|e| format!("unparseable synthesis output: {e}"))
}

/// Keep only grounded entries, score-sorted, capped and topped up from the
/// raw candidates. Empty means nothing usable came back.
pub fn validate(
    companies: Vec<SynthesizedCompany>,
    candidates: &[CandidateEntity],
    pool: &EvidencePool,
    matcher: &dyn EntityMatcher,
    desired_count: usize,
) -> Vec<RankedCandidate> {
    let evidence_text = EvidenceText::new(pool);

    let mut seen = HashSet::new();
    let mut kept: Vec<(RankedCandidate, Option<usize>)> = Vec::new();

    for company in companies {
        let name = company.name.split_whitespace().collect::<Vec<_>>().join(" ");
        let key = matcher.normalize(&name);
        if key.is_empty() || !seen.insert(key.clone()) {
            continue;
        }
        let known = candidates.iter().position(|c| matcher.is_match(&key, c));
        if known.is_none() && !evidence_text.names(&name) {
            continue;
        }

        let entity = known.map(|i| &candidates[i]);
        let potential = company.potential.trim().to_lowercase();
        let signal_type = match (company.signal_type.trim(), entity) {
            ("", Some(e)) => e.signal_label(),
            (s, _) => s.to_string(),
        };

        kept.push((
            RankedCandidate {
                name: entity.map(|e| e.canonical_name().to_string()).unwrap_or(name),
                description: company.description.trim().to_string(),
                signal_type,
                potential: if POTENTIAL_LEVELS.contains(&potential.as_str()) {
                    potential
                } else {
                    "unknown".to_string()
                },
                potential_score: clamp_score(company.potential_score),
                rank: 0,
                mention_count: entity.map(CandidateEntity::mention_count).unwrap_or(0),
            },
            known,
        ));
    }

    if kept.is_empty() {
        return Vec::new();
    }

    // Stable: equal scores keep the provider's order.
    kept.sort_by(|a, b| b.0.potential_score.total_cmp(&a.0.potential_score));

    let cap = desired_count.min(candidates.len());
    kept.truncate(cap);

    let used: HashSet<usize> = kept.iter().filter_map(|(_, idx)| *idx).collect();
    let mut ranked: Vec<RankedCandidate> = kept.into_iter().map(|(c, _)| c).collect();

    let total = total_mentions(candidates);
    let top_up = candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| !used.contains(i))
        .take(cap.saturating_sub(ranked.len()))
        .map(|(_, c)| raw_candidate(c, total));
    ranked.extend(top_up);

    assign_ranks(ranked)
}

/// Evidence reduced to lowercase words, one segment per hit, so a name
/// only counts when it appears as whole words inside a single hit.
struct EvidenceText(String);

impl EvidenceText {
    fn new(pool: &EvidencePool) -> Self {
        let segments: Vec<String> = pool.iter().map(|e| words_of(&e.hit.text())).collect();
        Self(format!(" {} ", segments.join(" | ")))
    }

    fn names(&self, name: &str) -> bool {
        let needle = words_of(name);
        !needle.is_empty() && self.0.contains(&format!(" {needle} "))
    }
}

fn words_of(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Top candidates by mention count, without synthesis.
pub fn fallback(candidates: &[CandidateEntity], desired_count: usize) -> Vec<RankedCandidate> {
    let total = total_mentions(candidates);
    assign_ranks(
        candidates
            .iter()
            .take(desired_count)
            .map(|c| raw_candidate(c, total))
            .collect(),
    )
}

fn raw_candidate(entity: &CandidateEntity, total_mentions: usize) -> RankedCandidate {
    let share = if total_mentions == 0 {
        0.0
    } else {
        entity.mention_count() as f64 / total_mentions as f64 * 100.0
    };
    RankedCandidate {
        name: entity.canonical_name().to_string(),
        description: String::new(),
        signal_type: entity.signal_label(),
        potential: "unknown".to_string(),
        potential_score: (share * 10.0).round() / 10.0,
        rank: 0,
        mention_count: entity.mention_count(),
    }
}

fn total_mentions(candidates: &[CandidateEntity]) -> usize {
    candidates.iter().map(CandidateEntity::mention_count).sum()
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn assign_ranks(mut ranked: Vec<RankedCandidate>) -> Vec<RankedCandidate> {
    for (i, c) in ranked.iter_mut().enumerate() {
        c.rank = i + 1;
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ExactMatcher;
    use crate::testing::{hit, pool};
    use dealsignal_common::StrategyKind::{Ip, Talent};

    fn entity(name: &str, pages: usize) -> CandidateEntity {
        let mut e = CandidateEntity::new(
            name,
            name,
            &hit(&format!("{name} startup"), &format!("https://{name}.com/0"), "", Talent),
        );
        for i in 1..pages {
            e.record(
                name,
                &hit(&format!("{name} startup"), &format!("https://{name}.com/{i}"), "", Ip),
            );
        }
        e
    }

    fn company(name: &str, score: f64) -> SynthesizedCompany {
        SynthesizedCompany {
            name: name.to_string(),
            description: format!("{name} does payments"),
            signal_type: String::new(),
            potential: "High".to_string(),
            potential_score: score,
        }
    }

    fn evidence() -> EvidencePool {
        pool(vec![
            hit("Fintory startup", "https://fintory.com", "", Talent),
            hit("Paylane startup", "https://paylane.com", "partner Ledgerly", Talent),
        ])
    }

    #[test]
    fn parse_handles_fences_and_prose() {
        let text = "Here you go:\n```json\n{\"companies\": [{\"name\": \"Fintory\"}]}\n```";
        assert_eq!(parse(text).unwrap()[0].name, "Fintory");
        assert!(parse("I could not find anything.").is_err());
        assert!(parse("{ not json }").is_err());
    }

    #[test]
    fn drops_ungrounded_and_duplicate_names() {
        let candidates = vec![entity("Fintory", 2), entity("Paylane", 1)];
        let ranked = validate(
            vec![
                company("Invented Corp", 99.0),
                company("Fintory", 80.0),
                company("FINTORY Ltd", 70.0),
                company("Ledgerly", 60.0),
            ],
            &candidates,
            &evidence(),
            &ExactMatcher,
            3,
        );

        let names: Vec<_> = ranked.iter().map(|c| c.name.as_str()).collect();
        // Ledgerly is not a candidate but is named in the evidence.
        assert_eq!(names, ["Fintory", "Ledgerly"]);
        assert_eq!(ranked[0].signal_type, "talent+ip");
        assert_eq!(ranked[0].potential, "high");
        assert_eq!(ranked[0].mention_count, 2);
    }

    #[test]
    fn fragments_of_evidence_words_are_not_grounded() {
        let candidates = vec![entity("Fintory", 1)];
        let ranked = validate(
            vec![company("Fin", 90.0), company("tory startup", 85.0)],
            &candidates,
            &evidence(),
            &ExactMatcher,
            3,
        );
        assert!(ranked.is_empty());

        let ranked = validate(
            vec![company("Ledger", 90.0), company("Ledgerly", 10.0)],
            &candidates,
            &evidence(),
            &ExactMatcher,
            3,
        );
        let names: Vec<_> = ranked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Ledgerly"]);
    }

    #[test]
    fn caps_at_available_candidates_and_tops_up() {
        let candidates = vec![entity("Fintory", 2), entity("Paylane", 1), entity("Volta", 1)];
        let ranked = validate(
            vec![company("Paylane", 150.0)],
            &candidates,
            &evidence(),
            &ExactMatcher,
            2,
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].name, "Paylane");
        assert_eq!(ranked[0].potential_score, 100.0);
        assert_eq!(ranked[1].name, "Fintory");
        assert_eq!(ranked[1].potential, "unknown");
        assert_eq!(ranked.iter().map(|c| c.rank).collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn nothing_grounded_is_empty() {
        let candidates = vec![entity("Fintory", 1)];
        let ranked = validate(
            vec![company("Invented Corp", 90.0), company("", 80.0)],
            &candidates,
            &evidence(),
            &ExactMatcher,
            3,
        );
        assert!(ranked.is_empty());
    }

    #[test]
    fn fallback_scores_by_mention_share() {
        let candidates = vec![entity("Fintory", 3), entity("Paylane", 1)];
        let ranked = fallback(&candidates, 5);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].potential_score, 75.0);
        assert_eq!(ranked[1].potential_score, 25.0);
        assert_eq!(ranked[0].signal_type, "talent+ip");
        assert_eq!(ranked[1].signal_type, "talent");
        assert!(ranked.iter().all(|c| c.description.is_empty() && c.potential == "unknown"));
    }
}
