use dealsignal_common::CandidateEntity;

/// Decides when two raw names refer to the same company.
pub trait EntityMatcher: Send + Sync {
    /// Comparison key. Empty means the name has no usable core.
    fn normalize(&self, raw: &str) -> String;

    /// Human-facing form of a raw name, used as the canonical name.
    fn display_name(&self, raw: &str) -> String;

    fn is_match(&self, key: &str, entity: &CandidateEntity) -> bool {
        self.normalize(entity.canonical_name()) == key
            || entity.aliases().iter().any(|a| self.normalize(a) == key)
    }
}

/// Legal and organizational suffixes ignored when comparing names.
pub const SUFFIXES: &[&str] = &[
    "inc", "ltd", "llc", "gmbh", "ag", "sa", "sas", "bv", "plc", "corp", "co", "limited",
    "technologies", "tech", "labs", "startup", "company",
];

/// Case-folded, whitespace-collapsed, suffix-stripped equality.
#[derive(Default)]
pub struct ExactMatcher;

impl ExactMatcher {
    /// Words of `raw` with trailing punctuation and suffix words removed.
    fn core_words(raw: &str) -> Vec<&str> {
        let mut words: Vec<&str> = raw
            .split_whitespace()
            .map(trim_punctuation)
            .filter(|w| !w.is_empty())
            .collect();
        while words.last().is_some_and(|w| is_suffix(w)) {
            words.pop();
        }
        words
    }
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '"' | '\''))
        .trim_start_matches(|c: char| matches!(c, '"' | '\'' | '('))
}

fn is_suffix(word: &str) -> bool {
    SUFFIXES.contains(&word.to_lowercase().as_str())
}

impl EntityMatcher for ExactMatcher {
    fn normalize(&self, raw: &str) -> String {
        Self::core_words(raw).join(" ").to_lowercase()
    }

    fn display_name(&self, raw: &str) -> String {
        Self::core_words(raw).join(" ")
    }
}
