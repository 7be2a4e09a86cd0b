use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Match, Regex};

use crate::strategies::spin_off::EUROPEAN_TERMS;

/// Pulls candidate company names out of free text.
pub trait NameExtractor: Send + Sync {
    /// Names in the order they appear, without duplicates.
    fn extract(&self, text: &str) -> Vec<String>;
}

// --- Heuristic extractor ---

/// A word, keeping inner apostrophes, dots, ampersands and hyphens.
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}&'’.-]*").expect("valid regex"));

const MAX_PHRASE_WORDS: usize = 4;

/// Terms a company name comes right before: "Fintory startup", "Acme GmbH".
pub const ORG_TERMS: &[&str] = &[
    "startup", "start-up", "company", "tech", "technologies", "inc", "ltd", "llc", "gmbh", "ag",
    "sas", "bv", "plc", "labs", "unternehmen", "entreprise", "societe", "société",
];

/// Terms a company name comes right after: "spin-off Quantum Motion".
pub const LEAD_TERMS: &[&str] = &["startup", "start-up", "company", "spin-off", "spinout", "scaleup"];

/// Capitalized words that are never a company name on their own. Trimmed
/// from the front of a phrase; a phrase made only of these is rejected.
pub const STOP_WORDS: &[&str] = &[
    // articles, listicle and headline words
    "the", "a", "an", "top", "best", "meet", "hiring", "at", "for", "from", "with", "and", "of",
    "in", "on", "new", "leading", "how", "why", "what", "who", "this", "our", "we", "your",
    "about", "join", "apply", "now", "today", "breaking", "exclusive", "report", "list",
    // funding vocabulary
    "series", "b", "c", "d", "seed", "pre-seed", "funding", "round", "raises", "raised", "million",
    "investment", "investors", "vc", "venture", "capital",
    // sectors and generic business words
    "ai", "fintech", "climate", "tech", "deep", "software", "saas", "b2b", "b2c", "startup",
    "startups", "start-up", "company", "companies", "technology", "technologies", "innovative",
    "patent", "patents", "spin-off", "spinout", "university", "research", "lab", "labs", "scaleup",
    "office", "offices", "team",
    // geography adjectives
    "european", "europe", "american", "global", "german", "french", "british", "swiss", "uk",
    "us", "eu", "usa", "world",
    // roles
    "cto", "ceo", "vp", "head", "chief", "officer", "engineering", "engineer", "founding",
    "founder", "founders", "product", "senior", "remote", "jobs", "job", "careers",
    // media and directories
    "hunt", "crunchbase", "linkedin", "techcrunch", "news", "blog", "press", "wellfound",
    "angellist", "glassdoor", "indeed",
];

/// Places outside Europe that headlines put next to an organization term.
/// European places come from the spin-off geography list.
pub const PLACE_WORDS: &[&str] = &[
    "us", "usa", "america", "york", "nyc", "san", "francisco", "bay", "area", "silicon", "valley",
    "boston", "seattle", "austin", "california", "texas", "toronto", "canada", "israel", "tel",
    "aviv", "india", "bangalore", "singapore", "asia", "africa", "lagos", "nairobi", "latam",
    "brazil", "dubai",
];

/// Capitalized phrases next to an organization term.
///
/// When one term has a valid phrase on both sides ("Berlin startup
/// Fintory"), the phrase after it wins. Phrases made only of stop words or
/// place names are rejected. Every word list can be extended with the
/// `with_*` builders.
pub struct HeuristicExtractor {
    org_terms: HashSet<String>,
    lead_terms: HashSet<String>,
    stop_words: HashSet<String>,
    place_words: HashSet<String>,
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self {
            org_terms: lowercase_set(ORG_TERMS),
            lead_terms: lowercase_set(LEAD_TERMS),
            stop_words: lowercase_set(STOP_WORDS),
            place_words: lowercase_set(EUROPEAN_TERMS.iter().chain(PLACE_WORDS)),
        }
    }
}

impl HeuristicExtractor {
    pub fn with_org_terms(mut self, terms: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.org_terms.extend(lowercase_set(terms));
        self
    }

    pub fn with_lead_terms(mut self, terms: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.lead_terms.extend(lowercase_set(terms));
        self
    }

    pub fn with_stop_words(mut self, words: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.stop_words.extend(lowercase_set(words));
        self
    }

    pub fn with_place_words(mut self, words: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.place_words.extend(lowercase_set(words));
        self
    }

    fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(&bare(word))
    }

    fn is_place(&self, word: &str) -> bool {
        self.place_words.contains(&bare(word))
    }

    /// Capitalized run ending right before `words[term]`.
    fn phrase_before(&self, text: &str, words: &[Match<'_>], term: usize) -> Option<(usize, String)> {
        let mut start = term;
        while start > 0 && term - start < MAX_PHRASE_WORDS {
            let prev = &words[start - 1];
            if !is_capitalized(prev.as_str())
                || self.org_terms.contains(&bare(prev.as_str()))
                || ends_sentence(prev.as_str())
                || !adjacent(text, prev, &words[start])
            {
                break;
            }
            start -= 1;
        }
        if start == term {
            return None;
        }
        self.clean(&words[start..term], false)
            .map(|name| (words[start].start(), name))
    }

    /// Capitalized run starting right after `words[term]`.
    fn phrase_after(&self, text: &str, words: &[Match<'_>], term: usize) -> Option<(usize, String)> {
        let first = term + 1;
        let mut end = first;
        while end < words.len() && end - first < MAX_PHRASE_WORDS {
            let word = &words[end];
            if !is_capitalized(word.as_str()) || !adjacent(text, &words[end - 1], word) {
                break;
            }
            end += 1;
            if ends_sentence(word.as_str()) {
                break;
            }
        }
        if end == first {
            return None;
        }
        self.clean(&words[first..end], true)
            .map(|name| (words[first].start(), name))
    }

    /// Trim stop words off the front (and, for phrases that run on into the
    /// sentence, off the back). `None` when nothing name-like is left.
    fn clean(&self, phrase: &[Match<'_>], trim_tail: bool) -> Option<String> {
        let mut words: Vec<&str> = phrase.iter().map(|m| m.as_str()).collect();

        while words.first().is_some_and(|w| self.is_stop_word(w)) {
            words.remove(0);
        }
        if trim_tail {
            while words.last().is_some_and(|w| self.is_stop_word(w)) {
                words.pop();
            }
        }
        if words.iter().all(|w| self.is_stop_word(w) || self.is_place(w)) {
            return None;
        }

        let joined = words.join(" ");
        let name = joined
            .trim_end_matches("'s")
            .trim_end_matches("’s")
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '&' && c != ')');
        if !name.chars().any(char::is_alphabetic) {
            return None;
        }
        Some(name.to_string())
    }
}

impl NameExtractor for HeuristicExtractor {
    fn extract(&self, text: &str) -> Vec<String> {
        let words: Vec<Match<'_>> = WORD_RE.find_iter(text).collect();
        let mut found: Vec<(usize, String)> = Vec::new();

        for (i, word) in words.iter().enumerate() {
            let term = bare(word.as_str());
            if self.lead_terms.contains(&term) {
                if let Some(name) = self.phrase_after(text, &words, i) {
                    found.push(name);
                    continue;
                }
            }
            if self.org_terms.contains(&term) {
                if let Some(name) = self.phrase_before(text, &words, i) {
                    found.push(name);
                }
            }
        }
        found.sort_by_key(|(pos, _)| *pos);

        let mut seen = HashSet::new();
        found
            .into_iter()
            .map(|(_, name)| name)
            .filter(|name| seen.insert(name.to_lowercase()))
            .collect()
    }
}

fn lowercase_set(words: impl IntoIterator<Item = impl AsRef<str>>) -> HashSet<String> {
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn bare(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric() && c != '-')
        .to_lowercase()
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn ends_sentence(word: &str) -> bool {
    word.ends_with('.')
}

/// Only whitespace between the two words.
fn adjacent(text: &str, left: &Match<'_>, right: &Match<'_>) -> bool {
    text[left.end()..right.start()].chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        HeuristicExtractor::default().extract(text)
    }

    #[test]
    fn finds_name_before_org_term() {
        assert_eq!(names("Fintory startup hiring CTO in Berlin"), ["Fintory"]);
        assert_eq!(names("Jobs at Volta Labs and Acme GmbH"), ["Volta", "Acme"]);
    }

    #[test]
    fn finds_name_after_lead_term() {
        assert_eq!(
            names("Oxford spin-off Quantum Motion Raises seed round"),
            ["Quantum Motion"]
        );
    }

    #[test]
    fn name_after_term_beats_place_before_it() {
        assert_eq!(names("Berlin startup Fintory raises seed round"), ["Fintory"]);
        assert_eq!(names("Tallinn startup Paylane hiring CTO"), ["Paylane"]);
    }

    #[test]
    fn place_names_are_not_companies() {
        assert!(names("Berlin startup hiring a CTO").is_empty());
        assert!(names("Bay Area startup raises funding").is_empty());
        assert_eq!(names("Oxford Ionics company news"), ["Oxford Ionics"]);
    }

    #[test]
    fn trims_leading_stop_words() {
        assert_eq!(names("Meet The Fintory startup"), ["Fintory"]);
    }

    #[test]
    fn rejects_generic_phrases() {
        assert!(names("Series A startup funding news").is_empty());
        assert!(names("Product Hunt company of the day").is_empty());
        assert!(names("Top European Fintech startups").is_empty());
        assert!(names("Climate Tech startup patent filed").is_empty());
    }

    #[test]
    fn phrases_stop_at_sentence_and_punctuation() {
        assert_eq!(names("Join Fintory. Paylane startup"), ["Paylane"]);
        assert_eq!(names("Fintech startup; Paylane wins"), Vec::<String>::new());
    }

    #[test]
    fn text_order_without_duplicates() {
        let found = names("Fintech startup Paylane beats Fintory startup; Paylane startup again");
        assert_eq!(found, ["Paylane", "Fintory"]);
    }

    #[test]
    fn strips_possessive_and_punctuation() {
        assert_eq!(names("Fintory's company culture"), ["Fintory"]);
    }

    #[test]
    fn word_lists_are_tunable() {
        let extractor = HeuristicExtractor::default()
            .with_org_terms(["AB"])
            .with_place_words(["Tallinn"])
            .with_stop_words(["Stealth"]);

        assert_eq!(extractor.extract("Klarna AB raises again"), ["Klarna"]);
        assert!(extractor.extract("Tallinn company hiring").is_empty());
        assert!(extractor.extract("Stealth startup hiring").is_empty());
        assert_eq!(
            HeuristicExtractor::default().extract("Tallinn company hiring"),
            ["Tallinn"]
        );
    }
}
