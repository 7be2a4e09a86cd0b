//! Company-name extraction and exact-normalized de-duplication.

pub mod dedup;
pub mod extractor;
pub mod matcher;

pub use dedup::{Deduplicator, ExtractionLimits};
pub use extractor::{HeuristicExtractor, NameExtractor};
pub use matcher::{EntityMatcher, ExactMatcher};
