pub mod aggregator;
pub mod extraction;
pub mod pipeline;
pub mod planner;
pub mod ranking;
pub mod search;
pub mod strategies;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use pipeline::{PipelineConfig, SourcingPipeline};
