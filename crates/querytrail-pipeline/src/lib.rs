//! Three-stage pipeline orchestration
//!
//! Sequences intent classification, data collection, and answer synthesis
//! around a shared `DataBucket`, logging each stage-2 tool invocation to a
//! `TrajectoryTracker`. The LLM and vector-search collaborators live behind
//! traits; deterministic offline implementations are provided for the CLI
//! and tests.

pub mod collector;
pub mod domains;
pub mod pipeline;
pub mod stages;

pub use collector::DataCollector;
pub use domains::{DataDomain, DomainCatalog};
pub use pipeline::{Pipeline, PipelineError, PipelineOutcome};
pub use stages::{
    AnswerSynthesizer, IntentClassifier, IntentReport, KeywordIntentClassifier, KeywordSearch,
    SimilaritySearch, StaticSearch, TemplateSynthesizer,
};
