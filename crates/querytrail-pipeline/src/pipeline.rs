//! The three-stage pipeline
//!
//! Intent classification, data collection, and answer synthesis run
//! strictly in sequence: each stage's output is a precondition of the
//! next. The orchestrator does not own the tracker session. The caller
//! starts and ends it, choosing whether the session accumulates across
//! several questions (`clear_session = false`) or resets after one.

use querytrail_core::DataBucket;
use querytrail_trajectory::TrajectoryTracker;
use std::sync::Arc;
use tracing::{info, warn};

use crate::collector::DataCollector;
use crate::stages::{AnswerSynthesizer, IntentClassifier};

/// Pipeline stage errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("intent classification failed: {0}")]
    Intent(String),

    #[error("data collection failed: {0}")]
    Collection(String),

    #[error("similarity search failed: {0}")]
    Search(String),

    #[error("answer synthesis failed: {0}")]
    Synthesis(String),
}

/// Result of one pipeline run
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Final answer text
    pub answer: String,

    /// The populated data bucket, for inspection and audit
    pub bucket: DataBucket,
}

/// Sequences the three pipeline stages for one query at a time
pub struct Pipeline {
    intent: Arc<dyn IntentClassifier>,
    collector: DataCollector,
    synthesizer: Arc<dyn AnswerSynthesizer>,
}

impl Pipeline {
    pub fn new(
        intent: Arc<dyn IntentClassifier>,
        collector: DataCollector,
        synthesizer: Arc<dyn AnswerSynthesizer>,
    ) -> Self {
        Self {
            intent,
            collector,
            synthesizer,
        }
    }

    /// Run all three stages for `query`.
    ///
    /// Stage errors propagate; the caller decides whether to mark the
    /// tracked session as unsuccessful. Missing bucket keys after stage 2
    /// are warnings only; synthesis must tolerate a partial bucket.
    pub async fn process_query(
        &self,
        query: &str,
        tracker: &mut TrajectoryTracker,
    ) -> Result<PipelineOutcome, PipelineError> {
        info!(query, "stage 1: intent classification");
        let intent_response = self.intent.classify(query).await?;

        info!("stage 2: data collection");
        let bucket = self
            .collector
            .collect(query, &intent_response, tracker)
            .await?;

        for key in bucket.missing_required_keys() {
            warn!(key, "data bucket missing required key before synthesis");
        }

        info!("stage 3: answer synthesis");
        let answer = self
            .synthesizer
            .synthesize(query, &intent_response, &bucket)
            .await?;

        Ok(PipelineOutcome { answer, bucket })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{IntentClassifier, StaticSearch, TemplateSynthesizer};
    use pretty_assertions::assert_eq;
    use querytrail_manifest::{LineageResolver, Manifest};
    use querytrail_trajectory::{MemoryStore, TrajectoryTracker};

    struct FailingClassifier;

    #[async_trait::async_trait]
    impl IntentClassifier for FailingClassifier {
        async fn classify(&self, _query: &str) -> Result<String, PipelineError> {
            Err(PipelineError::Intent("model unavailable".to_string()))
        }
    }

    fn pipeline_with(intent: Arc<dyn IntentClassifier>) -> Pipeline {
        let manifest = Manifest::from_str(r#"{"nodes": {}}"#).unwrap();
        let collector = DataCollector::new(
            Arc::new(LineageResolver::from_manifest(manifest)),
            Arc::new(StaticSearch::default()),
            3,
        );
        Pipeline::new(intent, collector, Arc::new(TemplateSynthesizer))
    }

    #[tokio::test]
    async fn stage_failures_propagate() {
        let pipeline = pipeline_with(Arc::new(FailingClassifier));
        let mut tracker = TrajectoryTracker::new(Arc::new(MemoryStore::new()));
        tracker.start_session("s1");

        let result = pipeline.process_query("anything", &mut tracker).await;
        assert!(matches!(result, Err(PipelineError::Intent(_))));
        // Stage 1 failed before any tool ran.
        assert_eq!(tracker.step_count(), 0);
    }
}
