//! The pipeline data bucket
//!
//! A `DataBucket` is the accumulator threaded through the three pipeline
//! stages of one run. Stage 2's tools populate it incrementally; stage 3
//! consumes it. It is exclusively owned by one run and never shared across
//! concurrent runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Shared accumulator for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataBucket {
    /// The original user query
    pub query: String,

    /// Raw textual response from the intent-classification stage
    pub intent_analysis_response: String,

    /// Lineage tool results, keyed by "a -> b" pair
    #[serde(default)]
    pub lineage_info: BTreeMap<String, Vec<String>>,

    /// Table metadata, keyed by table name
    #[serde(default)]
    pub metadata_info: BTreeMap<String, Vec<String>>,

    /// Direct-parent tool results, keyed by table name
    #[serde(default)]
    pub direct_parents_info: BTreeMap<String, Vec<String>>,

    /// Documents returned by similarity search
    #[serde(default)]
    pub search_results: Vec<String>,

    /// Plain-text summary of everything collected, set at the end of stage 2
    #[serde(default)]
    pub relevant_data_summary: String,
}

impl DataBucket {
    /// Create a bucket for a new run
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Keys required to be populated before answer synthesis runs.
    ///
    /// `direct_parents_info` and `relevant_data_summary` are intentionally
    /// not required: not every question needs parent tracing, and the
    /// summary is composed after validation.
    pub const REQUIRED_KEYS: [&'static str; 5] = [
        "query",
        "intent_analysis_response",
        "lineage_info",
        "metadata_info",
        "search_results",
    ];

    /// Required keys that are still unpopulated.
    ///
    /// Stage 3 must tolerate a partial bucket, so callers warn on missing
    /// keys rather than failing.
    pub fn missing_required_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.query.is_empty() {
            missing.push("query");
        }
        if self.intent_analysis_response.is_empty() {
            missing.push("intent_analysis_response");
        }
        if self.lineage_info.is_empty() {
            missing.push("lineage_info");
        }
        if self.metadata_info.is_empty() {
            missing.push("metadata_info");
        }
        if self.search_results.is_empty() {
            missing.push("search_results");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_bucket_reports_all_required_keys() {
        let bucket = DataBucket::default();
        assert_eq!(bucket.missing_required_keys(), DataBucket::REQUIRED_KEYS);
    }

    #[test]
    fn populated_bucket_reports_nothing() {
        let mut bucket = DataBucket::new("how are users and orders related?");
        bucket.intent_analysis_response = "lineage".to_string();
        bucket
            .lineage_info
            .insert("users -> orders".to_string(), vec!["users".to_string()]);
        bucket
            .metadata_info
            .insert("users".to_string(), vec!["user table".to_string()]);
        bucket.search_results.push("users: core user model".to_string());

        assert!(bucket.missing_required_keys().is_empty());
    }

    #[test]
    fn direct_parents_is_not_required() {
        let mut bucket = DataBucket::new("q");
        bucket.intent_analysis_response = "general".to_string();
        bucket.lineage_info.insert("p".to_string(), vec![]);
        bucket.metadata_info.insert("t".to_string(), vec![]);
        bucket.search_results.push("doc".to_string());

        assert!(bucket.direct_parents_info.is_empty());
        assert!(bucket.missing_required_keys().is_empty());
    }
}
