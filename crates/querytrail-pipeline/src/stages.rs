//! Stage collaborator traits and their offline implementations
//!
//! The real intent classifier and answer synthesizer are LLM-backed and the
//! real similarity search is a vector store; all three are external
//! collaborators specified only at this boundary. The implementations here
//! are deterministic stand-ins: a keyword classifier, a template
//! synthesizer, and a term-overlap search, good enough for the CLI and for
//! exercising the full pipeline in tests.

use querytrail_core::DataBucket;
use serde::{Deserialize, Serialize};

use crate::domains::DomainCatalog;
use crate::pipeline::PipelineError;

/// Stage 1: classify what the user is asking for
#[async_trait::async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Raw textual intent analysis for the query
    async fn classify(&self, query: &str) -> Result<String, PipelineError>;
}

/// Stage 3: turn the collected bucket into a final answer
#[async_trait::async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        query: &str,
        intent_response: &str,
        bucket: &DataBucket,
    ) -> Result<String, PipelineError>;
}

/// Similarity search over the knowledge base (stage 2 tool)
#[async_trait::async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, PipelineError>;
}

/// Structured form of an intent analysis response.
///
/// The classifier emits this as JSON text; the data collector parses it
/// back when it can, and degrades gracefully when a different collaborator
/// produced free-form text instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentReport {
    /// One of "lineage", "dependency", "metadata", "sql_generation", "general"
    pub query_type: String,

    /// Tables mentioned or implied by the query
    #[serde(default)]
    pub mentioned_tables: Vec<String>,

    /// Matched data domain, if any
    #[serde(default)]
    pub data_domain: Option<String>,

    /// Short human-readable context line
    #[serde(default)]
    pub context: String,
}

/// Deterministic keyword-based intent classifier
pub struct KeywordIntentClassifier {
    catalog: DomainCatalog,
    /// Resolved model names known to the manifest, used to spot explicit
    /// table mentions
    known_tables: Vec<String>,
}

impl KeywordIntentClassifier {
    pub fn new(catalog: DomainCatalog, known_tables: Vec<String>) -> Self {
        Self {
            catalog,
            known_tables,
        }
    }

    fn query_type(query: &str, mentioned: usize) -> &'static str {
        let q = query.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| q.contains(w));

        if mentioned >= 2 || has(&["related", "relationship", "connected", "lineage", "path between"]) {
            "lineage"
        } else if has(&["depend", "upstream", "parent", "source of"]) {
            "dependency"
        } else if has(&["sql", "write a query", "generate a query"]) {
            "sql_generation"
        } else if has(&["column", "schema", "describe", "metadata", "what is", "what does"]) {
            "metadata"
        } else {
            "general"
        }
    }
}

#[async_trait::async_trait]
impl IntentClassifier for KeywordIntentClassifier {
    async fn classify(&self, query: &str) -> Result<String, PipelineError> {
        let q = query.to_lowercase();
        let mut mentioned: Vec<String> = self
            .known_tables
            .iter()
            .filter(|table| q.contains(&table.to_lowercase()))
            .cloned()
            .collect();

        let domain = self.catalog.match_domain(query);
        if let Some(domain) = domain {
            for table in &domain.tables {
                if !mentioned.contains(table) {
                    mentioned.push(table.clone());
                }
            }
        }

        let report = IntentReport {
            query_type: Self::query_type(query, mentioned.len()).to_string(),
            mentioned_tables: mentioned,
            data_domain: domain.map(|d| d.name.clone()),
            context: format!("keyword analysis of: {query}"),
        };
        serde_json::to_string(&report).map_err(|e| PipelineError::Intent(e.to_string()))
    }
}

/// Deterministic synthesizer that renders the bucket as a readable answer
#[derive(Debug, Clone, Default)]
pub struct TemplateSynthesizer;

#[async_trait::async_trait]
impl AnswerSynthesizer for TemplateSynthesizer {
    async fn synthesize(
        &self,
        query: &str,
        _intent_response: &str,
        bucket: &DataBucket,
    ) -> Result<String, PipelineError> {
        let mut out = format!("Question: {query}\n");

        if !bucket.lineage_info.is_empty() {
            out.push_str("\nLineage:\n");
            for (pair, path) in &bucket.lineage_info {
                if path.is_empty() {
                    out.push_str(&format!("  {pair}: no relationship found\n"));
                } else {
                    out.push_str(&format!("  {pair}: {}\n", path.join(" -> ")));
                }
            }
        }

        if !bucket.direct_parents_info.is_empty() {
            out.push_str("\nDirect parents:\n");
            for (table, parents) in &bucket.direct_parents_info {
                out.push_str(&format!("  {table}: {}\n", parents.join(", ")));
            }
        }

        if !bucket.metadata_info.is_empty() {
            out.push_str("\nTable metadata:\n");
            for (table, lines) in &bucket.metadata_info {
                out.push_str(&format!("  {table}:\n"));
                for line in lines {
                    out.push_str(&format!("    {line}\n"));
                }
            }
        }

        if !bucket.search_results.is_empty() {
            out.push_str("\nRelated documentation:\n");
            for doc in &bucket.search_results {
                out.push_str(&format!("  - {doc}\n"));
            }
        }

        if !bucket.relevant_data_summary.is_empty() {
            out.push_str(&format!("\n{}\n", bucket.relevant_data_summary));
        }

        Ok(out)
    }
}

/// Term-overlap search over a fixed document set.
///
/// A degraded stand-in for vector similarity search: scores each document
/// by how many query terms it contains and returns the top `k` with a
/// non-zero score.
#[derive(Debug, Clone, Default)]
pub struct KeywordSearch {
    docs: Vec<String>,
}

impl KeywordSearch {
    pub fn new(docs: Vec<String>) -> Self {
        Self { docs }
    }
}

#[async_trait::async_trait]
impl SimilaritySearch for KeywordSearch {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, PipelineError> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|t| t.len() > 2)
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let mut scored: Vec<(usize, &String)> = self
            .docs
            .iter()
            .map(|doc| {
                let lower = doc.to_lowercase();
                let score = terms.iter().filter(|t| lower.contains(t.as_str())).count();
                (score, doc)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps document order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, doc)| doc.clone()).collect())
    }
}

/// Search double that returns the same results for every query
#[derive(Debug, Clone, Default)]
pub struct StaticSearch {
    results: Vec<String>,
}

impl StaticSearch {
    pub fn new(results: Vec<String>) -> Self {
        Self { results }
    }
}

#[async_trait::async_trait]
impl SimilaritySearch for StaticSearch {
    async fn search(&self, _query: &str, k: usize) -> Result<Vec<String>, PipelineError> {
        Ok(self.results.iter().take(k).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classifier() -> KeywordIntentClassifier {
        KeywordIntentClassifier::new(
            DomainCatalog::default_catalog(),
            vec!["users".to_string(), "orders".to_string()],
        )
    }

    #[tokio::test]
    async fn classifies_lineage_question_with_two_tables() {
        let response = classifier()
            .classify("how are users and orders related?")
            .await
            .unwrap();
        let report: IntentReport = serde_json::from_str(&response).unwrap();

        assert_eq!(report.query_type, "lineage");
        assert_eq!(report.mentioned_tables, vec!["users", "orders"]);
        assert_eq!(report.data_domain, None);
    }

    #[tokio::test]
    async fn domain_keywords_imply_tables() {
        let response = classifier()
            .classify("show weekly active users trend")
            .await
            .unwrap();
        let report: IntentReport = serde_json::from_str(&response).unwrap();

        assert_eq!(report.data_domain.as_deref(), Some("user_activity"));
        assert!(report
            .mentioned_tables
            .contains(&"weekly_active_users_agg_vw".to_string()));
    }

    #[tokio::test]
    async fn unmatched_question_is_general() {
        let response = classifier().classify("hello there").await.unwrap();
        let report: IntentReport = serde_json::from_str(&response).unwrap();
        assert_eq!(report.query_type, "general");
        assert!(report.mentioned_tables.is_empty());
    }

    #[tokio::test]
    async fn dependency_question_is_classified() {
        let response = classifier()
            .classify("what does the orders table depend on?")
            .await
            .unwrap();
        let report: IntentReport = serde_json::from_str(&response).unwrap();
        assert_eq!(report.query_type, "dependency");
        assert_eq!(report.mentioned_tables, vec!["orders"]);
    }

    #[tokio::test]
    async fn keyword_search_ranks_by_overlap() {
        let search = KeywordSearch::new(vec![
            "users: core user model".to_string(),
            "orders: order fact table joined to users".to_string(),
            "payments: payment events".to_string(),
        ]);

        let results = search.search("users orders join", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], "orders: order fact table joined to users");
    }

    #[tokio::test]
    async fn keyword_search_drops_zero_scores() {
        let search = KeywordSearch::new(vec!["payments: payment events".to_string()]);
        let results = search.search("unrelated question", 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn template_synthesizer_renders_lineage() {
        let mut bucket = DataBucket::new("q");
        bucket.lineage_info.insert(
            "users -> orders".to_string(),
            vec!["users".to_string(), "orders".to_string()],
        );
        bucket
            .lineage_info
            .insert("users -> payments".to_string(), vec![]);

        let answer = TemplateSynthesizer
            .synthesize("q", "", &bucket)
            .await
            .unwrap();
        assert!(answer.contains("users -> orders: users -> orders"));
        assert!(answer.contains("users -> payments: no relationship found"));
    }
}
