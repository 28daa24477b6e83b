//! Stage 2: data collection
//!
//! Runs the retrieval tools implied by the intent analysis (shortest-path
//! lineage, direct parents, table metadata, similarity search), writing
//! results into the `DataBucket` and logging every tool invocation to the
//! trajectory tracker as it happens. Tool failures are recorded as
//! observations and collection continues; only stage-level failures
//! propagate.

use std::collections::BTreeMap;
use std::sync::Arc;

use querytrail_core::{AgentKind, DataBucket};
use querytrail_manifest::{LineageError, LineageResolver};
use querytrail_trajectory::TrajectoryTracker;
use tracing::{debug, warn};

use crate::pipeline::PipelineError;
use crate::stages::{IntentReport, SimilaritySearch};

/// Collects relevant data for one query
pub struct DataCollector {
    resolver: Arc<LineageResolver>,
    search: Arc<dyn SimilaritySearch>,
    search_k: usize,
}

impl DataCollector {
    pub fn new(
        resolver: Arc<LineageResolver>,
        search: Arc<dyn SimilaritySearch>,
        search_k: usize,
    ) -> Self {
        Self {
            resolver,
            search,
            search_k,
        }
    }

    /// The resolver backing the lineage tools
    pub fn resolver(&self) -> &LineageResolver {
        &self.resolver
    }

    /// Run the tools for `query` and return the populated bucket
    pub async fn collect(
        &self,
        query: &str,
        intent_response: &str,
        tracker: &mut TrajectoryTracker,
    ) -> Result<DataBucket, PipelineError> {
        let mut bucket = DataBucket::new(query);
        bucket.intent_analysis_response = intent_response.to_string();

        let report = self.parse_intent(query, intent_response);
        tracker.log_decision(
            AgentKind::DataCollection,
            format!(
                "query_type={}, tables={:?}",
                report.query_type, report.mentioned_tables
            ),
        );

        let tables = &report.mentioned_tables;

        // Lineage between the first mentioned pair.
        if tables.len() >= 2 {
            self.collect_shortest_path(&tables[0], &tables[1], &mut bucket, tracker);
        }

        for table in tables {
            self.collect_direct_parents(table, &mut bucket, tracker);
            self.collect_metadata(table, &mut bucket, tracker);
        }

        self.collect_search_results(query, &mut bucket, tracker).await;

        bucket.relevant_data_summary = Self::summarize(&report, &bucket);
        Ok(bucket)
    }

    /// Parse the intent response, degrading to a manifest-name scan when a
    /// non-structured collaborator produced free-form text.
    fn parse_intent(&self, query: &str, intent_response: &str) -> IntentReport {
        match serde_json::from_str::<IntentReport>(intent_response) {
            Ok(report) => report,
            Err(e) => {
                debug!(%e, "intent response is not structured, scanning query for table names");
                let q = query.to_lowercase();
                let mentioned = self
                    .resolver
                    .manifest()
                    .models()
                    .into_values()
                    .map(|node| node.resolved_name().to_string())
                    .filter(|name| q.contains(&name.to_lowercase()))
                    .collect();
                IntentReport {
                    query_type: "general".to_string(),
                    mentioned_tables: mentioned,
                    data_domain: None,
                    context: String::new(),
                }
            }
        }
    }

    fn collect_shortest_path(
        &self,
        a: &str,
        b: &str,
        bucket: &mut DataBucket,
        tracker: &mut TrajectoryTracker,
    ) {
        let path = self.resolver.shortest_path(a, b);
        let output = serde_json::to_string(&path).unwrap_or_default();
        tracker.log_tool_call(
            AgentKind::DataCollection,
            "find_layers",
            tool_input(&[("tables", &format!("{a},{b}"))]),
            output,
            None,
        );
        bucket.lineage_info.insert(format!("{a} -> {b}"), path);
    }

    fn collect_direct_parents(
        &self,
        table: &str,
        bucket: &mut DataBucket,
        tracker: &mut TrajectoryTracker,
    ) {
        let (output, parents) = match self.resolver.direct_parents(table) {
            Ok(parents) => {
                let all = parents.all();
                (serde_json::to_string(&all).unwrap_or_default(), Some(all))
            }
            Err(e @ LineageError::UnknownTable(_)) => {
                warn!(table, %e, "direct parents lookup failed");
                (format!("error: {e}"), None)
            }
            Err(e) => (format!("error: {e}"), None),
        };

        tracker.log_tool_call(
            AgentKind::DataCollection,
            "find_direct_parents",
            tool_input(&[("table", table)]),
            output,
            None,
        );
        if let Some(parents) = parents {
            bucket.direct_parents_info.insert(table.to_string(), parents);
        }
    }

    fn collect_metadata(
        &self,
        table: &str,
        bucket: &mut DataBucket,
        tracker: &mut TrajectoryTracker,
    ) {
        let lines = match self.resolver.manifest().find_node(table) {
            Some((key, node)) => {
                let mut lines = vec![format!("model: {key}")];
                if let (Some(database), Some(schema)) = (&node.database, &node.schema) {
                    lines.push(format!("location: {database}.{schema}"));
                } else if let Some(schema) = &node.schema {
                    lines.push(format!("schema: {schema}"));
                }
                if !node.description.is_empty() {
                    lines.push(format!("description: {}", node.description));
                }
                if !node.columns.is_empty() {
                    let mut columns: Vec<&String> = node.columns.keys().collect();
                    columns.sort();
                    let names: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
                    lines.push(format!("columns: {}", names.join(", ")));
                }
                lines
            }
            None => {
                warn!(table, "no metadata found in manifest");
                Vec::new()
            }
        };

        tracker.log_tool_call(
            AgentKind::DataCollection,
            "get_table_info",
            tool_input(&[("table", table)]),
            lines.join("\n"),
            None,
        );
        if !lines.is_empty() {
            bucket.metadata_info.insert(table.to_string(), lines);
        }
    }

    async fn collect_search_results(
        &self,
        query: &str,
        bucket: &mut DataBucket,
        tracker: &mut TrajectoryTracker,
    ) {
        let output = match self.search.search(query, self.search_k).await {
            Ok(results) => {
                let output = format!("{} documents", results.len());
                bucket.search_results.extend(results);
                output
            }
            Err(e) => {
                warn!(%e, "similarity search failed");
                format!("error: {e}")
            }
        };
        tracker.log_tool_call(
            AgentKind::DataCollection,
            "general_similarity_search",
            tool_input(&[("query", query)]),
            output,
            None,
        );
    }

    fn summarize(report: &IntentReport, bucket: &DataBucket) -> String {
        format!(
            "Collected for a {} question: {} lineage path(s), {} parent set(s), \
             metadata for {} table(s), {} search result(s).",
            report.query_type,
            bucket.lineage_info.len(),
            bucket.direct_parents_info.len(),
            bucket.metadata_info.len(),
            bucket.search_results.len(),
        )
    }
}

fn tool_input(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
