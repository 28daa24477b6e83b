//! Lineage resolution over the manifest dependency graph
//!
//! Builds an in-memory adjacency from resolved model names to their declared
//! parents, then answers shortest-path and direct-parent queries. The graph
//! is built once at construction and is immutable afterwards, so a resolver
//! can be shared read-only across concurrent queries.

use std::collections::{HashMap, HashSet, VecDeque};

use regex::Regex;
use tracing::debug;

use crate::manifest::Manifest;

/// Lineage and manifest errors
#[derive(Debug, thiserror::Error)]
pub enum LineageError {
    #[error("failed to read manifest {0}: {1}")]
    Io(String, String),

    #[error("failed to parse manifest JSON: {0}")]
    Parse(String),

    #[error("manifest has no `nodes` mapping")]
    InvalidManifest,

    #[error("no model named '{0}' in manifest")]
    UnknownTable(String),
}

/// Direct parents of a table, split by how each parent was found
///
/// Declared parents come from the manifest's `depends_on.nodes`; inferred
/// parents are table-like tokens extracted from the model's SQL. The
/// extraction is heuristic (it can pick up tokens inside comments, string
/// literals, or subqueries), so the two confidence levels are kept apart
/// rather than silently merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentSet {
    /// The table the parents belong to
    pub table: String,

    /// Parents declared in the manifest, resolved to model names where the
    /// dependency id is a manifest key, kept verbatim otherwise
    pub declared: Vec<String>,

    /// Parents heuristically extracted from the model's SQL
    pub inferred: Vec<String>,
}

impl ParentSet {
    /// Union of declared and inferred parents, deduplicated and sorted
    pub fn all(&self) -> Vec<String> {
        let mut union: Vec<String> = self
            .declared
            .iter()
            .chain(self.inferred.iter())
            .cloned()
            .collect();
        union.sort();
        union.dedup();
        union
    }
}

/// Answers structural questions about a fixed dependency graph
#[derive(Debug)]
pub struct LineageResolver {
    manifest: Manifest,

    /// Resolved name -> declared parent names, in declaration order
    graph: HashMap<String, Vec<String>>,

    /// Matches table-like tokens after `from`, `join`, or `in`
    table_ref: Regex,
}

impl LineageResolver {
    /// Build a resolver from a parsed manifest.
    ///
    /// Node keys and declared dependency ids are resolved to alias (when
    /// present) or name. Dependency ids that do not exist as manifest keys
    /// are skipped here; they still participate in heuristic extraction
    /// through `direct_parents`.
    pub fn from_manifest(manifest: Manifest) -> Self {
        let mut graph: HashMap<String, Vec<String>> = HashMap::new();

        for node in manifest.nodes.values() {
            let mut parents = Vec::new();
            for parent_id in &node.depends_on.nodes {
                if let Some(parent) = manifest.nodes.get(parent_id) {
                    parents.push(parent.resolved_name().to_string());
                }
            }
            graph.insert(node.resolved_name().to_string(), parents);
        }

        // Pattern mirrors the heuristic this replaces: a keyword, whitespace,
        // then an identifier that may be dotted or double-quoted.
        let table_ref = Regex::new(r#"(?i)\b(?:from|join|in)\s+([A-Za-z0-9_."]+)"#)
            .expect("table reference pattern is valid");

        Self {
            manifest,
            graph,
            table_ref,
        }
    }

    /// Load the manifest from disk and build a resolver
    pub fn from_file(path: &std::path::Path) -> Result<Self, LineageError> {
        Ok(Self::from_manifest(Manifest::from_file(path)?))
    }

    /// The manifest this resolver was built from
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Shortest chain of names connecting `a` and `b`.
    ///
    /// Searches parent edges from `a` toward `b` first; if that fails,
    /// searches from `b` toward `a` and reverses the result, so the reported
    /// direction is the one actually found. Returns an empty vector when no
    /// path exists in either direction; absence of a relationship is a
    /// valid answer, not an error. Unknown names simply have no edges.
    pub fn shortest_path(&self, a: &str, b: &str) -> Vec<String> {
        let path = self.bfs(a, b);
        let result = if !path.is_empty() {
            path
        } else {
            let mut reverse = self.bfs(b, a);
            reverse.reverse();
            reverse
        };
        debug!(from = a, to = b, ?result, "shortest path query");
        result
    }

    /// Breadth-first search along parent edges. Equal-length paths tie-break
    /// by declaration order of the stored adjacency, which is deterministic
    /// for a fixed graph.
    fn bfs(&self, start: &str, end: &str) -> Vec<String> {
        let mut queue: VecDeque<Vec<String>> = VecDeque::new();
        let mut seen: HashSet<String> = HashSet::new();

        queue.push_back(vec![start.to_string()]);
        seen.insert(start.to_string());

        while let Some(path) = queue.pop_front() {
            let last = path.last().expect("paths are never empty");
            if last == end {
                return path;
            }
            if let Some(parents) = self.graph.get(last) {
                for parent in parents {
                    if seen.insert(parent.clone()) {
                        let mut next = path.clone();
                        next.push(parent.clone());
                        queue.push_back(next);
                    }
                }
            }
        }

        Vec::new()
    }

    /// Direct parents of `table`: manifest-declared dependencies plus
    /// table-like tokens extracted from the model's SQL.
    ///
    /// Fails with `UnknownTable` when no node matches `table` by alias,
    /// name, or unique-id suffix.
    pub fn direct_parents(&self, table: &str) -> Result<ParentSet, LineageError> {
        let (_, node) = self
            .manifest
            .find_node(table)
            .ok_or_else(|| LineageError::UnknownTable(table.to_string()))?;

        let declared: Vec<String> = node
            .depends_on
            .nodes
            .iter()
            .map(|id| match self.manifest.nodes.get(id) {
                Some(parent) => parent.name.clone(),
                None => id.clone(),
            })
            .collect();

        // Tokens that are merely a qualified form of the table itself would
        // be self-referential, so they are excluded.
        let self_suffix = format!(".{}", table.to_lowercase());
        let mut inferred: Vec<String> = Vec::new();
        for capture in self.table_ref.captures_iter(node.defining_sql()) {
            let token = capture[1].replace('"', "");
            if token.is_empty() || token.to_lowercase().ends_with(&self_suffix) {
                continue;
            }
            inferred.push(token);
        }

        let mut parents = ParentSet {
            table: table.to_string(),
            declared,
            inferred,
        };
        parents.declared.sort();
        parents.declared.dedup();
        parents.inferred.sort();
        parents.inferred.dedup();
        // A token the SQL scan rediscovers is already known with declared
        // confidence; keep it only there.
        parents
            .inferred
            .retain(|candidate| !parents.declared.contains(candidate));

        debug!(table, declared = parents.declared.len(), inferred = parents.inferred.len(), "direct parents query");
        Ok(parents)
    }
}
