//! dbt manifest.json parsing
//!
//! Parses dbt-generated manifest.json to extract models and their declared
//! dependencies. Only the subset of fields the lineage resolver needs is
//! modeled; unknown fields are ignored.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::lineage::LineageError;

/// dbt manifest.json structure (subset of fields we care about)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Model nodes, keyed by unique id (e.g. "model.my_project.users")
    pub nodes: HashMap<String, ManifestNode>,
}

impl Manifest {
    /// Load a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self, LineageError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LineageError::Io(path.display().to_string(), e.to_string()))?;
        Self::from_str(&contents)
    }

    /// Parse a manifest from a JSON string.
    ///
    /// A document without a top-level `nodes` mapping is rejected as
    /// structurally invalid rather than treated as an empty manifest.
    pub fn from_str(json: &str) -> Result<Self, LineageError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| LineageError::Parse(e.to_string()))?;

        match value.get("nodes") {
            Some(nodes) if nodes.is_object() => {}
            _ => return Err(LineageError::InvalidManifest),
        }

        serde_json::from_value(value).map_err(|e| LineageError::Parse(e.to_string()))
    }

    /// Get all model nodes (filters out tests, seeds, etc. by the `model.`
    /// unique-id prefix)
    pub fn models(&self) -> HashMap<String, &ManifestNode> {
        self.nodes
            .iter()
            .filter(|(key, _)| key.starts_with("model."))
            .map(|(key, node)| (key.clone(), node))
            .collect()
    }

    /// Get a node by its unique id
    pub fn get_node(&self, unique_id: &str) -> Option<&ManifestNode> {
        self.nodes.get(unique_id)
    }

    /// Locate a node for a table name, matching by alias first, then by
    /// name, then by a unique id ending in `.<table>` (all case-sensitive).
    /// Within one tier the lexicographically smallest unique id wins, so a
    /// multi-match lookup is deterministic. Returns the unique id and the
    /// node.
    pub fn find_node(&self, table: &str) -> Option<(&str, &ManifestNode)> {
        let suffix = format!(".{table}");
        let mut entries: Vec<(&str, &ManifestNode)> = self
            .nodes
            .iter()
            .map(|(key, node)| (key.as_str(), node))
            .collect();
        entries.sort_by_key(|(key, _)| *key);

        entries
            .iter()
            .find(|(_, node)| node.alias.as_deref() == Some(table))
            .or_else(|| entries.iter().find(|(_, node)| node.name == table))
            .or_else(|| entries.iter().find(|(key, _)| key.ends_with(&suffix)))
            .copied()
    }
}

/// A model node in the manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
    /// Model name (e.g. "users")
    pub name: String,

    /// Alias (output table name), preferred over `name` when present
    #[serde(default)]
    pub alias: Option<String>,

    /// Database name
    #[serde(default)]
    pub database: Option<String>,

    /// Schema name
    #[serde(default)]
    pub schema: Option<String>,

    /// Raw model SQL
    #[serde(default)]
    pub raw_sql: Option<String>,

    /// Compiled model SQL (refs resolved)
    #[serde(default)]
    pub compiled_sql: Option<String>,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Column definitions
    #[serde(default)]
    pub columns: HashMap<String, ColumnInfo>,

    /// Declared upstream dependencies
    #[serde(default)]
    pub depends_on: DependsOn,
}

impl ManifestNode {
    /// Human-readable resolved name: alias if present, else name
    pub fn resolved_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Query text to scan for table references: compiled form when
    /// available, falling back to the raw SQL
    pub fn defining_sql(&self) -> &str {
        self.compiled_sql
            .as_deref()
            .filter(|sql| !sql.is_empty())
            .or(self.raw_sql.as_deref())
            .unwrap_or("")
    }
}

/// Column metadata from the manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    #[serde(default)]
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Data type, if declared
    #[serde(default)]
    pub data_type: Option<String>,
}

/// Declared dependencies of a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependsOn {
    /// Unique ids of upstream nodes, in declaration order
    #[serde(default)]
    pub nodes: Vec<String>,
}
