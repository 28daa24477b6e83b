//! dbt manifest parsing and lineage resolution
//!
//! This crate handles:
//! - Parsing manifest.json (dbt-generated artifacts)
//! - Building the dependency graph between models
//! - Shortest-path and direct-parent lineage queries
//! - Heuristic parent extraction from model SQL

pub mod lineage;
pub mod manifest;

pub use lineage::{LineageError, LineageResolver, ParentSet};
pub use manifest::{ColumnInfo, DependsOn, Manifest, ManifestNode};
