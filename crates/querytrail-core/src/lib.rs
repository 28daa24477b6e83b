//! QueryTrail Core
//!
//! Core domain model shared across the workspace: trajectory records,
//! the pipeline data bucket, and configuration.

pub mod bucket;
pub mod config;
pub mod trajectory;

pub use bucket::DataBucket;
pub use config::{Config, StoreKind, TrajectoryConfig};
pub use trajectory::{AgentKind, SessionTrajectory, TrajectoryStep};
