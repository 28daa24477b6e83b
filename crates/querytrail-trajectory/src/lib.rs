//! Session trajectory tracking and persistence
//!
//! This crate provides:
//! - The `TrajectoryTracker` state machine that records the provenance of
//!   one in-flight pipeline run
//! - The `TrajectoryStore` trait at the persistence boundary
//! - `MemoryStore` (tests, demos) and `JsonlStore` (append-only files)

pub mod jsonl;
pub mod memory;
pub mod store;
pub mod tracker;

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
pub use store::{SessionRow, StepRow, StoreError, TrajectoryStore};
pub use tracker::{TrajectoryError, TrajectoryTracker};
