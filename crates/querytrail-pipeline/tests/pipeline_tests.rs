//! End-to-end pipeline tests with deterministic collaborators

use std::sync::Arc;

use pretty_assertions::assert_eq;
use querytrail_manifest::{LineageResolver, Manifest};
use querytrail_pipeline::{
    DataCollector, DomainCatalog, KeywordIntentClassifier, Pipeline, StaticSearch,
    TemplateSynthesizer,
};
use querytrail_trajectory::{MemoryStore, TrajectoryTracker};

fn resolver() -> Arc<LineageResolver> {
    let manifest = Manifest::from_str(
        r#"{
            "nodes": {
                "model.proj.raw_users": {"name": "raw_users", "description": "Landing users"},
                "model.proj.users": {
                    "name": "users",
                    "schema": "analytics",
                    "description": "Core user model",
                    "columns": {"id": {"name": "id"}},
                    "depends_on": {"nodes": ["model.proj.raw_users"]}
                },
                "model.proj.orders": {
                    "name": "orders",
                    "description": "Order facts",
                    "depends_on": {"nodes": ["model.proj.users"]}
                }
            }
        }"#,
    )
    .unwrap();
    Arc::new(LineageResolver::from_manifest(manifest))
}

fn pipeline() -> Pipeline {
    let resolver = resolver();
    let known_tables: Vec<String> = resolver
        .manifest()
        .nodes
        .values()
        .map(|node| node.resolved_name().to_string())
        .collect();

    let intent = KeywordIntentClassifier::new(DomainCatalog::default_catalog(), known_tables);
    let collector = DataCollector::new(
        resolver,
        Arc::new(StaticSearch::new(vec![
            "users: core user model".to_string(),
            "orders: order facts".to_string(),
        ])),
        3,
    );
    Pipeline::new(Arc::new(intent), collector, Arc::new(TemplateSynthesizer))
}

fn tracker() -> (TrajectoryTracker, MemoryStore) {
    let store = MemoryStore::new();
    let tracker = TrajectoryTracker::new(Arc::new(store.clone()));
    (tracker, store)
}

#[tokio::test]
async fn lineage_question_end_to_end() {
    let pipeline = pipeline();
    let (mut tracker, store) = tracker();

    tracker.start_session("run-1");
    tracker.set_original_query("how are orders and users related?");

    let outcome = pipeline
        .process_query("how are orders and users related?", &mut tracker)
        .await
        .unwrap();

    // All required bucket keys populated.
    assert!(outcome.bucket.missing_required_keys().is_empty());
    assert!(!outcome.bucket.relevant_data_summary.is_empty());
    assert!(outcome.answer.contains("Lineage:"));

    let trajectory = tracker
        .end_session(&outcome.answer, true, None, true)
        .await
        .unwrap()
        .expect("trajectory");

    assert!(trajectory.total_steps > 0);
    assert_eq!(store.session_count().await, 1);
    assert_eq!(store.step_count().await, trajectory.total_steps);
}

#[tokio::test]
async fn multi_turn_session_accumulates_under_one_id() {
    let pipeline = pipeline();
    let (mut tracker, store) = tracker();

    tracker.start_session("eval-loop");

    let first = pipeline
        .process_query("what does orders depend on?", &mut tracker)
        .await
        .unwrap();
    let first_trajectory = tracker
        .end_session(&first.answer, true, None, false)
        .await
        .unwrap()
        .expect("trajectory");

    let second = pipeline
        .process_query("describe the users model", &mut tracker)
        .await
        .unwrap();
    let second_trajectory = tracker
        .end_session(&second.answer, true, None, true)
        .await
        .unwrap()
        .expect("trajectory");

    // Same logical conversation, fresh steps per question.
    assert_eq!(first_trajectory.session_id, "eval-loop");
    assert_eq!(second_trajectory.session_id, "eval-loop");
    assert!(second_trajectory.total_steps > 0);
    assert_eq!(store.session_count().await, 2);
}

#[tokio::test]
async fn dependency_answer_names_the_parent() {
    let pipeline = pipeline();
    let (mut tracker, _) = tracker();
    tracker.start_session("run-1");

    let outcome = pipeline
        .process_query("what does the orders table depend on?", &mut tracker)
        .await
        .unwrap();

    assert_eq!(
        outcome.bucket.direct_parents_info.get("orders"),
        Some(&vec!["users".to_string()])
    );
    assert!(outcome.answer.contains("orders: users"));
}

#[tokio::test]
async fn general_question_still_fills_search_results() {
    let pipeline = pipeline();
    let (mut tracker, _) = tracker();
    tracker.start_session("run-1");

    let outcome = pipeline
        .process_query("tell me something about this warehouse", &mut tracker)
        .await
        .unwrap();

    // No tables mentioned: lineage and metadata stay empty but search ran.
    assert!(outcome.bucket.lineage_info.is_empty());
    assert_eq!(outcome.bucket.search_results.len(), 2);
    assert!(!outcome.answer.is_empty());
}
