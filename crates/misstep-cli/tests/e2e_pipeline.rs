//! End-to-end tests running the engine over the sample content packs.
//!
//! These load the packs from `content/`, evaluate answers across several
//! attempts against a real mastery store, and check the mission report.

use std::path::Path;

use misstep_core::mission::{MissionDiagnoser, MissionRequest, StepAnswer};
use misstep_core::model::{Answer, MasteryStatus, NextAction};
use misstep_core::parser::{load_content, ContentPack};
use misstep_core::{DiagnosisEngine, EngineConfig};
use misstep_store::{InMemoryMasteryStore, JsonFileMasteryStore};
use uuid::Uuid;

fn packs() -> ContentPack {
    load_content(Path::new("../../content")).unwrap()
}

#[test]
fn sample_packs_load_together() {
    let pack = packs();
    assert_eq!(pack.id, "chemistry-stoichiometry+physics-mechanics");
    assert!(pack.problem("launch-angle").is_some());
    assert!(pack.problem("water-synthesis").is_some());
    assert!(misstep_core::parser::validate_content_pack(&pack).is_empty());
}

#[test]
fn escalation_over_three_attempts() {
    let pack = packs();
    let graph = pack.concept_graph();
    let mastery = InMemoryMasteryStore::new();
    mastery
        .set_status("s1", "trigonometry", MasteryStatus::Mastered)
        .unwrap();
    let engine = DiagnosisEngine::new(&graph, &mastery);
    let problem = pack.problem("launch-angle").unwrap();
    let wrong = Answer::Numeric(15.6);

    let first = engine
        .evaluate_in_problem(problem, "launch-vx", &wrong, "s1", 1)
        .unwrap();
    assert_eq!(first.next_action, NextAction::Retry);
    assert_eq!(first.error_type.as_deref(), Some("TRIG_FUNCTION_SWAP"));
    assert_eq!(first.feedback, first.hint.clone().unwrap());

    let second = engine
        .evaluate_in_problem(problem, "launch-vx", &wrong, "s1", 2)
        .unwrap();
    assert_eq!(second.next_action, NextAction::Retry);
    assert!(second.feedback.starts_with("That is the vertical component"));
    assert_eq!(mastery.downgrade_requests(), 0);

    let third = engine
        .evaluate_in_problem(problem, "launch-vx", &wrong, "s1", 3)
        .unwrap();
    assert_eq!(third.next_action, NextAction::Backtrack);
    assert!(third.downgrade_requested);
    let ids: Vec<&str> = third
        .backtrack_path
        .iter()
        .map(|s| s.concept.id.as_str())
        .collect();
    assert_eq!(ids, ["algebra", "trigonometry"]);
    assert!(third.backtrack_path[1].is_target);
    assert_eq!(third.backtrack_path[1].status, MasteryStatus::NeedsReview);
    assert_eq!(
        mastery.record("s1", "trigonometry").unwrap().unwrap().status,
        MasteryStatus::NeedsReview
    );

    // a second backtrack leaves the demoted record alone
    let fourth = engine
        .evaluate_in_problem(problem, "launch-vx", &wrong, "s1", 4)
        .unwrap();
    assert_eq!(fourth.next_action, NextAction::Backtrack);
    assert!(!fourth.downgrade_requested);
}

#[test]
fn pattern_without_missing_concept_never_backtracks() {
    let pack = packs();
    let graph = pack.concept_graph();
    let mastery = InMemoryMasteryStore::new();
    let engine = DiagnosisEngine::new(&graph, &mastery);
    let problem = pack.problem("launch-angle").unwrap();

    let result = engine
        .evaluate_in_problem(problem, "launch-time", &Answer::Numeric(1.59), "s1", 5)
        .unwrap();
    assert_eq!(result.error_type.as_deref(), Some("HALF_FLIGHT"));
    assert_eq!(result.next_action, NextAction::Retry);
    assert!(result.backtrack_path.is_empty());
}

#[test]
fn later_backtrack_threshold_from_config() {
    let pack = packs();
    let graph = pack.concept_graph();
    let mastery = InMemoryMasteryStore::new();
    let config = EngineConfig {
        backtrack_attempt: 4,
        ..Default::default()
    };
    let engine = DiagnosisEngine::new(&graph, &mastery).with_config(config);
    let problem = pack.problem("water-synthesis").unwrap();

    let third = engine
        .evaluate_in_problem(problem, "h2-moles", &Answer::Numeric(10.0), "s1", 3)
        .unwrap();
    assert_eq!(third.next_action, NextAction::Retry);

    let fourth = engine
        .evaluate_in_problem(problem, "h2-moles", &Answer::Numeric(10.0), "s1", 4)
        .unwrap();
    assert_eq!(fourth.next_action, NextAction::Backtrack);
    assert_eq!(fourth.missing_concept.as_deref(), Some("mole-concept"));
}

#[test]
fn progress_file_tracks_attempts_and_review() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.json");
    let pack = packs();
    let graph = pack.concept_graph();

    {
        let store = JsonFileMasteryStore::open(&path).unwrap();
        store.record_attempt("s1", "mole-concept", 1.0, true).unwrap();
    }

    let store = JsonFileMasteryStore::open(&path).unwrap();
    let engine = DiagnosisEngine::new(&graph, &store);
    let problem = pack.problem("water-synthesis").unwrap();
    let result = engine
        .evaluate_in_problem(problem, "limiting-pick", &Answer::OptionId("h2".into()), "s1", 3)
        .unwrap();
    assert!(result.downgrade_requested);

    let reopened = JsonFileMasteryStore::open(&path).unwrap();
    let records = reopened.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, MasteryStatus::NeedsReview);
    assert_eq!(records[0].attempts, 1);
}

#[test]
fn mission_report_serializes() {
    let pack = packs();
    let request = MissionRequest {
        session_id: "sess-1".into(),
        student_id: Some("s1".into()),
        problem: pack.template("vector-components").unwrap().clone(),
        answers: vec![
            StepAnswer {
                step_number: 1,
                selected_option_index: 1,
            },
            StepAnswer {
                step_number: 2,
                selected_option_index: 1,
            },
        ],
        resources: pack.resources.clone(),
        prereq_quiz_results: vec![],
    };

    let report = MissionDiagnoser::default().diagnose(&request);
    assert_eq!(report.failed_steps().count(), 2);

    let json = serde_json::to_value(&report).unwrap();
    assert!(Uuid::parse_str(json["id"].as_str().unwrap()).is_ok());
    assert_eq!(json["next_action"], "play_resource");
    assert_eq!(
        json["overall_diagnosis"][0]["prereq_tag"],
        "trigonometry_vector_decomposition"
    );
    assert_eq!(
        json["overall_diagnosis"][1]["prereq_tag"],
        "decoupling_horizontal_vertical"
    );
    assert_eq!(
        json["overall_diagnosis"][1]["recommended_resource_ids"][0],
        "projectile-sim"
    );
}
