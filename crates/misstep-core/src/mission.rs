//! Batch diagnosis of a whole multiple-choice problem.
//!
//! Every answered step is checked against its template; wrong steps are run
//! through the classifier and get resources and a Socratic hint. The report
//! rolls the per-step tags up into an overall diagnosis and picks what the
//! student should see next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::{normalize, Classifier, StepMetadata};
use crate::config::EngineConfig;
use crate::hints::{resources_for_tag, HintBook, Resource};
use crate::model::{ConfidenceLevel, PrereqTag};

/// Characters of the normalized correct answer used to find its option.
const ANSWER_PREFIX_CHARS: usize = 60;

/// One step of a templated problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStep {
    pub step_number: u32,
    #[serde(default)]
    pub description: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub common_misconceptions: Vec<String>,
}

impl TemplateStep {
    /// Index of the first option whose normalized text starts with the
    /// normalized correct answer, compared on its first 60 characters.
    pub fn matching_option(&self) -> Option<usize> {
        let prefix: String = normalize(&self.correct_answer)
            .chars()
            .take(ANSWER_PREFIX_CHARS)
            .collect();
        self.options
            .iter()
            .position(|opt| normalize(opt).starts_with(&prefix))
    }

    /// [`matching_option`](Self::matching_option), falling back to 0.
    pub fn correct_option_index(&self) -> usize {
        self.matching_option().unwrap_or(0)
    }

    pub fn metadata(&self) -> StepMetadata {
        StepMetadata {
            explanation: self.explanation.clone(),
            common_misconceptions: self.common_misconceptions.clone(),
        }
    }
}

/// A multiple-choice problem broken into steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemTemplate {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub concept_id: Option<String>,
    #[serde(default)]
    pub steps: Vec<TemplateStep>,
}

impl ProblemTemplate {
    pub fn step(&self, step_number: u32) -> Option<&TemplateStep> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAnswer {
    pub step_number: u32,
    pub selected_option_index: usize,
}

/// Outcome of a prerequisite mini-quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub prereq_tag: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub student_id: Option<String>,
    pub problem: ProblemTemplate,
    #[serde(default)]
    pub answers: Vec<StepAnswer>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub prereq_quiz_results: Vec<QuizResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepDiagnosis {
    pub step_number: u32,
    pub selected_option_index: usize,
    pub correct_option_index: usize,
    pub correct: bool,
    pub prereq_tag: Option<PrereqTag>,
    pub confidence: ConfidenceLevel,
    /// Classifier rule that decided the tag.
    pub rule: Option<&'static str>,
    pub socratic_hint: Option<String>,
    pub recommended_resource_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagDiagnosis {
    pub prereq_tag: PrereqTag,
    pub confidence: ConfidenceLevel,
    /// Set when a prerequisite quiz for this tag was passed.
    pub mastery: bool,
    pub recommended_resource_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionAction {
    Done,
    ProceedStep,
    PlayResource,
    ShowPrereqQuiz,
}

impl std::fmt::Display for MissionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissionAction::Done => write!(f, "done"),
            MissionAction::ProceedStep => write!(f, "proceed_step"),
            MissionAction::PlayResource => write!(f, "play_resource"),
            MissionAction::ShowPrereqQuiz => write!(f, "show_prereq_quiz"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MissionReport {
    pub id: Uuid,
    pub session_id: String,
    pub student_id: Option<String>,
    pub problem_id: String,
    pub timestamp: DateTime<Utc>,
    pub steps: Vec<StepDiagnosis>,
    pub overall_diagnosis: Vec<TagDiagnosis>,
    pub next_action: MissionAction,
}

impl MissionReport {
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepDiagnosis> {
        self.steps.iter().filter(|s| !s.correct)
    }
}

/// Runs batch diagnosis with a classifier cascade and hint book.
#[derive(Debug, Clone, Default)]
pub struct MissionDiagnoser {
    classifier: Classifier,
    hints: HintBook,
}

impl MissionDiagnoser {
    pub fn new(classifier: Classifier, hints: HintBook) -> Self {
        Self { classifier, hints }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(Classifier::default(), HintBook::from_config(config))
    }

    pub fn diagnose(&self, request: &MissionRequest) -> MissionReport {
        let steps: Vec<StepDiagnosis> = request
            .answers
            .iter()
            .filter_map(|answer| match request.problem.step(answer.step_number) {
                Some(step) => Some(self.diagnose_step(step, answer, &request.resources)),
                None => {
                    tracing::warn!(
                        "answer for unknown step {} in problem {}, skipping",
                        answer.step_number,
                        request.problem.id
                    );
                    None
                }
            })
            .collect();

        let overall_diagnosis = overall_diagnosis(&steps, &request.prereq_quiz_results);
        let next_action = next_action(&steps, &request.prereq_quiz_results);
        tracing::info!(
            "mission {} for problem {}: {} of {} steps wrong, next {next_action}",
            request.session_id,
            request.problem.id,
            steps.iter().filter(|s| !s.correct).count(),
            steps.len()
        );

        MissionReport {
            id: Uuid::new_v4(),
            session_id: request.session_id.clone(),
            student_id: request.student_id.clone(),
            problem_id: request.problem.id.clone(),
            timestamp: Utc::now(),
            steps,
            overall_diagnosis,
            next_action,
        }
    }

    fn diagnose_step(
        &self,
        step: &TemplateStep,
        answer: &StepAnswer,
        catalog: &[Resource],
    ) -> StepDiagnosis {
        let correct_index = step.correct_option_index();
        if answer.selected_option_index == correct_index {
            return StepDiagnosis {
                step_number: step.step_number,
                selected_option_index: answer.selected_option_index,
                correct_option_index: correct_index,
                correct: true,
                prereq_tag: None,
                confidence: ConfidenceLevel::High,
                rule: None,
                socratic_hint: None,
                recommended_resource_ids: Vec::new(),
            };
        }

        // an out-of-range index classifies as empty text
        let selected = step
            .options
            .get(answer.selected_option_index)
            .map(String::as_str)
            .unwrap_or("");
        let classification = self
            .classifier
            .classify(selected, &step.correct_answer, &step.metadata());

        StepDiagnosis {
            step_number: step.step_number,
            selected_option_index: answer.selected_option_index,
            correct_option_index: correct_index,
            correct: false,
            prereq_tag: Some(classification.tag),
            confidence: classification.confidence,
            rule: Some(classification.rule),
            socratic_hint: Some(self.hints.hint(classification.tag)),
            recommended_resource_ids: resources_for_tag(classification.tag, catalog),
        }
    }
}

/// Convenience wrapper using the default cascade and hints.
pub fn diagnose_mission(request: &MissionRequest) -> MissionReport {
    MissionDiagnoser::default().diagnose(request)
}

fn overall_diagnosis(steps: &[StepDiagnosis], quiz: &[QuizResult]) -> Vec<TagDiagnosis> {
    let mut entries: Vec<TagDiagnosis> = Vec::new();
    let mut saw_unknown = false;

    for (step, tag) in steps
        .iter()
        .filter(|s| !s.correct)
        .filter_map(|s| s.prereq_tag.map(|t| (s, t)))
    {
        if tag.is_unknown() {
            saw_unknown = true;
            continue;
        }
        match entries.iter_mut().find(|e| e.prereq_tag == tag) {
            Some(entry) => {
                for id in &step.recommended_resource_ids {
                    if !entry.recommended_resource_ids.contains(id) {
                        entry.recommended_resource_ids.push(id.clone());
                    }
                }
            }
            None => entries.push(TagDiagnosis {
                prereq_tag: tag,
                confidence: step.confidence,
                mastery: quiz.iter().any(|q| q.passed && q.prereq_tag == tag.as_str()),
                recommended_resource_ids: step.recommended_resource_ids.clone(),
            }),
        }
    }

    if saw_unknown {
        entries.push(TagDiagnosis {
            prereq_tag: PrereqTag::Unknown,
            confidence: ConfidenceLevel::Low,
            mastery: false,
            recommended_resource_ids: Vec::new(),
        });
    }
    entries
}

fn next_action(steps: &[StepDiagnosis], quiz: &[QuizResult]) -> MissionAction {
    let mut failed = steps.iter().filter(|s| !s.correct).peekable();
    if failed.peek().is_none() {
        return MissionAction::Done;
    }
    if !quiz.is_empty() && quiz.iter().all(|q| q.passed) {
        return MissionAction::ProceedStep;
    }
    if failed.any(|s| !s.recommended_resource_ids.is_empty()) {
        return MissionAction::PlayResource;
    }
    MissionAction::ShowPrereqQuiz
}
