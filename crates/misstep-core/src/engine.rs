//! The diagnosis engine: correctness check plus escalating feedback.
//!
//! Every call is a pure function of the checkpoint, the answer, and the
//! caller-supplied attempt number. The only side effect is a downgrade request
//! to the mastery store when a backtrack lands on a concept the student had
//! already mastered.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::graph::backtrack_path;
use crate::matcher::{
    match_error_pattern, parse_exact_number, parse_quantity, text_equals, within_tolerance,
};
use crate::model::{
    Answer, AnswerKey, AttemptContext, Checkpoint, DiagnosisResult, ErrorPattern, MasteryStatus,
    NextAction, Problem,
};
use crate::traits::{status_or_default, ConceptSource, MasteryStore};

/// Decide whether `answer` satisfies `key`.
///
/// Value keys compare numerically when both sides parse as numbers, otherwise
/// as trimmed case-insensitive text. A text answer may carry the checkpoint's
/// `unit` after the number. Option keys accept only an option id.
pub fn is_correct(
    key: &AnswerKey,
    answer: &Answer,
    unit: Option<&str>,
) -> Result<bool, EngineError> {
    match key {
        AnswerKey::Value { value, tolerance } => {
            let submitted = match answer {
                Answer::Numeric(v) => Some(*v),
                Answer::Text(s) => parse_quantity(s, unit),
                Answer::OptionId(_) => {
                    return Err(EngineError::AnswerShape {
                        expected: "numeric or text",
                        got: answer.kind(),
                    })
                }
            };
            match (submitted, parse_exact_number(value)) {
                (Some(submitted), Some(expected)) => {
                    Ok(within_tolerance(submitted, expected, *tolerance))
                }
                _ => Ok(text_equals(&answer.as_text(), value)),
            }
        }
        AnswerKey::Option { id } => match answer {
            Answer::OptionId(chosen) => Ok(chosen.trim() == id.trim()),
            other => Err(EngineError::AnswerShape {
                expected: "option id",
                got: other.kind(),
            }),
        },
    }
}

/// Evaluates answers against checkpoints.
pub struct DiagnosisEngine<'a> {
    concepts: &'a dyn ConceptSource,
    mastery: &'a dyn MasteryStore,
    config: EngineConfig,
}

impl<'a> DiagnosisEngine<'a> {
    pub fn new(concepts: &'a dyn ConceptSource, mastery: &'a dyn MasteryStore) -> Self {
        Self {
            concepts,
            mastery,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one answer.
    ///
    /// Escalation by attempt number: the checkpoint hint first, then a matched
    /// pattern's diagnosis, then a backtrack to the pattern's missing concept.
    /// Without a usable pattern the later attempts get the directive message.
    pub fn evaluate(
        &self,
        checkpoint: &Checkpoint,
        answer: &Answer,
        ctx: &AttemptContext,
    ) -> Result<DiagnosisResult, EngineError> {
        if checkpoint.id.trim().is_empty() {
            return Err(EngineError::EmptyCheckpointId);
        }
        if ctx.attempt_number == 0 {
            return Err(EngineError::InvalidAttempt(ctx.attempt_number));
        }

        if is_correct(&checkpoint.answer_key, answer, checkpoint.unit.as_deref())? {
            let next_action = if ctx.final_checkpoint {
                NextAction::Complete
            } else {
                NextAction::Continue
            };
            return Ok(DiagnosisResult {
                checkpoint_id: checkpoint.id.clone(),
                correct: true,
                error_type: None,
                missing_concept: None,
                confidence: None,
                feedback: self.config.correct_feedback.clone(),
                hint: None,
                explanation: checkpoint.explanation.clone(),
                next_action,
                backtrack_path: Vec::new(),
                downgrade_requested: false,
            });
        }

        let matched = match_error_pattern(&checkpoint.error_patterns, &answer.as_text());
        let mut result = DiagnosisResult {
            checkpoint_id: checkpoint.id.clone(),
            correct: false,
            error_type: matched.map(|p| p.error_type.clone()),
            missing_concept: matched.and_then(|p| p.missing_concept.clone()),
            confidence: matched.map(|p| p.confidence),
            feedback: self.config.directive_feedback.clone(),
            hint: checkpoint.hint.clone(),
            explanation: None,
            next_action: NextAction::Retry,
            backtrack_path: Vec::new(),
            downgrade_requested: false,
        };

        let attempt = ctx.attempt_number;
        if attempt < self.config.specific_feedback_attempt {
            result.feedback = checkpoint
                .hint
                .clone()
                .unwrap_or_else(|| self.config.generic_hint.clone());
            return Ok(result);
        }

        let Some(pattern) = matched else {
            return Ok(result);
        };

        if attempt < self.config.backtrack_attempt {
            result.feedback = pattern.diagnosis_text.clone();
            return Ok(result);
        }

        match pattern.missing_concept.as_deref() {
            Some(missing) => self.route_back(result, pattern, missing, &ctx.student_id),
            None => Ok(result),
        }
    }

    /// Look up `checkpoint_id` in `problem` and evaluate it, marking the last
    /// checkpoint as final.
    pub fn evaluate_in_problem(
        &self,
        problem: &Problem,
        checkpoint_id: &str,
        answer: &Answer,
        student_id: &str,
        attempt_number: u32,
    ) -> Result<DiagnosisResult, EngineError> {
        if checkpoint_id.trim().is_empty() {
            return Err(EngineError::EmptyCheckpointId);
        }
        let checkpoint = problem
            .checkpoints
            .iter()
            .find(|c| c.id == checkpoint_id)
            .ok_or_else(|| EngineError::UnknownCheckpoint(checkpoint_id.to_string()))?;
        let ctx = AttemptContext {
            student_id: student_id.to_string(),
            attempt_number,
            final_checkpoint: problem.is_final_checkpoint(checkpoint_id),
        };
        self.evaluate(checkpoint, answer, &ctx)
    }

    fn route_back(
        &self,
        mut result: DiagnosisResult,
        pattern: &ErrorPattern,
        missing: &str,
        student_id: &str,
    ) -> Result<DiagnosisResult, EngineError> {
        let Some(target) = self.concepts.get_concept(missing)? else {
            tracing::warn!(
                "pattern {} names missing concept {missing}, which is not in the graph",
                pattern.id
            );
            result.missing_concept = None;
            result.feedback = self.config.prerequisite_review.clone();
            return Ok(result);
        };

        if status_or_default(self.mastery, student_id, missing)? == MasteryStatus::Mastered {
            tracing::info!("requesting review of {missing} for student {student_id}");
            self.mastery.request_downgrade(student_id, missing)?;
            result.downgrade_requested = true;
        }

        tracing::info!(
            "backtracking student {student_id} from {} to {missing}",
            result.checkpoint_id
        );
        result.backtrack_path = backtrack_path(self.concepts, self.mastery, student_id, missing)?;
        result.feedback = format!(
            "{} Let's review {} before continuing.",
            pattern.diagnosis_text, target.name
        );
        result.next_action = NextAction::Backtrack;
        Ok(result)
    }
}
