//! The `misstep evaluate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;

use misstep_core::model::{Answer, AnswerKey, AttemptContext, DiagnosisResult};
use misstep_core::{load_config_from, DiagnosisEngine};

/// How the `--answer` string is turned into an [`Answer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnswerKind {
    /// Option id for option checkpoints, a number if it parses, text otherwise.
    Auto,
    Numeric,
    Text,
    Option,
}

pub struct EvaluateArgs {
    pub content: PathBuf,
    pub checkpoint: String,
    pub answer: String,
    pub kind: AnswerKind,
    pub attempt: u32,
    pub student: String,
    pub progress: Option<PathBuf>,
    pub final_checkpoint: bool,
    pub format: String,
    pub config: Option<PathBuf>,
}

pub fn execute(args: EvaluateArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;
    let pack = misstep_core::parser::load_content(&args.content)?;
    let graph = pack.concept_graph();
    let mastery = super::open_mastery(args.progress.as_deref())?;

    let (problem, checkpoint) = pack
        .find_checkpoint(&args.checkpoint)
        .with_context(|| format!("checkpoint not found: {}", args.checkpoint))?;

    let answer = build_answer(&args.answer, args.kind, &checkpoint.answer_key)?;
    let ctx = AttemptContext {
        student_id: args.student.clone(),
        attempt_number: args.attempt,
        final_checkpoint: args.final_checkpoint || problem.is_final_checkpoint(&checkpoint.id),
    };

    tracing::info!(
        "evaluating {} (problem {}), attempt {}",
        checkpoint.id,
        problem.id,
        args.attempt
    );

    let engine = DiagnosisEngine::new(&graph, mastery.as_ref()).with_config(config);
    let result = engine.evaluate(checkpoint, &answer, &ctx)?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_result(&result),
    }

    Ok(())
}

fn build_answer(raw: &str, kind: AnswerKind, key: &AnswerKey) -> Result<Answer> {
    let answer = match kind {
        AnswerKind::Numeric => {
            let value = misstep_core::matcher::parse_exact_number(raw)
                .with_context(|| format!("not a number: {raw}"))?;
            Answer::Numeric(value)
        }
        AnswerKind::Text => Answer::Text(raw.to_string()),
        AnswerKind::Option => Answer::OptionId(raw.to_string()),
        AnswerKind::Auto => match key {
            AnswerKey::Option { .. } => Answer::OptionId(raw.to_string()),
            AnswerKey::Value { .. } => match misstep_core::matcher::parse_exact_number(raw) {
                Some(value) => Answer::Numeric(value),
                None => Answer::Text(raw.to_string()),
            },
        },
    };
    Ok(answer)
}

fn print_result(result: &DiagnosisResult) {
    let verdict = if result.correct { "correct" } else { "incorrect" };
    println!("Checkpoint: {} ({verdict})", result.checkpoint_id);
    println!("Next action: {}", result.next_action);
    if let Some(error_type) = &result.error_type {
        match result.confidence {
            Some(c) => println!("Error type: {error_type} (confidence {c:.2})"),
            None => println!("Error type: {error_type}"),
        }
    }
    if let Some(missing) = &result.missing_concept {
        println!("Missing concept: {missing}");
    }
    println!("\n{}", result.feedback);
    if let Some(hint) = &result.hint {
        println!("Hint: {hint}");
    }
    if let Some(explanation) = &result.explanation {
        println!("Explanation: {explanation}");
    }
    if result.downgrade_requested {
        let concept = result.missing_concept.as_deref().unwrap_or("-");
        println!("\nMastery review requested for {concept}.");
    }
    if !result.backtrack_path.is_empty() {
        println!("\nReview path:");
        for (i, step) in result.backtrack_path.iter().enumerate() {
            let marker = if step.is_target { " <- start here" } else { "" };
            println!(
                "  {}. {} [{}]{marker}",
                i + 1,
                step.concept.name,
                step.status
            );
        }
    }
}
