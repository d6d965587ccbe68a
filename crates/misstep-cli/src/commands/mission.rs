//! The `misstep mission` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use misstep_core::load_config_from;
use misstep_core::mission::{MissionDiagnoser, MissionReport, MissionRequest, QuizResult, StepAnswer};

pub struct MissionArgs {
    pub content: PathBuf,
    pub template: String,
    pub answers: String,
    pub quiz: Option<String>,
    pub session: String,
    pub student: Option<String>,
    pub format: String,
    pub config: Option<PathBuf>,
}

pub fn execute(args: MissionArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;
    let pack = misstep_core::parser::load_content(&args.content)?;

    let template = pack
        .template(&args.template)
        .with_context(|| format!("template not found: {}", args.template))?;
    let answers: Vec<StepAnswer> = super::read_json_arg(&args.answers, "answers")?;
    let prereq_quiz_results: Vec<QuizResult> = match &args.quiz {
        Some(quiz) => super::read_json_arg(quiz, "quiz results")?,
        None => Vec::new(),
    };

    let request = MissionRequest {
        session_id: args.session,
        student_id: args.student,
        problem: template.clone(),
        answers,
        resources: pack.resources.clone(),
        prereq_quiz_results,
    };

    let report = MissionDiagnoser::from_config(&config).diagnose(&request);

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &MissionReport) {
    println!("Mission: {} (session {})", report.problem_id, report.session_id);

    let mut table = Table::new();
    table.set_header(vec!["Step", "Selected", "Correct", "Result", "Tag", "Confidence"]);
    for step in &report.steps {
        let result = if step.correct { "correct" } else { "wrong" };
        let tag = step
            .prereq_tag
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(step.step_number),
            Cell::new(step.selected_option_index),
            Cell::new(step.correct_option_index),
            Cell::new(result),
            Cell::new(tag),
            Cell::new(step.confidence),
        ]);
    }
    println!("{table}");

    for step in report.failed_steps() {
        if let Some(hint) = &step.socratic_hint {
            println!("\nStep {}: {hint}", step.step_number);
        }
        if !step.recommended_resource_ids.is_empty() {
            println!("  Resources: {}", step.recommended_resource_ids.join(", "));
        }
    }

    if !report.overall_diagnosis.is_empty() {
        println!("\nOverall diagnosis:");
        for tag in &report.overall_diagnosis {
            let state = if tag.mastery { "mastered" } else { "gap" };
            println!("  {} ({}, {state})", tag.prereq_tag, tag.confidence);
        }
    }

    println!("\nNext action: {}", report.next_action);
}
