//! The `misstep classify` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use misstep_core::classifier::{Classifier, ClassifierInput, StepMetadata};
use misstep_core::hints::HintBook;
use misstep_core::load_config_from;

pub fn execute(
    option: String,
    correct: String,
    explanation: String,
    misconceptions: Vec<String>,
    trace: bool,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let hints = HintBook::from_config(&config);
    let classifier = Classifier::default();

    let step = StepMetadata {
        explanation,
        common_misconceptions: misconceptions,
    };
    let input = ClassifierInput::new(&option, &correct, &step);
    let classification = classifier.classify_input(&input);
    let hint = hints.hint(classification.tag);

    if format == "json" {
        let mut out = serde_json::json!({
            "tag": classification.tag,
            "confidence": classification.confidence,
            "rule": classification.rule,
            "hint": hint,
        });
        if trace {
            out["trace"] = classifier
                .trace(&input)
                .into_iter()
                .map(|(rule, tag)| serde_json::json!({ "rule": rule, "tag": tag }))
                .collect();
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Tag: {}", classification.tag);
    println!("Confidence: {}", classification.confidence);
    println!("Rule: {}", classification.rule);
    println!("Hint: {hint}");

    if trace {
        let mut table = Table::new();
        table.set_header(vec!["Rule", "Verdict"]);
        for (rule, tag) in classifier.trace(&input) {
            let verdict = tag.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
            table.add_row(vec![Cell::new(rule), Cell::new(verdict)]);
        }
        println!("\n{table}");
    }

    Ok(())
}
