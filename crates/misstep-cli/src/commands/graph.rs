//! The `misstep graph` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use misstep_core::graph::ConceptFilter;

pub fn execute(
    content: PathBuf,
    subject: Option<String>,
    topic: Option<String>,
    format: String,
) -> Result<()> {
    let pack = misstep_core::parser::load_content(&content)?;
    let graph = pack.concept_graph();

    let filter = ConceptFilter {
        subject,
        topic,
        ..Default::default()
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&graph.dependency_subgraph(&filter))?);
        return Ok(());
    }

    let concepts = graph.filter_concepts(&filter);

    let mut table = Table::new();
    table.set_header(vec!["Concept", "Name", "Subject", "Topic", "Difficulty", "Requires"]);
    for concept in &concepts {
        let requires: Vec<&str> = graph
            .prerequisites_of(&concept.id)
            .map(|e| e.prerequisite_id.as_str())
            .collect();
        table.add_row(vec![
            Cell::new(&concept.id),
            Cell::new(&concept.name),
            Cell::new(&concept.subject),
            Cell::new(&concept.topic),
            Cell::new(concept.difficulty),
            Cell::new(requires.join(", ")),
        ]);
    }

    println!("{table}");
    println!(
        "{} of {} concepts, {} prerequisite edges",
        concepts.len(),
        graph.concepts().len(),
        graph.edges().len()
    );

    Ok(())
}
