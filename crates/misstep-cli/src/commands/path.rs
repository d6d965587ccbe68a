//! The `misstep path` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use misstep_core::graph::learning_path;
use misstep_core::traits::status_or_default;

pub fn execute(
    content: PathBuf,
    concept: String,
    student: String,
    progress: Option<PathBuf>,
) -> Result<()> {
    let pack = misstep_core::parser::load_content(&content)?;
    let graph = pack.concept_graph();
    let mastery = super::open_mastery(progress.as_deref())?;

    let path = learning_path(&graph, &concept)?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Concept", "Name", "Subject", "Status"]);
    for entry in &path {
        let status = status_or_default(mastery.as_ref(), &student, &entry.concept.id)?;
        table.add_row(vec![
            Cell::new(entry.order + 1),
            Cell::new(&entry.concept.id),
            Cell::new(&entry.concept.name),
            Cell::new(&entry.concept.subject),
            Cell::new(status),
        ]);
    }

    println!("Learning path to {concept} for {student}:");
    println!("{table}");

    Ok(())
}
