//! The `misstep validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(content_path: PathBuf) -> Result<()> {
    let packs = if content_path.is_dir() {
        misstep_core::parser::load_content_directory(&content_path)?
    } else {
        vec![misstep_core::parser::parse_content_pack(&content_path)?]
    };

    if packs.is_empty() {
        anyhow::bail!("no content packs found in {}", content_path.display());
    }

    let mut total_warnings = 0;

    for pack in &packs {
        println!(
            "Content pack: {} ({} concepts, {} problems, {} checkpoints, {} templates)",
            pack.name,
            pack.concepts.len(),
            pack.problems.len(),
            pack.checkpoint_count(),
            pack.templates.len()
        );

        let warnings = misstep_core::parser::validate_content_pack(pack);
        for w in &warnings {
            let prefix = w
                .item_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All content packs valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
