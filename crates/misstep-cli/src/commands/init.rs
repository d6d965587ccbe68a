//! The `misstep init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("misstep.toml").exists() {
        println!("misstep.toml already exists, skipping.");
    } else {
        std::fs::write("misstep.toml", SAMPLE_CONFIG)?;
        println!("Created misstep.toml");
    }

    std::fs::create_dir_all("content")?;
    let example_path = std::path::Path::new("content/example.toml");
    if example_path.exists() {
        println!("content/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_PACK)?;
        println!("Created content/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit content/example.toml with your own concepts and problems");
    println!("  2. Run: misstep validate --content content/example.toml");
    println!(
        "  3. Run: misstep evaluate --content content/example.toml --checkpoint area-value --answer 12"
    );

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# misstep configuration

# Attempt on which a matched error pattern's diagnosis is shown.
specific_feedback_attempt = 2
# Attempt from which the student is routed back to a missing prerequisite.
backtrack_attempt = 3
hint_word_limit = 30

[hints]
# trigonometry_vector_decomposition = "Which side of the triangle touches the angle?"
"#;

const EXAMPLE_PACK: &str = r#"[pack]
id = "example"
name = "Example Pack"
description = "A small pack to get started"
subject = "math"

[[concepts]]
id = "multiplication"
name = "Multiplication"
topic = "Arithmetic"
difficulty = 1

[[concepts]]
id = "area"
name = "Area of a rectangle"
topic = "Geometry"
difficulty = 2

[[edges]]
concept = "area"
requires = "multiplication"
weight = 5

[[problems]]
id = "garden"
concept = "area"
title = "A 3 m by 4 m garden"
difficulty = 2

[[problems.checkpoints]]
id = "area-value"
order = 1
question = "What is the area of the garden?"
answer = "12"
tolerance = 0.01
unit = "m²"
hint = "Area is length times width."
explanation = "3 m × 4 m = 12 m²"

[[problems.checkpoints.error_patterns]]
trigger = "7"
tolerance = 0.01
error_type = "ADDED_SIDES"
diagnosis = "You added the sides. Area multiplies them."
missing_concept = "multiplication"
confidence = 0.9
"#;
