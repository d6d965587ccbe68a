//! misstep CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::evaluate::AnswerKind;

#[derive(Parser)]
#[command(
    name = "misstep",
    version,
    about = "Misconception diagnosis and prerequisite backtracking for guided problems"
)]
struct Cli {
    /// Engine config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate content pack TOML files
    Validate {
        /// Path to content pack file or directory
        #[arg(long)]
        content: PathBuf,
    },

    /// Evaluate an answer to a checkpoint
    Evaluate {
        /// Path to content pack file or directory
        #[arg(long)]
        content: PathBuf,

        /// Checkpoint ID
        #[arg(long)]
        checkpoint: String,

        /// Submitted answer
        #[arg(long, allow_hyphen_values = true)]
        answer: String,

        /// How to read the answer (auto follows the checkpoint's answer key)
        #[arg(long, value_enum, default_value = "auto")]
        kind: AnswerKind,

        /// Attempt number on this checkpoint, starting at 1
        #[arg(long, default_value = "1")]
        attempt: u32,

        /// Student ID
        #[arg(long, default_value = "student")]
        student: String,

        /// JSON progress file holding mastery records
        #[arg(long)]
        progress: Option<PathBuf>,

        /// Treat the checkpoint as the problem's last one
        #[arg(long = "final")]
        final_checkpoint: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Classify a wrong multiple-choice option
    Classify {
        /// Text of the selected option
        #[arg(long)]
        option: String,

        /// Text of the correct answer
        #[arg(long)]
        correct: String,

        /// Step explanation
        #[arg(long, default_value = "")]
        explanation: String,

        /// Common misconception listed for the step (repeatable)
        #[arg(long)]
        misconception: Vec<String>,

        /// Print every rule's verdict
        #[arg(long)]
        trace: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show the learning path to a concept
    Path {
        /// Path to content pack file or directory
        #[arg(long)]
        content: PathBuf,

        /// Concept ID
        #[arg(long)]
        concept: String,

        /// Student ID
        #[arg(long, default_value = "student")]
        student: String,

        /// JSON progress file holding mastery records
        #[arg(long)]
        progress: Option<PathBuf>,
    },

    /// Show concepts and prerequisite edges
    Graph {
        /// Path to content pack file or directory
        #[arg(long)]
        content: PathBuf,

        /// Only concepts in this subject
        #[arg(long)]
        subject: Option<String>,

        /// Only concepts in this topic
        #[arg(long)]
        topic: Option<String>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Diagnose all answers to a multiple-choice template
    Mission {
        /// Path to content pack file or directory
        #[arg(long)]
        content: PathBuf,

        /// Template ID
        #[arg(long)]
        template: String,

        /// Answers as JSON, or @file
        #[arg(long)]
        answers: String,

        /// Prerequisite quiz results as JSON, or @file
        #[arg(long)]
        quiz: Option<String>,

        /// Session ID
        #[arg(long, default_value = "cli")]
        session: String,

        /// Student ID
        #[arg(long)]
        student: Option<String>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create a starter config and example content pack
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("misstep=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Validate { content } => commands::validate::execute(content),
        Commands::Evaluate {
            content,
            checkpoint,
            answer,
            kind,
            attempt,
            student,
            progress,
            final_checkpoint,
            format,
        } => commands::evaluate::execute(commands::evaluate::EvaluateArgs {
            content,
            checkpoint,
            answer,
            kind,
            attempt,
            student,
            progress,
            final_checkpoint,
            format,
            config,
        }),
        Commands::Classify {
            option,
            correct,
            explanation,
            misconception,
            trace,
            format,
        } => commands::classify::execute(
            option,
            correct,
            explanation,
            misconception,
            trace,
            format,
            config,
        ),
        Commands::Path {
            content,
            concept,
            student,
            progress,
        } => commands::path::execute(content, concept, student, progress),
        Commands::Graph {
            content,
            subject,
            topic,
            format,
        } => commands::graph::execute(content, subject, topic, format),
        Commands::Mission {
            content,
            template,
            answers,
            quiz,
            session,
            student,
            format,
        } => commands::mission::execute(commands::mission::MissionArgs {
            content,
            template,
            answers,
            quiz,
            session,
            student,
            format,
            config,
        }),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
