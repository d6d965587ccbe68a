//! misstep-core: Misconception diagnosis and prerequisite backtracking.
//!
//! This crate defines the data model, the persistence boundary traits, and the
//! deterministic engine that turns a wrong answer into a diagnosis: pattern
//! matching, heuristic classification, escalating feedback, and routing back
//! through the prerequisite graph.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod hints;
pub mod matcher;
pub mod mission;
pub mod model;
pub mod parser;
pub mod traits;

pub use config::{load_config, load_config_from, EngineConfig};
pub use engine::DiagnosisEngine;
pub use error::EngineError;
