//! Engine configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunable thresholds and feedback sentences for the diagnosis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Attempt from which a matched pattern's diagnosis text is shown.
    #[serde(default = "default_specific_feedback_attempt")]
    pub specific_feedback_attempt: u32,
    /// Attempt from which a matched pattern may route to a prerequisite.
    #[serde(default = "default_backtrack_attempt")]
    pub backtrack_attempt: u32,
    #[serde(default = "default_correct_feedback")]
    pub correct_feedback: String,
    /// Used on an early wrong attempt when the checkpoint has no hint.
    #[serde(default = "default_generic_hint")]
    pub generic_hint: String,
    /// Used when nothing more specific is available.
    #[serde(default = "default_directive_feedback")]
    pub directive_feedback: String,
    /// Used when a diagnosed prerequisite is missing from the concept graph.
    #[serde(default = "default_prerequisite_review")]
    pub prerequisite_review: String,
    /// Word cap for Socratic hints.
    #[serde(default = "default_hint_word_limit")]
    pub hint_word_limit: usize,
    /// Socratic hint overrides keyed by prerequisite tag.
    #[serde(default)]
    pub hints: HashMap<String, String>,
}

fn default_specific_feedback_attempt() -> u32 {
    2
}
fn default_backtrack_attempt() -> u32 {
    3
}
fn default_correct_feedback() -> String {
    "Correct! Great work.".to_string()
}
fn default_generic_hint() -> String {
    "Not quite right. Review the step description and try again.".to_string()
}
fn default_directive_feedback() -> String {
    "Still incorrect. Work through the step one quantity at a time and check each value before combining them.".to_string()
}
fn default_prerequisite_review() -> String {
    "This mistake points to a gap in an earlier concept. Review a prerequisite concept before trying again.".to_string()
}
fn default_hint_word_limit() -> usize {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            specific_feedback_attempt: default_specific_feedback_attempt(),
            backtrack_attempt: default_backtrack_attempt(),
            correct_feedback: default_correct_feedback(),
            generic_hint: default_generic_hint(),
            directive_feedback: default_directive_feedback(),
            prerequisite_review: default_prerequisite_review(),
            hint_word_limit: default_hint_word_limit(),
            hints: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Reject thresholds the state machine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.specific_feedback_attempt == 0 {
            anyhow::bail!("specific_feedback_attempt must be at least 1");
        }
        if self.backtrack_attempt < self.specific_feedback_attempt {
            anyhow::bail!(
                "backtrack_attempt ({}) must not come before specific_feedback_attempt ({})",
                self.backtrack_attempt,
                self.specific_feedback_attempt
            );
        }
        if self.hint_word_limit == 0 {
            anyhow::bail!("hint_word_limit must be at least 1");
        }
        for tag in self.hints.keys() {
            if tag.parse::<crate::model::PrereqTag>().is_err() {
                anyhow::bail!("hint override for unknown tag: {tag}");
            }
        }
        Ok(())
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `misstep.toml` in the current directory
/// 2. `~/.config/misstep/config.toml`
///
/// Environment variable overrides: `MISSTEP_BACKTRACK_ATTEMPT`, `MISSTEP_HINT_WORD_LIMIT`.
pub fn load_config() -> Result<EngineConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<EngineConfig> {
    load_config_with(path, |key| std::env::var(key).ok())
}

fn load_config_with(
    path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<EngineConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("misstep.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<EngineConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    apply_env_overrides(&mut config, lookup)?;
    config.validate()?;
    Ok(config)
}

fn apply_env_overrides(
    config: &mut EngineConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(value) = lookup("MISSTEP_BACKTRACK_ATTEMPT") {
        config.backtrack_attempt = value
            .trim()
            .parse()
            .with_context(|| format!("invalid MISSTEP_BACKTRACK_ATTEMPT: {value}"))?;
    }
    if let Some(value) = lookup("MISSTEP_HINT_WORD_LIMIT") {
        config.hint_word_limit = value
            .trim()
            .parse()
            .with_context(|| format!("invalid MISSTEP_HINT_WORD_LIMIT: {value}"))?;
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("misstep"))
}
