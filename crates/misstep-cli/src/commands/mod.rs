//! Subcommand implementations.

pub mod classify;
pub mod evaluate;
pub mod graph;
pub mod init;
pub mod mission;
pub mod path;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use misstep_core::traits::MasteryStore;
use misstep_store::{InMemoryMasteryStore, JsonFileMasteryStore};

/// The progress file if one was given, otherwise an empty in-memory store.
pub(crate) fn open_mastery(progress: Option<&Path>) -> Result<Box<dyn MasteryStore>> {
    match progress {
        Some(path) => {
            let store = JsonFileMasteryStore::open(path)
                .with_context(|| format!("failed to open progress file: {}", path.display()))?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(InMemoryMasteryStore::new())),
    }
}

/// Inline JSON, or the contents of a file when the argument starts with `@`.
pub(crate) fn read_json_arg<T: serde::de::DeserializeOwned>(arg: &str, what: &str) -> Result<T> {
    let text = match arg.strip_prefix('@') {
        Some(file) => std::fs::read_to_string(PathBuf::from(file))
            .with_context(|| format!("failed to read {what} file: {file}"))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).with_context(|| format!("invalid {what} JSON"))
}
