//! misstep-store: Mastery persistence for misstep.
//!
//! Implements the `MasteryStore` boundary from `misstep-core` in memory and as
//! a JSON progress file. Concept lookup needs no store of its own: a parsed
//! content pack yields a `ConceptGraph`, which is already a `ConceptSource`.

pub mod error;
pub mod file;
pub mod memory;

pub use error::StoreError;
pub use file::JsonFileMasteryStore;
pub use memory::InMemoryMasteryStore;
