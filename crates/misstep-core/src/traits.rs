//! Boundary traits for the persistence layer.
//!
//! The engine only reads concepts and prerequisite edges, and only ever asks
//! for one mutation: demoting a mastered concept to `needs_review`. The
//! `misstep-store` crate implements both traits.

use crate::model::{Concept, MasteryStatus, PrerequisiteEdge};

// ---------------------------------------------------------------------------
// Concept graph
// ---------------------------------------------------------------------------

/// Read access to concepts and their prerequisite edges.
pub trait ConceptSource: Send + Sync {
    /// Look up a concept by id. `Ok(None)` means it does not exist.
    fn get_concept(&self, id: &str) -> anyhow::Result<Option<Concept>>;

    /// Edges whose `concept_id` is `concept_id`, in authoring order.
    fn list_prerequisite_edges(&self, concept_id: &str) -> anyhow::Result<Vec<PrerequisiteEdge>>;
}

// ---------------------------------------------------------------------------
// Mastery
// ---------------------------------------------------------------------------

/// Access to per (student, concept) mastery records.
pub trait MasteryStore: Send + Sync {
    /// Current status, or `None` if the student has no record for the concept.
    fn get(&self, student_id: &str, concept_id: &str) -> anyhow::Result<Option<MasteryStatus>>;

    /// Demote `mastered` to `needs_review`. Must be idempotent and must leave
    /// records in any other status untouched.
    fn request_downgrade(&self, student_id: &str, concept_id: &str) -> anyhow::Result<()>;
}

/// Status with a missing record treated as `not_started`.
pub fn status_or_default(
    store: &dyn MasteryStore,
    student_id: &str,
    concept_id: &str,
) -> anyhow::Result<MasteryStatus> {
    Ok(store.get(student_id, concept_id)?.unwrap_or_default())
}
