//! Keyword tables for the medium-confidence fallbacks.

use super::ClassifierInput;
use crate::model::PrereqTag;

/// Phrases from authored misconception descriptions and the gap each implies.
const MISCONCEPTION_PHRASES: &[(&str, PrereqTag)] = &[
    ("confusing sin and cos", PrereqTag::TrigonometryVectorDecomposition),
    ("swapping sin", PrereqTag::TrigonometryVectorDecomposition),
    ("sin and cos when decomposing", PrereqTag::TrigonometryVectorDecomposition),
    (
        "sin and cos incorrectly for angle decomposition",
        PrereqTag::TrigonometryVectorDecomposition,
    ),
    ("complement angle instead", PrereqTag::AngleMisinterpretation),
    ("wrong angle", PrereqTag::AngleMisinterpretation),
    ("using the complement", PrereqTag::AngleMisinterpretation),
    ("vertical velocity affects horizontal", PrereqTag::DecouplingHorizontalVertical),
    (
        "not recognizing that horizontal velocity remains",
        PrereqTag::DecouplingHorizontalVertical,
    ),
    (
        "thinking vertical velocity affects horizontal",
        PrereqTag::DecouplingHorizontalVertical,
    ),
    ("not recognizing both masses have same", PrereqTag::FreeBodyForcesSigns),
    ("confusing direction conventions", PrereqTag::FreeBodyForcesSigns),
    ("assuming motion must occur", PrereqTag::FreeBodyForcesSigns),
    ("comparing masses instead of moles", PrereqTag::StoichiometryMolesVsMass),
    ("using mass instead of moles", PrereqTag::StoichiometryMolesVsMass),
    ("comparing mass", PrereqTag::StoichiometryMolesVsMass),
    ("forgetting the coefficient n in power rule", PrereqTag::AlgebraCalculusConcepts),
    ("not reducing exponent", PrereqTag::AlgebraCalculusConcepts),
    ("failing to recognize 3x = 3x1", PrereqTag::AlgebraCalculusConcepts),
    ("forgetting that constant derivatives to zero", PrereqTag::AlgebraCalculusConcepts),
    ("forgetting to divide by (n+1)", PrereqTag::AlgebraCalculusConcepts),
    ("forgetting the constant c", PrereqTag::AlgebraCalculusConcepts),
    ("confusing integration with differentiation", PrereqTag::AlgebraCalculusConcepts),
];

/// Single domain words; a tag is inferred when the word shows up in both the
/// chosen option and the step explanation.
const DOMAIN_KEYWORDS: &[(&str, PrereqTag)] = &[
    ("sin", PrereqTag::TrigonometryVectorDecomposition),
    ("cos", PrereqTag::TrigonometryVectorDecomposition),
    ("angle", PrereqTag::AngleMisinterpretation),
    ("complement", PrereqTag::AngleMisinterpretation),
    ("horizontal", PrereqTag::DecouplingHorizontalVertical),
    ("vertical", PrereqTag::DecouplingHorizontalVertical),
    ("tension", PrereqTag::FreeBodyForcesSigns),
    ("direction", PrereqTag::FreeBodyForcesSigns),
    ("mass", PrereqTag::StoichiometryMolesVsMass),
    ("mole", PrereqTag::StoichiometryMolesVsMass),
    ("derivative", PrereqTag::AlgebraCalculusConcepts),
    ("integral", PrereqTag::AlgebraCalculusConcepts),
    ("constant c", PrereqTag::AlgebraCalculusConcepts),
];

/// Tag of the first known phrase found in the step's misconception list.
///
/// Corroboration by the option or explanation text is logged but does not
/// change the outcome: a listed misconception is accepted on its own.
pub fn misconception_keyword(input: &ClassifierInput) -> Option<PrereqTag> {
    for misconception in &input.misconceptions {
        for (phrase, tag) in MISCONCEPTION_PHRASES {
            if !misconception.contains(phrase) {
                continue;
            }
            if input.option.contains(phrase) || input.explanation.contains(phrase) {
                tracing::debug!("misconception phrase {phrase:?} corroborated by step text");
            } else {
                tracing::debug!("misconception phrase {phrase:?} accepted from step listing");
            }
            return Some(*tag);
        }
    }
    None
}

/// Tag of the first domain keyword present in both option and explanation.
pub fn keyword_overlap(input: &ClassifierInput) -> Option<PrereqTag> {
    DOMAIN_KEYWORDS
        .iter()
        .find(|(kw, _)| input.option.contains(kw) && input.explanation.contains(kw))
        .map(|(_, tag)| *tag)
}
