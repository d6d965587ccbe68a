//! Heuristic misconception classifier for open-form templated problems.
//!
//! Used when a step has no authored error-pattern table. The wrong option is
//! run through an ordered cascade of independent rules; the first rule that
//! fires decides the tag. Precise multi-token signatures come first, keyword
//! fallbacks last, and anything left over is `prereq_unknown` at low
//! confidence.

pub mod keywords;
pub mod rules;

use serde::{Deserialize, Serialize};

use crate::model::{ConfidenceLevel, PrereqTag};

/// The parts of a templated step the classifier reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepMetadata {
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub common_misconceptions: Vec<String>,
}

/// Normalized classifier input: lowercased, whitespace collapsed.
#[derive(Debug, Clone)]
pub struct ClassifierInput {
    pub option: String,
    pub correct: String,
    pub explanation: String,
    pub misconceptions: Vec<String>,
}

impl ClassifierInput {
    pub fn new(selected_option: &str, correct_answer: &str, step: &StepMetadata) -> Self {
        Self {
            option: normalize(selected_option),
            correct: normalize(correct_answer),
            explanation: normalize(&step.explanation),
            misconceptions: step
                .common_misconceptions
                .iter()
                .map(|m| normalize(m))
                .collect(),
        }
    }
}

/// Lowercase and collapse runs of whitespace to one space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A single step of the cascade.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub confidence: ConfidenceLevel,
    detect: fn(&ClassifierInput) -> Option<PrereqTag>,
}

impl Rule {
    pub const fn new(
        name: &'static str,
        confidence: ConfidenceLevel,
        detect: fn(&ClassifierInput) -> Option<PrereqTag>,
    ) -> Self {
        Self {
            name,
            confidence,
            detect,
        }
    }

    pub fn apply(&self, input: &ClassifierInput) -> Option<PrereqTag> {
        (self.detect)(input)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("confidence", &self.confidence)
            .finish()
    }
}

/// The standard cascade, most specific first.
pub const DEFAULT_RULES: [Rule; 8] = [
    Rule::new("trig_function_swap", ConfidenceLevel::High, rules::trig_function_swap),
    Rule::new("angle_misinterpretation", ConfidenceLevel::High, rules::angle_misinterpretation),
    Rule::new("axis_decoupling", ConfidenceLevel::High, rules::axis_decoupling),
    Rule::new("force_sign_error", ConfidenceLevel::High, rules::force_sign_error),
    Rule::new("mass_vs_moles", ConfidenceLevel::High, rules::mass_vs_moles),
    Rule::new("calculus_rule_error", ConfidenceLevel::High, rules::calculus_rule_error),
    Rule::new("misconception_keyword", ConfidenceLevel::Medium, keywords::misconception_keyword),
    Rule::new("keyword_overlap", ConfidenceLevel::Medium, keywords::keyword_overlap),
];

/// Name reported when no rule fires.
pub const UNKNOWN_RULE: &str = "unknown";

/// Outcome of classifying one wrong option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub tag: PrereqTag,
    pub confidence: ConfidenceLevel,
    /// Name of the rule that decided the tag.
    pub rule: &'static str,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            tag: PrereqTag::Unknown,
            confidence: ConfidenceLevel::Low,
            rule: UNKNOWN_RULE,
        }
    }
}

/// An ordered rule cascade.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_rules(DEFAULT_RULES.to_vec())
    }
}

impl Classifier {
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify a wrong option. Never fails; unmatched input is `prereq_unknown`.
    pub fn classify(
        &self,
        selected_option: &str,
        correct_answer: &str,
        step: &StepMetadata,
    ) -> Classification {
        let input = ClassifierInput::new(selected_option, correct_answer, step);
        self.classify_input(&input)
    }

    pub fn classify_input(&self, input: &ClassifierInput) -> Classification {
        for rule in &self.rules {
            if let Some(tag) = rule.apply(input) {
                tracing::debug!("rule {} classified option as {tag}", rule.name);
                return Classification {
                    tag,
                    confidence: rule.confidence,
                    rule: rule.name,
                };
            }
        }
        Classification::unknown()
    }

    /// Every rule's verdict in cascade order, without stopping at the first
    /// hit. Useful for checking rules in isolation.
    pub fn trace(&self, input: &ClassifierInput) -> Vec<(&'static str, Option<PrereqTag>)> {
        self.rules
            .iter()
            .map(|rule| (rule.name, rule.apply(input)))
            .collect()
    }
}

/// Classify with the default cascade.
pub fn classify_wrong_option(
    selected_option: &str,
    correct_answer: &str,
    step: &StepMetadata,
) -> Classification {
    Classifier::default().classify(selected_option, correct_answer, step)
}
