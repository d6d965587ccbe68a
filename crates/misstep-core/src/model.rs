//! Core data model types for misstep.
//!
//! Concepts and prerequisite edges form the knowledge graph; problems are made
//! of ordered checkpoints, each carrying its answer key and authored error
//! patterns. `DiagnosisResult` is what the engine hands back per evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An atomic unit of learnable knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Unique identifier (e.g. "vector-decomposition").
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Broad subject area (e.g. "physics").
    #[serde(default)]
    pub subject: String,
    /// Chapter or unit name (e.g. "Mechanics").
    #[serde(default)]
    pub topic: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Difficulty on a 1-5 scale.
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    /// Short explanation shown on concept cards.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_difficulty() -> u8 {
    1
}

/// A directed dependency: `concept_id` requires `prerequisite_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteEdge {
    pub concept_id: String,
    pub prerequisite_id: String,
    /// How hard a blocker the prerequisite is (1 = nice-to-know, 5 = hard blocker).
    #[serde(default = "default_weight")]
    pub weight: u8,
}

fn default_weight() -> u8 {
    3
}

/// A student's recorded proficiency for one concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryStatus {
    #[default]
    NotStarted,
    InProgress,
    Mastered,
    NeedsReview,
}

impl fmt::Display for MasteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasteryStatus::NotStarted => write!(f, "not_started"),
            MasteryStatus::InProgress => write!(f, "in_progress"),
            MasteryStatus::Mastered => write!(f, "mastered"),
            MasteryStatus::NeedsReview => write!(f, "needs_review"),
        }
    }
}

impl FromStr for MasteryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not_started" => Ok(MasteryStatus::NotStarted),
            "in_progress" => Ok(MasteryStatus::InProgress),
            "mastered" => Ok(MasteryStatus::Mastered),
            "needs_review" => Ok(MasteryStatus::NeedsReview),
            other => Err(format!("unknown mastery status: {other}")),
        }
    }
}

/// Per (student, concept) mastery state. Owned by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryRecord {
    pub student_id: String,
    pub concept_id: String,
    #[serde(default)]
    pub status: MasteryStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_score: f64,
}

/// A submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Numeric(f64),
    Text(String),
    OptionId(String),
}

impl Answer {
    /// The answer rendered as text, used for pattern lookup.
    pub fn as_text(&self) -> String {
        match self {
            Answer::Numeric(v) => v.to_string(),
            Answer::Text(s) | Answer::OptionId(s) => s.clone(),
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Answer::Numeric(_) => "numeric",
            Answer::Text(_) => "text",
            Answer::OptionId(_) => "option id",
        }
    }
}

/// How a checkpoint decides correctness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKey {
    /// A numeric or free-text value. Numeric comparison wins when both sides
    /// parse as numbers; otherwise trimmed, case-insensitive equality.
    Value {
        value: String,
        #[serde(default = "default_checkpoint_tolerance")]
        tolerance: f64,
    },
    /// An exact option identifier for multiple-choice checkpoints.
    Option { id: String },
}

fn default_checkpoint_tolerance() -> f64 {
    0.01
}

/// An authored mapping from a wrong-answer signature to a diagnosed gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPattern {
    #[serde(default)]
    pub id: String,
    pub trigger_value: String,
    #[serde(default = "default_trigger_tolerance")]
    pub trigger_tolerance: f64,
    /// e.g. "TRIG_FUNCTION_SWAP".
    pub error_type: String,
    pub diagnosis_text: String,
    #[serde(default)]
    pub missing_concept: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_trigger_tolerance() -> f64 {
    0.5
}

fn default_confidence() -> f64 {
    0.9
}

/// One evaluated step inside a multi-part problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    #[serde(default)]
    pub problem_id: String,
    /// 1-based position within the problem.
    pub order: u32,
    #[serde(default)]
    pub question: String,
    pub answer_key: AnswerKey,
    #[serde(default)]
    pub unit: Option<String>,
    /// Static hint shown after a first wrong attempt.
    #[serde(default)]
    pub hint: Option<String>,
    /// Revealed only on success.
    #[serde(default)]
    pub explanation: Option<String>,
    /// Authored error patterns, in authoring order.
    #[serde(default)]
    pub error_patterns: Vec<ErrorPattern>,
}

/// A structured problem tied to one concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub concept_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
}

impl Problem {
    /// Returns `true` if `checkpoint_id` is the last checkpoint by order.
    pub fn is_final_checkpoint(&self, checkpoint_id: &str) -> bool {
        self.checkpoints
            .iter()
            .max_by_key(|c| c.order)
            .is_some_and(|c| c.id == checkpoint_id)
    }
}

/// Caller-supplied attempt bookkeeping for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptContext {
    pub student_id: String,
    /// Running attempt count for this checkpoint in this session, starting at 1.
    pub attempt_number: u32,
    /// Set by the caller when this is the problem's last checkpoint.
    #[serde(default)]
    pub final_checkpoint: bool,
}

/// What the student should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Continue,
    Retry,
    Backtrack,
    Complete,
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextAction::Continue => write!(f, "continue"),
            NextAction::Retry => write!(f, "retry"),
            NextAction::Backtrack => write!(f, "backtrack"),
            NextAction::Complete => write!(f, "complete"),
        }
    }
}

/// One entry of a backtrack path, annotated for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktrackStep {
    pub concept: Concept,
    pub status: MasteryStatus,
    /// Marks the originally diagnosed concept.
    pub is_target: bool,
}

/// The engine's verdict for a single submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub checkpoint_id: String,
    pub correct: bool,
    pub error_type: Option<String>,
    pub missing_concept: Option<String>,
    pub confidence: Option<f64>,
    pub feedback: String,
    pub hint: Option<String>,
    pub explanation: Option<String>,
    pub next_action: NextAction,
    #[serde(default)]
    pub backtrack_path: Vec<BacktrackStep>,
    /// Set when the engine asked the mastery store to demote the missing concept.
    #[serde(default)]
    pub downgrade_requested: bool,
}

impl DiagnosisResult {
    /// Returns `true` if the student is being routed to a prerequisite.
    pub fn is_backtrack(&self) -> bool {
        self.next_action == NextAction::Backtrack
    }
}

/// A diagnosed prerequisite gap, as produced by the heuristic classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrereqTag {
    #[serde(rename = "trigonometry_vector_decomposition")]
    TrigonometryVectorDecomposition,
    #[serde(rename = "angle_misinterpretation")]
    AngleMisinterpretation,
    #[serde(rename = "decoupling_horizontal_vertical")]
    DecouplingHorizontalVertical,
    #[serde(rename = "free_body_forces_signs")]
    FreeBodyForcesSigns,
    #[serde(rename = "stoichiometry_moles_vs_mass")]
    StoichiometryMolesVsMass,
    #[serde(rename = "algebra_calculus_concepts")]
    AlgebraCalculusConcepts,
    #[serde(rename = "prereq_unknown")]
    Unknown,
}

impl PrereqTag {
    /// Every tag the classifier can produce, unknown last.
    pub const ALL: [PrereqTag; 7] = [
        PrereqTag::TrigonometryVectorDecomposition,
        PrereqTag::AngleMisinterpretation,
        PrereqTag::DecouplingHorizontalVertical,
        PrereqTag::FreeBodyForcesSigns,
        PrereqTag::StoichiometryMolesVsMass,
        PrereqTag::AlgebraCalculusConcepts,
        PrereqTag::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrereqTag::TrigonometryVectorDecomposition => "trigonometry_vector_decomposition",
            PrereqTag::AngleMisinterpretation => "angle_misinterpretation",
            PrereqTag::DecouplingHorizontalVertical => "decoupling_horizontal_vertical",
            PrereqTag::FreeBodyForcesSigns => "free_body_forces_signs",
            PrereqTag::StoichiometryMolesVsMass => "stoichiometry_moles_vs_mass",
            PrereqTag::AlgebraCalculusConcepts => "algebra_calculus_concepts",
            PrereqTag::Unknown => "prereq_unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, PrereqTag::Unknown)
    }
}

impl fmt::Display for PrereqTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrereqTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PrereqTag::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown prerequisite tag: {s}"))
    }
}

/// Coarse confidence attached to a heuristic classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::Low => write!(f, "low"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::High => write!(f, "high"),
        }
    }
}
