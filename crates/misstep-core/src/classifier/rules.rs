//! Signature detectors for the high-confidence end of the cascade.
//!
//! Every detector receives text that is already lowercased with whitespace
//! collapsed. Patterns are compiled once and shared.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use super::ClassifierInput;
use crate::model::PrereqTag;

fn compile_one(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("Invalid regex")
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Vec<Regex> {
    patterns.iter().map(|p| compile_one(p.as_ref())).collect()
}

fn any_match(bank: &[Regex], text: &str) -> bool {
    bank.iter().any(|re| re.is_match(text))
}

// ---------------------------------------------------------------------------
// Trigonometric function swap
// ---------------------------------------------------------------------------

/// First-named component uses sin, second uses cos: "ax = a sin θ, ay = a cos θ".
static TRIG_SWAP_SIGNATURE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"ax\s*=\s*[^,\n]*\bsin\b[^,\n]*,[^,\n]*ay\s*=\s*[^,\n]*\bcos\b",
        r"v[₀0]?[ₓx]\s*=\s*[^,\n]*\bsin\b[^,\n]*,[^,\n]*v[₀0]?[ᵧy]\s*=\s*[^,\n]*\bcos\b",
    ])
});

static TRIG_SWAP_CUES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // horizontal component with sin
        r"\bv[₀0]?[ₓx]\b[^;,\n]*\bsin\b",
        r"\ba[ₓx]\b[^;,\n]*\bsin\b",
        r"\bax\s*=\s*[^,\n]*\bsin\b",
        // vertical component with cos
        r"\bv[₀0]?[ᵧy]\b[^;,\n]*\bcos\b",
        r"\ba[ᵧy]\b[^;,\n]*\bcos\b",
        r"\bay\s*=\s*[^,\n]*\bcos\b",
        // unit circle read backwards
        r"\bx\s*=\s*sin\s*\(",
        r"\by\s*=\s*cos\s*\(",
        // tan used to take a component
        r"\b(?:ax|vx|ay|vy|v0x|v0y)\s*=\s*[^,\n]*\btan\s*\(",
        r"sin.*cos.*swapped|swapped.*sin.*cos",
        r"horizontal\s+component\s*=\s*[^,\n]*\bsin\b",
        r"sin\s+for\s+(?:the\s+)?horizontal",
    ])
});

/// Sine/cosine swapped when decomposing a vector.
pub fn trig_function_swap(input: &ClassifierInput) -> Option<PrereqTag> {
    let hit = any_match(&TRIG_SWAP_SIGNATURE, &input.option)
        || any_match(&TRIG_SWAP_CUES, &input.option);
    hit.then_some(PrereqTag::TrigonometryVectorDecomposition)
}

// ---------------------------------------------------------------------------
// Angle misinterpretation
// ---------------------------------------------------------------------------

/// (angle in the correct answer, complement used by mistake)
const COMPLEMENT_PAIRS: [(&str, &str); 5] = [
    ("30", "60"),
    ("60", "30"),
    ("37", "53"),
    ("53", "37"),
    ("45", "45"),
];

static COMPLEMENT_ANGLES: LazyLock<Vec<(Regex, Regex)>> = LazyLock::new(|| {
    COMPLEMENT_PAIRS
        .iter()
        .map(|(correct, used)| {
            (
                compile_one(&format!(r"\b{correct}°")),
                compile_one(&format!(r"\b{used}°")),
            )
        })
        .collect()
});

static COMPLEMENT_CUES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"cos\s*\(\s*60\s*°?\s*\)",
        r"sin\s*\(\s*60\s*°?\s*\)",
        r"cos\s*\(\s*53\s*°?\s*\)",
        r"sin\s*\(\s*53\s*°?\s*\)",
        // 45° values where the angle is something else
        r"0\.707.*0\.707",
        r"below\s+horizontal",
        r"complement\s+angle",
    ])
});

/// The complement of the given angle was used, or the text says so.
pub fn angle_misinterpretation(input: &ClassifierInput) -> Option<PrereqTag> {
    let complement_used = COMPLEMENT_ANGLES
        .iter()
        .any(|(correct, used)| used.is_match(&input.option) && correct.is_match(&input.correct));
    let hit = complement_used || any_match(&COMPLEMENT_CUES, &input.option);
    hit.then_some(PrereqTag::AngleMisinterpretation)
}

// ---------------------------------------------------------------------------
// Axis decoupling
// ---------------------------------------------------------------------------

static AXIS_COUPLING: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // horizontal velocity used for time of flight
        r"t\s*=\s*2\s*v[₀0]?[ₓx]",
        r"v[₀0]?[ₓx]\s*/\s*g",
        // vertical velocity used for range
        r"r\s*=\s*v[₀0]?[ᵧy]\s*[×x*]?\s*t",
        r"range\s*=\s*v[₀0]?[ᵧy]",
        r"(?:vy|v0y|v₀ᵧ)\s*[×x*]\s*t",
        // both components summed into the range
        r"\(v[₀0]?[ₓx]\s*\+\s*v[₀0]?[ᵧy]\)\s*[×x*]\s*t",
        r"both\s+(?:horizontal|vertical)\s+velocit",
        r"vertical\s+velocity\s+(?:contributes|determines)\s+(?:horizontal|range)",
        r"(?:axes|motions|components)\s+are\s+not\s+independent",
    ])
});

/// Horizontal and vertical motion treated as coupled.
pub fn axis_decoupling(input: &ClassifierInput) -> Option<PrereqTag> {
    any_match(&AXIS_COUPLING, &input.option).then_some(PrereqTag::DecouplingHorizontalVertical)
}

// ---------------------------------------------------------------------------
// Force signs
// ---------------------------------------------------------------------------

static FORCE_SIGN_SLIPS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // gravity component subtracted from tension on a connected body
        r"\bt\s*-\s*m[₁1]?g\s*sin",
        r"\bt\s*-\s*m[₂2]?g\b",
        // both bodies written with the same sign pattern
        r"\bt\s*-\s*m.*=\s*m.*a.*\bt\s*-\s*m",
        r"opposite\s+direction",
        r"m1g\s*sin.*\+\s*m2g",
        r"gravity.*component.*adds\s+tension",
        // tension dropped
        r"(?:tension|\bt)\s+is\s+ignored|without\s+tension",
        r"arbitrary|randomly|a\s*=\s*3\s+m/s",
    ])
});

/// Sign or direction mistakes in multi-body force equations.
pub fn force_sign_error(input: &ClassifierInput) -> Option<PrereqTag> {
    any_match(&FORCE_SIGN_SLIPS, &input.option).then_some(PrereqTag::FreeBodyForcesSigns)
}

// ---------------------------------------------------------------------------
// Mass vs moles
// ---------------------------------------------------------------------------

static MASS_FOR_MOLES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // grams written as moles
        r"n\s*\(\s*h[₂2]?\s*\)\s*=\s*10\s*mol",
        r"n\s*\(\s*o[₂2]?\s*\)\s*=\s*50\s*mol",
        // masses compared to pick the limiting reagent
        r"\d+\s*g\s+of\s+o[₂2]?\s*[><!]|g\s+of\s+o[₂2]?\s*>\s*\d+\s*g\s+of",
        // molar mass read as a mole count
        r"n\s*=\s*32|n\s*=\s*2\s+mol,\s*n.*=\s*32\s+mol",
        r"comparing\s+mass",
        r"mass\s+is\s+(?:more|less|larger|smaller)\s+than",
        r"stoichiometr.*mass\s+instead|mass\s+instead.*mole",
    ])
});

/// Raw masses used where moles are required.
pub fn mass_vs_moles(input: &ClassifierInput) -> Option<PrereqTag> {
    any_match(&MASS_FOR_MOLES, &input.option).then_some(PrereqTag::StoichiometryMolesVsMass)
}

// ---------------------------------------------------------------------------
// Power rule
// ---------------------------------------------------------------------------

static POWER_RULE_SLIPS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // integral without raising the exponent
        r"∫\s*xⁿ\s*dx\s*=\s*xⁿ\s*[+c]",
        // integral written like a derivative
        r"xⁿ⁻¹\s*/\s*n",
        // derivative missing the n coefficient
        r"d/dx\s*\(xⁿ\)\s*=\s*xⁿ⁻¹(?:\s*$|\s*[^/\s])",
        // derivative keeping the exponent
        r"d/dx.*=\s*n\s*[·.]?\s*xⁿ(?:$|[^⁻\w])",
        r"power\s+stays\s+the\s+same",
        // integration constant dropped
        r"no\s+constant\s+of\s+integration",
        r"\bc\s+(?:is\s+not|not)\s+(?:needed|required)",
        r"without\s+(?:the\s+)?constant\s+c",
        r"not\s+reducing\s+exponent",
        r"(?:integration|integral).*power\s+rule.*differentiat",
        r"d/dx\(5x³\)\s*=\s*15x³",
        r"d/dx\(5x3\)\s*=\s*5x2\b",
        // derivative of a constant kept
        r"d/dx\s*\(-7\)\s*=\s*-7",
        r"∫1\s*dx\s*=\s*1\b",
    ])
});

/// Power-rule mistakes in differentiation or integration.
pub fn calculus_rule_error(input: &ClassifierInput) -> Option<PrereqTag> {
    any_match(&POWER_RULE_SLIPS, &input.option).then_some(PrereqTag::AlgebraCalculusConcepts)
}
