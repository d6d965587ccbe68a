//! TOML content pack parser.
//!
//! Loads concepts, prerequisite edges, problems with their checkpoints and
//! error patterns, learning resources, and multiple-choice templates from
//! TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::graph::ConceptGraph;
use crate::hints::Resource;
use crate::mission::ProblemTemplate;
use crate::model::{AnswerKey, Checkpoint, Concept, ErrorPattern, PrerequisiteEdge, Problem};

/// Intermediate TOML structure for parsing content pack files.
#[derive(Debug, Deserialize)]
struct TomlContentFile {
    pack: TomlPackHeader,
    #[serde(default)]
    concepts: Vec<TomlConcept>,
    #[serde(default)]
    edges: Vec<TomlEdge>,
    #[serde(default)]
    problems: Vec<TomlProblem>,
    #[serde(default)]
    resources: Vec<Resource>,
    #[serde(default)]
    templates: Vec<ProblemTemplate>,
}

#[derive(Debug, Deserialize)]
struct TomlPackHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    /// Subject applied to concepts that do not name their own.
    #[serde(default)]
    subject: String,
}

#[derive(Debug, Deserialize)]
struct TomlConcept {
    id: String,
    name: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_difficulty")]
    difficulty: u8,
    #[serde(default)]
    description: Option<String>,
}

fn default_difficulty() -> u8 {
    1
}

#[derive(Debug, Deserialize)]
struct TomlEdge {
    concept: String,
    requires: String,
    #[serde(default = "default_weight")]
    weight: u8,
}

fn default_weight() -> u8 {
    3
}

#[derive(Debug, Deserialize)]
struct TomlProblem {
    id: String,
    concept: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_difficulty")]
    difficulty: u8,
    #[serde(default)]
    checkpoints: Vec<TomlCheckpoint>,
}

#[derive(Debug, Deserialize)]
struct TomlCheckpoint {
    id: String,
    order: u32,
    #[serde(default)]
    question: String,
    /// Expected value for numeric or free-text checkpoints.
    #[serde(default)]
    answer: Option<String>,
    #[serde(default = "default_answer_tolerance")]
    tolerance: f64,
    /// Expected option id for multiple-choice checkpoints.
    #[serde(default)]
    option: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    error_patterns: Vec<TomlErrorPattern>,
}

fn default_answer_tolerance() -> f64 {
    0.01
}

#[derive(Debug, Deserialize)]
struct TomlErrorPattern {
    #[serde(default)]
    id: String,
    trigger: String,
    #[serde(default = "default_trigger_tolerance")]
    tolerance: f64,
    error_type: String,
    diagnosis: String,
    #[serde(default)]
    missing_concept: Option<String>,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_trigger_tolerance() -> f64 {
    0.5
}

fn default_confidence() -> f64 {
    0.9
}

/// A parsed content pack.
#[derive(Debug, Clone, Default)]
pub struct ContentPack {
    pub id: String,
    pub name: String,
    pub description: String,
    pub concepts: Vec<Concept>,
    pub edges: Vec<PrerequisiteEdge>,
    pub problems: Vec<Problem>,
    pub resources: Vec<Resource>,
    pub templates: Vec<ProblemTemplate>,
}

impl ContentPack {
    /// Merge several packs into one, keeping file order.
    pub fn combine(packs: Vec<ContentPack>) -> ContentPack {
        let mut iter = packs.into_iter();
        let Some(mut combined) = iter.next() else {
            return ContentPack::default();
        };
        for pack in iter {
            combined.id = format!("{}+{}", combined.id, pack.id);
            combined.concepts.extend(pack.concepts);
            combined.edges.extend(pack.edges);
            combined.problems.extend(pack.problems);
            combined.resources.extend(pack.resources);
            combined.templates.extend(pack.templates);
        }
        combined
    }

    /// The pack's concepts and edges as a queryable graph.
    pub fn concept_graph(&self) -> ConceptGraph {
        ConceptGraph::new(self.concepts.clone(), self.edges.clone())
    }

    pub fn problem(&self, id: &str) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == id)
    }

    /// The problem owning `checkpoint_id` together with the checkpoint.
    pub fn find_checkpoint(&self, checkpoint_id: &str) -> Option<(&Problem, &Checkpoint)> {
        self.problems.iter().find_map(|p| {
            p.checkpoints
                .iter()
                .find(|c| c.id == checkpoint_id)
                .map(|c| (p, c))
        })
    }

    pub fn template(&self, id: &str) -> Option<&ProblemTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn checkpoint_count(&self) -> usize {
        self.problems.iter().map(|p| p.checkpoints.len()).sum()
    }
}

/// Parse a single TOML file into a `ContentPack`.
pub fn parse_content_pack(path: &Path) -> Result<ContentPack> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read content file: {}", path.display()))?;

    parse_content_pack_str(&content, path)
}

/// Parse a TOML string into a `ContentPack` (useful for testing).
pub fn parse_content_pack_str(content: &str, source_path: &Path) -> Result<ContentPack> {
    let parsed: TomlContentFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let pack_subject = parsed.pack.subject;
    let concepts = parsed
        .concepts
        .into_iter()
        .map(|c| Concept {
            id: c.id,
            name: c.name,
            subject: c.subject.unwrap_or_else(|| pack_subject.clone()),
            topic: c.topic,
            tags: c.tags,
            difficulty: c.difficulty,
            description: c.description,
        })
        .collect();

    let edges = parsed
        .edges
        .into_iter()
        .map(|e| PrerequisiteEdge {
            concept_id: e.concept,
            prerequisite_id: e.requires,
            weight: e.weight,
        })
        .collect();

    let problems = parsed
        .problems
        .into_iter()
        .map(|p| {
            let checkpoints = p
                .checkpoints
                .into_iter()
                .map(|c| convert_checkpoint(c, &p.id))
                .collect::<Result<Vec<_>>>()?;
            Ok(Problem {
                id: p.id,
                concept_id: p.concept,
                title: p.title,
                description: p.description,
                difficulty: p.difficulty,
                checkpoints,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ContentPack {
        id: parsed.pack.id,
        name: parsed.pack.name,
        description: parsed.pack.description,
        concepts,
        edges,
        problems,
        resources: parsed.resources,
        templates: parsed.templates,
    })
}

fn convert_checkpoint(c: TomlCheckpoint, problem_id: &str) -> Result<Checkpoint> {
    let answer_key = match (c.answer, c.option) {
        (Some(value), None) => AnswerKey::Value {
            value,
            tolerance: c.tolerance,
        },
        (None, Some(id)) => AnswerKey::Option { id },
        (Some(_), Some(_)) => {
            anyhow::bail!("checkpoint {} sets both answer and option", c.id)
        }
        (None, None) => anyhow::bail!("checkpoint {} needs an answer or an option", c.id),
    };

    let error_patterns = c
        .error_patterns
        .into_iter()
        .enumerate()
        .map(|(i, p)| ErrorPattern {
            id: if p.id.is_empty() {
                format!("{}#{}", c.id, i + 1)
            } else {
                p.id
            },
            trigger_value: p.trigger,
            trigger_tolerance: p.tolerance,
            error_type: p.error_type,
            diagnosis_text: p.diagnosis,
            missing_concept: p.missing_concept,
            confidence: p.confidence,
        })
        .collect();

    Ok(Checkpoint {
        id: c.id,
        problem_id: problem_id.to_string(),
        order: c.order,
        question: c.question,
        answer_key,
        unit: c.unit,
        hint: c.hint,
        explanation: c.explanation,
        error_patterns,
    })
}

/// Recursively load all `.toml` content pack files from a directory.
pub fn load_content_directory(dir: &Path) -> Result<Vec<ContentPack>> {
    let mut packs = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            packs.extend(load_content_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_content_pack(&path) {
                Ok(pack) => packs.push(pack),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(packs)
}

/// Load a single file or every pack under a directory, merged into one.
pub fn load_content(path: &Path) -> Result<ContentPack> {
    if path.is_dir() {
        let packs = load_content_directory(path)?;
        if packs.is_empty() {
            anyhow::bail!("no content packs found in {}", path.display());
        }
        Ok(ContentPack::combine(packs))
    } else {
        parse_content_pack(path)
    }
}

/// A warning from content pack validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The offending item's ID (if applicable).
    pub item_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn new(item_id: &str, message: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.to_string()),
            message: message.into(),
        }
    }
}

fn check_duplicates<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
    warnings: &mut Vec<ValidationWarning>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            warnings.push(ValidationWarning::new(id, format!("duplicate {kind} ID: {id}")));
        }
    }
}

/// Validate a content pack for common authoring issues.
///
/// Nothing here is fatal: cycles and dangling references are tolerated by the
/// engine, but they usually mean a typo in the pack.
pub fn validate_content_pack(pack: &ContentPack) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let concept_ids: HashSet<&str> = pack.concepts.iter().map(|c| c.id.as_str()).collect();

    check_duplicates("concept", pack.concepts.iter().map(|c| c.id.as_str()), &mut warnings);
    check_duplicates("problem", pack.problems.iter().map(|p| p.id.as_str()), &mut warnings);
    check_duplicates(
        "checkpoint",
        pack.problems
            .iter()
            .flat_map(|p| p.checkpoints.iter().map(|c| c.id.as_str())),
        &mut warnings,
    );
    check_duplicates(
        "resource",
        pack.resources.iter().map(|r| r.resource_id.as_str()),
        &mut warnings,
    );
    check_duplicates("template", pack.templates.iter().map(|t| t.id.as_str()), &mut warnings);

    for concept in &pack.concepts {
        if !(1..=5).contains(&concept.difficulty) {
            warnings.push(ValidationWarning::new(
                &concept.id,
                format!("difficulty {} is outside 1-5", concept.difficulty),
            ));
        }
    }

    // Edges
    for edge in &pack.edges {
        let label = format!("{} -> {}", edge.concept_id, edge.prerequisite_id);
        if edge.concept_id == edge.prerequisite_id {
            warnings.push(ValidationWarning::new(&label, "concept requires itself"));
        }
        for end in [&edge.concept_id, &edge.prerequisite_id] {
            if !concept_ids.contains(end.as_str()) {
                warnings.push(ValidationWarning::new(
                    &label,
                    format!("edge references unknown concept: {end}"),
                ));
            }
        }
        if !(1..=5).contains(&edge.weight) {
            warnings.push(ValidationWarning::new(
                &label,
                format!("weight {} is outside 1-5", edge.weight),
            ));
        }
    }

    if let Some(cycle) = pack.concept_graph().find_cycle() {
        warnings.push(ValidationWarning {
            item_id: cycle.first().cloned(),
            message: format!("prerequisite cycle: {}", cycle.join(" -> ")),
        });
    }

    // Problems and checkpoints
    for problem in &pack.problems {
        if !concept_ids.contains(problem.concept_id.as_str()) {
            warnings.push(ValidationWarning::new(
                &problem.id,
                format!("problem references unknown concept: {}", problem.concept_id),
            ));
        }
        if !(1..=5).contains(&problem.difficulty) {
            warnings.push(ValidationWarning::new(
                &problem.id,
                format!("difficulty {} is outside 1-5", problem.difficulty),
            ));
        }
        if problem.checkpoints.is_empty() {
            warnings.push(ValidationWarning::new(&problem.id, "problem has no checkpoints"));
        }

        let mut orders: Vec<u32> = problem.checkpoints.iter().map(|c| c.order).collect();
        orders.sort_unstable();
        let expected: Vec<u32> = (1..=orders.len() as u32).collect();
        if orders != expected {
            warnings.push(ValidationWarning::new(
                &problem.id,
                format!("checkpoint orders {orders:?} are not 1..{}", orders.len()),
            ));
        }

        for checkpoint in &problem.checkpoints {
            if let AnswerKey::Value { tolerance, .. } = &checkpoint.answer_key {
                if *tolerance < 0.0 {
                    warnings.push(ValidationWarning::new(
                        &checkpoint.id,
                        format!("negative answer tolerance: {tolerance}"),
                    ));
                }
            }
            for pattern in &checkpoint.error_patterns {
                validate_pattern(pattern, &concept_ids, &mut warnings);
            }
        }
    }

    // Templates
    for template in &pack.templates {
        for step in &template.steps {
            let label = format!("{}/step-{}", template.id, step.step_number);
            if step.options.len() < 2 {
                warnings.push(ValidationWarning::new(&label, "step needs at least two options"));
            }
            if step.matching_option().is_none() {
                warnings.push(ValidationWarning::new(
                    &label,
                    "correct answer does not match any option",
                ));
            }
        }
    }

    warnings
}

fn validate_pattern(
    pattern: &ErrorPattern,
    concept_ids: &HashSet<&str>,
    warnings: &mut Vec<ValidationWarning>,
) {
    if !(0.0..=1.0).contains(&pattern.confidence) {
        warnings.push(ValidationWarning::new(
            &pattern.id,
            format!("confidence {} is outside 0-1", pattern.confidence),
        ));
    }
    if pattern.trigger_tolerance < 0.0 {
        warnings.push(ValidationWarning::new(
            &pattern.id,
            format!("negative trigger tolerance: {}", pattern.trigger_tolerance),
        ));
    }
    if let Some(missing) = &pattern.missing_concept {
        if !concept_ids.contains(missing.as_str()) {
            warnings.push(ValidationWarning::new(
                &pattern.id,
                format!("missing_concept references unknown concept: {missing}"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[pack]
id = "mechanics"
name = "Mechanics"
subject = "physics"

[[concepts]]
id = "trigonometry"
name = "Trigonometry"
topic = "Math foundations"
difficulty = 2

[[concepts]]
id = "vector-decomposition"
name = "Vector decomposition"
topic = "Vectors"
difficulty = 3

[[concepts]]
id = "projectile-motion"
name = "Projectile motion"
subject = "physics-advanced"
difficulty = 4

[[edges]]
concept = "vector-decomposition"
requires = "trigonometry"
weight = 5

[[edges]]
concept = "projectile-motion"
requires = "vector-decomposition"

[[problems]]
id = "launch"
concept = "projectile-motion"
title = "Ball launched at 30°"

[[problems.checkpoints]]
id = "launch-vx"
order = 1
question = "Horizontal velocity?"
answer = "9.8"
unit = "m/s"
hint = "Which side is adjacent?"

[[problems.checkpoints.error_patterns]]
trigger = "15.6"
error_type = "TRIG_FUNCTION_SWAP"
diagnosis = "You used sine for the horizontal component."
missing_concept = "trigonometry"

[[problems.checkpoints]]
id = "launch-pick"
order = 2
question = "Which formula gives the range?"
option = "b"

[[resources]]
resource_id = "trig-video"
title = "Sine and cosine"
url = "https://www.youtube.com/watch?v=abc"
tags = ["trigonometry_vector_decomposition"]
start_seconds = 30

[[templates]]
id = "vectors-1"

[[templates.steps]]
step_number = 1
options = ["Ax = 10 cos(30°)", "Ax = 10 sin(30°)"]
correct_answer = "Ax = 10 cos(30°)"
"#;

    fn parse(toml: &str) -> ContentPack {
        parse_content_pack_str(toml, &PathBuf::from("test.toml")).unwrap()
    }

    #[test]
    fn parse_valid_toml() {
        let pack = parse(VALID_TOML);
        assert_eq!(pack.id, "mechanics");
        assert_eq!(pack.concepts.len(), 3);
        assert_eq!(pack.concepts[0].subject, "physics");
        assert_eq!(pack.concepts[2].subject, "physics-advanced");
        assert_eq!(pack.edges[1].weight, 3);
        assert_eq!(pack.checkpoint_count(), 2);
        assert_eq!(pack.resources[0].start_seconds, Some(30));
        assert_eq!(pack.templates[0].steps.len(), 1);

        let (problem, cp) = pack.find_checkpoint("launch-vx").unwrap();
        assert_eq!(problem.id, "launch");
        assert_eq!(cp.problem_id, "launch");
        assert_eq!(
            cp.answer_key,
            AnswerKey::Value {
                value: "9.8".into(),
                tolerance: 0.01
            }
        );
        let pattern = &cp.error_patterns[0];
        assert_eq!(pattern.id, "launch-vx#1");
        assert_eq!(pattern.trigger_tolerance, 0.5);
        assert_eq!(pattern.confidence, 0.9);

        let (_, pick) = pack.find_checkpoint("launch-pick").unwrap();
        assert_eq!(pick.answer_key, AnswerKey::Option { id: "b".into() });
        assert!(validate_content_pack(&pack).is_empty());
    }

    #[test]
    fn checkpoint_needs_exactly_one_key() {
        let both = r#"
[pack]
id = "p"
name = "P"

[[problems]]
id = "x"
concept = "c"
title = "X"

[[problems.checkpoints]]
id = "x1"
order = 1
answer = "1"
option = "a"
"#;
        let err = parse_content_pack_str(both, &PathBuf::from("both.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("both answer and option"));

        let neither = both.replace("answer = \"1\"\noption = \"a\"\n", "");
        assert!(parse_content_pack_str(&neither, &PathBuf::from("neither.toml")).is_err());
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_content_pack_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn validate_reports_authoring_problems() {
        let toml = r#"
[pack]
id = "broken"
name = "Broken"

[[concepts]]
id = "a"
name = "A"
difficulty = 9

[[concepts]]
id = "a"
name = "A again"

[[concepts]]
id = "b"
name = "B"

[[edges]]
concept = "a"
requires = "b"

[[edges]]
concept = "b"
requires = "a"

[[edges]]
concept = "b"
requires = "ghost"
weight = 7

[[problems]]
id = "p"
concept = "a"
title = "P"

[[problems.checkpoints]]
id = "p1"
order = 2
answer = "3"
tolerance = -1.0

[[problems.checkpoints.error_patterns]]
id = "bad-pattern"
trigger = "4"
error_type = "X"
diagnosis = "x"
missing_concept = "nowhere"
confidence = 1.5
"#;
        let warnings = validate_content_pack(&parse(toml));
        let has = |needle: &str| warnings.iter().any(|w| w.message.contains(needle));
        assert!(has("duplicate concept ID: a"));
        assert!(has("difficulty 9"));
        assert!(has("unknown concept: ghost"));
        assert!(has("weight 7"));
        assert!(has("prerequisite cycle"));
        assert!(has("not 1..1"));
        assert!(has("negative answer tolerance"));
        assert!(has("confidence 1.5"));
        assert!(has("missing_concept references unknown concept: nowhere"));
    }

    #[test]
    fn validate_flags_unmatched_template_answer() {
        let toml = r#"
[pack]
id = "t"
name = "T"

[[templates]]
id = "tpl"

[[templates.steps]]
step_number = 1
options = ["only option"]
correct_answer = "something else"
"#;
        let warnings = validate_content_pack(&parse(toml));
        assert!(warnings.iter().any(|w| w.message.contains("two options")));
        assert!(warnings.iter().any(|w| w.message.contains("does not match")));
    }

    #[test]
    fn long_template_answer_matches_on_its_prefix() {
        let head = "the horizontal component is the magnitude times the cosine";
        let toml = format!(
            r#"
[pack]
id = "t"
name = "T"

[[templates]]
id = "tpl"

[[templates.steps]]
step_number = 1
options = ["{head} of the angle", "something else"]
correct_answer = "{head} of the launch angle measured from the ground"
"#
        );
        let pack = parse(&toml);
        let step = &pack.templates[0].steps[0];
        assert_eq!(step.matching_option(), Some(0));
        let warnings = validate_content_pack(&pack);
        assert!(!warnings.iter().any(|w| w.message.contains("does not match")));
    }

    #[test]
    fn load_directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("bad.toml"), "not toml {").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(
            nested.join("extra.toml"),
            "[pack]\nid = \"extra\"\nname = \"Extra\"\n",
        )
        .unwrap();

        let packs = load_content_directory(dir.path()).unwrap();
        let ids: Vec<&str> = packs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["mechanics", "extra"]);

        let combined = load_content(dir.path()).unwrap();
        assert_eq!(combined.id, "mechanics+extra");
        assert_eq!(combined.concepts.len(), 3);
    }

    #[test]
    fn pack_graph_answers_chain_queries() {
        let pack = parse(VALID_TOML);
        let graph = pack.concept_graph();
        let chain = crate::graph::prerequisite_chain(&graph, "projectile-motion").unwrap();
        let ids: Vec<&str> = chain.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["trigonometry", "vector-decomposition"]);
        assert!(pack.template("vectors-1").is_some());
        assert!(pack.problem("launch").is_some());
    }
}
