//! Prerequisite graph traversal and gap detection.
//!
//! Traversal works over any [`ConceptSource`], so the same code serves the
//! in-memory [`ConceptGraph`] and a database-backed source. Raw content may
//! contain cycles; every walk is bounded by a visited set keyed by concept id.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{BacktrackStep, Concept, MasteryStatus, PrerequisiteEdge};
use crate::traits::{status_or_default, ConceptSource, MasteryStore};

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// All prerequisites of `concept_id`, deepest dependencies first.
///
/// Depth-first over prerequisite edges; each concept appears at most once, in
/// first-seen order. The concept itself is never part of its own chain, even
/// when the data loops back to it. Edges pointing at concepts that do not
/// exist are skipped.
pub fn prerequisite_chain(
    source: &dyn ConceptSource,
    concept_id: &str,
) -> Result<Vec<Concept>, EngineError> {
    if source.get_concept(concept_id)?.is_none() {
        return Err(EngineError::UnknownConcept(concept_id.to_string()));
    }

    let mut walk = ChainWalk {
        source,
        root: concept_id,
        in_chain: HashSet::new(),
        chain: Vec::new(),
    };
    walk.run()?;
    Ok(walk.chain)
}

struct ChainWalk<'a> {
    source: &'a dyn ConceptSource,
    root: &'a str,
    in_chain: HashSet<String>,
    chain: Vec<Concept>,
}

/// One concept on the explicit DFS stack.
struct Frame {
    id: String,
    edges: Vec<PrerequisiteEdge>,
    next: usize,
    descended: bool,
}

impl Frame {
    fn new(id: String, edges: Vec<PrerequisiteEdge>) -> Self {
        Self {
            id,
            edges,
            next: 0,
            descended: false,
        }
    }
}

impl ChainWalk<'_> {
    /// Post-order walk on a heap stack, so chain depth never touches the
    /// thread stack.
    fn run(&mut self) -> anyhow::Result<()> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(self.root.to_string());
        let root_edges = self.source.list_prerequisite_edges(self.root)?;
        let mut stack = vec![Frame::new(self.root.to_string(), root_edges)];

        while let Some(frame) = stack.last_mut() {
            let Some(edge) = frame.edges.get(frame.next) else {
                stack.pop();
                continue;
            };
            let prereq = edge.prerequisite_id.clone();

            if !frame.descended {
                frame.descended = true;
                if visited.insert(prereq.clone()) {
                    let edges = self.source.list_prerequisite_edges(&prereq)?;
                    stack.push(Frame::new(prereq, edges));
                    continue;
                }
            }

            // the prerequisite's own subtree is finished
            frame.next += 1;
            frame.descended = false;
            let parent = frame.id.clone();
            self.collect(&parent, &prereq)?;
        }
        Ok(())
    }

    fn collect(&mut self, id: &str, prereq: &str) -> anyhow::Result<()> {
        if prereq == self.root || self.in_chain.contains(prereq) {
            return Ok(());
        }
        match self.source.get_concept(prereq)? {
            Some(concept) => {
                self.in_chain.insert(prereq.to_string());
                self.chain.push(concept);
            }
            None => {
                tracing::warn!("edge {id} -> {prereq} points at a missing concept, skipping");
            }
        }
        Ok(())
    }
}

/// Prerequisites of `concept_id` the student has not mastered.
///
/// A missing mastery record counts as not mastered.
pub fn missing_prerequisites(
    source: &dyn ConceptSource,
    mastery: &dyn MasteryStore,
    concept_id: &str,
    student_id: &str,
) -> Result<Vec<Concept>, EngineError> {
    let mut missing = Vec::new();
    for concept in prerequisite_chain(source, concept_id)? {
        if status_or_default(mastery, student_id, &concept.id)? != MasteryStatus::Mastered {
            missing.push(concept);
        }
    }
    Ok(missing)
}

/// The display path for routing a student back to `missing_concept`: its own
/// prerequisite chain followed by the concept itself, each annotated with the
/// student's current status. Read-only.
pub fn backtrack_path(
    source: &dyn ConceptSource,
    mastery: &dyn MasteryStore,
    student_id: &str,
    missing_concept: &str,
) -> Result<Vec<BacktrackStep>, EngineError> {
    let target = source
        .get_concept(missing_concept)?
        .ok_or_else(|| EngineError::UnknownConcept(missing_concept.to_string()))?;

    let mut concepts = prerequisite_chain(source, missing_concept)?;
    concepts.push(target);

    concepts
        .into_iter()
        .map(|concept| -> Result<BacktrackStep, EngineError> {
            let status = status_or_default(mastery, student_id, &concept.id)?;
            let is_target = concept.id == missing_concept;
            Ok(BacktrackStep {
                concept,
                status,
                is_target,
            })
        })
        .collect()
}

/// One entry of a learning path, with its 0-based display position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEntry {
    pub order: usize,
    pub concept: Concept,
}

/// The prerequisite chain of `concept_id` with the concept appended last.
pub fn learning_path(
    source: &dyn ConceptSource,
    concept_id: &str,
) -> Result<Vec<PathEntry>, EngineError> {
    let target = source
        .get_concept(concept_id)?
        .ok_or_else(|| EngineError::UnknownConcept(concept_id.to_string()))?;
    let mut concepts = prerequisite_chain(source, concept_id)?;
    concepts.push(target);
    Ok(concepts
        .into_iter()
        .enumerate()
        .map(|(order, concept)| PathEntry { order, concept })
        .collect())
}

// ---------------------------------------------------------------------------
// In-memory graph
// ---------------------------------------------------------------------------

/// An immutable in-memory concept graph.
#[derive(Debug, Clone, Default)]
pub struct ConceptGraph {
    concepts: Vec<Concept>,
    index: HashMap<String, usize>,
    edges: Vec<PrerequisiteEdge>,
    outgoing: HashMap<String, Vec<usize>>,
}

impl ConceptGraph {
    /// Build a graph. Later concepts with a duplicate id are ignored, as are
    /// repeated (concept, prerequisite) edges.
    pub fn new(concepts: Vec<Concept>, edges: Vec<PrerequisiteEdge>) -> Self {
        let mut graph = Self::default();
        for concept in concepts {
            if graph.index.contains_key(&concept.id) {
                continue;
            }
            graph.index.insert(concept.id.clone(), graph.concepts.len());
            graph.concepts.push(concept);
        }

        let mut seen = HashSet::new();
        for edge in edges {
            if !seen.insert((edge.concept_id.clone(), edge.prerequisite_id.clone())) {
                continue;
            }
            graph
                .outgoing
                .entry(edge.concept_id.clone())
                .or_default()
                .push(graph.edges.len());
            graph.edges.push(edge);
        }
        graph
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn edges(&self) -> &[PrerequisiteEdge] {
        &self.edges
    }

    pub fn concept(&self, id: &str) -> Option<&Concept> {
        self.index.get(id).map(|&i| &self.concepts[i])
    }

    /// Edges out of `id`, in authoring order.
    pub fn prerequisites_of(&self, id: &str) -> impl Iterator<Item = &PrerequisiteEdge> {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    /// Node/edge export for graph visualisation. Edges run from prerequisite
    /// (`source`) to dependent (`target`).
    pub fn dependency_graph(&self) -> DependencyGraph {
        self.dependency_subgraph(&ConceptFilter::default())
    }

    /// [`dependency_graph`](Self::dependency_graph) restricted to concepts
    /// matching `filter`. Only edges with both ends kept are exported.
    pub fn dependency_subgraph(&self, filter: &ConceptFilter) -> DependencyGraph {
        let kept: HashSet<&str> = self
            .concepts
            .iter()
            .filter(|c| filter.matches(c))
            .map(|c| c.id.as_str())
            .collect();
        DependencyGraph {
            nodes: self
                .concepts
                .iter()
                .filter(|c| kept.contains(c.id.as_str()))
                .map(|c| GraphNode {
                    id: c.id.clone(),
                    label: c.name.clone(),
                    subject: c.subject.clone(),
                    topic: c.topic.clone(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .filter(|e| {
                    kept.contains(e.concept_id.as_str())
                        && kept.contains(e.prerequisite_id.as_str())
                })
                .map(|e| GraphEdge {
                    id: format!("e{}-{}", e.prerequisite_id, e.concept_id),
                    source: e.prerequisite_id.clone(),
                    target: e.concept_id.clone(),
                    label: e.weight.to_string(),
                })
                .collect(),
        }
    }

    /// Concepts matching `filter`, ordered by difficulty (authoring order on ties).
    pub fn filter_concepts(&self, filter: &ConceptFilter) -> Vec<&Concept> {
        let mut matched: Vec<&Concept> = self
            .concepts
            .iter()
            .filter(|c| filter.matches(c))
            .collect();
        matched.sort_by_key(|c| c.difficulty);
        matched
    }

    /// One prerequisite cycle, if the graph has any, as the list of concept
    /// ids along it with the first id repeated at the end.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Active,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        for concept in &self.concepts {
            if marks.contains_key(concept.id.as_str()) {
                continue;
            }
            marks.insert(&concept.id, Mark::Active);
            let mut stack: Vec<(&str, Vec<&PrerequisiteEdge>, usize)> = vec![(
                concept.id.as_str(),
                self.prerequisites_of(&concept.id).collect(),
                0,
            )];

            while let Some((id, edges, next)) = stack.last_mut() {
                let Some(&edge) = edges.get(*next) else {
                    marks.insert(*id, Mark::Done);
                    stack.pop();
                    continue;
                };
                *next += 1;
                let target = edge.prerequisite_id.as_str();
                match marks.get(target) {
                    Some(Mark::Active) => {
                        let start = stack.iter().position(|(s, ..)| *s == target).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            stack[start..].iter().map(|(s, ..)| s.to_string()).collect();
                        cycle.push(target.to_string());
                        return Some(cycle);
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(target, Mark::Active);
                        stack.push((target, self.prerequisites_of(target).collect(), 0));
                    }
                }
            }
        }
        None
    }
}

impl ConceptSource for ConceptGraph {
    fn get_concept(&self, id: &str) -> anyhow::Result<Option<Concept>> {
        Ok(self.concept(id).cloned())
    }

    fn list_prerequisite_edges(&self, concept_id: &str) -> anyhow::Result<Vec<PrerequisiteEdge>> {
        Ok(self.prerequisites_of(concept_id).cloned().collect())
    }
}

/// Subject/topic/difficulty filter over concepts. Empty fields match anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConceptFilter {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty_min: Option<u8>,
    #[serde(default)]
    pub difficulty_max: Option<u8>,
}

impl ConceptFilter {
    pub fn matches(&self, concept: &Concept) -> bool {
        self.subject.as_ref().is_none_or(|s| *s == concept.subject)
            && self.topic.as_ref().is_none_or(|t| *t == concept.topic)
            && self.difficulty_min.is_none_or(|d| concept.difficulty >= d)
            && self.difficulty_max.is_none_or(|d| concept.difficulty <= d)
    }
}

/// Exported dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub subject: String,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    pub(crate) fn concept(id: &str) -> Concept {
        Concept {
            id: id.into(),
            name: id.replace('-', " "),
            subject: "physics".into(),
            topic: "mechanics".into(),
            tags: vec![],
            difficulty: 2,
            description: None,
        }
    }

    pub(crate) fn edge(concept_id: &str, prerequisite_id: &str) -> PrerequisiteEdge {
        PrerequisiteEdge {
            concept_id: concept_id.into(),
            prerequisite_id: prerequisite_id.into(),
            weight: 3,
        }
    }

    /// Minimal mastery store for graph and engine tests.
    #[derive(Default)]
    pub(crate) struct FixedMastery {
        pub statuses: Mutex<HashMap<(String, String), MasteryStatus>>,
        pub downgrades: Mutex<Vec<(String, String)>>,
    }

    impl FixedMastery {
        pub(crate) fn with(entries: &[(&str, &str, MasteryStatus)]) -> Self {
            let store = Self::default();
            for (student, concept, status) in entries {
                store
                    .statuses
                    .lock()
                    .unwrap()
                    .insert((student.to_string(), concept.to_string()), *status);
            }
            store
        }
    }

    impl MasteryStore for FixedMastery {
        fn get(&self, student_id: &str, concept_id: &str) -> anyhow::Result<Option<MasteryStatus>> {
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .get(&(student_id.to_string(), concept_id.to_string()))
                .copied())
        }

        fn request_downgrade(&self, student_id: &str, concept_id: &str) -> anyhow::Result<()> {
            self.downgrades
                .lock()
                .unwrap()
                .push((student_id.to_string(), concept_id.to_string()));
            let mut statuses = self.statuses.lock().unwrap();
            let key = (student_id.to_string(), concept_id.to_string());
            if statuses.get(&key) == Some(&MasteryStatus::Mastered) {
                statuses.insert(key, MasteryStatus::NeedsReview);
            }
            Ok(())
        }
    }

    /// projectile-motion -> vector-decomposition -> trigonometry -> algebra
    ///                   -> kinematics -> algebra
    pub(crate) fn mechanics_graph() -> ConceptGraph {
        ConceptGraph::new(
            vec![
                concept("algebra"),
                concept("trigonometry"),
                concept("vector-decomposition"),
                concept("kinematics"),
                concept("projectile-motion"),
            ],
            vec![
                edge("projectile-motion", "vector-decomposition"),
                edge("projectile-motion", "kinematics"),
                edge("vector-decomposition", "trigonometry"),
                edge("trigonometry", "algebra"),
                edge("kinematics", "algebra"),
            ],
        )
    }

    fn ids(concepts: &[Concept]) -> Vec<&str> {
        concepts.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn chain_visits_deepest_first_without_duplicates() {
        let graph = mechanics_graph();
        let chain = prerequisite_chain(&graph, "projectile-motion").unwrap();
        assert_eq!(
            ids(&chain),
            vec!["algebra", "trigonometry", "vector-decomposition", "kinematics"]
        );
    }

    #[test]
    fn chain_excludes_the_concept_itself() {
        let graph = mechanics_graph();
        let chain = prerequisite_chain(&graph, "trigonometry").unwrap();
        assert_eq!(ids(&chain), vec!["algebra"]);
        assert!(prerequisite_chain(&graph, "algebra").unwrap().is_empty());
    }

    #[test]
    fn chain_terminates_on_cycles() {
        let graph = ConceptGraph::new(
            vec![concept("a"), concept("b"), concept("c")],
            vec![edge("a", "b"), edge("b", "c"), edge("c", "a"), edge("c", "b")],
        );
        let chain = prerequisite_chain(&graph, "a").unwrap();
        let mut unique = ids(&chain);
        unique.dedup();
        assert_eq!(unique.len(), chain.len());
        assert!(!ids(&chain).contains(&"a"));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn chain_handles_self_loop() {
        let graph = ConceptGraph::new(vec![concept("a")], vec![edge("a", "a")]);
        assert!(prerequisite_chain(&graph, "a").unwrap().is_empty());
    }

    #[test]
    fn chain_skips_dangling_edges() {
        let graph = ConceptGraph::new(
            vec![concept("a"), concept("b")],
            vec![edge("a", "ghost"), edge("a", "b")],
        );
        assert_eq!(ids(&prerequisite_chain(&graph, "a").unwrap()), vec!["b"]);
    }

    #[test]
    fn chain_of_unknown_concept_is_an_error() {
        let graph = mechanics_graph();
        let err = prerequisite_chain(&graph, "optics").unwrap_err();
        assert!(matches!(err, EngineError::UnknownConcept(id) if id == "optics"));
    }

    #[test]
    fn missing_prerequisites_treat_absent_records_as_unmastered() {
        let graph = mechanics_graph();
        let mastery = FixedMastery::with(&[
            ("s1", "algebra", MasteryStatus::Mastered),
            ("s1", "kinematics", MasteryStatus::NeedsReview),
        ]);
        let missing = missing_prerequisites(&graph, &mastery, "projectile-motion", "s1").unwrap();
        assert_eq!(
            ids(&missing),
            vec!["trigonometry", "vector-decomposition", "kinematics"]
        );
    }

    #[test]
    fn backtrack_path_marks_target_and_statuses() {
        let graph = mechanics_graph();
        let mastery = FixedMastery::with(&[("s1", "algebra", MasteryStatus::Mastered)]);
        let path = backtrack_path(&graph, &mastery, "s1", "vector-decomposition").unwrap();

        let names: Vec<&str> = path.iter().map(|s| s.concept.id.as_str()).collect();
        assert_eq!(names, vec!["algebra", "trigonometry", "vector-decomposition"]);
        assert_eq!(path[0].status, MasteryStatus::Mastered);
        assert_eq!(path[1].status, MasteryStatus::NotStarted);
        assert_eq!(
            path.iter().filter(|s| s.is_target).count(),
            1,
            "exactly one target"
        );
        assert!(path[2].is_target);
    }

    #[test]
    fn backtrack_path_is_repeatable() {
        let graph = mechanics_graph();
        let mastery = FixedMastery::with(&[("s1", "trigonometry", MasteryStatus::InProgress)]);
        let first = backtrack_path(&graph, &mastery, "s1", "projectile-motion").unwrap();
        let second = backtrack_path(&graph, &mastery, "s1", "projectile-motion").unwrap();
        assert_eq!(first, second);
        assert!(mastery.downgrades.lock().unwrap().is_empty());
    }

    #[test]
    fn learning_path_appends_concept_with_order() {
        let graph = mechanics_graph();
        let path = learning_path(&graph, "trigonometry").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1].order, 1);
        assert_eq!(path[1].concept.id, "trigonometry");
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let graph = ConceptGraph::new(
            vec![concept("a"), concept("b")],
            vec![edge("a", "b"), edge("a", "b")],
        );
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.list_prerequisite_edges("a").unwrap().len(), 1);
    }

    #[test]
    fn dependency_graph_points_from_prerequisite_to_dependent() {
        let graph = mechanics_graph();
        let export = graph.dependency_graph();
        assert_eq!(export.nodes.len(), 5);
        let e = &export.edges[0];
        assert_eq!(e.source, "vector-decomposition");
        assert_eq!(e.target, "projectile-motion");
        assert_eq!(e.id, "evector-decomposition-projectile-motion");
        assert_eq!(e.label, "3");
    }

    #[test]
    fn dependency_subgraph_drops_edges_leaving_the_filter() {
        let mut concepts = vec![concept("algebra"), concept("trigonometry")];
        for c in &mut concepts {
            c.subject = "math".into();
        }
        concepts.push(concept("vector-decomposition"));
        let graph = ConceptGraph::new(
            concepts,
            vec![
                edge("trigonometry", "algebra"),
                edge("vector-decomposition", "trigonometry"),
            ],
        );
        let filter = ConceptFilter {
            subject: Some("math".into()),
            ..Default::default()
        };
        let export = graph.dependency_subgraph(&filter);
        let nodes: Vec<&str> = export.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(nodes, vec!["algebra", "trigonometry"]);
        assert_eq!(export.edges.len(), 1);
        assert_eq!(export.edges[0].target, "trigonometry");
    }

    #[test]
    fn filter_by_difficulty_range_sorted() {
        let mut hard = concept("hard");
        hard.difficulty = 5;
        let mut easy = concept("easy");
        easy.difficulty = 1;
        let graph = ConceptGraph::new(vec![hard, easy, concept("mid")], vec![]);
        let filter = ConceptFilter {
            difficulty_max: Some(2),
            ..Default::default()
        };
        let found: Vec<&str> = graph
            .filter_concepts(&filter)
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(found, vec!["easy", "mid"]);

        let by_subject = ConceptFilter {
            subject: Some("chemistry".into()),
            ..Default::default()
        };
        assert!(graph.filter_concepts(&by_subject).is_empty());
    }

    #[test]
    fn find_cycle_reports_loop() {
        assert!(mechanics_graph().find_cycle().is_none());
        let graph = ConceptGraph::new(
            vec![concept("a"), concept("b")],
            vec![edge("a", "b"), edge("b", "a")],
        );
        let cycle = graph.find_cycle().unwrap();
        assert_eq!(cycle, vec!["a", "b", "a"]);
    }

    /// c0 -> c1 -> ... -> c{len-1}, optionally closed back to c0.
    fn linear_chain(len: usize, closed: bool) -> ConceptGraph {
        let ids: Vec<String> = (0..len).map(|i| format!("c{i}")).collect();
        let concepts = ids.iter().map(|id| concept(id)).collect();
        let mut edges: Vec<PrerequisiteEdge> =
            ids.windows(2).map(|w| edge(&w[0], &w[1])).collect();
        if closed {
            edges.push(edge(&ids[len - 1], &ids[0]));
        }
        ConceptGraph::new(concepts, edges)
    }

    #[test]
    fn very_deep_chain_is_walked_without_recursion() {
        let graph = linear_chain(100_000, false);
        let chain = prerequisite_chain(&graph, "c0").unwrap();
        assert_eq!(chain.len(), 99_999);
        assert_eq!(chain[0].id, "c99999");
        assert_eq!(chain[99_998].id, "c1");

        let path = learning_path(&graph, "c0").unwrap();
        assert_eq!(path.len(), 100_000);
        assert_eq!(path.last().unwrap().concept.id, "c0");
    }

    #[test]
    fn very_deep_cycle_is_found_without_recursion() {
        assert!(linear_chain(100_000, false).find_cycle().is_none());

        let cycle = linear_chain(100_000, true).find_cycle().unwrap();
        assert_eq!(cycle.len(), 100_001);
        assert_eq!(cycle.first().map(String::as_str), Some("c0"));
        assert_eq!(cycle.last().map(String::as_str), Some("c0"));
    }
}
