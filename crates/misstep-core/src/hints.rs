//! Learning resources and Socratic hints keyed by prerequisite tag.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::model::PrereqTag;

/// Kind of external learning resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[default]
    Youtube,
    Article,
    Simulation,
    Documentation,
}

/// A curated resource from the caller's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub kind: ResourceKind,
    /// Concept the resource explains, if any.
    #[serde(default)]
    pub concept_id: Option<String>,
    /// Prerequisite tags the resource addresses.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Higher is better.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub start_seconds: Option<u32>,
    #[serde(default)]
    pub end_seconds: Option<u32>,
}

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/embed/)([A-Za-z0-9_-]+)").expect("Invalid regex")
});

impl Resource {
    /// Returns `true` if the resource is tagged with `tag`.
    pub fn has_tag(&self, tag: PrereqTag) -> bool {
        self.tags.iter().any(|t| t == tag.as_str())
    }

    /// Player URL for a YouTube resource, starting and ending at the relevant
    /// segment. `None` for other kinds.
    pub fn embed_url(&self) -> Option<String> {
        if self.kind != ResourceKind::Youtube {
            return None;
        }
        let video_id = YOUTUBE_ID
            .captures(&self.url)
            .and_then(|c| c.get(1))
            .map_or(self.url.trim(), |m| m.as_str());
        if video_id.is_empty() {
            return None;
        }

        let mut url = format!("https://www.youtube.com/embed/{video_id}");
        let params: Vec<String> = [("start", self.start_seconds), ("end", self.end_seconds)]
            .into_iter()
            .filter_map(|(name, secs)| secs.filter(|s| *s > 0).map(|s| format!("{name}={s}")))
            .collect();
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        Some(url)
    }
}

/// Ids of catalog resources tagged with `tag`, in catalog order.
///
/// `prereq_unknown` never gets a recommendation.
pub fn resources_for_tag(tag: PrereqTag, catalog: &[Resource]) -> Vec<String> {
    if tag.is_unknown() {
        return Vec::new();
    }
    catalog
        .iter()
        .filter(|r| r.has_tag(tag))
        .map(|r| r.resource_id.clone())
        .collect()
}

/// Highest-priority video for a concept. Ties keep catalog order.
pub fn best_video_for_concept<'a>(concept_id: &str, catalog: &'a [Resource]) -> Option<&'a Resource> {
    catalog
        .iter()
        .filter(|r| r.kind == ResourceKind::Youtube && r.concept_id.as_deref() == Some(concept_id))
        .fold(None, |best: Option<&Resource>, r| match best {
            Some(b) if b.priority >= r.priority => Some(b),
            _ => Some(r),
        })
}

fn default_hint(tag: PrereqTag) -> &'static str {
    match tag {
        PrereqTag::TrigonometryVectorDecomposition => {
            "Which side of the triangle is adjacent to the angle? Does the horizontal component use sin or cos?"
        }
        PrereqTag::AngleMisinterpretation => {
            "The angle is measured from the horizontal. Should you use that angle or its complement for the horizontal component?"
        }
        PrereqTag::DecouplingHorizontalVertical => {
            "Horizontal and vertical motion are independent. Which velocity component decides the time of flight, Vx or Vy?"
        }
        PrereqTag::FreeBodyForcesSigns => {
            "Do tension and the gravity component point the same way or opposite ways? Pick a positive direction and compare them carefully."
        }
        PrereqTag::StoichiometryMolesVsMass => {
            "Can you compare reactants by mass? Convert each one to moles with n = mass / molar mass first."
        }
        PrereqTag::AlgebraCalculusConcepts => {
            "Power rule: d/dx(xⁿ) = n·xⁿ⁻¹. Where does the coefficient n go? Does integration raise or lower the exponent?"
        }
        PrereqTag::Unknown => "Review the step concept carefully and try again.",
    }
}

/// Keep the first `limit` words; mark a cut with an ellipsis.
pub fn cap_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > limit {
        format!("{}…", words[..limit].join(" "))
    } else {
        words.join(" ")
    }
}

/// Socratic hint templates, one per tag, with optional overrides.
#[derive(Debug, Clone)]
pub struct HintBook {
    overrides: HashMap<PrereqTag, String>,
    word_limit: usize,
}

impl Default for HintBook {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
            word_limit: 30,
        }
    }
}

impl HintBook {
    /// Hint book with the config's word limit and overrides. Overrides for
    /// tags that do not parse are ignored with a warning.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut book = Self {
            overrides: HashMap::new(),
            word_limit: config.hint_word_limit,
        };
        for (key, text) in &config.hints {
            match key.parse::<PrereqTag>() {
                Ok(tag) => book.set(tag, text.clone()),
                Err(e) => tracing::warn!("ignoring hint override: {e}"),
            }
        }
        book
    }

    pub fn set(&mut self, tag: PrereqTag, text: String) {
        self.overrides.insert(tag, text);
    }

    pub fn word_limit(&self) -> usize {
        self.word_limit
    }

    /// The capped hint for `tag`.
    pub fn hint(&self, tag: PrereqTag) -> String {
        let text = self
            .overrides
            .get(&tag)
            .map(String::as_str)
            .unwrap_or_else(|| default_hint(tag));
        cap_words(text, self.word_limit)
    }
}

/// Default hint for `tag`, capped at 30 words.
pub fn socratic_hint(tag: PrereqTag) -> String {
    HintBook::default().hint(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str, tags: &[&str]) -> Resource {
        Resource {
            resource_id: id.into(),
            title: id.into(),
            url: format!("https://example.org/{id}"),
            kind: ResourceKind::Article,
            concept_id: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            priority: 0,
            start_seconds: None,
            end_seconds: None,
        }
    }

    fn video(id: &str, url: &str, concept: &str, priority: i32) -> Resource {
        Resource {
            kind: ResourceKind::Youtube,
            url: url.into(),
            concept_id: Some(concept.into()),
            priority,
            ..resource(id, &[])
        }
    }

    #[test]
    fn resources_filtered_by_tag_in_catalog_order() {
        let catalog = vec![
            resource("r1", &["angle_misinterpretation"]),
            resource("r2", &["trigonometry_vector_decomposition"]),
            resource("r3", &["trigonometry_vector_decomposition", "angle_misinterpretation"]),
        ];
        assert_eq!(
            resources_for_tag(PrereqTag::TrigonometryVectorDecomposition, &catalog),
            vec!["r2", "r3"]
        );
        assert!(resources_for_tag(PrereqTag::FreeBodyForcesSigns, &catalog).is_empty());
    }

    #[test]
    fn unknown_tag_gets_no_resources() {
        let catalog = vec![resource("r1", &["prereq_unknown"])];
        assert!(resources_for_tag(PrereqTag::Unknown, &catalog).is_empty());
    }

    #[test]
    fn embed_url_carries_segment() {
        let mut v = video("v", "https://www.youtube.com/watch?v=abc123&t=4", "trig", 1);
        v.start_seconds = Some(95);
        v.end_seconds = Some(180);
        assert_eq!(
            v.embed_url().as_deref(),
            Some("https://www.youtube.com/embed/abc123?start=95&end=180")
        );

        let short = video("s", "https://youtu.be/xyz_9", "trig", 1);
        assert_eq!(
            short.embed_url().as_deref(),
            Some("https://www.youtube.com/embed/xyz_9")
        );
        assert!(resource("a", &[]).embed_url().is_none());
    }

    #[test]
    fn best_video_prefers_priority_then_order() {
        let catalog = vec![
            video("low", "https://youtu.be/a", "trig", 1),
            video("first-high", "https://youtu.be/b", "trig", 5),
            video("second-high", "https://youtu.be/c", "trig", 5),
            video("other", "https://youtu.be/d", "algebra", 9),
        ];
        assert_eq!(
            best_video_for_concept("trig", &catalog).map(|r| r.resource_id.as_str()),
            Some("first-high")
        );
        assert!(best_video_for_concept("optics", &catalog).is_none());
    }

    #[test]
    fn every_tag_has_a_short_hint() {
        for tag in PrereqTag::ALL {
            let hint = socratic_hint(tag);
            assert!(!hint.is_empty());
            assert!(hint.split_whitespace().count() <= 30, "{tag}: {hint}");
        }
    }

    #[test]
    fn long_text_is_capped_with_ellipsis() {
        let long = (1..=40).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let capped = cap_words(&long, 30);
        assert!(capped.ends_with("w30…"));
        assert_eq!(capped.split_whitespace().count(), 30);
        assert_eq!(cap_words("  a   b ", 30), "a b");
    }

    #[test]
    fn overrides_are_capped_too() {
        let mut config = EngineConfig {
            hint_word_limit: 3,
            ..Default::default()
        };
        config.hints.insert(
            "angle_misinterpretation".into(),
            "Which angle is given in the figure?".into(),
        );
        config.hints.insert("optics".into(), "ignored".into());
        let book = HintBook::from_config(&config);
        assert_eq!(book.hint(PrereqTag::AngleMisinterpretation), "Which angle is…");
        assert_eq!(book.hint(PrereqTag::Unknown), "Review the step…");
        assert_eq!(book.word_limit(), 3);
    }
}
