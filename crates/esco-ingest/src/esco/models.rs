// ESCO API response models
//
// Only the fields the crawler reads are modelled; everything else in the HAL
// payloads is ignored. All collections default to empty so partially
// populated resources still deserialize.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// A `_links` entry pointing at another resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeLinks {
    #[serde(default, rename = "narrowerConcept")]
    pub narrower_concept: Vec<Link>,

    #[serde(default, rename = "narrowerSkill")]
    pub narrower_skill: Vec<Link>,
}

/// A taxonomy node as returned by `resource/concept?uri=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConceptNode {
    #[serde(default)]
    pub uri: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, rename = "_links")]
    pub links: NodeLinks,
}

/// What the crawler does with a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    /// Descend into each narrower concept
    Concept(&'a [Link]),
    /// Batch the narrower skills for detail fetch
    SkillParent(&'a [Link]),
    /// Nothing below this node
    Terminal,
}

impl ConceptNode {
    /// Narrower concepts win over narrower skills when both are present
    pub fn kind(&self) -> NodeKind<'_> {
        if !self.links.narrower_concept.is_empty() {
            NodeKind::Concept(&self.links.narrower_concept)
        } else if !self.links.narrower_skill.is_empty() {
            NodeKind::SkillParent(&self.links.narrower_skill)
        } else {
            NodeKind::Terminal
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub literal: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AncestorLinks {
    #[serde(default, rename = "self")]
    pub self_link: Option<Link>,
}

/// One entry of a skill's `_embedded.ancestors`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddedAncestor {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, rename = "_links")]
    pub links: AncestorLinks,
}

impl EmbeddedAncestor {
    pub fn uri(&self) -> Option<&str> {
        self.links
            .self_link
            .as_ref()
            .map(|link| link.uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or_else(|| self.links.self_link.as_ref().and_then(|link| link.title.as_deref()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailEmbedded {
    #[serde(default)]
    pub ancestors: Vec<EmbeddedAncestor>,
}

/// Raw detail of a skill leaf
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillDetail {
    #[serde(default)]
    pub uri: String,

    #[serde(default)]
    pub title: Option<String>,

    /// locale -> `{ "literal": ... }`
    #[serde(default)]
    pub description: BTreeMap<String, LocalizedText>,

    /// locale -> labels
    #[serde(default, rename = "alternativeLabel")]
    pub alternative_label: BTreeMap<String, Vec<String>>,

    #[serde(default, rename = "_embedded")]
    pub embedded: Option<DetailEmbedded>,
}

impl SkillDetail {
    pub fn ancestors(&self) -> &[EmbeddedAncestor] {
        self.embedded
            .as_ref()
            .map(|embedded| embedded.ancestors.as_slice())
            .unwrap_or(&[])
    }
}

/// Payload of `resource/concept?uris=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    #[serde(default, rename = "_embedded")]
    pub embedded: HashMap<String, SkillDetail>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_concept_node_with_narrower_concepts() {
        let node: ConceptNode = serde_json::from_value(json!({
            "uri": "http://data.europa.eu/esco/skill/S",
            "title": "skills",
            "_links": {
                "self": { "href": "https://ec.europa.eu/esco/api/resource/concept?uri=S" },
                "narrowerConcept": [
                    { "uri": "http://data.europa.eu/esco/skill/S1", "title": "communication" },
                    { "uri": "http://data.europa.eu/esco/skill/S2", "title": "information skills" }
                ]
            }
        }))
        .unwrap();

        match node.kind() {
            NodeKind::Concept(children) => {
                assert_eq!(children.len(), 2);
                assert_eq!(children[1].title.as_deref(), Some("information skills"));
            },
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_concepts_take_precedence_over_skills() {
        let node: ConceptNode = serde_json::from_value(json!({
            "_links": {
                "narrowerConcept": [{ "uri": "c" }],
                "narrowerSkill": [{ "uri": "s" }]
            }
        }))
        .unwrap();
        assert!(matches!(node.kind(), NodeKind::Concept(_)));
    }

    #[test]
    fn test_empty_link_lists_are_terminal() {
        let node: ConceptNode =
            serde_json::from_value(json!({ "_links": { "narrowerConcept": [] } })).unwrap();
        assert_eq!(node.kind(), NodeKind::Terminal);

        let bare: ConceptNode = serde_json::from_value(json!({})).unwrap();
        assert_eq!(bare.kind(), NodeKind::Terminal);
    }

    #[test]
    fn test_skill_detail_with_ancestors() {
        let detail: SkillDetail = serde_json::from_value(json!({
            "uri": "http://data.europa.eu/esco/skill/abc",
            "title": "manage budgets",
            "description": { "en-us": { "literal": "Plan budgets.", "mimetype": "plain/text" } },
            "alternativeLabel": { "en": ["budgeting", "budget control"], "fr": ["budgétiser"] },
            "_embedded": {
                "ancestors": [
                    { "title": "management skills", "_links": { "self": { "uri": "http://data.europa.eu/esco/skill/S4" } } }
                ]
            }
        }))
        .unwrap();

        assert_eq!(detail.description["en-us"].literal.as_deref(), Some("Plan budgets."));
        assert_eq!(detail.alternative_label["en"].len(), 2);
        assert_eq!(detail.ancestors()[0].uri(), Some("http://data.europa.eu/esco/skill/S4"));
        assert_eq!(detail.ancestors()[0].title(), Some("management skills"));
    }

    #[test]
    fn test_bulk_response_keyed_by_uri() {
        let bulk: BulkResponse = serde_json::from_value(json!({
            "_embedded": {
                "http://x/a": { "uri": "http://x/a", "title": "A" },
                "http://x/b": { "uri": "http://x/b" }
            }
        }))
        .unwrap();
        assert_eq!(bulk.embedded.len(), 2);
        assert_eq!(bulk.embedded["http://x/a"].title.as_deref(), Some("A"));
    }
}
