use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::weight::{EvidenceStats, WeightCoefficients};

#[derive(Clone, Debug, Serialize)]
pub struct NodesList {
    pub nodes: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SubgraphRequest {
    pub nodes: NodesList,
    pub category_count: CategoryCountBody,
}

/// The backend keys the per-category counts by stringified category
/// number ("1" through "4").
#[derive(Clone, Debug, Serialize)]
pub struct CategoryCountBody {
    pub categorycount: BTreeMap<String, u32>,
}

impl CategoryCountBody {
    pub fn from_counts(counts: [u32; 4]) -> Self {
        let categorycount = counts
            .iter()
            .enumerate()
            .map(|(index, &count)| ((index + 1).to_string(), count))
            .collect();
        Self { categorycount }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SubgraphDto {
    #[serde(default)]
    pub nodes: Vec<NodeDto>,
    #[serde(default)]
    pub links: Vec<LinkDto>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NodeDto {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub category: u8,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub degree: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LinkDto {
    pub source: String,
    pub target: String,
    #[serde(default = "default_freq")]
    pub freq: u32,
    #[serde(default)]
    pub samecategory: bool,
    #[serde(default)]
    pub polarity: Option<String>,
}

fn default_freq() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize)]
pub struct NodeWeightsRequest {
    pub nodes: NodesList,
    pub weights: WeightsBody,
}

#[derive(Clone, Debug, Serialize)]
pub struct WeightsBody {
    pub weights: WeightCoefficients,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub matches: Vec<EntityDto>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EntityDto {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub category: u8,
}

impl EntityDto {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// One element of a cytoscape-style element list. Node elements carry no
/// `source` field; edge elements carry `source` and `target`.
#[derive(Clone, Debug, Deserialize)]
pub struct CyElement {
    pub data: CyData,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CyData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub polarity: Option<String>,
    #[serde(flatten)]
    pub stats: EvidenceStats,
}

#[derive(Clone, Debug, Default)]
pub struct InteractionElements {
    pub nodes: Vec<CyData>,
    pub edges: Vec<CyData>,
}

/// Split a cytoscape element list into nodes and edges by the presence
/// of a `source` field.
pub fn partition_elements(elements: Vec<CyElement>) -> InteractionElements {
    let mut partitioned = InteractionElements::default();
    for element in elements {
        if element.data.source.is_some() && element.data.target.is_some() {
            partitioned.edges.push(element.data);
        } else {
            partitioned.nodes.push(element.data);
        }
    }
    partitioned
}

#[derive(Clone, Debug, Deserialize)]
pub struct EvidenceDto {
    #[serde(default)]
    pub sentence: String,
    #[serde(default)]
    pub markup: Option<String>,
    #[serde(default)]
    pub hyperlink: Option<String>,
    #[serde(default)]
    pub impact: Option<serde_json::Value>,
}

impl EvidenceDto {
    /// Impact factors arrive as either numbers or numeric strings.
    pub fn impact_value(&self) -> Option<f64> {
        match self.impact.as_ref()? {
            serde_json::Value::Number(number) => number.as_f64(),
            serde_json::Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Plain text of the sentence; some responses carry only the
    /// highlighted `markup` variant, which is stripped of its tags.
    pub fn display_text(&self) -> String {
        if !self.sentence.is_empty() {
            return self.sentence.clone();
        }
        let markup = self.markup.as_deref().unwrap_or("");
        let mut text = String::with_capacity(markup.len());
        let mut in_tag = false;
        for character in markup.chars() {
            match character {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if !in_tag => text.push(character),
                _ => {}
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_splits_on_source_field() {
        let elements: Vec<CyElement> = serde_json::from_str(
            r#"[
                {"data": {"id": "uniprot:P05231", "label": "IL-6"}},
                {"data": {"id": "e0", "source": "uniprot:P05231", "target": "mesh:D003920",
                          "polarity": "positive", "freq": 12}}
            ]"#,
        )
        .unwrap();

        let partitioned = partition_elements(elements);
        assert_eq!(partitioned.nodes.len(), 1);
        assert_eq!(partitioned.edges.len(), 1);
        assert_eq!(partitioned.edges[0].stats.freq, 12.0);
        assert_eq!(partitioned.edges[0].polarity.as_deref(), Some("positive"));
    }

    #[test]
    fn subgraph_dto_defaults() {
        let dto: SubgraphDto = serde_json::from_str(
            r#"{
                "nodes": [{"id": "uniprot:P05231", "category": 1, "degree": 7}],
                "links": [{"source": "uniprot:P05231", "target": "uniprot:P05231"}]
            }"#,
        )
        .unwrap();
        assert_eq!(dto.nodes[0].degree, 7);
        assert!(!dto.nodes[0].pinned);
        assert_eq!(dto.links[0].freq, 1);
    }

    #[test]
    fn evidence_impact_parses_strings_and_numbers() {
        let string_impact: EvidenceDto =
            serde_json::from_str(r#"{"sentence": "s", "impact": "4.25"}"#).unwrap();
        assert_eq!(string_impact.impact_value(), Some(4.25));

        let numeric_impact: EvidenceDto =
            serde_json::from_str(r#"{"sentence": "s", "impact": 2.5}"#).unwrap();
        assert_eq!(numeric_impact.impact_value(), Some(2.5));

        let missing: EvidenceDto = serde_json::from_str(r#"{"sentence": "s"}"#).unwrap();
        assert_eq!(missing.impact_value(), None);
    }

    #[test]
    fn display_text_falls_back_to_stripped_markup() {
        let markup_only: EvidenceDto = serde_json::from_str(
            r#"{"markup": "IL-6 <span class=\"event\">induces</span> inflammation."}"#,
        )
        .unwrap();
        assert_eq!(markup_only.display_text(), "IL-6 induces inflammation.");

        let with_sentence: EvidenceDto =
            serde_json::from_str(r#"{"sentence": "plain", "markup": "<b>rich</b>"}"#).unwrap();
        assert_eq!(with_sentence.display_text(), "plain");
    }

    #[test]
    fn category_count_body_keys_are_stringified() {
        let body = CategoryCountBody::from_counts([5, 6, 7, 8]);
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(
            json,
            r#"{"categorycount":{"1":5,"2":6,"3":7,"4":8}}"#
        );
    }
}
