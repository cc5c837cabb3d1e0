use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};
use thiserror::Error;

use crate::api::{Category, Polarity, SubgraphDto};
use crate::util::stable_pair;

use super::super::physics::{LinkSpec, SimNode};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("fetched node has an empty id")]
    MissingId,
    #[error("node {id} reports category {category}, outside the known set")]
    InvalidCategory { id: String, category: u8 },
}

/// Merge a freshly fetched subgraph onto the live node set. Nodes that
/// persist keep their position, velocity and pin; new nodes start at the
/// viewport center (with a deterministic per-id nudge so coincident
/// arrivals separate); nodes absent from the fetch are dropped, pinned
/// or not. Reconciling the same fetch twice changes nothing the second
/// time.
pub fn reconcile_subgraph(
    existing: &[SimNode],
    fetched: &SubgraphDto,
    viewport_center: Vec2,
) -> Result<(Vec<SimNode>, Vec<LinkSpec>), ReconcileError> {
    let prior: HashMap<&str, &SimNode> = existing
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect();

    let mut nodes = Vec::with_capacity(fetched.nodes.len());
    for dto in &fetched.nodes {
        if dto.id.is_empty() {
            return Err(ReconcileError::MissingId);
        }
        let category =
            Category::from_number(dto.category).ok_or_else(|| ReconcileError::InvalidCategory {
                id: dto.id.clone(),
                category: dto.category,
            })?;
        let label = dto.label.clone().unwrap_or_else(|| dto.id.clone());

        if let Some(old) = prior.get(dto.id.as_str()) {
            nodes.push(SimNode {
                id: dto.id.clone(),
                label,
                category,
                degree: dto.degree,
                query_pinned: dto.pinned,
                weight: old.weight,
                radius: old.radius,
                pos: old.pos,
                vel: old.vel,
                pin: old.pin,
            });
        } else {
            let (jx, jy) = stable_pair(&dto.id);
            nodes.push(SimNode {
                id: dto.id.clone(),
                label,
                category,
                degree: dto.degree,
                query_pinned: dto.pinned,
                weight: dto.degree as f64,
                radius: 5.0,
                pos: viewport_center + vec2(jx, jy) * 0.5,
                vel: Vec2::ZERO,
                pin: None,
            });
        }
    }

    let links = fetched
        .links
        .iter()
        .map(|dto| LinkSpec {
            source_id: dto.source.clone(),
            target_id: dto.target.clone(),
            freq: dto.freq,
            polarity: dto
                .polarity
                .as_deref()
                .map(Polarity::from_label)
                .unwrap_or_default(),
            same_category: dto.samecategory,
        })
        .collect();

    Ok((nodes, links))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SubgraphDto;

    fn fetched(json: &str) -> SubgraphDto {
        serde_json::from_str(json).expect("valid subgraph json")
    }

    const CENTER: Vec2 = vec2(450.0, 450.0);

    const TWO_NODE_FETCH: &str = r#"{
        "nodes": [
            {"id": "uniprot:P05231", "label": "IL-6", "category": 1, "degree": 4, "pinned": true},
            {"id": "mesh:D003920", "label": "Diabetes", "category": 2, "degree": 2}
        ],
        "links": [
            {"source": "uniprot:P05231", "target": "mesh:D003920", "freq": 12, "samecategory": false}
        ]
    }"#;

    #[test]
    fn new_nodes_start_near_the_viewport_center() {
        let (nodes, links) = reconcile_subgraph(&[], &fetched(TWO_NODE_FETCH), CENTER).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(links.len(), 1);
        for node in &nodes {
            assert!((node.pos - CENTER).length() < 1.0);
            assert!(node.pos != CENTER, "coincident start for {}", node.id);
        }
        assert!(nodes[0].query_pinned);
        assert_eq!(links[0].freq, 12);
    }

    #[test]
    fn surviving_nodes_keep_their_position() {
        let (mut nodes, _) = reconcile_subgraph(&[], &fetched(TWO_NODE_FETCH), CENTER).unwrap();
        nodes[0].pos = vec2(120.0, 80.0);
        nodes[0].vel = vec2(1.5, -0.5);
        nodes[0].pin = Some(vec2(120.0, 80.0));

        let (merged, _) = reconcile_subgraph(&nodes, &fetched(TWO_NODE_FETCH), CENTER).unwrap();
        assert_eq!(merged[0].pos, vec2(120.0, 80.0));
        assert_eq!(merged[0].vel, vec2(1.5, -0.5));
        assert_eq!(merged[0].pin, Some(vec2(120.0, 80.0)));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let dto = fetched(TWO_NODE_FETCH);
        let (first, first_links) = reconcile_subgraph(&[], &dto, CENTER).unwrap();
        let (second, second_links) = reconcile_subgraph(&first, &dto, CENTER).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.pos, b.pos);
            assert_eq!(a.vel, b.vel);
        }
        assert_eq!(first_links.len(), second_links.len());
    }

    #[test]
    fn absent_nodes_are_dropped_even_when_pinned() {
        let (mut nodes, _) = reconcile_subgraph(&[], &fetched(TWO_NODE_FETCH), CENTER).unwrap();
        nodes[1].pin = Some(vec2(10.0, 10.0));

        let smaller = fetched(
            r#"{
                "nodes": [{"id": "uniprot:P05231", "category": 1, "degree": 4}],
                "links": []
            }"#,
        );
        let (merged, links) = reconcile_subgraph(&nodes, &smaller, CENTER).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "uniprot:P05231");
        assert!(links.is_empty());
    }

    #[test]
    fn fetched_node_survives_a_simulation_tick() {
        use super::super::super::physics::Simulation;

        let dto = fetched(
            r#"{
                "nodes": [{"id": "uniprot:P05231", "label": "IL-6", "category": 1, "degree": 3}],
                "links": []
            }"#,
        );
        let (nodes, links) = reconcile_subgraph(&[], &dto, CENTER).unwrap();

        let mut sim = Simulation::new(vec2(900.0, 900.0));
        sim.set_graph(nodes, links).unwrap();
        assert_eq!(sim.nodes().len(), 1);
        assert!(sim.links().is_empty());

        sim.restart(1.0);
        sim.step();
        let node = &sim.nodes()[0];
        assert!(node.pos.x.is_finite() && node.pos.y.is_finite());
    }

    #[test]
    fn unknown_category_fails_closed() {
        let bad = fetched(
            r#"{
                "nodes": [{"id": "martian:X1", "category": 9}],
                "links": []
            }"#,
        );
        let error = reconcile_subgraph(&[], &bad, CENTER).unwrap_err();
        assert!(matches!(
            error,
            ReconcileError::InvalidCategory { category: 9, .. }
        ));
    }
}
