use eframe::egui::{
    self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, StrokeKind, Ui, Vec2, pos2, vec2,
};

use crate::api::{Category, InteractionElements, Polarity};
use crate::util::{entity_curie, truncate_label};
use crate::weight::{EvidenceStats, compute_weight};

use super::physics::{ForceConfig, category_centers_ellipse};
use super::render_utils::{
    category_node_color, polarity_accent, polarity_fill, screen_radius, screen_to_world,
    world_to_screen,
};
use super::ViewModel;

/// One original edge between the two anchors, kept with its evidence
/// statistics so bucket labels can report local weights.
#[derive(Clone, Debug)]
pub struct InducedEdge {
    pub source: String,
    pub target: String,
    pub polarity: Polarity,
    pub freq: f64,
    pub stats: EvidenceStats,
}

/// Extract the edges running between the two anchors (either direction)
/// from an interaction response. Context edges to other nodes are not
/// part of the flow diagram.
pub fn induced_edges(
    elements: &InteractionElements,
    anchor1: &str,
    anchor2: &str,
) -> Vec<InducedEdge> {
    let a1 = entity_curie(anchor1);
    let a2 = entity_curie(anchor2);

    elements
        .edges
        .iter()
        .filter_map(|edge| {
            let source = entity_curie(edge.source.as_deref()?);
            let target = entity_curie(edge.target.as_deref()?);
            let between = (source == a1 && target == a2) || (source == a2 && target == a1);
            if !between {
                return None;
            }
            Some(InducedEdge {
                source,
                target,
                polarity: edge
                    .polarity
                    .as_deref()
                    .map(Polarity::from_label)
                    .unwrap_or_default(),
                freq: edge.stats.freq.max(1.0),
                stats: edge.stats.clone(),
            })
        })
        .collect()
}

/// Synthetic flow-node kinds, one per (direction, polarity). "Right"
/// flows anchor1 to anchor2. The declaration order is the fixed column
/// order, not data dependent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BucketKind {
    RightPos,
    RightNeu,
    RightNeg,
    LeftPos,
    LeftNeu,
    LeftNeg,
}

impl BucketKind {
    fn from_edge(flows_right: bool, polarity: Polarity) -> Self {
        match (flows_right, polarity) {
            (true, Polarity::Positive) => Self::RightPos,
            (true, Polarity::Neutral) => Self::RightNeu,
            (true, Polarity::Negative) => Self::RightNeg,
            (false, Polarity::Positive) => Self::LeftPos,
            (false, Polarity::Neutral) => Self::LeftNeu,
            (false, Polarity::Negative) => Self::LeftNeg,
        }
    }

    pub fn flows_right(self) -> bool {
        matches!(self, Self::RightPos | Self::RightNeu | Self::RightNeg)
    }

    pub fn polarity(self) -> Polarity {
        match self {
            Self::RightPos | Self::LeftPos => Polarity::Positive,
            Self::RightNeu | Self::LeftNeu => Polarity::Neutral,
            Self::RightNeg | Self::LeftNeg => Polarity::Negative,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RelationBucket {
    pub kind: BucketKind,
    pub total: f64,
    pub edges: Vec<InducedEdge>,
}

/// Which half of the bucket bracket a synthetic link belongs to: the
/// leg entering the bucket from its upstream anchor, or the leg leaving
/// toward the downstream anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowLeg {
    In,
    Out,
}

#[derive(Clone, Debug)]
pub struct FlowLink {
    pub bucket: usize,
    pub leg: FlowLeg,
    pub value: f64,
    pub edge: usize,
}

#[derive(Clone, Debug)]
pub struct RelationGraph {
    pub anchor1: String,
    pub anchor2: String,
    pub buckets: Vec<RelationBucket>,
    pub links: Vec<FlowLink>,
}

/// Group the induced edges into direction/polarity buckets and bracket
/// each original edge with an in-leg and an out-leg of equal value.
pub fn build_relation_graph(
    anchor1: String,
    anchor2: String,
    edges: Vec<InducedEdge>,
) -> RelationGraph {
    let a1 = entity_curie(&anchor1);
    let a2 = entity_curie(&anchor2);

    let mut buckets: Vec<RelationBucket> = Vec::new();
    for edge in edges {
        let flows_right = edge.source == a1 && edge.target == a2;
        let kind = BucketKind::from_edge(flows_right, edge.polarity);
        let index = match buckets.iter().position(|bucket| bucket.kind == kind) {
            Some(index) => index,
            None => {
                buckets.push(RelationBucket {
                    kind,
                    total: 0.0,
                    edges: Vec::new(),
                });
                buckets.len() - 1
            }
        };
        buckets[index].total += edge.freq;
        buckets[index].edges.push(edge);
    }
    buckets.sort_by_key(|bucket| bucket.kind);

    let mut links = Vec::new();
    for (bucket_index, bucket) in buckets.iter().enumerate() {
        for (edge_index, edge) in bucket.edges.iter().enumerate() {
            for leg in [FlowLeg::In, FlowLeg::Out] {
                links.push(FlowLink {
                    bucket: bucket_index,
                    leg,
                    value: edge.freq,
                    edge: edge_index,
                });
            }
        }
    }

    RelationGraph {
        anchor1,
        anchor2,
        buckets,
        links,
    }
}

/// The `(source, target, polarity)` key handed to the evidence
/// collaborator when a bucket is clicked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvidenceKey {
    pub source: String,
    pub target: String,
    pub polarity: Polarity,
}

impl RelationGraph {
    pub fn evidence_key(&self, bucket: &RelationBucket) -> EvidenceKey {
        let (source, target) = if bucket.kind.flows_right() {
            (self.anchor1.clone(), self.anchor2.clone())
        } else {
            (self.anchor2.clone(), self.anchor1.clone())
        };
        EvidenceKey {
            source,
            target,
            polarity: bucket.kind.polarity(),
        }
    }
}

pub struct RelationState {
    pub graph: RelationGraph,
    /// Display labels for the two anchors, resolved from the live node
    /// set or the interaction response's context nodes.
    pub anchor_labels: [String; 2],
}

impl RelationState {
    pub fn new(graph: RelationGraph, anchor_labels: [String; 2]) -> Self {
        Self {
            graph,
            anchor_labels,
        }
    }
}

/// Secondary force parameters for relation mode: link springs off,
/// softened repulsion, and category attractors moved onto an ellipse so
/// the middle of the viewport stays free for the flow diagram.
pub fn relation_force_config(root: &ForceConfig, viewport: Vec2) -> ForceConfig {
    let mut config = *root;
    config.link.enabled = false;
    config.charge.strength = root.charge.strength * 0.4;
    config.separation.strength = root.separation.strength.max(0.12);
    config.separation.centers =
        category_centers_ellipse(viewport.x * 0.42, viewport.y * 0.36, viewport);
    config.radial.enabled = false;
    config
}

const ANCHOR_WIDTH: f32 = 18.0;
const BUCKET_WIDTH: f32 = 14.0;
const BUCKET_GAP: f32 = 10.0;

pub struct Ribbon {
    pub bucket: usize,
    pub from: Pos2,
    pub to: Pos2,
    pub thickness: f32,
}

pub struct SankeyLayout {
    pub anchor_boxes: [Rect; 2],
    pub bucket_boxes: Vec<Rect>,
    pub ribbons: Vec<Ribbon>,
}

impl SankeyLayout {
    /// Standard flow layout: anchors pinned to the horizontal extents,
    /// buckets stacked in their fixed order in the middle column, node
    /// heights and ribbon thicknesses proportional to flow.
    pub fn compute(graph: &RelationGraph, band: Rect) -> Self {
        let flow_total: f64 = graph.buckets.iter().map(|bucket| bucket.total).sum();
        let bucket_count = graph.buckets.len();
        if flow_total <= 0.0 || bucket_count == 0 {
            return Self {
                anchor_boxes: [
                    Rect::from_min_size(band.left_top(), vec2(ANCHOR_WIDTH, band.height())),
                    Rect::from_min_size(
                        pos2(band.right() - ANCHOR_WIDTH, band.top()),
                        vec2(ANCHOR_WIDTH, band.height()),
                    ),
                ],
                bucket_boxes: Vec::new(),
                ribbons: Vec::new(),
            };
        }

        let gaps = BUCKET_GAP * (bucket_count.saturating_sub(1)) as f32;
        let scale = ((band.height() - gaps).max(10.0)) / flow_total as f32;

        let anchor_height = flow_total as f32 * scale;
        let anchor_top = band.center().y - anchor_height * 0.5;
        let anchor_boxes = [
            Rect::from_min_size(
                pos2(band.left(), anchor_top),
                vec2(ANCHOR_WIDTH, anchor_height),
            ),
            Rect::from_min_size(
                pos2(band.right() - ANCHOR_WIDTH, anchor_top),
                vec2(ANCHOR_WIDTH, anchor_height),
            ),
        ];

        let bucket_x = band.center().x - BUCKET_WIDTH * 0.5;
        let mut bucket_boxes = Vec::with_capacity(bucket_count);
        let mut y = band.center().y - (anchor_height + gaps) * 0.5;
        for bucket in &graph.buckets {
            let height = (bucket.total as f32 * scale).max(2.0);
            bucket_boxes.push(Rect::from_min_size(
                pos2(bucket_x, y),
                vec2(BUCKET_WIDTH, height),
            ));
            y += height + BUCKET_GAP;
        }

        // Stack ribbons down each anchor edge and each bucket edge in
        // link order.
        let mut anchor_offsets = [0.0f32; 2];
        let mut bucket_left_offsets = vec![0.0f32; bucket_count];
        let mut bucket_right_offsets = vec![0.0f32; bucket_count];

        let mut ribbons = Vec::with_capacity(graph.links.len());
        for link in &graph.links {
            let bucket = &graph.buckets[link.bucket];
            let bucket_box = bucket_boxes[link.bucket];
            let thickness = (link.value as f32 * scale).max(1.0);

            // In-legs attach at the upstream anchor, out-legs at the
            // downstream one; left-flowing buckets swap the sides.
            let anchor_side = match (bucket.kind.flows_right(), link.leg) {
                (true, FlowLeg::In) | (false, FlowLeg::Out) => 0,
                (true, FlowLeg::Out) | (false, FlowLeg::In) => 1,
            };
            let anchor_box = anchor_boxes[anchor_side];

            let (anchor_x, bucket_edge_x, bucket_offset) = if anchor_side == 0 {
                (
                    anchor_box.right(),
                    bucket_box.left(),
                    &mut bucket_left_offsets[link.bucket],
                )
            } else {
                (
                    anchor_box.left(),
                    bucket_box.right(),
                    &mut bucket_right_offsets[link.bucket],
                )
            };

            let from = pos2(
                anchor_x,
                anchor_box.top() + anchor_offsets[anchor_side] + thickness * 0.5,
            );
            let to = pos2(
                bucket_edge_x,
                bucket_box.top() + *bucket_offset + thickness * 0.5,
            );
            anchor_offsets[anchor_side] += thickness;
            *bucket_offset += thickness;

            ribbons.push(Ribbon {
                bucket: link.bucket,
                from,
                to,
                thickness,
            });
        }

        Self {
            anchor_boxes,
            bucket_boxes,
            ribbons,
        }
    }
}

fn sample_ribbon(from: Pos2, to: Pos2) -> Vec<Pos2> {
    const STEPS: usize = 24;
    let mid_x = (from.x + to.x) * 0.5;
    (0..=STEPS)
        .map(|i| {
            let t = i as f32 / STEPS as f32;
            let s = 1.0 - t;
            // Horizontal cubic with both control points at mid-span.
            let x = from.x * (s * s * s)
                + mid_x * (3.0 * s * s * t)
                + mid_x * (3.0 * s * t * t)
                + to.x * (t * t * t);
            let y = from.y * (s * s * s)
                + from.y * (3.0 * s * s * t)
                + to.y * (3.0 * s * t * t)
                + to.y * (t * t * t);
            pos2(x, y)
        })
        .collect()
}

impl ViewModel {
    pub(super) fn draw_relation(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::WHITE);

        self.note_viewport(rect.size());

        if self.simulation_enabled && self.sim.is_running() {
            self.sim.step();
            ui.ctx().request_repaint();
        }

        let Some(state) = self.relation.as_ref() else {
            ui.label("No relation selected.");
            return;
        };

        let anchor_indices = [
            self.sim.index_of(&state.graph.anchor1),
            self.sim.index_of(&state.graph.anchor2),
        ];

        // Context nodes drift toward the surrounding ellipse while the
        // diagram occupies the middle band.
        let world_center = self.sim.viewport() * 0.5;
        for (index, node) in self.sim.nodes().iter().enumerate() {
            if anchor_indices.contains(&Some(index)) {
                continue;
            }
            let position = world_to_screen(rect, self.pan, self.zoom, world_center, node.pos);
            if !rect.contains(position) {
                continue;
            }
            let radius = screen_radius(node.radius, self.zoom) * 0.8;
            let color = category_node_color(node.category).gamma_multiply(0.35);
            painter.circle_filled(position, radius, color);
        }

        let band = Rect::from_center_size(
            rect.center(),
            vec2(rect.width() * 0.62, rect.height() * 0.56),
        );
        let layout = SankeyLayout::compute(&state.graph, band);

        let pointer = response.hover_pos();
        let clicked = response.clicked();
        let mut clicked_key = None;

        for ribbon in &layout.ribbons {
            let polarity = state.graph.buckets[ribbon.bucket].kind.polarity();
            let points = sample_ribbon(ribbon.from, ribbon.to);
            painter.add(egui::Shape::line(
                points,
                Stroke::new(
                    ribbon.thickness,
                    polarity_fill(polarity).gamma_multiply(0.8),
                ),
            ));
        }

        for (index, bucket) in state.graph.buckets.iter().enumerate() {
            let bucket_box = layout.bucket_boxes[index];
            let polarity = bucket.kind.polarity();
            let hovered = pointer.is_some_and(|p| bucket_box.expand(3.0).contains(p));

            painter.rect_filled(bucket_box, 2.0, polarity_fill(polarity));
            painter.rect_stroke(
                bucket_box,
                2.0,
                Stroke::new(if hovered { 2.5 } else { 1.0 }, polarity_accent(polarity)),
                StrokeKind::Outside,
            );

            let arrow = if bucket.kind.flows_right() {
                "→"
            } else {
                "←"
            };
            painter.text(
                pos2(bucket_box.right() + 8.0, bucket_box.center().y),
                Align2::LEFT_CENTER,
                format!("{arrow} {} ({})", polarity.label(), bucket.total as u64),
                FontId::proportional(12.0),
                Color32::from_gray(60),
            );

            if hovered {
                ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);

                // Per-edge evidence weights under the bucket label; the
                // in-legs enumerate each contributing edge exactly once.
                let mut y = bucket_box.center().y + 16.0;
                for link in state
                    .graph
                    .links
                    .iter()
                    .filter(|link| link.bucket == index && link.leg == FlowLeg::In)
                {
                    let edge = &bucket.edges[link.edge];
                    let weight = compute_weight(&edge.stats, &self.coefficients);
                    painter.text(
                        pos2(bucket_box.right() + 8.0, y),
                        Align2::LEFT_TOP,
                        format!(
                            "{} ({}) W: {weight:.2}",
                            polarity.label(),
                            edge.freq as u64
                        ),
                        FontId::proportional(10.0),
                        Color32::from_gray(110),
                    );
                    y += 13.0;
                }

                if clicked {
                    clicked_key = Some(state.graph.evidence_key(bucket));
                }
            }
        }

        for (side, anchor_id) in [&state.graph.anchor1, &state.graph.anchor2]
            .into_iter()
            .enumerate()
        {
            let anchor_box = layout.anchor_boxes[side];
            let label = state.anchor_labels[side].clone();
            let category = match anchor_indices[side].map(|i| &self.sim.nodes()[i]) {
                Some(node) => Some(node.category),
                None => Category::from_entity_id(anchor_id),
            };
            let color = category
                .map(category_node_color)
                .unwrap_or(Color32::from_gray(90));

            painter.rect_filled(anchor_box, 3.0, color);
            let align = if side == 0 {
                Align2::LEFT_BOTTOM
            } else {
                Align2::RIGHT_BOTTOM
            };
            painter.text(
                pos2(
                    if side == 0 {
                        anchor_box.left()
                    } else {
                        anchor_box.right()
                    },
                    anchor_box.top() - 6.0,
                ),
                align,
                truncate_label(&label, 28),
                FontId::proportional(13.0),
                Color32::from_gray(40),
            );
        }

        // Keep the anchor simulation nodes glued to their diagram boxes
        // so leaving the view resumes from sensible positions.
        for (side, index) in anchor_indices.iter().enumerate() {
            if let Some(index) = *index {
                let world = screen_to_world(
                    rect,
                    self.pan,
                    self.zoom,
                    world_center,
                    layout.anchor_boxes[side].center(),
                );
                self.sim.pin_node(index, world);
            }
        }

        if let Some(key) = clicked_key {
            self.request_evidence(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str, polarity: Polarity, freq: f64) -> InducedEdge {
        InducedEdge {
            source: source.to_string(),
            target: target.to_string(),
            polarity,
            freq,
            stats: EvidenceStats {
                freq,
                ..EvidenceStats::default()
            },
        }
    }

    const A1: &str = "uniprot:P05231";
    const A2: &str = "go:GO:0006954";

    #[test]
    fn buckets_cover_only_present_combinations() {
        let graph = build_relation_graph(
            A1.to_string(),
            A2.to_string(),
            vec![
                edge(A1, A2, Polarity::Positive, 7.0),
                edge(A2, A1, Polarity::Negative, 3.0),
            ],
        );

        let kinds = graph
            .buckets
            .iter()
            .map(|bucket| bucket.kind)
            .collect::<Vec<_>>();
        assert_eq!(kinds, vec![BucketKind::RightPos, BucketKind::LeftNeg]);
    }

    #[test]
    fn every_edge_is_bracketed_by_two_equal_legs() {
        let graph = build_relation_graph(
            A1.to_string(),
            A2.to_string(),
            vec![
                edge(A1, A2, Polarity::Positive, 7.0),
                edge(A1, A2, Polarity::Positive, 2.0),
            ],
        );

        assert_eq!(graph.buckets.len(), 1);
        assert_eq!(graph.links.len(), 4);
        for edge_index in 0..2 {
            let legs = graph
                .links
                .iter()
                .filter(|link| link.edge == edge_index)
                .collect::<Vec<_>>();
            assert_eq!(legs.len(), 2);
            assert_eq!(legs[0].value, legs[1].value);
            assert!(legs.iter().any(|l| l.leg == FlowLeg::In));
            assert!(legs.iter().any(|l| l.leg == FlowLeg::Out));
        }
    }

    #[test]
    fn bucket_order_is_fixed() {
        let graph = build_relation_graph(
            A1.to_string(),
            A2.to_string(),
            vec![
                edge(A2, A1, Polarity::Negative, 1.0),
                edge(A1, A2, Polarity::Negative, 1.0),
                edge(A2, A1, Polarity::Positive, 1.0),
                edge(A1, A2, Polarity::Positive, 1.0),
            ],
        );

        let kinds = graph
            .buckets
            .iter()
            .map(|bucket| bucket.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                BucketKind::RightPos,
                BucketKind::RightNeg,
                BucketKind::LeftPos,
                BucketKind::LeftNeg,
            ]
        );
    }

    #[test]
    fn evidence_key_follows_bucket_direction() {
        let graph = build_relation_graph(
            A1.to_string(),
            A2.to_string(),
            vec![edge(A2, A1, Polarity::Negative, 3.0)],
        );
        let key = graph.evidence_key(&graph.buckets[0]);
        assert_eq!(key.source, A2);
        assert_eq!(key.target, A1);
        assert_eq!(key.polarity, Polarity::Negative);
    }

    #[test]
    fn layout_pins_anchors_to_the_extents() {
        let graph = build_relation_graph(
            A1.to_string(),
            A2.to_string(),
            vec![
                edge(A1, A2, Polarity::Positive, 6.0),
                edge(A2, A1, Polarity::Neutral, 2.0),
            ],
        );
        let band = Rect::from_min_size(pos2(100.0, 100.0), vec2(600.0, 400.0));
        let layout = SankeyLayout::compute(&graph, band);

        assert_eq!(layout.anchor_boxes[0].left(), band.left());
        assert_eq!(layout.anchor_boxes[1].right(), band.right());
        for bucket_box in &layout.bucket_boxes {
            assert!(bucket_box.left() > layout.anchor_boxes[0].right());
            assert!(bucket_box.right() < layout.anchor_boxes[1].left());
        }

        // Bucket heights are proportional to their flow totals.
        let heights = layout
            .bucket_boxes
            .iter()
            .map(|b| b.height())
            .collect::<Vec<_>>();
        assert!((heights[0] / heights[1] - 3.0).abs() < 0.1);

        // Two edges, two legs each.
        assert_eq!(layout.ribbons.len(), 4);
    }

    #[test]
    fn induced_edges_drop_context_edges() {
        let parsed: InteractionElements = {
            let raw: Vec<crate::api::CyData> = serde_json::from_str(
                r#"[
                    {"id": "e1", "source": "uniprot:P05231", "target": "go:GO:0006954",
                     "polarity": "positive", "freq": 4},
                    {"id": "e2", "source": "uniprot:P05231", "target": "mesh:D003920",
                     "polarity": "negative", "freq": 9}
                ]"#,
            )
            .unwrap();
            InteractionElements {
                nodes: Vec::new(),
                edges: raw,
            }
        };

        let induced = induced_edges(&parsed, A1, A2);
        assert_eq!(induced.len(), 1);
        assert_eq!(induced[0].polarity, Polarity::Positive);
        assert_eq!(induced[0].freq, 4.0);
    }

    #[test]
    fn bucket_weight_labels_use_local_formula() {
        let stats = EvidenceStats {
            freq: 4.0,
            avg_pvalue: 1.0,
            ..EvidenceStats::default()
        };
        let weight = compute_weight(&stats, &crate::weight::WeightCoefficients::default());
        assert!((weight - (5.0f64).ln()).abs() < 1e-9);
    }
}
