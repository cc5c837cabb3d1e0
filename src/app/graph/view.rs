use eframe::egui::{
    self, Align2, Color32, FontId, Pos2, Sense, Shape, Stroke, Ui, Vec2,
};

use crate::api::{Category, Polarity};
use crate::geometry::{convex_hull, smooth_hull};
use crate::util::truncate_label;

use super::super::render_utils::{
    category_hull_color, category_node_color, polarity_accent, screen_radius, screen_to_world,
    with_opacity, world_to_screen,
};
use super::super::ViewModel;

const HULL_PADDING: f32 = 25.0;

fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let length_sq = ab.length_sq();
    if length_sq <= f32::EPSILON {
        return a.distance(point);
    }
    let t = ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    (a + ab * t).distance(point)
}

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::WHITE);

        self.note_viewport(rect.size());
        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);

        if self.simulation_enabled && self.sim.is_running() {
            self.sim.step();
            ui.ctx().request_repaint();
        }

        let pan = self.pan;
        let zoom = self.zoom;
        let world_center = self.sim.viewport() * 0.5;

        let mut screen_positions = Vec::with_capacity(self.sim.nodes().len());
        let mut screen_radii = Vec::with_capacity(self.sim.nodes().len());
        for node in self.sim.nodes() {
            screen_positions.push(world_to_screen(rect, pan, zoom, world_center, node.pos));
            screen_radii.push(screen_radius(node.radius, zoom));
        }

        self.draw_category_hulls(&painter, rect);

        let pointer = response.hover_pos();
        let hovered = self.hovered_node_at(pointer, &screen_positions, &screen_radii);

        // Link hit testing only matters while no node is under the
        // pointer.
        let mut hovered_link = None;
        if hovered.is_none()
            && let Some(pointer) = pointer
        {
            let mut best = 6.0f32;
            for (index, link) in self.sim.links().iter().enumerate() {
                let distance = distance_to_segment(
                    pointer,
                    screen_positions[link.source],
                    screen_positions[link.target],
                );
                if distance < best {
                    best = distance;
                    hovered_link = Some(index);
                }
            }
        }

        for (index, link) in self.sim.links().iter().enumerate() {
            let start = screen_positions[link.source];
            let end = screen_positions[link.target];

            let opacity = if link.same_category {
                self.visual.intracluster_opacity
            } else {
                self.visual.intercluster_opacity
            };
            let endpoint_hovered =
                hovered == Some(link.source) || hovered == Some(link.target);
            let is_hovered = hovered_link == Some(index) || endpoint_hovered;

            let base_color = match link.polarity {
                Polarity::Neutral => Color32::from_gray(110),
                polarity => polarity_accent(polarity),
            };
            let stroke = if is_hovered {
                Stroke::new(2.4, Color32::from_rgb(0x2b, 0x2b, 0x2b))
            } else {
                Stroke::new(1.2, with_opacity(base_color, opacity))
            };
            painter.line_segment([start, end], stroke);

            if is_hovered {
                painter.text(
                    end + Vec2::splat(16.0),
                    Align2::LEFT_TOP,
                    link.freq.to_string(),
                    FontId::proportional(11.0),
                    Color32::from_gray(70),
                );
            }
        }

        let armed_id = self.pair_selection.armed_id().map(str::to_owned);
        for (index, node) in self.sim.nodes().iter().enumerate() {
            let position = screen_positions[index];
            let radius = screen_radii[index];

            let base = category_node_color(node.category);
            let fill = if hovered == Some(index) {
                base.gamma_multiply(1.35)
            } else {
                base
            };
            painter.circle_filled(position, radius, fill);

            let endpoint_of_hovered_link = hovered_link.is_some_and(|link_index| {
                let link = &self.sim.links()[link_index];
                link.source == index || link.target == index
            });
            let stroke = if endpoint_of_hovered_link {
                Stroke::new(2.2, Color32::from_rgb(0x2b, 0x2b, 0x2b))
            } else if node.query_pinned {
                Stroke::new(2.0, Color32::from_gray(25))
            } else {
                Stroke::new(1.0, Color32::from_gray(60))
            };
            painter.circle_stroke(position, radius, stroke);

            if armed_id.as_deref() == Some(node.id.as_str()) {
                painter.circle_stroke(
                    position,
                    radius + 5.0,
                    Stroke::new(2.5, Color32::from_rgb(0xf5, 0xce, 0x5d)),
                );
            }

            if node.is_pinned() {
                painter.circle_filled(position, 2.0, Color32::from_gray(245));
            }

            if self.visual.label_opacity > 0.01 {
                painter.text(
                    position + Vec2::new(radius + 4.0, 0.0),
                    Align2::LEFT_CENTER,
                    truncate_label(&node.label, 26),
                    FontId::proportional(12.0),
                    with_opacity(Color32::from_gray(35), self.visual.label_opacity),
                );
            }
        }

        self.draw_legends(&painter, rect);

        if hovered.is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }
        if let Some(index) = hovered {
            self.set_detail_node(index);
        }

        self.handle_node_drag(rect, &response, hovered, pointer);

        if response.clicked() {
            if let Some(index) = hovered {
                let id = self.sim.nodes()[index].id.clone();
                if let Some((anchor1, anchor2)) = self.pair_selection.click(&id) {
                    self.request_relation(anchor1, anchor2);
                }
            } else if let Some(link_index) = hovered_link {
                // Clicking a relation line jumps straight to the pair
                // it connects.
                let link = &self.sim.links()[link_index];
                let (anchor1, anchor2) = (link.source_id.clone(), link.target_id.clone());
                self.request_relation(anchor1, anchor2);
            }
        }

        // The two single clicks of a double click arm and cancel the
        // same node, so the pair machine ends where it started.
        if response.double_clicked()
            && let Some(index) = hovered
        {
            let id = self.sim.nodes()[index].id.clone();
            self.toggle_seed(id);
        }
    }

    /// Dragging a node pins it under the pointer; releasing clears the
    /// pin again, so dragging is a placement assist rather than a
    /// permanent fixture.
    fn handle_node_drag(
        &mut self,
        rect: egui::Rect,
        response: &egui::Response,
        hovered: Option<usize>,
        pointer: Option<Pos2>,
    ) {
        let world_center = self.sim.viewport() * 0.5;

        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(index) = hovered
        {
            self.drag_node = Some(index);
            self.sim.set_alpha_target(0.3);
            if self.simulation_enabled {
                self.sim.restart(self.sim.alpha().max(0.3));
            }
        }

        if let Some(index) = self.drag_node {
            if let Some(pointer) = pointer
                && response.dragged_by(egui::PointerButton::Primary)
            {
                let world = screen_to_world(rect, self.pan, self.zoom, world_center, pointer);
                self.sim.pin_node(index, world);
            }

            if response.drag_stopped_by(egui::PointerButton::Primary) {
                self.sim.release_node(index);
                self.sim.set_alpha_target(0.001);
                self.drag_node = None;
            }
        }
    }

    fn draw_category_hulls(&self, painter: &egui::Painter, rect: egui::Rect) {
        let world_center = self.sim.viewport() * 0.5;
        for category in Category::ALL {
            let members = self
                .sim
                .nodes()
                .iter()
                .filter(|node| node.category == category)
                .map(|node| node.pos)
                .collect::<Vec<_>>();
            if members.is_empty() {
                continue;
            }

            let hull = convex_hull(&members);
            let outline = smooth_hull(&hull, HULL_PADDING);
            if outline.is_empty() {
                continue;
            }

            let screen_outline = outline
                .iter()
                .map(|point| {
                    world_to_screen(rect, self.pan, self.zoom, world_center, point.to_vec2())
                })
                .collect::<Vec<_>>();

            let color = category_hull_color(category);
            painter.add(Shape::convex_polygon(
                screen_outline,
                with_opacity(color, 0.30),
                Stroke::new(1.5, with_opacity(color, 0.85)),
            ));
        }
    }
}
