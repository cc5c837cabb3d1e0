use eframe::egui::{self, Pos2, Rect, Ui};

use super::super::ViewModel;
use super::super::render_utils::screen_to_world;

/// Two-click anchor-pair selection. The first click arms a node; a
/// second click on the same node cancels, on a different node completes
/// the pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PairSelection {
    #[default]
    Idle,
    Armed {
        node_id: String,
    },
}

impl PairSelection {
    /// Feed one node click through the machine; returns the completed
    /// pair when the click finishes a selection.
    pub fn click(&mut self, node_id: &str) -> Option<(String, String)> {
        match std::mem::take(self) {
            PairSelection::Idle => {
                *self = PairSelection::Armed {
                    node_id: node_id.to_string(),
                };
                None
            }
            PairSelection::Armed { node_id: first } => {
                if first == node_id {
                    None
                } else {
                    Some((first, node_id.to_string()))
                }
            }
        }
    }

    pub fn armed_id(&self) -> Option<&str> {
        match self {
            PairSelection::Idle => None,
            PairSelection::Armed { node_id } => Some(node_id),
        }
    }

    /// The armed id must always name a node that is still present;
    /// reconciliation calls this after swapping the node set.
    pub fn retain_present(&mut self, is_present: impl Fn(&str) -> bool) {
        if let PairSelection::Armed { node_id } = self
            && !is_present(node_id)
        {
            *self = PairSelection::Idle;
        }
    }
}

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_center = self.sim.viewport() * 0.5;
        let world_before = screen_to_world(rect, self.pan, self.zoom, world_center, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.05, 6.0);
        self.pan = pointer - rect.center() - ((world_before - world_center) * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    pub(in crate::app) fn hovered_node_at(
        &self,
        pointer: Option<Pos2>,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<usize> {
        let pointer = pointer?;
        screen_positions
            .iter()
            .enumerate()
            .filter_map(|(index, position)| {
                let distance = position.distance(pointer);
                if distance <= screen_radii[index].max(4.0) {
                    Some((index, distance))
                } else {
                    None
                }
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::PairSelection;

    #[test]
    fn second_click_on_same_node_cancels() {
        let mut selection = PairSelection::default();
        assert_eq!(selection.click("uniprot:P05231"), None);
        assert_eq!(selection.armed_id(), Some("uniprot:P05231"));

        assert_eq!(selection.click("uniprot:P05231"), None);
        assert_eq!(selection, PairSelection::Idle);
    }

    #[test]
    fn second_click_on_other_node_completes_pair() {
        let mut selection = PairSelection::default();
        selection.click("uniprot:P05231");
        let pair = selection.click("go:GO:0006954");
        assert_eq!(
            pair,
            Some(("uniprot:P05231".to_string(), "go:GO:0006954".to_string()))
        );
        assert_eq!(selection, PairSelection::Idle);
    }

    #[test]
    fn armed_id_is_cleared_when_node_disappears() {
        let mut selection = PairSelection::default();
        selection.click("uniprot:P05231");

        selection.retain_present(|id| id == "mesh:D003920");
        assert_eq!(selection, PairSelection::Idle);

        selection.click("mesh:D003920");
        selection.retain_present(|id| id == "mesh:D003920");
        assert_eq!(selection.armed_id(), Some("mesh:D003920"));
    }
}
