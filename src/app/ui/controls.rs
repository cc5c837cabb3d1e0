use eframe::egui::{self, Color32, FontId, TextFormat, Ui, text::LayoutJob};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::api::Category;
use crate::weight::ScaleMode;

use super::super::{ViewMode, ViewModel};

/// Render an entity label with the fuzzy-matched characters emphasized.
fn highlighted_label(label: &str, query: &str) -> LayoutJob {
    let matcher = SkimMatcherV2::default();
    let indices = matcher
        .fuzzy_indices(label, query)
        .map(|(_, indices)| indices)
        .unwrap_or_default();

    let mut job = LayoutJob::default();
    let plain = TextFormat {
        font_id: FontId::proportional(13.0),
        color: Color32::from_gray(160),
        ..Default::default()
    };
    let emphasized = TextFormat {
        font_id: FontId::proportional(13.0),
        color: Color32::from_rgb(0x1d, 0x6f, 0xd6),
        ..Default::default()
    };

    for (position, character) in label.chars().enumerate() {
        let format = if indices.contains(&position) {
            emphasized.clone()
        } else {
            plain.clone()
        };
        job.append(&character.to_string(), 0.0, format);
    }
    job
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Controls");
        ui.separator();

        let root_view = self.view_mode == ViewMode::Root;

        egui::CollapsingHeader::new("Entity")
            .default_open(true)
            .show(ui, |ui| {
                ui.add_enabled_ui(root_view, |ui| self.draw_entity_controls(ui));
            });

        egui::CollapsingHeader::new("Weight coefficients")
            .default_open(false)
            .show(ui, |ui| self.draw_weight_controls(ui));

        egui::CollapsingHeader::new("Visual")
            .default_open(false)
            .show(ui, |ui| self.draw_visual_controls(ui));

        egui::CollapsingHeader::new("Graph parameters")
            .default_open(false)
            .show(ui, |ui| {
                ui.add_enabled_ui(root_view, |ui| self.draw_parameter_controls(ui));
            });
    }

    fn draw_entity_controls(&mut self, ui: &mut Ui) {
        ui.label("Search for entity");
        let search_response = ui.text_edit_singleline(&mut self.search_text);
        if search_response.changed() {
            self.request_search();
        }

        if let Some(error) = &self.fetches.search.error {
            ui.colored_label(Color32::from_rgb(0xdc, 0x35, 0x45), error.clone());
        }

        let mut add_seed = None;
        for result in &self.search_results {
            let already_seeded = self.seeds.iter().any(|seed| seed == &result.id);
            let job = highlighted_label(result.display_label(), self.search_text.trim());
            let category_label = Category::from_number(result.category)
                .map(Category::short_label)
                .unwrap_or("?");
            ui.horizontal(|ui| {
                ui.label(job);
                ui.label(
                    egui::RichText::new(format!("{} · {category_label}", result.id))
                        .small()
                        .color(Color32::from_gray(130)),
                );
                if ui
                    .add_enabled(!already_seeded, egui::Button::new("Add").small())
                    .clicked()
                {
                    add_seed = Some(result.id.clone());
                }
            });
        }
        if let Some(id) = add_seed {
            self.seeds.push(id);
            self.request_subgraph();
        }

        ui.add_space(6.0);
        ui.label("Query entities");
        let mut remove_seed = None;
        for (index, seed) in self.seeds.iter().enumerate() {
            ui.horizontal(|ui| {
                ui.label(seed.as_str());
                if self.seeds.len() > 1 && ui.small_button("✕").clicked() {
                    remove_seed = Some(index);
                }
            });
        }
        if let Some(index) = remove_seed {
            self.seeds.remove(index);
            self.request_subgraph();
        }

        ui.add_space(6.0);
        let mut counts_changed = false;
        for category in Category::ALL {
            ui.horizontal(|ui| {
                ui.label(format!("{} entity count", category.short_label()));
                let drag = ui.add(
                    egui::DragValue::new(&mut self.category_counts[category.index()])
                        .range(3..=50),
                );
                counts_changed |= drag.changed();
            });
        }
        if counts_changed {
            self.request_subgraph();
        }
    }

    fn draw_weight_controls(&mut self, ui: &mut Ui) {
        let mut changed = false;
        let sliders = [
            ("Frequency", &mut self.coefficients.frequency),
            ("Has significance", &mut self.coefficients.has_significance),
            ("Avg significance", &mut self.coefficients.avg_significance),
            ("Avg impact factor", &mut self.coefficients.avg_impact_factor),
            ("Max impact factor", &mut self.coefficients.max_impact_factor),
            ("P-value", &mut self.coefficients.p_value),
        ];
        for (label, value) in sliders {
            changed |= ui
                .add(egui::Slider::new(value, 0.0..=2.0).text(label))
                .changed();
        }
        if changed {
            self.request_node_weights();
        }

        if let Some(error) = self.fetches.weights.error.clone() {
            ui.colored_label(Color32::from_rgb(0xdc, 0x35, 0x45), error);
            if ui.button("Retry").clicked() {
                self.request_node_weights();
            }
        }
    }

    fn draw_visual_controls(&mut self, ui: &mut Ui) {
        ui.add(
            egui::Slider::new(&mut self.visual.intercluster_opacity, 0.0..=1.0)
                .text("Inter category link opacity"),
        );
        ui.add(
            egui::Slider::new(&mut self.visual.intracluster_opacity, 0.0..=1.0)
                .text("Between category link opacity"),
        );
        ui.add(
            egui::Slider::new(&mut self.visual.label_opacity, 0.0..=1.0)
                .text("Entity label opacity"),
        );

        let max_radius = ui.add(
            egui::Slider::new(&mut self.visual.max_radius, 1.0..=50.0)
                .text("Maximum entity radius"),
        );
        if max_radius.changed() {
            self.refit_radii();
        }
    }

    fn draw_parameter_controls(&mut self, ui: &mut Ui) {
        let mut simulation_enabled = self.simulation_enabled;
        if ui
            .checkbox(&mut simulation_enabled, "Simulation")
            .changed()
        {
            self.simulation_enabled = simulation_enabled;
            if simulation_enabled {
                self.sim.restart(1.0);
            } else {
                self.sim.stop();
            }
        }

        let mut log_scale = self.scale_mode == ScaleMode::Log;
        if ui
            .checkbox(&mut log_scale, "Logarithmic node radius scale")
            .changed()
        {
            self.scale_mode = if log_scale {
                ScaleMode::Log
            } else {
                ScaleMode::Linear
            };
            self.refit_radii();
        }

        let radial = ui.checkbox(&mut self.forces.radial.enabled, "Radial category layout");
        let separation = ui.add(
            egui::Slider::new(&mut self.forces.separation.strength, 0.0..=1.0)
                .text("Separation factor"),
        );
        let link_strength = ui.add(
            egui::Slider::new(&mut self.forces.link.strength, 0.0..=1.0).text("Link strength"),
        );
        if radial.changed() || separation.changed() || link_strength.changed() {
            self.update_forces();
        }
    }
}
