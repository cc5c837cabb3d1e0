use eframe::egui::{Color32, RichText, Ui};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Entity detail");
        ui.separator();

        let Some(detail) = self.detail.clone() else {
            ui.label("Hover an entity to inspect it.");
            return;
        };

        ui.label(RichText::new(detail.label.as_str()).strong().underline());
        ui.add_space(4.0);
        ui.label(format!("ID: {}", detail.id));
        ui.label(format!("Category: {}", detail.category.label()));
        ui.label(format!("Degree: {}", detail.degree));

        ui.add_space(6.0);
        ui.label(RichText::new("Detected synonyms").strong());
        if let Some(error) = &self.fetches.synonyms.error {
            ui.colored_label(Color32::from_rgb(0xdc, 0x35, 0x45), error.clone());
        } else if self.fetches.synonyms.in_flight() {
            ui.spinner();
        } else if self.synonyms.is_empty() {
            ui.label("none");
        } else {
            for synonym in &self.synonyms {
                ui.label(format!("• {synonym}"));
            }
        }

        if let Some(armed) = self.pair_selection.armed_id() {
            ui.add_space(8.0);
            ui.label(
                RichText::new(format!("Armed for pair selection: {armed}"))
                    .color(Color32::from_rgb(0xb8, 0x86, 0x0b)),
            );
            ui.label(
                RichText::new("Click a second entity to open the relation view.")
                    .small()
                    .color(Color32::from_gray(120)),
            );
        }
    }
}
