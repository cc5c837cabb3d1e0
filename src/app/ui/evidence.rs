use eframe::egui::{Color32, RichText, Ui};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_evidence(&mut self, ui: &mut Ui) {
        ui.heading("Evidence");
        ui.separator();

        let Some(key) = self.evidence_key.clone() else {
            ui.label("Click a relation bucket to load its supporting sentences.");
            return;
        };

        ui.label(format!(
            "{} → {} ({})",
            key.source,
            key.target,
            key.polarity.label()
        ));
        ui.add_space(4.0);

        if let Some(error) = self.fetches.evidence.error.clone() {
            ui.colored_label(Color32::from_rgb(0xdc, 0x35, 0x45), error);
            if ui.button("Retry").clicked() {
                self.request_evidence(key);
            }
            return;
        }

        if self.fetches.evidence.in_flight() {
            ui.spinner();
            return;
        }

        if self.evidence_items.is_empty() {
            ui.label("No evidence sentences returned.");
            return;
        }

        for item in &self.evidence_items {
            ui.horizontal_wrapped(|ui| {
                if let Some(impact) = item.impact_value() {
                    ui.label(
                        RichText::new(format!("({impact:.2})"))
                            .strong()
                            .color(Color32::from_gray(90)),
                    );
                }
                if let Some(link) = &item.hyperlink {
                    ui.hyperlink_to("source", link.clone());
                }
                ui.label(item.display_text());
            });
            ui.add_space(2.0);
        }
    }
}
