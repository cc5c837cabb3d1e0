use eframe::egui::{Align2, Color32, FontId, Painter, Rect, Stroke, pos2, vec2};

use crate::api::Category;

use super::super::ViewModel;
use super::super::render_utils::{category_hull_color, screen_radius};

const SWATCH_SIZE: f32 = 16.0;
const SIZE_LEGEND_STEPS: usize = 3;

impl ViewModel {
    pub(in crate::app) fn draw_legends(&self, painter: &Painter, rect: Rect) {
        let origin = rect.right_top() + vec2(-170.0, 20.0);

        for (row, category) in Category::ALL.into_iter().enumerate() {
            let top_left = origin + vec2(0.0, row as f32 * (SWATCH_SIZE + 5.0));
            let swatch = Rect::from_min_size(top_left, vec2(SWATCH_SIZE, SWATCH_SIZE));
            painter.rect_filled(swatch, 2.0, category_hull_color(category));
            painter.text(
                pos2(swatch.right() + 6.0, swatch.center().y),
                Align2::LEFT_CENTER,
                category.short_label(),
                FontId::proportional(12.0),
                Color32::from_gray(70),
            );
        }

        // Size legend: sample radii across the current weight domain.
        let weights = self.sim.nodes().iter().map(|node| node.weight);
        let (min_weight, max_weight) = weights.fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(low, high), weight| (low.min(weight), high.max(weight)),
        );
        if !min_weight.is_finite() || !max_weight.is_finite() {
            return;
        }

        let max_circle = screen_radius(self.radius_scale.radius(max_weight), self.zoom);
        let mut y = origin.y + 4.0 * (SWATCH_SIZE + 5.0) + 24.0;
        for step in 0..SIZE_LEGEND_STEPS {
            let t = step as f64 / (SIZE_LEGEND_STEPS - 1) as f64;
            let weight = min_weight + (max_weight - min_weight) * t;
            let radius = screen_radius(self.radius_scale.radius(weight), self.zoom);

            let center = pos2(origin.x + max_circle, y + max_circle);
            painter.circle_stroke(center, radius, Stroke::new(1.2, Color32::from_gray(120)));
            painter.text(
                pos2(origin.x + max_circle * 2.0 + 8.0, center.y),
                Align2::LEFT_CENTER,
                format!("{weight:.1}"),
                FontId::proportional(11.0),
                Color32::from_gray(90),
            );
            y += max_circle * 2.0 + 6.0;
        }
    }
}
