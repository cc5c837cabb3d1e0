use eframe::egui::{Color32, Pos2, Rect, Vec2};

use crate::api::{Category, Polarity};

/// Simulation space spans the simulation viewport; `world_center` is the
/// simulation viewport center (which lags the panel size while a resize
/// is being debounced).
pub(super) fn world_to_screen(
    rect: Rect,
    pan: Vec2,
    zoom: f32,
    world_center: Vec2,
    world: Vec2,
) -> Pos2 {
    rect.center() + pan + (world - world_center) * zoom
}

pub(super) fn screen_to_world(
    rect: Rect,
    pan: Vec2,
    zoom: f32,
    world_center: Vec2,
    screen: Pos2,
) -> Vec2 {
    (screen - rect.center() - pan) / zoom + world_center
}

pub(super) fn category_node_color(category: Category) -> Color32 {
    match category {
        Category::Protein => Color32::from_rgb(0x41, 0x1c, 0x58),
        Category::Disease => Color32::from_rgb(0x00, 0x30, 0x8e),
        Category::BiologicalProcess => Color32::from_rgb(0x8a, 0x2a, 0x44),
        Category::Chemical => Color32::from_rgb(0x10, 0x71, 0x2b),
    }
}

pub(super) fn category_hull_color(category: Category) -> Color32 {
    match category {
        Category::Protein => Color32::from_rgb(0xd2, 0x82, 0xbe),
        Category::Disease => Color32::from_rgb(0xa6, 0xd9, 0xef),
        Category::BiologicalProcess => Color32::from_rgb(0xff, 0xa7, 0x70),
        Category::Chemical => Color32::from_rgb(0xe5, 0xf6, 0x84),
    }
}

pub(super) fn polarity_fill(polarity: Polarity) -> Color32 {
    match polarity {
        Polarity::Positive => Color32::from_rgb(0xda, 0xf7, 0xa6),
        Polarity::Neutral => Color32::from_rgb(0xcf, 0xcf, 0xc4),
        Polarity::Negative => Color32::from_rgb(0xfa, 0xa0, 0xa0),
    }
}

pub(super) fn polarity_accent(polarity: Polarity) -> Color32 {
    match polarity {
        Polarity::Positive => Color32::from_rgb(0x77, 0xdd, 0x77),
        Polarity::Neutral => Color32::from_rgb(0x9a, 0x9a, 0x90),
        Polarity::Negative => Color32::from_rgb(0xff, 0x41, 0x37),
    }
}

pub(super) fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0) as u8;
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

pub(super) fn screen_radius(base_radius: f32, zoom: f32) -> f32 {
    (base_radius * zoom.powf(0.40)).clamp(2.0, 60.0)
}
