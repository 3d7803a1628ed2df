use std::collections::HashSet;

use foundation::math::Vec2;

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_size_px: f32,
    pub color: [f32; 4],
    pub halo_color: [f32; 4],
    pub halo_width_px: f32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size_px: 14.0,
            color: [1.0, 1.0, 1.0, 1.0],
            halo_color: [0.0, 0.0, 0.0, 0.85],
            halo_width_px: 2.0,
        }
    }
}

/// A label candidate already in screen space; `position` is the text center.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelAnchor {
    pub text: String,
    pub position: Vec2,
    pub priority: f32,
    pub style: LabelStyle,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LabelLayoutConfig {
    pub viewport_px: [f64; 2],
    pub cell_px: f64,
    pub padding_px: f64,
    pub max_labels: usize,
}

impl Default for LabelLayoutConfig {
    fn default() -> Self {
        Self {
            viewport_px: [1.0, 1.0],
            cell_px: 16.0,
            padding_px: 2.0,
            max_labels: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub text: String,
    pub position: Vec2,
    pub size_px: [f64; 2],
    pub priority: f32,
    pub style: LabelStyle,
}

/// Greedy occupancy-grid label placement.
///
/// Ordering contract: candidates are accepted in the order offered; a label
/// whose padded box touches an occupied cell is rejected. Callers offer the
/// most important labels first.
#[derive(Debug, Clone)]
pub struct LabelLayout {
    config: LabelLayoutConfig,
    occupied: HashSet<u64>,
    placed: usize,
}

impl LabelLayout {
    pub fn new(config: LabelLayoutConfig) -> Self {
        Self {
            config,
            occupied: HashSet::new(),
            placed: 0,
        }
    }

    pub fn placed(&self) -> usize {
        self.placed
    }

    pub fn try_place(&mut self, label: &LabelAnchor) -> Option<PlacedLabel> {
        if self.placed >= self.config.max_labels || !label.position.is_finite() {
            return None;
        }
        let text = label.text.trim();
        if text.is_empty() {
            return None;
        }

        let size = estimate_text_size(text, &label.style);
        let half_w = size[0] * 0.5 + self.config.padding_px;
        let half_h = size[1] * 0.5 + self.config.padding_px;
        let p = label.position;
        if p.x + half_w < 0.0
            || p.y + half_h < 0.0
            || p.x - half_w > self.config.viewport_px[0]
            || p.y - half_h > self.config.viewport_px[1]
        {
            return None;
        }

        if !try_place_label(&mut self.occupied, p, [half_w, half_h], self.config.cell_px) {
            return None;
        }
        self.placed += 1;
        Some(PlacedLabel {
            text: text.to_string(),
            position: p,
            size_px: size,
            priority: label.priority,
            style: label.style.clone(),
        })
    }
}

pub fn estimate_text_size(text: &str, style: &LabelStyle) -> [f64; 2] {
    let count = text.chars().count().max(1) as f64;
    let font = style.font_size_px as f64;
    [font * 0.6 * count, font]
}

fn cell_range(center: Vec2, half_size: [f64; 2], cell_px: f64) -> (i32, i32, i32, i32) {
    (
        ((center.x - half_size[0]) / cell_px).floor() as i32,
        ((center.x + half_size[0]) / cell_px).floor() as i32,
        ((center.y - half_size[1]) / cell_px).floor() as i32,
        ((center.y + half_size[1]) / cell_px).floor() as i32,
    )
}

fn try_place_label(
    occupied: &mut HashSet<u64>,
    center: Vec2,
    half_size: [f64; 2],
    cell_px: f64,
) -> bool {
    let (min_x, max_x, min_y, max_y) = cell_range(center, half_size, cell_px);

    for cy in min_y..=max_y {
        for cx in min_x..=max_x {
            if occupied.contains(&cell_key(cx, cy)) {
                return false;
            }
        }
    }

    for cy in min_y..=max_y {
        for cx in min_x..=max_x {
            occupied.insert(cell_key(cx, cy));
        }
    }

    true
}

fn cell_key(cx: i32, cy: i32) -> u64 {
    ((cx as u64) << 32) ^ (cy as u32 as u64)
}
