use crate::labels::LabelStyle;

pub type Rgba = [f32; 4];

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Stroke {
    pub color: Rgba,
    pub width: f64,
}

impl Stroke {
    pub const fn new(color: Rgba, width: f64) -> Self {
        Self { color, width }
    }
}

/// Colors and widths for every chart layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyStyle {
    pub background: Rgba,
    pub grid: Stroke,
    pub constellation_lines: Stroke,
    pub boundaries: Stroke,
    pub constellation_label: LabelStyle,
    pub star: Rgba,
    pub star_label: LabelStyle,
    pub dso: Stroke,
    pub overlay: Stroke,
    pub overlay_fill: Rgba,
    /// Star radius at the limiting magnitude, in pixels.
    pub star_min_radius: f64,
    /// Extra radius per magnitude brighter than the limit.
    pub star_radius_per_mag: f64,
    pub star_max_radius: f64,
}

impl Default for SkyStyle {
    fn default() -> Self {
        Self {
            background: [0.0, 0.0, 0.0, 1.0],
            grid: Stroke::new([0.3, 0.3, 0.5, 1.0], 0.5),
            constellation_lines: Stroke::new([0.4, 0.6, 0.8, 1.0], 1.0),
            boundaries: Stroke::new([0.5, 0.4, 0.3, 1.0], 0.5),
            constellation_label: LabelStyle {
                font_size_px: 12.0,
                color: [0.6, 0.7, 0.9, 1.0],
                ..LabelStyle::default()
            },
            star: [1.0, 1.0, 1.0, 1.0],
            star_label: LabelStyle {
                font_size_px: 11.0,
                color: [0.9, 0.9, 0.7, 1.0],
                ..LabelStyle::default()
            },
            dso: Stroke::new([0.5, 0.9, 0.5, 1.0], 1.0),
            overlay: Stroke::new([1.0, 0.4, 0.2, 1.0], 1.5),
            overlay_fill: [1.0, 0.4, 0.2, 0.15],
            star_min_radius: 0.5,
            star_radius_per_mag: 0.6,
            star_max_radius: 7.0,
        }
    }
}

impl SkyStyle {
    /// Disc radius for a star of magnitude `mag` when `limit` is the faintest drawn.
    pub fn star_radius(&self, mag: f64, limit: f64) -> f64 {
        let brighter_by = (limit - mag).max(0.0);
        (self.star_min_radius + self.star_radius_per_mag * brighter_by)
            .clamp(self.star_min_radius, self.star_max_radius)
    }
}

#[cfg(test)]
mod tests {
    use super::SkyStyle;

    #[test]
    fn brighter_stars_are_larger_within_bounds() {
        let style = SkyStyle::default();
        let faint = style.star_radius(8.0, 8.0);
        let bright = style.star_radius(2.0, 8.0);
        assert_eq!(faint, style.star_min_radius);
        assert!(bright > faint);
        assert_eq!(style.star_radius(-20.0, 8.0), style.star_max_radius);
        assert_eq!(style.star_radius(9.0, 8.0), style.star_min_radius);
    }
}
