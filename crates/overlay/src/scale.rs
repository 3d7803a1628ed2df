use foundation::math::Vec2;
use layers::{Stroke, Surface};

use crate::marker::{MarkerSamples, PhaseMarker};
use crate::path::VideoPath;

/// Maps capture pixels to displayed pixels.
///
/// A non-positive original dimension leaves that axis unscaled.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DisplayScale {
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl DisplayScale {
    pub fn new(original: [f64; 2], rendered: [f64; 2]) -> Self {
        let axis = |o: f64, r: f64| if o > 0.0 && r.is_finite() { r / o } else { 1.0 };
        Self {
            scale_x: axis(original[0], rendered[0]),
            scale_y: axis(original[1], rendered[1]),
        }
    }

    pub fn apply(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x * self.scale_x, p.y * self.scale_y)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarkerStyle {
    pub radius: f64,
    pub stroke: Stroke,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 8.0,
            stroke: Stroke::new([1.0, 0.85, 0.2, 1.0], 2.0),
        }
    }
}

/// Paths over a video element, positioned by playback time.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOverlay {
    original: [f64; 2],
    scale: DisplayScale,
    paths: Vec<VideoPath>,
}

impl VideoOverlay {
    pub fn new(original: [f64; 2], paths: Vec<VideoPath>) -> Self {
        Self {
            original,
            scale: DisplayScale::default(),
            paths,
        }
    }

    /// The video element was laid out at a new size.
    pub fn resize(&mut self, rendered: [f64; 2]) {
        self.scale = DisplayScale::new(self.original, rendered);
    }

    pub fn scale(&self) -> DisplayScale {
        self.scale
    }

    /// Displayed marker positions at playback time `t`, one per path.
    pub fn markers_at(&self, t: f64) -> Vec<Option<Vec2>> {
        self.paths
            .iter()
            .map(|path| path.interpolate(t).map(|p| self.scale.apply(p)))
            .collect()
    }

    pub fn draw<S: Surface>(&self, surface: &mut S, t: f64, style: &MarkerStyle) -> usize {
        let mut drawn = 0;
        for p in self.markers_at(t).into_iter().flatten() {
            surface.circle(p, style.radius, None, Some(style.stroke));
            drawn += 1;
        }
        drawn
    }
}

/// Phase markers over a still image, stepped through their samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOverlay {
    original: [f64; 2],
    scale: DisplayScale,
    markers: Vec<PhaseMarker>,
    phase: f64,
}

impl ImageOverlay {
    pub fn new(original: [f64; 2], markers: &[MarkerSamples]) -> Self {
        Self {
            original,
            scale: DisplayScale::default(),
            markers: markers.iter().map(PhaseMarker::from).collect(),
            phase: 0.0,
        }
    }

    pub fn resize(&mut self, rendered: [f64; 2]) {
        self.scale = DisplayScale::new(self.original, rendered);
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
        for m in &mut self.markers {
            m.set_position(phase);
        }
    }

    /// Moves every marker to the next sample.
    pub fn step(&mut self) {
        self.set_phase(self.phase.floor() + 1.0);
    }

    pub fn advance(&mut self, dt: f64) {
        for m in &mut self.markers {
            m.advance(dt);
        }
    }

    /// Displayed position and opacity of each visible marker.
    pub fn visible(&self) -> Vec<(Vec2, f64)> {
        self.markers
            .iter()
            .filter(|m| m.is_visible())
            .filter_map(|m| Some((self.scale.apply(m.position()?), m.opacity())))
            .collect()
    }

    pub fn draw<S: Surface>(&self, surface: &mut S, style: &MarkerStyle) -> usize {
        let visible = self.visible();
        for (p, opacity) in &visible {
            let mut stroke = style.stroke;
            stroke.color[3] *= *opacity as f32;
            surface.circle(*p, style.radius, None, Some(stroke));
        }
        visible.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplayScale, ImageOverlay, MarkerStyle, VideoOverlay};
    use crate::marker::MarkerSamples;
    use crate::path::{PathSample, VideoPath};
    use foundation::math::Vec2;
    use layers::DisplayList;

    #[test]
    fn scale_follows_rendered_size() {
        let s = DisplayScale::new([1920.0, 1080.0], [960.0, 540.0]);
        assert_eq!(s.scale_x, 0.5);
        assert_eq!(s.scale_y, 0.5);
        assert_eq!(s.apply(Vec2::new(100.0, 50.0)), Vec2::new(50.0, 25.0));
        assert_eq!(DisplayScale::new([0.0, 10.0], [5.0, 5.0]).scale_x, 1.0);
    }

    #[test]
    fn video_markers_are_scaled_and_hidden_out_of_range() {
        let path = VideoPath::new(vec![
            PathSample::new(0.0, 0.0, 0.0),
            PathSample::new(100.0, 100.0, 10.0),
        ]);
        let mut overlay = VideoOverlay::new([200.0, 200.0], vec![path]);
        overlay.resize([400.0, 100.0]);
        assert_eq!(overlay.markers_at(5.0), vec![Some(Vec2::new(100.0, 25.0))]);
        assert_eq!(overlay.markers_at(12.0), vec![None]);

        let mut list = DisplayList::new();
        assert_eq!(overlay.draw(&mut list, 5.0, &MarkerStyle::default()), 1);
        assert_eq!(overlay.draw(&mut list, -3.0, &MarkerStyle::default()), 0);
    }

    #[test]
    fn image_overlay_cycles_and_fades() {
        let samples = MarkerSamples {
            samples: vec![Some([10.0, 10.0]), Some([20.0, 10.0]), Some([30.0, 10.0])],
        };
        let mut overlay = ImageOverlay::new([100.0, 100.0], &[samples]);
        overlay.resize([200.0, 200.0]);
        assert!(overlay.visible().is_empty());

        overlay.set_phase(0.0);
        overlay.advance(0.25);
        let visible = overlay.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].0, Vec2::new(20.0, 20.0));
        assert!((visible[0].1 - 0.5).abs() < 1e-12);

        overlay.step();
        overlay.step();
        overlay.step();
        assert_eq!(overlay.phase(), 3.0);
        assert_eq!(overlay.visible()[0].0, Vec2::new(20.0, 20.0));
    }
}
