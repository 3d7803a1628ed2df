use serde::{Deserialize, Serialize};

use foundation::math::Vec2;

/// Default fade-in duration in seconds.
pub const DEFAULT_FADE_IN_S: f64 = 0.5;

/// Marker that cycles over a few sampled positions on a still image.
///
/// The phase walks the samples cyclically: an integer phase snaps to a
/// sample, a fractional phase interpolates towards the next one. A missing
/// sample hides the marker. The first time the marker gets a position it
/// fades in over `fade_in_s`; after that it stays fully shown.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseMarker {
    samples: Vec<Option<Vec2>>,
    position: Option<Vec2>,
    opacity: f64,
    fade_in_s: f64,
    fading: bool,
}

impl PhaseMarker {
    pub fn new(samples: Vec<Option<Vec2>>) -> Self {
        Self {
            samples,
            position: None,
            opacity: 0.0,
            fade_in_s: DEFAULT_FADE_IN_S,
            fading: false,
        }
    }

    pub fn with_fade_in(mut self, seconds: f64) -> Self {
        self.fade_in_s = seconds.max(0.0);
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn sample(&self, i: usize) -> Option<Vec2> {
        self.samples.get(i).copied().flatten().filter(|p| p.is_finite())
    }

    pub fn set_position(&mut self, phase: f64) -> Option<Vec2> {
        let n = self.samples.len();
        self.position = if n == 0 || !phase.is_finite() {
            None
        } else {
            let p = phase.rem_euclid(n as f64);
            let i = (p.floor() as usize).min(n - 1);
            let frac = p - i as f64;
            let a = self.sample(i);
            if frac <= 0.0 {
                a
            } else {
                match (a, self.sample((i + 1) % n)) {
                    (Some(a), Some(b)) => Some(a.lerp(b, frac)),
                    _ => None,
                }
            }
        };

        if self.position.is_some() && !self.fading && self.opacity == 0.0 {
            self.fading = true;
            if self.fade_in_s == 0.0 {
                self.opacity = 1.0;
                self.fading = false;
            }
        }
        self.position
    }

    /// Advances the fade-in by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        if !self.fading || dt <= 0.0 {
            return;
        }
        self.opacity = (self.opacity + dt / self.fade_in_s).min(1.0);
        if self.opacity >= 1.0 {
            self.fading = false;
        }
    }

    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn is_visible(&self) -> bool {
        self.position.is_some() && self.opacity > 0.0
    }
}

/// Wire form of a phase marker: a list of `[x, y]` or `null` samples.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkerSamples {
    pub samples: Vec<Option<[f64; 2]>>,
}

impl From<&MarkerSamples> for PhaseMarker {
    fn from(wire: &MarkerSamples) -> Self {
        PhaseMarker::new(
            wire.samples
                .iter()
                .map(|s| s.map(|[x, y]| Vec2::new(x, y)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::PhaseMarker;
    use foundation::math::Vec2;

    fn marker() -> PhaseMarker {
        PhaseMarker::new(vec![
            Some(Vec2::new(0.0, 0.0)),
            Some(Vec2::new(10.0, 0.0)),
            Some(Vec2::new(10.0, 10.0)),
        ])
    }

    #[test]
    fn snaps_lerps_and_wraps() {
        let mut m = marker();
        assert_eq!(m.set_position(1.0), Some(Vec2::new(10.0, 0.0)));
        assert_eq!(m.set_position(1.5), Some(Vec2::new(10.0, 5.0)));
        assert_eq!(m.set_position(2.5), Some(Vec2::new(5.0, 5.0)));
        assert_eq!(m.set_position(4.0), Some(Vec2::new(10.0, 0.0)));
        assert_eq!(m.set_position(-1.0), Some(Vec2::new(10.0, 10.0)));
    }

    #[test]
    fn missing_sample_hides_marker() {
        let mut m = PhaseMarker::new(vec![
            Some(Vec2::new(1.0, 1.0)),
            None,
            Some(Vec2::new(3.0, 3.0)),
        ]);
        assert_eq!(m.set_position(1.0), None);
        assert_eq!(m.set_position(0.5), None);
        assert!(!m.is_visible());
        assert_eq!(m.set_position(2.0), Some(Vec2::new(3.0, 3.0)));
        assert_eq!(PhaseMarker::new(Vec::new()).set_position(0.0), None);
    }

    #[test]
    fn fades_in_once_then_stays() {
        let mut m = marker().with_fade_in(1.0);
        m.advance(0.5);
        assert_eq!(m.opacity(), 0.0);

        m.set_position(0.0);
        m.advance(0.25);
        assert!((m.opacity() - 0.25).abs() < 1e-12);
        m.advance(2.0);
        assert_eq!(m.opacity(), 1.0);

        m.set_position(1.0);
        assert_eq!(m.opacity(), 1.0);
        assert!(m.is_visible());
    }
}
