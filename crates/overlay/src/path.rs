use serde::{Deserialize, Serialize};

use foundation::math::Vec2;
use foundation::math::precision::stable_total_cmp_f64;

/// One `(x, y, t)` sample; serialized as a `[x, y, t]` array.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct PathSample {
    pub x: f64,
    pub y: f64,
    pub t: f64,
}

impl PathSample {
    pub fn new(x: f64, y: f64, t: f64) -> Self {
        Self { x, y, t }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<[f64; 3]> for PathSample {
    fn from([x, y, t]: [f64; 3]) -> Self {
        Self { x, y, t }
    }
}

impl From<PathSample> for [f64; 3] {
    fn from(s: PathSample) -> Self {
        [s.x, s.y, s.t]
    }
}

/// An object's track across video frames, in capture pixels.
///
/// Ordering contract: samples are kept sorted by `t`; samples with a
/// non-finite field are dropped on construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PathSample>", into = "Vec<PathSample>")]
pub struct VideoPath {
    samples: Vec<PathSample>,
}

impl From<Vec<PathSample>> for VideoPath {
    fn from(samples: Vec<PathSample>) -> Self {
        Self::new(samples)
    }
}

impl From<VideoPath> for Vec<PathSample> {
    fn from(path: VideoPath) -> Self {
        path.samples
    }
}

impl VideoPath {
    pub fn new(mut samples: Vec<PathSample>) -> Self {
        samples.retain(|s| s.x.is_finite() && s.y.is_finite() && s.t.is_finite());
        samples.sort_by(|a, b| stable_total_cmp_f64(a.t, b.t));
        Self { samples }
    }

    pub fn samples(&self) -> &[PathSample] {
        &self.samples
    }

    /// Position at playback time `t`.
    ///
    /// Linear between the bracketing samples. Times before the first or after
    /// the last sample have no position; a path is never extrapolated.
    pub fn interpolate(&self, t: f64) -> Option<Vec2> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        if !t.is_finite() || t < first.t || t > last.t {
            return None;
        }

        // First sample with time > t; the bracket is [i - 1, i].
        let i = self.samples.partition_point(|s| s.t <= t);
        if i == self.samples.len() {
            return Some(last.position());
        }
        let (a, b) = (self.samples[i - 1], self.samples[i]);
        let span = b.t - a.t;
        if span <= 0.0 {
            return Some(a.position());
        }
        Some(a.position().lerp(b.position(), (t - a.t) / span))
    }
}

#[cfg(test)]
mod tests {
    use super::{PathSample, VideoPath};
    use foundation::math::Vec2;
    use pretty_assertions::assert_eq;

    #[test]
    fn interpolates_inside_and_hides_outside() {
        let path = VideoPath::new(vec![
            PathSample::new(0.0, 0.0, 0.0),
            PathSample::new(10.0, 10.0, 10.0),
        ]);
        assert_eq!(path.interpolate(5.0), Some(Vec2::new(5.0, 5.0)));
        assert_eq!(path.interpolate(-1.0), None);
        assert_eq!(path.interpolate(11.0), None);
        assert_eq!(path.interpolate(0.0), Some(Vec2::new(0.0, 0.0)));
        assert_eq!(path.interpolate(10.0), Some(Vec2::new(10.0, 10.0)));
    }

    #[test]
    fn finds_bracket_in_longer_path() {
        let path = VideoPath::new(vec![
            PathSample::new(20.0, 0.0, 2.0),
            PathSample::new(0.0, 0.0, 0.0),
            PathSample::new(10.0, 0.0, 1.0),
            PathSample::new(f64::NAN, 0.0, 1.5),
        ]);
        assert_eq!(path.samples().len(), 3);
        assert_eq!(path.interpolate(1.5), Some(Vec2::new(15.0, 0.0)));
        assert_eq!(path.interpolate(1.0), Some(Vec2::new(10.0, 0.0)));
    }

    #[test]
    fn single_sample_matches_only_its_time() {
        let path = VideoPath::new(vec![PathSample::new(3.0, 4.0, 7.0)]);
        assert_eq!(path.interpolate(7.0), Some(Vec2::new(3.0, 4.0)));
        assert_eq!(path.interpolate(7.1), None);
        assert_eq!(VideoPath::default().interpolate(0.0), None);
    }

    #[test]
    fn deserializes_from_triples() {
        let path: VideoPath = serde_json::from_str("[[10, 10, 1], [0, 0, 0]]").unwrap();
        assert_eq!(path.samples()[0], PathSample::new(0.0, 0.0, 0.0));
        assert_eq!(path.interpolate(0.5), Some(Vec2::new(5.0, 5.0)));
    }
}
