use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use foundation::bounds::Aabb2;
use foundation::math::Vec2;

use crate::raster::{
    PixelBuffer, fill_circle, fill_polygon, fill_rect, stroke_polyline, stroke_segment,
};

/// Narrowest stroke stamped on the picking buffer, in pixels.
///
/// Features are widened to at least this so thin lines stay easy to hit.
pub const MIN_PICK_WIDTH: f64 = 6.0;

/// 24-bit RGB value identifying one registered shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColorKey(u32);

impl ColorKey {
    pub const BACKGROUND: ColorKey = ColorKey(0x000000);
    const MAX: u32 = 0xFF_FFFF;

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn rgb(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }
}

/// Opaque id of a pickable feature, valid for one draw pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum PickGeometry {
    Line { a: Vec2, b: Vec2 },
    Polyline(Vec<Vec2>),
    Polygon(Vec<Vec2>),
    Circle { center: Vec2, radius: f64 },
    Box(Aabb2),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickError {
    /// Every non-background color is already taken in this pass.
    PaletteExhausted,
}

impl std::fmt::Display for PickError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickError::PaletteExhausted => write!(f, "no free pick colors left in this pass"),
        }
    }
}

impl std::error::Error for PickError {}

/// Off-screen color-keyed hit-test surface.
///
/// Each registration stamps its shape in a fresh random color and records
/// `color -> feature`. A pick is then one pixel read and one map lookup.
/// Colors are not stable across passes: call [`PickingCanvas::reset`] and
/// re-register whenever the drawn geometry changes.
///
/// Where shapes overlap, the one registered last wins.
#[derive(Debug)]
pub struct PickingCanvas<P> {
    buffer: PixelBuffer,
    colors: HashMap<ColorKey, FeatureId>,
    payloads: HashMap<FeatureId, P>,
    rng: StdRng,
}

impl<P> PickingCanvas<P> {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_rng(width, height, StdRng::from_os_rng())
    }

    /// Deterministic color assignment, for tests and replays.
    pub fn with_seed(width: u32, height: u32, seed: u64) -> Self {
        Self::with_rng(width, height, StdRng::seed_from_u64(seed))
    }

    fn with_rng(width: u32, height: u32, rng: StdRng) -> Self {
        Self {
            buffer: PixelBuffer::new(width, height, ColorKey::BACKGROUND.value()),
            colors: HashMap::new(),
            payloads: HashMap::new(),
            rng,
        }
    }

    /// Clears the buffer to the background and forgets every feature.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.buffer = PixelBuffer::new(width, height, ColorKey::BACKGROUND.value());
        self.colors.clear();
        self.payloads.clear();
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Number of shapes registered in this pass.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    fn allocate_color(&mut self) -> Result<ColorKey, PickError> {
        if self.colors.len() >= ColorKey::MAX as usize {
            return Err(PickError::PaletteExhausted);
        }
        loop {
            let candidate = ColorKey(self.rng.random_range(1..=ColorKey::MAX));
            if !self.colors.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
    }

    /// Stamps `geometry` for feature `id`. `width` is the stroke width for
    /// lines and outlines; it is raised to [`MIN_PICK_WIDTH`].
    pub fn register(
        &mut self,
        id: FeatureId,
        payload: P,
        geometry: &PickGeometry,
        width: f64,
    ) -> Result<ColorKey, PickError> {
        let color = self.allocate_color()?;
        let value = color.value();
        let width = width.max(MIN_PICK_WIDTH);
        let buf = &mut self.buffer;
        match geometry {
            PickGeometry::Line { a, b } => {
                stroke_segment(buf, *a, *b, width, value);
            }
            PickGeometry::Polyline(points) => {
                stroke_polyline(buf, points, width, value);
            }
            PickGeometry::Polygon(ring) => {
                fill_polygon(buf, ring, value);
                // Outline too, so slivers stay pickable.
                let mut closed = ring.clone();
                if let Some(first) = ring.first() {
                    closed.push(*first);
                }
                stroke_polyline(buf, &closed, width, value);
            }
            PickGeometry::Circle { center, radius } => {
                fill_circle(buf, *center, radius.max(width / 2.0), value);
            }
            PickGeometry::Box(rect) => {
                let pad = ((width - rect.width().min(rect.height())) / 2.0).max(0.0);
                fill_rect(buf, rect.expand(pad), value);
            }
        }
        self.colors.insert(color, id);
        self.payloads.insert(id, payload);
        Ok(color)
    }

    pub fn register_line(
        &mut self,
        id: FeatureId,
        payload: P,
        a: Vec2,
        b: Vec2,
        width: f64,
    ) -> Result<ColorKey, PickError> {
        self.register(id, payload, &PickGeometry::Line { a, b }, width)
    }

    pub fn register_polyline(
        &mut self,
        id: FeatureId,
        payload: P,
        points: Vec<Vec2>,
        width: f64,
    ) -> Result<ColorKey, PickError> {
        self.register(id, payload, &PickGeometry::Polyline(points), width)
    }

    pub fn register_polygon(
        &mut self,
        id: FeatureId,
        payload: P,
        ring: Vec<Vec2>,
        width: f64,
    ) -> Result<ColorKey, PickError> {
        self.register(id, payload, &PickGeometry::Polygon(ring), width)
    }

    pub fn register_circle(
        &mut self,
        id: FeatureId,
        payload: P,
        center: Vec2,
        radius: f64,
    ) -> Result<ColorKey, PickError> {
        self.register(id, payload, &PickGeometry::Circle { center, radius }, MIN_PICK_WIDTH)
    }

    pub fn register_box(
        &mut self,
        id: FeatureId,
        payload: P,
        rect: Aabb2,
        width: f64,
    ) -> Result<ColorKey, PickError> {
        self.register(id, payload, &PickGeometry::Box(rect), width)
    }

    /// Feature under pixel `(x, y)`; `None` for background or off-canvas.
    pub fn resolve(&self, x: f64, y: f64) -> Option<FeatureId> {
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return None;
        }
        let value = self.buffer.get(x.floor() as u32, y.floor() as u32)?;
        let color = ColorKey(value);
        if color == ColorKey::BACKGROUND {
            return None;
        }
        self.colors.get(&color).copied()
    }

    pub fn payload(&self, id: FeatureId) -> Option<&P> {
        self.payloads.get(&id)
    }

    pub fn resolve_payload(&self, x: f64, y: f64) -> Option<(FeatureId, &P)> {
        let id = self.resolve(x, y)?;
        Some((id, self.payloads.get(&id)?))
    }
}

#[cfg(test)]
mod tests {
    use super::{ColorKey, FeatureId, MIN_PICK_WIDTH, PickingCanvas};
    use foundation::bounds::Aabb2;
    use foundation::math::Vec2;

    #[test]
    fn features_are_isolated_and_background_is_none() {
        let mut canvas: PickingCanvas<&str> = PickingCanvas::with_seed(100, 100, 7);
        let a = FeatureId(1);
        let b = FeatureId(2);
        canvas.register_circle(a, "a", Vec2::new(20.0, 20.0), 5.0).unwrap();
        canvas
            .register_box(b, "b", Aabb2::new([60.0, 60.0], [80.0, 80.0]), 1.0)
            .unwrap();

        assert_eq!(canvas.resolve(20.0, 20.0), Some(a));
        assert_eq!(canvas.resolve(70.0, 70.0), Some(b));
        assert_eq!(canvas.resolve(45.0, 45.0), None);
        assert_eq!(canvas.resolve(-1.0, 5.0), None);
        assert_eq!(canvas.resolve(500.0, 5.0), None);
        assert_eq!(canvas.resolve_payload(21.0, 19.0), Some((a, &"a")));
    }

    #[test]
    fn thin_lines_are_widened() {
        let mut canvas: PickingCanvas<()> = PickingCanvas::with_seed(50, 50, 1);
        let id = FeatureId(9);
        canvas
            .register_line(id, (), Vec2::new(0.0, 25.0), Vec2::new(50.0, 25.0), 0.5)
            .unwrap();
        let reach = MIN_PICK_WIDTH / 2.0 - 0.6;
        assert_eq!(canvas.resolve(25.0, 25.0 + reach), Some(id));
        assert_eq!(canvas.resolve(25.0, 25.0 - reach), Some(id));
        assert_eq!(canvas.resolve(25.0, 25.0 + MIN_PICK_WIDTH), None);

        let bend = FeatureId(10);
        let points = vec![Vec2::new(5.0, 5.0), Vec2::new(5.0, 15.0), Vec2::new(15.0, 15.0)];
        canvas.register_polyline(bend, (), points, 0.0).unwrap();
        assert_eq!(canvas.resolve(5.0, 10.0), Some(bend));
        assert_eq!(canvas.resolve(10.0, 15.0), Some(bend));
        assert_eq!(canvas.resolve(12.0, 8.0), None);
    }

    #[test]
    fn colors_are_distinct_and_never_background() {
        let mut canvas: PickingCanvas<u32> = PickingCanvas::with_seed(10, 10, 3);
        let mut seen = std::collections::HashSet::new();
        for i in 0..500 {
            let c = canvas
                .register_circle(FeatureId(i), i, Vec2::new(5.0, 5.0), 1.0)
                .unwrap();
            assert_ne!(c, ColorKey::BACKGROUND);
            assert_ne!(c.rgb(), [0, 0, 0]);
            assert!(seen.insert(c));
        }
        assert_eq!(canvas.len(), 500);
        // Last registration wins where shapes overlap.
        assert_eq!(canvas.resolve(5.0, 5.0), Some(FeatureId(499)));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut canvas: PickingCanvas<()> = PickingCanvas::with_seed(40, 40, 5);
        let ring = vec![
            Vec2::new(5.0, 5.0),
            Vec2::new(35.0, 5.0),
            Vec2::new(35.0, 35.0),
            Vec2::new(5.0, 35.0),
        ];
        canvas.register_polygon(FeatureId(4), (), ring, 1.0).unwrap();
        assert_eq!(canvas.resolve(20.0, 20.0), Some(FeatureId(4)));

        canvas.reset(60, 30);
        assert!(canvas.is_empty());
        assert_eq!(canvas.resolve(20.0, 20.0), None);
        assert_eq!(canvas.payload(FeatureId(4)), None);
        assert_eq!((canvas.width(), canvas.height()), (60, 30));
    }
}
