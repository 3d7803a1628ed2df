/// Axis-aligned screen-space box in pixels.
///
/// `min` is inclusive, `max` is exclusive when converted to pixel spans.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// Smallest box containing all points. Returns `None` for an empty slice.
    pub fn from_points(points: &[[f64; 2]]) -> Option<Self> {
        let first = points.first()?;
        let mut b = Aabb2::new(*first, *first);
        for p in &points[1..] {
            b.min[0] = b.min[0].min(p[0]);
            b.min[1] = b.min[1].min(p[1]);
            b.max[0] = b.max[0].max(p[0]);
            b.max[1] = b.max[1].max(p[1]);
        }
        Some(b)
    }

    pub fn expand(self, by: f64) -> Self {
        Aabb2::new(
            [self.min[0] - by, self.min[1] - by],
            [self.max[0] + by, self.max[1] + by],
        )
    }

    pub fn width(&self) -> f64 {
        (self.max[0] - self.min[0]).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max[1] - self.min[1]).max(0.0)
    }

    pub fn contains(&self, p: [f64; 2]) -> bool {
        p[0] >= self.min[0] && p[0] <= self.max[0] && p[1] >= self.min[1] && p[1] <= self.max[1]
    }

    /// Integer pixel ranges `(x0..x1, y0..y1)` covered by this box, clipped to
    /// a `width × height` raster. `None` when nothing overlaps.
    pub fn pixel_span(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if !(self.min[0].is_finite()
            && self.min[1].is_finite()
            && self.max[0].is_finite()
            && self.max[1].is_finite())
        {
            return None;
        }
        let x0 = self.min[0].floor().max(0.0);
        let y0 = self.min[1].floor().max(0.0);
        let x1 = (self.max[0].ceil() + 1.0).min(width as f64);
        let y1 = (self.max[1].ceil() + 1.0).min(height as f64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, x1 as u32, y0 as u32, y1 as u32))
    }
}
