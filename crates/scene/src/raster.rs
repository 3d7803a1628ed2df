//! Solid, non-antialiased rasterization into a `u32` pixel buffer.
//!
//! Coverage is decided at pixel centers `(x + 0.5, y + 0.5)`. Every shape is
//! written with exactly one value, so a pixel read back is always a value
//! that was written, never a blend.

use earcutr::earcut;

use foundation::bounds::Aabb2;
use foundation::math::Vec2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, fill: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    fn put(&mut self, x: u32, y: u32, value: u32) {
        let idx = y as usize * self.width as usize + x as usize;
        if let Some(px) = self.pixels.get_mut(idx) {
            *px = value;
        }
    }

    /// Visits the pixels whose centers lie inside `bounds` and passes `covers`.
    fn fill_where(&mut self, bounds: Aabb2, value: u32, covers: impl Fn(Vec2) -> bool) -> usize {
        let Some((x0, x1, y0, y1)) = bounds.pixel_span(self.width, self.height) else {
            return 0;
        };
        let mut written = 0;
        for y in y0..y1 {
            for x in x0..x1 {
                let center = Vec2::new(x as f64 + 0.5, y as f64 + 0.5);
                if covers(center) {
                    self.put(x, y, value);
                    written += 1;
                }
            }
        }
        written
    }
}

fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let len2 = ab.dot(ab);
    if len2 <= f64::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Thick segment with round caps. Returns the number of pixels written.
pub fn stroke_segment(buf: &mut PixelBuffer, a: Vec2, b: Vec2, width: f64, value: u32) -> usize {
    if !a.is_finite() || !b.is_finite() {
        return 0;
    }
    let half = width.max(1.0) / 2.0;
    let Some(bounds) = Aabb2::from_points(&[[a.x, a.y], [b.x, b.y]]) else {
        return 0;
    };
    buf.fill_where(bounds.expand(half), value, |p| segment_distance(p, a, b) <= half)
}

pub fn stroke_polyline(buf: &mut PixelBuffer, points: &[Vec2], width: f64, value: u32) -> usize {
    match points {
        [] => 0,
        [p] => fill_circle(buf, *p, width.max(1.0) / 2.0, value),
        _ => points
            .windows(2)
            .map(|w| stroke_segment(buf, w[0], w[1], width, value))
            .sum(),
    }
}

pub fn fill_triangle(buf: &mut PixelBuffer, a: Vec2, b: Vec2, c: Vec2, value: u32) -> usize {
    let Some(bounds) = Aabb2::from_points(&[[a.x, a.y], [b.x, b.y], [c.x, c.y]]) else {
        return 0;
    };
    let area = edge(a, b, c);
    if area.abs() <= f64::EPSILON {
        return 0;
    }
    let sign = area.signum();
    buf.fill_where(bounds, value, |p| {
        edge(a, b, p) * sign >= 0.0 && edge(b, c, p) * sign >= 0.0 && edge(c, a, p) * sign >= 0.0
    })
}

/// Fills a simple polygon (outer ring only) via ear-clipping.
pub fn fill_polygon(buf: &mut PixelBuffer, ring: &[Vec2], value: u32) -> usize {
    let mut ring = ring.to_vec();
    let closed = matches!(ring.as_slice(), [first, .., last] if first.distance(*last) < 1e-9);
    if closed {
        ring.pop();
    }
    if ring.len() < 3 || ring.iter().any(|p| !p.is_finite()) {
        return 0;
    }

    let coords: Vec<f64> = ring.iter().flat_map(|p| [p.x, p.y]).collect();
    let Ok(indices) = earcut(&coords, &[], 2) else {
        return 0;
    };
    indices
        .chunks_exact(3)
        .filter_map(|tri| Some((*ring.get(tri[0])?, *ring.get(tri[1])?, *ring.get(tri[2])?)))
        .map(|(a, b, c)| fill_triangle(buf, a, b, c, value))
        .sum()
}

pub fn fill_circle(buf: &mut PixelBuffer, center: Vec2, radius: f64, value: u32) -> usize {
    if !center.is_finite() || !radius.is_finite() {
        return 0;
    }
    let r = radius.max(0.5);
    let bounds = Aabb2::new([center.x, center.y], [center.x, center.y]).expand(r);
    buf.fill_where(bounds, value, |p| p.distance(center) <= r)
}

pub fn fill_rect(buf: &mut PixelBuffer, rect: Aabb2, value: u32) -> usize {
    buf.fill_where(rect, value, |p| rect.contains([p.x, p.y]))
}

#[cfg(test)]
mod tests {
    use super::{PixelBuffer, fill_circle, fill_polygon, fill_rect, stroke_segment};
    use foundation::bounds::Aabb2;
    use foundation::math::Vec2;

    #[test]
    fn segment_respects_width() {
        let mut buf = PixelBuffer::new(20, 20, 0);
        stroke_segment(&mut buf, Vec2::new(2.0, 10.0), Vec2::new(18.0, 10.0), 4.0, 7);
        assert_eq!(buf.get(10, 9), Some(7));
        assert_eq!(buf.get(10, 11), Some(7));
        assert_eq!(buf.get(10, 14), Some(0));
        assert_eq!(buf.get(10, 5), Some(0));
    }

    #[test]
    fn concave_polygon_leaves_notch_empty() {
        // U shape: notch between x=4..6 from y=0..6.
        let ring = [
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(4.0, 6.0),
            Vec2::new(6.0, 6.0),
            Vec2::new(6.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        let mut buf = PixelBuffer::new(12, 12, 0);
        assert!(fill_polygon(&mut buf, &ring, 3) > 0);
        assert_eq!(buf.get(1, 1), Some(3));
        assert_eq!(buf.get(8, 8), Some(3));
        assert_eq!(buf.get(5, 2), Some(0));
        assert_eq!(buf.get(11, 11), Some(0));
    }

    #[test]
    fn circle_is_solid_and_bounded() {
        let mut buf = PixelBuffer::new(30, 30, 0);
        fill_circle(&mut buf, Vec2::new(10.0, 10.0), 3.0, 1);
        assert_eq!(buf.get(10, 10), Some(1));
        assert_eq!(buf.get(12, 10), Some(1));
        assert_eq!(buf.get(15, 10), Some(0));
    }

    #[test]
    fn shapes_are_clipped_to_buffer() {
        let mut buf = PixelBuffer::new(4, 4, 0);
        let written = fill_rect(&mut buf, Aabb2::new([-10.0, -10.0], [1.5, 100.0]), 9);
        assert_eq!(written, 8);
        assert_eq!(buf.get(1, 3), Some(9));
        assert_eq!(buf.get(2, 0), Some(0));
        assert_eq!(buf.get(4, 0), None);
    }
}
