use crate::math::{Vec2, normalize_ra};

/// Narrowest horizontal half-width a chart can zoom into (radians).
pub const MIN_HALF_WIDTH: f64 = 0.1 * std::f64::consts::PI / 180.0;
/// Widest horizontal half-width; the gnomonic plane diverges at 90°.
pub const MAX_HALF_WIDTH: f64 = 80.0 * std::f64::consts::PI / 180.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Height over width; 1.0 for a degenerate canvas.
    pub fn aspect(&self) -> f64 {
        if self.width <= 0.0 || self.height <= 0.0 {
            1.0
        } else {
            self.height / self.width
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.width && p.y < self.height
    }
}

/// Maps the chart's field of view to the faintest magnitude worth drawing.
///
/// At `reference_half_width` the limit is `bright_limit`; every 10× zoom adds
/// five magnitudes until `faint_limit`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MagnitudeScale {
    pub bright_limit: f64,
    pub faint_limit: f64,
    pub reference_half_width: f64,
}

impl Default for MagnitudeScale {
    fn default() -> Self {
        Self {
            bright_limit: 4.0,
            faint_limit: 13.0,
            reference_half_width: 30f64.to_radians(),
        }
    }
}

impl MagnitudeScale {
    pub fn limit_for(&self, half_width: f64) -> f64 {
        if half_width <= 0.0 {
            return self.faint_limit;
        }
        let m = self.bright_limit + 5.0 * (self.reference_half_width / half_width).log10();
        m.clamp(self.bright_limit, self.faint_limit)
    }
}

/// Per-chart view configuration.
///
/// Owned by a single chart; mutated only by that chart's pan/zoom/resize
/// handlers. All angles are radians.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewState {
    /// Right ascension of the chart center.
    pub ra0: f64,
    /// Declination of the chart center.
    pub dec0: f64,
    /// Horizontal angular half-width.
    pub scale_x: f64,
    /// Vertical angular half-width.
    pub scale_y: f64,
    /// Rotation about the optical axis.
    pub pos_ang: f64,
    pub k1: f64,
    pub k2: f64,
    pub canvas: CanvasSize,
    pub magnitude: MagnitudeScale,
}

impl ViewState {
    /// Builds a view with square pixels: `scale_y` follows the canvas aspect.
    pub fn new(ra0: f64, dec0: f64, fov_x: f64, canvas: CanvasSize) -> Self {
        let mut view = Self {
            ra0: 0.0,
            dec0: 0.0,
            scale_x: fov_x / 2.0,
            scale_y: fov_x / 2.0,
            pos_ang: 0.0,
            k1: 0.0,
            k2: 0.0,
            canvas,
            magnitude: MagnitudeScale::default(),
        };
        view.set_center(ra0, dec0);
        view.set_half_width(fov_x / 2.0);
        view
    }

    pub fn with_distortion(mut self, k1: f64, k2: f64) -> Self {
        self.k1 = k1;
        self.k2 = k2;
        self
    }

    pub fn with_position_angle(mut self, pos_ang: f64) -> Self {
        self.pos_ang = pos_ang;
        self
    }

    pub fn with_magnitude_scale(mut self, magnitude: MagnitudeScale) -> Self {
        self.magnitude = magnitude;
        self
    }

    /// Faintest magnitude drawn at the current zoom.
    pub fn limiting_magnitude(&self) -> f64 {
        self.magnitude.limit_for(self.scale_x)
    }

    pub fn set_center(&mut self, ra: f64, dec: f64) {
        self.ra0 = normalize_ra(ra);
        self.dec0 = dec.clamp(-std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2);
    }

    /// Sets the horizontal half-width (clamped) and re-derives `scale_y`.
    pub fn set_half_width(&mut self, scale_x: f64) {
        self.scale_x = scale_x.clamp(MIN_HALF_WIDTH, MAX_HALF_WIDTH);
        self.scale_y = (self.scale_x.tan() * self.canvas.aspect()).atan();
    }

    /// Resize keeps the horizontal field and re-derives the vertical one.
    pub fn set_canvas(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
        self.set_half_width(self.scale_x);
    }
}
