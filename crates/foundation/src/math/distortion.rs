//! Barrel distortion model in normalized radius units.
//!
//! Radii are divided by `tan(scale_x)` so the horizontal field edge sits at
//! `r = 1`. The lens model maps an image-plane radius to the ideal gnomonic
//! radius:
//!
//! ```text
//! r_ideal = r·(1 − k1 − k2) + k1·r³ + k2·r⁵
//! ```
//!
//! The `1 − k1 − k2` normalization pins `r = 1` to itself, so the field edge
//! does not move when the coefficients change.

const MAX_ITERATIONS: usize = 32;
const TOLERANCE: f64 = 1e-12;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct BarrelDistortion {
    pub k1: f64,
    pub k2: f64,
}

impl BarrelDistortion {
    pub fn new(k1: f64, k2: f64) -> Self {
        Self { k1, k2 }
    }

    pub fn is_zero(&self) -> bool {
        self.k1 == 0.0 && self.k2 == 0.0
    }

    /// Image-plane radius → ideal gnomonic radius.
    pub fn ideal_from_image(&self, r: f64) -> f64 {
        let r2 = r * r;
        r * (1.0 - self.k1 - self.k2) + self.k1 * r * r2 + self.k2 * r * r2 * r2
    }

    /// Ideal gnomonic radius → image-plane radius.
    ///
    /// Solved with Newton-Raphson starting from the undistorted radius.
    /// Returns `None` if the iteration stalls or leaves the physical range.
    pub fn image_from_ideal(&self, r_ideal: f64) -> Option<f64> {
        if !r_ideal.is_finite() || r_ideal < 0.0 {
            return None;
        }
        if self.is_zero() {
            return Some(r_ideal);
        }

        let mut r = r_ideal;
        for _ in 0..MAX_ITERATIONS {
            let r2 = r * r;
            let f = self.ideal_from_image(r) - r_ideal;
            let df = (1.0 - self.k1 - self.k2) + 3.0 * self.k1 * r2 + 5.0 * self.k2 * r2 * r2;
            if df.abs() < TOLERANCE {
                return None;
            }

            let delta = f / df;
            r -= delta;
            if !r.is_finite() || r < 0.0 {
                return None;
            }
            if delta.abs() < TOLERANCE {
                return Some(r);
            }
        }
        None
    }
}
