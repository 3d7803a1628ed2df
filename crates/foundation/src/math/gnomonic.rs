//! Gnomonic (tangent-plane) projection with barrel-distortion correction.
//!
//! Screen conventions at `pos_ang = 0`: north up, east left, origin at the
//! top-left canvas corner, `+y` down.

use std::f64::consts::FRAC_PI_2;

use super::{
    BarrelDistortion, Equatorial, Vec2, Zenithal, angular_distance, from_zenithal, to_zenithal,
};
use crate::view::ViewState;

/// Normalized image radius beyond which a point is treated as not drawable.
///
/// Tunable; distortion polynomials stop being trustworthy well outside the
/// calibrated field.
pub const DISTORTION_CUTOFF: f64 = 1.4;

/// A view plus projection policy.
///
/// Pure: holds a copy of the `ViewState`, never a canvas or any shared state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projector {
    view: ViewState,
    cutoff: f64,
}

impl Projector {
    pub fn new(view: &ViewState) -> Self {
        Self {
            view: *view,
            cutoff: DISTORTION_CUTOFF,
        }
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Screen position of `(ra, dec)`, or `None` when it cannot be drawn.
    pub fn project(&self, ra: f64, dec: f64) -> Option<Vec2> {
        let view = &self.view;
        if angular_distance(view.ra0, view.dec0, ra, dec) > FRAC_PI_2 {
            return None;
        }

        let z = to_zenithal(view.ra0, view.dec0, ra, dec);
        let tan_x = view.scale_x.tan();
        let tan_y = view.scale_y.tan();
        if tan_x <= 0.0 || tan_y <= 0.0 {
            return None;
        }

        let r_ideal = z.zenith_angle.tan() / tan_x;
        let distortion = BarrelDistortion::new(view.k1, view.k2);
        let r = distortion.image_from_ideal(r_ideal)?;
        if r > self.cutoff {
            return None;
        }

        let (sin_az, cos_az) = (z.azimuth + view.pos_ang).sin_cos();
        let half = view.canvas.center();
        Some(Vec2::new(
            half.x - r * sin_az * half.x,
            half.y - r * tan_x * cos_az * half.y / tan_y,
        ))
    }

    pub fn project_eq(&self, eq: Equatorial) -> Option<Vec2> {
        self.project(eq.ra, eq.dec)
    }

    /// Approximate inverse of [`Projector::project`]: distortion is ignored.
    ///
    /// Good enough for choosing tiles and for pan handling; never used to
    /// place drawn features.
    pub fn unproject(&self, p: Vec2) -> Equatorial {
        let view = &self.view;
        let half = view.canvas.center();
        if half.x <= 0.0 || half.y <= 0.0 {
            return Equatorial::new(view.ra0, view.dec0);
        }

        let xi = (half.x - p.x) / half.x * view.scale_x.tan();
        let eta = (half.y - p.y) / half.y * view.scale_y.tan();
        let radius = xi.hypot(eta);
        let azimuth = if radius == 0.0 { 0.0 } else { xi.atan2(eta) };

        from_zenithal(
            view.ra0,
            view.dec0,
            Zenithal {
                zenith_angle: radius.atan(),
                azimuth: azimuth - view.pos_ang,
            },
        )
    }

    pub fn is_visible(&self, ra: f64, dec: f64) -> bool {
        self.project(ra, dec).is_some_and(|p| self.view.canvas.contains(p))
    }
}

pub fn gnomonic_project(view: &ViewState, ra: f64, dec: f64) -> Option<Vec2> {
    Projector::new(view).project(ra, dec)
}

pub fn inverse_gnomonic_project(view: &ViewState, x: f64, y: f64) -> Equatorial {
    Projector::new(view).unproject(Vec2::new(x, y))
}
