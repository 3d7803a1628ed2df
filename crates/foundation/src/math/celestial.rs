//! Equatorial ↔ zenithal frame rotation.
//!
//! The zenithal frame has its pole at the chart center `(ra0, dec0)`. A
//! direction is carried there with two rotations: about the celestial pole by
//! `-ra0`, then about the new x-axis by `π/2 - dec0`.
//!
//! Local frame axes after both rotations:
//! - `x`: towards increasing RA (east)
//! - `y`: towards decreasing Dec (south)
//! - `z`: the chart center

use std::f64::consts::{FRAC_PI_2, TAU};

use super::{Vec3, clamp_unit};

/// Below this horizontal component the azimuth is undefined and reported as 0.
const AZIMUTH_EPS: f64 = 1e-15;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Equatorial {
    pub ra: f64,
    pub dec: f64,
}

impl Equatorial {
    pub fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }

    pub fn from_degrees(ra_deg: f64, dec_deg: f64) -> Self {
        Self::new(normalize_ra(ra_deg.to_radians()), dec_deg.to_radians())
    }
}

/// Position relative to the chart center.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Zenithal {
    /// Angle from the chart center.
    pub zenith_angle: f64,
    /// Measured from north through east.
    pub azimuth: f64,
}

/// Wraps into `[0, 2π)`.
pub fn normalize_ra(ra: f64) -> f64 {
    let r = ra.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if r >= TAU { 0.0 } else { r }
}

/// Great-circle distance from the chord between the two unit vectors.
pub fn angular_distance(ra0: f64, dec0: f64, ra1: f64, dec1: f64) -> f64 {
    let a = Vec3::from_ra_dec(ra0, dec0);
    let b = Vec3::from_ra_dec(ra1, dec1);
    let chord = (a - b).length();
    2.0 * clamp_unit(chord / 2.0).asin()
}

fn local_vector(ra0: f64, dec0: f64, ra: f64, dec: f64) -> Vec3 {
    let (sin_d, cos_d) = (ra - ra0).sin_cos();
    let (sin_dec, cos_dec) = dec.sin_cos();
    let (sin_dec0, cos_dec0) = dec0.sin_cos();

    // About the polar axis by -ra0.
    let x = cos_dec * sin_d;
    let y = cos_dec * cos_d;
    let z = sin_dec;

    // About the new x-axis by π/2 - dec0.
    Vec3::new(x, y * sin_dec0 - z * cos_dec0, y * cos_dec0 + z * sin_dec0)
}

/// Rotates `(ra, dec)` into the frame whose pole is `(ra0, dec0)`.
pub fn to_zenithal(ra0: f64, dec0: f64, ra: f64, dec: f64) -> Zenithal {
    let v = local_vector(ra0, dec0, ra, dec);
    let horizontal = v.x.hypot(v.y);
    // atan2 keeps full precision next to the center, where asin(z) would not.
    let altitude = clamp_unit(v.z).atan2(horizontal);
    let azimuth = if horizontal < AZIMUTH_EPS {
        0.0
    } else {
        v.x.atan2(-v.y)
    };
    Zenithal {
        zenith_angle: FRAC_PI_2 - altitude,
        azimuth,
    }
}

/// Inverse of [`to_zenithal`].
pub fn from_zenithal(ra0: f64, dec0: f64, z: Zenithal) -> Equatorial {
    let altitude = FRAC_PI_2 - z.zenith_angle;
    let (sin_alt, cos_alt) = altitude.sin_cos();
    let (sin_az, cos_az) = z.azimuth.sin_cos();
    let (sin_dec0, cos_dec0) = dec0.sin_cos();

    let lx = cos_alt * sin_az;
    let ly = -cos_alt * cos_az;
    let lz = sin_alt;

    // Undo the x-axis rotation, then the polar one.
    let y = ly * sin_dec0 + lz * cos_dec0;
    let zc = -ly * cos_dec0 + lz * sin_dec0;

    let horizontal = lx.hypot(y);
    let dec = clamp_unit(zc).atan2(horizontal);
    let d_ra = if horizontal < AZIMUTH_EPS {
        0.0
    } else {
        lx.atan2(y)
    };
    Equatorial::new(normalize_ra(ra0 + d_ra), dec)
}

#[cfg(test)]
mod tests {
    use super::{Zenithal, angular_distance, from_zenithal, normalize_ra, to_zenithal};
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn assert_ra_close(a: f64, b: f64, eps: f64) {
        let d = (a - b).rem_euclid(TAU);
        let diff = d.min(TAU - d);
        assert!(diff <= eps, "expected ra {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn center_has_zero_zenith_angle() {
        for &(ra0, dec0) in &[
            (0.0, 0.0),
            (1.3, 0.7),
            (5.9, -1.2),
            (2.0, FRAC_PI_2),
            (4.0, -FRAC_PI_2),
        ] {
            let z = to_zenithal(ra0, dec0, ra0, dec0);
            assert_close(z.zenith_angle, 0.0, 1e-12);
            assert!(z.azimuth.is_finite());
        }
    }

    #[test]
    fn north_has_zero_azimuth_and_east_is_positive() {
        let north = to_zenithal(1.0, 0.2, 1.0, 0.3);
        assert_close(north.azimuth, 0.0, 1e-12);
        assert_close(north.zenith_angle, 0.1, 1e-12);

        let east = to_zenithal(1.0, 0.0, 1.1, 0.0);
        assert_close(east.azimuth, FRAC_PI_2, 1e-12);
    }

    #[test]
    fn zenithal_round_trip() {
        let (ra0, dec0) = (0.4, -0.6);
        for &(ra, dec) in &[(0.5, -0.5), (6.1, -0.9), (0.4, -0.6), (1.9, 0.3)] {
            let z = to_zenithal(ra0, dec0, ra, dec);
            let eq = from_zenithal(ra0, dec0, z);
            assert_ra_close(eq.ra, ra, 1e-10);
            assert_close(eq.dec, dec, 1e-10);
        }
    }

    #[test]
    fn poles_do_not_produce_nan() {
        let z = to_zenithal(0.0, 0.0, 1.0, FRAC_PI_2);
        assert!(z.zenith_angle.is_finite() && z.azimuth.is_finite());

        let eq = from_zenithal(
            0.0,
            FRAC_PI_2,
            Zenithal {
                zenith_angle: 0.0,
                azimuth: 0.0,
            },
        );
        assert!(eq.ra.is_finite());
        assert_close(eq.dec, FRAC_PI_2, 1e-12);
    }

    #[test]
    fn angular_distance_matches_known_values() {
        assert_close(angular_distance(0.0, 0.0, PI, 0.0), PI, 1e-12);
        assert_close(angular_distance(0.0, 0.0, 0.0, FRAC_PI_2), FRAC_PI_2, 1e-12);
        assert_close(angular_distance(6.2, 0.0, 0.1, 0.0), TAU - 6.1, 1e-12);
    }

    #[test]
    fn normalize_ra_wraps() {
        assert_close(normalize_ra(-0.5), TAU - 0.5, 1e-12);
        assert_close(normalize_ra(TAU + 0.25), 0.25, 1e-12);
        assert!(normalize_ra(-1e-18) < TAU);
    }
}
