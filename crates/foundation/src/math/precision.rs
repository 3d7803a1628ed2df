//! Float helpers shared by the projection and draw code.
//!
//! - Deterministic ordering for sorting by magnitude (`stable_total_cmp_f64`).
//! - Domain clamping before inverse trig (`clamp_unit`).

use core::cmp::Ordering;

/// Canonicalize a floating-point value for deterministic ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Deterministic total ordering for floats.
///
/// Prefer this any time you sort floats (e.g. catalog magnitudes).
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// Clamp into `[-1, 1]` so `asin`/`acos` never see rounding overshoot.
#[inline]
pub fn clamp_unit(v: f64) -> f64 {
    v.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::{canonical_f64, clamp_unit, stable_total_cmp_f64};
    use core::cmp::Ordering;

    #[test]
    fn canonicalizes_negative_zero() {
        assert_eq!(canonical_f64(-0.0), 0.0);
        assert_eq!(canonical_f64(0.0), 0.0);
    }

    #[test]
    fn stable_cmp_is_total() {
        assert_eq!(stable_total_cmp_f64(1.0, 2.0), Ordering::Less);
        assert_eq!(stable_total_cmp_f64(f64::NAN, f64::NAN), Ordering::Equal);
        assert_eq!(stable_total_cmp_f64(-0.0, 0.0), Ordering::Equal);
    }

    #[test]
    fn clamp_unit_absorbs_overshoot() {
        let overshoot = 1.0 + 4.0 * f64::EPSILON;
        assert_eq!(clamp_unit(overshoot), 1.0);
        assert!(clamp_unit(-overshoot).asin().is_finite());
        assert_eq!(clamp_unit(0.25), 0.25);
    }
}
