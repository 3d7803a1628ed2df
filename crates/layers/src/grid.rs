//! Coordinate grid and sampled sky paths.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use foundation::math::{Equatorial, Projector, Vec2};

/// RA spacing of grid meridians (1h).
pub const GRID_RA_STEP: f64 = 15.0 * PI / 180.0;
/// Dec spacing of grid parallels.
pub const GRID_DEC_STEP: f64 = 10.0 * PI / 180.0;
/// Longest sky step between path samples.
pub const PATH_SAMPLE_STEP: f64 = 1.0 * PI / 180.0;

/// Signed RA difference `b - a` wrapped into `(-π, π]`.
fn ra_delta(a: f64, b: f64) -> f64 {
    let d = (b - a).rem_euclid(TAU);
    if d > PI { d - TAU } else { d }
}

/// Projects a sky path, breaking it wherever a sample is not drawable.
///
/// Segments are subdivided linearly in (RA, Dec) so paths along parallels
/// bend the way they should. Returns runs of at least two points.
pub fn project_path(projector: &Projector, path: &[Equatorial], step: f64) -> Vec<Vec<Vec2>> {
    let mut runs = Vec::new();
    let mut current: Vec<Vec2> = Vec::new();
    let step = step.max(1e-6);

    let mut push = |p: Option<Vec2>, current: &mut Vec<Vec2>| match p {
        Some(p) => current.push(p),
        None => {
            if current.len() >= 2 {
                runs.push(std::mem::take(current));
            } else {
                current.clear();
            }
        }
    };

    for (i, eq) in path.iter().enumerate() {
        if i > 0 {
            let prev = path[i - 1];
            let d_ra = ra_delta(prev.ra, eq.ra);
            let d_dec = eq.dec - prev.dec;
            let n = ((d_ra.abs().max(d_dec.abs())) / step).ceil().max(1.0) as usize;
            for k in 1..n {
                let t = k as f64 / n as f64;
                let ra = prev.ra + d_ra * t;
                let dec = prev.dec + d_dec * t;
                push(projector.project(ra, dec), &mut current);
            }
        }
        push(projector.project_eq(*eq), &mut current);
    }
    if current.len() >= 2 {
        runs.push(current);
    }
    runs
}

/// Meridians every [`GRID_RA_STEP`] and parallels every [`GRID_DEC_STEP`].
pub fn grid_paths() -> Vec<Vec<Equatorial>> {
    let mut paths = Vec::new();

    let meridians = (TAU / GRID_RA_STEP).round() as usize;
    for i in 0..meridians {
        let ra = i as f64 * GRID_RA_STEP;
        // Stop short of the poles, where every meridian meets.
        let path = (-8..=8)
            .map(|k| Equatorial::new(ra, k as f64 * GRID_DEC_STEP))
            .collect();
        paths.push(path);
    }

    let parallels = (FRAC_PI_2 / GRID_DEC_STEP).round() as i32;
    for k in (1 - parallels)..parallels {
        let dec = k as f64 * GRID_DEC_STEP;
        let path = (0..=meridians)
            .map(|i| Equatorial::new((i as f64 * GRID_RA_STEP) % TAU, dec))
            .collect();
        paths.push(path);
    }
    paths
}

/// Projected grid polylines for the current view.
pub fn grid_lines(projector: &Projector) -> Vec<Vec<Vec2>> {
    grid_paths()
        .iter()
        .flat_map(|path| project_path(projector, path, PATH_SAMPLE_STEP))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{grid_lines, grid_paths, project_path};
    use foundation::math::{Equatorial, Projector};
    use foundation::view::{CanvasSize, ViewState};

    fn projector(ra0_deg: f64, dec0_deg: f64, fov_deg: f64) -> Projector {
        Projector::new(&ViewState::new(
            ra0_deg.to_radians(),
            dec0_deg.to_radians(),
            fov_deg.to_radians(),
            CanvasSize::new(800.0, 600.0),
        ))
    }

    #[test]
    fn grid_has_24_meridians_and_17_parallels() {
        assert_eq!(grid_paths().len(), 24 + 17);
    }

    #[test]
    fn equator_crosses_center_horizontally() {
        let p = projector(0.0, 0.0, 40.0);
        let runs = project_path(
            &p,
            &[Equatorial::from_degrees(350.0, 0.0), Equatorial::from_degrees(10.0, 0.0)],
            1f64.to_radians(),
        );
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        // Short way across RA 0, one sample per degree.
        assert_eq!(run.len(), 21);
        assert!(run.iter().all(|q| (q.y - 300.0).abs() < 1e-6));
        assert!(run.first().unwrap().x > run.last().unwrap().x);
    }

    #[test]
    fn paths_break_at_undrawable_points() {
        let p = projector(0.0, 0.0, 20.0);
        let runs = project_path(
            &p,
            &[
                Equatorial::from_degrees(355.0, 0.0),
                Equatorial::from_degrees(5.0, 0.0),
                Equatorial::from_degrees(90.0, 0.0),
                Equatorial::from_degrees(355.0, 2.0),
                Equatorial::from_degrees(5.0, 2.0),
            ],
            1f64.to_radians(),
        );
        assert_eq!(runs.len(), 2);
    }

    #[test]
    fn grid_is_visible_in_any_view() {
        for &(ra, dec) in &[(0.0, 0.0), (123.0, 45.0), (300.0, -89.0), (10.0, 90.0)] {
            let lines = grid_lines(&projector(ra, dec, 30.0));
            assert!(!lines.is_empty(), "no grid at ({ra}, {dec})");
            assert!(lines.iter().flatten().all(|p| p.is_finite()));
        }
    }
}
