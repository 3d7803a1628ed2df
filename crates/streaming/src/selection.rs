//! Which catalog tiles a view needs.
//!
//! The catalog is split into levels of increasing depth. Level 0 is a single
//! all-sky tile that also carries the level table; level `n > 0` splits the
//! sky into `ra_divisions × dec_divisions` cells and holds the stars fainter
//! than `levels[n - 1].mag_limit`.

use std::collections::BTreeSet;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::Serialize;

use foundation::math::{Projector, Vec2};
use foundation::view::ViewState;

/// Sampling grid resolution used when the host does not configure one.
pub const DEFAULT_SAMPLING_GRID: u32 = 11;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SkyTileKey {
    pub level: u8,
    pub ra_index: u32,
    pub dec_index: u32,
}

impl SkyTileKey {
    pub const ROOT: SkyTileKey = SkyTileKey {
        level: 0,
        ra_index: 0,
        dec_index: 0,
    };

    pub fn new(level: u8, ra_index: u32, dec_index: u32) -> Self {
        Self {
            level,
            ra_index,
            dec_index,
        }
    }

    /// Path fragment used by the tile endpoint.
    pub fn path(&self) -> String {
        format!("{}_{}_{}", self.level, self.ra_index, self.dec_index)
    }
}

impl std::fmt::Display for SkyTileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.level, self.ra_index, self.dec_index)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileLevel {
    /// Faintest magnitude stored at this level.
    pub mag_limit: f64,
    pub ra_divisions: u32,
    pub dec_divisions: u32,
}

impl TileLevel {
    pub fn ra_index(&self, ra: f64) -> u32 {
        let div = self.ra_divisions.max(1);
        let raw = (ra / TAU * div as f64).floor();
        (raw as i64).rem_euclid(div as i64) as u32
    }

    pub fn dec_index(&self, dec: f64) -> u32 {
        let div = self.dec_divisions.max(1);
        let raw = ((dec + FRAC_PI_2) / PI * div as f64).floor();
        raw.clamp(0.0, (div - 1) as f64) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileIndex {
    levels: Vec<TileLevel>,
}

impl TileIndex {
    pub fn new(levels: Vec<TileLevel>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[TileLevel] {
        &self.levels
    }

    /// Levels `1..` whose stars can be brighter than `limiting_magnitude`.
    pub fn required_levels(&self, limiting_magnitude: f64) -> impl Iterator<Item = usize> + '_ {
        (1..self.levels.len()).filter(move |&n| self.levels[n - 1].mag_limit < limiting_magnitude)
    }
}

fn sample_points(view: &ViewState, grid: u32) -> Vec<Vec2> {
    let canvas = view.canvas;
    if grid <= 1 {
        return vec![canvas.center()];
    }
    let steps = (grid - 1) as f64;
    let mut points = Vec::with_capacity((grid * grid) as usize);
    for i in 0..grid {
        for j in 0..grid {
            points.push(Vec2::new(
                canvas.width * i as f64 / steps,
                canvas.height * j as f64 / steps,
            ));
        }
    }
    points
}

/// Tiles needed to draw `view` at its limiting magnitude.
///
/// Ordering contract: the result is a `BTreeSet`, so iteration (and therefore
/// fetch dispatch) order depends only on the inputs.
pub fn required_tiles(
    index: Option<&TileIndex>,
    view: &ViewState,
    grid: u32,
) -> BTreeSet<SkyTileKey> {
    let mut keys = BTreeSet::from([SkyTileKey::ROOT]);
    let Some(index) = index else {
        return keys;
    };

    let projector = Projector::new(view);
    let samples: Vec<_> = sample_points(view, grid)
        .into_iter()
        .map(|p| projector.unproject(p))
        .collect();
    let north_visible = projector.is_visible(0.0, FRAC_PI_2);
    let south_visible = projector.is_visible(0.0, -FRAC_PI_2);

    for n in index.required_levels(view.limiting_magnitude()) {
        let level = index.levels[n];
        let Ok(level_id) = u8::try_from(n) else {
            break;
        };

        for eq in &samples {
            keys.insert(SkyTileKey::new(
                level_id,
                level.ra_index(eq.ra),
                level.dec_index(eq.dec),
            ));
        }

        let polar_rows = [
            (north_visible, level.dec_divisions.saturating_sub(1)),
            (south_visible, 0),
        ];
        for (visible, dec_index) in polar_rows {
            if visible {
                keys.extend(
                    (0..level.ra_divisions).map(|ra| SkyTileKey::new(level_id, ra, dec_index)),
                );
            }
        }
    }
    keys
}
