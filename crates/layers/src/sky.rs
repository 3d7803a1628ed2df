//! One full chart draw pass.
//!
//! Paint order, back to front: grid, constellation lines, constellation
//! boundaries, constellation labels, deep-sky objects, stars, star names,
//! caller overlays. Stars and deep-sky objects are painted faintest first so
//! bright neighbours are never covered.

use std::f64::consts::FRAC_PI_2;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use foundation::bounds::Aabb2;
use foundation::math::{Equatorial, Projector, Vec2, stable_total_cmp_f64};
use scene::{FeatureId, PickError, PickGeometry, PickingCanvas};
use streaming::{ConstellationData, DeepSkyObject, DsoKind, SkyTile, Star, dso_sort_mag};

use crate::grid::{PATH_SAMPLE_STEP, grid_lines, project_path};
use crate::labels::{LabelAnchor, LabelLayout, LabelLayoutConfig, estimate_text_size};
use crate::surface::Surface;
use crate::symbology::{SkyStyle, Stroke};

fn yes() -> bool {
    true
}

/// Layer checkboxes. Every toggle is a redraw trigger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayOptions {
    #[serde(default = "yes")]
    pub grid: bool,
    #[serde(default = "yes")]
    pub constellation_lines: bool,
    #[serde(default = "yes")]
    pub boundaries: bool,
    #[serde(default = "yes")]
    pub labels: bool,
    #[serde(default = "yes")]
    pub deep_sky: bool,
    #[serde(default = "yes")]
    pub star_names: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            grid: true,
            constellation_lines: true,
            boundaries: true,
            labels: true,
            deep_sky: true,
            star_names: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayOption {
    Grid,
    ConstellationLines,
    Boundaries,
    Labels,
    DeepSky,
    StarNames,
}

impl FromStr for DisplayOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(DisplayOption::Grid),
            "constellation_lines" | "lines" => Ok(DisplayOption::ConstellationLines),
            "boundaries" => Ok(DisplayOption::Boundaries),
            "labels" => Ok(DisplayOption::Labels),
            "deep_sky" | "dsos" => Ok(DisplayOption::DeepSky),
            "star_names" => Ok(DisplayOption::StarNames),
            other => Err(format!("unknown display option: {other}")),
        }
    }
}

impl DisplayOptions {
    fn slot(&mut self, option: DisplayOption) -> &mut bool {
        match option {
            DisplayOption::Grid => &mut self.grid,
            DisplayOption::ConstellationLines => &mut self.constellation_lines,
            DisplayOption::Boundaries => &mut self.boundaries,
            DisplayOption::Labels => &mut self.labels,
            DisplayOption::DeepSky => &mut self.deep_sky,
            DisplayOption::StarNames => &mut self.star_names,
        }
    }

    /// Returns `true` if the value changed.
    pub fn set(&mut self, option: DisplayOption, enabled: bool) -> bool {
        let slot = self.slot(option);
        let changed = *slot != enabled;
        *slot = enabled;
        changed
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    /// A sky-polygon record such as an instrument footprint.
    #[default]
    Footprint,
    /// Simultaneous detections of one event by several cameras.
    DetectionGroup,
}

/// Caller-supplied sky polygon; vertices are `[ra, dec]` in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyPolygon {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: OverlayKind,
    pub vertices: Vec<[f64; 2]>,
}

impl SkyPolygon {
    /// Closed vertex path in radians.
    pub fn path(&self) -> Vec<Equatorial> {
        let mut path: Vec<_> = self
            .vertices
            .iter()
            .map(|[ra, dec]| Equatorial::from_degrees(*ra, *dec))
            .collect();
        if let Some(first) = path.first().copied() {
            path.push(first);
        }
        path
    }
}

/// What a pick on the chart resolves to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PickTarget {
    Star(Star),
    DeepSky(DeepSkyObject),
    ConstellationLine { index: usize },
    Overlay { id: String, kind: OverlayKind },
}

/// Everything the draw pass reads.
#[derive(Debug, Clone, Copy)]
pub struct SkyScene<'a> {
    pub tiles: &'a [Arc<SkyTile>],
    pub constellations: Option<&'a ConstellationData>,
    pub overlays: &'a [SkyPolygon],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrawSummary {
    pub grid_lines: usize,
    pub constellation_lines: usize,
    pub boundary_lines: usize,
    pub labels_placed: usize,
    pub labels_rejected: usize,
    pub dsos_drawn: usize,
    pub dsos_culled: usize,
    pub stars_drawn: usize,
    pub stars_culled: usize,
    pub overlays_drawn: usize,
    pub pick_features: usize,
}

/// Picking registration that gives up quietly once the palette is full.
struct Registrar<'a> {
    canvas: Option<&'a mut PickingCanvas<PickTarget>>,
    next_id: u32,
    exhausted: bool,
}

impl Registrar<'_> {
    fn register(&mut self, target: PickTarget, geometry: &PickGeometry, width: f64) {
        let Some(canvas) = self.canvas.as_deref_mut() else {
            return;
        };
        if self.exhausted {
            return;
        }
        let id = FeatureId(self.next_id);
        match canvas.register(id, target, geometry, width) {
            Ok(_) => self.next_id += 1,
            Err(err @ PickError::PaletteExhausted) => {
                warn!(error = %err, "picking disabled for the rest of this pass");
                self.exhausted = true;
            }
        }
    }

    fn count(&self) -> usize {
        self.canvas.as_deref().map_or(0, PickingCanvas::len)
    }
}

fn near_canvas(projector: &Projector, p: Vec2, margin: f64) -> bool {
    let canvas = projector.view().canvas;
    p.x >= -margin
        && p.y >= -margin
        && p.x <= canvas.width + margin
        && p.y <= canvas.height + margin
}

/// Pixels per radian at the chart center.
fn pixels_per_radian(projector: &Projector) -> f64 {
    let view = projector.view();
    let tan_x = view.scale_x.tan();
    if tan_x <= 0.0 {
        return 0.0;
    }
    view.canvas.width / 2.0 / tan_x
}

/// Draws the whole chart onto `surface`, registering pickable shapes on
/// `picking` when given. The picking canvas is reset to the chart size first.
pub fn draw_sky<S: Surface>(
    surface: &mut S,
    projector: &Projector,
    scene: &SkyScene<'_>,
    options: &DisplayOptions,
    style: &SkyStyle,
    picking: Option<&mut PickingCanvas<PickTarget>>,
) -> DrawSummary {
    let view = *projector.view();
    let canvas = view.canvas;
    let limit = view.limiting_magnitude();
    let mut summary = DrawSummary::default();

    surface.clear(canvas.width, canvas.height, style.background);
    let mut registrar = Registrar {
        canvas: picking.map(|c| {
            c.reset(canvas.width.max(0.0) as u32, canvas.height.max(0.0) as u32);
            c
        }),
        next_id: 1,
        exhausted: false,
    };
    let mut layout = LabelLayout::new(LabelLayoutConfig {
        viewport_px: [canvas.width, canvas.height],
        ..LabelLayoutConfig::default()
    });

    if options.grid {
        for line in grid_lines(projector) {
            surface.polyline(&line, style.grid);
            summary.grid_lines += 1;
        }
    }

    if let Some(constellations) = scene.constellations {
        if options.constellation_lines {
            for (index, strip) in constellations.lines.iter().enumerate() {
                for run in project_path(projector, strip, f64::INFINITY) {
                    surface.polyline(&run, style.constellation_lines);
                    registrar.register(
                        PickTarget::ConstellationLine { index },
                        &PickGeometry::Polyline(run),
                        style.constellation_lines.width,
                    );
                    summary.constellation_lines += 1;
                }
            }
        }
        if options.boundaries {
            for boundary in &constellations.boundaries {
                for run in project_path(projector, boundary, PATH_SAMPLE_STEP) {
                    surface.polyline(&run, style.boundaries);
                    summary.boundary_lines += 1;
                }
            }
        }
        if options.labels {
            for label in &constellations.labels {
                let Some(position) = projector.project_eq(label.position) else {
                    continue;
                };
                let anchor = LabelAnchor {
                    text: label.name.clone(),
                    position,
                    priority: 0.0,
                    style: style.constellation_label.clone(),
                };
                match layout.try_place(&anchor) {
                    Some(placed) => {
                        surface.text(placed.position, &placed.text, &placed.style);
                        summary.labels_placed += 1;
                    }
                    None => summary.labels_rejected += 1,
                }
            }
        }
    }

    if options.deep_sky {
        let mut dsos: Vec<&DeepSkyObject> =
            scene.tiles.iter().flat_map(|t| t.dsos.iter()).collect();
        dsos.sort_by(|a, b| stable_total_cmp_f64(dso_sort_mag(b), dso_sort_mag(a)));
        let ppr = pixels_per_radian(projector);
        for dso in dsos {
            if dso.mag.is_some_and(|m| m > limit) {
                summary.dsos_culled += 1;
                continue;
            }
            let Some(center) = projector.project(dso.ra, dso.dec) else {
                summary.dsos_culled += 1;
                continue;
            };
            if !near_canvas(projector, center, 20.0) {
                summary.dsos_culled += 1;
                continue;
            }
            let bounds = draw_dso(surface, dso, center, ppr, view.pos_ang, style.dso);
            registrar.register(
                PickTarget::DeepSky(dso.clone()),
                &PickGeometry::Box(bounds),
                style.dso.width,
            );
            summary.dsos_drawn += 1;
        }
    }

    let mut stars: Vec<&Star> = scene.tiles.iter().flat_map(|t| t.stars.iter()).collect();
    stars.sort_by(|a, b| stable_total_cmp_f64(b.mag, a.mag));
    let mut star_labels = Vec::new();
    for star in stars {
        if star.mag > limit {
            summary.stars_culled += 1;
            continue;
        }
        let Some(center) = projector.project(star.ra, star.dec) else {
            summary.stars_culled += 1;
            continue;
        };
        let radius = style.star_radius(star.mag, limit);
        if !near_canvas(projector, center, radius) {
            summary.stars_culled += 1;
            continue;
        }
        surface.circle(center, radius, Some(style.star), None);
        registrar.register(
            PickTarget::Star(star.clone()),
            &PickGeometry::Circle { center, radius },
            1.0,
        );
        summary.stars_drawn += 1;

        if options.star_names && star.mag <= limit - 2.0 {
            if let Some(text) = star.name.as_ref().or(star.designation.as_ref()) {
                let size = estimate_text_size(text, &style.star_label);
                star_labels.push(LabelAnchor {
                    text: text.clone(),
                    position: Vec2::new(center.x + radius + 3.0 + size[0] / 2.0, center.y),
                    priority: -star.mag as f32,
                    style: style.star_label.clone(),
                });
            }
        }
    }
    star_labels.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    for anchor in &star_labels {
        match layout.try_place(anchor) {
            Some(placed) => {
                surface.text(placed.position, &placed.text, &placed.style);
                summary.labels_placed += 1;
            }
            None => summary.labels_rejected += 1,
        }
    }

    for overlay in scene.overlays {
        let path = overlay.path();
        let runs = project_path(projector, &path, PATH_SAMPLE_STEP);
        if runs.is_empty() {
            continue;
        }
        let target = PickTarget::Overlay {
            id: overlay.id.clone(),
            kind: overlay.kind,
        };
        let closed = runs.len() == 1 && path.iter().all(|eq| projector.project_eq(*eq).is_some());
        if closed {
            let ring = &runs[0];
            surface.polygon(ring, Some(style.overlay_fill), Some(style.overlay));
            registrar.register(target, &PickGeometry::Polygon(ring.clone()), style.overlay.width);
        } else {
            for run in &runs {
                surface.polyline(run, style.overlay);
                registrar.register(
                    target.clone(),
                    &PickGeometry::Polyline(run.clone()),
                    style.overlay.width,
                );
            }
        }
        summary.overlays_drawn += 1;
    }

    summary.pick_features = registrar.count();
    summary
}

/// Draws the symbol for one deep-sky object and returns its screen bounds.
fn draw_dso<S: Surface>(
    surface: &mut S,
    dso: &DeepSkyObject,
    center: Vec2,
    pixels_per_radian: f64,
    pos_ang: f64,
    stroke: Stroke,
) -> Aabb2 {
    let point = Aabb2::new([center.x, center.y], [center.x, center.y]);
    if let Some(major) = dso.axis_major {
        let rx = (major / 2.0 * pixels_per_radian).max(3.0);
        let ry = (dso.axis_minor.unwrap_or(major) / 2.0 * pixels_per_radian).max(2.0);
        let rotation = FRAC_PI_2 - (dso.pos_ang.unwrap_or(0.0) + pos_ang);
        surface.ellipse(center, [rx, ry], rotation, stroke);
        return point.expand(rx.max(ry));
    }

    match dso.kind {
        DsoKind::Galaxy => {
            surface.ellipse(center, [6.0, 3.0], 0.0, stroke);
            point.expand(6.0)
        }
        DsoKind::OpenCluster => {
            surface.circle(center, 5.0, None, Some(stroke));
            point.expand(5.0)
        }
        DsoKind::GlobularCluster => {
            surface.circle(center, 5.0, None, Some(stroke));
            surface.line(center - Vec2::new(5.0, 0.0), center + Vec2::new(5.0, 0.0), stroke);
            surface.line(center - Vec2::new(0.0, 5.0), center + Vec2::new(0.0, 5.0), stroke);
            point.expand(5.0)
        }
        DsoKind::Nebula => {
            let rect = point.expand(5.0);
            surface.rect(rect, stroke);
            rect
        }
        DsoKind::PlanetaryNebula => {
            surface.circle(center, 3.0, None, Some(stroke));
            for d in [Vec2::new(5.0, 0.0), Vec2::new(0.0, 5.0)] {
                surface.line(center + d * 0.6, center + d, stroke);
                surface.line(center - d * 0.6, center - d, stroke);
            }
            point.expand(5.0)
        }
        DsoKind::Other => {
            let rect = point.expand(3.0);
            surface.rect(rect, stroke);
            rect
        }
    }
}
