//! Wire format for catalog tiles and constellation data.
//!
//! Endpoints (served by the archive web layer):
//! - `GET {base}/tiles/{level}_{ra}_{dec}.json` → [`TilePayload`]
//! - `GET {base}/constellations.json` → [`ConstellationPayload`]
//!
//! Angles are degrees on the wire and radians once decoded. Decoding is strict:
//! anything that would later poison projection (non-finite coordinates, a
//! level-0 tile without its `tiles` table) is rejected as malformed.

use serde::{Deserialize, Serialize};

use foundation::math::{Equatorial, stable_total_cmp_f64};

use crate::selection::{SkyTileKey, TileIndex, TileLevel};

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadError {
    Json(String),
    NonFinite { what: &'static str },
    /// Declination beyond a pole.
    OutOfRange { what: &'static str, dec_deg: f64 },
    MissingIndex,
    BadIndex(String),
    LengthMismatch { names: usize, abbrevs: usize, places: usize },
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::Json(msg) => write!(f, "invalid json: {msg}"),
            PayloadError::NonFinite { what } => write!(f, "non-finite coordinate in {what}"),
            PayloadError::OutOfRange { what, dec_deg } => {
                write!(f, "declination {dec_deg} in {what} is outside [-90, 90]")
            }
            PayloadError::MissingIndex => write!(f, "level-0 tile has no tiles table"),
            PayloadError::BadIndex(msg) => write!(f, "bad tiles table: {msg}"),
            PayloadError::LengthMismatch {
                names,
                abbrevs,
                places,
            } => write!(
                f,
                "constellation tables disagree: names={names} abbrevs={abbrevs} places={places}"
            ),
        }
    }
}

impl std::error::Error for PayloadError {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Star {
    pub name: Option<String>,
    /// Bayer/Flamsteed designation, e.g. "α CMa".
    pub designation: Option<String>,
    pub ra: f64,
    pub dec: f64,
    pub mag: f64,
    pub hd: Option<u32>,
    pub hip: Option<u32>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DsoKind {
    Galaxy,
    OpenCluster,
    GlobularCluster,
    Nebula,
    PlanetaryNebula,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeepSkyObject {
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    pub mag: Option<f64>,
    pub kind: DsoKind,
    /// Major/minor axis in radians, if catalogued.
    pub axis_major: Option<f64>,
    pub axis_minor: Option<f64>,
    pub pos_ang: Option<f64>,
}

/// Immutable payload of one sky tile.
///
/// Ordering contract: `stars` and `dsos` are sorted faintest first so a
/// painter drawing in order never hides a bright object under a faint one.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyTile {
    pub key: SkyTileKey,
    pub stars: Vec<Star>,
    pub dsos: Vec<DeepSkyObject>,
}

/// A decoded tile plus the level table it carried (level 0 only).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTile {
    pub tile: SkyTile,
    pub index: Option<TileIndex>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TilePayload {
    #[serde(default)]
    pub stars: Vec<StarRecord>,
    #[serde(default)]
    pub dsos: Vec<DsoRecord>,
    #[serde(default)]
    pub tiles: Option<Vec<[f64; 3]>>,
}

/// Stars arrive either as `{ra, dec, mag, ...}` objects or as compact
/// `[ra, dec, mag, hd?, hip?, name?, designation?]` arrays.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StarRecord {
    Object(StarObject),
    Compact(Vec<serde_json::Value>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StarObject {
    pub ra: f64,
    pub dec: f64,
    pub mag: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub hd: Option<u32>,
    #[serde(default)]
    pub hip: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DsoRecord {
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    #[serde(default)]
    pub mag: Option<f64>,
    #[serde(default)]
    pub kind: DsoKind,
    #[serde(default)]
    pub axis_major: Option<f64>,
    #[serde(default)]
    pub axis_minor: Option<f64>,
    #[serde(default)]
    pub pos_ang: Option<f64>,
}

impl StarRecord {
    fn into_star(self) -> Result<Star, PayloadError> {
        let obj = match self {
            StarRecord::Object(obj) => obj,
            StarRecord::Compact(values) => compact_star(&values)?,
        };
        let eq = checked_position(obj.ra, obj.dec, "star")?;
        if !obj.mag.is_finite() {
            return Err(PayloadError::NonFinite { what: "star" });
        }
        Ok(Star {
            name: obj.name.filter(|n| !n.trim().is_empty()),
            designation: obj.designation.filter(|d| !d.trim().is_empty()),
            ra: eq.ra,
            dec: eq.dec,
            mag: obj.mag,
            hd: obj.hd,
            hip: obj.hip,
        })
    }
}

fn compact_star(values: &[serde_json::Value]) -> Result<StarObject, PayloadError> {
    let num = |i: usize| values.get(i).and_then(serde_json::Value::as_f64);
    let id = |i: usize| {
        values
            .get(i)
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    };
    let text = |i: usize| values.get(i).and_then(|v| v.as_str()).map(str::to_string);

    let (Some(ra), Some(dec), Some(mag)) = (num(0), num(1), num(2)) else {
        return Err(PayloadError::Json(format!(
            "compact star needs [ra, dec, mag], got {} fields",
            values.len()
        )));
    };
    Ok(StarObject {
        ra,
        dec,
        mag,
        hd: id(3),
        hip: id(4),
        name: text(5),
        designation: text(6),
    })
}

impl DsoRecord {
    fn into_dso(self) -> Result<DeepSkyObject, PayloadError> {
        let eq = checked_position(self.ra, self.dec, "deep-sky object")?;
        Ok(DeepSkyObject {
            name: self.name,
            ra: eq.ra,
            dec: eq.dec,
            mag: self.mag.filter(|m| m.is_finite()),
            kind: self.kind,
            axis_major: self.axis_major.filter(|a| a.is_finite()).map(f64::to_radians),
            axis_minor: self.axis_minor.filter(|a| a.is_finite()).map(f64::to_radians),
            pos_ang: self.pos_ang.filter(|a| a.is_finite()).map(f64::to_radians),
        })
    }
}

fn checked_position(
    ra_deg: f64,
    dec_deg: f64,
    what: &'static str,
) -> Result<Equatorial, PayloadError> {
    if !ra_deg.is_finite() || !dec_deg.is_finite() {
        return Err(PayloadError::NonFinite { what });
    }
    if dec_deg.abs() > 90.0 {
        return Err(PayloadError::OutOfRange { what, dec_deg });
    }
    Ok(Equatorial::from_degrees(ra_deg, dec_deg))
}

fn decode_index(rows: &[[f64; 3]]) -> Result<TileIndex, PayloadError> {
    if rows.is_empty() {
        return Err(PayloadError::BadIndex("empty".to_string()));
    }
    let mut levels = Vec::with_capacity(rows.len());
    for (i, [mag_limit, ra_div, dec_div]) in rows.iter().copied().enumerate() {
        let valid_div =
            |d: f64| d.is_finite() && d >= 1.0 && d.fract() == 0.0 && d <= u32::MAX as f64;
        if !mag_limit.is_finite() || !valid_div(ra_div) || !valid_div(dec_div) {
            return Err(PayloadError::BadIndex(format!(
                "level {i}: [{mag_limit}, {ra_div}, {dec_div}]"
            )));
        }
        levels.push(TileLevel {
            mag_limit,
            ra_divisions: ra_div as u32,
            dec_divisions: dec_div as u32,
        });
    }
    Ok(TileIndex::new(levels))
}

/// Decodes one tile body fetched for `key`.
pub fn decode_tile(key: SkyTileKey, body: &[u8]) -> Result<DecodedTile, PayloadError> {
    let payload: TilePayload =
        serde_json::from_slice(body).map_err(|e| PayloadError::Json(e.to_string()))?;

    let index = match (&payload.tiles, key.level) {
        (Some(rows), _) => Some(decode_index(rows)?),
        (None, 0) => return Err(PayloadError::MissingIndex),
        (None, _) => None,
    };

    let mut stars = payload
        .stars
        .into_iter()
        .map(StarRecord::into_star)
        .collect::<Result<Vec<_>, _>>()?;
    let mut dsos = payload
        .dsos
        .into_iter()
        .map(DsoRecord::into_dso)
        .collect::<Result<Vec<_>, _>>()?;

    // Faintest first; ties keep catalog order.
    stars.sort_by(|a, b| stable_total_cmp_f64(b.mag, a.mag));
    dsos.sort_by(|a, b| stable_total_cmp_f64(dso_sort_mag(b), dso_sort_mag(a)));

    Ok(DecodedTile {
        tile: SkyTile { key, stars, dsos },
        index,
    })
}

/// Objects without a catalogued magnitude are treated as faint.
pub fn dso_sort_mag(dso: &DeepSkyObject) -> f64 {
    dso.mag.unwrap_or(99.0)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConstellationPayload {
    #[serde(default)]
    pub boundaries: Vec<Vec<[f64; 2]>>,
    #[serde(default)]
    pub lines: ConstellationLinesPayload,
    #[serde(default)]
    pub name_places: Vec<[f64; 2]>,
    #[serde(default)]
    pub abbrevs: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConstellationLinesPayload {
    #[serde(default)]
    pub simplified: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstellationLabel {
    pub abbrev: String,
    pub name: String,
    pub position: Equatorial,
}

/// Read-only constellation geometry for one chart session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstellationData {
    /// Boundary polylines.
    pub boundaries: Vec<Vec<Equatorial>>,
    /// Stick-figure line strips.
    pub lines: Vec<Vec<Equatorial>>,
    pub labels: Vec<ConstellationLabel>,
}

fn decode_strips(
    strips: &[Vec<[f64; 2]>],
    what: &'static str,
) -> Result<Vec<Vec<Equatorial>>, PayloadError> {
    strips
        .iter()
        .map(|strip| {
            strip
                .iter()
                .map(|[ra, dec]| checked_position(*ra, *dec, what))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

pub fn decode_constellations(body: &[u8]) -> Result<ConstellationData, PayloadError> {
    let payload: ConstellationPayload =
        serde_json::from_slice(body).map_err(|e| PayloadError::Json(e.to_string()))?;

    let places = payload.name_places.len();
    if payload.names.len() != places || payload.abbrevs.len() != places {
        return Err(PayloadError::LengthMismatch {
            names: payload.names.len(),
            abbrevs: payload.abbrevs.len(),
            places,
        });
    }

    let labels = payload
        .name_places
        .iter()
        .zip(payload.abbrevs)
        .zip(payload.names)
        .map(|(([ra, dec], abbrev), name)| {
            Ok(ConstellationLabel {
                abbrev,
                name,
                position: checked_position(*ra, *dec, "constellation label")?,
            })
        })
        .collect::<Result<Vec<_>, PayloadError>>()?;

    Ok(ConstellationData {
        boundaries: decode_strips(&payload.boundaries, "constellation boundary")?,
        lines: decode_strips(&payload.lines.simplified, "constellation line")?,
        labels,
    })
}
