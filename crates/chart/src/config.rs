use serde::{Deserialize, Serialize};

use foundation::view::{CanvasSize, MAX_HALF_WIDTH, MIN_HALF_WIDTH, MagnitudeScale, ViewState};
use layers::DisplayOptions;
use runtime::ChartMode;
use streaming::{DEFAULT_SAMPLING_GRID, RetryPolicy};

/// Environment variable consulted when the config carries no tile URL.
pub const TILE_BASE_ENV: &str = "SKYCHART_TILES";

fn default_fov_deg() -> f64 {
    30.0
}

fn default_width() -> f64 {
    800.0
}

fn default_height() -> f64 {
    600.0
}

fn default_sampling_grid() -> u32 {
    DEFAULT_SAMPLING_GRID
}

fn default_bright_limit() -> f64 {
    4.0
}

fn default_faint_limit() -> f64 {
    13.0
}

fn default_reference_fov_deg() -> f64 {
    60.0
}

/// Limiting-magnitude curve; the reference is a full field of view.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeConfig {
    #[serde(default = "default_bright_limit")]
    pub bright_limit: f64,
    #[serde(default = "default_faint_limit")]
    pub faint_limit: f64,
    #[serde(default = "default_reference_fov_deg")]
    pub reference_fov_deg: f64,
}

impl Default for MagnitudeConfig {
    fn default() -> Self {
        Self {
            bright_limit: default_bright_limit(),
            faint_limit: default_faint_limit(),
            reference_fov_deg: default_reference_fov_deg(),
        }
    }
}

impl From<MagnitudeConfig> for MagnitudeScale {
    fn from(m: MagnitudeConfig) -> Self {
        MagnitudeScale {
            bright_limit: m.bright_limit,
            faint_limit: m.faint_limit,
            reference_half_width: (m.reference_fov_deg / 2.0).to_radians(),
        }
    }
}

/// Chart settings as supplied by the host page. Angles are degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default)]
    pub ra_deg: f64,
    #[serde(default)]
    pub dec_deg: f64,
    /// Horizontal field of view of the lens.
    #[serde(default = "default_fov_deg")]
    pub fov_deg: f64,
    #[serde(default)]
    pub pos_ang_deg: f64,
    #[serde(default)]
    pub k1: f64,
    #[serde(default)]
    pub k2: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default)]
    pub mode: ChartMode,
    /// Base URL of the tile server; falls back to `SKYCHART_TILES`.
    #[serde(default)]
    pub tile_base: Option<String>,
    #[serde(default = "default_sampling_grid")]
    pub sampling_grid: u32,
    #[serde(default)]
    pub magnitude: MagnitudeConfig,
    #[serde(default)]
    pub display: DisplayOptions,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Fixed seed for pick colors; random when absent.
    #[serde(default)]
    pub pick_seed: Option<u64>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            ra_deg: 0.0,
            dec_deg: 0.0,
            fov_deg: default_fov_deg(),
            pos_ang_deg: 0.0,
            k1: 0.0,
            k2: 0.0,
            width: default_width(),
            height: default_height(),
            mode: ChartMode::default(),
            tile_base: None,
            sampling_grid: default_sampling_grid(),
            magnitude: MagnitudeConfig::default(),
            display: DisplayOptions::default(),
            retry: RetryPolicy::default(),
            pick_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Json(String),
    Invalid { field: &'static str, reason: String },
    MissingTileBase,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Json(msg) => write!(f, "config is not valid JSON: {msg}"),
            ConfigError::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
            ConfigError::MissingTileBase => {
                write!(f, "no tile server configured (set tile_base or {TILE_BASE_ENV})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is not finite"),
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must be positive"),
        })
    }
}

impl ChartConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ChartConfig =
            serde_json::from_str(text).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        finite("ra_deg", self.ra_deg)?;
        finite("dec_deg", self.dec_deg)?;
        if self.dec_deg.abs() > 90.0 {
            return Err(ConfigError::Invalid {
                field: "dec_deg",
                reason: format!("{} is outside [-90, 90]", self.dec_deg),
            });
        }
        positive("fov_deg", self.fov_deg)?;
        // Same bounds the view clamps zoom to; tolerance absorbs degree rounding.
        let half_width = (self.fov_deg / 2.0).to_radians();
        if half_width < MIN_HALF_WIDTH - 1e-12 || half_width > MAX_HALF_WIDTH + 1e-12 {
            return Err(ConfigError::Invalid {
                field: "fov_deg",
                reason: format!(
                    "{} is outside [{}, {}]",
                    self.fov_deg,
                    2.0 * MIN_HALF_WIDTH.to_degrees(),
                    2.0 * MAX_HALF_WIDTH.to_degrees()
                ),
            });
        }
        finite("pos_ang_deg", self.pos_ang_deg)?;
        finite("k1", self.k1)?;
        finite("k2", self.k2)?;
        positive("width", self.width)?;
        positive("height", self.height)?;
        if self.sampling_grid < 2 {
            return Err(ConfigError::Invalid {
                field: "sampling_grid",
                reason: "needs at least 2 samples per axis".to_string(),
            });
        }
        positive("magnitude.reference_fov_deg", self.magnitude.reference_fov_deg)?;
        Ok(())
    }

    pub fn view_state(&self) -> ViewState {
        ViewState::new(
            self.ra_deg.to_radians(),
            self.dec_deg.to_radians(),
            self.fov_deg.to_radians(),
            CanvasSize::new(self.width, self.height),
        )
        .with_distortion(self.k1, self.k2)
        .with_position_angle(self.pos_ang_deg.to_radians())
        .with_magnitude_scale(self.magnitude.into())
    }

    /// Tile server URL from the config, or from `SKYCHART_TILES`.
    pub fn tile_base(&self) -> Result<String, ConfigError> {
        self.tile_base
            .clone()
            .or_else(|| std::env::var(TILE_BASE_ENV).ok())
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingTileBase)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChartConfig, ConfigError};
    use pretty_assertions::assert_eq;
    use runtime::ChartMode;

    #[test]
    fn empty_object_takes_defaults() {
        let config = ChartConfig::from_json("{}").unwrap();
        assert_eq!(config, ChartConfig::default());
        assert_eq!(config.sampling_grid, 11);
        assert!(config.display.grid);
    }

    #[test]
    fn host_settings_reach_the_view() {
        let config = ChartConfig::from_json(
            r#"{
                "ra_deg": 83.8, "dec_deg": -5.4, "fov_deg": 10,
                "pos_ang_deg": 90, "k1": 0.02,
                "width": 1000, "height": 500, "mode": "static",
                "display": { "grid": false },
                "retry": { "max_malformed_attempts": 5 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.mode, ChartMode::Static);
        assert!(!config.display.grid);
        assert!(config.display.star_names);
        assert_eq!(config.retry.max_malformed_attempts, 5);
        assert_eq!(config.retry.base_delay_s, 0.5);

        let view = config.view_state();
        assert!((view.ra0 - 83.8f64.to_radians()).abs() < 1e-12);
        assert!((view.scale_x - 5f64.to_radians()).abs() < 1e-12);
        assert!((view.scale_y.tan() / view.scale_x.tan() - 0.5).abs() < 1e-12);
        assert!((view.pos_ang - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(view.k1, 0.02);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(ChartConfig::from_json("[1"), Err(ConfigError::Json(_))));
        assert!(matches!(
            ChartConfig::from_json(r#"{"fov_deg": 0}"#),
            Err(ConfigError::Invalid { field: "fov_deg", .. })
        ));
        assert!(matches!(
            ChartConfig::from_json(r#"{"fov_deg": 170}"#),
            Err(ConfigError::Invalid { field: "fov_deg", .. })
        ));
        assert!(matches!(
            ChartConfig::from_json(r#"{"fov_deg": 0.1}"#),
            Err(ConfigError::Invalid { field: "fov_deg", .. })
        ));
        assert!(ChartConfig::from_json(r#"{"fov_deg": 160}"#).is_ok());
        assert!(matches!(
            ChartConfig::from_json(r#"{"dec_deg": 91}"#),
            Err(ConfigError::Invalid { field: "dec_deg", .. })
        ));
        assert!(matches!(
            ChartConfig::from_json(r#"{"sampling_grid": 1}"#),
            Err(ConfigError::Invalid { field: "sampling_grid", .. })
        ));
    }

    #[test]
    fn explicit_tile_base_wins() {
        let config = ChartConfig {
            tile_base: Some("http://tiles.test".to_string()),
            ..ChartConfig::default()
        };
        assert_eq!(config.tile_base().unwrap(), "http://tiles.test");
    }
}
