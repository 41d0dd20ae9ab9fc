use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collision::{CollisionParams, DEFAULT_CHECK_RADIUS, DEFAULT_PLAYER_RADIUS};
use crate::coords::{TileScale, Viewport, DEFAULT_TILE_SIZE_PX, ZOOM_DEFAULT, ZOOM_MAX, ZOOM_MIN};
use crate::entities::DEFAULT_ENTITY_CHUNK_SIZE;
use crate::map::DEFAULT_VIEW_BIAS;

pub const ZOOM_ENV_VAR: &str = "REALM_ZOOM";
pub const TICKS_ENV_VAR: &str = "REALM_TICKS";
pub const TPS_ENV_VAR: &str = "REALM_TPS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("environment variable {var} has invalid value '{value}'")]
    EnvValue { var: &'static str, value: String },
    #[error("config field {field} is invalid: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub base_tile_size: f32,
    pub zoom: f32,
    /// World tiles per entity bucket edge.
    pub entity_chunk_size: u32,
    pub view_bias: i32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub player_radius: f32,
    pub check_radius: i32,
    pub mob_chase_radius_tiles: f32,
    pub mob_flee_hp_fraction: f32,
    pub target_tps: u32,
    pub ticks: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_tile_size: DEFAULT_TILE_SIZE_PX,
            zoom: ZOOM_DEFAULT,
            entity_chunk_size: DEFAULT_ENTITY_CHUNK_SIZE,
            view_bias: DEFAULT_VIEW_BIAS,
            viewport_width: 1280,
            viewport_height: 720,
            player_radius: DEFAULT_PLAYER_RADIUS,
            check_radius: DEFAULT_CHECK_RADIUS,
            mob_chase_radius_tiles: 6.0,
            mob_flee_hp_fraction: 0.25,
            target_tps: 60,
            ticks: 600,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        let config: EngineConfig =
            serde_path_to_error::deserialize(deserializer).map_err(|error| ConfigError::Parse {
                path: error.path().to_string(),
                source: error.into_inner(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Applies `REALM_*` overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(zoom) = parse_env(&lookup, ZOOM_ENV_VAR)? {
            self.zoom = zoom;
        }
        if let Some(ticks) = parse_env(&lookup, TICKS_ENV_VAR)? {
            self.ticks = ticks;
        }
        if let Some(tps) = parse_env(&lookup, TPS_ENV_VAR)? {
            self.target_tps = tps;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_tile_size.is_finite() && self.base_tile_size > 0.0) {
            return Err(invalid("base_tile_size", "must be a positive number"));
        }
        if !(ZOOM_MIN..=ZOOM_MAX).contains(&self.zoom) {
            return Err(invalid(
                "zoom",
                format!("must be within [{ZOOM_MIN}, {ZOOM_MAX}]"),
            ));
        }
        if self.entity_chunk_size == 0 {
            return Err(invalid("entity_chunk_size", "must be at least 1"));
        }
        if self.view_bias < 0 {
            return Err(invalid("view_bias", "must not be negative"));
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(invalid("viewport", "width and height must be non-zero"));
        }
        if !(self.player_radius > 0.0 && self.player_radius < 1.0) {
            return Err(invalid("player_radius", "must be within (0, 1) tiles"));
        }
        if self.check_radius < 1 {
            return Err(invalid("check_radius", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.mob_flee_hp_fraction) {
            return Err(invalid("mob_flee_hp_fraction", "must be within [0, 1]"));
        }
        if self.mob_chase_radius_tiles < 0.0 {
            return Err(invalid("mob_chase_radius_tiles", "must not be negative"));
        }
        if self.target_tps == 0 {
            return Err(invalid("target_tps", "must be at least 1"));
        }
        Ok(())
    }

    pub fn tile_scale(&self) -> TileScale {
        TileScale::new(self.base_tile_size, self.zoom)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.viewport_width,
            height: self.viewport_height,
        }
    }

    pub fn collision_params(&self) -> CollisionParams {
        CollisionParams {
            player_radius: self.player_radius,
            check_radius: self.check_radius,
            ..CollisionParams::default()
        }
    }

    pub fn fixed_dt_seconds(&self) -> f32 {
        1.0 / self.target_tps.max(1) as f32
    }
}

fn parse_env<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::EnvValue { var, value: raw })
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config = EngineConfig::from_json_str(r#"{"zoom": 2.0}"#).expect("config");
        assert_eq!(config.zoom, 2.0);
        assert_eq!(config.entity_chunk_size, 32);
        assert_eq!(config.tile_scale().scaled_tile_size(), 64.0);
    }

    #[test]
    fn parse_error_names_the_field() {
        match EngineConfig::from_json_str(r#"{"ticks": "many"}"#).expect_err("should fail") {
            ConfigError::Parse { path, .. } => assert_eq!(path, "ticks"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"zooom": 1.0}"#),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"zoom": 9.0}"#),
            Err(ConfigError::Invalid { field: "zoom", .. })
        ));
        let config = EngineConfig {
            check_radius: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "check_radius",
                ..
            })
        ));
    }

    #[test]
    fn env_overrides_apply_and_validate() {
        let mut config = EngineConfig::default();
        config
            .apply_env_overrides(env(&[(ZOOM_ENV_VAR, "1.5"), (TICKS_ENV_VAR, " 42 ")]))
            .expect("overrides");
        assert_eq!(config.zoom, 1.5);
        assert_eq!(config.ticks, 42);
        assert_eq!(config.target_tps, 60);

        let error = config
            .apply_env_overrides(env(&[(TPS_ENV_VAR, "fast")]))
            .expect_err("bad tps");
        assert!(matches!(error, ConfigError::EnvValue { var: TPS_ENV_VAR, .. }));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("realm.json");
        fs::write(&path, r#"{"ticks": 5, "target_tps": 30}"#).expect("write");
        let config = EngineConfig::load_from_file(&path).expect("load");
        assert_eq!(config.ticks, 5);
        assert_eq!(config.fixed_dt_seconds(), 1.0 / 30.0);
        assert!(matches!(
            EngineConfig::load_from_file(&dir.path().join("missing.json")),
            Err(ConfigError::ReadFile { .. })
        ));
    }
}
