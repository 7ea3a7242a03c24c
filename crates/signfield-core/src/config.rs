//! Editor configuration.

use crate::error::ConfigError;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(target_arch = "wasm32")]
use web_time::Duration;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

/// How drag and resize gestures write geometry into the field store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragMode {
    /// Every pointer move updates the field.
    #[default]
    Live,
    /// The field is updated once, on pointer-up.
    Batched,
}

/// Tunables for an editing session.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Quiet period after the last field mutation before blocks are reconciled.
    pub debounce_ms: u64,
    /// Smallest width/height a field can be resized to, in document units.
    pub min_field_size: f64,
    /// Offset applied to both axes when duplicating a field, in document units.
    pub duplicate_offset: f64,
    /// Lower bound of the zoom range.
    pub min_scale: f64,
    /// Upper bound of the zoom range.
    pub max_scale: f64,
    /// Hit radius of resize handles in screen pixels.
    pub handle_hit_radius_px: f64,
    pub drag_mode: DragMode,
    /// Placement size used when the kind registry has none.
    pub default_field_size: Size,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            min_field_size: 10.0,
            duplicate_offset: 20.0,
            min_scale: 0.5,
            max_scale: 3.0,
            handle_hit_radius_px: 8.0,
            drag_mode: DragMode::Live,
            default_field_size: Size::new(150.0, 40.0),
        }
    }
}

impl EditorConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. A missing file yields `Ok(None)`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map(Some)
    }

    /// Check the invariants the editing core relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_field_size > 0.0 && self.min_field_size.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "minFieldSize must be positive, got {}",
                self.min_field_size
            )));
        }
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale) {
            return Err(ConfigError::Invalid(format!(
                "scale range [{}, {}] is empty or non-positive",
                self.min_scale, self.max_scale
            )));
        }
        if self.default_field_size.width < self.min_field_size
            || self.default_field_size.height < self.min_field_size
        {
            return Err(ConfigError::Invalid(
                "defaultFieldSize is smaller than minFieldSize".to_string(),
            ));
        }
        if self.handle_hit_radius_px < 0.0 {
            return Err(ConfigError::Invalid(
                "handleHitRadiusPx must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// The debounce window as a duration.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Clamp a zoom scale into the configured range.
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.min_scale;
        }
        scale.max(self.min_scale).min(self.max_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.debounce_window(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EditorConfig::from_json(r#"{ "debounceMs": 250, "dragMode": "batched" }"#).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.drag_mode, DragMode::Batched);
        assert!((config.min_field_size - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_inverted_scale_range() {
        let result = EditorConfig::from_json(r#"{ "minScale": 3.0, "maxScale": 0.5 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = EditorConfig::from_json("{ not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_clamp_scale() {
        let config = EditorConfig::default();
        assert!((config.clamp_scale(0.1) - 0.5).abs() < f64::EPSILON);
        assert!((config.clamp_scale(10.0) - 3.0).abs() < f64::EPSILON);
        assert!((config.clamp_scale(1.25) - 1.25).abs() < f64::EPSILON);
        assert!((config.clamp_scale(f64::NAN) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = EditorConfig::load_from_path(dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");
        std::fs::write(&path, r#"{ "minFieldSize": 12.0 }"#).unwrap();
        let loaded = EditorConfig::load_from_path(&path).unwrap().unwrap();
        assert!((loaded.min_field_size - 12.0).abs() < f64::EPSILON);
    }
}
