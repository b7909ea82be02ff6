//! Tunables for tree construction, polygon grids and nearest-neighbor search.
//!
//! Every field has a serde default, so partial JSON or TOML documents load.

use crate::error::{Result, SpatioError};
use serde::{Deserialize, Serialize};

/// Index and query configuration.
///
/// # Example
///
/// ```rust
/// use spatio_points::Config;
///
/// let config = Config::default();
/// assert_eq!(config.grid_size, 32);
///
/// let json = r#"{ "max_points_in_leaf_node": 128 }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.max_points_in_leaf_node, 128);
/// assert_eq!(config.nearest.bbox_refresh_warmup, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Upper bound on the number of points stored in one leaf block.
    #[serde(default = "Config::default_max_points_in_leaf_node")]
    pub max_points_in_leaf_node: usize,

    /// Cells per side of a polygon grid. Must be a power of two.
    #[serde(default = "Config::default_grid_size")]
    pub grid_size: usize,

    /// Nearest-neighbor search tuning
    #[serde(default)]
    pub nearest: NearestConfig,
}

/// How often a nearest-neighbor search shrinks its acceptance box.
///
/// The box is recomputed on each of the first `bbox_refresh_warmup` updates
/// of the worst hit, then only once every `bbox_refresh_interval` updates.
/// Results do not depend on these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearestConfig {
    #[serde(default = "NearestConfig::default_bbox_refresh_warmup")]
    pub bbox_refresh_warmup: u32,

    #[serde(default = "NearestConfig::default_bbox_refresh_interval")]
    pub bbox_refresh_interval: u32,
}

impl NearestConfig {
    const fn default_bbox_refresh_warmup() -> u32 {
        1024
    }

    const fn default_bbox_refresh_interval() -> u32 {
        64
    }

    /// True when the `counter`-th update should rebuild the acceptance box.
    #[inline]
    pub fn should_refresh(&self, counter: u32) -> bool {
        let mask = self.bbox_refresh_interval.saturating_sub(1);
        counter < self.bbox_refresh_warmup || (counter & mask) == mask
    }
}

impl Default for NearestConfig {
    fn default() -> Self {
        Self {
            bbox_refresh_warmup: Self::default_bbox_refresh_warmup(),
            bbox_refresh_interval: Self::default_bbox_refresh_interval(),
        }
    }
}

impl Config {
    pub const MAX_GRID_SIZE: usize = 1 << 10;
    pub const MAX_POINTS_IN_LEAF_NODE: usize = 1 << 16;

    const fn default_max_points_in_leaf_node() -> usize {
        512
    }

    const fn default_grid_size() -> usize {
        32
    }

    pub fn with_max_points_in_leaf_node(mut self, max_points: usize) -> Self {
        self.max_points_in_leaf_node = max_points;
        self
    }

    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_nearest(mut self, nearest: NearestConfig) -> Self {
        self.nearest = nearest;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_points_in_leaf_node == 0
            || self.max_points_in_leaf_node > Self::MAX_POINTS_IN_LEAF_NODE
        {
            return Err(format!(
                "max_points_in_leaf_node must be between 1 and {}, got: {}",
                Self::MAX_POINTS_IN_LEAF_NODE,
                self.max_points_in_leaf_node
            ));
        }

        if !self.grid_size.is_power_of_two()
            || self.grid_size < 2
            || self.grid_size > Self::MAX_GRID_SIZE
        {
            return Err(format!(
                "grid_size must be a power of two between 2 and {}, got: {}",
                Self::MAX_GRID_SIZE,
                self.grid_size
            ));
        }

        if !self.nearest.bbox_refresh_interval.is_power_of_two() {
            return Err(format!(
                "nearest.bbox_refresh_interval must be a power of two, got: {}",
                self.nearest.bbox_refresh_interval
            ));
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate().map_err(SpatioError::Config)?;
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(toml_str).map_err(|e| SpatioError::Config(e.to_string()))?;
        config.validate().map_err(SpatioError::Config)?;
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SpatioError::Config(e.to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_points_in_leaf_node: Self::default_max_points_in_leaf_node(),
            grid_size: Self::default_grid_size(),
            nearest: NearestConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_points_in_leaf_node, 512);
        assert_eq!(config.grid_size, 32);
    }

    #[test]
    fn test_grid_size_must_be_power_of_two() {
        let config = Config::default().with_grid_size(48);
        let err = config.validate().unwrap_err();
        assert!(err.contains("power of two"));

        assert!(Config::default().with_grid_size(1).validate().is_err());
        assert!(Config::default().with_grid_size(2048).validate().is_err());
        assert!(Config::default().with_grid_size(64).validate().is_ok());
    }

    #[test]
    fn test_leaf_size_bounds() {
        assert!(
            Config::default()
                .with_max_points_in_leaf_node(0)
                .validate()
                .is_err()
        );
        assert!(
            Config::default()
                .with_max_points_in_leaf_node(1)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_json_round_trip() {
        let config = Config::default()
            .with_grid_size(64)
            .with_max_points_in_leaf_node(100);
        let json = config.to_json().unwrap();
        let loaded = Config::from_json(&json).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        let err = Config::from_json(r#"{ "grid_size": 30 }"#).unwrap_err();
        assert!(matches!(err, SpatioError::Config(_)));
    }

    #[test]
    fn test_refresh_schedule() {
        let nearest = NearestConfig::default();
        assert!(nearest.should_refresh(0));
        assert!(nearest.should_refresh(1023));
        assert!(!nearest.should_refresh(1024));
        assert!(nearest.should_refresh(1024 + 63));
        assert!(!nearest.should_refresh(1024 + 64));

        let every_time = NearestConfig {
            bbox_refresh_warmup: 0,
            bbox_refresh_interval: 1,
        };
        assert!(every_time.should_refresh(12345));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_round_trip() {
        let config = Config::default().with_grid_size(16);
        let text = config.to_toml().unwrap();
        let loaded = Config::from_toml(&text).unwrap();
        assert_eq!(config, loaded);
    }
}
