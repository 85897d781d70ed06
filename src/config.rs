//! Engine configuration.
//!
//! `Config` is plain serializable data so it can be loaded from JSON (or TOML
//! with the `toml` feature). Strategy objects (reducer, animation, delegate)
//! are runtime values and live on the controller instead; the registries in
//! [`crate::reduce`] and [`crate::animation`] bridge the gap when strategies
//! are selected by name from a config file.

use serde::de::Error;
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Policy deciding when a candidate cluster is a continuation of a previous
/// cluster, preserving marker identity across recomputes.
///
/// Matching by continuity avoids the remove+add animation flicker that would
/// otherwise occur on every pan. `Never` disables continuity tracking
/// entirely: every recompute tears all markers down and recreates them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ReusePolicy {
    /// Every candidate is new, every previous cluster is removed.
    Never,
    /// A candidate continues a previous cluster iff their keys match
    /// (same cell indices, or same singleton identity).
    #[default]
    CellIdentity,
    /// Key-equality matches first, then candidates may continue a previous
    /// cluster when `|old ∩ new| / max(|old|, |new|) >= min_fraction`.
    MemberOverlap { min_fraction: f64 },
}

/// Clustering engine configuration.
///
/// # Example
///
/// ```rust
/// use mapcluster::{Config, ReusePolicy};
///
/// let config = Config::default()
///     .with_cell_size_points(80.0)
///     .with_margin_factor(0.25)
///     .with_max_zoom_level_for_clustering(15.0)
///     .with_reuse_policy(ReusePolicy::MemberOverlap { min_fraction: 0.5 });
/// assert!(config.validate().is_ok());
///
/// // Or load from JSON; missing fields take their defaults.
/// let config = Config::from_json(r#"{ "cell_size_points": 90.0 }"#).unwrap();
/// assert_eq!(config.cell_size_points, 90.0);
/// assert_eq!(config.margin_factor, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Multiplier extending the visible region symmetrically in each
    /// dimension, so annotations just outside the viewport cluster with
    /// on-screen ones instead of popping in at the edges (default: 0.5).
    #[serde(default = "Config::default_margin_factor")]
    pub margin_factor: f64,

    /// Grid cell size in screen points (default: 60). A non-positive value
    /// disables clustering: every in-region annotation becomes a singleton.
    #[serde(default = "Config::default_cell_size_points")]
    pub cell_size_points: f64,

    /// Zoom level above which clustering is disabled and every annotation is
    /// a singleton. `None` means clustering at every zoom (default).
    #[serde(default)]
    pub max_zoom_level_for_clustering: Option<f64>,

    /// Minimum number of distinct coordinates in a cell before the cell is
    /// clustered; below it, each point is emitted as its own singleton.
    /// 0 disables the check entirely (default).
    #[serde(default)]
    pub min_unique_locations_for_clustering: usize,

    /// How candidate clusters are matched against the previous snapshot
    /// (default: `CellIdentity`).
    #[serde(default)]
    pub reuse_policy: ReusePolicy,
}

impl Config {
    const fn default_margin_factor() -> f64 {
        0.5
    }

    const fn default_cell_size_points() -> f64 {
        60.0
    }

    pub fn with_margin_factor(mut self, margin_factor: f64) -> Self {
        self.margin_factor = margin_factor;
        self
    }

    pub fn with_cell_size_points(mut self, cell_size_points: f64) -> Self {
        self.cell_size_points = cell_size_points;
        self
    }

    pub fn with_max_zoom_level_for_clustering(mut self, max_zoom: f64) -> Self {
        self.max_zoom_level_for_clustering = Some(max_zoom);
        self
    }

    pub fn with_min_unique_locations_for_clustering(mut self, min_unique: usize) -> Self {
        self.min_unique_locations_for_clustering = min_unique;
        self
    }

    pub fn with_reuse_policy(mut self, policy: ReusePolicy) -> Self {
        self.reuse_policy = policy;
        self
    }

    /// Convenience mapping of the classic boolean switch onto the reuse
    /// policy: `true` restores the default cell-identity matching, `false`
    /// disables continuity tracking.
    pub fn reuse_existing_cluster_annotations(mut self, reuse: bool) -> Self {
        self.reuse_policy = if reuse {
            ReusePolicy::CellIdentity
        } else {
            ReusePolicy::Never
        };
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !self.margin_factor.is_finite() || self.margin_factor < 0.0 {
            return Err(ClusterError::InvalidConfig(
                "margin factor must be finite and non-negative".to_string(),
            ));
        }

        if self.cell_size_points.is_nan() {
            return Err(ClusterError::InvalidConfig(
                "cell size must not be NaN".to_string(),
            ));
        }

        if let Some(max_zoom) = self.max_zoom_level_for_clustering
            && max_zoom.is_nan()
        {
            return Err(ClusterError::InvalidConfig(
                "max zoom level must not be NaN".to_string(),
            ));
        }

        if let ReusePolicy::MemberOverlap { min_fraction } = self.reuse_policy
            && !(min_fraction.is_finite() && min_fraction > 0.0 && min_fraction <= 1.0)
        {
            return Err(ClusterError::InvalidConfig(
                "member overlap fraction must be in (0, 1]".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as a JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from a TOML string (requires the `toml` feature).
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as a TOML string (requires the `toml` feature).
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Whether clustering is active at the given zoom level.
    pub(crate) fn clustering_enabled_at(&self, zoom: f64) -> bool {
        if self.cell_size_points <= 0.0 {
            return false;
        }
        match self.max_zoom_level_for_clustering {
            Some(max_zoom) => zoom <= max_zoom,
            None => true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            margin_factor: Self::default_margin_factor(),
            cell_size_points: Self::default_cell_size_points(),
            max_zoom_level_for_clustering: None,
            min_unique_locations_for_clustering: 0,
            reuse_policy: ReusePolicy::default(),
        }
    }
}
