#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! TOML configuration for the accident map toolchain.
//!
//! The default configuration is baked into the binary via [`include_str!`].
//! An optional user file is merged on top of it key by key, and a handful of
//! environment variables (`ACCIDENT_MAP_DATA`, `BIND_ADDR`, `PORT`) take the
//! final say.

use std::path::{Path, PathBuf};

use accident_map_analytics_models::{BlackspotParams, FilterCriteria};
use serde::Deserialize;
use thiserror::Error;

/// Embedded default configuration.
const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Environment variable naming an optional configuration file.
pub const CONFIG_ENV: &str = "ACCIDENT_MAP_CONFIG";
/// Environment variable overriding `data.path`.
pub const DATA_ENV: &str = "ACCIDENT_MAP_DATA";
/// Environment variable overriding `server.bind_addr`.
pub const BIND_ADDR_ENV: &str = "BIND_ADDR";
/// Environment variable overriding `server.port`.
pub const PORT_ENV: &str = "PORT";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or does not match the schema.
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is present but out of range.
    #[error("Invalid config: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Input dataset settings.
    pub data: DataConfig,
    /// Default blackspot clustering parameters.
    pub blackspots: BlackspotDefaults,
    /// HTTP API settings.
    pub server: ServerConfig,
}

/// Input dataset settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataConfig {
    /// Path to the `GeoJSON` `FeatureCollection`.
    pub path: PathBuf,
    /// Bounding box outside of which records are discarded.
    pub bounds: SwissBounds,
}

/// WGS84 bounding box used to validate accident coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SwissBounds {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl Default for SwissBounds {
    fn default() -> Self {
        Self {
            min_lat: 45.0,
            max_lat: 48.0,
            min_lon: 5.0,
            max_lon: 11.0,
        }
    }
}

impl SwissBounds {
    /// Whether the point lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Default DBSCAN parameters for blackspot detection.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BlackspotDefaults {
    /// Neighbourhood radius in kilometres.
    pub eps_km: f64,
    /// Minimum accidents per zone.
    pub min_samples: usize,
    /// Radius used for cyclist-only blackspots.
    pub bicycle_eps_km: f64,
    /// Minimum accidents per cyclist-only zone.
    pub bicycle_min_samples: usize,
}

impl BlackspotDefaults {
    /// Clustering parameters for a request filtered by `criteria`.
    /// Cyclist-only filters get the tighter bicycle parameters.
    #[must_use]
    pub fn params_for(&self, criteria: &FilterCriteria) -> BlackspotParams {
        if criteria.is_bicycle_only() {
            BlackspotParams {
                eps_km: self.bicycle_eps_km,
                min_samples: self.bicycle_min_samples,
            }
        } else {
            BlackspotParams {
                eps_km: self.eps_km,
                min_samples: self.min_samples,
            }
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Maximum number of cached query results.
    pub cache_capacity: usize,
    /// Page size when `limit` is not given.
    pub default_page_limit: usize,
    /// Upper bound on `limit`.
    pub max_page_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        // The embedded file is covered by `default_config_parses`.
        parse_config(DEFAULT_TOML).unwrap_or_else(|e| panic!("embedded default.toml: {e}"))
    }
}

impl AppConfig {
    /// Loads the configuration: embedded defaults, then `path` (or the file
    /// named by `ACCIDENT_MAP_CONFIG`), then environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or a
    /// value is out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`AppConfig::load`] with environment lookups answered by `lookup`.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::load`].
    pub fn load_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| lookup(CONFIG_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                let contents = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                parse_config(&contents)?
            }
            None => parse_config(DEFAULT_TOML)?,
        };

        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Applies `ACCIDENT_MAP_DATA`, `BIND_ADDR` and `PORT` overrides from
    /// the given lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(DATA_ENV) {
            self.data.path = PathBuf::from(path);
        }
        if let Some(addr) = lookup(BIND_ADDR_ENV) {
            self.server.bind_addr = addr;
        }
        if let Some(port) = lookup(PORT_ENV) {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => log::warn!("Ignoring invalid {PORT_ENV} '{port}': {e}"),
            }
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.data.bounds;
        if b.min_lat >= b.max_lat || b.min_lon >= b.max_lon {
            return Err(invalid("data.bounds must have min < max"));
        }
        for (name, eps) in [
            ("blackspots.eps_km", self.blackspots.eps_km),
            ("blackspots.bicycle_eps_km", self.blackspots.bicycle_eps_km),
        ] {
            if eps.is_nan() || eps <= 0.0 {
                return Err(invalid(&format!("{name} must be positive")));
            }
        }
        if self.blackspots.min_samples == 0 || self.blackspots.bicycle_min_samples == 0 {
            return Err(invalid("blackspot min_samples must be at least 1"));
        }
        if self.server.default_page_limit == 0
            || self.server.default_page_limit > self.server.max_page_limit
        {
            return Err(invalid(
                "server.default_page_limit must be between 1 and max_page_limit",
            ));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid {
        message: message.to_string(),
    }
}

/// Parses a (possibly partial) TOML document, filling missing keys from the
/// embedded defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if either document is malformed or the
/// merged result does not match the schema.
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let mut base: toml::Table = toml::from_str(DEFAULT_TOML)?;
    let overlay: toml::Table = toml::from_str(contents)?;
    merge_tables(&mut base, overlay);
    Ok(toml::Value::Table(base).try_into()?)
}

/// Recursively merges `overlay` into `base`; overlay scalars win.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn default_config_parses() {
        let config = parse_config(DEFAULT_TOML).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.blackspots.min_samples, 5);
        assert!((config.blackspots.eps_km - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.data.bounds, SwissBounds::default());
        config.validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [server]
            port = 9000

            [blackspots]
            min_samples = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_addr, "127.0.0.1");
        assert_eq!(config.blackspots.min_samples, 8);
        assert!((config.blackspots.bicycle_eps_km - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(matches!(
            parse_config("[server]\nport = \"eighty\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            DATA_ENV => Some("/tmp/other.json".to_string()),
            PORT_ENV => Some("9191".to_string()),
            _ => None,
        });
        assert_eq!(config.data.path, PathBuf::from("/tmp/other.json"));
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.server.bind_addr, "127.0.0.1");
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| (key == PORT_ENV).then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn validate_rejects_non_positive_eps() {
        let config = parse_config("[blackspots]\neps_km = 0.0").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[data]\npath = \"accidents.geojson\"").unwrap();
        let config = AppConfig::load_with(Some(file.path()), |_| None).unwrap();
        assert_eq!(config.data.path, PathBuf::from("accidents.geojson"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn config_file_can_come_from_lookup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9300").unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let config = AppConfig::load_with(None, |key| match key {
            CONFIG_ENV => Some(path.clone()),
            BIND_ADDR_ENV => Some("0.0.0.0".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.server.port, 9300);
        assert_eq!(config.server.bind_addr, "0.0.0.0");
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let err = AppConfig::load_with(Some(Path::new("/no/such/config.toml")), |_| None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn default_impl_matches_embedded_file() {
        let config = AppConfig::default();
        assert_eq!(config, parse_config(DEFAULT_TOML).unwrap());
        config.validate().unwrap();
    }

    #[test]
    fn cyclist_only_filters_get_bicycle_parameters() {
        let defaults = AppConfig::default().blackspots;
        let mut criteria = FilterCriteria::default();
        assert_eq!(defaults.params_for(&criteria).min_samples, 5);

        criteria
            .parties
            .insert(accident_map_accident_models::InvolvedParty::Bicycle);
        let params = defaults.params_for(&criteria);
        assert_eq!(params.min_samples, 3);
        assert!((params.eps_km - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn bounds_contain_zurich_but_not_paris() {
        let bounds = SwissBounds::default();
        assert!(bounds.contains(47.3769, 8.5417));
        assert!(!bounds.contains(48.8566, 2.3522));
    }
}
