#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `GeoJSON` accident dataset loading.
//!
//! Reads a `FeatureCollection` of Swiss road-traffic accidents and normalizes
//! every feature into an [`AccidentRecord`]. Features that lack required
//! fields or fall outside the configured bounding box are skipped and
//! counted in the [`LoadReport`]; they never abort the load.
//!
//! The crate also carries the dataset tooling that works on raw features
//! rather than records: integrity checks ([`check`]), per-property value
//! counts ([`metrics`]) and trimming to the most recent years ([`trim`]).

pub mod check;
pub mod chlv95;
pub mod metrics;
pub mod progress;
pub mod properties;
pub mod summary;
pub mod trim;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use accident_map_accident_models::{AccidentRecord, AccidentSeverity, parse_weekday};
use accident_map_config::SwissBounds;
use geojson::{Feature, JsonObject, feature::Id};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use check::{CheckOptions, DatasetCheck, check_dataset};
pub use metrics::{PropertyIndex, value_counts};
pub use progress::{LoadProgress, NullProgress};
pub use summary::{DataSummary, data_summary};
pub use trim::{TrimReport, trim_to_recent_years};

/// Languages carried by the `AccidentType_<lang>` properties.
const DESCRIPTION_LANGUAGES: [&str; 4] = ["de", "fr", "it", "en"];

/// Errors that can occur while loading a dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read or written.
    #[error("Data file error for {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The input is not valid JSON.
    #[error("Error parsing JSON data: {0}")]
    Json(#[from] serde_json::Error),

    /// The input is JSON but not a usable `GeoJSON` document.
    #[error("Malformed GeoJSON: {message}")]
    GeoJson {
        /// Description of the problem.
        message: String,
    },

    /// The top-level object is not a `FeatureCollection`.
    #[error("Expected a GeoJSON FeatureCollection, found {found}")]
    NotFeatureCollection {
        /// The `type` member that was found.
        found: String,
    },

    /// Nothing usable was left after parsing.
    #[error("{message}")]
    Empty {
        /// Description of why the dataset is empty.
        message: String,
    },

    /// A caller-supplied argument is out of range.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },
}

/// Counts of what happened to each feature during a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Features present in the collection.
    pub features: usize,
    /// Records produced.
    pub loaded: usize,
    /// Features with neither a point geometry nor CHLV95 coordinates.
    pub skipped_missing_coordinates: usize,
    /// Features whose coordinates fall outside the bounding box.
    pub skipped_out_of_bounds: usize,
    /// Features missing a required property or not parseable as a feature.
    pub skipped_invalid: usize,
}

impl LoadReport {
    /// Total number of skipped features.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped_missing_coordinates + self.skipped_out_of_bounds + self.skipped_invalid
    }
}

/// A loaded dataset: the immutable record table plus its load report.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Records in file order.
    pub records: Vec<AccidentRecord>,
    /// What happened to each input feature.
    pub report: LoadReport,
}

/// Options controlling record validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Records outside this box are dropped.
    pub bounds: SwissBounds,
}

enum Skip {
    MissingCoordinates,
    OutOfBounds,
    Invalid(String),
}

/// Loads a dataset from disk with default options.
///
/// # Errors
///
/// See [`load_accidents_with`].
pub fn load_accidents(path: &Path) -> Result<Dataset, LoadError> {
    load_accidents_with(path, LoadOptions::default(), &NullProgress)
}

/// Loads a dataset from disk.
///
/// # Errors
///
/// * [`LoadError::Io`] if the file cannot be read
/// * [`LoadError::Json`] / [`LoadError::GeoJson`] if it is malformed
/// * [`LoadError::NotFeatureCollection`] if it is some other `GeoJSON` type
/// * [`LoadError::Empty`] if no valid records remain
pub fn load_accidents_with(
    path: &Path,
    options: LoadOptions,
    progress: &dyn LoadProgress,
) -> Result<Dataset, LoadError> {
    log::info!("Loading accidents from {}", path.display());
    progress.reading(path);
    let contents = read_file(path)?;
    parse_accidents_with(&contents, options, progress)
}

/// Parses a dataset from a JSON string with default options.
///
/// # Errors
///
/// See [`load_accidents_with`].
pub fn parse_accidents(json: &str) -> Result<Dataset, LoadError> {
    parse_accidents_with(json, LoadOptions::default(), &NullProgress)
}

/// Parses a dataset from a JSON string.
///
/// # Errors
///
/// See [`load_accidents_with`].
pub fn parse_accidents_with(
    json: &str,
    options: LoadOptions,
    progress: &dyn LoadProgress,
) -> Result<Dataset, LoadError> {
    let value: Value = serde_json::from_str(json)?;
    let (_, features) = split_collection(value)?;

    if features.is_empty() {
        return Err(LoadError::Empty {
            message: "No features found in the GeoJSON file.".to_string(),
        });
    }

    let mut report = LoadReport {
        features: features.len(),
        ..LoadReport::default()
    };
    let mut records = Vec::with_capacity(features.len());

    progress.parsing(features.len() as u64);

    for (index, value) in features.into_iter().enumerate() {
        let kept = match parse_feature(value, &options.bounds) {
            Ok(record) => {
                records.push(record);
                true
            }
            Err(Skip::MissingCoordinates) => {
                log::debug!("Feature #{index} has no usable coordinates");
                report.skipped_missing_coordinates += 1;
                false
            }
            Err(Skip::OutOfBounds) => {
                log::debug!("Feature #{index} is outside the bounding box");
                report.skipped_out_of_bounds += 1;
                false
            }
            Err(Skip::Invalid(reason)) => {
                log::warn!("Skipping feature #{index}: {reason}");
                report.skipped_invalid += 1;
                false
            }
        };
        progress.feature(kept);
    }

    report.loaded = records.len();
    progress.finished(&report);

    if report.skipped() > 0 {
        log::warn!(
            "Skipped {} of {} features ({} without coordinates, {} out of bounds, {} invalid)",
            report.skipped(),
            report.features,
            report.skipped_missing_coordinates,
            report.skipped_out_of_bounds,
            report.skipped_invalid,
        );
    }

    if records.is_empty() {
        return Err(LoadError::Empty {
            message: "No valid accidents found within the configured boundaries.".to_string(),
        });
    }

    log::info!("Loaded {} accident records", records.len());
    Ok(Dataset { records, report })
}

pub(crate) fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Splits a `FeatureCollection` into its other top-level members and its
/// feature array.
pub(crate) fn split_collection(value: Value) -> Result<(JsonObject, Vec<Value>), LoadError> {
    let Value::Object(mut root) = value else {
        return Err(LoadError::GeoJson {
            message: "top-level value is not an object".to_string(),
        });
    };

    match root.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {}
        other => {
            return Err(LoadError::NotFeatureCollection {
                found: other.unwrap_or("no type").to_string(),
            });
        }
    }

    match root.remove("features") {
        Some(Value::Array(features)) => Ok((root, features)),
        Some(_) => Err(LoadError::GeoJson {
            message: "\"features\" is not an array".to_string(),
        }),
        None => Err(LoadError::GeoJson {
            message: "FeatureCollection has no \"features\" member".to_string(),
        }),
    }
}

fn parse_feature(value: Value, bounds: &SwissBounds) -> Result<AccidentRecord, Skip> {
    let feature: Feature =
        serde_json::from_value(value).map_err(|e| Skip::Invalid(e.to_string()))?;
    let props = feature
        .properties
        .as_ref()
        .ok_or_else(|| Skip::Invalid("missing properties".to_string()))?;

    let id = properties::string(props, "AccidentUID")
        .or_else(|| match &feature.id {
            Some(Id::String(s)) => Some(s.clone()),
            Some(Id::Number(n)) => Some(n.to_string()),
            None => None,
        })
        .ok_or_else(|| missing("AccidentUID"))?;

    let year = properties::integer(props, "AccidentYear")
        .and_then(|y| i32::try_from(y).ok())
        .ok_or_else(|| missing("AccidentYear"))?;

    let month = properties::integer(props, "AccidentMonth")
        .and_then(|m| u8::try_from(m).ok())
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| missing("AccidentMonth"))?;

    let severity = properties::string(props, "AccidentSeverityCategory")
        .as_deref()
        .and_then(AccidentSeverity::parse_loose)
        .or_else(|| {
            properties::string(props, "AccidentSeverityCategory_en")
                .as_deref()
                .and_then(AccidentSeverity::parse_loose)
        })
        .ok_or_else(|| missing("AccidentSeverityCategory"))?;

    let canton = properties::string(props, "CantonCode").ok_or_else(|| missing("CantonCode"))?;

    let chlv95 = properties::float(props, "AccidentLocation_CHLV95_E")
        .zip(properties::float(props, "AccidentLocation_CHLV95_N"));

    let (latitude, longitude) = point_coordinates(&feature)
        .or_else(|| chlv95.map(|(e, n)| chlv95::to_wgs84(e, n)))
        .ok_or(Skip::MissingCoordinates)?;

    if !bounds.contains(latitude, longitude) {
        return Err(Skip::OutOfBounds);
    }

    let accident_type_label = properties::string(props, "AccidentType_en");
    let accident_type = properties::string(props, "AccidentType")
        .or_else(|| accident_type_label.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let descriptions = DESCRIPTION_LANGUAGES
        .iter()
        .filter_map(|lang| {
            properties::string(props, &format!("AccidentType_{lang}"))
                .map(|text| ((*lang).to_string(), text))
        })
        .collect::<BTreeMap<_, _>>();

    let weekday = properties::string(props, "AccidentWeekDay")
        .as_deref()
        .and_then(parse_weekday)
        .or_else(|| {
            properties::string(props, "AccidentWeekDay_en")
                .as_deref()
                .and_then(parse_weekday)
        });

    let hour = properties::integer(props, "AccidentHour")
        .and_then(|h| u8::try_from(h).ok())
        .filter(|h| *h < 24);

    Ok(AccidentRecord {
        id,
        accident_type,
        accident_type_label,
        severity,
        involves_pedestrian: properties::flag(props, "AccidentInvolvingPedestrian"),
        involves_bicycle: properties::flag(props, "AccidentInvolvingBicycle"),
        involves_motorcycle: properties::flag(props, "AccidentInvolvingMotorcycle"),
        road_type: properties::string(props, "RoadType"),
        road_type_label: properties::string(props, "RoadType_en"),
        canton,
        municipality: properties::string(props, "MunicipalityCode"),
        year,
        month,
        weekday,
        hour,
        latitude,
        longitude,
        chlv95,
        descriptions,
    })
}

fn missing(property: &str) -> Skip {
    Skip::Invalid(format!("missing or invalid {property}"))
}

/// `(lat, lon)` of a `Point` geometry.
fn point_coordinates(feature: &Feature) -> Option<(f64, f64)> {
    match &feature.geometry.as_ref()?.value {
        geojson::Value::Point(position) => {
            let lon = *position.first()?;
            let lat = *position.get(1)?;
            (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
        }
        _ => None,
    }
}
