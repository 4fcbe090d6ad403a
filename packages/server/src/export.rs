//! CSV and `GeoJSON` exports of accident records.
//!
//! The `GeoJSON` export writes the dataset's own property names, so an
//! exported file can be loaded again with `accident_map_loader`.

use std::io::Write;

use accident_map_accident_models::{AccidentRecord, weekday_name};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, feature::Id};
use serde_json::Value;
use thiserror::Error;

/// Columns written when no selection is given, in output order.
pub const DEFAULT_COLUMNS: &[&str] = &[
    "id",
    "year",
    "month",
    "weekday",
    "hour",
    "canton",
    "municipality",
    "severity",
    "severity_label",
    "accident_type",
    "accident_type_label",
    "road_type",
    "road_type_label",
    "pedestrian",
    "bicycle",
    "motorcycle",
    "latitude",
    "longitude",
];

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A requested column does not exist.
    #[error("Unknown export column '{name}'. Available: {}", DEFAULT_COLUMNS.join(", "))]
    UnknownColumn {
        /// The requested name.
        name: String,
    },

    /// Writing CSV failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Writing the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing `GeoJSON` failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn column_value(record: &AccidentRecord, column: &str) -> String {
    let opt = |v: Option<&str>| v.unwrap_or_default().to_string();
    match column {
        "id" => record.id.clone(),
        "year" => record.year.to_string(),
        "month" => record.month.to_string(),
        "weekday" => opt(record.weekday.map(weekday_name)),
        "hour" => record.hour.map(|h| h.to_string()).unwrap_or_default(),
        "canton" => record.canton.clone(),
        "municipality" => opt(record.municipality.as_deref()),
        "severity" => record.severity.code().to_string(),
        "severity_label" => record.severity.label().to_string(),
        "accident_type" => record.accident_type.clone(),
        "accident_type_label" => record.type_label().to_string(),
        "road_type" => opt(record.road_type.as_deref()),
        "road_type_label" => opt(record.road_label()),
        "pedestrian" => record.involves_pedestrian.to_string(),
        "bicycle" => record.involves_bicycle.to_string(),
        "motorcycle" => record.involves_motorcycle.to_string(),
        "latitude" => record.latitude.to_string(),
        "longitude" => record.longitude.to_string(),
        _ => String::new(),
    }
}

/// Resolves a column selection against [`DEFAULT_COLUMNS`]. `None` selects
/// every column.
///
/// # Errors
///
/// Returns [`ExportError::UnknownColumn`] for a name that is not a column.
pub fn resolve_columns(selection: Option<&[String]>) -> Result<Vec<&'static str>, ExportError> {
    let Some(selection) = selection.filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_COLUMNS.to_vec());
    };
    selection
        .iter()
        .map(|name| {
            DEFAULT_COLUMNS
                .iter()
                .copied()
                .find(|c| c.eq_ignore_ascii_case(name))
                .ok_or_else(|| ExportError::UnknownColumn { name: name.clone() })
        })
        .collect()
}

/// Writes `records` as CSV with a header row. An empty slice produces just
/// the header.
///
/// # Errors
///
/// Returns [`ExportError`] for unknown columns or write failures.
pub fn write_csv<W: Write>(
    records: &[&AccidentRecord],
    columns: Option<&[String]>,
    writer: W,
) -> Result<(), ExportError> {
    let columns = resolve_columns(columns)?;
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&columns)?;
    for record in records {
        csv.write_record(columns.iter().map(|c| column_value(record, c)))?;
    }
    csv.flush()?;
    log::debug!("Exported {} records to CSV", records.len());
    Ok(())
}

/// Returns `records` as a CSV string.
///
/// # Errors
///
/// See [`write_csv`].
pub fn to_csv(records: &[&AccidentRecord], columns: Option<&[String]>) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(records, columns, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn feature(record: &AccidentRecord) -> Feature {
    let mut props = JsonObject::new();
    let mut put = |key: &str, value: Value| {
        if !value.is_null() {
            props.insert(key.to_string(), value);
        }
    };

    put("AccidentUID", Value::from(record.id.as_str()));
    put("AccidentType", Value::from(record.accident_type.as_str()));
    put(
        "AccidentType_en",
        record.accident_type_label.as_deref().map_or(Value::Null, Value::from),
    );
    for (language, text) in &record.descriptions {
        if language != "en" {
            put(&format!("AccidentType_{language}"), Value::from(text.as_str()));
        }
    }
    put("AccidentSeverityCategory", Value::from(record.severity.code()));
    put("AccidentSeverityCategory_en", Value::from(record.severity.label()));
    put("AccidentInvolvingPedestrian", Value::from(record.involves_pedestrian));
    put("AccidentInvolvingBicycle", Value::from(record.involves_bicycle));
    put("AccidentInvolvingMotorcycle", Value::from(record.involves_motorcycle));
    put("RoadType", record.road_type.as_deref().map_or(Value::Null, Value::from));
    put(
        "RoadType_en",
        record.road_type_label.as_deref().map_or(Value::Null, Value::from),
    );
    put("CantonCode", Value::from(record.canton.as_str()));
    put(
        "MunicipalityCode",
        record.municipality.as_deref().map_or(Value::Null, Value::from),
    );
    put("AccidentYear", Value::from(record.year));
    put("AccidentMonth", Value::from(record.month));
    put(
        "AccidentWeekDay_en",
        record.weekday.map_or(Value::Null, |d| Value::from(weekday_name(d))),
    );
    put("AccidentHour", record.hour.map_or(Value::Null, Value::from));
    if let Some((east, north)) = record.chlv95 {
        put("AccidentLocation_CHLV95_E", Value::from(east));
        put("AccidentLocation_CHLV95_N", Value::from(north));
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Point(vec![
            record.longitude,
            record.latitude,
        ]))),
        id: Some(Id::String(record.id.clone())),
        properties: Some(props),
        foreign_members: None,
    }
}

/// Builds a `FeatureCollection` with one point feature per record.
#[must_use]
pub fn to_feature_collection(records: &[&AccidentRecord]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: records.iter().map(|r| feature(r)).collect(),
        foreign_members: None,
    }
}

/// Returns `records` as a `GeoJSON` string.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn to_geojson(records: &[&AccidentRecord]) -> Result<String, ExportError> {
    let collection = to_feature_collection(records);
    log::debug!("Exported {} records to GeoJSON", records.len());
    Ok(serde_json::to_string(&collection)?)
}
