//! Trims a dataset to its most recent accident years.

use std::io::{BufWriter, Write as _};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::{LoadError, properties, read_file, split_collection};

/// Outcome of a trim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimReport {
    /// Earliest year in the input.
    pub min_year: i64,
    /// Latest year in the input.
    pub max_year: i64,
    /// Earliest year kept (`max_year - years + 1`, saturating).
    pub first_year_kept: i64,
    /// Features written.
    pub kept: usize,
    /// Features older than `first_year_kept`.
    pub dropped: usize,
    /// Features without a usable `AccidentYear`.
    pub skipped_invalid: usize,
}

/// Keeps the features of the most recent `years` calendar years and returns
/// the trimmed `FeatureCollection` as JSON. Other top-level members (such as
/// `name` or `crs`) are carried over.
///
/// # Errors
///
/// * [`LoadError::InvalidArgument`] if `years` is zero
/// * [`LoadError::Empty`] if no feature has a usable year
/// * parse errors as for [`crate::parse_accidents`]
pub fn trim_json(json: &str, years: u32) -> Result<(Value, TrimReport), LoadError> {
    if years == 0 {
        return Err(LoadError::InvalidArgument {
            message: "years must be a positive integer".to_string(),
        });
    }

    let (mut root, features) = split_collection(serde_json::from_str(json)?)?;

    let mut report = TrimReport::default();
    let mut dated = Vec::with_capacity(features.len());
    for (index, feature) in features.into_iter().enumerate() {
        let year = feature
            .get("properties")
            .and_then(Value::as_object)
            .and_then(|props| properties::integer(props, "AccidentYear"));
        if let Some(year) = year {
            dated.push((year, feature));
        } else {
            log::warn!("Skipping feature #{index}: missing or invalid AccidentYear");
            report.skipped_invalid += 1;
        }
    }

    let (Some(min_year), Some(max_year)) = (
        dated.iter().map(|(y, _)| *y).min(),
        dated.iter().map(|(y, _)| *y).max(),
    ) else {
        return Err(LoadError::Empty {
            message: "No valid features with AccidentYear found in dataset.".to_string(),
        });
    };

    report.min_year = min_year;
    report.max_year = max_year;
    report.first_year_kept = max_year.saturating_sub(i64::from(years) - 1);

    let dated_count = dated.len();
    let kept: Vec<Value> = dated
        .into_iter()
        .filter_map(|(year, feature)| (year >= report.first_year_kept).then_some(feature))
        .collect();

    report.kept = kept.len();
    report.dropped = dated_count - report.kept;
    root.insert("features".to_string(), Value::Array(kept));

    log::info!(
        "Detected data range {min_year}-{max_year}, keeping {} through {max_year} ({} kept, {} dropped)",
        report.first_year_kept,
        report.kept,
        report.dropped,
    );

    Ok((Value::Object(root), report))
}

/// Trims the dataset at `input` to its most recent `years` years and writes
/// the result to `output`, creating parent directories as needed. With an
/// `indent` the output is pretty-printed using that many spaces per level,
/// otherwise it is compact.
///
/// # Errors
///
/// * [`LoadError::InvalidArgument`] if `years` is zero or `input == output`
/// * [`LoadError::Io`] on read or write failure
/// * see [`trim_json`] for the rest
pub fn trim_to_recent_years(
    input: &Path,
    output: &Path,
    years: u32,
    indent: Option<usize>,
) -> Result<TrimReport, LoadError> {
    if input == output {
        return Err(LoadError::InvalidArgument {
            message: "input and output paths must be different".to_string(),
        });
    }

    log::info!("Loading dataset from {}", input.display());
    let (trimmed, report) = trim_json(&read_file(input)?, years)?;

    let io_err = |source| LoadError::Io {
        path: output.to_path_buf(),
        source,
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = std::fs::File::create(output).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    match indent {
        Some(width) => {
            let indent = " ".repeat(width);
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            trimmed.serialize(&mut Serializer::with_formatter(&mut writer, formatter))?;
        }
        None => serde_json::to_writer(&mut writer, &trimmed)?,
    }
    writer.flush().map_err(io_err)?;

    log::info!("Wrote trimmed dataset to {}", output.display());
    Ok(report)
}
