//! Integrity checks on a raw accident `FeatureCollection`.
//!
//! Works on the JSON features directly so that it can report problems the
//! record loader would silently skip: duplicate ids, missing ids, features
//! without a properties object, and which property keys are actually
//! present.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::{LoadError, properties, read_file, split_collection};

/// Options for [`check_dataset`].
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Property used for duplicate detection. `None` disables id checks.
    pub id_field: Option<String>,
    /// Property holding the accident year.
    pub year_field: String,
    /// Maximum duplicate ids to keep as examples.
    pub max_duplicate_examples: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            id_field: Some("AccidentUID".to_string()),
            year_field: "AccidentYear".to_string(),
            max_duplicate_examples: 5,
        }
    }
}

/// A duplicated identifier and the feature indices it appears at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateId {
    /// The identifier value.
    pub id: String,
    /// Zero-based feature indices.
    pub indices: Vec<usize>,
}

/// Result of [`check_dataset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetCheck {
    /// File size in bytes, when checked from disk.
    pub size_bytes: Option<u64>,
    /// Number of features.
    pub features: usize,
    /// Geometry `type` counts (`Unknown` for missing geometry).
    pub geometry_types: BTreeMap<String, usize>,
    /// How many features carry each property key.
    pub property_keys: BTreeMap<String, usize>,
    /// Features per accident year.
    pub years: BTreeMap<i64, usize>,
    /// Features whose year property is present but not an integer.
    pub invalid_years: usize,
    /// Features with a missing or empty id.
    pub missing_ids: usize,
    /// Extra occurrences of already-seen ids.
    pub duplicate_ids: usize,
    /// Up to `max_duplicate_examples` duplicated ids.
    pub duplicate_examples: Vec<DuplicateId>,
    /// Features without a properties object.
    pub malformed_features: usize,
}

impl DatasetCheck {
    /// Earliest year seen.
    #[must_use]
    pub fn year_min(&self) -> Option<i64> {
        self.years.keys().next().copied()
    }

    /// Latest year seen.
    #[must_use]
    pub fn year_max(&self) -> Option<i64> {
        self.years.keys().next_back().copied()
    }

    /// Whether any duplicate ids were found.
    #[must_use]
    pub const fn has_duplicates(&self) -> bool {
        self.duplicate_ids > 0
    }
}

/// Runs integrity checks on the file at `path`.
///
/// # Errors
///
/// Returns [`LoadError`] if the file cannot be read or is not a
/// `FeatureCollection`.
pub fn check_dataset(path: &Path, options: &CheckOptions) -> Result<DatasetCheck, LoadError> {
    log::info!("Checking dataset {}", path.display());
    let contents = read_file(path)?;
    let mut check = check_json(&contents, options)?;
    check.size_bytes = Some(contents.len() as u64);
    Ok(check)
}

/// Runs integrity checks on an in-memory `FeatureCollection`.
///
/// # Errors
///
/// Returns [`LoadError`] if the input is not a JSON `FeatureCollection`.
pub fn check_json(json: &str, options: &CheckOptions) -> Result<DatasetCheck, LoadError> {
    let (_, features) = split_collection(serde_json::from_str(json)?)?;

    let mut check = DatasetCheck {
        features: features.len(),
        ..DatasetCheck::default()
    };
    let mut seen: BTreeMap<String, Vec<usize>> = BTreeMap::new();

    for (index, feature) in features.iter().enumerate() {
        let geometry_type = feature
            .get("geometry")
            .and_then(|g| g.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        *check
            .geometry_types
            .entry(geometry_type.to_string())
            .or_default() += 1;

        let Some(props) = feature.get("properties").and_then(Value::as_object) else {
            check.malformed_features += 1;
            continue;
        };

        for key in props.keys() {
            *check.property_keys.entry(key.clone()).or_default() += 1;
        }

        match properties::integer(props, &options.year_field) {
            Some(year) => *check.years.entry(year).or_default() += 1,
            None if properties::string(props, &options.year_field).is_some() => {
                log::warn!(
                    "Feature #{index} has non-integer {}: {:?}",
                    options.year_field,
                    props.get(&options.year_field)
                );
                check.invalid_years += 1;
            }
            None => {}
        }

        if let Some(id_field) = &options.id_field {
            match properties::string(props, id_field) {
                Some(id) => seen.entry(id).or_default().push(index),
                None => check.missing_ids += 1,
            }
        }
    }

    let mut duplicated: BTreeSet<(usize, &String)> = BTreeSet::new();
    for (id, indices) in &seen {
        if indices.len() > 1 {
            check.duplicate_ids += indices.len() - 1;
            duplicated.insert((indices[0], id));
        }
    }
    check.duplicate_examples = duplicated
        .into_iter()
        .take(options.max_duplicate_examples)
        .map(|(_, id)| DuplicateId {
            id: id.clone(),
            indices: seen[id].clone(),
        })
        .collect();

    Ok(check)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use serde_json::json;

    use super::*;

    fn feature(id: Option<&str>, year: &Value) -> Value {
        let mut props = json!({"AccidentYear": year, "CantonCode": "ZH"});
        if let Some(id) = id {
            props["AccidentUID"] = json!(id);
        }
        json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [8.5, 47.3]},
            "properties": props,
        })
    }

    fn run(features: &[Value], options: &CheckOptions) -> DatasetCheck {
        let json = json!({"type": "FeatureCollection", "features": features}).to_string();
        check_json(&json, options).unwrap()
    }

    #[test]
    fn clean_sample_has_no_issues() {
        let check = check_json(include_str!("../fixtures/sample.geojson"), &CheckOptions::default())
            .unwrap();
        assert_eq!(check.features, 5);
        assert_eq!(check.geometry_types.get("Point"), Some(&4));
        assert_eq!(check.geometry_types.get("Unknown"), Some(&1));
        assert_eq!(check.property_keys.get("AccidentUID"), Some(&5));
        assert_eq!(check.year_min(), Some(2019));
        assert_eq!(check.year_max(), Some(2023));
        assert_eq!(check.years.len(), 4);
        assert!(!check.has_duplicates());
        assert_eq!(check.missing_ids, 0);
        assert_eq!(check.malformed_features, 0);
    }

    #[test]
    fn finds_duplicates_and_missing_ids() {
        let check = run(
            &[
                feature(Some("a"), &json!("2020")),
                feature(Some("b"), &json!(2021)),
                feature(Some("a"), &json!("2021")),
                feature(None, &json!("2021")),
                feature(Some("a"), &json!("twenty")),
                json!({"type": "Feature", "geometry": null, "properties": null}),
            ],
            &CheckOptions::default(),
        );

        assert_eq!(check.features, 6);
        assert_eq!(check.duplicate_ids, 2);
        assert_eq!(
            check.duplicate_examples,
            vec![DuplicateId {
                id: "a".to_string(),
                indices: vec![0, 2, 4],
            }]
        );
        assert_eq!(check.missing_ids, 1);
        assert_eq!(check.invalid_years, 1);
        assert_eq!(check.malformed_features, 1);
        assert_eq!(check.years.get(&2021), Some(&3));
    }

    #[test]
    fn caps_duplicate_examples_and_can_skip_id_check() {
        let features: Vec<Value> = ["x", "x", "y", "y", "z", "z"]
            .iter()
            .map(|id| feature(Some(id), &json!(2020)))
            .collect();

        let capped = run(
            &features,
            &CheckOptions {
                max_duplicate_examples: 2,
                ..CheckOptions::default()
            },
        );
        assert_eq!(capped.duplicate_ids, 3);
        assert_eq!(capped.duplicate_examples.len(), 2);
        assert_eq!(capped.duplicate_examples[0].id, "x");

        let unchecked = run(
            &features,
            &CheckOptions {
                id_field: None,
                ..CheckOptions::default()
            },
        );
        assert!(!unchecked.has_duplicates());
    }

    #[test]
    fn records_file_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = include_str!("../fixtures/sample.geojson");
        file.write_all(json.as_bytes()).unwrap();
        let check = check_dataset(file.path(), &CheckOptions::default()).unwrap();
        assert_eq!(check.size_bytes, Some(json.len() as u64));
    }
}
