//! Per-property value frequency index.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::{LoadError, properties, read_file, split_collection};

/// Value counts for every property key across a `FeatureCollection`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyIndex {
    /// Number of features indexed.
    pub total: usize,
    /// `column -> value -> count`.
    pub counts: BTreeMap<String, BTreeMap<String, usize>>,
    /// Features lacking each column.
    pub missing: BTreeMap<String, usize>,
}

/// One row of a value distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueCount {
    /// The property value.
    pub value: String,
    /// Number of features with this value.
    pub count: usize,
    /// `count / total * 100`.
    pub percentage: f64,
}

impl PropertyIndex {
    /// Builds the index from raw feature values.
    #[must_use]
    pub fn build(features: &[Value]) -> Self {
        let columns: BTreeSet<&String> = features
            .iter()
            .filter_map(|f| f.get("properties").and_then(Value::as_object))
            .flat_map(|props| props.keys())
            .collect();

        let mut index = Self {
            total: features.len(),
            ..Self::default()
        };

        for feature in features {
            let props = feature.get("properties").and_then(Value::as_object);
            for column in &columns {
                if props.is_none_or(|p| !p.contains_key(*column)) {
                    *index.missing.entry((*column).clone()).or_default() += 1;
                }
            }
            let Some(props) = props else {
                continue;
            };
            for (key, value) in props {
                *index
                    .counts
                    .entry(key.clone())
                    .or_default()
                    .entry(properties::canonical(value))
                    .or_default() += 1;
            }
        }

        index
    }

    /// Indexed column names.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Number of distinct values in `column`.
    #[must_use]
    pub fn unique(&self, column: &str) -> usize {
        self.counts.get(column).map_or(0, BTreeMap::len)
    }

    /// Features lacking `column`.
    #[must_use]
    pub fn missing(&self, column: &str) -> usize {
        self.missing.get(column).copied().unwrap_or(0)
    }

    /// The `n` most frequent values of `column`, ties broken by value.
    /// `None` if the column was never seen.
    #[must_use]
    pub fn top(&self, column: &str, n: usize) -> Option<Vec<ValueCount>> {
        let counts = self.counts.get(column)?;
        let mut rows: Vec<(&String, usize)> = counts.iter().map(|(v, c)| (v, *c)).collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        Some(
            rows.into_iter()
                .take(n)
                .map(|(value, count)| ValueCount {
                    value: value.clone(),
                    count,
                    percentage: self.percentage(count),
                })
                .collect(),
        )
    }

    /// Number of features whose `column` equals `value` exactly. `None` if
    /// the column was never seen.
    #[must_use]
    pub fn count_match(&self, column: &str, value: &str) -> Option<usize> {
        self.counts
            .get(column)
            .map(|values| values.get(value).copied().unwrap_or(0))
    }

    /// `count` as a percentage of all indexed features (0 when empty).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

/// Parses a `column=value` match expression.
///
/// # Errors
///
/// Returns [`LoadError::InvalidArgument`] if there is no `=`.
pub fn parse_match(expression: &str) -> Result<(String, String), LoadError> {
    let (column, value) = expression
        .split_once('=')
        .ok_or_else(|| LoadError::InvalidArgument {
            message: format!("Invalid match expression '{expression}'. Expected column=value."),
        })?;
    Ok((column.trim().to_string(), value.trim().to_string()))
}

/// Builds a [`PropertyIndex`] for the file at `path`.
///
/// # Errors
///
/// Returns [`LoadError`] if the file cannot be read, is not a
/// `FeatureCollection`, or has no features.
pub fn value_counts(path: &Path) -> Result<PropertyIndex, LoadError> {
    log::info!("Indexing property values in {}", path.display());
    value_counts_json(&read_file(path)?)
}

/// Builds a [`PropertyIndex`] from an in-memory `FeatureCollection`.
///
/// # Errors
///
/// See [`value_counts`].
pub fn value_counts_json(json: &str) -> Result<PropertyIndex, LoadError> {
    let (_, features) = split_collection(serde_json::from_str(json)?)?;
    if features.is_empty() {
        return Err(LoadError::Empty {
            message: "No features found in the dataset.".to_string(),
        });
    }
    Ok(PropertyIndex::build(&features))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PropertyIndex {
        value_counts_json(include_str!("../fixtures/sample.geojson")).unwrap()
    }

    #[test]
    fn counts_values_per_column() {
        let index = sample();
        assert_eq!(index.total, 5);
        assert_eq!(index.unique("CantonCode"), 3);
        assert_eq!(index.count_match("CantonCode", "ZH"), Some(2));
        assert_eq!(index.count_match("CantonCode", "TI"), Some(0));
        assert_eq!(index.count_match("NoSuchColumn", "x"), None);
    }

    #[test]
    fn numbers_and_strings_are_keyed_separately_but_readably() {
        let index = sample();
        assert_eq!(index.count_match("AccidentYear", "2021"), Some(1));
        assert_eq!(index.count_match("AccidentYear", "2023"), Some(2));
        assert_eq!(index.count_match("AccidentHour", "null"), Some(1));
    }

    #[test]
    fn top_values_sorted_by_count_then_value() {
        let index = sample();
        let top = index.top("CantonCode", 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].value, "BE");
        assert_eq!(top[0].count, 2);
        assert!((top[0].percentage - 40.0).abs() < 1e-9);
        assert_eq!(top[1].value, "ZH");
        assert!(index.top("Nope", 3).is_none());
    }

    #[test]
    fn missing_counts_cover_sparse_columns() {
        let index = sample();
        assert_eq!(index.missing("AccidentUID"), 0);
        assert_eq!(index.missing("MunicipalityCode"), 2);
        assert_eq!(index.missing("AccidentType_fr"), 4);
        assert!(index.columns().any(|c| c == "AccidentHour_text"));
    }

    #[test]
    fn parses_match_expressions() {
        assert_eq!(
            parse_match("AccidentSeverityCategory_en = Accident with fatalities").unwrap(),
            (
                "AccidentSeverityCategory_en".to_string(),
                "Accident with fatalities".to_string()
            )
        );
        assert!(matches!(
            parse_match("no-equals"),
            Err(LoadError::InvalidArgument { .. })
        ));
    }
}
