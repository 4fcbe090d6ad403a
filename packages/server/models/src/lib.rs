#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the accident map server.
//!
//! Query parameters arrive as flat strings (lists are comma-separated) and
//! are validated into the typed [`FilterCriteria`] before any analytics run.
//! Response types are separate from the record type so the API contract can
//! evolve on its own.

use std::collections::BTreeSet;
use std::str::FromStr;

use accident_map_accident_models::{
    AccidentRecord, AccidentSeverity, InvolvedParty, weekday_name,
};
use accident_map_analytics_models::{BlackspotParams, FilterCriteria, PartyMode, TrendMetric};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A query parameter that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid value '{value}' for parameter '{name}': {reason}")]
pub struct ParamError {
    /// Parameter name as it appears in the query string.
    pub name: &'static str,
    /// The offending value.
    pub value: String,
    /// What was expected.
    pub reason: String,
}

impl ParamError {
    fn new(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Splits a comma-separated list, trimming items and dropping empty ones.
fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn parse_list<T: FromStr + Ord>(
    name: &'static str,
    value: Option<&str>,
    expected: &str,
) -> Result<BTreeSet<T>, ParamError> {
    value
        .map(|v| {
            split_list(v)
                .map(|item| {
                    item.parse()
                        .map_err(|_| ParamError::new(name, item, format!("expected {expected}")))
                })
                .collect()
        })
        .transpose()
        .map(Option::unwrap_or_default)
}

fn string_list(value: Option<&str>) -> BTreeSet<String> {
    value
        .map(|v| split_list(v).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Filter query parameters shared by every analytics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFilterParams {
    /// Comma-separated years.
    pub years: Option<String>,
    /// First year of an inclusive range.
    pub year_from: Option<i32>,
    /// Last year of an inclusive range.
    pub year_to: Option<i32>,
    /// Comma-separated canton codes.
    pub cantons: Option<String>,
    /// Comma-separated severities (`as1`, `fatal`, or English labels).
    pub severities: Option<String>,
    /// Comma-separated accident type codes or labels.
    pub accident_types: Option<String>,
    /// Comma-separated road type codes or labels.
    pub road_types: Option<String>,
    /// Comma-separated parties (`pedestrian`, `bicycle`, `motorcycle`).
    pub parties: Option<String>,
    /// `exact`, `any` (default), or `all`.
    pub party_mode: Option<String>,
    /// Comma-separated months (1-12).
    pub months: Option<String>,
    /// First hour of an inclusive range.
    pub hour_from: Option<u8>,
    /// Last hour of an inclusive range. May be less than `hourFrom` to wrap
    /// past midnight.
    pub hour_to: Option<u8>,
}

impl ApiFilterParams {
    /// Validates the parameters into [`FilterCriteria`].
    ///
    /// # Errors
    ///
    /// Returns [`ParamError`] for unparseable list items, unknown
    /// severities, parties, or party modes, months outside 1-12, hours
    /// outside 0-23, or a year range whose start is after its end.
    pub fn to_criteria(&self) -> Result<FilterCriteria, ParamError> {
        let year_range = match (self.year_from, self.year_to) {
            (None, None) => None,
            (from, to) => {
                let range = (from.unwrap_or(i32::MIN), to.unwrap_or(i32::MAX));
                if range.0 > range.1 {
                    return Err(ParamError::new(
                        "yearFrom",
                        range.0,
                        format!("must not be after yearTo ({})", range.1),
                    ));
                }
                Some(range)
            }
        };

        for (name, hour) in [("hourFrom", self.hour_from), ("hourTo", self.hour_to)] {
            if let Some(hour) = hour.filter(|h| *h > 23) {
                return Err(ParamError::new(name, hour, "expected an hour between 0 and 23"));
            }
        }
        let hour_range = match (self.hour_from, self.hour_to) {
            (None, None) => None,
            (from, to) => Some((from.unwrap_or(0), to.unwrap_or(23))),
        };

        let months: BTreeSet<u8> = parse_list("months", self.months.as_deref(), "a month number")?;
        if let Some(month) = months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(ParamError::new("months", month, "expected a month between 1 and 12"));
        }

        let severities = self
            .severities
            .as_deref()
            .map(|v| {
                split_list(v)
                    .map(|item| {
                        AccidentSeverity::parse_loose(item).ok_or_else(|| {
                            ParamError::new("severities", item, "expected as1-as4 or a severity name")
                        })
                    })
                    .collect::<Result<BTreeSet<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let party_mode = self
            .party_mode
            .as_deref()
            .map(|v| {
                v.trim()
                    .parse::<PartyMode>()
                    .map_err(|_| ParamError::new("partyMode", v, "expected exact, any, or all"))
            })
            .transpose()?
            .unwrap_or_default();

        Ok(FilterCriteria {
            year_range,
            years: parse_list("years", self.years.as_deref(), "a year")?,
            cantons: string_list(self.cantons.as_deref())
                .into_iter()
                .map(|c| c.to_ascii_uppercase())
                .collect(),
            severities,
            accident_types: string_list(self.accident_types.as_deref()),
            road_types: string_list(self.road_types.as_deref()),
            parties: parse_list::<InvolvedParty>(
                "parties",
                self.parties.as_deref(),
                "pedestrian, bicycle, or motorcycle",
            )?,
            party_mode,
            months,
            hour_range,
        })
    }
}

/// Query parameters for `GET /api/blackspots`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackspotQuery {
    /// Neighbourhood radius in kilometres.
    pub eps_km: Option<f64>,
    /// Minimum accidents per zone.
    pub min_samples: Option<usize>,
}

impl BlackspotQuery {
    /// Overrides `defaults` with whatever was supplied.
    #[must_use]
    pub fn resolve(&self, defaults: BlackspotParams) -> BlackspotParams {
        BlackspotParams {
            eps_km: self.eps_km.unwrap_or(defaults.eps_km),
            min_samples: self.min_samples.unwrap_or(defaults.min_samples),
        }
    }
}

/// Query parameters for `GET /api/monthly`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyQuery {
    /// `total` (default), `fatal`, `bicycle`, or `pedestrian`.
    pub metric: Option<String>,
}

impl MonthlyQuery {
    /// Parses the requested metric.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError`] if the metric is unknown.
    pub fn metric(&self) -> Result<TrendMetric, ParamError> {
        self.metric.as_deref().map_or(Ok(TrendMetric::Total), |m| {
            m.trim().parse().map_err(|_| {
                ParamError::new("metric", m, "expected total, fatal, bicycle, or pedestrian")
            })
        })
    }
}

/// `limit`/`offset` paging parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// Maximum number of items.
    pub limit: Option<usize>,
    /// Items to skip.
    pub offset: Option<usize>,
}

/// Query parameters for `GET /api/export.csv`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportQuery {
    /// Comma-separated column names. All default columns when absent.
    pub columns: Option<String>,
}

impl ExportQuery {
    /// Requested column names, or `None` for the default set.
    #[must_use]
    pub fn columns(&self) -> Option<Vec<String>> {
        self.columns
            .as_deref()
            .map(|v| split_list(v).map(str::to_string).collect())
    }
}

/// An accident as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAccident {
    /// Dataset-wide identifier.
    pub id: String,
    /// Severity code.
    pub severity: AccidentSeverity,
    /// Severity label.
    pub severity_label: String,
    /// Accident type label (or code).
    pub accident_type: String,
    /// Road type label (or code).
    pub road_type: Option<String>,
    /// Canton code.
    pub canton: String,
    /// Calendar year.
    pub year: i32,
    /// Calendar month.
    pub month: u8,
    /// Weekday name.
    pub weekday: Option<String>,
    /// Hour of day.
    pub hour: Option<u8>,
    /// Involved parties.
    pub parties: Vec<InvolvedParty>,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
}

impl From<&AccidentRecord> for ApiAccident {
    fn from(record: &AccidentRecord) -> Self {
        Self {
            id: record.id.clone(),
            severity: record.severity,
            severity_label: record.severity.label().to_string(),
            accident_type: record.type_label().to_string(),
            road_type: record.road_label().map(str::to_string),
            canton: record.canton.clone(),
            year: record.year,
            month: record.month,
            weekday: record.weekday.map(|d| weekday_name(d).to_string()),
            hour: record.hour,
            parties: record.involved_parties().into_iter().collect(),
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPage<T> {
    /// Items matching the filters, before paging.
    pub total: usize,
    /// Items skipped.
    pub offset: usize,
    /// Page size used.
    pub limit: usize,
    /// The page.
    pub items: Vec<T>,
}

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Records loaded.
    pub records: usize,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Wraps a message.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn empty_params_give_empty_criteria() {
        let criteria = ApiFilterParams::default().to_criteria().unwrap();
        assert!(criteria.is_empty());
    }

    #[test]
    fn lists_are_parsed_and_trimmed() {
        let params = ApiFilterParams {
            years: Some("2020, 2021,,".to_string()),
            cantons: Some("zh,BE".to_string()),
            severities: Some("as1,Accident with severe injuries".to_string()),
            parties: Some("bicycle".to_string()),
            party_mode: Some("all".to_string()),
            months: Some("12,1".to_string()),
            road_types: Some("Motorway".to_string()),
            ..ApiFilterParams::default()
        };
        let criteria = params.to_criteria().unwrap();
        assert_eq!(criteria.years, BTreeSet::from([2020, 2021]));
        assert_eq!(
            criteria.cantons,
            BTreeSet::from(["BE".to_string(), "ZH".to_string()])
        );
        assert_eq!(
            criteria.severities,
            BTreeSet::from([AccidentSeverity::Fatal, AccidentSeverity::SevereInjuries])
        );
        assert_eq!(criteria.parties, BTreeSet::from([InvolvedParty::Bicycle]));
        assert_eq!(criteria.party_mode, PartyMode::All);
        assert_eq!(criteria.months, BTreeSet::from([1, 12]));
        assert_eq!(criteria.road_types.len(), 1);
    }

    #[test]
    fn open_ended_ranges() {
        let params = ApiFilterParams {
            year_from: Some(2020),
            hour_to: Some(9),
            ..ApiFilterParams::default()
        };
        let criteria = params.to_criteria().unwrap();
        assert_eq!(criteria.year_range, Some((2020, i32::MAX)));
        assert_eq!(criteria.hour_range, Some((0, 9)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases = [
            ApiFilterParams {
                years: Some("20x0".to_string()),
                ..ApiFilterParams::default()
            },
            ApiFilterParams {
                severities: Some("as9".to_string()),
                ..ApiFilterParams::default()
            },
            ApiFilterParams {
                parties: Some("tram".to_string()),
                ..ApiFilterParams::default()
            },
            ApiFilterParams {
                party_mode: Some("some".to_string()),
                ..ApiFilterParams::default()
            },
            ApiFilterParams {
                months: Some("13".to_string()),
                ..ApiFilterParams::default()
            },
            ApiFilterParams {
                hour_from: Some(24),
                ..ApiFilterParams::default()
            },
            ApiFilterParams {
                year_from: Some(2022),
                year_to: Some(2020),
                ..ApiFilterParams::default()
            },
        ];
        for params in cases {
            assert!(params.to_criteria().is_err(), "{params:?}");
        }

        let err = ApiFilterParams {
            parties: Some("bicycle,tram".to_string()),
            ..ApiFilterParams::default()
        }
        .to_criteria()
        .unwrap_err();
        assert_eq!(err.name, "parties");
        assert_eq!(err.value, "tram");
    }

    #[test]
    fn blackspot_query_overrides_defaults() {
        let query = BlackspotQuery {
            eps_km: Some(1.5),
            min_samples: None,
        };
        let params = query.resolve(BlackspotParams::default());
        assert!((params.eps_km - 1.5).abs() < f64::EPSILON);
        assert_eq!(params.min_samples, 5);
    }

    #[test]
    fn monthly_metric_parsing() {
        assert_eq!(MonthlyQuery::default().metric().unwrap(), TrendMetric::Total);
        let fatal = MonthlyQuery {
            metric: Some("Fatal".to_string()),
        };
        assert_eq!(fatal.metric().unwrap(), TrendMetric::Fatal);
        let bad = MonthlyQuery {
            metric: Some("trams".to_string()),
        };
        assert_eq!(bad.metric().unwrap_err().name, "metric");
    }

    #[test]
    fn export_columns() {
        assert_eq!(ExportQuery::default().columns(), None);
        let query = ExportQuery {
            columns: Some("id, canton".to_string()),
        };
        assert_eq!(
            query.columns(),
            Some(vec!["id".to_string(), "canton".to_string()])
        );
    }

    #[test]
    fn api_accident_from_record() {
        let record = AccidentRecord {
            id: "X1".to_string(),
            accident_type: "at2".to_string(),
            accident_type_label: None,
            severity: AccidentSeverity::Fatal,
            involves_pedestrian: true,
            involves_bicycle: false,
            involves_motorcycle: true,
            road_type: None,
            road_type_label: None,
            canton: "TI".to_string(),
            municipality: None,
            year: 2022,
            month: 8,
            weekday: Some(chrono::Weekday::Sun),
            hour: None,
            latitude: 46.0,
            longitude: 8.95,
            chlv95: None,
            descriptions: BTreeMap::new(),
        };
        let api = ApiAccident::from(&record);
        assert_eq!(api.accident_type, "at2");
        assert_eq!(api.severity_label, "Accident with fatalities");
        assert_eq!(api.weekday.as_deref(), Some("Sunday"));
        assert_eq!(
            api.parties,
            vec![InvolvedParty::Pedestrian, InvolvedParty::Motorcycle]
        );

        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["severity"], "as1");
        assert_eq!(json["severityLabel"], "Accident with fatalities");
    }
}
