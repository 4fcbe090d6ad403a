#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics over in-memory accident records.
//!
//! Every public function is a pure computation over a slice of records and
//! returns one of the result types from [`accident_map_analytics_models`].
//! Functions are generic over `R: Borrow<AccidentRecord>` so that both the
//! loaded table (`&[AccidentRecord]`) and a filtered view
//! (`&[&AccidentRecord]`) can be passed without copying.
//!
//! [`AccidentRecord`]: accident_map_accident_models::AccidentRecord

pub mod blackspots;
pub mod filter;
pub mod risk;
pub mod stats;

mod tally;

pub use blackspots::identify_blackspots;
pub use filter::{available_filters, filter_records, matches};
pub use risk::{party_profile, risk_metrics, risk_predictions};
pub use stats::{
    generate_insights, monthly_trend, seasonal_patterns, summary_stats, temporal_analysis,
    year_over_year,
};

use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A caller-supplied parameter is out of range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of what went wrong.
        message: String,
    },
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeMap;

    use accident_map_accident_models::{AccidentRecord, AccidentSeverity};
    use chrono::Weekday;

    /// A light-injury car accident in Zurich on a Monday at 8:00 in
    /// March 2021. Tests override the fields they care about.
    pub fn record(id: &str) -> AccidentRecord {
        AccidentRecord {
            id: id.to_string(),
            accident_type: "at0".to_string(),
            accident_type_label: Some("Accident with skidding or self-accident".to_string()),
            severity: AccidentSeverity::LightInjuries,
            involves_pedestrian: false,
            involves_bicycle: false,
            involves_motorcycle: false,
            road_type: Some("rt433".to_string()),
            road_type_label: Some("Minor road".to_string()),
            canton: "ZH".to_string(),
            municipality: Some("261".to_string()),
            year: 2021,
            month: 3,
            weekday: Some(Weekday::Mon),
            hour: Some(8),
            latitude: 47.3769,
            longitude: 8.5417,
            chlv95: None,
            descriptions: BTreeMap::new(),
        }
    }

    /// Builds `count` records by applying `edit` to a default record.
    pub fn records(count: usize, edit: impl Fn(usize, &mut AccidentRecord)) -> Vec<AccidentRecord> {
        (0..count)
            .map(|i| {
                let mut rec = record(&format!("A{i}"));
                edit(i, &mut rec);
                rec
            })
            .collect()
    }
}
