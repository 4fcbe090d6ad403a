//! Dataset-level overview of loaded records.

use std::collections::{BTreeMap, BTreeSet};

use accident_map_accident_models::{AccidentRecord, AccidentSeverity, InvolvedParty};
use serde::Serialize;

/// High-level overview of a set of accident records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSummary {
    /// Number of records.
    pub total_accidents: usize,
    /// Earliest accident year.
    pub year_start: Option<i32>,
    /// Latest accident year.
    pub year_end: Option<i32>,
    /// Number of distinct cantons.
    pub cantons: usize,
    /// Number of distinct accident type codes.
    pub accident_types: usize,
    /// Records per severity category.
    pub severity_distribution: BTreeMap<AccidentSeverity, usize>,
    /// Records flagging each involved party.
    pub involving: BTreeMap<InvolvedParty, usize>,
}

/// Builds a [`DataSummary`] for the given records.
#[must_use]
pub fn data_summary(records: &[AccidentRecord]) -> DataSummary {
    let mut summary = DataSummary {
        total_accidents: records.len(),
        year_start: records.iter().map(|r| r.year).min(),
        year_end: records.iter().map(|r| r.year).max(),
        ..DataSummary::default()
    };

    let mut cantons = BTreeSet::new();
    let mut types = BTreeSet::new();

    for record in records {
        cantons.insert(record.canton.as_str());
        types.insert(record.accident_type.as_str());
        *summary
            .severity_distribution
            .entry(record.severity)
            .or_default() += 1;
        for party in record.involved_parties() {
            *summary.involving.entry(party).or_default() += 1;
        }
    }

    summary.cantons = cantons.len();
    summary.accident_types = types.len();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_accidents;

    #[test]
    fn summarises_sample() {
        let dataset = parse_accidents(include_str!("../fixtures/sample.geojson")).unwrap();
        let summary = data_summary(&dataset.records);

        assert_eq!(summary.total_accidents, 5);
        assert_eq!(summary.year_start, Some(2019));
        assert_eq!(summary.year_end, Some(2023));
        assert_eq!(summary.cantons, 3);
        assert_eq!(summary.accident_types, 4);
        assert_eq!(summary.severity_distribution[&AccidentSeverity::LightInjuries], 2);
        assert_eq!(summary.involving[&InvolvedParty::Bicycle], 2);
        assert_eq!(summary.involving.get(&InvolvedParty::Pedestrian), Some(&1));
    }

    #[test]
    fn empty_summary() {
        let summary = data_summary(&[]);
        assert_eq!(summary.total_accidents, 0);
        assert_eq!(summary.year_start, None);
        assert!(summary.severity_distribution.is_empty());
    }
}
