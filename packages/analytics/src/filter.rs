//! Predicate filtering over the accident table.

use std::borrow::Borrow;
use std::collections::BTreeSet;

use accident_map_accident_models::{AccidentRecord, AccidentSeverity, InvolvedParty};
use accident_map_analytics_models::{FilterCriteria, FilterOptions, PartyMode};

/// Whether `record` satisfies every active predicate in `criteria`.
#[must_use]
pub fn matches(record: &AccidentRecord, criteria: &FilterCriteria) -> bool {
    if let Some((from, to)) = criteria.year_range
        && !(from..=to).contains(&record.year)
    {
        return false;
    }
    if !criteria.years.is_empty() && !criteria.years.contains(&record.year) {
        return false;
    }
    if !criteria.cantons.is_empty()
        && !criteria
            .cantons
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&record.canton))
    {
        return false;
    }
    if !criteria.severities.is_empty() && !criteria.severities.contains(&record.severity) {
        return false;
    }
    if !criteria.accident_types.is_empty()
        && !matches_code_or_label(
            &criteria.accident_types,
            Some(&record.accident_type),
            record.accident_type_label.as_deref(),
        )
    {
        return false;
    }
    if !criteria.road_types.is_empty()
        && !matches_code_or_label(
            &criteria.road_types,
            record.road_type.as_deref(),
            record.road_type_label.as_deref(),
        )
    {
        return false;
    }
    if !criteria.parties.is_empty() && !matches_parties(record, &criteria.parties, criteria.party_mode)
    {
        return false;
    }
    if !criteria.months.is_empty() && !criteria.months.contains(&record.month) {
        return false;
    }
    if let Some(range) = criteria.hour_range {
        return record.hour.is_some_and(|hour| hour_in_range(hour, range));
    }
    true
}

fn matches_code_or_label(
    selected: &BTreeSet<String>,
    code: Option<&str>,
    label: Option<&str>,
) -> bool {
    selected.iter().any(|wanted| {
        code.is_some_and(|c| c.eq_ignore_ascii_case(wanted))
            || label.is_some_and(|l| l.eq_ignore_ascii_case(wanted))
    })
}

fn matches_parties(
    record: &AccidentRecord,
    selected: &BTreeSet<InvolvedParty>,
    mode: PartyMode,
) -> bool {
    match mode {
        PartyMode::Exact => record.involved_parties() == *selected,
        PartyMode::Any => selected.iter().any(|party| record.involves(*party)),
        PartyMode::All => selected.iter().all(|party| record.involves(*party)),
    }
}

/// Inclusive hour range. A range whose start is after its end wraps past
/// midnight (`22..=5` covers 22:00 through 05:59).
const fn hour_in_range(hour: u8, (from, to): (u8, u8)) -> bool {
    if from <= to {
        hour >= from && hour <= to
    } else {
        hour >= from || hour <= to
    }
}

/// Returns the records matching `criteria`, in input order.
#[must_use]
pub fn filter_records<'a, R: Borrow<AccidentRecord>>(
    records: &'a [R],
    criteria: &FilterCriteria,
) -> Vec<&'a AccidentRecord> {
    let filtered: Vec<&AccidentRecord> = records
        .iter()
        .map(Borrow::borrow)
        .filter(|record| matches(record, criteria))
        .collect();

    log::debug!(
        "Filter [{}] kept {} of {} records",
        criteria.describe(),
        filtered.len(),
        records.len()
    );

    filtered
}

/// Distinct values present in `records` for each filter dimension.
#[must_use]
pub fn available_filters<R: Borrow<AccidentRecord>>(records: &[R]) -> FilterOptions {
    let mut years = BTreeSet::new();
    let mut cantons = BTreeSet::new();
    let mut severities: BTreeSet<AccidentSeverity> = BTreeSet::new();
    let mut accident_types = BTreeSet::new();
    let mut road_types = BTreeSet::new();

    for record in records.iter().map(Borrow::borrow) {
        years.insert(record.year);
        cantons.insert(record.canton.clone());
        severities.insert(record.severity);
        accident_types.insert(record.type_label().to_string());
        if let Some(road) = record.road_label() {
            road_types.insert(road.to_string());
        }
    }

    FilterOptions {
        years: years.into_iter().collect(),
        cantons: cantons.into_iter().collect(),
        severities: severities.into_iter().collect(),
        accident_types: accident_types.into_iter().collect(),
        road_types: road_types.into_iter().collect(),
        parties: InvolvedParty::all().to_vec(),
        party_modes: PartyMode::all().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::fixtures::{record, records};

    fn ids(records: &[&AccidentRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    fn party_records() -> Vec<AccidentRecord> {
        // A0: none, A1: bicycle, A2: bicycle + pedestrian, A3: pedestrian,
        // A4: bicycle + pedestrian + motorcycle
        records(5, |i, rec| {
            rec.involves_bicycle = matches!(i, 1 | 2 | 4);
            rec.involves_pedestrian = matches!(i, 2 | 3 | 4);
            rec.involves_motorcycle = i == 4;
        })
    }

    fn parties(selected: &[InvolvedParty], mode: PartyMode) -> FilterCriteria {
        FilterCriteria {
            parties: selected.iter().copied().collect(),
            party_mode: mode,
            ..FilterCriteria::default()
        }
    }

    #[test]
    fn empty_criteria_keeps_everything_in_order() {
        let all = records(4, |_, _| {});
        let kept = filter_records(&all, &FilterCriteria::default());
        assert_eq!(ids(&kept), vec!["A0", "A1", "A2", "A3"]);
    }

    #[test]
    fn year_range_is_inclusive() {
        let all = records(6, |i, rec| rec.year = 2018 + i32::try_from(i).unwrap());
        let criteria = FilterCriteria {
            year_range: Some((2019, 2021)),
            ..FilterCriteria::default()
        };
        let kept = filter_records(&all, &criteria);
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|r| (2019..=2021).contains(&r.year)));
    }

    #[test]
    fn explicit_years_and_range_combine() {
        let all = records(6, |i, rec| rec.year = 2018 + i32::try_from(i).unwrap());
        let criteria = FilterCriteria {
            year_range: Some((2019, 2022)),
            years: BTreeSet::from([2018, 2020, 2022]),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&filter_records(&all, &criteria)), vec!["A2", "A4"]);
    }

    #[test]
    fn cantons_and_severities() {
        let all = records(4, |i, rec| {
            rec.canton = ["ZH", "BE", "GE", "ZH"][i].to_string();
            rec.severity = AccidentSeverity::all()[i];
        });
        let criteria = FilterCriteria {
            cantons: BTreeSet::from(["zh".to_string()]),
            severities: BTreeSet::from([AccidentSeverity::Fatal, AccidentSeverity::PropertyDamage]),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&filter_records(&all, &criteria)), vec!["A0", "A3"]);
    }

    #[test]
    fn types_match_code_or_label() {
        let all = records(3, |i, rec| {
            rec.accident_type = format!("at{i}");
            rec.accident_type_label = Some(format!("Type {i}"));
            rec.road_type_label = (i != 2).then(|| "Motorway".to_string());
        });
        let by_code = FilterCriteria {
            accident_types: BTreeSet::from(["at1".to_string(), "type 2".to_string()]),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&filter_records(&all, &by_code)), vec!["A1", "A2"]);

        let by_road = FilterCriteria {
            road_types: BTreeSet::from(["Motorway".to_string()]),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&filter_records(&all, &by_road)), vec!["A0", "A1"]);
    }

    #[test]
    fn party_mode_exact() {
        let all = party_records();
        let kept = filter_records(
            &all,
            &parties(&[InvolvedParty::Bicycle, InvolvedParty::Pedestrian], PartyMode::Exact),
        );
        assert_eq!(ids(&kept), vec!["A2"]);
    }

    #[test]
    fn party_mode_any() {
        let all = party_records();
        let kept = filter_records(
            &all,
            &parties(&[InvolvedParty::Bicycle, InvolvedParty::Pedestrian], PartyMode::Any),
        );
        assert_eq!(ids(&kept), vec!["A1", "A2", "A3", "A4"]);
    }

    #[test]
    fn party_mode_all() {
        let all = party_records();
        let kept = filter_records(
            &all,
            &parties(&[InvolvedParty::Bicycle, InvolvedParty::Pedestrian], PartyMode::All),
        );
        assert_eq!(ids(&kept), vec!["A2", "A4"]);
    }

    #[test]
    fn empty_party_set_disables_predicate() {
        let all = party_records();
        assert_eq!(filter_records(&all, &parties(&[], PartyMode::Exact)).len(), 5);
    }

    #[test]
    fn hour_range_excludes_missing_hours_and_wraps() {
        let all = records(5, |i, rec| rec.hour = [Some(6), Some(8), None, Some(23), Some(2)][i]);
        let day = FilterCriteria {
            hour_range: Some((6, 8)),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&filter_records(&all, &day)), vec!["A0", "A1"]);

        let night = FilterCriteria {
            hour_range: Some((22, 5)),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&filter_records(&all, &night)), vec!["A3", "A4"]);
    }

    #[test]
    fn months_filter() {
        let all = records(12, |i, rec| rec.month = u8::try_from(i + 1).unwrap());
        let criteria = FilterCriteria {
            months: BTreeSet::from([12, 1, 2]),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&filter_records(&all, &criteria)), vec!["A0", "A1", "A11"]);
    }

    #[test]
    fn filters_an_already_filtered_view() {
        let all = records(4, |i, rec| rec.year = 2020 + i32::try_from(i % 2).unwrap());
        let view = filter_records(
            &all,
            &FilterCriteria {
                years: BTreeSet::from([2021]),
                ..FilterCriteria::default()
            },
        );
        let again = filter_records(&view, &FilterCriteria::default());
        assert_eq!(ids(&again), vec!["A1", "A3"]);
    }

    #[test]
    fn available_filters_lists_distinct_values() {
        let mut all = records(3, |i, rec| {
            rec.year = 2023 - i32::try_from(i).unwrap();
            rec.canton = ["BE", "ZH", "BE"][i].to_string();
        });
        all.push(record("X"));
        all[3].road_type = None;
        all[3].road_type_label = None;
        all[3].severity = AccidentSeverity::Fatal;

        let options = available_filters(&all);
        assert_eq!(options.years, vec![2021, 2022, 2023]);
        assert_eq!(options.cantons, vec!["BE", "ZH"]);
        assert_eq!(
            options.severities,
            vec![AccidentSeverity::Fatal, AccidentSeverity::LightInjuries]
        );
        assert_eq!(options.road_types, vec!["Minor road"]);
        assert_eq!(options.parties.len(), 3);
    }
}
