//! Severity rates, historical high-risk combinations, and per-party
//! profiles.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use accident_map_accident_models::{
    AccidentRecord, AccidentSeverity, InvolvedParty, WEEKDAYS, weekday_name,
};
use accident_map_analytics_models::{
    Bucket, CantonSeverityRisk, CategoryRate, DayHourRisk, HourCantonRisk, HourRate,
    HourRoadRisk, PartyProfile, RiskMetrics, RiskPredictions,
};

use crate::stats::peak_weekday;
use crate::tally::{categories, count_by, max_key, percentage, ranked, round_to};

fn iter<R: Borrow<AccidentRecord>>(records: &[R]) -> impl Iterator<Item = &AccidentRecord> {
    records.iter().map(Borrow::borrow)
}

/// Rate of records satisfying `pred` within `group`, in percent with two
/// decimals.
fn rate(group: &[&AccidentRecord], pred: impl Fn(&AccidentRecord) -> bool) -> f64 {
    let hits = group.iter().filter(|r| pred(r)).count();
    round_to(percentage(hits as u64, group.len() as u64), 2)
}

fn group_by<'a, K: Ord>(
    records: impl Iterator<Item = &'a AccidentRecord>,
    key: impl Fn(&'a AccidentRecord) -> Option<K>,
) -> BTreeMap<K, Vec<&'a AccidentRecord>> {
    let mut groups: BTreeMap<K, Vec<&AccidentRecord>> = BTreeMap::new();
    for record in records {
        if let Some(k) = key(record) {
            groups.entry(k).or_default().push(record);
        }
    }
    groups
}

/// Fatal and severe rates overall, per road type, per hour, and for
/// cyclists.
#[must_use]
pub fn risk_metrics<R: Borrow<AccidentRecord>>(records: &[R]) -> RiskMetrics {
    let all: Vec<&AccidentRecord> = iter(records).collect();
    if all.is_empty() {
        return RiskMetrics::default();
    }

    let is_fatal = |r: &AccidentRecord| r.severity == AccidentSeverity::Fatal;

    let road_type_fatal_rates = group_by(all.iter().copied(), AccidentRecord::road_label)
        .into_iter()
        .map(|(road, group)| CategoryRate {
            category: road.to_string(),
            accidents: group.len() as u64,
            rate: rate(&group, is_fatal),
        })
        .collect();

    let hourly_severe_rates = group_by(all.iter().copied(), |r| r.hour)
        .into_iter()
        .map(|(hour, group)| HourRate {
            hour,
            accidents: group.len() as u64,
            rate: rate(&group, |r| r.severity.is_severe()),
        })
        .collect();

    let bicycle: Vec<&AccidentRecord> = all.iter().copied().filter(|r| r.involves_bicycle).collect();
    let bicycle_peak_hours = ranked(count_by(bicycle.iter().filter_map(|r| r.hour)))
        .into_iter()
        .take(3)
        .map(|(hour, _)| hour)
        .collect();

    RiskMetrics {
        total_accidents: all.len() as u64,
        fatal_rate: rate(&all, is_fatal),
        severe_rate: rate(&all, |r| r.severity == AccidentSeverity::SevereInjuries),
        road_type_fatal_rates,
        hourly_severe_rates,
        bicycle_fatal_rate: (!bicycle.is_empty()).then(|| rate(&bicycle, is_fatal)),
        bicycle_peak_hours,
    }
}

/// The `limit` most frequent hour x canton, weekday x hour, and (for
/// cyclists) hour x road type and canton x severity combinations, plus
/// recommendations drawn from the top entries.
#[must_use]
pub fn risk_predictions<R: Borrow<AccidentRecord>>(records: &[R], limit: usize) -> RiskPredictions {
    let hour_canton: Vec<HourCantonRisk> = ranked(count_by(
        iter(records).filter_map(|r| r.hour.map(|hour| (hour, r.canton.as_str()))),
    ))
    .into_iter()
    .take(limit)
    .map(|((hour, canton), count)| HourCantonRisk {
        hour,
        canton: canton.to_string(),
        count,
    })
    .collect();

    let day_hour = ranked(count_by(iter(records).filter_map(|r| {
        r.weekday
            .zip(r.hour)
            .map(|(day, hour)| (day.num_days_from_monday(), hour))
    })))
    .into_iter()
    .take(limit)
    .map(|((day, hour), count)| DayHourRisk {
        weekday: WEEKDAYS
            .get(day as usize)
            .map_or_else(String::new, |d| weekday_name(*d).to_string()),
        hour,
        count,
    })
    .collect();

    let bicycle = || iter(records).filter(|r| r.involves_bicycle);

    let bicycle_hour_road: Vec<HourRoadRisk> = ranked(count_by(
        bicycle().filter_map(|r| r.hour.zip(r.road_label())),
    ))
    .into_iter()
    .take(limit)
    .map(|((hour, road), count)| HourRoadRisk {
        hour,
        road_type: road.to_string(),
        count,
    })
    .collect();

    let bicycle_canton_severity = ranked(count_by(
        bicycle().map(|r| (r.canton.as_str(), r.severity)),
    ))
    .into_iter()
    .take(limit)
    .map(|((canton, severity), count)| CantonSeverityRisk {
        canton: canton.to_string(),
        severity,
        count,
    })
    .collect();

    let mut recommendations = Vec::new();
    if let Some(top) = hour_canton.first() {
        recommendations.push(format!(
            "Avoid riding in {} around {}:00",
            top.canton, top.hour
        ));
    }
    if let Some(top) = bicycle_hour_road.first() {
        recommendations.push(format!(
            "High cyclist risk: {} at {}:00",
            top.road_type, top.hour
        ));
    }

    RiskPredictions {
        hour_canton,
        day_hour,
        bicycle_hour_road,
        bicycle_canton_severity,
        recommendations,
    }
}

/// Dashboard for accidents involving `party`. `None` when there are none.
#[must_use]
pub fn party_profile<R: Borrow<AccidentRecord>>(
    records: &[R],
    party: InvolvedParty,
) -> Option<PartyProfile> {
    let involved: Vec<&AccidentRecord> = iter(records).filter(|r| r.involves(party)).collect();
    if involved.is_empty() {
        return None;
    }
    let count = involved.len() as u64;

    let hours = count_by(involved.iter().filter_map(|r| r.hour));
    let roads = count_by(involved.iter().filter_map(|r| r.road_label()));
    let (by_weekday, peak_day) = peak_weekday(involved.iter().copied());

    Some(PartyProfile {
        party,
        total_accidents: count,
        percentage: percentage(count, records.len() as u64),
        by_severity: categories(
            count_by(involved.iter().map(|r| r.severity.label())),
            count,
            usize::MAX,
        ),
        by_hour: hours
            .iter()
            .map(|(hour, n)| Bucket {
                key: *hour,
                count: *n,
            })
            .collect(),
        by_weekday,
        peak_hour: max_key(&hours),
        peak_weekday: peak_day,
        most_dangerous_road: max_key(&roads).map(str::to_string),
        top_road_types: categories(roads, count, 5),
        top_accident_types: categories(count_by(involved.iter().map(|r| r.type_label())), count, 5),
    })
}
