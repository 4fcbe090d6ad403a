//! Descriptive statistics: summary, temporal and seasonal distributions,
//! year-over-year and monthly trends, and plain-language insights.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use accident_map_accident_models::{
    AccidentRecord, AccidentSeverity, InvolvedParty, Season, WEEKDAYS, weekday_name,
};
use accident_map_analytics_models::{
    Bucket, MonthlyTrend, PartyShare, SeasonalAnalysis, SummaryStats, TemporalAnalysis,
    TrendDirection, TrendMetric, YearOverYear, YearRow, YearlyTrend,
};

use crate::tally::{
    categories, count_by, max_key, min_key, percentage, ranked, round_to, thousands,
};

/// Slopes smaller than this (accidents per year) count as flat.
const FLAT_SLOPE: f64 = 1e-9;

fn iter<R: Borrow<AccidentRecord>>(records: &[R]) -> impl Iterator<Item = &AccidentRecord> {
    records.iter().map(Borrow::borrow)
}

fn as_count(n: usize) -> u64 {
    n as u64
}

/// Headline statistics for `records`.
#[must_use]
pub fn summary_stats<R: Borrow<AccidentRecord>>(records: &[R]) -> SummaryStats {
    let total = as_count(records.len());
    if total == 0 {
        return SummaryStats::default();
    }

    let cantons = count_by(iter(records).map(|r| r.canton.as_str()));
    let parties = InvolvedParty::all()
        .iter()
        .map(|&party| {
            let count = as_count(iter(records).filter(|r| r.involves(party)).count());
            PartyShare {
                party,
                count,
                percentage: percentage(count, total),
            }
        })
        .collect();

    SummaryStats {
        total_accidents: total,
        unique_cantons: cantons.len(),
        start_year: iter(records).map(|r| r.year).min(),
        end_year: iter(records).map(|r| r.year).max(),
        severity_distribution: categories(
            count_by(iter(records).map(|r| r.severity.label())),
            total,
            usize::MAX,
        ),
        top_accident_types: categories(count_by(iter(records).map(AccidentRecord::type_label)), total, 5),
        parties,
        road_type_distribution: categories(
            count_by(iter(records).filter_map(AccidentRecord::road_label)),
            total,
            usize::MAX,
        ),
        top_cantons: categories(cantons, total, 10),
    }
}

fn buckets<K: Clone>(counts: &BTreeMap<K, u64>) -> Vec<Bucket<K>> {
    counts
        .iter()
        .map(|(key, count)| Bucket {
            key: key.clone(),
            count: *count,
        })
        .collect()
}

/// Weekday counts keyed by days since Monday.
fn weekday_counts<'a>(records: impl Iterator<Item = &'a AccidentRecord>) -> BTreeMap<u32, u64> {
    count_by(records.filter_map(|r| r.weekday).map(|d| d.num_days_from_monday()))
}

fn day_name(index: u32) -> String {
    WEEKDAYS
        .get(index as usize)
        .map_or_else(String::new, |day| weekday_name(*day).to_string())
}

pub(crate) fn weekday_buckets(counts: &BTreeMap<u32, u64>) -> Vec<Bucket<String>> {
    counts
        .iter()
        .map(|(day, count)| Bucket {
            key: day_name(*day),
            count: *count,
        })
        .collect()
}

pub(crate) fn peak_weekday<'a>(
    records: impl Iterator<Item = &'a AccidentRecord>,
) -> (Vec<Bucket<String>>, Option<String>) {
    let counts = weekday_counts(records);
    (weekday_buckets(&counts), max_key(&counts).map(day_name))
}

/// Least-squares slope of `(year, count)` pairs. `None` with fewer than
/// two years.
#[allow(clippy::cast_precision_loss)]
fn yearly_trend(yearly: &BTreeMap<i32, u64>) -> Option<YearlyTrend> {
    if yearly.len() < 2 {
        return None;
    }
    let n = yearly.len() as f64;
    let mean_x = yearly.keys().map(|y| f64::from(*y)).sum::<f64>() / n;
    let mean_y = yearly.values().map(|c| *c as f64).sum::<f64>() / n;

    let (mut covariance, mut variance) = (0.0, 0.0);
    for (year, count) in yearly {
        let dx = f64::from(*year) - mean_x;
        covariance += dx * (*count as f64 - mean_y);
        variance += dx * dx;
    }
    let slope = covariance / variance;

    let direction = if slope > FLAT_SLOPE {
        TrendDirection::Increasing
    } else if slope < -FLAT_SLOPE {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Flat
    };

    Some(YearlyTrend { slope, direction })
}

/// Monthly, hourly, weekday, and yearly distributions with their extremes.
#[must_use]
pub fn temporal_analysis<R: Borrow<AccidentRecord>>(records: &[R]) -> TemporalAnalysis {
    let monthly = count_by(iter(records).map(|r| r.month));
    let hourly = count_by(iter(records).filter_map(|r| r.hour));
    let weekday = weekday_counts(iter(records));
    let yearly = count_by(iter(records).map(|r| r.year));

    TemporalAnalysis {
        monthly: buckets(&monthly),
        peak_month: max_key(&monthly),
        lowest_month: min_key(&monthly),
        hourly: buckets(&hourly),
        peak_hour: max_key(&hourly),
        safest_hour: min_key(&hourly),
        weekday: weekday_buckets(&weekday),
        peak_weekday: max_key(&weekday).map(day_name),
        safest_weekday: min_key(&weekday).map(day_name),
        yearly: buckets(&yearly),
        yearly_trend: yearly_trend(&yearly),
    }
}

/// Accident, severity, and bicycle counts per meteorological season.
#[must_use]
pub fn seasonal_patterns<R: Borrow<AccidentRecord>>(records: &[R]) -> SeasonalAnalysis {
    let mut analysis = SeasonalAnalysis {
        counts: Season::all().iter().map(|s| (*s, 0)).collect(),
        bicycle_by_season: Season::all().iter().map(|s| (*s, 0)).collect(),
        ..SeasonalAnalysis::default()
    };

    for record in iter(records) {
        let Some(season) = record.season() else {
            continue;
        };
        *analysis.counts.entry(season).or_default() += 1;
        *analysis
            .severity_by_season
            .entry(season)
            .or_default()
            .entry(record.severity)
            .or_default() += 1;
        if record.involves_bicycle {
            *analysis.bicycle_by_season.entry(season).or_default() += 1;
        }
    }

    analysis
}

/// Yearly counts with percent change and bicycle/fatal breakdowns.
#[must_use]
pub fn year_over_year<R: Borrow<AccidentRecord>>(records: &[R]) -> YearOverYear {
    let yearly = count_by(iter(records).map(|r| r.year));
    let bicycle = count_by(iter(records).filter(|r| r.involves_bicycle).map(|r| r.year));
    let fatal = count_by(
        iter(records)
            .filter(|r| r.severity == AccidentSeverity::Fatal)
            .map(|r| r.year),
    );

    let mut previous: Option<u64> = None;
    let years = yearly
        .into_iter()
        .map(|(year, count)| {
            #[allow(clippy::cast_precision_loss)]
            let pct_change = previous
                .filter(|p| *p > 0)
                .map(|p| round_to((count as f64 - p as f64) / p as f64 * 100.0, 1));
            previous = Some(count);
            YearRow {
                year,
                count,
                pct_change,
                bicycle: bicycle.get(&year).copied().unwrap_or(0),
                fatal: fatal.get(&year).copied().unwrap_or(0),
            }
        })
        .collect();

    YearOverYear { years }
}

fn counts_toward(record: &AccidentRecord, metric: TrendMetric) -> bool {
    match metric {
        TrendMetric::Total => true,
        TrendMetric::Fatal => record.severity == AccidentSeverity::Fatal,
        TrendMetric::Bicycle => record.involves_bicycle,
        TrendMetric::Pedestrian => record.involves_pedestrian,
    }
}

/// Month-by-month counts of `metric` with the change between the last two
/// months that have any. `None` when no record counts toward `metric`.
#[must_use]
pub fn monthly_trend<R: Borrow<AccidentRecord>>(
    records: &[R],
    metric: TrendMetric,
) -> Option<MonthlyTrend> {
    let monthly = count_by(
        iter(records)
            .filter(|r| counts_toward(r, metric))
            .map(AccidentRecord::year_month),
    );

    let mut values = monthly.values().rev();
    let current_value = *values.next()?;
    let previous_value = values.next().copied().unwrap_or(current_value);

    #[allow(clippy::cast_possible_wrap)]
    let delta = current_value as i64 - previous_value as i64;
    #[allow(clippy::cast_precision_loss)]
    let delta_pct = if previous_value > 0 {
        round_to(delta as f64 / previous_value as f64 * 100.0, 1)
    } else {
        0.0
    };

    Some(MonthlyTrend {
        metric,
        labels: monthly.keys().cloned().collect(),
        values: monthly.values().copied().collect(),
        current_value,
        previous_value,
        delta,
        delta_pct,
    })
}

/// Plain-language findings about `records`.
#[must_use]
pub fn generate_insights<R: Borrow<AccidentRecord>>(records: &[R]) -> Vec<String> {
    let total = as_count(records.len());
    if total == 0 {
        return vec!["No data available for analysis.".to_string()];
    }

    let mut insights = vec![format!(
        "Dataset contains {} traffic accidents across Switzerland.",
        thousands(total)
    )];

    let severities = count_by(iter(records).map(|r| r.severity));
    if let Some((severity, count)) = ranked(severities.clone()).into_iter().next() {
        insights.push(format!(
            "Most accidents result in {} ({} cases).",
            severity.label().to_lowercase(),
            thousands(count)
        ));
    }
    if let Some(&fatal) = severities.get(&AccidentSeverity::Fatal) {
        insights.push(format!(
            "Fatal accidents account for {:.1}% of all accidents.",
            percentage(fatal, total)
        ));
    }

    let bicycle = as_count(iter(records).filter(|r| r.involves_bicycle).count());
    insights.push(format!(
        "Bicycles are involved in {:.1}% of all accidents ({} cases).",
        percentage(bicycle, total),
        thousands(bicycle)
    ));
    let bicycle_hours = count_by(
        iter(records)
            .filter(|r| r.involves_bicycle)
            .filter_map(|r| r.hour),
    );
    if let Some(hour) = max_key(&bicycle_hours) {
        insights.push(format!(
            "Peak risk hour for cyclists is {hour}:00-{}:00.",
            u16::from(hour) + 1
        ));
    }

    let weekdays = weekday_counts(iter(records));
    if let Some((day, count)) = ranked(weekdays).into_iter().next() {
        insights.push(format!(
            "{} has the highest number of accidents ({} cases).",
            day_name(day),
            thousands(count)
        ));
    }

    let cantons = count_by(iter(records).map(|r| r.canton.as_str()));
    if let Some((canton, count)) = ranked(cantons).into_iter().next() {
        insights.push(format!(
            "Canton {canton} reports the most accidents ({} cases).",
            thousands(count)
        ));
    }

    let roads = count_by(iter(records).filter_map(AccidentRecord::road_label));
    if let Some((road, count)) = ranked(roads).into_iter().next() {
        insights.push(format!(
            "Most accidents occur on {}s ({} cases).",
            road.to_lowercase(),
            thousands(count)
        ));
    }

    insights
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;
    use crate::fixtures::records;

    fn sample() -> Vec<AccidentRecord> {
        // 10 records across 2020-2022, three cantons, mixed parties.
        records(10, |i, rec| {
            rec.year = [2020, 2020, 2020, 2020, 2021, 2021, 2021, 2022, 2022, 2022][i];
            rec.month = [1, 1, 7, 12, 3, 7, 7, 6, 11, 11][i];
            rec.canton = ["ZH", "ZH", "BE", "ZH", "BE", "ZH", "GE", "ZH", "BE", "ZH"][i].to_string();
            rec.severity = match i {
                0 => AccidentSeverity::Fatal,
                1 | 2 => AccidentSeverity::SevereInjuries,
                3..=7 => AccidentSeverity::LightInjuries,
                _ => AccidentSeverity::PropertyDamage,
            };
            rec.involves_bicycle = matches!(i, 1 | 4 | 5 | 8);
            rec.involves_pedestrian = i == 2;
            rec.hour = [Some(8), Some(17), Some(17), None, Some(17), Some(8), Some(3), Some(8), Some(8), Some(12)][i];
            rec.weekday = Some([Weekday::Mon, Weekday::Fri, Weekday::Fri][i % 3]);
            if i == 9 {
                rec.road_type_label = Some("Motorway".to_string());
            }
        })
    }

    #[test]
    fn summary_percentages_are_count_over_total() {
        let all = sample();
        let stats = summary_stats(&all);
        assert_eq!(stats.total_accidents, 10);
        assert_eq!(stats.unique_cantons, 3);
        assert_eq!(stats.start_year, Some(2020));
        assert_eq!(stats.end_year, Some(2022));

        let light = &stats.severity_distribution[0];
        assert_eq!(light.category, "Accident with light injuries");
        assert_eq!(light.count, 5);
        assert!((light.percentage - 50.0).abs() < 1e-9);
        let total_share: f64 = stats.severity_distribution.iter().map(|c| c.percentage).sum();
        assert!((total_share - 100.0).abs() < 1e-9);

        let bicycle = stats
            .parties
            .iter()
            .find(|p| p.party == InvolvedParty::Bicycle)
            .unwrap();
        assert_eq!(bicycle.count, 4);
        assert!((bicycle.percentage - 40.0).abs() < 1e-9);

        assert_eq!(stats.top_cantons[0].category, "ZH");
        assert_eq!(stats.top_cantons[0].count, 6);
        assert_eq!(stats.road_type_distribution[0].category, "Minor road");
        assert_eq!(stats.road_type_distribution[1].count, 1);
    }

    #[test]
    fn summary_of_nothing_is_empty() {
        let stats = summary_stats::<AccidentRecord>(&[]);
        assert_eq!(stats.total_accidents, 0);
        assert!(stats.severity_distribution.is_empty());
        assert!(stats.top_cantons.is_empty());
        assert_eq!(stats.start_year, None);
    }

    #[test]
    fn temporal_distributions_and_extremes() {
        let all = sample();
        let view: Vec<&AccidentRecord> = all.iter().collect();
        let temporal = temporal_analysis(&view);

        assert_eq!(temporal.monthly.first().map(|b| b.key), Some(1));
        assert_eq!(temporal.peak_month, Some(7));
        assert_eq!(temporal.lowest_month, Some(3));
        assert_eq!(temporal.peak_hour, Some(8));
        assert_eq!(temporal.safest_hour, Some(3));
        assert_eq!(temporal.hourly.iter().map(|b| b.count).sum::<u64>(), 9);
        assert_eq!(temporal.weekday[0].key, "Monday");
        assert_eq!(temporal.peak_weekday.as_deref(), Some("Friday"));
        assert_eq!(temporal.safest_weekday.as_deref(), Some("Monday"));
        assert_eq!(
            temporal.yearly,
            vec![
                Bucket { key: 2020, count: 4 },
                Bucket { key: 2021, count: 3 },
                Bucket { key: 2022, count: 3 },
            ]
        );
        let trend = temporal.yearly_trend.unwrap();
        assert!((trend.slope + 0.5).abs() < 1e-9);
        assert_eq!(trend.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn single_year_has_no_trend() {
        let all = records(3, |_, _| {});
        assert!(temporal_analysis(&all).yearly_trend.is_none());
    }

    #[test]
    fn seasons_are_zero_filled() {
        let all = sample();
        let seasonal = seasonal_patterns(&all);
        assert_eq!(seasonal.counts[&Season::Winter], 3);
        assert_eq!(seasonal.counts[&Season::Spring], 1);
        assert_eq!(seasonal.counts[&Season::Summer], 4);
        assert_eq!(seasonal.counts[&Season::Fall], 2);
        assert_eq!(seasonal.bicycle_by_season[&Season::Summer], 1);
        assert_eq!(seasonal.bicycle_by_season[&Season::Spring], 1);
        assert_eq!(
            seasonal.severity_by_season[&Season::Winter][&AccidentSeverity::Fatal],
            1
        );

        let empty = seasonal_patterns::<AccidentRecord>(&[]);
        assert_eq!(empty.counts.len(), 4);
        assert!(empty.counts.values().all(|c| *c == 0));
    }

    #[test]
    fn year_over_year_changes() {
        let all = sample();
        let yoy = year_over_year(&all);
        assert_eq!(yoy.years.len(), 3);
        assert_eq!(yoy.years[0].pct_change, None);
        assert_eq!(yoy.years[0].fatal, 1);
        assert_eq!(yoy.years[0].bicycle, 1);
        assert_eq!(yoy.years[1].pct_change, Some(-25.0));
        assert_eq!(yoy.years[1].bicycle, 2);
        assert_eq!(yoy.years[2].pct_change, Some(0.0));
    }

    #[test]
    fn monthly_trend_reports_last_change() {
        let all = sample();
        let trend = monthly_trend(&all, TrendMetric::Total).unwrap();
        assert_eq!(
            trend.labels,
            vec![
                "2020-01", "2020-07", "2020-12", "2021-03", "2021-07", "2022-06", "2022-11"
            ]
        );
        assert_eq!(trend.values, vec![2, 1, 1, 1, 2, 1, 2]);
        assert_eq!(trend.current_value, 2);
        assert_eq!(trend.previous_value, 1);
        assert_eq!(trend.delta, 1);
        assert!((trend.delta_pct - 100.0).abs() < 1e-9);

        let bicycle = monthly_trend(&all, TrendMetric::Bicycle).unwrap();
        assert_eq!(bicycle.labels, vec!["2020-01", "2021-03", "2021-07", "2022-11"]);
        assert_eq!(bicycle.delta, 0);
    }

    #[test]
    fn monthly_trend_single_month_and_no_match() {
        let all = sample();
        let fatal = monthly_trend(&all, TrendMetric::Fatal).unwrap();
        assert_eq!(fatal.labels, vec!["2020-01"]);
        assert_eq!(fatal.previous_value, fatal.current_value);
        assert_eq!(fatal.delta, 0);
        assert!(fatal.delta_pct.abs() < f64::EPSILON);

        let nobody = records(2, |_, _| {});
        assert!(monthly_trend(&nobody, TrendMetric::Pedestrian).is_none());
    }

    #[test]
    fn insights_describe_the_data() {
        let all = sample();
        let insights = generate_insights(&all);
        assert_eq!(
            insights,
            vec![
                "Dataset contains 10 traffic accidents across Switzerland.",
                "Most accidents result in accident with light injuries (5 cases).",
                "Fatal accidents account for 10.0% of all accidents.",
                "Bicycles are involved in 40.0% of all accidents (4 cases).",
                "Peak risk hour for cyclists is 8:00-9:00.",
                "Friday has the highest number of accidents (6 cases).",
                "Canton ZH reports the most accidents (6 cases).",
                "Most accidents occur on minor roads (9 cases).",
            ]
        );
    }

    #[test]
    fn insights_without_data() {
        assert_eq!(
            generate_insights::<AccidentRecord>(&[]),
            vec!["No data available for analysis."]
        );
    }
}
