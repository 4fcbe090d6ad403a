//! Plain-text rendering of analytics results.

use accident_map_accident_models::{AccidentSeverity, month_abbr};
use accident_map_analytics_models::{
    BlackspotCluster, CategoryCount, MonthlyTrend, PartyProfile, RiskMetrics, RiskPredictions,
    SeasonalAnalysis, SummaryStats, TemporalAnalysis, YearOverYear,
};
use accident_map_loader::{DataSummary, DatasetCheck, LoadReport, PropertyIndex, TrimReport};

const RULE: usize = 60;

fn heading(lines: &mut Vec<String>, title: &str) {
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(title.to_string());
    lines.push("-".repeat(RULE));
}

fn categories(lines: &mut Vec<String>, rows: &[CategoryCount]) {
    for row in rows {
        lines.push(format!(
            "{:<44} {:>8} {:>6.1}%",
            row.category, row.count, row.percentage
        ));
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// One line describing what the loader did.
#[must_use]
pub fn load_report(report: &LoadReport) -> String {
    if report.skipped() == 0 {
        format!("Loaded {} accidents", report.loaded)
    } else {
        format!(
            "Loaded {} of {} features ({} without coordinates, {} out of bounds, {} invalid)",
            report.loaded,
            report.features,
            report.skipped_missing_coordinates,
            report.skipped_out_of_bounds,
            report.skipped_invalid
        )
    }
}

/// Overview of the whole dataset, independent of any filter.
#[must_use]
pub fn dataset(summary: &DataSummary) -> String {
    let mut lines = Vec::new();
    heading(&mut lines, "Dataset");
    lines.push(format!("Accidents:        {}", summary.total_accidents));
    lines.push(format!(
        "Years:            {}-{}",
        or_dash(summary.year_start),
        or_dash(summary.year_end)
    ));
    lines.push(format!("Cantons:          {}", summary.cantons));
    lines.push(format!("Accident types:   {}", summary.accident_types));

    heading(&mut lines, "Severity");
    for (severity, count) in &summary.severity_distribution {
        lines.push(format!("{:<44} {:>8}", severity.label(), count));
    }
    heading(&mut lines, "Involving");
    for (party, count) in &summary.involving {
        lines.push(format!("{:<44} {:>8}", party.to_string(), count));
    }
    lines.join("\n")
}

#[must_use]
pub fn summary(stats: &SummaryStats, filters: &str) -> String {
    let mut lines = Vec::new();
    heading(&mut lines, &format!("Summary ({filters})"));
    lines.push(format!("Total accidents:  {}", stats.total_accidents));
    lines.push(format!("Cantons:          {}", stats.unique_cantons));
    if let (Some(start), Some(end)) = (stats.start_year, stats.end_year) {
        lines.push(format!("Years:            {start}-{end}"));
    }

    heading(&mut lines, "Severity");
    categories(&mut lines, &stats.severity_distribution);
    heading(&mut lines, "Top accident types");
    categories(&mut lines, &stats.top_accident_types);
    heading(&mut lines, "Involved parties");
    for share in &stats.parties {
        lines.push(format!(
            "{:<44} {:>8} {:>6.1}%",
            share.party.to_string(),
            share.count,
            share.percentage
        ));
    }
    heading(&mut lines, "Road types");
    categories(&mut lines, &stats.road_type_distribution);
    heading(&mut lines, "Top cantons");
    categories(&mut lines, &stats.top_cantons);
    lines.join("\n")
}

#[must_use]
pub fn temporal(analysis: &TemporalAnalysis, seasonal: &SeasonalAnalysis) -> String {
    let mut lines = Vec::new();

    heading(&mut lines, "By month");
    for bucket in &analysis.monthly {
        lines.push(format!("{:<10} {:>8}", month_abbr(bucket.key), bucket.count));
    }
    lines.push(format!(
        "Peak: {}  Lowest: {}",
        or_dash(analysis.peak_month.map(month_abbr)),
        or_dash(analysis.lowest_month.map(month_abbr))
    ));

    heading(&mut lines, "By hour");
    for bucket in &analysis.hourly {
        lines.push(format!("{:>2}:00      {:>8}", bucket.key, bucket.count));
    }
    lines.push(format!(
        "Peak: {}:00  Safest: {}:00",
        or_dash(analysis.peak_hour),
        or_dash(analysis.safest_hour)
    ));

    heading(&mut lines, "By weekday");
    for bucket in &analysis.weekday {
        lines.push(format!("{:<10} {:>8}", bucket.key, bucket.count));
    }

    heading(&mut lines, "By year");
    for bucket in &analysis.yearly {
        lines.push(format!("{:<10} {:>8}", bucket.key, bucket.count));
    }
    if let Some(trend) = analysis.yearly_trend {
        lines.push(format!(
            "Trend: {} ({:+.1} accidents/year)",
            trend.direction, trend.slope
        ));
    }

    heading(&mut lines, "By season");
    for (season, count) in &seasonal.counts {
        let bicycle = seasonal.bicycle_by_season.get(season).copied().unwrap_or(0);
        let fatal = seasonal
            .severity_by_season
            .get(season)
            .and_then(|s| s.get(&AccidentSeverity::Fatal))
            .copied()
            .unwrap_or(0);
        lines.push(format!(
            "{:<10} {count:>8}  fatal {fatal:>5}  bicycle {bicycle:>5}",
            season.to_string()
        ));
    }

    lines.join("\n")
}

#[must_use]
pub fn trends(yoy: &YearOverYear, monthly: Option<&MonthlyTrend>) -> String {
    let mut lines = Vec::new();
    heading(&mut lines, "Year over year");
    lines.push(format!(
        "{:<6} {:>8} {:>9} {:>8} {:>6}",
        "YEAR", "COUNT", "CHANGE", "BICYCLE", "FATAL"
    ));
    for row in &yoy.years {
        let change = row
            .pct_change
            .map_or_else(|| "-".to_string(), |p| format!("{p:+.1}%"));
        lines.push(format!(
            "{:<6} {:>8} {change:>9} {:>8} {:>6}",
            row.year, row.count, row.bicycle, row.fatal
        ));
    }

    if let Some(trend) = monthly {
        heading(&mut lines, &format!("Monthly ({})", trend.metric));
        for (label, value) in trend.labels.iter().zip(&trend.values) {
            lines.push(format!("{label:<10} {value:>8}"));
        }
        lines.push(format!(
            "Latest {} vs previous {}: {:+} ({:+.1}%)",
            trend.current_value, trend.previous_value, trend.delta, trend.delta_pct
        ));
    }
    lines.join("\n")
}

#[must_use]
pub fn risk(metrics: &RiskMetrics, predictions: &RiskPredictions) -> String {
    let mut lines = Vec::new();
    heading(&mut lines, "Risk metrics");
    lines.push(format!("Fatal rate:   {:.2}%", metrics.fatal_rate));
    lines.push(format!("Severe rate:  {:.2}%", metrics.severe_rate));
    if let Some(rate) = metrics.bicycle_fatal_rate {
        lines.push(format!("Bicycle fatal rate: {rate:.2}%"));
    }
    if !metrics.bicycle_peak_hours.is_empty() {
        let hours: Vec<String> = metrics
            .bicycle_peak_hours
            .iter()
            .map(|h| format!("{h}:00"))
            .collect();
        lines.push(format!("Bicycle peak hours: {}", hours.join(", ")));
    }

    heading(&mut lines, "Fatal rate by road type");
    for row in &metrics.road_type_fatal_rates {
        lines.push(format!(
            "{:<44} {:>8} {:>6.2}%",
            row.category, row.accidents, row.rate
        ));
    }

    heading(&mut lines, "Highest-risk hour and canton");
    for row in &predictions.hour_canton {
        lines.push(format!("{:>2}:00  {:<6} {:>8}", row.hour, row.canton, row.count));
    }
    heading(&mut lines, "Highest-risk weekday and hour");
    for row in &predictions.day_hour {
        lines.push(format!("{:<10} {:>2}:00 {:>8}", row.weekday, row.hour, row.count));
    }
    if !predictions.bicycle_hour_road.is_empty() {
        heading(&mut lines, "Cyclists: hour and road type");
        for row in &predictions.bicycle_hour_road {
            lines.push(format!("{:>2}:00  {:<36} {:>8}", row.hour, row.road_type, row.count));
        }
    }

    if !predictions.recommendations.is_empty() {
        heading(&mut lines, "Recommendations");
        for recommendation in &predictions.recommendations {
            lines.push(format!("* {recommendation}"));
        }
    }
    lines.join("\n")
}

#[must_use]
pub fn party(profile: &PartyProfile) -> String {
    let mut lines = Vec::new();
    heading(
        &mut lines,
        &format!("{} accidents", profile.party.label()),
    );
    lines.push(format!(
        "Total: {} ({:.1}% of filtered accidents)",
        profile.total_accidents, profile.percentage
    ));
    lines.push(format!(
        "Peak hour: {}:00  Peak weekday: {}  Most dangerous road: {}",
        or_dash(profile.peak_hour),
        or_dash(profile.peak_weekday.as_deref()),
        or_dash(profile.most_dangerous_road.as_deref())
    ));
    heading(&mut lines, "Severity");
    categories(&mut lines, &profile.by_severity);
    heading(&mut lines, "Road types");
    categories(&mut lines, &profile.top_road_types);
    heading(&mut lines, "Accident types");
    categories(&mut lines, &profile.top_accident_types);
    lines.join("\n")
}

#[must_use]
pub fn blackspots(clusters: &[BlackspotCluster]) -> String {
    if clusters.is_empty() {
        return "No blackspots found.".to_string();
    }
    let mut lines = Vec::new();
    heading(&mut lines, &format!("{} blackspots", clusters.len()));
    lines.push(format!(
        "{:>4} {:<6} {:>10} {:>10} {:>7} {:>6} {:>5} {:>6} {:<6}",
        "#", "CANTON", "LAT", "LON", "RADIUS", "COUNT", "FATAL", "SCORE", "LEVEL"
    ));
    for (rank, cluster) in clusters.iter().enumerate() {
        lines.push(format!(
            "{:>4} {:<6} {:>10.5} {:>10.5} {:>6.2}k {:>6} {:>5} {:>6} {:<6}",
            rank + 1,
            cluster.canton,
            cluster.center_lat,
            cluster.center_lon,
            cluster.radius_km,
            cluster.accident_count,
            cluster.fatal,
            cluster.risk_score,
            cluster.risk_level.to_string()
        ));
    }
    lines.join("\n")
}

#[must_use]
pub fn check(check: &DatasetCheck) -> String {
    let mut lines = Vec::new();
    heading(&mut lines, "Dataset check");
    if let Some(size) = check.size_bytes {
        lines.push(format!("Size:               {size} bytes"));
    }
    lines.push(format!("Features:           {}", check.features));
    lines.push(format!("Malformed features: {}", check.malformed_features));
    lines.push(format!("Missing ids:        {}", check.missing_ids));
    lines.push(format!("Duplicate ids:      {}", check.duplicate_ids));
    for duplicate in &check.duplicate_examples {
        lines.push(format!("  {} at features {:?}", duplicate.id, duplicate.indices));
    }
    lines.push(format!("Invalid years:      {}", check.invalid_years));

    heading(&mut lines, "Geometry types");
    for (kind, count) in &check.geometry_types {
        lines.push(format!("{kind:<24} {count:>10}"));
    }
    heading(&mut lines, "Years");
    for (year, count) in &check.years {
        lines.push(format!("{year:<24} {count:>10}"));
    }
    heading(&mut lines, "Property keys");
    for (key, count) in &check.property_keys {
        lines.push(format!("{key:<40} {count:>10}"));
    }
    lines.join("\n")
}

/// Overview of every column, or the top values of one column, followed by
/// the counts of each `column=value` match.
#[must_use]
pub fn metrics(
    index: &PropertyIndex,
    column: Option<&str>,
    top: usize,
    matches: &[(String, String)],
) -> String {
    let mut lines = Vec::new();
    match column {
        Some(column) => {
            heading(&mut lines, &format!("Top values of {column}"));
            match index.top(column, top) {
                Some(rows) => {
                    for row in rows {
                        lines.push(format!(
                            "{:<44} {:>8} {:>6.1}%",
                            row.value, row.count, row.percentage
                        ));
                    }
                    lines.push(format!("Missing: {}", index.missing(column)));
                }
                None => lines.push(format!("Unknown column '{column}'")),
            }
        }
        None => {
            heading(&mut lines, &format!("{} features", index.total));
            lines.push(format!("{:<40} {:>8} {:>8}", "COLUMN", "UNIQUE", "MISSING"));
            for column in index.columns() {
                lines.push(format!(
                    "{column:<40} {:>8} {:>8}",
                    index.unique(column),
                    index.missing(column)
                ));
            }
        }
    }

    if !matches.is_empty() {
        heading(&mut lines, "Matches");
        for (column, value) in matches {
            let line = index.count_match(column, value).map_or_else(
                || format!("{column}={value}: unknown column"),
                |count| format!("{column}={value}: {count} ({:.1}%)", index.percentage(count)),
            );
            lines.push(line);
        }
    }
    lines.join("\n")
}

#[must_use]
pub fn trim(report: &TrimReport) -> String {
    format!(
        "Kept {} features from {}-{} (input spans {}-{}); dropped {}, skipped {} without a year",
        report.kept,
        report.first_year_kept,
        report.max_year,
        report.min_year,
        report.max_year,
        report.dropped,
        report.skipped_invalid
    )
}

#[cfg(test)]
mod tests {
    use accident_map_analytics::{
        identify_blackspots, risk_metrics, risk_predictions, seasonal_patterns, summary_stats,
        temporal_analysis, year_over_year,
    };
    use accident_map_analytics_models::BlackspotParams;

    use super::*;

    fn sample() -> Vec<accident_map_accident_models::AccidentRecord> {
        accident_map_loader::parse_accidents(include_str!("../../loader/fixtures/sample.geojson"))
            .unwrap()
            .records
    }

    #[test]
    fn dataset_overview_lists_years_and_parties() {
        let text = dataset(&accident_map_loader::data_summary(&sample()));
        assert!(text.starts_with("Dataset"));
        assert!(text.contains("Accidents:        5"));
        assert!(text.contains("Years:            2019-2023"));
        assert!(text.contains("Accident with light injuries"));
        assert!(text.contains("Involving"));
    }

    #[test]
    fn summary_lists_sections() {
        let records = sample();
        let text = summary(&summary_stats(&records), "all accidents");
        assert!(text.starts_with("Summary (all accidents)"));
        assert!(text.contains("Total accidents:  5"));
        assert!(text.contains("Years:            2019-2023"));
        assert!(text.contains("Top cantons"));
    }

    #[test]
    fn temporal_names_months_and_seasons() {
        let records = sample();
        let text = temporal(&temporal_analysis(&records), &seasonal_patterns(&records));
        assert!(text.contains("Jan"));
        assert!(text.contains("Winter"));
        assert!(text.contains("Trend:"));
    }

    #[test]
    fn trends_show_first_year_without_change() {
        let records = sample();
        let text = trends(&year_over_year(&records), None);
        let first = text.lines().nth(3).unwrap();
        assert!(first.starts_with("2019"));
        assert!(first.contains(" - "));
    }

    #[test]
    fn risk_includes_recommendations() {
        let records = sample();
        let text = risk(&risk_metrics(&records), &risk_predictions(&records, 3));
        assert!(text.contains("Fatal rate:   20.00%"));
        assert!(text.contains("Recommendations"));
    }

    #[test]
    fn blackspots_table() {
        let records = sample();
        assert_eq!(blackspots(&[]), "No blackspots found.");

        let params = BlackspotParams {
            eps_km: 300.0,
            min_samples: 2,
        };
        let clusters = identify_blackspots(&records, &params).unwrap();
        let text = blackspots(&clusters);
        assert!(text.contains("blackspots"));
        assert_eq!(text.lines().count(), 3 + clusters.len());
    }

    #[test]
    fn load_report_mentions_skips_only_when_present() {
        let mut report = LoadReport {
            features: 3,
            loaded: 3,
            ..LoadReport::default()
        };
        assert_eq!(load_report(&report), "Loaded 3 accidents");
        report.loaded = 2;
        report.skipped_out_of_bounds = 1;
        assert!(load_report(&report).contains("1 out of bounds"));
    }
}
