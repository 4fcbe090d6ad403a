#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filter criteria and analytics result types.
//!
//! Everything here is plain data: the analytics crate computes these
//! values, and the server and CLI serialize or print them. Distributions are
//! ordered vectors rather than maps so that JSON output keeps the order the
//! analytics produced (usually count descending).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use accident_map_accident_models::{AccidentSeverity, InvolvedParty, Season};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// How the selected party types are combined.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PartyMode {
    /// The record's involved parties equal the selection exactly.
    Exact,
    /// At least one selected party is involved.
    #[default]
    Any,
    /// Every selected party is involved; others may be too.
    All,
}

impl PartyMode {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Exact, Self::Any, Self::All]
    }
}

/// User-selected predicates over the accident table. Empty fields do not
/// restrict anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    /// Inclusive year range.
    pub year_range: Option<(i32, i32)>,
    /// Explicit set of years (combined with `year_range` by AND).
    pub years: BTreeSet<i32>,
    /// Canton codes.
    pub cantons: BTreeSet<String>,
    /// Severity categories.
    pub severities: BTreeSet<AccidentSeverity>,
    /// Accident type codes or English labels.
    pub accident_types: BTreeSet<String>,
    /// Road type codes or English labels.
    pub road_types: BTreeSet<String>,
    /// Selected party types. Empty disables the party predicate.
    pub parties: BTreeSet<InvolvedParty>,
    /// How `parties` is applied.
    pub party_mode: PartyMode,
    /// Calendar months (1-12).
    pub months: BTreeSet<u8>,
    /// Inclusive hour range. Records without an hour never match.
    pub hour_range: Option<(u8, u8)>,
}

impl FilterCriteria {
    /// Whether the party filter selects cyclists and nothing else.
    #[must_use]
    pub fn is_bicycle_only(&self) -> bool {
        self.parties.len() == 1 && self.parties.contains(&InvolvedParty::Bicycle)
    }

    /// Whether no predicate is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.year_range.is_none()
            && self.years.is_empty()
            && self.cantons.is_empty()
            && self.severities.is_empty()
            && self.accident_types.is_empty()
            && self.road_types.is_empty()
            && self.parties.is_empty()
            && self.months.is_empty()
            && self.hour_range.is_none()
    }

    /// Human-readable summary of the active predicates, e.g.
    /// `"years 2019-2021; cantons BE, ZH; parties bicycle (any)"`.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "all accidents".to_string();
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some((from, to)) = self.year_range {
            parts.push(format!("years {from}-{to}"));
        }
        if !self.years.is_empty() {
            parts.push(format!("year in {}", join(&self.years)));
        }
        if !self.cantons.is_empty() {
            parts.push(format!("cantons {}", join(&self.cantons)));
        }
        if !self.severities.is_empty() {
            parts.push(format!("severity {}", join(&self.severities)));
        }
        if !self.accident_types.is_empty() {
            parts.push(format!("types {}", join(&self.accident_types)));
        }
        if !self.road_types.is_empty() {
            parts.push(format!("roads {}", join(&self.road_types)));
        }
        if !self.parties.is_empty() {
            parts.push(format!("parties {} ({})", join(&self.parties), self.party_mode));
        }
        if !self.months.is_empty() {
            parts.push(format!("months {}", join(&self.months)));
        }
        if let Some((from, to)) = self.hour_range {
            parts.push(format!("hours {from}-{to}"));
        }
        parts.join("; ")
    }
}

fn join<T: std::fmt::Display>(values: &BTreeSet<T>) -> String {
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{value}");
    }
    out
}

/// Distinct values available for each filter, for populating pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Years present, ascending.
    pub years: Vec<i32>,
    /// Canton codes present.
    pub cantons: Vec<String>,
    /// Severities present, most severe first.
    pub severities: Vec<AccidentSeverity>,
    /// Accident type labels present.
    pub accident_types: Vec<String>,
    /// Road type labels present.
    pub road_types: Vec<String>,
    /// All party types.
    pub parties: Vec<InvolvedParty>,
    /// All party modes.
    pub party_modes: Vec<PartyMode>,
}

/// A labelled count with its share of the whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Category label.
    pub category: String,
    /// Number of accidents.
    pub count: u64,
    /// `count / total * 100`.
    pub percentage: f64,
}

/// A count keyed by a bucket value (month, hour, year, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket<K> {
    /// Bucket key.
    pub key: K,
    /// Number of accidents.
    pub count: u64,
}

/// Accidents involving one party type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyShare {
    /// Party type.
    pub party: InvolvedParty,
    /// Number of accidents involving it.
    pub count: u64,
    /// `count / total * 100`.
    pub percentage: f64,
}

/// Headline statistics for a filtered view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    /// Number of accidents.
    pub total_accidents: u64,
    /// Distinct cantons.
    pub unique_cantons: usize,
    /// Earliest year.
    pub start_year: Option<i32>,
    /// Latest year.
    pub end_year: Option<i32>,
    /// Accidents per severity label, count descending.
    pub severity_distribution: Vec<CategoryCount>,
    /// Five most common accident types.
    pub top_accident_types: Vec<CategoryCount>,
    /// Accidents per involved party type.
    pub parties: Vec<PartyShare>,
    /// Accidents per road type, count descending.
    pub road_type_distribution: Vec<CategoryCount>,
    /// Ten cantons with the most accidents.
    pub top_cantons: Vec<CategoryCount>,
}

/// Direction of the yearly least-squares trend.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrendDirection {
    /// Positive slope.
    Increasing,
    /// Negative slope.
    Decreasing,
    /// Zero slope.
    Flat,
}

/// Least-squares fit of yearly accident counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyTrend {
    /// Accidents per year.
    pub slope: f64,
    /// Sign of the slope.
    pub direction: TrendDirection,
}

/// When accidents happen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalAnalysis {
    /// Accidents per calendar month, in month order.
    pub monthly: Vec<Bucket<u8>>,
    /// Month with the most accidents.
    pub peak_month: Option<u8>,
    /// Month with the fewest accidents.
    pub lowest_month: Option<u8>,
    /// Accidents per hour of day, in hour order.
    pub hourly: Vec<Bucket<u8>>,
    /// Hour with the most accidents.
    pub peak_hour: Option<u8>,
    /// Hour with the fewest accidents.
    pub safest_hour: Option<u8>,
    /// Accidents per weekday name, Monday first.
    pub weekday: Vec<Bucket<String>>,
    /// Weekday with the most accidents.
    pub peak_weekday: Option<String>,
    /// Weekday with the fewest accidents.
    pub safest_weekday: Option<String>,
    /// Accidents per year, ascending.
    pub yearly: Vec<Bucket<i32>>,
    /// Trend over the yearly counts, when at least two years exist.
    pub yearly_trend: Option<YearlyTrend>,
}

/// Accident counts per season.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalAnalysis {
    /// Accidents per season.
    pub counts: BTreeMap<Season, u64>,
    /// Severity breakdown per season.
    pub severity_by_season: BTreeMap<Season, BTreeMap<AccidentSeverity, u64>>,
    /// Bicycle accidents per season.
    pub bicycle_by_season: BTreeMap<Season, u64>,
}

/// One year of [`YearOverYear`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRow {
    /// Calendar year.
    pub year: i32,
    /// Accidents that year.
    pub count: u64,
    /// Percent change vs. the previous listed year.
    pub pct_change: Option<f64>,
    /// Accidents involving a bicycle.
    pub bicycle: u64,
    /// Fatal accidents.
    pub fatal: u64,
}

/// Year-over-year accident counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearOverYear {
    /// One row per year present, ascending.
    pub years: Vec<YearRow>,
}

/// Which accidents a [`MonthlyTrend`] counts.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TrendMetric {
    /// Every accident.
    #[default]
    Total,
    /// Fatal accidents.
    Fatal,
    /// Accidents involving a bicycle.
    Bicycle,
    /// Accidents involving a pedestrian.
    Pedestrian,
}

impl TrendMetric {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Total, Self::Fatal, Self::Bicycle, Self::Pedestrian]
    }
}

/// Month-by-month series of one metric with the latest change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// Metric counted.
    pub metric: TrendMetric,
    /// `YYYY-MM` labels, ascending.
    pub labels: Vec<String>,
    /// Count per label.
    pub values: Vec<u64>,
    /// Latest month's value.
    pub current_value: u64,
    /// Previous month's value (equal to current when only one month).
    pub previous_value: u64,
    /// `current - previous`.
    pub delta: i64,
    /// Delta as a percentage of previous, 1 decimal; 0 when previous is 0.
    pub delta_pct: f64,
}

/// A rate for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRate {
    /// Category label.
    pub category: String,
    /// Accidents in the category.
    pub accidents: u64,
    /// Rate in percent, 2 decimals.
    pub rate: f64,
}

/// A rate for one hour of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourRate {
    /// Hour of day.
    pub hour: u8,
    /// Accidents in that hour.
    pub accidents: u64,
    /// Rate in percent, 2 decimals.
    pub rate: f64,
}

/// Severity rates for a filtered view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    /// Accidents considered.
    pub total_accidents: u64,
    /// Percent of accidents that were fatal.
    pub fatal_rate: f64,
    /// Percent of accidents with severe injuries.
    pub severe_rate: f64,
    /// Fatal rate per road type.
    pub road_type_fatal_rates: Vec<CategoryRate>,
    /// Fatal-or-severe rate per hour.
    pub hourly_severe_rates: Vec<HourRate>,
    /// Fatal rate among bicycle accidents, when any exist.
    pub bicycle_fatal_rate: Option<f64>,
    /// Up to three hours with the most bicycle accidents.
    pub bicycle_peak_hours: Vec<u8>,
}

/// Accidents per hour and canton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourCantonRisk {
    /// Hour of day.
    pub hour: u8,
    /// Canton code.
    pub canton: String,
    /// Accidents.
    pub count: u64,
}

/// Accidents per weekday and hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayHourRisk {
    /// Weekday name.
    pub weekday: String,
    /// Hour of day.
    pub hour: u8,
    /// Accidents.
    pub count: u64,
}

/// Bicycle accidents per hour and road type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourRoadRisk {
    /// Hour of day.
    pub hour: u8,
    /// Road type label.
    pub road_type: String,
    /// Accidents.
    pub count: u64,
}

/// Bicycle accidents per canton and severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CantonSeverityRisk {
    /// Canton code.
    pub canton: String,
    /// Severity category.
    pub severity: AccidentSeverity,
    /// Accidents.
    pub count: u64,
}

/// Historically riskiest combinations plus route-planning advice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskPredictions {
    /// Top hour x canton combinations.
    pub hour_canton: Vec<HourCantonRisk>,
    /// Top weekday x hour combinations.
    pub day_hour: Vec<DayHourRisk>,
    /// Top hour x road type combinations among bicycle accidents.
    pub bicycle_hour_road: Vec<HourRoadRisk>,
    /// Top canton x severity combinations among bicycle accidents.
    pub bicycle_canton_severity: Vec<CantonSeverityRisk>,
    /// Plain-language recommendations.
    pub recommendations: Vec<String>,
}

/// Dashboard for one involved party type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyProfile {
    /// Party type.
    pub party: InvolvedParty,
    /// Accidents involving the party.
    pub total_accidents: u64,
    /// Share of the filtered view.
    pub percentage: f64,
    /// Accidents per severity label.
    pub by_severity: Vec<CategoryCount>,
    /// Accidents per hour, in hour order.
    pub by_hour: Vec<Bucket<u8>>,
    /// Accidents per weekday name, Monday first.
    pub by_weekday: Vec<Bucket<String>>,
    /// Five most common road types.
    pub top_road_types: Vec<CategoryCount>,
    /// Five most common accident types.
    pub top_accident_types: Vec<CategoryCount>,
    /// Most common hour.
    pub peak_hour: Option<u8>,
    /// Most common weekday.
    pub peak_weekday: Option<String>,
    /// Most common road type.
    pub most_dangerous_road: Option<String>,
}

/// DBSCAN parameters for blackspot detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackspotParams {
    /// Neighbourhood radius in kilometres.
    pub eps_km: f64,
    /// Minimum accidents per zone.
    pub min_samples: usize,
}

impl Default for BlackspotParams {
    fn default() -> Self {
        Self {
            eps_km: 0.5,
            min_samples: 5,
        }
    }
}

impl BlackspotParams {
    /// Tighter parameters used for cyclist-only blackspots.
    #[must_use]
    pub const fn bicycle() -> Self {
        Self {
            eps_km: 0.3,
            min_samples: 3,
        }
    }
}

/// Coarse risk band of a blackspot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    /// Score below 20.
    Low,
    /// Score from 20 to 49.
    Medium,
    /// Score of 50 or more.
    High,
}

impl RiskLevel {
    /// Band for a risk score.
    #[must_use]
    pub const fn from_score(score: u64) -> Self {
        match score {
            50.. => Self::High,
            20..=49 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// A geographic cluster of accidents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackspotCluster {
    /// DBSCAN cluster label.
    pub cluster_id: usize,
    /// Mean member latitude.
    pub center_lat: f64,
    /// Mean member longitude.
    pub center_lon: f64,
    /// Largest member distance from the centre, in kilometres.
    pub radius_km: f64,
    /// Member count.
    pub accident_count: u64,
    /// Fatal accidents.
    pub fatal: u64,
    /// Accidents with severe injuries.
    pub severe: u64,
    /// Accidents with light injuries.
    pub light: u64,
    /// Property-damage-only accidents.
    pub property_damage: u64,
    /// Accidents involving a bicycle.
    pub bicycle: u64,
    /// Accidents involving a pedestrian.
    pub pedestrian: u64,
    /// Accidents involving a motorcycle.
    pub motorcycle: u64,
    /// Most common canton.
    pub canton: String,
    /// Most common accident type label.
    pub most_common_type: String,
    /// `5 * fatal + 3 * severe + light`.
    pub risk_score: u64,
    /// Band of `risk_score`.
    pub risk_level: RiskLevel,
}
