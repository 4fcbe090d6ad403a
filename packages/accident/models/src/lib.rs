#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accident record, severity, and involved-party types.
//!
//! This crate defines the canonical accident row used across the entire
//! accident-map system. The loader normalizes every `GeoJSON` feature into an
//! [`AccidentRecord`], and every downstream stage (filters, analytics,
//! exports) works with these immutable rows.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Severity category of an accident, as coded in the Swiss accident dataset.
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
#[strum(ascii_case_insensitive)]
pub enum AccidentSeverity {
    /// `as1`: accident with fatalities
    #[serde(rename = "as1")]
    #[strum(to_string = "as1", serialize = "fatal")]
    Fatal,
    /// `as2`: accident with severe injuries
    #[serde(rename = "as2")]
    #[strum(to_string = "as2", serialize = "severe")]
    SevereInjuries,
    /// `as3`: accident with light injuries
    #[serde(rename = "as3")]
    #[strum(to_string = "as3", serialize = "light")]
    LightInjuries,
    /// `as4`: accident with property damage only
    #[serde(rename = "as4")]
    #[strum(to_string = "as4", serialize = "property")]
    PropertyDamage,
}

impl AccidentSeverity {
    /// Returns the dataset code (`as1`..`as4`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Fatal => "as1",
            Self::SevereInjuries => "as2",
            Self::LightInjuries => "as3",
            Self::PropertyDamage => "as4",
        }
    }

    /// Returns the English label used by the `AccidentSeverityCategory_en`
    /// property.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fatal => "Accident with fatalities",
            Self::SevereInjuries => "Accident with severe injuries",
            Self::LightInjuries => "Accident with light injuries",
            Self::PropertyDamage => "Accident with property damage",
        }
    }

    /// Weight of this severity in blackspot risk scores and heatmaps.
    #[must_use]
    pub const fn risk_weight(self) -> u64 {
        match self {
            Self::Fatal => 5,
            Self::SevereInjuries => 3,
            Self::LightInjuries => 1,
            Self::PropertyDamage => 0,
        }
    }

    /// Whether this accident counts as severe (fatal or severe injuries).
    #[must_use]
    pub const fn is_severe(self) -> bool {
        matches!(self, Self::Fatal | Self::SevereInjuries)
    }

    /// Parses a severity from its code, short name, or English label.
    #[must_use]
    pub fn parse_loose(value: &str) -> Option<Self> {
        let value = value.trim();
        value.parse().ok().or_else(|| {
            Self::all()
                .iter()
                .copied()
                .find(|s| s.label().eq_ignore_ascii_case(value))
        })
    }

    /// Returns all variants of this enum, most severe first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Fatal,
            Self::SevereInjuries,
            Self::LightInjuries,
            Self::PropertyDamage,
        ]
    }
}

/// Party types flagged on each accident record.
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InvolvedParty {
    /// A pedestrian was involved.
    Pedestrian,
    /// A bicycle (or e-bike) was involved.
    Bicycle,
    /// A motorcycle was involved.
    Motorcycle,
}

impl InvolvedParty {
    /// Returns the `GeoJSON` property carrying this party's flag.
    #[must_use]
    pub const fn property(self) -> &'static str {
        match self {
            Self::Pedestrian => "AccidentInvolvingPedestrian",
            Self::Bicycle => "AccidentInvolvingBicycle",
            Self::Motorcycle => "AccidentInvolvingMotorcycle",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pedestrian => "Pedestrian",
            Self::Bicycle => "Bicycle",
            Self::Motorcycle => "Motorcycle",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pedestrian, Self::Bicycle, Self::Motorcycle]
    }
}

/// Meteorological season (Northern Hemisphere) of an accident month.
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
pub enum Season {
    /// December, January, February
    Winter,
    /// March, April, May
    Spring,
    /// June, July, August
    Summer,
    /// September, October, November
    Fall,
}

impl Season {
    /// Maps a calendar month (1-12) to its season.
    #[must_use]
    pub const fn from_month(month: u8) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Self::Winter),
            3..=5 => Some(Self::Spring),
            6..=8 => Some(Self::Summer),
            9..=11 => Some(Self::Fall),
            _ => None,
        }
    }

    /// Returns all variants of this enum in calendar order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Winter, Self::Spring, Self::Summer, Self::Fall]
    }
}

/// Days of the week in dataset order (Monday first).
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Full English name of a weekday (`"Monday"`), as used by
/// `AccidentWeekDay_en`.
#[must_use]
pub const fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parses a weekday from a dataset code (`aw401` = Monday .. `aw407` =
/// Sunday) or an English name (`"Monday"`, `"Mon"`).
#[must_use]
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    let value = value.trim();
    if let Some(n) = value.strip_prefix("aw40") {
        return match n {
            "1" => Some(Weekday::Mon),
            "2" => Some(Weekday::Tue),
            "3" => Some(Weekday::Wed),
            "4" => Some(Weekday::Thu),
            "5" => Some(Weekday::Fri),
            "6" => Some(Weekday::Sat),
            "7" => Some(Weekday::Sun),
            _ => None,
        };
    }
    value.parse().ok()
}

/// English month abbreviation for a calendar month (1-12).
#[must_use]
pub const fn month_abbr(month: u8) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "???",
    }
}

/// A single road-traffic accident.
///
/// Rows are immutable once loaded; filters hand out references and
/// analytics only read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentRecord {
    /// Dataset-wide unique identifier (`AccidentUID`).
    pub id: String,
    /// Accident type code (e.g. `at0`).
    pub accident_type: String,
    /// English accident type label, if present.
    pub accident_type_label: Option<String>,
    /// Severity category.
    pub severity: AccidentSeverity,
    /// Whether a pedestrian was involved.
    pub involves_pedestrian: bool,
    /// Whether a bicycle was involved.
    pub involves_bicycle: bool,
    /// Whether a motorcycle was involved.
    pub involves_motorcycle: bool,
    /// Road type code (e.g. `rt433`).
    pub road_type: Option<String>,
    /// English road type label.
    pub road_type_label: Option<String>,
    /// Two-letter canton code (e.g. `ZH`).
    pub canton: String,
    /// Federal municipality number.
    pub municipality: Option<String>,
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u8,
    /// Day of the week, if recorded.
    pub weekday: Option<Weekday>,
    /// Hour of day (0-23), if recorded.
    pub hour: Option<u8>,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Original CHLV95 easting/northing, if present.
    pub chlv95: Option<(f64, f64)>,
    /// Accident type descriptions keyed by language code (`de`, `fr`, `it`,
    /// `en`).
    pub descriptions: BTreeMap<String, String>,
}

impl AccidentRecord {
    /// Whether the given party is flagged on this record.
    #[must_use]
    pub const fn involves(&self, party: InvolvedParty) -> bool {
        match party {
            InvolvedParty::Pedestrian => self.involves_pedestrian,
            InvolvedParty::Bicycle => self.involves_bicycle,
            InvolvedParty::Motorcycle => self.involves_motorcycle,
        }
    }

    /// The set of flagged parties.
    #[must_use]
    pub fn involved_parties(&self) -> BTreeSet<InvolvedParty> {
        InvolvedParty::all()
            .iter()
            .copied()
            .filter(|party| self.involves(*party))
            .collect()
    }

    /// English accident type label, falling back to the type code.
    #[must_use]
    pub fn type_label(&self) -> &str {
        self.accident_type_label
            .as_deref()
            .unwrap_or(&self.accident_type)
    }

    /// English road type label, falling back to the road type code.
    #[must_use]
    pub fn road_label(&self) -> Option<&str> {
        self.road_type_label
            .as_deref()
            .or(self.road_type.as_deref())
    }

    /// Accident description in the given language, if present.
    #[must_use]
    pub fn description(&self, language: &str) -> Option<&str> {
        self.descriptions.get(language).map(String::as_str)
    }

    /// Season of the accident month.
    #[must_use]
    pub const fn season(&self) -> Option<Season> {
        Season::from_month(self.month)
    }

    /// `YYYY-MM` label used for monthly grouping.
    #[must_use]
    pub fn year_month(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AccidentRecord {
        AccidentRecord {
            id: "A1".to_string(),
            accident_type: "at0".to_string(),
            accident_type_label: Some("Accident with skidding or self-accident".to_string()),
            severity: AccidentSeverity::SevereInjuries,
            involves_pedestrian: false,
            involves_bicycle: true,
            involves_motorcycle: true,
            road_type: Some("rt433".to_string()),
            road_type_label: None,
            canton: "ZH".to_string(),
            municipality: Some("261".to_string()),
            year: 2021,
            month: 3,
            weekday: Some(Weekday::Tue),
            hour: Some(7),
            latitude: 47.37,
            longitude: 8.54,
            chlv95: None,
            descriptions: BTreeMap::from([("de".to_string(), "Schleuderunfall".to_string())]),
        }
    }

    #[test]
    fn severity_codes_parse() {
        assert_eq!("as1".parse::<AccidentSeverity>().unwrap(), AccidentSeverity::Fatal);
        assert_eq!("AS4".parse::<AccidentSeverity>().unwrap(), AccidentSeverity::PropertyDamage);
        assert_eq!(AccidentSeverity::LightInjuries.to_string(), "as3");
        assert!(AccidentSeverity::Fatal.is_severe());
        assert!(!AccidentSeverity::LightInjuries.is_severe());
    }

    #[test]
    fn severity_parse_loose_accepts_labels() {
        assert_eq!(
            AccidentSeverity::parse_loose("Accident with severe injuries"),
            Some(AccidentSeverity::SevereInjuries)
        );
        assert_eq!(
            AccidentSeverity::parse_loose("fatal"),
            Some(AccidentSeverity::Fatal)
        );
        assert_eq!(AccidentSeverity::parse_loose("as9"), None);
    }

    #[test]
    fn severity_serializes_as_code() {
        let json = serde_json::to_string(&AccidentSeverity::Fatal).unwrap();
        assert_eq!(json, "\"as1\"");
        let back: AccidentSeverity = serde_json::from_str("\"as2\"").unwrap();
        assert_eq!(back, AccidentSeverity::SevereInjuries);
    }

    #[test]
    fn weekday_codes_and_names() {
        assert_eq!(parse_weekday("aw401"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("aw407"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("Friday"), Some(Weekday::Fri));
        assert_eq!(parse_weekday("aw409"), None);
        assert_eq!(weekday_name(Weekday::Wed), "Wednesday");
    }

    #[test]
    fn seasons_cover_all_months() {
        for month in 1..=12 {
            assert!(Season::from_month(month).is_some(), "month {month}");
        }
        assert_eq!(Season::from_month(12), Some(Season::Winter));
        assert_eq!(Season::from_month(0), None);
    }

    #[test]
    fn record_party_helpers() {
        let rec = record();
        assert!(rec.involves(InvolvedParty::Bicycle));
        assert!(!rec.involves(InvolvedParty::Pedestrian));
        assert_eq!(
            rec.involved_parties(),
            BTreeSet::from([InvolvedParty::Bicycle, InvolvedParty::Motorcycle])
        );
    }

    #[test]
    fn record_label_fallbacks() {
        let rec = record();
        assert_eq!(rec.type_label(), "Accident with skidding or self-accident");
        assert_eq!(rec.road_label(), Some("rt433"));
        assert_eq!(rec.description("de"), Some("Schleuderunfall"));
        assert_eq!(rec.year_month(), "2021-03");
        assert_eq!(rec.season(), Some(Season::Spring));
    }
}
