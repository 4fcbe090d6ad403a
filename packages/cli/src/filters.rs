//! Filter flags shared by the analytics subcommands.

use accident_map_analytics_models::FilterCriteria;
use accident_map_server_models::{ApiFilterParams, ParamError};
use clap::Args;

/// Record filters. List flags take comma-separated values.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterArgs {
    /// Years to include (e.g. "2019,2021")
    #[arg(long)]
    pub years: Option<String>,
    /// First year of an inclusive range
    #[arg(long)]
    pub year_from: Option<i32>,
    /// Last year of an inclusive range
    #[arg(long)]
    pub year_to: Option<i32>,
    /// Canton codes (e.g. "ZH,BE")
    #[arg(long = "canton")]
    pub cantons: Option<String>,
    /// Severity codes or names (as1-as4, fatal, severe, light, property)
    #[arg(long = "severity")]
    pub severities: Option<String>,
    /// Accident type codes or English labels
    #[arg(long = "accident-type")]
    pub accident_types: Option<String>,
    /// Road type codes or English labels
    #[arg(long = "road-type")]
    pub road_types: Option<String>,
    /// Involved parties: pedestrian, bicycle, motorcycle
    #[arg(long = "party")]
    pub parties: Option<String>,
    /// How `--party` is applied: exact, any, all
    #[arg(long)]
    pub party_mode: Option<String>,
    /// Calendar months (1-12)
    #[arg(long = "month")]
    pub months: Option<String>,
    /// First hour of an inclusive range (0-23)
    #[arg(long)]
    pub hour_from: Option<u8>,
    /// Last hour of an inclusive range (0-23); before `--hour-from` wraps
    /// past midnight
    #[arg(long)]
    pub hour_to: Option<u8>,
}

impl FilterArgs {
    /// The flags as API query parameters, so the CLI and the server share
    /// one validation path.
    #[must_use]
    pub fn to_params(&self) -> ApiFilterParams {
        ApiFilterParams {
            years: self.years.clone(),
            year_from: self.year_from,
            year_to: self.year_to,
            cantons: self.cantons.clone(),
            severities: self.severities.clone(),
            accident_types: self.accident_types.clone(),
            road_types: self.road_types.clone(),
            parties: self.parties.clone(),
            party_mode: self.party_mode.clone(),
            months: self.months.clone(),
            hour_from: self.hour_from,
            hour_to: self.hour_to,
        }
    }

    /// Validates the flags.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError`] for any value the API would reject.
    pub fn criteria(&self) -> Result<FilterCriteria, ParamError> {
        self.to_params().to_criteria()
    }
}

#[cfg(test)]
mod tests {
    use accident_map_accident_models::{AccidentSeverity, InvolvedParty};
    use accident_map_analytics_models::PartyMode;

    use super::*;

    #[test]
    fn flags_become_criteria() {
        let args = FilterArgs {
            year_from: Some(2019),
            year_to: Some(2021),
            cantons: Some("zh, be".to_string()),
            severities: Some("as1".to_string()),
            parties: Some("bicycle".to_string()),
            party_mode: Some("exact".to_string()),
            ..FilterArgs::default()
        };
        let criteria = args.criteria().unwrap();
        assert_eq!(criteria.year_range, Some((2019, 2021)));
        assert!(criteria.cantons.contains("ZH") && criteria.cantons.contains("BE"));
        assert!(criteria.severities.contains(&AccidentSeverity::Fatal));
        assert!(criteria.parties.contains(&InvolvedParty::Bicycle));
        assert_eq!(criteria.party_mode, PartyMode::Exact);
    }

    #[test]
    fn no_flags_is_empty() {
        assert!(FilterArgs::default().criteria().unwrap().is_empty());
    }

    #[test]
    fn invalid_flags_are_rejected() {
        let args = FilterArgs {
            months: Some("13".to_string()),
            ..FilterArgs::default()
        };
        assert_eq!(args.criteria().unwrap_err().name, "months");
    }
}
