#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line interface for the accident map toolchain.
//!
//! Every analytics operation is a subcommand that loads the configured
//! dataset, applies the shared filter flags, and prints a text report (or
//! JSON with `--json`). Without a subcommand an interactive menu is shown.
//!
//! Uses `indicatif-log-bridge` (via [`accident_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the loader's progress bar never fight for the terminal.

mod filters;
mod interactive;
mod report;

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use accident_map_accident_models::{AccidentRecord, InvolvedParty};
use accident_map_analytics::{
    filter_records, generate_insights, identify_blackspots, monthly_trend, party_profile,
    risk_metrics, risk_predictions, seasonal_patterns, summary_stats, temporal_analysis,
    year_over_year,
};
use accident_map_analytics_models::FilterCriteria;
use accident_map_cli_utils::{IndicatifProgress, MultiProgress};
use accident_map_config::AppConfig;
use accident_map_loader::{
    CheckOptions, LoadOptions, check_dataset, data_summary, load_accidents_with,
    metrics::parse_match, trim_to_recent_years, value_counts,
};
use accident_map_server::export::{to_geojson, write_csv};
use accident_map_server_models::{BlackspotQuery, ExportQuery, MonthlyQuery};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::filters::FilterArgs;

const NO_DATA: &str = "No data matches the selected filters.";

#[derive(Parser)]
#[command(name = "accident_map", about = "Swiss road traffic accident analytics")]
struct Cli {
    /// Configuration file (defaults to `ACCIDENT_MAP_CONFIG`, then the
    /// built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Accident `GeoJSON` file, overriding `data.path`
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Overview of the loaded dataset: years, cantons, severities, parties
    Info,
    /// Totals, severity, accident type, party, road type and canton breakdowns
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Monthly, hourly, weekday, yearly and seasonal patterns
    Temporal {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Year-over-year changes and a monthly series of one metric
    Trends {
        /// Monthly metric: total, fatal, bicycle, pedestrian
        #[arg(long)]
        metric: Option<String>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Severity rates and the most frequent high-risk combinations
    Risk {
        /// Entries per ranking
        #[arg(long, default_value = "10")]
        limit: usize,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Profile of accidents involving one party type
    Party {
        /// pedestrian, bicycle or motorcycle
        party: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Blackspot zones found by density clustering
    Blackspots {
        /// Neighbourhood radius in kilometres
        #[arg(long)]
        eps_km: Option<f64>,
        /// Minimum accidents per zone
        #[arg(long)]
        min_samples: Option<usize>,
        /// Only print the highest-risk zones
        #[arg(long)]
        top: Option<usize>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Plain-language findings
    Insights {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Write the filtered records as CSV or `GeoJSON`
    Export {
        #[arg(value_enum)]
        format: ExportFormat,
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Comma-separated CSV columns
        #[arg(long)]
        columns: Option<String>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Integrity report for the raw dataset
    Check {
        /// Property used for duplicate detection
        #[arg(long, default_value = "AccidentUID")]
        id_field: String,
        /// Skip duplicate and missing id checks
        #[arg(long)]
        no_id_check: bool,
    },
    /// Per-property value counts
    Metrics {
        /// Show the most frequent values of this property
        #[arg(long)]
        column: Option<String>,
        /// Number of values with `--column`
        #[arg(long, default_value = "10")]
        top: usize,
        /// Count features where `column=value` (repeatable)
        #[arg(long = "match")]
        matches: Vec<String>,
    },
    /// Keep only the most recent years of the dataset
    Trim {
        /// Where to write the trimmed `FeatureCollection`
        output: PathBuf,
        /// Number of calendar years to keep
        #[arg(long, default_value = "5")]
        years: u32,
        /// Pretty-print with this many spaces per level (compact otherwise)
        #[arg(long)]
        indent: Option<usize>,
    },
    /// Start the JSON API server
    Serve {
        /// Bind address, overriding `server.bind_addr`
        #[arg(long)]
        bind_addr: Option<String>,
        /// Port, overriding `server.port`
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Geojson,
}

/// Settings shared by every command.
pub struct Context {
    pub config: AppConfig,
    pub multi: MultiProgress,
    pub json: bool,
}

impl Context {
    fn load(&self) -> Result<Vec<AccidentRecord>, Box<dyn Error>> {
        let progress = IndicatifProgress::load_bar(&self.multi, "Loading accidents");
        let options = LoadOptions {
            bounds: self.config.data.bounds,
        };
        let result = load_accidents_with(&self.config.data.path, options, &progress);
        progress.clear();

        let dataset = result?;
        log::info!("{}", report::load_report(&dataset.report));
        Ok(dataset.records)
    }

    fn emit<T: Serialize>(
        &self,
        value: &T,
        text: impl FnOnce() -> String,
    ) -> Result<(), Box<dyn Error>> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

/// Applies `filters`, failing when nothing matches.
fn filtered<'a>(
    records: &'a [AccidentRecord],
    filters: &FilterArgs,
) -> Result<(Vec<&'a AccidentRecord>, FilterCriteria), Box<dyn Error>> {
    let criteria = filters.criteria()?;
    let view = filter_records(records, &criteria);
    if view.is_empty() {
        return Err(NO_DATA.into());
    }
    Ok((view, criteria))
}

#[allow(clippy::too_many_lines)]
pub fn run(ctx: &Context, command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Info => {
            let records = ctx.load()?;
            let overview = data_summary(&records);
            ctx.emit(&overview, || report::dataset(&overview))?;
        }
        Commands::Summary { filters } => {
            let records = ctx.load()?;
            let (view, criteria) = filtered(&records, &filters)?;
            let stats = summary_stats(&view);
            ctx.emit(&stats, || report::summary(&stats, &criteria.describe()))?;
        }
        Commands::Temporal { filters } => {
            let records = ctx.load()?;
            let (view, _) = filtered(&records, &filters)?;
            let temporal = temporal_analysis(&view);
            let seasonal = seasonal_patterns(&view);
            ctx.emit(
                &serde_json::json!({ "temporal": temporal, "seasonal": seasonal }),
                || report::temporal(&temporal, &seasonal),
            )?;
        }
        Commands::Trends { metric, filters } => {
            let metric = MonthlyQuery { metric }.metric()?;
            let records = ctx.load()?;
            let (view, _) = filtered(&records, &filters)?;
            let yoy = year_over_year(&view);
            let monthly = monthly_trend(&view, metric);
            ctx.emit(
                &serde_json::json!({ "yearOverYear": yoy, "monthly": monthly }),
                || report::trends(&yoy, monthly.as_ref()),
            )?;
        }
        Commands::Risk { limit, filters } => {
            let records = ctx.load()?;
            let (view, _) = filtered(&records, &filters)?;
            let metrics = risk_metrics(&view);
            let predictions = risk_predictions(&view, limit);
            ctx.emit(
                &serde_json::json!({ "metrics": metrics, "predictions": predictions }),
                || report::risk(&metrics, &predictions),
            )?;
        }
        Commands::Party { party, filters } => {
            let party: InvolvedParty = party.parse().map_err(|_| {
                format!("Unknown party '{party}'. Expected pedestrian, bicycle, or motorcycle")
            })?;
            let records = ctx.load()?;
            let (view, _) = filtered(&records, &filters)?;
            let profile = party_profile(&view, party).ok_or(NO_DATA)?;
            ctx.emit(&profile, || report::party(&profile))?;
        }
        Commands::Blackspots {
            eps_km,
            min_samples,
            top,
            filters,
        } => {
            let records = ctx.load()?;
            let (view, criteria) = filtered(&records, &filters)?;
            let params = BlackspotQuery { eps_km, min_samples }
                .resolve(ctx.config.blackspots.params_for(&criteria));
            let mut clusters = identify_blackspots(&view, &params)?;
            if let Some(top) = top {
                clusters.truncate(top);
            }
            ctx.emit(&clusters, || report::blackspots(&clusters))?;
        }
        Commands::Insights { filters } => {
            let records = ctx.load()?;
            let (view, _) = filtered(&records, &filters)?;
            let insights = generate_insights(&view);
            ctx.emit(&insights, || {
                insights
                    .iter()
                    .map(|line| format!("* {line}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Commands::Export {
            format,
            output,
            columns,
            filters,
        } => {
            let criteria = filters.criteria()?;
            let records = ctx.load()?;
            let view = filter_records(&records, &criteria);
            let columns = ExportQuery { columns }.columns();

            let mut writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(std::io::stdout().lock()),
            };
            match format {
                ExportFormat::Csv => write_csv(&view, columns.as_deref(), &mut writer)?,
                ExportFormat::Geojson => writer.write_all(to_geojson(&view)?.as_bytes())?,
            }
            writer.flush()?;

            if let Some(path) = output {
                log::info!("Wrote {} records to {}", view.len(), path.display());
            }
        }
        Commands::Check {
            id_field,
            no_id_check,
        } => {
            let options = CheckOptions {
                id_field: (!no_id_check).then_some(id_field),
                ..CheckOptions::default()
            };
            let progress = IndicatifProgress::scan_bar(&ctx.multi, "Checking dataset");
            let result = check_dataset(&ctx.config.data.path, &options);
            progress.clear();
            let check = result?;
            ctx.emit(&check, || report::check(&check))?;
        }
        Commands::Metrics {
            column,
            top,
            matches,
        } => {
            let matches = matches
                .iter()
                .map(|m| parse_match(m))
                .collect::<Result<Vec<_>, _>>()?;
            let progress = IndicatifProgress::scan_bar(&ctx.multi, "Indexing properties");
            let result = value_counts(&ctx.config.data.path);
            progress.clear();
            let index = result?;

            let json = serde_json::json!({
                "total": index.total,
                "top": column.as_deref().and_then(|c| index.top(c, top)),
                "missing": index.missing,
                "matches": matches
                    .iter()
                    .map(|(c, v)| serde_json::json!({
                        "column": c,
                        "value": v,
                        "count": index.count_match(c, v),
                    }))
                    .collect::<Vec<_>>(),
            });
            ctx.emit(&json, || {
                report::metrics(&index, column.as_deref(), top, &matches)
            })?;
        }
        Commands::Trim {
            output,
            years,
            indent,
        } => {
            let trimmed = trim_to_recent_years(&ctx.config.data.path, &output, years, indent)?;
            ctx.emit(&trimmed, || report::trim(&trimmed))?;
        }
        Commands::Serve { bind_addr, port } => {
            let mut config = ctx.config.clone();
            if let Some(bind_addr) = bind_addr {
                config.server.bind_addr = bind_addr;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let state = accident_map_server::load_state(config)?;
            actix_web::rt::System::new().block_on(accident_map_server::run_server(state))?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let multi = accident_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.data.path = data;
    }
    let ctx = Context {
        config,
        multi,
        json: cli.json,
    };

    let Some(command) = cli.command else {
        return interactive::run(&ctx);
    };
    run(&ctx, command)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_filters_and_globals() {
        let cli = Cli::try_parse_from([
            "accident_map",
            "summary",
            "--canton",
            "ZH,BE",
            "--year-from",
            "2019",
            "--party",
            "bicycle",
            "--party-mode",
            "all",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        let Some(Commands::Summary { filters }) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(filters.cantons.as_deref(), Some("ZH,BE"));
        assert_eq!(filters.year_from, Some(2019));
        assert_eq!(filters.party_mode.as_deref(), Some("all"));
    }

    #[test]
    fn parses_export_and_blackspot_options() {
        let cli = Cli::try_parse_from([
            "accident_map",
            "export",
            "geojson",
            "-o",
            "out.geojson",
            "--month",
            "6,7,8",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Export {
                format: ExportFormat::Geojson,
                ..
            })
        ));

        let cli = Cli::try_parse_from([
            "accident_map",
            "blackspots",
            "--eps-km",
            "0.3",
            "--min-samples",
            "3",
        ])
        .unwrap();
        let Some(Commands::Blackspots {
            eps_km, min_samples, ..
        }) = cli.command
        else {
            panic!("expected blackspots");
        };
        assert_eq!(eps_km, Some(0.3));
        assert_eq!(min_samples, Some(3));
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["accident_map", "--data", "x.geojson"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.data, Some(PathBuf::from("x.geojson")));
    }

    #[test]
    fn parses_trim_indent() {
        let cli =
            Cli::try_parse_from(["accident_map", "trim", "out.geojson", "--indent", "2"]).unwrap();
        let Some(Commands::Trim { years, indent, .. }) = cli.command else {
            panic!("expected trim");
        };
        assert_eq!(years, 5);
        assert_eq!(indent, Some(2));
    }

    #[test]
    fn parses_info() {
        let cli = Cli::try_parse_from(["accident_map", "info", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Some(Commands::Info)));
    }
}
