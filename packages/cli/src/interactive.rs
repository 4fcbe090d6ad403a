//! Interactive menu shown when no subcommand is given.

use std::error::Error;
use std::path::PathBuf;

use accident_map_cli_utils::{prompt_optional, prompt_select};
use dialoguer::Confirm;

use crate::filters::FilterArgs;
use crate::{Commands, Context, ExportFormat};

/// Top-level actions offered by the menu.
#[derive(Clone, Copy)]
enum Action {
    Info,
    Summary,
    Temporal,
    Trends,
    Risk,
    Party,
    Blackspots,
    Insights,
    Export,
    Check,
    Metrics,
    Trim,
    Serve,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Info,
        Self::Summary,
        Self::Temporal,
        Self::Trends,
        Self::Risk,
        Self::Party,
        Self::Blackspots,
        Self::Insights,
        Self::Export,
        Self::Check,
        Self::Metrics,
        Self::Trim,
        Self::Serve,
    ];

    #[must_use]
    const fn label(self) -> &'static str {
        match self {
            Self::Info => "Dataset overview",
            Self::Summary => "Summary statistics",
            Self::Temporal => "Temporal patterns",
            Self::Trends => "Year-over-year trends",
            Self::Risk => "Risk metrics and predictions",
            Self::Party => "Party profile (pedestrian, bicycle, motorcycle)",
            Self::Blackspots => "Blackspot zones",
            Self::Insights => "Insights",
            Self::Export => "Export filtered records",
            Self::Check => "Check dataset integrity",
            Self::Metrics => "Property value counts",
            Self::Trim => "Trim dataset to recent years",
            Self::Serve => "Start API server",
        }
    }

    const fn uses_filters(self) -> bool {
        !matches!(self, Self::Info | Self::Check | Self::Metrics | Self::Trim | Self::Serve)
    }
}

fn parse_optional<T: std::str::FromStr>(prompt: &str) -> Result<Option<T>, Box<dyn Error>>
where
    T::Err: Error + 'static,
{
    Ok(prompt_optional(prompt).map(|s| s.parse()).transpose()?)
}

/// Asks for the most common filters. Every prompt can be left empty.
fn prompt_filters() -> Result<FilterArgs, Box<dyn Error>> {
    Ok(FilterArgs {
        year_from: parse_optional("First year (empty for all)")?,
        year_to: parse_optional("Last year (empty for all)")?,
        cantons: prompt_optional("Cantons, comma-separated (empty for all)"),
        severities: prompt_optional("Severities, e.g. as1,as2 (empty for all)"),
        parties: prompt_optional("Parties: pedestrian, bicycle, motorcycle (empty for all)"),
        ..FilterArgs::default()
    })
}

fn build_command(action: Action, filters: FilterArgs) -> Result<Option<Commands>, Box<dyn Error>> {
    let command = match action {
        Action::Info => Commands::Info,
        Action::Summary => Commands::Summary { filters },
        Action::Temporal => Commands::Temporal { filters },
        Action::Trends => Commands::Trends {
            metric: prompt_optional("Monthly metric: total, fatal, bicycle, pedestrian"),
            filters,
        },
        Action::Risk => Commands::Risk {
            limit: parse_optional("Entries per ranking (default 10)")?.unwrap_or(10),
            filters,
        },
        Action::Party => {
            let parties = ["pedestrian", "bicycle", "motorcycle"];
            let Some(idx) = prompt_select("Party", &parties) else {
                return Ok(None);
            };
            Commands::Party {
                party: parties[idx].to_string(),
                filters,
            }
        }
        Action::Blackspots => Commands::Blackspots {
            eps_km: parse_optional("Radius in km (empty for the configured default)")?,
            min_samples: parse_optional("Minimum accidents per zone (empty for default)")?,
            top: parse_optional("Show at most (empty for all)")?,
            filters,
        },
        Action::Insights => Commands::Insights { filters },
        Action::Export => {
            let Some(idx) = prompt_select("Format", &["CSV", "GeoJSON"]) else {
                return Ok(None);
            };
            let format = if idx == 0 {
                ExportFormat::Csv
            } else {
                ExportFormat::Geojson
            };
            Commands::Export {
                format,
                output: prompt_optional("Output file (empty for stdout)").map(PathBuf::from),
                columns: None,
                filters,
            }
        }
        Action::Check => Commands::Check {
            id_field: "AccidentUID".to_string(),
            no_id_check: false,
        },
        Action::Metrics => Commands::Metrics {
            column: prompt_optional("Property to rank (empty for an overview)"),
            top: 10,
            matches: Vec::new(),
        },
        Action::Trim => {
            let Some(output) = prompt_optional("Output file") else {
                println!("An output file is required.");
                return Ok(None);
            };
            Commands::Trim {
                output: PathBuf::from(output),
                years: parse_optional("Years to keep (default 5)")?.unwrap_or(5),
                indent: parse_optional("JSON indent (empty for compact)")?,
            }
        }
        Action::Serve => Commands::Serve {
            bind_addr: None,
            port: None,
        },
    };
    Ok(Some(command))
}

/// Runs the menu loop until the user declines to continue.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected command fails.
pub fn run(ctx: &Context) -> Result<(), Box<dyn Error>> {
    println!("Accident Map Toolchain");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(|a| a.label()).collect();

    loop {
        let Some(idx) = prompt_select("What would you like to do?", &labels) else {
            return Ok(());
        };
        let action = Action::ALL[idx];

        if let Action::Serve = action {
            // The server prompts for its own address and blocks until shutdown.
            let config = ctx.config.clone();
            actix_web::rt::System::new().block_on(accident_map_server::interactive::run(config))?;
            return Ok(());
        }

        let filters = if action.uses_filters() {
            prompt_filters()?
        } else {
            FilterArgs::default()
        };

        if let Some(command) = build_command(action, filters)? {
            if let Err(e) = crate::run(ctx, command) {
                println!("{e}");
            }
        }

        println!();
        let again = Confirm::new()
            .with_prompt("Run another command?")
            .default(true)
            .interact()?;
        if !again {
            return Ok(());
        }
    }
}
