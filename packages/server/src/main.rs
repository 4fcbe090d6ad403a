#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accident map API server binary.
//!
//! Configuration comes from the embedded defaults, the file named by
//! `ACCIDENT_MAP_CONFIG`, and the `ACCIDENT_MAP_DATA`, `BIND_ADDR` and
//! `PORT` environment variables.

use accident_map_config::AppConfig;
use accident_map_server::{load_state, run_server};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = AppConfig::load(None)?;
    let state = load_state(config)?;
    run_server(state).await?;
    Ok(())
}
