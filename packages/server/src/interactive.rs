//! Interactive mode for the server.
//!
//! Prompts the user for bind address and port before starting the server.

use accident_map_config::AppConfig;
use dialoguer::{Confirm, Input};

use crate::ServerError;

/// Runs the server in interactive mode, prompting for the address.
///
/// The prompts default to the values in `config`; the answers override them
/// before the dataset is loaded and [`super::run_server`] is started.
///
/// # Errors
///
/// Returns [`ServerError`] if the dataset cannot be loaded or the server
/// fails to start.
#[allow(clippy::future_not_send)]
pub async fn run(mut config: AppConfig) -> Result<(), ServerError> {
    println!("Accident Map Server");
    println!();

    config.server.bind_addr = Input::new()
        .with_prompt("Bind address")
        .default(config.server.bind_addr.clone())
        .interact_text()
        .unwrap_or_else(|_| config.server.bind_addr.clone());

    config.server.port = Input::new()
        .with_prompt("Port")
        .default(config.server.port)
        .interact_text()
        .unwrap_or(config.server.port);

    let (bind_addr, port) = (&config.server.bind_addr, config.server.port);
    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    let state = super::load_state(config)?;
    super::run_server(state).await?;
    Ok(())
}
