#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web JSON API server for the accident map.
//!
//! The dataset is loaded once at startup and held in memory. Every
//! analytics endpoint filters that table with the request's query
//! parameters, runs one `accident_map_analytics` function over the view,
//! and caches the serialized result in a bounded [`QueryCache`].

mod cache;
pub mod export;
mod handlers;
pub mod interactive;

use accident_map_accident_models::AccidentRecord;
use accident_map_config::{AppConfig, ConfigError};
use accident_map_loader::{
    DataSummary, LoadError, LoadOptions, NullProgress, data_summary, load_accidents_with,
};
use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use thiserror::Error;

pub use cache::QueryCache;

/// Errors that can occur while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The dataset could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The HTTP server failed to bind or run.
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// The loaded accident table. Never mutated after startup.
    pub records: Vec<AccidentRecord>,
    /// Overview of `records`, served by `/api/dataset`.
    pub summary: DataSummary,
    /// Effective configuration.
    pub config: AppConfig,
    /// Serialized analytics results.
    pub cache: QueryCache,
}

impl AppState {
    #[must_use]
    pub fn new(records: Vec<AccidentRecord>, config: AppConfig) -> Self {
        let cache = QueryCache::new(config.server.cache_capacity);
        let summary = data_summary(&records);
        Self {
            records,
            summary,
            config,
            cache,
        }
    }
}

/// Loads the dataset named by `config` and builds the application state.
///
/// # Errors
///
/// Returns [`ServerError::Load`] if the dataset is missing, malformed, or
/// contains no valid records.
pub fn load_state(config: AppConfig) -> Result<AppState, ServerError> {
    let options = LoadOptions {
        bounds: config.data.bounds,
    };
    let dataset = load_accidents_with(&config.data.path, options, &NullProgress)?;
    log::info!(
        "Loaded {} accidents ({} skipped)",
        dataset.records.len(),
        dataset.report.skipped()
    );
    Ok(AppState::new(dataset.records, config))
}

/// Registers the `/api` routes. Malformed query strings get the same JSON
/// error body as every other rejected request.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::QueryConfig::default().error_handler(handlers::query_error))
            .route("/health", web::get().to(handlers::health))
            .route("/dataset", web::get().to(handlers::dataset))
            .route("/filters", web::get().to(handlers::filters))
            .route("/summary", web::get().to(handlers::summary))
            .route("/temporal", web::get().to(handlers::temporal))
            .route("/seasonal", web::get().to(handlers::seasonal))
            .route("/trends", web::get().to(handlers::trends))
            .route("/monthly", web::get().to(handlers::monthly))
            .route("/risk", web::get().to(handlers::risk))
            .route("/predictions", web::get().to(handlers::predictions))
            .route("/insights", web::get().to(handlers::insights))
            .route("/parties/{party}", web::get().to(handlers::party))
            .route("/blackspots", web::get().to(handlers::blackspots))
            .route("/accidents", web::get().to(handlers::accidents))
            .route("/export.csv", web::get().to(handlers::export_csv))
            .route("/export.geojson", web::get().to(handlers::export_geojson)),
    );
}

/// Starts the accident map API server on the configured address.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(state: AppState) -> std::io::Result<()> {
    let bind_addr = state.config.server.bind_addr.clone();
    let port = state.config.server.port;
    let state = web::Data::new(state);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
pub(crate) mod tests {
    use accident_map_accident_models::AccidentRecord;
    use accident_map_config::AppConfig;
    use actix_web::web;

    use crate::AppState;

    pub fn sample_records() -> Vec<AccidentRecord> {
        accident_map_loader::parse_accidents(include_str!("../../loader/fixtures/sample.geojson"))
            .unwrap()
            .records
    }

    pub fn sample_state() -> web::Data<AppState> {
        web::Data::new(AppState::new(sample_records(), AppConfig::default()))
    }

    #[test]
    fn state_sizes_cache_from_config() {
        let mut config = AppConfig::default();
        config.server.cache_capacity = 0;
        let state = AppState::new(sample_records(), config);
        assert_eq!(state.records.len(), 5);
        assert_eq!(state.summary.total_accidents, 5);
        assert!(state.cache.is_empty());
    }

    #[test]
    fn load_state_reports_missing_dataset() {
        let mut config = AppConfig::default();
        config.data.path = "does/not/exist.geojson".into();
        assert!(matches!(
            crate::load_state(config),
            Err(crate::ServerError::Load(_))
        ));
    }
}
