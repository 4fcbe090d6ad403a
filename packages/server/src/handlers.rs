//! HTTP handler functions for the accident map API.

use accident_map_accident_models::{AccidentRecord, InvolvedParty};
use accident_map_analytics::{
    AnalyticsError, available_filters, filter_records, generate_insights, identify_blackspots,
    monthly_trend, party_profile, risk_metrics, risk_predictions, seasonal_patterns,
    summary_stats, temporal_analysis, year_over_year,
};
use accident_map_analytics_models::FilterCriteria;
use accident_map_server_models::{
    ApiAccident, ApiError, ApiFilterParams, ApiHealth, ApiPage, BlackspotQuery, ExportQuery,
    MonthlyQuery, PageQuery, ParamError,
};
use actix_web::error::{InternalError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;

use crate::AppState;
use crate::export::{ExportError, to_csv, to_geojson};

const NO_DATA: &str = "No data matches the selected filters.";
const DEFAULT_PREDICTION_LIMIT: usize = 10;

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new(message))
}

/// Query strings that do not deserialize (e.g. `yearFrom=abc`) become a
/// JSON 400 instead of actix's plain-text default.
pub fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected query string: {err}");
    let response = bad_request(err.to_string());
    InternalError::from_response(err, response).into()
}

fn criteria(params: &ApiFilterParams) -> Result<FilterCriteria, HttpResponse> {
    params.to_criteria().map_err(|e: ParamError| {
        log::debug!("Rejected filter parameters: {e}");
        bad_request(e.to_string())
    })
}

/// Filters the table, runs `compute` over the view and caches the JSON
/// result under `endpoint` + the normalized criteria + `extra`.
///
/// An empty view or a `None` result is a 404; an analytics parameter error
/// is a 400.
fn cached<T: Serialize>(
    state: &AppState,
    endpoint: &str,
    params: &ApiFilterParams,
    extra: &str,
    compute: impl FnOnce(&[&AccidentRecord]) -> Result<Option<T>, AnalyticsError>,
) -> HttpResponse {
    match criteria(params) {
        Ok(criteria) => cached_with(state, endpoint, &criteria, extra, compute),
        Err(response) => response,
    }
}

/// [`cached`] for handlers that already parsed the criteria.
fn cached_with<T: Serialize>(
    state: &AppState,
    endpoint: &str,
    criteria: &FilterCriteria,
    extra: &str,
    compute: impl FnOnce(&[&AccidentRecord]) -> Result<Option<T>, AnalyticsError>,
) -> HttpResponse {
    let key = match serde_json::to_string(criteria) {
        Ok(json) => format!("{endpoint}:{json}:{extra}"),
        Err(e) => {
            log::error!("Failed to serialize filter criteria: {e}");
            return HttpResponse::InternalServerError().json(ApiError::new("Internal error"));
        }
    };
    if let Some(value) = state.cache.get(&key) {
        return HttpResponse::Ok().json(value);
    }

    let view = filter_records(&state.records, criteria);
    if view.is_empty() {
        return HttpResponse::NotFound().json(ApiError::new(NO_DATA));
    }

    let result = match compute(&view) {
        Ok(Some(result)) => result,
        Ok(None) => return HttpResponse::NotFound().json(ApiError::new(NO_DATA)),
        Err(AnalyticsError::InvalidParameter { message }) => return bad_request(message),
    };

    match serde_json::to_value(&result) {
        Ok(value) => {
            state.cache.insert(key, value.clone());
            HttpResponse::Ok().json(value)
        }
        Err(e) => {
            log::error!("Failed to serialize {endpoint} result: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Internal error"))
        }
    }
}

#[allow(clippy::unnecessary_wraps)]
const fn some<T>(value: T) -> Result<Option<T>, AnalyticsError> {
    Ok(Some(value))
}

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        records: state.records.len(),
    })
}

/// `GET /api/dataset`
///
/// Overview of the whole dataset, computed once at startup.
pub async fn dataset(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.summary)
}

/// `GET /api/filters`
///
/// Values available for each filter across the whole dataset.
pub async fn filters(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(available_filters(&state.records))
}

/// `GET /api/summary`
pub async fn summary(
    state: web::Data<AppState>,
    params: web::Query<ApiFilterParams>,
) -> HttpResponse {
    cached(&state, "summary", &params, "", |view| some(summary_stats(view)))
}

/// `GET /api/temporal`
pub async fn temporal(
    state: web::Data<AppState>,
    params: web::Query<ApiFilterParams>,
) -> HttpResponse {
    cached(&state, "temporal", &params, "", |view| {
        some(temporal_analysis(view))
    })
}

/// `GET /api/seasonal`
pub async fn seasonal(
    state: web::Data<AppState>,
    params: web::Query<ApiFilterParams>,
) -> HttpResponse {
    cached(&state, "seasonal", &params, "", |view| {
        some(seasonal_patterns(view))
    })
}

/// `GET /api/trends`
///
/// Year-over-year counts with percentage change.
pub async fn trends(
    state: web::Data<AppState>,
    params: web::Query<ApiFilterParams>,
) -> HttpResponse {
    cached(&state, "trends", &params, "", |view| some(year_over_year(view)))
}

/// `GET /api/monthly?metric=`
pub async fn monthly(
    state: web::Data<AppState>,
    params: web::Query<ApiFilterParams>,
    query: web::Query<MonthlyQuery>,
) -> HttpResponse {
    let metric = match query.metric() {
        Ok(metric) => metric,
        Err(e) => return bad_request(e.to_string()),
    };
    cached(&state, "monthly", &params, metric.as_ref(), |view| {
        Ok(monthly_trend(view, metric))
    })
}

/// `GET /api/risk`
pub async fn risk(state: web::Data<AppState>, params: web::Query<ApiFilterParams>) -> HttpResponse {
    cached(&state, "risk", &params, "", |view| some(risk_metrics(view)))
}

/// `GET /api/predictions?limit=`
pub async fn predictions(
    state: web::Data<AppState>,
    params: web::Query<ApiFilterParams>,
    page: web::Query<PageQuery>,
) -> HttpResponse {
    let limit = page.limit.unwrap_or(DEFAULT_PREDICTION_LIMIT);
    cached(&state, "predictions", &params, &limit.to_string(), |view| {
        some(risk_predictions(view, limit))
    })
}

/// `GET /api/insights`
pub async fn insights(
    state: web::Data<AppState>,
    params: web::Query<ApiFilterParams>,
) -> HttpResponse {
    cached(&state, "insights", &params, "", |view| {
        some(generate_insights(view))
    })
}

/// `GET /api/parties/{party}`
///
/// Dashboard for `pedestrian`, `bicycle` or `motorcycle` accidents.
pub async fn party(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<ApiFilterParams>,
) -> HttpResponse {
    let party: InvolvedParty = match path.parse() {
        Ok(party) => party,
        Err(_) => {
            return bad_request(format!(
                "Unknown party '{path}'. Expected pedestrian, bicycle, or motorcycle"
            ));
        }
    };
    cached(&state, "party", &params, party.as_ref(), |view| {
        Ok(party_profile(view, party))
    })
}

/// `GET /api/blackspots?epsKm=&minSamples=`
pub async fn blackspots(
    state: web::Data<AppState>,
    params: web::Query<ApiFilterParams>,
    query: web::Query<BlackspotQuery>,
) -> HttpResponse {
    let criteria = match criteria(&params) {
        Ok(criteria) => criteria,
        Err(response) => return response,
    };
    let blackspot_params = query.resolve(state.config.blackspots.params_for(&criteria));
    let extra = format!(
        "{}:{}",
        blackspot_params.eps_km, blackspot_params.min_samples
    );
    cached_with(&state, "blackspots", &criteria, &extra, |view| {
        identify_blackspots(view, &blackspot_params).map(Some)
    })
}

/// `GET /api/accidents?limit=&offset=`
///
/// One page of the filtered records. Not cached.
pub async fn accidents(
    state: web::Data<AppState>,
    params: web::Query<ApiFilterParams>,
    page: web::Query<PageQuery>,
) -> HttpResponse {
    let criteria = match criteria(&params) {
        Ok(criteria) => criteria,
        Err(response) => return response,
    };
    let server = &state.config.server;
    let limit = page
        .limit
        .unwrap_or(server.default_page_limit)
        .min(server.max_page_limit);
    let offset = page.offset.unwrap_or(0);

    let view = filter_records(&state.records, &criteria);
    let items: Vec<ApiAccident> = view
        .iter()
        .skip(offset)
        .take(limit)
        .map(|r| ApiAccident::from(*r))
        .collect();

    HttpResponse::Ok().json(ApiPage {
        total: view.len(),
        offset,
        limit,
        items,
    })
}

fn export_response(result: Result<String, ExportError>, content_type: &str) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().content_type(content_type).body(body),
        Err(e @ ExportError::UnknownColumn { .. }) => bad_request(e.to_string()),
        Err(e) => {
            log::error!("Export failed: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Export failed"))
        }
    }
}

/// `GET /api/export.csv?columns=`
///
/// An empty view produces a header-only file.
pub async fn export_csv(
    state: web::Data<AppState>,
    params: web::Query<ApiFilterParams>,
    query: web::Query<ExportQuery>,
) -> HttpResponse {
    let criteria = match criteria(&params) {
        Ok(criteria) => criteria,
        Err(response) => return response,
    };
    let view = filter_records(&state.records, &criteria);
    let columns = query.columns();
    export_response(to_csv(&view, columns.as_deref()), "text/csv; charset=utf-8")
}

/// `GET /api/export.geojson`
///
/// An empty view produces an empty `FeatureCollection`.
pub async fn export_geojson(
    state: web::Data<AppState>,
    params: web::Query<ApiFilterParams>,
) -> HttpResponse {
    let criteria = match criteria(&params) {
        Ok(criteria) => criteria,
        Err(response) => return response,
    };
    let view = filter_records(&state.records, &criteria);
    export_response(to_geojson(&view), "application/geo+json")
}
