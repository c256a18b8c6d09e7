// =============================================================================
// HTTP API — Axum 0.7
// =============================================================================
//
// GET /                    landing page with a ticker form
// GET /plot/:ticker        two-panel chart as image/png
// GET /indicators/:ticker  the same data as JSON
// GET /health              liveness + render counter
//
// CORS is fully open: any origin, method and header.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::app_state::AppState;
use crate::chart::png::render_png;
use crate::indicators::ChartSpec;
use crate::pipeline::build_chart_spec;
use crate::types::{normalize_symbol, IndicatorPoint, PriceBar};

const INDEX_HTML: &str = include_str!("../../templates/index.html");

type ApiError = (StatusCode, Json<serde_json::Value>);

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/plot/:ticker", get(plot))
        .route("/indicators/:ticker", get(indicators))
        .layer(cors)
        .with_state(state)
}

fn internal_error(symbol: &str, e: anyhow::Error) -> ApiError {
    error!(symbol, error = %format!("{e:#}"), "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": format!("{e:#}"),
            "symbol": symbol,
        })),
    )
}

async fn load_spec(state: &AppState, ticker: &str) -> Result<ChartSpec, ApiError> {
    let symbol = normalize_symbol(ticker);
    let spec = build_chart_spec(state.provider.as_ref(), &state.config, &symbol, state.today())
        .await
        .map_err(|e| internal_error(&symbol, e))?;
    if spec.series.is_empty() {
        warn!(symbol = %symbol, "no price data, responding with an empty chart");
    }
    Ok(spec)
}

// =============================================================================
// Landing page
// =============================================================================

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    charts_rendered: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        charts_rendered: state.charts_rendered(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Chart
// =============================================================================

async fn plot(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let spec = load_spec(&state, &ticker).await?;
    let symbol = spec.series.symbol().to_string();
    let layout = state.config.layout();

    // Drawing and PNG encoding are CPU-bound.
    let rendered = tokio::task::spawn_blocking(move || render_png(&spec, &layout))
        .await
        .map_err(|e| internal_error(&symbol, e.into()))?
        .map_err(|e| internal_error(&symbol, e))?;

    let total = state.record_render();
    info!(
        symbol = %symbol,
        bytes = rendered.png.len(),
        charts_rendered = total,
        "chart rendered"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        rendered.png,
    ))
}

// =============================================================================
// Indicators as JSON
// =============================================================================

#[derive(Serialize)]
struct IndicatorsResponse<'a> {
    symbol: &'a str,
    ma_window: usize,
    rsi_window: usize,
    bars: &'a [PriceBar],
    moving_average: &'a [IndicatorPoint],
    rsi: &'a [IndicatorPoint],
}

async fn indicators(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let spec = load_spec(&state, &ticker).await?;
    let body = serde_json::to_value(IndicatorsResponse {
        symbol: spec.series.symbol(),
        ma_window: spec.ma_window,
        rsi_window: spec.rsi_window,
        bars: spec.series.bars(),
        moving_average: &spec.moving_average,
        rsi: &spec.rsi,
    })
    .map_err(|e| internal_error(spec.series.symbol(), e.into()))?;
    Ok(Json(body))
}

// =============================================================================
// Tests
// =============================================================================
