// Military Pay Flow - Web Server
// REST API with Axum over the shared, read-only pay context

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use milpay_flow::{
    logging, AppConfig, Entry, FiscalRates, FlowGraph, GradeCategory, PayBreakdown, PayContext,
    PayGrade, PayInputs,
};

#[derive(Parser, Debug)]
#[command(name = "milpay-server", version, about = "Military Pay Flow web server")]
struct Args {
    /// JSON config file (defaults to ./milpay.json when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Shared application state. Read-only after startup: no locks, and no
/// per-user fields - every request carries its complete input set.
#[derive(Clone)]
struct AppState {
    context: Arc<PayContext>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn failed(data: T, error: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(error),
        }
    }
}

/// Request body for POST /api/breakdown
///
/// Numbers are taken as signed integers so that out-of-range values reach
/// the handler and become "no breakdown" instead of a body rejection.
#[derive(Debug, Deserialize)]
struct BreakdownRequest {
    rank: String,
    years_of_service: i64,
    #[serde(default = "default_true")]
    has_dependents: bool,
    zip_code: String,
    retirement_contribution_percent: i64,
    #[serde(default)]
    expenses: Vec<Entry>,
    #[serde(default)]
    incomes: Vec<Entry>,
}

fn default_true() -> bool {
    true
}

impl BreakdownRequest {
    /// Resolver inputs, or `None` when the rank or a number can't be one
    fn into_inputs(self) -> Option<PayInputs> {
        Some(PayInputs {
            grade: self.rank.parse().ok()?,
            years_of_service: u32::try_from(self.years_of_service).ok()?,
            has_dependents: self.has_dependents,
            zip_code: self.zip_code,
            retirement_contribution_percent: u8::try_from(self.retirement_contribution_percent)
                .ok()?,
            expenses: self.expenses,
            incomes: self.incomes,
        })
    }
}

/// Breakdown response: line items plus the graph to draw
#[derive(Serialize)]
struct BreakdownResponse {
    fiscal_year: u16,
    breakdown: PayBreakdown,
    flow: FlowGraph,
    total_income: f64,
    total_outflow: f64,
    net_remaining: f64,
}

impl BreakdownResponse {
    fn new(fiscal_year: u16, breakdown: PayBreakdown) -> Self {
        Self {
            fiscal_year,
            flow: breakdown.flow_graph(),
            total_income: breakdown.total_income(),
            total_outflow: breakdown.total_outflow(),
            net_remaining: breakdown.net_remaining(),
            breakdown,
        }
    }
}

#[derive(Serialize)]
struct GradeResponse {
    grade: PayGrade,
    category: GradeCategory,
    years: Vec<u32>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/grades - Grades and the service years each has pay for
async fn get_grades(State(state): State<AppState>) -> impl IntoResponse {
    let reference = &state.context.reference;

    let grades: Vec<GradeResponse> = reference
        .grades()
        .into_iter()
        .map(|grade| GradeResponse {
            grade,
            category: grade.category(),
            years: reference
                .service_years()
                .iter()
                .copied()
                .filter(|&y| reference.base_pay(grade, y).is_ok())
                .collect(),
        })
        .collect();

    Json(ApiResponse::ok(grades))
}

/// GET /api/rates - Rates edition in use
async fn get_rates(State(state): State<AppState>) -> Json<ApiResponse<FiscalRates>> {
    Json(ApiResponse::ok(state.context.rates.clone()))
}

/// POST /api/breakdown - Resolve one set of inputs
///
/// Inputs that don't resolve (partial zip, unknown rank, negative years,
/// ...) are not an error: the response is successful with `data: null`.
async fn post_breakdown(
    State(state): State<AppState>,
    Json(request): Json<BreakdownRequest>,
) -> Json<ApiResponse<Option<BreakdownResponse>>> {
    Json(ApiResponse::ok(breakdown_for(&state.context, request)))
}

fn breakdown_for(context: &PayContext, request: BreakdownRequest) -> Option<BreakdownResponse> {
    let inputs = request.into_inputs()?;

    context
        .resolver()
        .resolve(&inputs)
        .map(|breakdown| BreakdownResponse::new(context.rates.fiscal_year, breakdown))
}

/// Fallback for unknown API paths
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failed((), "Not found".to_string())),
    )
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn build_router(state: AppState) -> Router {
    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/grades", get(get_grades))
        .route("/rates", get(get_rates))
        .route("/breakdown", post(post_breakdown))
        .fallback(not_found)
        .with_state(state);

    // Build main router
    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;
    logging::init(&config.log_filter);

    info!("🌐 Military Pay Flow - Web Server");

    // Reference data is all-or-nothing: refuse to serve without it
    let context = match config.load_context(None) {
        Ok(context) => context,
        Err(e) => {
            error!("cannot start: {:#}", e);
            return Err(e);
        }
    };

    let state = AppState {
        context: Arc::new(context),
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.server_addr.as_str())
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

    info!("🚀 Server running on http://{}", config.server_addr);
    info!("   API: POST http://{}/api/breakdown", config.server_addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
