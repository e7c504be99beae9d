use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{EventSchedule, PlannerConfig, Projection, run_projection};
use crate::report::render_projection;

const DEFAULT_EVENTS: &str = "40:capital-400000 65:income=0,return_rate=0.04,expenses*0.8";
const MAX_AGE: i32 = 150;
const MIN_YEAR: i32 = 1800;
const MAX_YEAR: i32 = 3000;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiEvents {
    Text(String),
    ByAge(BTreeMap<String, Vec<String>>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    birth_year: Option<i32>,
    current_year: Option<i32>,
    starting_capital: Option<f64>,
    yearly_expenses: Option<f64>,
    yearly_income: Option<f64>,
    return_rate: Option<f64>,
    inflation_rate: Option<f64>,
    until_age: Option<i32>,
    events: Option<ApiEvents>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "nestegg",
    about = "Year-by-year net worth projection with scheduled life events"
)]
struct Cli {
    #[arg(long, default_value_t = 1985)]
    birth_year: i32,
    #[arg(
        long,
        help = "Calendar year the projection starts in; defaults to the current year"
    )]
    current_year: Option<i32>,
    #[arg(long, default_value_t = 300000.0, allow_hyphen_values = true)]
    starting_capital: f64,
    #[arg(long, default_value_t = 40000.0)]
    yearly_expenses: f64,
    #[arg(long, default_value_t = 50000.0)]
    yearly_income: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        allow_hyphen_values = true,
        help = "Expected annual investment return in percent, e.g. 6"
    )]
    return_rate: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        allow_hyphen_values = true,
        help = "Expected annual inflation in percent"
    )]
    inflation_rate: f64,
    #[arg(long, default_value_t = 85, help = "Age to simulate until (exclusive)")]
    until_age: i32,
    #[arg(
        long,
        default_value = DEFAULT_EVENTS,
        help = "Event schedule, e.g. \"40:capital-400000 65:income=0,expenses*0.8\""
    )]
    events: String,
}

#[derive(Debug)]
struct ProjectionRequest {
    config: PlannerConfig,
    until_age: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    birth_year: i32,
    start_year: i32,
    event_summary: String,
    #[serde(flatten)]
    projection: Projection,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn current_calendar_year() -> i32 {
    i32::from(jiff::Zoned::now().year())
}

fn build_inputs(cli: Cli) -> Result<ProjectionRequest, String> {
    let current_year = cli.current_year.unwrap_or_else(current_calendar_year);

    for (name, year) in [
        ("--birth-year", cli.birth_year),
        ("--current-year", current_year),
    ] {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(format!("{name} must be between {MIN_YEAR} and {MAX_YEAR}"));
        }
    }

    if cli.birth_year > current_year {
        return Err("--birth-year must be <= --current-year".to_string());
    }

    if !(0..=MAX_AGE).contains(&cli.until_age) {
        return Err(format!("--until-age must be between 0 and {MAX_AGE}"));
    }

    for (name, amount) in [
        ("--starting-capital", cli.starting_capital),
        ("--yearly-expenses", cli.yearly_expenses),
        ("--yearly-income", cli.yearly_income),
    ] {
        if !amount.is_finite() {
            return Err(format!("{name} must be a finite amount"));
        }
    }

    for (name, rate) in [
        ("--return-rate", cli.return_rate),
        ("--inflation-rate", cli.inflation_rate),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(format!("{name} must be > -100"));
        }
    }

    let events = cli
        .events
        .parse::<EventSchedule>()
        .map_err(|e| format!("--events: {e}"))?;

    Ok(ProjectionRequest {
        config: PlannerConfig {
            birth_year: cli.birth_year,
            current_year,
            starting_capital: cli.starting_capital,
            starting_expenses: cli.yearly_expenses,
            starting_income: cli.yearly_income,
            return_rate: cli.return_rate / 100.0,
            inflation_rate: cli.inflation_rate / 100.0,
            events,
        },
        until_age: cli.until_age,
    })
}

/// Parses command-line flags and prints the yearly report to stdout.
pub fn run_cli() -> Result<(), String> {
    let report = cli_report(Cli::parse())?;
    print!("{report}");
    Ok(())
}

fn cli_report(cli: Cli) -> Result<String, String> {
    let request = build_inputs(cli)?;
    tracing::debug!(
        birth_year = request.config.birth_year,
        start_year = request.config.current_year,
        until_age = request.until_age,
        "running projection"
    );
    let projection = run_projection(request.config, request.until_age);
    Ok(render_projection(&projection))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route(
            "/api/report",
            get(report_get_handler).post(report_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Projection HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn report_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    report_handler_impl(payload)
}

async fn report_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    report_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    match api_request_from_payload(payload) {
        Ok(request) => json_response(StatusCode::OK, build_simulate_response(request)),
        Err(msg) => {
            tracing::warn!(error = %msg, "rejected simulate request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn report_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            tracing::warn!(error = %msg, "rejected report request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };
    let projection = run_projection(request.config, request.until_age);
    with_cache_control((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_projection(&projection),
    ))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ProjectionRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ProjectionRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.birth_year {
        cli.birth_year = v;
    }
    if let Some(v) = payload.current_year {
        cli.current_year = Some(v);
    }
    if let Some(v) = payload.starting_capital {
        cli.starting_capital = v;
    }
    if let Some(v) = payload.yearly_expenses {
        cli.yearly_expenses = v;
    }
    if let Some(v) = payload.yearly_income {
        cli.yearly_income = v;
    }
    if let Some(v) = payload.return_rate {
        cli.return_rate = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.until_age {
        cli.until_age = v;
    }

    let mut events_by_age = None;
    match payload.events {
        Some(ApiEvents::Text(text)) => cli.events = text,
        Some(ApiEvents::ByAge(by_age)) => events_by_age = Some(by_age),
        None => {}
    }

    let mut request = build_inputs(cli)?;
    if let Some(by_age) = events_by_age {
        request.config.events = schedule_from_json(by_age)?;
    }
    Ok(request)
}

fn schedule_from_json(by_age: BTreeMap<String, Vec<String>>) -> Result<EventSchedule, String> {
    let mut entries = Vec::with_capacity(by_age.len());
    for (key, events) in by_age {
        let Ok(age) = key.trim().parse::<i32>() else {
            return Err(format!("events: invalid age `{key}`"));
        };
        entries.push((age, events));
    }
    EventSchedule::from_raw(entries).map_err(|e| format!("events: {e}"))
}

fn default_cli_for_api() -> Cli {
    Cli {
        birth_year: 1985,
        current_year: None,
        starting_capital: 300_000.0,
        yearly_expenses: 40_000.0,
        yearly_income: 50_000.0,
        return_rate: 6.0,
        inflation_rate: 3.0,
        until_age: 85,
        events: DEFAULT_EVENTS.to_string(),
    }
}

fn build_simulate_response(request: ProjectionRequest) -> SimulateResponse {
    let birth_year = request.config.birth_year;
    let start_year = request.config.current_year;
    let event_summary = request.config.events.to_string();
    SimulateResponse {
        birth_year,
        start_year,
        event_summary,
        projection: run_projection(request.config, request.until_age),
    }
}
