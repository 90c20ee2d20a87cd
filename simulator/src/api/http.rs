use axum::{
    body::Bytes,
    extract::{Query, State as AxumState},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lotto_types::{
    api::{CancelResponse, ProgressResponse, SimulateRequest, StartedResponse, SuccessResponse},
    RunPhase,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use crate::{report::history_csv, SimulationError, Simulator};

const DEFAULT_ROUNDS_PAGE: usize = 100;
const MAX_ROUNDS_PAGE: usize = 1_000;

pub(super) async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

pub(super) async fn config(AxumState(simulator): AxumState<Arc<Simulator>>) -> Response {
    Json(simulator.config()).into_response()
}

#[derive(Deserialize)]
pub(super) struct SimulateQuery {
    wait: Option<bool>,
}

pub(super) async fn simulate(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Query(query): Query<SimulateQuery>,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let response = match run_simulate(&simulator, query.wait.unwrap_or(true), &body).await {
        Ok(response) => response,
        Err(err) => {
            if err.status_code().is_server_error() {
                tracing::error!(error = %err, "simulation request failed");
            } else {
                tracing::debug!(error = %err, "simulation request rejected");
            }
            err.into_response()
        }
    };
    simulator.http_metrics().record_simulate(start.elapsed());
    response
}

async fn run_simulate(
    simulator: &Simulator,
    wait: bool,
    body: &[u8],
) -> Result<Response, SimulationError> {
    // An empty body runs with every default
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        SimulateRequest::default()
    } else {
        serde_json::from_slice::<SimulateRequest>(body)
            .map_err(|err| SimulationError::InvalidBody(err.to_string()))?
    };
    let launched = simulator.launch(request)?;
    if !wait {
        let started =
            StartedResponse::new(launched.run_id, launched.total_rounds, launched.seed);
        return Ok((StatusCode::ACCEPTED, Json(started)).into_response());
    }

    let orchestrator = simulator.orchestrator();
    let status = orchestrator.wait(launched.run_id).await;
    let report = orchestrator.outcome(launched.run_id, &status)?;
    Ok(Json(SuccessResponse::from_report(&report)).into_response())
}

pub(super) async fn progress(AxumState(simulator): AxumState<Arc<Simulator>>) -> Response {
    let start = Instant::now();
    let status = simulator.orchestrator().status();
    let body = match (status.phase, status.progress) {
        (RunPhase::Running, Some(progress)) => ProgressResponse::Running {
            data: progress.as_ref().clone(),
        },
        (RunPhase::Failed, Some(progress)) => ProgressResponse::Failed {
            message: status
                .failure
                .map(|failure| failure.message)
                .unwrap_or_default(),
            data: progress.as_ref().clone(),
        },
        _ => ProgressResponse::NotRunning,
    };
    simulator.http_metrics().record_progress(start.elapsed());
    Json(body).into_response()
}

pub(super) async fn cancel(AxumState(simulator): AxumState<Arc<Simulator>>) -> Response {
    match simulator.orchestrator().cancel() {
        Ok(run_id) => Json(CancelResponse::new(run_id)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn report(AxumState(simulator): AxumState<Arc<Simulator>>) -> Response {
    let start = Instant::now();
    let response = match simulator.orchestrator().report() {
        Ok(report) => Json(SuccessResponse::from_report(&report)).into_response(),
        Err(err) => err.into_response(),
    };
    simulator.http_metrics().record_report(start.elapsed());
    response
}

#[derive(Deserialize)]
pub(super) struct Pagination {
    offset: Option<usize>,
    limit: Option<usize>,
}

pub(super) async fn report_rounds(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Query(pagination): Query<Pagination>,
) -> Response {
    let report = match simulator.orchestrator().report() {
        Ok(report) => report,
        Err(err) => return err.into_response(),
    };
    let offset = pagination.offset.unwrap_or(0);
    let limit = pagination
        .limit
        .unwrap_or(DEFAULT_ROUNDS_PAGE)
        .min(MAX_ROUNDS_PAGE);

    let total = report.history.len();
    let rounds: Vec<_> = report.history.iter().skip(offset).take(limit).collect();
    let next_offset = if offset.saturating_add(rounds.len()) < total {
        Some(offset + rounds.len())
    } else {
        None
    };

    Json(json!({
        "run_id": report.run_id,
        "rounds": rounds,
        "next_offset": next_offset,
        "total": total,
        "stride": report.history_stride,
    }))
    .into_response()
}

pub(super) async fn report_csv(AxumState(simulator): AxumState<Arc<Simulator>>) -> Response {
    let report = match simulator.orchestrator().report() {
        Ok(report) => report,
        Err(err) => return err.into_response(),
    };
    let tiers = simulator.orchestrator().rules().tier_count();
    let body = match history_csv(&report.history, tiers) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(error = %err, "failed to render history csv");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    if let Ok(disposition) = HeaderValue::from_str(&format!(
        "attachment; filename=\"simulation-{}.csv\"",
        report.run_id
    )) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    response
}

pub(super) async fn http_metrics(
    headers: HeaderMap,
    AxumState(simulator): AxumState<Arc<Simulator>>,
) -> Response {
    if let Some(status) = metrics_auth_error(&headers) {
        return status.into_response();
    }
    Json(simulator.http_metrics_snapshot()).into_response()
}

pub(super) async fn run_metrics(
    headers: HeaderMap,
    AxumState(simulator): AxumState<Arc<Simulator>>,
) -> Response {
    if let Some(status) = metrics_auth_error(&headers) {
        return status.into_response();
    }
    Json(simulator.run_metrics_snapshot()).into_response()
}

pub(super) async fn system_metrics(
    headers: HeaderMap,
    AxumState(simulator): AxumState<Arc<Simulator>>,
) -> Response {
    if let Some(status) = metrics_auth_error(&headers) {
        return status.into_response();
    }
    Json(simulator.system_metrics_snapshot()).into_response()
}

fn metrics_auth_error(headers: &HeaderMap) -> Option<StatusCode> {
    let token = std::env::var("METRICS_AUTH_TOKEN").unwrap_or_default();
    if token.is_empty() {
        return None;
    }
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let header_token = headers
        .get("x-metrics-token")
        .and_then(|value| value.to_str().ok());
    if bearer == Some(token.as_str()) || header_token == Some(token.as_str()) {
        None
    } else {
        Some(StatusCode::UNAUTHORIZED)
    }
}
