//! Request handlers.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, FromRequestParts, Path, Query, Request, State, WebSocketUpgrade},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use scripthost_event::EventStats;
use scripthost_protocols::Meta;
use scripthost_runtime::{
    CancelReason, CoordinatorStats, InvocationOutcome, InvocationReport, InvocationRequest,
    ResponseParts, ScriptRequest,
};
use scripthost_websocket::{WebSocketChannel, split_axum};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, MAX_BODY_BYTES};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub requests: u64,
    pub scripts: Vec<String>,
    pub invocations: CoordinatorStats,
    pub events: EventStats,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = if state.coordinator.is_shutting_down() {
        "stopping"
    } else {
        "ok"
    };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime().as_secs(),
        requests: state.request_count(),
        scripts: state.registry.names(),
        invocations: state.coordinator.stats(),
        events: state.coordinator.bus().stats(),
    })
}

/// `/{org}/{repo}/{script}[/{*rest}]`: run a script for one HTTP request
/// or, when the request asks for an upgrade, for one WebSocket connection.
pub async fn invoke_script(
    State(state): State<Arc<AppState>>,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
) -> Result<Response, ApiError> {
    state.increment_requests();

    let (org, repo, name) = match (params.get("org"), params.get("repo"), params.get("script")) {
        (Some(org), Some(repo), Some(name)) => (org, repo, name),
        _ => return Err(ApiError::BadRequest("missing route parameters".to_string())),
    };
    let script = state
        .registry
        .get(name)
        .ok_or_else(|| ApiError::ScriptNotFound(name.clone()))?;
    let meta = Meta::new(org.as_str(), repo.as_str(), state.commit.as_str());

    let (mut parts, body) = request.into_parts();
    let script_request = build_script_request(&parts, params.get("rest").map(String::as_str))?;

    if script_request.is_websocket_upgrade() {
        let upgrade = WebSocketUpgrade::from_request_parts(&mut parts, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let coordinator = state.coordinator.clone();
        let options = state.channel_options;

        return Ok(upgrade.on_upgrade(move |socket| async move {
            let (source, sink) = split_axum(socket);
            let channel = Arc::new(WebSocketChannel::new(
                Uuid::new_v4().to_string(),
                source,
                sink,
                options,
            ));
            info!("WebSocket {} opened for {}", channel.id(), script.name());
            let report = coordinator
                .invoke(InvocationRequest::new(script, meta, script_request).with_websocket(channel))
                .await;
            log_report(&report);
        }));
    }

    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable body: {}", e)))?;

    let mut invocation = InvocationRequest::new(script, meta, script_request.with_body(body));
    if let Some(timeout) = state.http_timeout {
        invocation = invocation.with_deadline(timeout);
    }
    let report = state.coordinator.invoke(invocation).await;
    log_report(&report);
    render(report)
}

fn build_script_request(parts: &Parts, rest: Option<&str>) -> Result<ScriptRequest, ApiError> {
    let uri = &parts.uri;
    let path = match rest {
        Some(rest) => format!("/{}", rest),
        None => "/".to_string(),
    };
    let host = parts
        .headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.host())
        .unwrap_or_default()
        .to_string();

    let mut request = ScriptRequest::new(parts.method.as_str(), path)
        .with_url(uri.to_string())
        .with_raw_path(uri.path())
        .with_host(host)
        .with_proto(format!("{:?}", parts.version));

    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        request = request.with_remote_addr(addr.to_string());
    }

    let Query(query) = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    for (key, value) in query {
        request = request.with_query(key, value);
    }

    for (name, value) in &parts.headers {
        match value.to_str() {
            Ok(value) => request = request.with_header(name.as_str(), value),
            Err(_) => debug!("Dropping non-text header {}", name),
        }
    }
    Ok(request)
}

fn render(report: InvocationReport) -> Result<Response, ApiError> {
    match report.outcome {
        InvocationOutcome::Completed
        | InvocationOutcome::Cancelled(CancelReason::Exit | CancelReason::PeerDisconnected) => {
            Ok(into_response(report.response))
        }
        InvocationOutcome::Cancelled(CancelReason::Deadline) => Err(ApiError::Timeout),
        InvocationOutcome::Cancelled(CancelReason::HostShutdown) => Err(ApiError::Unavailable),
        InvocationOutcome::Cancelled(CancelReason::ScriptFailed) => {
            Err(ApiError::ScriptFailed("invocation cancelled".to_string()))
        }
        InvocationOutcome::Failed(e) => Err(ApiError::ScriptFailed(e.to_string())),
    }
}

fn into_response(parts: ResponseParts) -> Response {
    let status = StatusCode::from_u16(parts.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in &parts.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    match builder.body(Body::from(parts.body)) {
        Ok(response) => response,
        Err(e) => {
            warn!("Script produced an invalid response: {}", e);
            ApiError::ScriptFailed(format!("invalid response: {}", e)).into_response()
        }
    }
}

fn log_report(report: &InvocationReport) {
    debug!(
        invocation_id = %report.id,
        script = %report.script,
        outcome = report.outcome.label(),
        status = report.response.status,
        "Invocation finished in {:?}",
        report.duration
    );
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
