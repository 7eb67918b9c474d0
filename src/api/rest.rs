// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`:
//   GET       /api/v1/health     liveness plus scanner state
//   GET|POST  /api/v1/scan       run one scan (`mode=scan`, the default)
//   GET       /api/v1/scan/last  last scan run record
//
// CORS is permissive; the trigger is meant to be called from a scheduler or
// a dashboard on another origin.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::api::response::ScanResponse;
use crate::app_state::AppState;
use crate::error::ScanError;
use crate::scanner::ScanOutcome;

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/scan", get(trigger_scan).post(trigger_scan))
        .route("/api/v1/scan/last", get(last_scan))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health())
}

// =============================================================================
// Scan trigger
// =============================================================================

#[derive(Debug, Deserialize)]
struct ScanParams {
    #[serde(default)]
    mode: Option<String>,
}

fn status_for(result: &Result<ScanOutcome, ScanError>) -> StatusCode {
    match result {
        Ok(_) => StatusCode::OK,
        Err(ScanError::AlreadyRunning) => StatusCode::CONFLICT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn trigger_scan(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScanParams>,
) -> impl IntoResponse {
    let mode = params.mode.as_deref().unwrap_or("scan");
    if mode != "scan" {
        warn!(mode, "rejected scan trigger with unsupported mode");
        return (
            StatusCode::BAD_REQUEST,
            Json(ScanResponse::failure(format!("unsupported mode '{mode}'"))),
        );
    }

    let trigger = state.record_trigger();
    info!(trigger, "scan triggered via API");

    // Detached so a dropped connection cannot leave the scanner marked busy.
    let scanner = state.scanner.clone();
    let result = match tokio::spawn(async move { scanner.run().await }).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "scan task aborted");
            state.push_error(format!("scan task aborted: {e}"));
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ScanResponse::failure("scan task aborted")),
            );
        }
    };

    if let Err(e) = &result {
        if !matches!(e, ScanError::AlreadyRunning) {
            state.push_error(e.to_string());
        }
    }

    (status_for(&result), Json(ScanResponse::from_result(&result)))
}

// =============================================================================
// Last run
// =============================================================================

async fn last_scan(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.last_run() {
        Some(run) => Json(run).into_response(),
        None => {
            let body = serde_json::json!({ "error": "no scan has run yet" });
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::tests::{mixed_gateway, test_config, FakeGateway};
    use crate::store::MemorySignalStore;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    const UNIVERSE: &[&str] = &["AAA", "SHORT", "BBB", "HIGH"];

    fn app(gateway: FakeGateway) -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::new(
            test_config(UNIVERSE),
            Arc::new(gateway),
            Arc::new(MemorySignalStore::new()),
            None,
        ));
        (router(state.clone()), state)
    }

    async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_idle_scanner() {
        let (app, _) = app(mixed_gateway(28.0));
        let (status, body) = call(app, Method::GET, "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["scanState"]["state"], "idle");
        assert_eq!(body["universeSize"], 4);
        assert_eq!(body["universeSource"], "configured");
    }

    #[tokio::test]
    async fn scan_returns_picks_in_order() {
        let (app, _) = app(mixed_gateway(28.0));
        let (status, body) = call(app, Method::POST, "/api/v1/scan?mode=scan").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["vixValue"], 28.0);
        assert_eq!(body["signalCount"], 2);
        assert_eq!(body["picks"][0]["ticker"], "AAA");
        assert_eq!(body["picks"][0]["score"], 100);
        assert_eq!(body["picks"][0]["strength"], "strong");
        assert_eq!(body["picks"][1]["ticker"], "BBB");
        assert!(body.get("persistenceError").is_none());
    }

    #[tokio::test]
    async fn mode_defaults_to_scan() {
        let (app, _) = app(mixed_gateway(28.0));
        let (status, body) = call(app, Method::GET, "/api/v1/scan").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn gated_scan_body() {
        let (app, _) = app(mixed_gateway(15.0));
        let (status, body) = call(app, Method::POST, "/api/v1/scan").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "VIX 15.0 outside buy zone (20-35)");
        assert_eq!(body["signalCount"], 0);
        assert!(body.get("success").is_none());
    }

    #[tokio::test]
    async fn unknown_mode_is_bad_request() {
        let (app, state) = app(mixed_gateway(28.0));
        let (status, body) = call(app, Method::POST, "/api/v1/scan?mode=backtest").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unsupported mode 'backtest'");
        assert!(state.last_run().is_none());
    }

    #[tokio::test]
    async fn missing_vix_is_server_error() {
        let (app, state) = app(FakeGateway::default());
        let (status, body) = call(app, Method::POST, "/api/v1/scan").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("VIX"));
        assert_eq!(state.health().recent_errors.len(), 1);
    }

    #[tokio::test]
    async fn last_scan_before_and_after() {
        let (app, _) = app(mixed_gateway(28.0));
        let (status, _) = call(app.clone(), Method::GET, "/api/v1/scan/last").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        call(app.clone(), Method::POST, "/api/v1/scan").await;
        let (status, body) = call(app, Method::GET, "/api/v1/scan/last").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["signals_found"], 2);
    }

    #[test]
    fn busy_scanner_maps_to_conflict() {
        assert_eq!(status_for(&Err(ScanError::AlreadyRunning)), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&Err(ScanError::upstream("VIX", "down"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
