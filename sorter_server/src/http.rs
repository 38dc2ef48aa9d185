//! HTTP surface of the kiosk.
//!
//! Station actions block on servo delays and network calls, so every one of
//! them runs on the blocking pool; handlers only translate results to JSON.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eyre::WrapErr;
use parking_lot::RwLock;
use serde_json::json;
use sorter_core::{RunState, Station, StationError};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::qr;

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Clone)]
pub struct AppState {
    station: Arc<Station>,
    qr_png: Arc<RwLock<Option<Vec<u8>>>>,
    base_url: Arc<str>,
}

impl AppState {
    /// `base_url` is the remote service root used in claim URLs.
    pub fn new(station: Arc<Station>, base_url: &str) -> Self {
        Self {
            station,
            qr_png: Arc::new(RwLock::new(None)),
            base_url: Arc::from(base_url),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/state", get(get_state))
        .route("/qr_image", get(qr_image))
        .route("/action/start", post(start))
        .route("/action/scan", post(scan))
        .route("/action/stop", post(stop))
        .route("/action/reset", post(reset))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C (or SIGTERM on unix).
pub async fn serve(state: AppState, addr: &str) -> eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "kiosk listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("http server")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown requested");
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Run a blocking station action; a panicked worker becomes a 500.
async fn blocking<T, F>(station: &Arc<Station>, f: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&Station) -> T + Send + 'static,
{
    let station = Arc::clone(station);
    tokio::task::spawn_blocking(move || f(&station))
        .await
        .map_err(|e| {
            error!(error = %e, "station worker panicked");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error")
        })
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn get_state(State(app): State<AppState>) -> Response {
    Json(app.station.state()).into_response()
}

async fn qr_image(State(app): State<AppState>) -> Response {
    match app.qr_png.read().clone() {
        Some(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start(State(app): State<AppState>) -> Response {
    match blocking(&app.station, Station::start).await {
        Ok(Ok(_)) => Json(json!({ "success": true })).into_response(),
        Ok(Err(e)) => {
            warn!(error = %e, "start refused");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "No Camera")
        }
        Err(resp) => resp,
    }
}

async fn scan(State(app): State<AppState>) -> Response {
    match blocking(&app.station, Station::scan).await {
        Ok(Ok(outcome)) => Json(json!({
            "success": true,
            "label": outcome.label,
            "weight": round_tenth(outcome.item_weight_g),
        }))
        .into_response(),
        Ok(Err(StationError::NotRunning { .. })) => {
            failure(StatusCode::CONFLICT, "Not Running")
        }
        Ok(Err(_)) => failure(StatusCode::INTERNAL_SERVER_ERROR, "Scan Failed"),
        Err(resp) => resp,
    }
}

async fn stop(State(app): State<AppState>) -> Response {
    let base_url = Arc::clone(&app.base_url);
    let stopped = blocking(&app.station, move |station| {
        station.stop().map(|snapshot| claim_code(&base_url, &snapshot))
    })
    .await;
    match stopped {
        // A fresh run replaces the previous claim code.
        Ok(Some(png)) => *app.qr_png.write() = png,
        Ok(None) => {}
        Err(resp) => return resp,
    }
    Json(json!({ "success": true })).into_response()
}

/// PNG claim code for a frozen run; runs on the blocking pool.
fn claim_code(base_url: &str, snapshot: &RunState) -> Option<Vec<u8>> {
    let (tx, secret) = snapshot
        .transaction_id
        .as_deref()
        .zip(snapshot.claim_secret.as_deref())?;
    let url = qr::claim_url(base_url, tx, secret);
    match qr::render_png(&url) {
        Ok(png) => {
            info!(%url, "claim code ready");
            Some(png)
        }
        Err(e) => {
            warn!(error = %e, "claim code rendering failed");
            None
        }
    }
}

async fn reset(State(app): State<AppState>) -> Response {
    match blocking(&app.station, Station::reset).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(resp) => resp,
    }
}

/// One decimal place, computed in f64 so the JSON number prints cleanly.
fn round_tenth(grams: f32) -> f64 {
    (f64::from(grams) * 10.0).round() / 10.0
}
