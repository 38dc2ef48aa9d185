use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use sorter_core::Station;
use sorter_core::config::WeightCfg;
use sorter_core::mocks::{
    ScriptedInput, ScriptedScale, ScriptedScores, SpyServo, StillCamera, StubKioskApi,
};
use sorter_server::http::{AppState, router};
use sorter_traits::ManualClock;
use tower::ServiceExt;

const PLASTIC: [f32; 3] = [0.0, 0.1, 0.9];

fn station(camera: StillCamera, scores: Vec<Vec<f32>>) -> Arc<Station> {
    let station = Station::builder()
        .with_camera(camera)
        .with_weight_cfg(WeightCfg {
            reference_unit: 1.0,
            samples: 1,
            tare_samples: 1,
            ..WeightCfg::default()
        })
        .with_metal_active_low(false)
        .with_clock(Arc::new(ManualClock::new()))
        .with_scale(ScriptedScale::new(vec![0, 5, 0]))
        .with_metal_input(ScriptedInput::new(vec![false]))
        .with_servos(SpyServo::new())
        .with_backend(ScriptedScores::new(scores))
        .with_kiosk_api(StubKioskApi::new("tx-1", "sec-1"))
        .build()
        .unwrap();
    Arc::new(station)
}

fn app(station: Arc<Station>) -> Router {
    router(AppState::new(station, "http://localhost:3000/"))
}

async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, body.to_vec())
}

async fn call_json(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = call(app, method, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn index_serves_the_kiosk_page() {
    let app = app(station(StillCamera::new(vec![0]), vec![]));
    let (status, content_type, body) = call(&app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    assert!(String::from_utf8(body).unwrap().contains("Recycling Kiosk"));
}

#[tokio::test]
async fn fresh_station_is_idle_with_zero_tallies() {
    let app = app(station(StillCamera::new(vec![0]), vec![]));
    let (status, state) = call_json(&app, "GET", "/state").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["status"], "IDLE");
    assert_eq!(state["plastic"], 0);
    assert_eq!(state["cans"], 0);
    assert_eq!(state["other"], 0);
    assert_eq!(state["total_weight"], 0.0);
    assert_eq!(state["last_item"], "Ready");
    assert!(state["transaction_id"].is_null());
}

#[tokio::test]
async fn scan_before_start_conflicts() {
    let app = app(station(StillCamera::new(vec![0]), vec![PLASTIC.to_vec()]));
    let (status, body) = call_json(&app, "POST", "/action/scan").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Not Running");
}

#[tokio::test]
async fn start_without_camera_reports_no_camera() {
    let app = app(station(StillCamera::new(vec![]), vec![]));
    let (status, body) = call_json(&app, "POST", "/action/start").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "No Camera");

    let (_, state) = call_json(&app, "GET", "/state").await;
    assert_eq!(state["status"], "IDLE");
}

#[tokio::test]
async fn qr_image_is_missing_until_a_run_stops() {
    let app = app(station(StillCamera::new(vec![0]), vec![]));
    let (status, _, _) = call(&app, "GET", "/qr_image").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_run_start_scan_stop_reset() {
    let app = app(station(StillCamera::new(vec![0]), vec![PLASTIC.to_vec()]));

    let (status, body) = call_json(&app, "POST", "/action/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = call_json(&app, "POST", "/action/scan").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["label"], "Plastic");
    assert_eq!(body["weight"], 5.0);

    let (status, body) = call_json(&app, "POST", "/action/stop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, content_type, png) = call(&app, "GET", "/qr_image").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(&png[..4], b"\x89PNG");

    let (_, state) = call_json(&app, "GET", "/state").await;
    assert_eq!(state["status"], "SHOW_RESULT");
    assert_eq!(state["plastic"], 1);
    assert_eq!(state["total_weight"], 5.0);
    assert_eq!(state["transaction_id"], "tx-1");
    assert_eq!(state["claim_secret"], "sec-1");

    // Frozen after stop.
    let (status, _) = call_json(&app, "POST", "/action/scan").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call_json(&app, "POST", "/action/reset").await;
    assert_eq!(status, StatusCode::OK);
    let (_, state) = call_json(&app, "GET", "/state").await;
    assert_eq!(state["status"], "IDLE");
    assert_eq!(state["plastic"], 1);
}

#[tokio::test]
async fn classifier_failure_is_a_scan_failure_without_state_change() {
    // No scripted scores: the first inference fails.
    let app = app(station(StillCamera::new(vec![0]), vec![]));
    let (status, _) = call_json(&app, "POST", "/action/start").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call_json(&app, "POST", "/action/scan").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Scan Failed");

    let (_, state) = call_json(&app, "GET", "/state").await;
    assert_eq!(state["status"], "RUNNING");
    assert_eq!(state["plastic"], 0);
    assert_eq!(state["other"], 0);
}

#[tokio::test]
async fn stop_outside_a_run_keeps_the_last_claim_code() {
    let app = app(station(StillCamera::new(vec![0]), vec![]));

    // nothing to stop yet
    let (status, _) = call_json(&app, "POST", "/action/stop").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = call(&app, "GET", "/qr_image").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    call_json(&app, "POST", "/action/start").await;
    call_json(&app, "POST", "/action/stop").await;
    let (_, _, first) = call(&app, "GET", "/qr_image").await;

    call_json(&app, "POST", "/action/reset").await;
    let (status, body) = call_json(&app, "POST", "/action/stop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, state) = call_json(&app, "GET", "/state").await;
    assert_eq!(state["status"], "IDLE");
    let (status, _, again) = call(&app, "GET", "/qr_image").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, again);
}
