//! Preprocess endpoint tests: job lifecycle, idempotency, validation, and
//! the per-job tile cap.

use std::sync::Arc;

use axum::http::StatusCode;
use satgate::JobQueueConfig;

use super::test_utils::{
    body_json, get, post_json, test_router, test_router_with, wait_for_terminal_status, MockMode,
    MockProvider,
};

fn payload() -> serde_json::Value {
    serde_json::json!({
        "bbox": [80.1, 7.2, 80.2, 7.3],
        "date": "2024-05-01",
        "bands": ["RGB"],
        "cloud_mask": false,
    })
}

// =============================================================================
// Job Lifecycle
// =============================================================================

#[tokio::test]
async fn test_enqueue_accepted_and_completes() {
    let provider = Arc::new(MockProvider::new());
    let router = test_router_with(
        Arc::clone(&provider),
        JobQueueConfig {
            zoom: 10,
            max_tiles: 200,
        },
    );

    let response = post_json(&router, "/preprocess", &payload(), None).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let ticket = body_json(response).await;
    assert_eq!(ticket["status"], "queued");
    let job_id = ticket["job_id"].as_str().unwrap().to_string();

    let job = wait_for_terminal_status(&router, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["job_id"], job_id.as_str());
    assert_eq!(job["date"], "2024-05-01");
    assert_eq!(job["bands"][0], "RGB");
    assert!(job["failure_reason"].is_null());
    assert!(job["created_at"].is_string());
    assert!(job["updated_at"].is_string());

    // The worker warmed at least one tile
    assert!(provider.calls() >= 1);
}

#[tokio::test]
async fn test_worker_failure_visible_only_via_status() {
    let provider = Arc::new(MockProvider::with_mode(MockMode::Unavailable));
    let router = test_router_with(
        Arc::clone(&provider),
        JobQueueConfig {
            zoom: 10,
            max_tiles: 50,
        },
    );

    // The enqueue call itself still succeeds with 202
    let response = post_json(&router, "/preprocess", &payload(), None).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let job_id = body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let job = wait_for_terminal_status(&router, &job_id).await;
    assert_eq!(job["status"], "failed");
    assert!(job["failure_reason"]
        .as_str()
        .unwrap()
        .contains("unavailable"));
}

// =============================================================================
// Idempotency
// =============================================================================

#[tokio::test]
async fn test_idempotency_key_returns_same_job() {
    let provider = Arc::new(MockProvider::new());
    let router = test_router_with(
        Arc::clone(&provider),
        JobQueueConfig {
            zoom: 10,
            max_tiles: 200,
        },
    );

    let first = post_json(&router, "/preprocess", &payload(), Some("req-7")).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let first_id = body_json(first).await["job_id"].as_str().unwrap().to_string();

    let second = post_json(&router, "/preprocess", &payload(), Some("req-7")).await;
    assert_eq!(second.status(), StatusCode::ACCEPTED);
    let second_id = body_json(second).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    assert_eq!(first_id, second_id);

    // Only one worker ran: the upstream saw each distinct tile at most once
    wait_for_terminal_status(&router, &first_id).await;
    let calls = provider.calls();
    let third = post_json(&router, "/preprocess", &payload(), Some("req-7")).await;
    let third_body = body_json(third).await;
    assert_eq!(third_body["job_id"].as_str().unwrap(), first_id);
    assert_eq!(third_body["status"], "completed");
    assert_eq!(provider.calls(), calls);
}

#[tokio::test]
async fn test_identical_payload_without_key_deduplicates() {
    let router = test_router(Arc::new(MockProvider::new()));

    let first = post_json(&router, "/preprocess", &payload(), None).await;
    let second = post_json(&router, "/preprocess", &payload(), None).await;

    let first_id = body_json(first).await["job_id"].as_str().unwrap().to_string();
    let second_id = body_json(second).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(first_id, second_id);
}

#[tokio::test]
async fn test_different_payloads_get_different_jobs() {
    let router = test_router(Arc::new(MockProvider::new()));

    let first = post_json(&router, "/preprocess", &payload(), None).await;

    let mut other = payload();
    other["date"] = serde_json::json!("2024-05-02");
    let second = post_json(&router, "/preprocess", &other, None).await;

    let first_id = body_json(first).await["job_id"].as_str().unwrap().to_string();
    let second_id = body_json(second).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(first_id, second_id);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_inverted_bbox_rejected_no_job_created() {
    let provider = Arc::new(MockProvider::new());
    let router = test_router(Arc::clone(&provider));

    let mut inverted = payload();
    inverted["bbox"] = serde_json::json!([80.2, 7.2, 80.1, 7.3]);

    let response = post_json(&router, "/preprocess", &inverted, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_bbox");

    // No worker ever ran
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_bad_date_rejected() {
    let router = test_router(Arc::new(MockProvider::new()));

    let mut bad = payload();
    bad["date"] = serde_json::json!("01/05/2024");
    let response = post_json(&router, "/preprocess", &bad, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_date");
}

#[tokio::test]
async fn test_unknown_band_rejected() {
    let router = test_router(Arc::new(MockProvider::new()));

    let mut bad = payload();
    bad["bands"] = serde_json::json!(["XRAY"]);
    let response = post_json(&router, "/preprocess", &bad, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "unknown_band");
}

// =============================================================================
// Tile Cap
// =============================================================================

#[tokio::test]
async fn test_oversized_job_completes_within_cap() {
    let provider = Arc::new(MockProvider::new());
    // The whole world at zoom 3 covers 64 tiles; cap the pass at 4
    let router = test_router_with(
        Arc::clone(&provider),
        JobQueueConfig {
            zoom: 3,
            max_tiles: 4,
        },
    );

    let mut world = payload();
    world["bbox"] = serde_json::json!([-179.0, -84.0, 179.0, 84.0]);

    let response = post_json(&router, "/preprocess", &world, None).await;
    let job_id = body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let job = wait_for_terminal_status(&router, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(provider.calls(), 4);
}

// =============================================================================
// Status Lookup
// =============================================================================

#[tokio::test]
async fn test_unknown_job_id_returns_404() {
    let router = test_router(Arc::new(MockProvider::new()));

    let response = get(
        &router,
        "/preprocess/00000000-0000-4000-8000-000000000000",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_malformed_job_id_returns_404() {
    let router = test_router(Arc::new(MockProvider::new()));

    let response = get(&router, "/preprocess/not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
