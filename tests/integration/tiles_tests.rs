//! Tile endpoint tests: retrieval, conditional GETs, validation, and
//! upstream error mapping.

use std::sync::Arc;

use axum::http::StatusCode;

use super::test_utils::{
    body_bytes, body_json, get, get_conditional, test_router, MockMode, MockProvider,
};

const TILE_URI: &str = "/tiles/12/2960/1980?date=2024-05-01&bands=RGB&cloud_lt=20";

// =============================================================================
// Basic Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_tile_retrieval_success() {
    let provider = Arc::new(MockProvider::new());
    let router = test_router(Arc::clone(&provider));

    let response = get(&router, TILE_URI).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    assert!(response.headers().contains_key("etag"));
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(response.headers().get("x-tile-cache-hit").unwrap(), "false");

    let body = body_bytes(response).await;
    assert_eq!(&body[..], b"\x89PNG test tile");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_second_request_is_a_cache_hit() {
    let provider = Arc::new(MockProvider::new());
    let router = test_router(Arc::clone(&provider));

    let first = get(&router, TILE_URI).await;
    assert_eq!(first.headers().get("x-tile-cache-hit").unwrap(), "false");

    let second = get(&router, TILE_URI).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers().get("x-tile-cache-hit").unwrap(), "true");

    // Same bytes, one upstream fetch
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_default_bands_and_cloud_threshold() {
    let provider = Arc::new(MockProvider::new());
    let router = test_router(Arc::clone(&provider));

    // bands defaults to RGB and cloud_lt to 20, so this addresses the same
    // cache entry as the fully spelled-out query
    let implicit = get(&router, "/tiles/12/2960/1980?date=2024-05-01").await;
    assert_eq!(implicit.status(), StatusCode::OK);

    let explicit = get(&router, TILE_URI).await;
    assert_eq!(explicit.headers().get("x-tile-cache-hit").unwrap(), "true");
    assert_eq!(provider.calls(), 1);
}

// =============================================================================
// Conditional GETs
// =============================================================================

#[tokio::test]
async fn test_conditional_get_flow() {
    let provider = Arc::new(MockProvider::new());
    let router = test_router(Arc::clone(&provider));

    // First request yields the ETag
    let first = get(&router, TILE_URI).await;
    let etag = first
        .headers()
        .get("etag")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    // Matching validator: 304, no body
    let revalidated = get_conditional(&router, TILE_URI, &etag).await;
    assert_eq!(revalidated.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(revalidated.headers().get("etag").unwrap(), etag.as_str());
    assert!(revalidated.headers().contains_key("cache-control"));
    let body = body_bytes(revalidated).await;
    assert!(body.is_empty());

    // Non-matching validator: full 200 carrying the stored ETag
    let mismatched = get_conditional(&router, TILE_URI, "\"something-else\"").await;
    assert_eq!(mismatched.status(), StatusCode::OK);
    assert_eq!(mismatched.headers().get("etag").unwrap(), etag.as_str());

    // The provider was only consulted for the initial fill
    assert_eq!(provider.calls(), 1);
}

// =============================================================================
// Validation Failures
// =============================================================================

#[tokio::test]
async fn test_zoom_out_of_range() {
    let router = test_router(Arc::new(MockProvider::new()));

    let response = get(&router, "/tiles/23/0/0?date=2024-05-01").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = body_json(response).await;
    assert_eq!(error["error"], "invalid_tile");
}

#[tokio::test]
async fn test_tile_index_out_of_range_for_zoom() {
    let router = test_router(Arc::new(MockProvider::new()));

    // 2^3 = 8 tiles per axis at zoom 3
    let response = get(&router, "/tiles/3/8/0?date=2024-05-01").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_tile");
}

#[tokio::test]
async fn test_negative_coordinate_rejected() {
    let router = test_router(Arc::new(MockProvider::new()));

    let response = get(&router, "/tiles/3/-1/0?date=2024-05-01").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_date_rejected() {
    let provider = Arc::new(MockProvider::new());
    let router = test_router(Arc::clone(&provider));

    for bad in ["2024-5-01", "20240501", "tomorrow", "2024-02-30"] {
        let response = get(&router, &format!("/tiles/12/2960/1980?date={bad}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "date {bad:?}");
        assert_eq!(body_json(response).await["error"], "invalid_date");
    }

    // Missing entirely
    let response = get(&router, "/tiles/12/2960/1980").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_unknown_band_rejected() {
    let provider = Arc::new(MockProvider::new());
    let router = test_router(Arc::clone(&provider));

    let response = get(&router, "/tiles/12/2960/1980?date=2024-05-01&bands=THERMAL").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = body_json(response).await;
    assert_eq!(error["error"], "unknown_band");
    assert!(error["message"].as_str().unwrap().contains("THERMAL"));
    assert_eq!(provider.calls(), 0);
}

// =============================================================================
// Upstream Error Mapping
// =============================================================================

#[tokio::test]
async fn test_upstream_unavailable_maps_to_502() {
    let router = test_router(Arc::new(MockProvider::with_mode(MockMode::Unavailable)));

    let response = get(&router, TILE_URI).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "upstream_unavailable");
}

#[tokio::test]
async fn test_upstream_timeout_maps_to_503() {
    let router = test_router(Arc::new(MockProvider::with_mode(MockMode::Timeout)));

    let response = get(&router, TILE_URI).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"], "upstream_timeout");
}

#[tokio::test]
async fn test_provider_rejection_passes_detail_through() {
    let router = test_router(Arc::new(MockProvider::with_mode(MockMode::Rejected)));

    let response = get(&router, TILE_URI).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = body_json(response).await;
    assert_eq!(error["error"], "provider_rejected");
    assert!(error["message"].as_str().unwrap().contains("window too large"));
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let provider = Arc::new(MockProvider::with_mode(MockMode::Unavailable));
    let router = test_router(Arc::clone(&provider));

    get(&router, TILE_URI).await;
    get(&router, TILE_URI).await;

    // Each request hit the provider; no error response was cached
    assert_eq!(provider.calls(), 2);
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let router = test_router(Arc::new(MockProvider::new()));

    let response = get(&router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert!(health["version"].is_string());
}
