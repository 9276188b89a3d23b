//! HTTP server layer for the satellite tile gateway.
//!
//! This module provides the HTTP API over the tile service and job queue.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   GET /tiles/{z}/{x}/{y}     POST /preprocess                   │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (requests + error maps)  │  │   (router, CORS, tracing)   │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, job_status_handler, preprocess_handler, tile_handler, AppState, ErrorResponse,
    HealthResponse, TilePathParams, TileQueryParams,
};
pub use routes::{create_router, RouterConfig};
