//! Imagery provider integration.
//!
//! Everything that talks to (or prepares requests for) the upstream
//! provider lives here:
//!
//! - [`evalscript`] - band selector parsing and evalscript rendering
//! - [`token`] - OAuth2 client-credentials token cache
//! - [`client`] - Process API request builder, authenticated fetch, and the
//!   [`ImageryProvider`] trait the rest of the crate depends on
//!
//! The provider bills per request, so nothing in this module retries: every
//! failure is mapped onto the error taxonomy once and reported.

pub mod client;
pub mod evalscript;
pub mod token;

pub use client::{
    FetchedImage, ImageryProvider, SentinelHubClient, TileFetchRequest, TILE_OUTPUT_SIZE,
};
pub use evalscript::{build_evalscript, parse_band_selector, BandSelection};
pub use token::TokenCache;
