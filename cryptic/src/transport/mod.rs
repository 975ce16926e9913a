//! Network surface.
//!
//! The scheduler is transport-agnostic; this module exposes it over HTTP
//! with an SSE stream for observers. Answer-bearing data leaves only
//! through the reveal route, and only once its window has closed.

pub mod http;

pub use http::{HttpConfig, MAX_BODY_SIZE, build_router, serve};
