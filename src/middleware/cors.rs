//! CORS policy for the SPA and for AMP email clients.
//!
//! Policy:
//! - Exact-match allow-list from `Config::allowed_origins` (dev origins, the
//!   frontend/backend URLs, Gmail/AMP origins and `CORS_ALLOWED_ORIGINS`).
//! - Credentials allowed, so the origin is never `*`.
//! - AMP-specific response headers are added by `middleware::amp`.

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;

pub fn apply(router: Router, config: &Config) -> Router {
    router.layer(layer(&config.allowed_origins()))
}

pub fn layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("amp-same-origin"),
            HeaderName::from_static("amp-access-control-allow-source-origin"),
        ])
        .max_age(std::time::Duration::from_secs(60 * 10))
}
