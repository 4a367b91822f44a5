//! AMP for Email CORS headers.
//!
//! AMP clients post forms with `__amp_source_origin=<sender origin>` and
//! refuse the response unless it echoes that origin in
//! `AMP-Access-Control-Allow-Source-Origin` and exposes the header.
//! Applied to every response whose path starts with `/leave/` or `/api/leave/`.

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::{self, Next},
    response::Response,
};

pub const AMP_SOURCE_ORIGIN_HEADER: &str = "amp-access-control-allow-source-origin";
const AMP_SOURCE_ORIGIN_EXPOSED: &str = "AMP-Access-Control-Allow-Source-Origin";

pub fn apply(router: Router) -> Router {
    router.layer(middleware::from_fn(amp_cors))
}

async fn amp_cors(req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path();
    if !(path.starts_with("/leave/") || path.starts_with("/api/leave/")) {
        return next.run(req).await;
    }

    let source_origin = req
        .uri()
        .query()
        .and_then(amp_source_origin)
        .or_else(|| {
            req.headers()
                .get(header::ORIGIN)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "*".to_string());

    let mut res = next.run(req).await;
    let headers = res.headers_mut();
    let value = HeaderValue::from_str(&source_origin).unwrap_or(HeaderValue::from_static("*"));
    headers.insert(AMP_SOURCE_ORIGIN_HEADER, value);
    expose(headers);
    res
}

/// Percent-decoded `__amp_source_origin` query parameter.
pub fn amp_source_origin(query: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "__amp_source_origin")
        .and_then(|(_, v)| urlencoding::decode(v).ok())
        .map(|v| v.into_owned())
        .filter(|v| !v.is_empty())
}

// Keep whatever was already exposed.
fn expose(headers: &mut HeaderMap) {
    let merged = match headers
        .get(header::ACCESS_CONTROL_EXPOSE_HEADERS)
        .and_then(|v| v.to_str().ok())
    {
        Some(existing)
            if existing
                .split(',')
                .any(|h| h.trim().eq_ignore_ascii_case(AMP_SOURCE_ORIGIN_EXPOSED)) =>
        {
            return;
        }
        Some(existing) if !existing.trim().is_empty() => {
            format!("{existing}, {AMP_SOURCE_ORIGIN_EXPOSED}")
        }
        _ => AMP_SOURCE_ORIGIN_EXPOSED.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&merged) {
        headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, value);
    }
}
