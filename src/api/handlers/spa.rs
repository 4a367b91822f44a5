/*
 * Responsibility
 * - SPA (ビルド済み client) の index.html を返す fallback
 * - client が無い場合: "/" は API 情報、それ以外は 404 {"detail": "Not Found"}
 */
use axum::{
    Json,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

use crate::state::AppState;

pub async fn fallback(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    if matches!(method, Method::GET | Method::HEAD) {
        let index = state.static_client_dir.join("index.html");
        match tokio::fs::read_to_string(&index).await {
            Ok(html) => return Html(html).into_response(),
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %index.display(), error = %e, "failed to read SPA index");
            }
            Err(_) => {}
        }
    }

    if uri.path() == "/" {
        return Json(json!({
            "message": "Leave Application System API",
            "version": env!("CARGO_PKG_VERSION"),
        }))
        .into_response();
    }

    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::lazy_state;
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        Router::new().fallback(fallback).with_state(state)
    }

    async fn body_string(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn without_client_root_describes_api() {
        let mut state = lazy_state();
        state.static_client_dir = "/nonexistent/client".into();

        let res = app(state.clone())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("Leave Application System API"));

        let res = app(state)
            .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(res).await, r#"{"detail":"Not Found"}"#);
    }

    #[tokio::test]
    async fn client_routes_get_index_html() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<div id=\"root\"></div>").unwrap();
        let mut state = lazy_state();
        state.static_client_dir = dir.path().to_path_buf();

        let res = app(state.clone())
            .oneshot(Request::get("/leave/history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "<div id=\"root\"></div>");

        let res = app(state)
            .oneshot(Request::post("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
