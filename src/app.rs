/*
 * Responsibility
 * - Config読み込み → 依存生成 (DB / cache / mail / token service) → Router 組み立て
 * - Middleware の適用 (AMP CORS / CORS / security headers / HTTP 共通)
 * - axum::serve() で起動
 */
use anyhow::{Context, Result};
use axum::{Router, routing::get};
use sqlx::postgres::PgPoolOptions;
use std::{panic, process, sync::Arc, time::Duration};
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{self, handlers};
use crate::config::Config;
use crate::middleware;
use crate::repos::{LeaveRepo, UserRepo};
use crate::services::approval::{ApprovalService, ApprovalTokenService, CacheReplayStore};
use crate::services::auth::{OtpStore, SessionTokenService};
use crate::services::cache::build_cache;
use crate::services::mail::{EmailTemplates, MailService};
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG=info,leave_approval=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: crash the whole process so it gets noticed
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting leave approval API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let cache = build_cache(config.redis_url.as_deref()).await?;
    tracing::info!(backend = cache.backend_name(), "token store ready");

    let templates = EmailTemplates::discover(config.template_dir.as_deref());
    let mail = Arc::new(MailService::new(
        config.mail.clone(),
        config.urls.clone(),
        templates,
    )?);

    let users = UserRepo::new(pool.clone());
    let leaves = LeaveRepo::new(pool);

    let approvals = ApprovalService::new(
        ApprovalTokenService::new(
            &config.approval_token_secret,
            config.approval_token_ttl_hours,
        ),
        Arc::new(CacheReplayStore::new(cache.clone())),
        Arc::new(leaves.clone()),
        mail.clone(),
    );

    Ok(AppState {
        users,
        leaves,
        sessions: SessionTokenService::new(&config.jwt_secret, config.session_token_ttl_seconds),
        approvals,
        otp: OtpStore::new(cache),
        mail,
        static_client_dir: config.static_client_dir.clone(),
    })
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let api_routes = api::routes(state.clone());

    let mut router = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/health", get(handlers::health::health))
        .route("/debug/routes", get(handlers::debug::list_routes))
        .nest("/api", api_routes.clone())
        .merge(api_routes);

    let assets = state.static_client_dir.join("assets");
    if assets.is_dir() {
        router = router.nest_service("/assets", ServeDir::new(assets));
    } else {
        tracing::info!(dir = %state.static_client_dir.display(), "no built client found, SPA not served");
    }

    let router = router
        .fallback(handlers::spa::fallback)
        .with_state(state);

    let router = middleware::amp::apply(router);
    let router = middleware::cors::apply(router, config);
    let router = middleware::security_headers::apply(router, config.app_env);
    middleware::http::apply(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::state::testing::lazy_state;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use tower::ServiceExt;

    fn app() -> Router {
        let mut state = lazy_state();
        state.static_client_dir = "/nonexistent/client".into();
        build_router(state, &test_config())
    }

    async fn json(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_on_both_prefixes() {
        for path in ["/health", "/api/health"] {
            let res = app()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(json(res).await["status"], "healthy");
        }
    }

    #[tokio::test]
    async fn every_listed_route_is_served() {
        let axum::Json(routes) = crate::api::handlers::debug::list_routes().await;
        let id = uuid::Uuid::new_v4().to_string();

        for route in routes {
            let path = route.path.replace("{id}", &id);
            for method in route.methods {
                let method = Method::from_bytes(method.as_bytes()).unwrap();
                let res = app()
                    .oneshot(
                        Request::builder()
                            .method(method.clone())
                            .uri(&path)
                            .body(Body::empty())
                            .unwrap(),
                    )
                    .await
                    .unwrap();
                assert_ne!(res.status(), StatusCode::NOT_FOUND, "{method} {path}");
                assert_ne!(res.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {path}");
            }
        }
    }

    #[tokio::test]
    async fn root_and_unknown_paths() {
        let res = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json(res).await;
        assert_eq!(body["message"], "Leave Application System API");
        assert_eq!(body["version"], "1.0.0");

        let res = app()
            .oneshot(Request::get("/no/such/page").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(res).await["detail"], "Not Found");
    }

    #[tokio::test]
    async fn protected_routes_need_a_session_under_both_prefixes() {
        for path in ["/auth/me", "/api/auth/me", "/leave", "/api/leave/pending"] {
            let res = app()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        }
    }

    #[tokio::test]
    async fn amp_headers_on_leave_responses() {
        let res = app()
            .oneshot(
                Request::post("/api/leave/abc/approve?token=bad&__amp_source_origin=https%3A%2F%2Fmail.google.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            res.headers()
                .get("amp-access-control-allow-source-origin")
                .unwrap(),
            "https://mail.google.com"
        );
        assert!(res.headers().get("x-request-id").is_some());
    }

    #[tokio::test]
    async fn cors_allows_gmail_with_credentials() {
        let res = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/leave/abc/approve")
                    .header(header::ORIGIN, "https://mail.google.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            res.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://mail.google.com"
        );
        assert_eq!(
            res.headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn cors_ignores_unknown_origins() {
        let res = app()
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "https://evil.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
