/*
 * Responsibility
 * - auth / leave の URL 構造を定義 (app.rs で /api と prefix なしの両方に mount)
 * - session が必要な範囲にだけ access middleware を route_layer で掛ける
 * - 承認リンク (approve/reject) は承認トークンで認可するので public 側
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{
    approval::{amp_approve, amp_reject, approve_link, reject_link},
    auth::{forgot_password, login, me, register, reset_password},
    leave::{create_leave, decide_leave, get_leave, list_my_leaves, list_pending},
};
use crate::middleware::auth::access;
use crate::state::AppState;

/// Prefixes the API router is mounted under.
pub const API_PREFIXES: [&str; 2] = ["/api", ""];

/// Routes below, for `/debug/routes`.
pub const API_ROUTES: &[(&str, &[&str])] = &[
    ("/auth/register", &["POST"]),
    ("/auth/login", &["POST"]),
    ("/auth/forgot-password", &["POST"]),
    ("/auth/reset-password", &["POST"]),
    ("/auth/me", &["GET"]),
    ("/leave", &["GET", "POST"]),
    ("/leave/pending", &["GET"]),
    ("/leave/{id}", &["GET"]),
    ("/leave/{id}/decision", &["POST"]),
    ("/leave/{id}/approve", &["GET", "POST"]),
    ("/leave/{id}/reject", &["GET", "POST"]),
];

pub const TOP_LEVEL_ROUTES: &[(&str, &[&str])] = &[
    ("/health", &["GET"]),
    ("/api/health", &["GET"]),
    ("/debug/routes", &["GET"]),
];

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/leave/{id}/approve", get(approve_link).post(amp_approve))
        .route("/leave/{id}/reject", get(reject_link).post(amp_reject));

    let protected = Router::new()
        .route("/auth/me", get(me))
        .route("/leave", get(list_my_leaves).post(create_leave))
        .route("/leave/pending", get(list_pending))
        .route("/leave/{id}", get(get_leave))
        .route("/leave/{id}/decision", post(decide_leave));

    public.merge(access::apply(protected, state))
}
