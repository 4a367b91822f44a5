//! Session token (Bearer JWT) 検証 → AuthCtx を extensions に入れる
//!
//! - `Authorization: Bearer <jwt>` を SessionTokenService で検証
//! - 成功時は `AuthCtx { user_id, role }` を request extensions に格納
//! - ヘッダ欠落・検証失敗はどちらも 401

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::extractors::AuthCtx;
use crate::error::AppError;
use crate::state::AppState;

/// 保護ルートにだけ掛ける (route_layer 相当)。
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AppError::Unauthorized)?;

    let session = match state.sessions.verify(token) {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(error = %err, "session token verification failed");
            return Err(AppError::Unauthorized);
        }
    };

    // middleware → extractor への受け渡し
    req.extensions_mut()
        .insert(AuthCtx::new(session.user_id, session.role));

    Ok(next.run(req).await)
}

fn bearer_token(raw: &str) -> Option<&str> {
    let (scheme, token) = raw.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
