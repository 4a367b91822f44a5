/*
 * Responsibility
 * - メールのリンク / AMP form からの承認・却下 (session 不要、承認トークンで認可)
 * - GET: ブラウザで開かれる → 結果を小さな HTML ページで返す
 * - POST: AMP form の action-xhr → {status, message} の JSON を返す
 */
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use htmlescape::encode_minimal as escape_html;

use crate::api::dto::leave::{AmpDecisionResponse, TokenQuery};
use crate::api::extractors::DecisionToken;
use crate::error::AppError;
use crate::repos::LeaveDetails;
use crate::services::approval::ApprovalAction;
use crate::state::AppState;

pub async fn approve_link(
    State(state): State<AppState>,
    Path(leave_id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Response {
    link_decision(state, leave_id, ApprovalAction::Approve, query).await
}

pub async fn reject_link(
    State(state): State<AppState>,
    Path(leave_id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Response {
    link_decision(state, leave_id, ApprovalAction::Reject, query).await
}

pub async fn amp_approve(
    State(state): State<AppState>,
    Path(leave_id): Path<String>,
    token: Result<DecisionToken, AppError>,
) -> Response {
    amp_decision(state, leave_id, ApprovalAction::Approve, token).await
}

pub async fn amp_reject(
    State(state): State<AppState>,
    Path(leave_id): Path<String>,
    token: Result<DecisionToken, AppError>,
) -> Response {
    amp_decision(state, leave_id, ApprovalAction::Reject, token).await
}

async fn decide(
    state: &AppState,
    leave_id: &str,
    action: ApprovalAction,
    token: Option<String>,
) -> Result<LeaveDetails, AppError> {
    let token = token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::bad_request("TOKEN_REQUIRED", "approval token is required"))?;

    Ok(state
        .approvals
        .decide_with_token(leave_id, action, &token)
        .await?)
}

async fn link_decision(
    state: AppState,
    leave_id: String,
    action: ApprovalAction,
    query: TokenQuery,
) -> Response {
    match decide(&state, &leave_id, action, query.token).await {
        Ok(leave) => {
            let outcome = action.resulting_status();
            let body = result_page(
                &format!("Leave request {outcome}"),
                &format!(
                    "The {} leave request from {} ({} to {}) has been {outcome}. The employee will be notified by email.",
                    leave.leave_type, leave.employee_name, leave.start_date, leave.end_date
                ),
                true,
            );
            (StatusCode::OK, Html(body)).into_response()
        }
        Err(e) => {
            let (_, message) = e.parts();
            let body = result_page("Unable to process this request", &message, false);
            (e.status(), Html(body)).into_response()
        }
    }
}

async fn amp_decision(
    state: AppState,
    leave_id: String,
    action: ApprovalAction,
    token: Result<DecisionToken, AppError>,
) -> Response {
    let result = match token {
        Ok(DecisionToken(token)) => decide(&state, &leave_id, action, Some(token)).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(leave) => (
            StatusCode::OK,
            Json(AmpDecisionResponse {
                message: format!("Leave request {} successfully.", leave.status),
                status: leave.status,
            }),
        )
            .into_response(),
        Err(e) => {
            let (_, message) = e.parts();
            (
                e.status(),
                Json(AmpDecisionResponse {
                    status: "error".to_string(),
                    message,
                }),
            )
                .into_response()
        }
    }
}

fn result_page(title: &str, message: &str, success: bool) -> String {
    let color = if success { "#28a745" } else { "#dc3545" };
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body style="font-family: Arial, sans-serif; max-width: 560px; margin: 60px auto; padding: 20px; color: #333;">
<h1 style="color: {color}; font-size: 24px;">{title}</h1>
<p style="font-size: 16px; line-height: 1.6;">{message}</p>
<p style="font-size: 13px; color: #888;">Leave Management System</p>
</body>
</html>
"#,
        title = escape_html(title),
        message = escape_html(message),
    )
}
