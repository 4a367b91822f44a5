/*
 * Responsibility
 * - /leave 系 handler (session 必須)
 * - 申請作成後のマネージャー宛メールは background (失敗しても申請は成功)
 * - 閲覧は本人か担当マネージャーのみ
 */
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::api::dto::leave::{CreateLeaveRequest, DecisionRequest, LeaveResponse};
use crate::api::extractors::AuthCtxExtractor;
use crate::error::AppError;
use crate::repos::leave_repo::{NewLeave, inclusive_days};
use crate::state::AppState;

pub async fn create_leave(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Json(req): Json<CreateLeaveRequest>,
) -> Result<(StatusCode, Json<LeaveResponse>), AppError> {
    req.validate()
        .map_err(|m| AppError::bad_request("VALIDATION_ERROR", m))?;
    let days = inclusive_days(req.start_date, req.end_date)
        .ok_or_else(|| AppError::bad_request("VALIDATION_ERROR", "invalid date range"))?;

    let employee = state
        .users
        .get(ctx.user_id)
        .await?
        .ok_or(AppError::not_found("user"))?;
    let manager_id = employee.manager_id.ok_or_else(|| {
        AppError::bad_request("NO_MANAGER", "no manager is assigned to this account")
    })?;

    let leave = state
        .leaves
        .create(NewLeave {
            employee_id: employee.id,
            manager_id,
            leave_type: req.leave_type.trim(),
            start_date: req.start_date,
            end_date: req.end_date,
            days,
            reason: req.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()),
        })
        .await?;

    tracing::info!(leave_id = %leave.id, employee_id = %leave.employee_id, days, "leave request submitted");
    state.approvals.notify_manager(&leave);

    Ok((StatusCode::CREATED, Json(leave.into())))
}

pub async fn list_my_leaves(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Result<Json<Vec<LeaveResponse>>, AppError> {
    let rows = state.leaves.list_for_employee(ctx.user_id).await?;
    Ok(Json(rows.into_iter().map(LeaveResponse::from).collect()))
}

pub async fn list_pending(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Result<Json<Vec<LeaveResponse>>, AppError> {
    ctx.require_manager()?;
    let rows = state.leaves.list_pending_for_manager(ctx.user_id).await?;
    Ok(Json(rows.into_iter().map(LeaveResponse::from).collect()))
}

pub async fn get_leave(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Path(leave_id): Path<Uuid>,
) -> Result<Json<LeaveResponse>, AppError> {
    let leave = state
        .leaves
        .get(leave_id)
        .await?
        .ok_or(AppError::not_found("leave"))?;

    if ctx.user_id != leave.employee_id && ctx.user_id != leave.manager_id {
        return Err(AppError::Forbidden);
    }
    Ok(Json(leave.into()))
}

pub async fn decide_leave(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Path(leave_id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<LeaveResponse>, AppError> {
    ctx.require_manager()?;
    let leave = state
        .approvals
        .decide_as_manager(leave_id, ctx.user_id, req.action)
        .await?;
    Ok(Json(leave.into()))
}
