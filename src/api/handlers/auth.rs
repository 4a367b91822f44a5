/*
 * Responsibility
 * - /auth 系 handler (register / login / me / forgot-password / reset-password)
 * - 未知の email とパスワード不一致は同じ 401 を返す
 * - forgot-password は email の有無を明かさない
 */
use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::auth::{
    ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest, ResetPasswordRequest,
    TokenResponse, UserResponse,
};
use crate::api::extractors::AuthCtxExtractor;
use crate::error::AppError;
use crate::repos::error::RepoError;
use crate::repos::user_repo::NewUser;
use crate::services::auth::Role;
use crate::services::auth::password::{hash_password, verify_password};
use crate::state::AppState;

const RESET_REQUESTED: &str = "If the email is registered, an OTP has been sent.";

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let role = req
        .validate()
        .map_err(|m| AppError::bad_request("VALIDATION_ERROR", m))?;

    let manager_id = match req.manager_email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => {
            let manager = state
                .users
                .find_by_email(email)
                .await?
                .filter(|m| m.role == Role::Manager.as_str())
                .ok_or_else(|| AppError::bad_request("INVALID_MANAGER", "manager not found"))?;
            Some(manager.id)
        }
        _ => None,
    };

    let password_hash = hash_password(&req.password)?;
    let row = state
        .users
        .create(NewUser {
            name: req.name.trim(),
            email: &req.email,
            password_hash: &password_hash,
            role: role.as_str(),
            department: req.department.as_deref().map(str::trim).filter(|d| !d.is_empty()),
            manager_id,
        })
        .await
        .map_err(|e| match e {
            RepoError::Conflict => AppError::conflict("EMAIL_TAKEN", "email is already registered"),
            other => other.into(),
        })?;

    tracing::info!(user_id = %row.id, role = role.as_str(), "user registered");
    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&req.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "login failed");
        return Err(AppError::Unauthorized);
    }

    let role = Role::parse(&user.role).ok_or_else(|| {
        tracing::error!(user_id = %user.id, role = %user.role, "unknown role in users table");
        AppError::Internal
    })?;
    let access_token = state.sessions.issue(user.id, role).map_err(|e| {
        tracing::error!(error = %e, "failed to issue session token");
        AppError::Internal
    })?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.sessions.ttl_seconds(),
        user: user.into(),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .users
        .get(ctx.user_id)
        .await?
        .ok_or(AppError::not_found("user"))?;
    Ok(Json(user.into()))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let Some(user) = state.users.find_by_email(&req.email).await? else {
        tracing::info!("password reset requested for unknown email");
        return Ok(Json(MessageResponse {
            message: RESET_REQUESTED.to_string(),
        }));
    };

    let otp = state.otp.issue(&user.email).await?;
    state
        .mail
        .send_password_reset_otp(&user.email, &otp)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "failed to send password reset OTP");
            AppError::Internal
        })?;

    Ok(Json(MessageResponse {
        message: RESET_REQUESTED.to_string(),
    }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()
        .map_err(|m| AppError::bad_request("VALIDATION_ERROR", m))?;

    let invalid = || AppError::bad_request("INVALID_OTP", "invalid or expired OTP");
    if !state.otp.verify_and_consume(&req.email, &req.otp).await? {
        return Err(invalid());
    }
    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(invalid)?;

    let password_hash = hash_password(&req.new_password)?;
    if !state.users.update_password(user.id, &password_hash).await? {
        return Err(AppError::not_found("user"));
    }

    tracing::info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse {
        message: "Password has been reset.".to_string(),
    }))
}
