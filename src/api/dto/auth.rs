/*
 * Responsibility
 * - /auth 系の request/response DTO
 * - validate() は形式チェックのみ (存在確認などは handler 側)
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repos::user_repo::UserRow;
use crate::services::auth::Role;
use crate::services::auth::password::MIN_PASSWORD_LEN;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    /// Email of the manager this employee reports to.
    #[serde(default)]
    pub manager_email: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<Role, &'static str> {
        if self.name.trim().is_empty() {
            return Err("name is required");
        }
        if !looks_like_email(&self.email) {
            return Err("a valid email is required");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err("password must be at least 8 characters");
        }
        match self.role.as_deref().map(str::trim) {
            None | Some("") => Ok(Role::Employee),
            Some(raw) => Role::parse(&raw.to_ascii_lowercase())
                .ok_or("role must be employee or manager"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.otp.trim().len() != 6 || !self.otp.trim().chars().all(|c| c.is_ascii_digit()) {
            return Err("otp must be 6 digits");
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err("password must be at least 8 characters");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: Option<String>,
    pub manager_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            department: row.department,
            manager_id: row.manager_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "Bearer"
    pub token_type: &'static str,
    /// Seconds until expiry.
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn looks_like_email(raw: &str) -> bool {
    let raw = raw.trim();
    match raw.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !raw.contains(' '),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(role: Option<&str>, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Dana".into(),
            email: "dana@example.com".into(),
            password: password.into(),
            role: role.map(String::from),
            department: None,
            manager_email: None,
        }
    }

    #[test]
    fn role_defaults_to_employee() {
        assert_eq!(register(None, "longenough").validate(), Ok(Role::Employee));
        assert_eq!(register(Some("Manager"), "longenough").validate(), Ok(Role::Manager));
        assert!(register(Some("admin"), "longenough").validate().is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(register(None, "short").validate().is_err());
    }

    #[test]
    fn reset_requires_six_digit_otp() {
        let mut req = ResetPasswordRequest {
            email: "dana@example.com".into(),
            otp: "12345".into(),
            new_password: "longenough".into(),
        };
        assert!(req.validate().is_err());
        req.otp = "123456".into();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a b@c.co"));
    }
}
