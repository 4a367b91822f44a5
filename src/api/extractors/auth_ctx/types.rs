/*
 * Responsibility
 * - Handler から見える「ログイン済みユーザー」の型
 * - session middleware が検証して request extensions に格納する
 */
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::Role;

#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthCtx {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Manager-only endpoints.
    pub fn require_manager(&self) -> Result<(), AppError> {
        match self.role {
            Role::Manager => Ok(()),
            Role::Employee => Err(AppError::Forbidden),
        }
    }
}
