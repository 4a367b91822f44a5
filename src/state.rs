/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - repos, session / approval token, OTP store, mail service
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::path::PathBuf;
use std::sync::Arc;

use crate::repos::{LeaveRepo, UserRepo};
use crate::services::approval::ApprovalService;
use crate::services::auth::{OtpStore, SessionTokenService};
use crate::services::mail::MailService;

#[derive(Clone)]
pub struct AppState {
    pub users: UserRepo,
    pub leaves: LeaveRepo,
    pub sessions: SessionTokenService,
    pub approvals: ApprovalService,
    pub otp: OtpStore,
    pub mail: Arc<MailService>,
    pub static_client_dir: PathBuf,
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::test_config;
    use crate::services::approval::{ApprovalTokenService, CacheReplayStore};
    use crate::services::cache::{CacheClient, MemoryCache};
    use sqlx::postgres::PgPoolOptions;

    /// State with a lazily-connected pool: handlers that never hit the
    /// database can be exercised without Postgres.
    pub fn lazy_state() -> AppState {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        let cache: Arc<dyn CacheClient> = Arc::new(MemoryCache::new());
        let (_mailer, mail) = crate::services::mail::testing::recording();
        let mail = Arc::new(mail);
        let leaves = LeaveRepo::new(pool.clone());

        AppState {
            users: UserRepo::new(pool),
            approvals: ApprovalService::new(
                ApprovalTokenService::new(&config.approval_token_secret, config.approval_token_ttl_hours),
                Arc::new(CacheReplayStore::new(cache.clone())),
                Arc::new(leaves.clone()),
                mail.clone(),
            ),
            leaves,
            sessions: SessionTokenService::new(&config.jwt_secret, config.session_token_ttl_seconds),
            otp: OtpStore::new(cache),
            mail,
            static_client_dir: config.static_client_dir,
        }
    }
}
