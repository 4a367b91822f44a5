/*
 * Responsibility
 * - 承認リンク (token) / マネージャー画面 からの承認・却下を実行する
 * - pending -> approved|rejected の遷移は一度だけ
 * - 社員への通知は background task (best-effort)
 */
use chrono::{DateTime, Utc};
use std::{future::Future, pin::Pin, sync::Arc};
use uuid::Uuid;

use crate::repos::LeaveDetails;
use crate::repos::error::RepoResult;
use crate::repos::leave_repo::{LeaveRepo, STATUS_PENDING};
use crate::services::approval::ApprovalError;
use crate::services::approval::replay::ReplayStore;
use crate::services::approval::token::{
    ApprovalAction, ApprovalTokenService, VerifiedApproval, token_prefix,
};
use crate::services::mail::MailService;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Reads and conditionally updates leave requests.
pub trait LeaveDecisionStore: Send + Sync {
    fn find<'a>(&'a self, id: Uuid) -> BoxFuture<'a, RepoResult<Option<LeaveDetails>>>;

    // Only moves a pending request. None => missing or already decided.
    fn decide<'a>(
        &'a self,
        id: Uuid,
        status: &'static str,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, RepoResult<Option<LeaveDetails>>>;
}

impl LeaveDecisionStore for LeaveRepo {
    fn find<'a>(&'a self, id: Uuid) -> BoxFuture<'a, RepoResult<Option<LeaveDetails>>> {
        Box::pin(self.get(id))
    }

    fn decide<'a>(
        &'a self,
        id: Uuid,
        status: &'static str,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, RepoResult<Option<LeaveDetails>>> {
        Box::pin(LeaveRepo::decide(self, id, status, now))
    }
}

#[derive(Clone)]
pub struct ApprovalService {
    tokens: ApprovalTokenService,
    replay: Arc<dyn ReplayStore>,
    store: Arc<dyn LeaveDecisionStore>,
    mail: Arc<MailService>,
}

impl ApprovalService {
    pub fn new(
        tokens: ApprovalTokenService,
        replay: Arc<dyn ReplayStore>,
        store: Arc<dyn LeaveDecisionStore>,
        mail: Arc<MailService>,
    ) -> Self {
        Self {
            tokens,
            replay,
            store,
            mail,
        }
    }

    pub fn tokens(&self) -> &ApprovalTokenService {
        &self.tokens
    }

    /// Decide a request from an emailed link.
    pub async fn decide_with_token(
        &self,
        path_leave_id: &str,
        path_action: ApprovalAction,
        token: &str,
    ) -> Result<LeaveDetails, ApprovalError> {
        let verified = self.tokens.verify(token).inspect_err(|e| {
            tracing::info!(leave_id = path_leave_id, token = token_prefix(token), error = %e, "approval token rejected");
        })?;

        if Uuid::parse_str(path_leave_id).ok() != Some(verified.leave_id) {
            return Err(ApprovalError::WrongLeave);
        }
        if verified.action != path_action {
            return Err(ApprovalError::WrongAction);
        }

        let leave = self
            .store
            .find(verified.leave_id)
            .await?
            .ok_or(ApprovalError::NotFound)?;
        if leave.manager_id != verified.manager_id {
            return Err(ApprovalError::WrongManager);
        }
        ensure_pending(&leave)?;

        self.consume(&verified).await?;

        let decided = self.transition(leave.id, verified.action).await?;
        tracing::info!(
            leave_id = %decided.id,
            action = %verified.action,
            token = token_prefix(token),
            "leave request decided via approval link"
        );
        self.spawn_employee_notice(&decided, verified.action);
        Ok(decided)
    }

    /// Decide a request from the manager dashboard (session-authenticated).
    pub async fn decide_as_manager(
        &self,
        leave_id: Uuid,
        manager_id: Uuid,
        action: ApprovalAction,
    ) -> Result<LeaveDetails, ApprovalError> {
        let leave = self
            .store
            .find(leave_id)
            .await?
            .ok_or(ApprovalError::NotFound)?;
        if leave.manager_id != manager_id {
            return Err(ApprovalError::WrongManager);
        }
        ensure_pending(&leave)?;

        let decided = self.transition(leave.id, action).await?;
        tracing::info!(leave_id = %decided.id, action = %action, "leave request decided by manager");
        self.spawn_employee_notice(&decided, action);
        Ok(decided)
    }

    /// Mark the token's `jti` as spent for the rest of its lifetime.
    pub async fn consume(&self, verified: &VerifiedApproval) -> Result<(), ApprovalError> {
        let ttl = verified.remaining_seconds(Utc::now());
        if self.replay.check_and_store(&verified.jti, ttl).await? {
            Ok(())
        } else {
            Err(ApprovalError::TokenUsed)
        }
    }

    /// Issue approve/reject links and email the manager in the background.
    pub fn notify_manager(&self, leave: &LeaveDetails) {
        let links = match self.tokens.issue_links(leave.id, leave.manager_id) {
            Ok(links) => links,
            Err(e) => {
                tracing::error!(leave_id = %leave.id, error = %e, "failed to issue approval tokens");
                return;
            }
        };

        let mail = Arc::clone(&self.mail);
        let leave = leave.clone();
        tokio::spawn(async move {
            mail.send_leave_action_email(&leave, &links).await;
        });
    }

    async fn transition(
        &self,
        leave_id: Uuid,
        action: ApprovalAction,
    ) -> Result<LeaveDetails, ApprovalError> {
        if let Some(decided) = self
            .store
            .decide(leave_id, action.resulting_status(), Utc::now())
            .await?
        {
            return Ok(decided);
        }

        // Lost the race against another decision.
        match self.store.find(leave_id).await? {
            Some(current) => Err(ApprovalError::AlreadyDecided {
                status: current.status,
            }),
            None => Err(ApprovalError::NotFound),
        }
    }

    fn spawn_employee_notice(&self, leave: &LeaveDetails, action: ApprovalAction) {
        let mail = Arc::clone(&self.mail);
        let leave = leave.clone();
        tokio::spawn(async move {
            mail.notify_employee(&leave, action).await;
        });
    }
}

fn ensure_pending(leave: &LeaveDetails) -> Result<(), ApprovalError> {
    if leave.status == STATUS_PENDING {
        Ok(())
    } else {
        Err(ApprovalError::AlreadyDecided {
            status: leave.status.clone(),
        })
    }
}
