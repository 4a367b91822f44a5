/*
 * Responsibility
 * - メール送信の窓口 (MailService)
 * - 承認依頼メール / 社員への結果通知は best-effort (失敗してもログのみ)
 * - パスワードリセット OTP メールは失敗を呼び出し元へ返す
 */
pub mod compose;
pub mod mailer;
pub mod notify;
pub mod templates;

use lettre::message::Mailbox;
use std::sync::Arc;

use crate::config::{MailSettings, PublicUrls};
use crate::repos::LeaveDetails;
use crate::services::approval::token::{ApprovalAction, ApprovalLinks, token_prefix};

pub use mailer::{Mailer, SmtpMailer};
pub use templates::EmailTemplates;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email configuration incomplete, missing: {}", .missing.join(", "))]
    NotConfigured { missing: Vec<&'static str> },
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("invalid content: {0}")]
    Content(String),
}

pub struct MailService {
    mailer: Option<Arc<dyn Mailer>>,
    settings: MailSettings,
    urls: PublicUrls,
    templates: Option<EmailTemplates>,
}

impl std::fmt::Debug for MailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailService")
            .field("settings", &self.settings)
            .field("templates", &self.templates)
            .finish()
    }
}

impl MailService {
    /// Builds the SMTP transport when the relay settings are complete.
    pub fn new(
        settings: MailSettings,
        urls: PublicUrls,
        templates: Option<EmailTemplates>,
    ) -> Result<Self, MailError> {
        let mailer: Option<Arc<dyn Mailer>> = match (&settings.host, &settings.user, &settings.pass) {
            (Some(host), Some(user), Some(pass)) => {
                let smtp = SmtpMailer::new(host, settings.port, user, pass)?;
                tracing::info!(host = %host, port = settings.port, "email relay configured");
                Some(Arc::new(smtp) as Arc<dyn Mailer>)
            }
            _ => {
                tracing::warn!(missing = ?settings.missing(), "email relay not configured; emails will not be sent");
                None
            }
        };
        Ok(Self {
            mailer,
            settings,
            urls,
            templates,
        })
    }

    pub fn with_mailer(
        mailer: Arc<dyn Mailer>,
        settings: MailSettings,
        urls: PublicUrls,
        templates: Option<EmailTemplates>,
    ) -> Self {
        Self {
            mailer: Some(mailer),
            settings,
            urls,
            templates,
        }
    }

    // Transport + From mailbox, or NotConfigured naming the missing variables.
    fn sender(&self) -> Result<(&Arc<dyn Mailer>, Mailbox), MailError> {
        let missing = self.settings.missing();
        let (Some(mailer), Some(user)) = (&self.mailer, &self.settings.user) else {
            return Err(MailError::NotConfigured { missing });
        };
        if !missing.is_empty() {
            return Err(MailError::NotConfigured { missing });
        }
        Ok((mailer, user.parse()?))
    }

    /// Approval request to the manager, with approve/reject links.
    pub async fn try_send_leave_action_email(
        &self,
        leave: &LeaveDetails,
        links: &ApprovalLinks,
    ) -> Result<(), MailError> {
        let (mailer, from) = self.sender()?;
        let to: Mailbox = leave.manager_email.parse()?;

        let ctx = compose::LeaveEmailContext::new(leave, links, &self.urls);
        let bodies = compose::render_bodies(&ctx, self.templates.as_ref());
        tracing::debug!(
            leave_id = %leave.id,
            source = ?bodies.source,
            approval_token = token_prefix(&links.approval_token),
            rejection_token = token_prefix(&links.rejection_token),
            "composed leave action email"
        );

        let message =
            compose::build_leave_action_message(from, to, &self.urls.frontend, &ctx, bodies)?;
        mailer.send(message).await
    }

    /// Best-effort: failures are logged, never returned.
    pub async fn send_leave_action_email(&self, leave: &LeaveDetails, links: &ApprovalLinks) {
        match self.try_send_leave_action_email(leave, links).await {
            Ok(()) => tracing::info!(
                leave_id = %leave.id,
                status = %leave.status,
                employee = %leave.employee_name,
                "leave action email sent to manager"
            ),
            Err(e) => tracing::error!(
                leave_id = %leave.id,
                error = %e,
                "failed to send leave action email; leave request was still processed"
            ),
        }
    }

    pub async fn try_notify_employee(
        &self,
        leave: &LeaveDetails,
        action: ApprovalAction,
    ) -> Result<(), MailError> {
        let (mailer, from) = self.sender()?;
        let to: Mailbox = leave.employee_email.parse()?;
        let message =
            notify::build_decision_message(from, to, leave, action, &self.urls.frontend)?;
        mailer.send(message).await
    }

    /// Best-effort decision notice to the employee.
    pub async fn notify_employee(&self, leave: &LeaveDetails, action: ApprovalAction) {
        if let Err(e) = self.try_notify_employee(leave, action).await {
            tracing::error!(leave_id = %leave.id, error = %e, "failed to notify employee");
        }
    }

    /// Unlike leave emails, failures are returned.
    pub async fn send_password_reset_otp(&self, email: &str, otp: &str) -> Result<(), MailError> {
        let (mailer, from) = self.sender()?;
        let to: Mailbox = email.parse()?;
        let message = notify::build_reset_otp_message(from, to, otp)?;
        mailer.send(message).await?;
        tracing::info!("password reset OTP sent");
        Ok(())
    }
}
