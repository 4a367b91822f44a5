//! Signed approval links.
//!
//! An approval token lets a manager decide one leave request from a bare link,
//! without a session. It names the request (`sub`), the manager (`mgr`) and the
//! action (`act`), expires after a fixed number of hours, and carries a `jti`
//! so it can be spent exactly once (see `replay`).

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::services::auth::jwt::{HmacJwt, JwtError};

const APPROVAL_AUDIENCE: &str = "leave-approval";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::Approve => "approve",
            ApprovalAction::Reject => "reject",
        }
    }

    /// Status the request ends in after this action.
    pub fn resulting_status(&self) -> &'static str {
        match self {
            ApprovalAction::Approve => "approved",
            ApprovalAction::Reject => "rejected",
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApprovalClaims {
    aud: String,
    sub: String,
    mgr: String,
    act: ApprovalAction,
    iat: i64,
    exp: i64,
    jti: String,
}

#[derive(Debug, Clone)]
pub struct VerifiedApproval {
    pub leave_id: Uuid,
    pub manager_id: Uuid,
    pub action: ApprovalAction,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

impl VerifiedApproval {
    /// Seconds the token stays valid from `now`, never less than 1.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(1) as u64
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("approval token expired")]
    Expired,
    #[error("approval token invalid")]
    Invalid,
    #[error("failed to issue approval token")]
    Issue,
}

impl From<JwtError> for TokenError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => TokenError::Expired,
            JwtError::Invalid(_) => TokenError::Invalid,
            JwtError::Sign => TokenError::Issue,
        }
    }
}

/// The approve/reject pair sent in one email.
#[derive(Debug, Clone)]
pub struct ApprovalLinks {
    pub approval_token: String,
    pub rejection_token: String,
}

#[derive(Clone, Debug)]
pub struct ApprovalTokenService {
    // No leeway: an expired link is expired.
    jwt: HmacJwt,
    ttl_hours: u64,
}

impl ApprovalTokenService {
    pub fn new(secret: &str, ttl_hours: u64) -> Self {
        Self {
            jwt: HmacJwt::new(secret, APPROVAL_AUDIENCE, 0),
            ttl_hours,
        }
    }

    pub fn issue(
        &self,
        leave_id: Uuid,
        manager_id: Uuid,
        action: ApprovalAction,
    ) -> Result<String, TokenError> {
        self.issue_at(leave_id, manager_id, action, Utc::now())
    }

    pub fn issue_at(
        &self,
        leave_id: Uuid,
        manager_id: Uuid,
        action: ApprovalAction,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let exp = i64::try_from(self.ttl_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(TokenError::Issue)?;
        let claims = ApprovalClaims {
            aud: self.jwt.audience().to_string(),
            sub: leave_id.to_string(),
            mgr: manager_id.to_string(),
            act: action,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        Ok(self.jwt.sign(&claims)?)
    }

    /// Issue both tokens for a request.
    pub fn issue_links(&self, leave_id: Uuid, manager_id: Uuid) -> Result<ApprovalLinks, TokenError> {
        Ok(ApprovalLinks {
            approval_token: self.issue(leave_id, manager_id, ApprovalAction::Approve)?,
            rejection_token: self.issue(leave_id, manager_id, ApprovalAction::Reject)?,
        })
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedApproval, TokenError> {
        let claims: ApprovalClaims = self.jwt.verify(token.trim())?;

        let leave_id = Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Invalid)?;
        let manager_id = Uuid::parse_str(&claims.mgr).map_err(|_| TokenError::Invalid)?;
        if claims.jti.trim().is_empty() {
            return Err(TokenError::Invalid);
        }
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(TokenError::Invalid)?;

        Ok(VerifiedApproval {
            leave_id,
            manager_id,
            action: claims.act,
            jti: claims.jti,
            expires_at,
        })
    }
}

/// First characters of a token, for logs.
pub fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}
