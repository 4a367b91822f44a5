use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::auth::jwt::{HmacJwt, JwtError};

const SESSION_AUDIENCE: &str = "leave-approval-session";

/// Role of a user account. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "employee" => Some(Role::Employee),
            "manager" => Some(Role::Manager),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    aud: String,
    sub: String,
    role: Role,
    iat: i64,
    exp: i64,
    jti: String,
}

/// Verified session, promoted to application types.
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    pub user_id: Uuid,
    pub role: Role,
}

/// Issues and verifies login session tokens (Bearer).
#[derive(Clone, Debug)]
pub struct SessionTokenService {
    jwt: HmacJwt,
    ttl_seconds: u64,
}

impl SessionTokenService {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        Self {
            jwt: HmacJwt::new(secret, SESSION_AUDIENCE, 30),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String, JwtError> {
        let now = chrono::Utc::now().timestamp();
        let exp = i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or(JwtError::Sign)?;
        let claims = SessionClaims {
            aud: self.jwt.audience().to_string(),
            sub: user_id.to_string(),
            role,
            iat: now,
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        self.jwt.sign(&claims)
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedSession, JwtError> {
        let claims: SessionClaims = self.jwt.verify(token)?;
        // Project convention: subject is a UUID
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            JwtError::Invalid(jsonwebtoken::errors::ErrorKind::InvalidSubject.into())
        })?;
        Ok(VerifiedSession {
            user_id,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_session_verifies() {
        let svc = SessionTokenService::new("test-secret", 3600);
        let user_id = Uuid::new_v4();

        let token = svc.issue(user_id, Role::Manager).unwrap();
        let session = svc.verify(&token).unwrap();

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.role, Role::Manager);
    }

    #[test]
    fn session_signed_with_other_secret_is_rejected() {
        let issuer = SessionTokenService::new("secret-a", 3600);
        let verifier = SessionTokenService::new("secret-b", 3600);

        let token = issuer.issue(Uuid::new_v4(), Role::Employee).unwrap();
        assert!(matches!(verifier.verify(&token), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn oversized_ttl_fails_to_issue() {
        for ttl in [u64::MAX, i64::MAX as u64] {
            let svc = SessionTokenService::new("test-secret", ttl);
            assert!(matches!(svc.issue(Uuid::new_v4(), Role::Employee), Err(JwtError::Sign)));
        }
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::Employee, Role::Manager] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("admin"), None);
    }
}
