pub mod replay;
pub mod service;
pub mod token;

pub use replay::CacheReplayStore;
pub use service::ApprovalService;
pub use token::{ApprovalAction, ApprovalTokenService};

use token::TokenError;

/// Ways a decision can be refused.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("invalid approval token")]
    InvalidToken,
    #[error("approval token expired")]
    Expired,
    #[error("approval token already used")]
    TokenUsed,
    /// Token names a different leave request than the URL.
    #[error("token does not match leave request")]
    WrongLeave,
    /// Token was issued for the other action.
    #[error("token does not match action")]
    WrongAction,
    /// Token (or caller) is not the request's manager.
    #[error("not the manager of this leave request")]
    WrongManager,
    #[error("leave request not found")]
    NotFound,
    #[error("leave request already {status}")]
    AlreadyDecided { status: String },
    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("internal error")]
    Internal,
}

impl From<TokenError> for ApprovalError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => ApprovalError::Expired,
            TokenError::Invalid => ApprovalError::InvalidToken,
            TokenError::Issue => ApprovalError::Internal,
        }
    }
}

impl From<crate::repos::error::RepoError> for ApprovalError {
    fn from(e: crate::repos::error::RepoError) -> Self {
        ApprovalError::Store(Box::new(e))
    }
}

impl From<crate::services::cache::CacheError> for ApprovalError {
    fn from(e: crate::services::cache::CacheError) -> Self {
        ApprovalError::Store(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cache::CacheError;
    use std::error::Error;

    #[test]
    fn messages_and_sources() {
        let decided = ApprovalError::AlreadyDecided {
            status: "approved".into(),
        };
        assert_eq!(decided.to_string(), "leave request already approved");
        assert!(decided.source().is_none());

        let store = ApprovalError::from(CacheError::BackendCommand("boom".into()));
        assert!(store.to_string().starts_with("store error: "));
        assert!(store.source().is_some());

        assert!(matches!(ApprovalError::from(TokenError::Expired), ApprovalError::Expired));
    }
}
