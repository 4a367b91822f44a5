pub mod auth_ctx;
pub mod decision_token;

pub use auth_ctx::{AuthCtx, AuthCtxExtractor};
pub use decision_token::DecisionToken;
