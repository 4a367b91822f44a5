pub mod jwt;
pub mod otp;
pub mod password;
pub mod session;

pub use otp::OtpStore;
pub use session::{Role, SessionTokenService};
